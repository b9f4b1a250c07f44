//! Browser sessions.
//!
//! The orchestrator only sees the [`BrowserEngine`] / [`BrowserSession`]
//! traits. [`ChromeEngine`] drives a real Chrome through `headless_chrome`;
//! its calls block, so each one runs on the blocking thread pool.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use headless_chrome::protocol::cdp::Page;
use headless_chrome::{Browser, LaunchOptions, Tab};
use std::ffi::OsStr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::spawn_blocking;

use crate::error::ScrapeError;

pub const DESKTOP_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36";

// Container-friendly launch flags
const LAUNCH_ARGS: &[&str] = &[
    "--no-sandbox",
    "--disable-setuid-sandbox",
    "--disable-dev-shm-usage",
    "--disable-accelerated-2d-canvas",
    "--disable-gpu",
];

/// No new resource entries for this long counts as network idle.
const NETWORK_IDLE_WINDOW: Duration = Duration::from_millis(500);
const NETWORK_IDLE_POLL: Duration = Duration::from_millis(100);

/// Chrome stops recording resource entries at 250 by default, which would
/// freeze the count on heavy pages. Installed before any page script runs.
const RESOURCE_BUFFER_JS: &str = "performance.setResourceTimingBufferSize(1000000);";

/// -1 until the document has finished loading.
const RESOURCE_COUNT_JS: &str = "document.readyState === 'complete' ? performance.getEntriesByType('resource').length : -1";

/// How long Chrome may sit without DevTools traffic before `headless_chrome`
/// gives up on it. Must exceed the longest settle delay.
const IDLE_BROWSER_TIMEOUT: Duration = Duration::from_secs(90);

#[derive(Debug, Clone)]
pub struct LaunchConfig {
    pub headless: bool,
    pub chrome_path: Option<PathBuf>,
    pub window_size: (u32, u32),
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            headless: true,
            chrome_path: None,
            window_size: (1920, 1080),
        }
    }
}

/// The rendered DOM after navigation and settle.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub html: String,
    /// Final URL after redirects.
    pub url: String,
}

#[async_trait]
pub trait BrowserEngine: Send + Sync {
    /// Start a browser and open one page.
    async fn launch(&self) -> Result<Box<dyn BrowserSession>>;
}

/// One browser process with one page, owned by a single scrape.
#[async_trait]
pub trait BrowserSession: Send {
    async fn set_user_agent(&mut self, user_agent: &str) -> Result<()>;

    /// Navigate and wait for network idle, bounded by `timeout`.
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<(), ScrapeError>;

    async fn snapshot(&mut self) -> Result<RenderedPage>;

    /// Shut the browser down. Consumes the session so it can only happen once.
    async fn close(self: Box<Self>) -> Result<()>;
}

pub struct ChromeEngine {
    config: LaunchConfig,
}

impl ChromeEngine {
    pub fn new(config: LaunchConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl BrowserEngine for ChromeEngine {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>> {
        let config = self.config.clone();
        let session = spawn_blocking(move || ChromeSession::start(&config))
            .await
            .context("browser launch task failed")??;
        Ok(Box::new(session))
    }
}

/// Dropping the session drops the `Browser`, which kills the Chrome process,
/// so even a panicking scrape does not leak it.
pub struct ChromeSession {
    browser: Browser,
    tab: Arc<Tab>,
}

impl ChromeSession {
    fn start(config: &LaunchConfig) -> Result<Self> {
        let mut args: Vec<&OsStr> = LAUNCH_ARGS.iter().map(|a| OsStr::new(*a)).collect();
        if config.headless {
            args.push(OsStr::new("--headless=new"));
        }

        let browser = Browser::new(LaunchOptions {
            headless: false, // new headless mode is selected via args
            sandbox: false,
            window_size: Some(config.window_size),
            path: config.chrome_path.clone(),
            idle_browser_timeout: IDLE_BROWSER_TIMEOUT,
            args,
            ..Default::default()
        })?;

        let tab = browser.new_tab()?;
        tab.call_method(Page::AddScriptToEvaluateOnNewDocument {
            source: RESOURCE_BUFFER_JS.to_string(),
            world_name: None,
            include_command_line_api: None,
            run_immediately: None,
        })?;
        tracing::debug!("browser launched");
        Ok(Self { browser, tab })
    }
}

#[async_trait]
impl BrowserSession for ChromeSession {
    async fn set_user_agent(&mut self, user_agent: &str) -> Result<()> {
        let tab = self.tab.clone();
        let user_agent = user_agent.to_string();
        spawn_blocking(move || tab.set_user_agent(&user_agent, None, None)).await?
    }

    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<(), ScrapeError> {
        let tab = self.tab.clone();
        let url = url.to_string();
        spawn_blocking(move || navigate_blocking(&tab, &url, timeout))
            .await
            .map_err(|e| ScrapeError::Navigation(e.into()))?
    }

    async fn snapshot(&mut self) -> Result<RenderedPage> {
        let tab = self.tab.clone();
        spawn_blocking(move || -> Result<RenderedPage> {
            let html = tab
                .evaluate("document.documentElement.outerHTML", false)?
                .value
                .and_then(|v| v.as_str().map(str::to_string))
                .ok_or_else(|| anyhow!("page returned no document HTML"))?;
            Ok(RenderedPage {
                html,
                url: tab.get_url(),
            })
        })
        .await?
    }

    async fn close(self: Box<Self>) -> Result<()> {
        let ChromeSession { browser, tab } = *self;
        spawn_blocking(move || {
            let closed = tab.close(false);
            drop(browser);
            tracing::debug!("browser closed");
            closed.map(|_| ())
        })
        .await?
    }
}

fn navigate_blocking(tab: &Tab, url: &str, timeout: Duration) -> Result<(), ScrapeError> {
    let started = Instant::now();
    let deadline = started + timeout;
    let classify = |e: anyhow::Error| {
        if started.elapsed() >= timeout {
            timeout_error(timeout)
        } else {
            ScrapeError::Navigation(e)
        }
    };

    tab.set_default_timeout(timeout);
    tab.navigate_to(url).map_err(classify)?;
    tab.wait_until_navigated().map_err(classify)?;
    wait_for_network_idle(tab, deadline, timeout)
}

fn wait_for_network_idle(tab: &Tab, deadline: Instant, timeout: Duration) -> Result<(), ScrapeError> {
    let mut window = QuietWindow::new(NETWORK_IDLE_WINDOW);

    loop {
        let count = tab
            .evaluate(RESOURCE_COUNT_JS, false)
            .map_err(ScrapeError::Navigation)?
            .value
            .and_then(|v| v.as_i64())
            .unwrap_or(-1);

        let now = Instant::now();
        if window.observe(count, now) {
            return Ok(());
        }
        if now >= deadline {
            return Err(timeout_error(timeout));
        }
        std::thread::sleep(NETWORK_IDLE_POLL);
    }
}

/// Tracks how long the resource count has stayed put.
#[derive(Debug)]
struct QuietWindow {
    window: Duration,
    last_count: Option<i64>,
    quiet_since: Option<Instant>,
}

impl QuietWindow {
    fn new(window: Duration) -> Self {
        Self {
            window,
            last_count: None,
            quiet_since: None,
        }
    }

    /// Record one reading; true once `count` has been unchanged for the
    /// whole window. Negative counts (page still loading) restart it.
    fn observe(&mut self, count: i64, now: Instant) -> bool {
        if count < 0 || self.last_count != Some(count) {
            self.last_count = (count >= 0).then_some(count);
            self.quiet_since = Some(now);
            return false;
        }
        match self.quiet_since {
            Some(since) => now.duration_since(since) >= self.window,
            None => false,
        }
    }
}

pub(crate) fn timeout_error(timeout: Duration) -> ScrapeError {
    ScrapeError::NavigationTimeout {
        timeout_ms: timeout.as_millis() as u64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_launch_args_disable_sandbox_and_gpu() {
        assert!(LAUNCH_ARGS.contains(&"--no-sandbox"));
        assert!(LAUNCH_ARGS.contains(&"--disable-setuid-sandbox"));
        assert!(LAUNCH_ARGS.contains(&"--disable-gpu"));
    }

    #[test]
    fn test_quiet_window_needs_stable_count() {
        let start = Instant::now();
        let ms = |n| start + Duration::from_millis(n);
        let mut window = QuietWindow::new(Duration::from_millis(500));

        assert!(!window.observe(10, ms(0)));
        assert!(!window.observe(10, ms(300)));
        assert!(!window.observe(12, ms(400)));
        assert!(!window.observe(12, ms(800)));
        assert!(window.observe(12, ms(900)));
    }

    #[test]
    fn test_quiet_window_restarts_while_loading() {
        let start = Instant::now();
        let ms = |n| start + Duration::from_millis(n);
        let mut window = QuietWindow::new(Duration::from_millis(500));

        assert!(!window.observe(-1, ms(0)));
        assert!(!window.observe(-1, ms(600)));
        assert!(!window.observe(5, ms(700)));
        assert!(window.observe(5, ms(1200)));
    }

    #[test]
    fn test_quiet_window_growing_past_default_buffer() {
        // A page still fetching beyond 250 resources keeps the window open.
        let start = Instant::now();
        let mut window = QuietWindow::new(Duration::from_millis(500));
        for (i, count) in (240..320).enumerate() {
            let now = start + Duration::from_millis(100 * i as u64);
            assert!(!window.observe(count, now));
        }
    }

    #[test]
    fn test_resource_buffer_raised_past_default() {
        assert!(RESOURCE_BUFFER_JS.contains("setResourceTimingBufferSize(1000000)"));
    }

    #[test]
    fn test_timeout_error_millis() {
        let err = timeout_error(Duration::from_secs(30));
        assert_eq!(err.to_string(), "Navigation timeout of 30000 ms exceeded");
    }

    #[test]
    fn test_idle_timeout_exceeds_settle_delays() {
        for profile in crate::profiles::all() {
            assert!(IDLE_BROWSER_TIMEOUT > profile.settle_delay + profile.navigation_timeout);
        }
    }
}
