//! Scrape orchestration: one browser session per call, always closed.

use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};
use utoipa::ToSchema;

use crate::browser::{self, BrowserEngine, BrowserSession, DESKTOP_USER_AGENT};
use crate::error::ScrapeError;
use crate::extractor::{self, ProductFields};
use crate::profiles::SiteProfile;

/// Extra time granted to the engine's own navigation timeout before the outer
/// one fires, so the engine's error wins when it reports one.
const NAVIGATION_GRACE: Duration = Duration::from_secs(2);

pub const FAILURE_HINT: &str = "Erro ao processar a URL. Tente novamente.";

/// Successful scrape, returned verbatim as the response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ScrapeResult {
    pub success: bool,
    #[serde(flatten)]
    pub fields: ProductFields,
    /// Final URL after redirects
    pub url: String,
    /// Profile name
    pub source: String,
}

/// Failed scrape body.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ScrapeFailure {
    pub success: bool,
    pub error: String,
    pub message: String,
}

impl From<&ScrapeError> for ScrapeFailure {
    fn from(err: &ScrapeError) -> Self {
        Self {
            success: false,
            error: err.to_string(),
            message: FAILURE_HINT.to_string(),
        }
    }
}

pub struct ScrapeOrchestrator {
    engine: Arc<dyn BrowserEngine>,
    user_agent: String,
}

impl ScrapeOrchestrator {
    pub fn new(engine: Arc<dyn BrowserEngine>) -> Self {
        Self {
            engine,
            user_agent: DESKTOP_USER_AGENT.to_string(),
        }
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Scrape `url` with `profile`. The session opened here is closed before
    /// returning, whatever the outcome.
    pub async fn scrape(&self, url: &str, profile: &SiteProfile) -> Result<ScrapeResult, ScrapeError> {
        let started = Instant::now();
        info!(url, source = profile.name, "🔎 Scraping product page");

        let mut session = self.engine.launch().await.map_err(|e| {
            error!(url, source = profile.name, "❌ Browser launch failed: {:#}", e);
            ScrapeError::Launch(e)
        })?;

        let outcome = self.run(session.as_mut(), url, profile).await;

        if let Err(e) = session.close().await {
            warn!(url, "⚠️ Failed to close browser session: {:#}", e);
        }

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &outcome {
            Ok(result) => info!(
                url = %result.url,
                source = profile.name,
                elapsed_ms,
                image = result.fields.image.is_some(),
                "✅ Scrape finished"
            ),
            Err(e) => error!(url, source = profile.name, elapsed_ms, "❌ Scrape failed: {}", e),
        }
        outcome
    }

    async fn run(
        &self,
        session: &mut dyn BrowserSession,
        url: &str,
        profile: &SiteProfile,
    ) -> Result<ScrapeResult, ScrapeError> {
        session
            .set_user_agent(&self.user_agent)
            .await
            .map_err(ScrapeError::Navigation)?;

        let timeout = profile.navigation_timeout;
        match tokio::time::timeout(timeout + NAVIGATION_GRACE, session.navigate(url, timeout)).await {
            Ok(navigated) => navigated?,
            Err(_) => return Err(browser::timeout_error(timeout)),
        }

        // Client-side rendering
        tokio::time::sleep(profile.settle_delay).await;

        let page = session.snapshot().await.map_err(ScrapeError::Evaluation)?;
        let fields = extractor::extract_html(&page.html, &page.url, profile)
            .map_err(ScrapeError::Evaluation)?;

        Ok(ScrapeResult {
            success: true,
            fields,
            url: page.url,
            source: profile.name.to_string(),
        })
    }
}
