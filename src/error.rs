use thiserror::Error;

/// Everything that can go wrong between launching the browser and reading the
/// product fields. Apart from timeouts, the message is the engine's own
/// `anyhow` chain, unprefixed, so clients see what the browser reported.
#[derive(Error, Debug)]
pub enum ScrapeError {
    #[error("{0:#}")]
    Launch(anyhow::Error),

    #[error("{0:#}")]
    Navigation(anyhow::Error),

    #[error("Navigation timeout of {timeout_ms} ms exceeded")]
    NavigationTimeout { timeout_ms: u64 },

    #[error("{0:#}")]
    Evaluation(anyhow::Error),
}

impl ScrapeError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ScrapeError::NavigationTimeout { .. })
    }
}
