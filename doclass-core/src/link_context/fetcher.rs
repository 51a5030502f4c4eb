use crate::config::FetchConfig;
use std::io::Read;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// Bodies beyond this size are truncated.
pub const MAX_BODY_BYTES: u64 = 16 * 1024 * 1024;

/// A source page that could not be retrieved. Never fatal to a batch.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FetchError {
    #[error("HTTP status {0}")]
    Status(u16),
    #[error("request failed: {0}")]
    Transport(String),
    #[error("unreadable body: {0}")]
    Body(String),
}

/// Fetch a page and return its text.
pub trait PageFetcher: Send + Sync {
    fn fetch(&self, url: &str) -> Result<String, FetchError>;

    /// Fetcher name for debugging/logging
    fn name(&self) -> &str {
        "fetcher"
    }
}

/// Blocking HTTP fetcher backed by a shared `ureq` agent.
pub struct HttpFetcher {
    agent: ureq::Agent,
    max_body_bytes: u64,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, user_agent: &str) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(timeout)
            .user_agent(user_agent)
            .build();
        Self {
            agent,
            max_body_bytes: MAX_BODY_BYTES,
        }
    }

    pub fn with_max_body_bytes(mut self, max_body_bytes: u64) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    pub fn from_config(config: &FetchConfig) -> Self {
        Self::new(config.timeout(), &config.user_agent)
    }
}

impl PageFetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let response = match self.agent.get(url).call() {
            Ok(response) => response,
            Err(ureq::Error::Status(code, _)) => return Err(FetchError::Status(code)),
            Err(ureq::Error::Transport(transport)) => {
                return Err(FetchError::Transport(transport.to_string()))
            }
        };

        let mut bytes = Vec::new();
        response
            .into_reader()
            .take(self.max_body_bytes)
            .read_to_end(&mut bytes)
            .map_err(|e| FetchError::Body(e.to_string()))?;
        if bytes.len() as u64 >= self.max_body_bytes {
            warn!(
                source = url,
                limit = self.max_body_bytes,
                "Source page truncated; anchors past the limit are ignored"
            );
        }

        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn name(&self) -> &str {
        "http"
    }
}
