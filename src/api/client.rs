//! Minimal probe client.
//!
//! Lets the binary act as an exec-style probe against a running probe server.

use std::time::Duration;

use reqwest::Client;
use tracing::{debug, instrument};

use crate::error::Result;

/// HTTP client for polling probe endpoints.
#[derive(Debug, Clone)]
pub struct ProbeClient {
    http: Client,
}

impl ProbeClient {
    /// Create a client whose requests give up after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { http })
    }

    /// GET `url`; `Ok(true)` when it answers 2xx, `Ok(false)` for any other status.
    ///
    /// Transport failures (refused connection, timeout) are errors.
    #[instrument(skip(self))]
    pub async fn check(&self, url: &str) -> Result<bool> {
        let response = self.http.get(url).send().await?;
        let status = response.status();
        debug!(%status, "Probe answered");
        Ok(status.is_success())
    }
}
