use std::time::Duration;

use serde::Deserialize;

use crate::Error;

const USER_AGENT: &str = concat!("jsbridge/", env!("CARGO_PKG_VERSION"));

/// 16 MiB, matching the largest document a script is expected to scrape.
pub const DEFAULT_MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub user_agent: String,
    /// Whole-request timeout. `None` leaves the client's own policy in place.
    pub timeout_ms: Option<u64>,
    pub connect_timeout_ms: Option<u64>,
    pub proxy: Option<String>,
    pub max_body_bytes: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user_agent: USER_AGENT.to_string(),
            timeout_ms: None,
            connect_timeout_ms: None,
            proxy: None,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl ClientConfig {
    #[must_use]
    pub fn with_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }

    pub(crate) fn build_client(&self) -> Result<reqwest::Client, Error> {
        let mut builder = reqwest::Client::builder().user_agent(self.user_agent.as_str());
        if let Some(ms) = self.timeout_ms {
            builder = builder.timeout(Duration::from_millis(ms));
        }
        if let Some(ms) = self.connect_timeout_ms {
            builder = builder.connect_timeout(Duration::from_millis(ms));
        }
        if let Some(proxy_str) = &self.proxy {
            let proxy = reqwest::Proxy::all(proxy_str)?;
            builder = builder.proxy(proxy);
        }
        Ok(builder.build()?)
    }
}
