use std::time::Duration;

use super::{Client, ClientConfig};
use crate::Error;

#[must_use]
#[derive(Default)]
pub struct ClientBuilder {
    pub(crate) config: ClientConfig,
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout_ms = Some(duration_ms(timeout));
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout_ms = Some(duration_ms(timeout));
        self
    }

    pub fn proxy(mut self, proxy: impl Into<String>) -> Self {
        self.config = self.config.with_proxy(proxy);
        self
    }

    pub const fn max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.config.max_body_bytes = max_body_bytes;
        self
    }

    /// # Errors
    /// Returns an error if the proxy URL is invalid or the TLS backend
    /// cannot be initialized.
    pub fn build(self) -> Result<Client, Error> {
        Client::from_config(&self.config)
    }
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
