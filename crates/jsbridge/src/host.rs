use std::sync::Arc;

use jsbridge_request::{Client, ClientConfig};
use tracing::Level;

use crate::{
    TRACE_TARGET_SCRIPT,
    error::{Error, Result},
};

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub use jsbridge_request::{Request as HttpRequest, Response as HttpResponse};

/// Host capabilities that scripts reach through `fetch`, `xhr` and `console`.
#[async_trait::async_trait]
pub trait Host: Send + Sync + 'static {
    /// Perform an HTTP request and buffer the response.
    ///
    /// Status codes must not be turned into errors here; the bridge does
    /// that itself so scripts see a uniform `HttpStatusError`.
    async fn http_request(&self, req: HttpRequest) -> core::result::Result<HttpResponse, BoxError>;

    /// Receive one formatted `console.*` line.
    fn console(&self, level: Level, message: &str) {
        match level {
            Level::ERROR => tracing::error!(target: TRACE_TARGET_SCRIPT, "{message}"),
            Level::WARN => tracing::warn!(target: TRACE_TARGET_SCRIPT, "{message}"),
            Level::INFO => tracing::info!(target: TRACE_TARGET_SCRIPT, "{message}"),
            Level::DEBUG => tracing::debug!(target: TRACE_TARGET_SCRIPT, "{message}"),
            Level::TRACE => tracing::trace!(target: TRACE_TARGET_SCRIPT, "{message}"),
        }
    }
}

#[async_trait::async_trait]
impl<T: Host + ?Sized> Host for Arc<T> {
    async fn http_request(&self, req: HttpRequest) -> core::result::Result<HttpResponse, BoxError> {
        (**self).http_request(req).await
    }

    fn console(&self, level: Level, message: &str) {
        (**self).console(level, message);
    }
}

/// Host backed by the reqwest client of `jsbridge-request`.
#[derive(Clone, Debug)]
pub struct DefaultHost {
    client: Client,
}

impl DefaultHost {
    /// # Errors
    /// Returns [`Error::Transport`] if the HTTP client cannot be built.
    pub fn new() -> Result<Self> {
        Self::from_config(&ClientConfig::default())
    }

    /// # Errors
    /// Returns [`Error::Transport`] if the HTTP client cannot be built.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let client = Client::from_config(config).map_err(|e| Error::Transport(Box::new(e)))?;
        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl Host for DefaultHost {
    async fn http_request(&self, req: HttpRequest) -> core::result::Result<HttpResponse, BoxError> {
        Ok(self.client.send(req).await?)
    }
}
