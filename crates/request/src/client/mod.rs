use tracing::Instrument;

use crate::{Error, Request, Response, trace::request_span};

mod builder;
mod config;

pub use builder::ClientBuilder;
pub use config::ClientConfig;

#[derive(Clone, Debug)]
pub struct Client {
    client: reqwest::Client,
    max_body_bytes: usize,
}

impl Client {
    /// Create a client with the default configuration.
    ///
    /// # Errors
    /// Returns an error if the TLS backend cannot be initialized.
    pub fn new() -> Result<Self, Error> {
        Self::builder().build()
    }

    /// Create a new client builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// # Errors
    /// Returns an error if the configuration cannot produce a client.
    pub fn from_config(config: &ClientConfig) -> Result<Self, Error> {
        Ok(Self {
            client: config.build_client()?,
            max_body_bytes: config.max_body_bytes,
        })
    }

    /// Send an HTTP request and buffer the whole response body.
    ///
    /// Status codes are not interpreted; a `404` is a successful round trip.
    ///
    /// # Errors
    /// Returns error on DNS, connection, TLS or timeout failures, or when the
    /// body exceeds the configured limit.
    pub async fn send(&self, request: Request) -> Result<Response, Error> {
        let span = request_span(&request);
        crate::http::http_impl(span.clone(), &self.client, request, self.max_body_bytes)
            .instrument(span)
            .await
    }
}
