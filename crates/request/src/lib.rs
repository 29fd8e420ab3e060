//! Async HTTP client used by the script bridge for `fetch` and `xhr`.
//!
//! The client always reads the full response body (bounded by
//! [`ClientConfig::max_body_bytes`]) so callers get the raw bytes and can
//! derive text, JSON or HTML views from one round trip.

mod client;
mod error;
mod http;
mod message;
mod trace;

pub use client::{Client, ClientBuilder, ClientConfig};
pub use error::Error;
pub use message::{Request, Response};
