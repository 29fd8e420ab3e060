//! Embedding bridge between host code and a JavaScript engine.
//!
//! A [`Session`] owns one script engine whose global scope carries host
//! capabilities: `console.*`, `fetch`, `xhr`, `atob`/`btoa`, `import()` and
//! `importScripts`. Values cross the boundary as a marshaled [`Value`] tree
//! and are decoded into caller-named types with serde.
//!
//! ```no_run
//! # async fn demo() -> jsbridge::Result<()> {
//! let mut session = jsbridge::Session::builder()
//!     .root_dir("scripts")
//!     .property("limit", &10)
//!     .build()?;
//! let n: i64 = session.evaluate("limit * 2").await?;
//! let title: String = session
//!     .evaluate("fetch('https://example.com').html().title()")
//!     .await?;
//! # Ok(())
//! # }
//! ```

mod capability;
mod charset;
pub mod config;
pub mod error;
pub mod host;
mod http;
mod marshal;
pub mod session;
pub mod value;

/// Tracing target of script `console.*` output.
pub const TRACE_TARGET_SCRIPT: &str = "jsbridge::script";

pub use config::SessionConfig;
pub use error::{Error, Result};
pub use host::{BoxError, DefaultHost, Host, HttpRequest, HttpResponse};
pub use jsbridge_request::ClientConfig;
pub use session::{Arg, Script, Session, SessionBuilder};
pub use value::{Value, ValueKind};
