//! Script sessions.
//!
//! Typical flow:
//! 1. Configure a [`SessionBuilder`]: root directory, host, properties and an
//!    optional bootstrap file.
//! 2. [`build`](SessionBuilder::build) it into a [`Session`].
//! 3. Evaluate scripts or call global functions; every call sees the globals
//!    left behind by earlier ones.
//! 4. [`close`](Session::close) (or drop) the session.
//!
//! Calls take `&mut self`, so one session never runs two scripts at once:
//!
//! ```compile_fail
//! async fn overlap(mut session: jsbridge::Session) {
//!     let first = session.evaluate_value("1");
//!     let second = session.evaluate_value("2");
//!     drop((first, second));
//! }
//! ```

mod args;
mod engine;

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use serde::{Serialize, de::DeserializeOwned};
use tracing::info_span;

pub use self::args::Arg;
use self::engine::Engine;
use crate::{
    config::SessionConfig,
    error::{Error, Result},
    host::{DefaultHost, Host},
    value::Value,
};

const DEFAULT_LABEL: &str = "<eval>";

/// Source text plus an optional label used in logs and spans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    text: String,
    label: Option<String>,
}

impl Script {
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            label: None,
        }
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or(DEFAULT_LABEL)
    }
}

impl From<&str> for Script {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for Script {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}

impl From<&String> for Script {
    fn from(text: &String) -> Self {
        Self::new(text.as_str())
    }
}

#[derive(Default)]
pub struct SessionBuilder {
    config: SessionConfig,
    host: Option<Arc<dyn Host>>,
    properties: Vec<(String, Result<Value>)>,
    bootstrap: Option<PathBuf>,
}

impl SessionBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole configuration.
    #[must_use]
    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn root_dir(mut self, root_dir: impl Into<PathBuf>) -> Self {
        self.config.root_dir = root_dir.into();
        self
    }

    /// Use `host` for HTTP and console output instead of [`DefaultHost`].
    #[must_use]
    pub fn host(mut self, host: impl Host) -> Self {
        self.host = Some(Arc::new(host));
        self
    }

    /// Install a global variable before the bootstrap file runs.
    #[must_use]
    pub fn property(mut self, name: impl Into<String>, value: &impl Serialize) -> Self {
        self.properties.push((name.into(), Value::from_serde(value)));
        self
    }

    /// Script file evaluated once at build time, relative to the root
    /// directory unless absolute.
    #[must_use]
    pub fn bootstrap(mut self, path: impl Into<PathBuf>) -> Self {
        self.bootstrap = Some(path.into());
        self
    }

    #[must_use]
    pub fn strict_bootstrap(mut self, strict: bool) -> Self {
        self.config.strict_bootstrap = strict;
        self
    }

    /// # Errors
    /// Returns an error if the engine or HTTP client cannot be created, or,
    /// in strict mode, if a property or the bootstrap file fails.
    pub fn build(self) -> Result<Session> {
        let Self {
            mut config,
            host,
            properties,
            bootstrap,
        } = self;

        config.root_dir = std::path::absolute(&config.root_dir)?;
        let host: Arc<dyn Host> = match host {
            Some(host) => host,
            None => Arc::new(DefaultHost::from_config(&config.http)?),
        };
        let engine = Engine::new(&config, host)?;
        let strict = config.strict_bootstrap;

        for (name, value) in properties {
            if let Err(err) = value.and_then(|value| engine.set_global(&name, &value)) {
                bootstrap_failure(strict, format!("property {name}"), err)?;
            }
        }

        if let Some(path) = bootstrap {
            let path = config.root_dir.join(path);
            if let Err(err) = engine.eval_file(&path) {
                bootstrap_failure(strict, format!("bootstrap file {}", path.display()), err)?;
            }
        }

        Ok(Session {
            engine: Arc::new(engine),
            root_dir: config.root_dir,
        })
    }
}

fn bootstrap_failure(strict: bool, what: String, err: Error) -> Result<()> {
    if strict {
        return Err(Error::Bootstrap {
            what,
            source: Box::new(err),
        });
    }
    tracing::warn!(error = %err, "{what} failed, continuing");
    Ok(())
}

/// A ready script engine with its own global scope.
///
/// The async methods run the engine on Tokio's blocking pool. The
/// `*_blocking` variants run it on the calling thread and block it until the
/// script finishes.
pub struct Session {
    engine: Arc<Engine>,
    root_dir: PathBuf,
}

impl Session {
    #[must_use]
    pub fn builder() -> SessionBuilder {
        SessionBuilder::new()
    }

    #[must_use]
    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// Evaluate `script` and decode its completion value into `T`.
    ///
    /// # Errors
    /// Script failures, uncaught host errors, and results that do not match `T`.
    pub async fn evaluate<T: DeserializeOwned>(&mut self, script: impl Into<Script>) -> Result<T> {
        self.evaluate_value(script).await?.to_serde()
    }

    /// # Errors
    /// See [`Session::evaluate`].
    pub async fn evaluate_value(&mut self, script: impl Into<Script>) -> Result<Value> {
        let script = script.into();
        let span = info_span!("jsbridge.eval", source = script.label());
        let engine = Arc::clone(&self.engine);
        tokio::task::spawn_blocking(move || span.in_scope(|| engine.eval(&script))).await?
    }

    /// # Errors
    /// See [`Session::evaluate`].
    pub fn evaluate_blocking<T: DeserializeOwned>(&mut self, script: impl Into<Script>) -> Result<T> {
        let script = script.into();
        let _span = info_span!("jsbridge.eval", source = script.label()).entered();
        self.engine.eval(&script)?.to_serde()
    }

    /// Call the global function `name`. Build `args` with [`args!`](crate::args).
    ///
    /// # Errors
    /// [`Error::FunctionNotFound`] if `name` is not a callable global, plus
    /// everything [`Session::evaluate`] can return.
    pub async fn call_function<T: DeserializeOwned>(
        &mut self,
        name: &str,
        args: impl IntoIterator<Item = Arg>,
    ) -> Result<T> {
        self.call_function_value(name, args).await?.to_serde()
    }

    /// # Errors
    /// See [`Session::call_function`].
    pub async fn call_function_value(
        &mut self,
        name: &str,
        args: impl IntoIterator<Item = Arg>,
    ) -> Result<Value> {
        let span = info_span!("jsbridge.call", function = name);
        let name = name.to_owned();
        let args: Vec<Arg> = args.into_iter().collect();
        let engine = Arc::clone(&self.engine);
        tokio::task::spawn_blocking(move || span.in_scope(|| engine.call(&name, args))).await?
    }

    /// # Errors
    /// See [`Session::call_function`].
    pub fn call_function_blocking<T: DeserializeOwned>(
        &mut self,
        name: &str,
        args: impl IntoIterator<Item = Arg>,
    ) -> Result<T> {
        let _span = info_span!("jsbridge.call", function = name).entered();
        self.engine.call(name, args.into_iter().collect())?.to_serde()
    }

    /// Release the engine. Dropping the session does the same.
    pub fn close(self) {
        tracing::debug!(root = %self.root_dir.display(), "session closed");
    }
}
