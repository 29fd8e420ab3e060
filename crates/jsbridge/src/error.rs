use thiserror::Error;

use crate::host::BoxError;

pub type Result<T, E = Error> = core::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum Error {
    /// A capability function was called with a missing or malformed argument.
    #[error("invalid argument: {0}")]
    Argument(String),

    /// DNS, connection, TLS or timeout failure while talking to the network.
    #[error("fetch failed: {0}")]
    Transport(#[source] BoxError),

    /// The server answered with a status of 400 or above.
    #[error("{code}: {description}")]
    HttpStatus { code: u16, description: String },

    /// Syntax or runtime error raised by the script engine.
    #[error("script error: {message}")]
    Script {
        message: String,
        stack: Option<String>,
    },

    /// The marshaled tree does not match the requested host type.
    #[error("deserialization error: {0}")]
    Deserialize(#[source] serde_json::Error),

    /// A script value has no tree representation (e.g. a circular object).
    #[error("value cannot be marshaled: {0}")]
    Marshal(String),

    #[error("invalid JSON: {0}")]
    Json(#[source] serde_json::Error),

    #[error("fn {0} not found")]
    FunctionNotFound(String),

    /// Session construction failed in strict bootstrap mode.
    #[error("bootstrap failed ({what}): {source}")]
    Bootstrap {
        what: String,
        #[source]
        source: Box<Error>,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("engine error: {0}")]
    Engine(String),

    /// The background evaluation task panicked or was cancelled.
    #[error("evaluation task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl Error {
    /// The `name` given to the exception object when this error is thrown
    /// into a script.
    pub(crate) const fn script_name(&self) -> &'static str {
        match self {
            Self::Argument(_) => "TypeError",
            Self::Transport(_) => "FetchError",
            Self::HttpStatus { .. } => "HttpStatusError",
            Self::Json(_) => "SyntaxError",
            Self::Io(_) => "ImportError",
            _ => "Error",
        }
    }

    pub(crate) fn engine(err: &rquickjs::Error) -> Self {
        Self::Engine(err.to_string())
    }
}
