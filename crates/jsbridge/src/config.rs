use std::path::PathBuf;

use jsbridge_request::ClientConfig;
use serde::Deserialize;

const DEFAULT_MAX_STACK_SIZE: usize = 2 * 1024 * 1024;

/// Per-session configuration.
///
/// Every field has a default, so a partial JSON document is enough:
///
/// ```
/// let config: jsbridge::SessionConfig =
///     serde_json::from_str(r#"{"root_dir": "/srv/scripts", "strict_bootstrap": true}"#).unwrap();
/// assert!(config.strict_bootstrap);
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Directory that `import()`, `importScripts()` and relative bootstrap
    /// paths are resolved against.
    pub root_dir: PathBuf,
    /// Fail session construction when a property or the bootstrap file
    /// cannot be installed, instead of logging and continuing.
    pub strict_bootstrap: bool,
    pub max_stack_size: usize,
    pub memory_limit: Option<usize>,
    pub http: ClientConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            root_dir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            strict_bootstrap: false,
            max_stack_size: DEFAULT_MAX_STACK_SIZE,
            memory_limit: None,
            http: ClientConfig::default(),
        }
    }
}
