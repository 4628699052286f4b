//! Bridge configuration.
//!
//! Everything has a usable default; hosts override through the process
//! environment or by building the structs directly.
//!
//! | Variable                         | Field                       |
//! |----------------------------------|-----------------------------|
//! | `INPUT_BRIDGE_EP_NAME`           | `entrypoint.name`           |
//! | `INPUT_BRIDGE_MAX_CONTEXTS`      | `entrypoint.max_contexts`   |
//! | `INPUT_BRIDGE_SESSION_CAPACITY`  | `session_capacity`          |
//! | `INPUT_BRIDGE_LOG`               | `log_filter`                |

use crate::error::ConfigError;

// =============================================================================
// CONSTANTS
// =============================================================================

/// Default dispatch thread name.
pub const DEFAULT_EP_NAME: &str = "signal-ep";

/// Default upper bound of live signal contexts per entrypoint.
pub const DEFAULT_MAX_CONTEXTS: usize = 1024;

/// Default number of records in a local session dataspace.
pub const DEFAULT_SESSION_CAPACITY: usize = 64;

pub const ENV_EP_NAME: &str = "INPUT_BRIDGE_EP_NAME";
pub const ENV_MAX_CONTEXTS: &str = "INPUT_BRIDGE_MAX_CONTEXTS";
pub const ENV_SESSION_CAPACITY: &str = "INPUT_BRIDGE_SESSION_CAPACITY";
pub const ENV_LOG: &str = "INPUT_BRIDGE_LOG";

// =============================================================================
// Types
// =============================================================================

/// Entrypoint settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntrypointConfig {
    /// Name of the dispatch thread (spawned entrypoints only).
    pub name: String,
    /// Maximum number of live signal contexts.
    pub max_contexts: usize,
}

impl Default for EntrypointConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_EP_NAME.to_string(),
            max_contexts: DEFAULT_MAX_CONTEXTS,
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    pub entrypoint: EntrypointConfig,
    pub session_capacity: usize,
    /// `EnvFilter` directive for [`crate::logging::init`].
    pub log_filter: Option<String>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            entrypoint: EntrypointConfig::default(),
            session_capacity: DEFAULT_SESSION_CAPACITY,
            log_filter: None,
        }
    }
}

impl BridgeConfig {
    /// Read overrides from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read overrides through `lookup`; missing keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(name) = lookup(ENV_EP_NAME) {
            let name = name.trim();
            if name.is_empty() {
                return Err(ConfigError::Invalid { key: ENV_EP_NAME, value: name.to_string() });
            }
            config.entrypoint.name = name.to_string();
        }
        if let Some(raw) = lookup(ENV_MAX_CONTEXTS) {
            config.entrypoint.max_contexts = parse_count(ENV_MAX_CONTEXTS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_SESSION_CAPACITY) {
            config.session_capacity = parse_count(ENV_SESSION_CAPACITY, &raw)?;
        }
        config.log_filter = lookup(ENV_LOG).filter(|f| !f.trim().is_empty());

        Ok(config)
    }
}

/// Parse a strictly positive count.
fn parse_count(key: &'static str, raw: &str) -> Result<usize, ConfigError> {
    match raw.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::Invalid { key, value: raw.to_string() }),
    }
}
