//! Structured logging setup.
//!
//! The library only emits `tracing` events. Hosts that have no subscriber of
//! their own call [`init`] once (the C ABI exposes it as
//! `input_bridge_init_logging`).

use std::sync::OnceLock;

use tracing_subscriber::EnvFilter;

use crate::config::ENV_LOG;

static INSTALLED: OnceLock<bool> = OnceLock::new();

/// Install a fmt subscriber writing to stderr.
///
/// `filter` takes precedence over `INPUT_BRIDGE_LOG`; without either the
/// level is `warn`. Returns `true` if this call installed the subscriber.
/// Later calls, or a subscriber installed elsewhere, leave things as they are.
pub fn init(filter: Option<&str>) -> bool {
    let mut installed_now = false;
    INSTALLED.get_or_init(|| {
        let filter = match filter {
            Some(directives) => EnvFilter::new(directives),
            None => EnvFilter::try_from_env(ENV_LOG).unwrap_or_else(|_| EnvFilter::new("warn")),
        };
        installed_now = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_thread_names(true)
            .try_init()
            .is_ok();
        installed_now
    });
    installed_now
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        let _ = init(Some("input_bridge=trace"));
        assert!(!init(Some("warn")));
    }
}
