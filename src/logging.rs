//! Tracing subscriber setup for hosts that do not install their own.

use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::settings::Settings;

/// Environment variable that overrides the filter passed to [`init_tracing`].
pub const LOG_ENV: &str = "MODELGRAPH_LOG";

/// Filter to use: `MODELGRAPH_LOG` if set and parseable, else `default_filter`.
pub fn env_filter(default_filter: &str) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_filter))
}

/// Install a global fmt subscriber.
///
/// Returns `false` if a global subscriber is already set.
pub fn init_tracing(default_filter: &str) -> bool {
    tracing_subscriber::registry()
        .with(env_filter(default_filter))
        .with(fmt::layer().with_target(true))
        .try_init()
        .is_ok()
}

/// Filter for `settings.log_filter`, still overridable by `MODELGRAPH_LOG`.
pub fn settings_filter(settings: &Settings) -> EnvFilter {
    env_filter(&settings.log_filter)
}

/// [`init_tracing`] with the filter from `settings`.
pub fn init_from_settings(settings: &Settings) -> bool {
    init_tracing(&settings.log_filter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_reports_false() {
        init_tracing("modelgraph=debug");
        assert!(!init_tracing("modelgraph=debug"));
        assert!(!init_from_settings(&Settings::default()));
    }

    #[test]
    fn test_settings_filter_uses_log_filter() {
        let settings = Settings {
            log_filter: "modelgraph=trace".to_string(),
            ..Settings::default()
        };
        let filter = settings_filter(&settings).to_string();
        match std::env::var(LOG_ENV) {
            Ok(env) => assert_eq!(filter, EnvFilter::new(env).to_string()),
            Err(_) => assert_eq!(filter, "modelgraph=trace"),
        }
    }
}
