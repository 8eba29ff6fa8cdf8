//! Bootstrap utilities for the salesdesk binary.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LOG_ENV_VAR;

/// Initialize tracing with SALESDESK_LOG environment variable.
///
/// Defaults to "info" level if SALESDESK_LOG is not set.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_env(LOG_ENV_VAR)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Config file path from `--config <path>` or `--config=<path>`.
pub fn parse_config_path() -> Option<String> {
    config_path_from(std::env::args().skip(1))
}

fn config_path_from(mut args: impl Iterator<Item = String>) -> Option<String> {
    while let Some(arg) = args.next() {
        if arg == "--config" || arg == "-c" {
            return args.next();
        }
        if let Some(path) = arg.strip_prefix("--config=") {
            return Some(path.to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> impl Iterator<Item = String> {
        list.iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .into_iter()
    }

    #[test]
    fn test_config_path_forms() {
        assert_eq!(
            config_path_from(args(&["--config", "a.yaml"])).as_deref(),
            Some("a.yaml")
        );
        assert_eq!(
            config_path_from(args(&["-c", "b.yaml"])).as_deref(),
            Some("b.yaml")
        );
        assert_eq!(
            config_path_from(args(&["--verbose", "--config=c.yaml"])).as_deref(),
            Some("c.yaml")
        );
        assert_eq!(config_path_from(args(&[])), None);
        assert_eq!(config_path_from(args(&["--config"])), None);
    }
}
