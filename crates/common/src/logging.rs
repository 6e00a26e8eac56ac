//! Logging and tracing initialization.
//!
//! Events go to stderr so commands that print JSON on stdout stay
//! pipeable.

use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingConfig;

/// HTTP client internals are chatty at debug.
const QUIET_TARGETS: &[&str] = &["hyper=warn", "hyper_util=warn", "reqwest=warn", "rustls=warn"];

/// Filter from `RUST_LOG` when set, else `level` with HTTP internals
/// held at warn.
pub fn build_filter(level: &str) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    let mut directives = vec![level.to_string()];
    directives.extend(QUIET_TARGETS.iter().map(|t| t.to_string()));
    EnvFilter::try_new(directives.join(",")).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber. Returns `false` when one is already set.
pub fn init_logging(config: &LoggingConfig) -> bool {
    let filter = build_filter(&config.level);
    let builder = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let installed = if config.json {
        tracing::subscriber::set_global_default(builder.json().with_current_span(true).finish())
    } else {
        tracing::subscriber::set_global_default(
            builder
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .finish(),
        )
    };
    installed.is_ok()
}

/// CLI entry point: `verbose` raises the configured level to debug.
pub fn init_cli_logging(config: &LoggingConfig, verbose: bool) -> bool {
    if !verbose {
        return init_logging(config);
    }
    init_logging(&LoggingConfig {
        level: "debug".to_string(),
        ..config.clone()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_quiets_http_internals() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        let rendered = build_filter("debug").to_string();
        assert!(rendered.contains("debug"));
        assert!(rendered.contains("reqwest=warn"));
    }

    #[test]
    fn test_bad_level_falls_back() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        let rendered = build_filter("reelsmith=loud").to_string();
        assert!(rendered.contains("info"));
        assert!(!rendered.contains("reelsmith"));
    }

    #[test]
    fn test_second_init_reports_existing_subscriber() {
        let config = LoggingConfig::default();
        init_logging(&config);
        assert!(!init_cli_logging(&config, true));
    }
}
