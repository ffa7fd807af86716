//! Tracing/logging initialization.

use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// JSON lines with timestamps (production).
    Json,
    /// Human-readable text (development).
    Text,
}

impl LogFormat {
    pub fn from_mode(mode: &str) -> Self {
        match mode {
            "prod" | "production" => LogFormat::Json,
            _ => LogFormat::Text,
        }
    }

    fn default_filter(self) -> &'static str {
        match self {
            LogFormat::Json => "info",
            LogFormat::Text => "debug",
        }
    }
}

/// Initialize tracing/logging for the process. `RUST_LOG` overrides the
/// per-format default level.
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format.default_filter()));

    let _ = match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .with_timer(tracing_subscriber::fmt::time::SystemTime)
            .with_target(false)
            .try_init(),
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .try_init(),
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn production_modes_log_json() {
        assert_eq!(LogFormat::from_mode("prod"), LogFormat::Json);
        assert_eq!(LogFormat::from_mode("production"), LogFormat::Json);
        assert_eq!(LogFormat::from_mode("dev"), LogFormat::Text);
    }

    #[test]
    fn init_twice_is_harmless() {
        init(LogFormat::Text);
        init(LogFormat::Text);
    }
}
