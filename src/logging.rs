//! Logger setup

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Logger verbosity, named the way esbuild names its log levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Verbose,
    Debug,
    Info,
    Warning,
    Error,
    Silent,
}

impl LogLevel {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "verbose" => Some(LogLevel::Verbose),
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warning" => Some(LogLevel::Warning),
            "error" => Some(LogLevel::Error),
            "silent" => Some(LogLevel::Silent),
            _ => None,
        }
    }

    /// The tracing filter directive for this level
    pub fn directive(self) -> &'static str {
        match self {
            LogLevel::Verbose => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warn",
            LogLevel::Error => "error",
            LogLevel::Silent => "off",
        }
    }
}

/// Initialize the logging/tracing system
///
/// `RUST_LOG` takes precedence over the level derived from flags. Calling
/// this more than once keeps the first subscriber.
pub fn init_tracing(level: LogLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("yarn_esbuild={}", level.directive())));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_names() {
        for (name, directive) in [
            ("verbose", "trace"),
            ("debug", "debug"),
            ("info", "info"),
            ("warning", "warn"),
            ("error", "error"),
            ("silent", "off"),
        ] {
            assert_eq!(LogLevel::from_name(name).unwrap().directive(), directive);
        }
        assert_eq!(LogLevel::from_name("loud"), None);
    }
}
