use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::EnvConfig;

/// 日志配置
///
/// `RUST_LOG` wins over `fallback_filter`; `PROCESSFLOW_DEBUG` switches to
/// verbose output with source locations.
#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub debug: bool,
    pub fallback_filter: String,
}

impl LoggingConfig {
    pub fn from_env() -> Self {
        Self::with_debug(EnvConfig::is_debug_mode())
    }

    pub fn with_debug(debug: bool) -> Self {
        let fallback_filter = if debug {
            "processflow=debug,info"
        } else {
            "processflow=info,warn"
        };
        Self {
            debug,
            fallback_filter: fallback_filter.to_string(),
        }
    }

    /// Installs the subscriber described by the environment.
    pub fn init() {
        Self::from_env().install();
    }

    pub fn install(&self) {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&self.fallback_filter));
        let layer = fmt::layer()
            .with_target(self.debug)
            .with_file(self.debug)
            .with_line_number(self.debug);

        // a second install (tests, embedding hosts) keeps the first subscriber
        if tracing_subscriber::registry()
            .with(filter)
            .with(layer)
            .try_init()
            .is_ok()
        {
            tracing::debug!(debug = self.debug, "logging installed");
        }
    }
}
