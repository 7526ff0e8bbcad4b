//! Structured debug logging system

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is not set
pub const DEFAULT_FILTER: &str = "camrec=debug,camrec_core=info,camrec_media=info";

/// Debug logger for structured logging
#[derive(Debug, Clone)]
pub struct DebugLogger {
    filter: Option<String>,
    with_target: bool,
}

impl DebugLogger {
    /// Logger using `RUST_LOG`, falling back to [`DEFAULT_FILTER`]
    pub fn new() -> Self {
        Self {
            filter: None,
            with_target: true,
        }
    }

    /// Override the filter directive
    pub fn with_filter(mut self, filter: &str) -> Self {
        self.filter = Some(filter.to_string());
        self
    }

    /// Include the module target in each line
    pub fn with_target(mut self, enabled: bool) -> Self {
        self.with_target = enabled;
        self
    }

    /// Explicit filter directive; `None` means `RUST_LOG` decides
    pub fn filter(&self) -> Option<&str> {
        self.filter.as_deref()
    }

    fn env_filter(&self) -> EnvFilter {
        match &self.filter {
            Some(directive) => EnvFilter::try_new(directive).unwrap_or_else(|e| {
                eprintln!("Invalid log filter {:?} ({}), using default", directive, e);
                EnvFilter::new(DEFAULT_FILTER)
            }),
            None => EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
        }
    }

    /// Install the global subscriber
    ///
    /// Returns `false` if a subscriber was already installed; that is not an
    /// error, so tests and embedding apps can call this freely.
    pub fn install(&self) -> bool {
        tracing_subscriber::registry()
            .with(self.env_filter())
            .with(tracing_subscriber::fmt::layer().with_target(self.with_target))
            .try_init()
            .is_ok()
    }

    /// Initialize logging system with defaults
    pub fn init_logging() -> bool {
        Self::new().install()
    }

    /// Initialize logging system with an explicit filter
    pub fn init_logging_with(filter: &str) -> bool {
        Self::new().with_filter(filter).install()
    }
}

impl Default for DebugLogger {
    fn default() -> Self {
        Self::new()
    }
}
