use std::time::Duration;

/// Configuration for the `SystemResolver`.
#[derive(Debug, Copy, Clone)]
pub struct Config {
    /// The timeout for DNS resolution.
    pub timeout: Duration,
}

impl Config {
    /// Create a `Config`.
    #[must_use]
    pub const fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(5000),
        }
    }
}
