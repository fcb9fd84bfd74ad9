use std::time::Duration;

/// Timing knobs for field extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractionConfig {
    /// Upper bound on how long a bounded-wait field is polled for.
    pub wait_timeout: Duration,

    /// Pause between two lookups of the same bounded-wait field.
    pub poll_interval: Duration,
}

impl ExtractionConfig {
    pub fn new(wait_timeout: Duration) -> Self {
        Self {
            wait_timeout,
            ..Self::default()
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}

impl Default for ExtractionConfig {
    /// 20 second bound, polled every 500ms.
    fn default() -> Self {
        Self {
            wait_timeout: Duration::from_secs(20),
            poll_interval: Duration::from_millis(500),
        }
    }
}
