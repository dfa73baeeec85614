//! Configuration for session garbage collection.

use std::time::Duration;

/// Default lifetime of an untouched session (24 minutes).
pub const DEFAULT_MAX_LIFETIME: Duration = Duration::from_secs(1440);

/// Default interval between background GC passes.
pub const DEFAULT_GC_INTERVAL: Duration = Duration::from_secs(60);

/// Configuration for the manager's background GC task.
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Sessions untouched for longer than this are reset by GC.
    pub max_lifetime: Duration,

    /// Interval for the GC task (if enabled).
    pub gc_interval: Duration,

    /// Whether to run periodic GC in the background.
    /// If false, callers invoke `Manager::gc` themselves.
    pub enable_gc_task: bool,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            max_lifetime: DEFAULT_MAX_LIFETIME,
            gc_interval: DEFAULT_GC_INTERVAL,
            enable_gc_task: true,
        }
    }
}

impl ManagerConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the session lifetime used by GC.
    pub fn with_max_lifetime(mut self, max_lifetime: Duration) -> Self {
        self.max_lifetime = max_lifetime;
        self
    }

    /// Set the GC interval.
    pub fn with_gc_interval(mut self, interval: Duration) -> Self {
        self.gc_interval = interval;
        self
    }

    /// Enable or disable the background GC task.
    pub fn with_gc_task(mut self, enabled: bool) -> Self {
        self.enable_gc_task = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_overrides_defaults() {
        let config = ManagerConfig::new()
            .with_max_lifetime(Duration::from_secs(5))
            .with_gc_interval(Duration::from_millis(250))
            .with_gc_task(false);

        assert_eq!(config.max_lifetime, Duration::from_secs(5));
        assert_eq!(config.gc_interval, Duration::from_millis(250));
        assert!(!config.enable_gc_task);
        assert!(ManagerConfig::default().enable_gc_task);
    }
}
