//! Engine tuning knobs.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::memory::layout::{limits, timing};

/// Configuration shared by the live scanner and the offline matcher
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Milliseconds between locker rewrite passes
    pub lock_interval_ms: u64,
    /// Offers allowed at the current floor before the floor is raised
    pub fan_out: usize,
    /// Regions larger than this are skipped when searching differences
    pub max_diff_region: usize,
    /// Leave executable regions out of captured dumps
    pub dump_skip_executable: bool,
    /// Initial watchlist allocation
    pub watchlist_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lock_interval_ms: timing::LOCK_INTERVAL_MS,
            fan_out: limits::MATCH_FAN_OUT,
            max_diff_region: limits::MAX_DIFF_REGION_BYTES,
            dump_skip_executable: true,
            watchlist_capacity: limits::WATCHLIST_INITIAL_CAPACITY,
        }
    }
}

impl EngineConfig {
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    pub fn lock_interval(&self) -> Duration {
        Duration::from_millis(self.lock_interval_ms)
    }
}

/// Builder for EngineConfig
#[derive(Debug, Clone, Default)]
pub struct EngineConfigBuilder {
    lock_interval_ms: Option<u64>,
    fan_out: Option<usize>,
    max_diff_region: Option<usize>,
    dump_skip_executable: Option<bool>,
    watchlist_capacity: Option<usize>,
}

impl EngineConfigBuilder {
    pub fn lock_interval_ms(mut self, ms: u64) -> Self {
        self.lock_interval_ms = Some(ms);
        self
    }

    pub fn fan_out(mut self, fan_out: usize) -> Self {
        self.fan_out = Some(fan_out);
        self
    }

    pub fn max_diff_region(mut self, bytes: usize) -> Self {
        self.max_diff_region = Some(bytes);
        self
    }

    pub fn dump_skip_executable(mut self, skip: bool) -> Self {
        self.dump_skip_executable = Some(skip);
        self
    }

    pub fn watchlist_capacity(mut self, capacity: usize) -> Self {
        self.watchlist_capacity = Some(capacity);
        self
    }

    pub fn build(self) -> EngineConfig {
        let default = EngineConfig::default();
        EngineConfig {
            lock_interval_ms: self.lock_interval_ms.unwrap_or(default.lock_interval_ms),
            fan_out: self.fan_out.unwrap_or(default.fan_out),
            max_diff_region: self.max_diff_region.unwrap_or(default.max_diff_region),
            dump_skip_executable: self
                .dump_skip_executable
                .unwrap_or(default.dump_skip_executable),
            watchlist_capacity: self
                .watchlist_capacity
                .unwrap_or(default.watchlist_capacity),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.lock_interval_ms, 100);
        assert_eq!(config.fan_out, 25);
        assert_eq!(config.max_diff_region, 3_000_000);
        assert!(config.dump_skip_executable);
        assert_eq!(config.watchlist_capacity, 4096);
    }

    #[test]
    fn test_builder_overrides_only_given_fields() {
        let config = EngineConfig::builder().fan_out(3).lock_interval_ms(10).build();
        assert_eq!(config.fan_out, 3);
        assert_eq!(config.lock_interval(), Duration::from_millis(10));
        assert_eq!(config.max_diff_region, 3_000_000);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: EngineConfig = serde_json::from_str(r#"{"fan_out": 7}"#).unwrap();
        assert_eq!(config.fan_out, 7);
        assert_eq!(config.lock_interval_ms, 100);
    }
}
