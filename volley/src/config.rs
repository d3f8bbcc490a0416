//! Engine configuration.

use crate::error::EngineResult;
use serde::{Deserialize, Serialize};
use volley_pool::SEGMENT_DEFAULT_SIZE;

/// Flags controlling how `execute` runs a submitted batch.
///
/// Defaults: fork into one worker per core, pin workers to CPUs, 30 second
/// wall-clock timeout per worker, no shared memory unless asked for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Allocate a shared-memory record log per worker.
    pub use_shm: bool,
    /// Fork worker processes; when false the batch runs in-process.
    pub fork_safe: bool,
    /// Pin each worker to a CPU core, round-robin.
    pub pin_cpu: bool,
    /// One instruction per worker: slower, but a timeout loses at most one.
    pub slow_parallel: bool,
    /// Per-worker SIGALRM timeout in seconds.
    pub timeout_seconds: u32,
    /// Size of each worker's shared segment in bytes.
    pub shm_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            use_shm: false,
            fork_safe: true,
            pin_cpu: true,
            slow_parallel: false,
            timeout_seconds: 30,
            shm_size: SEGMENT_DEFAULT_SIZE,
        }
    }
}

impl EngineConfig {
    /// Parse a configuration from TOML; missing keys keep their defaults.
    pub fn from_toml_str(s: &str) -> EngineResult<Self> {
        Ok(toml::from_str(s)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fork_per_core_without_shm() {
        let cfg = EngineConfig::default();
        assert!(!cfg.use_shm);
        assert!(cfg.fork_safe);
        assert!(cfg.pin_cpu);
        assert!(!cfg.slow_parallel);
        assert_eq!(cfg.timeout_seconds, 30);
        assert_eq!(cfg.shm_size, SEGMENT_DEFAULT_SIZE);
    }

    #[test]
    fn toml_overrides_only_named_keys() {
        let cfg = EngineConfig::from_toml_str(
            r#"
            use_shm = true
            timeout_seconds = 5
            "#,
        )
        .unwrap();

        assert!(cfg.use_shm);
        assert_eq!(cfg.timeout_seconds, 5);
        // Untouched keys keep their defaults.
        assert!(cfg.fork_safe);
        assert_eq!(cfg.shm_size, SEGMENT_DEFAULT_SIZE);
    }

    #[test]
    fn toml_round_trip() {
        let cfg = EngineConfig {
            slow_parallel: true,
            timeout_seconds: 2,
            ..EngineConfig::default()
        };

        let text = toml::to_string(&cfg).unwrap();
        let back = EngineConfig::from_toml_str(&text).unwrap();
        assert_eq!(back, cfg);
    }

    #[test]
    fn invalid_toml_is_a_config_error() {
        let res = EngineConfig::from_toml_str("timeout_seconds = \"soon\"");
        assert!(matches!(res, Err(crate::EngineError::Config { .. })));
    }
}
