//! Runner configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Bot runner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Scratch directory handed to every work item
    #[serde(rename = "scratch-dir")]
    pub scratch_dir: PathBuf,

    /// Max work items running at once
    #[serde(rename = "max-concurrent")]
    pub max_concurrent: usize,

    /// Seconds between two rounds of periodic items
    #[serde(rename = "period-secs")]
    pub period_secs: u64,
}

fn default_scratch_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("mirrorbot")
        .join("scratch")
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            scratch_dir: default_scratch_dir(),
            max_concurrent: 4,
            period_secs: 300,
        }
    }
}

impl RunnerConfig {
    /// Get the period as a Duration
    pub fn period(&self) -> Duration {
        Duration::from_secs(self.period_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RunnerConfig::default();
        assert_eq!(config.max_concurrent, 4);
        assert_eq!(config.period_secs, 300);
        assert!(config.scratch_dir.ends_with("mirrorbot/scratch"));
    }

    #[test]
    fn test_period_never_zero() {
        let config = RunnerConfig {
            period_secs: 0,
            ..Default::default()
        };
        assert_eq!(config.period(), Duration::from_secs(1));
    }

    #[test]
    fn test_parse_kebab_case() {
        let config: RunnerConfig = serde_yaml::from_str("max-concurrent: 2\nperiod-secs: 60\n").unwrap();
        assert_eq!(config.max_concurrent, 2);
        assert_eq!(config.period(), Duration::from_secs(60));
    }
}
