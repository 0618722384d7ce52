use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Buffer radius in the input CRS linear unit (metres).
pub const DEFAULT_RADIUS: f64 = 250.0;
pub const DEFAULT_WORKERS: usize = 20;
pub const DEFAULT_PARTITIONS: usize = 20;

/// Tunables for the neighbourhood phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Neighbourhood radius, inclusive.
    pub radius: f64,
    /// Size of the worker pool.
    pub workers: usize,
    /// Number of contiguous row partitions dispatched to the pool.
    pub partitions: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            radius: DEFAULT_RADIUS,
            workers: DEFAULT_WORKERS,
            partitions: DEFAULT_PARTITIONS,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), PipelineError> {
        if !self.radius.is_finite() || self.radius < 0.0 {
            return Err(PipelineError::InvalidConfig(format!(
                "radius must be a finite non-negative number, got {}",
                self.radius
            )));
        }
        if self.workers == 0 {
            return Err(PipelineError::InvalidConfig("workers must be at least 1".into()));
        }
        if self.partitions == 0 {
            return Err(PipelineError::InvalidConfig("partitions must be at least 1".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_yields_defaults() {
        let cfg: PipelineConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg, PipelineConfig::default());
        assert_eq!(cfg.radius, 250.0);
        assert_eq!(cfg.workers, 20);
        assert_eq!(cfg.partitions, 20);
    }

    #[test]
    fn partial_json_overrides_only_given_fields() {
        let cfg: PipelineConfig = serde_json::from_str(r#"{"radius": 100.0}"#).unwrap();
        assert_eq!(cfg.radius, 100.0);
        assert_eq!(cfg.workers, DEFAULT_WORKERS);
    }

    #[test]
    fn validate_rejects_bad_values() {
        let bad = [
            PipelineConfig { radius: f64::NAN, ..Default::default() },
            PipelineConfig { radius: -1.0, ..Default::default() },
            PipelineConfig { workers: 0, ..Default::default() },
            PipelineConfig { partitions: 0, ..Default::default() },
        ];
        for cfg in bad {
            assert!(cfg.validate().is_err(), "{cfg:?} should be rejected");
        }
        assert!(PipelineConfig::default().validate().is_ok());
    }
}
