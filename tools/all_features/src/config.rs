use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use footprint_core::PipelineConfig;
use serde::{Deserialize, Serialize};

/// One batch job: where to read, where to write, and the pipeline tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    /// Source GeoJSON FeatureCollection.
    pub source: PathBuf,
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,
    /// Destination table name; written as `<results_dir>/<table>.geojson`.
    #[serde(default = "default_table")]
    pub table: String,
    #[serde(flatten)]
    pub pipeline: PipelineConfig,
}

fn default_results_dir() -> PathBuf {
    PathBuf::from("results")
}

fn default_table() -> String {
    "all_features".to_string()
}

impl JobConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let cfg: JobConfig = serde_json::from_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        cfg.pipeline
            .validate()
            .with_context(|| format!("validating config {}", path.display()))?;
        Ok(cfg)
    }

    pub fn destination(&self) -> PathBuf {
        self.results_dir.join(format!("{}.geojson", self.table))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_source_is_required() {
        let cfg: JobConfig = serde_json::from_str(r#"{ "source": "buildings.geojson" }"#).unwrap();
        assert_eq!(cfg.source, PathBuf::from("buildings.geojson"));
        assert_eq!(cfg.destination(), PathBuf::from("results/all_features.geojson"));
        assert_eq!(cfg.pipeline, PipelineConfig::default());
    }

    #[test]
    fn pipeline_keys_sit_at_top_level() {
        let cfg: JobConfig = serde_json::from_str(
            r#"{ "source": "b.geojson", "table": "lagos", "radius": 100.0, "workers": 4, "partitions": 8 }"#,
        )
        .unwrap();
        assert_eq!(cfg.table, "lagos");
        assert_eq!(cfg.pipeline.radius, 100.0);
        assert_eq!(cfg.pipeline.workers, 4);
        assert_eq!(cfg.pipeline.partitions, 8);
    }

    #[test]
    fn missing_source_is_rejected() {
        assert!(serde_json::from_str::<JobConfig>("{}").is_err());
    }

    #[test]
    fn load_validates_pipeline_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("job.json");
        std::fs::write(&path, r#"{ "source": "b.geojson", "partitions": 0 }"#).unwrap();
        let err = JobConfig::load(&path).unwrap_err();
        assert!(format!("{err:#}").contains("partitions must be at least 1"));
    }
}
