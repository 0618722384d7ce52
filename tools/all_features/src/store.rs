//! GeoJSON file store: one FeatureCollection in, one FeatureCollection out.
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use footprint_core::{FeatureRow, FeatureSink, FeatureSource};
use geo::{Geometry, LineString, Polygon};
use geojson::{Feature, FeatureCollection, GeoJson};
use tracing::{debug, warn};

pub struct GeoJsonSource {
    path: PathBuf,
}

impl GeoJsonSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl FeatureSource for GeoJsonSource {
    fn load(&mut self) -> Result<Vec<FeatureRow>> {
        let file = File::open(&self.path).with_context(|| format!("opening {}", self.path.display()))?;
        let geojson: GeoJson = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("parsing {}", self.path.display()))?;
        let collection = match geojson {
            GeoJson::FeatureCollection(fc) => fc,
            GeoJson::Feature(_) => bail!("{}: expected a FeatureCollection, found a single Feature", self.path.display()),
            GeoJson::Geometry(_) => bail!("{}: expected a FeatureCollection, found a bare Geometry", self.path.display()),
        };

        let mut rows = Vec::with_capacity(collection.features.len());
        for (index, feature) in collection.features.into_iter().enumerate() {
            let properties = feature.properties.unwrap_or_default();
            let geometry = match feature.geometry {
                Some(g) => Geometry::<f64>::try_from(g).with_context(|| format!("feature {index}: converting geometry"))?,
                None => {
                    warn!(row = index, "null geometry read as an empty polygon");
                    empty_polygon()
                }
            };
            rows.push(FeatureRow::new(index, geometry, properties));
        }
        debug!(rows = rows.len(), path = %self.path.display(), "source read");
        Ok(rows)
    }
}

/// Writes the whole table to one file, replacing whatever was there.
pub struct GeoJsonSink {
    path: PathBuf,
}

impl GeoJsonSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl FeatureSink for GeoJsonSink {
    fn persist(&mut self, rows: &[FeatureRow]) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
        }

        let features = rows
            .iter()
            .map(|row| {
                let mut properties = row.properties.clone();
                properties.extend(row.derived_columns());
                Feature {
                    bbox: None,
                    geometry: Some(geojson::Geometry::new(geojson::Value::from(&row.geometry))),
                    id: None,
                    properties: Some(properties),
                    foreign_members: None,
                }
            })
            .collect();
        let collection = FeatureCollection {
            bbox: None,
            features,
            foreign_members: None,
        };

        let file = File::create(&self.path).with_context(|| format!("creating {}", self.path.display()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, &collection)
            .with_context(|| format!("writing {}", self.path.display()))?;
        writer.flush().with_context(|| format!("flushing {}", self.path.display()))?;
        debug!(rows = rows.len(), path = %self.path.display(), "results written");
        Ok(())
    }
}

fn empty_polygon() -> Geometry<f64> {
    Geometry::Polygon(Polygon::new(LineString::new(vec![]), vec![]))
}
