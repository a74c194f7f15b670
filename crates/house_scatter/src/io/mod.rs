//! Reading features and populations from disk and writing sampled points.
//!
//! Every failure carries the path of the offending file.
use std::path::Path;

use crate::error::Error;

pub mod features;
pub mod points;
pub mod population;

pub use features::{read_features, read_features_csv, read_features_geojson};
pub use points::{read_points_csv, write_points_csv};
pub use population::{read_population_csv, PopulationColumns};

/// Names of the attribute columns (or GeoJSON properties) holding feature data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureColumns {
    /// WKT geometry column; ignored for GeoJSON input.
    pub geometry: String,
    pub zone: String,
    pub category: Option<String>,
}

impl Default for FeatureColumns {
    fn default() -> Self {
        Self {
            geometry: "geometry".to_owned(),
            zone: "zone".to_owned(),
            category: None,
        }
    }
}

impl FeatureColumns {
    /// Street edges tagged with `highway`.
    pub fn street() -> Self {
        Self::default().with_category("highway")
    }

    /// Building footprints tagged with `building`.
    pub fn building() -> Self {
        Self::default().with_category("building")
    }

    pub fn with_geometry(mut self, column: impl Into<String>) -> Self {
        self.geometry = column.into();
        self
    }

    pub fn with_zone(mut self, column: impl Into<String>) -> Self {
        self.zone = column.into();
        self
    }

    pub fn with_category(mut self, column: impl Into<String>) -> Self {
        self.category = Some(column.into());
        self
    }
}

pub(crate) fn open(path: &Path) -> Result<std::fs::File, Error> {
    std::fs::File::open(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub(crate) fn csv_error(path: &Path) -> impl Fn(csv::Error) -> Error + '_ {
    move |source| Error::Csv {
        path: path.to_path_buf(),
        source,
    }
}

pub(crate) fn column_index(
    headers: &csv::StringRecord,
    column: &str,
    path: &Path,
) -> Result<usize, Error> {
    headers
        .iter()
        .position(|h| h.trim() == column)
        .ok_or_else(|| Error::MissingColumn {
            path: path.to_path_buf(),
            column: column.to_owned(),
        })
}
