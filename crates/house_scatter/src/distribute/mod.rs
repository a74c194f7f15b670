//! Turning zone populations into household points on features.
//!
//! A [`FeatureCollection`] holds the candidate geometries tagged with their
//! zone and category; a [`Distributor`] configured by a [`DistributeConfig`]
//! allocates each zone's population onto those features and samples points
//! for every feature that received people.
use geo::Geometry;

use crate::allocation::ZoneId;

pub mod plan;
pub mod runner;

pub use plan::{DistributeConfig, Grouping, ShapeFilter, Support};
pub use runner::{distribute, distribute_with_events, DistributionResult, Distributor, RunSummary};

/// Reference system assumed when a collection does not name one.
pub const DEFAULT_CRS: &str = "EPSG:4326";

/// One candidate geometry with its zone and optional category label.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    /// `None` for rows whose geometry was missing in the source.
    pub geometry: Option<Geometry<f64>>,
    pub zone_id: ZoneId,
    /// Raw category cell; may hold several tags, e.g. `['residential', 'service']`.
    pub category: Option<String>,
}

impl Feature {
    pub fn new(geometry: impl Into<Geometry<f64>>, zone_id: impl Into<ZoneId>) -> Self {
        Self {
            geometry: Some(geometry.into()),
            zone_id: zone_id.into(),
            category: None,
        }
    }

    /// A feature without geometry.
    pub fn empty(zone_id: impl Into<ZoneId>) -> Self {
        Self {
            geometry: None,
            zone_id: zone_id.into(),
            category: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

/// Ordered features sharing one coordinate reference system.
///
/// The CRS is carried as metadata only; coordinates are never reprojected.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
    pub crs: String,
}

impl Default for FeatureCollection {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureCollection {
    pub fn new() -> Self {
        Self {
            features: Vec::new(),
            crs: DEFAULT_CRS.to_owned(),
        }
    }

    pub fn with_crs(mut self, crs: impl Into<String>) -> Self {
        self.crs = crs.into();
        self
    }

    pub fn with_feature(mut self, feature: Feature) -> Self {
        self.features.push(feature);
        self
    }

    pub fn push(&mut self, feature: Feature) {
        self.features.push(feature);
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Feature> {
        self.features.iter()
    }
}

impl FromIterator<Feature> for FeatureCollection {
    fn from_iter<I: IntoIterator<Item = Feature>>(iter: I) -> Self {
        Self {
            features: iter.into_iter().collect(),
            crs: DEFAULT_CRS.to_owned(),
        }
    }
}

impl<'a> IntoIterator for &'a FeatureCollection {
    type Item = &'a Feature;
    type IntoIter = std::slice::Iter<'a, Feature>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.iter()
    }
}
