//! Configuration of a distribution run.
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::allocation::{CategoryWeights, OrphanPolicy};
use crate::error::Result;
use crate::sampling::{SamplingLimits, SamplingMethod, Shape};

/// How a zone's population is partitioned before the per-feature split.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub enum Grouping {
    /// Split by category weights first; only features whose category resolves
    /// to one of the weighted categories take part.
    Weighted(CategoryWeights),
    /// Treat all features of a zone as one group.
    Zone,
}

/// Which geometry families a run accepts.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ShapeFilter {
    #[default]
    Any,
    AreasOnly,
    LinesOnly,
}

impl ShapeFilter {
    pub fn accepts(&self, shape: &Shape) -> bool {
        match self {
            ShapeFilter::Any => shape.is_area() || shape.is_line(),
            ShapeFilter::AreasOnly => shape.is_area(),
            ShapeFilter::LinesOnly => shape.is_line(),
        }
    }
}

/// The spatial support households are placed on.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Support {
    /// Street segments weighted by street type.
    Streets,
    /// Building footprints, split uniformly per zone.
    Buildings,
    /// Zone polygons, split uniformly per zone.
    Areas,
}

impl Support {
    /// Preset configuration for this support.
    pub fn config(&self, method: SamplingMethod) -> DistributeConfig {
        match self {
            Support::Streets => DistributeConfig::new(method)
                .with_grouping(Grouping::Weighted(CategoryWeights::street_network()))
                .with_shape_filter(ShapeFilter::LinesOnly),
            Support::Buildings | Support::Areas => DistributeConfig::new(method)
                .with_grouping(Grouping::Zone)
                .with_shape_filter(ShapeFilter::AreasOnly),
        }
    }

    /// Default output file name for points produced on this support.
    pub fn output_file_name(&self, method: SamplingMethod) -> String {
        match self {
            Support::Streets => "sampled_houses_streets.csv".to_owned(),
            Support::Buildings => "sampled_houses_buildings.csv".to_owned(),
            Support::Areas => format!("sampled_houses_area_{method}.csv"),
        }
    }
}

impl std::str::FromStr for Support {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "streets" | "street" => Ok(Support::Streets),
            "buildings" | "building" => Ok(Support::Buildings),
            "areas" | "area" => Ok(Support::Areas),
            other => Err(crate::error::Error::InvalidConfig(format!(
                "unknown support '{other}' (expected streets, buildings or areas)"
            ))),
        }
    }
}

/// Configuration for [`crate::distribute::Distributor`].
#[non_exhaustive]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct DistributeConfig {
    pub method: SamplingMethod,
    pub grouping: Grouping,
    pub limits: SamplingLimits,
    pub orphan_policy: OrphanPolicy,
    pub shape_filter: ShapeFilter,
}

impl Default for DistributeConfig {
    fn default() -> Self {
        Self {
            method: SamplingMethod::Uniform,
            grouping: Grouping::Zone,
            limits: SamplingLimits::default(),
            orphan_policy: OrphanPolicy::default(),
            shape_filter: ShapeFilter::Any,
        }
    }
}

impl DistributeConfig {
    pub fn new(method: SamplingMethod) -> Self {
        Self {
            method,
            ..Default::default()
        }
    }

    /// Sets the method from its name, failing on unknown names.
    pub fn with_method_name(mut self, name: &str) -> Result<Self> {
        self.method = name.parse()?;
        Ok(self)
    }

    pub fn with_grouping(mut self, grouping: Grouping) -> Self {
        self.grouping = grouping;
        self
    }

    pub fn with_limits(mut self, limits: SamplingLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_max_batches(mut self, max_batches: usize) -> Self {
        self.limits.max_batches = max_batches;
        self
    }

    pub fn with_orphan_policy(mut self, policy: OrphanPolicy) -> Self {
        self.orphan_policy = policy;
        self
    }

    pub fn with_shape_filter(mut self, filter: ShapeFilter) -> Self {
        self.shape_filter = filter;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.limits.validate()?;
        if let Grouping::Weighted(weights) = &self.grouping {
            weights.validate()?;
        }
        Ok(())
    }
}
