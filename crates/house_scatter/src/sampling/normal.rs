//! Clustered sampling around the centroid of an area.
//!
//! Candidates are drawn in batches from an isotropic normal centred on the
//! area's centroid with standard deviation `max(width, height) / 6` of the
//! bounding box, and kept when they fall inside the area (boundary included).
//! The number of batches is bounded; running out of batches is an error rather
//! than a short result.
use geo::{BoundingRect, Centroid, Coord, Intersects, MultiPolygon};
use rand::RngCore;
use rand_distr::{Distribution, Normal};
use tracing::trace;

use crate::error::{Error, Result};
use crate::sampling::{GeometrySampling, SamplingLimits, DEFAULT_MAX_BATCHES};

/// Bounding-box fraction used as the standard deviation.
const SPREAD_DIVISOR: f64 = 6.0;

/// Bounded rejection sampling from a normal centred on the centroid.
#[derive(Debug, Clone, Copy)]
pub struct NormalSampling {
    pub max_batches: usize,
}

impl Default for NormalSampling {
    fn default() -> Self {
        Self {
            max_batches: DEFAULT_MAX_BATCHES,
        }
    }
}

impl NormalSampling {
    pub fn new(max_batches: usize) -> Self {
        Self { max_batches }
    }

    pub fn with_limits(limits: SamplingLimits) -> Self {
        Self::new(limits.max_batches)
    }

    /// Draw exactly `count` points from `area`, or fail after `max_batches`
    /// batches of `count` candidates.
    pub fn sample_clustered(
        &self,
        area: &MultiPolygon<f64>,
        count: usize,
        rng: &mut dyn RngCore,
    ) -> Result<Vec<Coord<f64>>> {
        if count == 0 {
            return Ok(Vec::new());
        }
        let degenerate = || Error::DegenerateGeometry {
            geometry_type: "Polygon",
        };
        let bbox = area.bounding_rect().ok_or_else(degenerate)?;
        let center = area.centroid().ok_or_else(degenerate)?;
        let spread = bbox.width().max(bbox.height()) / SPREAD_DIVISOR;
        if !(spread.is_finite() && spread > 0.0) {
            return Err(degenerate());
        }
        let nx = Normal::new(center.x(), spread).map_err(|e| Error::Other(e.to_string()))?;
        let ny = Normal::new(center.y(), spread).map_err(|e| Error::Other(e.to_string()))?;

        let mut accepted = Vec::with_capacity(count);
        let mut batches = 0;
        while accepted.len() < count {
            if batches >= self.max_batches {
                return Err(Error::SamplingNonTermination {
                    requested: count,
                    accepted: accepted.len(),
                    batches,
                });
            }
            batches += 1;
            for _ in 0..count {
                let c = Coord {
                    x: nx.sample(rng),
                    y: ny.sample(rng),
                };
                if area.0.iter().any(|p| p.intersects(&c)) {
                    accepted.push(c);
                }
            }
        }
        accepted.truncate(count);
        trace!(count, batches, "clustered sample accepted");
        Ok(accepted)
    }
}

impl GeometrySampling for NormalSampling {
    fn sample_area(
        &self,
        area: &MultiPolygon<f64>,
        count: usize,
        rng: &mut dyn RngCore,
    ) -> Result<Vec<Coord<f64>>> {
        self.sample_clustered(area, count, rng)
    }
}
