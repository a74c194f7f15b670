//! Sampling strategies for placing points inside areas and along lines.
//!
//! This module defines the [`GeometrySampling`] trait, the two concrete strategies
//! ([`UniformSampling`], [`NormalSampling`]), and [`GeometrySampler`], which
//! classifies an arbitrary geometry and dispatches to the configured strategy.
use std::fmt;
use std::str::FromStr;

use geo::{Area, Coord, Geometry, LineString, MultiLineString, MultiPolygon, Polygon};
use rand::RngCore;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Error, Result};
use crate::events::{DistributionEvent, EventKind, EventSink, Warning};

pub mod line;
pub mod normal;
pub mod uniform;

pub use normal::NormalSampling;
pub use uniform::UniformSampling;

/// Default number of rejection batches tried per feature before giving up.
pub const DEFAULT_MAX_BATCHES: usize = 1000;

/// Trait for drawing points from one supported geometry.
pub trait GeometrySampling: Send + Sync {
    /// Draw exactly `count` points inside `area` (boundary included).
    fn sample_area(
        &self,
        area: &MultiPolygon<f64>,
        count: usize,
        rng: &mut dyn RngCore,
    ) -> Result<Vec<Coord<f64>>>;

    /// Draw exactly `count` points along `lines`.
    ///
    /// Both built-in strategies place line points uniformly by arc length; the
    /// normal strategy has no clustered variant for lines.
    fn sample_line(
        &self,
        lines: &MultiLineString<f64>,
        count: usize,
        rng: &mut dyn RngCore,
    ) -> Result<Vec<Coord<f64>>> {
        line::sample_along(lines, count, rng)
    }
}

/// How points are spread over a geometry.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SamplingMethod {
    /// Uniform over the area (or arc length).
    #[default]
    Uniform,
    /// Clustered around the centroid by rejection sampling from an isotropic normal.
    Normal,
}

impl SamplingMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            SamplingMethod::Uniform => "uniform",
            SamplingMethod::Normal => "normal",
        }
    }
}

impl fmt::Display for SamplingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SamplingMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "uniform" => Ok(SamplingMethod::Uniform),
            "normal" => Ok(SamplingMethod::Normal),
            _ => Err(Error::UnsupportedMethod(s.to_owned())),
        }
    }
}

/// Safety bounds for sampling one feature.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplingLimits {
    /// Maximum number of candidate batches drawn by rejection sampling.
    pub max_batches: usize,
}

impl Default for SamplingLimits {
    fn default() -> Self {
        Self {
            max_batches: DEFAULT_MAX_BATCHES,
        }
    }
}

impl SamplingLimits {
    pub fn new(max_batches: usize) -> Self {
        Self { max_batches }
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_batches == 0 {
            return Err(Error::InvalidConfig("max_batches must be > 0".into()));
        }
        Ok(())
    }
}

/// A geometry reduced to what the samplers understand.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Area(MultiPolygon<f64>),
    Line(MultiLineString<f64>),
    /// Null or empty geometry; yields nothing without a warning.
    Empty,
    /// Polygon without area; yields nothing with a warning.
    Degenerate(&'static str),
    /// Points and collections; yields nothing with a warning.
    Unsupported(&'static str),
}

impl Shape {
    pub fn classify(geometry: Option<&Geometry<f64>>) -> Self {
        let Some(geometry) = geometry else {
            return Shape::Empty;
        };
        match geometry {
            Geometry::Polygon(p) => Self::area(vec![p.clone()], "Polygon"),
            Geometry::MultiPolygon(mp) => Self::area(mp.0.clone(), "MultiPolygon"),
            Geometry::Rect(r) => Self::area(vec![r.to_polygon()], "Rect"),
            Geometry::Triangle(t) => Self::area(vec![t.to_polygon()], "Triangle"),
            Geometry::LineString(ls) => Self::line(vec![ls.clone()]),
            Geometry::MultiLineString(mls) => Self::line(mls.0.clone()),
            Geometry::Line(l) => Self::line(vec![LineString::from(vec![l.start, l.end])]),
            Geometry::Point(_) => Shape::Unsupported("Point"),
            Geometry::MultiPoint(mp) if mp.0.is_empty() => Shape::Empty,
            Geometry::MultiPoint(_) => Shape::Unsupported("MultiPoint"),
            Geometry::GeometryCollection(gc) if gc.0.is_empty() => Shape::Empty,
            Geometry::GeometryCollection(_) => Shape::Unsupported("GeometryCollection"),
        }
    }

    fn area(polygons: Vec<Polygon<f64>>, kind: &'static str) -> Self {
        let polygons: Vec<Polygon<f64>> = polygons
            .into_iter()
            .filter(|p| !p.exterior().0.is_empty())
            .collect();
        if polygons.is_empty() {
            return Shape::Empty;
        }
        let area = MultiPolygon::new(polygons);
        if area.unsigned_area() > 0.0 {
            Shape::Area(area)
        } else {
            Shape::Degenerate(kind)
        }
    }

    fn line(lines: Vec<LineString<f64>>) -> Self {
        let lines: Vec<LineString<f64>> = lines.into_iter().filter(|l| !l.0.is_empty()).collect();
        if lines.is_empty() {
            Shape::Empty
        } else {
            Shape::Line(MultiLineString::new(lines))
        }
    }

    pub fn is_area(&self) -> bool {
        matches!(self, Shape::Area(_))
    }

    pub fn is_line(&self) -> bool {
        matches!(self, Shape::Line(_))
    }

    /// Name of the underlying geometry kind, for messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Shape::Area(_) => "Polygon",
            Shape::Line(_) => "LineString",
            Shape::Empty => "Empty",
            Shape::Degenerate(kind) | Shape::Unsupported(kind) => *kind,
        }
    }
}

/// Samples points from single geometries with one configured method.
pub struct GeometrySampler {
    method: SamplingMethod,
    strategy: Box<dyn GeometrySampling>,
}

impl GeometrySampler {
    pub fn new(method: SamplingMethod, limits: SamplingLimits) -> Self {
        let strategy: Box<dyn GeometrySampling> = match method {
            SamplingMethod::Uniform => Box::new(UniformSampling),
            SamplingMethod::Normal => Box::new(NormalSampling::with_limits(limits)),
        };
        Self { method, strategy }
    }

    /// Build a sampler from a method name such as `"uniform"` or `"normal"`.
    pub fn from_method_name(name: &str, limits: SamplingLimits) -> Result<Self> {
        limits.validate()?;
        Ok(Self::new(name.parse()?, limits))
    }

    pub fn method(&self) -> SamplingMethod {
        self.method
    }

    /// Draw `count` points from `geometry`.
    ///
    /// Null and empty geometries give an empty result silently. Unsupported or
    /// degenerate geometries give an empty result and a [`Warning`] on `sink`.
    pub fn sample(
        &self,
        geometry: Option<&Geometry<f64>>,
        count: usize,
        rng: &mut dyn RngCore,
        sink: &mut dyn EventSink,
    ) -> Result<Vec<Coord<f64>>> {
        let shape = Shape::classify(geometry);
        let warning = match &shape {
            Shape::Unsupported(kind) => Some(Warning::UnsupportedGeometry {
                feature: None,
                geometry_type: *kind,
            }),
            Shape::Degenerate(kind) => Some(Warning::DegenerateGeometry {
                feature: None,
                geometry_type: *kind,
            }),
            _ => None,
        };
        if let Some(w) = warning {
            warn!("{w}");
            if sink.wants(EventKind::Warning) {
                sink.send(DistributionEvent::Warning(w));
            }
            return Ok(Vec::new());
        }
        self.sample_shape(&shape, count, rng)
    }

    /// Draw `count` points from an already classified shape.
    pub fn sample_shape(
        &self,
        shape: &Shape,
        count: usize,
        rng: &mut dyn RngCore,
    ) -> Result<Vec<Coord<f64>>> {
        if count == 0 {
            return Ok(Vec::new());
        }
        match shape {
            Shape::Area(area) => self.strategy.sample_area(area, count, rng),
            Shape::Line(lines) => self.strategy.sample_line(lines, count, rng),
            Shape::Empty | Shape::Degenerate(_) | Shape::Unsupported(_) => Ok(Vec::new()),
        }
    }
}

/// Generate a random float in the range [0, 1).
#[inline]
pub(crate) fn rand01(rng: &mut dyn RngCore) -> f64 {
    (rng.next_u64() >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
}

/// Pick the bucket whose cumulative weight range contains `target`.
#[inline]
pub(crate) fn pick_cumulative(cumulative: &[f64], target: f64) -> usize {
    cumulative
        .partition_point(|c| *c <= target)
        .min(cumulative.len().saturating_sub(1))
}
