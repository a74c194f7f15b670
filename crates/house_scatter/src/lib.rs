#![forbid(unsafe_code)]
//! house_scatter: synthetic household locations from per-zone population counts.
//!
//! Modules:
//! - allocation: multinomial splits of zone populations across categories and features
//! - sampling: uniform and centroid-clustered point sampling in polygons and along lines
//! - distribute: feature collections, run configuration, and the distributor
//! - events: run events and sinks
//! - io: CSV/WKT and GeoJSON feature loaders, population tables, `x,y` output
//!
//! For examples, see the `house_scatter_examples` crate.
pub mod allocation;
pub mod distribute;
pub mod error;
pub mod events;
pub mod io;
pub mod sampling;

/// Convenient re-exports for common types. Import with `use house_scatter::prelude::*;`.
pub mod prelude {
    pub use crate::allocation::{
        allocate_by_category, allocate_within_category, multinomial, CategoryWeights,
        OrphanPolicy, PopulationTable, ZoneId,
    };
    pub use crate::distribute::{
        distribute, distribute_with_events, DistributeConfig, DistributionResult, Distributor,
        Feature, FeatureCollection, Grouping, RunSummary, ShapeFilter, Support,
    };
    pub use crate::error::{Error, Result};
    pub use crate::events::{
        DistributionEvent, EventKind, EventSink, FnSink, MultiSink, VecSink, Warning,
    };
    pub use crate::io::{
        read_features, read_population_csv, write_points_csv, FeatureColumns, PopulationColumns,
    };
    pub use crate::sampling::{
        GeometrySampler, GeometrySampling, NormalSampling, SamplingLimits, SamplingMethod,
        UniformSampling,
    };
}
