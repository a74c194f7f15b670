#![forbid(unsafe_code)]
//! Shared helpers for the `house_scatter` example binaries.
use geo::{coord, LineString, Polygon, Rect};
use house_scatter::prelude::*;
use tracing_subscriber::EnvFilter;

/// Installs a fmt subscriber honouring `RUST_LOG` (default `info`).
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// Zone ids of the toy study area, west to east.
pub const ZONES: [&str; 3] = ["west", "centre", "east"];

/// Square zone polygon of the toy study area, 100 units per side.
pub fn zone_square(index: usize) -> Polygon<f64> {
    let x0 = index as f64 * 100.0;
    Rect::new(coord! { x: x0, y: 0.0 }, coord! { x: x0 + 100.0, y: 100.0 }).to_polygon()
}

/// Households per zone used by all examples.
pub fn toy_population() -> PopulationTable {
    [("west", 120u64), ("centre", 400), ("east", 60)]
        .into_iter()
        .collect()
}

/// A small street grid per zone, tagged the way street exports usually are.
pub fn toy_streets() -> FeatureCollection {
    let tags = [
        "residential",
        "['residential', 'service']",
        "living_street",
        "['tertiary', 'secondary']",
        "primary",
        "service",
    ];
    let mut features = FeatureCollection::new();
    for (z, zone) in ZONES.iter().enumerate() {
        let x0 = z as f64 * 100.0;
        for (i, tag) in tags.iter().enumerate() {
            let y = 10.0 + i as f64 * 15.0;
            let street = LineString::from(vec![(x0 + 5.0, y), (x0 + 95.0, y + 2.0)]);
            features.push(Feature::new(street, *zone).with_category(*tag));
        }
    }
    features
}

/// A few rectangular building footprints per zone.
pub fn toy_buildings() -> FeatureCollection {
    let mut features = FeatureCollection::new();
    for (z, zone) in ZONES.iter().enumerate() {
        let x0 = z as f64 * 100.0;
        for row in 0..3 {
            for col in 0..4 {
                let min = coord! { x: x0 + 10.0 + col as f64 * 22.0, y: 10.0 + row as f64 * 30.0 };
                let max = coord! { x: min.x + 12.0, y: min.y + 18.0 };
                features.push(Feature::new(Rect::new(min, max), *zone).with_category("house"));
            }
        }
    }
    features
}

/// One polygon per zone.
pub fn toy_areas() -> FeatureCollection {
    ZONES
        .iter()
        .enumerate()
        .map(|(z, zone)| Feature::new(zone_square(z), *zone))
        .collect()
}

/// Logs the counters of a finished run.
pub fn log_summary(label: &str, result: &DistributionResult) {
    let s = &result.summary;
    tracing::info!(
        "{label}: {} points, {} features sampled, {} excluded, {} dropped, {} warnings.",
        s.population_placed,
        s.features_sampled,
        s.features_excluded,
        s.population_dropped,
        result.warnings.len(),
    );
}
