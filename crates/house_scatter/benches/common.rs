use std::time::Duration;

use criterion::{Criterion, Throughput};
use geo::{LineString, MultiPolygon, Polygon};

pub const SAMPLE_SIZE: usize = 20;
pub const WARM_UP: Duration = Duration::from_secs(1);
pub const MEASUREMENT_TIME: Duration = Duration::from_secs(2);

pub fn default_criterion() -> Criterion {
    Criterion::default()
        .configure_from_args()
        .sample_size(SAMPLE_SIZE)
        .warm_up_time(WARM_UP)
        .measurement_time(MEASUREMENT_TIME)
}

pub fn elements_throughput(elements: usize) -> Throughput {
    Throughput::Elements(elements.max(1) as u64)
}

/// Regular `sides`-gon of radius `r` centred at (`cx`, `cy`).
#[allow(dead_code)]
pub fn ngon(cx: f64, cy: f64, r: f64, sides: usize) -> MultiPolygon<f64> {
    let ring: Vec<(f64, f64)> = (0..sides)
        .map(|i| {
            let a = std::f64::consts::TAU * i as f64 / sides as f64;
            (cx + r * a.cos(), cy + r * a.sin())
        })
        .collect();
    MultiPolygon::new(vec![Polygon::new(LineString::from(ring), vec![])])
}
