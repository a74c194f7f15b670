//! Uniform sampling over polygon area.
//!
//! Polygons (holes included) are ear-cut into triangles once per call; each point
//! picks a triangle with probability proportional to its area and is then placed
//! uniformly inside it, so multi-part geometries are area weighted.
use geo::{Area, Coord, MultiPolygon, Triangle, TriangulateEarcut};
use rand::RngCore;

use crate::error::{Error, Result};
use crate::sampling::{pick_cumulative, rand01, GeometrySampling};

/// Uniform i.i.d. sampling over the area of a polygon or multipolygon.
#[derive(Debug, Clone, Copy, Default)]
pub struct UniformSampling;

struct TriangleTable {
    triangles: Vec<[Coord<f64>; 3]>,
    cumulative: Vec<f64>,
}

impl TriangleTable {
    fn new(area: &MultiPolygon<f64>) -> Self {
        let tris: Vec<Triangle<f64>> = area
            .iter()
            .flat_map(|polygon| polygon.earcut_triangles())
            .collect();
        let mut triangles = Vec::with_capacity(tris.len());
        let mut cumulative = Vec::with_capacity(tris.len());
        let mut total = 0.0;
        for tri in tris {
            let a = tri.unsigned_area();
            if a <= 0.0 {
                continue;
            }
            total += a;
            triangles.push(tri.to_array());
            cumulative.push(total);
        }
        Self {
            triangles,
            cumulative,
        }
    }

    fn total_area(&self) -> f64 {
        self.cumulative.last().copied().unwrap_or(0.0)
    }
}

/// Uniform point inside triangle `abc` from two unit draws.
fn point_in_triangle([a, b, c]: [Coord<f64>; 3], mut u: f64, mut v: f64) -> Coord<f64> {
    if u + v > 1.0 {
        u = 1.0 - u;
        v = 1.0 - v;
    }
    a + (b - a) * u + (c - a) * v
}

impl GeometrySampling for UniformSampling {
    fn sample_area(
        &self,
        area: &MultiPolygon<f64>,
        count: usize,
        rng: &mut dyn RngCore,
    ) -> Result<Vec<Coord<f64>>> {
        if count == 0 {
            return Ok(Vec::new());
        }
        let table = TriangleTable::new(area);
        let total = table.total_area();
        if table.triangles.is_empty() || total <= 0.0 {
            return Err(Error::DegenerateGeometry {
                geometry_type: "Polygon",
            });
        }

        let mut out = Vec::with_capacity(count);
        for _ in 0..count {
            let i = pick_cumulative(&table.cumulative, rand01(rng) * total);
            let u = rand01(rng);
            let v = rand01(rng);
            out.push(point_in_triangle(table.triangles[i], u, v));
        }
        Ok(out)
    }
}
