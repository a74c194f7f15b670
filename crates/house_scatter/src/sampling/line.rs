//! Uniform sampling by arc length along line geometries.
use geo::{Coord, Line, MultiLineString};
use rand::RngCore;

use crate::error::Result;
use crate::sampling::{pick_cumulative, rand01};

/// Segments of a multi-line with their cumulative lengths.
struct SegmentTable {
    segments: Vec<Line<f64>>,
    cumulative: Vec<f64>,
}

impl SegmentTable {
    fn new(lines: &MultiLineString<f64>) -> Self {
        let segments: Vec<Line<f64>> = lines.iter().flat_map(|ls| ls.lines()).collect();
        let mut cumulative = Vec::with_capacity(segments.len());
        let mut total = 0.0;
        for seg in &segments {
            total += seg.dx().hypot(seg.dy());
            cumulative.push(total);
        }
        Self {
            segments,
            cumulative,
        }
    }

    fn total_length(&self) -> f64 {
        self.cumulative.last().copied().unwrap_or(0.0)
    }

    /// Point at `distance` from the start, measured along all parts in order.
    fn point_at(&self, distance: f64) -> Coord<f64> {
        let i = pick_cumulative(&self.cumulative, distance);
        let seg = self.segments[i];
        let start = if i == 0 { 0.0 } else { self.cumulative[i - 1] };
        let len = self.cumulative[i] - start;
        if len <= 0.0 {
            return seg.start;
        }
        let t = ((distance - start) / len).clamp(0.0, 1.0);
        seg.start + seg.delta() * t
    }
}

/// Total euclidean length of all parts.
pub fn total_length(lines: &MultiLineString<f64>) -> f64 {
    SegmentTable::new(lines).total_length()
}

/// Point at `fraction` (0..=1) of the total length.
///
/// Returns `None` for lines without coordinates.
pub fn interpolate(lines: &MultiLineString<f64>, fraction: f64) -> Option<Coord<f64>> {
    let table = SegmentTable::new(lines);
    if table.segments.is_empty() {
        return first_coord(lines);
    }
    Some(table.point_at(fraction.clamp(0.0, 1.0) * table.total_length()))
}

/// Draw `count` points uniformly along the total length of `lines`.
///
/// A line of zero length (single coordinate or repeated coordinates) yields
/// `count` copies of its start.
pub fn sample_along(
    lines: &MultiLineString<f64>,
    count: usize,
    rng: &mut dyn RngCore,
) -> Result<Vec<Coord<f64>>> {
    if count == 0 {
        return Ok(Vec::new());
    }
    let table = SegmentTable::new(lines);
    let total = table.total_length();
    if table.segments.is_empty() || total <= 0.0 {
        let start = table
            .segments
            .first()
            .map(|s| s.start)
            .or_else(|| first_coord(lines));
        return Ok(start.map(|c| vec![c; count]).unwrap_or_default());
    }

    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        out.push(table.point_at(rand01(rng) * total));
    }
    Ok(out)
}

fn first_coord(lines: &MultiLineString<f64>) -> Option<Coord<f64>> {
    lines.iter().find_map(|ls| ls.0.first().copied())
}
