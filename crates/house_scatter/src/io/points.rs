//! `x,y` point files.
use std::path::Path;

use geo::Coord;
use tracing::info;

use crate::error::{Error, Result};
use crate::io::{column_index, csv_error, open};

/// Writes one `x,y` row per point, with a header.
pub fn write_points_csv(path: impl AsRef<Path>, points: &[Coord<f64>]) -> Result<()> {
    let path = path.as_ref();
    let mut writer = csv::Writer::from_path(path).map_err(csv_error(path))?;
    writer.write_record(["x", "y"]).map_err(csv_error(path))?;
    for p in points {
        writer
            .write_record([p.x.to_string(), p.y.to_string()])
            .map_err(csv_error(path))?;
    }
    writer.flush().map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    info!("Wrote {} points to {}.", points.len(), path.display());
    Ok(())
}

/// Reads a file written by [`write_points_csv`].
pub fn read_points_csv(path: impl AsRef<Path>) -> Result<Vec<Coord<f64>>> {
    let path = path.as_ref();
    let mut reader = csv::ReaderBuilder::new().from_reader(open(path)?);
    let headers = reader.headers().map_err(csv_error(path))?.clone();
    let x_idx = column_index(&headers, "x", path)?;
    let y_idx = column_index(&headers, "y", path)?;

    let mut points = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record.map_err(csv_error(path))?;
        let parse = |idx: usize| -> Result<f64> {
            let cell = record.get(idx).unwrap_or_default().trim();
            cell.parse().map_err(|_| Error::Record {
                path: path.to_path_buf(),
                row: row + 1,
                message: format!("'{cell}' is not a coordinate"),
            })
        };
        points.push(Coord {
            x: parse(x_idx)?,
            y: parse(y_idx)?,
        });
    }
    Ok(points)
}
