//! Feature loaders for CSV (WKT geometry column) and GeoJSON files.
use std::path::Path;

use geo::Geometry;
use geojson::GeoJson;
use serde_json::Value;
use tracing::debug;
use wkt::TryFromWkt;

use crate::distribute::{Feature, FeatureCollection};
use crate::error::{Error, Result};
use crate::io::{column_index, csv_error, open, FeatureColumns};

/// Loads features, choosing the format from the file extension
/// (`.csv`, `.json`, `.geojson`).
pub fn read_features(path: impl AsRef<Path>, columns: &FeatureColumns) -> Result<FeatureCollection> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match extension.as_str() {
        "csv" => read_features_csv(path, columns),
        "json" | "geojson" => read_features_geojson(path, columns),
        other => Err(Error::InvalidConfig(format!(
            "unsupported feature file format '{other}' for {}",
            path.display()
        ))),
    }
}

/// Loads features from a CSV file whose geometry column holds WKT.
///
/// Blank geometry cells give features without geometry; they are excluded
/// later without a warning.
pub fn read_features_csv(
    path: impl AsRef<Path>,
    columns: &FeatureColumns,
) -> Result<FeatureCollection> {
    let path = path.as_ref();
    let mut reader = csv::ReaderBuilder::new().from_reader(open(path)?);
    let headers = reader.headers().map_err(csv_error(path))?.clone();
    let geometry_idx = column_index(&headers, &columns.geometry, path)?;
    let zone_idx = column_index(&headers, &columns.zone, path)?;
    let category_idx = columns
        .category
        .as_deref()
        .map(|c| column_index(&headers, c, path))
        .transpose()?;

    let mut collection = FeatureCollection::new();
    for (row, record) in reader.records().enumerate() {
        let record = record.map_err(csv_error(path))?;
        let row = row + 1;
        let record_error = |message: String| Error::Record {
            path: path.to_path_buf(),
            row,
            message,
        };

        let geometry = match record.get(geometry_idx).map(str::trim) {
            None | Some("") => None,
            Some(cell) => Some(
                Geometry::<f64>::try_from_wkt_str(cell)
                    .map_err(|e| record_error(format!("invalid WKT geometry: {e}")))?,
            ),
        };
        let zone = record.get(zone_idx).map(str::trim).unwrap_or_default();
        if zone.is_empty() {
            return Err(record_error(format!("empty '{}' cell", columns.zone)));
        }
        let category = category_idx
            .and_then(|i| record.get(i))
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_owned);

        collection.push(Feature {
            geometry,
            zone_id: zone.to_owned(),
            category,
        });
    }
    debug!(path = %path.display(), features = collection.len(), "features loaded");
    Ok(collection)
}

/// Loads features from a GeoJSON FeatureCollection.
///
/// Zone and category are read from feature properties. Array-valued
/// properties are joined with commas so multi-valued tags survive. A legacy
/// `crs` member naming the reference system is kept as collection metadata.
pub fn read_features_geojson(
    path: impl AsRef<Path>,
    columns: &FeatureColumns,
) -> Result<FeatureCollection> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let geojson = text.parse::<GeoJson>().map_err(|e| Error::GeoJson {
        path: path.to_path_buf(),
        source: Box::new(e),
    })?;
    let GeoJson::FeatureCollection(fc) = geojson else {
        return Err(Error::Record {
            path: path.to_path_buf(),
            row: 0,
            message: "expected a FeatureCollection".into(),
        });
    };

    let mut collection = FeatureCollection::new();
    if let Some(crs) = fc
        .foreign_members
        .as_ref()
        .and_then(|m| m.get("crs"))
        .and_then(|c| c.get("properties"))
        .and_then(|p| p.get("name"))
        .and_then(Value::as_str)
    {
        collection.crs = crs.to_owned();
    }

    for (row, feature) in fc.features.into_iter().enumerate() {
        let row = row + 1;
        let record_error = |message: String| Error::Record {
            path: path.to_path_buf(),
            row,
            message,
        };
        let zone = feature
            .property(&columns.zone)
            .and_then(property_text)
            .ok_or_else(|| record_error(format!("missing '{}' property", columns.zone)))?;
        let category = columns
            .category
            .as_deref()
            .and_then(|c| feature.property(c))
            .and_then(property_text);
        let geometry = feature
            .geometry
            .map(|g| Geometry::<f64>::try_from(g.value))
            .transpose()
            .map_err(|e| record_error(format!("invalid geometry: {e}")))?;

        collection.push(Feature {
            geometry,
            zone_id: zone,
            category,
        });
    }
    debug!(path = %path.display(), features = collection.len(), crs = %collection.crs, "features loaded");
    Ok(collection)
}

fn property_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.trim().to_owned()),
        Value::Number(n) => Some(number_text(n)),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(property_text).collect();
            (!parts.is_empty()).then(|| parts.join(","))
        }
        Value::Object(_) => None,
    }
}

/// Integral numbers print without a fraction, so `7.0` joins a population row for `7`.
fn number_text(n: &serde_json::Number) -> String {
    let integral = n.as_i64().or_else(|| {
        n.as_f64()
            .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
            .map(|f| f as i64)
    });
    match integral {
        Some(i) => i.to_string(),
        None => n.to_string(),
    }
}
