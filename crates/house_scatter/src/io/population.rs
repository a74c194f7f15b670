//! Population table loader.
use std::path::Path;

use tracing::debug;

use crate::allocation::{sanitize_count, PopulationTable};
use crate::error::{Error, Result};
use crate::io::{column_index, csv_error, open};

/// Column names of a population CSV.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopulationColumns {
    pub zone: String,
    pub population: String,
}

impl Default for PopulationColumns {
    fn default() -> Self {
        Self {
            zone: "zone".to_owned(),
            population: "population".to_owned(),
        }
    }
}

impl PopulationColumns {
    pub fn new(zone: impl Into<String>, population: impl Into<String>) -> Self {
        Self {
            zone: zone.into(),
            population: population.into(),
        }
    }
}

/// Reads a zone → population table.
///
/// Blank and `NaN` cells count as zero and fractional counts are truncated.
/// Negative counts, unparsable cells and repeated zones are errors.
pub fn read_population_csv(
    path: impl AsRef<Path>,
    columns: &PopulationColumns,
) -> Result<PopulationTable> {
    let path = path.as_ref();
    let mut reader = csv::ReaderBuilder::new().from_reader(open(path)?);
    let headers = reader.headers().map_err(csv_error(path))?.clone();
    let zone_idx = column_index(&headers, &columns.zone, path)?;
    let population_idx = column_index(&headers, &columns.population, path)?;

    let mut table = PopulationTable::new();
    for (row, record) in reader.records().enumerate() {
        let record = record.map_err(csv_error(path))?;
        let row = row + 1;
        let record_error = |message: String| Error::Record {
            path: path.to_path_buf(),
            row,
            message,
        };

        let zone = record.get(zone_idx).map(str::trim).unwrap_or_default();
        if zone.is_empty() {
            debug!(row, "population row without zone skipped");
            continue;
        }
        let cell = record.get(population_idx).map(str::trim).unwrap_or_default();
        let value = if cell.is_empty() {
            0.0
        } else {
            cell.parse::<f64>()
                .map_err(|e| record_error(format!("population '{cell}': {e}")))?
        };
        let count = sanitize_count(zone, value)?;
        if table.insert(zone, count).is_some() {
            return Err(record_error(format!("duplicate zone '{zone}'")));
        }
    }
    debug!(path = %path.display(), zones = table.len(), total = table.total(), "population loaded");
    Ok(table)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn reads_counts_and_cleans_cells() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pop.csv");
        fs::write(&path, "taz,households\n1,10\n2,\n3,NaN\n4,7.8\n").unwrap();
        let table =
            read_population_csv(&path, &PopulationColumns::new("taz", "households")).unwrap();
        assert_eq!(table.len(), 4);
        assert_eq!(table.get("1"), 10);
        assert_eq!(table.get("2"), 0);
        assert_eq!(table.get("3"), 0);
        assert_eq!(table.get("4"), 7);
        assert_eq!(table.total(), 17);
    }

    #[test]
    fn duplicate_zone_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dup.csv");
        fs::write(&path, "zone,population\nA,1\nA,2\n").unwrap();
        let err = read_population_csv(&path, &PopulationColumns::default()).unwrap_err();
        assert!(matches!(err, Error::Record { row: 2, .. }), "{err}");
    }

    #[test]
    fn negative_or_garbage_counts_fail() {
        let dir = tempfile::tempdir().unwrap();
        let neg = dir.path().join("neg.csv");
        fs::write(&neg, "zone,population\nA,-3\n").unwrap();
        assert!(matches!(
            read_population_csv(&neg, &PopulationColumns::default()),
            Err(Error::InvalidPopulation { .. })
        ));

        let garbage = dir.path().join("garbage.csv");
        fs::write(&garbage, "zone,population\nA,lots\n").unwrap();
        assert!(matches!(
            read_population_csv(&garbage, &PopulationColumns::default()),
            Err(Error::Record { row: 1, .. })
        ));
    }
}
