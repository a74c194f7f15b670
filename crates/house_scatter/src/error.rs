//! Error types and result alias for the crate.
//!
//! This module defines [`enum@crate::error::Error`] and the crate-wide [Result] alias. Variants cover
//! invalid configuration, unbounded rejection sampling, allocation inconsistencies,
//! file IO (always with the offending path), and generic errors.
//!
//! Per-feature problems that do not abort a run (unsupported geometry, population
//! shares without features under a lenient policy) are reported as
//! [`crate::events::Warning`]s instead.
use std::path::PathBuf;

use thiserror::Error;

use crate::allocation::ZoneId;

pub type Result<T> = std::result::Result<T, Error>;

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum Error {
    #[error("unsupported sampling method '{0}' (expected 'uniform' or 'normal')")]
    UnsupportedMethod(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid population {value} for zone '{zone}'")]
    InvalidPopulation { zone: ZoneId, value: f64 },

    #[error(
        "rejection sampling gave up after {batches} batches with {accepted} of {requested} points"
    )]
    SamplingNonTermination {
        requested: usize,
        accepted: usize,
        batches: usize,
    },

    #[error("{geometry_type} has no area or length to sample from")]
    DegenerateGeometry { geometry_type: &'static str },

    #[error("sampling feature {index} in zone '{zone}' failed: {source}")]
    Feature {
        index: usize,
        zone: ZoneId,
        #[source]
        source: Box<Error>,
    },

    #[error("{population} people in zone '{zone}'{} have no features to live on", category_suffix(.category))]
    AllocationInconsistency {
        zone: ZoneId,
        category: Option<String>,
        population: u64,
    },

    #[error("cannot split {population} people across zero features")]
    EmptyGroup { population: u64 },

    #[error("failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("csv error in {}: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("geojson error in {}: {source}", .path.display())]
    GeoJson {
        path: PathBuf,
        #[source]
        source: Box<geojson::Error>,
    },

    #[error("bad record in {} at row {row}: {message}", .path.display())]
    Record {
        path: PathBuf,
        row: usize,
        message: String,
    },

    #[error("column '{column}' not found in {}", .path.display())]
    MissingColumn { path: PathBuf, column: String },

    #[error(transparent)]
    IoOther(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

fn category_suffix(category: &Option<String>) -> String {
    match category {
        Some(c) => format!(" (category '{c}')"),
        None => String::new(),
    }
}

impl Error {
    /// Attaches the feature index and zone to an error raised while sampling one feature.
    pub fn for_feature(self, index: usize, zone: impl Into<ZoneId>) -> Self {
        Error::Feature {
            index,
            zone: zone.into(),
            source: Box::new(self),
        }
    }
}

impl From<String> for Error {
    fn from(value: String) -> Self {
        Error::Other(value)
    }
}

impl From<&str> for Error {
    fn from(value: &str) -> Self {
        Error::Other(value.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_string_uses_other_variant() {
        let err: Error = String::from("boom").into();
        matches!(err, Error::Other(_))
            .then_some(())
            .expect("expected Other variant");
    }

    #[test]
    fn feature_context_wraps_source() {
        let err = Error::SamplingNonTermination {
            requested: 5,
            accepted: 2,
            batches: 10,
        }
        .for_feature(3, "Z1");
        let msg = err.to_string();
        assert!(msg.contains("feature 3"));
        assert!(msg.contains("'Z1'"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn inconsistency_message_names_category_when_present() {
        let with = Error::AllocationInconsistency {
            zone: "A".into(),
            category: Some("primary".into()),
            population: 4,
        };
        assert!(with.to_string().contains("category 'primary'"));

        let without = Error::AllocationInconsistency {
            zone: "A".into(),
            category: None,
            population: 4,
        };
        assert!(!without.to_string().contains("category"));
    }

    #[test]
    fn io_error_mentions_path() {
        let err = Error::Io {
            path: PathBuf::from("/tmp/missing.csv"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "nope"),
        };
        assert!(err.to_string().contains("/tmp/missing.csv"));
    }
}
