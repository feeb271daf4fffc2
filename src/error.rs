use crate::models::{League, Source};
use std::path::PathBuf;
use thiserror::Error;

/// Registry integrity failures. These stop the run until the mapping is fixed.
#[derive(Debug, Error, PartialEq)]
pub enum RegistryError {
    #[error("Team {canonical_id} is already registered as '{existing_name}' ({existing_league})")]
    DuplicateIdentity {
        canonical_id: String,
        existing_name: String,
        existing_league: League,
    },

    #[error("Unknown team id {canonical_id} for {site} variant '{raw_name}'")]
    UnknownIdentity {
        site: Source,
        raw_name: String,
        canonical_id: String,
    },

    #[error("{site} name '{raw_name}' already maps to {existing}, refusing to remap to {requested}")]
    ConflictingVariant {
        site: Source,
        raw_name: String,
        existing: String,
        requested: String,
    },
}

/// A spread, total or odds field that could not be read as a number
#[derive(Debug, Error, Clone, PartialEq)]
#[error("Malformed odds value '{text}': {reason}")]
pub struct MalformedOddsError {
    pub text: String,
    pub reason: &'static str,
}

impl MalformedOddsError {
    pub fn new(text: &str, reason: &'static str) -> Self {
        Self {
            text: text.to_string(),
            reason,
        }
    }
}

/// Time-range weights that cannot be used to build features
#[derive(Debug, Error, Clone, PartialEq)]
pub enum InvalidWeightsError {
    #[error("Range weights must sum to 1.0, got {sum}")]
    BadSum { sum: f64 },

    #[error("Range weight for {range} must be a finite, non-negative number, got {value}")]
    BadValue { range: &'static str, value: f64 },
}

/// Errors that abort a batch run
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    InvalidWeights(#[from] InvalidWeightsError),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse CSV {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Failed to parse JSON {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Date worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}
