//! Error types for profile validation, generation and output.

use std::path::PathBuf;

use datafusion::arrow::error::ArrowError;
use datafusion::parquet::errors::ParquetError;
use thiserror::Error;

/// Problems with the configuration tables or the run parameters.
///
/// All of these are detected by validation before the first
/// record is generated.
#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("{table} weights for {cancer_type} sum to {sum}, expected 1")]
    WeightSum {
        cancer_type: String,
        table: &'static str,
        sum: f64,
    },

    #[error("prevalence weights sum to {0}, expected 1")]
    PrevalenceSum(f64),

    #[error("negative or non-finite {table} weight {weight} for {cancer_type}")]
    BadWeight {
        cancer_type: String,
        table: &'static str,
        weight: f64,
    },

    #[error("{table} table for {cancer_type} is empty")]
    EmptyTable {
        cancer_type: String,
        table: &'static str,
    },

    #[error("survival rate {rate} for {cancer_type} is outside [0, 1]")]
    RateOutOfRange { cancer_type: String, rate: f64 },

    #[error("rule for {cancer_type} refers to unknown {kind} '{name}'")]
    UnknownRuleTerm {
        cancer_type: String,
        kind: &'static str,
        name: String,
    },

    #[error("cancer type {0} is defined more than once")]
    DuplicateCancerType(String),

    #[error("profile set contains no cancer types")]
    NoProfiles,

    #[error("patient count must be at least 1")]
    NoPatients,

    #[error("chunk size must be at least 1")]
    ZeroChunkSize,

    #[error("patient count {0} does not fit after the first patient id")]
    TooManyPatients(u64),

    #[error("patient id base must be 0 or 1, got {0}")]
    BadIdBase(u64),

    #[error("failed to parse profile file: {0}")]
    Parse(String),
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

/// Errors raised while generating a patient record.
#[derive(Error, Debug, PartialEq)]
pub enum GenerateError {
    #[error("no survival rule table for cancer type '{0}'")]
    UnknownCancerType(String),
}

/// Errors raised by a record sink.
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),

    #[error("Parquet error: {0}")]
    Parquet(#[from] ParquetError),

    #[error("chunk {chunk} failed after {attempts} attempts: {source}")]
    Chunk {
        chunk: usize,
        attempts: u32,
        source: Box<SinkError>,
    },

    #[error("column {column} is missing or has the wrong type")]
    Column { column: String },

    #[error("bad value '{value}' in column {column}")]
    Value { column: String, value: String },
}

impl SinkError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Top-level error for a generation run.
#[derive(Error, Debug)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Generate(#[from] GenerateError),

    #[error(transparent)]
    Sink(#[from] SinkError),

    #[error("run cancelled after {chunks_written} chunks")]
    Cancelled { chunks_written: usize },
}
