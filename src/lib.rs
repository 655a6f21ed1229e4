//! Synthetic oncology data.
//!
//! Generates fictitious cancer-patient records (demographics,
//! diagnosis, treatment, medication, comorbidities, survival outcome
//! and optionally genomic mutations) and writes them as CSV and
//! Parquet. All randomness comes from one global seed, with a
//! separate seeded stream per patient.
//!

pub use config::{GenerationConfig, Preset};
pub use error::{ConfigError, GenerateError, RunError, SinkError};
pub use generator::{Generator, RunSummary};
pub use patient::{GeneratedPatient, PatientRecord};
pub use profile::{CancerProfile, ProfileSet};
pub use sink::{FileSink, MemorySink, RecordSink};

#[macro_use]
mod column_enum;

pub mod comorbidity;
pub mod config;
pub mod demographics;
pub mod error;
pub mod generator;
pub mod logging;
pub mod mutation;
pub mod outcome;
pub mod patient;
pub mod presets;
pub mod profile;
pub mod seeded_rng;
pub mod sink;
