//! Run configuration and presets
//!
//! Three presets cover the usual runs:
//! * `classic`: 4.9 million patients (lung, colorectal, stomach),
//!   written as a single CSV and Parquet pair;
//! * `chunked`: the same model at 49 million patients, written in
//!   chunks of one million;
//! * `ngs`: ten patients (lung, breast, leukemia, colorectal) with
//!   genomic data and per-patient side files, written to `DATA/`.
//!
//! Every field can be overridden after choosing a preset.
//!

use std::ops::Range;
use std::path::PathBuf;

use clap::ValueEnum;

use crate::comorbidity::ComorbidityPolicy;
use crate::error::ConfigError;
use crate::presets::{classic_profiles, ngs_profiles};
use crate::profile::ProfileSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Preset {
    #[default]
    Classic,
    Chunked,
    Ngs,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationConfig {
    /// Number of patients to generate (at least 1)
    pub patient_count: u64,
    /// Patients per output chunk. None writes one artifact for the
    /// whole dataset. A final partial chunk is written when the
    /// chunk size does not divide the patient count.
    pub chunk_size: Option<u64>,
    /// Id of the first patient (0 or 1)
    pub first_patient_id: u64,
    /// Global seed. None draws a fresh seed (logged at start-up).
    pub seed: Option<u64>,
    /// Generate gene mutations and read matrices
    pub genomics: bool,
    pub comorbidity_policy: ComorbidityPolicy,
    pub profiles: ProfileSet,
    pub output_dir: PathBuf,
    /// Extra attempts at writing a chunk before giving up
    pub write_retries: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self::preset(Preset::default())
    }
}

/// The patient ids belonging to one output chunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkPlan {
    pub index: usize,
    pub ids: Range<u64>,
}

impl ChunkPlan {
    pub fn len(&self) -> u64 {
        self.ids.end - self.ids.start
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl GenerationConfig {
    pub fn preset(preset: Preset) -> Self {
        match preset {
            Preset::Classic => Self {
                patient_count: 4_900_000,
                chunk_size: None,
                first_patient_id: 1,
                seed: None,
                genomics: false,
                comorbidity_policy: ComorbidityPolicy::WithReplacement,
                profiles: classic_profiles(),
                output_dir: PathBuf::from("."),
                write_retries: 0,
            },
            Preset::Chunked => Self {
                patient_count: 49_000_000,
                chunk_size: Some(1_000_000),
                ..Self::preset(Preset::Classic)
            },
            Preset::Ngs => Self {
                patient_count: 10,
                chunk_size: None,
                first_patient_id: 0,
                seed: None,
                genomics: true,
                comorbidity_policy: ComorbidityPolicy::WithReplacement,
                profiles: ngs_profiles(),
                output_dir: PathBuf::from("DATA"),
                write_retries: 0,
            },
        }
    }

    /// Check the run parameters and the profile set. Called before
    /// anything is generated.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.patient_count == 0 {
            return Err(ConfigError::NoPatients);
        }
        if self.chunk_size == Some(0) {
            return Err(ConfigError::ZeroChunkSize);
        }
        if self.first_patient_id > 1 {
            return Err(ConfigError::BadIdBase(self.first_patient_id));
        }
        if self.first_patient_id.checked_add(self.patient_count).is_none() {
            return Err(ConfigError::TooManyPatients(self.patient_count));
        }
        self.profiles.validate()
    }

    pub fn is_chunked(&self) -> bool {
        self.chunk_size.is_some()
    }

    pub fn chunk_count(&self) -> usize {
        match self.chunk_size {
            Some(size) if size > 0 => self.patient_count.div_ceil(size) as usize,
            _ => 1,
        }
    }

    /// Split the patient ids into chunks. The last chunk holds the
    /// remainder when the chunk size does not divide the count.
    pub fn chunks(&self) -> impl Iterator<Item = ChunkPlan> + '_ {
        let first = self.first_patient_id;
        let end = first + self.patient_count;
        let size = self.chunk_size.unwrap_or(self.patient_count).max(1);
        (0..self.chunk_count()).map(move |index| {
            let start = first + index as u64 * size;
            ChunkPlan {
                index,
                ids: start..start.saturating_add(size).min(end),
            }
        })
    }
}
