//! The generation run: validate, then generate and flush chunk by chunk.
//!
//! Patients within a chunk are generated in parallel. Every patient
//! depends only on the read-only configuration table and its own
//! seeded random number generator, so the result is the same for any
//! number of threads and any chunk size. Chunks are flushed to the
//! sink in order, one at a time; the cancellation flag is checked
//! before each chunk.
//!

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::config::{ChunkPlan, GenerationConfig};
use crate::error::{ConfigError, GenerateError, RunError};
use crate::patient::PatientSampler;
use crate::sink::{Chunk, ChunkArtifacts, RecordSink};

/// Outcome of a completed run
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub seed: u64,
    pub patients: u64,
    pub artifacts: Vec<ChunkArtifacts>,
}

impl RunSummary {
    pub fn chunks_written(&self) -> usize {
        self.artifacts.len()
    }

    pub fn paths(&self) -> impl Iterator<Item = &PathBuf> {
        self.artifacts.iter().flat_map(|a| a.paths.iter())
    }
}

pub struct Generator {
    config: GenerationConfig,
    sampler: PatientSampler,
    seed: u64,
    cancel: Arc<AtomicBool>,
}

impl Generator {
    /// Validate the configuration and compile the profile tables.
    ///
    /// All configuration errors are reported here, before any record
    /// is generated. Without a configured seed, a fresh one is drawn.
    pub fn new(config: GenerationConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let table = Arc::new(config.profiles.compile()?);
        let seed = config.seed.unwrap_or_else(rand::random);
        let sampler = PatientSampler::new(table, seed, config.comorbidity_policy, config.genomics);
        Ok(Self {
            config,
            sampler,
            seed,
            cancel: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    /// Setting the returned flag stops the run at the next chunk boundary
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.cancel.clone()
    }

    pub fn generate_chunk(&self, plan: &ChunkPlan) -> Result<Chunk, GenerateError> {
        let start = plan.ids.start;
        let patients = (0..plan.len() as usize)
            .into_par_iter()
            .map(|offset| self.sampler.generate(start + offset as u64))
            .collect::<Result<Vec<_>, _>>()?;
        debug!(chunk = plan.index, rows = patients.len(), "generated chunk");
        Ok(Chunk {
            index: plan.index,
            chunked: self.config.is_chunked(),
            patients,
        })
    }

    /// Generate every chunk in order without writing anything
    pub fn chunks(&self) -> impl Iterator<Item = Result<Chunk, GenerateError>> + '_ {
        self.config
            .chunks()
            .map(move |plan| self.generate_chunk(&plan))
    }

    pub fn run<S: RecordSink>(&self, sink: &mut S) -> Result<RunSummary, RunError> {
        info!(
            seed = self.seed,
            patients = self.config.patient_count,
            chunks = self.config.chunk_count(),
            genomics = self.config.genomics,
            "starting generation"
        );

        let mut artifacts = Vec::with_capacity(self.config.chunk_count());
        for plan in self.config.chunks() {
            if self.cancel.load(Ordering::Relaxed) {
                warn!(chunks_written = artifacts.len(), "generation cancelled");
                return Err(RunError::Cancelled {
                    chunks_written: artifacts.len(),
                });
            }
            let chunk = self.generate_chunk(&plan)?;
            let written = sink.write_chunk(&chunk)?;
            info!(
                chunk = written.index,
                rows = written.rows,
                files = written.paths.len(),
                "flushed chunk"
            );
            artifacts.push(written);
        }

        info!(seed = self.seed, chunks = artifacts.len(), "generation finished");
        Ok(RunSummary {
            seed: self.seed,
            patients: self.config.patient_count,
            artifacts,
        })
    }
}
