//! Record sinks: where finished chunks of patients go.
//!
//! Generation hands each finished chunk to a [`RecordSink`] exactly
//! once, in chunk order. The sink is the single writer of the run.

use std::path::PathBuf;

use crate::error::SinkError;
use crate::patient::{GeneratedPatient, PatientRecord};

pub use columns::{patient_schema, records_from_batch, records_to_batch};
pub use file::{load_record_batches, save_record_batch, FileSink};

pub mod columns;
mod file;

/// A bounded group of consecutive patients
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    /// Position of the chunk in the run (0, 1, ...)
    pub index: usize,
    /// Whether the run is split into chunks. Decides the artifact
    /// names, not the content.
    pub chunked: bool,
    pub patients: Vec<GeneratedPatient>,
}

impl Chunk {
    pub fn len(&self) -> usize {
        self.patients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patients.is_empty()
    }

    pub fn records(&self) -> Vec<&PatientRecord> {
        self.patients.iter().map(|p| &p.record).collect()
    }
}

/// What a sink produced for one chunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkArtifacts {
    pub index: usize,
    pub rows: usize,
    pub paths: Vec<PathBuf>,
}

pub trait RecordSink {
    /// Persist one chunk. A failure must leave the artifacts of
    /// earlier chunks untouched.
    fn write_chunk(&mut self, chunk: &Chunk) -> Result<ChunkArtifacts, SinkError>;
}

/// Keeps every chunk in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    pub chunks: Vec<Chunk>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> impl Iterator<Item = &PatientRecord> {
        self.chunks
            .iter()
            .flat_map(|c| c.patients.iter().map(|p| &p.record))
    }
}

impl RecordSink for MemorySink {
    fn write_chunk(&mut self, chunk: &Chunk) -> Result<ChunkArtifacts, SinkError> {
        self.chunks.push(chunk.clone());
        Ok(ChunkArtifacts {
            index: chunk.index,
            rows: chunk.len(),
            paths: Vec::new(),
        })
    }
}
