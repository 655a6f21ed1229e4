//! CSV and Parquet output
//!
//! For every chunk the file sink writes:
//! * `<stem>.csv` and `<stem>.parquet`, holding the same rows in the
//!   same order;
//! * when genomic data is present, a `patient_<id>.parquet` side file
//!   per patient (read matrix, with the mutation list in the schema
//!   metadata) and a `patient_data` summary CSV of patient_id to
//!   mutation list.
//!
//! The stem is `synthetic_oncology_data` for a run written in one
//! piece, and `synthetic_oncology_data_chunk_<k>` for chunk k of a
//! chunked run.
//!
//! Every file of a chunk is first written under a temporary name. The
//! files are only renamed into place once the whole chunk has been
//! written, so a failing chunk never leaves a half-written artifact
//! and never touches the files of earlier chunks.
//!

use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use datafusion::arrow::csv;
use datafusion::arrow::record_batch::RecordBatch;
use datafusion::parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use datafusion::parquet::arrow::arrow_writer::ArrowWriter;
use tracing::{debug, warn};

use super::columns::{mutation_summary_batch, reads_batch, records_to_batch};
use super::{Chunk, ChunkArtifacts, RecordSink};
use crate::error::SinkError;
use crate::mutation::MutationPanel;

const DATASET_STEM: &str = "synthetic_oncology_data";
const SUMMARY_STEM: &str = "patient_data";
const TEMP_SUFFIX: &str = "tmp";

/// Delay before the first retry; doubled on every further attempt
const INITIAL_BACKOFF: Duration = Duration::from_millis(100);

fn chunk_stem(stem: &str, index: usize, chunked: bool) -> String {
    if chunked {
        format!("{stem}_chunk_{index}")
    } else {
        stem.to_string()
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".");
    name.push(TEMP_SUFFIX);
    path.with_file_name(name)
}

/// Write a record batch to a parquet file
pub fn save_record_batch(path: &Path, batch: &RecordBatch) -> Result<(), SinkError> {
    let file = fs::File::create(path).map_err(|e| SinkError::io(path, e))?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None)?;
    writer.write(batch)?;
    writer.close()?;
    Ok(())
}

/// Read every record batch in a parquet file
pub fn load_record_batches(path: &Path) -> Result<Vec<RecordBatch>, SinkError> {
    let file = fs::File::open(path).map_err(|e| SinkError::io(path, e))?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;
    let batches = reader.collect::<Result<Vec<_>, _>>()?;
    debug!(
        path = %path.display(),
        rows = batches.iter().map(|b| b.num_rows()).sum::<usize>(),
        "loaded parquet file"
    );
    Ok(batches)
}

fn save_csv(path: &Path, batch: &RecordBatch) -> Result<(), SinkError> {
    let file = fs::File::create(path).map_err(|e| SinkError::io(path, e))?;
    let mut writer = csv::Writer::new(file);
    writer.write(batch)?;
    Ok(())
}

/// Files written for one chunk, under their temporary names until
/// the chunk is committed
#[derive(Default)]
struct PendingFiles {
    files: Vec<(PathBuf, PathBuf)>,
}

impl PendingFiles {
    fn write(
        &mut self,
        path: PathBuf,
        save: impl FnOnce(&Path) -> Result<(), SinkError>,
    ) -> Result<(), SinkError> {
        let temp = temp_path(&path);
        self.files.push((temp.clone(), path));
        save(&temp)
    }

    /// Rename every file into place. If one rename fails, the files
    /// already renamed are removed again and the remaining temporary
    /// files are cleaned up on drop, so the chunk leaves nothing behind.
    fn commit(mut self) -> Result<Vec<PathBuf>, SinkError> {
        let mut committed = Vec::with_capacity(self.files.len());
        while !self.files.is_empty() {
            let (temp, path) = &self.files[0];
            if let Err(e) = fs::rename(temp, path) {
                let err = SinkError::io(path, e);
                for path in &committed {
                    let _ = fs::remove_file(path);
                }
                return Err(err);
            }
            let (_, path) = self.files.remove(0);
            committed.push(path);
        }
        Ok(committed)
    }
}

impl Drop for PendingFiles {
    fn drop(&mut self) {
        // Only non-empty if the chunk was not committed
        for (temp, _) in self.files.drain(..) {
            let _ = fs::remove_file(temp);
        }
    }
}

/// Writes chunks as CSV and Parquet files in a directory
#[derive(Debug, Clone)]
pub struct FileSink {
    output_dir: PathBuf,
    genomics: bool,
    retries: u32,
}

impl FileSink {
    pub fn new(output_dir: impl Into<PathBuf>, genomics: bool) -> Self {
        Self {
            output_dir: output_dir.into(),
            genomics,
            retries: 0,
        }
    }

    /// Retry a failed chunk this many extra times
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Path of the parquet artifact for a chunk
    pub fn parquet_path(&self, index: usize, chunked: bool) -> PathBuf {
        self.artifact_path(DATASET_STEM, index, chunked, "parquet")
    }

    /// Path of the csv artifact for a chunk
    pub fn csv_path(&self, index: usize, chunked: bool) -> PathBuf {
        self.artifact_path(DATASET_STEM, index, chunked, "csv")
    }

    /// Path of the mutation summary for a chunk
    pub fn summary_path(&self, index: usize, chunked: bool) -> PathBuf {
        self.artifact_path(SUMMARY_STEM, index, chunked, "csv")
    }

    /// Path of the per-patient genomic side file
    pub fn side_file_path(&self, patient_id: u64) -> PathBuf {
        self.output_dir.join(format!("patient_{patient_id}.parquet"))
    }

    fn artifact_path(&self, stem: &str, index: usize, chunked: bool, extension: &str) -> PathBuf {
        let stem = chunk_stem(stem, index, chunked);
        self.output_dir.join(format!("{stem}.{extension}"))
    }

    fn try_write_chunk(&self, chunk: &Chunk) -> Result<Vec<PathBuf>, SinkError> {
        fs::create_dir_all(&self.output_dir).map_err(|e| SinkError::io(&self.output_dir, e))?;

        let batch = records_to_batch(&chunk.records(), self.genomics)?;

        let mut pending = PendingFiles::default();
        pending.write(self.csv_path(chunk.index, chunk.chunked), |p| {
            save_csv(p, &batch)
        })?;
        pending.write(self.parquet_path(chunk.index, chunk.chunked), |p| {
            save_record_batch(p, &batch)
        })?;

        if self.genomics {
            let panels: Vec<(u64, &MutationPanel)> = chunk
                .patients
                .iter()
                .filter_map(|p| p.panel.as_ref().map(|panel| (p.record.patient_id, panel)))
                .collect();
            for (patient_id, panel) in &panels {
                let reads = reads_batch(*patient_id, panel)?;
                pending.write(self.side_file_path(*patient_id), |p| {
                    save_record_batch(p, &reads)
                })?;
            }
            let summary = mutation_summary_batch(&panels)?;
            pending.write(self.summary_path(chunk.index, chunk.chunked), |p| {
                save_csv(p, &summary)
            })?;
        }

        pending.commit()
    }
}

impl RecordSink for FileSink {
    fn write_chunk(&mut self, chunk: &Chunk) -> Result<ChunkArtifacts, SinkError> {
        let mut backoff = INITIAL_BACKOFF;
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.try_write_chunk(chunk) {
                Ok(paths) => {
                    return Ok(ChunkArtifacts {
                        index: chunk.index,
                        rows: chunk.len(),
                        paths,
                    })
                }
                Err(err) if attempt <= self.retries => {
                    warn!(chunk = chunk.index, attempt, error = %err, "chunk write failed, retrying");
                    thread::sleep(backoff);
                    backoff *= 2;
                }
                Err(err) => {
                    return Err(SinkError::Chunk {
                        chunk: chunk.index,
                        attempts: attempt,
                        source: Box::new(err),
                    })
                }
            }
        }
    }
}
