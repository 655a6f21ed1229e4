use std::fs;
use std::path::PathBuf;
use std::sync::atomic::Ordering;

use anyhow::Context;
use clap::Parser;
use datafusion::prelude::*;
use tracing::{info, warn};

use oncogen::comorbidity::ComorbidityPolicy;
use oncogen::logging::init_logging;
use oncogen::{FileSink, GenerationConfig, Generator, Preset, ProfileSet};

/// Generate a synthetic oncology dataset
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Starting configuration; the options below override it
    #[arg(long, value_enum, default_value_t = Preset::Classic)]
    preset: Preset,

    /// Number of patients
    #[arg(long)]
    patients: Option<u64>,

    /// Patients per output chunk (the last chunk may be smaller)
    #[arg(long)]
    chunk_size: Option<u64>,

    /// Write the whole dataset as one artifact, even for the chunked preset
    #[arg(long, conflicts_with = "chunk_size")]
    no_chunks: bool,

    /// Global seed (drawn at random and logged when absent)
    #[arg(long)]
    seed: Option<u64>,

    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Yaml file with the cancer profiles to use
    #[arg(long)]
    profiles: Option<PathBuf>,

    /// Generate gene mutations and read matrices
    #[arg(long)]
    genomics: bool,

    /// Draw comorbidity names without repeats
    #[arg(long)]
    distinct_comorbidities: bool,

    /// Extra attempts at writing a failed chunk
    #[arg(long, default_value_t = 0)]
    retries: u32,

    /// Print the first rows of the first chunk when finished
    #[arg(long)]
    show: bool,

    /// Print the active cancer profiles as yaml and exit
    #[arg(long)]
    dump_profiles: bool,
}

impl Args {
    fn into_config(self) -> anyhow::Result<GenerationConfig> {
        let mut config = GenerationConfig::preset(self.preset);
        if let Some(patients) = self.patients {
            config.patient_count = patients;
        }
        if self.no_chunks {
            config.chunk_size = None;
        } else if self.chunk_size.is_some() {
            config.chunk_size = self.chunk_size;
        }
        config.seed = self.seed;
        if let Some(output_dir) = self.output_dir {
            config.output_dir = output_dir;
        }
        if let Some(path) = self.profiles {
            let file = fs::File::open(&path)
                .with_context(|| format!("Failed to open profile file {}", path.display()))?;
            config.profiles = ProfileSet::from_reader(file)?;
        }
        config.genomics |= self.genomics;
        if self.distinct_comorbidities {
            config.comorbidity_policy = ComorbidityPolicy::Distinct;
        }
        config.write_retries = self.retries;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    init_logging();

    let args = Args::parse();
    let show = args.show;
    let dump_profiles = args.dump_profiles;
    let config = args.into_config()?;

    if dump_profiles {
        print!("{}", config.profiles.to_yaml()?);
        return Ok(());
    }

    let generator = Generator::new(config)?;
    let mut sink = FileSink::new(&generator.config().output_dir, generator.config().genomics)
        .with_retries(generator.config().write_retries);
    let first_parquet = sink.parquet_path(0, generator.config().is_chunked());

    let cancel = generator.cancel_flag();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, stopping after the current chunk");
            cancel.store(true, Ordering::Relaxed);
        }
    });

    let summary = tokio::task::spawn_blocking(move || generator.run(&mut sink)).await??;
    info!(
        seed = summary.seed,
        patients = summary.patients,
        files = summary.paths().count(),
        "synthetic oncology data written"
    );

    if show {
        let ctx = SessionContext::new();
        let df = ctx
            .read_parquet(
                first_parquet.to_string_lossy().to_string(),
                ParquetReadOptions::default(),
            )
            .await?;
        df.show_limit(10).await?;
    }

    Ok(())
}
