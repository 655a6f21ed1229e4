use std::collections::HashSet;
use std::fs;

use datafusion::arrow::array::{Array, Int64Array, StringArray};
use datafusion::arrow::csv::ReaderBuilder;
use datafusion::parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use datafusion::prelude::*;
use tempfile::TempDir;

use oncogen::mutation::{GENE_PANEL, MAX_MUTATIONS, MIN_MUTATIONS, READ_COUNT};
use oncogen::sink::columns::mutation_summary_schema;
use oncogen::sink::{load_record_batches, patient_schema, records_from_batch};
use oncogen::{FileSink, GenerationConfig, Generator, PatientRecord, Preset};

fn run(config: GenerationConfig) -> (oncogen::RunSummary, FileSink) {
    let generator = Generator::new(config).unwrap();
    let mut sink = FileSink::new(&generator.config().output_dir, generator.config().genomics);
    let summary = generator.run(&mut sink).unwrap();
    (summary, sink)
}

fn parquet_records(sink: &FileSink, index: usize, chunked: bool) -> Vec<PatientRecord> {
    load_record_batches(&sink.parquet_path(index, chunked))
        .unwrap()
        .iter()
        .flat_map(|b| records_from_batch(b).unwrap())
        .collect()
}

#[test]
fn chunked_run_writes_one_pair_per_chunk() {
    let dir = TempDir::new().unwrap();
    let config = GenerationConfig {
        patient_count: 25,
        chunk_size: Some(10),
        seed: Some(3),
        output_dir: dir.path().to_path_buf(),
        ..GenerationConfig::preset(Preset::Chunked)
    };
    let (summary, sink) = run(config);
    assert_eq!(summary.chunks_written(), 3);

    let mut ids = Vec::new();
    for index in 0..3 {
        assert!(sink.csv_path(index, true).exists());
        let records = parquet_records(&sink, index, true);
        assert_eq!(records.len(), if index < 2 { 10 } else { 5 });
        ids.extend(records.iter().map(|r| r.patient_id));
    }
    assert_eq!(ids, (1..=25).collect::<Vec<_>>());
    assert!(!sink.parquet_path(3, true).exists());
    assert!(!dir.path().join("synthetic_oncology_data.parquet").exists());
}

#[test]
fn same_seed_gives_identical_files() {
    let first = TempDir::new().unwrap();
    let second = TempDir::new().unwrap();
    for dir in [&first, &second] {
        run(GenerationConfig {
            patient_count: 200,
            seed: Some(11),
            output_dir: dir.path().to_path_buf(),
            ..GenerationConfig::default()
        });
    }
    let a = fs::read(first.path().join("synthetic_oncology_data.csv")).unwrap();
    let b = fs::read(second.path().join("synthetic_oncology_data.csv")).unwrap();
    assert_eq!(a, b);
}

#[tokio::test]
async fn csv_and_parquet_hold_the_same_rows() {
    let dir = TempDir::new().unwrap();
    let (_, sink) = run(GenerationConfig {
        patient_count: 300,
        seed: Some(5),
        output_dir: dir.path().to_path_buf(),
        ..GenerationConfig::preset(Preset::Ngs)
    });

    // One partition, so the csv is scanned in file order
    let schema = patient_schema(true);
    let ctx = SessionContext::with_config(SessionConfig::new().with_target_partitions(1));
    let df = ctx
        .read_csv(
            sink.csv_path(0, false).to_string_lossy().to_string(),
            CsvReadOptions::new().schema(&schema),
        )
        .await
        .unwrap();
    let from_csv: Vec<PatientRecord> = df
        .collect()
        .await
        .unwrap()
        .iter()
        .flat_map(|b| records_from_batch(b).unwrap())
        .collect();

    assert_eq!(from_csv, parquet_records(&sink, 0, false));
}

#[test]
fn ngs_run_writes_genomic_side_files() {
    let dir = TempDir::new().unwrap();
    let (summary, sink) = run(GenerationConfig {
        seed: Some(21),
        output_dir: dir.path().to_path_buf(),
        ..GenerationConfig::preset(Preset::Ngs)
    });
    // main pair + summary + one side file per patient
    assert_eq!(summary.paths().count(), 3 + 10);
    assert!(sink.summary_path(0, false).exists());

    let records = parquet_records(&sink, 0, false);
    assert_eq!(
        records.iter().map(|r| r.patient_id).collect::<Vec<_>>(),
        (0..10).collect::<Vec<_>>()
    );
    let cancer_types: HashSet<&str> = ["lung", "breast", "leukemia", "colorectal"].into();
    for record in &records {
        assert!(cancer_types.contains(&*record.cancer_type));
        let genes = record.gene_mutations.as_ref().unwrap();
        assert!((MIN_MUTATIONS..=MAX_MUTATIONS).contains(&genes.len()));
        assert!(genes.iter().all(|g| GENE_PANEL.contains(g)));
        let distinct: HashSet<_> = genes.iter().collect();
        assert_eq!(distinct.len(), genes.len());

        let file = fs::File::open(sink.side_file_path(record.patient_id)).unwrap();
        let builder = ParquetRecordBatchReaderBuilder::try_new(file).unwrap();
        assert_eq!(
            builder.schema().metadata().get("mutations"),
            record.gene_mutations_joined().as_ref()
        );
        let rows: usize = builder
            .build()
            .unwrap()
            .map(|b| b.unwrap().num_rows())
            .sum();
        assert_eq!(rows, READ_COUNT);
    }
}

#[test]
fn chunked_ngs_run_writes_one_summary_per_chunk() {
    let dir = TempDir::new().unwrap();
    let (summary, sink) = run(GenerationConfig {
        patient_count: 7,
        chunk_size: Some(3),
        seed: Some(17),
        output_dir: dir.path().to_path_buf(),
        ..GenerationConfig::preset(Preset::Ngs)
    });
    assert_eq!(summary.chunks_written(), 3);
    assert!(!dir.path().join("patient_data.csv").exists());

    let schema = mutation_summary_schema();
    for (index, ids) in [(0, 0..3), (1, 3..6), (2, 6..7)] {
        let records = parquet_records(&sink, index, true);
        let file = fs::File::open(sink.summary_path(index, true)).unwrap();
        let reader = ReaderBuilder::new(schema.clone())
            .has_header(true)
            .build(file)
            .unwrap();
        let mut rows = Vec::new();
        for batch in reader {
            let batch = batch.unwrap();
            let patient_id = batch
                .column(0)
                .as_any()
                .downcast_ref::<Int64Array>()
                .unwrap();
            let mutations = batch
                .column(1)
                .as_any()
                .downcast_ref::<StringArray>()
                .unwrap();
            for row in 0..batch.num_rows() {
                rows.push((patient_id.value(row) as u64, mutations.value(row).to_string()));
            }
        }
        let expected: Vec<(u64, String)> = records
            .iter()
            .map(|r| (r.patient_id, r.gene_mutations_joined().unwrap()))
            .collect();
        assert_eq!(rows, expected);
        assert_eq!(
            rows.iter().map(|(id, _)| *id).collect::<Vec<_>>(),
            ids.collect::<Vec<_>>()
        );
        for record in &records {
            assert!(sink.side_file_path(record.patient_id).exists());
        }
    }
}

#[test]
fn profiles_from_yaml_drive_generation() {
    let yaml = oncogen::presets::classic_profiles().to_yaml().unwrap();
    let profiles = oncogen::ProfileSet::from_reader(yaml.as_bytes()).unwrap();
    let dir = TempDir::new().unwrap();
    let (_, sink) = run(GenerationConfig {
        patient_count: 50,
        seed: Some(8),
        profiles,
        output_dir: dir.path().to_path_buf(),
        ..GenerationConfig::default()
    });
    let records = parquet_records(&sink, 0, false);
    assert_eq!(records.len(), 50);
    assert!(records.iter().all(|r| r.gene_mutations.is_none()));
}
