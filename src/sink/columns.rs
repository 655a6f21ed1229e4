//! Conversion between patient records and Arrow record batches.
//!
//! The same schema is used for the CSV and the Parquet artifact,
//! so that both can be read back into identical records.

use std::collections::HashMap;
use std::sync::Arc;

use datafusion::arrow::array::{Array, ArrayRef, Int32Array, Int32Builder, Int64Array, StringArray};
use datafusion::arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use datafusion::arrow::error::ArrowError;
use datafusion::arrow::record_batch::RecordBatch;

use crate::comorbidity::{comorbidity_factor, COMORBIDITY_CATALOG};
use crate::error::SinkError;
use crate::mutation::{panel_gene, MutationPanel, BASES_PER_READ};
use crate::patient::PatientRecord;

pub const PATIENT_ID: &str = "patient_id";
pub const CANCER_TYPE: &str = "cancer_type";
pub const AGE: &str = "age";
pub const GENDER: &str = "gender";
pub const SMOKING_STATUS: &str = "smoking_status";
pub const COUNTRY: &str = "country";
pub const TREATMENT: &str = "treatment";
pub const MEDICATION: &str = "medication";
pub const OUTCOME: &str = "outcome";
pub const COMORBIDITIES: &str = "comorbidities";
pub const GENE_MUTATIONS: &str = "gene_mutations";
pub const MUTATIONS: &str = "mutations";

/// Schema of the main oncology table
pub fn patient_schema(genomics: bool) -> SchemaRef {
    let mut fields = vec![
        Field::new(PATIENT_ID, DataType::Int64, true),
        Field::new(CANCER_TYPE, DataType::Utf8, true),
        Field::new(AGE, DataType::Int32, true),
        Field::new(GENDER, DataType::Utf8, true),
        Field::new(SMOKING_STATUS, DataType::Utf8, true),
        Field::new(COUNTRY, DataType::Utf8, true),
        Field::new(TREATMENT, DataType::Utf8, true),
        Field::new(MEDICATION, DataType::Utf8, true),
        Field::new(OUTCOME, DataType::Utf8, true),
        Field::new(COMORBIDITIES, DataType::Utf8, true),
    ];
    if genomics {
        fields.push(Field::new(GENE_MUTATIONS, DataType::Utf8, true));
    }
    Arc::new(Schema::new(fields))
}

/// Schema of the patient_id to mutation list summary table
pub fn mutation_summary_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new(PATIENT_ID, DataType::Int64, true),
        Field::new(MUTATIONS, DataType::Utf8, true),
    ]))
}

fn string_column<'a>(values: impl Iterator<Item = &'a str>) -> ArrayRef {
    Arc::new(values.map(Some).collect::<StringArray>())
}

/// Convert records into a table with the patient schema. Records
/// without gene mutations get an empty gene_mutations entry when
/// `genomics` is set.
pub fn records_to_batch(
    records: &[&PatientRecord],
    genomics: bool,
) -> Result<RecordBatch, ArrowError> {
    let comorbidities: Vec<String> = records.iter().map(|r| r.comorbidities_joined()).collect();

    let mut columns: Vec<ArrayRef> = vec![
        Arc::new(Int64Array::from_iter_values(
            records.iter().map(|r| r.patient_id as i64),
        )),
        string_column(records.iter().map(|r| &*r.cancer_type)),
        Arc::new(Int32Array::from_iter_values(
            records.iter().map(|r| r.age as i32),
        )),
        string_column(records.iter().map(|r| r.gender.as_str())),
        string_column(records.iter().map(|r| r.smoking_status.as_str())),
        string_column(records.iter().map(|r| r.country.as_str())),
        string_column(records.iter().map(|r| &*r.treatment)),
        string_column(records.iter().map(|r| &*r.medication)),
        string_column(records.iter().map(|r| r.outcome.as_str())),
        string_column(comorbidities.iter().map(String::as_str)),
    ];
    if genomics {
        let mutations: Vec<String> = records
            .iter()
            .map(|r| r.gene_mutations_joined().unwrap_or_default())
            .collect();
        columns.push(string_column(mutations.iter().map(String::as_str)));
    }

    RecordBatch::try_new(patient_schema(genomics), columns)
}

/// The patient_id to mutation list summary for a chunk
pub fn mutation_summary_batch(
    panels: &[(u64, &MutationPanel)],
) -> Result<RecordBatch, ArrowError> {
    let joined: Vec<String> = panels.iter().map(|(_, p)| p.joined()).collect();
    RecordBatch::try_new(
        mutation_summary_schema(),
        vec![
            Arc::new(Int64Array::from_iter_values(
                panels.iter().map(|(id, _)| *id as i64),
            )),
            string_column(joined.iter().map(String::as_str)),
        ],
    )
}

/// The read matrix of one patient as a four-column table. The
/// patient id and mutation list are attached as schema metadata.
pub fn reads_batch(patient_id: u64, panel: &MutationPanel) -> Result<RecordBatch, ArrowError> {
    let mut metadata = HashMap::new();
    metadata.insert(String::from(PATIENT_ID), patient_id.to_string());
    metadata.insert(String::from(MUTATIONS), panel.joined());

    let fields: Vec<Field> = (0..BASES_PER_READ)
        .map(|b| Field::new(format!("base_{b}"), DataType::Int32, false))
        .collect();
    let schema = Arc::new(Schema::new_with_metadata(fields, metadata));

    let columns = (0..BASES_PER_READ)
        .map(|b| {
            let mut builder = Int32Builder::with_capacity(panel.reads.len());
            for read in &panel.reads {
                builder.append_value(read[b]);
            }
            Arc::new(builder.finish()) as ArrayRef
        })
        .collect();

    RecordBatch::try_new(schema, columns)
}

fn column<'a, T: 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T, SinkError> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<T>())
        .ok_or_else(|| SinkError::Column {
            column: name.to_string(),
        })
}

/// Null and empty strings are both read as empty (CSV readers
/// differ in how they treat an empty field).
fn string_value(array: &StringArray, row: usize) -> &str {
    if array.is_null(row) {
        ""
    } else {
        array.value(row)
    }
}

fn parse_value<T: std::str::FromStr>(column: &str, value: &str) -> Result<T, SinkError> {
    value.parse().map_err(|_| SinkError::Value {
        column: column.to_string(),
        value: value.to_string(),
    })
}

fn split_tokens(
    column: &str,
    joined: &str,
    lookup: impl Fn(&str) -> Option<&'static str>,
) -> Result<Vec<&'static str>, SinkError> {
    if joined.is_empty() {
        return Ok(Vec::new());
    }
    joined
        .split(',')
        .map(|token| {
            lookup(token).ok_or_else(|| SinkError::Value {
                column: column.to_string(),
                value: token.to_string(),
            })
        })
        .collect()
}

fn catalog_comorbidity(name: &str) -> Option<&'static str> {
    COMORBIDITY_CATALOG.iter().copied().find(|c| *c == name)
}

/// Read patient records back from a table with the patient schema.
///
/// The comorbidity factor is not stored in the table; it is derived
/// again from the number of comorbidities.
pub fn records_from_batch(batch: &RecordBatch) -> Result<Vec<PatientRecord>, SinkError> {
    let patient_id = column::<Int64Array>(batch, PATIENT_ID)?;
    let cancer_type = column::<StringArray>(batch, CANCER_TYPE)?;
    let age = column::<Int32Array>(batch, AGE)?;
    let gender = column::<StringArray>(batch, GENDER)?;
    let smoking_status = column::<StringArray>(batch, SMOKING_STATUS)?;
    let country = column::<StringArray>(batch, COUNTRY)?;
    let treatment = column::<StringArray>(batch, TREATMENT)?;
    let medication = column::<StringArray>(batch, MEDICATION)?;
    let outcome = column::<StringArray>(batch, OUTCOME)?;
    let comorbidities = column::<StringArray>(batch, COMORBIDITIES)?;
    let gene_mutations = if batch.schema().column_with_name(GENE_MUTATIONS).is_some() {
        Some(column::<StringArray>(batch, GENE_MUTATIONS)?)
    } else {
        None
    };

    (0..batch.num_rows())
        .map(|row| -> Result<PatientRecord, SinkError> {
            let comorbidities = split_tokens(
                COMORBIDITIES,
                string_value(comorbidities, row),
                catalog_comorbidity,
            )?;
            let gene_mutations = match gene_mutations {
                Some(array) => Some(split_tokens(
                    GENE_MUTATIONS,
                    string_value(array, row),
                    panel_gene,
                )?),
                None => None,
            };
            Ok(PatientRecord {
                patient_id: patient_id.value(row) as u64,
                cancer_type: Arc::from(string_value(cancer_type, row)),
                age: age.value(row) as u32,
                gender: parse_value(GENDER, string_value(gender, row))?,
                smoking_status: parse_value(SMOKING_STATUS, string_value(smoking_status, row))?,
                country: parse_value(COUNTRY, string_value(country, row))?,
                treatment: Arc::from(string_value(treatment, row)),
                medication: Arc::from(string_value(medication, row)),
                outcome: parse_value(OUTCOME, string_value(outcome, row))?,
                comorbidity_factor: comorbidity_factor(comorbidities.len()),
                comorbidities,
                gene_mutations,
            })
        })
        .collect()
}
