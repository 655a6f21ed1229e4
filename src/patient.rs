//! One synthetic patient, generated in a single pass.

use std::sync::Arc;

use crate::comorbidity::{ComorbidityPolicy, ComorbiditySampler};
use crate::demographics::{Country, DemographicSampler, Gender, SmokingStatus};
use crate::error::GenerateError;
use crate::mutation::{make_mutation_panel, MutationPanel};
use crate::outcome::{make_treatment_outcome, Outcome};
use crate::profile::ConfigTable;
use crate::seeded_rng::{patient_rng, CLINICAL_STREAM, GENOMIC_STREAM};

/// A row of the synthetic oncology table
#[derive(Debug, Clone, PartialEq)]
pub struct PatientRecord {
    pub patient_id: u64,
    pub cancer_type: Arc<str>,
    /// Age in years, between 18 and 90
    pub age: u32,
    pub gender: Gender,
    pub smoking_status: SmokingStatus,
    pub country: Country,
    pub treatment: Arc<str>,
    pub medication: Arc<str>,
    pub outcome: Outcome,
    /// Comorbidity names; may contain repeats
    pub comorbidities: Vec<&'static str>,
    /// Survival multiplier, 1 - 0.05 * comorbidities.len()
    pub comorbidity_factor: f64,
    /// Mutated genes (only when genomic data is generated)
    pub gene_mutations: Option<Vec<&'static str>>,
}

impl PatientRecord {
    pub fn comorbidities_joined(&self) -> String {
        self.comorbidities.join(",")
    }

    pub fn gene_mutations_joined(&self) -> Option<String> {
        self.gene_mutations.as_ref().map(|genes| genes.join(","))
    }
}

/// A record together with its genomic side payload
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedPatient {
    pub record: PatientRecord,
    pub panel: Option<MutationPanel>,
}

/// Generates patients from a shared, read-only configuration table.
///
/// Each patient is a pure function of the global seed and the
/// patient id, so patients can be generated in any order and on
/// any thread.
#[derive(Debug, Clone)]
pub struct PatientSampler {
    table: Arc<ConfigTable>,
    demographics: DemographicSampler,
    comorbidities: ComorbiditySampler,
    global_seed: u64,
    genomics: bool,
}

impl PatientSampler {
    pub fn new(
        table: Arc<ConfigTable>,
        global_seed: u64,
        policy: ComorbidityPolicy,
        genomics: bool,
    ) -> Self {
        Self {
            table,
            demographics: DemographicSampler::default(),
            comorbidities: ComorbiditySampler::new(policy),
            global_seed,
            genomics,
        }
    }

    pub fn table(&self) -> &ConfigTable {
        &self.table
    }

    pub fn generate(&self, patient_id: u64) -> Result<GeneratedPatient, GenerateError> {
        let mut rng = patient_rng(self.global_seed, CLINICAL_STREAM, patient_id);

        let demographics = self.demographics.sample(&mut rng, &self.table);
        let comorbidities = self.comorbidities.sample(&mut rng);
        let treatment = make_treatment_outcome(
            &mut rng,
            &self.table,
            &demographics.cancer_type,
            demographics.age,
            comorbidities.factor,
        )?;

        let panel = if self.genomics {
            let mut rng = patient_rng(self.global_seed, GENOMIC_STREAM, patient_id);
            Some(make_mutation_panel(&mut rng))
        } else {
            None
        };

        let record = PatientRecord {
            patient_id,
            cancer_type: demographics.cancer_type,
            age: demographics.age,
            gender: demographics.gender,
            smoking_status: demographics.smoking_status,
            country: demographics.country,
            treatment: treatment.treatment,
            medication: treatment.medication,
            outcome: treatment.outcome,
            comorbidity_factor: comorbidities.factor,
            comorbidities: comorbidities.names,
            gene_mutations: panel.as_ref().map(|p| p.mutations.clone()),
        };

        Ok(GeneratedPatient { record, panel })
    }
}
