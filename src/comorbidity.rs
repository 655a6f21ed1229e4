//! Comorbidities and the survival factor derived from them.

use rand::prelude::*;
use rand_distr::Poisson;

pub const COMORBIDITY_CATALOG: [&str; 5] = [
    "hypertension",
    "diabetes",
    "COPD",
    "cardiovascular disease",
    "chronic kidney disease",
];

/// Mean number of comorbidities per patient
pub const COMORBIDITY_RATE: f64 = 2.0;

/// Reduction in survival probability per comorbidity
pub const FACTOR_STEP: f64 = 0.05;

/// How names are drawn from the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ComorbidityPolicy {
    /// Independent draws; the same name may appear more than once
    #[default]
    WithReplacement,
    /// No repeated names; the count is capped at the catalog size
    Distinct,
}

/// The comorbidity part of a patient record
#[derive(Debug, Clone, PartialEq)]
pub struct Comorbidities {
    pub names: Vec<&'static str>,
    pub factor: f64,
}

impl Comorbidities {
    pub fn count(&self) -> usize {
        self.names.len()
    }

    pub fn joined(&self) -> String {
        self.names.join(",")
    }
}

/// Survival multiplier for a number of comorbidities.
///
/// Not floored: twenty or more comorbidities give a factor of
/// zero or below.
pub fn comorbidity_factor(count: usize) -> f64 {
    1.0 - FACTOR_STEP * count as f64
}

#[derive(Debug, Clone)]
pub struct ComorbiditySampler {
    count: Poisson<f64>,
    policy: ComorbidityPolicy,
}

impl ComorbiditySampler {
    pub fn new(policy: ComorbidityPolicy) -> Self {
        Self {
            count: Poisson::new(COMORBIDITY_RATE).expect("constant rate is positive"),
            policy,
        }
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Comorbidities {
        let draw: f64 = rng.sample(&self.count);
        let count = draw as usize;
        let names: Vec<&'static str> = match self.policy {
            ComorbidityPolicy::WithReplacement => (0..count)
                .map(|_| COMORBIDITY_CATALOG[rng.gen_range(0..COMORBIDITY_CATALOG.len())])
                .collect(),
            ComorbidityPolicy::Distinct => COMORBIDITY_CATALOG
                .choose_multiple(rng, count.min(COMORBIDITY_CATALOG.len()))
                .copied()
                .collect(),
        };
        let factor = comorbidity_factor(names.len());
        Comorbidities { names, factor }
    }
}

impl Default for ComorbiditySampler {
    fn default() -> Self {
        Self::new(ComorbidityPolicy::default())
    }
}
