//! Treatment, medication and survival outcome.
//!
//! Given the cancer type, age and comorbidity factor of a patient,
//! the model:
//! * draws a treatment from the cancer type's treatment table;
//! * draws a medication from the medication table (independently
//!   of the treatment);
//! * resolves the base survival rate from the ordered rule table
//!   of the cancer type (first matching rule wins);
//! * multiplies by the comorbidity factor, clamps to [0, 1], and
//!   draws the outcome.
//!

use std::sync::Arc;

use rand::prelude::*;

use crate::error::GenerateError;
use crate::profile::ConfigTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Survived,
    Deceased,
}

column_enum!(Outcome {
    Survived => "survived",
    Deceased => "deceased",
});

/// Treatment part of a patient record
#[derive(Debug, Clone, PartialEq)]
pub struct TreatmentOutcome {
    pub treatment: Arc<str>,
    pub medication: Arc<str>,
    /// Survival rate before the comorbidity adjustment
    pub base_rate: f64,
    pub outcome: Outcome,
}

/// Survival probability after the comorbidity adjustment.
///
/// A negative factor (twenty or more comorbidities) gives zero.
pub fn adjusted_rate(base_rate: f64, comorbidity_factor: f64) -> f64 {
    (base_rate * comorbidity_factor).clamp(0.0, 1.0)
}

/// Bernoulli draw of the outcome
pub fn draw_outcome<R: Rng + ?Sized>(rng: &mut R, survival_probability: f64) -> Outcome {
    if rng.gen::<f64>() < survival_probability {
        Outcome::Survived
    } else {
        Outcome::Deceased
    }
}

/// Look up the base survival rate for a cancer type.
///
/// Fails if the cancer type has no rule table, rather than
/// silently falling back to some default.
pub fn base_rate(
    table: &ConfigTable,
    cancer_type: &str,
    treatment: &str,
    medication: &str,
    age: u32,
) -> Result<f64, GenerateError> {
    let profile = table
        .profile(cancer_type)
        .ok_or_else(|| GenerateError::UnknownCancerType(cancer_type.to_string()))?;
    Ok(profile.base_rate(treatment, medication, age))
}

/// Sample treatment, medication and outcome for one patient
pub fn make_treatment_outcome<R: Rng + ?Sized>(
    rng: &mut R,
    table: &ConfigTable,
    cancer_type: &str,
    age: u32,
    comorbidity_factor: f64,
) -> Result<TreatmentOutcome, GenerateError> {
    let profile = table
        .profile(cancer_type)
        .ok_or_else(|| GenerateError::UnknownCancerType(cancer_type.to_string()))?;

    let treatment = profile.treatments.sample(rng);
    let medication = profile.medications.sample(rng);
    let base_rate = profile.base_rate(&treatment, &medication, age);
    let outcome = draw_outcome(rng, adjusted_rate(base_rate, comorbidity_factor));

    Ok(TreatmentOutcome {
        treatment,
        medication,
        base_rate,
        outcome,
    })
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::presets;
    use crate::seeded_rng::make_rng;

    fn all_profiles() -> ConfigTable {
        presets::all_profiles().compile().unwrap()
    }

    fn rate(cancer: &str, treatment: &str, medication: &str, age: u32) -> f64 {
        base_rate(&all_profiles(), cancer, treatment, medication, age).unwrap()
    }

    #[test]
    fn lung_rule_table() {
        assert_eq!(rate("lung", "surgery", "osimertinib", 60), 0.50);
        assert_eq!(rate("lung", "chemotherapy", "cisplatin", 60), 0.20);
        assert_eq!(rate("lung", "chemotherapy", "carboplatin", 60), 0.20);
        assert_eq!(rate("lung", "chemotherapy", "osimertinib", 60), 0.40);
        assert_eq!(rate("lung", "radiation", "osimertinib", 60), 0.40);
        assert_eq!(rate("lung", "radiation", "cisplatin", 60), 0.19);
        assert_eq!(rate("lung", "chemotherapy", "paclitaxel", 60), 0.19);
    }

    #[test]
    fn breast_rule_table() {
        assert_eq!(rate("breast", "surgery", "trastuzumab", 60), 0.85);
        assert_eq!(rate("breast", "radiation", "trastuzumab", 60), 0.70);
        assert_eq!(rate("breast", "radiation", "tamoxifen", 60), 0.60);
    }

    #[test]
    fn leukemia_rule_table() {
        assert_eq!(rate("leukemia", "stem cell transplant", "imatinib", 60), 0.60);
        assert_eq!(rate("leukemia", "chemotherapy", "imatinib", 60), 0.50);
    }

    #[test]
    fn colorectal_surgery_depends_on_age() {
        assert_eq!(rate("colorectal", "surgery", "oxaliplatin", 69), 0.90);
        assert_eq!(rate("colorectal", "surgery", "oxaliplatin", 70), 0.80);
        assert_eq!(rate("colorectal", "chemotherapy", "oxaliplatin", 50), 0.60);
        assert_eq!(rate("colorectal", "chemotherapy", "5-FU", 50), 0.65);
    }

    #[test]
    fn stomach_rule_table() {
        assert_eq!(rate("stomach", "surgery", "trastuzumab", 60), 0.70);
        assert_eq!(rate("stomach", "combination", "trastuzumab", 60), 0.40);
        assert_eq!(rate("stomach", "combination", "cisplatin", 60), 0.31);
    }

    #[test]
    fn unknown_cancer_type_is_an_error() {
        let table = all_profiles();
        let mut rng = make_rng(0, "outcome");
        assert_eq!(
            make_treatment_outcome(&mut rng, &table, "pancreatic", 60, 1.0),
            Err(GenerateError::UnknownCancerType(String::from("pancreatic")))
        );
    }

    #[test]
    fn adjusted_rate_is_clamped() {
        assert_eq!(adjusted_rate(0.5, -0.1), 0.0);
        assert_eq!(adjusted_rate(0.9, 2.0), 1.0);
        assert!((adjusted_rate(0.5, 0.9) - 0.45).abs() < 1e-12);
    }

    #[test]
    fn negative_factor_forces_deceased() {
        let mut rng = make_rng(0, "negative");
        for _ in 0..1000 {
            assert_eq!(draw_outcome(&mut rng, adjusted_rate(0.9, -0.25)), Outcome::Deceased);
        }
    }

    #[test]
    fn treatment_and_medication_come_from_the_profile() {
        let table = all_profiles();
        let mut rng = make_rng(4, "membership");
        for cancer in table.cancer_types() {
            let profile = table.profile(cancer).unwrap();
            for _ in 0..200 {
                let t = make_treatment_outcome(&mut rng, &table, cancer, 65, 1.0).unwrap();
                assert!(profile.treatments.contains(&t.treatment));
                assert!(profile.medications.contains(&t.medication));
            }
        }
    }

    /// Monte Carlo calibration: with a fixed treatment, medication and
    /// a comorbidity factor of one, the empirical survival rate must
    /// converge to the base rate.
    #[test]
    fn survival_rate_converges_to_base_rate() {
        let table = all_profiles();
        let mut rng = make_rng(42, "calibration");
        let n = 100_000;
        for (cancer, treatment, medication, age) in [
            ("lung", "chemotherapy", "cisplatin", 60),
            ("breast", "surgery", "tamoxifen", 60),
            ("colorectal", "surgery", "5-FU", 75),
        ] {
            let p = base_rate(&table, cancer, treatment, medication, age).unwrap();
            let survived = (0..n)
                .filter(|_| draw_outcome(&mut rng, adjusted_rate(p, 1.0)) == Outcome::Survived)
                .count();
            let empirical = survived as f64 / n as f64;
            assert!(
                (empirical - p).abs() < 0.02,
                "{cancer}: empirical {empirical}, expected {p}"
            );
        }
    }

    #[test]
    fn sampled_outcomes_track_the_profile_mix() {
        let table = all_profiles();
        let mut rng = make_rng(43, "mix");
        let n = 50_000;
        let mut expected = 0.0;
        let mut survived = 0;
        for _ in 0..n {
            let t = make_treatment_outcome(&mut rng, &table, "stomach", 60, 0.9).unwrap();
            expected += adjusted_rate(t.base_rate, 0.9);
            if t.outcome == Outcome::Survived {
                survived += 1;
            }
        }
        let empirical = survived as f64 / n as f64;
        assert!((empirical - expected / n as f64).abs() < 0.02);
    }

    #[test]
    fn outcome_names_parse_back() {
        for outcome in [Outcome::Survived, Outcome::Deceased] {
            assert_eq!(outcome.to_string().parse::<Outcome>(), Ok(outcome));
        }
        assert_eq!(Outcome::Deceased.as_str(), "deceased");
        assert!("alive".parse::<Outcome>().is_err());
    }
}
