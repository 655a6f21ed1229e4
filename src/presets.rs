//! Built-in cancer profiles and run presets.
//!
//! There are two profile sets. The classic set (lung, colorectal,
//! stomach) is used by the small and the chunked runs; the NGS set
//! (lung, breast, leukemia, colorectal) by the genomic run. Each
//! cancer type has the same treatment, medication and survival rules
//! in every set it appears in; only the prevalence changes.
//!

use crate::demographics::SmokingStatus;
use crate::profile::{CancerProfile, Predicate, ProfileSet, SurvivalRule, Weighted};

fn weights(values: &[(&str, f64)]) -> Vec<Weighted<String>> {
    values
        .iter()
        .map(|(value, weight)| Weighted::new(value.to_string(), *weight))
        .collect()
}

pub fn lung(prevalence: f64) -> CancerProfile {
    CancerProfile {
        name: String::from("lung"),
        prevalence,
        treatments: weights(&[
            ("surgery", 0.2),
            ("chemotherapy", 0.4),
            ("radiation", 0.2),
            ("combination", 0.2),
        ]),
        medications: weights(&[
            ("cisplatin", 0.3),
            ("carboplatin", 0.3),
            ("paclitaxel", 0.2),
            ("osimertinib", 0.2),
        ]),
        smoking: Some(vec![
            Weighted::new(SmokingStatus::Current, 0.4),
            Weighted::new(SmokingStatus::Former, 0.4),
            Weighted::new(SmokingStatus::Never, 0.2),
        ]),
        rules: vec![
            SurvivalRule::new(Predicate::treatment("surgery"), 0.50),
            SurvivalRule::new(
                Predicate::treatment("chemotherapy").and_medication_in(&["cisplatin", "carboplatin"]),
                0.20,
            ),
            SurvivalRule::new(Predicate::medication_in(&["osimertinib"]), 0.40),
        ],
        default_rate: 0.19,
    }
}

pub fn breast(prevalence: f64) -> CancerProfile {
    CancerProfile {
        name: String::from("breast"),
        prevalence,
        treatments: weights(&[
            ("surgery", 0.3),
            ("chemotherapy", 0.3),
            ("radiation", 0.2),
            ("combination", 0.2),
        ]),
        medications: weights(&[
            ("tamoxifen", 0.3),
            ("anastrozole", 0.3),
            ("letrozole", 0.2),
            ("trastuzumab", 0.2),
        ]),
        smoking: None,
        rules: vec![
            SurvivalRule::new(Predicate::treatment("surgery"), 0.85),
            SurvivalRule::new(Predicate::medication_in(&["trastuzumab"]), 0.70),
        ],
        default_rate: 0.60,
    }
}

pub fn leukemia(prevalence: f64) -> CancerProfile {
    CancerProfile {
        name: String::from("leukemia"),
        prevalence,
        treatments: weights(&[
            ("chemotherapy", 0.5),
            ("radiation", 0.2),
            ("stem cell transplant", 0.3),
        ]),
        medications: weights(&[
            ("imatinib", 0.3),
            ("dasatinib", 0.3),
            ("nilotinib", 0.2),
            ("bosutinib", 0.2),
        ]),
        smoking: None,
        rules: vec![SurvivalRule::new(
            Predicate::treatment("stem cell transplant"),
            0.60,
        )],
        default_rate: 0.50,
    }
}

pub fn colorectal(prevalence: f64) -> CancerProfile {
    CancerProfile {
        name: String::from("colorectal"),
        prevalence,
        treatments: weights(&[
            ("surgery", 0.4),
            ("chemotherapy", 0.3),
            ("radiation", 0.1),
            ("combination", 0.2),
        ]),
        medications: weights(&[
            ("5-FU", 0.3),
            ("capecitabine", 0.3),
            ("oxaliplatin", 0.2),
            ("bevacizumab", 0.2),
        ]),
        smoking: None,
        rules: vec![
            SurvivalRule::new(Predicate::treatment("surgery").and_age_below(70), 0.90),
            SurvivalRule::new(Predicate::treatment("surgery"), 0.80),
            SurvivalRule::new(Predicate::medication_in(&["oxaliplatin"]), 0.60),
        ],
        default_rate: 0.65,
    }
}

pub fn stomach(prevalence: f64) -> CancerProfile {
    CancerProfile {
        name: String::from("stomach"),
        prevalence,
        treatments: weights(&[
            ("surgery", 0.3),
            ("chemotherapy", 0.3),
            ("radiation", 0.2),
            ("combination", 0.2),
        ]),
        medications: weights(&[
            ("fluorouracil", 0.3),
            ("cisplatin", 0.3),
            ("capecitabine", 0.2),
            ("trastuzumab", 0.2),
        ]),
        smoking: None,
        rules: vec![
            SurvivalRule::new(Predicate::treatment("surgery"), 0.70),
            SurvivalRule::new(Predicate::medication_in(&["trastuzumab"]), 0.40),
        ],
        default_rate: 0.31,
    }
}

/// Lung, colorectal and stomach in the ratio 2.1 : 1.8 : 1.0
pub fn classic_profiles() -> ProfileSet {
    let total = 2.1 + 1.8 + 1.0;
    ProfileSet {
        cancers: vec![
            lung(2.1 / total),
            colorectal(1.8 / total),
            stomach(1.0 / total),
        ],
    }
}

/// Lung, breast, leukemia and colorectal used with genomic data
pub fn ngs_profiles() -> ProfileSet {
    ProfileSet {
        cancers: vec![lung(0.25), breast(0.30), leukemia(0.15), colorectal(0.30)],
    }
}

/// Every built-in cancer type with equal prevalence
pub fn all_profiles() -> ProfileSet {
    ProfileSet {
        cancers: vec![
            lung(0.2),
            breast(0.2),
            leukemia(0.2),
            colorectal(0.2),
            stomach(0.2),
        ],
    }
}
