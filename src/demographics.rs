//! Demographic columns: cancer type, age, gender, country and
//! smoking status.

use std::sync::Arc;

use rand::prelude::*;
use rand_distr::Normal;
use serde::{Deserialize, Serialize};

use crate::profile::{CompiledProfile, ConfigTable};

pub const AGE_MEAN: f64 = 65.0;
pub const AGE_SD: f64 = 10.0;
pub const MIN_AGE: u32 = 18;
pub const MAX_AGE: u32 = 90;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gender {
    Male,
    Female,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SmokingStatus {
    Current,
    Former,
    Never,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Country {
    US,
    China,
    India,
    Japan,
    Germany,
    UK,
}

pub const COUNTRIES: [Country; 6] = [
    Country::US,
    Country::China,
    Country::India,
    Country::Japan,
    Country::Germany,
    Country::UK,
];

column_enum!(Gender {
    Male => "male",
    Female => "female",
});

column_enum!(SmokingStatus {
    Current => "current",
    Former => "former",
    Never => "never",
});

column_enum!(Country {
    US => "US",
    China => "China",
    India => "India",
    Japan => "Japan",
    Germany => "Germany",
    UK => "UK",
});

/// The demographic part of a patient record
#[derive(Debug, Clone, PartialEq)]
pub struct Demographics {
    pub cancer_type: Arc<str>,
    pub age: u32,
    pub gender: Gender,
    pub smoking_status: SmokingStatus,
    pub country: Country,
}

/// Sample an age from the normal distribution.
///
/// The draw is truncated toward zero first and clamped
/// afterwards, so out-of-range patients pile up at exactly
/// 18 or 90.
pub fn make_age<R: Rng + ?Sized>(rng: &mut R, normal: &Normal<f64>) -> u32 {
    let draw: f64 = rng.sample(normal);
    (draw as i64).clamp(MIN_AGE as i64, MAX_AGE as i64) as u32
}

/// Pick gender uniform randomly (only male or female)
pub fn make_gender<R: Rng + ?Sized>(rng: &mut R) -> Gender {
    if rng.gen() {
        Gender::Female
    } else {
        Gender::Male
    }
}

pub fn make_country<R: Rng + ?Sized>(rng: &mut R) -> Country {
    COUNTRIES[rng.gen_range(0..COUNTRIES.len())]
}

/// Smoking status comes from the profile's smoking table; cancer
/// types without one are never-smokers.
pub fn make_smoking_status<R: Rng + ?Sized>(
    rng: &mut R,
    profile: &CompiledProfile,
) -> SmokingStatus {
    match &profile.smoking {
        Some(table) => table.sample(rng),
        None => SmokingStatus::Never,
    }
}

/// Draws the demographic columns for one patient
#[derive(Debug, Clone)]
pub struct DemographicSampler {
    age: Normal<f64>,
}

impl Default for DemographicSampler {
    fn default() -> Self {
        Self {
            age: Normal::new(AGE_MEAN, AGE_SD).expect("constant standard deviation is positive"),
        }
    }
}

impl DemographicSampler {
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R, table: &ConfigTable) -> Demographics {
        let profile = table.sample_cancer_type(rng);
        let age = make_age(rng, &self.age);
        let gender = make_gender(rng);
        let country = make_country(rng);
        let smoking_status = make_smoking_status(rng, profile);
        Demographics {
            cancer_type: profile.name.clone(),
            age,
            gender,
            smoking_status,
            country,
        }
    }
}
