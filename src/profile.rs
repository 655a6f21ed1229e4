//! Cancer profiles: the static domain knowledge behind the generator
//!
//! A profile set is the serialisable description of every cancer type
//! (prevalence, treatment and medication mix, smoking mix, survival
//! rules). It can be read from a yaml file or taken from one of the
//! built-in presets. Before any sampling happens, the set is validated
//! and compiled into a [`ConfigTable`], which holds ready-to-sample
//! distributions and is shared read-only between worker threads.
//!

use std::collections::{HashMap, HashSet};
use std::io::Read;
use std::sync::Arc;

use rand::distributions::WeightedIndex;
use serde::{Deserialize, Serialize};

use crate::demographics::SmokingStatus;
use crate::error::ConfigError;

/// Tolerance used when checking that a weight table sums to one
pub const WEIGHT_TOLERANCE: f64 = 1e-6;

/// A value together with its sampling weight
#[derive(PartialEq, Serialize, Deserialize, Debug, Clone)]
pub struct Weighted<T> {
    pub value: T,
    pub weight: f64,
}

impl<T> Weighted<T> {
    pub fn new(value: T, weight: f64) -> Self {
        Self { value, weight }
    }
}

/// Condition part of a survival rule.
///
/// Every field that is present must hold for the predicate to
/// match. A predicate with no fields matches everything.
#[derive(PartialEq, Serialize, Deserialize, Debug, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct Predicate {
    /// The treatment must equal this value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub treatment: Option<String>,
    /// The medication must be one of these values
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medication: Option<Vec<String>>,
    /// The age must be strictly below this value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age_below: Option<u32>,
}

impl Predicate {
    pub fn treatment(name: &str) -> Self {
        Self {
            treatment: Some(String::from(name)),
            ..Self::default()
        }
    }

    pub fn medication_in(names: &[&str]) -> Self {
        Self {
            medication: Some(names.iter().map(|m| m.to_string()).collect()),
            ..Self::default()
        }
    }

    pub fn and_medication_in(mut self, names: &[&str]) -> Self {
        self.medication = Some(names.iter().map(|m| m.to_string()).collect());
        self
    }

    pub fn and_age_below(mut self, age: u32) -> Self {
        self.age_below = Some(age);
        self
    }

    pub fn matches(&self, treatment: &str, medication: &str, age: u32) -> bool {
        let treatment_ok = self.treatment.as_deref().map_or(true, |t| t == treatment);
        let medication_ok = self
            .medication
            .as_ref()
            .map_or(true, |ms| ms.iter().any(|m| m == medication));
        let age_ok = self.age_below.map_or(true, |limit| age < limit);
        treatment_ok && medication_ok && age_ok
    }
}

/// One row of a survival rule table
#[derive(PartialEq, Serialize, Deserialize, Debug, Clone)]
pub struct SurvivalRule {
    #[serde(default)]
    pub when: Predicate,
    pub rate: f64,
}

impl SurvivalRule {
    pub fn new(when: Predicate, rate: f64) -> Self {
        Self { when, rate }
    }
}

/// Description of one cancer type
#[derive(PartialEq, Serialize, Deserialize, Debug, Clone)]
pub struct CancerProfile {
    /// Name written to the cancer_type column (e.g. lung)
    pub name: String,
    /// Relative frequency of this cancer type in the population
    pub prevalence: f64,
    pub treatments: Vec<Weighted<String>>,
    pub medications: Vec<Weighted<String>>,
    /// Smoking status mix. When absent, every patient with this
    /// cancer type is a non-smoker.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smoking: Option<Vec<Weighted<SmokingStatus>>>,
    /// Ordered survival rules, first match wins
    #[serde(default)]
    pub rules: Vec<SurvivalRule>,
    /// Base survival rate when no rule matches
    pub default_rate: f64,
}

/// The complete set of cancer profiles used in a run
#[derive(PartialEq, Serialize, Deserialize, Debug, Clone)]
pub struct ProfileSet {
    pub cancers: Vec<CancerProfile>,
}

fn check_weights<T>(
    cancer_type: &str,
    table: &'static str,
    weights: &[Weighted<T>],
) -> Result<(), ConfigError> {
    if weights.is_empty() {
        return Err(ConfigError::EmptyTable {
            cancer_type: cancer_type.to_string(),
            table,
        });
    }
    for w in weights {
        if !w.weight.is_finite() || w.weight < 0.0 {
            return Err(ConfigError::BadWeight {
                cancer_type: cancer_type.to_string(),
                table,
                weight: w.weight,
            });
        }
    }
    let sum: f64 = weights.iter().map(|w| w.weight).sum();
    if (sum - 1.0).abs() > WEIGHT_TOLERANCE {
        return Err(ConfigError::WeightSum {
            cancer_type: cancer_type.to_string(),
            table,
            sum,
        });
    }
    Ok(())
}

fn check_rate(cancer_type: &str, rate: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&rate) {
        Ok(())
    } else {
        Err(ConfigError::RateOutOfRange {
            cancer_type: cancer_type.to_string(),
            rate,
        })
    }
}

impl CancerProfile {
    /// Check the weight tables, the rates, and that the rules only
    /// mention treatments and medications this profile can produce.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let name = self.name.as_str();
        check_weights(name, "treatment", &self.treatments)?;
        check_weights(name, "medication", &self.medications)?;
        if let Some(smoking) = &self.smoking {
            check_weights(name, "smoking", smoking)?;
        }

        check_rate(name, self.default_rate)?;
        for rule in &self.rules {
            check_rate(name, rule.rate)?;
            if let Some(treatment) = &rule.when.treatment {
                if !self.treatments.iter().any(|t| &t.value == treatment) {
                    return Err(ConfigError::UnknownRuleTerm {
                        cancer_type: name.to_string(),
                        kind: "treatment",
                        name: treatment.clone(),
                    });
                }
            }
            for medication in rule.when.medication.iter().flatten() {
                if !self.medications.iter().any(|m| &m.value == medication) {
                    return Err(ConfigError::UnknownRuleTerm {
                        cancer_type: name.to_string(),
                        kind: "medication",
                        name: medication.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Resolve the base survival rate (first matching rule wins)
    pub fn base_rate(&self, treatment: &str, medication: &str, age: u32) -> f64 {
        self.rules
            .iter()
            .find(|rule| rule.when.matches(treatment, medication, age))
            .map_or(self.default_rate, |rule| rule.rate)
    }
}

impl ProfileSet {
    /// Read a profile set from a byte source holding yaml.
    ///
    /// You can pass the result of std::fs::File::open() on
    /// a yaml file to this function. The set is not validated
    /// here; that happens in [`ProfileSet::compile`].
    pub fn from_reader<R>(reader: R) -> Result<Self, ConfigError>
    where
        R: Read,
    {
        Ok(serde_yaml::from_reader(reader)?)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cancers.is_empty() {
            return Err(ConfigError::NoProfiles);
        }
        let mut seen = HashSet::new();
        for profile in &self.cancers {
            if !seen.insert(profile.name.as_str()) {
                return Err(ConfigError::DuplicateCancerType(profile.name.clone()));
            }
            if !profile.prevalence.is_finite() || profile.prevalence < 0.0 {
                return Err(ConfigError::BadWeight {
                    cancer_type: profile.name.clone(),
                    table: "prevalence",
                    weight: profile.prevalence,
                });
            }
            profile.validate()?;
        }
        let sum: f64 = self.cancers.iter().map(|p| p.prevalence).sum();
        if (sum - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(ConfigError::PrevalenceSum(sum));
        }
        Ok(())
    }

    /// Validate the set and build the sampling tables
    pub fn compile(&self) -> Result<ConfigTable, ConfigError> {
        self.validate()?;

        let prevalence = weighted_index(
            "all",
            "prevalence",
            self.cancers.iter().map(|p| p.prevalence),
        )?;
        let mut cancer_types = Vec::with_capacity(self.cancers.len());
        let mut profiles = HashMap::with_capacity(self.cancers.len());
        for profile in &self.cancers {
            let compiled = CompiledProfile::new(profile)?;
            cancer_types.push(compiled.name.clone());
            profiles.insert(compiled.name.clone(), compiled);
        }

        Ok(ConfigTable {
            cancer_types,
            prevalence,
            profiles,
        })
    }
}

fn weighted_index(
    cancer_type: &str,
    table: &'static str,
    weights: impl Iterator<Item = f64>,
) -> Result<WeightedIndex<f64>, ConfigError> {
    let weights: Vec<f64> = weights.collect();
    WeightedIndex::new(&weights).map_err(|_| ConfigError::EmptyTable {
        cancer_type: cancer_type.to_string(),
        table,
    })
}

/// A categorical distribution over shared names
#[derive(Debug, Clone)]
pub struct Categorical<T> {
    pub values: Vec<T>,
    pub index: WeightedIndex<f64>,
}

impl<T: Clone> Categorical<T> {
    fn new<U>(
        cancer_type: &str,
        table: &'static str,
        weights: &[Weighted<U>],
        convert: impl Fn(&U) -> T,
    ) -> Result<Self, ConfigError> {
        let index = weighted_index(cancer_type, table, weights.iter().map(|w| w.weight))?;
        let values = weights.iter().map(|w| convert(&w.value)).collect();
        Ok(Self { values, index })
    }

    pub fn sample<R: rand::Rng + ?Sized>(&self, rng: &mut R) -> T {
        self.values[rng.sample(&self.index)].clone()
    }

    pub fn contains(&self, value: &T) -> bool
    where
        T: PartialEq,
    {
        self.values.contains(value)
    }
}

/// A validated cancer profile, ready for sampling
#[derive(Debug, Clone)]
pub struct CompiledProfile {
    pub name: Arc<str>,
    pub treatments: Categorical<Arc<str>>,
    pub medications: Categorical<Arc<str>>,
    pub smoking: Option<Categorical<SmokingStatus>>,
    profile: CancerProfile,
}

impl CompiledProfile {
    fn new(profile: &CancerProfile) -> Result<Self, ConfigError> {
        let name = profile.name.as_str();
        let smoking = match &profile.smoking {
            Some(table) => Some(Categorical::new(name, "smoking", table, |s| *s)?),
            None => None,
        };
        Ok(Self {
            name: Arc::from(name),
            treatments: Categorical::new(name, "treatment", &profile.treatments, |t| {
                Arc::from(t.as_str())
            })?,
            medications: Categorical::new(name, "medication", &profile.medications, |m| {
                Arc::from(m.as_str())
            })?,
            smoking,
            profile: profile.clone(),
        })
    }

    pub fn base_rate(&self, treatment: &str, medication: &str, age: u32) -> f64 {
        self.profile.base_rate(treatment, medication, age)
    }
}

/// The compiled configuration table shared by all workers
#[derive(Debug, Clone)]
pub struct ConfigTable {
    cancer_types: Vec<Arc<str>>,
    prevalence: WeightedIndex<f64>,
    profiles: HashMap<Arc<str>, CompiledProfile>,
}

impl ConfigTable {
    /// Draw a cancer type according to the prevalence weights
    pub fn sample_cancer_type<R: rand::Rng + ?Sized>(&self, rng: &mut R) -> &CompiledProfile {
        let name = &self.cancer_types[rng.sample(&self.prevalence)];
        &self.profiles[name]
    }

    pub fn profile(&self, cancer_type: &str) -> Option<&CompiledProfile> {
        self.profiles.get(cancer_type)
    }

    pub fn cancer_types(&self) -> &[Arc<str>] {
        &self.cancer_types
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    fn yaml_example_1() -> &'static str {
        r#"
        cancers:
        - name: lung
          prevalence: 0.6
          treatments:
          - value: surgery
            weight: 0.5
          - value: chemotherapy
            weight: 0.5
          medications:
          - value: cisplatin
            weight: 1.0
          smoking:
          - value: current
            weight: 0.5
          - value: never
            weight: 0.5
          rules:
          - when:
              treatment: surgery
            rate: 0.5
          default_rate: 0.2
        - name: stomach
          prevalence: 0.4
          treatments:
          - value: surgery
            weight: 1.0
          medications:
          - value: trastuzumab
            weight: 1.0
          rules:
          - when:
              treatment: surgery
              age_below: 70
            rate: 0.9
          - when:
              medication: [trastuzumab]
            rate: 0.4
          default_rate: 0.31
        "#
    }

    #[test]
    fn deserialize_profile_set() {
        let set = ProfileSet::from_reader(yaml_example_1().as_bytes()).unwrap();
        assert_eq!(set.cancers.len(), 2);
        assert_eq!(set.cancers[0].name, "lung");
        assert_eq!(
            set.cancers[0].smoking,
            Some(vec![
                Weighted::new(SmokingStatus::Current, 0.5),
                Weighted::new(SmokingStatus::Never, 0.5)
            ])
        );
        assert_eq!(
            set.cancers[1].rules[0].when,
            Predicate::treatment("surgery").and_age_below(70)
        );
        assert!(set.validate().is_ok());
    }

    #[test]
    fn yaml_round_trip_preserves_profiles() {
        let set = ProfileSet::from_reader(yaml_example_1().as_bytes()).unwrap();
        let yaml = set.to_yaml().unwrap();
        let reread = ProfileSet::from_reader(yaml.as_bytes()).unwrap();
        assert_eq!(set, reread);
    }

    #[test]
    fn first_matching_rule_wins() {
        let set = ProfileSet::from_reader(yaml_example_1().as_bytes()).unwrap();
        let stomach = &set.cancers[1];
        assert_eq!(stomach.base_rate("surgery", "trastuzumab", 50), 0.9);
        // Age rule fails, so the medication rule is next in line
        assert_eq!(stomach.base_rate("surgery", "trastuzumab", 70), 0.4);
    }

    #[test]
    fn default_rate_used_when_nothing_matches() {
        let set = ProfileSet::from_reader(yaml_example_1().as_bytes()).unwrap();
        assert_eq!(set.cancers[0].base_rate("chemotherapy", "cisplatin", 60), 0.2);
    }

    #[test]
    fn empty_predicate_matches_everything() {
        assert!(Predicate::default().matches("anything", "at all", 18));
    }

    #[test]
    fn treatment_weights_must_sum_to_one() {
        let mut set = ProfileSet::from_reader(yaml_example_1().as_bytes()).unwrap();
        set.cancers[0].treatments[0].weight = 0.6;
        assert!(matches!(
            set.validate(),
            Err(ConfigError::WeightSum {
                table: "treatment",
                ..
            })
        ));
    }

    #[test]
    fn prevalence_must_sum_to_one() {
        let mut set = ProfileSet::from_reader(yaml_example_1().as_bytes()).unwrap();
        set.cancers[1].prevalence = 0.3;
        assert!(matches!(set.validate(), Err(ConfigError::PrevalenceSum(_))));
    }

    #[test]
    fn rules_cannot_name_unknown_medication() {
        let mut set = ProfileSet::from_reader(yaml_example_1().as_bytes()).unwrap();
        set.cancers[1]
            .rules
            .push(SurvivalRule::new(Predicate::medication_in(&["aspirin"]), 0.1));
        assert_eq!(
            set.validate(),
            Err(ConfigError::UnknownRuleTerm {
                cancer_type: String::from("stomach"),
                kind: "medication",
                name: String::from("aspirin"),
            })
        );
    }

    #[test]
    fn rates_must_be_probabilities() {
        let mut set = ProfileSet::from_reader(yaml_example_1().as_bytes()).unwrap();
        set.cancers[0].default_rate = 1.5;
        assert!(matches!(
            set.validate(),
            Err(ConfigError::RateOutOfRange { .. })
        ));
    }

    #[test]
    fn duplicate_cancer_types_rejected() {
        let mut set = ProfileSet::from_reader(yaml_example_1().as_bytes()).unwrap();
        set.cancers[1].name = String::from("lung");
        assert_eq!(
            set.validate(),
            Err(ConfigError::DuplicateCancerType(String::from("lung")))
        );
    }

    #[test]
    fn compiled_table_looks_up_profiles_by_name() {
        let set = ProfileSet::from_reader(yaml_example_1().as_bytes()).unwrap();
        let table = set.compile().unwrap();
        assert!(table.profile("lung").is_some());
        assert!(table.profile("breast").is_none());
        assert_eq!(table.cancer_types().len(), 2);
    }
}
