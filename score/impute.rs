//! # Missing-Value Imputation
//!
//! An absent feature is replaced by its population-average default. The defaults are a
//! complete `FeatureSet`, so every recognised feature has exactly one default and the
//! set of defaults cannot drift out of step with the feature vocabulary.

use crate::engine::AssessmentError;
use crate::model::ConfigError;
use crate::types::{Feature, FeatureSet, InputError, PartialFeatureSet};
use serde::{Deserialize, Serialize};

/// Population-average defaults used when a submission leaves a feature empty.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PopulationAverages(FeatureSet);

/// The outcome of imputing a single feature.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Imputed {
    pub value: f64,
    /// True when `value` came from the population averages.
    pub imputed: bool,
}

/// A submission after every absent feature has been filled in and validated.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedFeatures {
    pub features: FeatureSet,
    /// Features that were filled from the averages, in canonical order.
    pub imputed: Vec<Feature>,
}

impl PopulationAverages {
    pub const fn new(defaults: FeatureSet) -> Self {
        Self(defaults)
    }

    /// The adult population averages used by the built-in model table.
    pub const fn standard() -> Self {
        Self(FeatureSet {
            age: 40,
            bmi: 25.0,
            systolic_bp: 120,
            smoker: false,
            family_history: false,
            exercise_freq: 3,
        })
    }

    #[inline]
    pub fn get(&self, feature: Feature) -> f64 {
        self.0.value(feature)
    }

    pub fn as_feature_set(&self) -> &FeatureSet {
        &self.0
    }

    /// Every default must itself be an admissible input.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.0.validate().map_err(ConfigError::AverageOutOfDomain)
    }

    /// Returns `value` unchanged when present, otherwise the default for `feature`.
    pub fn impute_missing(&self, value: Option<f64>, feature: Feature) -> Imputed {
        match value {
            Some(value) => Imputed {
                value,
                imputed: false,
            },
            None => {
                let value = self.get(feature);
                log::debug!("Imputing '{}' with population average {}", feature, value);
                Imputed {
                    value,
                    imputed: true,
                }
            }
        }
    }

    /// Name-keyed imputation over raw text.
    ///
    /// `None` and blank strings both count as absent. An unrecognised feature name is a
    /// configuration fault on the caller's side rather than bad user input.
    pub fn impute_named(&self, raw: Option<&str>, name: &str) -> Result<Imputed, AssessmentError> {
        let feature = Feature::from_name(name).ok_or_else(|| ConfigError::UnknownFeature {
            context: "imputation".to_string(),
            name: name.to_string(),
        })?;
        let value = feature.parse_optional(raw)?;
        Ok(self.impute_missing(value, feature))
    }

    /// Fills every absent slot of `partial` and validates the result.
    pub fn resolve(&self, partial: &PartialFeatureSet) -> Result<ResolvedFeatures, InputError> {
        let mut values = [0.0; Feature::COUNT];
        let mut imputed = Vec::new();
        for feature in Feature::ALL {
            let outcome = self.impute_missing(partial.get(feature), feature);
            if outcome.imputed {
                imputed.push(feature);
            }
            values[feature.index()] = outcome.value;
        }
        let features = FeatureSet::from_values(values)?;
        Ok(ResolvedFeatures { features, imputed })
    }
}

impl Default for PopulationAverages {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn absent_values_take_the_population_average() {
        let averages = PopulationAverages::standard();
        let expected = [40.0, 25.0, 120.0, 0.0, 0.0, 3.0];
        for feature in Feature::ALL {
            let outcome = averages.impute_missing(None, feature);
            assert!(outcome.imputed);
            assert_eq!(outcome.value, expected[feature.index()]);
        }
    }

    #[test]
    fn present_values_pass_through_untouched() {
        let averages = PopulationAverages::standard();
        let outcome = averages.impute_missing(Some(33.3), Feature::Bmi);
        assert_eq!(
            outcome,
            Imputed {
                value: 33.3,
                imputed: false
            }
        );
    }

    #[test]
    fn named_imputation_treats_blank_text_as_absent() {
        let averages = PopulationAverages::standard();

        let blank = averages.impute_named(Some("   "), "systolic_bp").unwrap();
        assert!(blank.imputed);
        assert_abs_diff_eq!(blank.value, 120.0, epsilon = 1e-12);

        let unset = averages.impute_named(None, "exercise_freq").unwrap();
        assert!(unset.imputed);
        assert_abs_diff_eq!(unset.value, 3.0, epsilon = 1e-12);

        let given = averages.impute_named(Some("yes"), "smoker").unwrap();
        assert!(!given.imputed);
        assert_abs_diff_eq!(given.value, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn named_imputation_rejects_unknown_features_as_configuration_errors() {
        let averages = PopulationAverages::standard();
        match averages.impute_named(None, "cholesterol").unwrap_err() {
            AssessmentError::Config(ConfigError::UnknownFeature { name, .. }) => {
                assert_eq!(name, "cholesterol")
            }
            other => panic!("Expected UnknownFeature, got {:?}", other),
        }
    }

    #[test]
    fn named_imputation_reports_unparseable_text() {
        let averages = PopulationAverages::standard();
        assert!(matches!(
            averages.impute_named(Some("tall"), "age"),
            Err(AssessmentError::Input(InputError::NotANumber { .. }))
        ));
    }

    #[test]
    fn resolving_an_empty_submission_yields_the_averages() {
        let averages = PopulationAverages::standard();
        let resolved = averages.resolve(&PartialFeatureSet::new()).unwrap();
        assert_eq!(resolved.features, *averages.as_feature_set());
        assert_eq!(resolved.imputed, Feature::ALL.to_vec());
    }

    #[test]
    fn resolving_keeps_supplied_values_and_lists_only_imputed_ones() {
        let averages = PopulationAverages::standard();
        let partial = PartialFeatureSet::new()
            .with(Feature::Age, 65.0)
            .with(Feature::Smoker, 1.0)
            .with(Feature::Bmi, 29.0)
            .with(Feature::SystolicBp, 150.0);
        let resolved = averages.resolve(&partial).unwrap();
        assert_eq!(resolved.features.age, 65);
        assert!(resolved.features.smoker);
        assert_eq!(resolved.features.exercise_freq, 3);
        assert_eq!(
            resolved.imputed,
            vec![Feature::FamilyHistory, Feature::ExerciseFreq]
        );
    }

    #[test]
    fn resolving_rejects_out_of_domain_values() {
        let averages = PopulationAverages::standard();
        let partial = PartialFeatureSet::new().with(Feature::ExerciseFreq, 9.0);
        assert!(matches!(
            averages.resolve(&partial),
            Err(InputError::OutOfDomain {
                feature: Feature::ExerciseFreq,
                ..
            })
        ));
    }

    #[test]
    fn out_of_domain_averages_are_a_configuration_error() {
        let averages = PopulationAverages::new(FeatureSet {
            age: 10,
            ..*PopulationAverages::standard().as_feature_set()
        });
        assert!(matches!(
            averages.validate(),
            Err(ConfigError::AverageOutOfDomain(InputError::OutOfDomain {
                feature: Feature::Age,
                ..
            }))
        ));
    }
}
