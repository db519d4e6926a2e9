// ========================================================================================
//                             High-Level Data Contracts
// ========================================================================================

// This file holds the types that are shared between modules: the closed feature and
// disease vocabularies, the resolved and partial feature sets, and input-domain errors.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// One of the six health metrics collected per submission.
///
/// The declaration order is the canonical order used everywhere a feature list is
/// rendered or iterated (TSV columns, imputation reports, TOML export).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Feature {
    Age,
    Bmi,
    SystolicBp,
    Smoker,
    FamilyHistory,
    ExerciseFreq,
}

/// How a feature's scalar value must look before it can enter the linear score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Real,
    Integer,
    /// Encoded as 0.0 (no) or 1.0 (yes).
    Boolean,
}

/// The accepted closed interval and kind for a feature.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureDomain {
    pub min: f64,
    pub max: f64,
    pub kind: ValueKind,
}

impl Feature {
    pub const COUNT: usize = 6;

    pub const ALL: [Feature; Feature::COUNT] = [
        Feature::Age,
        Feature::Bmi,
        Feature::SystolicBp,
        Feature::Smoker,
        Feature::FamilyHistory,
        Feature::ExerciseFreq,
    ];

    /// The configuration and column name of the feature.
    pub fn name(self) -> &'static str {
        match self {
            Feature::Age => "age",
            Feature::Bmi => "bmi",
            Feature::SystolicBp => "systolic_bp",
            Feature::Smoker => "smoker",
            Feature::FamilyHistory => "family_history",
            Feature::ExerciseFreq => "exercise_freq",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|feature| feature.name() == name)
    }

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn domain(self) -> FeatureDomain {
        let (min, max, kind) = match self {
            Feature::Age => (18.0, 120.0, ValueKind::Integer),
            Feature::Bmi => (10.0, 50.0, ValueKind::Real),
            Feature::SystolicBp => (80.0, 200.0, ValueKind::Integer),
            Feature::Smoker | Feature::FamilyHistory => (0.0, 1.0, ValueKind::Boolean),
            Feature::ExerciseFreq => (0.0, 7.0, ValueKind::Integer),
        };
        FeatureDomain { min, max, kind }
    }

    /// Parses raw submission text into the numeric encoding used by the models.
    ///
    /// Boolean features additionally accept `yes`/`no` and `true`/`false` in any case,
    /// mirroring the two-choice selectors of the input form. Domain bounds are not
    /// checked here; see [`FeatureDomain::check`].
    pub fn parse_value(self, raw: &str) -> Result<f64, InputError> {
        let trimmed = raw.trim();
        if self.domain().kind == ValueKind::Boolean {
            if trimmed.eq_ignore_ascii_case("yes") || trimmed.eq_ignore_ascii_case("true") {
                return Ok(1.0);
            }
            if trimmed.eq_ignore_ascii_case("no") || trimmed.eq_ignore_ascii_case("false") {
                return Ok(0.0);
            }
        }
        trimmed.parse::<f64>().map_err(|_| InputError::NotANumber {
            feature: self,
            raw: trimmed.to_string(),
        })
    }

    /// Like [`Feature::parse_value`], but `None` and blank text count as an absent value.
    pub fn parse_optional(self, raw: Option<&str>) -> Result<Option<f64>, InputError> {
        match raw.map(str::trim) {
            None | Some("") => Ok(None),
            Some(text) => self.parse_value(text).map(Some),
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FeatureDomain {
    /// Returns the value unchanged if it belongs to the domain of `feature`.
    pub fn check(&self, feature: Feature, value: f64) -> Result<f64, InputError> {
        if !value.is_finite() {
            return Err(InputError::NonFinite { feature });
        }
        match self.kind {
            ValueKind::Boolean if value != 0.0 && value != 1.0 => {
                return Err(InputError::NotABoolean { feature, value });
            }
            ValueKind::Integer if value.fract() != 0.0 => {
                return Err(InputError::NotAnInteger { feature, value });
            }
            _ => {}
        }
        if value < self.min || value > self.max {
            return Err(InputError::OutOfDomain {
                feature,
                value,
                min: self.min,
                max: self.max,
            });
        }
        Ok(value)
    }
}

/// A single disease covered by the model table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Disease {
    Diabetes,
    HeartDisease,
    Obesity,
}

impl Disease {
    pub const ALL: [Disease; 3] = [Disease::Diabetes, Disease::HeartDisease, Disease::Obesity];

    /// Human-readable label, as shown to the person being assessed.
    pub fn display_name(self) -> &'static str {
        match self {
            Disease::Diabetes => "Diabetes",
            Disease::HeartDisease => "Heart Disease",
            Disease::Obesity => "Obesity",
        }
    }

    /// Key used in model table files, TSV headers and on the command line.
    pub fn key(self) -> &'static str {
        match self {
            Disease::Diabetes => "diabetes",
            Disease::HeartDisease => "heart_disease",
            Disease::Obesity => "obesity",
        }
    }

    /// Accepts either the key or the display name, ignoring case.
    pub fn from_key(key: &str) -> Option<Self> {
        let trimmed = key.trim();
        Self::ALL.into_iter().find(|disease| {
            disease.key().eq_ignore_ascii_case(trimmed)
                || disease.display_name().eq_ignore_ascii_case(trimmed)
        })
    }
}

impl fmt::Display for Disease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// A fully-resolved submission: all six features present and inside their domains.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeatureSet {
    pub age: u32,
    pub bmi: f64,
    pub systolic_bp: u32,
    pub smoker: bool,
    pub family_history: bool,
    pub exercise_freq: u32,
}

impl FeatureSet {
    /// The numeric encoding of `feature` as it enters the linear score.
    #[inline]
    pub fn value(&self, feature: Feature) -> f64 {
        match feature {
            Feature::Age => f64::from(self.age),
            Feature::Bmi => self.bmi,
            Feature::SystolicBp => f64::from(self.systolic_bp),
            Feature::Smoker => bool_to_f64(self.smoker),
            Feature::FamilyHistory => bool_to_f64(self.family_history),
            Feature::ExerciseFreq => f64::from(self.exercise_freq),
        }
    }

    /// All six encoded values in canonical order.
    pub fn values(&self) -> [f64; Feature::COUNT] {
        Feature::ALL.map(|feature| self.value(feature))
    }

    /// Builds a feature set from encoded values in canonical order, rejecting any value
    /// outside its feature's domain.
    pub fn from_values(values: [f64; Feature::COUNT]) -> Result<Self, InputError> {
        for feature in Feature::ALL {
            feature.domain().check(feature, values[feature.index()])?;
        }
        // Every value is now a finite in-range integer where an integer is required,
        // so the narrowing casts below are exact.
        Ok(Self {
            age: values[Feature::Age.index()] as u32,
            bmi: values[Feature::Bmi.index()],
            systolic_bp: values[Feature::SystolicBp.index()] as u32,
            smoker: values[Feature::Smoker.index()] == 1.0,
            family_history: values[Feature::FamilyHistory.index()] == 1.0,
            exercise_freq: values[Feature::ExerciseFreq.index()] as u32,
        })
    }

    /// Checks that every field lies inside its feature's domain.
    pub fn validate(&self) -> Result<(), InputError> {
        for feature in Feature::ALL {
            feature.domain().check(feature, self.value(feature))?;
        }
        Ok(())
    }
}

#[inline]
fn bool_to_f64(flag: bool) -> f64 {
    if flag { 1.0 } else { 0.0 }
}

/// A raw submission in which any feature may be absent.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PartialFeatureSet {
    values: [Option<f64>; Feature::COUNT],
}

impl PartialFeatureSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, feature: Feature, value: f64) -> Self {
        self.values[feature.index()] = Some(value);
        self
    }

    pub fn set(&mut self, feature: Feature, value: Option<f64>) {
        self.values[feature.index()] = value;
    }

    pub fn get(&self, feature: Feature) -> Option<f64> {
        self.values[feature.index()]
    }

    pub fn is_complete(&self) -> bool {
        self.values.iter().all(Option::is_some)
    }
}

impl From<FeatureSet> for PartialFeatureSet {
    fn from(features: FeatureSet) -> Self {
        Self {
            values: features.values().map(Some),
        }
    }
}

/// A submitted value that does not fit its feature's domain.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InputError {
    #[error("Value {value} for '{feature}' is outside the accepted range [{min}, {max}].")]
    OutOfDomain {
        feature: Feature,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("Value {value} for '{feature}' must be a whole number.")]
    NotAnInteger { feature: Feature, value: f64 },
    #[error("Value {value} for '{feature}' must be 0 (no) or 1 (yes).")]
    NotABoolean { feature: Feature, value: f64 },
    #[error("Non-finite value (NaN or Infinity) supplied for '{feature}'.")]
    NonFinite { feature: Feature },
    #[error("Could not interpret '{raw}' as a value for '{feature}'.")]
    NotANumber { feature: Feature, raw: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference_features() -> FeatureSet {
        FeatureSet {
            age: 52,
            bmi: 31.5,
            systolic_bp: 145,
            smoker: true,
            family_history: false,
            exercise_freq: 1,
        }
    }

    #[test]
    fn feature_names_round_trip_in_canonical_order() {
        for (position, feature) in Feature::ALL.into_iter().enumerate() {
            assert_eq!(feature.index(), position);
            assert_eq!(Feature::from_name(feature.name()), Some(feature));
        }
        assert_eq!(Feature::from_name("cholesterol"), None);
        assert_eq!(Feature::from_name("Age"), None);
    }

    #[test]
    fn disease_lookup_accepts_key_or_display_name() {
        assert_eq!(Disease::from_key("heart_disease"), Some(Disease::HeartDisease));
        assert_eq!(Disease::from_key("Heart Disease"), Some(Disease::HeartDisease));
        assert_eq!(Disease::from_key(" OBESITY "), Some(Disease::Obesity));
        assert_eq!(Disease::from_key("asthma"), None);
    }

    #[test]
    fn boolean_features_encode_as_zero_or_one() {
        let features = reference_features();
        assert_eq!(features.value(Feature::Smoker), 1.0);
        assert_eq!(features.value(Feature::FamilyHistory), 0.0);
        assert_eq!(features.values(), [52.0, 31.5, 145.0, 1.0, 0.0, 1.0]);
    }

    #[test]
    fn from_values_inverts_values() {
        let features = reference_features();
        let rebuilt = FeatureSet::from_values(features.values()).unwrap();
        assert_eq!(rebuilt, features);
    }

    #[test]
    fn from_values_rejects_out_of_domain_inputs() {
        let mut values = reference_features().values();
        values[Feature::Age.index()] = 17.0;
        match FeatureSet::from_values(values).unwrap_err() {
            InputError::OutOfDomain { feature, min, .. } => {
                assert_eq!(feature, Feature::Age);
                assert_eq!(min, 18.0);
            }
            other => panic!("Expected OutOfDomain(age), got {:?}", other),
        }

        let mut values = reference_features().values();
        values[Feature::ExerciseFreq.index()] = 2.5;
        assert_eq!(
            FeatureSet::from_values(values).unwrap_err(),
            InputError::NotAnInteger {
                feature: Feature::ExerciseFreq,
                value: 2.5
            }
        );

        let mut values = reference_features().values();
        values[Feature::Smoker.index()] = 0.5;
        assert!(matches!(
            FeatureSet::from_values(values),
            Err(InputError::NotABoolean { .. })
        ));

        let mut values = reference_features().values();
        values[Feature::Bmi.index()] = f64::NAN;
        assert_eq!(
            FeatureSet::from_values(values).unwrap_err(),
            InputError::NonFinite {
                feature: Feature::Bmi
            }
        );
    }

    #[test]
    fn validate_catches_hand_built_sets() {
        let mut features = reference_features();
        assert!(features.validate().is_ok());
        features.systolic_bp = 250;
        assert!(matches!(
            features.validate(),
            Err(InputError::OutOfDomain {
                feature: Feature::SystolicBp,
                ..
            })
        ));
    }

    #[test]
    fn parse_value_understands_form_choices() {
        assert_eq!(Feature::Smoker.parse_value("Yes").unwrap(), 1.0);
        assert_eq!(Feature::FamilyHistory.parse_value(" no ").unwrap(), 0.0);
        assert_eq!(Feature::Smoker.parse_value("TRUE").unwrap(), 1.0);
        assert_eq!(Feature::Bmi.parse_value("27.25").unwrap(), 27.25);
        assert!(matches!(
            Feature::Age.parse_value("yes"),
            Err(InputError::NotANumber { .. })
        ));
    }

    #[test]
    fn parse_optional_treats_blank_text_as_absent() {
        assert_eq!(Feature::Bmi.parse_optional(None).unwrap(), None);
        assert_eq!(Feature::Bmi.parse_optional(Some("  ")).unwrap(), None);
        assert_eq!(Feature::Bmi.parse_optional(Some(" 22.5")).unwrap(), Some(22.5));
        assert!(Feature::Bmi.parse_optional(Some("n/a")).is_err());
    }

    #[test]
    fn partial_feature_set_tracks_presence() {
        let partial = PartialFeatureSet::new()
            .with(Feature::Age, 60.0)
            .with(Feature::Bmi, 22.0);
        assert_eq!(partial.get(Feature::Age), Some(60.0));
        assert_eq!(partial.get(Feature::Smoker), None);
        assert!(!partial.is_complete());

        let complete = PartialFeatureSet::from(reference_features());
        assert!(complete.is_complete());
        assert_eq!(complete.get(Feature::SystolicBp), Some(145.0));
    }
}
