use crate::impute::PopulationAverages;
use crate::types::{Disease, Feature, FeatureSet, InputError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;
use thiserror::Error;

/// Linear scores are clamped to this magnitude before exponentiation so `exp()` can
/// never overflow.
const LINEAR_SCORE_BOUND: f64 = 700.0;

/// The largest `f64` below 1.0. Scores near the upper bound round to exactly 1.0 otherwise.
const MAX_PROBABILITY: f64 = 1.0 - f64::EPSILON / 2.0;

// --- Public Data Structures ---

/// The fixed-coefficient logistic model for one disease, together with the advisory text
/// shown alongside its result.
#[derive(Debug, Clone, PartialEq)]
pub struct DiseaseModel {
    pub intercept: f64,
    /// Features without an entry contribute nothing to the linear score.
    pub coefficients: BTreeMap<Feature, f64>,
    /// A probability at or above this value is reported as elevated.
    pub threshold: f64,
    pub prevention: Vec<String>,
    pub care: Vec<String>,
}

/// The complete, validated configuration: one model per disease plus the population
/// averages used for imputation.
///
/// There is exactly one field per [`Disease`], so lookups are exhaustive and infallible.
/// The only way to obtain a table is through [`ModelTable::new`] (or the loaders built
/// on it), which refuses inconsistent configurations.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelTable {
    population_averages: PopulationAverages,
    diabetes: DiseaseModel,
    heart_disease: DiseaseModel,
    obesity: DiseaseModel,
}

/// Custom error type for model table construction, loading and saving.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Unknown feature '{name}' referenced by {context}.")]
    UnknownFeature { context: String, name: String },
    #[error(
        "Model table defines an unknown disease '{0}'. Expected one of: diabetes, heart_disease, obesity."
    )]
    UnknownDisease(String),
    #[error("Model table is missing the required '{0}' model.")]
    MissingDisease(&'static str),
    #[error("Decision threshold {threshold} for {disease} lies outside [0, 1].")]
    ThresholdOutOfRange { disease: Disease, threshold: f64 },
    #[error("Non-finite {parameter} in the {disease} model.")]
    NonFiniteParameter { disease: Disease, parameter: String },
    #[error("Population average is not an admissible input: {0}")]
    AverageOutOfDomain(#[source] InputError),
    #[error("Failed to read or write model table file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML model table: {0}")]
    TomlParseError(#[from] toml::de::Error),
    #[error("Failed to serialize model table to TOML format: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),
}

/// The standard logistic transform, `1 / (1 + e^(-score))`, kept finite and strictly
/// inside (0, 1).
#[inline]
pub fn logistic(score: f64) -> f64 {
    let clamped = score.clamp(-LINEAR_SCORE_BOUND, LINEAR_SCORE_BOUND);
    let probability = 1.0 / (1.0 + f64::exp(-clamped));
    probability.min(MAX_PROBABILITY)
}

/// Risk probability of `features` under `model`.
pub fn calculate_risk(features: &FeatureSet, model: &DiseaseModel) -> f64 {
    model.probability(features)
}

/// Whether `probability` meets the model's decision threshold (inclusive).
pub fn classify(probability: f64, model: &DiseaseModel) -> bool {
    model.is_elevated(probability)
}

impl DiseaseModel {
    /// Intercept plus the coefficient-weighted sum of the encoded features.
    pub fn linear_score(&self, features: &FeatureSet) -> f64 {
        self.coefficients
            .iter()
            .fold(self.intercept, |score, (&feature, &coefficient)| {
                score + coefficient * features.value(feature)
            })
    }

    pub fn probability(&self, features: &FeatureSet) -> f64 {
        logistic(self.linear_score(features))
    }

    #[inline]
    pub fn is_elevated(&self, probability: f64) -> bool {
        probability >= self.threshold
    }

    fn validate(&self, disease: Disease) -> Result<(), ConfigError> {
        if !self.intercept.is_finite() {
            return Err(ConfigError::NonFiniteParameter {
                disease,
                parameter: "intercept".to_string(),
            });
        }
        if let Some((feature, _)) = self
            .coefficients
            .iter()
            .find(|(_, coefficient)| !coefficient.is_finite())
        {
            return Err(ConfigError::NonFiniteParameter {
                disease,
                parameter: format!("coefficient for '{feature}'"),
            });
        }
        if !self.threshold.is_finite() {
            return Err(ConfigError::NonFiniteParameter {
                disease,
                parameter: "threshold".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(ConfigError::ThresholdOutOfRange {
                disease,
                threshold: self.threshold,
            });
        }
        Ok(())
    }
}

impl ModelTable {
    /// Assembles a table, failing fast on any configuration-integrity problem.
    pub fn new(
        population_averages: PopulationAverages,
        diabetes: DiseaseModel,
        heart_disease: DiseaseModel,
        obesity: DiseaseModel,
    ) -> Result<Self, ConfigError> {
        population_averages.validate()?;
        let table = Self {
            population_averages,
            diabetes,
            heart_disease,
            obesity,
        };
        for (disease, model) in table.models() {
            model.validate(disease)?;
        }
        Ok(table)
    }

    /// The reference coefficients, thresholds and advisory text shipped with the tool.
    pub fn builtin() -> Result<Self, ConfigError> {
        Self::new(
            PopulationAverages::standard(),
            builtin::diabetes(),
            builtin::heart_disease(),
            builtin::obesity(),
        )
    }

    pub fn model(&self, disease: Disease) -> &DiseaseModel {
        match disease {
            Disease::Diabetes => &self.diabetes,
            Disease::HeartDisease => &self.heart_disease,
            Disease::Obesity => &self.obesity,
        }
    }

    /// All models in canonical disease order.
    pub fn models(&self) -> impl Iterator<Item = (Disease, &DiseaseModel)> {
        Disease::ALL
            .into_iter()
            .map(move |disease| (disease, self.model(disease)))
    }

    pub fn population_averages(&self) -> &PopulationAverages {
        &self.population_averages
    }

    /// Parses and validates a table from its TOML representation.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let file: file_format::ModelTableFile = toml::from_str(text)?;
        file.into_table()
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        let file = file_format::ModelTableFile::from_table(self);
        Ok(toml::to_string_pretty(&file)?)
    }

    /// Saves the table to a file in a human-readable TOML format.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let toml_string = self.to_toml_string()?;
        let mut file = BufWriter::new(fs::File::create(path)?);
        file.write_all(toml_string.as_bytes())?;
        file.flush()?;
        Ok(())
    }

    /// Loads a table from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let toml_string = fs::read_to_string(path)?;
        let table = Self::from_toml_str(&toml_string)?;
        log::info!("Loaded model table from {}", path.display());
        Ok(table)
    }
}

/// On-disk shape of a model table. Feature and disease keys are plain strings here
/// so that unknown names surface as precise configuration errors instead of generic
/// deserialization failures.
mod file_format {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(deny_unknown_fields)]
    pub(super) struct ModelTableFile {
        population_averages: PopulationAverages,
        models: BTreeMap<String, DiseaseModelFile>,
    }

    // Scalar fields come before the coefficient table so the TOML output keeps plain
    // values ahead of sub-tables.
    #[derive(Debug, Serialize, Deserialize)]
    #[serde(deny_unknown_fields)]
    struct DiseaseModelFile {
        intercept: f64,
        threshold: f64,
        prevention: Vec<String>,
        care: Vec<String>,
        coefficients: BTreeMap<String, f64>,
    }

    impl ModelTableFile {
        pub(super) fn from_table(table: &ModelTable) -> Self {
            let models = table
                .models()
                .map(|(disease, model)| {
                    let coefficients = model
                        .coefficients
                        .iter()
                        .map(|(feature, &coefficient)| (feature.name().to_string(), coefficient))
                        .collect();
                    let entry = DiseaseModelFile {
                        intercept: model.intercept,
                        threshold: model.threshold,
                        prevention: model.prevention.clone(),
                        care: model.care.clone(),
                        coefficients,
                    };
                    (disease.key().to_string(), entry)
                })
                .collect();
            Self {
                population_averages: *table.population_averages(),
                models,
            }
        }

        pub(super) fn into_table(mut self) -> Result<ModelTable, ConfigError> {
            let mut take = |disease: Disease| -> Result<DiseaseModel, ConfigError> {
                let entry = self
                    .models
                    .remove(disease.key())
                    .ok_or(ConfigError::MissingDisease(disease.key()))?;
                entry.into_model(disease)
            };
            let diabetes = take(Disease::Diabetes)?;
            let heart_disease = take(Disease::HeartDisease)?;
            let obesity = take(Disease::Obesity)?;

            if let Some(extra) = self.models.into_keys().next() {
                return Err(ConfigError::UnknownDisease(extra));
            }

            ModelTable::new(self.population_averages, diabetes, heart_disease, obesity)
        }
    }

    impl DiseaseModelFile {
        fn into_model(self, disease: Disease) -> Result<DiseaseModel, ConfigError> {
            let mut coefficients = BTreeMap::new();
            for (name, coefficient) in self.coefficients {
                let feature =
                    Feature::from_name(&name).ok_or_else(|| ConfigError::UnknownFeature {
                        context: format!("the '{}' model", disease.key()),
                        name,
                    })?;
                coefficients.insert(feature, coefficient);
            }
            Ok(DiseaseModel {
                intercept: self.intercept,
                coefficients,
                threshold: self.threshold,
                prevention: self.prevention,
                care: self.care,
            })
        }
    }
}

/// The shipped reference configuration.
mod builtin {
    use super::*;

    fn lines(items: &[&str]) -> Vec<String> {
        items.iter().map(|item| item.to_string()).collect()
    }

    fn coefficients(values: [f64; Feature::COUNT]) -> BTreeMap<Feature, f64> {
        Feature::ALL.into_iter().zip(values).collect()
    }

    pub(super) fn diabetes() -> DiseaseModel {
        DiseaseModel {
            intercept: -5.0,
            // age, bmi, systolic_bp, smoker, family_history, exercise_freq
            coefficients: coefficients([0.04, 0.1, 0.02, 0.3, 0.6, -0.15]),
            threshold: 0.2,
            prevention: lines(&[
                "Control blood sugar through diet and regular exercise.",
                "Regular fasting glucose or HbA1c testing.",
                "Limit sugary/processed foods.",
                "Increase physical activity to 150+ minutes/week.",
            ]),
            care: lines(&[
                "Adhere to prescribed diabetes medication.",
                "Monitor blood sugar regularly.",
                "Consult endocrinologist for management.",
                "Attend diabetes education programs.",
            ]),
        }
    }

    pub(super) fn heart_disease() -> DiseaseModel {
        DiseaseModel {
            intercept: -6.0,
            coefficients: coefficients([0.05, 0.07, 0.04, 0.7, 0.8, -0.1]),
            threshold: 0.25,
            prevention: lines(&[
                "Maintain healthy blood pressure and cholesterol.",
                "Avoid tobacco and excess alcohol.",
                "Adopt heart-healthy diet.",
                "Regular aerobic exercise.",
            ]),
            care: lines(&[
                "Follow cardiologist-prescribed medications.",
                "Attend regular heart health checkups.",
                "Manage stress with relaxation techniques.",
                "Seek urgent care for chest pain.",
            ]),
        }
    }

    pub(super) fn obesity() -> DiseaseModel {
        DiseaseModel {
            intercept: -4.5,
            coefficients: coefficients([0.02, 0.15, 0.015, 0.1, 0.3, -0.2]),
            threshold: 0.3,
            prevention: lines(&[
                "Balanced, calorie-controlled diet.",
                "Increase daily physical activity.",
                "Reduce sedentary time.",
                "Consult nutritionist as needed.",
            ]),
            care: lines(&[
                "Consult healthcare provider for weight management.",
                "Consider behavioral or medical interventions.",
                "Monitor for diabetes and heart disease.",
                "Maintain consistent lifestyle changes.",
            ]),
        }
    }
}
