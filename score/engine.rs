//! # Risk Engine
//!
//! The single entry point used by front ends. It owns a validated `ModelTable` and turns
//! a submission into one report per requested disease. The engine is immutable after
//! construction, so a single instance may be shared freely between threads.

use crate::impute::{Imputed, ResolvedFeatures};
use crate::model::{ConfigError, ModelTable, calculate_risk, classify};
use crate::types::{Disease, Feature, FeatureSet, InputError, PartialFeatureSet};
use std::path::Path;
use thiserror::Error;

/// Failures of the name-keyed entry points, which can trip over either a bad feature
/// name (configuration) or bad submitted text (input).
#[derive(Error, Debug)]
pub enum AssessmentError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Input(#[from] InputError),
}

/// The computed outcome for one disease.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskResult {
    pub disease: Disease,
    /// Probability strictly inside (0, 1).
    pub probability: f64,
    /// `probability >= threshold` for the disease's model.
    pub elevated: bool,
}

impl RiskResult {
    /// The probability as a percentage rounded to one decimal place, for display.
    pub fn percent(&self) -> f64 {
        (self.probability * 1000.0).round() / 10.0
    }
}

/// A result together with the static advisory text of its disease.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskReport<'a> {
    pub result: RiskResult,
    pub prevention: &'a [String],
    pub care: &'a [String],
}

/// Everything produced for one submission.
#[derive(Debug, Clone, PartialEq)]
pub struct Assessment<'a> {
    /// The feature values the models were evaluated on, after imputation.
    pub features: FeatureSet,
    /// Features that were filled from population averages, in canonical order.
    pub imputed: Vec<Feature>,
    /// One report per requested disease, in canonical disease order.
    pub reports: Vec<RiskReport<'a>>,
}

impl Assessment<'_> {
    pub fn report(&self, disease: Disease) -> Option<&RiskReport<'_>> {
        self.reports
            .iter()
            .find(|report| report.result.disease == disease)
    }

    pub fn any_elevated(&self) -> bool {
        self.reports.iter().any(|report| report.result.elevated)
    }
}

#[derive(Debug, Clone)]
pub struct RiskEngine {
    table: ModelTable,
}

impl RiskEngine {
    pub fn new(table: ModelTable) -> Self {
        Self { table }
    }

    /// An engine over the shipped reference table.
    pub fn builtin() -> Result<Self, ConfigError> {
        Ok(Self::new(ModelTable::builtin()?))
    }

    /// An engine over a TOML model table on disk.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Ok(Self::new(ModelTable::load(path)?))
    }

    pub fn table(&self) -> &ModelTable {
        &self.table
    }

    pub fn impute_missing(&self, value: Option<f64>, feature: Feature) -> Imputed {
        self.table
            .population_averages()
            .impute_missing(value, feature)
    }

    pub fn impute_named(&self, raw: Option<&str>, name: &str) -> Result<Imputed, AssessmentError> {
        self.table.population_averages().impute_named(raw, name)
    }

    pub fn resolve(&self, partial: &PartialFeatureSet) -> Result<ResolvedFeatures, InputError> {
        self.table.population_averages().resolve(partial)
    }

    /// Probability and elevation flag for a single disease.
    pub fn evaluate(&self, features: &FeatureSet, disease: Disease) -> RiskResult {
        let model = self.table.model(disease);
        let probability = calculate_risk(features, model);
        let elevated = classify(probability, model);
        log::debug!(
            "{}: linear score {:.4}, probability {:.6}, threshold {}, elevated {}",
            disease,
            model.linear_score(features),
            probability,
            model.threshold,
            elevated
        );
        RiskResult {
            disease,
            probability,
            elevated,
        }
    }

    /// Assesses a complete feature set against every disease.
    pub fn assess(&self, features: &FeatureSet) -> Result<Assessment<'_>, InputError> {
        self.assess_diseases(features, &Disease::ALL)
    }

    /// Assesses a complete feature set against the requested diseases.
    ///
    /// Reports come back in canonical disease order regardless of the order (or
    /// repetition) in `diseases`.
    pub fn assess_diseases(
        &self,
        features: &FeatureSet,
        diseases: &[Disease],
    ) -> Result<Assessment<'_>, InputError> {
        features.validate()?;
        Ok(self.build_assessment(*features, Vec::new(), diseases))
    }

    /// Imputes, validates and assesses a raw submission.
    pub fn assess_partial(
        &self,
        partial: &PartialFeatureSet,
        diseases: &[Disease],
    ) -> Result<Assessment<'_>, InputError> {
        let ResolvedFeatures { features, imputed } = self.resolve(partial)?;
        Ok(self.build_assessment(features, imputed, diseases))
    }

    fn build_assessment(
        &self,
        features: FeatureSet,
        imputed: Vec<Feature>,
        diseases: &[Disease],
    ) -> Assessment<'_> {
        let reports = Disease::ALL
            .into_iter()
            .filter(|disease| diseases.contains(disease))
            .map(|disease| {
                let model = self.table.model(disease);
                RiskReport {
                    result: self.evaluate(&features, disease),
                    prevention: &model.prevention,
                    care: &model.care,
                }
            })
            .collect();
        Assessment {
            features,
            imputed,
            reports,
        }
    }
}
