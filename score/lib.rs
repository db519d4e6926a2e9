#![deny(unused_variables)]
#![deny(dead_code)]
#![deny(unused_imports)]
#![deny(clippy::no_effect_underscore_binding)]
pub mod engine;
pub mod impute;
pub mod io;
pub mod model;
pub mod types;

pub use engine::{Assessment, AssessmentError, RiskEngine, RiskReport, RiskResult};
pub use model::{ConfigError, DiseaseModel, ModelTable, calculate_risk, classify};
pub use types::{Disease, Feature, FeatureSet, InputError, PartialFeatureSet};
