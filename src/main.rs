// ========================================================================================
//
//                      THE COMMAND-LINE FRONT END: VITALRISK
//
// ========================================================================================
//
// This binary is the presentation layer around the risk engine. It owns nothing but the
// engine itself: it builds (or loads) the model table once, turns command-line values or
// a batch file into submissions, and renders the engine's reports.
//
// Omitted values are not an error. They are filled from population averages, in the
// same way an input form would pre-fill its fields, and the output says which ones were.

use clap::{Args, Parser, Subcommand};
use std::error::Error;
use std::path::{Path, PathBuf};
use std::process;

use vitalrisk::engine::{Assessment, RiskEngine};
use vitalrisk::io::{assess_submissions, load_submissions, write_predictions};
use vitalrisk::types::{Disease, Feature, PartialFeatureSet};

// ========================================================================================
//                         COMMAND-LINE INTERFACE DEFINITION
// ========================================================================================

#[derive(Parser)]
#[command(
    name = "vitalrisk",
    version,
    about = "Estimate diabetes, heart disease and obesity risk from six health metrics",
    long_about = "Evaluates fixed-coefficient logistic risk models for diabetes, heart disease \
                 and obesity. Missing inputs are imputed from population averages."
)]
struct Cli {
    /// TOML model table to use instead of the built-in reference table
    #[arg(long, global = true, value_name = "FILE")]
    models: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Assess one person from values given on the command line
    Assess(AssessArgs),

    /// Assess every row of a tab-separated file
    #[command(about = "Assess a batch of submissions (outputs: predictions.tsv)")]
    Batch {
        /// Path to a TSV file with age, bmi, systolic_bp, smoker, family_history and
        /// exercise_freq columns (plus an optional sample_id column)
        input: PathBuf,

        /// Where to write the predictions
        #[arg(long, default_value = "predictions.tsv")]
        out: PathBuf,

        /// Restrict the assessment to these diseases (repeatable; default: all)
        #[arg(long = "disease", value_name = "DISEASE", value_parser = parse_disease)]
        diseases: Vec<Disease>,
    },

    /// Write the active model table as TOML
    #[command(about = "Export the active model table (outputs: models.toml)")]
    ExportModels {
        /// Where to write the model table
        #[arg(long, default_value = "models.toml")]
        out: PathBuf,
    },
}

#[derive(Args)]
struct AssessArgs {
    /// Age in years (18-120)
    #[arg(long)]
    age: Option<String>,

    /// Body-mass index in kg/m² (10-50)
    #[arg(long)]
    bmi: Option<String>,

    /// Systolic blood pressure in mmHg (80-200)
    #[arg(long)]
    systolic_bp: Option<String>,

    /// Current smoker (yes/no)
    #[arg(long)]
    smoker: Option<String>,

    /// Family history of diabetes or heart disease (yes/no)
    #[arg(long)]
    family_history: Option<String>,

    /// Exercise frequency in days per week (0-7)
    #[arg(long)]
    exercise_freq: Option<String>,

    /// Restrict the assessment to these diseases (repeatable; default: all)
    #[arg(long = "disease", value_name = "DISEASE", value_parser = parse_disease)]
    diseases: Vec<Disease>,
}

impl AssessArgs {
    fn raw_values(&self) -> [(Feature, Option<&str>); Feature::COUNT] {
        [
            (Feature::Age, self.age.as_deref()),
            (Feature::Bmi, self.bmi.as_deref()),
            (Feature::SystolicBp, self.systolic_bp.as_deref()),
            (Feature::Smoker, self.smoker.as_deref()),
            (Feature::FamilyHistory, self.family_history.as_deref()),
            (Feature::ExerciseFreq, self.exercise_freq.as_deref()),
        ]
    }
}

fn parse_disease(value: &str) -> Result<Disease, String> {
    Disease::from_key(value).ok_or_else(|| {
        format!("unknown disease '{value}'. Expected one of: diabetes, heart_disease, obesity")
    })
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    let result = run(cli);

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    // A broken model table must stop the tool before anything is scored.
    let engine = load_engine(cli.models.as_deref())?;

    match cli.command {
        Commands::Assess(args) => assess_command(&engine, &args),
        Commands::Batch {
            input,
            out,
            diseases,
        } => batch_command(&engine, &input, &out, &selected_diseases(diseases)),
        Commands::ExportModels { out } => export_command(&engine, &out),
    }
}

fn load_engine(models: Option<&Path>) -> Result<RiskEngine, Box<dyn Error>> {
    let engine = match models {
        Some(path) => RiskEngine::load(path)?,
        None => RiskEngine::builtin()?,
    };
    Ok(engine)
}

fn selected_diseases(requested: Vec<Disease>) -> Vec<Disease> {
    if requested.is_empty() {
        Disease::ALL.to_vec()
    } else {
        requested
    }
}

fn assess_command(engine: &RiskEngine, args: &AssessArgs) -> Result<(), Box<dyn Error>> {
    let mut submission = PartialFeatureSet::new();
    for (feature, raw) in args.raw_values() {
        submission.set(feature, feature.parse_optional(raw)?);
    }

    let diseases = selected_diseases(args.diseases.clone());
    let assessment = engine.assess_partial(&submission, &diseases)?;
    print_assessment(&assessment);
    Ok(())
}

fn batch_command(
    engine: &RiskEngine,
    input: &Path,
    out: &Path,
    diseases: &[Disease],
) -> Result<(), Box<dyn Error>> {
    println!("Loading submissions from: {}", input.display());
    let submissions = load_submissions(input)?;
    println!("Loaded {} submissions", submissions.len());

    let predictions = assess_submissions(engine, &submissions, diseases)?;
    let elevated = predictions
        .iter()
        .filter(|prediction| prediction.assessment.any_elevated())
        .count();

    write_predictions(out, &predictions, diseases)?;
    println!(
        "{} of {} submissions show at least one elevated risk",
        elevated,
        predictions.len()
    );
    println!("Predictions saved to: {}", out.display());
    Ok(())
}

fn export_command(engine: &RiskEngine, out: &Path) -> Result<(), Box<dyn Error>> {
    engine.table().save(out)?;
    println!("Model table saved to: {}", out.display());
    Ok(())
}

fn print_assessment(assessment: &Assessment<'_>) {
    println!("Risk Assessment Results");
    println!();

    for report in &assessment.reports {
        println!(
            "{}: {:.1}% Risk",
            report.result.disease,
            report.result.percent()
        );
        if report.result.elevated {
            println!("  Elevated Risk Detected!");
            println!("  Prevention Tips:");
            for tip in report.prevention {
                println!("    - {tip}");
            }
            println!("  Care Recommendations:");
            for care in report.care {
                println!("    - {care}");
            }
        } else {
            println!("  Risk is within normal range.");
        }
        println!();
    }

    if !assessment.imputed.is_empty() {
        let names: Vec<&str> = assessment
            .imputed
            .iter()
            .map(|feature| feature.name())
            .collect();
        println!("Imputed from population averages: {}", names.join(", "));
    }
}
