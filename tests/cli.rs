use std::fs;
use std::process::Command;

use tempfile::tempdir;

const EXE: &str = env!("CARGO_BIN_EXE_vitalrisk");

#[test]
fn assess_with_no_values_uses_population_averages() {
    let output = Command::new(EXE)
        .arg("assess")
        .output()
        .expect("run vitalrisk cli");

    assert!(output.status.success(), "CLI exited with {:?}", output.status);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Diabetes: 74.1% Risk"), "{stdout}");
    assert!(stdout.contains("Heart Disease: 90.5% Risk"), "{stdout}");
    assert!(stdout.contains("Obesity: 77.7% Risk"), "{stdout}");
    assert!(stdout.contains("Elevated Risk Detected!"), "{stdout}");
    assert!(
        stdout.contains(
            "Imputed from population averages: age, bmi, systolic_bp, smoker, family_history, exercise_freq"
        ),
        "{stdout}"
    );
}

#[test]
fn assess_low_risk_person_for_a_single_disease() {
    let output = Command::new(EXE)
        .args([
            "assess",
            "--age",
            "18",
            "--bmi",
            "19",
            "--systolic-bp",
            "80",
            "--smoker",
            "no",
            "--family-history",
            "no",
            "--exercise-freq",
            "7",
            "--disease",
            "diabetes",
        ])
        .output()
        .expect("run vitalrisk cli");

    assert!(output.status.success(), "CLI exited with {:?}", output.status);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Diabetes:"), "{stdout}");
    assert!(!stdout.contains("Heart Disease:"), "{stdout}");
    assert!(stdout.contains("Risk is within normal range."), "{stdout}");
    assert!(!stdout.contains("Imputed from population averages"), "{stdout}");
}

#[test]
fn assess_rejects_out_of_range_input() {
    let output = Command::new(EXE)
        .args(["assess", "--age", "12"])
        .output()
        .expect("run vitalrisk cli");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.starts_with("Error:"), "{stderr}");
    assert!(stderr.contains("age"), "{stderr}");
}

#[test]
fn exported_table_can_be_loaded_back() {
    let tmp = tempdir().expect("temporary directory");

    let status = Command::new(EXE)
        .current_dir(tmp.path())
        .arg("export-models")
        .status()
        .expect("run vitalrisk cli");
    assert!(status.success(), "CLI exited with status {status:?}");
    let models_path = tmp.path().join("models.toml");
    assert!(models_path.exists(), "models.toml missing");

    let output = Command::new(EXE)
        .args([
            "assess",
            "--models",
            models_path.to_str().expect("path str"),
        ])
        .output()
        .expect("run vitalrisk cli");
    assert!(output.status.success(), "CLI exited with {:?}", output.status);
    assert!(String::from_utf8_lossy(&output.stdout).contains("Diabetes: 74.1% Risk"));
}

#[test]
fn broken_model_table_refuses_to_start() {
    let tmp = tempdir().expect("temporary directory");
    let models_path = tmp.path().join("models.toml");

    let status = Command::new(EXE)
        .current_dir(tmp.path())
        .arg("export-models")
        .status()
        .expect("run vitalrisk cli");
    assert!(status.success());

    let table = fs::read_to_string(&models_path).expect("read exported table");
    fs::write(&models_path, table.replacen("exercise_freq = -0.15", "steps = -0.15", 1))
        .expect("write corrupted table");

    let output = Command::new(EXE)
        .args([
            "assess",
            "--models",
            models_path.to_str().expect("path str"),
        ])
        .output()
        .expect("run vitalrisk cli");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Unknown feature 'steps'"), "{stderr}");
}

#[test]
fn batch_writes_one_prediction_per_row() {
    let tmp = tempdir().expect("temporary directory");
    let input_path = tmp.path().join("submissions.tsv");

    let data = "sample_id\tage\tbmi\tsystolic_bp\tsmoker\tfamily_history\texercise_freq\n\
P1\t40\t25\t120\tno\tno\t3\n\
P2\t\t\t\t\t\t\n\
P3\t18\t19\t80\t0\t0\t7\n";
    fs::write(&input_path, data).expect("write submissions");

    let status = Command::new(EXE)
        .current_dir(tmp.path())
        .args(["batch", input_path.to_str().expect("path str")])
        .status()
        .expect("run vitalrisk cli");
    assert!(status.success(), "CLI exited with status {status:?}");

    let predictions =
        fs::read_to_string(tmp.path().join("predictions.tsv")).expect("predictions.tsv missing");
    let lines: Vec<&str> = predictions.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(
        lines[0],
        "sample_id\tdiabetes_risk\tdiabetes_elevated\theart_disease_risk\theart_disease_elevated\tobesity_risk\tobesity_elevated\timputed"
    );
    assert!(lines[1].starts_with("P1\t0.740775\ttrue\t0.904651\ttrue\t0.777300\ttrue"));
    assert!(lines[2].starts_with("P2\t0.740775"));
    assert!(lines[3].starts_with("P3\t"));
    assert!(lines[3].contains("false"));
}
