use assert_cmd::Command;
use assert_fs::prelude::*;

const PET_FORM: &str = r#"{
    "formID": 9,
    "title": "Pets",
    "submit": "Send",
    "fields": [
        {
            "name": "hasPet",
            "label": "Do you have a pet?",
            "type": "radio",
            "isReuired": true,
            "options": [
                { "label": "Yes", "value": "yes" },
                { "label": "No", "value": "no" }
            ]
        },
        { "name": "petType", "label": "What kind of pet?", "type": "text", "visible": "$hasPet == \"yes\"" }
    ]
}"#;

fn stepform() -> Command {
    Command::cargo_bin("stepform").expect("binary")
}

#[test]
fn run_submits_answers() -> Result<(), Box<dyn std::error::Error>> {
    let workspace = assert_fs::TempDir::new()?;
    let spec = workspace.child("pets.json");
    spec.write_str(PET_FORM)?;

    let output = stepform()
        .arg("run")
        .arg("--spec")
        .arg(spec.path())
        .arg("--answers-json")
        .write_stdin("yes\nCat\n:submit\n")
        .output()?;
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout)?;
    assert!(stdout.contains("Form: Pets (9)"));
    assert!(stdout.contains("2/2 What kind of pet?"));
    assert!(stdout.contains("Last step: Send."));
    assert!(stdout.contains("Type ':submit' to send."));
    assert!(stdout.contains("Answers (CBOR hex): "));
    assert!(stdout.contains("\"petType\": \"Cat\""));
    Ok(())
}

#[test]
fn run_honours_initial_answers_and_json_format() -> Result<(), Box<dyn std::error::Error>> {
    let workspace = assert_fs::TempDir::new()?;
    let spec = workspace.child("pets.json");
    spec.write_str(PET_FORM)?;
    let answers = workspace.child("answers.json");
    answers.write_str(r#"{ "hasPet": "yes", "petType": "Parrot" }"#)?;

    let output = stepform()
        .arg("run")
        .arg("--spec")
        .arg(spec.path())
        .arg("--answers")
        .arg(answers.path())
        .arg("--format")
        .arg("json")
        .write_stdin(":submit\n")
        .output()?;
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout)?;
    assert!(stdout.contains("\"status\": \"in_progress\""));
    assert!(stdout.contains("\"total\": 2"));
    Ok(())
}

#[test]
fn run_fails_when_quit() -> Result<(), Box<dyn std::error::Error>> {
    let workspace = assert_fs::TempDir::new()?;
    let spec = workspace.child("pets.json");
    spec.write_str(PET_FORM)?;

    stepform()
        .arg("run")
        .arg("--spec")
        .arg(spec.path())
        .write_stdin(":quit\n")
        .assert()
        .failure();
    Ok(())
}

#[test]
fn rejected_answers_are_reported_on_stderr() -> Result<(), Box<dyn std::error::Error>> {
    let workspace = assert_fs::TempDir::new()?;
    let spec = workspace.child("pets.json");
    spec.write_str(PET_FORM)?;

    let output = stepform()
        .arg("run")
        .arg("--spec")
        .arg(spec.path())
        .write_stdin("maybe\nno\n:submit\n")
        .output()?;
    assert!(output.status.success());
    let stderr = String::from_utf8(output.stderr)?;
    assert!(stderr.contains("Invalid answer: 'maybe' is not an option of field 'hasPet'"));
    Ok(())
}

#[test]
fn validate_reports_lint_errors() -> Result<(), Box<dyn std::error::Error>> {
    let workspace = assert_fs::TempDir::new()?;
    let spec = workspace.child("broken.json");
    spec.write_str(
        r#"{
            "formID": 1,
            "fields": [
                { "name": "a", "label": "A", "type": "select" },
                { "name": "b", "label": "B", "type": "text", "visible": "$zzz" }
            ]
        }"#,
    )?;

    let output = stepform()
        .arg("validate")
        .arg("--spec")
        .arg(spec.path())
        .output()?;
    assert!(!output.status.success());
    let stdout = String::from_utf8(output.stdout)?;
    assert!(stdout.contains("Validation result: invalid"));
    assert!(stdout.contains("[missing_options]"));
    assert!(stdout.contains("[unknown_reference]"));

    let good = workspace.child("pets.json");
    good.write_str(PET_FORM)?;
    stepform()
        .arg("validate")
        .arg("--spec")
        .arg(good.path())
        .assert()
        .success();
    Ok(())
}

#[test]
fn visible_lists_field_names() -> Result<(), Box<dyn std::error::Error>> {
    let workspace = assert_fs::TempDir::new()?;
    let spec = workspace.child("pets.json");
    spec.write_str(PET_FORM)?;
    let answers = workspace.child("answers.json");
    answers.write_str(r#"{ "hasPet": "yes" }"#)?;

    let output = stepform()
        .arg("visible")
        .arg("--spec")
        .arg(spec.path())
        .arg("--answers")
        .arg(answers.path())
        .output()?;
    assert!(output.status.success());
    let names: Vec<String> = serde_json::from_slice(&output.stdout)?;
    assert_eq!(names, vec!["hasPet", "petType"]);
    Ok(())
}

#[test]
fn schema_is_json() -> Result<(), Box<dyn std::error::Error>> {
    let output = stepform().arg("schema").output()?;
    assert!(output.status.success());
    let schema: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert!(schema.is_object());
    Ok(())
}
