mod wizard;

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use form_spec::{
    AnswerMap, FieldControl, FieldInput, FormEngine, FormSpec, ValidationResult,
    build_render_payload, filter_options, form_schema, validate,
};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use wizard::{RenderMode, Verbosity, WizardPresenter};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

const LOG_ENV: &str = "STEPFORM_LOG";

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Step through declarative forms in the terminal",
    long_about = "Runs conditional forms one field at a time, lints form configurations, and prints their schema"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fill in a form interactively, one visible field per step.
    Run {
        /// Path to the form configuration JSON.
        #[arg(long, value_name = "SPEC")]
        spec: PathBuf,
        /// Optional JSON file containing initial answers.
        #[arg(long, value_name = "ANSWERS")]
        answers: Option<PathBuf>,
        /// Show the status line, the visible fields, and debug logs.
        #[arg(long, alias = "debug")]
        verbose: bool,
        /// Also emit the submitted answers as JSON.
        #[arg(long)]
        answers_json: bool,
        /// Render output mode for each step.
        #[arg(long, value_enum, default_value_t = RenderMode::Text)]
        format: RenderMode,
    },
    /// Lint a form configuration.
    Validate {
        /// Path to the form configuration JSON.
        #[arg(long, value_name = "SPEC")]
        spec: PathBuf,
    },
    /// Print the names of the visible fields as JSON.
    Visible {
        /// Path to the form configuration JSON.
        #[arg(long, value_name = "SPEC")]
        spec: PathBuf,
        /// Optional JSON file containing answers.
        #[arg(long, value_name = "ANSWERS")]
        answers: Option<PathBuf>,
    },
    /// Print the JSON schema of the form configuration.
    Schema,
}

impl Command {
    fn verbose(&self) -> bool {
        matches!(self, Command::Run { verbose: true, .. })
    }
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();
    init_tracing(cli.command.verbose());
    match cli.command {
        Command::Run {
            spec,
            answers,
            verbose,
            answers_json,
            format,
        } => run_session(spec, answers, verbose, answers_json, format),
        Command::Validate { spec } => run_validate(spec),
        Command::Visible { spec, answers } => run_visible(spec, answers),
        Command::Schema => {
            println!("{}", serde_json::to_string_pretty(&form_schema())?);
            Ok(())
        }
    }
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(fallback));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr).without_time())
        .try_init();
}

fn load_spec(path: &Path) -> CliResult<FormSpec> {
    let contents = fs::read_to_string(path)?;
    Ok(FormSpec::from_json(&contents)?)
}

/// Seeds the engine with answers from a JSON file, in declaration order.
fn load_answers(engine: &mut FormEngine, path: &Path) -> CliResult<()> {
    let contents = fs::read_to_string(path)?;
    let answers: AnswerMap = serde_json::from_str(&contents)?;
    for (name, _) in answers.iter() {
        if engine.spec().field(name).is_none() {
            tracing::warn!(field = %name, "ignoring answer for unknown field");
        }
    }
    let names = engine
        .spec()
        .fields
        .iter()
        .map(|field| field.name.clone())
        .collect::<Vec<_>>();
    for name in names {
        if let Some(value) = answers.get(&name) {
            engine.set_answer(&name, value.clone())?;
        }
    }
    Ok(())
}

fn build_engine(spec_path: &Path, answers_path: Option<&Path>) -> CliResult<FormEngine> {
    let mut engine = FormEngine::new(load_spec(spec_path)?);
    if let Some(path) = answers_path {
        load_answers(&mut engine, path)?;
    }
    Ok(engine)
}

fn run_session(
    spec_path: PathBuf,
    answers_path: Option<PathBuf>,
    verbose: bool,
    answers_json: bool,
    format: RenderMode,
) -> CliResult<()> {
    let mut engine = build_engine(&spec_path, answers_path.as_deref())?;
    let stdin = io::stdin();
    let mut presenter = WizardPresenter::new(
        io::stdout(),
        Verbosity::from_verbose(verbose),
        format,
        answers_json,
    );
    drive(&mut engine, stdin.lock(), &mut presenter)
}

/// A line typed at the prompt.
#[derive(Debug, PartialEq)]
enum LineCommand {
    Back,
    Next,
    Submit,
    Quit,
    Clear,
    Filter(String),
    Answer(String),
}

impl LineCommand {
    fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        match trimmed {
            "" | ":next" => LineCommand::Next,
            ":back" => LineCommand::Back,
            ":submit" => LineCommand::Submit,
            ":quit" | ":q" => LineCommand::Quit,
            ":clear" => LineCommand::Clear,
            _ => match trimmed.strip_prefix('/') {
                Some(query) => LineCommand::Filter(query.trim().to_string()),
                None => LineCommand::Answer(trimmed.to_string()),
            },
        }
    }
}

/// Runs the read-render loop until the form is submitted.
fn drive<R: BufRead, W: Write>(
    engine: &mut FormEngine,
    input: R,
    presenter: &mut WizardPresenter<W>,
) -> CliResult<()> {
    let mut lines = input.lines();
    let mut filter: Option<String> = None;
    let mut redraw = true;

    loop {
        if redraw {
            let payload = build_render_payload(engine);
            presenter.show_step(&payload)?;
        }
        redraw = true;
        presenter.show_prompt()?;

        let Some(line) = lines.next() else {
            return Err("input ended before the form was submitted".into());
        };
        let command = LineCommand::parse(&line?);
        let step = engine.current_step();

        match command {
            LineCommand::Quit => return Err("session aborted by user".into()),
            LineCommand::Submit => {
                let submission = engine.submit()?;
                presenter.show_completion(&submission)?;
                return Ok(());
            }
            LineCommand::Back => {
                if !engine.retreat() {
                    presenter.show_notice("Already at the first step.")?;
                    redraw = false;
                }
            }
            LineCommand::Next => {
                if engine.step_count() == 0 || engine.is_submit_step() {
                    presenter.show_notice("This is the last step; type ':submit' to finish.")?;
                    redraw = false;
                } else {
                    engine.advance();
                }
            }
            LineCommand::Filter(query) => {
                let mut payload = build_render_payload(engine);
                let Some(name) = payload.current.as_ref().map(|field| field.name.clone()) else {
                    redraw = false;
                    continue;
                };
                if !matches!(
                    engine.current_control(),
                    Some(FieldControl::MultiToggle { filterable: true })
                ) {
                    presenter.show_notice("Filtering is only available for multiselect fields.")?;
                    redraw = false;
                    continue;
                }
                let shown = shown_values(engine, &name, Some(&query));
                if let Some(current) = payload.current.as_mut() {
                    current.options.retain(|option| shown.contains(&option.value));
                }
                presenter.show_filter(&payload, &query)?;
                filter = (!query.is_empty()).then_some(query);
                redraw = false;
            }
            LineCommand::Clear => {
                if let Some(name) = engine.current_field().map(|field| field.name.clone())
                    && let Err(err) = engine.input(&name, FieldInput::Clear)
                {
                    presenter.show_input_error(&err);
                    redraw = false;
                }
            }
            LineCommand::Answer(raw) => {
                let Some(name) = engine.current_field().map(|field| field.name.clone()) else {
                    redraw = false;
                    continue;
                };
                for input in interpret(engine, &name, &raw, filter.as_deref()) {
                    if let Err(err) = engine.input(&name, input) {
                        presenter.show_input_error(&err);
                        break;
                    }
                }
            }
        }

        if engine.current_step() != step {
            filter = None;
        }
    }
}

// Option values in display order, narrowed by the active label filter.
fn shown_values(engine: &mut FormEngine, name: &str, filter: Option<&str>) -> Vec<String> {
    let options = engine.visible_options(name);
    filter_options(options, filter.unwrap_or(""))
        .into_iter()
        .map(|option| option.value.clone())
        .collect()
}

// 1-based indices refer to the displayed option list; anything else is a value.
fn resolve_option(shown: &[String], token: &str) -> String {
    token
        .parse::<usize>()
        .ok()
        .and_then(|index| index.checked_sub(1))
        .and_then(|index| shown.get(index))
        .cloned()
        .unwrap_or_else(|| token.to_string())
}

/// Translates a typed line into inputs for the field's control.
fn interpret(
    engine: &mut FormEngine,
    name: &str,
    raw: &str,
    filter: Option<&str>,
) -> Vec<FieldInput> {
    let Some(control) = engine.current_control() else {
        return Vec::new();
    };
    match control {
        FieldControl::TextEntry { .. } => vec![FieldInput::Text(raw.to_string())],
        FieldControl::SingleChoice { .. } => {
            let shown = shown_values(engine, name, None);
            vec![FieldInput::Choose(resolve_option(&shown, raw))]
        }
        FieldControl::Toggle => {
            let shown = shown_values(engine, name, None);
            vec![FieldInput::Toggle(resolve_option(&shown, raw))]
        }
        FieldControl::MultiToggle { .. } => {
            let shown = shown_values(engine, name, filter);
            raw.split(',')
                .map(str::trim)
                .filter(|token| !token.is_empty())
                .map(|token| FieldInput::Toggle(resolve_option(&shown, token)))
                .collect()
        }
    }
}

fn run_validate(spec_path: PathBuf) -> CliResult<()> {
    let spec = load_spec(&spec_path)?;
    let result = validate(&spec);
    println!(
        "Validation result: {}",
        if result.valid { "valid" } else { "invalid" }
    );
    describe_validation(&result);

    if result.valid {
        Ok(())
    } else {
        Err("validation failed".into())
    }
}

fn describe_validation(result: &ValidationResult) {
    if !result.errors.is_empty() {
        println!("Errors:");
        for error in &result.errors {
            println!(
                "  {} - {} [{}]",
                error.field.as_deref().unwrap_or("<form>"),
                error.message,
                error.code
            );
        }
    }
}

fn run_visible(spec_path: PathBuf, answers_path: Option<PathBuf>) -> CliResult<()> {
    let engine = build_engine(&spec_path, answers_path.as_deref())?;
    println!("{}", serde_json::to_string_pretty(&engine.visible_names())?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use form_spec::AnswerValue;
    use std::io::Cursor;

    const PETS: &str = r#"{
        "id": "pets",
        "title": "Pets",
        "fields": [
            {
                "name": "hasPet",
                "label": "Do you have a pet?",
                "type": "radio",
                "options": [
                    { "label": "Yes", "value": "yes" },
                    { "label": "No", "value": "no" }
                ]
            },
            { "name": "petType", "label": "What kind of pet?", "type": "text", "visible": "$hasPet == 'yes'" },
            {
                "name": "toys",
                "label": "Toys",
                "type": "multiselect",
                "options": [
                    { "label": "Ball", "value": "ball" },
                    { "label": "Bone", "value": "bone" },
                    { "label": "Rope", "value": "rope" }
                ]
            }
        ]
    }"#;

    fn pets() -> FormEngine {
        FormEngine::new(FormSpec::from_json(PETS).unwrap())
    }

    fn run(engine: &mut FormEngine, script: &str) -> (CliResult<()>, String) {
        let mut presenter =
            WizardPresenter::new(Vec::new(), Verbosity::Clean, RenderMode::Text, true);
        let result = drive(engine, Cursor::new(script.to_string()), &mut presenter);
        let output = String::from_utf8(presenter.into_inner()).unwrap();
        (result, output)
    }

    #[test]
    fn line_commands_parse() {
        assert_eq!(LineCommand::parse("\n"), LineCommand::Next);
        assert_eq!(LineCommand::parse(" :back "), LineCommand::Back);
        assert_eq!(LineCommand::parse("/Bo"), LineCommand::Filter("Bo".into()));
        assert_eq!(LineCommand::parse("2"), LineCommand::Answer("2".into()));
    }

    #[test]
    fn option_index_resolves_against_shown_list() {
        let shown = vec!["ball".to_string(), "rope".to_string()];
        assert_eq!(resolve_option(&shown, "2"), "rope");
        assert_eq!(resolve_option(&shown, "0"), "0");
        assert_eq!(resolve_option(&shown, "bone"), "bone");
    }

    #[test]
    fn session_walks_conditional_fields() {
        let mut engine = pets();
        let (result, output) = run(&mut engine, "1\nDog\n\nball, rope\n:submit\n");
        assert!(result.is_ok());
        assert!(output.contains("1/2 Do you have a pet?"));
        assert!(output.contains("2/3 What kind of pet?"));
        assert!(output.contains("Done ✅"));
        assert!(output.contains("\"petType\": \"Dog\""));
        assert_eq!(
            engine.answer("toys"),
            Some(&AnswerValue::TextList(vec!["ball".into(), "rope".into()]))
        );
    }

    #[test]
    fn filter_narrows_index_targets() {
        let mut engine = pets();
        let (result, output) = run(&mut engine, "no\n/bo\n1\n:submit\n");
        assert!(result.is_ok());
        assert!(output.contains("Options matching 'bo':"));
        assert_eq!(
            engine.answer("toys"),
            Some(&AnswerValue::TextList(vec!["bone".into()]))
        );
    }

    #[test]
    fn back_at_start_is_reported() {
        let mut engine = pets();
        let (result, output) = run(&mut engine, ":back\n:quit\n");
        assert!(result.is_err());
        assert!(output.contains("Already at the first step."));
    }

    #[test]
    fn answers_file_is_applied_in_declaration_order() {
        let temp_dir = tempfile::TempDir::new().expect("temp dir");
        let path = temp_dir.path().join("answers.json");
        fs::write(&path, r#"{ "petType": "Cat", "hasPet": "yes", "unknown": 1 }"#).unwrap();

        let mut engine = pets();
        load_answers(&mut engine, &path).unwrap();
        assert_eq!(engine.visible_names(), vec!["hasPet", "petType", "toys"]);
        assert_eq!(engine.answer("petType"), Some(&AnswerValue::text("Cat")));

        fs::write(&path, r#"{ "hasPet": "maybe" }"#).unwrap();
        assert!(load_answers(&mut pets(), &path).is_err());
    }

    #[test]
    fn running_out_of_input_is_an_error() {
        let mut engine = pets();
        let (result, _) = run(&mut engine, "");
        assert!(result.is_err());
    }
}
