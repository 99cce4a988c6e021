use std::cell::RefCell;
use std::rc::Rc;

use form_spec::{
    AnswerError, AnswerValue, EvalLimits, FieldControl, FieldInput, FormEngine, FormSpec,
    RecordingObserver,
};

fn fixture(name: &str) -> &'static str {
    match name {
        "pet_form" => include_str!("../tests/fixtures/pet_form.json"),
        "signup_form" => include_str!("../tests/fixtures/signup_form.json"),
        _ => panic!("unknown fixture {}", name),
    }
}

fn engine(name: &str) -> FormEngine {
    let spec = FormSpec::from_json(fixture(name)).expect("deserialize");
    FormEngine::new(spec)
}

#[test]
fn pet_type_follows_has_pet() {
    let mut engine = engine("pet_form");
    assert_eq!(engine.visible_names(), vec!["hasPet"]);

    engine.set_answer("hasPet", AnswerValue::text("yes")).unwrap();
    assert_eq!(engine.visible_names(), vec!["hasPet", "petType"]);

    engine.advance();
    assert_eq!(engine.current_step(), 1);

    engine.set_answer("hasPet", AnswerValue::text("no")).unwrap();
    assert_eq!(engine.visible_names(), vec!["hasPet"]);
    assert_eq!(engine.current_step(), 0);
}

#[test]
fn original_document_shape_loads() {
    let engine = engine("signup_form");
    let spec = engine.spec();
    assert_eq!(spec.id.to_string(), "1");
    assert_eq!(spec.submit.as_deref(), Some("Create account"));
    assert!(!spec.fields[0].required.is_false());
    assert_eq!(
        spec.fields[4].visible_if.as_deref(),
        Some("$gender == \"other\"")
    );
    assert_eq!(engine.answer("age"), Some(&AnswerValue::Unset));
    assert_eq!(engine.answer("agree-tos"), Some(&AnswerValue::Bool(false)));
    assert_eq!(
        engine.answer("interests"),
        Some(&AnswerValue::TextList(vec![]))
    );
}

#[test]
fn single_checkbox_toggles() {
    let mut engine = engine("signup_form");
    engine
        .input("agree-tos", FieldInput::Toggle("agree-tos".into()))
        .unwrap();
    assert_eq!(engine.answer("agree-tos"), Some(&AnswerValue::Bool(true)));
    engine
        .input("agree-tos", FieldInput::Toggle("agree-tos".into()))
        .unwrap();
    assert_eq!(engine.answer("agree-tos"), Some(&AnswerValue::Bool(false)));
}

#[test]
fn multiselect_toggles_membership() {
    let mut engine = engine("signup_form");
    engine
        .input("frameworks", FieldInput::Toggle("reactjs".into()))
        .unwrap();
    assert_eq!(
        engine.answer("frameworks"),
        Some(&AnswerValue::TextList(vec!["reactjs".into()]))
    );
    engine
        .input("frameworks", FieldInput::Toggle("reactjs".into()))
        .unwrap();
    assert_eq!(
        engine.answer("frameworks"),
        Some(&AnswerValue::TextList(vec![]))
    );
}

#[test]
fn chained_conditions_unlock_in_order() {
    let mut engine = engine("signup_form");
    assert!(!engine.is_visible("interests"));
    assert!(!engine.is_visible("genre"));

    engine
        .input("agree-tos", FieldInput::Toggle("agree-tos".into()))
        .unwrap();
    assert!(engine.is_visible("interests"));
    assert!(!engine.is_visible("genre"));

    engine
        .input("interests", FieldInput::Toggle("music".into()))
        .unwrap();
    assert!(engine.is_visible("genre"));

    // Hiding `interests` takes its answer out of scope for `genre`.
    engine
        .input("agree-tos", FieldInput::Toggle("agree-tos".into()))
        .unwrap();
    assert!(!engine.is_visible("interests"));
    assert!(!engine.is_visible("genre"));
}

#[test]
fn radio_commits_and_advances_select_does_not() {
    let mut engine = engine("signup_form");
    while engine.current_field().map(|field| field.name.as_str()) != Some("gender") {
        engine.advance();
    }
    let step = engine.current_step();
    assert!(matches!(
        engine.current_control(),
        Some(FieldControl::SingleChoice {
            advance_on_select: true,
            ..
        })
    ));
    assert!(
        engine
            .input("gender", FieldInput::Choose("female".into()))
            .unwrap()
    );
    assert_eq!(engine.current_step(), step + 1);

    assert!(
        !engine
            .input("genre", FieldInput::Choose("jazz".into()))
            .unwrap()
    );
    assert_eq!(engine.current_step(), step + 1);
}

#[test]
fn invalid_answer_types_are_rejected() {
    let mut engine = engine("signup_form");
    assert!(matches!(
        engine.set_answer("name", AnswerValue::TextList(vec!["a".into()])),
        Err(AnswerError::TypeMismatch { .. })
    ));
    assert!(matches!(
        engine.input("age", FieldInput::Text("old".into())),
        Err(AnswerError::InvalidNumber { .. })
    ));
    assert!(matches!(
        engine.input("gender", FieldInput::Choose("robot".into())),
        Err(AnswerError::UnknownOption { .. })
    ));
    assert_eq!(engine.answer("name"), Some(&AnswerValue::text("")));
}

#[test]
fn malformed_expression_keeps_field_visible() {
    let spec = FormSpec::from_json(
        r#"{
            "formID": 7,
            "fields": [
                { "name": "gender", "label": "Gender", "type": "text" },
                { "name": "extra", "label": "Extra", "type": "text", "visible": "$gender === " }
            ]
        }"#,
    )
    .unwrap();
    let observer = Rc::new(RefCell::new(RecordingObserver::default()));
    let engine = FormEngine::new(spec).with_observer(Rc::clone(&observer));
    assert_eq!(engine.visible_names(), vec!["gender", "extra"]);

    let recorded = observer.borrow();
    assert_eq!(recorded.failures.len(), 1);
    assert_eq!(recorded.failures[0].0, "extra");
}

#[test]
fn very_long_operator_chain_fails_open() {
    let chain = vec!["0"; 1360].join("||");
    let mut field = serde_json::json!({ "name": "extra", "label": "Extra", "type": "text" });
    field["visible"] = serde_json::Value::String(chain);
    let json = serde_json::json!({ "formID": 8, "fields": [field] }).to_string();

    let observer = Rc::new(RefCell::new(RecordingObserver::default()));
    let engine =
        FormEngine::new(FormSpec::from_json(&json).unwrap()).with_observer(Rc::clone(&observer));
    assert_eq!(engine.visible_names(), vec!["extra"]);
    assert!(matches!(
        observer.borrow().failures[0].1,
        form_spec::ExprError::TooDeep { .. }
    ));
}

#[test]
fn default_values_do_not_seed_answers() {
    let spec = FormSpec::from_json(
        r#"{
            "formID": 5,
            "fields": [
                {
                    "name": "color",
                    "label": "Color",
                    "type": "select",
                    "defaultValue": "blue",
                    "options": [
                        { "label": "Red", "value": "red" },
                        { "label": "Blue", "value": "blue" }
                    ]
                },
                { "name": "age", "label": "Age", "type": "text", "isNumeric": true, "defaultValue": "30" },
                { "name": "extra", "label": "Extra", "type": "text", "visible": "$color == \"blue\"" }
            ]
        }"#,
    )
    .unwrap();
    let engine = FormEngine::new(spec);
    assert_eq!(engine.answer("color"), Some(&AnswerValue::text("")));
    assert_eq!(engine.answer("age"), Some(&AnswerValue::Unset));
    assert_eq!(engine.visible_names(), vec!["color", "age"]);
}

#[test]
fn non_finite_numbers_never_reach_the_answers() {
    let mut engine = engine("signup_form");
    assert!(matches!(
        engine.set_answer("age", AnswerValue::Number(f64::NAN)),
        Err(AnswerError::InvalidNumber { .. })
    ));
    assert!(matches!(
        engine.input("age", FieldInput::Number(f64::INFINITY)),
        Err(AnswerError::InvalidNumber { .. })
    ));
    assert_eq!(engine.answer("age"), Some(&AnswerValue::Unset));
}

#[test]
fn submission_reports_missing_required_and_validators() {
    let mut engine = engine("signup_form");
    engine.set_answer("name", AnswerValue::text("Ada")).unwrap();
    engine
        .set_answer("email", AnswerValue::text("not-an-email"))
        .unwrap();

    let submission = engine.submit().unwrap();
    assert!(!submission.report.complete);
    assert_eq!(submission.report.missing_required, vec!["gender", "agree-tos"]);
    assert_eq!(submission.report.errors.len(), 1);
    assert_eq!(submission.report.errors[0].code, "pattern_mismatch");
    assert!(submission.answers.get("interests").is_none());
}

#[test]
fn multiselect_options_can_be_filtered_for_display() {
    let mut engine = engine("signup_form");
    let options = engine.visible_options("frameworks");
    let shown = form_spec::filter_options(options, "s");
    let values: Vec<_> = shown.iter().map(|option| option.value.as_str()).collect();
    assert_eq!(values, vec!["reactjs", "svelte"]);
    assert_eq!(
        engine.answer("frameworks"),
        Some(&AnswerValue::TextList(vec![]))
    );
}

#[test]
fn exhausted_step_budget_keeps_field_visible() {
    let spec = FormSpec::from_json(fixture("pet_form")).unwrap();
    let limits = EvalLimits {
        max_steps: 2,
        ..EvalLimits::default()
    };
    let engine = FormEngine::new(spec)
        .with_observer(RecordingObserver::default())
        .with_limits(limits);
    assert_eq!(engine.visible_names(), vec!["hasPet", "petType"]);
}
