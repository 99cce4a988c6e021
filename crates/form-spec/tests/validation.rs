use form_spec::{FormSpec, validate};

fn codes(json: &str) -> Vec<String> {
    let spec = FormSpec::from_json(json).expect("deserialize");
    validate(&spec)
        .errors
        .into_iter()
        .map(|error| error.code)
        .collect()
}

#[test]
fn fixtures_are_valid() {
    for json in [
        include_str!("../tests/fixtures/signup_form.json"),
        include_str!("../tests/fixtures/pet_form.json"),
    ] {
        let spec = FormSpec::from_json(json).expect("deserialize");
        let result = validate(&spec);
        assert!(result.valid, "unexpected errors: {:?}", result.errors);
    }
}

#[test]
fn duplicate_names_and_missing_options() {
    let codes = codes(
        r#"{
            "formID": 1,
            "fields": [
                { "name": "color", "label": "Color", "type": "radio" },
                { "name": "Color", "label": "Again", "type": "text" }
            ]
        }"#,
    );
    assert_eq!(codes, vec!["missing_options", "duplicate_name"]);
}

#[test]
fn expressions_are_checked_for_syntax_and_references() {
    let codes = codes(
        r#"{
            "formID": 2,
            "fields": [
                { "name": "first", "label": "First", "type": "text", "visible": "$second == 'x'" },
                { "name": "second", "label": "Second", "type": "text", "visible": "$nobody" },
                { "name": "third", "label": "Third", "type": "text", "visible": "$first ==" }
            ]
        }"#,
    );
    assert_eq!(
        codes,
        vec!["forward_reference", "unknown_reference", "invalid_expression"]
    );
}

#[test]
fn validators_and_defaults_are_checked() {
    let codes = codes(
        r#"{
            "formID": 3,
            "fields": [
                { "name": "zip", "label": "Zip", "type": "text", "validator": "([0-9]" },
                { "name": "age", "label": "Age", "type": "text", "isNumeric": true, "defaultValue": "old" },
                {
                    "name": "size",
                    "label": "Size",
                    "type": "select",
                    "defaultValue": "xl",
                    "options": [
                        { "label": "Small", "value": "s" },
                        { "label": "Small again", "value": "s" }
                    ]
                }
            ]
        }"#,
    );
    assert_eq!(
        codes,
        vec![
            "invalid_validator",
            "invalid_default",
            "duplicate_option",
            "default_not_in_options"
        ]
    );
}

#[test]
fn required_conditions_are_linted() {
    let codes = codes(
        r#"{
            "formID": 4,
            "fields": [
                { "name": "married", "label": "Married?", "type": "text" },
                { "name": "spouse", "label": "Spouse", "type": "text", "isReuired": "$married == 'yes'" },
                { "name": "kids", "label": "Kids", "type": "text", "isReuired": "$married = 'yes'" }
            ]
        }"#,
    );
    assert_eq!(codes, vec!["invalid_expression"]);
}

#[test]
fn schema_describes_fields() {
    let schema = form_spec::form_schema();
    let text = serde_json::to_string(&schema).unwrap();
    assert!(text.contains("fields"));
    assert!(text.contains("multiselect"));
}
