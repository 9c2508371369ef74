//! End-to-end validation scenarios: rule file → registry → document → outcome.

use std::sync::Arc;

use regex::Regex;
use ruleval::engine::{project, ErrorPolicy, Evaluator, ExecutionMode};
use ruleval::rules::{RuleParser, RuleRegistry};
use ruleval::source::RuleLoader;
use ruleval::ValidationOutcome;
use serde_json::{json, Value};

fn load_registry() -> Arc<RuleRegistry> {
    let registry = RuleRegistry::new();
    RuleLoader::new(concat!(env!("CARGO_MANIFEST_DIR"), "/rules.json"))
        .load_into(&RuleParser::with_builtins(), &registry)
        .expect("sample rules should load");
    Arc::new(registry)
}

fn person(username: &str, password: &str, phone: &str, zip_code: &str) -> Value {
    json!({
        "username": username,
        "password": password,
        "first_name": "Bruce",
        "last_name": "Willis",
        "date_of_birth": "03/19/1955",
        "email": "bruce@willis.com",
        "phone": phone,
        "address": {
            "street": "2000 Avenue Of The Stars",
            "city": "Los Angeles",
            "state": "CA",
            "zip_code": zip_code
        }
    })
}

async fn validate_both(evaluator: &Evaluator, document: &Value) -> ValidationOutcome {
    let sequential = evaluator
        .validate(document, ExecutionMode::Sequential)
        .await
        .unwrap();
    let concurrent = evaluator
        .validate(document, ExecutionMode::Concurrent)
        .await
        .unwrap();

    assert_eq!(sequential.passed, concurrent.passed);
    assert_eq!(sequential.sorted_violations(), concurrent.sorted_violations());
    concurrent
}

#[tokio::test]
async fn test_valid_person_passes() {
    let evaluator = Evaluator::new(load_registry());

    let outcome = validate_both(
        &evaluator,
        &person("bwillis", "", "424-288-2000", "90067"),
    )
    .await;

    assert!(outcome.passed);
    assert!(outcome.violated_rules.is_empty());
    assert_eq!(outcome.evaluated, 4);
}

#[tokio::test]
async fn test_short_username_fails() {
    let evaluator = Evaluator::new(load_registry());

    let outcome = validate_both(&evaluator, &person("bill", "", "424-288-2000", "90067")).await;

    assert!(!outcome.passed);
    assert_eq!(outcome.violated_rules, vec!["username_length"]);
}

#[tokio::test]
async fn test_phone_pattern_fails() {
    let evaluator = Evaluator::new(load_registry());

    let outcome = validate_both(
        &evaluator,
        &person("bwillis", "", "42R-288-2000", "90067"),
    )
    .await;

    assert_eq!(outcome.violated_rules, vec!["phone_pattern"]);
}

#[tokio::test]
async fn test_password_and_nested_zip_code_fail() {
    let evaluator = Evaluator::new(load_registry());

    let outcome = validate_both(
        &evaluator,
        &person("bwillis", "tesTer", "424-288-2000", "9o067"),
    )
    .await;

    assert!(!outcome.passed);
    assert_eq!(
        outcome.sorted_violations(),
        vec!["password_length", "zip_code_pattern"]
    );
}

#[tokio::test]
async fn test_password_length_boundaries() {
    let evaluator = Evaluator::new(load_registry());

    for (password, ok) in [("", true), ("a", false), ("tesTer", false), ("tesTer1", true)] {
        let outcome = validate_both(&evaluator, &json!({ "password": password })).await;
        assert_eq!(outcome.passed, ok, "password {:?}", password);
    }
}

#[test]
fn test_projection_produces_dotted_key() {
    let fields = project(&person("bwillis", "", "424-288-2000", "90067")).unwrap();
    assert_eq!(fields["address.zip_code"], "90067");
    assert_eq!(fields["address.city"], "Los Angeles");
}

#[tokio::test]
async fn test_rules_agree_with_direct_evaluation() {
    let evaluator = Evaluator::new(load_registry());
    let phone = Regex::new(r"^\d{3}-\d{3}-\d{4}$").unwrap();

    let samples = ["", "bill", "bwillis", "424-288-2000", "42R-288-2000", "ÿÿÿÿÿÿÿ"];

    for sample in samples {
        let username = evaluator
            .validate(&json!({ "username": sample }), ExecutionMode::Sequential)
            .await
            .unwrap();
        assert_eq!(username.passed, sample.chars().count() > 6, "username {:?}", sample);

        let password = evaluator
            .validate(&json!({ "password": sample }), ExecutionMode::Concurrent)
            .await
            .unwrap();
        let len = sample.chars().count();
        assert_eq!(password.passed, len == 0 || len > 6, "password {:?}", sample);

        let phone_outcome = evaluator
            .validate(&json!({ "phone": sample }), ExecutionMode::Concurrent)
            .await
            .unwrap();
        assert_eq!(phone_outcome.passed, phone.is_match(sample), "phone {:?}", sample);

        // Same value under a field with no rules is never checked
        let unrelated = evaluator
            .validate(&json!({ "nickname": sample }), ExecutionMode::Concurrent)
            .await
            .unwrap();
        assert!(unrelated.passed);
        assert_eq!(unrelated.evaluated, 0);
    }
}

#[tokio::test]
async fn test_error_policies() {
    let registry = load_registry();
    // GREATER_THAN on a non-numeric literal fails at evaluation time
    RuleParser::with_builtins()
        .parse_definition(&ruleval::RuleDefinition::new(
            "email_broken",
            json!({
                "operator": "GREATER_THAN",
                "operands": [ { "field": "email" }, { "value": "6" } ]
            }),
        ))
        .map(|rule| registry.insert(rule).unwrap())
        .unwrap();

    let document = person("bwillis", "", "424-288-2000", "90067");

    let ignore = Evaluator::new(registry.clone());
    let outcome = validate_both(&ignore, &document).await;
    assert!(outcome.passed);
    assert_eq!(outcome.errored, 1);

    let fail = Evaluator::new(registry).with_error_policy(ErrorPolicy::Fail);
    let outcome = validate_both(&fail, &document).await;
    assert!(!outcome.passed);
    assert_eq!(outcome.violated_rules, vec!["email_broken"]);
}

#[tokio::test]
async fn test_repeated_validation_is_idempotent() {
    let evaluator = Evaluator::new(load_registry());
    let document = person("bill", "tesTer", "42R-288-2000", "9o067");

    let first = validate_both(&evaluator, &document).await;
    let second = validate_both(&evaluator, &document).await;

    assert_eq!(first.passed, second.passed);
    assert_eq!(first.sorted_violations(), second.sorted_violations());
    assert_eq!(first.sorted_violations().len(), 4);
}
