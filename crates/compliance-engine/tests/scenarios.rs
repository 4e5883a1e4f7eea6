use compliance_engine::{
    ComplianceEngine, Criticality, EmptyTextPolicy, MatchFamily, RuleCatalog, ScoringPolicy,
};

fn builtin_engine() -> ComplianceEngine {
    ComplianceEngine::with_default_policies(RuleCatalog::builtin().expect("builtin catalog"))
}

const CHOKING_TEXT: &str = "WARNING: CHOKING HAZARD—Small parts. Not for children under 3 yrs";

#[test]
fn toys_usa_empty_text_applies_basic_requirement_policy() {
    let engine = builtin_engine();
    let check = engine.perform_compliance_check("", "Toys", "USA");

    let passed: Vec<&str> = check
        .results
        .iter()
        .filter(|r| r.compliant)
        .map(|r| r.element.as_str())
        .collect();
    assert_eq!(passed, vec!["Manufacturer identification", "Amazon FBA label"]);

    // Every High rule outside the allowlist fails.
    for result in check.results.iter().filter(|r| r.criticality == Criticality::High) {
        let basic = engine.empty_text_policy().presumes_compliant(&result.element);
        assert_eq!(result.compliant, basic, "{}", result.element);
    }

    // raw = (0.5 + 0.2) / (3 * 0.5 + 2 * 0.3 + 2 * 0.2) * 100 = 28.0; one of three
    // High rules passed, so the some-critical floor of 30 applies.
    assert_eq!(check.score, 30.0);

    let report = engine.generate_report(&check.results, check.score);
    assert_eq!(report.total_rules, 7);
    assert_eq!(report.passed_rules, 2);
    assert_eq!(report.failed_rules, 5);
    assert_eq!(report.issues.critical.len(), 2);
    assert_eq!(report.issues.warning.len(), 2);
    assert_eq!(report.issues.recommendation.len(), 1);
}

#[test]
fn empty_text_with_only_basic_high_rules_gets_full_floor() {
    let rules = r#"{
        "category": "Toys", "jurisdiction": "Testland", "version": "1",
        "rules": [
            {"element": "Manufacturer identification", "details": "Name and address",
             "criticality": "High", "suggestion": "Add the manufacturer"},
            {"element": "Batch code", "details": "Batch code", "criticality": "Medium",
             "suggestion": "Add a batch code"},
            {"element": "Care instructions", "details": "Care", "criticality": "Low",
             "suggestion": "Add care instructions"}
        ]
    }"#;
    let catalog =
        RuleCatalog::from_sources([("toys.testland.json".to_string(), rules.to_string())]).unwrap();
    let engine = ComplianceEngine::with_default_policies(catalog);

    // raw = 0.5 / 1.0 * 100 = 50; every High rule passed, so the floor is 60.
    let check = engine.perform_compliance_check("  ", "Toys", "Testland");
    assert_eq!(check.score, 60.0);
}

#[test]
fn marketing_copy_does_not_pass_tracking_label() {
    let engine = builtin_engine();
    let check = engine.perform_compliance_check("A lot more fun for everyone!", "Toys", "USA");

    let tracking = check
        .results
        .iter()
        .find(|r| r.element == "Tracking label")
        .expect("tracking rule evaluated");
    assert!(!tracking.compliant);
    assert!(tracking.matched_text.is_none());
    assert!(check.results.iter().all(|r| !r.compliant));
    assert_eq!(check.score, 0.0);

    let check = engine.perform_compliance_check("Charge fully before first use", "Electronics", "UK");
    let serial = check
        .results
        .iter()
        .find(|r| r.element == "Model or serial number")
        .expect("serial rule evaluated");
    assert!(!serial.compliant);
}

#[test]
fn choking_hazard_text_satisfies_hazard_rule() {
    let engine = builtin_engine();
    let check = engine.perform_compliance_check(CHOKING_TEXT, "Toys", "USA");

    let choking = check
        .results
        .iter()
        .find(|r| r.element == "Choking hazard warning")
        .expect("choking rule evaluated");
    assert!(choking.compliant);
    assert!(choking.suggestion.is_none());

    let matched = choking.matched_text.as_deref().expect("matched text");
    assert!(CHOKING_TEXT.contains(matched));
    let hazard_match = MatchFamily::HazardWarning
        .predicates()
        .iter()
        .any(|re| re.is_match(matched));
    assert!(hazard_match, "{matched} should match the hazard family");
}

#[test]
fn unsupported_jurisdiction_is_indeterminate() {
    let engine = builtin_engine();
    let options = engine.available_options();
    assert!(options.categories.contains(&"Cosmetics".to_string()));
    assert!(!options.jurisdictions.contains(&"Mars".to_string()));

    let check = engine.perform_compliance_check(CHOKING_TEXT, "Cosmetics", "Mars");
    assert!(check.results.is_empty());
    assert_eq!(check.score, 0.0);

    let report = engine.generate_report(&check.results, check.score);
    assert!(report.indeterminate);
    assert_eq!(report.total_rules, 0);
}

#[test]
fn fully_labelled_toy_scores_full_marks() {
    let text = "\
WARNING: CHOKING HAZARD - Small parts. Not for children under 3 yrs.
Ages 3+
Distributed by: Acme Toys Inc., 100 Main Street, Springfield, IL
Batch No: 24A117  Mfg date: 2024/05
Made in China
Conforms to the safety requirements of ASTM F963
FBA: fulfillment network barcode label X001ABC";

    let engine = builtin_engine();
    let report = engine.check_label(text, "toys", "usa");
    let failing: Vec<&str> = report
        .issues
        .prioritized()
        .map(|r| r.element.as_str())
        .collect();
    assert!(failing.is_empty(), "unexpected failures: {failing:?}");
    assert_eq!(report.score, 100.0);
    assert_eq!(report.passed_rules, report.total_rules);
    assert!(report.suggestions.is_empty());
}

#[test]
fn repeated_checks_are_byte_identical() {
    let engine = builtin_engine();
    let first = engine.perform_compliance_check(CHOKING_TEXT, "Toys", "USA");
    let second = engine.perform_compliance_check(CHOKING_TEXT, "Toys", "USA");
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn concurrent_checks_share_one_engine() {
    let engine = builtin_engine();
    let expected = engine.perform_compliance_check(CHOKING_TEXT, "Toys", "UK");

    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| scope.spawn(|| engine.perform_compliance_check(CHOKING_TEXT, "Toys", "UK")))
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), expected);
        }
    });
}

#[test]
fn custom_policies_flow_through_the_engine() {
    let scoring = ScoringPolicy {
        all_critical_passed_floor: 0.0,
        some_critical_passed_floor: 0.0,
        ..ScoringPolicy::default()
    };
    let engine = ComplianceEngine::new(
        RuleCatalog::builtin().unwrap(),
        scoring,
        EmptyTextPolicy::new(Vec::<String>::new()),
    )
    .unwrap();

    let check = engine.perform_compliance_check("", "Toys", "USA");
    assert!(check.results.iter().all(|r| !r.compliant));
    assert_eq!(check.score, 0.0);
}

#[test]
fn suggestions_are_deduplicated_across_rules() {
    let rules = r#"{
        "category": "Toys", "jurisdiction": "Testland", "version": "1",
        "rules": [
            {"element": "Choking hazard warning", "details": "Warning", "criticality": "High",
             "suggestion": "Add the hazard warnings"},
            {"element": "Battery warning", "details": "Warning", "criticality": "Medium",
             "suggestion": "Add the hazard warnings"}
        ]
    }"#;
    let catalog =
        RuleCatalog::from_sources([("toys.testland.json".to_string(), rules.to_string())]).unwrap();
    let engine = ComplianceEngine::with_default_policies(catalog);
    let report = engine.check_label("Made in China", "Toys", "Testland");

    assert_eq!(report.failed_rules, 2);
    assert_eq!(report.suggestions, vec!["Add the hazard warnings"]);
}
