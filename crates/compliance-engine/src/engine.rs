use sha2::{Digest, Sha256};
use tracing::debug;

use crate::catalog::RuleCatalog;
use crate::error::EngineError;
use crate::evaluator::{self, EmptyTextPolicy};
use crate::model::{AvailableOptions, ComplianceCheck, ComplianceReport, ComplianceResult};
use crate::report;
use crate::scoring::{self, ScoringPolicy};

/// Facade over catalog lookup, evaluation, scoring and report assembly.
///
/// Holds only immutable data, so a single engine can serve any number of
/// concurrent evaluations.
#[derive(Debug, Clone)]
pub struct ComplianceEngine {
    catalog: RuleCatalog,
    scoring: ScoringPolicy,
    empty_text: EmptyTextPolicy,
}

impl ComplianceEngine {
    pub fn new(
        catalog: RuleCatalog,
        scoring: ScoringPolicy,
        empty_text: EmptyTextPolicy,
    ) -> Result<Self, EngineError> {
        scoring.validate()?;
        Ok(Self {
            catalog,
            scoring,
            empty_text,
        })
    }

    /// Engine with the default scoring and empty-text policies.
    pub fn with_default_policies(catalog: RuleCatalog) -> Self {
        Self {
            catalog,
            scoring: ScoringPolicy::default(),
            empty_text: EmptyTextPolicy::default(),
        }
    }

    pub fn catalog(&self) -> &RuleCatalog {
        &self.catalog
    }

    pub fn scoring_policy(&self) -> &ScoringPolicy {
        &self.scoring
    }

    pub fn empty_text_policy(&self) -> &EmptyTextPolicy {
        &self.empty_text
    }

    /// Evaluate `text` against the rules for (category, jurisdiction).
    ///
    /// An unknown pair yields no results and a score of 0; callers should
    /// check `ComplianceCheck::is_indeterminate` before reading the score.
    pub fn perform_compliance_check(
        &self,
        text: &str,
        category: &str,
        jurisdiction: &str,
    ) -> ComplianceCheck {
        let rules = self.catalog.lookup(category, jurisdiction);
        let results = evaluator::evaluate(rules, text, &self.empty_text);
        let score = scoring::score(&results, &self.scoring);
        debug!(
            category,
            jurisdiction,
            rules = results.len(),
            score,
            "compliance check complete"
        );
        ComplianceCheck { results, score }
    }

    pub fn generate_report(&self, results: &[ComplianceResult], score: f64) -> ComplianceReport {
        report::assemble(results, score)
    }

    /// Check and report in one step.
    pub fn check_label(&self, text: &str, category: &str, jurisdiction: &str) -> ComplianceReport {
        let check = self.perform_compliance_check(text, category, jurisdiction);
        self.generate_report(&check.results, check.score)
    }

    pub fn available_options(&self) -> AvailableOptions {
        AvailableOptions {
            categories: self.catalog.available_categories().iter().cloned().collect(),
            jurisdictions: self
                .catalog
                .available_jurisdictions()
                .iter()
                .cloned()
                .collect(),
        }
    }

    /// Identifies everything that can change an evaluation outcome: the
    /// catalog contents and both policies.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.catalog.digest().as_bytes());
        hasher.update(b"|");
        hasher.update(serde_json::to_string(&self.scoring).unwrap_or_default().as_bytes());
        hasher.update(b"|");
        hasher.update(serde_json::to_string(&self.empty_text).unwrap_or_default().as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Criticality;

    fn engine() -> ComplianceEngine {
        ComplianceEngine::with_default_policies(RuleCatalog::builtin().unwrap())
    }

    #[test]
    fn test_new_rejects_invalid_policy() {
        let mut scoring = ScoringPolicy::default();
        scoring.some_critical_passed_floor = -1.0;
        let result = ComplianceEngine::new(
            RuleCatalog::builtin().unwrap(),
            scoring,
            EmptyTextPolicy::default(),
        );
        assert!(matches!(result, Err(EngineError::InvalidPolicy(_))));
    }

    #[test]
    fn test_unknown_pair_is_indeterminate() {
        let engine = engine();
        let check = engine.perform_compliance_check("Made in China", "Cosmetics", "Mars");
        assert!(check.results.is_empty());
        assert!(check.is_indeterminate());
        assert_eq!(check.score, 0.0);

        let report = engine.generate_report(&check.results, check.score);
        assert!(report.indeterminate);
        assert_eq!(report.total_rules, 0);
        assert!(!engine.available_options().jurisdictions.contains(&"Mars".to_string()));
    }

    #[test]
    fn test_check_label_matches_two_step_flow() {
        let engine = engine();
        let text = "Gentle Baby Shampoo\nIngredients: Aqua, Glycerin\nNet Wt. 8 oz (227 g)";
        let check = engine.perform_compliance_check(text, "Cosmetics", "USA");
        let report = engine.check_label(text, "Cosmetics", "USA");
        assert_eq!(report, engine.generate_report(&check.results, check.score));
        assert_eq!(report.total_rules, check.total_rules());
    }

    #[test]
    fn test_cosmetics_usa_partial_label() {
        let engine = engine();
        let text = "Gentle Baby Shampoo\nIngredients: Aqua, Glycerin\nNet Wt. 8 oz (227 g)";
        let check = engine.perform_compliance_check(text, "Cosmetics", "USA");

        let by_element = |name: &str| {
            check
                .results
                .iter()
                .find(|r| r.element == name)
                .unwrap_or_else(|| panic!("missing result for {name}"))
        };
        assert!(by_element("Product identity").compliant);
        assert!(by_element("Net quantity of contents").compliant);
        assert_eq!(
            by_element("Ingredients").matched_text.as_deref(),
            Some("Ingredients: Aqua, Glycerin")
        );
        let manufacturer = by_element("Manufacturer identification");
        assert!(!manufacturer.compliant);
        assert_eq!(manufacturer.criticality, Criticality::High);
        assert!(manufacturer.suggestion.is_some());
    }

    #[test]
    fn test_fingerprint_tracks_policies() {
        let catalog = RuleCatalog::builtin().unwrap();
        let a = ComplianceEngine::with_default_policies(catalog.clone());
        let b = ComplianceEngine::with_default_policies(catalog.clone());
        assert_eq!(a.fingerprint(), b.fingerprint());

        let mut scoring = ScoringPolicy::default();
        scoring.all_critical_passed_floor = 50.0;
        let c = ComplianceEngine::new(catalog, scoring, EmptyTextPolicy::default()).unwrap();
        assert_ne!(a.fingerprint(), c.fingerprint());
    }
}
