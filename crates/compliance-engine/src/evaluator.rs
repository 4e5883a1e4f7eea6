/// Rule evaluation against extracted label text.
///
/// Non-blank text runs every rule's detector. Blank text (a failed or empty
/// text extraction) skips matching: rules whose element names a basic
/// requirement are presumed compliant, every other rule fails. This can
/// overstate compliance when extraction fails; the allowlist is injectable.
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::CompiledRule;
use crate::classifier::LabelText;
use crate::model::ComplianceResult;

/// Element-name substrings presumed satisfied when no text is available.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmptyTextPolicy {
    pub basic_requirements: Vec<String>,
}

impl Default for EmptyTextPolicy {
    fn default() -> Self {
        Self {
            basic_requirements: [
                "producer marking",
                "identification",
                "amazon fba label",
                "information panel",
                "nominal content & durability",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

impl EmptyTextPolicy {
    /// Build a policy from arbitrary entries; blanks are dropped, the rest lowercased.
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            basic_requirements: entries
                .into_iter()
                .map(|s| s.as_ref().trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }

    pub fn presumes_compliant(&self, element: &str) -> bool {
        let element = element.to_lowercase();
        self.basic_requirements
            .iter()
            .any(|basic| element.contains(basic.as_str()))
    }
}

/// Evaluate `rules` against `text`, producing one result per rule in rule order.
pub fn evaluate(
    rules: &[CompiledRule],
    text: &str,
    policy: &EmptyTextPolicy,
) -> Vec<ComplianceResult> {
    let label = LabelText::new(text);

    if label.is_blank() {
        debug!(rules = rules.len(), "blank label text, applying basic-requirement policy");
        return rules
            .iter()
            .map(|compiled| {
                let compliant = policy.presumes_compliant(&compiled.rule().element);
                to_result(compiled, compliant, None)
            })
            .collect();
    }

    let results: Vec<ComplianceResult> = rules
        .iter()
        .map(|compiled| {
            let detection = compiled.detector().detect(&label);
            to_result(compiled, detection.compliant, detection.matched_text)
        })
        .collect();

    debug!(
        rules = rules.len(),
        passed = results.iter().filter(|r| r.compliant).count(),
        "evaluated label text"
    );
    results
}

fn to_result(
    compiled: &CompiledRule,
    compliant: bool,
    matched_text: Option<String>,
) -> ComplianceResult {
    let rule = compiled.rule();
    ComplianceResult {
        element: rule.element.clone(),
        criticality: rule.criticality,
        compliant,
        suggestion: (!compliant).then(|| rule.suggestion.clone()),
        matched_text: if compliant { matched_text } else { None },
    }
}
