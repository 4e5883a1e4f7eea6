use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::classifier::MatchFamily;

/// Severity tier of a labeling requirement. Drives both the scoring weight
/// and the report bucket a failing rule lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Criticality {
    High,
    Medium,
    Low,
}

impl Criticality {
    pub fn as_str(self) -> &'static str {
        match self {
            Criticality::High => "High",
            Criticality::Medium => "Medium",
            Criticality::Low => "Low",
        }
    }
}

impl fmt::Display for Criticality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Criticality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(Criticality::High),
            "medium" => Ok(Criticality::Medium),
            "low" => Ok(Criticality::Low),
            other => Err(format!(
                "unknown criticality '{other}', expected High, Medium or Low"
            )),
        }
    }
}

/// A single labeling requirement for one (category, jurisdiction) pair,
/// e.g. "Choking hazard warning" for toys sold in the USA.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ComplianceRule {
    /// Short name, unique within its rule set
    pub element: String,
    /// Requirement text, including citations or mandated wording
    pub details: String,
    /// Where the element is expected on the packaging (informational only)
    #[serde(default)]
    pub location: String,
    pub criticality: Criticality,
    /// Remediation shown when the rule fails
    pub suggestion: String,
    /// Explicit detection family. Inferred from `element` at load time when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_family: Option<MatchFamily>,
    /// Case-insensitive regular expressions that replace the family predicates.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub patterns: Vec<String>,
}

/// Outcome of evaluating one rule against one label text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceResult {
    pub element: String,
    pub criticality: Criticality,
    pub compliant: bool,
    /// Present only on failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    /// Excerpt of the label text that satisfied the rule, when a single span did
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_text: Option<String>,
}

/// Results and score of one `perform_compliance_check` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceCheck {
    pub results: Vec<ComplianceResult>,
    pub score: f64,
}

impl ComplianceCheck {
    pub fn total_rules(&self) -> usize {
        self.results.len()
    }

    /// No rules applied to the requested pair; a score of 0 means nothing here.
    pub fn is_indeterminate(&self) -> bool {
        self.results.is_empty()
    }
}

/// Failing results partitioned by severity, each in evaluation order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IssueBuckets {
    #[serde(rename = "Critical")]
    pub critical: Vec<ComplianceResult>,
    #[serde(rename = "Warning")]
    pub warning: Vec<ComplianceResult>,
    #[serde(rename = "Recommendation")]
    pub recommendation: Vec<ComplianceResult>,
}

impl IssueBuckets {
    /// All issues in action order: critical first, then warnings, then recommendations.
    pub fn prioritized(&self) -> impl Iterator<Item = &ComplianceResult> {
        self.critical
            .iter()
            .chain(self.warning.iter())
            .chain(self.recommendation.iter())
    }

    pub fn len(&self) -> usize {
        self.critical.len() + self.warning.len() + self.recommendation.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Aggregate of a full evaluation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceReport {
    pub score: f64,
    pub total_rules: usize,
    pub passed_rules: usize,
    pub failed_rules: usize,
    /// True when no rules applied (`total_rules == 0`)
    pub indeterminate: bool,
    pub issues: IssueBuckets,
    /// Remediation suggestions of failing rules, deduplicated, first occurrence wins
    pub suggestions: Vec<String>,
}

/// Category and jurisdiction names known to the loaded catalog, sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailableOptions {
    pub categories: Vec<String>,
    pub jurisdictions: Vec<String>,
}
