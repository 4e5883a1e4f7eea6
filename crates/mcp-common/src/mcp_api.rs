use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct CheckComplianceParams {
    /// Text extracted from the product label. May be empty when extraction failed.
    pub text: String,
    /// Product category such as "Toys" or "Cosmetics".
    pub category: String,
    /// Jurisdiction such as "USA", "UK" or "Germany".
    pub jurisdiction: String,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct GenerateReportParams {
    /// Per-rule results as returned by `check_compliance`.
    pub results: Vec<RuleResult>,
    /// Score as returned by `check_compliance` (0 to 100).
    pub score: f64,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ListRulesParams {
    /// Product category such as "Toys".
    pub category: String,
    /// Jurisdiction such as "USA".
    pub jurisdiction: String,
}

/// Outcome of one rule. Used both as tool output and as `generate_report` input.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RuleResult {
    pub element: String,
    /// "High", "Medium" or "Low".
    pub criticality: String,
    pub compliant: bool,
    /// Remediation text, present only when the rule failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    /// Label excerpt that satisfied the rule, when a single span did.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_text: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CheckComplianceResponse {
    pub results: Vec<RuleResult>,
    pub score: f64,
    pub total_rules: usize,
    /// True when no rules exist for the category/jurisdiction; the score is then meaningless.
    pub indeterminate: bool,
    pub catalog_version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ComplianceReportResponse {
    pub score: f64,
    pub total_rules: usize,
    pub passed_rules: usize,
    pub failed_rules: usize,
    pub indeterminate: bool,
    /// Failing High-criticality rules.
    pub critical: Vec<RuleResult>,
    /// Failing Medium-criticality rules.
    pub warning: Vec<RuleResult>,
    /// Failing Low-criticality rules.
    pub recommendation: Vec<RuleResult>,
    /// Deduplicated remediation suggestions in evaluation order.
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AvailableOptionsResponse {
    pub categories: Vec<String>,
    pub jurisdictions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RuleSummary {
    pub element: String,
    pub details: String,
    pub location: String,
    pub criticality: String,
    pub suggestion: String,
    /// Detection strategy resolved at load time, e.g. "hazard_warning" or "custom".
    pub match_family: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ListRulesResponse {
    pub category: String,
    pub jurisdiction: String,
    pub version: String,
    pub rules: Vec<RuleSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ReloadCatalogResponse {
    pub reloaded: bool,
    pub catalog_version: String,
    pub rule_set_count: usize,
    pub rule_count: usize,
}
