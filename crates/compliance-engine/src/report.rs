use std::collections::HashSet;

use crate::model::{ComplianceReport, ComplianceResult, Criticality, IssueBuckets};

/// Assemble the report for a set of results and their score.
///
/// Failing results go to the bucket of their criticality in evaluation order.
/// Suggestions keep evaluation order and drop repeats, so two rules sharing
/// the same remediation text produce a single action item.
pub fn assemble(results: &[ComplianceResult], score: f64) -> ComplianceReport {
    let mut issues = IssueBuckets::default();
    let mut suggestions = Vec::new();
    let mut seen = HashSet::new();
    let mut passed_rules = 0;

    for result in results {
        if result.compliant {
            passed_rules += 1;
            continue;
        }

        match result.criticality {
            Criticality::High => issues.critical.push(result.clone()),
            Criticality::Medium => issues.warning.push(result.clone()),
            Criticality::Low => issues.recommendation.push(result.clone()),
        }

        if let Some(suggestion) = result.suggestion.as_deref().map(str::trim) {
            if !suggestion.is_empty() && seen.insert(suggestion) {
                suggestions.push(suggestion.to_string());
            }
        }
    }

    ComplianceReport {
        score,
        total_rules: results.len(),
        passed_rules,
        failed_rules: results.len() - passed_rules,
        indeterminate: results.is_empty(),
        issues,
        suggestions,
    }
}
