/// Weighted compliance score with critical-rule floors.
///
/// raw = earned weight / total weight * 100 (0 when nothing carries weight).
/// Then, looking only at High-criticality results:
/// - at least one High rule and none failed: max(raw, all-passed floor)
/// - some but not all High rules failed: max(raw, some-passed floor)
/// - otherwise: raw
/// The checks run in that order and the result is rounded to two decimals.
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::model::{ComplianceResult, Criticality};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeverityWeights {
    pub high: f64,
    pub medium: f64,
    pub low: f64,
}

impl Default for SeverityWeights {
    fn default() -> Self {
        Self {
            high: 0.5,
            medium: 0.3,
            low: 0.2,
        }
    }
}

impl SeverityWeights {
    pub fn weight(&self, criticality: Criticality) -> f64 {
        match criticality {
            Criticality::High => self.high,
            Criticality::Medium => self.medium,
            Criticality::Low => self.low,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringPolicy {
    pub weights: SeverityWeights,
    /// Minimum score when every High rule passed
    pub all_critical_passed_floor: f64,
    /// Minimum score when at least one, but not every, High rule failed
    pub some_critical_passed_floor: f64,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            weights: SeverityWeights::default(),
            all_critical_passed_floor: 60.0,
            some_critical_passed_floor: 30.0,
        }
    }
}

impl ScoringPolicy {
    pub fn validate(&self) -> Result<(), EngineError> {
        for (name, weight) in [
            ("high", self.weights.high),
            ("medium", self.weights.medium),
            ("low", self.weights.low),
        ] {
            if !weight.is_finite() || weight < 0.0 {
                return Err(EngineError::InvalidPolicy(format!(
                    "{name} weight must be a finite, non-negative number, got {weight}"
                )));
            }
        }

        for (name, floor) in [
            ("all-critical-passed floor", self.all_critical_passed_floor),
            ("some-critical-passed floor", self.some_critical_passed_floor),
        ] {
            if !(0.0..=100.0).contains(&floor) {
                return Err(EngineError::InvalidPolicy(format!(
                    "{name} must be within 0..=100, got {floor}"
                )));
            }
        }

        Ok(())
    }
}

/// Compute the final score for a set of results.
pub fn score(results: &[ComplianceResult], policy: &ScoringPolicy) -> f64 {
    let mut total_weight = 0.0;
    let mut earned_weight = 0.0;
    let mut critical_total = 0usize;
    let mut critical_failed = 0usize;

    for result in results {
        let weight = policy.weights.weight(result.criticality);
        total_weight += weight;
        if result.compliant {
            earned_weight += weight;
        }
        if result.criticality == Criticality::High {
            critical_total += 1;
            if !result.compliant {
                critical_failed += 1;
            }
        }
    }

    let raw = if total_weight > 0.0 {
        earned_weight / total_weight * 100.0
    } else {
        0.0
    };

    let floored = if critical_total > 0 && critical_failed == 0 {
        raw.max(policy.all_critical_passed_floor)
    } else if critical_failed < critical_total {
        raw.max(policy.some_critical_passed_floor)
    } else {
        raw
    };

    round2(floored.clamp(0.0, 100.0))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
