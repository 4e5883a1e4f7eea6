pub mod catalog;
pub mod classifier;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod model;
pub mod report;
pub mod scoring;

pub use catalog::{CompiledRule, RuleCatalog, RuleSet};
pub use classifier::{Detector, MatchFamily};
pub use engine::ComplianceEngine;
pub use error::EngineError;
pub use evaluator::EmptyTextPolicy;
pub use model::{
    AvailableOptions, ComplianceCheck, ComplianceReport, ComplianceResult, ComplianceRule,
    Criticality, IssueBuckets,
};
pub use scoring::{ScoringPolicy, SeverityWeights};
