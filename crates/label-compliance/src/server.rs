/// MCP server implementation for label compliance checks.
///
/// Exposes six tools:
/// - `check_compliance`: Evaluate label text against a rule set
/// - `generate_report`: Assemble a prioritized report from prior results
/// - `check_label`: Check and report in one call (Redis-cached)
/// - `get_available_options`: List known categories and jurisdictions
/// - `list_rules`: Show the rules of one rule set
/// - `reload_catalog`: Re-read the rules directory
use std::sync::Arc;

use rmcp::{
    Json, ServerHandler,
    handler::server::router::tool::ToolRouter,
    handler::server::wrapper::Parameters,
    model::*,
    tool, tool_handler, tool_router,
};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::cache::ReportCache;
use crate::update::CatalogUpdater;
use compliance_engine::{ComplianceEngine, ComplianceReport, ComplianceResult, Criticality};
use mcp_common::mcp_api::{
    AvailableOptionsResponse, CheckComplianceParams, CheckComplianceResponse,
    ComplianceReportResponse, GenerateReportParams, ListRulesParams, ListRulesResponse,
    ReloadCatalogResponse, RuleResult, RuleSummary,
};

// --- MCP Server ---

/// Shared application state. Evaluations hold a read guard; a reload swaps the
/// engine under a short write guard.
pub struct AppState {
    pub engine: ComplianceEngine,
}

#[derive(Clone)]
pub struct LabelComplianceServer {
    state: Arc<RwLock<AppState>>,
    updater: Arc<CatalogUpdater>,
    cache: Arc<ReportCache>,
    tool_router: ToolRouter<LabelComplianceServer>,
}

impl LabelComplianceServer {
    pub fn new(
        engine: ComplianceEngine,
        cache: Arc<ReportCache>,
        updater: Arc<CatalogUpdater>,
    ) -> Self {
        Self {
            state: Arc::new(RwLock::new(AppState { engine })),
            updater,
            cache,
            tool_router: Self::tool_router(),
        }
    }
}

#[tool_router]
impl LabelComplianceServer {
    #[tool(description = "Check product label text against the labeling rules for a category and jurisdiction. Returns per-rule results and a 0-100 compliance score. Empty text is allowed.")]
    async fn check_compliance(
        &self,
        Parameters(params): Parameters<CheckComplianceParams>,
    ) -> Result<Json<CheckComplianceResponse>, String> {
        let (category, jurisdiction) = require_pair(&params.category, &params.jurisdiction)?;

        let state = self.state.read().await;
        let check = state
            .engine
            .perform_compliance_check(&params.text, category, jurisdiction);

        Ok(Json(CheckComplianceResponse {
            total_rules: check.total_rules(),
            indeterminate: check.is_indeterminate(),
            results: check.results.iter().map(to_api_result).collect(),
            score: check.score,
            catalog_version: state.engine.catalog().digest().to_string(),
        }))
    }

    #[tool(description = "Build a prioritized compliance report (critical, warning, recommendation) from results and a score previously returned by check_compliance.")]
    async fn generate_report(
        &self,
        Parameters(params): Parameters<GenerateReportParams>,
    ) -> Result<Json<ComplianceReportResponse>, String> {
        if !params.score.is_finite() || !(0.0..=100.0).contains(&params.score) {
            return Err(format!("score must be between 0 and 100, got {}", params.score));
        }

        let results = params
            .results
            .into_iter()
            .map(from_api_result)
            .collect::<Result<Vec<_>, _>>()?;

        let state = self.state.read().await;
        let report = state.engine.generate_report(&results, params.score);
        Ok(Json(to_api_report(report)))
    }

    #[tool(description = "Check product label text and return the full prioritized report in one call. Reports are cached per catalog version.")]
    async fn check_label(
        &self,
        Parameters(params): Parameters<CheckComplianceParams>,
    ) -> Result<Json<ComplianceReportResponse>, String> {
        let (category, jurisdiction) = require_pair(&params.category, &params.jurisdiction)?;

        let state = self.state.read().await;
        let fingerprint = state.engine.fingerprint();

        if let Some(cached) = self
            .cache
            .get_report(&fingerprint, category, jurisdiction, &params.text)
            .await
        {
            debug!(category, jurisdiction, "report cache hit");
            return Ok(Json(to_api_report(cached)));
        }

        let report = state.engine.check_label(&params.text, category, jurisdiction);
        drop(state);

        self.cache
            .set_report(&fingerprint, category, jurisdiction, &params.text, &report)
            .await;
        Ok(Json(to_api_report(report)))
    }

    #[tool(description = "List the product categories and jurisdictions that have labeling rules.")]
    async fn get_available_options(&self) -> Result<Json<AvailableOptionsResponse>, String> {
        let state = self.state.read().await;
        let options = state.engine.available_options();
        Ok(Json(AvailableOptionsResponse {
            categories: options.categories,
            jurisdictions: options.jurisdictions,
        }))
    }

    #[tool(description = "List the labeling rules for a category and jurisdiction, including how each rule is detected.")]
    async fn list_rules(
        &self,
        Parameters(params): Parameters<ListRulesParams>,
    ) -> Result<Json<ListRulesResponse>, String> {
        let (category, jurisdiction) = require_pair(&params.category, &params.jurisdiction)?;

        let state = self.state.read().await;
        let catalog = state.engine.catalog();
        let rule_set = catalog.rule_set(category, jurisdiction).ok_or_else(|| {
            let options = state.engine.available_options();
            format!(
                "no rules for '{category}' in '{jurisdiction}'. Available categories: {}. Available jurisdictions: {}",
                options.categories.join(", "),
                options.jurisdictions.join(", ")
            )
        })?;

        let rules = rule_set
            .rules()
            .iter()
            .map(|compiled| {
                let rule = compiled.rule();
                RuleSummary {
                    element: rule.element.clone(),
                    details: rule.details.clone(),
                    location: rule.location.clone(),
                    criticality: rule.criticality.to_string(),
                    suggestion: rule.suggestion.clone(),
                    match_family: compiled.detector().label().to_string(),
                }
            })
            .collect();

        Ok(Json(ListRulesResponse {
            category: rule_set.category.clone(),
            jurisdiction: rule_set.jurisdiction.clone(),
            version: rule_set.version.clone(),
            rules,
        }))
    }

    #[tool(description = "Re-read the rule files from LABEL_RULES_PATH. Rebuilds the catalog only if the files changed; on error the current catalog stays in service.")]
    async fn reload_catalog(&self) -> Result<Json<ReloadCatalogResponse>, String> {
        info!("reload_catalog tool invoked");

        let (result, new_engine) = {
            let state = self.state.read().await;
            self.updater
                .update(&state.engine)
                .await
                .map_err(|e| format!("reload failed: {e}"))?
        };

        if let Some(engine) = new_engine {
            let mut state = self.state.write().await;
            state.engine = engine;
            info!(digest = %result.catalog_version, "in-memory catalog swapped");
        }

        Ok(Json(ReloadCatalogResponse {
            reloaded: result.updated,
            catalog_version: result.catalog_version,
            rule_set_count: result.rule_set_count,
            rule_count: result.rule_count,
        }))
    }
}

fn require_pair<'a>(category: &'a str, jurisdiction: &'a str) -> Result<(&'a str, &'a str), String> {
    let category = category.trim();
    let jurisdiction = jurisdiction.trim();
    if category.is_empty() {
        return Err("category must not be empty".to_string());
    }
    if jurisdiction.is_empty() {
        return Err("jurisdiction must not be empty".to_string());
    }
    Ok((category, jurisdiction))
}

fn to_api_result(result: &ComplianceResult) -> RuleResult {
    RuleResult {
        element: result.element.clone(),
        criticality: result.criticality.to_string(),
        compliant: result.compliant,
        suggestion: result.suggestion.clone(),
        matched_text: result.matched_text.clone(),
    }
}

fn from_api_result(result: RuleResult) -> Result<ComplianceResult, String> {
    let criticality: Criticality = result
        .criticality
        .parse()
        .map_err(|e| format!("result '{}': {e}", result.element))?;
    Ok(ComplianceResult {
        element: result.element,
        criticality,
        compliant: result.compliant,
        suggestion: result.suggestion,
        matched_text: result.matched_text,
    })
}

fn to_api_report(report: ComplianceReport) -> ComplianceReportResponse {
    let bucket = |items: &[ComplianceResult]| -> Vec<RuleResult> {
        items.iter().map(to_api_result).collect()
    };
    ComplianceReportResponse {
        score: report.score,
        total_rules: report.total_rules,
        passed_rules: report.passed_rules,
        failed_rules: report.failed_rules,
        indeterminate: report.indeterminate,
        critical: bucket(&report.issues.critical),
        warning: bucket(&report.issues.warning),
        recommendation: bucket(&report.issues.recommendation),
        suggestions: report.suggestions,
    }
}

#[tool_handler]
impl ServerHandler for LabelComplianceServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_06_18,
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .build(),
            server_info: Implementation {
                name: "label-compliance".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                title: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Product label compliance MCP server. Checks label text against \
                 per-category, per-jurisdiction labeling rules and scores it from 0 \
                 to 100. Use get_available_options to discover rule sets, \
                 check_compliance or check_label to evaluate a label, generate_report \
                 to prioritize issues, list_rules to inspect a rule set, and \
                 reload_catalog after editing rule files."
                    .to_string(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use compliance_engine::{EmptyTextPolicy, ScoringPolicy};
    use mcp_common::redis::RedisCache;

    fn server() -> LabelComplianceServer {
        let config = Config {
            redis_url: None,
            rules_path: None,
            report_cache_ttl_secs: 60,
            scoring: ScoringPolicy::default(),
            empty_text: EmptyTextPolicy::default(),
        };
        let cache = Arc::new(ReportCache::new(RedisCache::disabled(), 60));
        let updater = Arc::new(CatalogUpdater::new(&config, Arc::clone(&cache)));
        let engine = updater.load().unwrap();
        LabelComplianceServer::new(engine, cache, updater)
    }

    fn params(text: &str, category: &str, jurisdiction: &str) -> CheckComplianceParams {
        CheckComplianceParams {
            text: text.to_string(),
            category: category.to_string(),
            jurisdiction: jurisdiction.to_string(),
        }
    }

    #[test]
    fn tools_publish_output_schemas() {
        let tools = LabelComplianceServer::tool_router().list_all();
        for name in [
            "check_compliance",
            "generate_report",
            "check_label",
            "get_available_options",
            "list_rules",
            "reload_catalog",
        ] {
            let tool = tools
                .iter()
                .find(|t| t.name == name)
                .unwrap_or_else(|| panic!("missing tool: {name}"));
            assert!(
                tool.output_schema.is_some(),
                "tool {name} should publish output_schema"
            );
        }
    }

    #[tokio::test]
    async fn check_then_report_matches_check_label() {
        let server = server();
        let text = "WARNING: CHOKING HAZARD - Small parts. Not for children under 3 yrs.";

        let Json(check) = server
            .check_compliance(Parameters(params(text, "Toys", "USA")))
            .await
            .unwrap();
        assert!(!check.indeterminate);
        assert_eq!(check.total_rules, check.results.len());

        let Json(report) = server
            .generate_report(Parameters(GenerateReportParams {
                results: check.results.clone(),
                score: check.score,
            }))
            .await
            .unwrap();
        let Json(direct) = server
            .check_label(Parameters(params(text, "toys", "usa")))
            .await
            .unwrap();

        assert_eq!(report.score, direct.score);
        assert_eq!(report.failed_rules, direct.failed_rules);
        assert_eq!(report.suggestions, direct.suggestions);
        assert_eq!(report.passed_rules + report.failed_rules, report.total_rules);
    }

    #[tokio::test]
    async fn argument_errors_are_tool_errors() {
        let server = server();
        assert!(server
            .check_compliance(Parameters(params("", "  ", "USA")))
            .await
            .is_err());
        assert!(server
            .generate_report(Parameters(GenerateReportParams {
                results: Vec::new(),
                score: 120.0,
            }))
            .await
            .is_err());
        assert!(server
            .generate_report(Parameters(GenerateReportParams {
                results: vec![RuleResult {
                    element: "Age grading".to_string(),
                    criticality: "Severe".to_string(),
                    compliant: false,
                    suggestion: None,
                    matched_text: None,
                }],
                score: 50.0,
            }))
            .await
            .is_err());
        assert!(server
            .list_rules(Parameters(ListRulesParams {
                category: "Toys".to_string(),
                jurisdiction: "Mars".to_string(),
            }))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn unknown_pair_is_indeterminate_not_an_error() {
        let server = server();
        let Json(check) = server
            .check_compliance(Parameters(params("Made in China", "Cosmetics", "Mars")))
            .await
            .unwrap();
        assert!(check.indeterminate);
        assert_eq!(check.total_rules, 0);
        assert_eq!(check.score, 0.0);
    }

    #[tokio::test]
    async fn list_rules_and_options_describe_the_catalog() {
        let server = server();
        let Json(options) = server.get_available_options().await.unwrap();
        assert!(options.categories.contains(&"Toys".to_string()));
        assert!(options.jurisdictions.contains(&"USA".to_string()));

        let Json(listing) = server
            .list_rules(Parameters(ListRulesParams {
                category: "toys".to_string(),
                jurisdiction: "usa".to_string(),
            }))
            .await
            .unwrap();
        assert_eq!(listing.category, "Toys");
        assert_eq!(listing.rules.len(), 7);
        assert_eq!(listing.rules[0].match_family, "hazard_warning");
    }

    #[tokio::test]
    async fn reload_on_builtin_catalog_is_a_no_op() {
        let server = server();
        let Json(before) = server
            .check_compliance(Parameters(params("", "Toys", "USA")))
            .await
            .unwrap();
        let Json(reload) = server.reload_catalog().await.unwrap();
        assert!(!reload.reloaded);
        assert_eq!(reload.catalog_version, before.catalog_version);
        assert_eq!(reload.rule_set_count, 12);
    }
}
