/// Catalog reload service.
///
/// Re-reads the configured rules directory and rebuilds the engine when the file
/// contents changed. Runs at startup and on demand via the `reload_catalog` MCP tool.
/// A server running on the built-in catalog never reloads.
use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use crate::cache::ReportCache;
use crate::config::Config;
use crate::error::AppError;
use compliance_engine::catalog::{digest_sources, read_rule_sources};
use compliance_engine::{ComplianceEngine, EmptyTextPolicy, RuleCatalog, ScoringPolicy};

/// Result of a reload operation.
#[derive(Debug)]
pub struct UpdateResult {
    /// Whether a new engine was built (false if the files are unchanged).
    pub updated: bool,
    /// Digest of the catalog now being served.
    pub catalog_version: String,
    pub rule_set_count: usize,
    pub rule_count: usize,
}

impl UpdateResult {
    fn for_engine(engine: &ComplianceEngine, updated: bool) -> Self {
        let catalog = engine.catalog();
        Self {
            updated,
            catalog_version: catalog.digest().to_string(),
            rule_set_count: catalog.rule_sets().len(),
            rule_count: catalog.rule_count(),
        }
    }
}

pub struct CatalogUpdater {
    rules_dir: Option<PathBuf>,
    scoring: ScoringPolicy,
    empty_text: EmptyTextPolicy,
    cache: Arc<ReportCache>,
}

impl CatalogUpdater {
    pub fn new(config: &Config, cache: Arc<ReportCache>) -> Self {
        Self {
            rules_dir: config.rules_dir(),
            scoring: config.scoring.clone(),
            empty_text: config.empty_text.clone(),
            cache,
        }
    }

    /// Build the engine the server starts with.
    pub fn load(&self) -> Result<ComplianceEngine, AppError> {
        let catalog = match &self.rules_dir {
            Some(dir) => {
                info!(dir = %dir.display(), "loading rule catalog from directory");
                RuleCatalog::load_dir(dir)?
            }
            None => {
                info!("loading built-in rule catalog");
                RuleCatalog::builtin()?
            }
        };
        self.build_engine(catalog)
    }

    /// Rebuild the engine if the rule files differ from what `current` was built from.
    ///
    /// The new engine is returned to the caller for swapping in; `current` is never
    /// touched, so in-flight evaluations keep a consistent catalog. On any load error
    /// the caller keeps serving the old engine.
    pub async fn update(
        &self,
        current: &ComplianceEngine,
    ) -> Result<(UpdateResult, Option<ComplianceEngine>), AppError> {
        let Some(dir) = &self.rules_dir else {
            info!("serving built-in catalog, nothing to reload");
            return Ok((UpdateResult::for_engine(current, false), None));
        };

        let sources = read_rule_sources(dir)?;
        if digest_sources(&sources) == current.catalog().digest() {
            info!(digest = %current.catalog().digest(), "rule files unchanged, skipping reload");
            return Ok((UpdateResult::for_engine(current, false), None));
        }

        let engine = self.build_engine(RuleCatalog::from_sources(sources)?)?;
        self.cache.invalidate_all().await;

        let result = UpdateResult::for_engine(&engine, true);
        info!(
            digest = %result.catalog_version,
            rule_sets = result.rule_set_count,
            rules = result.rule_count,
            "rule catalog reloaded"
        );
        Ok((result, Some(engine)))
    }

    fn build_engine(&self, catalog: RuleCatalog) -> Result<ComplianceEngine, AppError> {
        Ok(ComplianceEngine::new(
            catalog,
            self.scoring.clone(),
            self.empty_text.clone(),
        )?)
    }
}
