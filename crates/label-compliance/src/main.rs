mod cache;
mod config;
mod error;
mod server;
mod update;

use std::sync::Arc;

use rmcp::{ServiceExt, transport::stdio};
use tracing::info;
use tracing_subscriber::EnvFilter;

use cache::ReportCache;
use config::Config;
use server::LabelComplianceServer;
use update::CatalogUpdater;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout is reserved for MCP JSON-RPC
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    info!("starting label-compliance MCP server");

    // 1. Load config from environment
    let config = Config::from_env()?;
    info!(
        rules_path = config.rules_path.as_deref().unwrap_or("<built-in>"),
        redis = config.redis_url.is_some(),
        report_cache_ttl_secs = config.report_cache_ttl_secs,
        "configuration loaded"
    );

    // 2. Connect to Redis (optional, reports are recomputed without it)
    let redis_cache = mcp_common::redis::RedisCache::new(config.redis_url.as_deref());
    if redis_cache.is_available().await {
        info!("redis connected");
    } else {
        info!("redis unavailable, running without cache");
    }
    let cache = Arc::new(ReportCache::new(redis_cache, config.report_cache_ttl_secs));

    // 3. Load and validate the rule catalog; a bad rule file is fatal at startup
    let updater = Arc::new(CatalogUpdater::new(&config, Arc::clone(&cache)));
    let engine = updater.load()?;
    info!(
        rule_sets = engine.catalog().rule_sets().len(),
        rules = engine.catalog().rule_count(),
        digest = %engine.catalog().digest(),
        "compliance engine ready"
    );

    // 4. Build MCP server and serve on stdio
    let server = LabelComplianceServer::new(engine, cache, updater);

    info!("MCP server ready, serving on stdio");
    let service = server.serve(stdio()).await.inspect_err(|e| {
        tracing::error!(error = %e, "MCP server error");
    })?;

    service.waiting().await?;
    info!("MCP server shut down");
    Ok(())
}
