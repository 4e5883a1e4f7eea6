/// Redis caching layer for compliance reports.
///
/// All operations return `Option<T>` for graceful degradation. If Redis is unavailable,
/// callers fall through to evaluating the label.
///
/// Key schema:
/// - `lcc:v1:report:{sha256(fingerprint|category|jurisdiction|text)}`: JSON-serialized
///   ComplianceReport (TTL from config)
///
/// The engine fingerprint is part of every key, so reports computed against an older
/// catalog or policy are never served after a reload.
use sha2::{Digest, Sha256};
use tracing::warn;

use compliance_engine::ComplianceReport;
use mcp_common::redis::RedisCache;

const KEY_PREFIX: &str = "lcc:v1:";

pub struct ReportCache {
    redis: RedisCache,
    ttl_secs: u64,
}

impl ReportCache {
    pub fn new(redis: RedisCache, ttl_secs: u64) -> Self {
        Self { redis, ttl_secs }
    }

    pub async fn get_report(
        &self,
        fingerprint: &str,
        category: &str,
        jurisdiction: &str,
        text: &str,
    ) -> Option<ComplianceReport> {
        let key = report_key(fingerprint, category, jurisdiction, text);
        let json = self.redis.get(&key).await?;
        serde_json::from_str(&json)
            .inspect_err(|e| warn!(error = %e, key, "cache deserialization failed"))
            .ok()
    }

    pub async fn set_report(
        &self,
        fingerprint: &str,
        category: &str,
        jurisdiction: &str,
        text: &str,
        report: &ComplianceReport,
    ) {
        let key = report_key(fingerprint, category, jurisdiction, text);
        if let Ok(json) = serde_json::to_string(report) {
            self.redis.set_with_ttl(&key, &json, self.ttl_secs).await;
        }
    }

    /// Delete all cached reports. Used after a catalog reload.
    pub async fn invalidate_all(&self) {
        self.redis.delete_by_prefix(KEY_PREFIX).await;
    }
}

/// Deterministic cache key for one evaluation. Category and jurisdiction are
/// normalized the same way catalog lookup normalizes them.
fn report_key(fingerprint: &str, category: &str, jurisdiction: &str, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(fingerprint.as_bytes());
    hasher.update(b"|");
    hasher.update(category.trim().to_lowercase().as_bytes());
    hasher.update(b"|");
    hasher.update(jurisdiction.trim().to_lowercase().as_bytes());
    hasher.update(b"|");
    hasher.update(text.as_bytes());
    let hash = hasher.finalize();
    format!("{KEY_PREFIX}report:{:x}", hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_namespaced_and_normalized() {
        let a = report_key("fp", "Toys", "USA", "Made in China");
        let b = report_key("fp", " toys ", "usa", "Made in China");
        assert!(a.starts_with("lcc:v1:report:"));
        assert_eq!(a, b);
    }

    #[test]
    fn keys_change_with_fingerprint_and_text() {
        let base = report_key("fp1", "Toys", "USA", "text");
        assert_ne!(base, report_key("fp2", "Toys", "USA", "text"));
        assert_ne!(base, report_key("fp1", "Toys", "USA", "Text"));
        assert_ne!(base, report_key("fp1", "Toys", "UK", "text"));
    }

    #[tokio::test]
    async fn disabled_redis_is_always_a_miss() {
        let cache = ReportCache::new(RedisCache::disabled(), 60);
        let report = compliance_engine::report::assemble(&[], 0.0);
        cache.set_report("fp", "Toys", "USA", "", &report).await;
        assert!(cache.get_report("fp", "Toys", "USA", "").await.is_none());
        cache.invalidate_all().await;
    }
}
