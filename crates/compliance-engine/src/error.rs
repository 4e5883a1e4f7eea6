/// Errors raised while loading a rule catalog or building a scoring policy.
///
/// Evaluation itself is infallible: every variant here surfaces at load or
/// configuration time so that a broken rule file never degrades silently into
/// "no rules apply".
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("failed to read rule source {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid rule file {file}: {source}")]
    Parse {
        file: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid rule '{element}' in {file}: {message}")]
    InvalidRule {
        file: String,
        element: String,
        message: String,
    },

    #[error("invalid pattern for rule '{element}' in {file}: {source}")]
    InvalidPattern {
        file: String,
        element: String,
        #[source]
        source: regex::Error,
    },

    #[error("duplicate rule set for {category}/{jurisdiction} in {file}")]
    DuplicateRuleSet {
        file: String,
        category: String,
        jurisdiction: String,
    },

    #[error("no rule files found in {0}")]
    NoRuleFiles(String),

    #[error("invalid scoring policy: {0}")]
    InvalidPolicy(String),
}
