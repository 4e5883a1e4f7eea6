/// Rule catalog: versioned rule sets keyed by (category, jurisdiction).
///
/// Rule files are JSON documents of the form
///
/// ```json
/// { "category": "Toys", "jurisdiction": "USA", "version": "2024.2",
///   "rules": [ { "element": "...", "details": "...", "location": "...",
///                "criticality": "High", "suggestion": "..." } ] }
/// ```
///
/// Loading validates every file and compiles each rule's detector up front.
/// Any malformed file aborts the whole load: a silently skipped rule set would
/// look exactly like "no rules apply".
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::Path;

use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::classifier::Detector;
use crate::error::EngineError;
use crate::model::ComplianceRule;

/// Rule files compiled into the library.
const BUILTIN_RULES: &[(&str, &str)] = &[
    ("baby-products.germany.json", include_str!("../data/rules/baby-products.germany.json")),
    ("baby-products.uk.json", include_str!("../data/rules/baby-products.uk.json")),
    ("baby-products.usa.json", include_str!("../data/rules/baby-products.usa.json")),
    ("cosmetics.germany.json", include_str!("../data/rules/cosmetics.germany.json")),
    ("cosmetics.uk.json", include_str!("../data/rules/cosmetics.uk.json")),
    ("cosmetics.usa.json", include_str!("../data/rules/cosmetics.usa.json")),
    ("electronics.germany.json", include_str!("../data/rules/electronics.germany.json")),
    ("electronics.uk.json", include_str!("../data/rules/electronics.uk.json")),
    ("electronics.usa.json", include_str!("../data/rules/electronics.usa.json")),
    ("toys.germany.json", include_str!("../data/rules/toys.germany.json")),
    ("toys.uk.json", include_str!("../data/rules/toys.uk.json")),
    ("toys.usa.json", include_str!("../data/rules/toys.usa.json")),
];

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RuleFile {
    category: String,
    jurisdiction: String,
    version: String,
    rules: Vec<ComplianceRule>,
}

/// A rule together with the detector resolved for it at load time.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    rule: ComplianceRule,
    detector: Detector,
}

impl CompiledRule {
    pub fn compile(rule: ComplianceRule) -> Result<Self, regex::Error> {
        let detector = Detector::for_rule(&rule)?;
        Ok(Self { rule, detector })
    }

    pub fn rule(&self) -> &ComplianceRule {
        &self.rule
    }

    pub fn detector(&self) -> &Detector {
        &self.detector
    }
}

/// All rules for one (category, jurisdiction) pair, in authoring order.
#[derive(Debug, Clone)]
pub struct RuleSet {
    pub category: String,
    pub jurisdiction: String,
    pub version: String,
    /// File the set was loaded from
    pub source: String,
    rules: Vec<CompiledRule>,
}

impl RuleSet {
    pub fn rules(&self) -> &[CompiledRule] {
        &self.rules
    }
}

/// Immutable, validated index of rule sets. Load once, share by reference.
#[derive(Debug, Clone)]
pub struct RuleCatalog {
    sets: HashMap<(String, String), RuleSet>,
    categories: BTreeSet<String>,
    jurisdictions: BTreeSet<String>,
    digest: String,
}

impl RuleCatalog {
    /// The catalog shipped with the library.
    pub fn builtin() -> Result<Self, EngineError> {
        Self::from_sources(
            BUILTIN_RULES
                .iter()
                .map(|(name, content)| (name.to_string(), content.to_string())),
        )
    }

    /// Load every `*.json` file in `dir`, in file-name order.
    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Self, EngineError> {
        Self::from_sources(read_rule_sources(dir.as_ref())?)
    }

    /// Build a catalog from `(file name, JSON content)` pairs.
    pub fn from_sources<I>(sources: I) -> Result<Self, EngineError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut sources: Vec<(String, String)> = sources.into_iter().collect();
        sources.sort_by(|a, b| a.0.cmp(&b.0));

        let digest = digest_sources(&sources);
        let mut sets = HashMap::new();
        let mut categories = BTreeSet::new();
        let mut jurisdictions = BTreeSet::new();

        for (file, content) in &sources {
            let set = parse_rule_file(file, content)?;
            let key = catalog_key(&set.category, &set.jurisdiction);
            if sets.contains_key(&key) {
                return Err(EngineError::DuplicateRuleSet {
                    file: file.clone(),
                    category: set.category,
                    jurisdiction: set.jurisdiction,
                });
            }
            debug!(
                file = %file,
                category = %set.category,
                jurisdiction = %set.jurisdiction,
                rules = set.rules.len(),
                "loaded rule set"
            );
            categories.insert(set.category.clone());
            jurisdictions.insert(set.jurisdiction.clone());
            sets.insert(key, set);
        }

        let catalog = Self {
            sets,
            categories,
            jurisdictions,
            digest,
        };
        info!(
            rule_sets = catalog.sets.len(),
            rules = catalog.rule_count(),
            digest = %catalog.digest,
            "rule catalog loaded"
        );
        Ok(catalog)
    }

    /// Rules for the pair, in authoring order. Unknown pairs yield an empty
    /// slice: "no rules apply" is a valid, indeterminate outcome.
    pub fn lookup(&self, category: &str, jurisdiction: &str) -> &[CompiledRule] {
        self.rule_set(category, jurisdiction)
            .map(RuleSet::rules)
            .unwrap_or(&[])
    }

    /// Case-insensitive lookup of a whole rule set.
    pub fn rule_set(&self, category: &str, jurisdiction: &str) -> Option<&RuleSet> {
        self.sets.get(&catalog_key(category, jurisdiction))
    }

    /// Rule sets sorted by category, then jurisdiction.
    pub fn rule_sets(&self) -> Vec<&RuleSet> {
        let mut sets: Vec<&RuleSet> = self.sets.values().collect();
        sets.sort_by(|a, b| {
            (a.category.as_str(), a.jurisdiction.as_str())
                .cmp(&(b.category.as_str(), b.jurisdiction.as_str()))
        });
        sets
    }

    pub fn available_categories(&self) -> &BTreeSet<String> {
        &self.categories
    }

    pub fn available_jurisdictions(&self) -> &BTreeSet<String> {
        &self.jurisdictions
    }

    pub fn rule_count(&self) -> usize {
        self.sets.values().map(|s| s.rules.len()).sum()
    }

    /// SHA-256 over the ordered rule sources; changes whenever any file does.
    pub fn digest(&self) -> &str {
        &self.digest
    }
}

/// Read `(file name, content)` pairs for every `*.json` file in `dir`.
pub fn read_rule_sources(dir: &Path) -> Result<Vec<(String, String)>, EngineError> {
    let io_err = |path: &Path, source: std::io::Error| EngineError::Io {
        path: path.display().to_string(),
        source,
    };

    let mut sources = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(|e| io_err(dir, e))? {
        let path = entry.map_err(|e| io_err(dir, e))?.path();
        if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let content = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        sources.push((name, content));
    }

    if sources.is_empty() {
        return Err(EngineError::NoRuleFiles(dir.display().to_string()));
    }
    sources.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(sources)
}

/// Digest of ordered sources, matching `RuleCatalog::digest` for the same input.
pub fn digest_sources(sources: &[(String, String)]) -> String {
    let mut hasher = Sha256::new();
    for (name, content) in sources {
        hasher.update(name.as_bytes());
        hasher.update(b"\0");
        hasher.update(content.as_bytes());
        hasher.update(b"\0");
    }
    format!("{:x}", hasher.finalize())
}

fn catalog_key(category: &str, jurisdiction: &str) -> (String, String) {
    (
        category.trim().to_lowercase(),
        jurisdiction.trim().to_lowercase(),
    )
}

fn parse_rule_file(file: &str, content: &str) -> Result<RuleSet, EngineError> {
    let parsed: RuleFile = serde_json::from_str(content).map_err(|source| EngineError::Parse {
        file: file.to_string(),
        source,
    })?;

    let invalid = |element: &str, message: &str| EngineError::InvalidRule {
        file: file.to_string(),
        element: element.to_string(),
        message: message.to_string(),
    };

    let category = parsed.category.trim().to_string();
    let jurisdiction = parsed.jurisdiction.trim().to_string();
    if category.is_empty() || jurisdiction.is_empty() {
        return Err(invalid("-", "category and jurisdiction must not be empty"));
    }

    let mut elements = HashSet::new();
    let mut rules = Vec::with_capacity(parsed.rules.len());
    for rule in parsed.rules {
        if rule.element.trim().is_empty() {
            return Err(invalid(&rule.element, "element must not be empty"));
        }
        if rule.details.trim().is_empty() {
            return Err(invalid(&rule.element, "details must not be empty"));
        }
        if rule.suggestion.trim().is_empty() {
            return Err(invalid(&rule.element, "suggestion must not be empty"));
        }
        if !elements.insert(rule.element.trim().to_lowercase()) {
            return Err(invalid(&rule.element, "duplicate element in rule set"));
        }

        let element = rule.element.clone();
        let compiled = CompiledRule::compile(rule).map_err(|source| EngineError::InvalidPattern {
            file: file.to_string(),
            element,
            source,
        })?;
        rules.push(compiled);
    }

    Ok(RuleSet {
        category,
        jurisdiction,
        version: parsed.version,
        source: file.to_string(),
        rules,
    })
}
