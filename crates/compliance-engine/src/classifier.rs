/// Pattern classifier for label rules.
///
/// Every rule is bound to a `Detector` once, when the catalog is loaded:
/// - an explicit `match_family` tag on the rule wins,
/// - otherwise the element name is classified by keyword dispatch,
/// - rule-level `patterns` replace the family predicates entirely.
///
/// A pattern family is an ordered list of case-insensitive regexes. The first
/// predicate that matches decides compliance and supplies the matched excerpt.
/// Rules that fall outside every family use keyword overlap against the rule's
/// `details`, which is permissive and produces false positives on text that
/// merely shares vocabulary with the requirement.
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::model::ComplianceRule;

/// Minimum word length (exclusive) for keyword-overlap tokens.
const MIN_TOKEN_LEN: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchFamily {
    HazardWarning,
    Manufacturer,
    Marking,
    Ingredients,
    BatchNumber,
    Quantity,
    Identity,
    KeywordOverlap,
}

impl MatchFamily {
    pub const ALL: [MatchFamily; 8] = [
        MatchFamily::HazardWarning,
        MatchFamily::Manufacturer,
        MatchFamily::Marking,
        MatchFamily::Ingredients,
        MatchFamily::BatchNumber,
        MatchFamily::Quantity,
        MatchFamily::Identity,
        MatchFamily::KeywordOverlap,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MatchFamily::HazardWarning => "hazard_warning",
            MatchFamily::Manufacturer => "manufacturer",
            MatchFamily::Marking => "marking",
            MatchFamily::Ingredients => "ingredients",
            MatchFamily::BatchNumber => "batch_number",
            MatchFamily::Quantity => "quantity",
            MatchFamily::Identity => "identity",
            MatchFamily::KeywordOverlap => "keyword_overlap",
        }
    }

    /// Select a family from a rule's element name. The first hit wins, so the
    /// order of the checks below is part of the contract.
    pub fn classify(element: &str) -> MatchFamily {
        let lowered = element.to_lowercase();
        let words: Vec<&str> = lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();
        let contains_any = |needles: &[&str]| needles.iter().any(|n| lowered.contains(n));
        let has_word = |needles: &[&str]| words.iter().any(|w| needles.contains(w));

        if contains_any(&["choking", "warning"]) {
            MatchFamily::HazardWarning
        } else if contains_any(&[
            "producer",
            "identification",
            "manufacturer",
            "responsible person",
        ]) {
            MatchFamily::Manufacturer
        } else if has_word(&["ce", "ukca"]) {
            MatchFamily::Marking
        } else if contains_any(&["ingredient"]) {
            MatchFamily::Ingredients
        } else if contains_any(&["tracking", "batch", "serial"]) || has_word(&["lot"]) {
            MatchFamily::BatchNumber
        } else if contains_any(&["weight", "volume", "content", "quantity"]) {
            MatchFamily::Quantity
        } else if contains_any(&["display panel", "product identity"]) {
            MatchFamily::Identity
        } else {
            MatchFamily::KeywordOverlap
        }
    }

    /// Ordered predicates of the family. Empty for keyword overlap.
    pub fn predicates(self) -> &'static [Regex] {
        match self {
            MatchFamily::HazardWarning => &HAZARD_WARNING,
            MatchFamily::Manufacturer => &MANUFACTURER,
            MatchFamily::Marking => &MARKING,
            MatchFamily::Ingredients => &INGREDIENTS,
            MatchFamily::BatchNumber => &BATCH_NUMBER,
            MatchFamily::Quantity => &QUANTITY,
            MatchFamily::Identity => &IDENTITY,
            MatchFamily::KeywordOverlap => &[],
        }
    }
}

static HAZARD_WARNING: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile_family(&[
        r"(?i)warning\s*[:!\-–—]?\s*choking\s+hazard[^.\n]*",
        r"(?i)choking\s+hazard[^\n]*",
        r"(?i)small\s+parts?[^\n]*",
        r"(?i)not\s+(?:suitable\s+)?for\s+children\s+under\s+(?:3|three|36\s+months)[^\n]*",
        r"(?i)\b(?:achtung|warnhinweis|warnung)\b[^\n]*",
        r"(?i)\b(?:warning|caution|danger)\b[^\n]*",
    ])
});

static MANUFACTURER: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile_family(&[
        r"(?i)\b(?:manufactured|made|distributed|imported|produced)\s+(?:by|for)\b\s*:?\s*\S[^\n]*",
        r"(?i)\b(?:manufacturer|hersteller|producer|importer|importeur|responsible\s+person)\s*:\s*\S[^\n]*",
        r"(?i)\bWEEE[\w.\s\-]{0,25}?DE\s*\d{8}\b",
        r"(?i)\b[\w&.\-]+(?:\s+[\w&.\-]+){0,4}\s+(?:inc|llc|ltd|limited|gmbh|corp|corporation|plc|ag)\b\.?",
        r"(?i)\b\d{1,5}\s+[\w.\- ]{2,40}\b(?:street|st\.|avenue|ave\.|road|rd\.|boulevard|blvd\.|lane)",
        r"(?i)\b[\w\-]+(?:straße|strasse|str\.|weg|platz|allee)\s+\d{1,4}\w?\b",
    ])
});

static MARKING: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile_family(&[
        r"(?i)\bCE\b(?:\s*mark(?:ed|ing)?)?",
        r"(?i)\bUKCA\b",
        r"(?i)\bUKNI\b",
        r"(?i)\bconformit[eé]\s+europ[eé]enne\b",
    ])
});

static INGREDIENTS: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile_family(&[
        r"(?i)\bingredients?\s*[:/]\s*\S[^\n]*",
        r"(?i)\binhaltsstoffe\s*[:/]?\s*\S[^\n]*",
        r"(?i)\bINCI\b[^\n]*",
        r"(?i)\baqua\b\s*(?:\(water\)|/\s*water|/\s*eau)?\s*,[^\n]*",
    ])
});

// Identifiers must contain at least one digit.
static BATCH_NUMBER: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile_family(&[
        r"(?i)\b(?:batch|lot|charge|ch\.-?b\.)\s*(?:no\.?|nr\.?|number|code|#)?\s*[:.]?\s*\b[A-Z0-9\-/]*\d[A-Z0-9\-/]*\b",
        r"(?i)\b(?:serial|s/n|sn)\s*(?:no\.?|number|#)?\s*[:.]?\s*\b[A-Z0-9\-]*\d[A-Z0-9\-]*\b",
        r"(?i)\b(?:tracking|model|item|art\.?-?nr\.?|artikel-?nr\.?)\s*(?:no\.?|number|code|#)?\s*[:.]?\s*\b[A-Z0-9\-]*\d[A-Z0-9\-]*\b",
        r"(?i)\b(?:mfg\.?|manufactured|production|date\s+of\s+manufacture)\s*(?:date)?\s*[:.]?\s*\d{1,4}[./\-]\d{1,2}(?:[./\-]\d{1,4})?",
    ])
});

static QUANTITY: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile_family(&[
        r"(?i)\bnet\s*(?:wt\.?|weight|contents?|vol\.?|volume|quantity|qty\.?)\s*[:.]?\s*\d+(?:[.,]\d+)?\s*(?:g|kg|mg|oz|lb|lbs|ml|cl|l|fl\.?\s*oz)\b[^\n]*",
        r"(?i)\b(?:nenninhalt|inhalt|füllmenge)\s*:?\s*\d+(?:[.,]\d+)?\s*(?:g|kg|ml|cl|l)\b[^\n]*",
        r"(?i)\b\d+(?:[.,]\d+)?\s*(?:ml|cl|fl\.?\s*oz|oz|g|kg|lb|lbs)\b\s*℮?",
        r"℮",
    ])
});

static IDENTITY: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile_family(&[
        r"(?i)\b(?:product\s+name|product\s+identity|statement\s+of\s+identity|produktname|bezeichnung)\s*:\s*\S[^\n]*",
        r"(?i)\b(?:shampoo|conditioner|body\s+wash|lotion|moisturi[sz]er|cream|soap|serum|cleanser|sunscreen|lipstick|mascara|deodorant|toothpaste|baby\s+(?:bottle|wipes|food|oil)|pacifier|soother|teether|rattle|doll|puzzle|building\s+blocks|action\s+figure|plush|charger|power\s+adapter|headphones|earbuds|speaker|cable|toy)\b[^\n]*",
    ])
});

fn compile_family(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(p).expect("valid family pattern"))
        .collect()
}

/// Label text prepared once per evaluation: the raw string for pattern
/// matching and a lowercased copy for keyword overlap.
#[derive(Debug, Clone)]
pub struct LabelText<'a> {
    raw: &'a str,
    lowered: String,
}

impl<'a> LabelText<'a> {
    pub fn new(raw: &'a str) -> Self {
        Self {
            raw,
            lowered: raw.to_lowercase(),
        }
    }

    pub fn raw(&self) -> &str {
        self.raw
    }

    pub fn is_blank(&self) -> bool {
        self.raw.trim().is_empty()
    }
}

/// Outcome of running a detector against label text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    pub compliant: bool,
    pub matched_text: Option<String>,
}

/// Detection strategy bound to a single rule.
#[derive(Debug, Clone)]
pub enum Detector {
    /// One of the built-in pattern families (never `KeywordOverlap`)
    Family(MatchFamily),
    /// Rule-specific predicates
    Custom(Vec<Regex>),
    /// Fallback over the rule's details
    KeywordOverlap { tokens: Vec<String>, phrase: String },
}

impl Detector {
    /// Build the detector for a rule. Fails only on an invalid custom pattern.
    pub fn for_rule(rule: &ComplianceRule) -> Result<Self, regex::Error> {
        if !rule.patterns.is_empty() {
            let predicates = rule
                .patterns
                .iter()
                .map(|p| RegexBuilder::new(p).case_insensitive(true).build())
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(Detector::Custom(predicates));
        }

        let family = rule
            .match_family
            .unwrap_or_else(|| MatchFamily::classify(&rule.element));

        Ok(match family {
            MatchFamily::KeywordOverlap => keyword_overlap(&rule.details),
            family => Detector::Family(family),
        })
    }

    /// The family this detector runs, or `None` for rule-specific patterns.
    pub fn family(&self) -> Option<MatchFamily> {
        match self {
            Detector::Family(family) => Some(*family),
            Detector::Custom(_) => None,
            Detector::KeywordOverlap { .. } => Some(MatchFamily::KeywordOverlap),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Detector::Family(family) => family.as_str(),
            Detector::Custom(_) => "custom",
            Detector::KeywordOverlap { .. } => MatchFamily::KeywordOverlap.as_str(),
        }
    }

    pub fn detect(&self, text: &LabelText<'_>) -> Detection {
        match self {
            Detector::Family(family) => first_match(family.predicates(), text.raw),
            Detector::Custom(predicates) => first_match(predicates, text.raw),
            Detector::KeywordOverlap { tokens, phrase } => Detection {
                compliant: overlaps(tokens, phrase, &text.lowered),
                matched_text: None,
            },
        }
    }
}

fn keyword_overlap(details: &str) -> Detector {
    let phrase = details.trim().to_lowercase();
    let tokens = phrase
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() > MIN_TOKEN_LEN)
        .map(str::to_string)
        .collect();
    Detector::KeywordOverlap { tokens, phrase }
}

fn first_match(predicates: &[Regex], text: &str) -> Detection {
    match predicates.iter().find_map(|re| re.find(text)) {
        Some(m) => Detection {
            compliant: true,
            matched_text: Some(m.as_str().trim().to_string()),
        },
        None => Detection {
            compliant: false,
            matched_text: None,
        },
    }
}

/// At least half of the tokens appear in the text, or the whole phrase does.
fn overlaps(tokens: &[String], phrase: &str, lowered: &str) -> bool {
    if !phrase.is_empty() && lowered.contains(phrase) {
        return true;
    }
    if tokens.is_empty() {
        return false;
    }
    let found = tokens
        .iter()
        .filter(|t| lowered.contains(t.as_str()))
        .count();
    found * 2 >= tokens.len()
}
