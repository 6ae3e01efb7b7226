//! Query transformation and input screening.
//!
//! [`QueryProcessor::transform`] rewrites a question into the form that gets
//! embedded into vocabulary space: filler phrases stripped, known acronyms
//! expanded. [`QueryProcessor::refusal_reason`] screens for PII and
//! sensitive-content requests before any retrieval happens; a positive
//! match forces a refusal regardless of the detected intent.

use regex::Regex;

/// Filler phrases that carry no retrieval signal.
const FILLER_PHRASES: &[&str] = &["what is", "what are", "can you", "please", "tell me"];

/// Acronyms expanded on word boundaries before retrieval.
const ACRONYM_EXPANSIONS: &[(&str, &str)] = &[
    ("ai", "artificial intelligence"),
    ("ml", "machine learning"),
    ("dl", "deep learning"),
    ("api", "application programming interface"),
    ("ui", "user interface"),
    ("ux", "user experience"),
];

const PII_PATTERNS: &[(&str, &str)] = &[
    ("EMAIL", r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b"),
    ("PHONE", r"\b\d{3}[-.]?\d{3}[-.]?\d{4}\b"),
    ("SSN", r"\b\d{3}-?\d{2}-?\d{4}\b"),
    ("CREDIT CARD", r"\b\d{4}[-\s]?\d{4}[-\s]?\d{4}[-\s]?\d{4}\b"),
];

const MEDICAL_KEYWORDS: &[&str] = &[
    "diagnosis",
    "treatment",
    "symptoms",
    "medication",
    "doctor",
    "patient",
];

const LEGAL_KEYWORDS: &[&str] = &["legal advice", "attorney", "lawyer", "lawsuit", "court"];

const SENSITIVE_PATTERNS: &[&str] = &[
    r"\b(personal|private|confidential)\b",
    r"\b(password|secret|security)\b",
];

pub struct QueryProcessor {
    acronyms: Vec<(Regex, &'static str)>,
    pii: Vec<(&'static str, Regex)>,
    sensitive: Vec<Regex>,
}

impl Default for QueryProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryProcessor {
    pub fn new() -> Self {
        let acronyms = ACRONYM_EXPANSIONS
            .iter()
            .map(|(acronym, expansion)| {
                let pattern = format!(r"\b{acronym}\b");
                (
                    Regex::new(&pattern).expect("acronym pattern must compile"),
                    *expansion,
                )
            })
            .collect();

        let pii = PII_PATTERNS
            .iter()
            .map(|(kind, pattern)| {
                (*kind, Regex::new(pattern).expect("pii pattern must compile"))
            })
            .collect();

        let sensitive = SENSITIVE_PATTERNS
            .iter()
            .map(|pattern| Regex::new(pattern).expect("sensitive pattern must compile"))
            .collect();

        Self {
            acronyms,
            pii,
            sensitive,
        }
    }

    /// Rewrite a question for retrieval. Falls back to the raw query when
    /// stripping fillers leaves nothing searchable.
    pub fn transform(&self, query: &str) -> String {
        let mut transformed = query.to_lowercase();

        for filler in FILLER_PHRASES {
            transformed = transformed.replace(filler, " ");
        }

        for (pattern, expansion) in &self.acronyms {
            transformed = pattern.replace_all(&transformed, *expansion).into_owned();
        }

        let transformed = transformed.split_whitespace().collect::<Vec<_>>().join(" ");

        if transformed.len() < 3 {
            query.to_string()
        } else {
            transformed
        }
    }

    /// Screen a query for PII and sensitive-content requests.
    ///
    /// Returns the refusal reason for the first match, or `None` when the
    /// query is safe to process.
    pub fn refusal_reason(&self, query: &str) -> Option<String> {
        for (kind, pattern) in &self.pii {
            if pattern.is_match(query) {
                return Some(format!("Query contains potential {kind} information"));
            }
        }

        let lowered = query.to_lowercase();

        for keyword in MEDICAL_KEYWORDS {
            if lowered.contains(keyword) {
                return Some(
                    "Query appears to request medical advice, which I cannot provide".to_string(),
                );
            }
        }

        for keyword in LEGAL_KEYWORDS {
            if lowered.contains(keyword) {
                return Some(
                    "Query appears to request legal advice, which I cannot provide".to_string(),
                );
            }
        }

        for pattern in &self.sensitive {
            if pattern.is_match(&lowered) {
                return Some("Query contains potentially sensitive information".to_string());
            }
        }

        None
    }
}
