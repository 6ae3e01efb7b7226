//! Intent classification for incoming queries.
//!
//! Pattern tables are checked in a fixed priority order; the first match
//! wins and anything unmatched defaults to [`Intent::Question`]. Only
//! questions reach retrieval and generation — every other intent is
//! answered from the canned response table, which keeps non-informational
//! turns away from the index and the rate-limited generation client.

use regex::Regex;

use crate::models::Intent;

const GREETING_PATTERNS: &[&str] = &[
    r"\b(hello|hi|hey|greetings|good morning|good afternoon|good evening)\b",
    r"\b(how are you|howdy|what's up)\b",
];

const THANKS_PATTERNS: &[&str] = &[
    r"\b(thank you|thanks|thx|appreciate it|grateful)\b",
    r"\b(that's helpful|good answer|well done)\b",
];

const COMMAND_PATTERNS: &[&str] = &[r"\b(help|what can you do|explain|describe|tell me about)\b"];

// Document management commands must be explicit, hence the anchors.
const DOCUMENT_COMMAND_PATTERNS: &[&str] = &[
    r"^\s*(upload|add|import|insert|include)\s+(more|another|additional|new)(\s+(document|file|pdf|doc))?\s*$",
    r"^\s*(clear|delete|remove|erase|wipe)\s+(all|everything|documents|files)\s*$",
    r"^\s*(clear|delete|remove|erase|wipe)\s+(the\s+)?(documents?|files?|pdfs?|docs?)(\s+i\s+have\s+uploaded)?\s*$",
    r"^\s*(show|display|list|view|see)\s+((my|all|the)\s+)?(files|documents|pdfs|docs)\s*$",
    r"^\s*(manage|organize|sort|arrange)\s+(documents|files|pdfs|docs)\s*$",
];

const SYSTEM_COMMAND_PATTERNS: &[&str] = &[
    r"\b(reset|restart|reboot|reload|refresh)\b",
    r"\b(clear|wipe|erase|delete)\s+(memory|cache|session|conversation|history)\b",
    r"\b(start\s+over|begin\s+again|new\s+session|fresh\s+start)\b",
    r"\b(forget|ignore|discard)\s+(previous|earlier|past)\b",
];

const UNCLEAR_PATTERNS: &[&str] = &[
    r"\?\?\?",
    r"\b(hmm|huh|um|uh|err|umm)\b",
    r"\b(i don't know|idk|not sure|confused|unclear)\b",
    r"\b(what do you mean|i don't understand|can you explain)\b",
    r"^\s*$",
    r"^\s*[^\w\s]*\s*$",
];

const OUT_OF_SCOPE_PATTERNS: &[&str] = &[
    r"\b(weather|temperature|forecast|rain|sunny)\b",
    r"\b(joke|funny|humor|laugh|entertain)\b",
    r"\b(calculate|math|addition|subtraction|multiplication|division)\b",
    r"\b(translate|spanish|french|german)\b",
    r"\b(news|politics|sports|celebrity|gossip)\b",
    r"\b(recipe|cooking|restaurant|menu)\b",
    r"\b(music|song|artist|album|playlist)\b",
];

/// Classifies raw queries into an [`Intent`] via ordered pattern tables.
pub struct IntentClassifier {
    rules: Vec<(Intent, Vec<Regex>)>,
}

impl Default for IntentClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl IntentClassifier {
    pub fn new() -> Self {
        // Priority order, highest first. Unclear and out-of-scope outrank
        // the conversational intents so garbage never reads as a greeting.
        let rules = vec![
            (Intent::Unclear, compile(UNCLEAR_PATTERNS)),
            (Intent::OutOfScope, compile(OUT_OF_SCOPE_PATTERNS)),
            (Intent::Greeting, compile(GREETING_PATTERNS)),
            (Intent::Thanks, compile(THANKS_PATTERNS)),
            (Intent::DocumentCommand, compile(DOCUMENT_COMMAND_PATTERNS)),
            (Intent::SystemCommand, compile(SYSTEM_COMMAND_PATTERNS)),
            (Intent::Command, compile(COMMAND_PATTERNS)),
        ];
        Self { rules }
    }

    /// Classify a raw query. Unmatched queries are questions.
    pub fn classify(&self, query: &str) -> Intent {
        let normalized = query.to_lowercase();
        let normalized = normalized.trim();

        for (intent, patterns) in &self.rules {
            if patterns.iter().any(|p| p.is_match(normalized)) {
                return *intent;
            }
        }

        Intent::Question
    }
}

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(p).expect("intent pattern must compile"))
        .collect()
}

/// Fixed response for a short-circuited intent.
///
/// `Unclear` and `OutOfScope` include guidance text rather than an answer.
pub fn canned_response(intent: Intent) -> &'static str {
    match intent {
        Intent::Greeting => {
            "Hello! I'm here to help you with questions about your documents. \
             Feel free to ask me anything!"
        }
        Intent::Thanks => {
            "You're welcome! I'm glad I could help. Let me know if you have \
             any other questions!"
        }
        Intent::Command => {
            "I understand you've given me a command. I'm designed to answer \
             questions about your documents. Could you please rephrase that \
             as a question?"
        }
        Intent::DocumentCommand => {
            "For document management, update the corpus directory and re-run \
             ingestion. I can help you analyze the content once it's indexed."
        }
        Intent::SystemCommand => {
            "I'll start fresh. Re-ingest your documents and I'll be ready to \
             help."
        }
        Intent::Unclear => {
            "I'm not sure what you're asking. Could you please rephrase your \
             question? For example: 'What is this document about?' or \
             'Summarize the key points.'"
        }
        Intent::OutOfScope => {
            "I'm designed to help with questions about your indexed \
             documents. Please ask me about the content in your knowledge \
             base."
        }
        Intent::Question => "I'm here to help! Please ask me a question about your documents.",
    }
}
