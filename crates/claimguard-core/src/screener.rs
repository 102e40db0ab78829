//! Input screening for adversarial claim narratives.
//!
//! This is the only gate before paid external calls: anything that
//! passes here goes on to retrieval and generation. Two pattern
//! families are scanned. Direct override phrases ("ignore previous
//! instructions") block on their own. Role-hijack phrases ("you are
//! now", "act as") block only when they co-occur with an override
//! phrase, since legitimate narratives may contain benign role
//! language ("the garage will act as an intermediary").

use lazy_static::lazy_static;
use regex::Regex;

use crate::types::ValidationResult;

lazy_static! {
    /// Direct instruction-override phrasing.
    static ref OVERRIDE_PATTERN: Regex = Regex::new(
        r"(?i)\b(?:ignore|disregard|forget|override)\s+(?:all\s+|any\s+|the\s+|your\s+)?(?:previous|prior|above|earlier|preceding|system)\b(?:\s+(?:instructions?|prompts?|rules?|directives?|messages?|text))?"
    ).unwrap();

    /// Role-hijack phrasing, only a threat alongside an override phrase.
    static ref ROLE_HIJACK_PATTERN: Regex = Regex::new(
        r"(?i)\b(?:you\s+are\s+now|act\s+as|pretend\s+(?:to\s+be|you\s+are)|roleplay\s+as|from\s+now\s+on\s+you\s+are)\b"
    ).unwrap();
}

/// Screens free-text narratives before any external call is made.
pub struct InputScreener;

impl InputScreener {
    pub fn new() -> Self {
        Self
    }

    /// Scan a narrative for adversarial patterns.
    ///
    /// Any blocking error means the request must be rejected without
    /// invoking retrieval or generation.
    pub fn screen(&self, narrative: &str) -> ValidationResult {
        let mut result = ValidationResult::valid();

        let overrides: Vec<&str> = OVERRIDE_PATTERN
            .find_iter(narrative)
            .map(|m| m.as_str())
            .collect();

        for phrase in &overrides {
            result.add_error(format!("instruction override phrase detected: \"{}\"", phrase));
        }

        if !overrides.is_empty() {
            for m in ROLE_HIJACK_PATTERN.find_iter(narrative) {
                result.add_error(format!(
                    "role hijack phrase detected alongside an override: \"{}\"",
                    m.as_str()
                ));
            }
        }

        result
    }

    /// Strip matched spans so the narrative can be logged defensively.
    ///
    /// Does not block anything; screening verdicts come from [`screen`](Self::screen).
    pub fn sanitize(&self, narrative: &str) -> String {
        let stripped = OVERRIDE_PATTERN.replace_all(narrative, "[removed]");
        ROLE_HIJACK_PATTERN
            .replace_all(&stripped, "[removed]")
            .into_owned()
    }
}

impl Default for InputScreener {
    fn default() -> Self {
        Self::new()
    }
}
