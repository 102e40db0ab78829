//! Sensitive-data detection and redaction.
//!
//! Detection (not redaction) is applied to inbound narratives for
//! compliance logging; redaction is applied to the final explanation
//! before it leaves the core. Detection never blocks the pipeline.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

lazy_static! {
    /// Email address pattern (RFC 5322 simplified)
    static ref EMAIL_PATTERN: Regex = Regex::new(
        r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}"
    ).unwrap();

    /// Payment-card-like sequence (16 digits with optional separators)
    static ref PAYMENT_CARD_PATTERN: Regex = Regex::new(
        r"\b\d{4}[\s-]?\d{4}[\s-]?\d{4}[\s-]?\d{4}\b"
    ).unwrap();

    /// National-ID-like sequence (XXX-XX-XXXX or nine digits)
    static ref NATIONAL_ID_PATTERN: Regex = Regex::new(
        r"\b\d{3}[-\s]?\d{2}[-\s]?\d{4}\b"
    ).unwrap();

    /// Phone number (with optional country code)
    static ref PHONE_PATTERN: Regex = Regex::new(
        r"(?:\+?1[-.\s]?)?(?:\([0-9]{3}\)|[0-9]{3})[-.\s]?[0-9]{3}[-.\s]?[0-9]{4}"
    ).unwrap();

    /// Date-of-birth-shaped dates: MM/DD/YYYY, DD-MM-YYYY, or ISO
    static ref DOB_PATTERN: Regex = Regex::new(
        r"\b(?:(?:0?[1-9]|[12][0-9]|3[01])[/.-](?:0?[1-9]|[12][0-9]|3[01])[/.-](?:19|20)\d{2}|(?:19|20)\d{2}-(?:0[1-9]|1[0-2])-(?:0[1-9]|[12][0-9]|3[01]))\b"
    ).unwrap();

    /// Postal code; redaction keeps the leading digits only
    static ref POSTAL_CODE_PATTERN: Regex = Regex::new(
        r"\b(\d{2})\d{3}(?:-\d{4})?\b"
    ).unwrap();

    /// Structured health/identity phrases with a value portion
    static ref NARRATIVE_TERM_PATTERN: Regex = Regex::new(
        r"(?i)\b(diagnosis|patient name|prescription|medical record|member id|date of birth)\s*:\s*[^\n.;]+"
    ).unwrap();
}

/// Categories of sensitive data the redactor recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PiiCategory {
    NationalId,
    Phone,
    Email,
    PaymentCard,
    DateOfBirth,
    PostalCode,
}

impl fmt::Display for PiiCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PiiCategory::NationalId => write!(f, "national_id"),
            PiiCategory::Phone => write!(f, "phone"),
            PiiCategory::Email => write!(f, "email"),
            PiiCategory::PaymentCard => write!(f, "payment_card"),
            PiiCategory::DateOfBirth => write!(f, "date_of_birth"),
            PiiCategory::PostalCode => write!(f, "postal_code"),
        }
    }
}

/// Detects and masks sensitive identifiers in free text.
pub struct Redactor;

impl Redactor {
    pub fn new() -> Self {
        Self
    }

    /// Count occurrences of each sensitive-data category in `text`.
    ///
    /// Returns only categories that actually occur. Ordering is
    /// deterministic (BTreeMap) so log output is stable.
    pub fn detect_types(&self, text: &str) -> BTreeMap<PiiCategory, usize> {
        let mut counts = BTreeMap::new();

        let checks: [(PiiCategory, &Regex); 6] = [
            (PiiCategory::Email, &EMAIL_PATTERN),
            (PiiCategory::PaymentCard, &PAYMENT_CARD_PATTERN),
            (PiiCategory::NationalId, &NATIONAL_ID_PATTERN),
            (PiiCategory::Phone, &PHONE_PATTERN),
            (PiiCategory::DateOfBirth, &DOB_PATTERN),
            (PiiCategory::PostalCode, &POSTAL_CODE_PATTERN),
        ];

        for (category, pattern) in checks {
            let count = pattern.find_iter(text).count();
            if count > 0 {
                counts.insert(category, count);
            }
        }

        counts
    }

    /// Detect sensitive data in an inbound narrative and emit the
    /// compliance signal. Never blocks.
    pub fn scan_input(&self, text: &str) -> BTreeMap<PiiCategory, usize> {
        let found = self.detect_types(text);
        if !found.is_empty() {
            tracing::warn!(categories = ?found, "sensitive data detected in inbound narrative");
        }
        found
    }

    /// Replace every recognized sensitive pattern with a placeholder.
    ///
    /// Patterns are applied most-specific first; postal codes keep
    /// their leading two digits.
    pub fn redact(&self, text: &str) -> String {
        let text = EMAIL_PATTERN.replace_all(text, "[email redacted]");
        let text = PAYMENT_CARD_PATTERN.replace_all(&text, "[card redacted]");
        let text = NATIONAL_ID_PATTERN.replace_all(&text, "[id redacted]");
        let text = PHONE_PATTERN.replace_all(&text, "[phone redacted]");
        let text = DOB_PATTERN.replace_all(&text, "[date redacted]");
        POSTAL_CODE_PATTERN
            .replace_all(&text, "${1}***")
            .into_owned()
    }

    /// Mask an identifier, keeping a short trailing suffix.
    pub fn mask_identifier(&self, id: &str) -> String {
        let chars: Vec<char> = id.chars().collect();
        if chars.len() <= 4 {
            return "*".repeat(chars.len());
        }
        let suffix: String = chars[chars.len() - 4..].iter().collect();
        format!("{}{}", "*".repeat(chars.len() - 4), suffix)
    }

    /// Redact the value portion of structured health/identity phrases
    /// ("diagnosis: ...", "patient name: ..."), independent of the
    /// general pattern redactor.
    pub fn redact_narrative_terms(&self, text: &str) -> String {
        NARRATIVE_TERM_PATTERN
            .replace_all(text, "$1: [redacted]")
            .into_owned()
    }
}

impl Default for Redactor {
    fn default() -> Self {
        Self::new()
    }
}
