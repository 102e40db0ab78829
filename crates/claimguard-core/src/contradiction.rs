//! Cross-field contradiction detection.
//!
//! Four independent checks run over the decision, its citations, the
//! claim, and (when present) supporting-document text. Any `Critical`
//! finding forces manual review downstream; `Warning` findings ride
//! along without changing status.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::Thresholds;
use crate::types::{ClaimRequest, ClaimStatus, PolicyClause, RawDecision};

lazy_static! {
    /// Monetary limit stated in clause text ("limit of $5,000", "up to 2500")
    static ref AMOUNT_LIMIT_PATTERN: Regex = Regex::new(
        r"(?i)(?:limit(?:ed)?\s+(?:of|to)|up\s+to|maximum\s+(?:of\s+)?|not\s+(?:to\s+)?exceed(?:ing)?)\s*\$?\s*([0-9][0-9,]*(?:\.[0-9]+)?)"
    ).unwrap();

    /// Any monetary amount in free text
    static ref MONEY_PATTERN: Regex = Regex::new(
        r"\$\s*([0-9][0-9,]*(?:\.[0-9]+)?)"
    ).unwrap();

    /// Date mentions, slash/dash and ISO forms
    static ref DATE_PATTERN: Regex = Regex::new(
        r"\b(?:\d{1,2}[/-]\d{1,2}[/-](?:19|20)\d{2}|(?:19|20)\d{2}-\d{2}-\d{2})\b"
    ).unwrap();

    /// Procedure named in a supporting document
    static ref PROCEDURE_PATTERN: Regex = Regex::new(
        r"(?i)procedure\s*:\s*([^\n.;]+)"
    ).unwrap();
}

/// Clause text fragments that mark an exclusion.
const EXCLUSION_MARKERS: &[&str] = &[
    "exclusion",
    "excluded",
    "not covered",
    "does not cover",
    "no coverage",
    "shall not cover",
];

/// Clause text fragments that grant coverage.
const GRANT_MARKERS: &[&str] = &["covered", "coverage includes", "eligible", "reimburs", "benefit"];

/// Relative divergence tolerated between a documented amount and the claim amount.
const AMOUNT_TOLERANCE: f64 = 0.01;

/// Severity of a contradiction finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Critical => write!(f, "CRITICAL"),
            Severity::Warning => write!(f, "WARNING"),
        }
    }
}

/// A single contradiction between two sources in a validation call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contradiction {
    /// First source label (e.g., "decision status")
    pub source_a: String,

    /// Second source label (e.g., "cited clauses")
    pub source_b: String,

    /// Human-readable description of the conflict
    pub description: String,

    /// How severe the conflict is
    pub severity: Severity,

    /// What the conflict means for routing
    pub impact: String,
}

impl Contradiction {
    fn critical(
        source_a: &str,
        source_b: &str,
        description: impl Into<String>,
        impact: impl Into<String>,
    ) -> Self {
        Self {
            source_a: source_a.to_string(),
            source_b: source_b.to_string(),
            description: description.into(),
            severity: Severity::Critical,
            impact: impact.into(),
        }
    }

    fn warning(
        source_a: &str,
        source_b: &str,
        description: impl Into<String>,
        impact: impl Into<String>,
    ) -> Self {
        Self {
            source_a: source_a.to_string(),
            source_b: source_b.to_string(),
            description: description.into(),
            severity: Severity::Warning,
            impact: impact.into(),
        }
    }
}

/// Cross-checks a decision against its citations, the claim, and
/// supporting documents.
pub struct ContradictionDetector {
    thresholds: Thresholds,
}

impl ContradictionDetector {
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }

    /// Run all checks. Each check is independent and may emit zero or
    /// more findings.
    pub fn detect(
        &self,
        request: &ClaimRequest,
        decision: &RawDecision,
        available: &[PolicyClause],
        supporting_texts: &[String],
    ) -> Vec<Contradiction> {
        let cited: Vec<&PolicyClause> = available
            .iter()
            .filter(|c| decision.clause_references.contains(&c.clause_id))
            .collect();

        let mut findings = Vec::new();
        findings.extend(self.check_status_vs_citations(decision, &cited));
        findings.extend(self.check_confidence_vs_status(decision));
        findings.extend(self.check_amount_vs_limits(request, &cited));
        for text in supporting_texts {
            findings.extend(self.check_supporting_document(request, text));
        }
        findings
    }

    /// True if any finding is `Critical`.
    pub fn has_critical(findings: &[Contradiction]) -> bool {
        findings.iter().any(|f| f.severity == Severity::Critical)
    }

    /// One line per finding, for rationale text and logs.
    pub fn summarize(findings: &[Contradiction]) -> Vec<String> {
        findings
            .iter()
            .map(|f| {
                format!(
                    "{}: {} vs {}: {} ({})",
                    f.severity, f.source_a, f.source_b, f.description, f.impact
                )
            })
            .collect()
    }

    /// Check 1: a `Covered` decision resting entirely on exclusion
    /// clauses, or a `NotCovered` decision resting entirely on
    /// coverage-granting clauses.
    fn check_status_vs_citations(
        &self,
        decision: &RawDecision,
        cited: &[&PolicyClause],
    ) -> Vec<Contradiction> {
        if cited.is_empty() {
            return Vec::new();
        }

        let mut findings = Vec::new();

        if decision.status == ClaimStatus::Covered && cited.iter().all(|c| is_exclusionary(&c.text))
        {
            findings.push(Contradiction::critical(
                "decision status",
                "cited clauses",
                "decision asserts coverage but every cited clause describes an exclusion",
                "coverage assertion is unsupported by its own evidence",
            ));
        }

        if decision.status == ClaimStatus::NotCovered && cited.iter().all(|c| is_granting(&c.text))
        {
            findings.push(Contradiction::critical(
                "decision status",
                "cited clauses",
                "decision denies coverage but every cited clause grants it",
                "denial is contradicted by its own evidence",
            ));
        }

        findings
    }

    /// Check 2: confidence out of line with the status it accompanies.
    fn check_confidence_vs_status(&self, decision: &RawDecision) -> Vec<Contradiction> {
        let mut findings = Vec::new();

        if decision.confidence >= self.thresholds.very_high_confidence
            && decision.status == ClaimStatus::ManualReview
        {
            findings.push(Contradiction::warning(
                "confidence",
                "decision status",
                format!(
                    "confidence {:.2} is very high for a manual-review deferral",
                    decision.confidence
                ),
                "the model defers despite near-certainty",
            ));
        }

        if decision.confidence <= self.thresholds.very_low_confidence
            && decision.status.is_definitive()
        {
            findings.push(Contradiction::warning(
                "confidence",
                "decision status",
                format!(
                    "confidence {:.2} is very low for a definitive {} status",
                    decision.confidence, decision.status
                ),
                "the model asserts an outcome it barely believes",
            ));
        }

        findings
    }

    /// Check 3: claim amount exceeding a limit stated in a cited clause.
    fn check_amount_vs_limits(
        &self,
        request: &ClaimRequest,
        cited: &[&PolicyClause],
    ) -> Vec<Contradiction> {
        let mut findings = Vec::new();

        for clause in cited {
            for cap in AMOUNT_LIMIT_PATTERN.captures_iter(&clause.text) {
                if let Some(limit) = parse_amount(&cap[1]) {
                    if request.amount > limit {
                        findings.push(Contradiction::critical(
                            "claim amount",
                            "cited clause limit",
                            format!(
                                "claim amount {:.2} exceeds the {:.2} limit stated in clause {}",
                                request.amount, limit, clause.clause_id
                            ),
                            "claim exceeds the cited coverage limit",
                        ));
                    }
                }
            }
        }

        findings
    }

    /// Check 4: supporting-document text diverging from the claim on
    /// amount, date, or procedure.
    fn check_supporting_document(
        &self,
        request: &ClaimRequest,
        document_text: &str,
    ) -> Vec<Contradiction> {
        let mut findings = Vec::new();

        let documented: Vec<f64> = MONEY_PATTERN
            .captures_iter(document_text)
            .filter_map(|cap| parse_amount(&cap[1]))
            .collect();
        if !documented.is_empty()
            && !documented
                .iter()
                .any(|amount| relative_difference(*amount, request.amount) <= AMOUNT_TOLERANCE)
        {
            findings.push(Contradiction::critical(
                "claim amount",
                "supporting document",
                format!(
                    "no amount in the supporting document matches the claimed {:.2}",
                    request.amount
                ),
                "documented amounts diverge from the claim",
            ));
        }

        let narrative_dates: Vec<&str> = DATE_PATTERN
            .find_iter(&request.narrative)
            .map(|m| m.as_str())
            .collect();
        let document_dates: Vec<&str> = DATE_PATTERN
            .find_iter(document_text)
            .map(|m| m.as_str())
            .collect();
        if !narrative_dates.is_empty()
            && !document_dates.is_empty()
            && !document_dates.iter().any(|d| narrative_dates.contains(d))
        {
            findings.push(Contradiction::critical(
                "claim narrative",
                "supporting document",
                "dates in the supporting document do not match any date in the narrative",
                "documented dates diverge from the claim",
            ));
        }

        if let Some(cap) = PROCEDURE_PATTERN.captures(document_text) {
            let procedure = cap[1].trim().to_lowercase();
            if !procedure.is_empty() && !request.narrative.to_lowercase().contains(&procedure) {
                findings.push(Contradiction::critical(
                    "claim narrative",
                    "supporting document",
                    format!(
                        "documented procedure \"{}\" is not mentioned in the narrative",
                        cap[1].trim()
                    ),
                    "documented procedure diverges from the claim",
                ));
            }
        }

        findings
    }
}

fn is_exclusionary(text: &str) -> bool {
    let lower = text.to_lowercase();
    EXCLUSION_MARKERS.iter().any(|m| lower.contains(m))
}

fn is_granting(text: &str) -> bool {
    let lower = text.to_lowercase();
    !is_exclusionary(text) && GRANT_MARKERS.iter().any(|m| lower.contains(m))
}

fn parse_amount(digits: &str) -> Option<f64> {
    digits.replace(',', "").parse::<f64>().ok()
}

fn relative_difference(a: f64, b: f64) -> f64 {
    let scale = a.abs().max(b.abs());
    if scale == 0.0 {
        return 0.0;
    }
    (a - b).abs() / scale
}
