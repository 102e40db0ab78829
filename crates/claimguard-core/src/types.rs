//! Core data model for claim validation.
//!
//! Everything here lives for the duration of a single validation call.
//! `ClaimDecision` is the only type that crosses the pipeline boundary,
//! built by progressive enrichment: each stage derives a new value from
//! the previous one instead of mutating in place.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::contradiction::Contradiction;

/// Errors from validating an inbound claim request.
#[derive(Error, Debug)]
pub enum RequestError {
    #[error("claim amount must be a positive number, got {0}")]
    NonPositiveAmount(f64),

    #[error("missing required field: {0}")]
    MissingField(&'static str),
}

/// Routing status of a claim decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimStatus {
    /// The policy covers the claim.
    Covered,

    /// The policy does not cover the claim.
    NotCovered,

    /// The claim is routed to a human decision-maker.
    ManualReview,
}

impl ClaimStatus {
    /// Whether this status asserts a coverage outcome rather than deferring.
    pub fn is_definitive(&self) -> bool {
        !matches!(self, ClaimStatus::ManualReview)
    }
}

impl fmt::Display for ClaimStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClaimStatus::Covered => write!(f, "covered"),
            ClaimStatus::NotCovered => write!(f, "not_covered"),
            ClaimStatus::ManualReview => write!(f, "manual_review"),
        }
    }
}

/// An inbound claim to validate. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimRequest {
    /// Policy identifier the claim is filed against
    pub policy_id: String,

    /// Policy category (e.g., "health", "auto", "property")
    pub category: String,

    /// Claimed amount, positive
    pub amount: f64,

    /// Free-text claim narrative from the claimant
    pub narrative: String,
}

impl ClaimRequest {
    /// Check structural validity of the request.
    pub fn validate(&self) -> Result<(), RequestError> {
        if self.policy_id.trim().is_empty() {
            return Err(RequestError::MissingField("policy_id"));
        }
        if self.narrative.trim().is_empty() {
            return Err(RequestError::MissingField("narrative"));
        }
        if !self.amount.is_finite() || self.amount <= 0.0 {
            return Err(RequestError::NonPositiveAmount(self.amount));
        }
        Ok(())
    }
}

/// A policy clause returned by retrieval. Owned by the retrieval step
/// for the lifetime of one validation call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyClause {
    /// Clause identifier (e.g., "C-12")
    pub clause_id: String,

    /// Clause text
    pub text: String,

    /// Coverage category the clause belongs to
    pub category: String,

    /// Relevance score from retrieval
    pub relevance: f64,
}

/// The generative model's proposed decision. Never mutated, only wrapped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawDecision {
    /// Proposed routing status
    pub status: ClaimStatus,

    /// Free-text explanation of the decision
    pub explanation: String,

    /// Identifiers of the clauses the decision cites
    #[serde(default)]
    pub clause_references: Vec<String>,

    /// Follow-up documents the model asked for
    #[serde(default)]
    pub required_documents: Vec<String>,

    /// Model confidence in [0, 1]
    pub confidence: f64,
}

/// Outcome of a validation pass: blocking errors and non-blocking warnings.
///
/// Produced by the input screener and the citation validator; consumed
/// immediately, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    /// Whether the validated input may proceed
    pub is_valid: bool,

    /// Blocking errors
    pub errors: Vec<String>,

    /// Non-blocking warnings
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// Create a validation result with no issues.
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Add a blocking error, marking the result invalid.
    pub fn add_error(&mut self, error: impl Into<String>) {
        self.is_valid = false;
        self.errors.push(error.into());
    }

    /// Add a non-blocking warning.
    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }
}

/// The final decision returned across the core boundary.
///
/// Wraps a [`RawDecision`] and layers on guardrail findings. Append-only
/// except for `status`, which may be escalated to `ManualReview` by a
/// later stage but never downgraded from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimDecision {
    /// Final routing status
    pub status: ClaimStatus,

    /// Explanation of the decision (redacted before leaving the core)
    pub explanation: String,

    /// Identifiers of the clauses the decision cites
    pub clause_references: Vec<String>,

    /// Follow-up documents requested from the claimant
    pub required_documents: Vec<String>,

    /// Confidence in [0, 1]
    pub confidence: f64,

    /// Contradiction findings attached by the detector
    pub contradictions: Vec<Contradiction>,

    /// Hints about evidence that would strengthen the decision
    pub missing_evidence: Vec<String>,

    /// Non-blocking validation warnings
    pub warnings: Vec<String>,

    /// Why the final status was chosen
    pub confidence_rationale: String,

    /// When the decision was finalized
    pub decided_at: DateTime<Utc>,
}

impl ClaimDecision {
    /// Wrap a raw model decision, carrying its fields forward unchanged.
    pub fn from_raw(raw: RawDecision) -> Self {
        Self {
            status: raw.status,
            explanation: raw.explanation,
            clause_references: raw.clause_references,
            required_documents: raw.required_documents,
            confidence: raw.confidence,
            contradictions: Vec::new(),
            missing_evidence: Vec::new(),
            warnings: Vec::new(),
            confidence_rationale: String::new(),
            decided_at: Utc::now(),
        }
    }

    /// Build a manual-review decision directly, for pipelines that never
    /// produced (or discarded) a model decision.
    pub fn manual_review(explanation: impl Into<String>, rationale: impl Into<String>) -> Self {
        Self {
            status: ClaimStatus::ManualReview,
            explanation: explanation.into(),
            clause_references: Vec::new(),
            required_documents: Vec::new(),
            confidence: 0.0,
            contradictions: Vec::new(),
            missing_evidence: Vec::new(),
            warnings: Vec::new(),
            confidence_rationale: rationale.into(),
            decided_at: Utc::now(),
        }
    }

    /// Return a copy with the given status.
    ///
    /// `ManualReview` is sticky: once set, any attempt to move back to a
    /// definitive status is ignored.
    pub fn with_status(mut self, status: ClaimStatus) -> Self {
        if self.status == ClaimStatus::ManualReview && status != ClaimStatus::ManualReview {
            return self;
        }
        self.status = status;
        self
    }

    /// Escalate to manual review with a rationale.
    pub fn escalate(self, rationale: impl Into<String>) -> Self {
        self.with_status(ClaimStatus::ManualReview)
            .with_rationale(rationale)
    }

    /// Return a copy with the given confidence rationale.
    pub fn with_rationale(mut self, rationale: impl Into<String>) -> Self {
        self.confidence_rationale = rationale.into();
        self
    }

    /// Return a copy with the explanation replaced (used by the redaction stage).
    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = explanation.into();
        self
    }

    /// Return a copy with contradiction findings appended.
    pub fn with_contradictions(mut self, findings: Vec<Contradiction>) -> Self {
        self.contradictions.extend(findings);
        self
    }

    /// Return a copy with warnings appended.
    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings.extend(warnings);
        self
    }

    /// Append a warning unless an identical one is already present.
    pub fn add_warning_once(mut self, warning: impl Into<String>) -> Self {
        let warning = warning.into();
        if !self.warnings.contains(&warning) {
            self.warnings.push(warning);
        }
        self
    }

    /// Append a missing-evidence hint unless an identical one is already present.
    pub fn add_missing_evidence(mut self, hint: impl Into<String>) -> Self {
        let hint = hint.into();
        if !self.missing_evidence.contains(&hint) {
            self.missing_evidence.push(hint);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_covered() -> RawDecision {
        RawDecision {
            status: ClaimStatus::Covered,
            explanation: "Covered under outpatient benefits.".to_string(),
            clause_references: vec!["C-1".to_string()],
            required_documents: vec![],
            confidence: 0.92,
        }
    }

    #[test]
    fn test_from_raw_carries_fields() {
        let decision = ClaimDecision::from_raw(raw_covered());
        assert_eq!(decision.status, ClaimStatus::Covered);
        assert_eq!(decision.clause_references, vec!["C-1"]);
        assert_eq!(decision.confidence, 0.92);
        assert!(decision.contradictions.is_empty());
    }

    #[test]
    fn test_manual_review_is_sticky() {
        let decision = ClaimDecision::from_raw(raw_covered())
            .escalate("forced for test")
            .with_status(ClaimStatus::Covered);

        assert_eq!(decision.status, ClaimStatus::ManualReview);
    }

    #[test]
    fn test_escalate_sets_rationale() {
        let decision = ClaimDecision::from_raw(raw_covered()).escalate("needs a human");
        assert_eq!(decision.status, ClaimStatus::ManualReview);
        assert_eq!(decision.confidence_rationale, "needs a human");
    }

    #[test]
    fn test_missing_evidence_deduplicates() {
        let decision = ClaimDecision::from_raw(raw_covered())
            .add_missing_evidence("receipts")
            .add_missing_evidence("receipts");

        assert_eq!(decision.missing_evidence, vec!["receipts"]);
    }

    #[test]
    fn test_request_validation() {
        let request = ClaimRequest {
            policy_id: "POL-1".to_string(),
            category: "health".to_string(),
            amount: -5.0,
            narrative: "Broken arm treatment".to_string(),
        };
        assert!(matches!(
            request.validate(),
            Err(RequestError::NonPositiveAmount(_))
        ));

        let request = ClaimRequest {
            policy_id: String::new(),
            category: "health".to_string(),
            amount: 100.0,
            narrative: "Broken arm treatment".to_string(),
        };
        assert!(matches!(
            request.validate(),
            Err(RequestError::MissingField("policy_id"))
        ));
    }
}
