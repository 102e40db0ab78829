//! # claimguard-core
//!
//! Deterministic guardrail pipeline for AI-generated insurance claim
//! decisions.
//!
//! This crate sits between a raw model-generated decision and the
//! decision actually returned to a caller, answering:
//! - Is the input safe to send to paid external services?
//! - Is the decision grounded in the evidence that was retrieved?
//! - Does the decision contradict itself, the claim, or its documents?
//! - May it be routed automatically, or does a human need to see it?
//!
//! ## Key Guarantees
//!
//! 1. **Deterministic**: same input always produces the same routing
//! 2. **No external calls**: everything here is synchronous and pure
//! 3. **Sticky escalation**: `ManualReview` is never downgraded
//! 4. **Grounded**: a `Covered` decision always cites retrieved clauses
//!
//! ## Example
//!
//! ```rust,ignore
//! use claimguard_core::{review, GuardrailConfig};
//!
//! let config = GuardrailConfig::default();
//! let decision = review(&request, raw, &clauses, &[], &config);
//! println!("{} — {}", decision.status, decision.confidence_rationale);
//! ```

pub mod citation;
pub mod config;
pub mod contradiction;
pub mod redactor;
pub mod rules;
pub mod schema;
pub mod screener;
pub mod types;

// Re-export main types at crate root
pub use citation::CitationValidator;
pub use config::{ConfigError, GuardrailConfig, Thresholds};
pub use contradiction::{Contradiction, ContradictionDetector, Severity};
pub use redactor::{PiiCategory, Redactor};
pub use rules::RuleEngine;
pub use schema::{decision_from_json, decision_schema, validate_decision_json, DecisionParseError};
pub use screener::InputScreener;
pub use types::{
    ClaimDecision, ClaimRequest, ClaimStatus, PolicyClause, RawDecision, RequestError,
    ValidationResult,
};

/// Run the deterministic post-generation pipeline.
///
/// Citation check → contradiction check → business rules → redaction.
/// Every failure mode resolves locally: an ungrounded decision becomes
/// `ManualReview` with confidence 0, a critical contradiction becomes
/// `ManualReview` with findings attached. Nothing here returns an error
/// to the caller.
pub fn review(
    request: &ClaimRequest,
    raw: RawDecision,
    clauses: &[PolicyClause],
    supporting_texts: &[String],
    config: &GuardrailConfig,
) -> ClaimDecision {
    let redactor = Redactor::new();

    // Citation validation: a blocking failure discards the model's
    // status and confidence outright.
    let citation = CitationValidator::new().validate(&raw, clauses);
    if !citation.is_valid {
        tracing::warn!(errors = ?citation.errors, "decision rejected by citation validation");
        let decision = ClaimDecision::manual_review(
            citation.errors.join("; "),
            "decision cited evidence outside the retrieved clause set",
        )
        .with_warnings(citation.warnings);
        return redact_explanation(decision, &redactor);
    }

    // Contradiction detection over the raw decision.
    let detector = ContradictionDetector::new(config.thresholds.clone());
    let findings = detector.detect(request, &raw, clauses, supporting_texts);
    let critical = ContradictionDetector::has_critical(&findings);
    let summaries = ContradictionDetector::summarize(&findings);

    let mut decision = ClaimDecision::from_raw(raw)
        .with_warnings(citation.warnings)
        .with_contradictions(findings);

    if critical {
        tracing::warn!(findings = ?summaries, "critical contradictions detected");
        decision = decision.escalate(format!(
            "critical contradictions require human review: {}",
            summaries.join("; ")
        ));
    }

    // Business rules decide the final route.
    let engine = RuleEngine::new(config.thresholds.clone());
    let decision = engine.apply(decision, request, clauses, !supporting_texts.is_empty());

    redact_explanation(decision, &redactor)
}

/// Redact the explanation before it leaves the core.
fn redact_explanation(decision: ClaimDecision, redactor: &Redactor) -> ClaimDecision {
    let redacted = redactor.redact(&redactor.redact_narrative_terms(&decision.explanation));
    decision.with_explanation(redacted)
}
