//! Citation validation: decisions must be grounded in retrieved evidence.
//!
//! The generation step cannot fabricate a clause identifier that
//! happens to collide with a real one unless it copied it correctly,
//! so an unknown citation is the core anti-hallucination check.
//! Invalid citations are never best-effort repaired; the caller must
//! discard the decision's status.

use std::collections::HashSet;

use crate::types::{ClaimStatus, PolicyClause, RawDecision, ValidationResult};

/// Hedging phrases that suggest the explanation is less certain than
/// its citation count implies.
const HEDGE_TERMS: &[&str] = &[
    "might",
    "may be",
    "possibly",
    "unclear",
    "uncertain",
    "appears to",
    "cannot determine",
    "hard to say",
];

/// Citation count considered unusually high for a hedged explanation.
const HIGH_CITATION_COUNT: usize = 4;

/// Confidence at which an uncited assertive explanation looks suspect.
const ASSERTIVE_CONFIDENCE: f64 = 0.9;

/// Validates that a decision's cited evidence exists in the retrieved set.
pub struct CitationValidator;

impl CitationValidator {
    pub fn new() -> Self {
        Self
    }

    /// Validate a raw decision against the clauses actually retrieved.
    ///
    /// Blocking errors: a `Covered` status with no citations, or any
    /// citation naming a clause that was never retrieved. Heuristic
    /// hallucination indicators produce non-blocking warnings.
    pub fn validate(&self, decision: &RawDecision, available: &[PolicyClause]) -> ValidationResult {
        let mut result = ValidationResult::valid();

        if decision.status == ClaimStatus::Covered && decision.clause_references.is_empty() {
            result.add_error("covered decision cites no policy clauses");
        }

        let known: HashSet<&str> = available.iter().map(|c| c.clause_id.as_str()).collect();
        for citation in &decision.clause_references {
            if !known.contains(citation.as_str()) {
                result.add_error(format!(
                    "cited clause {} was not present in the retrieved evidence",
                    citation
                ));
            }
        }

        self.check_hallucination_indicators(decision, &mut result);

        result
    }

    /// Heuristic indicators: hedging paired with many citations, or an
    /// assertive uncited explanation. Warnings only.
    fn check_hallucination_indicators(&self, decision: &RawDecision, result: &mut ValidationResult) {
        let explanation = decision.explanation.to_lowercase();
        let hedge_count = HEDGE_TERMS
            .iter()
            .filter(|term| explanation.contains(*term))
            .count();

        if hedge_count >= 2 && decision.clause_references.len() >= HIGH_CITATION_COUNT {
            result.add_warning(format!(
                "explanation hedges ({} hedge phrases) while citing {} clauses",
                hedge_count,
                decision.clause_references.len()
            ));
        }

        if hedge_count == 0
            && decision.clause_references.is_empty()
            && decision.confidence >= ASSERTIVE_CONFIDENCE
            && decision.status.is_definitive()
        {
            result.add_warning(
                "assertive high-confidence explanation cites no clauses at all".to_string(),
            );
        }
    }
}

impl Default for CitationValidator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clause(id: &str) -> PolicyClause {
        PolicyClause {
            clause_id: id.to_string(),
            text: "Coverage includes outpatient treatment.".to_string(),
            category: "health".to_string(),
            relevance: 0.8,
        }
    }

    fn decision(status: ClaimStatus, citations: &[&str], confidence: f64) -> RawDecision {
        RawDecision {
            status,
            explanation: "The claim falls under outpatient benefits.".to_string(),
            clause_references: citations.iter().map(|s| s.to_string()).collect(),
            required_documents: vec![],
            confidence,
        }
    }

    #[test]
    fn test_covered_without_citations_is_blocked() {
        let validator = CitationValidator::new();
        let result = validator.validate(
            &decision(ClaimStatus::Covered, &[], 0.95),
            &[clause("C-1")],
        );

        assert!(!result.is_valid);
    }

    #[test]
    fn test_unknown_citation_is_blocked() {
        let validator = CitationValidator::new();
        let result = validator.validate(
            &decision(ClaimStatus::Covered, &["C-99"], 0.95),
            &[clause("C-1"), clause("C-2")],
        );

        assert!(!result.is_valid);
        assert!(result.errors.iter().any(|e| e.contains("C-99")));
    }

    #[test]
    fn test_valid_citations_pass() {
        let validator = CitationValidator::new();
        let result = validator.validate(
            &decision(ClaimStatus::Covered, &["C-1"], 0.92),
            &[clause("C-1"), clause("C-2")],
        );

        assert!(result.is_valid);
        assert!(result.errors.is_empty());
    }

    #[test]
    fn test_not_covered_without_citations_is_allowed() {
        let validator = CitationValidator::new();
        let result = validator.validate(
            &decision(ClaimStatus::NotCovered, &[], 0.7),
            &[clause("C-1")],
        );

        assert!(result.is_valid);
    }

    #[test]
    fn test_hedged_explanation_with_many_citations_warns() {
        let validator = CitationValidator::new();
        let mut raw = decision(
            ClaimStatus::Covered,
            &["C-1", "C-2", "C-3", "C-4"],
            0.9,
        );
        raw.explanation =
            "It might be covered, though the exact terms are unclear in places.".to_string();

        let clauses = vec![clause("C-1"), clause("C-2"), clause("C-3"), clause("C-4")];
        let result = validator.validate(&raw, &clauses);

        assert!(result.is_valid);
        assert!(!result.warnings.is_empty());
    }

    #[test]
    fn test_assertive_uncited_denial_warns() {
        let validator = CitationValidator::new();
        let result = validator.validate(
            &decision(ClaimStatus::NotCovered, &[], 0.97),
            &[clause("C-1")],
        );

        assert!(result.is_valid);
        assert!(!result.warnings.is_empty());
    }
}
