//! Deterministic business rules for final claim routing.
//!
//! A pure, ordered table: the first matching rule decides. Applying the
//! engine to its own output is a no-op, so downstream replays cannot
//! change a routing outcome. These rules are the only claim-domain
//! policy in the pipeline.

use crate::config::Thresholds;
use crate::types::{ClaimDecision, ClaimRequest, ClaimStatus, PolicyClause};

/// Exclusion markers scanned in cited clause text for the ambiguity rule.
const EXCLUSION_MARKERS: &[&str] = &["exclusion", "excluded", "not covered", "does not cover"];

/// Maps confidence, claim value, and citation content to a final route.
pub struct RuleEngine {
    thresholds: Thresholds,
}

impl RuleEngine {
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }

    /// Apply the routing rules, first match wins.
    ///
    /// Never downgrades a `ManualReview` status; running the engine on
    /// its own output returns it unchanged.
    pub fn apply(
        &self,
        decision: ClaimDecision,
        request: &ClaimRequest,
        available: &[PolicyClause],
        has_supporting_documents: bool,
    ) -> ClaimDecision {
        let t = &self.thresholds;

        // Rule 1: confidence below the auto-routing floor.
        if decision.confidence < t.min_confidence {
            let rationale = format!(
                "confidence {:.2} is below the {:.2} threshold for automatic routing",
                decision.confidence, t.min_confidence
            );
            return decision
                .add_missing_evidence("additional supporting documents")
                .add_missing_evidence("additional policy clause citations")
                .escalate(rationale);
        }

        // Rule 2: low-value fast path with documented evidence.
        if request.amount < t.fast_track_amount
            && decision.confidence >= t.fast_track_confidence
            && decision.status == ClaimStatus::Covered
            && has_supporting_documents
        {
            return decision.with_rationale(
                "low-value claim fast-tracked: high confidence and supporting documents on file",
            );
        }

        // Rule 3: moderate-value approval.
        if request.amount < t.moderate_amount
            && decision.confidence >= t.min_confidence
            && decision.status == ClaimStatus::Covered
        {
            return decision
                .with_rationale("moderate-value claim approved above the confidence threshold");
        }

        // Rule 4: high-value claims always get a human, regardless of confidence.
        if request.amount > t.high_value_amount && decision.status == ClaimStatus::Covered {
            return decision.escalate(format!(
                "claim amount {:.2} exceeds the {:.2} mandatory-review limit",
                request.amount, t.high_value_amount
            ));
        }

        // Rule 5: exclusion language in cited clauses makes a Covered
        // status ambiguous. Only fires for Covered; other statuses fall
        // through so the engine stays a fixed point.
        if decision.status == ClaimStatus::Covered && self.cites_exclusion(&decision, available) {
            return decision
                .escalate("a cited clause contains exclusion language; coverage is ambiguous");
        }

        decision
    }

    fn cites_exclusion(&self, decision: &ClaimDecision, available: &[PolicyClause]) -> bool {
        available
            .iter()
            .filter(|c| decision.clause_references.contains(&c.clause_id))
            .any(|c| {
                let lower = c.text.to_lowercase();
                EXCLUSION_MARKERS.iter().any(|m| lower.contains(m))
            })
    }
}
