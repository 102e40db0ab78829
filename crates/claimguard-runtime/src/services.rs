//! External collaborator contracts.
//!
//! The core never reimplements embedding, retrieval, generation,
//! document extraction, or audit storage; it consumes them through the
//! narrow traits here. Implementations live with their services and are
//! injected into the orchestrator at construction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use claimguard_core::{ClaimDecision, ClaimRequest, PolicyClause, RawDecision};

/// Errors from external service calls.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("service unavailable: {0}")]
    Unavailable(String),

    #[error("timeout after {0:?}")]
    Timeout(Duration),

    #[error("malformed response: {0}")]
    InvalidResponse(String),

    #[error("not found: {0}")]
    NotFound(String),
}

/// External embedding generation.
#[async_trait]
pub trait EmbeddingService: Send + Sync {
    /// Embed free text into a vector for retrieval.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ServiceError>;
}

/// External evidence retrieval. May legitimately return an empty list.
#[async_trait]
pub trait ClauseRetriever: Send + Sync {
    /// Retrieve the policy clauses most relevant to an embedded narrative.
    async fn retrieve(
        &self,
        embedding: &[f32],
        category: &str,
    ) -> Result<Vec<PolicyClause>, ServiceError>;
}

/// External generative decision step.
///
/// Implementations should validate model JSON against
/// [`claimguard_core::decision_schema`] before deserializing.
#[async_trait]
pub trait DecisionGenerator: Send + Sync {
    /// Propose a decision from the claim and retrieved clauses.
    async fn generate(
        &self,
        request: &ClaimRequest,
        clauses: &[PolicyClause],
    ) -> Result<RawDecision, ServiceError>;

    /// Propose a decision with supporting-document text included.
    async fn generate_with_evidence(
        &self,
        request: &ClaimRequest,
        clauses: &[PolicyClause],
        supporting_texts: &[String],
    ) -> Result<RawDecision, ServiceError>;
}

/// External content extraction for supporting documents.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Extract the text content of an uploaded document.
    async fn extract_text(&self, document_id: &str) -> Result<String, ServiceError>;
}

/// Durable audit record handed to the external sink.
///
/// The narrative and policy identifier are redacted/masked before the
/// record is assembled; the sink never sees raw identifiers.
#[derive(Debug, Clone, Serialize)]
pub struct AuditRecord {
    /// Correlation id for the validation call
    pub call_id: Uuid,

    /// Masked policy identifier
    pub policy_id_masked: String,

    /// Policy category
    pub category: String,

    /// Claimed amount
    pub amount: f64,

    /// Redacted claim narrative
    pub narrative_redacted: String,

    /// Identifiers of the clauses retrieved for this call
    pub retrieved_clause_ids: Vec<String>,

    /// The decision returned to the caller
    pub decision: ClaimDecision,

    /// When the record was assembled
    pub recorded_at: DateTime<Utc>,
}

/// External append-only audit sink. Fire-and-forget with respect to
/// the returned decision.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Persist one audit record.
    async fn persist(&self, record: &AuditRecord) -> Result<(), ServiceError>;
}
