//! # claimguard-runtime
//!
//! Async orchestration for the claimguard pipeline.
//!
//! The deterministic guardrails live in `claimguard-core`; this crate
//! sequences them around the external collaborators — embedding,
//! retrieval, generation, document extraction, and audit persistence —
//! each consumed through a narrow trait and bounded by a stage timeout.
//!
//! ## Example
//!
//! ```rust,ignore
//! use claimguard_runtime::ClaimOrchestrator;
//!
//! let orchestrator = ClaimOrchestrator::builder()
//!     .embedder(embedder)
//!     .retriever(retriever)
//!     .generator(generator)
//!     .documents(documents)
//!     .audit(audit)
//!     .build()?;
//!
//! let decision = orchestrator.validate_claim(&request, None).await?;
//! ```

pub mod config;
pub mod orchestrator;
pub mod services;

pub use config::{RuntimeConfig, RuntimeConfigError};
pub use orchestrator::{
    BuildError, ClaimOrchestrator, ClaimOrchestratorBuilder, PipelineStage, RejectedClaim,
};
pub use services::{
    AuditRecord, AuditSink, ClauseRetriever, DecisionGenerator, DocumentStore, EmbeddingService,
    ServiceError,
};
