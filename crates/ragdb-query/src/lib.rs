//! ragdb-query
//!
//! Request-level orchestration on top of an `Embedder` and a `SearchBackend`:
//! search in the three modes, RAG prompt assembly and document management.
pub mod call;
pub mod context;
pub mod documents;
pub mod orchestrator;

pub use context::ContextAssembler;
pub use documents::{DeletedDocument, DocumentService, HealthReport, SystemStats};
pub use orchestrator::{OrchestratorConfig, SearchOrchestrator};
