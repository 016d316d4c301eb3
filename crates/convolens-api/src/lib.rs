//! # Convolens API
//!
//! Request/response contract and the analysis orchestrator. The transport
//! layer (axum binary) stays thin: it deserializes an `AnalyzeRequest`,
//! calls `ConversationAnalyzer::analyze` and serializes the result. All
//! analysis failures are absorbed here and reported through the response
//! status field, never as transport errors.

mod analyzer;
mod dto;
mod error;

pub use analyzer::ConversationAnalyzer;
pub use dto::{AnalyzeRequest, AnalyzeResponse, STATUS_FAIL, STATUS_SUCCESS};
pub use error::AnalyzeError;
