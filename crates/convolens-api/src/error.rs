use thiserror::Error;

use convolens_core::ClassifyError;
use convolens_llm::LlmError;

/// Analysis-stage errors. These never cross the transport boundary: the
/// analyzer maps them to a failure-status response.
#[derive(Debug, Error)]
pub enum AnalyzeError {
    #[error("classification error: {0}")]
    Classify(#[from] ClassifyError),
    #[error("summary error: {0}")]
    Summary(#[from] LlmError),
}
