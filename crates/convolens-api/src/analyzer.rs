//! Analysis orchestrator: normalize → classify → summarize.

use tracing::{debug, error, info};

use convolens_core::{HierarchicalClassifier, Summarizer, TranscriptNormalizer};

use crate::dto::{AnalyzeRequest, AnalyzeResponse};
use crate::error::AnalyzeError;

/// Sequences the three analysis stages and owns the failure envelope for
/// the whole request: any stage error is caught, logged and mapped to a
/// failure-status response. Stateless per request; safe to share.
pub struct ConversationAnalyzer {
    normalizer: TranscriptNormalizer,
    classifier: HierarchicalClassifier,
    summarizer: Summarizer,
}

impl ConversationAnalyzer {
    pub fn new(
        normalizer: TranscriptNormalizer,
        classifier: HierarchicalClassifier,
        summarizer: Summarizer,
    ) -> Self {
        Self {
            normalizer,
            classifier,
            summarizer,
        }
    }

    /// Analyze one conversation. Never fails: errors become a response
    /// with empty category/summary and a `fail` status.
    pub async fn analyze(&self, request: &AnalyzeRequest) -> AnalyzeResponse {
        info!(conversation_id = %request.conversation_id, "analyzing conversation");

        match self.run(request).await {
            Ok((category, summary)) => {
                info!(
                    conversation_id = %request.conversation_id,
                    category = %category,
                    "analysis complete"
                );
                AnalyzeResponse::success(request, category, summary)
            }
            Err(err) => {
                error!(
                    conversation_id = %request.conversation_id,
                    %err,
                    "analysis failed"
                );
                AnalyzeResponse::failure(request)
            }
        }
    }

    async fn run(&self, request: &AnalyzeRequest) -> Result<(String, String), AnalyzeError> {
        let cleaned = self.normalizer.normalize(&request.conversation);
        debug!(cleaned_len = cleaned.len(), "transcript normalized");

        let path = self.classifier.classify(&cleaned).await?;
        let summary = self.summarizer.summarize(&cleaned).await?;

        Ok((path.joined(), summary))
    }
}
