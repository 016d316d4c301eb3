//! Transcript summarizer: one structured-prompt call, no retry, no output
//! validation. The reply is trimmed and returned verbatim.

use std::sync::Arc;

use tracing::debug;

use convolens_llm::{ChatClient, ChatTurn, LlmError};

use crate::prompt;

pub struct Summarizer {
    client: Arc<dyn ChatClient>,
    max_tokens: u32,
}

impl Summarizer {
    pub fn new(client: Arc<dyn ChatClient>, max_tokens: u32) -> Self {
        Self { client, max_tokens }
    }

    pub async fn summarize(&self, transcript: &str) -> Result<String, LlmError> {
        debug!(transcript_len = transcript.len(), "summarizing transcript");
        let turns = [ChatTurn::user(prompt::summary_prompt(transcript))];
        let reply = self.client.complete(&turns, self.max_tokens).await?;
        Ok(reply.trim().to_string())
    }
}
