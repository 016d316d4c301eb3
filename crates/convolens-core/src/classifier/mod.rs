//! Hierarchical classifier
//!
//! Walks the taxonomy from the root, at each level asking the chat
//! collaborator to pick one name from a closed candidate set. Model output
//! is validated by exact match against that set; invalid answers are
//! retried up to a budget and then deterministically defaulted to the first
//! candidate. A `ConversationContext` accumulates the prompt/answer turns
//! across levels, so follow-up prompts do not repeat the transcript.

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use convolens_llm::{ChatClient, ChatTurn, LlmError};

use crate::prompt;
use crate::taxonomy::Taxonomy;

/// Classification depth currently being decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    One,
    Two,
    Three,
}

impl Level {
    pub fn number(self) -> u8 {
        match self {
            Self::One => 1,
            Self::Two => 2,
            Self::Three => 3,
        }
    }
}

/// Classifier errors. Invalid model output is NOT an error: it is retried
/// and then defaulted. Only collaborator failures surface here.
#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("llm error: {0}")]
    Llm(#[from] LlmError),
    #[error("no candidates at level {0}")]
    NoCandidates(u8),
}

/// Accumulated turn history for one classification run. Exclusively owned
/// by that run; never shared across requests.
#[derive(Debug, Default)]
pub struct ConversationContext {
    turns: Vec<ChatTurn>,
}

impl ConversationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.turns.push(ChatTurn::user(content));
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.turns.push(ChatTurn::assistant(content));
    }

    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }
}

/// Validated 2-or-3-element category path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationPath {
    levels: Vec<String>,
}

impl ClassificationPath {
    pub fn new(levels: Vec<String>) -> Self {
        Self { levels }
    }

    pub fn levels(&self) -> &[String] {
        &self.levels
    }

    /// Render as a single string, levels joined by `-`.
    pub fn joined(&self) -> String {
        self.levels.join("-")
    }
}

impl std::fmt::Display for ClassificationPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.joined())
    }
}

/// Outcome of one level's validated-retry protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LevelOutcome {
    /// The model produced a candidate-set member within the budget.
    Accepted(String),
    /// The budget was exhausted; the first declared candidate was used.
    DefaultedTo(String),
}

impl LevelOutcome {
    pub fn name(&self) -> &str {
        match self {
            Self::Accepted(name) | Self::DefaultedTo(name) => name,
        }
    }

    fn into_name(self) -> String {
        match self {
            Self::Accepted(name) | Self::DefaultedTo(name) => name,
        }
    }
}

/// One model reply, judged against the candidate set.
enum Attempt {
    Accepted(String),
    Rejected(String),
}

#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    /// Total attempts per level before the deterministic fallback.
    pub max_attempts: usize,
    /// Output-token cap for classification calls.
    pub max_tokens: u32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            max_tokens: 128,
        }
    }
}

/// Depth-bounded classification state machine. One `classify` call per
/// request; the taxonomy and client are shared read-only.
pub struct HierarchicalClassifier {
    taxonomy: Arc<Taxonomy>,
    client: Arc<dyn ChatClient>,
    config: ClassifierConfig,
}

impl HierarchicalClassifier {
    pub fn new(
        taxonomy: Arc<Taxonomy>,
        client: Arc<dyn ChatClient>,
        config: ClassifierConfig,
    ) -> Self {
        Self {
            taxonomy,
            client,
            config,
        }
    }

    /// Produce a validated 2-or-3-element path for a cleaned transcript.
    /// The path has three elements iff the chosen level-2 category is in
    /// the configured has-level-3 set.
    pub async fn classify(&self, transcript: &str) -> Result<ClassificationPath, ClassifyError> {
        let mut context = ConversationContext::new();
        let mut path: Vec<String> = Vec::new();

        let candidates = self.taxonomy.level1_names();
        let outcome = self
            .classify_level(Level::One, transcript, &candidates, &path, &mut context)
            .await?;
        info!(level = 1, chosen = %outcome.name(), "level classified");
        path.push(outcome.into_name());

        let candidates = self.taxonomy.level2_children(&path[0]);
        let outcome = self
            .classify_level(Level::Two, transcript, &candidates, &path, &mut context)
            .await?;
        info!(level = 2, chosen = %outcome.name(), "level classified");
        path.push(outcome.into_name());

        if self.taxonomy.requires_level3(&path[1]) {
            let candidates = self.taxonomy.level3_children(&path[1]);
            let outcome = self
                .classify_level(Level::Three, transcript, &candidates, &path, &mut context)
                .await?;
            info!(level = 3, chosen = %outcome.name(), "level classified");
            path.push(outcome.into_name());
        }

        Ok(ClassificationPath::new(path))
    }

    /// Validated-retry protocol for a single level. The prompt is appended
    /// to the accumulated context only once the level resolves, together
    /// with the accepted (or defaulted) answer as an assistant turn, so
    /// downstream levels see a coherent history.
    async fn classify_level(
        &self,
        level: Level,
        transcript: &str,
        candidates: &[String],
        path: &[String],
        context: &mut ConversationContext,
    ) -> Result<LevelOutcome, ClassifyError> {
        if candidates.is_empty() {
            return Err(ClassifyError::NoCandidates(level.number()));
        }

        let prompt = match level {
            Level::One => prompt::level1_prompt(transcript, candidates),
            Level::Two | Level::Three => prompt::followup_prompt(level, path, candidates),
        };

        let mut accepted = None;
        for attempt in 1..=self.config.max_attempts {
            let mut turns = context.turns().to_vec();
            turns.push(ChatTurn::user(prompt.clone()));

            let reply = self.client.complete(&turns, self.config.max_tokens).await?;
            match judge_reply(&reply, candidates) {
                Attempt::Accepted(name) => {
                    accepted = Some(name);
                    break;
                }
                Attempt::Rejected(raw) => {
                    warn!(
                        level = level.number(),
                        attempt,
                        max_attempts = self.config.max_attempts,
                        reply = %raw,
                        "reply not in candidate set, retrying"
                    );
                }
            }
        }

        let outcome = match accepted {
            Some(name) => LevelOutcome::Accepted(name),
            None => {
                warn!(
                    level = level.number(),
                    fallback = %candidates[0],
                    "retry budget exhausted, using first candidate"
                );
                LevelOutcome::DefaultedTo(candidates[0].clone())
            }
        };

        context.push_user(prompt);
        context.push_assistant(outcome.name().to_string());
        Ok(outcome)
    }
}

/// Exact, case-sensitive membership test after sanitizing the reply. No
/// partial or fuzzy matching: this gate is what keeps invalid categories
/// out of the result.
fn judge_reply(reply: &str, candidates: &[String]) -> Attempt {
    let cleaned = sanitize_reply(reply);
    if candidates.iter().any(|c| c.as_str() == cleaned) {
        Attempt::Accepted(cleaned.to_string())
    } else {
        Attempt::Rejected(reply.trim().to_string())
    }
}

/// Trim whitespace and strip one layer of enclosing bracket markers the
/// model may have echoed around the category name.
fn sanitize_reply(reply: &str) -> &str {
    let mut cleaned = reply.trim();
    for (open, close) in [('【', '】'), ('[', ']'), ('「', '」')] {
        if let Some(inner) = cleaned
            .strip_prefix(open)
            .and_then(|rest| rest.strip_suffix(close))
        {
            cleaned = inner.trim();
        }
    }
    cleaned
}
