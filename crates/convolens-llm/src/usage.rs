use std::sync::atomic::{AtomicU64, Ordering};

use tracing::info;

/// Cumulative token accounting shared by the clients it is injected into.
/// Owned by the composition root rather than living in process-wide state,
/// so tests get a fresh meter per run.
#[derive(Debug, Default)]
pub struct UsageMeter {
    prompt_tokens: AtomicU64,
    completion_tokens: AtomicU64,
    requests: AtomicU64,
}

/// Point-in-time view of a `UsageMeter`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsageSnapshot {
    pub requests: u64,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

impl UsageMeter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one completed call and log the running totals.
    pub fn record(&self, prompt_tokens: u64, completion_tokens: u64) {
        let cumulative_prompt = self.prompt_tokens.fetch_add(prompt_tokens, Ordering::Relaxed)
            + prompt_tokens;
        let cumulative_completion = self
            .completion_tokens
            .fetch_add(completion_tokens, Ordering::Relaxed)
            + completion_tokens;
        let requests = self.requests.fetch_add(1, Ordering::Relaxed) + 1;

        info!(
            prompt_tokens,
            completion_tokens,
            cumulative_prompt,
            cumulative_completion,
            cumulative_total = cumulative_prompt + cumulative_completion,
            requests,
            "token usage"
        );
    }

    pub fn snapshot(&self) -> UsageSnapshot {
        let prompt_tokens = self.prompt_tokens.load(Ordering::Relaxed);
        let completion_tokens = self.completion_tokens.load(Ordering::Relaxed);
        UsageSnapshot {
            requests: self.requests.load(Ordering::Relaxed),
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meter_accumulates_across_records() {
        let meter = UsageMeter::new();
        meter.record(100, 20);
        meter.record(50, 5);

        let snapshot = meter.snapshot();
        assert_eq!(snapshot.requests, 2);
        assert_eq!(snapshot.prompt_tokens, 150);
        assert_eq!(snapshot.completion_tokens, 25);
        assert_eq!(snapshot.total_tokens, 175);
    }
}
