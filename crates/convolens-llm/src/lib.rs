//! # Convolens LLM
//!
//! Chat-completion collaborator used by the classification and summary
//! stages. Provides the `ChatClient` trait, an OpenAI-compatible HTTP
//! implementation, a scripted mock for tests, explicit token-usage
//! accounting and the scenario-keyed client registry built by the
//! composition root.

mod client;
mod registry;
mod usage;

pub use client::{
    ChatClient, ChatRole, ChatTurn, HttpChatClient, HttpChatClientConfig, LlmError, MockChatClient,
};
pub use registry::{ClientRegistry, Scenario};
pub use usage::{UsageMeter, UsageSnapshot};
