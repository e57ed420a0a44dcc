//! Text-generation backend capability.
//!
//! The shaper only ever needs two things from a backend: turn a prompt into
//! a request value, and execute that request. Anything that can do both
//! (the HTTP client, or an in-memory fake in tests) plugs in here.

pub mod openai;

use serde::{Deserialize, Serialize};

use crate::error::ShapeError;

pub use openai::OpenAiClient;

pub const FINISH_REASON_LENGTH: &str = "length";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Request body for a chat completion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    pub n: u32,
    pub seed: i64,
}

impl CompletionRequest {
    /// One candidate, fixed seed, optional token cap.
    pub fn new(model: &str, prompt: &str, max_tokens: Option<u32>) -> Self {
        Self {
            model: model.to_string(),
            messages: vec![ChatMessage::user(prompt)],
            max_tokens,
            n: 1,
            seed: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
pub struct Choice {
    #[serde(default)]
    pub index: u32,
    #[serde(default)]
    pub finish_reason: Option<String>,
    pub message: ChatMessage,
}

impl Choice {
    pub fn truncated_by_length(&self) -> bool {
        self.finish_reason.as_deref() == Some(FINISH_REASON_LENGTH)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

impl std::ops::AddAssign for Usage {
    fn add_assign(&mut self, other: Usage) {
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
        self.total_tokens += other.total_tokens;
    }
}

/// Parsed chat completion response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
pub struct Completion {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub usage: Usage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorDetail {
    pub message: String,
}

pub trait GenerativeBackend {
    fn build_request(&self, prompt: &str) -> CompletionRequest;
    fn execute(&self, request: &CompletionRequest) -> Result<Completion, ShapeError>;
}

impl<B: GenerativeBackend + ?Sized> GenerativeBackend for &B {
    fn build_request(&self, prompt: &str) -> CompletionRequest {
        (**self).build_request(prompt)
    }

    fn execute(&self, request: &CompletionRequest) -> Result<Completion, ShapeError> {
        (**self).execute(request)
    }
}
