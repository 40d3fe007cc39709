pub mod gemini;

#[cfg(test)]
pub mod fake;

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use crate::error::LlmError;

pub use gemini::GeminiModel;

/// Incrementally delivered pieces of a streamed reply, in generation order.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String, LlmError>> + Send>>;

/// Roles understood by the transport. There is no system slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnRole {
    User,
    Model,
}

impl TurnRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnRole::User => "user",
            TurnRole::Model => "model",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    Text(String),
    /// Base64 payload with its MIME type.
    InlineData { mime_type: String, data: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Turn {
    pub role: TurnRole,
    pub parts: Vec<Part>,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            parts: vec![Part::Text(text.into())],
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Model,
            parts: vec![Part::Text(text.into())],
        }
    }

    /// Concatenated text parts, ignoring inline data.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                Part::Text(t) => Some(t.as_str()),
                Part::InlineData { .. } => None,
            })
            .collect::<Vec<_>>()
            .join("")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub contents: Vec<Turn>,
    pub temperature: f32,
    pub max_output_tokens: u32,
    /// Ask the model for a JSON document instead of prose.
    pub json_output: bool,
}

impl GenerationRequest {
    pub fn new(contents: Vec<Turn>, temperature: f32, max_output_tokens: u32) -> Self {
        Self {
            contents,
            temperature,
            max_output_tokens,
            json_output: false,
        }
    }

    pub fn single(prompt: impl Into<String>, temperature: f32, max_output_tokens: u32) -> Self {
        Self::new(vec![Turn::user(prompt)], temperature, max_output_tokens)
    }

    pub fn with_json_output(mut self) -> Self {
        self.json_output = true;
        self
    }
}

/// A hosted generative model.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Single-shot generation returning the full text.
    async fn generate(&self, request: GenerationRequest) -> Result<String, LlmError>;

    /// Streamed generation. Each call issues a fresh request.
    async fn stream(&self, request: GenerationRequest) -> Result<FragmentStream, LlmError>;
}
