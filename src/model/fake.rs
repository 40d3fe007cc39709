//! Scripted in-memory model for tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use futures::stream;

use super::{FragmentStream, GenerationRequest, LanguageModel};
use crate::error::LlmError;

/// Replays queued replies in call order. An exhausted queue behaves like
/// a transport failure.
#[derive(Default)]
pub struct FakeModel {
    replies: Mutex<VecDeque<Result<String, LlmError>>>,
    streams: Mutex<VecDeque<Vec<Result<String, LlmError>>>>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl FakeModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reply(self, text: &str) -> Self {
        self.replies
            .lock()
            .expect("fake model mutex poisoned")
            .push_back(Ok(text.to_string()));
        self
    }

    pub fn with_error(self, error: LlmError) -> Self {
        self.replies
            .lock()
            .expect("fake model mutex poisoned")
            .push_back(Err(error));
        self
    }

    pub fn with_stream(self, fragments: Vec<Result<String, LlmError>>) -> Self {
        self.streams
            .lock()
            .expect("fake model mutex poisoned")
            .push_back(fragments);
        self
    }

    /// Every request seen so far, generate and stream alike.
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests
            .lock()
            .expect("fake model mutex poisoned")
            .clone()
    }

    fn record(&self, request: GenerationRequest) {
        self.requests
            .lock()
            .expect("fake model mutex poisoned")
            .push(request);
    }
}

#[async_trait]
impl LanguageModel for FakeModel {
    async fn generate(&self, request: GenerationRequest) -> Result<String, LlmError> {
        self.record(request);
        self.replies
            .lock()
            .expect("fake model mutex poisoned")
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::Transport("no scripted reply".into())))
    }

    async fn stream(&self, request: GenerationRequest) -> Result<FragmentStream, LlmError> {
        self.record(request);
        let fragments = self
            .streams
            .lock()
            .expect("fake model mutex poisoned")
            .pop_front()
            .ok_or_else(|| LlmError::Transport("no scripted stream".into()))?;
        Ok(Box::pin(stream::iter(fragments)))
    }
}
