//! Client for the Gemini REST API.
//!
//! Single-shot calls go to `:generateContent`, streamed replies to
//! `:streamGenerateContent?alt=sse`, whose server-sent events are decoded
//! incrementally from the response body.

use std::collections::VecDeque;

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use log::{debug, info};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use super::{FragmentStream, GenerationRequest, LanguageModel, Part, Turn};
use crate::config::Config;
use crate::error::LlmError;

const API_KEY_HEADER: &str = "x-goog-api-key";

pub struct GeminiModel {
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl GeminiModel {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>, api_key: Option<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.into(),
            api_key,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.base_url, &config.model, config.api_key.clone())
    }

    fn api_key(&self) -> Result<&str, LlmError> {
        self.api_key.as_deref().ok_or(LlmError::MissingCredentials)
    }

    async fn post(&self, url: &str, request: &GenerationRequest) -> Result<reqwest::Response, LlmError> {
        let api_key = self.api_key()?;
        let payload = GenerateContentRequest::from(request);
        debug!("Payload: {}", serde_json::to_string(&payload).unwrap_or_default());

        let response = self
            .client
            .post(url)
            .header(API_KEY_HEADER, api_key)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "failed to read error body".to_string());
            return Err(map_http_error(status, body));
        }

        Ok(response)
    }
}

#[async_trait]
impl LanguageModel for GeminiModel {
    async fn generate(&self, request: GenerationRequest) -> Result<String, LlmError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        info!(
            "Generating content with {} (temperature: {}, max_tokens: {})",
            self.model, request.temperature, request.max_output_tokens
        );

        let response = self.post(&url, &request).await?;
        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| LlmError::MalformedResponse(e.to_string()))?;

        let text = parsed.into_text()?;
        if text.trim().is_empty() {
            return Err(LlmError::EmptyResponse);
        }

        info!("Response length: {} characters", text.len());
        Ok(text)
    }

    async fn stream(&self, request: GenerationRequest) -> Result<FragmentStream, LlmError> {
        let url = format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            self.base_url, self.model
        );
        info!(
            "Streaming content with {} ({} turns)",
            self.model,
            request.contents.len()
        );

        let response = self.post(&url, &request).await?;
        Ok(fragment_stream(response.bytes_stream().boxed()))
    }
}

struct StreamState {
    bytes: BoxStream<'static, reqwest::Result<bytes::Bytes>>,
    decoder: SseDecoder,
    pending: VecDeque<Result<String, LlmError>>,
    done: bool,
}

/// Turns an SSE byte stream into text fragments. The first error ends the
/// stream.
fn fragment_stream(bytes: BoxStream<'static, reqwest::Result<bytes::Bytes>>) -> FragmentStream {
    let state = StreamState {
        bytes,
        decoder: SseDecoder::default(),
        pending: VecDeque::new(),
        done: false,
    };

    Box::pin(stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.pending.pop_front() {
                if item.is_err() {
                    state.pending.clear();
                    state.done = true;
                }
                return Some((item, state));
            }
            if state.done {
                return None;
            }

            match state.bytes.next().await {
                Some(Ok(chunk)) => {
                    for payload in state.decoder.feed(&chunk) {
                        state.pending.extend(parse_event(&payload));
                    }
                }
                Some(Err(e)) => {
                    state.done = true;
                    return Some((Err(LlmError::Transport(e.to_string())), state));
                }
                None => {
                    state.done = true;
                    for payload in state.decoder.finish() {
                        state.pending.extend(parse_event(&payload));
                    }
                }
            }
        }
    }))
}

/// Maps one SSE `data` payload to a fragment, if it carries text.
fn parse_event(payload: &str) -> Option<Result<String, LlmError>> {
    let payload = payload.trim();
    if payload.is_empty() || payload == "[DONE]" {
        return None;
    }

    let parsed: GenerateContentResponse = match serde_json::from_str(payload) {
        Ok(parsed) => parsed,
        Err(e) => return Some(Err(LlmError::MalformedResponse(e.to_string()))),
    };

    match parsed.into_text() {
        Ok(text) if text.is_empty() => None,
        other => Some(other),
    }
}

/// Incremental `text/event-stream` decoder. Events may arrive split
/// across any number of network chunks.
#[derive(Debug, Default)]
struct SseDecoder {
    buffer: Vec<u8>,
    data_lines: Vec<String>,
}

impl SseDecoder {
    fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();

        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim_end_matches(['\n', '\r']);
            if let Some(event) = self.process_line(line) {
                events.push(event);
            }
        }

        events
    }

    fn finish(&mut self) -> Vec<String> {
        let mut events = Vec::new();
        if !self.buffer.is_empty() {
            let raw = std::mem::take(&mut self.buffer);
            let line = String::from_utf8_lossy(&raw).trim_end_matches('\r').to_string();
            if let Some(event) = self.process_line(&line) {
                events.push(event);
            }
        }
        if let Some(event) = self.dispatch() {
            events.push(event);
        }
        events
    }

    fn process_line(&mut self, line: &str) -> Option<String> {
        if line.is_empty() {
            return self.dispatch();
        }
        if let Some(value) = line.strip_prefix("data:") {
            self.data_lines
                .push(value.strip_prefix(' ').unwrap_or(value).to_string());
        }
        // event:, id:, retry: and comments carry nothing we use
        None
    }

    fn dispatch(&mut self) -> Option<String> {
        if self.data_lines.is_empty() {
            return None;
        }
        let data = self.data_lines.join("\n");
        self.data_lines.clear();
        Some(data)
    }
}

fn map_http_error(status: StatusCode, body: String) -> LlmError {
    let message = serde_json::from_str::<ErrorWrapper>(&body)
        .map(|wrapper| {
            let status_text = wrapper.error.status.unwrap_or_default();
            let msg = wrapper.error.message.unwrap_or_else(|| body.clone());
            if status_text.is_empty() {
                msg
            } else {
                format!("{}: {}", status_text, msg)
            }
        })
        .unwrap_or_else(|_| body.clone());

    LlmError::Api {
        status: status.as_u16(),
        message,
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<ContentPayload>,
    generation_config: GenerationConfigPayload,
    safety_settings: Vec<SafetySetting>,
}

impl From<&GenerationRequest> for GenerateContentRequest {
    fn from(request: &GenerationRequest) -> Self {
        Self {
            contents: request.contents.iter().map(ContentPayload::from).collect(),
            generation_config: GenerationConfigPayload {
                temperature: request.temperature,
                max_output_tokens: request.max_output_tokens,
                response_mime_type: request
                    .json_output
                    .then(|| "application/json".to_string()),
            },
            safety_settings: vec![
                SafetySetting::block_medium("HARM_CATEGORY_HARASSMENT"),
                SafetySetting::block_medium("HARM_CATEGORY_HATE_SPEECH"),
            ],
        }
    }
}

#[derive(Serialize)]
struct ContentPayload {
    role: &'static str,
    parts: Vec<PartPayload>,
}

impl From<&Turn> for ContentPayload {
    fn from(turn: &Turn) -> Self {
        Self {
            role: turn.role.as_str(),
            parts: turn
                .parts
                .iter()
                .map(|part| match part {
                    Part::Text(text) => PartPayload::Text { text: text.clone() },
                    Part::InlineData { mime_type, data } => PartPayload::InlineData {
                        inline_data: InlineDataPayload {
                            mime_type: mime_type.clone(),
                            data: data.clone(),
                        },
                    },
                })
                .collect(),
        }
    }
}

#[derive(Serialize)]
#[serde(untagged)]
enum PartPayload {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineDataPayload,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineDataPayload {
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfigPayload {
    temperature: f32,
    max_output_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
}

#[derive(Serialize)]
struct SafetySetting {
    category: &'static str,
    threshold: &'static str,
}

impl SafetySetting {
    fn block_medium(category: &'static str) -> Self {
        Self {
            category,
            threshold: "BLOCK_MEDIUM_AND_ABOVE",
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
    error: Option<ErrorBody>,
}

impl GenerateContentResponse {
    fn into_text(self) -> Result<String, LlmError> {
        if let Some(error) = self.error {
            return Err(LlmError::Api {
                status: error.code.unwrap_or(500) as u16,
                message: error.message.unwrap_or_default(),
            });
        }
        if let Some(reason) = self.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(LlmError::Blocked(reason));
        }

        Ok(self
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<String>()
            })
            .unwrap_or_default())
    }
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<PartResponse>,
}

#[derive(Deserialize)]
struct PartResponse {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Deserialize)]
struct ErrorWrapper {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    code: Option<i32>,
    message: Option<String>,
    status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TurnRole;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn model_for(server: &MockServer) -> GeminiModel {
        GeminiModel::new(server.uri(), "test-model", Some("test-key".to_string()))
    }

    fn text_event(text: &str) -> String {
        format!(
            "data: {}\r\n\r\n",
            serde_json::json!({
                "candidates": [{ "content": { "role": "model", "parts": [{ "text": text }] } }]
            })
        )
    }

    #[test]
    fn test_request_payload_shape() {
        let request = GenerationRequest::new(
            vec![Turn::user("oi"), Turn::model("olá")],
            0.4,
            4000,
        )
        .with_json_output();
        let payload = serde_json::to_value(GenerateContentRequest::from(&request)).unwrap();

        assert_eq!(payload["contents"][0]["role"], "user");
        assert_eq!(payload["contents"][1]["role"], "model");
        assert_eq!(payload["contents"][1]["parts"][0]["text"], "olá");
        assert_eq!(payload["generationConfig"]["maxOutputTokens"], 4000);
        assert_eq!(
            payload["generationConfig"]["responseMimeType"],
            "application/json"
        );
        assert_eq!(payload["safetySettings"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_inline_data_serializes_camel_case() {
        let turn = Turn {
            role: TurnRole::User,
            parts: vec![Part::InlineData {
                mime_type: "image/png".into(),
                data: "QUJD".into(),
            }],
        };
        let payload = serde_json::to_value(ContentPayload::from(&turn)).unwrap();
        assert_eq!(payload["parts"][0]["inlineData"]["mimeType"], "image/png");
        assert_eq!(payload["parts"][0]["inlineData"]["data"], "QUJD");
    }

    #[test]
    fn test_sse_decoder_handles_split_events() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.feed(b"data: {\"a\":").is_empty());
        assert!(decoder.feed(b"1}\r\n").is_empty());
        let events = decoder.feed(b"\r\ndata: second\n\n: comment\n");
        assert_eq!(events, vec!["{\"a\":1}".to_string(), "second".to_string()]);
        assert!(decoder.finish().is_empty());
    }

    #[test]
    fn test_sse_decoder_flushes_unterminated_event() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.feed(b"data: tail").is_empty());
        assert_eq!(decoder.finish(), vec!["tail".to_string()]);
    }

    #[test]
    fn test_parse_event_reports_block_reason() {
        let result = parse_event(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#);
        assert!(matches!(result, Some(Err(LlmError::Blocked(reason))) if reason == "SAFETY"));
    }

    #[test]
    fn test_parse_event_skips_empty_text() {
        assert!(parse_event(r#"{"candidates":[{"content":{"parts":[]}}]}"#).is_none());
        assert!(parse_event("[DONE]").is_none());
    }

    #[tokio::test]
    async fn test_missing_key_fails_without_network() {
        let model = GeminiModel::new("http://127.0.0.1:9", "m", None);
        let err = model
            .generate(GenerationRequest::single("oi", 0.2, 10))
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::MissingCredentials));
    }

    #[tokio::test]
    async fn test_generate_returns_candidate_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/test-model:generateContent"))
            .and(header("x-goog-api-key", "test-key"))
            .and(body_partial_json(serde_json::json!({
                "generationConfig": { "maxOutputTokens": 100 }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{ "content": { "parts": [{ "text": "criar_" }, { "text": "plano" }] } }]
            })))
            .mount(&server)
            .await;

        let text = model_for(&server)
            .generate(GenerationRequest::single("classifique", 0.2, 100))
            .await
            .unwrap();
        assert_eq!(text, "criar_plano");
    }

    #[tokio::test]
    async fn test_generate_maps_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
                "error": { "code": 403, "message": "API key not valid", "status": "PERMISSION_DENIED" }
            })))
            .mount(&server)
            .await;

        let err = model_for(&server)
            .generate(GenerationRequest::single("oi", 0.2, 10))
            .await
            .unwrap_err();
        match err {
            LlmError::Api { status, message } => {
                assert_eq!(status, 403);
                assert_eq!(message, "PERMISSION_DENIED: API key not valid");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_stream_yields_fragments_in_order() {
        let server = MockServer::start().await;
        let body = format!(
            "{}{}{}",
            text_event("Olá, "),
            text_event("vamos estudar"),
            text_event("!")
        );
        Mock::given(method("POST"))
            .and(path("/models/test-model:streamGenerateContent"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(body.into_bytes(), "text/event-stream"),
            )
            .mount(&server)
            .await;

        let stream = model_for(&server)
            .stream(GenerationRequest::single("oi", 0.7, 1500))
            .await
            .unwrap();
        let fragments: Vec<String> = stream.map(|f| f.unwrap()).collect().await;
        assert_eq!(fragments, vec!["Olá, ", "vamos estudar", "!"]);
    }

    #[tokio::test]
    async fn test_stream_surfaces_malformed_event_as_terminal_error() {
        let server = MockServer::start().await;
        let body = format!("{}data: {{not json\n\n{}", text_event("a"), text_event("b"));
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(body.into_bytes(), "text/event-stream"),
            )
            .mount(&server)
            .await;

        let items: Vec<Result<String, LlmError>> = model_for(&server)
            .stream(GenerationRequest::single("oi", 0.7, 1500))
            .await
            .unwrap()
            .collect()
            .await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap(), "a");
        assert!(matches!(items[1], Err(LlmError::MalformedResponse(_))));
    }
}
