use actix_web::{web, HttpResponse};
use log::{error, info, warn};

use crate::assistant::prompts;
use crate::error::ApiError;
use crate::store::title_from_message;
use crate::types::Role;
use crate::web::models::ChatRequest;
use crate::web::stream::{formatted_reply, ReplySink};
use crate::AppState;

const INVALID_MESSAGES: &str = "Requisição inválida. Array de mensagens é necessário.";
const NO_USER_MESSAGE: &str = "Nenhuma mensagem do usuário encontrada.";
const CHAT_APOLOGY: &str = "Desculpe, ocorreu um erro ao processar sua solicitação. Por favor, tente novamente mais tarde.";
/// How many trailing messages count as recent context for the thought process.
const RECENT_MESSAGES: usize = 5;

// Chat API endpoint
pub async fn chat(
    data: web::Data<AppState>,
    req: web::Json<ChatRequest>,
) -> Result<HttpResponse, ApiError> {
    let ChatRequest {
        messages,
        session_id,
    } = req.into_inner();

    let messages = match messages {
        Some(messages) if !messages.is_empty() => messages,
        _ => return Err(ApiError::BadRequest(INVALID_MESSAGES.to_string())),
    };

    let query = messages
        .iter()
        .rev()
        .find(|m| m.role == Role::User)
        .map(|m| m.content.clone())
        .ok_or_else(|| ApiError::BadRequest(NO_USER_MESSAGE.to_string()))?;

    info!(
        "Chat request with {} messages (session: {})",
        messages.len(),
        session_id.as_deref().unwrap_or("none")
    );

    if let Some(id) = &session_id {
        record_user_turn(&data, id, &query)?;
    }

    let intent = data.assistant.classifier.classify(&query).await;
    let system_prompt = prompts::system_prompt(intent);

    let recent = messages.len().min(RECENT_MESSAGES);
    let thought_process = data
        .assistant
        .chat
        .thought_process(&query, intent, recent)
        .await;

    let fragments = match data.assistant.chat.stream_reply(&messages, &system_prompt).await {
        Ok(fragments) => fragments,
        Err(e) => {
            error!("Failed to start reply stream: {}", e);
            if let Some(id) = session_id {
                reply_sink(data.clone(), id)(CHAT_APOLOGY);
            }
            return Ok(HttpResponse::InternalServerError()
                .content_type("text/plain; charset=utf-8")
                .body(CHAT_APOLOGY));
        }
    };

    let sink = session_id.map(|id| reply_sink(data.clone(), id));

    Ok(HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .insert_header(("X-Intent", intent.label()))
        .insert_header(("X-Thought-Process", encode_uri_component(&thought_process)))
        .streaming(formatted_reply(fragments, sink)))
}

/// Stores the user's message, naming the session after it if it is the first.
fn record_user_turn(data: &AppState, session_id: &str, content: &str) -> Result<(), ApiError> {
    let mut store = data.lock_store()?;
    let Some(session) = store.get_session(session_id)? else {
        warn!("Chat turn for unknown session {} is not recorded", session_id);
        return Ok(());
    };

    store.append_message(session_id, Role::User, content)?;
    if session.messages.is_empty() {
        store.rename_session(session_id, &title_from_message(content))?;
    }
    Ok(())
}

fn reply_sink(data: web::Data<AppState>, session_id: String) -> ReplySink {
    Box::new(move |text: &str| {
        let stored = data.lock_store().and_then(|mut store| {
            store
                .append_message(&session_id, Role::Assistant, text)
                .map_err(ApiError::from)
        });
        if let Err(e) = stored {
            error!("Failed to store reply for session {}: {}", session_id, e);
        }
    })
}

/// Percent-encodes everything outside the URI-component unreserved set,
/// byte by byte over UTF-8.
fn encode_uri_component(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z'
            | b'a'..=b'z'
            | b'0'..=b'9'
            | b'-'
            | b'_'
            | b'.'
            | b'!'
            | b'~'
            | b'*'
            | b'\''
            | b'('
            | b')' => out.push(byte as char),
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}
