use actix_web::{web, HttpResponse};
use log::info;

use crate::error::ApiError;
use crate::types::ChatSession;
use crate::web::models::{AppendMessageRequest, CreateSessionRequest, CurrentSession, SessionFile};
use crate::AppState;

fn not_found(id: &str) -> ApiError {
    ApiError::NotFound(format!("Conversa não encontrada: {}", id))
}

fn require_session(data: &AppState, id: &str) -> Result<ChatSession, ApiError> {
    data.lock_store()?
        .get_session(id)?
        .ok_or_else(|| not_found(id))
}

pub async fn list_sessions(data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let sessions = data.lock_store()?.list_sessions()?;
    Ok(HttpResponse::Ok().json(sessions))
}

pub async fn create_session(
    data: web::Data<AppState>,
    req: Option<web::Json<CreateSessionRequest>>,
) -> Result<HttpResponse, ApiError> {
    let title = req.and_then(|r| r.into_inner().title);
    let session = data.lock_store()?.create_session(title.as_deref())?;
    Ok(HttpResponse::Created().json(session))
}

pub async fn get_session(
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let session = require_session(&data, &path)?;
    Ok(HttpResponse::Ok().json(session))
}

pub async fn delete_session(
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let mut store = data.lock_store()?;
    if store.get_session(&id)?.is_none() {
        return Err(not_found(&id));
    }
    store.delete_session(&id)?;
    Ok(HttpResponse::NoContent().finish())
}

pub async fn append_message(
    data: web::Data<AppState>,
    path: web::Path<String>,
    req: web::Json<AppendMessageRequest>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let req = req.into_inner();
    let mut store = data.lock_store()?;
    if store.get_session(&id)?.is_none() {
        return Err(not_found(&id));
    }
    let message = store.append_message(&id, req.role, &req.content)?;
    Ok(HttpResponse::Created().json(message))
}

pub async fn uploaded_file(
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    require_session(&data, &id)?;
    let file = data.lock_store()?.uploaded_file(&id)?;
    Ok(HttpResponse::Ok().json(SessionFile { file }))
}

pub async fn current_session(data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let id = data.lock_store()?.current_session_id()?;
    Ok(HttpResponse::Ok().json(CurrentSession { id }))
}

/// `{"id": null}` clears the pointer.
pub async fn set_current_session(
    data: web::Data<AppState>,
    req: web::Json<CurrentSession>,
) -> Result<HttpResponse, ApiError> {
    let CurrentSession { id } = req.into_inner();
    let mut store = data.lock_store()?;
    match &id {
        Some(id) => {
            if store.get_session(id)?.is_none() {
                return Err(not_found(id));
            }
            store.set_current_session_id(id)?;
            info!("Current session is now {}", id);
        }
        None => store.clear_current_session_id()?,
    }
    Ok(HttpResponse::Ok().json(CurrentSession { id }))
}
