use std::path::Path;

use log::{error, info, warn};

use super::kv::{FileStore, KeyValueStore};
use crate::error::StoreError;
use crate::types::{generate_id, now_millis, ChatSession, FileInfo, Message, Role};

const SESSIONS_KEY: &str = "chats";
const CURRENT_SESSION_KEY: &str = "currentChatId";
pub const DEFAULT_SESSION_TITLE: &str = "Nova conversa";
const TITLE_PREVIEW_CHARS: usize = 30;

fn file_key(session_id: &str) -> String {
    format!("file_{}", session_id)
}

/// Title derived from a session's first user message.
pub fn title_from_message(content: &str) -> String {
    if content.chars().count() > TITLE_PREVIEW_CHARS {
        let preview: String = content.chars().take(TITLE_PREVIEW_CHARS).collect();
        format!("{}...", preview)
    } else {
        content.to_string()
    }
}

/// Chat sessions and their messages over a key-value backend.
///
/// Without a backend the store is unavailable: reads come back empty and
/// writes are dropped. Writers are not coordinated, the last write wins.
pub struct ChatStore {
    backend: Option<Box<dyn KeyValueStore>>,
}

impl ChatStore {
    pub fn new(backend: Box<dyn KeyValueStore>) -> Self {
        Self {
            backend: Some(backend),
        }
    }

    pub fn unavailable() -> Self {
        Self { backend: None }
    }

    /// File-backed store, or an unavailable one when no path is configured.
    pub fn open(path: Option<&Path>) -> Result<Self, StoreError> {
        match path {
            Some(path) => {
                info!("Chat store at {}", path.display());
                Ok(Self::new(Box::new(FileStore::open(path)?)))
            }
            None => {
                warn!("Chat store disabled; sessions will not be kept");
                Ok(Self::unavailable())
            }
        }
    }

    pub fn is_available(&self) -> bool {
        self.backend.is_some()
    }

    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        match &self.backend {
            Some(backend) => backend.get(key),
            None => Ok(None),
        }
    }

    fn write(&mut self, key: &str, value: String) -> Result<(), StoreError> {
        match &mut self.backend {
            Some(backend) => backend.set(key, value),
            None => Ok(()),
        }
    }

    fn delete(&mut self, key: &str) -> Result<(), StoreError> {
        match &mut self.backend {
            Some(backend) => backend.remove(key),
            None => Ok(()),
        }
    }

    /// Sessions in creation order. A corrupt collection reads as empty.
    pub fn list_sessions(&self) -> Result<Vec<ChatSession>, StoreError> {
        let Some(raw) = self.read(SESSIONS_KEY)? else {
            return Ok(Vec::new());
        };
        match serde_json::from_str::<Vec<ChatSession>>(&raw) {
            Ok(sessions) => Ok(sessions),
            Err(e) => {
                error!("Stored sessions are unreadable, treating as empty: {}", e);
                Ok(Vec::new())
            }
        }
    }

    fn save_sessions(&mut self, sessions: &[ChatSession]) -> Result<(), StoreError> {
        let json = serde_json::to_string(sessions)?;
        self.write(SESSIONS_KEY, json)
    }

    pub fn get_session(&self, id: &str) -> Result<Option<ChatSession>, StoreError> {
        Ok(self.list_sessions()?.into_iter().find(|s| s.id == id))
    }

    /// Appends a new empty session and makes it current.
    pub fn create_session(&mut self, title: Option<&str>) -> Result<ChatSession, StoreError> {
        let session = ChatSession {
            id: generate_id(),
            title: title
                .filter(|t| !t.trim().is_empty())
                .unwrap_or(DEFAULT_SESSION_TITLE)
                .to_string(),
            created_at: now_millis(),
            messages: Vec::new(),
        };

        let mut sessions = self.list_sessions()?;
        sessions.push(session.clone());
        self.save_sessions(&sessions)?;
        self.set_current_session_id(&session.id)?;

        info!("Created session {}", session.id);
        Ok(session)
    }

    /// Replaces the stored session with the same id. Returns false when
    /// there is none.
    pub fn update_session(&mut self, session: &ChatSession) -> Result<bool, StoreError> {
        let mut sessions = self.list_sessions()?;
        match sessions.iter_mut().find(|s| s.id == session.id) {
            Some(existing) => {
                *existing = session.clone();
                self.save_sessions(&sessions)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn rename_session(&mut self, id: &str, title: &str) -> Result<bool, StoreError> {
        match self.get_session(id)? {
            Some(mut session) => {
                session.title = title.to_string();
                self.update_session(&session)
            }
            None => Ok(false),
        }
    }

    /// The message is returned even when the session does not exist, in
    /// which case nothing is stored.
    pub fn append_message(
        &mut self,
        session_id: &str,
        role: Role,
        content: &str,
    ) -> Result<Message, StoreError> {
        let message = Message {
            id: generate_id(),
            role,
            content: content.to_string(),
            timestamp: now_millis(),
        };

        let mut sessions = self.list_sessions()?;
        match sessions.iter_mut().find(|s| s.id == session_id) {
            Some(session) => {
                session.messages.push(message.clone());
                self.save_sessions(&sessions)?;
            }
            None => warn!("Message for unknown session {} was not stored", session_id),
        }
        Ok(message)
    }

    /// Removes the session and its uploaded file. Deleting the current
    /// session moves the pointer to the first remaining one.
    pub fn delete_session(&mut self, id: &str) -> Result<(), StoreError> {
        let mut sessions = self.list_sessions()?;
        sessions.retain(|s| s.id != id);
        self.save_sessions(&sessions)?;

        if self.current_session_id()?.as_deref() == Some(id) {
            match sessions.first() {
                Some(next) => self.set_current_session_id(&next.id)?,
                None => self.clear_current_session_id()?,
            }
        }

        self.delete(&file_key(id))?;
        info!("Deleted session {}", id);
        Ok(())
    }

    pub fn current_session_id(&self) -> Result<Option<String>, StoreError> {
        self.read(CURRENT_SESSION_KEY)
    }

    pub fn set_current_session_id(&mut self, id: &str) -> Result<(), StoreError> {
        self.write(CURRENT_SESSION_KEY, id.to_string())
    }

    pub fn clear_current_session_id(&mut self) -> Result<(), StoreError> {
        self.delete(CURRENT_SESSION_KEY)
    }

    /// Stamps the file with the current time before storing it.
    pub fn save_uploaded_file(
        &mut self,
        session_id: &str,
        file: &FileInfo,
    ) -> Result<(), StoreError> {
        let stamped = FileInfo {
            timestamp: Some(now_millis()),
            ..file.clone()
        };
        let json = serde_json::to_string(&stamped)?;
        self.write(&file_key(session_id), json)
    }

    pub fn uploaded_file(&self, session_id: &str) -> Result<Option<FileInfo>, StoreError> {
        let Some(raw) = self.read(&file_key(session_id))? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(file) => Ok(Some(file)),
            Err(e) => {
                error!("Stored file for session {} is unreadable: {}", session_id, e);
                Ok(None)
            }
        }
    }
}
