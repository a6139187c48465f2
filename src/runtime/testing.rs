//! Mock implementations for testing
//!
//! These mocks let the runtime, insights and API be exercised without real I/O.

use super::traits::SessionStore;
use crate::llm::{ContentBlock, LlmError, LlmRequest, LlmResponse, LlmService, Usage};
use crate::session::Session;
use crate::store::DbError;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

// ============================================================================
// Mock LLM Service
// ============================================================================

/// Mock LLM service that returns queued responses
pub struct MockLlmService {
    responses: Mutex<VecDeque<Result<LlmResponse, LlmError>>>,
    model_id: String,
    /// Record of all requests made
    pub requests: Mutex<Vec<LlmRequest>>,
}

#[allow(dead_code)]
impl MockLlmService {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            model_id: model_id.into(),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful response
    pub fn queue_response(&self, response: LlmResponse) {
        self.responses.lock().unwrap().push_back(Ok(response));
    }

    /// Queue a single-block text response
    pub fn queue_text(&self, text: &str) {
        self.queue_response(LlmResponse {
            content: vec![ContentBlock::text(text)],
            end_turn: true,
            usage: Usage::default(),
        });
    }

    /// Queue an error response
    pub fn queue_error(&self, error: LlmError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    /// Get recorded requests
    pub fn recorded_requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmService for MockLlmService {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::network("No mock response queued")))
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

// ============================================================================
// In-Memory Session Store
// ============================================================================

/// Session store backed by a vector, with the same acceptance rules as the
/// SQLite store
#[derive(Default)]
pub struct MemoryStore {
    sessions: Mutex<Vec<Session>>,
    fail_next: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next append fail as if the disk were gone
    pub fn fail_next_append(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    pub fn sessions(&self) -> Vec<Session> {
        self.sessions.lock().unwrap().clone()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn append(&self, session: &Session) -> Result<(), DbError> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(DbError::Sqlite(rusqlite::Error::InvalidPath(
                "/unavailable".into(),
            )));
        }
        if !session.is_closed() {
            return Err(DbError::NotFinalized(session.id().to_string()));
        }

        let mut sessions = self.sessions.lock().unwrap();
        if sessions.iter().any(|s| s.id() == session.id()) {
            return Err(DbError::DuplicateSession(session.id().to_string()));
        }
        sessions.push(session.clone());
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<Session>, DbError> {
        Ok(self.sessions())
    }
}
