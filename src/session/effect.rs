//! Effects produced by state transitions

use super::state::Session;
use serde_json::Value;

/// Effects to be executed before the new state is committed
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Append a closed session to the durable store
    PersistSession { session: Session },

    /// Notify connected admin clients
    NotifyClient { event_type: String, data: Value },
}

impl Effect {
    pub fn persist_session(session: Session) -> Self {
        Effect::PersistSession { session }
    }

    #[allow(clippy::needless_pass_by_value)] // data is consumed by json! macro
    pub fn notify_state_change(phase: &str, data: Value) -> Self {
        Effect::NotifyClient {
            event_type: "state_change".to_string(),
            data: serde_json::json!({
                "phase": phase,
                "stateData": data
            }),
        }
    }

    pub fn notify_session_closed(session: &Session) -> Self {
        Effect::NotifyClient {
            event_type: "session_closed".to_string(),
            data: serde_json::to_value(session).unwrap_or(Value::Null),
        }
    }
}
