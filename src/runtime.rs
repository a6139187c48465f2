//! Runtime for the conductor's trip
//!
//! Owns the single live [`SessionEngine`], stamps events with the wall clock
//! and the vehicle position, executes effects and fans notifications out to
//! admin stream subscribers.

mod executor;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use executor::{ConductorRuntime, ConductorSnapshot, RuntimeError};
pub use traits::*;

use serde_json::Value;

/// Events sent to admin stream clients
#[derive(Debug, Clone)]
pub enum SseEvent {
    /// First event on a new stream: the conductor state at subscription time
    Init { conductor: Value },
    /// Forwarded `NotifyClient` effect
    Notify { event_type: String, data: Value },
}

impl SseEvent {
    pub fn event_type(&self) -> &str {
        match self {
            SseEvent::Init { .. } => "init",
            SseEvent::Notify { event_type, .. } => event_type,
        }
    }

    pub fn data(&self) -> &Value {
        match self {
            SseEvent::Init { conductor } => conductor,
            SseEvent::Notify { data, .. } => data,
        }
    }
}
