//! Trip session state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions:
//! configure, operate, close.

mod effect;
mod engine;
pub mod event;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::Effect;
pub use engine::{SessionEngine, Tally};
pub use event::Event;
pub use state::{ClosingSummary, PassengerEventKind, Session, TripContext, TripState};
pub use transition::{transition, TransitionError, TransitionResult};
