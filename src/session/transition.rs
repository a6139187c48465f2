//! Pure state transition function

use super::state::ConfigField;
use super::{Effect, Event, TripContext, TripState};
use serde_json::json;
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: TripState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: TripState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("Missing configuration: {}", join_fields(.0))]
    MissingConfiguration(Vec<ConfigField>),
    #[error("Invalid transition: {event} is not allowed while {phase}")]
    InvalidTransition {
        event: &'static str,
        phase: &'static str,
    },
}

fn join_fields(fields: &[ConfigField]) -> String {
    fields
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Pure transition function.
///
/// Given the same inputs it always produces the same outputs. Rejected
/// events leave the caller's state untouched since nothing is committed.
pub fn transition(
    state: &TripState,
    context: &TripContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match (state, event) {
        // ============================================================
        // Configuration
        // ============================================================
        (TripState::Configuring { draft }, Event::SetVehicle { vehicle_id }) => {
            let mut draft = draft.clone();
            draft.vehicle_id = vehicle_id;
            Ok(TransitionResult::new(TripState::Configuring { draft }))
        }

        (TripState::Configuring { draft }, Event::SetRoute { route_id }) => {
            let mut draft = draft.clone();
            draft.route_id = route_id;
            Ok(TransitionResult::new(TripState::Configuring { draft }))
        }

        (TripState::Configuring { draft }, Event::SetTurn { turn }) => {
            let mut draft = draft.clone();
            draft.turn = turn;
            Ok(TransitionResult::new(TripState::Configuring { draft }))
        }

        (TripState::Configuring { draft }, Event::Start { at }) => {
            let missing = draft.missing_fields();
            if !missing.is_empty() {
                return Err(TransitionError::MissingConfiguration(missing));
            }

            let session = draft.clone().into_session(at);
            let data = json!({
                "sessionId": session.id(),
                "vehicleId": session.vehicle_id(),
                "routeId": session.route_id(),
            });
            Ok(TransitionResult::new(TripState::Operating { session })
                .with_effect(Effect::notify_state_change("operating", data)))
        }

        // ============================================================
        // Operation
        // ============================================================
        (TripState::Operating { session }, Event::Board { at, location }) => {
            let mut session = session.clone();
            session.board(at, location);
            Ok(TransitionResult::new(TripState::Operating { session }))
        }

        // Alight with nobody aboard is dropped without an event
        (TripState::Operating { session }, Event::Alight { .. }) if session.onboard() == 0 => {
            Ok(TransitionResult::new(state.clone()))
        }

        (TripState::Operating { session }, Event::Alight { at, location }) => {
            let mut session = session.clone();
            session.alight(at, location);
            Ok(TransitionResult::new(TripState::Operating { session }))
        }

        (TripState::Operating { session }, Event::Finish) => {
            let data = json!({
                "sessionId": session.id(),
                "passengers": session.board_count(),
            });
            Ok(TransitionResult::new(TripState::Closing {
                session: session.clone(),
            })
            .with_effect(Effect::notify_state_change("closing", data)))
        }

        // ============================================================
        // Close
        // ============================================================
        (TripState::Closing { session }, Event::ConfirmClose { at, next_id }) => {
            let mut session = session.clone();
            session.finalize(context.catalog.fare_for(session.route_id()), at);

            // Persist before notifying so listeners only hear about stored sessions
            let notify = Effect::notify_session_closed(&session);
            Ok(TransitionResult::new(TripState::new(next_id))
                .with_effect(Effect::persist_session(session))
                .with_effect(notify))
        }

        // ============================================================
        // Everything else is out of phase
        // ============================================================
        (state, event) => Err(TransitionError::InvalidTransition {
            event: event.name(),
            phase: state.phase_name(),
        }),
    }
}
