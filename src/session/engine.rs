//! Owning wrapper around the transition function

use super::state::ClosingSummary;
use super::{transition, Effect, Event, TransitionError, TransitionResult, TripContext, TripState};
use crate::catalog::Coordinates;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Outcome of a board or alight request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub onboard: u32,
    /// False when the request was dropped (alight with nobody aboard)
    pub appended: bool,
}

/// Single-owner engine for one conductor's shifts.
///
/// `step` computes a transition without committing it so the caller can run
/// effects first; the typed helpers below step and commit in one go.
#[derive(Debug)]
pub struct SessionEngine {
    state: TripState,
    context: TripContext,
}

impl SessionEngine {
    pub fn new(context: TripContext, draft_id: impl Into<String>) -> Self {
        Self {
            state: TripState::new(draft_id),
            context,
        }
    }

    pub fn state(&self) -> &TripState {
        &self.state
    }

    pub fn context(&self) -> &TripContext {
        &self.context
    }

    pub fn onboard(&self) -> u32 {
        self.state.onboard()
    }

    pub fn event_count(&self) -> usize {
        self.state.session().map_or(0, |s| s.events().len())
    }

    pub fn step(&self, event: Event) -> Result<TransitionResult, TransitionError> {
        transition(&self.state, &self.context, event)
    }

    pub fn commit(&mut self, state: TripState) {
        self.state = state;
    }

    /// Step and commit, handing back the effects for the caller to run
    pub fn apply(&mut self, event: Event) -> Result<Vec<Effect>, TransitionError> {
        let result = self.step(event)?;
        self.commit(result.new_state);
        Ok(result.effects)
    }

    pub fn record_board(
        &mut self,
        at: DateTime<Utc>,
        location: Coordinates,
    ) -> Result<Tally, TransitionError> {
        self.record(Event::Board { at, location })
    }

    pub fn record_alight(
        &mut self,
        at: DateTime<Utc>,
        location: Coordinates,
    ) -> Result<Tally, TransitionError> {
        self.record(Event::Alight { at, location })
    }

    fn record(&mut self, event: Event) -> Result<Tally, TransitionError> {
        let before = self.event_count();
        self.apply(event)?;
        Ok(self.tally_since(before))
    }

    /// Tally relative to an event count taken before a transition
    pub fn tally_since(&self, events_before: usize) -> Tally {
        Tally {
            onboard: self.onboard(),
            appended: self.event_count() > events_before,
        }
    }

    /// Preview of the close; only available while closing
    pub fn closing_summary(&self, now: DateTime<Utc>) -> Option<ClosingSummary> {
        match &self.state {
            TripState::Closing { session } => Some(ClosingSummary::for_session(
                session,
                self.context.catalog.fare_for(session.route_id()),
                now,
            )),
            _ => None,
        }
    }
}

/// Typed shortcuts for driving the engine in tests
#[cfg(test)]
impl SessionEngine {
    pub fn set_vehicle(&mut self, vehicle_id: impl Into<String>) -> Result<(), TransitionError> {
        self.apply(Event::SetVehicle {
            vehicle_id: vehicle_id.into(),
        })
        .map(drop)
    }

    pub fn set_route(&mut self, route_id: impl Into<String>) -> Result<(), TransitionError> {
        self.apply(Event::SetRoute {
            route_id: route_id.into(),
        })
        .map(drop)
    }

    pub fn set_turn(&mut self, turn: impl Into<String>) -> Result<(), TransitionError> {
        self.apply(Event::SetTurn { turn: turn.into() }).map(drop)
    }

    pub fn start(&mut self, at: DateTime<Utc>) -> Result<(), TransitionError> {
        self.apply(Event::Start { at }).map(drop)
    }

    pub fn finish(&mut self) -> Result<(), TransitionError> {
        self.apply(Event::Finish).map(drop)
    }

    /// Finalize the current session and start a fresh draft.
    ///
    /// Returns the closed record; persisting it is the caller's job.
    pub fn confirm_close(
        &mut self,
        at: DateTime<Utc>,
        next_id: impl Into<String>,
    ) -> Result<super::Session, TransitionError> {
        let effects = self.apply(Event::ConfirmClose {
            at,
            next_id: next_id.into(),
        })?;
        Ok(effects
            .into_iter()
            .find_map(|effect| match effect {
                Effect::PersistSession { session } => Some(session),
                Effect::NotifyClient { .. } => None,
            })
            .unwrap_or_else(|| unreachable!("confirm_close always persists")))
    }
}
