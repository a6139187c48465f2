//! Conductor runtime: one live trip, serialized behind a lock

use super::traits::{LocationSource, SessionStore};
use super::SseEvent;
use crate::session::{
    transition, ClosingSummary, Effect, Event, Session, SessionEngine, Tally, TransitionError,
    TripContext, TripState,
};
use crate::store::DbError;
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, Mutex};

const BROADCAST_CAPACITY: usize = 64;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error(transparent)]
    Store(#[from] DbError),
}

/// Engine state plus the derived onboard count, as reported to clients
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConductorSnapshot {
    #[serde(flatten)]
    pub state: TripState,
    pub onboard: u32,
}

impl ConductorSnapshot {
    fn of(engine: &SessionEngine) -> Self {
        Self {
            state: engine.state().clone(),
            onboard: engine.onboard(),
        }
    }
}

/// Drives the conductor's session engine.
///
/// Every operation holds the engine lock for its whole duration, including
/// effect execution, so operations run to completion one at a time. Effects
/// run before the new state is committed: a failed store write leaves the
/// engine exactly where it was.
pub struct ConductorRuntime {
    engine: Mutex<SessionEngine>,
    store: Arc<dyn SessionStore>,
    location: Arc<dyn LocationSource>,
    broadcast_tx: broadcast::Sender<SseEvent>,
}

impl ConductorRuntime {
    pub fn new(
        context: TripContext,
        store: Arc<dyn SessionStore>,
        location: Arc<dyn LocationSource>,
    ) -> Self {
        let (broadcast_tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            engine: Mutex::new(SessionEngine::new(context, new_session_id())),
            store,
            location,
            broadcast_tx,
        }
    }

    /// Subscribe to notifications for the admin stream
    pub fn subscribe(&self) -> broadcast::Receiver<SseEvent> {
        self.broadcast_tx.subscribe()
    }

    pub async fn snapshot(&self) -> ConductorSnapshot {
        ConductorSnapshot::of(&*self.engine.lock().await)
    }

    /// Set any subset of the draft fields.
    ///
    /// All given fields are applied or none are. Only valid while configuring,
    /// even when no field is given.
    pub async fn configure(
        &self,
        vehicle_id: Option<String>,
        route_id: Option<String>,
        turn: Option<String>,
    ) -> Result<ConductorSnapshot, RuntimeError> {
        let mut engine = self.engine.lock().await;

        let events: Vec<Event> = [
            vehicle_id.map(|vehicle_id| Event::SetVehicle { vehicle_id }),
            route_id.map(|route_id| Event::SetRoute { route_id }),
            turn.map(|turn| Event::SetTurn { turn }),
        ]
        .into_iter()
        .flatten()
        .collect();

        if events.is_empty() && !matches!(engine.state(), TripState::Configuring { .. }) {
            return Err(TransitionError::InvalidTransition {
                event: "configure",
                phase: engine.state().phase_name(),
            }
            .into());
        }

        let mut state = engine.state().clone();
        for event in events {
            state = transition(&state, engine.context(), event)?.new_state;
        }
        engine.commit(state);

        Ok(ConductorSnapshot::of(&engine))
    }

    pub async fn start(&self) -> Result<ConductorSnapshot, RuntimeError> {
        let mut engine = self.engine.lock().await;
        self.dispatch(&mut engine, Event::Start { at: Utc::now() })
            .await?;

        if let Some(session) = engine.state().session() {
            let catalog = &engine.context().catalog;
            if catalog.route(session.route_id()).is_none() {
                tracing::warn!(
                    session_id = %session.id(),
                    route_id = %session.route_id(),
                    "Session started on a route missing from the catalog; it will collect nothing"
                );
            }
            if catalog.vehicle(session.vehicle_id()).is_none() || !catalog.has_turn(session.turn()) {
                tracing::warn!(
                    session_id = %session.id(),
                    vehicle_id = %session.vehicle_id(),
                    turn = %session.turn(),
                    "Session started with a vehicle or turn missing from the catalog"
                );
            }
            tracing::info!(
                session_id = %session.id(),
                vehicle_id = %session.vehicle_id(),
                route_id = %session.route_id(),
                turn = %session.turn(),
                "Session started"
            );
        }

        Ok(ConductorSnapshot::of(&engine))
    }

    // Boarding and alighting produce no effects, so they commit directly

    pub async fn record_board(&self) -> Result<Tally, RuntimeError> {
        let mut engine = self.engine.lock().await;
        Ok(engine.record_board(Utc::now(), self.location.current())?)
    }

    pub async fn record_alight(&self) -> Result<Tally, RuntimeError> {
        let mut engine = self.engine.lock().await;
        let tally = engine.record_alight(Utc::now(), self.location.current())?;
        if !tally.appended {
            tracing::debug!("Alight ignored with nobody aboard");
        }
        Ok(tally)
    }

    pub async fn finish(&self) -> Result<ClosingSummary, RuntimeError> {
        let mut engine = self.engine.lock().await;
        self.dispatch(&mut engine, Event::Finish).await?;
        Self::summary_of(&engine)
    }

    /// Preview of the pending close
    pub async fn closing_summary(&self) -> Result<ClosingSummary, RuntimeError> {
        Self::summary_of(&*self.engine.lock().await)
    }

    fn summary_of(engine: &SessionEngine) -> Result<ClosingSummary, RuntimeError> {
        engine.closing_summary(Utc::now()).ok_or_else(|| {
            RuntimeError::Transition(TransitionError::InvalidTransition {
                event: "closing_summary",
                phase: engine.state().phase_name(),
            })
        })
    }

    /// Finalize, store and announce the session, then open a fresh draft
    pub async fn confirm_close(&self) -> Result<Session, RuntimeError> {
        let mut engine = self.engine.lock().await;
        let event = Event::ConfirmClose {
            at: Utc::now(),
            next_id: new_session_id(),
        };
        let effects = self.dispatch(&mut engine, event).await?;

        let session = effects
            .into_iter()
            .find_map(|effect| match effect {
                Effect::PersistSession { session } => Some(session),
                Effect::NotifyClient { .. } => None,
            })
            .unwrap_or_else(|| unreachable!("confirm_close always persists"));

        tracing::info!(
            session_id = %session.id(),
            passengers = session.board_count(),
            total_collected = session.total_collected(),
            next_draft = %engine.state().session_id(),
            "Session closed"
        );
        Ok(session)
    }

    /// Stored sessions followed by the live one, if a trip is under way
    pub async fn sessions(&self) -> Result<Vec<Session>, DbError> {
        let engine = self.engine.lock().await;
        let mut sessions = self.store.load_all().await?;
        sessions.extend(engine.state().session().cloned());
        Ok(sessions)
    }

    /// Compute the transition, run its effects, then commit
    async fn dispatch(
        &self,
        engine: &mut SessionEngine,
        event: Event,
    ) -> Result<Vec<Effect>, RuntimeError> {
        let name = event.name();
        let result = engine.step(event)?;

        for effect in &result.effects {
            if let Err(e) = self.execute_effect(effect).await {
                tracing::error!(
                    event = name,
                    session_id = %engine.state().session_id(),
                    error = %e,
                    "Effect failed; state not committed"
                );
                return Err(e.into());
            }
        }

        engine.commit(result.new_state);
        tracing::debug!(event = name, phase = engine.state().phase_name(), "Transition committed");
        Ok(result.effects)
    }

    async fn execute_effect(&self, effect: &Effect) -> Result<(), DbError> {
        match effect {
            Effect::PersistSession { session } => self.store.append(session).await,
            Effect::NotifyClient { event_type, data } => {
                // No subscribers is fine
                let _ = self.broadcast_tx.send(SseEvent::Notify {
                    event_type: event_type.clone(),
                    data: data.clone(),
                });
                Ok(())
            }
        }
    }
}

fn new_session_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, Coordinates};
    use crate::runtime::testing::MemoryStore;
    use crate::runtime::FixedLocation;

    fn runtime_with(store: Arc<MemoryStore>) -> ConductorRuntime {
        ConductorRuntime::new(
            TripContext::new(Arc::new(Catalog::builtin())),
            store,
            Arc::new(FixedLocation(Coordinates::new(4.55, -75.66))),
        )
    }

    async fn configured(runtime: &ConductorRuntime) {
        runtime
            .configure(
                Some("v1".to_string()),
                Some("2".to_string()),
                Some("Mañana (5:00 - 13:00)".to_string()),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_full_trip_is_stored_and_announced() {
        let store = Arc::new(MemoryStore::new());
        let runtime = runtime_with(store.clone());
        let mut rx = runtime.subscribe();

        configured(&runtime).await;
        runtime.start().await.unwrap();
        for _ in 0..5 {
            runtime.record_board().await.unwrap();
        }
        for _ in 0..2 {
            runtime.record_alight().await.unwrap();
        }
        let tally = runtime.record_board().await.unwrap();
        assert_eq!(
            tally,
            Tally {
                onboard: 4,
                appended: true
            }
        );

        let summary = runtime.finish().await.unwrap();
        assert_eq!(summary.passengers, 6);
        assert_eq!(summary.estimated_total, 60_000);

        let session = runtime.confirm_close().await.unwrap();
        assert_eq!(session.total_collected(), 60_000);
        assert_eq!(session.events().len(), 8);
        assert!(session
            .events()
            .iter()
            .all(|e| e.location == Coordinates::new(4.55, -75.66)));
        assert_eq!(store.sessions(), vec![session.clone()]);

        let snapshot = runtime.snapshot().await;
        assert!(matches!(snapshot.state, TripState::Configuring { .. }));
        assert_ne!(snapshot.state.session_id(), session.id());

        let mut kinds = Vec::new();
        while let Ok(event) = rx.try_recv() {
            kinds.push(event.event_type().to_string());
        }
        assert_eq!(kinds, vec!["state_change", "state_change", "session_closed"]);
    }

    #[tokio::test]
    async fn test_store_failure_keeps_session_closing() {
        let store = Arc::new(MemoryStore::new());
        let runtime = runtime_with(store.clone());
        let mut rx = runtime.subscribe();

        configured(&runtime).await;
        runtime.start().await.unwrap();
        runtime.record_board().await.unwrap();
        runtime.finish().await.unwrap();
        while rx.try_recv().is_ok() {}

        store.fail_next_append();
        let err = runtime.confirm_close().await.unwrap_err();
        assert!(matches!(err, RuntimeError::Store(_)));
        assert!(store.sessions().is_empty());
        assert!(rx.try_recv().is_err(), "nothing announced on failure");

        let snapshot = runtime.snapshot().await;
        assert!(matches!(snapshot.state, TripState::Closing { .. }));

        // Retry succeeds once the store recovers
        let session = runtime.confirm_close().await.unwrap();
        assert_eq!(session.total_collected(), 10_000);
        assert_eq!(store.sessions().len(), 1);
    }

    #[tokio::test]
    async fn test_configure_is_all_or_nothing() {
        let runtime = runtime_with(Arc::new(MemoryStore::new()));
        configured(&runtime).await;
        runtime.start().await.unwrap();

        let err = runtime
            .configure(None, Some("3".to_string()), None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::Transition(TransitionError::InvalidTransition {
                event: "set_route",
                phase: "operating"
            })
        ));
        let snapshot = runtime.snapshot().await;
        assert_eq!(snapshot.state.session().unwrap().route_id(), "2");
    }

    #[tokio::test]
    async fn test_empty_configure_follows_phase() {
        let runtime = runtime_with(Arc::new(MemoryStore::new()));
        let snapshot = runtime.configure(None, None, None).await.unwrap();
        assert!(matches!(snapshot.state, TripState::Configuring { .. }));

        configured(&runtime).await;
        runtime.start().await.unwrap();
        let err = runtime.configure(None, None, None).await.unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::Transition(TransitionError::InvalidTransition {
                event: "configure",
                phase: "operating"
            })
        ));

        runtime.finish().await.unwrap();
        assert!(runtime.configure(None, None, None).await.is_err());
    }

    #[tokio::test]
    async fn test_start_names_missing_fields() {
        let runtime = runtime_with(Arc::new(MemoryStore::new()));
        runtime
            .configure(Some("v1".to_string()), None, None)
            .await
            .unwrap();
        let err = runtime.start().await.unwrap_err();
        assert_eq!(err.to_string(), "Missing configuration: route, turn");
    }

    #[tokio::test]
    async fn test_alight_with_nobody_aboard_is_not_appended() {
        let runtime = runtime_with(Arc::new(MemoryStore::new()));
        configured(&runtime).await;
        runtime.start().await.unwrap();

        let tally = runtime.record_alight().await.unwrap();
        assert_eq!(
            tally,
            Tally {
                onboard: 0,
                appended: false
            }
        );
    }

    #[tokio::test]
    async fn test_closing_summary_only_while_closing() {
        let runtime = runtime_with(Arc::new(MemoryStore::new()));
        assert!(runtime.closing_summary().await.is_err());

        configured(&runtime).await;
        runtime.start().await.unwrap();
        runtime.record_board().await.unwrap();
        runtime.finish().await.unwrap();

        let summary = runtime.closing_summary().await.unwrap();
        assert_eq!(summary.passengers, 1);
        assert_eq!(summary.route_id, "2");
    }

    #[tokio::test]
    async fn test_sessions_include_live_trip() {
        let store = Arc::new(MemoryStore::new());
        let runtime = runtime_with(store);
        assert!(runtime.sessions().await.unwrap().is_empty());

        configured(&runtime).await;
        runtime.start().await.unwrap();
        runtime.record_board().await.unwrap();
        runtime.finish().await.unwrap();
        runtime.confirm_close().await.unwrap();

        configured(&runtime).await;
        runtime.start().await.unwrap();

        let sessions = runtime.sessions().await.unwrap();
        assert_eq!(sessions.len(), 2);
        assert!(sessions[0].is_closed());
        assert!(!sessions[1].is_closed());
    }
}
