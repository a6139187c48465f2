//! Trip session state types

use crate::catalog::{Catalog, Coordinates};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

// ============================================================================
// Passenger Events
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PassengerEventKind {
    Board,
    Alight,
}

/// One boarding or alighting, as logged by the conductor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PassengerEvent {
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    pub kind: PassengerEventKind,
    /// Onboard count right after this event
    pub onboard_count: u32,
    pub location: Coordinates,
}

// ============================================================================
// Session
// ============================================================================

/// One conductor's shift on one vehicle, route and turn.
///
/// The event log is append-only and every mutator is a no-op once the
/// session is closed. Fields are private so the closed record cannot be
/// edited after the fact; deserialization is the only other way in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    id: String,
    vehicle_id: String,
    route_id: String,
    turn: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    start_time: DateTime<Utc>,
    #[serde(
        default,
        with = "chrono::serde::ts_milliseconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    end_time: Option<DateTime<Utc>>,
    events: Vec<PassengerEvent>,
    total_collected: u64,
    closed: bool,
}

impl Session {
    pub fn new(
        id: impl Into<String>,
        vehicle_id: impl Into<String>,
        route_id: impl Into<String>,
        turn: impl Into<String>,
        start_time: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            vehicle_id: vehicle_id.into(),
            route_id: route_id.into(),
            turn: turn.into(),
            start_time,
            end_time: None,
            events: Vec::new(),
            total_collected: 0,
            closed: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn vehicle_id(&self) -> &str {
        &self.vehicle_id
    }

    pub fn route_id(&self) -> &str {
        &self.route_id
    }

    pub fn turn(&self) -> &str {
        &self.turn
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.end_time
    }

    pub fn events(&self) -> &[PassengerEvent] {
        &self.events
    }

    /// Frozen fare total; zero until the session is closed
    pub fn total_collected(&self) -> u64 {
        self.total_collected
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Passengers currently aboard, taken from the latest event
    pub fn onboard(&self) -> u32 {
        self.events.last().map_or(0, |e| e.onboard_count)
    }

    pub fn board_count(&self) -> usize {
        self.events
            .iter()
            .filter(|e| e.kind == PassengerEventKind::Board)
            .count()
    }

    /// Fare owed for the boardings so far. Alightings never reduce it.
    pub fn fare_total(&self, base_price: u64) -> u64 {
        (self.board_count() as u64).saturating_mul(base_price)
    }

    /// Append a boarding. Returns the new onboard count, or `None` when closed.
    pub fn board(&mut self, at: DateTime<Utc>, location: Coordinates) -> Option<u32> {
        if self.closed {
            return None;
        }
        let onboard = self.onboard() + 1;
        self.push(at, PassengerEventKind::Board, onboard, location);
        Some(onboard)
    }

    /// Append an alighting. Returns `None` when closed or nobody is aboard,
    /// in which case the log is untouched.
    pub fn alight(&mut self, at: DateTime<Utc>, location: Coordinates) -> Option<u32> {
        if self.closed {
            return None;
        }
        let onboard = self.onboard().checked_sub(1)?;
        self.push(at, PassengerEventKind::Alight, onboard, location);
        Some(onboard)
    }

    fn push(
        &mut self,
        timestamp: DateTime<Utc>,
        kind: PassengerEventKind,
        onboard_count: u32,
        location: Coordinates,
    ) {
        self.events.push(PassengerEvent {
            timestamp,
            kind,
            onboard_count,
            location,
        });
    }

    /// Freeze the session. Returns false if it was already closed.
    pub fn finalize(&mut self, base_price: u64, at: DateTime<Utc>) -> bool {
        if self.closed {
            return false;
        }
        self.total_collected = self.fare_total(base_price);
        self.end_time = Some(at);
        self.closed = true;
        true
    }
}

// ============================================================================
// Draft configuration
// ============================================================================

/// Configuration fields required before a shift can start
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigField {
    Vehicle,
    Route,
    Turn,
}

impl fmt::Display for ConfigField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigField::Vehicle => write!(f, "vehicle"),
            ConfigField::Route => write!(f, "route"),
            ConfigField::Turn => write!(f, "turn"),
        }
    }
}

/// A session that has an id but has not started yet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Draft {
    pub id: String,
    pub vehicle_id: String,
    pub route_id: String,
    pub turn: String,
}

impl Draft {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            vehicle_id: String::new(),
            route_id: String::new(),
            turn: String::new(),
        }
    }

    /// Fields that are still blank, in display order
    pub fn missing_fields(&self) -> Vec<ConfigField> {
        [
            (ConfigField::Vehicle, &self.vehicle_id),
            (ConfigField::Route, &self.route_id),
            (ConfigField::Turn, &self.turn),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| field)
        .collect()
    }

    pub fn into_session(self, start_time: DateTime<Utc>) -> Session {
        Session::new(
            self.id,
            self.vehicle_id,
            self.route_id,
            self.turn,
            start_time,
        )
    }
}

// ============================================================================
// Trip State
// ============================================================================

/// Phase of the conductor's shift
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum TripState {
    /// Picking vehicle, route and turn
    Configuring { draft: Draft },
    /// Logging passengers
    Operating { session: Session },
    /// Waiting for the conductor to confirm the close
    Closing { session: Session },
}

impl TripState {
    pub fn new(id: impl Into<String>) -> Self {
        TripState::Configuring {
            draft: Draft::new(id),
        }
    }

    pub fn phase_name(&self) -> &'static str {
        match self {
            TripState::Configuring { .. } => "configuring",
            TripState::Operating { .. } => "operating",
            TripState::Closing { .. } => "closing",
        }
    }

    pub fn session_id(&self) -> &str {
        match self {
            TripState::Configuring { draft } => &draft.id,
            TripState::Operating { session } | TripState::Closing { session } => session.id(),
        }
    }

    /// The started session, if any
    pub fn session(&self) -> Option<&Session> {
        match self {
            TripState::Configuring { .. } => None,
            TripState::Operating { session } | TripState::Closing { session } => Some(session),
        }
    }

    pub fn onboard(&self) -> u32 {
        self.session().map_or(0, Session::onboard)
    }
}

/// Figures shown to the conductor before confirming the close
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClosingSummary {
    pub session_id: String,
    pub route_id: String,
    pub passengers: usize,
    pub estimated_total: u64,
    pub duration_minutes: i64,
}

impl ClosingSummary {
    pub fn for_session(session: &Session, base_price: u64, now: DateTime<Utc>) -> Self {
        Self {
            session_id: session.id().to_string(),
            route_id: session.route_id().to_string(),
            passengers: session.board_count(),
            estimated_total: session.fare_total(base_price),
            duration_minutes: (now - session.start_time()).num_minutes().max(0),
        }
    }
}

/// Read-only inputs to the transition function
#[derive(Debug, Clone)]
pub struct TripContext {
    pub catalog: Arc<Catalog>,
}

impl TripContext {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self { catalog }
    }
}
