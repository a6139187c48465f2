//! Events that can occur during a shift

use crate::catalog::Coordinates;
use chrono::{DateTime, Utc};

/// Events that trigger state transitions.
///
/// Clock readings, coordinates and fresh ids are carried in the event so
/// the transition function stays pure.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    // Configuration
    SetVehicle {
        vehicle_id: String,
    },
    SetRoute {
        route_id: String,
    },
    SetTurn {
        turn: String,
    },
    Start {
        at: DateTime<Utc>,
    },

    // Operation
    Board {
        at: DateTime<Utc>,
        location: Coordinates,
    },
    Alight {
        at: DateTime<Utc>,
        location: Coordinates,
    },
    Finish,

    // Close
    ConfirmClose {
        at: DateTime<Utc>,
        /// Id for the draft that replaces the closed session
        next_id: String,
    },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::SetVehicle { .. } => "set_vehicle",
            Event::SetRoute { .. } => "set_route",
            Event::SetTurn { .. } => "set_turn",
            Event::Start { .. } => "start",
            Event::Board { .. } => "board",
            Event::Alight { .. } => "alight",
            Event::Finish => "finish",
            Event::ConfirmClose { .. } => "confirm_close",
        }
    }
}
