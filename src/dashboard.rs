//! Admin dashboard metrics folded from the session list

use crate::catalog::Catalog;
use crate::session::{PassengerEventKind, Session};
use chrono::{FixedOffset, Timelike};
use serde::Serialize;

/// First window of the service day; the fleet starts rolling at 05:00
const DAY_START_HOUR: u32 = 5;
const WINDOW_HOURS: u32 = 2;
const WINDOWS_PER_DAY: usize = (24 / WINDOW_HOURS) as usize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteTraffic {
    pub route_id: String,
    /// Destination name, used as the chart label
    pub label: String,
    pub passengers: usize,
    pub collected: u64,
}

/// Boardings that fell inside a two-hour window of local time
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HourlyBucket {
    /// Window start, `HH:00`
    pub label: String,
    pub boardings: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardMetrics {
    pub total_passengers: usize,
    pub total_collected: u64,
    /// Sessions in the list that have not been closed
    pub active_sessions: usize,
    pub closed_sessions: usize,
    pub routes: Vec<RouteTraffic>,
    pub hourly: Vec<HourlyBucket>,
}

/// Fold sessions into dashboard figures. Passenger counts are boardings.
pub fn summarize(sessions: &[Session], catalog: &Catalog, offset: FixedOffset) -> DashboardMetrics {
    let routes = catalog
        .routes
        .iter()
        .map(|route| {
            let on_route = sessions.iter().filter(|s| s.route_id() == route.id);
            let (passengers, collected) = on_route.fold((0, 0u64), |(p, c), s| {
                (p + s.board_count(), c.saturating_add(s.total_collected()))
            });
            RouteTraffic {
                route_id: route.id.clone(),
                label: route.short_name().to_string(),
                passengers,
                collected,
            }
        })
        .collect();

    let active_sessions = sessions.iter().filter(|s| !s.is_closed()).count();

    DashboardMetrics {
        total_passengers: sessions.iter().map(Session::board_count).sum(),
        total_collected: sessions
            .iter()
            .fold(0u64, |acc, s| acc.saturating_add(s.total_collected())),
        active_sessions,
        closed_sessions: sessions.len() - active_sessions,
        routes,
        hourly: hourly_boardings(sessions, offset),
    }
}

fn window_index(hour: u32) -> usize {
    (((hour + 24 - DAY_START_HOUR) % 24) / WINDOW_HOURS) as usize
}

fn hourly_boardings(sessions: &[Session], offset: FixedOffset) -> Vec<HourlyBucket> {
    let mut counts = [0usize; WINDOWS_PER_DAY];
    for event in sessions
        .iter()
        .flat_map(Session::events)
        .filter(|e| e.kind == PassengerEventKind::Board)
    {
        let hour = event.timestamp.with_timezone(&offset).hour();
        counts[window_index(hour)] += 1;
    }

    counts
        .iter()
        .zip(0u32..)
        .map(|(&boardings, i)| HourlyBucket {
            label: format!("{:02}:00", (DAY_START_HOUR + i * WINDOW_HOURS) % 24),
            boardings,
        })
        .collect()
}
