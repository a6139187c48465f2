//! Geofence alerts
//!
//! No real geofencing exists; the shipped feed replays two fixed alerts so
//! the admin view has something to show. A live feed can be dropped in
//! behind [`AlertFeed`].

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertKind {
    /// Vehicle left its route corridor
    Deviation,
    UnauthorizedStop,
    Overcapacity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoFenceAlert {
    pub id: String,
    pub vehicle_plate: String,
    pub kind: AlertKind,
    pub severity: Severity,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    /// Human-readable place name
    pub location: String,
}

/// Source of geofence alerts for the admin view
#[async_trait]
pub trait AlertFeed: Send + Sync {
    async fn recent_alerts(&self, now: DateTime<Utc>) -> Vec<GeoFenceAlert>;
}

/// Fixed alerts timestamped relative to the request time
#[derive(Debug, Clone, Default)]
pub struct MockAlertFeed;

#[async_trait]
impl AlertFeed for MockAlertFeed {
    async fn recent_alerts(&self, now: DateTime<Utc>) -> Vec<GeoFenceAlert> {
        vec![
            GeoFenceAlert {
                id: "1".to_string(),
                vehicle_plate: "SQK-456".to_string(),
                kind: AlertKind::Deviation,
                severity: Severity::High,
                timestamp: now - Duration::minutes(15),
                location: "Vereda El Agrado, Pijao".to_string(),
            },
            GeoFenceAlert {
                id: "2".to_string(),
                vehicle_plate: "UVM-123".to_string(),
                kind: AlertKind::UnauthorizedStop,
                severity: Severity::Medium,
                timestamp: now - Duration::minutes(45),
                location: "Sector La Línea".to_string(),
            },
        ]
    }
}
