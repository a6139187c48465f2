//! Static reference data: routes, vehicles and shift turns
//!
//! The built-in catalog carries the Quindío fleet. A JSON file with the same
//! shape can replace it at startup.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// A latitude/longitude pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// A scheduled route with its flat per-passenger fare
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Fare in minor currency units
    pub base_price: u64,
}

impl Route {
    /// Destination half of an `Origin ↔ Destination` name, used as chart label
    pub fn short_name(&self) -> &str {
        self.name
            .split_once('↔')
            .map_or(self.name.as_str(), |(_, dest)| dest)
            .trim()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: String,
    pub plate: String,
    pub model: String,
}

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Failed to read catalog file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid catalog file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Catalog has no {0}")]
    Empty(&'static str),
}

/// Read-only reference catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    pub routes: Vec<Route>,
    pub vehicles: Vec<Vehicle>,
    pub turns: Vec<String>,
}

impl Catalog {
    /// The fleet shipped with the service
    pub fn builtin() -> Self {
        let route = |id: &str, name: &str, description: &str, base_price: u64| Route {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            base_price,
        };
        let vehicle = |id: &str, plate: &str, model: &str| Vehicle {
            id: id.to_string(),
            plate: plate.to_string(),
            model: model.to_string(),
        };

        Self {
            routes: vec![
                route("1", "Armenia ↔ Génova", "Ruta larga / Montaña", 12_000),
                route("2", "Armenia ↔ Pijao", "Ruta Montaña", 10_000),
                route("3", "Armenia ↔ Córdoba", "Ruta Montaña", 8_500),
                route("4", "Armenia ↔ Caicedonia", "Valle del Cauca", 11_000),
                route("5", "Armenia ↔ Buenavista", "Ruta Corta / Paisajística", 7_000),
            ],
            vehicles: vec![
                vehicle("v1", "SQK-456", "NKR Turbo"),
                vehicle("v2", "UVM-123", "Buseta Urbana"),
                vehicle("v3", "TTR-908", "Colectivo"),
            ],
            turns: vec![
                "Mañana (5:00 - 13:00)".to_string(),
                "Tarde (13:00 - 21:00)".to_string(),
                "Noche (21:00 - 5:00)".to_string(),
            ],
        }
    }

    /// Load a catalog from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, CatalogError> {
        let catalog: Catalog = serde_json::from_str(raw)?;
        if catalog.routes.is_empty() {
            return Err(CatalogError::Empty("routes"));
        }
        if catalog.vehicles.is_empty() {
            return Err(CatalogError::Empty("vehicles"));
        }
        if catalog.turns.is_empty() {
            return Err(CatalogError::Empty("turns"));
        }
        Ok(catalog)
    }

    pub fn route(&self, id: &str) -> Option<&Route> {
        self.routes.iter().find(|r| r.id == id)
    }

    pub fn vehicle(&self, id: &str) -> Option<&Vehicle> {
        self.vehicles.iter().find(|v| v.id == id)
    }

    pub fn has_turn(&self, label: &str) -> bool {
        self.turns.iter().any(|t| t == label)
    }

    /// Base fare for a route, zero when the route is unknown
    pub fn fare_for(&self, route_id: &str) -> u64 {
        self.route(route_id).map_or(0, |r| r.base_price)
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}
