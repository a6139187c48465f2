//! Trait abstractions for runtime I/O
//!
//! These traits let the runtime run against in-memory fakes in tests.

use crate::catalog::Coordinates;
use crate::session::Session;
use crate::store::DbError;
use async_trait::async_trait;
use std::sync::Arc;

/// Append-only storage for closed sessions
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Store a finalized session. Fails on duplicates and open sessions.
    async fn append(&self, session: &Session) -> Result<(), DbError>;

    /// Every stored session, oldest first
    async fn load_all(&self) -> Result<Vec<Session>, DbError>;
}

/// Where the vehicle is right now
pub trait LocationSource: Send + Sync {
    fn current(&self) -> Coordinates;
}

/// Location source that always reports the same point.
///
/// Used until a GPS feed exists; the default is the fleet base.
#[derive(Debug, Clone, Copy)]
pub struct FixedLocation(pub Coordinates);

impl Default for FixedLocation {
    fn default() -> Self {
        Self(Coordinates::new(4.53, -75.68))
    }
}

impl LocationSource for FixedLocation {
    fn current(&self) -> Coordinates {
        self.0
    }
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: SessionStore + ?Sized> SessionStore for Arc<T> {
    async fn append(&self, session: &Session) -> Result<(), DbError> {
        (**self).append(session).await
    }

    async fn load_all(&self) -> Result<Vec<Session>, DbError> {
        (**self).load_all().await
    }
}

impl<T: LocationSource + ?Sized> LocationSource for Arc<T> {
    fn current(&self) -> Coordinates {
        (**self).current()
    }
}
