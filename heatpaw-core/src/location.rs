//! Device location collaborator.

use async_trait::async_trait;

use crate::{error::SourceError, model::Coordinates};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Granted,
    Denied,
    /// Not asked yet; a request may still grant it.
    Undetermined,
}

#[async_trait]
pub trait LocationProvider: Send + Sync {
    async fn permission_status(&self) -> Permission;

    /// Ask for permission. Returns the resulting status.
    async fn request_permission(&self) -> Permission;

    async fn current_location(&self) -> Result<Coordinates, SourceError>;
}

/// A fixed position, e.g. from configuration. Permission is always granted.
#[derive(Debug, Clone, Copy)]
pub struct FixedLocation {
    coords: Coordinates,
}

impl FixedLocation {
    pub fn new(coords: Coordinates) -> Self {
        Self { coords }
    }
}

#[async_trait]
impl LocationProvider for FixedLocation {
    async fn permission_status(&self) -> Permission {
        Permission::Granted
    }

    async fn request_permission(&self) -> Permission {
        Permission::Granted
    }

    async fn current_location(&self) -> Result<Coordinates, SourceError> {
        Ok(self.coords)
    }
}

/// No location services: every permission request is declined.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLocation;

#[async_trait]
impl LocationProvider for NoLocation {
    async fn permission_status(&self) -> Permission {
        Permission::Denied
    }

    async fn request_permission(&self) -> Permission {
        Permission::Denied
    }

    async fn current_location(&self) -> Result<Coordinates, SourceError> {
        Err(SourceError::PermissionDenied)
    }
}

/// Location provider for the given optional coordinates.
pub fn location_from(coords: Option<Coordinates>) -> Box<dyn LocationProvider> {
    match coords {
        Some(coords) => Box::new(FixedLocation::new(coords)),
        None => Box::new(NoLocation),
    }
}
