//! One-shot device geolocation.

use crate::error::GeoError;
use async_trait::async_trait;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

#[async_trait]
pub trait Geolocator: Send + Sync {
    /// Single position fix, or the reason there is none. No retry loop.
    async fn current_position(&self) -> Result<Coordinates, GeoError>;
}

/// Reports a configured position.
#[derive(Debug, Clone, Copy)]
pub struct FixedGeolocator(pub Coordinates);

#[async_trait]
impl Geolocator for FixedGeolocator {
    async fn current_position(&self) -> Result<Coordinates, GeoError> {
        Ok(self.0)
    }
}

/// Behaves like a device where the user refused location access.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeniedGeolocator;

#[async_trait]
impl Geolocator for DeniedGeolocator {
    async fn current_position(&self) -> Result<Coordinates, GeoError> {
        Err(GeoError::PermissionDenied)
    }
}
