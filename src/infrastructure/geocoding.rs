//! Reverse geocoding collaborator
//!
//! The aggregator only needs `reverse_lookup`; the platform geocoder sits
//! behind the [`Geocoder`] trait.

use crate::domain::error::LookupError;
use async_trait::async_trait;

/// Address parts returned by a reverse lookup
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Placemark {
    pub locality: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
}

impl Placemark {
    /// Comma-joined non-empty parts, or `None` if every part is missing
    pub fn display(&self) -> Option<String> {
        let parts: Vec<&str> = [&self.locality, &self.region, &self.country]
            .into_iter()
            .filter_map(|p| p.as_deref())
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();

        if parts.is_empty() {
            None
        } else {
            Some(parts.join(", "))
        }
    }
}

#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Resolve a coordinate pair. `Ok(None)` means the lookup succeeded but
    /// found nothing.
    async fn reverse_lookup(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<Option<Placemark>, LookupError>;
}

/// Offline geocoder that describes the coordinate pair itself
#[derive(Debug, Clone, Default)]
pub struct CoordinateGeocoder;

impl CoordinateGeocoder {
    pub fn format(latitude: f64, longitude: f64) -> String {
        let ns = if latitude >= 0.0 { 'N' } else { 'S' };
        let ew = if longitude >= 0.0 { 'E' } else { 'W' };
        format!(
            "{:.4}°{}, {:.4}°{}",
            latitude.abs(),
            ns,
            longitude.abs(),
            ew
        )
    }
}

#[async_trait]
impl Geocoder for CoordinateGeocoder {
    async fn reverse_lookup(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<Option<Placemark>, LookupError> {
        if !latitude.is_finite() || !longitude.is_finite() {
            return Err(LookupError::Failed("non-finite coordinates".to_string()));
        }

        Ok(Some(Placemark {
            locality: Some(Self::format(latitude, longitude)),
            ..Default::default()
        }))
    }
}
