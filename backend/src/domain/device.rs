//! Field devices and their location samples.

use std::fmt;

use chrono::{DateTime, Utc};

use super::AccountId;

/// Validation errors for device values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeviceValidationError {
    /// The external identifier is empty once trimmed.
    #[error("device id must not be empty")]
    EmptyDeviceId,
    /// Latitude outside `[-90, 90]` or not finite.
    #[error("latitude {0} is out of range")]
    LatitudeOutOfRange(String),
    /// Longitude outside `[-180, 180]` or not finite.
    #[error("longitude {0} is out of range")]
    LongitudeOutOfRange(String),
}

/// Externally supplied, globally unique device identifier.
///
/// # Examples
/// ```
/// use fleet_backend::domain::DeviceId;
///
/// let id = DeviceId::new(" dev1 ").expect("valid id");
/// assert_eq!(id.as_str(), "dev1");
/// assert!(DeviceId::new("  ").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceId(String);

impl DeviceId {
    /// Validate and wrap an identifier.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, DeviceValidationError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(DeviceValidationError::EmptyDeviceId);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Borrow the identifier text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for DeviceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A registered device.
#[derive(Debug, Clone, PartialEq)]
pub struct Device {
    /// External identifier.
    pub id: DeviceId,
    /// Display name.
    pub name: String,
    /// Owning account. Never reassigned by the sync pipeline.
    pub owner: AccountId,
    /// Most recent sync.
    pub last_contact_at: DateTime<Utc>,
}

impl Device {
    /// Name to store after a sync suggesting `suggested`, if it changes.
    ///
    /// Blank suggestions never overwrite the stored name.
    #[must_use]
    pub fn renamed_to<'a>(&self, suggested: Option<&'a str>) -> Option<&'a str> {
        suggested
            .map(str::trim)
            .filter(|name| !name.is_empty() && *name != self.name)
    }
}

/// Registration payload for a device seen for the first time.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDevice {
    /// External identifier.
    pub id: DeviceId,
    /// Display name; the identifier when the device suggested none.
    pub name: String,
    /// Account the device binds to.
    pub owner: AccountId,
    /// First contact.
    pub contact_at: DateTime<Utc>,
}

impl NewDevice {
    /// Build a registration, falling back to the identifier as display name.
    #[must_use]
    pub fn new(
        id: DeviceId,
        suggested_name: Option<&str>,
        owner: AccountId,
        contact_at: DateTime<Utc>,
    ) -> Self {
        let name = suggested_name
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map_or_else(|| id.as_str().to_owned(), str::to_owned);
        Self {
            id,
            name,
            owner,
            contact_at,
        }
    }
}

/// WGS84 position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    latitude: f64,
    longitude: f64,
}

impl Coordinates {
    /// Validate a latitude/longitude pair.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, DeviceValidationError> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(DeviceValidationError::LatitudeOutOfRange(
                latitude.to_string(),
            ));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(DeviceValidationError::LongitudeOutOfRange(
                longitude.to_string(),
            ));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Latitude in degrees.
    #[must_use]
    pub const fn latitude(&self) -> f64 {
        self.latitude
    }

    /// Longitude in degrees.
    #[must_use]
    pub const fn longitude(&self) -> f64 {
        self.longitude
    }
}

/// Immutable location fix appended to the log.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationSample {
    /// Device that reported the fix.
    pub device_id: DeviceId,
    /// Reported position.
    pub coordinates: Coordinates,
    /// Device-supplied capture time, or receipt time when absent.
    pub captured_at: DateTime<Utc>,
}
