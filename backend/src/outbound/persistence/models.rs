//! Internal Diesel row structs for database operations.
//!
//! These types are implementation details of the persistence layer and must
//! never be exposed to the domain. They exist solely to satisfy Diesel's
//! type requirements for queries and mutations. Header and line rows are
//! generated per document table by `document_tables!`.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::domain::{AccountId, Device, DeviceId, DeviceValidationError, LocationSample, NewDevice};

use super::schema::{accounts, devices, location_samples};

/// Insertable struct for service accounts created on demand.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = accounts)]
pub(crate) struct NewAccountRow<'a> {
    pub id: Uuid,
    pub login: &'a str,
}

/// Row struct for reading from the devices table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = devices)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct DeviceRow {
    pub device_id: String,
    pub name: String,
    pub account_id: Uuid,
    pub last_contact_at: DateTime<Utc>,
}

impl TryFrom<DeviceRow> for Device {
    type Error = DeviceValidationError;

    fn try_from(row: DeviceRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: DeviceId::new(&row.device_id)?,
            name: row.name,
            owner: AccountId::from_uuid(row.account_id),
            last_contact_at: row.last_contact_at,
        })
    }
}

/// Insertable struct for registering a device.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = devices)]
pub(crate) struct NewDeviceRow<'a> {
    pub device_id: &'a str,
    pub name: &'a str,
    pub account_id: Uuid,
    pub last_contact_at: DateTime<Utc>,
}

impl<'a> From<&'a NewDevice> for NewDeviceRow<'a> {
    fn from(device: &'a NewDevice) -> Self {
        Self {
            device_id: device.id.as_str(),
            name: &device.name,
            account_id: *device.owner.as_uuid(),
            last_contact_at: device.contact_at,
        }
    }
}

/// Insertable struct for the location log.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = location_samples)]
pub(crate) struct NewLocationRow<'a> {
    pub device_id: &'a str,
    pub latitude: f64,
    pub longitude: f64,
    pub captured_at: DateTime<Utc>,
}

impl<'a> From<&'a LocationSample> for NewLocationRow<'a> {
    fn from(sample: &'a LocationSample) -> Self {
        Self {
            device_id: sample.device_id.as_str(),
            latitude: sample.coordinates.latitude(),
            longitude: sample.coordinates.longitude(),
            captured_at: sample.captured_at,
        }
    }
}
