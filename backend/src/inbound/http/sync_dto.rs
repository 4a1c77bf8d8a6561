//! Wire types for `POST /api/v1/devices/sync`.
//!
//! Header and line keys keep the upper-case names the device firmware sends.
//! Every field goes through a [`lenient`](super::lenient) decoder, so the
//! only body that fails to parse is one that is not a JSON object of the
//! right outline.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::ports::{DeviceReport, DeviceSyncOutcome, FamilyStats, SyncBatch};
use crate::domain::{DocumentFlags, DocumentLine, DocumentSubmission, DocumentTotals};
use crate::inbound::http::lenient;

/// Device identity and current position.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct DeviceDto {
    /// External device identifier. Also accepted as `deviceId`.
    #[serde(default, alias = "deviceId", deserialize_with = "lenient::optional_text")]
    #[schema(example = "dev1")]
    pub device_id: Option<String>,
    /// Suggested display name.
    #[serde(default, deserialize_with = "lenient::optional_text")]
    #[schema(example = "Van 3")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient::optional_number")]
    #[schema(example = 36.75)]
    pub latitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient::optional_number")]
    #[schema(example = 3.04)]
    pub longitude: Option<f64>,
    /// Capture time of the fix; receipt time applies when absent.
    #[serde(default, deserialize_with = "lenient::optional_timestamp")]
    #[schema(value_type = Option<String>, format = DateTime, example = "2026-10-01T08:00:00Z")]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Document header in the device's legacy key spelling.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct DocumentHeaderDto {
    /// Document number. Documents without one are skipped.
    #[serde(rename = "NUM_BON", default, deserialize_with = "lenient::optional_text")]
    #[schema(example = "B1")]
    pub number: Option<String>,
    #[serde(rename = "CODE_CLIENT", default, deserialize_with = "lenient::optional_text")]
    pub client_code: Option<String>,
    #[serde(rename = "DATE_BON", default, deserialize_with = "lenient::optional_date")]
    #[schema(value_type = Option<String>, format = Date, example = "2026-10-01")]
    pub issued_on: Option<NaiveDate>,
    #[serde(rename = "HEURE", default, deserialize_with = "lenient::optional_time")]
    #[schema(value_type = Option<String>, example = "08:15:00")]
    pub issued_at_time: Option<NaiveTime>,
    #[serde(rename = "TOT_HT", default, deserialize_with = "lenient::number")]
    pub total_excl_tax: f64,
    #[serde(rename = "TOT_TVA", default, deserialize_with = "lenient::number")]
    pub total_tax: f64,
    #[serde(rename = "TIMBRE", default, deserialize_with = "lenient::number")]
    pub stamp_duty: f64,
    #[serde(rename = "REMISE", default, deserialize_with = "lenient::number")]
    pub discount: f64,
    #[serde(rename = "VERSER", default, deserialize_with = "lenient::number")]
    pub amount_paid: f64,
    #[serde(rename = "LATITUDE", default, deserialize_with = "lenient::optional_number")]
    pub latitude: Option<f64>,
    #[serde(rename = "LONGITUDE", default, deserialize_with = "lenient::optional_number")]
    pub longitude: Option<f64>,
    #[serde(rename = "LIVRER", default, deserialize_with = "lenient::flag")]
    pub delivered: bool,
    #[serde(rename = "EXPORTATION", default, deserialize_with = "lenient::flag")]
    pub exported_sale: bool,
    #[serde(rename = "BLOCAGE", default, deserialize_with = "lenient::flag")]
    pub blocked: bool,
    #[serde(rename = "IS_IMPORTED", default, deserialize_with = "lenient::flag")]
    pub is_imported: bool,
    #[serde(rename = "IS_EXPORTED", default, deserialize_with = "lenient::flag")]
    pub is_exported: bool,
}

/// One document line in the device's legacy key spelling.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct DocumentLineDto {
    #[serde(rename = "CODE_BARRE", default, deserialize_with = "lenient::optional_text")]
    pub barcode: Option<String>,
    #[serde(rename = "PRODUIT", default, deserialize_with = "lenient::optional_text")]
    pub product: Option<String>,
    #[serde(rename = "NBR_COLIS", default, deserialize_with = "lenient::number")]
    pub package_count: f64,
    #[serde(rename = "COLISSAGE", default, deserialize_with = "lenient::number")]
    pub package_size: f64,
    #[serde(rename = "QTE", default, deserialize_with = "lenient::number")]
    pub quantity: f64,
    #[serde(rename = "QTE_GRAT", default, deserialize_with = "lenient::number")]
    pub free_quantity: f64,
    #[serde(rename = "PV_HT", default, deserialize_with = "lenient::number")]
    pub unit_price_excl_tax: f64,
    #[serde(rename = "PA_HT", default, deserialize_with = "lenient::number")]
    pub unit_cost_excl_tax: f64,
    #[serde(rename = "TVA", default, deserialize_with = "lenient::number")]
    pub tax_rate: f64,
    #[serde(rename = "CODE_DEPOT", default, deserialize_with = "lenient::optional_text")]
    pub depot_code: Option<String>,
    #[serde(rename = "RECORDID", default, deserialize_with = "lenient::optional_text")]
    pub device_record_id: Option<String>,
}

/// A header with its complete line set.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct DocumentDto {
    #[serde(default)]
    pub header: DocumentHeaderDto,
    #[serde(default)]
    #[schema(max_items = 1_000)]
    pub lines: Vec<DocumentLineDto>,
}

/// Request body of a device sync.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SyncRequest {
    pub device: DeviceDto,
    #[serde(default)]
    pub sales: Vec<DocumentDto>,
    #[serde(default)]
    pub orders: Vec<DocumentDto>,
}

impl From<DocumentLineDto> for DocumentLine {
    fn from(line: DocumentLineDto) -> Self {
        Self {
            barcode: line.barcode,
            product: line.product,
            package_count: line.package_count,
            package_size: line.package_size,
            quantity: line.quantity,
            free_quantity: line.free_quantity,
            unit_price_excl_tax: line.unit_price_excl_tax,
            unit_cost_excl_tax: line.unit_cost_excl_tax,
            tax_rate: line.tax_rate,
            depot_code: line.depot_code,
            device_record_id: line.device_record_id,
        }
    }
}

impl From<DocumentDto> for DocumentSubmission {
    fn from(document: DocumentDto) -> Self {
        let DocumentDto { header, lines } = document;
        Self {
            number: header.number,
            client_code: header.client_code,
            issued_on: header.issued_on,
            issued_at_time: header.issued_at_time,
            totals: DocumentTotals {
                excl_tax: header.total_excl_tax,
                tax: header.total_tax,
                stamp_duty: header.stamp_duty,
                discount: header.discount,
                amount_paid: header.amount_paid,
            },
            latitude: header.latitude,
            longitude: header.longitude,
            flags: DocumentFlags {
                delivered: header.delivered,
                exported_sale: header.exported_sale,
                blocked: header.blocked,
                is_imported: header.is_imported,
                is_exported: header.is_exported,
            },
            lines: lines.into_iter().map(DocumentLine::from).collect(),
        }
    }
}

impl From<DeviceDto> for DeviceReport {
    fn from(device: DeviceDto) -> Self {
        Self {
            device_id: device.device_id.unwrap_or_default(),
            name: device.name,
            latitude: device.latitude,
            longitude: device.longitude,
            reported_at: device.timestamp,
        }
    }
}

impl From<SyncRequest> for SyncBatch {
    fn from(request: SyncRequest) -> Self {
        Self {
            device: request.device.into(),
            sales: request.sales.into_iter().map(Into::into).collect(),
            orders: request.orders.into_iter().map(Into::into).collect(),
        }
    }
}

/// Counters reported for a committed batch.
///
/// The four `*Touched`/`*Inserted` counters are the ones deployed firmware
/// reads; the rest are additive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatsResponse {
    pub sales_headers_touched: u64,
    pub sales_lines_inserted: u64,
    pub orders_headers_touched: u64,
    pub orders_lines_inserted: u64,
    pub sales_headers_created: u64,
    pub orders_headers_created: u64,
    pub sales_skipped: u64,
    pub orders_skipped: u64,
    pub location_recorded: bool,
    pub device_created: bool,
}

/// Response body of a committed sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SyncResponse {
    #[schema(example = "dev1")]
    pub device_id: String,
    pub stats: SyncStatsResponse,
}

impl From<DeviceSyncOutcome> for SyncResponse {
    fn from(outcome: DeviceSyncOutcome) -> Self {
        let stats = outcome.stats;
        let FamilyStats {
            headers_touched: sales_headers_touched,
            headers_created: sales_headers_created,
            lines_inserted: sales_lines_inserted,
            skipped: sales_skipped,
        } = stats.sales;
        let FamilyStats {
            headers_touched: orders_headers_touched,
            headers_created: orders_headers_created,
            lines_inserted: orders_lines_inserted,
            skipped: orders_skipped,
        } = stats.orders;
        Self {
            device_id: outcome.device_id.to_string(),
            stats: SyncStatsResponse {
                sales_headers_touched,
                sales_lines_inserted,
                orders_headers_touched,
                orders_lines_inserted,
                sales_headers_created,
                orders_headers_created,
                sales_skipped,
                orders_skipped,
                location_recorded: stats.location_recorded,
                device_created: stats.device_created,
            },
        }
    }
}
