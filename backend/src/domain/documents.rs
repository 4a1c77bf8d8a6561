//! Sale and order documents submitted by field devices.
//!
//! Sales and orders share one shape: a header keyed by a document number and
//! an ordered set of lines. Submissions arrive loosely typed; converting a
//! [`DocumentSubmission`] into a [`SyncDocument`] is where a document either
//! becomes storable or is skipped.

use std::fmt;

use chrono::{NaiveDate, NaiveTime};

/// Family a document belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    /// Finalised sale.
    Sale,
    /// Pending order.
    Order,
}

impl DocumentKind {
    /// Both families in processing order.
    pub const ALL: [Self; 2] = [Self::Sale, Self::Order];

    /// Singular label used in logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sale => "sale",
            Self::Order => "order",
        }
    }

    /// Plural label matching the batch field name.
    #[must_use]
    pub const fn family(self) -> &'static str {
        match self {
            Self::Sale => "sales",
            Self::Order => "orders",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reasons a submitted document cannot be stored.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DocumentValidationError {
    /// The document number is missing or blank.
    #[error("document number is missing")]
    MissingNumber,
}

/// Natural key of a document within its family.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentNumber(String);

impl DocumentNumber {
    /// Validate and wrap a document number.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, DocumentValidationError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(DocumentValidationError::MissingNumber);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Borrow the number text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Monetary totals carried by a header. Absent values are zero.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DocumentTotals {
    /// Total excluding tax.
    pub excl_tax: f64,
    /// Tax total.
    pub tax: f64,
    /// Stamp duty.
    pub stamp_duty: f64,
    /// Discount granted.
    pub discount: f64,
    /// Amount already paid.
    pub amount_paid: f64,
}

/// Delivery and bookkeeping flags. Absent values are `false`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DocumentFlags {
    /// Goods were delivered.
    pub delivered: bool,
    /// Export sale.
    pub exported_sale: bool,
    /// Document is blocked.
    pub blocked: bool,
    /// Imported by the back office.
    pub is_imported: bool,
    /// Exported by the back office.
    pub is_exported: bool,
}

/// How absent header coordinates are stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CoordinateDefaults {
    /// Store `0` for an absent coordinate, matching historical rows.
    #[default]
    Zero,
    /// Store `NULL` for an absent coordinate.
    Null,
}

impl CoordinateDefaults {
    fn apply(self, value: Option<f64>) -> Option<f64> {
        match (value, self) {
            (Some(value), _) => Some(value),
            (None, Self::Zero) => Some(0.0),
            (None, Self::Null) => None,
        }
    }
}

/// One line item. Lines have no identity outside their document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentLine {
    /// Product barcode.
    pub barcode: Option<String>,
    /// Product description.
    pub product: Option<String>,
    /// Number of packages.
    pub package_count: f64,
    /// Units per package.
    pub package_size: f64,
    /// Quantity sold or ordered.
    pub quantity: f64,
    /// Free quantity granted.
    pub free_quantity: f64,
    /// Unit sell price excluding tax.
    pub unit_price_excl_tax: f64,
    /// Unit buy price excluding tax.
    pub unit_cost_excl_tax: f64,
    /// Tax rate.
    pub tax_rate: f64,
    /// Depot the goods left from.
    pub depot_code: Option<String>,
    /// Record identifier assigned by the device.
    pub device_record_id: Option<String>,
}

/// Header as submitted, before validation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentSubmission {
    /// Document number; required.
    pub number: Option<String>,
    /// Client code.
    pub client_code: Option<String>,
    /// Issue date.
    pub issued_on: Option<NaiveDate>,
    /// Issue time of day.
    pub issued_at_time: Option<NaiveTime>,
    /// Totals.
    pub totals: DocumentTotals,
    /// Latitude where the document was issued.
    pub latitude: Option<f64>,
    /// Longitude where the document was issued.
    pub longitude: Option<f64>,
    /// Flags.
    pub flags: DocumentFlags,
    /// Line items in submission order.
    pub lines: Vec<DocumentLine>,
}

impl DocumentSubmission {
    /// Validate the submission into a storable document.
    ///
    /// # Examples
    /// ```
    /// use fleet_backend::domain::{CoordinateDefaults, DocumentSubmission};
    ///
    /// let submission = DocumentSubmission {
    ///     number: Some("B1".into()),
    ///     ..DocumentSubmission::default()
    /// };
    /// let document = submission
    ///     .into_document(CoordinateDefaults::Zero)
    ///     .expect("numbered document");
    /// assert_eq!(document.header.latitude, Some(0.0));
    /// ```
    pub fn into_document(
        self,
        coordinates: CoordinateDefaults,
    ) -> Result<SyncDocument, DocumentValidationError> {
        let number = DocumentNumber::new(self.number.as_deref().unwrap_or_default())?;
        let header = DocumentHeader {
            number,
            client_code: non_blank(self.client_code),
            issued_on: self.issued_on,
            issued_at_time: self.issued_at_time,
            totals: self.totals,
            latitude: coordinates.apply(self.latitude),
            longitude: coordinates.apply(self.longitude),
            flags: self.flags,
        };
        Ok(SyncDocument {
            header,
            lines: self.lines,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.trim().is_empty())
}

/// Validated header stored keyed by its number.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentHeader {
    /// Natural key.
    pub number: DocumentNumber,
    /// Client code.
    pub client_code: Option<String>,
    /// Issue date.
    pub issued_on: Option<NaiveDate>,
    /// Issue time of day.
    pub issued_at_time: Option<NaiveTime>,
    /// Totals.
    pub totals: DocumentTotals,
    /// Latitude after the coordinate default policy.
    pub latitude: Option<f64>,
    /// Longitude after the coordinate default policy.
    pub longitude: Option<f64>,
    /// Flags.
    pub flags: DocumentFlags,
}

/// Storable document: validated header plus its full line set.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncDocument {
    /// Header.
    pub header: DocumentHeader,
    /// Complete replacement line set.
    pub lines: Vec<DocumentLine>,
}
