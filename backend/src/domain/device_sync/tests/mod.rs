//! Coordinator tests.
//!
//! `properties` drives the service against the in-memory snapshot store and
//! checks end state; `transaction_calls` pins the exact calls made through a
//! mocked transaction handle.

use std::sync::Arc;

use crate::domain::ports::{DeviceReport, DeviceSyncRequest, SyncBatch};
use crate::domain::{DocumentLine, DocumentSubmission, SyncContext, SyncPolicy};
use crate::test_support::InMemorySyncStore;
use crate::test_support::clock::fixture_clock;

use super::DeviceSyncService;


pub(super) fn service(store: &InMemorySyncStore) -> DeviceSyncService<InMemorySyncStore> {
    DeviceSyncService::new(
        Arc::new(store.clone()),
        fixture_clock(),
        SyncPolicy::default(),
    )
}

pub(super) fn line(barcode: &str, quantity: f64) -> DocumentLine {
    DocumentLine {
        barcode: Some(barcode.to_owned()),
        quantity,
        ..DocumentLine::default()
    }
}

pub(super) fn document(number: Option<&str>, lines: Vec<DocumentLine>) -> DocumentSubmission {
    DocumentSubmission {
        number: number.map(str::to_owned),
        lines,
        ..DocumentSubmission::default()
    }
}

/// Batch `{device:{device_id:"dev1",latitude:36.75,longitude:3.04},
/// sales:[{header:{NUM_BON:"B1",TOT_HT:100}, lines:[{CODE_BARRE:"X",QTE:2}]}]}`.
pub(super) fn dev1_batch() -> SyncBatch {
    let mut sale = document(Some("B1"), vec![line("X", 2.0)]);
    sale.totals.excl_tax = 100.0;
    SyncBatch {
        device: DeviceReport {
            device_id: "dev1".to_owned(),
            latitude: Some(36.75),
            longitude: Some(3.04),
            ..DeviceReport::default()
        },
        sales: vec![sale],
        orders: Vec::new(),
    }
}

pub(super) fn anonymous(batch: SyncBatch) -> DeviceSyncRequest {
    DeviceSyncRequest {
        context: SyncContext::Anonymous,
        batch,
    }
}
