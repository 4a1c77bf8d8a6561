//! Device sync against embedded PostgreSQL.
//!
//! Drives [`DeviceSyncService`] over [`DieselSyncStore`] and inspects the
//! resulting rows with a separate `postgres` client. Covers convergence of
//! repeated pushes, line replacement, owner conflicts and rollback on
//! storage failure.
//!
//! # Runtime Strategy
//!
//! Each test owns a Tokio runtime and blocks on the service; row checks run
//! synchronously outside it.

use std::sync::Arc;

use chrono::NaiveDate;
use fleet_backend::domain::ports::{
    DeviceReport, DeviceSyncCommand, DeviceSyncOutcome, DeviceSyncRequest, SyncBatch,
};
use fleet_backend::domain::{
    AccountId, DeviceSyncService, DocumentLine, DocumentSubmission, Error, ErrorCode,
    SyncContext, SyncPolicy,
};
use fleet_backend::outbound::persistence::{DbPool, DieselSyncStore, PoolConfig};
use fleet_backend::test_support::clock::fixture_clock;
use futures_util::future::join_all;
use pg_embedded_setup_unpriv::TemporaryDatabase;
use rstest::{fixture, rstest};
use tokio::runtime::Runtime;

mod support;

use support::atexit_cleanup::shared_cluster_handle;
use support::{count_rows, drop_table, handle_cluster_setup_failure, query_scalar};

const ALICE: &str = "11111111-1111-1111-1111-111111111111";
const BOB: &str = "22222222-2222-2222-2222-222222222222";
const SERIAL_POOL_SIZE: u32 = 2;
const CONCURRENT_POOL_SIZE: u32 = 8;
const CONCURRENT_PUSHES: usize = 8;

struct SyncDb {
    runtime: Runtime,
    service: Arc<DeviceSyncService<DieselSyncStore>>,
    _database: TemporaryDatabase,
    url: String,
}

impl SyncDb {
    fn push(&self, context: SyncContext, batch: SyncBatch) -> Result<DeviceSyncOutcome, Error> {
        self.runtime
            .block_on(self.service.sync(DeviceSyncRequest { context, batch }))
    }

    /// Run every batch as its own concurrently spawned anonymous push.
    fn push_concurrently(&self, batches: Vec<SyncBatch>) -> Vec<Result<DeviceSyncOutcome, Error>> {
        let handles: Vec<_> = batches
            .into_iter()
            .map(|batch| {
                let service = Arc::clone(&self.service);
                self.runtime.spawn(async move {
                    service
                        .sync(DeviceSyncRequest {
                            context: SyncContext::Anonymous,
                            batch,
                        })
                        .await
                })
            })
            .collect();
        self.runtime
            .block_on(join_all(handles))
            .into_iter()
            .map(|joined| joined.expect("push task completes"))
            .collect()
    }

    fn count(&self, table: &str, filter: Option<&str>) -> i64 {
        count_rows(&self.url, table, filter).expect("count rows")
    }

    fn seed_account(&self, id: &str, login: &str) -> AccountId {
        let sql = format!(
            "WITH inserted AS (INSERT INTO accounts (id, login) VALUES ('{id}', '{login}') \
             RETURNING id) SELECT COUNT(*) FROM inserted"
        );
        let inserted: i64 = query_scalar(&self.url, &sql).expect("seed account");
        assert_eq!(inserted, 1);
        AccountId::new(id).expect("fixture account id")
    }
}

fn setup(pool_size: u32) -> Result<SyncDb, String> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(4)
        .enable_all()
        .build().map_err(|err| err.to_string())?;
    let cluster = shared_cluster_handle().map_err(|err| err.to_string())?;
    let database =
        support::provision_template_database(cluster).map_err(|err| err.to_string())?;
    let url = database.url().to_owned();

    let config = PoolConfig::new(&url)
        .with_max_size(pool_size)
        .with_min_idle(Some(1));
    let pool = runtime
        .block_on(DbPool::new(config))
        .map_err(|err| err.to_string())?;
    let service = Arc::new(DeviceSyncService::new(
        Arc::new(DieselSyncStore::new(pool)),
        fixture_clock(),
        SyncPolicy::default(),
    ));
    Ok(SyncDb {
        runtime,
        service,
        _database: database,
        url,
    })
}

#[fixture]
fn db() -> Option<SyncDb> {
    match setup(SERIAL_POOL_SIZE) {
        Ok(db) => Some(db),
        Err(reason) => handle_cluster_setup_failure(reason),
    }
}

#[fixture]
fn concurrent_db() -> Option<SyncDb> {
    match setup(CONCURRENT_POOL_SIZE) {
        Ok(db) => Some(db),
        Err(reason) => handle_cluster_setup_failure(reason),
    }
}

fn line(barcode: &str, quantity: f64) -> DocumentLine {
    DocumentLine {
        barcode: Some(barcode.to_owned()),
        quantity,
        ..DocumentLine::default()
    }
}

fn sale(number: &str, lines: Vec<DocumentLine>) -> DocumentSubmission {
    let mut submission = DocumentSubmission {
        number: Some(number.to_owned()),
        lines,
        ..DocumentSubmission::default()
    };
    submission.totals.excl_tax = 100.0;
    submission
}

fn batch(device_id: &str, sales: Vec<DocumentSubmission>) -> SyncBatch {
    SyncBatch {
        device: DeviceReport {
            device_id: device_id.to_owned(),
            name: Some("Van 3".to_owned()),
            latitude: Some(36.75),
            longitude: Some(3.04),
            reported_at: None,
        },
        sales,
        orders: Vec::new(),
    }
}

#[rstest]
fn first_push_registers_device_location_and_documents(db: Option<SyncDb>) {
    let Some(db) = db else {
        eprintln!("SKIP-TEST-CLUSTER: first_push_registers_device_location_and_documents skipped");
        return;
    };

    let outcome = db
        .push(
            SyncContext::Anonymous,
            batch("dev1", vec![sale("B1", vec![line("X", 2.0)])]),
        )
        .expect("sync commits");

    assert!(outcome.stats.device_created);
    assert_eq!(outcome.stats.sales.headers_created, 1);
    assert_eq!(outcome.stats.sales.lines_inserted, 1);
    assert_eq!(db.count("accounts", Some("login = 'device-sync'")), 1);
    assert_eq!(
        db.count(
            "devices d JOIN accounts a ON a.id = d.account_id",
            Some("d.device_id = 'dev1' AND a.login = 'device-sync'")
        ),
        1
    );
    assert_eq!(db.count("location_samples", Some("device_id = 'dev1'")), 1);
    assert_eq!(
        db.count("sale_headers", Some("number = 'B1' AND total_excl_tax = 100")),
        1
    );
    assert_eq!(
        db.count("sale_lines", Some("document_number = 'B1' AND barcode = 'X'")),
        1
    );
}

#[rstest]
fn repeated_push_converges_and_appends_locations(db: Option<SyncDb>) {
    let Some(db) = db else {
        eprintln!("SKIP-TEST-CLUSTER: repeated_push_converges_and_appends_locations skipped");
        return;
    };
    let payload = batch("dev1", vec![sale("B1", vec![line("X", 2.0), line("Y", 1.0)])]);

    db.push(SyncContext::Anonymous, payload.clone())
        .expect("first sync");
    let second = db
        .push(SyncContext::Anonymous, payload)
        .expect("second sync");

    assert!(!second.stats.device_created);
    assert_eq!(second.stats.sales.headers_touched, 1);
    assert_eq!(second.stats.sales.headers_created, 0);
    assert_eq!(db.count("sale_headers", None), 1);
    assert_eq!(db.count("sale_lines", None), 2);
    assert_eq!(db.count("location_samples", None), 2);
    assert_eq!(db.count("accounts", None), 1);
    let generation: i64 = query_scalar(
        &db.url,
        "SELECT line_generation FROM sale_headers WHERE number = 'B1'",
    )
    .expect("generation");
    assert_eq!(generation, 2);
}

#[rstest]
fn resubmission_replaces_the_line_set(db: Option<SyncDb>) {
    let Some(db) = db else {
        eprintln!("SKIP-TEST-CLUSTER: resubmission_replaces_the_line_set skipped");
        return;
    };

    db.push(
        SyncContext::Anonymous,
        batch("dev1", vec![sale("B1", vec![line("X", 2.0), line("Y", 1.0)])]),
    )
    .expect("first sync");
    db.push(
        SyncContext::Anonymous,
        batch("dev1", vec![sale("B1", vec![line("Z", 5.0)])]),
    )
    .expect("second sync");

    assert_eq!(db.count("sale_lines", None), 1);
    assert_eq!(
        db.count(
            "sale_lines",
            Some("barcode = 'Z' AND quantity = 5 AND line_number = 1")
        ),
        1
    );
}

#[rstest]
fn resync_overwrites_every_header_column(db: Option<SyncDb>) {
    let Some(db) = db else {
        eprintln!("SKIP-TEST-CLUSTER: resync_overwrites_every_header_column skipped");
        return;
    };
    let mut initial = sale("B1", vec![line("X", 2.0), line("Y", 1.0)]);
    initial.client_code = Some("C1".to_owned());
    initial.issued_on = NaiveDate::from_ymd_opt(2026, 10, 1);
    initial.flags.exported_sale = true;
    db.push(SyncContext::Anonymous, batch("dev1", vec![initial]))
        .expect("first sync");

    let mut resent = sale("B1", vec![line("X", 2.0)]);
    resent.totals.excl_tax = 42.5;
    resent.totals.amount_paid = 10.0;
    resent.flags.delivered = true;
    resent.flags.blocked = true;
    db.push(SyncContext::Anonymous, batch("dev1", vec![resent]))
        .expect("second sync");

    assert_eq!(
        db.count(
            "sale_headers",
            Some(
                "number = 'B1' AND total_excl_tax = 42.5 AND amount_paid = 10 \
                 AND client_code IS NULL AND issued_on IS NULL \
                 AND delivered AND blocked AND NOT exported_sale"
            )
        ),
        1
    );
}

#[rstest]
fn repeated_number_in_one_batch_keeps_the_last_document(db: Option<SyncDb>) {
    let Some(db) = db else {
        eprintln!("SKIP-TEST-CLUSTER: repeated_number_in_one_batch_keeps_the_last_document skipped");
        return;
    };
    let mut initial = sale("B1", vec![line("X", 2.0), line("Y", 1.0)]);
    initial.client_code = Some("C1".to_owned());
    db.push(SyncContext::Anonymous, batch("dev1", vec![initial]))
        .expect("first sync");

    let mut first = sale("B1", vec![line("P", 1.0)]);
    first.totals.excl_tax = 5.0;
    let mut last = sale(
        "B1",
        vec![line("Q1", 1.0), line("Q2", 2.0), line("Q3", 3.0), line("Q4", 4.0)],
    );
    last.totals.excl_tax = 0.0;
    let outcome = db
        .push(SyncContext::Anonymous, batch("dev1", vec![first, last]))
        .expect("resync");

    assert_eq!(outcome.stats.sales.headers_touched, 2);
    assert_eq!(outcome.stats.sales.headers_created, 0);
    assert_eq!(outcome.stats.sales.lines_inserted, 5);
    assert_eq!(
        db.count(
            "sale_headers",
            Some("number = 'B1' AND total_excl_tax = 0 AND client_code IS NULL")
        ),
        1
    );
    assert_eq!(db.count("sale_lines", None), 4);
    assert_eq!(db.count("sale_lines", Some("barcode LIKE 'Q%'")), 4);
    let generation: i64 = query_scalar(
        &db.url,
        "SELECT line_generation FROM sale_headers WHERE number = 'B1'",
    )
    .expect("generation");
    assert_eq!(generation, 3);
}

#[rstest]
fn sales_and_orders_with_the_same_number_are_independent(db: Option<SyncDb>) {
    let Some(db) = db else {
        eprintln!("SKIP-TEST-CLUSTER: sales_and_orders_with_the_same_number_are_independent skipped");
        return;
    };
    let mut payload = batch("dev1", vec![sale("N7", vec![line("X", 1.0)])]);
    payload.orders = vec![sale("N7", vec![line("X", 3.0), line("Y", 4.0)])];

    let outcome = db
        .push(SyncContext::Anonymous, payload)
        .expect("sync commits");

    assert_eq!(outcome.stats.orders.lines_inserted, 2);
    assert_eq!(db.count("sale_lines", None), 1);
    assert_eq!(db.count("order_lines", None), 2);
}

#[rstest]
fn foreign_account_is_rejected_without_writes(db: Option<SyncDb>) {
    let Some(db) = db else {
        eprintln!("SKIP-TEST-CLUSTER: foreign_account_is_rejected_without_writes skipped");
        return;
    };
    let alice = db.seed_account(ALICE, "alice");
    let bob = db.seed_account(BOB, "bob");
    db.push(
        SyncContext::Account(alice),
        batch("dev7", vec![sale("B1", vec![line("X", 1.0)])]),
    )
    .expect("owner sync");

    let error = db
        .push(
            SyncContext::Account(bob),
            batch("dev7", vec![sale("B2", vec![line("X", 1.0)])]),
        )
        .expect_err("foreign account rejected");

    assert_eq!(error.code(), ErrorCode::Conflict);
    assert_eq!(db.count("sale_headers", Some("number = 'B2'")), 0);
    assert_eq!(db.count("location_samples", None), 1);
    assert_eq!(
        db.count("devices", Some(&format!("account_id = '{ALICE}'"))),
        1
    );
}

#[rstest]
fn owner_and_anonymous_pushes_reach_an_owned_device(db: Option<SyncDb>) {
    let Some(db) = db else {
        eprintln!("SKIP-TEST-CLUSTER: owner_and_anonymous_pushes_reach_an_owned_device skipped");
        return;
    };
    let alice = db.seed_account(ALICE, "alice");
    db.push(SyncContext::Account(alice), batch("dev7", Vec::new()))
        .expect("owner registers device");

    db.push(SyncContext::Account(alice), batch("dev7", Vec::new()))
        .expect("owner pushes again");
    db.push(SyncContext::Anonymous, batch("dev7", Vec::new()))
        .expect("anonymous push accepted");

    assert_eq!(db.count("location_samples", None), 3);
    assert_eq!(db.count("accounts", Some("login = 'device-sync'")), 0);
}

#[rstest]
fn storage_failure_rolls_back_the_whole_batch(db: Option<SyncDb>) {
    let Some(db) = db else {
        eprintln!("SKIP-TEST-CLUSTER: storage_failure_rolls_back_the_whole_batch skipped");
        return;
    };
    drop_table(&db.url, "sale_lines").expect("drop sale_lines");

    let error = db
        .push(
            SyncContext::Anonymous,
            batch("dev1", vec![sale("B1", vec![line("X", 2.0)])]),
        )
        .expect_err("sync fails");

    assert_eq!(error.code(), ErrorCode::ServiceUnavailable);
    assert_eq!(
        error.details().and_then(|details| details.get("retryable")),
        Some(&serde_json::json!(true))
    );
    assert_eq!(db.count("devices", None), 0);
    assert_eq!(db.count("location_samples", None), 0);
    assert_eq!(db.count("sale_headers", None), 0);
    assert_eq!(db.count("accounts", None), 0);
}

#[rstest]
fn concurrent_first_pushes_register_one_device(concurrent_db: Option<SyncDb>) {
    let Some(db) = concurrent_db else {
        eprintln!("SKIP-TEST-CLUSTER: concurrent_first_pushes_register_one_device skipped");
        return;
    };
    let batches = (0..CONCURRENT_PUSHES)
        .map(|_| {
            batch(
                "dev1",
                vec![sale("B1", vec![line("X", 1.0), line("Y", 2.0), line("Z", 3.0)])],
            )
        })
        .collect();

    let outcomes: Vec<_> = db
        .push_concurrently(batches)
        .into_iter()
        .map(|outcome| outcome.expect("every push commits"))
        .collect();

    let registered = outcomes
        .iter()
        .filter(|outcome| outcome.stats.device_created)
        .count();
    assert_eq!(registered, 1);
    assert_eq!(db.count("devices", None), 1);
    assert_eq!(db.count("accounts", None), 1);
    assert_eq!(db.count("location_samples", None), CONCURRENT_PUSHES as i64);
    assert_eq!(db.count("sale_headers", None), 1);
    assert_eq!(db.count("sale_lines", None), 3);
}

#[rstest]
fn concurrent_writers_of_one_number_leave_one_line_set(concurrent_db: Option<SyncDb>) {
    let Some(db) = concurrent_db else {
        eprintln!("SKIP-TEST-CLUSTER: concurrent_writers_of_one_number_leave_one_line_set skipped");
        return;
    };
    let batches = (1..=CONCURRENT_PUSHES)
        .map(|writer| {
            let lines = (1..=writer)
                .map(|index| line(&format!("W{writer}-{index}"), 1.0))
                .collect();
            batch(&format!("dev{writer}"), vec![sale("B1", lines)])
        })
        .collect();

    let outcomes: Vec<_> = db
        .push_concurrently(batches)
        .into_iter()
        .map(|outcome| outcome.expect("every push commits"))
        .collect();

    let created: u64 = outcomes
        .iter()
        .map(|outcome| outcome.stats.sales.headers_created)
        .sum();
    assert_eq!(created, 1);
    assert_eq!(db.count("devices", None), CONCURRENT_PUSHES as i64);
    assert_eq!(db.count("accounts", None), 1);
    assert_eq!(db.count("sale_headers", None), 1);

    let generations: i64 = query_scalar(
        &db.url,
        "SELECT COUNT(DISTINCT generation) FROM sale_lines WHERE document_number = 'B1'",
    )
    .expect("generations");
    assert_eq!(generations, 1);
    assert_eq!(
        db.count(
            "sale_lines l JOIN sale_headers h ON h.number = l.document_number",
            Some("l.generation <> h.line_generation")
        ),
        0
    );
    let writer: String = query_scalar(
        &db.url,
        "SELECT device_id FROM sale_headers WHERE number = 'B1'",
    )
    .expect("last writer");
    let expected_lines = writer
        .trim_start_matches("dev")
        .parse::<i64>()
        .expect("writer index");
    assert_eq!(db.count("sale_lines", None), expected_lines);
    assert_eq!(
        db.count(
            "sale_lines",
            Some(&format!("barcode LIKE 'W{expected_lines}-%'"))
        ),
        expected_lines
    );
}
