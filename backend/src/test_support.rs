//! Test utilities for the backend crate.
//!
//! Shared by unit tests in `src/` and, through the `test-support` feature,
//! by integration tests in `tests/`.

mod in_memory_sync_store;

pub use in_memory_sync_store::{InMemorySyncStore, StoredHeader, StoredLine};

pub mod clock {
    //! Deterministic clock for services that take `Arc<dyn Clock>`.

    use std::sync::Arc;

    use chrono::{DateTime, Local, TimeZone, Utc};
    use mockable::Clock;

    /// Fixed receipt time used across sync tests.
    #[must_use]
    pub fn fixture_timestamp() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 1, 8, 30, 0)
            .single()
            .unwrap_or_default()
    }

    /// Clock that always reports the same instant.
    #[derive(Debug, Clone, Copy)]
    pub struct FixtureClock {
        utc_now: DateTime<Utc>,
    }

    impl FixtureClock {
        /// Clock frozen at `utc_now`.
        #[must_use]
        pub const fn at(utc_now: DateTime<Utc>) -> Self {
            Self { utc_now }
        }
    }

    impl Default for FixtureClock {
        fn default() -> Self {
            Self::at(fixture_timestamp())
        }
    }

    impl Clock for FixtureClock {
        fn local(&self) -> DateTime<Local> {
            self.utc_now.with_timezone(&Local)
        }

        fn utc(&self) -> DateTime<Utc> {
            self.utc_now
        }
    }

    /// Shared fixture clock.
    #[must_use]
    pub fn fixture_clock() -> Arc<dyn Clock> {
        Arc::new(FixtureClock::default())
    }
}
