//! Test utilities and module declarations for storage tests.

use chrono::{DateTime, Duration, TimeZone, Utc};
use tablecall_core::{Call, CallType};

mod memory_tests;

fn at(offset_secs: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).single().unwrap_or_default()
        + Duration::seconds(offset_secs)
}

pub fn create_test_call(id: &str, table: &str, offset_secs: i64) -> Call {
    Call::pending(id.into(), table.into(), CallType::Waiter, at(offset_secs))
}
