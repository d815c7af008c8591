//! Store metrics
//!
//! Recorded through the `metrics` facade. Nothing is exported unless the
//! embedding process installs a recorder; without one every call is a no-op.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit};
use std::time::Duration;

/// Store operations by table, operation and status
pub const STORE_OPERATIONS_TOTAL: &str = "crm_logger_store_operations_total";
/// Store operation latency
pub const STORE_OPERATION_DURATION: &str = "crm_logger_store_operation_duration_seconds";
/// Rows in the last loaded snapshot
pub const ROWS_LOADED: &str = "crm_logger_rows_loaded";
/// Reads that fell back to an empty snapshot
pub const DEGRADED_READS_TOTAL: &str = "crm_logger_degraded_reads_total";

/// Register metric descriptions with the installed recorder.
pub fn describe_metrics() {
    describe_counter!(STORE_OPERATIONS_TOTAL, Unit::Count, "Record store operations");
    describe_histogram!(STORE_OPERATION_DURATION, Unit::Seconds, "Record store operation latency");
    describe_gauge!(ROWS_LOADED, Unit::Count, "Rows in the most recent snapshot");
    describe_counter!(DEGRADED_READS_TOTAL, Unit::Count, "Reads served as an empty snapshot");
}

/// Label value for an operation result.
#[must_use]
pub const fn status_label(success: bool) -> &'static str {
    if success {
        "success"
    } else {
        "error"
    }
}

/// Record one store operation.
pub fn record_store_operation(table: &'static str, operation: &'static str, duration: Duration, success: bool) {
    let status = status_label(success);
    counter!(STORE_OPERATIONS_TOTAL, "table" => table, "operation" => operation, "status" => status).increment(1);
    histogram!(STORE_OPERATION_DURATION, "table" => table, "operation" => operation).record(duration.as_secs_f64());
}

/// Record the size of a loaded snapshot.
#[allow(clippy::cast_precision_loss)]
pub fn record_rows_loaded(table: &'static str, rows: usize) {
    gauge!(ROWS_LOADED, "table" => table).set(rows as f64);
}

/// Record a read that degraded to an empty snapshot.
pub fn record_degraded_read(table: &'static str) {
    counter!(DEGRADED_READS_TOTAL, "table" => table).increment(1);
}
