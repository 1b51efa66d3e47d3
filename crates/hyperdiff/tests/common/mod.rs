#![allow(dead_code)]

use hyperdiff::{SchemaSnapshot, SnapshotObject, keys};

/// Route `tracing` output through the test harness; `RUST_LOG=hyperdiff=debug` to see it.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

pub fn metrics_table() -> SnapshotObject {
    SnapshotObject::table("Metrics")
        .with(keys::IS_HYPERTABLE, true)
        .with(keys::TIME_COLUMN, "Timestamp")
        .with(keys::CHUNK_TIME_INTERVAL, "1 day")
}

pub fn hourly_view() -> SnapshotObject {
    SnapshotObject::view("hourly_metrics")
        .with(keys::CONTINUOUS_AGGREGATE, true)
        .with(keys::PARENT, "Metrics")
        .with(keys::TIME_BUCKET_WIDTH, "1 hour")
        .with(keys::TIME_BUCKET_SOURCE_COLUMN, "Timestamp")
}

pub fn snapshot(objects: impl IntoIterator<Item = SnapshotObject>) -> SchemaSnapshot {
    SchemaSnapshot::new(objects.into_iter().collect())
}
