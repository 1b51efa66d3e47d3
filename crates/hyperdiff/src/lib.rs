//! TimescaleDB awareness for a schema migration pipeline.
//!
//! Given two schema snapshots annotated with TimescaleDB settings, this crate
//! works out which hypertables, reorder policies and continuous aggregates
//! have to be created, altered or dropped, and renders each change as the
//! ordered SQL statements TimescaleDB needs.
//!
//! ```
//! use hyperdiff::{FeatureDiffer, GenerateOptions, SchemaSnapshot, SnapshotObject, generate, keys};
//!
//! let target = SchemaSnapshot::new(vec![
//!     SnapshotObject::table("Metrics")
//!         .with(keys::IS_HYPERTABLE, true)
//!         .with(keys::TIME_COLUMN, "Timestamp")
//!         .with(keys::CHUNK_TIME_INTERVAL, "1 day"),
//! ]);
//!
//! let ops = FeatureDiffer::default().diff(None, Some(&target)).unwrap();
//! let sql = generate(&ops[0], &GenerateOptions::default()).unwrap();
//! assert_eq!(
//!     sql[0],
//!     r#"SELECT create_hypertable('public."Metrics"', 'Timestamp', chunk_time_interval => INTERVAL '1 day');"#
//! );
//! ```
//!
//! Everything is synchronous and pure: no connection, no I/O, and the same
//! snapshots always produce byte-identical output.

pub mod defaults;
pub mod diff;
mod error;
pub mod extract;
pub mod generate;
pub mod model;
pub mod operation;
mod orchestrator;
pub mod snapshot;

pub use defaults::FeatureDefaults;
pub use error::Error;
pub use generate::{GenerateOptions, generate};
pub use hyperdiff_sql::QuoteMode;
pub use model::*;
pub use operation::*;
pub use orchestrator::{FeatureDiffer, StatementSink, emit, merge_into, to_sql_script};
pub use snapshot::{AnnotationValue, Annotations, ObjectKind, SchemaSnapshot, SnapshotObject, keys};

pub type Result<T> = std::result::Result<T, Error>;
