//! Schema snapshots as handed over by the host migration pipeline.
//!
//! A snapshot is a list of objects (tables and views), each carrying a
//! string-keyed annotation store. Whatever reads the user's configuration
//! writes TimescaleDB settings into that store under the keys in [`keys`];
//! this crate only reads them back.

use crate::model::{DEFAULT_SCHEMA, Dimension};
use indexmap::IndexMap;

/// Annotation keys understood by [`crate::extract`].
pub mod keys {
    pub const IS_HYPERTABLE: &str = "TimescaleDB:IsHypertable";
    pub const TIME_COLUMN: &str = "TimescaleDB:HypertableTimeColumn";
    pub const CHUNK_TIME_INTERVAL: &str = "TimescaleDB:ChunkTimeInterval";
    pub const ENABLE_COMPRESSION: &str = "TimescaleDB:EnableCompression";
    pub const CHUNK_SKIP_COLUMNS: &str = "TimescaleDB:ChunkSkipColumns";
    pub const ADDITIONAL_DIMENSIONS: &str = "TimescaleDB:AdditionalDimensions";
    pub const MIGRATE_DATA: &str = "TimescaleDB:MigrateData";

    pub const REORDER_INDEX: &str = "TimescaleDB:ReorderPolicyIndexName";
    pub const REORDER_INITIAL_START: &str = "TimescaleDB:ReorderPolicyInitialStart";
    pub const REORDER_SCHEDULE_INTERVAL: &str = "TimescaleDB:ReorderPolicyScheduleInterval";
    pub const REORDER_MAX_RUNTIME: &str = "TimescaleDB:ReorderPolicyMaxRuntime";
    pub const REORDER_MAX_RETRIES: &str = "TimescaleDB:ReorderPolicyMaxRetries";
    pub const REORDER_RETRY_PERIOD: &str = "TimescaleDB:ReorderPolicyRetryPeriod";

    pub const CONTINUOUS_AGGREGATE: &str = "TimescaleDB:ContinuousAggregate";
    pub const PARENT: &str = "TimescaleDB:ContinuousAggregateParent";
    pub const TIME_BUCKET_WIDTH: &str = "TimescaleDB:TimeBucketWidth";
    pub const TIME_BUCKET_SOURCE_COLUMN: &str = "TimescaleDB:TimeBucketSourceColumn";
    pub const TIME_BUCKET_GROUP_BY: &str = "TimescaleDB:TimeBucketGroupBy";
    pub const CHUNK_INTERVAL: &str = "TimescaleDB:ContinuousAggregateChunkInterval";
    pub const CREATE_GROUP_INDEXES: &str = "TimescaleDB:CreateGroupIndexes";
    pub const MATERIALIZED_ONLY: &str = "TimescaleDB:MaterializedOnly";
    pub const WITH_NO_DATA: &str = "TimescaleDB:WithNoData";
    pub const WHERE_CLAUSE: &str = "TimescaleDB:WhereClause";
    pub const GROUP_BY_COLUMNS: &str = "TimescaleDB:GroupByColumns";
    /// List of `Alias:Function:SourceColumn` strings.
    pub const AGGREGATE_FUNCTIONS: &str = "TimescaleDB:AggregateFunctions";

    pub const REFRESH_START_OFFSET: &str = "TimescaleDB:RefreshPolicyStartOffset";
    pub const REFRESH_END_OFFSET: &str = "TimescaleDB:RefreshPolicyEndOffset";
    pub const REFRESH_SCHEDULE_INTERVAL: &str = "TimescaleDB:RefreshPolicyScheduleInterval";
    pub const REFRESH_IF_NOT_EXISTS: &str = "TimescaleDB:RefreshPolicyIfNotExists";
    pub const REFRESH_TIMEZONE: &str = "TimescaleDB:RefreshPolicyTimezone";
    pub const REFRESH_INCLUDE_TIERED_DATA: &str = "TimescaleDB:RefreshPolicyIncludeTieredData";
    pub const REFRESH_BUCKETS_PER_BATCH: &str = "TimescaleDB:RefreshPolicyBucketsPerBatch";
    pub const REFRESH_MAX_BATCHES_PER_EXECUTION: &str =
        "TimescaleDB:RefreshPolicyMaxBatchesPerExecution";
    pub const REFRESH_NEWEST_FIRST: &str = "TimescaleDB:RefreshPolicyRefreshNewestFirst";
    pub const REFRESH_INITIAL_START: &str = "TimescaleDB:RefreshPolicyInitialStart";
}

/// A read-only view of one side of a migration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaSnapshot {
    pub objects: Vec<SnapshotObject>,
}

impl SchemaSnapshot {
    pub fn new(objects: Vec<SnapshotObject>) -> Self {
        Self { objects }
    }

    pub fn tables(&self) -> impl Iterator<Item = &SnapshotObject> {
        self.objects.iter().filter(|o| o.kind == ObjectKind::Table)
    }

    pub fn views(&self) -> impl Iterator<Item = &SnapshotObject> {
        self.objects.iter().filter(|o| o.kind == ObjectKind::View)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Table,
    View,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotObject {
    pub name: String,
    pub schema: Option<String>,
    pub kind: ObjectKind,
    pub annotations: Annotations,
}

impl SnapshotObject {
    pub fn table(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema: None,
            kind: ObjectKind::Table,
            annotations: Annotations::default(),
        }
    }

    pub fn view(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema: None,
            kind: ObjectKind::View,
            annotations: Annotations::default(),
        }
    }

    pub fn in_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Builder-style annotation setter.
    pub fn with(mut self, key: &str, value: impl Into<AnnotationValue>) -> Self {
        self.annotations.insert(key, value);
        self
    }

    pub fn schema_or_default(&self) -> &str {
        self.schema.as_deref().unwrap_or(DEFAULT_SCHEMA)
    }
}

/// A value in an object's annotation store.
#[derive(Debug, Clone, PartialEq)]
pub enum AnnotationValue {
    Text(String),
    Flag(bool),
    Integer(i64),
    List(Vec<String>),
    Dimensions(Vec<Dimension>),
}

impl AnnotationValue {
    /// Short description of the expected shape, for error messages.
    pub fn shape(&self) -> &'static str {
        match self {
            AnnotationValue::Text(_) => "text",
            AnnotationValue::Flag(_) => "a flag",
            AnnotationValue::Integer(_) => "an integer",
            AnnotationValue::List(_) => "a list",
            AnnotationValue::Dimensions(_) => "a dimension list",
        }
    }
}

impl From<&str> for AnnotationValue {
    fn from(value: &str) -> Self {
        AnnotationValue::Text(value.to_string())
    }
}

impl From<String> for AnnotationValue {
    fn from(value: String) -> Self {
        AnnotationValue::Text(value)
    }
}

impl From<bool> for AnnotationValue {
    fn from(value: bool) -> Self {
        AnnotationValue::Flag(value)
    }
}

impl From<i64> for AnnotationValue {
    fn from(value: i64) -> Self {
        AnnotationValue::Integer(value)
    }
}

impl From<i32> for AnnotationValue {
    fn from(value: i32) -> Self {
        AnnotationValue::Integer(value.into())
    }
}

impl From<Vec<String>> for AnnotationValue {
    fn from(value: Vec<String>) -> Self {
        AnnotationValue::List(value)
    }
}

impl From<Vec<&str>> for AnnotationValue {
    fn from(value: Vec<&str>) -> Self {
        AnnotationValue::List(value.into_iter().map(String::from).collect())
    }
}

impl From<Vec<Dimension>> for AnnotationValue {
    fn from(value: Vec<Dimension>) -> Self {
        AnnotationValue::Dimensions(value)
    }
}

/// Ordered string-keyed annotation store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Annotations {
    values: IndexMap<String, AnnotationValue>,
}

impl Annotations {
    pub fn insert(&mut self, key: &str, value: impl Into<AnnotationValue>) {
        self.values.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&AnnotationValue> {
        self.values.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AnnotationValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}
