//! Feature descriptors.
//!
//! A descriptor is the extracted, typed configuration of one TimescaleDB
//! object in one schema snapshot. Descriptors are plain values: they are built
//! once per snapshot (see [`crate::extract`]) and never mutated afterwards.

use crate::defaults::{ContinuousAggregateDefaults, RefreshPolicyDefaults, ReorderPolicyDefaults};
use crate::{Error, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use std::collections::HashSet;

/// Schema used when a snapshot object does not name one.
pub const DEFAULT_SCHEMA: &str = "public";

/// A table partitioned into chunks by TimescaleDB.
#[derive(Debug, Clone, PartialEq)]
pub struct HypertableDescriptor {
    pub table_name: String,
    pub schema: String,
    pub time_column_name: String,
    /// Raw unit count or interval literal; empty means "server default".
    pub chunk_time_interval: String,
    pub enable_compression: bool,
    pub chunk_skip_columns: Option<Vec<String>>,
    pub additional_dimensions: Vec<Dimension>,
    /// Only meaningful when the hypertable is created.
    pub migrate_data: bool,
}

impl HypertableDescriptor {
    pub fn new(table_name: impl Into<String>, time_column_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            schema: DEFAULT_SCHEMA.to_string(),
            time_column_name: time_column_name.into(),
            chunk_time_interval: String::new(),
            enable_compression: false,
            chunk_skip_columns: None,
            additional_dimensions: Vec::new(),
            migrate_data: false,
        }
    }

    /// Chunk skipping needs compression, so configuring skip columns turns it on.
    pub fn effective_compression(&self) -> bool {
        effective_compression(self.enable_compression, self.chunk_skip_columns.as_deref())
    }
}

pub(crate) fn effective_compression(enabled: bool, skip_columns: Option<&[String]>) -> bool {
    enabled || skip_columns.is_some_and(|cols| !cols.is_empty())
}

/// Order-insensitive comparison where `None` and `Some([])` are the same.
pub(crate) fn same_column_set(a: Option<&[String]>, b: Option<&[String]>) -> bool {
    let a: HashSet<&str> = a.unwrap_or_default().iter().map(String::as_str).collect();
    let b: HashSet<&str> = b.unwrap_or_default().iter().map(String::as_str).collect();
    a == b
}

/// An extra partitioning axis on a hypertable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dimension {
    pub column_name: String,
    pub partitioning: Partitioning,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Partitioning {
    /// Range partitioning; interval follows the same numeric-or-literal rule
    /// as a chunk time interval.
    Range { interval: String },
    /// Hash partitioning into a fixed number of partitions.
    Hash { partitions: i32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DimensionKind {
    Range,
    Hash,
}

impl Dimension {
    pub fn range(column_name: impl Into<String>, interval: impl Into<String>) -> Self {
        Self {
            column_name: column_name.into(),
            partitioning: Partitioning::Range {
                interval: interval.into(),
            },
        }
    }

    pub fn hash(column_name: impl Into<String>, partitions: i32) -> Self {
        Self {
            column_name: column_name.into(),
            partitioning: Partitioning::Hash { partitions },
        }
    }

    pub fn kind(&self) -> DimensionKind {
        match self.partitioning {
            Partitioning::Range { .. } => DimensionKind::Range,
            Partitioning::Hash { .. } => DimensionKind::Hash,
        }
    }
}

impl std::fmt::Display for Dimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.partitioning {
            Partitioning::Range { interval } => {
                write!(f, "{} (range, {})", self.column_name, interval)
            }
            Partitioning::Hash { partitions } => {
                write!(f, "{} (hash, {} partitions)", self.column_name, partitions)
            }
        }
    }
}

/// A background job clustering a hypertable's chunks by an index.
#[derive(Debug, Clone, PartialEq)]
pub struct ReorderPolicyDescriptor {
    pub table_name: String,
    pub schema: String,
    pub index_name: String,
    pub initial_start: Option<DateTime<Utc>>,
    pub schedule_interval: String,
    pub max_runtime: String,
    pub max_retries: Option<i32>,
    pub retry_period: String,
}

impl ReorderPolicyDescriptor {
    /// A policy with every job setting at its default.
    pub fn new(
        table_name: impl Into<String>,
        index_name: impl Into<String>,
        defaults: &ReorderPolicyDefaults,
    ) -> Self {
        Self {
            table_name: table_name.into(),
            schema: DEFAULT_SCHEMA.to_string(),
            index_name: index_name.into(),
            initial_start: None,
            schedule_interval: defaults.schedule_interval.clone(),
            max_runtime: defaults.max_runtime.clone(),
            max_retries: None,
            retry_period: defaults.retry_period.clone(),
        }
    }

    /// Parse and set the first run time.
    pub fn with_initial_start(mut self, value: &str) -> Result<Self> {
        self.initial_start = Some(parse_timestamp("InitialStart", value)?);
        Ok(self)
    }
}

/// A time-bucketed, incrementally refreshed materialized view.
#[derive(Debug, Clone, PartialEq)]
pub struct ContinuousAggregateDescriptor {
    pub view_name: String,
    pub schema: String,
    pub parent_name: String,
    pub time_bucket_width: String,
    pub time_bucket_source_column: String,
    pub time_bucket_group_by: bool,
    pub chunk_interval: Option<String>,
    pub create_group_indexes: bool,
    pub materialized_only: bool,
    /// Only meaningful when the view is created.
    pub with_no_data: bool,
    pub where_clause: Option<String>,
    /// Column names or raw SQL expressions.
    pub group_by_columns: Option<Vec<String>>,
    pub aggregate_functions: Option<Vec<AggregateSpec>>,
}

impl ContinuousAggregateDescriptor {
    pub fn new(
        view_name: impl Into<String>,
        parent_name: impl Into<String>,
        time_bucket_width: impl Into<String>,
        time_bucket_source_column: impl Into<String>,
        defaults: &ContinuousAggregateDefaults,
    ) -> Self {
        Self {
            view_name: view_name.into(),
            schema: DEFAULT_SCHEMA.to_string(),
            parent_name: parent_name.into(),
            time_bucket_width: time_bucket_width.into(),
            time_bucket_source_column: time_bucket_source_column.into(),
            time_bucket_group_by: defaults.time_bucket_group_by,
            chunk_interval: None,
            create_group_indexes: defaults.create_group_indexes,
            materialized_only: defaults.materialized_only,
            with_no_data: false,
            where_clause: None,
            group_by_columns: None,
            aggregate_functions: None,
        }
    }
}

/// Aggregate functions a continuous aggregate may compute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AggregateFunction {
    Avg,
    Max,
    Min,
    Sum,
    Count,
    First,
    Last,
    /// A name outside the known set; rejected when SQL is generated.
    Unsupported(String),
}

impl AggregateFunction {
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "avg" => AggregateFunction::Avg,
            "max" => AggregateFunction::Max,
            "min" => AggregateFunction::Min,
            "sum" => AggregateFunction::Sum,
            "count" => AggregateFunction::Count,
            "first" => AggregateFunction::First,
            "last" => AggregateFunction::Last,
            _ => AggregateFunction::Unsupported(name.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            AggregateFunction::Avg => "Avg",
            AggregateFunction::Max => "Max",
            AggregateFunction::Min => "Min",
            AggregateFunction::Sum => "Sum",
            AggregateFunction::Count => "Count",
            AggregateFunction::First => "First",
            AggregateFunction::Last => "Last",
            AggregateFunction::Unsupported(name) => name,
        }
    }
}

/// One aggregated output column: `<function>(<source_column>) AS <alias>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateSpec {
    pub alias: String,
    pub function: AggregateFunction,
    pub source_column: String,
}

impl AggregateSpec {
    pub fn new(
        alias: impl Into<String>,
        function: AggregateFunction,
        source_column: impl Into<String>,
    ) -> Self {
        Self {
            alias: alias.into(),
            function,
            source_column: source_column.into(),
        }
    }

    /// Decode the `Alias:Function:SourceColumn` metadata form.
    ///
    /// Returns `None` unless the value splits into exactly three parts.
    pub fn decode(encoded: &str) -> Option<Self> {
        let parts: Vec<&str> = encoded.split(':').map(str::trim).collect();
        match parts.as_slice() {
            [alias, function, source] => Some(Self::new(
                *alias,
                AggregateFunction::from_name(function),
                *source,
            )),
            _ => None,
        }
    }
}

/// A scheduled job refreshing a continuous aggregate over a sliding window.
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshPolicyDescriptor {
    pub view_name: String,
    pub schema: String,
    /// `None` means an unbounded window start.
    pub start_offset: Option<String>,
    /// `None` means an unbounded window end.
    pub end_offset: Option<String>,
    pub schedule_interval: Option<String>,
    pub if_not_exists: bool,
    pub timezone: Option<String>,
    pub include_tiered_data: Option<bool>,
    pub buckets_per_batch: i32,
    pub max_batches_per_execution: i32,
    pub refresh_newest_first: bool,
    pub initial_start: Option<DateTime<Utc>>,
}

/// Validating constructor for [`RefreshPolicyDescriptor`].
///
/// Values are checked in [`RefreshPolicyBuilder::build`], so a bad
/// configuration never reaches a generator.
#[derive(Debug, Clone)]
pub struct RefreshPolicyBuilder {
    view_name: String,
    schema: String,
    start_offset: Option<String>,
    end_offset: Option<String>,
    schedule_interval: Option<String>,
    if_not_exists: bool,
    timezone: Option<String>,
    include_tiered_data: Option<bool>,
    buckets_per_batch: i32,
    max_batches_per_execution: i32,
    refresh_newest_first: bool,
    initial_start: Option<String>,
}

impl RefreshPolicyBuilder {
    pub fn new(view_name: impl Into<String>, defaults: &RefreshPolicyDefaults) -> Self {
        Self {
            view_name: view_name.into(),
            schema: DEFAULT_SCHEMA.to_string(),
            start_offset: None,
            end_offset: None,
            schedule_interval: None,
            if_not_exists: false,
            timezone: None,
            include_tiered_data: None,
            buckets_per_batch: defaults.buckets_per_batch,
            max_batches_per_execution: defaults.max_batches_per_execution,
            refresh_newest_first: defaults.refresh_newest_first,
            initial_start: None,
        }
    }

    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = schema.into();
        self
    }

    pub fn start_offset(mut self, offset: impl Into<String>) -> Self {
        self.start_offset = Some(offset.into());
        self
    }

    pub fn end_offset(mut self, offset: impl Into<String>) -> Self {
        self.end_offset = Some(offset.into());
        self
    }

    pub fn schedule_interval(mut self, interval: impl Into<String>) -> Self {
        self.schedule_interval = Some(interval.into());
        self
    }

    pub fn if_not_exists(mut self, yes: bool) -> Self {
        self.if_not_exists = yes;
        self
    }

    pub fn timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = Some(timezone.into());
        self
    }

    pub fn include_tiered_data(mut self, include: bool) -> Self {
        self.include_tiered_data = Some(include);
        self
    }

    pub fn buckets_per_batch(mut self, n: i32) -> Self {
        self.buckets_per_batch = n;
        self
    }

    pub fn max_batches_per_execution(mut self, n: i32) -> Self {
        self.max_batches_per_execution = n;
        self
    }

    pub fn refresh_newest_first(mut self, yes: bool) -> Self {
        self.refresh_newest_first = yes;
        self
    }

    pub fn initial_start(mut self, value: impl Into<String>) -> Self {
        self.initial_start = Some(value.into());
        self
    }

    pub fn build(self) -> Result<RefreshPolicyDescriptor> {
        if self.buckets_per_batch < 1 {
            return Err(Error::OutOfRange {
                field: "BucketsPerBatch".to_string(),
                value: self.buckets_per_batch.into(),
                expected: "an integer >= 1".to_string(),
            });
        }
        if self.max_batches_per_execution < 0 {
            return Err(Error::OutOfRange {
                field: "MaxBatchesPerExecution".to_string(),
                value: self.max_batches_per_execution.into(),
                expected: "an integer >= 0 (0 means unlimited)".to_string(),
            });
        }
        let initial_start = self
            .initial_start
            .as_deref()
            .map(|value| parse_timestamp("InitialStart", value))
            .transpose()?;

        Ok(RefreshPolicyDescriptor {
            view_name: self.view_name,
            schema: self.schema,
            start_offset: self.start_offset,
            end_offset: self.end_offset,
            schedule_interval: self.schedule_interval,
            if_not_exists: self.if_not_exists,
            timezone: self.timezone,
            include_tiered_data: self.include_tiered_data,
            buckets_per_batch: self.buckets_per_batch,
            max_batches_per_execution: self.max_batches_per_execution,
            refresh_newest_first: self.refresh_newest_first,
            initial_start,
        })
    }
}

/// Parse a configured timestamp. Values without an offset are taken as UTC.
pub fn parse_timestamp(field: &str, value: &str) -> Result<DateTime<Utc>> {
    let trimmed = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(naive.and_utc());
        }
    }
    if let Some(midnight) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
    {
        return Ok(midnight.and_utc());
    }
    Err(Error::InvalidTimestamp {
        field: field.to_string(),
        value: value.to_string(),
    })
}

/// Render a timestamp the way it appears in generated statements.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}
