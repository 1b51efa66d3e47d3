//! Named default values.
//!
//! Extraction fills absent settings from a [`FeatureDefaults`], and the
//! generators use the same object to decide which settings are worth spelling
//! out. Pass a modified copy to change the defaults; there is no global state.

/// Defaults for every feature family.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureDefaults {
    /// Hypertable settings.
    pub hypertable: HypertableDefaults,
    /// Reorder job settings.
    pub reorder_policy: ReorderPolicyDefaults,
    /// Continuous aggregate view options.
    pub continuous_aggregate: ContinuousAggregateDefaults,
    /// Refresh policy batching.
    pub refresh_policy: RefreshPolicyDefaults,
}

/// Hypertable settings used when none are configured.
#[derive(Debug, Clone, PartialEq)]
pub struct HypertableDefaults {
    /// Interval restored when a configured chunk interval is removed.
    pub chunk_time_interval: String,
}

impl Default for HypertableDefaults {
    fn default() -> Self {
        Self {
            chunk_time_interval: "7 days".to_string(),
        }
    }
}

/// Job settings TimescaleDB assigns to a fresh reorder policy.
#[derive(Debug, Clone, PartialEq)]
pub struct ReorderPolicyDefaults {
    /// How often the job runs.
    pub schedule_interval: String,
    /// Longest a single run may take; zero means unlimited.
    pub max_runtime: String,
    /// Retries after a failed run; -1 means retry forever.
    pub max_retries: i32,
    /// Wait between retries.
    pub retry_period: String,
}

impl Default for ReorderPolicyDefaults {
    fn default() -> Self {
        Self {
            schedule_interval: "1 day".to_string(),
            max_runtime: "00:00:00".to_string(),
            max_retries: -1,
            retry_period: "00:05:00".to_string(),
        }
    }
}

/// View options for a continuous aggregate.
#[derive(Debug, Clone, PartialEq)]
pub struct ContinuousAggregateDefaults {
    /// `timescaledb.create_group_indexes`.
    pub create_group_indexes: bool,
    /// `timescaledb.materialized_only`.
    pub materialized_only: bool,
    /// Whether `time_bucket` leads the GROUP BY list.
    pub time_bucket_group_by: bool,
}

impl Default for ContinuousAggregateDefaults {
    fn default() -> Self {
        Self {
            create_group_indexes: false,
            materialized_only: false,
            time_bucket_group_by: true,
        }
    }
}

/// Refresh batching TimescaleDB applies when the policy leaves it unset.
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshPolicyDefaults {
    /// Buckets refreshed per batch; at least 1.
    pub buckets_per_batch: i32,
    /// Batch cap per run; 0 means no limit.
    pub max_batches_per_execution: i32,
    /// Refresh the most recent buckets first.
    pub refresh_newest_first: bool,
}

impl Default for RefreshPolicyDefaults {
    fn default() -> Self {
        Self {
            buckets_per_batch: 1,
            max_batches_per_execution: 0,
            refresh_newest_first: true,
        }
    }
}
