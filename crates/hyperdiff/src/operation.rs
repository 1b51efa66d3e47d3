//! Change operations.
//!
//! Differs produce these, generators consume them. Alter operations carry
//! each compared field as an old/new [`Delta`] so generators can emit only
//! what actually changed.

use crate::model::{
    ContinuousAggregateDescriptor, Dimension, HypertableDescriptor, RefreshPolicyDescriptor,
    ReorderPolicyDescriptor,
};
use chrono::{DateTime, Utc};
use std::fmt;

/// A field's value before and after the migration.
#[derive(Debug, Clone, PartialEq)]
pub struct Delta<T> {
    pub old: T,
    pub new: T,
}

impl<T: PartialEq> Delta<T> {
    pub fn new(old: T, new: T) -> Self {
        Self { old, new }
    }

    pub fn is_changed(&self) -> bool {
        self.old != self.new
    }
}

/// One step in the host pipeline's ordered operation list.
#[derive(Debug, Clone, PartialEq)]
pub enum MigrationOperation {
    /// Produced by the host's table differ; its SQL is the host's business.
    Host(HostOperation),
    Feature(FeatureOperation),
}

/// Table-level operation from the host pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct HostOperation {
    pub kind: HostOperationKind,
    pub table: String,
    pub schema: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostOperationKind {
    CreateTable,
    AlterTable,
    DropTable,
    Other,
}

impl HostOperation {
    pub fn create_table(table: impl Into<String>) -> Self {
        Self {
            kind: HostOperationKind::CreateTable,
            table: table.into(),
            schema: None,
        }
    }

    pub fn new(kind: HostOperationKind, table: impl Into<String>) -> Self {
        Self {
            kind,
            table: table.into(),
            schema: None,
        }
    }
}

/// Every TimescaleDB-specific operation.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureOperation {
    Hypertable(HypertableOperation),
    ReorderPolicy(ReorderPolicyOperation),
    ContinuousAggregate(ContinuousAggregateOperation),
    RefreshPolicy(RefreshPolicyOperation),
}

#[derive(Debug, Clone, PartialEq)]
pub enum HypertableOperation {
    Create(HypertableDescriptor),
    Alter(AlterHypertable),
}

/// In-place changes to an existing hypertable.
#[derive(Debug, Clone, PartialEq)]
pub struct AlterHypertable {
    pub table_name: String,
    pub schema: String,
    pub chunk_time_interval: Delta<String>,
    pub enable_compression: Delta<bool>,
    pub chunk_skip_columns: Delta<Option<Vec<String>>>,
    pub additional_dimensions: Delta<Vec<Dimension>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReorderPolicyOperation {
    Add(ReorderPolicyDescriptor),
    Alter(AlterReorderPolicy),
    Drop { table_name: String, schema: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlterReorderPolicy {
    pub table_name: String,
    pub schema: String,
    pub index_name: Delta<String>,
    pub initial_start: Delta<Option<DateTime<Utc>>>,
    pub schedule_interval: Delta<String>,
    pub max_runtime: Delta<String>,
    pub max_retries: Delta<Option<i32>>,
    pub retry_period: Delta<String>,
}

impl AlterReorderPolicy {
    pub fn between(old: &ReorderPolicyDescriptor, new: &ReorderPolicyDescriptor) -> Self {
        Self {
            table_name: new.table_name.clone(),
            schema: new.schema.clone(),
            index_name: Delta::new(old.index_name.clone(), new.index_name.clone()),
            initial_start: Delta::new(old.initial_start, new.initial_start),
            schedule_interval: Delta::new(
                old.schedule_interval.clone(),
                new.schedule_interval.clone(),
            ),
            max_runtime: Delta::new(old.max_runtime.clone(), new.max_runtime.clone()),
            max_retries: Delta::new(old.max_retries, new.max_retries),
            retry_period: Delta::new(old.retry_period.clone(), new.retry_period.clone()),
        }
    }

    /// Whether the policy's identity changed and the job must be recreated.
    pub fn requires_recreate(&self) -> bool {
        self.index_name.is_changed() || self.initial_start.is_changed()
    }

    pub fn has_changes(&self) -> bool {
        self.requires_recreate()
            || self.schedule_interval.is_changed()
            || self.max_runtime.is_changed()
            || self.max_retries.is_changed()
            || self.retry_period.is_changed()
    }

    /// The desired policy after the migration.
    pub fn desired(&self) -> ReorderPolicyDescriptor {
        ReorderPolicyDescriptor {
            table_name: self.table_name.clone(),
            schema: self.schema.clone(),
            index_name: self.index_name.new.clone(),
            initial_start: self.initial_start.new,
            schedule_interval: self.schedule_interval.new.clone(),
            max_runtime: self.max_runtime.new.clone(),
            max_retries: self.max_retries.new,
            retry_period: self.retry_period.new.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ContinuousAggregateOperation {
    Create(ContinuousAggregateDescriptor),
    Alter(AlterContinuousAggregate),
    Drop { view_name: String, schema: String },
}

/// Changes to the properties a continuous aggregate allows in place.
#[derive(Debug, Clone, PartialEq)]
pub struct AlterContinuousAggregate {
    pub view_name: String,
    pub schema: String,
    pub chunk_interval: Delta<Option<String>>,
    pub create_group_indexes: Delta<bool>,
    pub materialized_only: Delta<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RefreshPolicyOperation {
    Add(RefreshPolicyDescriptor),
    Remove {
        view_name: String,
        schema: String,
        if_exists: bool,
    },
}

impl From<HypertableOperation> for FeatureOperation {
    fn from(op: HypertableOperation) -> Self {
        FeatureOperation::Hypertable(op)
    }
}

impl From<ReorderPolicyOperation> for FeatureOperation {
    fn from(op: ReorderPolicyOperation) -> Self {
        FeatureOperation::ReorderPolicy(op)
    }
}

impl From<ContinuousAggregateOperation> for FeatureOperation {
    fn from(op: ContinuousAggregateOperation) -> Self {
        FeatureOperation::ContinuousAggregate(op)
    }
}

impl From<RefreshPolicyOperation> for FeatureOperation {
    fn from(op: RefreshPolicyOperation) -> Self {
        FeatureOperation::RefreshPolicy(op)
    }
}

impl From<FeatureOperation> for MigrationOperation {
    fn from(op: FeatureOperation) -> Self {
        MigrationOperation::Feature(op)
    }
}

macro_rules! feature_into_migration {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for MigrationOperation {
                fn from(op: $ty) -> Self {
                    MigrationOperation::Feature(op.into())
                }
            }
        )*
    };
}

feature_into_migration!(
    HypertableOperation,
    ReorderPolicyOperation,
    ContinuousAggregateOperation,
    RefreshPolicyOperation
);

impl fmt::Display for MigrationOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MigrationOperation::Host(op) => write!(f, "{}", op),
            MigrationOperation::Feature(op) => write!(f, "{}", op),
        }
    }
}

impl fmt::Display for HostOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let schema = self.schema.as_deref().unwrap_or(crate::model::DEFAULT_SCHEMA);
        let sigil = match self.kind {
            HostOperationKind::CreateTable => "+ table",
            HostOperationKind::AlterTable => "~ table",
            HostOperationKind::DropTable => "- table",
            HostOperationKind::Other => "* table",
        };
        write!(f, "{} {}.{}", sigil, schema, self.table)
    }
}

impl fmt::Display for FeatureOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureOperation::Hypertable(HypertableOperation::Create(h)) => write!(
                f,
                "+ hypertable {}.{} on {}",
                h.schema, h.table_name, h.time_column_name
            ),
            FeatureOperation::Hypertable(HypertableOperation::Alter(a)) => {
                write!(f, "~ hypertable {}.{}", a.schema, a.table_name)
            }
            FeatureOperation::ReorderPolicy(ReorderPolicyOperation::Add(p)) => write!(
                f,
                "+ reorder policy {}.{} using {}",
                p.schema, p.table_name, p.index_name
            ),
            FeatureOperation::ReorderPolicy(ReorderPolicyOperation::Alter(a)) => {
                if a.index_name.is_changed() {
                    write!(
                        f,
                        "~ reorder policy {}.{} using {} -> {}",
                        a.schema, a.table_name, a.index_name.old, a.index_name.new
                    )
                } else {
                    write!(f, "~ reorder policy {}.{}", a.schema, a.table_name)
                }
            }
            FeatureOperation::ReorderPolicy(ReorderPolicyOperation::Drop { table_name, schema }) => {
                write!(f, "- reorder policy {}.{}", schema, table_name)
            }
            FeatureOperation::ContinuousAggregate(ContinuousAggregateOperation::Create(v)) => {
                write!(
                    f,
                    "+ continuous aggregate {}.{} over {} every {}",
                    v.schema, v.view_name, v.parent_name, v.time_bucket_width
                )
            }
            FeatureOperation::ContinuousAggregate(ContinuousAggregateOperation::Alter(a)) => {
                write!(f, "~ continuous aggregate {}.{}", a.schema, a.view_name)
            }
            FeatureOperation::ContinuousAggregate(ContinuousAggregateOperation::Drop {
                view_name,
                schema,
            }) => write!(f, "- continuous aggregate {}.{}", schema, view_name),
            FeatureOperation::RefreshPolicy(RefreshPolicyOperation::Add(p)) => {
                write!(f, "+ refresh policy {}.{}", p.schema, p.view_name)
            }
            FeatureOperation::RefreshPolicy(RefreshPolicyOperation::Remove {
                view_name,
                schema,
                ..
            }) => write!(f, "- refresh policy {}.{}", schema, view_name),
        }
    }
}
