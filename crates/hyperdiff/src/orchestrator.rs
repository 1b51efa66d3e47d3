//! Glue between the host migration pipeline and the feature differs.
//!
//! [`FeatureDiffer`] turns two snapshots into feature operations and splices
//! them into the host's operation list. [`emit`] later renders that list into
//! a [`StatementSink`], leaving host operations to the host.

use crate::defaults::FeatureDefaults;
use crate::diff::{diff_continuous_aggregates, diff_hypertables, diff_reorder_policies};
use crate::extract;
use crate::generate::{GenerateOptions, generate};
use crate::operation::{
    FeatureOperation, HostOperationKind, HypertableOperation, MigrationOperation,
};
use crate::snapshot::SchemaSnapshot;
use crate::Result;

/// Runs every feature differ over a pair of snapshots.
#[derive(Debug, Clone, Default)]
pub struct FeatureDiffer {
    defaults: FeatureDefaults,
}

impl FeatureDiffer {
    pub fn new(defaults: FeatureDefaults) -> Self {
        Self { defaults }
    }

    pub fn defaults(&self) -> &FeatureDefaults {
        &self.defaults
    }

    /// All feature operations moving `source` to `target`.
    ///
    /// Hypertables come first, then reorder policies, then continuous
    /// aggregates. Either snapshot may be absent.
    pub fn diff(
        &self,
        source: Option<&SchemaSnapshot>,
        target: Option<&SchemaSnapshot>,
    ) -> Result<Vec<FeatureOperation>> {
        let span = tracing::debug_span!("feature_diff");
        let _guard = span.enter();

        let mut ops: Vec<FeatureOperation> = Vec::new();

        let hypertables = diff_hypertables(
            &extract::hypertables(source)?,
            &extract::hypertables(target)?,
        );
        ops.extend(hypertables.into_iter().map(Into::into));

        let reorder = diff_reorder_policies(
            &extract::reorder_policies(source, &self.defaults)?,
            &extract::reorder_policies(target, &self.defaults)?,
        );
        ops.extend(reorder.into_iter().map(Into::into));

        let aggregates = diff_continuous_aggregates(
            &extract::continuous_aggregates(source, &self.defaults)?,
            &extract::continuous_aggregates(target, &self.defaults)?,
        );
        ops.extend(aggregates.into_iter().map(Into::into));

        tracing::debug!(operations = ops.len(), "feature diff complete");
        Ok(ops)
    }

    /// Diff and splice the result into the host's operation list.
    pub fn diff_into(
        &self,
        source: Option<&SchemaSnapshot>,
        target: Option<&SchemaSnapshot>,
        operations: &mut Vec<MigrationOperation>,
    ) -> Result<()> {
        let features = self.diff(source, target)?;
        merge_into(operations, features);
        Ok(())
    }
}

/// Splice feature operations into the host's list.
///
/// A hypertable creation lands right after the host operation that creates
/// its table, so the table exists when `create_hypertable` runs. Without such
/// an operation it is appended, like every other feature operation.
pub fn merge_into(operations: &mut Vec<MigrationOperation>, features: Vec<FeatureOperation>) {
    for op in features {
        let position = match &op {
            FeatureOperation::Hypertable(HypertableOperation::Create(h)) => {
                operations.iter().position(|existing| {
                    matches!(
                        existing,
                        MigrationOperation::Host(host)
                            if host.kind == HostOperationKind::CreateTable
                                && host.table == h.table_name
                                && host.schema.as_deref().is_none_or(|s| s == h.schema)
                    )
                })
            }
            _ => None,
        };
        match position {
            Some(index) => operations.insert(index + 1, MigrationOperation::Feature(op)),
            None => operations.push(MigrationOperation::Feature(op)),
        }
    }
}

/// Receives generated statements in execution order.
///
/// Transactions and batching are up to the implementor.
pub trait StatementSink {
    fn push_statements(&mut self, statements: Vec<String>);
}

impl StatementSink for Vec<String> {
    fn push_statements(&mut self, statements: Vec<String>) {
        self.extend(statements);
    }
}

/// Generate SQL for every feature operation, in list order.
pub fn emit(
    operations: &[MigrationOperation],
    opts: &GenerateOptions,
    sink: &mut impl StatementSink,
) -> Result<()> {
    for op in operations {
        if let MigrationOperation::Feature(feature) = op {
            sink.push_statements(generate(feature, opts)?);
        }
    }
    Ok(())
}

/// Render feature operations as one reviewable script.
pub fn to_sql_script(operations: &[MigrationOperation], opts: &GenerateOptions) -> Result<String> {
    let mut sql = String::new();
    for op in operations {
        let MigrationOperation::Feature(feature) = op else {
            continue;
        };
        sql.push_str(&format!("-- {}\n", feature));
        for statement in generate(feature, opts)? {
            sql.push_str(&statement);
            sql.push('\n');
        }
        sql.push('\n');
    }
    Ok(sql)
}
