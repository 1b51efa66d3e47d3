use super::index_by;
use crate::model::{HypertableDescriptor, same_column_set};
use crate::operation::{AlterHypertable, Delta, HypertableOperation};

/// Diff hypertables, matched by table name.
///
/// An alter is emitted when the chunk interval, the effective compression
/// setting or the set of chunk-skipping columns changes. Dimensions travel
/// with the alter but do not trigger one by themselves.
///
/// A hypertable that disappears produces nothing: it goes away with its
/// table, which the host pipeline drops.
pub fn diff_hypertables(
    source: &[HypertableDescriptor],
    target: &[HypertableDescriptor],
) -> Vec<HypertableOperation> {
    let current = index_by(source, |h| h.table_name.as_str());
    let mut ops = Vec::new();

    for desired in target {
        match current.get(desired.table_name.as_str()) {
            None => ops.push(HypertableOperation::Create(desired.clone())),
            Some(existing) => {
                if needs_alter(existing, desired) {
                    ops.push(HypertableOperation::Alter(AlterHypertable {
                        table_name: desired.table_name.clone(),
                        schema: desired.schema.clone(),
                        chunk_time_interval: Delta::new(
                            existing.chunk_time_interval.clone(),
                            desired.chunk_time_interval.clone(),
                        ),
                        enable_compression: Delta::new(
                            existing.enable_compression,
                            desired.enable_compression,
                        ),
                        chunk_skip_columns: Delta::new(
                            existing.chunk_skip_columns.clone(),
                            desired.chunk_skip_columns.clone(),
                        ),
                        additional_dimensions: Delta::new(
                            existing.additional_dimensions.clone(),
                            desired.additional_dimensions.clone(),
                        ),
                    }));
                }
            }
        }
    }

    tracing::debug!(operations = ops.len(), "diffed hypertables");
    ops
}

fn needs_alter(existing: &HypertableDescriptor, desired: &HypertableDescriptor) -> bool {
    existing.chunk_time_interval != desired.chunk_time_interval
        || existing.effective_compression() != desired.effective_compression()
        || !same_column_set(
            existing.chunk_skip_columns.as_deref(),
            desired.chunk_skip_columns.as_deref(),
        )
}
