use super::index_by;
use crate::model::ReorderPolicyDescriptor;
use crate::operation::{AlterReorderPolicy, ReorderPolicyOperation};

/// Diff reorder policies, matched by table name.
pub fn diff_reorder_policies(
    source: &[ReorderPolicyDescriptor],
    target: &[ReorderPolicyDescriptor],
) -> Vec<ReorderPolicyOperation> {
    let current = index_by(source, |p| p.table_name.as_str());
    let desired = index_by(target, |p| p.table_name.as_str());
    let mut ops = Vec::new();

    for (name, existing) in &current {
        if !desired.contains_key(name) {
            ops.push(ReorderPolicyOperation::Drop {
                table_name: existing.table_name.clone(),
                schema: existing.schema.clone(),
            });
        }
    }

    for (name, wanted) in &desired {
        match current.get(name) {
            None => ops.push(ReorderPolicyOperation::Add((*wanted).clone())),
            Some(existing) => {
                let alter = AlterReorderPolicy::between(existing, wanted);
                if alter.has_changes() {
                    ops.push(ReorderPolicyOperation::Alter(alter));
                }
            }
        }
    }

    tracing::debug!(operations = ops.len(), "diffed reorder policies");
    ops
}
