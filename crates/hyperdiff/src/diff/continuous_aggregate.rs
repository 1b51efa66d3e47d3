use super::index_by;
use crate::model::ContinuousAggregateDescriptor;
use crate::operation::{AlterContinuousAggregate, ContinuousAggregateOperation, Delta};

/// Diff continuous aggregates, matched by view name.
///
/// The view's query cannot be redefined in place, so any change to it is a
/// drop of the old view followed by a create of the new one. Only the chunk
/// interval, group index and materialized-only settings are altered in place.
pub fn diff_continuous_aggregates(
    source: &[ContinuousAggregateDescriptor],
    target: &[ContinuousAggregateDescriptor],
) -> Vec<ContinuousAggregateOperation> {
    let current = index_by(source, |v| v.view_name.as_str());
    let desired = index_by(target, |v| v.view_name.as_str());
    let mut ops = Vec::new();

    for (name, existing) in &current {
        if !desired.contains_key(name) {
            ops.push(drop_of(existing));
        }
    }

    for (name, wanted) in &desired {
        let Some(existing) = current.get(name) else {
            ops.push(ContinuousAggregateOperation::Create((*wanted).clone()));
            continue;
        };

        if structure_changed(existing, wanted) {
            tracing::debug!(view = %name, "continuous aggregate query changed, recreating");
            ops.push(drop_of(existing));
            ops.push(ContinuousAggregateOperation::Create((*wanted).clone()));
            continue;
        }

        let alter = AlterContinuousAggregate {
            view_name: wanted.view_name.clone(),
            schema: wanted.schema.clone(),
            chunk_interval: Delta::new(existing.chunk_interval.clone(), wanted.chunk_interval.clone()),
            create_group_indexes: Delta::new(
                existing.create_group_indexes,
                wanted.create_group_indexes,
            ),
            materialized_only: Delta::new(existing.materialized_only, wanted.materialized_only),
        };
        if alter.chunk_interval.is_changed()
            || alter.create_group_indexes.is_changed()
            || alter.materialized_only.is_changed()
        {
            ops.push(ContinuousAggregateOperation::Alter(alter));
        }
    }

    tracing::debug!(operations = ops.len(), "diffed continuous aggregates");
    ops
}

fn drop_of(view: &ContinuousAggregateDescriptor) -> ContinuousAggregateOperation {
    ContinuousAggregateOperation::Drop {
        view_name: view.view_name.clone(),
        schema: view.schema.clone(),
    }
}

/// Whether anything baked into the view's defining query changed.
fn structure_changed(
    existing: &ContinuousAggregateDescriptor,
    wanted: &ContinuousAggregateDescriptor,
) -> bool {
    existing.parent_name != wanted.parent_name
        || existing.time_bucket_width != wanted.time_bucket_width
        || existing.time_bucket_source_column != wanted.time_bucket_source_column
        || existing.where_clause != wanted.where_clause
        || !same_list(
            existing.aggregate_functions.as_deref(),
            wanted.aggregate_functions.as_deref(),
        )
        || !same_list(
            existing.group_by_columns.as_deref(),
            wanted.group_by_columns.as_deref(),
        )
}

/// Ordered list equality where an absent list equals an empty one.
fn same_list<T: PartialEq>(a: Option<&[T]>, b: Option<&[T]>) -> bool {
    a.unwrap_or_default() == b.unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::ContinuousAggregateDefaults;
    use crate::model::{AggregateFunction, AggregateSpec};

    fn hourly() -> ContinuousAggregateDescriptor {
        ContinuousAggregateDescriptor::new(
            "hourly_metrics",
            "Metrics",
            "1 hour",
            "Timestamp",
            &ContinuousAggregateDefaults::default(),
        )
    }

    fn avg_value() -> Vec<AggregateSpec> {
        vec![AggregateSpec::new("AvgValue", AggregateFunction::Avg, "Value")]
    }

    #[test]
    fn test_create_and_drop() {
        let ops = diff_continuous_aggregates(&[], &[hourly()]);
        assert_eq!(ops, vec![ContinuousAggregateOperation::Create(hourly())]);

        let ops = diff_continuous_aggregates(&[hourly()], &[]);
        assert_eq!(
            ops,
            vec![ContinuousAggregateOperation::Drop {
                view_name: "hourly_metrics".to_string(),
                schema: "public".to_string(),
            }]
        );
    }

    #[test]
    fn test_identical_produces_nothing() {
        let mut view = hourly();
        view.aggregate_functions = Some(avg_value());
        view.group_by_columns = Some(vec!["DeviceId".to_string()]);
        view.chunk_interval = Some("7 days".to_string());
        assert!(diff_continuous_aggregates(&[view.clone()], &[view]).is_empty());
    }

    #[test]
    fn test_both_null_aggregates_is_no_op() {
        assert!(diff_continuous_aggregates(&[hourly()], &[hourly()]).is_empty());
    }

    #[test]
    fn test_null_vs_populated_aggregates_recreates() {
        let mut populated = hourly();
        populated.aggregate_functions = Some(avg_value());

        for (old, new) in [(hourly(), populated.clone()), (populated, hourly())] {
            let ops = diff_continuous_aggregates(&[old], &[new]);
            assert_eq!(ops.len(), 2, "{ops:?}");
            assert!(matches!(ops[0], ContinuousAggregateOperation::Drop { .. }));
            assert!(matches!(ops[1], ContinuousAggregateOperation::Create(_)));
        }
    }

    #[test]
    fn test_null_vs_empty_group_by_is_equal() {
        let mut empty = hourly();
        empty.group_by_columns = Some(vec![]);
        assert!(diff_continuous_aggregates(&[hourly()], &[empty]).is_empty());
    }

    #[test]
    fn test_alterable_changes_alter_in_place() {
        let mut wanted = hourly();
        wanted.chunk_interval = Some("30 days".to_string());
        wanted.create_group_indexes = true;
        wanted.materialized_only = true;

        let ops = diff_continuous_aggregates(&[hourly()], &[wanted]);
        let [ContinuousAggregateOperation::Alter(alter)] = ops.as_slice() else {
            panic!("expected a single alter, got {ops:?}");
        };
        assert_eq!(alter.chunk_interval.new.as_deref(), Some("30 days"));
        assert!(alter.create_group_indexes.is_changed());
        assert!(alter.materialized_only.is_changed());
    }

    #[test]
    fn test_bucket_width_change_drops_then_creates() {
        let mut wanted = hourly();
        wanted.time_bucket_width = "15 minutes".to_string();
        wanted.materialized_only = true;

        let ops = diff_continuous_aggregates(&[hourly()], &[wanted.clone()]);
        assert_eq!(
            ops,
            vec![
                ContinuousAggregateOperation::Drop {
                    view_name: "hourly_metrics".to_string(),
                    schema: "public".to_string(),
                },
                ContinuousAggregateOperation::Create(wanted),
            ]
        );
    }

    #[test]
    fn test_where_clause_and_group_order_are_structural() {
        let mut filtered = hourly();
        filtered.where_clause = Some("\"Value\" > 0".to_string());
        assert_eq!(diff_continuous_aggregates(&[hourly()], &[filtered]).len(), 2);

        let mut ab = hourly();
        ab.group_by_columns = Some(vec!["A".to_string(), "B".to_string()]);
        let mut ba = hourly();
        ba.group_by_columns = Some(vec!["B".to_string(), "A".to_string()]);
        assert_eq!(diff_continuous_aggregates(&[ab], &[ba]).len(), 2);
    }
}
