//! Per-feature differs.
//!
//! Each differ joins the source and target descriptors by their logical key
//! and returns the operations that move source to target. Output order is
//! fully determined by input order: removals follow source order, everything
//! else follows target order.

mod continuous_aggregate;
mod hypertable;
mod reorder_policy;

pub use continuous_aggregate::diff_continuous_aggregates;
pub use hypertable::diff_hypertables;
pub use reorder_policy::diff_reorder_policies;

use indexmap::IndexMap;

/// Index descriptors by key, keeping the first one for duplicate keys.
fn index_by<'a, T>(items: &'a [T], key: impl Fn(&T) -> &str) -> IndexMap<&'a str, &'a T> {
    let mut map = IndexMap::with_capacity(items.len());
    for item in items {
        map.entry(key(item)).or_insert(item);
    }
    map
}
