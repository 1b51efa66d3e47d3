//! Descriptor extraction from snapshot annotations.
//!
//! Every function here accepts an absent snapshot and yields nothing for it.
//! Malformed configuration fails here, before any diffing happens.

use crate::defaults::FeatureDefaults;
use crate::model::{
    AggregateSpec, ContinuousAggregateDescriptor, Dimension, HypertableDescriptor,
    RefreshPolicyBuilder, RefreshPolicyDescriptor, ReorderPolicyDescriptor,
};
use crate::snapshot::{AnnotationValue, SchemaSnapshot, SnapshotObject, keys};
use crate::{Error, Result};

/// Typed access to one object's annotations.
struct Reader<'a> {
    object: &'a SnapshotObject,
}

impl<'a> Reader<'a> {
    fn new(object: &'a SnapshotObject) -> Self {
        Self { object }
    }

    fn invalid(&self, key: &str, expected: &str, found: &AnnotationValue) -> Error {
        Error::InvalidAnnotation {
            object: self.object.name.clone(),
            key: key.to_string(),
            expected: format!("{} (found {})", expected, found.shape()),
        }
    }

    fn text(&self, key: &str) -> Result<Option<&'a str>> {
        match self.object.annotations.get(key) {
            None => Ok(None),
            Some(AnnotationValue::Text(s)) => Ok(Some(s.as_str())),
            Some(other) => Err(self.invalid(key, "text", other)),
        }
    }

    /// Text that is absent when empty or whitespace.
    fn non_empty_text(&self, key: &str) -> Result<Option<&'a str>> {
        Ok(self.text(key)?.filter(|s| !s.trim().is_empty()))
    }

    fn required_text(&self, key: &str) -> Result<&'a str> {
        self.non_empty_text(key)?
            .ok_or_else(|| Error::MissingAnnotation {
                object: self.object.name.clone(),
                key: key.to_string(),
            })
    }

    fn flag(&self, key: &str) -> Result<Option<bool>> {
        match self.object.annotations.get(key) {
            None => Ok(None),
            Some(AnnotationValue::Flag(b)) => Ok(Some(*b)),
            Some(v @ AnnotationValue::Text(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" => Ok(Some(true)),
                "false" => Ok(Some(false)),
                _ => Err(self.invalid(key, "a flag", v)),
            },
            Some(other) => Err(self.invalid(key, "a flag", other)),
        }
    }

    fn integer(&self, key: &str) -> Result<Option<i64>> {
        match self.object.annotations.get(key) {
            None => Ok(None),
            Some(AnnotationValue::Integer(n)) => Ok(Some(*n)),
            Some(v @ AnnotationValue::Text(s)) => s
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| self.invalid(key, "an integer", v)),
            Some(other) => Err(self.invalid(key, "an integer", other)),
        }
    }

    fn int32(&self, key: &str) -> Result<Option<i32>> {
        match self.integer(key)? {
            None => Ok(None),
            Some(n) => i32::try_from(n)
                .map(Some)
                .map_err(|_| Error::OutOfRange {
                    field: key.to_string(),
                    value: n,
                    expected: "a 32-bit integer".to_string(),
                }),
        }
    }

    /// A list, also accepted as comma-separated text. Commas inside
    /// parentheses or quotes do not separate entries.
    fn list(&self, key: &str) -> Result<Option<Vec<String>>> {
        match self.object.annotations.get(key) {
            None => Ok(None),
            Some(AnnotationValue::List(items)) => Ok(Some(items.clone())),
            Some(AnnotationValue::Text(s)) => Ok(Some(split_top_level(s))),
            Some(other) => Err(self.invalid(key, "a list", other)),
        }
    }

    fn dimensions(&self, key: &str) -> Result<Vec<Dimension>> {
        match self.object.annotations.get(key) {
            None => Ok(Vec::new()),
            Some(AnnotationValue::Dimensions(dims)) => Ok(dims.clone()),
            Some(other) => Err(self.invalid(key, "a dimension list", other)),
        }
    }
}

/// Split on commas that sit outside parentheses and quoted text.
fn split_top_level(text: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => depth = depth.saturating_sub(1),
            (None, ',') if depth == 0 => {
                parts.push(&text[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
        .into_iter()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(String::from)
        .collect()
}

fn objects(snapshot: Option<&SchemaSnapshot>) -> &[SnapshotObject] {
    snapshot.map(|s| s.objects.as_slice()).unwrap_or_default()
}

/// Drop repeated entries, keeping the first occurrence.
fn dedup_preserving_order(items: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

/// Every table explicitly marked as a hypertable.
pub fn hypertables(snapshot: Option<&SchemaSnapshot>) -> Result<Vec<HypertableDescriptor>> {
    let mut out = Vec::new();
    for object in objects(snapshot) {
        let reader = Reader::new(object);
        if reader.flag(keys::IS_HYPERTABLE)? != Some(true) {
            continue;
        }
        let chunk_skip_columns = reader
            .list(keys::CHUNK_SKIP_COLUMNS)?
            .map(dedup_preserving_order);
        let enable_compression = reader.flag(keys::ENABLE_COMPRESSION)?.unwrap_or(false)
            || chunk_skip_columns.as_ref().is_some_and(|c| !c.is_empty());

        out.push(HypertableDescriptor {
            table_name: object.name.clone(),
            schema: object.schema_or_default().to_string(),
            time_column_name: reader.required_text(keys::TIME_COLUMN)?.to_string(),
            chunk_time_interval: reader
                .non_empty_text(keys::CHUNK_TIME_INTERVAL)?
                .unwrap_or_default()
                .to_string(),
            enable_compression,
            chunk_skip_columns,
            additional_dimensions: reader.dimensions(keys::ADDITIONAL_DIMENSIONS)?,
            migrate_data: reader.flag(keys::MIGRATE_DATA)?.unwrap_or(false),
        });
    }
    Ok(out)
}

/// Every table with a reorder index configured.
pub fn reorder_policies(
    snapshot: Option<&SchemaSnapshot>,
    defaults: &FeatureDefaults,
) -> Result<Vec<ReorderPolicyDescriptor>> {
    let defaults = &defaults.reorder_policy;
    let mut out = Vec::new();
    for object in objects(snapshot) {
        let reader = Reader::new(object);
        let Some(index_name) = reader.non_empty_text(keys::REORDER_INDEX)? else {
            continue;
        };
        let mut policy = ReorderPolicyDescriptor::new(&object.name, index_name, defaults);
        policy.schema = object.schema_or_default().to_string();
        if let Some(start) = reader.non_empty_text(keys::REORDER_INITIAL_START)? {
            policy = policy.with_initial_start(start)?;
        }
        if let Some(v) = reader.non_empty_text(keys::REORDER_SCHEDULE_INTERVAL)? {
            policy.schedule_interval = v.to_string();
        }
        if let Some(v) = reader.non_empty_text(keys::REORDER_MAX_RUNTIME)? {
            policy.max_runtime = v.to_string();
        }
        if let Some(v) = reader.non_empty_text(keys::REORDER_RETRY_PERIOD)? {
            policy.retry_period = v.to_string();
        }
        policy.max_retries = reader.int32(keys::REORDER_MAX_RETRIES)?;
        out.push(policy);
    }
    Ok(out)
}

/// Every view marked as a continuous aggregate.
pub fn continuous_aggregates(
    snapshot: Option<&SchemaSnapshot>,
    defaults: &FeatureDefaults,
) -> Result<Vec<ContinuousAggregateDescriptor>> {
    let defaults = &defaults.continuous_aggregate;
    let mut out = Vec::new();
    for object in objects(snapshot) {
        let reader = Reader::new(object);
        if reader.flag(keys::CONTINUOUS_AGGREGATE)? != Some(true) {
            continue;
        }
        let aggregate_functions = reader.list(keys::AGGREGATE_FUNCTIONS)?.map(|entries| {
            entries
                .iter()
                .filter_map(|entry| {
                    let spec = AggregateSpec::decode(entry);
                    if spec.is_none() {
                        tracing::warn!(
                            view = %object.name,
                            entry = %entry,
                            "skipping aggregate function that is not Alias:Function:SourceColumn"
                        );
                    }
                    spec
                })
                .collect::<Vec<_>>()
        });

        let mut view = ContinuousAggregateDescriptor::new(
            &object.name,
            reader.required_text(keys::PARENT)?,
            reader.required_text(keys::TIME_BUCKET_WIDTH)?,
            reader.required_text(keys::TIME_BUCKET_SOURCE_COLUMN)?,
            defaults,
        );
        view.schema = object.schema_or_default().to_string();
        if let Some(v) = reader.flag(keys::TIME_BUCKET_GROUP_BY)? {
            view.time_bucket_group_by = v;
        }
        view.chunk_interval = reader.non_empty_text(keys::CHUNK_INTERVAL)?.map(String::from);
        if let Some(v) = reader.flag(keys::CREATE_GROUP_INDEXES)? {
            view.create_group_indexes = v;
        }
        if let Some(v) = reader.flag(keys::MATERIALIZED_ONLY)? {
            view.materialized_only = v;
        }
        view.with_no_data = reader.flag(keys::WITH_NO_DATA)?.unwrap_or(false);
        view.where_clause = reader.non_empty_text(keys::WHERE_CLAUSE)?.map(String::from);
        view.group_by_columns = reader.list(keys::GROUP_BY_COLUMNS)?;
        view.aggregate_functions = aggregate_functions;
        out.push(view);
    }
    Ok(out)
}

const REFRESH_KEYS: [&str; 10] = [
    keys::REFRESH_START_OFFSET,
    keys::REFRESH_END_OFFSET,
    keys::REFRESH_SCHEDULE_INTERVAL,
    keys::REFRESH_IF_NOT_EXISTS,
    keys::REFRESH_TIMEZONE,
    keys::REFRESH_INCLUDE_TIERED_DATA,
    keys::REFRESH_BUCKETS_PER_BATCH,
    keys::REFRESH_MAX_BATCHES_PER_EXECUTION,
    keys::REFRESH_NEWEST_FIRST,
    keys::REFRESH_INITIAL_START,
];

/// Refresh policies configured on continuous aggregate views.
pub fn refresh_policies(
    snapshot: Option<&SchemaSnapshot>,
    defaults: &FeatureDefaults,
) -> Result<Vec<RefreshPolicyDescriptor>> {
    let mut out = Vec::new();
    for object in objects(snapshot) {
        let reader = Reader::new(object);
        if reader.flag(keys::CONTINUOUS_AGGREGATE)? != Some(true) {
            continue;
        }
        if !REFRESH_KEYS.iter().any(|k| object.annotations.contains(k)) {
            continue;
        }

        let mut builder = RefreshPolicyBuilder::new(&object.name, &defaults.refresh_policy)
            .schema(object.schema_or_default());
        if let Some(v) = reader.non_empty_text(keys::REFRESH_START_OFFSET)? {
            builder = builder.start_offset(v);
        }
        if let Some(v) = reader.non_empty_text(keys::REFRESH_END_OFFSET)? {
            builder = builder.end_offset(v);
        }
        if let Some(v) = reader.non_empty_text(keys::REFRESH_SCHEDULE_INTERVAL)? {
            builder = builder.schedule_interval(v);
        }
        if let Some(v) = reader.flag(keys::REFRESH_IF_NOT_EXISTS)? {
            builder = builder.if_not_exists(v);
        }
        if let Some(v) = reader.non_empty_text(keys::REFRESH_TIMEZONE)? {
            builder = builder.timezone(v);
        }
        if let Some(v) = reader.flag(keys::REFRESH_INCLUDE_TIERED_DATA)? {
            builder = builder.include_tiered_data(v);
        }
        if let Some(v) = reader.int32(keys::REFRESH_BUCKETS_PER_BATCH)? {
            builder = builder.buckets_per_batch(v);
        }
        if let Some(v) = reader.int32(keys::REFRESH_MAX_BATCHES_PER_EXECUTION)? {
            builder = builder.max_batches_per_execution(v);
        }
        if let Some(v) = reader.flag(keys::REFRESH_NEWEST_FIRST)? {
            builder = builder.refresh_newest_first(v);
        }
        if let Some(v) = reader.non_empty_text(keys::REFRESH_INITIAL_START)? {
            builder = builder.initial_start(v);
        }
        out.push(builder.build()?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AggregateFunction, Dimension};

    fn metrics_table() -> SnapshotObject {
        SnapshotObject::table("Metrics")
            .with(keys::IS_HYPERTABLE, true)
            .with(keys::TIME_COLUMN, "Timestamp")
    }

    #[test]
    fn test_absent_snapshot_yields_nothing() {
        let defaults = FeatureDefaults::default();
        assert!(hypertables(None).unwrap().is_empty());
        assert!(reorder_policies(None, &defaults).unwrap().is_empty());
        assert!(continuous_aggregates(None, &defaults).unwrap().is_empty());
        assert!(refresh_policies(None, &defaults).unwrap().is_empty());
    }

    #[test]
    fn test_unmarked_tables_are_ignored() {
        let snapshot = SchemaSnapshot::new(vec![
            SnapshotObject::table("Plain").with(keys::TIME_COLUMN, "Timestamp"),
            SnapshotObject::table("Off").with(keys::IS_HYPERTABLE, false),
        ]);
        assert!(hypertables(Some(&snapshot)).unwrap().is_empty());
    }

    #[test]
    fn test_hypertable_fields() {
        let snapshot = SchemaSnapshot::new(vec![
            metrics_table()
                .in_schema("telemetry")
                .with(keys::CHUNK_TIME_INTERVAL, "1 day")
                .with(keys::MIGRATE_DATA, "true")
                .with(
                    keys::ADDITIONAL_DIMENSIONS,
                    vec![Dimension::hash("DeviceId", 4)],
                ),
        ]);
        let found = hypertables(Some(&snapshot)).unwrap();
        assert_eq!(found.len(), 1);
        let h = &found[0];
        assert_eq!(h.schema, "telemetry");
        assert_eq!(h.time_column_name, "Timestamp");
        assert_eq!(h.chunk_time_interval, "1 day");
        assert!(h.migrate_data);
        assert!(!h.enable_compression);
        assert_eq!(h.chunk_skip_columns, None);
        assert_eq!(h.additional_dimensions, vec![Dimension::hash("DeviceId", 4)]);
    }

    #[test]
    fn test_chunk_skip_columns_enable_compression_and_dedup() {
        let snapshot = SchemaSnapshot::new(vec![metrics_table().with(
            keys::CHUNK_SKIP_COLUMNS,
            vec!["Value", "DeviceId", "Value"],
        )]);
        let found = hypertables(Some(&snapshot)).unwrap();
        let h = &found[0];
        assert!(h.enable_compression);
        assert_eq!(
            h.chunk_skip_columns,
            Some(vec!["Value".to_string(), "DeviceId".to_string()])
        );
    }

    #[test]
    fn test_hypertable_without_time_column_fails() {
        let snapshot = SchemaSnapshot::new(vec![
            SnapshotObject::table("Metrics").with(keys::IS_HYPERTABLE, true),
        ]);
        let err = hypertables(Some(&snapshot)).unwrap_err();
        assert_eq!(
            err,
            Error::MissingAnnotation {
                object: "Metrics".to_string(),
                key: keys::TIME_COLUMN.to_string(),
            }
        );
    }

    #[test]
    fn test_wrongly_shaped_annotation_fails() {
        let snapshot = SchemaSnapshot::new(vec![
            metrics_table().with(keys::ENABLE_COMPRESSION, vec!["yes"]),
        ]);
        let err = hypertables(Some(&snapshot)).unwrap_err();
        insta::assert_snapshot!(err.to_string(), @"annotation 'TimescaleDB:EnableCompression' on 'Metrics' must be a flag (found a list)");
    }

    #[test]
    fn test_reorder_policy_defaults_and_overrides() {
        let defaults = FeatureDefaults::default();
        let snapshot = SchemaSnapshot::new(vec![
            SnapshotObject::table("Metrics")
                .with(keys::REORDER_INDEX, "ix_metrics_time")
                .with(keys::REORDER_MAX_RETRIES, 3i64),
        ]);
        let policies = reorder_policies(Some(&snapshot), &defaults).unwrap();
        assert_eq!(policies.len(), 1);
        let p = &policies[0];
        assert_eq!(p.index_name, "ix_metrics_time");
        assert_eq!(p.schedule_interval, "1 day");
        assert_eq!(p.max_runtime, "00:00:00");
        assert_eq!(p.retry_period, "00:05:00");
        assert_eq!(p.max_retries, Some(3));
        assert_eq!(p.initial_start, None);
    }

    #[test]
    fn test_reorder_policy_invalid_initial_start() {
        let snapshot = SchemaSnapshot::new(vec![
            SnapshotObject::table("Metrics")
                .with(keys::REORDER_INDEX, "ix_metrics_time")
                .with(keys::REORDER_INITIAL_START, "invalid-date-format"),
        ]);
        let err = reorder_policies(Some(&snapshot), &FeatureDefaults::default()).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("InitialStart"), "{message}");
        assert!(message.contains("not a valid DateTime format"), "{message}");
    }

    #[test]
    fn test_continuous_aggregate_skips_malformed_functions() {
        let snapshot = SchemaSnapshot::new(vec![
            SnapshotObject::view("hourly_metrics")
                .with(keys::CONTINUOUS_AGGREGATE, true)
                .with(keys::PARENT, "Metrics")
                .with(keys::TIME_BUCKET_WIDTH, "1 hour")
                .with(keys::TIME_BUCKET_SOURCE_COLUMN, "Timestamp")
                .with(
                    keys::AGGREGATE_FUNCTIONS,
                    vec!["AvgValue:Avg:Value", "broken", "MaxValue:Max:Value"],
                )
                .with(keys::GROUP_BY_COLUMNS, "DeviceId, Region"),
        ]);
        let views = continuous_aggregates(Some(&snapshot), &FeatureDefaults::default()).unwrap();
        let view = &views[0];
        let functions = view.aggregate_functions.as_ref().unwrap();
        assert_eq!(functions.len(), 2);
        assert_eq!(functions[0].function, AggregateFunction::Avg);
        assert_eq!(functions[1].alias, "MaxValue");
        assert_eq!(
            view.group_by_columns,
            Some(vec!["DeviceId".to_string(), "Region".to_string()])
        );
        assert!(view.time_bucket_group_by);
        assert_eq!(view.chunk_interval, None);
    }

    #[test]
    fn test_group_by_text_keeps_expression_commas() {
        let snapshot = SchemaSnapshot::new(vec![
            SnapshotObject::view("hourly_metrics")
                .with(keys::CONTINUOUS_AGGREGATE, true)
                .with(keys::PARENT, "Metrics")
                .with(keys::TIME_BUCKET_WIDTH, "1 hour")
                .with(keys::TIME_BUCKET_SOURCE_COLUMN, "Timestamp")
                .with(
                    keys::GROUP_BY_COLUMNS,
                    "DeviceId, COALESCE(region, zone, country), concat(a, ',', b)",
                ),
        ]);
        let views = continuous_aggregates(Some(&snapshot), &FeatureDefaults::default()).unwrap();
        assert_eq!(
            views[0].group_by_columns,
            Some(vec![
                "DeviceId".to_string(),
                "COALESCE(region, zone, country)".to_string(),
                "concat(a, ',', b)".to_string(),
            ])
        );
    }

    #[test]
    fn test_split_top_level() {
        assert_eq!(split_top_level("a, b ,,c"), vec!["a", "b", "c"]);
        assert_eq!(
            split_top_level("f(x, g(y, z)), \"q,r\""),
            vec!["f(x, g(y, z))", "\"q,r\""]
        );
        assert!(split_top_level("  ").is_empty());
    }

    #[test]
    fn test_continuous_aggregate_requires_parent() {
        let snapshot = SchemaSnapshot::new(vec![
            SnapshotObject::view("hourly_metrics")
                .with(keys::CONTINUOUS_AGGREGATE, true)
                .with(keys::TIME_BUCKET_WIDTH, "1 hour")
                .with(keys::TIME_BUCKET_SOURCE_COLUMN, "Timestamp"),
        ]);
        let err = continuous_aggregates(Some(&snapshot), &FeatureDefaults::default()).unwrap_err();
        assert!(matches!(err, Error::MissingAnnotation { key, .. } if key == keys::PARENT));
    }

    #[test]
    fn test_refresh_policy_only_when_configured() {
        let base = SnapshotObject::view("hourly_metrics")
            .with(keys::CONTINUOUS_AGGREGATE, true)
            .with(keys::PARENT, "Metrics")
            .with(keys::TIME_BUCKET_WIDTH, "1 hour")
            .with(keys::TIME_BUCKET_SOURCE_COLUMN, "Timestamp");
        let defaults = FeatureDefaults::default();

        let bare = SchemaSnapshot::new(vec![base.clone()]);
        assert!(refresh_policies(Some(&bare), &defaults).unwrap().is_empty());

        let configured = SchemaSnapshot::new(vec![
            base.clone()
                .with(keys::REFRESH_START_OFFSET, "1 month")
                .with(keys::REFRESH_END_OFFSET, "1 hour"),
        ]);
        let policies = refresh_policies(Some(&configured), &defaults).unwrap();
        assert_eq!(policies[0].start_offset.as_deref(), Some("1 month"));
        assert_eq!(policies[0].buckets_per_batch, 1);

        let invalid = SchemaSnapshot::new(vec![base.with(keys::REFRESH_BUCKETS_PER_BATCH, 0i64)]);
        let err = refresh_policies(Some(&invalid), &defaults).unwrap_err();
        assert!(matches!(err, Error::OutOfRange { .. }));
    }
}
