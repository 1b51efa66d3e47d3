use super::GenerateOptions;
use crate::model::{AggregateFunction, AggregateSpec, ContinuousAggregateDescriptor};
use crate::operation::AlterContinuousAggregate;
use crate::{Error, Result};
use hyperdiff_sql::{Ident, IntervalValue, Lit, QuoteMode, qualified_ident};

/// One `CREATE MATERIALIZED VIEW ... WITH (timescaledb.continuous ...)` statement.
///
/// Fails if an aggregate names a function outside the supported set.
pub fn create_continuous_aggregate(
    v: &ContinuousAggregateDescriptor,
    opts: &GenerateOptions,
) -> Result<Vec<String>> {
    let source = Ident(&v.time_bucket_source_column);

    let mut with = vec![
        "timescaledb.continuous".to_string(),
        format!("timescaledb.create_group_indexes = {}", v.create_group_indexes),
        format!("timescaledb.materialized_only = {}", v.materialized_only),
    ];
    if let Some(interval) = v.chunk_interval.as_deref().filter(|i| !i.is_empty()) {
        with.push(format!("timescaledb.chunk_interval = {}", Lit(interval)));
    }

    let group_by = v.group_by_columns.as_deref().unwrap_or_default();

    let mut select = vec![format!(
        "time_bucket({}, {}) AS time_bucket",
        IntervalValue::parse(&v.time_bucket_width).to_sql_bare(),
        source
    )];
    for entry in group_by.iter().filter(|e| is_plain_column(e)) {
        select.push(Ident(entry).to_string());
    }
    for spec in v.aggregate_functions.as_deref().unwrap_or_default() {
        select.push(aggregate_expression(v, spec)?);
    }

    let mut sql = format!(
        "CREATE MATERIALIZED VIEW {} WITH ({}) AS SELECT {} FROM {}",
        qualified_ident(&v.view_name, &v.schema, QuoteMode::Execute),
        with.join(", "),
        select.join(", "),
        qualified_ident(&v.parent_name, &v.schema, QuoteMode::Execute),
    );

    if let Some(clause) = v.where_clause.as_deref().filter(|c| !c.trim().is_empty()) {
        sql.push_str(" WHERE ");
        sql.push_str(clause);
    }

    let mut grouping = Vec::new();
    if v.time_bucket_group_by {
        grouping.push("time_bucket".to_string());
    }
    for entry in group_by {
        if is_plain_column(entry) {
            grouping.push(Ident(entry).to_string());
        } else {
            grouping.push(entry.clone());
        }
    }
    if !grouping.is_empty() {
        sql.push_str(" GROUP BY ");
        sql.push_str(&grouping.join(", "));
    }

    if v.with_no_data {
        sql.push_str(" WITH NO DATA");
    }
    sql.push(';');

    Ok(vec![opts.quote.apply(&sql)])
}

/// One `ALTER MATERIALIZED VIEW ... SET` per changed property.
pub fn alter_continuous_aggregate(
    a: &AlterContinuousAggregate,
    opts: &GenerateOptions,
) -> Vec<String> {
    let view = qualified_ident(&a.view_name, &a.schema, opts.quote);
    let set = |property: &str, value: String| {
        format!(
            "ALTER MATERIALIZED VIEW {} SET (timescaledb.{} = {});",
            view, property, value
        )
    };
    let mut statements = Vec::new();

    if a.chunk_interval.is_changed() {
        let new = a.chunk_interval.new.as_deref().filter(|i| !i.is_empty());
        let old = a.chunk_interval.old.as_deref().filter(|i| !i.is_empty());
        // There is no reset for chunk_interval, so a removed value keeps the old one.
        if let Some(interval) = new.or(old) {
            statements.push(set("chunk_interval", Lit(interval).to_string()));
        }
    }
    if a.create_group_indexes.is_changed() {
        statements.push(set(
            "create_group_indexes",
            a.create_group_indexes.new.to_string(),
        ));
    }
    if a.materialized_only.is_changed() {
        statements.push(set("materialized_only", a.materialized_only.new.to_string()));
    }

    statements
}

pub fn drop_continuous_aggregate(
    view_name: &str,
    schema: &str,
    opts: &GenerateOptions,
) -> Vec<String> {
    vec![format!(
        "DROP MATERIALIZED VIEW IF EXISTS {};",
        qualified_ident(view_name, schema, opts.quote)
    )]
}

/// Entries with a comma, parenthesis or space are raw SQL expressions.
fn is_plain_column(entry: &str) -> bool {
    !entry.contains([',', '(', ')', ' '])
}

fn aggregate_expression(v: &ContinuousAggregateDescriptor, spec: &AggregateSpec) -> Result<String> {
    let column = Ident(&spec.source_column);
    let time = Ident(&v.time_bucket_source_column);
    let call = match &spec.function {
        AggregateFunction::Avg => format!("AVG({})", column),
        AggregateFunction::Max => format!("MAX({})", column),
        AggregateFunction::Min => format!("MIN({})", column),
        AggregateFunction::Sum => format!("SUM({})", column),
        AggregateFunction::Count => format!("COUNT({})", column),
        AggregateFunction::First => format!("first({}, {})", column, time),
        AggregateFunction::Last => format!("last({}, {})", column, time),
        AggregateFunction::Unsupported(name) => {
            return Err(Error::UnsupportedAggregateFunction {
                view: v.view_name.clone(),
                function: name.clone(),
            });
        }
    };
    Ok(format!("{} AS {}", call, Ident(&spec.alias)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::ContinuousAggregateDefaults;
    use crate::operation::Delta;

    fn hourly() -> ContinuousAggregateDescriptor {
        ContinuousAggregateDescriptor::new(
            "hourly_metrics",
            "Metrics",
            "1 hour",
            "Timestamp",
            &ContinuousAggregateDefaults::default(),
        )
    }

    fn alter(
        chunk_interval: (Option<&str>, Option<&str>),
        group_indexes: (bool, bool),
        materialized_only: (bool, bool),
    ) -> AlterContinuousAggregate {
        AlterContinuousAggregate {
            view_name: "hourly_metrics".to_string(),
            schema: "public".to_string(),
            chunk_interval: Delta::new(
                chunk_interval.0.map(str::to_string),
                chunk_interval.1.map(str::to_string),
            ),
            create_group_indexes: Delta::new(group_indexes.0, group_indexes.1),
            materialized_only: Delta::new(materialized_only.0, materialized_only.1),
        }
    }

    #[test]
    fn test_create_minimal() {
        let statements = create_continuous_aggregate(&hourly(), &GenerateOptions::default()).unwrap();
        insta::assert_snapshot!(statements[0].as_str(), @r#"CREATE MATERIALIZED VIEW "public"."hourly_metrics" WITH (timescaledb.continuous, timescaledb.create_group_indexes = false, timescaledb.materialized_only = false) AS SELECT time_bucket(INTERVAL '1 hour', "Timestamp") AS time_bucket FROM "public"."Metrics" GROUP BY time_bucket;"#);
    }

    #[test]
    fn test_create_full() {
        let mut v = hourly();
        v.chunk_interval = Some("7 days".to_string());
        v.materialized_only = true;
        v.with_no_data = true;
        v.where_clause = Some("\"Value\" > 0".to_string());
        v.group_by_columns = Some(vec![
            "DeviceId".to_string(),
            "date_trunc('day', \"Timestamp\")".to_string(),
        ]);
        v.aggregate_functions = Some(vec![
            AggregateSpec::new("AvgValue", AggregateFunction::Avg, "Value"),
            AggregateSpec::new("Samples", AggregateFunction::Count, "Value"),
            AggregateSpec::new("LastValue", AggregateFunction::Last, "Value"),
        ]);

        let statements = create_continuous_aggregate(&v, &GenerateOptions::default()).unwrap();
        assert_eq!(statements.len(), 1);
        insta::assert_snapshot!(statements[0].as_str(), @r#"CREATE MATERIALIZED VIEW "public"."hourly_metrics" WITH (timescaledb.continuous, timescaledb.create_group_indexes = false, timescaledb.materialized_only = true, timescaledb.chunk_interval = '7 days') AS SELECT time_bucket(INTERVAL '1 hour', "Timestamp") AS time_bucket, "DeviceId", AVG("Value") AS "AvgValue", COUNT("Value") AS "Samples", last("Value", "Timestamp") AS "LastValue" FROM "public"."Metrics" WHERE "Value" > 0 GROUP BY time_bucket, "DeviceId", date_trunc('day', "Timestamp") WITH NO DATA;"#);
    }

    #[test]
    fn test_create_integer_bucket_without_time_bucket_grouping() {
        let mut v = hourly();
        v.time_bucket_width = "3600".to_string();
        v.time_bucket_group_by = false;
        v.aggregate_functions = Some(vec![AggregateSpec::new(
            "FirstValue",
            AggregateFunction::First,
            "Value",
        )]);

        let statements = create_continuous_aggregate(&v, &GenerateOptions::default()).unwrap();
        let sql = &statements[0];
        assert!(sql.contains("time_bucket(3600, \"Timestamp\") AS time_bucket"));
        assert!(sql.contains("first(\"Value\", \"Timestamp\") AS \"FirstValue\""));
        assert!(!sql.contains("GROUP BY"));
    }

    #[test]
    fn test_create_embedded_doubles_quotes() {
        let statements =
            create_continuous_aggregate(&hourly(), &GenerateOptions::new(QuoteMode::Embedded))
                .unwrap();
        let sql = &statements[0];
        assert!(sql.starts_with("CREATE MATERIALIZED VIEW \"\"public\"\".\"\"hourly_metrics\"\""));
        assert!(sql.contains("FROM \"\"public\"\".\"\"Metrics\"\""));
    }

    #[test]
    fn test_create_unsupported_function_fails() {
        let mut v = hourly();
        v.aggregate_functions = Some(vec![AggregateSpec::new(
            "P50",
            AggregateFunction::Unsupported("Median".to_string()),
            "Value",
        )]);
        let err = create_continuous_aggregate(&v, &GenerateOptions::default()).unwrap_err();
        assert_eq!(
            err,
            Error::UnsupportedAggregateFunction {
                view: "hourly_metrics".to_string(),
                function: "Median".to_string(),
            }
        );
    }

    #[test]
    fn test_alter_each_property() {
        let statements = alter_continuous_aggregate(
            &alter((None, Some("30 days")), (false, true), (false, true)),
            &GenerateOptions::default(),
        );
        insta::assert_snapshot!(statements.join("\n"), @r#"
        ALTER MATERIALIZED VIEW "public"."hourly_metrics" SET (timescaledb.chunk_interval = '30 days');
        ALTER MATERIALIZED VIEW "public"."hourly_metrics" SET (timescaledb.create_group_indexes = true);
        ALTER MATERIALIZED VIEW "public"."hourly_metrics" SET (timescaledb.materialized_only = true);
        "#);
    }

    #[test]
    fn test_alter_removed_chunk_interval_keeps_old_value() {
        for new in [None, Some("")] {
            let statements = alter_continuous_aggregate(
                &alter((Some("7 days"), new), (false, false), (false, false)),
                &GenerateOptions::default(),
            );
            assert_eq!(
                statements,
                vec![
                    "ALTER MATERIALIZED VIEW \"public\".\"hourly_metrics\" SET (timescaledb.chunk_interval = '7 days');"
                ]
            );
        }
    }

    #[test]
    fn test_alter_only_materialized_only() {
        let statements = alter_continuous_aggregate(
            &alter((Some("7 days"), Some("7 days")), (true, true), (true, false)),
            &GenerateOptions::default(),
        );
        assert_eq!(statements.len(), 1);
        assert!(statements[0].ends_with("SET (timescaledb.materialized_only = false);"));
    }

    #[test]
    fn test_drop() {
        assert_eq!(
            drop_continuous_aggregate("hourly_metrics", "public", &GenerateOptions::default()),
            vec!["DROP MATERIALIZED VIEW IF EXISTS \"public\".\"hourly_metrics\";"]
        );
    }
}
