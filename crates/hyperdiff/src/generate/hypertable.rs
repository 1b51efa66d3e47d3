use super::{GenerateOptions, community_edition_guard};
use crate::model::{Dimension, HypertableDescriptor, Partitioning, effective_compression};
use crate::operation::AlterHypertable;
use hyperdiff_sql::{IntervalValue, Lit, QuoteMode, qualified_ident, regclass};

/// `create_hypertable`, then compression and chunk skipping, then dimensions.
pub fn create_hypertable(h: &HypertableDescriptor, opts: &GenerateOptions) -> Vec<String> {
    let table = regclass(&h.table_name, &h.schema, opts.quote);
    let mut statements = Vec::new();

    let mut args = vec![table.clone(), Lit(&h.time_column_name).to_string()];
    if h.migrate_data {
        args.push("migrate_data => true".to_string());
    }
    if !h.chunk_time_interval.is_empty() {
        args.push(format!(
            "chunk_time_interval => {}",
            IntervalValue::parse(&h.chunk_time_interval).to_sql_cast()
        ));
    }
    statements.push(format!("SELECT create_hypertable({});", args.join(", ")));

    let skip_columns = h.chunk_skip_columns.as_deref().unwrap_or_default();
    if h.effective_compression() {
        let mut guarded = vec![enable_compression(h, opts.quote)];
        guarded.extend(enable_chunk_skipping(&table, skip_columns));
        statements.push(community_edition_guard(&guarded));
    }

    for dimension in &h.additional_dimensions {
        statements.push(add_dimension(&table, dimension));
    }

    statements
}

/// Statements moving an existing hypertable to its new configuration.
pub fn alter_hypertable(a: &AlterHypertable, opts: &GenerateOptions) -> Vec<String> {
    let table = regclass(&a.table_name, &a.schema, opts.quote);
    let mut statements = Vec::new();

    if a.chunk_time_interval.is_changed() {
        let interval = if a.chunk_time_interval.new.is_empty() {
            opts.defaults.hypertable.chunk_time_interval.as_str()
        } else {
            a.chunk_time_interval.new.as_str()
        };
        statements.push(format!(
            "SELECT set_chunk_time_interval({}, {});",
            table,
            IntervalValue::parse(interval).to_sql_cast()
        ));
    }

    let old_compression = effective_compression(
        a.enable_compression.old,
        a.chunk_skip_columns.old.as_deref(),
    );
    let new_compression = effective_compression(
        a.enable_compression.new,
        a.chunk_skip_columns.new.as_deref(),
    );
    if old_compression != new_compression {
        statements.push(community_edition_guard(&[format!(
            "ALTER TABLE {} SET (timescaledb.compress = {});",
            qualified_ident(&a.table_name, &a.schema, opts.quote),
            new_compression
        )]));
    }

    let old_skip = a.chunk_skip_columns.old.as_deref().unwrap_or_default();
    let new_skip = a.chunk_skip_columns.new.as_deref().unwrap_or_default();
    let added: Vec<String> = new_skip
        .iter()
        .filter(|c| !old_skip.contains(c))
        .cloned()
        .collect();
    let removed: Vec<&String> = old_skip.iter().filter(|c| !new_skip.contains(c)).collect();

    if !added.is_empty() {
        statements.push(community_edition_guard(&enable_chunk_skipping(
            &table, &added,
        )));
    }
    if !removed.is_empty() {
        let disable: Vec<String> = removed
            .iter()
            .map(|column| {
                format!(
                    "PERFORM disable_chunk_skipping({}, {});",
                    table,
                    Lit(column.as_str())
                )
            })
            .collect();
        statements.push(community_edition_guard(&disable));
    }

    let old_dims = &a.additional_dimensions.old;
    let new_dims = &a.additional_dimensions.new;
    for dimension in new_dims {
        if !old_dims.contains(dimension) {
            statements.push(add_dimension(&table, dimension));
        }
    }
    for dimension in old_dims {
        let kept = new_dims
            .iter()
            .any(|d| d.column_name == dimension.column_name && d.kind() == dimension.kind());
        if !kept {
            tracing::warn!(
                table = %a.table_name,
                dimension = %dimension,
                "TimescaleDB cannot remove a dimension; ignoring the removal"
            );
            statements.push(format!(
                "-- WARNING: TimescaleDB does not support removing dimensions; dimension {} on {} was left in place.",
                dimension,
                qualified_ident(&a.table_name, &a.schema, opts.quote)
            ));
        }
    }

    statements
}

fn enable_compression(h: &HypertableDescriptor, quote: QuoteMode) -> String {
    format!(
        "ALTER TABLE {} SET (timescaledb.compress = true);",
        qualified_ident(&h.table_name, &h.schema, quote)
    )
}

/// The chunk-skipping pragma followed by one enable call per column.
fn enable_chunk_skipping(table: &str, columns: &[String]) -> Vec<String> {
    if columns.is_empty() {
        return Vec::new();
    }
    let mut statements = vec!["SET timescaledb.enable_chunk_skipping = 'ON';".to_string()];
    for column in columns {
        statements.push(format!(
            "PERFORM enable_chunk_skipping({}, {});",
            table,
            Lit(column)
        ));
    }
    statements
}

fn add_dimension(table: &str, dimension: &Dimension) -> String {
    let builder = match &dimension.partitioning {
        Partitioning::Range { interval } => format!(
            "by_range({}, {})",
            Lit(&dimension.column_name),
            IntervalValue::parse(interval).to_sql_bare()
        ),
        Partitioning::Hash { partitions } => {
            format!("by_hash({}, {})", Lit(&dimension.column_name), partitions)
        }
    };
    format!("SELECT add_dimension({}, {});", table, builder)
}
