use super::GenerateOptions;
use crate::model::{ReorderPolicyDescriptor, format_timestamp};
use crate::operation::AlterReorderPolicy;
use hyperdiff_sql::{Lit, interval_literal, regclass};

/// `add_reorder_policy`, then one `alter_job` for any non-default job settings.
pub fn add_reorder_policy(p: &ReorderPolicyDescriptor, opts: &GenerateOptions) -> Vec<String> {
    let mut args = vec![
        regclass(&p.table_name, &p.schema, opts.quote),
        Lit(&p.index_name).to_string(),
    ];
    if let Some(start) = &p.initial_start {
        args.push(format!("initial_start => {}", Lit(format_timestamp(start))));
    }
    let mut statements = vec![format!("SELECT add_reorder_policy({});", args.join(", "))];

    let defaults = &opts.defaults.reorder_policy;
    let mut clauses = Vec::new();
    if p.schedule_interval != defaults.schedule_interval {
        clauses.push(interval_clause("schedule_interval", &p.schedule_interval));
    }
    if p.max_runtime != defaults.max_runtime {
        clauses.push(interval_clause("max_runtime", &p.max_runtime));
    }
    if let Some(retries) = p.max_retries.filter(|r| *r != defaults.max_retries) {
        clauses.push(format!("max_retries => {}", retries));
    }
    if p.retry_period != defaults.retry_period {
        clauses.push(interval_clause("retry_period", &p.retry_period));
    }
    if !clauses.is_empty() {
        statements.push(alter_job(&p.table_name, &p.schema, &clauses));
    }

    statements
}

/// A changed index or first run recreates the job; anything else is an `alter_job`.
pub fn alter_reorder_policy(a: &AlterReorderPolicy, opts: &GenerateOptions) -> Vec<String> {
    if a.requires_recreate() {
        let mut statements = drop_reorder_policy(&a.table_name, &a.schema, opts);
        statements.extend(add_reorder_policy(&a.desired(), opts));
        return statements;
    }

    let mut clauses = Vec::new();
    if a.schedule_interval.is_changed() {
        clauses.push(interval_clause("schedule_interval", &a.schedule_interval.new));
    }
    if a.max_runtime.is_changed() {
        clauses.push(interval_clause("max_runtime", &a.max_runtime.new));
    }
    if a.max_retries.is_changed() {
        let retries = a
            .max_retries
            .new
            .unwrap_or(opts.defaults.reorder_policy.max_retries);
        clauses.push(format!("max_retries => {}", retries));
    }
    if a.retry_period.is_changed() {
        clauses.push(interval_clause("retry_period", &a.retry_period.new));
    }

    if clauses.is_empty() {
        return Vec::new();
    }
    vec![alter_job(&a.table_name, &a.schema, &clauses)]
}

pub fn drop_reorder_policy(table_name: &str, schema: &str, opts: &GenerateOptions) -> Vec<String> {
    vec![format!(
        "SELECT remove_reorder_policy({}, if_exists => true);",
        regclass(table_name, schema, opts.quote)
    )]
}

fn interval_clause(key: &str, value: &str) -> String {
    format!("{} => {}", key, interval_literal(value))
}

/// Reorder jobs have no name of their own; find the job through the catalog.
///
/// The lookup matches `hypertable_schema` as well as `hypertable_name`, so a
/// same-named table in another schema keeps its own job.
fn alter_job(table_name: &str, schema: &str, clauses: &[String]) -> String {
    format!(
        "SELECT alter_job(job_id, {}) FROM timescaledb_information.jobs WHERE proc_name = 'policy_reorder' AND hypertable_schema = {} AND hypertable_name = {};",
        clauses.join(", "),
        Lit(schema),
        Lit(table_name)
    )
}
