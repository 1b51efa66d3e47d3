use super::GenerateOptions;
use crate::model::{RefreshPolicyDescriptor, format_timestamp};
use hyperdiff_sql::{Lit, interval_literal, offset_or_null, regclass};

/// `add_continuous_aggregate_policy` with the window and any non-default options.
pub fn add_refresh_policy(p: &RefreshPolicyDescriptor, opts: &GenerateOptions) -> Vec<String> {
    let defaults = &opts.defaults.refresh_policy;
    let mut args = vec![
        regclass(&p.view_name, &p.schema, opts.quote),
        format!("start_offset => {}", offset_or_null(p.start_offset.as_deref())),
        format!("end_offset => {}", offset_or_null(p.end_offset.as_deref())),
    ];

    if let Some(interval) = p.schedule_interval.as_deref().filter(|i| !i.is_empty()) {
        args.push(format!("schedule_interval => {}", interval_literal(interval)));
    }
    if p.if_not_exists {
        args.push("if_not_exists => true".to_string());
    }
    if let Some(timezone) = p.timezone.as_deref().filter(|tz| !tz.is_empty()) {
        args.push(format!("timezone => {}", Lit(timezone)));
    }
    if let Some(include) = p.include_tiered_data {
        args.push(format!("include_tiered_data => {}", include));
    }
    if p.buckets_per_batch != defaults.buckets_per_batch {
        args.push(format!("buckets_per_batch => {}", p.buckets_per_batch));
    }
    if p.max_batches_per_execution != defaults.max_batches_per_execution {
        args.push(format!(
            "max_batches_per_execution => {}",
            p.max_batches_per_execution
        ));
    }
    if p.refresh_newest_first != defaults.refresh_newest_first {
        args.push(format!("refresh_newest_first => {}", p.refresh_newest_first));
    }
    if let Some(start) = &p.initial_start {
        args.push(format!("initial_start => {}", Lit(format_timestamp(start))));
    }

    vec![format!(
        "SELECT add_continuous_aggregate_policy({});",
        args.join(", ")
    )]
}

pub fn remove_refresh_policy(
    view_name: &str,
    schema: &str,
    if_exists: bool,
    opts: &GenerateOptions,
) -> Vec<String> {
    let view = regclass(view_name, schema, opts.quote);
    let sql = if if_exists {
        format!("SELECT remove_continuous_aggregate_policy({}, if_exists => true);", view)
    } else {
        format!("SELECT remove_continuous_aggregate_policy({});", view)
    };
    vec![sql]
}
