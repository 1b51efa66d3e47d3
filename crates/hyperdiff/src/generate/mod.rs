//! SQL generation.
//!
//! TimescaleDB configures most features through function calls rather than
//! declarative DDL, so one operation can expand into several statements.
//! Generators return them in execution order; the caller decides how they are
//! batched and wrapped in transactions.

mod continuous_aggregate;
mod hypertable;
mod refresh_policy;
mod reorder_policy;

pub use continuous_aggregate::{
    alter_continuous_aggregate, create_continuous_aggregate, drop_continuous_aggregate,
};
pub use hypertable::{alter_hypertable, create_hypertable};
pub use refresh_policy::{add_refresh_policy, remove_refresh_policy};
pub use reorder_policy::{add_reorder_policy, alter_reorder_policy, drop_reorder_policy};

use crate::Result;
use crate::defaults::FeatureDefaults;
use crate::operation::{
    ContinuousAggregateOperation, FeatureOperation, HypertableOperation, RefreshPolicyOperation,
    ReorderPolicyOperation,
};
use hyperdiff_sql::QuoteMode;

/// Knobs shared by every generator.
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    pub quote: QuoteMode,
    pub defaults: FeatureDefaults,
}

impl GenerateOptions {
    pub fn new(quote: QuoteMode) -> Self {
        Self {
            quote,
            defaults: FeatureDefaults::default(),
        }
    }

    pub fn with_defaults(mut self, defaults: FeatureDefaults) -> Self {
        self.defaults = defaults;
        self
    }
}

/// Generate the statements for one operation.
pub fn generate(op: &FeatureOperation, opts: &GenerateOptions) -> Result<Vec<String>> {
    let statements = match op {
        FeatureOperation::Hypertable(HypertableOperation::Create(h)) => create_hypertable(h, opts),
        FeatureOperation::Hypertable(HypertableOperation::Alter(a)) => alter_hypertable(a, opts),
        FeatureOperation::ReorderPolicy(ReorderPolicyOperation::Add(p)) => {
            add_reorder_policy(p, opts)
        }
        FeatureOperation::ReorderPolicy(ReorderPolicyOperation::Alter(a)) => {
            alter_reorder_policy(a, opts)
        }
        FeatureOperation::ReorderPolicy(ReorderPolicyOperation::Drop { table_name, schema }) => {
            drop_reorder_policy(table_name, schema, opts)
        }
        FeatureOperation::ContinuousAggregate(ContinuousAggregateOperation::Create(v)) => {
            create_continuous_aggregate(v, opts)?
        }
        FeatureOperation::ContinuousAggregate(ContinuousAggregateOperation::Alter(a)) => {
            alter_continuous_aggregate(a, opts)
        }
        FeatureOperation::ContinuousAggregate(ContinuousAggregateOperation::Drop {
            view_name,
            schema,
        }) => drop_continuous_aggregate(view_name, schema, opts),
        FeatureOperation::RefreshPolicy(RefreshPolicyOperation::Add(p)) => {
            add_refresh_policy(p, opts)
        }
        FeatureOperation::RefreshPolicy(RefreshPolicyOperation::Remove {
            view_name,
            schema,
            if_exists,
        }) => remove_refresh_policy(view_name, schema, *if_exists, opts),
    };
    Ok(statements)
}

const EDITION_WARNING: &str = "Skipping TimescaleDB community edition features (compression, chunk skipping): not available on the Apache edition";

/// Wrap statements so they only run on the community (`timescale`) license.
///
/// On any other license the block raises a warning and does nothing.
/// Wrapped statements run inside PL/pgSQL and must use `PERFORM`, not `SELECT`.
pub(crate) fn community_edition_guard(statements: &[String]) -> String {
    let mut sql = String::from(
        "DO $$\nBEGIN\n    IF current_setting('timescaledb.license', true) = 'timescale' THEN\n",
    );
    for statement in statements {
        sql.push_str("        ");
        sql.push_str(statement);
        sql.push('\n');
    }
    sql.push_str("    ELSE\n        RAISE WARNING '");
    sql.push_str(EDITION_WARNING);
    sql.push_str("';\n    END IF;\nEND $$;");
    sql
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_community_edition_guard() {
        let sql = community_edition_guard(&[
            "ALTER TABLE \"public\".\"Metrics\" SET (timescaledb.compress = true);".to_string(),
        ]);
        insta::assert_snapshot!(sql, @r#"
        DO $$
        BEGIN
            IF current_setting('timescaledb.license', true) = 'timescale' THEN
                ALTER TABLE "public"."Metrics" SET (timescaledb.compress = true);
            ELSE
                RAISE WARNING 'Skipping TimescaleDB community edition features (compression, chunk skipping): not available on the Apache edition';
            END IF;
        END $$;
        "#);
    }
}
