//! Interval arguments.
//!
//! TimescaleDB accepts either a raw count of time units (for integer time
//! columns, or microseconds for timestamp columns) or a real `INTERVAL`.
//! Configuration carries both as strings; a value that parses as an integer
//! is a raw count, anything else is a human interval literal like `7 days`.

use crate::Lit;

/// A parsed interval argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntervalValue<'a> {
    /// A raw count of time units.
    Integer(i64),
    /// A human-readable interval literal.
    Literal(&'a str),
}

impl<'a> IntervalValue<'a> {
    /// Classify a configured interval string.
    pub fn parse(value: &'a str) -> Self {
        match value.trim().parse::<i64>() {
            Ok(n) => IntervalValue::Integer(n),
            Err(_) => IntervalValue::Literal(value),
        }
    }

    /// Render with a `::bigint` cast on raw counts.
    ///
    /// ```
    /// use hyperdiff_sql::IntervalValue;
    /// assert_eq!(IntervalValue::parse("86400000000").to_sql_cast(), "86400000000::bigint");
    /// assert_eq!(IntervalValue::parse("1 day").to_sql_cast(), "INTERVAL '1 day'");
    /// ```
    pub fn to_sql_cast(&self) -> String {
        match self {
            IntervalValue::Integer(n) => format!("{}::bigint", n),
            IntervalValue::Literal(s) => interval_literal(s),
        }
    }

    /// Render raw counts as a bare integer.
    pub fn to_sql_bare(&self) -> String {
        match self {
            IntervalValue::Integer(n) => n.to_string(),
            IntervalValue::Literal(s) => interval_literal(s),
        }
    }
}

/// `INTERVAL '<value>'`.
pub fn interval_literal(value: &str) -> String {
    format!("INTERVAL {}", Lit(value))
}

/// Render an optional offset: absent values become `NULL`.
pub fn offset_or_null(value: Option<&str>) -> String {
    match value {
        None => "NULL".to_string(),
        Some(v) if v.trim().is_empty() => "NULL".to_string(),
        Some(v) => IntervalValue::parse(v).to_sql_bare(),
    }
}
