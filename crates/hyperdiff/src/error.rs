use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    #[error(
        "{field} '{value}' is not a valid DateTime format; expected ISO 8601 such as \
         '2025-01-01T00:00:00Z' or '2025-01-01 00:00:00'"
    )]
    InvalidTimestamp { field: String, value: String },

    #[error("{field} is {value}, expected {expected}")]
    OutOfRange {
        field: String,
        value: i64,
        expected: String,
    },

    #[error("annotation '{key}' on '{object}' must be {expected}")]
    InvalidAnnotation {
        object: String,
        key: String,
        expected: String,
    },

    #[error("'{object}' is missing required annotation '{key}'")]
    MissingAnnotation { object: String, key: String },

    #[error("continuous aggregate '{view}' uses unsupported aggregate function '{function}'")]
    UnsupportedAggregateFunction { view: String, function: String },
}
