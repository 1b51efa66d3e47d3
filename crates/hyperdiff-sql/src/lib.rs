//! Identifier and literal formatting for TimescaleDB migration statements.
//!
//! Every statement generated by `hyperdiff` goes through these helpers, so
//! quoting rules live in exactly one place. Two output contexts exist:
//!
//! - [`QuoteMode::Execute`]: the statement is sent to the database as-is.
//! - [`QuoteMode::Embedded`]: the statement is pasted into a generated
//!   source-code string literal whose delimiter is the double quote, so every
//!   `"` in the output is doubled.

mod interval;
pub use interval::*;

/// Selects how double quotes are written in generated statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QuoteMode {
    /// Plain SQL, ready to execute.
    #[default]
    Execute,
    /// SQL that will be embedded in a double-quote-delimited string literal.
    Embedded,
}

impl QuoteMode {
    /// The character sequence standing for one `"` in this mode.
    pub fn quote(self) -> &'static str {
        match self {
            QuoteMode::Execute => "\"",
            QuoteMode::Embedded => "\"\"",
        }
    }

    /// Rewrite already-rendered SQL for this mode.
    pub fn apply(self, sql: &str) -> String {
        match self {
            QuoteMode::Execute => sql.to_string(),
            QuoteMode::Embedded => sql.replace('"', "\"\""),
        }
    }
}

/// A PostgreSQL string literal wrapper.
///
/// Display writes the value escaped and quoted with single quotes.
///
/// # Example
/// ```
/// use hyperdiff_sql::Lit;
/// assert_eq!(format!("{}", Lit("foo")), "'foo'");
/// assert_eq!(format!("{}", Lit("it's")), "'it''s'");
/// ```
pub struct Lit<T: AsRef<str>>(pub T);

impl<T: AsRef<str>> std::fmt::Display for Lit<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "'")?;
        for c in self.0.as_ref().chars() {
            if c == '\'' {
                write!(f, "''")?;
            } else {
                write!(f, "{}", c)?;
            }
        }
        write!(f, "'")
    }
}

/// A PostgreSQL identifier wrapper.
///
/// Display writes the value escaped and quoted with double quotes.
///
/// # Example
/// ```
/// use hyperdiff_sql::Ident;
/// assert_eq!(format!("{}", Ident("Metrics")), "\"Metrics\"");
/// assert_eq!(format!("{}", Ident("bla\"h")), "\"bla\"\"h\"");
/// ```
pub struct Ident<T: AsRef<str>>(pub T);

impl<T: AsRef<str>> std::fmt::Display for Ident<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "\"")?;
        for c in self.0.as_ref().chars() {
            if c == '"' {
                write!(f, "\"\"")?;
            } else {
                write!(f, "{}", c)?;
            }
        }
        write!(f, "\"")
    }
}

/// Quote a single identifier.
///
/// Always quotes, so mixed-case names like `Metrics` keep their case.
pub fn quote_ident(name: &str, mode: QuoteMode) -> String {
    mode.apply(&format!("{}", Ident(name)))
}

/// Schema-qualified identifier: `"schema"."name"`.
///
/// ```
/// use hyperdiff_sql::{QuoteMode, qualified_ident};
/// assert_eq!(qualified_ident("Metrics", "public", QuoteMode::Execute), "\"public\".\"Metrics\"");
/// assert_eq!(qualified_ident("Metrics", "public", QuoteMode::Embedded), "\"\"public\"\".\"\"Metrics\"\"");
/// ```
pub fn qualified_ident(name: &str, schema: &str, mode: QuoteMode) -> String {
    mode.apply(&format!("{}.{}", Ident(schema), Ident(name)))
}

/// A `regclass`-style literal reference: `'schema."name"'`.
///
/// The schema is only quoted when Postgres would otherwise fold or reject it.
///
/// ```
/// use hyperdiff_sql::{QuoteMode, regclass};
/// assert_eq!(regclass("Metrics", "public", QuoteMode::Execute), "'public.\"Metrics\"'");
/// assert_eq!(regclass("Metrics", "Tenant", QuoteMode::Execute), "'\"Tenant\".\"Metrics\"'");
/// ```
pub fn regclass(name: &str, schema: &str, mode: QuoteMode) -> String {
    let schema = if needs_quoting(schema) {
        format!("{}", Ident(schema))
    } else {
        schema.to_string()
    };
    mode.apply(&format!("{}", Lit(format!("{}.{}", schema, Ident(name)))))
}

/// Whether an identifier must be double-quoted to survive case folding.
pub fn needs_quoting(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        None => true,
        Some(first) if !(first.is_ascii_lowercase() || first == '_') => true,
        Some(_) => !chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_'),
    }
}
