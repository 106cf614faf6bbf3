//! `tracing` events for compiled and executed SQL.
//!
//! Every function here is a no-op without the `tracing` feature.

use crate::query::StatementKind;
use std::borrow::Cow;

/// Default SQL truncation for statements executed without a [`crate::Config`].
pub(crate) const DEFAULT_MAX_LOGGED_SQL: Option<usize> = Some(200);

#[cfg_attr(not(feature = "tracing"), allow(dead_code))]
pub(crate) fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}

#[cfg_attr(not(feature = "tracing"), allow(dead_code))]
pub(crate) fn shown_sql(sql: &str, max: Option<usize>) -> Cow<'_, str> {
    match max {
        Some(max) if sql.len() > max => Cow::Owned(format!("{}...", truncate_sql_bytes(sql, max))),
        _ => Cow::Borrowed(sql),
    }
}

pub(crate) fn compiled(kind: StatementKind, sql: &str, param_count: usize, max: Option<usize>) {
    #[cfg(feature = "tracing")]
    tracing::debug!(
        target: "pgchain.compile",
        kind = %kind,
        param_count,
        sql = %shown_sql(sql, max),
        "compiled statement"
    );
    #[cfg(not(feature = "tracing"))]
    let _ = (kind, sql, param_count, max);
}

pub(crate) fn compile_failed(err: &crate::error::SqlError) {
    #[cfg(feature = "tracing")]
    tracing::debug!(target: "pgchain.compile", error = %err, "compile failed");
    #[cfg(not(feature = "tracing"))]
    let _ = err;
}

pub(crate) fn executing(op: &'static str, sql: &str, param_count: usize, max: Option<usize>) {
    #[cfg(feature = "tracing")]
    tracing::debug!(
        target: "pgchain.exec",
        op,
        param_count,
        sql = %shown_sql(sql, max),
        "executing statement"
    );
    #[cfg(not(feature = "tracing"))]
    let _ = (op, sql, param_count, max);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_on_char_boundary() {
        assert_eq!(truncate_sql_bytes("select 1", 100), "select 1");
        assert_eq!(truncate_sql_bytes("héllo", 2), "h");
    }

    #[test]
    fn shown_sql_appends_ellipsis() {
        assert_eq!(shown_sql("select * from person", Some(6)), "select...");
        assert_eq!(shown_sql("select 1", None), "select 1");
    }
}
