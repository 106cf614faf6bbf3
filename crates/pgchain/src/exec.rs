//! Execution methods on compiled statements and builders.
//!
//! Execution is only reachable through a [`GenericClient`]; the builder itself
//! never opens a connection.
//!
//! [`GenericClient`]: crate::client::GenericClient

use crate::error::SqlResult;
use crate::fragment::Statement;
use crate::query::Query;
use crate::row::row_to_json;
use crate::trace;
use std::borrow::Cow;

/// Generate the execution methods for a type that can provide
/// `(statement: Cow<Statement>, max_logged_sql: Option<usize>)`.
///
/// Usage:
/// ```ignore
/// impl_query_exec! {
///     prepare(self) {
///         (Cow::Owned(self.compile()?), self.config().max_logged_sql)
///     }
/// }
/// ```
macro_rules! impl_query_exec {
    (prepare($this:ident) $prepare:block) => {
        /// Execute and return all rows.
        pub async fn fetch_all(&$this, conn: &impl $crate::client::GenericClient) -> $crate::error::SqlResult<Vec<tokio_postgres::Row>> {
            let (stmt, max): (Cow<'_, Statement>, Option<usize>) = $prepare;
            trace::executing("fetch_all", &stmt.text, stmt.args.len(), max);
            conn.query(&stmt.text, &stmt.params_ref()).await
        }

        /// Execute and return all rows mapped to `T`.
        pub async fn fetch_all_as<T: $crate::row::FromRow>(&$this, conn: &impl $crate::client::GenericClient) -> $crate::error::SqlResult<Vec<T>> {
            let rows = $this.fetch_all(conn).await?;
            rows.iter().map(T::from_row).collect()
        }

        /// Execute and return the **first** row; no row is [`SqlError::NotFound`].
        ///
        /// [`SqlError::NotFound`]: crate::error::SqlError::NotFound
        pub async fn fetch_one(&$this, conn: &impl $crate::client::GenericClient) -> $crate::error::SqlResult<tokio_postgres::Row> {
            let (stmt, max): (Cow<'_, Statement>, Option<usize>) = $prepare;
            trace::executing("fetch_one", &stmt.text, stmt.args.len(), max);
            conn.query_one(&stmt.text, &stmt.params_ref()).await
        }

        /// Execute and return the **first** row mapped to `T`.
        pub async fn fetch_one_as<T: $crate::row::FromRow>(&$this, conn: &impl $crate::client::GenericClient) -> $crate::error::SqlResult<T> {
            let row = $this.fetch_one(conn).await?;
            T::from_row(&row)
        }

        /// Execute and return the first row, if any.
        pub async fn fetch_opt(&$this, conn: &impl $crate::client::GenericClient) -> $crate::error::SqlResult<Option<tokio_postgres::Row>> {
            let (stmt, max): (Cow<'_, Statement>, Option<usize>) = $prepare;
            trace::executing("fetch_opt", &stmt.text, stmt.args.len(), max);
            conn.query_opt(&stmt.text, &stmt.params_ref()).await
        }

        /// Execute and return at most one row mapped to `T`.
        pub async fn fetch_opt_as<T: $crate::row::FromRow>(&$this, conn: &impl $crate::client::GenericClient) -> $crate::error::SqlResult<Option<T>> {
            let row = $this.fetch_opt(conn).await?;
            row.as_ref().map(T::from_row).transpose()
        }

        /// Execute and report whether at least one row came back.
        pub async fn exists(&$this, conn: &impl $crate::client::GenericClient) -> $crate::error::SqlResult<bool> {
            Ok($this.fetch_opt(conn).await?.is_some())
        }

        /// Execute and return the affected row count.
        pub async fn execute(&$this, conn: &impl $crate::client::GenericClient) -> $crate::error::SqlResult<u64> {
            let (stmt, max): (Cow<'_, Statement>, Option<usize>) = $prepare;
            trace::executing("execute", &stmt.text, stmt.args.len(), max);
            conn.execute(&stmt.text, &stmt.params_ref()).await
        }
    };
}

impl Statement {
    impl_query_exec! {
        prepare(self) {
            (Cow::Borrowed(self), trace::DEFAULT_MAX_LOGGED_SQL)
        }
    }
}

impl Query {
    impl_query_exec! {
        prepare(self) {
            (Cow::Owned(self.compile()?), self.config().max_logged_sql)
        }
    }

    /// Execute and decode every row into a JSON object.
    ///
    /// Column names pass through the configured output key mapping, so
    /// `first_name` comes back as `firstName` by default.
    pub async fn fetch_all_json(
        &self,
        conn: &impl crate::client::GenericClient,
    ) -> SqlResult<Vec<serde_json::Map<String, serde_json::Value>>> {
        let rows = self.fetch_all(conn).await?;
        rows.iter().map(|row| row_to_json(row, self.config())).collect()
    }
}
