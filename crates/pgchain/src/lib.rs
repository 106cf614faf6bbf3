//! # pgchain
//!
//! A fluent query builder that compiles method chains into parameterized
//! PostgreSQL statements.
//!
//! ## Features
//!
//! - **Immutable chains**: every call returns a new builder; prefixes can be branched
//! - **Parameterized by default**: values always become `$n` placeholders, only
//!   `raw()` text is inlined
//! - **Object shorthand**: rows (`record!`) become conditions, assignments and insert rows
//! - **Composable conditions**: `not`, `and`, `or`, `all`, `any` over rows, templates
//!   and sub-queries
//! - **Sub-queries anywhere**: nested builders and compiled statements are renumbered
//!   into the parent statement
//! - **Transaction-friendly**: execute against anything implementing `GenericClient`
//!
//! ## Conditions
//!
//! Separate `filter` calls are conjoined and rendered on a single line joined by
//! ` and `; the compiler never inserts a newline between calls. Arguments passed
//! to one `filter_any` call are disjoined. Templates and `raw()` text are treated
//! as opaque expressions and get parentheses whenever they are combined with
//! another condition, so `filter(sql("a = ? or b = ?"))` followed by
//! `filter(record! { "c" => 3 })` renders `(a = $1 or b = $2) and c = $3`.
//!
//! ## Example
//!
//! ```ignore
//! use pgchain::prelude::*;
//!
//! // select * from book where genre = $1 and (year > $2) order by title
//! let books = sq()
//!     .from("book")
//!     .filter(record! { "genre" => "Fantasy" })
//!     .filter(sql("year > ?").bind(2000))
//!     .order_by("title")
//!     .fetch_all_json(&client)
//!     .await?;
//!
//! // update person set age = age + 1 where age = $1 returning count(*)
//! let stmt = sq()
//!     .from("person")
//!     .filter(record! { "age" => 23 })
//!     .set(record! { "age" => raw("age + 1") })
//!     .returning("count(*)")
//!     .compile()?;
//! ```

pub mod arg;
pub mod client;
pub mod condition;
pub mod config;
pub mod error;
mod exec;
pub mod fragment;
pub mod ident;
pub mod prelude;
pub mod query;
pub mod record;
pub mod row;
pub mod template;
mod trace;
pub mod value;

pub use arg::{Arg, Escaped, Expr, Raw, raw};
pub use client::GenericClient;
pub use condition::{Condition, Predicate, all, and, any, not, or};
pub use config::{Config, KeyMapper, camel_case_key, snake_case_key};
pub use error::{SqlError, SqlResult};
pub use fragment::{Fragment, Statement};
pub use ident::Ident;
pub use query::{Query, StatementKind};
pub use record::Record;
pub use row::{FromRow, RowExt, row_to_json};
pub use template::{Template, sql};
pub use value::Value;

/// Start a chain with the default configuration.
pub fn sq() -> Query {
    Query::default()
}

/// Start a chain with an explicit configuration.
///
/// Every builder branched from the returned one shares `config`.
pub fn with_config(config: Config) -> Query {
    Query::new(config)
}
