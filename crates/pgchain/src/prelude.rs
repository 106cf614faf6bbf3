//! Convenient imports for typical `pgchain` usage.
//!
//! ```ignore
//! use pgchain::prelude::*;
//! ```

pub use crate::{
    Arg, Config, FromRow, GenericClient, Predicate, Query, Record, RowExt, SqlError, SqlResult,
    Statement, Value, all, and, any, args, not, or, raw, record, sq, sql, with_config,
};
