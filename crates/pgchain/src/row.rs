//! Row mapping traits and JSON decoding of result rows.

use crate::config::Config;
use crate::error::{SqlError, SqlResult};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use tokio_postgres::Row;
use tokio_postgres::types::{FromSql, Type};
use uuid::Uuid;

/// Trait for types that can be built from a database row.
pub trait FromRow: Sized {
    /// Convert a database row into Self
    fn from_row(row: &Row) -> SqlResult<Self>;
}

/// Extension trait for Row to provide typed access
pub trait RowExt {
    /// Try to get a column value, returning SqlError::Decode on failure
    fn try_get_column<T>(&self, column: &str) -> SqlResult<T>
    where
        T: for<'a> FromSql<'a>;
}

impl RowExt for Row {
    fn try_get_column<T>(&self, column: &str) -> SqlResult<T>
    where
        T: for<'a> FromSql<'a>,
    {
        self.try_get(column)
            .map_err(|e| SqlError::decode(column, e.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Bool,
    Int2,
    Int4,
    Int8,
    Float4,
    Float8,
    Text,
    Json,
    Uuid,
    Timestamptz,
    Timestamp,
    Date,
}

fn column_kind(ty: &Type) -> Option<ColumnKind> {
    let kind = if *ty == Type::BOOL {
        ColumnKind::Bool
    } else if *ty == Type::INT2 {
        ColumnKind::Int2
    } else if *ty == Type::INT4 {
        ColumnKind::Int4
    } else if *ty == Type::INT8 {
        ColumnKind::Int8
    } else if *ty == Type::FLOAT4 {
        ColumnKind::Float4
    } else if *ty == Type::FLOAT8 {
        ColumnKind::Float8
    } else if *ty == Type::TEXT || *ty == Type::VARCHAR || *ty == Type::BPCHAR || *ty == Type::NAME {
        ColumnKind::Text
    } else if *ty == Type::JSON || *ty == Type::JSONB {
        ColumnKind::Json
    } else if *ty == Type::UUID {
        ColumnKind::Uuid
    } else if *ty == Type::TIMESTAMPTZ {
        ColumnKind::Timestamptz
    } else if *ty == Type::TIMESTAMP {
        ColumnKind::Timestamp
    } else if *ty == Type::DATE {
        ColumnKind::Date
    } else {
        return None;
    };
    Some(kind)
}

fn get<T>(row: &Row, idx: usize, column: &str) -> SqlResult<Option<T>>
where
    T: for<'a> FromSql<'a>,
{
    row.try_get::<_, Option<T>>(idx)
        .map_err(|e| SqlError::decode(column, e.to_string()))
}

fn column_json(row: &Row, idx: usize, column: &str, ty: &Type) -> SqlResult<serde_json::Value> {
    use serde_json::Value as J;

    let kind = column_kind(ty)
        .ok_or_else(|| SqlError::decode(column, format!("unsupported column type {ty}")))?;
    let value = match kind {
        ColumnKind::Bool => get::<bool>(row, idx, column)?.map(J::from),
        ColumnKind::Int2 => get::<i16>(row, idx, column)?.map(J::from),
        ColumnKind::Int4 => get::<i32>(row, idx, column)?.map(J::from),
        ColumnKind::Int8 => get::<i64>(row, idx, column)?.map(J::from),
        ColumnKind::Float4 => get::<f32>(row, idx, column)?.map(|v| J::from(f64::from(v))),
        ColumnKind::Float8 => get::<f64>(row, idx, column)?.map(J::from),
        ColumnKind::Text => get::<String>(row, idx, column)?.map(J::from),
        ColumnKind::Json => get::<J>(row, idx, column)?,
        ColumnKind::Uuid => get::<Uuid>(row, idx, column)?.map(|v| J::from(v.to_string())),
        ColumnKind::Timestamptz => {
            get::<DateTime<Utc>>(row, idx, column)?.map(|v| J::from(v.to_rfc3339()))
        }
        ColumnKind::Timestamp => get::<NaiveDateTime>(row, idx, column)?
            .map(|v| J::from(v.format("%Y-%m-%dT%H:%M:%S%.f").to_string())),
        ColumnKind::Date => get::<NaiveDate>(row, idx, column)?.map(|v| J::from(v.to_string())),
    };
    Ok(value.unwrap_or(J::Null))
}

/// Decode a row into a JSON object, passing column names through the output key mapping.
pub fn row_to_json(row: &Row, config: &Config) -> SqlResult<serde_json::Map<String, serde_json::Value>> {
    let mut out = serde_json::Map::with_capacity(row.len());
    for (idx, col) in row.columns().iter().enumerate() {
        let value = column_json(row, idx, col.name(), col.type_())?;
        out.insert(config.output_key(col.name()), value);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_column_types_decode() {
        assert_eq!(column_kind(&Type::INT8), Some(ColumnKind::Int8));
        assert_eq!(column_kind(&Type::VARCHAR), Some(ColumnKind::Text));
        assert_eq!(column_kind(&Type::JSONB), Some(ColumnKind::Json));
        assert_eq!(column_kind(&Type::TIMESTAMPTZ), Some(ColumnKind::Timestamptz));
    }

    #[test]
    fn unknown_column_types_are_rejected() {
        assert_eq!(column_kind(&Type::INET), None);
        assert_eq!(column_kind(&Type::NUMERIC), None);
    }
}
