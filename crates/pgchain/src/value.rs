//! Parameter values.
//!
//! [`Value`] is the owned, clone-friendly payload of a positional parameter.
//! Integers adapt their width to the type the server inferred for the
//! placeholder, so `age = $1` binds correctly against `int2`, `int4` or `int8`.

use bytes::BytesMut;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::error::Error;
use tokio_postgres::types::{IsNull, ToSql, Type};
use uuid::Uuid;

/// A value bound to a positional parameter.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Json(serde_json::Value),
    Uuid(Uuid),
    Timestamp(DateTime<Utc>),
    Bytes(Vec<u8>),
}

impl Value {
    /// Whether this is SQL `NULL`.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::Json(_) => "json",
            Value::Uuid(_) => "uuid",
            Value::Timestamp(_) => "timestamp",
            Value::Bytes(_) => "bytes",
        }
    }
}

fn out_of_range(v: i64, ty: &Type) -> Box<dyn Error + Sync + Send> {
    format!("integer {v} out of range for {ty}").into()
}

fn unsupported(value: &Value, ty: &Type) -> Box<dyn Error + Sync + Send> {
    format!("cannot encode {} as {ty}", value.type_name()).into()
}

/// Encode through `T` when it accepts the target type.
fn encode<T: ToSql>(
    value: &Value,
    inner: &T,
    ty: &Type,
    out: &mut BytesMut,
) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
    if T::accepts(ty) {
        inner.to_sql(ty, out)
    } else {
        Err(unsupported(value, ty))
    }
}

impl ToSql for Value {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        match self {
            Value::Null => Ok(IsNull::Yes),
            Value::Bool(v) => encode(self, v, ty, out),
            Value::Int(v) => {
                if *ty == Type::INT2 {
                    i16::try_from(*v).map_err(|_| out_of_range(*v, ty))?.to_sql(ty, out)
                } else if *ty == Type::INT4 {
                    i32::try_from(*v).map_err(|_| out_of_range(*v, ty))?.to_sql(ty, out)
                } else if *ty == Type::INT8 {
                    v.to_sql(ty, out)
                } else if *ty == Type::FLOAT4 {
                    (*v as f32).to_sql(ty, out)
                } else if *ty == Type::FLOAT8 {
                    (*v as f64).to_sql(ty, out)
                } else if *ty == Type::TEXT || *ty == Type::VARCHAR {
                    v.to_string().to_sql(ty, out)
                } else {
                    Err(unsupported(self, ty))
                }
            }
            Value::Float(v) if *ty == Type::FLOAT4 => (*v as f32).to_sql(ty, out),
            Value::Float(v) => encode(self, v, ty, out),
            Value::Text(v) => encode(self, v, ty, out),
            Value::Json(v) => encode(self, v, ty, out),
            Value::Uuid(v) => encode(self, v, ty, out),
            Value::Timestamp(v) if *ty == Type::TIMESTAMP => v.naive_utc().to_sql(ty, out),
            Value::Timestamp(v) => encode(self, v, ty, out),
            Value::Bytes(v) => encode(self, v, ty, out),
        }
    }

    // The accepted type depends on the variant, so the check happens in `to_sql`.
    fn accepts(_ty: &Type) -> bool {
        true
    }

    tokio_postgres::types::to_sql_checked!();
}

/// Implement `From<$t>` for [`Value`].
macro_rules! value_from {
    ($($t:ty => |$v:ident| $e:expr),* $(,)?) => {
        $(
            impl From<$t> for Value {
                fn from($v: $t) -> Self {
                    $e
                }
            }
        )*
    };
}

value_from! {
    bool => |v| Value::Bool(v),
    i16 => |v| Value::Int(i64::from(v)),
    i32 => |v| Value::Int(i64::from(v)),
    i64 => |v| Value::Int(v),
    u32 => |v| Value::Int(i64::from(v)),
    f32 => |v| Value::Float(f64::from(v)),
    f64 => |v| Value::Float(v),
    &str => |v| Value::Text(v.to_string()),
    String => |v| Value::Text(v),
    &String => |v| Value::Text(v.clone()),
    Uuid => |v| Value::Uuid(v),
    DateTime<Utc> => |v| Value::Timestamp(v),
    Vec<u8> => |v| Value::Bytes(v),
    serde_json::Value => |v| Value::Json(v),
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Null
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversions() {
        assert_eq!(Value::from(13), Value::Int(13));
        assert_eq!(Value::from("jo"), Value::Text("jo".to_string()));
        assert_eq!(Value::from(None::<i32>), Value::Null);
        assert_eq!(Value::from(Some(2.5)), Value::Float(2.5));
        assert!(Value::from(()).is_null());
    }

    #[test]
    fn int_adapts_to_inferred_width() {
        let mut buf = BytesMut::new();
        Value::Int(7).to_sql(&Type::INT4, &mut buf).unwrap();
        assert_eq!(buf.len(), 4);

        let mut buf = BytesMut::new();
        Value::Int(7).to_sql(&Type::INT8, &mut buf).unwrap();
        assert_eq!(buf.len(), 8);

        let mut buf = BytesMut::new();
        assert!(Value::Int(i64::MAX).to_sql(&Type::INT2, &mut buf).is_err());
    }

    #[test]
    fn unsupported_target_types_are_rejected() {
        let mut buf = BytesMut::new();
        assert!(Value::Int(10).to_sql_checked(&Type::NUMERIC, &mut buf).is_err());
        assert!(Value::Float(1.5).to_sql_checked(&Type::NUMERIC, &mut buf).is_err());
        assert!(Value::Int(10).to_sql_checked(&Type::UUID, &mut buf).is_err());
        assert!(Value::Bool(true).to_sql_checked(&Type::INT4, &mut buf).is_err());
        assert!(Value::from("x").to_sql_checked(&Type::INT8, &mut buf).is_err());
        assert!(buf.is_empty());

        assert!(Value::Null.to_sql_checked(&Type::NUMERIC, &mut buf).is_ok());
        assert!(Value::Float(1.5).to_sql_checked(&Type::FLOAT8, &mut buf).is_ok());
        assert_eq!(buf.len(), 8);
    }

    #[test]
    fn null_encodes_as_null() {
        let mut buf = BytesMut::new();
        let is_null = Value::Null.to_sql(&Type::TEXT, &mut buf).unwrap();
        assert!(matches!(is_null, IsNull::Yes));
    }

    #[test]
    fn serializes_untagged() {
        let json = serde_json::to_value(vec![Value::Int(1), Value::Null, Value::from("x")]).unwrap();
        assert_eq!(json, serde_json::json!([1, null, "x"]));
    }
}
