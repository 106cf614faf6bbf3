//! Builder arguments and the escaping primitive.
//!
//! Every argument handed to a builder method is an [`Arg`]. Plain values always
//! become positional parameters; only text wrapped by [`raw`] is inlined into
//! the statement. Nothing is ever classified as raw from its type or content.

use crate::condition::Predicate;
use crate::config::Config;
use crate::error::{SqlError, SqlResult};
use crate::fragment::{Fragment, Statement};
use crate::query::Query;
use crate::record::Record;
use crate::template::Template;
use crate::value::Value;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Literal SQL text that opts out of parameterization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raw(pub(crate) String);

impl Raw {
    /// The wrapped SQL text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Mark `sql` as literal SQL text rather than a parameter value.
///
/// # Example
/// ```ignore
/// sq().from("person").set(record! { "age" => raw("age + 1") })
/// ```
pub fn raw(sql: impl Into<String>) -> Raw {
    Raw(sql.into())
}

/// One argument of a builder call.
#[derive(Debug, Clone)]
pub enum Arg {
    /// Bound as a positional parameter.
    Value(Value),
    /// The SQL `default` marker.
    Default,
    /// Inlined verbatim.
    Raw(Raw),
    /// SQL text with `?` slots filled by escaped arguments.
    Template(Template),
    /// A nested builder, compiled and spliced in parentheses.
    Query(Box<Query>),
    /// A previously compiled statement, spliced in parentheses.
    Statement(Statement),
    /// Key-value mapping (object shorthand).
    Record(Record),
    /// Composed condition.
    Predicate(Predicate),
}

/// Outcome of the escaping primitive for a scalar argument.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Escaped<'a> {
    Parameter(&'a Value),
    Raw(&'a str),
}

impl Arg {
    /// Classify a scalar argument: parameter by default, raw only when marked.
    ///
    /// Returns `None` for structured arguments (templates, sub-queries, records,
    /// predicates) and for the `default` marker.
    pub fn classify(&self) -> Option<Escaped<'_>> {
        match self {
            Arg::Value(v) => Some(Escaped::Parameter(v)),
            Arg::Raw(r) => Some(Escaped::Raw(&r.0)),
            _ => None,
        }
    }

    /// Interpret the argument as a key-value mapping, if it is one.
    ///
    /// JSON objects count as mappings; every other JSON value does not.
    pub(crate) fn as_record(&self) -> SqlResult<Option<Record>> {
        match self {
            Arg::Record(r) => Ok(Some(r.clone())),
            Arg::Value(Value::Json(json @ serde_json::Value::Object(_))) => {
                Record::try_from(json.clone()).map(Some)
            }
            _ => Ok(None),
        }
    }

    /// Compile the argument into a fragment usable as a single SQL operand.
    pub(crate) fn to_fragment(&self, config: &Config) -> SqlResult<Fragment> {
        match self {
            Arg::Value(v) => Ok(Fragment::param(v.clone())),
            Arg::Raw(r) => Ok(Fragment::from_sql(r.0.as_str())),
            Arg::Default => Ok(Fragment::from_sql("default")),
            Arg::Template(t) => t.render(config),
            Arg::Query(q) => Ok(q.to_fragment()?.parenthesized()),
            Arg::Statement(s) => Ok(Fragment::from_statement(s)?.parenthesized()),
            Arg::Predicate(p) => match p.resolve(config)? {
                Some(cond) => Ok(cond.render().parenthesized()),
                None => Err(SqlError::malformed("empty predicate used as an operand")),
            },
            Arg::Record(_) => Err(SqlError::malformed(
                "a key-value mapping cannot be used as a single operand",
            )),
        }
    }

    /// Compile a sub-statement body without surrounding parentheses.
    pub(crate) fn to_body(&self, config: &Config) -> SqlResult<Fragment> {
        match self {
            Arg::Query(q) => q.to_fragment(),
            Arg::Statement(s) => Fragment::from_statement(s),
            Arg::Template(t) => t.render(config),
            Arg::Raw(r) => Ok(Fragment::from_sql(r.0.as_str())),
            other => Err(SqlError::validation(format!(
                "expected a sub-query, template or raw SQL, got {}",
                other.describe()
            ))),
        }
    }

    pub(crate) fn describe(&self) -> &'static str {
        match self {
            Arg::Value(_) => "a value",
            Arg::Default => "default",
            Arg::Raw(_) => "raw SQL",
            Arg::Template(_) => "a template",
            Arg::Query(_) => "a sub-query",
            Arg::Statement(_) => "a compiled statement",
            Arg::Record(_) => "a key-value mapping",
            Arg::Predicate(_) => "a predicate",
        }
    }
}

/// Implement `From<$t> for Arg` through [`Value`].
macro_rules! arg_from_value {
    ($($t:ty),* $(,)?) => {
        $(
            impl From<$t> for Arg {
                fn from(v: $t) -> Self {
                    Arg::Value(Value::from(v))
                }
            }
        )*
    };
}

arg_from_value!(
    bool,
    i16,
    i32,
    i64,
    u32,
    f32,
    f64,
    &str,
    String,
    &String,
    Uuid,
    DateTime<Utc>,
    Vec<u8>,
    serde_json::Value,
    (),
);

impl<T: Into<Value>> From<Option<T>> for Arg {
    fn from(v: Option<T>) -> Self {
        Arg::Value(Value::from(v))
    }
}

impl From<Value> for Arg {
    fn from(v: Value) -> Self {
        Arg::Value(v)
    }
}

impl From<Raw> for Arg {
    fn from(r: Raw) -> Self {
        Arg::Raw(r)
    }
}

impl From<Template> for Arg {
    fn from(t: Template) -> Self {
        Arg::Template(t)
    }
}

impl From<Query> for Arg {
    fn from(q: Query) -> Self {
        Arg::Query(Box::new(q))
    }
}

impl From<&Query> for Arg {
    fn from(q: &Query) -> Self {
        Arg::Query(Box::new(q.clone()))
    }
}

impl From<Statement> for Arg {
    fn from(s: Statement) -> Self {
        Arg::Statement(s)
    }
}

impl From<Record> for Arg {
    fn from(r: Record) -> Self {
        Arg::Record(r)
    }
}

impl From<Predicate> for Arg {
    fn from(p: Predicate) -> Self {
        Arg::Predicate(p)
    }
}

/// A caller-written SQL expression in an identifier position.
///
/// Table names, column lists, join targets and `on` conditions are code, not
/// data: plain strings passed here are inlined as SQL text. Structured arguments
/// (templates, sub-queries, records, predicates) keep their usual meaning.
#[derive(Debug, Clone)]
pub struct Expr(pub(crate) Arg);

impl Expr {
    pub(crate) fn into_arg(self) -> Arg {
        self.0
    }
}

impl From<&str> for Expr {
    fn from(s: &str) -> Self {
        Expr(Arg::Raw(raw(s)))
    }
}

impl From<String> for Expr {
    fn from(s: String) -> Self {
        Expr(Arg::Raw(Raw(s)))
    }
}

impl From<&String> for Expr {
    fn from(s: &String) -> Self {
        Expr(Arg::Raw(Raw(s.clone())))
    }
}

impl From<Raw> for Expr {
    fn from(r: Raw) -> Self {
        Expr(Arg::Raw(r))
    }
}

impl From<Template> for Expr {
    fn from(t: Template) -> Self {
        Expr(Arg::Template(t))
    }
}

impl From<Query> for Expr {
    fn from(q: Query) -> Self {
        Expr(Arg::from(q))
    }
}

impl From<&Query> for Expr {
    fn from(q: &Query) -> Self {
        Expr(Arg::from(q))
    }
}

impl From<Statement> for Expr {
    fn from(s: Statement) -> Self {
        Expr(Arg::Statement(s))
    }
}

impl From<Record> for Expr {
    fn from(r: Record) -> Self {
        Expr(Arg::Record(r))
    }
}

impl From<Predicate> for Expr {
    fn from(p: Predicate) -> Self {
        Expr(Arg::Predicate(p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_are_parameters_by_default() {
        let arg = Arg::from("1; drop table users");
        assert_eq!(
            arg.classify(),
            Some(Escaped::Parameter(&Value::from("1; drop table users")))
        );
    }

    #[test]
    fn raw_requires_explicit_marker() {
        let arg = Arg::from(raw("age + 1"));
        assert_eq!(arg.classify(), Some(Escaped::Raw("age + 1")));
    }

    #[test]
    fn structured_args_are_not_scalars() {
        assert_eq!(Arg::Default.classify(), None);
        assert_eq!(Arg::from(Record::new()).classify(), None);
    }

    #[test]
    fn operand_fragments() {
        let config = Config::default();
        assert_eq!(Arg::from(7).to_fragment(&config).unwrap().to_sql(), "$1");
        assert_eq!(Arg::from(raw("now()")).to_fragment(&config).unwrap().to_sql(), "now()");
        assert_eq!(Arg::Default.to_fragment(&config).unwrap().to_sql(), "default");
        assert!(matches!(
            Arg::from(Record::new()).to_fragment(&config),
            Err(SqlError::MalformedCondition(_))
        ));
    }

    #[test]
    fn json_objects_read_as_records() {
        let arg = Arg::from(serde_json::json!({ "age": 3 }));
        assert_eq!(arg.as_record().unwrap().unwrap().len(), 1);
        assert!(Arg::from(serde_json::json!([1])).as_record().unwrap().is_none());
    }

    #[test]
    fn strings_in_identifier_position_are_sql() {
        let expr = Expr::from("count(*)");
        assert_eq!(expr.into_arg().classify(), Some(Escaped::Raw("count(*)")));
    }
}
