//! Boolean condition algebra for `where`, `having` and join `on` clauses.
//!
//! Callers compose [`Predicate`]s out of builder arguments (mappings, templates,
//! raw SQL, sub-queries). At compile time a predicate is resolved into a
//! [`Condition`] tree, which renders to text plus ordered parameters.
//!
//! Rendering rules:
//! - `not` binds tighter than `and`, which binds tighter than `or`.
//! - A child is wrapped in parentheses when its operator differs from its
//!   parent's; a `not` child is always wrapped.
//! - `column = $n` leaves are wrapped under `or` and left bare under `and` and `not`.
//! - Caller-written SQL (templates, raw text) is opaque and may hold its own
//!   top-level `or`, so it is wrapped under every operator.
//!
//! So `(A and B) or (not C)` renders exactly like that, and two mappings passed
//! to one call render as `(a = $1 and b = $2) or (c = $3)`.
//!
//! Separate `where`/`having` calls are conjoined and rendered on one line with
//! ` and `; no newline is inserted between calls.

use crate::arg::Arg;
use crate::config::Config;
use crate::error::{SqlError, SqlResult};
use crate::fragment::Fragment;
use crate::ident;
use crate::record::Record;
use crate::template::Template;

/// A resolved condition tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// An atomic comparison such as `column = $n` or a parenthesized sub-query.
    Leaf(Fragment),
    /// Caller-written SQL whose internal precedence is unknown.
    Expr(Fragment),
    Not(Box<Condition>),
    And(Box<Condition>, Box<Condition>),
    Or(Box<Condition>, Box<Condition>),
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Op {
    Not,
    And,
    Or,
}

impl Condition {
    /// Build `key = value` leaves from a mapping, conjoined in insertion order.
    ///
    /// Keys pass through the configured input key mapping and must be valid
    /// identifiers. A predicate value is spliced in as a sub-expression instead of
    /// being compared. An empty mapping yields `None`.
    pub fn from_record(record: &Record, config: &Config) -> SqlResult<Option<Condition>> {
        let mut leaves = Vec::with_capacity(record.len());
        for (key, value) in record.iter() {
            match value {
                Arg::Predicate(p) => {
                    if let Some(cond) = p.resolve(config)? {
                        leaves.push(cond);
                    }
                }
                Arg::Default | Arg::Record(_) => {
                    return Err(SqlError::malformed(format!(
                        "{} is not a valid operand for key '{key}'",
                        value.describe()
                    )));
                }
                _ => {
                    let column = ident::checked(&config.input_key(key))?;
                    let mut f = Fragment::from_sql(format!("{column} = "));
                    f.push_fragment(value.to_fragment(config)?);
                    leaves.push(Condition::Leaf(f));
                }
            }
        }
        Ok(Condition::conjoin_all(leaves))
    }

    /// An opaque expression from a rendered template.
    pub fn from_template(template: &Template, config: &Config) -> SqlResult<Condition> {
        template.render(config).map(Condition::Expr)
    }

    /// An opaque expression from text parts interleaved with arguments (`parts.len() == args.len() + 1`).
    pub fn from_fragment(parts: Vec<String>, args: Vec<Arg>, config: &Config) -> SqlResult<Condition> {
        Condition::from_template(&Template::from_parts(parts, args), config)
    }

    pub fn negate(self) -> Condition {
        Condition::Not(Box::new(self))
    }

    pub fn and(self, other: Condition) -> Condition {
        Condition::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: Condition) -> Condition {
        Condition::Or(Box::new(self), Box::new(other))
    }

    /// Left-fold with `and`; `None` when empty.
    pub fn conjoin_all(conditions: impl IntoIterator<Item = Condition>) -> Option<Condition> {
        conditions.into_iter().reduce(Condition::and)
    }

    /// Left-fold with `or`; `None` when empty.
    pub fn disjoin_all(conditions: impl IntoIterator<Item = Condition>) -> Option<Condition> {
        conditions.into_iter().reduce(Condition::or)
    }

    /// Render to text and parameters.
    pub fn render(&self) -> Fragment {
        let mut out = Fragment::new();
        self.write(&mut out);
        out
    }

    fn op(&self) -> Option<Op> {
        match self {
            Condition::Leaf(_) | Condition::Expr(_) => None,
            Condition::Not(_) => Some(Op::Not),
            Condition::And(..) => Some(Op::And),
            Condition::Or(..) => Some(Op::Or),
        }
    }

    fn needs_parens(&self, parent: Op) -> bool {
        match self.op() {
            None if matches!(self, Condition::Expr(_)) => true,
            None => parent == Op::Or,
            Some(Op::Not) => true,
            Some(op) => op != parent,
        }
    }

    fn write(&self, out: &mut Fragment) {
        match self {
            Condition::Leaf(f) | Condition::Expr(f) => {
                out.push_fragment(f.clone());
            }
            Condition::Not(inner) => {
                out.push("not ");
                inner.write_child(Op::Not, out);
            }
            Condition::And(a, b) => {
                a.write_child(Op::And, out);
                out.push(" and ");
                b.write_child(Op::And, out);
            }
            Condition::Or(a, b) => {
                a.write_child(Op::Or, out);
                out.push(" or ");
                b.write_child(Op::Or, out);
            }
        }
    }

    fn write_child(&self, parent: Op, out: &mut Fragment) {
        if self.needs_parens(parent) {
            out.push("(");
            self.write(out);
            out.push(")");
        } else {
            self.write(out);
        }
    }
}

/// An unresolved condition composed from builder arguments.
///
/// Each operand may be a mapping, a template, raw SQL, a sub-query or another
/// predicate. Plain values are rejected when the predicate is resolved.
#[derive(Debug, Clone)]
pub enum Predicate {
    Not(Box<Arg>),
    And(Vec<Arg>),
    Or(Vec<Arg>),
}

/// Negate an operand: `not (...)`.
pub fn not(operand: impl Into<Arg>) -> Predicate {
    Predicate::Not(Box::new(operand.into()))
}

/// `a and b`
pub fn and(a: impl Into<Arg>, b: impl Into<Arg>) -> Predicate {
    Predicate::And(vec![a.into(), b.into()])
}

/// `a or b`
pub fn or(a: impl Into<Arg>, b: impl Into<Arg>) -> Predicate {
    Predicate::Or(vec![a.into(), b.into()])
}

/// Conjoin every operand. An empty list resolves to no condition.
pub fn all<I, T>(operands: I) -> Predicate
where
    I: IntoIterator<Item = T>,
    T: Into<Arg>,
{
    Predicate::And(operands.into_iter().map(Into::into).collect())
}

/// Disjoin every operand. An empty list resolves to no condition.
pub fn any<I, T>(operands: I) -> Predicate
where
    I: IntoIterator<Item = T>,
    T: Into<Arg>,
{
    Predicate::Or(operands.into_iter().map(Into::into).collect())
}

impl Predicate {
    /// Extend with another conjoined operand.
    pub fn and(self, operand: impl Into<Arg>) -> Predicate {
        match self {
            Predicate::And(mut ops) => {
                ops.push(operand.into());
                Predicate::And(ops)
            }
            other => Predicate::And(vec![other.into(), operand.into()]),
        }
    }

    /// Extend with another disjoined operand.
    pub fn or(self, operand: impl Into<Arg>) -> Predicate {
        match self {
            Predicate::Or(mut ops) => {
                ops.push(operand.into());
                Predicate::Or(ops)
            }
            other => Predicate::Or(vec![other.into(), operand.into()]),
        }
    }

    /// Resolve into a condition tree; `None` when every operand is empty.
    pub fn resolve(&self, config: &Config) -> SqlResult<Option<Condition>> {
        match self {
            Predicate::Not(arg) => Ok(resolve_operand(arg, config)?.map(Condition::negate)),
            Predicate::And(args) => Ok(Condition::conjoin_all(resolve_each(args, config)?)),
            Predicate::Or(args) => Ok(Condition::disjoin_all(resolve_each(args, config)?)),
        }
    }
}

fn resolve_each(args: &[Arg], config: &Config) -> SqlResult<Vec<Condition>> {
    let mut out = Vec::with_capacity(args.len());
    for arg in args {
        if let Some(cond) = resolve_operand(arg, config)? {
            out.push(cond);
        }
    }
    Ok(out)
}

/// Resolve one condition operand.
pub(crate) fn resolve_operand(arg: &Arg, config: &Config) -> SqlResult<Option<Condition>> {
    if let Some(record) = arg.as_record()? {
        return Condition::from_record(&record, config);
    }
    match arg {
        Arg::Template(t) => Condition::from_template(t, config).map(Some),
        Arg::Raw(r) => Ok(Some(Condition::Expr(Fragment::from_sql(r.as_str())))),
        Arg::Query(q) => Ok(Some(Condition::Leaf(q.to_fragment()?.parenthesized()))),
        Arg::Statement(s) => Ok(Some(Condition::Leaf(
            Fragment::from_statement(s)?.parenthesized(),
        ))),
        Arg::Predicate(p) => p.resolve(config),
        other => Err(SqlError::malformed(format!(
            "expected a mapping, template, raw SQL, sub-query or predicate, got {}",
            other.describe()
        ))),
    }
}

/// Resolve the arguments of one condition call: disjoined in argument order.
pub(crate) fn resolve_call(args: &[Arg], config: &Config) -> SqlResult<Option<Condition>> {
    Ok(Condition::disjoin_all(resolve_each(args, config)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arg::raw;
    use crate::record;
    use crate::template::sql;
    use crate::value::Value;

    fn leaf(text: &str) -> Condition {
        Condition::Leaf(Fragment::from_sql(text))
    }

    #[test]
    fn mapping_pairs_are_conjoined_in_order() {
        let cond = Condition::from_record(&record! { "a" => 1, "b" => 2 }, &Config::default())
            .unwrap()
            .unwrap();
        let f = cond.render();
        assert_eq!(f.to_sql(), "a = $1 and b = $2");
        assert_eq!(f.args(), &[Value::Int(1), Value::Int(2)]);
    }

    #[test]
    fn mapping_keys_are_mapped_and_checked() {
        let config = Config::default();
        let f = Condition::from_record(&record! { "lastName" => "jo" }, &config)
            .unwrap()
            .unwrap()
            .render();
        assert_eq!(f.to_sql(), "last_name = $1");

        let err = Condition::from_record(&record! { "a; drop" => 1 }, &Config::identity());
        assert!(matches!(err, Err(SqlError::Validation(_))));
    }

    #[test]
    fn null_keeps_equality() {
        let f = Condition::from_record(&record! { "deleted_at" => () }, &Config::default())
            .unwrap()
            .unwrap()
            .render();
        assert_eq!(f.to_sql(), "deleted_at = $1");
        assert_eq!(f.args(), &[Value::Null]);
    }

    #[test]
    fn empty_mapping_is_absent() {
        assert!(Condition::from_record(&Record::new(), &Config::default()).unwrap().is_none());
    }

    #[test]
    fn parenthesization_follows_operator_changes() {
        let cond = leaf("A").and(leaf("B")).or(leaf("C").negate());
        assert_eq!(cond.render().to_sql(), "(A and B) or (not C)");
    }

    #[test]
    fn same_operator_chains_stay_flat() {
        let cond = leaf("A").and(leaf("B")).and(leaf("C"));
        assert_eq!(cond.render().to_sql(), "A and B and C");
        let cond = leaf("A").or(leaf("B")).and(leaf("C"));
        assert_eq!(cond.render().to_sql(), "((A) or (B)) and C");
    }

    #[test]
    fn not_wraps_compound_and_nested_negations() {
        assert_eq!(leaf("A").and(leaf("B")).negate().render().to_sql(), "not (A and B)");
        assert_eq!(leaf("A").negate().negate().render().to_sql(), "not (not A)");
        assert_eq!(leaf("A").and(leaf("B").negate()).render().to_sql(), "A and (not B)");
    }

    #[test]
    fn two_mappings_in_one_call_are_disjoined() {
        let args = vec![
            Arg::from(record! { "a" => 1, "b" => 2 }),
            Arg::from(record! { "c" => 3 }),
        ];
        let f = resolve_call(&args, &Config::default()).unwrap().unwrap().render();
        assert_eq!(f.to_sql(), "(a = $1 and b = $2) or (c = $3)");
        assert_eq!(f.args(), &[Value::Int(1), Value::Int(2), Value::Int(3)]);
    }

    #[test]
    fn predicate_values_are_spliced() {
        let nested = record! { "name" => "jo", "or" => any([record! { "age" => 1 }, record! { "age" => 2 }]) };
        let f = Condition::from_record(&nested, &Config::default())
            .unwrap()
            .unwrap()
            .render();
        assert_eq!(f.to_sql(), "name = $1 and ((age = $2) or (age = $3))");
    }

    #[test]
    fn predicates_compose_templates_and_raw() {
        let p = not(sql("age < ?").bind(18)).and(raw("active"));
        let f = p.resolve(&Config::default()).unwrap().unwrap().render();
        assert_eq!(f.to_sql(), "(not (age < $1)) and (active)");
    }

    #[test]
    fn opaque_disjunction_keeps_its_grouping() {
        let config = Config::default();
        let either = Condition::from_template(&sql("a = ? or b = ?").bind(1).bind(2), &config).unwrap();
        let f = either.clone().and(leaf("c = 3")).render();
        assert_eq!(f.to_sql(), "(a = $1 or b = $2) and c = 3");

        let f = either.clone().negate().render();
        assert_eq!(f.to_sql(), "not (a = $1 or b = $2)");

        assert_eq!(either.render().to_sql(), "a = $1 or b = $2");
    }

    #[test]
    fn raw_operands_are_wrapped_under_operators() {
        let p = all([raw("x or y"), raw("z")]);
        let f = p.resolve(&Config::default()).unwrap().unwrap().render();
        assert_eq!(f.to_sql(), "(x or y) and (z)");
    }

    #[test]
    fn empty_composition_resolves_to_nothing() {
        assert!(all(Vec::<Arg>::new()).resolve(&Config::default()).unwrap().is_none());
    }

    #[test]
    fn plain_values_are_malformed_conditions() {
        let err = resolve_call(&[Arg::from(5)], &Config::default());
        assert!(matches!(err, Err(SqlError::MalformedCondition(_))));

        let err = Condition::from_record(&record! { "a" => Record::new() }, &Config::default());
        assert!(matches!(err, Err(SqlError::MalformedCondition(_))));
    }

    #[test]
    fn raw_fragment_leaf() {
        let cond = Condition::from_fragment(
            vec!["x > ".to_string(), String::new()],
            vec![Arg::from(3)],
            &Config::default(),
        )
        .unwrap();
        assert_eq!(cond.render().to_sql(), "x > $1");
    }
}
