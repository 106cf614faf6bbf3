//! Ordering clause generators and joining their fragments.

use super::clauses::{self, Generator};
use super::context::Context;
use super::log::StatementKind;
use crate::config::Config;
use crate::error::{SqlError, SqlResult};
use crate::fragment::{Fragment, Statement};

const SELECT: &[Generator] = &[
    clauses::with,
    clauses::select,
    clauses::from,
    clauses::filter,
    clauses::group_by,
    clauses::having,
    clauses::order_by,
    clauses::limit,
    clauses::offset,
];

const INSERT: &[Generator] = &[clauses::with, clauses::insert, clauses::returning];

const UPDATE: &[Generator] = &[
    clauses::with,
    clauses::update,
    clauses::from,
    clauses::filter,
    clauses::returning,
];

const DELETE: &[Generator] = &[
    clauses::with,
    clauses::delete,
    clauses::from,
    clauses::filter,
    clauses::returning,
];

const MANUAL: &[Generator] = &[clauses::manual];

/// Clause generators in emission order for `kind`.
pub(crate) fn generators(kind: StatementKind) -> &'static [Generator] {
    match kind {
        StatementKind::Select => SELECT,
        StatementKind::Insert => INSERT,
        StatementKind::Update => UPDATE,
        StatementKind::Delete => DELETE,
        StatementKind::Manual => MANUAL,
    }
}

/// Run every generator for the context's statement kind.
///
/// Fails with [`SqlError::EmptyStatement`] when the statement needs a target
/// table and none was given.
pub(crate) fn generate(ctx: &Context<'_>, config: &Config) -> SqlResult<Vec<Fragment>> {
    if ctx.kind.requires_target() && ctx.target().is_none() {
        return Err(SqlError::EmptyStatement(ctx.kind));
    }
    let mut fragments = Vec::new();
    for generator in generators(ctx.kind) {
        if let Some(f) = generator(ctx, config)? {
            fragments.push(f);
        }
    }
    Ok(fragments)
}

/// Join fragments with single spaces, without numbering placeholders.
pub(crate) fn concat(fragments: Vec<Fragment>) -> Fragment {
    Fragment::join(fragments, " ")
}

/// Join fragments and number placeholders `$1..$n` in emission order.
pub(crate) fn assemble(fragments: Vec<Fragment>) -> Statement {
    let joined = concat(fragments);
    let mut text = String::new();
    let mut next = 1;
    joined.write_numbered(&mut text, &mut next);
    Statement::new(text, joined.into_args())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn renumbers_across_fragments() {
        let mut filter = Fragment::from_sql("where a = ");
        filter.push_bind(Value::Int(7)).push(" and b = ").push_bind(Value::Int(13));
        let mut ret = Fragment::from_sql("returning ");
        ret.push_fragment(
            Fragment::from_statement(&Statement::new("select $1", vec![Value::from("x")]))
                .unwrap()
                .parenthesized(),
        );

        let stmt = assemble(vec![Fragment::from_sql("delete from t"), filter, ret]);
        assert_eq!(stmt.text, "delete from t where a = $1 and b = $2 returning (select $3)");
        assert_eq!(stmt.args, vec![Value::Int(7), Value::Int(13), Value::from("x")]);
    }

    #[test]
    fn skips_empty_fragments() {
        let stmt = assemble(vec![Fragment::from_sql("select 1"), Fragment::new()]);
        assert_eq!(stmt.text, "select 1");
    }
}
