//! Folding a method log into a per-statement context.

use super::log::{ClauseKind, MethodCall, StatementKind};
use crate::arg::Arg;
use crate::error::{SqlError, SqlResult};

/// Method calls bucketed by clause, plus the inferred statement kind.
///
/// Buckets borrow from the log and keep call order.
#[derive(Debug)]
pub(crate) struct Context<'a> {
    pub kind: StatementKind,
    pub with: Vec<&'a MethodCall>,
    /// `from` and join calls, interleaved in log order.
    pub from: Vec<&'a MethodCall>,
    pub filter: Vec<&'a MethodCall>,
    pub ret: Vec<&'a MethodCall>,
    pub group: Vec<&'a MethodCall>,
    pub having: Vec<&'a MethodCall>,
    pub order: Vec<&'a MethodCall>,
    pub limit: Vec<&'a MethodCall>,
    pub offset: Vec<&'a MethodCall>,
    pub set: Vec<&'a MethodCall>,
    /// Column and value calls, interleaved in log order.
    pub insert: Vec<&'a MethodCall>,
    pub manual: Vec<&'a MethodCall>,
}

impl<'a> Context<'a> {
    fn empty() -> Self {
        Self {
            kind: StatementKind::Select,
            with: Vec::new(),
            from: Vec::new(),
            filter: Vec::new(),
            ret: Vec::new(),
            group: Vec::new(),
            having: Vec::new(),
            order: Vec::new(),
            limit: Vec::new(),
            offset: Vec::new(),
            set: Vec::new(),
            insert: Vec::new(),
            manual: Vec::new(),
        }
    }

    /// The first argument of the first `from` call.
    pub fn target(&self) -> Option<&'a Arg> {
        self.from
            .iter()
            .find(|c| c.kind == ClauseKind::From)
            .and_then(|c| c.args.first())
    }

    fn select_only_clauses_used(&self) -> bool {
        !(self.group.is_empty()
            && self.having.is_empty()
            && self.order.is_empty()
            && self.limit.is_empty()
            && self.offset.is_empty())
    }

    fn non_manual_clauses_used(&self) -> bool {
        !(self.with.is_empty()
            && self.from.is_empty()
            && self.filter.is_empty()
            && self.ret.is_empty()
            && self.set.is_empty()
            && self.insert.is_empty())
            || self.select_only_clauses_used()
    }

    pub fn columns_calls(&self) -> usize {
        self.insert
            .iter()
            .filter(|c| c.kind == ClauseKind::InsertColumns)
            .count()
    }

    pub fn values_calls(&self) -> usize {
        self.insert
            .iter()
            .filter(|c| c.kind == ClauseKind::InsertValues)
            .count()
    }
}

fn implied_kind(kind: ClauseKind) -> Option<StatementKind> {
    match kind {
        ClauseKind::Set => Some(StatementKind::Update),
        ClauseKind::InsertColumns | ClauseKind::InsertValues => Some(StatementKind::Insert),
        ClauseKind::Delete => Some(StatementKind::Delete),
        ClauseKind::Manual => Some(StatementKind::Manual),
        _ => None,
    }
}

/// Fold `calls` into a [`Context`].
///
/// Fails when two calls imply different statement kinds, when a clause is used
/// with a statement kind it does not belong to, or when insert column and value
/// calls do not line up.
pub(crate) fn reduce<'a>(calls: &[&'a MethodCall]) -> SqlResult<Context<'a>> {
    let mut ctx = Context::empty();
    let mut implied: Option<StatementKind> = None;

    for &call in calls {
        if let Some(next) = implied_kind(call.kind) {
            match implied {
                Some(first) if first != next => {
                    return Err(SqlError::ConflictingStatementKind { first, second: next });
                }
                _ => implied = Some(next),
            }
        }

        let bucket = match call.kind {
            ClauseKind::With => &mut ctx.with,
            ClauseKind::From | ClauseKind::Join(_) => &mut ctx.from,
            ClauseKind::Where => &mut ctx.filter,
            ClauseKind::Return => &mut ctx.ret,
            ClauseKind::Group => &mut ctx.group,
            ClauseKind::Having => &mut ctx.having,
            ClauseKind::Order => &mut ctx.order,
            ClauseKind::Limit => &mut ctx.limit,
            ClauseKind::Offset => &mut ctx.offset,
            ClauseKind::Set => &mut ctx.set,
            ClauseKind::InsertColumns | ClauseKind::InsertValues => &mut ctx.insert,
            ClauseKind::Manual => &mut ctx.manual,
            ClauseKind::Delete => continue,
        };
        bucket.push(call);
    }

    ctx.kind = implied.unwrap_or(StatementKind::Select);

    match ctx.kind {
        StatementKind::Manual if ctx.non_manual_clauses_used() => {
            return Err(SqlError::ConflictingStatementKind {
                first: StatementKind::Manual,
                second: StatementKind::Select,
            });
        }
        StatementKind::Insert | StatementKind::Update | StatementKind::Delete
            if ctx.select_only_clauses_used() =>
        {
            return Err(SqlError::ConflictingStatementKind {
                first: ctx.kind,
                second: StatementKind::Select,
            });
        }
        StatementKind::Insert if !ctx.filter.is_empty() => {
            return Err(SqlError::ConflictingStatementKind {
                first: StatementKind::Insert,
                second: StatementKind::Select,
            });
        }
        _ => {}
    }

    if ctx.kind == StatementKind::Insert {
        let columns = ctx.columns_calls();
        let values = ctx.values_calls();
        if columns > 0 && values == 0 {
            return Err(SqlError::arity("insert columns were declared but no values supplied"));
        }
        if columns > 1 && columns != values {
            return Err(SqlError::arity(format!(
                "{columns} column call(s) but {values} value call(s)"
            )));
        }
    }

    Ok(ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arg::Expr;

    fn call(kind: ClauseKind) -> MethodCall {
        MethodCall::new(kind, vec![Expr::from("t").into_arg()])
    }

    fn reduce_kinds(kinds: &[ClauseKind]) -> SqlResult<StatementKind> {
        let calls: Vec<MethodCall> = kinds.iter().copied().map(call).collect();
        let refs: Vec<&MethodCall> = calls.iter().collect();
        reduce(&refs).map(|ctx| ctx.kind)
    }

    #[test]
    fn defaults_to_select() {
        assert_eq!(reduce_kinds(&[ClauseKind::From, ClauseKind::Where]).unwrap(), StatementKind::Select);
        assert_eq!(reduce_kinds(&[]).unwrap(), StatementKind::Select);
    }

    #[test]
    fn mutation_calls_set_the_kind() {
        assert_eq!(reduce_kinds(&[ClauseKind::From, ClauseKind::Set]).unwrap(), StatementKind::Update);
        assert_eq!(reduce_kinds(&[ClauseKind::Delete, ClauseKind::From]).unwrap(), StatementKind::Delete);
        assert_eq!(
            reduce_kinds(&[ClauseKind::From, ClauseKind::InsertValues]).unwrap(),
            StatementKind::Insert
        );
    }

    #[test]
    fn set_after_delete_conflicts() {
        let err = reduce_kinds(&[ClauseKind::From, ClauseKind::Delete, ClauseKind::Set]).unwrap_err();
        assert!(matches!(
            err,
            SqlError::ConflictingStatementKind {
                first: StatementKind::Delete,
                second: StatementKind::Update
            }
        ));
    }

    #[test]
    fn select_only_clauses_conflict_with_mutations() {
        let err = reduce_kinds(&[ClauseKind::From, ClauseKind::Set, ClauseKind::Limit]).unwrap_err();
        assert!(matches!(err, SqlError::ConflictingStatementKind { .. }));
        let err = reduce_kinds(&[ClauseKind::From, ClauseKind::InsertValues, ClauseKind::Where]).unwrap_err();
        assert!(matches!(err, SqlError::ConflictingStatementKind { .. }));
    }

    #[test]
    fn manual_excludes_every_other_clause() {
        assert_eq!(reduce_kinds(&[ClauseKind::Manual, ClauseKind::Manual]).unwrap(), StatementKind::Manual);
        let err = reduce_kinds(&[ClauseKind::Manual, ClauseKind::From]).unwrap_err();
        assert!(matches!(err, SqlError::ConflictingStatementKind { .. }));
    }

    #[test]
    fn column_and_value_calls_must_align() {
        let err = reduce_kinds(&[
            ClauseKind::From,
            ClauseKind::InsertColumns,
            ClauseKind::InsertValues,
            ClauseKind::InsertColumns,
        ])
        .unwrap_err();
        assert!(matches!(err, SqlError::ArityMismatch(_)));

        let err = reduce_kinds(&[ClauseKind::From, ClauseKind::InsertColumns]).unwrap_err();
        assert!(matches!(err, SqlError::ArityMismatch(_)));
    }

    #[test]
    fn buckets_keep_log_order() {
        let calls = [
            call(ClauseKind::From),
            call(ClauseKind::Join(super::super::log::JoinKind::Left)),
            call(ClauseKind::From),
        ];
        let refs: Vec<&MethodCall> = calls.iter().collect();
        let ctx = reduce(&refs).unwrap();
        assert_eq!(ctx.from.len(), 3);
        assert!(matches!(ctx.from[1].kind, ClauseKind::Join(_)));
        assert!(ctx.target().is_some());
    }
}
