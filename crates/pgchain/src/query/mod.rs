//! The chainable query builder.
//!
//! A [`Query`] is an immutable method log plus a shared [`Config`]. Every
//! chain method returns a new `Query` that extends the log; the receiver is
//! left untouched, so a prefix can be branched freely:
//!
//! ```ignore
//! let people = sq().from("person");
//! let adults = people.filter(sql("age >= ?").bind(18));
//! let kids = people.filter(sql("age < ?").bind(18));
//! ```
//!
//! Compilation folds the log into a context, runs the clause generators for
//! the inferred statement kind and assembles the result into a [`Statement`].

mod assemble;
mod clauses;
mod context;
mod log;


pub use log::{ClauseKind, JoinKind, MethodCall, MethodLog, StatementKind};

use crate::arg::{Arg, Expr};
use crate::config::Config;
use crate::error::SqlResult;
use crate::fragment::{Fragment, Statement};
use crate::template::Template;
use crate::trace;
use std::sync::Arc;

/// A fluent, immutable query builder.
#[derive(Debug, Clone)]
pub struct Query {
    config: Arc<Config>,
    log: MethodLog,
}

impl Default for Query {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl Query {
    /// Create an empty builder with `config`.
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
            log: MethodLog::new(),
        }
    }

    fn push(&self, kind: ClauseKind, args: Vec<Arg>) -> Self {
        Self {
            config: Arc::clone(&self.config),
            log: self.log.push(MethodCall::new(kind, args)),
        }
    }

    /// The configuration shared by this builder and every builder branched from it.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The recorded calls, oldest first.
    pub fn calls(&self) -> Vec<&MethodCall> {
        self.log.calls()
    }

    // ── with ──

    /// `with <alias> as (<sub>)`
    pub fn with(&self, alias: &str, sub: impl Into<Expr>) -> Self {
        self.push(
            ClauseKind::With,
            vec![Arg::Raw(crate::arg::raw(alias)), sub.into().into_arg()],
        )
    }

    /// One CTE per row entry: `{alias: sub}`.
    pub fn with_record(&self, ctes: impl Into<Arg>) -> Self {
        self.push(ClauseKind::With, vec![ctes.into()])
    }

    // ── from / joins ──

    /// Add a table, sub-query or aliased row (`{alias: table}`) to `from`.
    ///
    /// For mutations the first `from` target is the statement's target table.
    pub fn from(&self, source: impl Into<Expr>) -> Self {
        self.push(ClauseKind::From, vec![source.into().into_arg()])
    }

    /// Add several sources in one call.
    pub fn from_tables<I, T>(&self, sources: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Expr>,
    {
        self.push(ClauseKind::From, exprs(sources))
    }

    fn join(&self, kind: JoinKind, target: impl Into<Expr>, on: impl Into<Expr>) -> Self {
        self.push(
            ClauseKind::Join(kind),
            vec![target.into().into_arg(), on.into().into_arg()],
        )
    }

    /// `join <target> on <on>`
    pub fn inner_join(&self, target: impl Into<Expr>, on: impl Into<Expr>) -> Self {
        self.join(JoinKind::Inner, target, on)
    }

    /// `left join <target> on <on>`
    pub fn left_join(&self, target: impl Into<Expr>, on: impl Into<Expr>) -> Self {
        self.join(JoinKind::Left, target, on)
    }

    /// `right join <target> on <on>`
    pub fn right_join(&self, target: impl Into<Expr>, on: impl Into<Expr>) -> Self {
        self.join(JoinKind::Right, target, on)
    }

    /// `full join <target> on <on>`
    pub fn full_join(&self, target: impl Into<Expr>, on: impl Into<Expr>) -> Self {
        self.join(JoinKind::Full, target, on)
    }

    /// `cross join <target>`
    pub fn cross_join(&self, target: impl Into<Expr>) -> Self {
        self.push(ClauseKind::Join(JoinKind::Cross), vec![target.into().into_arg()])
    }

    // ── where / having ──

    /// Add a condition. Calls are conjoined with `and`.
    ///
    /// Accepts a row (`{column: value}` pairs conjoined), a template, raw SQL,
    /// a sub-query or a composed predicate.
    pub fn filter(&self, condition: impl Into<Arg>) -> Self {
        self.push(ClauseKind::Where, vec![condition.into()])
    }

    /// Add several conditions in one call; they are disjoined with `or`.
    pub fn filter_any<I, T>(&self, conditions: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Arg>,
    {
        self.push(ClauseKind::Where, conditions.into_iter().map(Into::into).collect())
    }

    /// Add a `having` condition, with the same rules as [`Query::filter`].
    pub fn having(&self, condition: impl Into<Arg>) -> Self {
        self.push(ClauseKind::Having, vec![condition.into()])
    }

    /// Disjoined `having` conditions.
    pub fn having_any<I, T>(&self, conditions: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Arg>,
    {
        self.push(ClauseKind::Having, conditions.into_iter().map(Into::into).collect())
    }

    // ── select / returning ──

    /// Select a column expression (or `{alias: expr}` row).
    ///
    /// On insert/update/delete this is the `returning` list.
    pub fn select(&self, column: impl Into<Expr>) -> Self {
        self.push(ClauseKind::Return, vec![column.into().into_arg()])
    }

    /// Select several columns in one call.
    pub fn select_cols<I, T>(&self, columns: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Expr>,
    {
        self.push(ClauseKind::Return, exprs(columns))
    }

    /// Alias of [`Query::select`].
    pub fn returning(&self, column: impl Into<Expr>) -> Self {
        self.select(column)
    }

    /// Alias of [`Query::select_cols`].
    pub fn returning_cols<I, T>(&self, columns: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Expr>,
    {
        self.select_cols(columns)
    }

    // ── group by / order by / limit / offset ──

    pub fn group_by(&self, column: impl Into<Expr>) -> Self {
        self.push(ClauseKind::Group, vec![column.into().into_arg()])
    }

    pub fn group_by_cols<I, T>(&self, columns: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Expr>,
    {
        self.push(ClauseKind::Group, exprs(columns))
    }

    /// `order by <expr>`; the expression may carry its own direction.
    pub fn order_by(&self, expr: impl Into<Expr>) -> Self {
        self.push(ClauseKind::Order, vec![expr.into().into_arg()])
    }

    /// `order by <expr> asc`
    pub fn order_by_asc(&self, expr: impl Into<Expr>) -> Self {
        self.push(ClauseKind::Order, vec![directed(expr, " asc")])
    }

    /// `order by <expr> desc`
    pub fn order_by_desc(&self, expr: impl Into<Expr>) -> Self {
        self.push(ClauseKind::Order, vec![directed(expr, " desc")])
    }

    pub fn order_by_cols<I, T>(&self, items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Expr>,
    {
        self.push(ClauseKind::Order, exprs(items))
    }

    /// `limit $n`; the last call wins.
    pub fn limit(&self, n: impl Into<Arg>) -> Self {
        self.push(ClauseKind::Limit, vec![n.into()])
    }

    /// `offset $n`; the last call wins.
    pub fn offset(&self, n: impl Into<Arg>) -> Self {
        self.push(ClauseKind::Offset, vec![n.into()])
    }

    // ── mutations ──

    /// Add assignments; makes this an update.
    ///
    /// Accepts a row (`{column: value}`) or a template/raw assignment list.
    pub fn set(&self, assignments: impl Into<Arg>) -> Self {
        self.push(ClauseKind::Set, vec![assignments.into()])
    }

    /// Insert one row given as a mapping; makes this an insert.
    pub fn insert(&self, row: impl Into<Arg>) -> Self {
        self.push(ClauseKind::InsertValues, vec![row_arg(row.into())])
    }

    /// Insert several rows given as mappings.
    pub fn insert_rows<I, T>(&self, rows: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Arg>,
    {
        self.push(
            ClauseKind::InsertValues,
            rows.into_iter().map(|r| row_arg(r.into())).collect(),
        )
    }

    /// Declare insert columns for the following [`Query::values`] calls.
    pub fn columns<I, T>(&self, columns: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Expr>,
    {
        self.push(ClauseKind::InsertColumns, exprs(columns))
    }

    /// Append one positional value row; see [`crate::args!`].
    pub fn values(&self, row: Vec<Arg>) -> Self {
        self.push(ClauseKind::InsertValues, row)
    }

    /// Make this a delete.
    pub fn delete(&self) -> Self {
        self.push(ClauseKind::Delete, Vec::new())
    }

    /// Append a hand-written statement part; parts are joined by a space.
    pub fn manual(&self, part: impl Into<Expr>) -> Self {
        self.push(ClauseKind::Manual, vec![part.into().into_arg()])
    }

    // ── compile ──

    /// The statement kind this log compiles to.
    pub fn kind(&self) -> SqlResult<StatementKind> {
        let calls = self.log.calls();
        context::reduce(&calls).map(|ctx| ctx.kind)
    }

    fn fragments(&self) -> SqlResult<(StatementKind, Vec<Fragment>)> {
        let calls = self.log.calls();
        let ctx = context::reduce(&calls)?;
        let fragments = assemble::generate(&ctx, &self.config)?;
        Ok((ctx.kind, fragments))
    }

    /// Compile into text with `$n` placeholders and the matching arguments.
    ///
    /// Compiling the same builder twice yields identical statements.
    pub fn compile(&self) -> SqlResult<Statement> {
        match self.fragments() {
            Ok((kind, fragments)) => {
                let stmt = assemble::assemble(fragments);
                trace::compiled(kind, &stmt.text, stmt.args.len(), self.config.max_logged_sql);
                Ok(stmt)
            }
            Err(err) => {
                trace::compile_failed(&err);
                Err(err)
            }
        }
    }

    /// Compile as a nested fragment, left unnumbered for the parent statement.
    pub(crate) fn to_fragment(&self) -> SqlResult<Fragment> {
        self.fragments().map(|(_, fragments)| assemble::concat(fragments))
    }
}

fn exprs<I, T>(items: I) -> Vec<Arg>
where
    I: IntoIterator<Item = T>,
    T: Into<Expr>,
{
    items.into_iter().map(|e| e.into().into_arg()).collect()
}

fn directed(expr: impl Into<Expr>, direction: &str) -> Arg {
    Arg::Template(Template::from_parts(
        vec![String::new(), direction.to_string()],
        vec![expr.into().into_arg()],
    ))
}

/// Rows are stored as records so JSON values in positional rows stay values.
fn row_arg(arg: Arg) -> Arg {
    match arg {
        Arg::Value(crate::value::Value::Json(serde_json::Value::Object(map))) => {
            Arg::Record(crate::record::Record::from(map))
        }
        other => other,
    }
}
