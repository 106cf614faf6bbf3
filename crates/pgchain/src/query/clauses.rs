//! Clause generators.
//!
//! Each generator reads the reduced [`Context`] and returns the clause's
//! fragment, or `None` when the clause contributes nothing.

use super::context::Context;
use super::log::{ClauseKind, JoinKind, MethodCall, StatementKind};
use crate::arg::Arg;
use crate::condition::{self, Condition};
use crate::config::Config;
use crate::error::{SqlError, SqlResult};
use crate::fragment::Fragment;
use crate::ident;
use crate::record::Record;
use crate::value::Value;

pub(crate) type Generator = fn(&Context<'_>, &Config) -> SqlResult<Option<Fragment>>;

fn prefixed(keyword: &str, body: Fragment) -> Fragment {
    let mut f = Fragment::from_sql(keyword);
    f.push(" ");
    f.push_fragment(body);
    f
}

/// An aliasable source: plain text inside a row is an identifier, anything else
/// compiles as an operand.
fn source_expr(arg: &Arg, config: &Config) -> SqlResult<Fragment> {
    match arg {
        Arg::Value(Value::Text(name)) => Ok(Fragment::from_sql(ident::checked(name)?)),
        other => other.to_fragment(config),
    }
}

/// `expr as alias` for every entry of a row.
fn aliased(record: &Record, config: &Config) -> SqlResult<Fragment> {
    let mut items = Vec::with_capacity(record.len());
    for (alias, value) in record.iter() {
        let alias = ident::checked(alias)?;
        let mut f = source_expr(value, config)?;
        f.push(" as ");
        f.push(&alias);
        items.push(f);
    }
    Ok(Fragment::join(items, ", "))
}

/// A list item in `select`, `returning` and `from` positions.
fn list_item(arg: &Arg, config: &Config) -> SqlResult<Fragment> {
    match arg.as_record()? {
        Some(record) => aliased(&record, config),
        None => arg.to_fragment(config),
    }
}

fn list<'a>(args: impl IntoIterator<Item = &'a Arg>, config: &Config) -> SqlResult<Fragment> {
    let mut items = Vec::new();
    for arg in args {
        items.push(list_item(arg, config)?);
    }
    Ok(Fragment::join(items, ", "))
}

fn all_args<'a>(calls: &[&'a MethodCall]) -> impl Iterator<Item = &'a Arg> {
    calls.iter().flat_map(|c| c.args.iter())
}

fn conditions(calls: &[&MethodCall], config: &Config) -> SqlResult<Option<Condition>> {
    let mut out = Vec::with_capacity(calls.len());
    for call in calls {
        if let Some(cond) = condition::resolve_call(&call.args, config)? {
            out.push(cond);
        }
    }
    Ok(Condition::conjoin_all(out))
}

// ── with ──

pub(crate) fn with(ctx: &Context<'_>, config: &Config) -> SqlResult<Option<Fragment>> {
    if ctx.with.is_empty() {
        return Ok(None);
    }
    let mut items = Vec::new();
    for call in &ctx.with {
        match call.args.as_slice() {
            [Arg::Raw(alias), body] => items.push(cte(alias.as_str(), body, config)?),
            [row] => match row.as_record()? {
                Some(record) => {
                    for (alias, body) in record.iter() {
                        items.push(cte(alias, body, config)?);
                    }
                }
                None => return Err(SqlError::validation("with expects an alias and a sub-query")),
            },
            _ => return Err(SqlError::validation("with expects an alias and a sub-query")),
        }
    }
    Ok(Some(prefixed("with", Fragment::join(items, ", "))))
}

fn cte(alias: &str, body: &Arg, config: &Config) -> SqlResult<Fragment> {
    let mut f = Fragment::from_sql(ident::checked(alias)?);
    f.push(" as ");
    f.push_fragment(body.to_body(config)?.parenthesized());
    Ok(f)
}

// ── select / returning ──

pub(crate) fn select(ctx: &Context<'_>, config: &Config) -> SqlResult<Option<Fragment>> {
    let cols = list(all_args(&ctx.ret), config)?;
    if cols.is_empty() {
        return Ok(Some(Fragment::from_sql("select *")));
    }
    Ok(Some(prefixed("select", cols)))
}

pub(crate) fn returning(ctx: &Context<'_>, config: &Config) -> SqlResult<Option<Fragment>> {
    let cols = list(all_args(&ctx.ret), config)?;
    Ok((!cols.is_empty()).then(|| prefixed("returning", cols)))
}

// ── from / joins ──

enum Source<'a> {
    Table(&'a Arg),
    Join(JoinKind, &'a [Arg]),
}

fn sources<'a>(ctx: &Context<'a>) -> Vec<Source<'a>> {
    let mut out = Vec::new();
    for &call in &ctx.from {
        match call.kind {
            ClauseKind::Join(kind) => out.push(Source::Join(kind, &call.args)),
            _ => out.extend(call.args.iter().map(Source::Table)),
        }
    }
    out
}

/// The first source, which must be a table rather than a join.
fn split_target<'s, 'a>(items: &'s [Source<'a>]) -> SqlResult<(&'a Arg, &'s [Source<'a>])> {
    match items.split_first() {
        Some((Source::Table(target), rest)) => Ok((*target, rest)),
        Some((Source::Join(..), _)) => Err(SqlError::validation("join has no preceding from")),
        None => Err(SqlError::validation("statement has no target table")),
    }
}

fn render_sources(items: &[Source<'_>], config: &Config) -> SqlResult<Option<Fragment>> {
    let mut f = Fragment::new();
    for item in items {
        match item {
            Source::Table(arg) => {
                if !f.is_empty() {
                    f.push(", ");
                }
                f.push_fragment(list_item(arg, config)?);
            }
            Source::Join(kind, args) => {
                if f.is_empty() {
                    return Err(SqlError::validation("join has no preceding from"));
                }
                f.push_fragment(join_clause(*kind, args, config)?);
            }
        }
    }
    Ok((!f.is_empty()).then_some(f))
}

fn join_clause(kind: JoinKind, args: &[Arg], config: &Config) -> SqlResult<Fragment> {
    let (target, on) = args
        .split_first()
        .ok_or_else(|| SqlError::validation("join requires a target"))?;
    let mut f = Fragment::from_sql(" ");
    f.push(kind.keyword());
    f.push(" ");
    f.push_fragment(list_item(target, config)?);

    let cond = condition::resolve_call(on, config)?;
    match (kind, cond) {
        (JoinKind::Cross, None) => {}
        (JoinKind::Cross, Some(_)) => {
            return Err(SqlError::validation("cross join does not take an on condition"));
        }
        (_, Some(cond)) => {
            f.push(" on ");
            f.push_fragment(cond.render());
        }
        (_, None) => return Err(SqlError::validation("join requires an on condition")),
    }
    Ok(f)
}

pub(crate) fn from(ctx: &Context<'_>, config: &Config) -> SqlResult<Option<Fragment>> {
    let items = sources(ctx);
    match ctx.kind {
        StatementKind::Select => Ok(render_sources(&items, config)?.map(|f| prefixed("from", f))),
        StatementKind::Update => {
            let (_, rest) = split_target(&items)?;
            Ok(render_sources(rest, config)?.map(|f| prefixed("from", f)))
        }
        StatementKind::Delete => {
            let (target, rest) = split_target(&items)?;
            let mut f = prefixed("from", list_item(target, config)?);
            if let Some(using) = render_sources(rest, config)? {
                f.push(" ");
                f.push_fragment(prefixed("using", using));
            }
            Ok(Some(f))
        }
        StatementKind::Insert | StatementKind::Manual => Ok(None),
    }
}

// ── where / group by / having / order by / limit / offset ──

pub(crate) fn filter(ctx: &Context<'_>, config: &Config) -> SqlResult<Option<Fragment>> {
    Ok(conditions(&ctx.filter, config)?.map(|c| prefixed("where", c.render())))
}

pub(crate) fn group_by(ctx: &Context<'_>, config: &Config) -> SqlResult<Option<Fragment>> {
    let cols = list(all_args(&ctx.group), config)?;
    Ok((!cols.is_empty()).then(|| prefixed("group by", cols)))
}

pub(crate) fn having(ctx: &Context<'_>, config: &Config) -> SqlResult<Option<Fragment>> {
    Ok(conditions(&ctx.having, config)?.map(|c| prefixed("having", c.render())))
}

pub(crate) fn order_by(ctx: &Context<'_>, config: &Config) -> SqlResult<Option<Fragment>> {
    let cols = list(all_args(&ctx.order), config)?;
    Ok((!cols.is_empty()).then(|| prefixed("order by", cols)))
}

fn last_value(calls: &[&MethodCall], keyword: &str, config: &Config) -> SqlResult<Option<Fragment>> {
    match calls.last().and_then(|c| c.args.first()) {
        Some(arg) => Ok(Some(prefixed(keyword, arg.to_fragment(config)?))),
        None => Ok(None),
    }
}

pub(crate) fn limit(ctx: &Context<'_>, config: &Config) -> SqlResult<Option<Fragment>> {
    last_value(&ctx.limit, "limit", config)
}

pub(crate) fn offset(ctx: &Context<'_>, config: &Config) -> SqlResult<Option<Fragment>> {
    last_value(&ctx.offset, "offset", config)
}

// ── update ──

pub(crate) fn update(ctx: &Context<'_>, config: &Config) -> SqlResult<Option<Fragment>> {
    let items = sources(ctx);
    let (target, _) = split_target(&items)?;

    let mut assignments = Vec::new();
    for arg in all_args(&ctx.set) {
        match arg.as_record()? {
            Some(record) => {
                for (key, value) in record.iter() {
                    let column = ident::checked(&config.input_key(key))?;
                    let mut f = Fragment::from_sql(format!("{column} = "));
                    f.push_fragment(value.to_fragment(config)?);
                    assignments.push(f);
                }
            }
            None => assignments.push(arg.to_body(config)?),
        }
    }
    let assignments = Fragment::join(assignments, ", ");
    if assignments.is_empty() {
        return Err(SqlError::validation("update requires at least one assignment"));
    }

    let mut f = prefixed("update", list_item(target, config)?);
    f.push(" ");
    f.push_fragment(prefixed("set", assignments));
    Ok(Some(f))
}

// ── insert ──

pub(crate) fn insert(ctx: &Context<'_>, config: &Config) -> SqlResult<Option<Fragment>> {
    let items = sources(ctx);
    let (target, rest) = split_target(&items)?;
    if !rest.is_empty() {
        return Err(SqlError::validation("insert accepts a single target table"));
    }
    let mut f = prefixed("insert into", list_item(target, config)?);
    f.push(" ");
    f.push_fragment(insert_body(ctx, config)?);
    Ok(Some(f))
}

#[derive(PartialEq)]
enum RowForm {
    Records,
    Positional,
}

fn row_form(args: &[Arg]) -> SqlResult<RowForm> {
    let records = args.iter().filter(|a| matches!(a, Arg::Record(_))).count();
    if records == args.len() {
        Ok(RowForm::Records)
    } else if records == 0 {
        Ok(RowForm::Positional)
    } else {
        Err(SqlError::arity("rows and positional values cannot be mixed in one call"))
    }
}

fn insert_body(ctx: &Context<'_>, config: &Config) -> SqlResult<Fragment> {
    let mut forms = Vec::new();
    for call in ctx.insert.iter().filter(|c| c.kind == ClauseKind::InsertValues) {
        forms.push(row_form(&call.args)?);
    }
    let records = forms.iter().filter(|f| **f == RowForm::Records).count();
    if records == 0 {
        return positional_rows(ctx, config);
    }
    if records != forms.len() || ctx.columns_calls() > 0 {
        return Err(SqlError::arity(
            "rows cannot be combined with explicit columns or positional values",
        ));
    }
    record_rows(ctx, config)
}

/// Rows given as mappings: the column set is the union of keys in first-seen
/// order; a key missing from a row emits `default`.
fn record_rows(ctx: &Context<'_>, config: &Config) -> SqlResult<Fragment> {
    let mut columns: Vec<String> = Vec::new();
    let mut rows: Vec<Vec<(String, &Arg)>> = Vec::new();
    for call in ctx.insert.iter().filter(|c| c.kind == ClauseKind::InsertValues) {
        for arg in &call.args {
            let Arg::Record(record) = arg else { continue };
            let mut row = Vec::with_capacity(record.len());
            for (key, value) in record.iter() {
                let column = ident::checked(&config.input_key(key))?;
                if !columns.contains(&column) {
                    columns.push(column.clone());
                }
                row.push((column, value));
            }
            rows.push(row);
        }
    }

    if rows.is_empty() {
        return Err(SqlError::arity("insert has no rows"));
    }
    if columns.is_empty() {
        if rows.len() == 1 {
            return Ok(Fragment::from_sql("default values"));
        }
        return Err(SqlError::arity("several empty rows cannot be inserted"));
    }

    let mut tuples = Vec::with_capacity(rows.len());
    for row in &rows {
        let mut values = Vec::with_capacity(columns.len());
        for column in &columns {
            match row.iter().rev().find(|(c, _)| c == column) {
                Some((_, value)) => values.push(value.to_fragment(config)?),
                None => values.push(Fragment::from_sql("default")),
            }
        }
        tuples.push(Fragment::join(values, ", ").parenthesized());
    }

    let mut f = Fragment::from_sql(format!("({}) values ", columns.join(", ")));
    f.push_fragment(Fragment::join(tuples, ", "));
    Ok(f)
}

/// Rows given as positional values, each paired with the latest column call.
fn positional_rows(ctx: &Context<'_>, config: &Config) -> SqlResult<Fragment> {
    let mut header: Option<Fragment> = None;
    let mut width = 0;
    let mut tuples = Vec::new();

    for call in &ctx.insert {
        match call.kind {
            ClauseKind::InsertColumns => {
                let cols = list(call.args.iter(), config)?;
                if let Some(prev) = &header {
                    if *prev != cols || width != call.args.len() {
                        return Err(SqlError::arity("insert column lists differ between calls"));
                    }
                }
                width = call.args.len();
                header = Some(cols);
            }
            _ => {
                if header.is_none() {
                    return Err(SqlError::arity("values supplied before any columns"));
                }
                if call.args.len() != width {
                    return Err(SqlError::arity(format!(
                        "row has {} value(s) but {width} column(s) were declared",
                        call.args.len()
                    )));
                }
                let mut values = Vec::with_capacity(width);
                for arg in &call.args {
                    values.push(arg.to_fragment(config)?);
                }
                tuples.push(Fragment::join(values, ", ").parenthesized());
            }
        }
    }

    let header = header.ok_or_else(|| SqlError::arity("insert has no columns"))?;
    if tuples.is_empty() {
        return Err(SqlError::arity("insert has no rows"));
    }
    let mut f = header.parenthesized();
    f.push(" values ");
    f.push_fragment(Fragment::join(tuples, ", "));
    Ok(f)
}

// ── delete / manual ──

pub(crate) fn delete(_ctx: &Context<'_>, _config: &Config) -> SqlResult<Option<Fragment>> {
    Ok(Some(Fragment::from_sql("delete")))
}

pub(crate) fn manual(ctx: &Context<'_>, config: &Config) -> SqlResult<Option<Fragment>> {
    let mut parts = Vec::new();
    for arg in all_args(&ctx.manual) {
        parts.push(arg.to_body(config)?);
    }
    Ok(Some(Fragment::join(parts, " ")))
}
