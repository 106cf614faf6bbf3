//! Text/argument fragments and compiled statements.
//!
//! A [`Fragment`] stores SQL text pieces and parameter slots separately, the same
//! way a clause is built: no placeholder number is ever written while a fragment is
//! being composed. Numbers are assigned once, when fragments are assembled into a
//! [`Statement`], so fragments built independently can be concatenated freely.

use crate::error::{SqlError, SqlResult};
use crate::value::Value;
use serde::Serialize;
use std::fmt::Write;
use tokio_postgres::types::ToSql;

#[derive(Debug, Clone, PartialEq)]
enum Part {
    Text(String),
    Param,
}

/// A clause's compiled text plus its locally ordered parameter list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fragment {
    parts: Vec<Part>,
    args: Vec<Value>,
}

impl Fragment {
    /// Create an empty fragment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a fragment holding literal SQL text.
    pub fn from_sql(sql: impl Into<String>) -> Self {
        let mut f = Self::new();
        f.push(&sql.into());
        f
    }

    /// Create a fragment holding a single placeholder.
    pub fn param(value: Value) -> Self {
        let mut f = Self::new();
        f.push_bind(value);
        f
    }

    /// Append literal SQL text.
    pub fn push(&mut self, sql: &str) -> &mut Self {
        if sql.is_empty() {
            return self;
        }
        match self.parts.last_mut() {
            Some(Part::Text(last)) => last.push_str(sql),
            _ => self.parts.push(Part::Text(sql.to_string())),
        }
        self
    }

    /// Append a placeholder and bind its value.
    pub fn push_bind(&mut self, value: Value) -> &mut Self {
        self.parts.push(Part::Param);
        self.args.push(value);
        self
    }

    /// Append another fragment, consuming it.
    pub fn push_fragment(&mut self, other: Fragment) -> &mut Self {
        for part in other.parts {
            match part {
                Part::Text(s) => {
                    self.push(&s);
                }
                Part::Param => self.parts.push(Part::Param),
            }
        }
        self.args.extend(other.args);
        self
    }

    /// Wrap the fragment in parentheses.
    pub fn parenthesized(self) -> Self {
        let mut f = Fragment::from_sql("(");
        f.push_fragment(self);
        f.push(")");
        f
    }

    /// Join fragments with a separator, skipping empty ones.
    pub fn join(fragments: impl IntoIterator<Item = Fragment>, sep: &str) -> Self {
        let mut out = Fragment::new();
        let mut first = true;
        for f in fragments {
            if f.is_empty() {
                continue;
            }
            if !first {
                out.push(sep);
            }
            out.push_fragment(f);
            first = false;
        }
        out
    }

    /// Whether the fragment has no text and no placeholder.
    pub fn is_empty(&self) -> bool {
        self.parts.iter().all(|p| matches!(p, Part::Text(s) if s.is_empty()))
    }

    /// Parameters in emission order.
    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// Render with placeholders numbered from `$1`, local to this fragment.
    pub fn to_sql(&self) -> String {
        let mut out = String::new();
        let mut next = 1;
        self.write_numbered(&mut out, &mut next);
        out
    }

    /// Write the text, numbering placeholders from `*next` onwards.
    pub(crate) fn write_numbered(&self, out: &mut String, next: &mut usize) {
        for part in &self.parts {
            match part {
                Part::Text(s) => out.push_str(s),
                Part::Param => {
                    let _ = write!(out, "${}", next);
                    *next += 1;
                }
            }
        }
    }

    pub(crate) fn into_args(self) -> Vec<Value> {
        self.args
    }

    /// Re-read an already numbered statement into a fragment.
    ///
    /// Every `$n` becomes a fresh placeholder bound to `args[n - 1]`, so the text can
    /// be spliced into another statement and renumbered there. A `$` that continues
    /// an identifier (`my_var$1`) is left alone, and so is anything inside string
    /// literals, quoted identifiers, dollar-quoted bodies and comments.
    pub fn from_statement(stmt: &Statement) -> SqlResult<Self> {
        let sql = stmt.text.as_str();
        let bytes = sql.as_bytes();
        let mut f = Fragment::new();
        let mut start = 0;
        let mut i = 0;

        while i < bytes.len() {
            match bytes[i] {
                b'\'' => i = skip_quoted(bytes, i, b'\'', backslash_escapes(bytes, i)),
                b'"' => i = skip_quoted(bytes, i, b'"', false),
                b'-' if bytes.get(i + 1) == Some(&b'-') => i = skip_line_comment(bytes, i),
                b'/' if bytes.get(i + 1) == Some(&b'*') => i = skip_block_comment(bytes, i),
                b'$' if i > 0 && is_ident_byte(bytes[i - 1]) => i += 1,
                b'$' => {
                    let digits = bytes[i + 1..].iter().take_while(|b| b.is_ascii_digit()).count();
                    if digits == 0 {
                        i = dollar_quoted_end(sql, i).unwrap_or(i + 1);
                        continue;
                    }
                    let n: usize = sql[i + 1..i + 1 + digits]
                        .parse()
                        .map_err(|_| SqlError::arity(format!("invalid placeholder {}", &sql[i..i + 1 + digits])))?;
                    let value = n
                        .checked_sub(1)
                        .and_then(|idx| stmt.args.get(idx))
                        .ok_or_else(|| {
                            SqlError::arity(format!(
                                "placeholder ${n} has no argument ({} supplied)",
                                stmt.args.len()
                            ))
                        })?;
                    f.push(&sql[start..i]);
                    f.push_bind(value.clone());
                    i += 1 + digits;
                    start = i;
                }
                _ => i += 1,
            }
        }
        f.push(&sql[start..]);
        Ok(f)
    }
}

fn is_ident_byte(b: u8) -> bool {
    b == b'_' || b == b'$' || b.is_ascii_alphanumeric() || !b.is_ascii()
}

/// `E'...'` strings treat a backslash as an escape.
fn backslash_escapes(bytes: &[u8], quote: usize) -> bool {
    quote > 0
        && matches!(bytes[quote - 1], b'E' | b'e')
        && (quote < 2 || !is_ident_byte(bytes[quote - 2]))
}

/// Index just past the quoted section opened at `open`; a doubled quote is literal.
fn skip_quoted(bytes: &[u8], open: usize, quote: u8, backslash: bool) -> usize {
    let mut j = open + 1;
    while j < bytes.len() {
        if backslash && bytes[j] == b'\\' {
            j += 2;
            continue;
        }
        if bytes[j] == quote {
            if bytes.get(j + 1) == Some(&quote) {
                j += 2;
                continue;
            }
            return j + 1;
        }
        j += 1;
    }
    bytes.len()
}

fn skip_line_comment(bytes: &[u8], open: usize) -> usize {
    bytes[open..]
        .iter()
        .position(|&b| b == b'\n')
        .map_or(bytes.len(), |p| open + p + 1)
}

/// Block comments nest.
fn skip_block_comment(bytes: &[u8], open: usize) -> usize {
    let mut depth = 0usize;
    let mut j = open;
    while j + 1 < bytes.len() {
        match (bytes[j], bytes[j + 1]) {
            (b'/', b'*') => {
                depth += 1;
                j += 2;
            }
            (b'*', b'/') => {
                depth -= 1;
                j += 2;
                if depth == 0 {
                    return j;
                }
            }
            _ => j += 1,
        }
    }
    bytes.len()
}

/// If `$tag$` opens a dollar-quoted body at `open`, the index just past its closing tag.
fn dollar_quoted_end(sql: &str, open: usize) -> Option<usize> {
    let rest = &sql.as_bytes()[open + 1..];
    let tag_len = match rest.first() {
        Some(b'$') => 0,
        Some(&b) if b == b'_' || b.is_ascii_alphabetic() => rest
            .iter()
            .take_while(|&&b| b == b'_' || b.is_ascii_alphanumeric())
            .count(),
        _ => return None,
    };
    if rest.get(tag_len) != Some(&b'$') {
        return None;
    }
    let body = open + tag_len + 2;
    let tag = &sql[open..body];
    Some(sql[body..].find(tag).map_or(sql.len(), |p| body + p + tag.len()))
}

/// A compiled, parameterized statement.
///
/// Owned by the caller once returned; `text` uses `$1, $2, ...` in the same order
/// as `args`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statement {
    pub text: String,
    pub args: Vec<Value>,
}

impl Statement {
    /// Create a statement from pre-numbered SQL text and its arguments.
    pub fn new(text: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            text: text.into(),
            args,
        }
    }

    /// Parameter refs compatible with `tokio-postgres`.
    pub fn params_ref(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.args.iter().map(|v| v as &(dyn ToSql + Sync)).collect()
    }
}

impl std::fmt::Display for Statement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}
