//! Template fragments with `?` slots.
//!
//! A [`Template`] is SQL text split around its `?` slots plus one argument per
//! slot. Rendering escapes each argument: values become placeholders, raw text is
//! inlined, sub-queries are spliced in parentheses. `??` produces a literal `?`
//! (for operators such as jsonb `?`).

use crate::arg::Arg;
use crate::config::Config;
use crate::error::{SqlError, SqlResult};
use crate::fragment::Fragment;

/// SQL text parts interleaved with arguments.
#[derive(Debug, Clone)]
pub struct Template {
    parts: Vec<String>,
    args: Vec<Arg>,
}

/// Start a template from SQL text with `?` slots.
///
/// # Example
/// ```ignore
/// sq().from("book").filter(sql("year > ? and author_id = ?").bind(2000).bind(7))
/// ```
pub fn sql(text: &str) -> Template {
    Template::parse(text)
}

impl Template {
    /// Split `text` on `?` slots.
    pub fn parse(text: &str) -> Self {
        let mut parts = Vec::new();
        let mut current = String::new();
        let mut chars = text.chars().peekable();
        while let Some(ch) = chars.next() {
            if ch != '?' {
                current.push(ch);
            } else if chars.peek() == Some(&'?') {
                chars.next();
                current.push('?');
            } else {
                parts.push(std::mem::take(&mut current));
            }
        }
        parts.push(current);
        Self {
            parts,
            args: Vec::new(),
        }
    }

    /// Build from explicit text parts; `parts.len()` must be `args.len() + 1`.
    pub fn from_parts(parts: Vec<String>, args: Vec<Arg>) -> Self {
        Self { parts, args }
    }

    /// Bind the next slot.
    pub fn bind(mut self, value: impl Into<Arg>) -> Self {
        self.args.push(value.into());
        self
    }

    /// Bind several slots in order.
    pub fn bind_all<I, T>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Arg>,
    {
        self.args.extend(values.into_iter().map(Into::into));
        self
    }

    /// Number of `?` slots.
    pub fn slots(&self) -> usize {
        self.parts.len().saturating_sub(1)
    }

    /// Render into a fragment, escaping every bound argument.
    pub fn render(&self, config: &Config) -> SqlResult<Fragment> {
        if self.parts.len() != self.args.len() + 1 {
            return Err(SqlError::arity(format!(
                "template has {} slot(s) but {} argument(s) were bound",
                self.slots(),
                self.args.len()
            )));
        }
        let mut f = Fragment::new();
        for (i, part) in self.parts.iter().enumerate() {
            f.push(part);
            if let Some(arg) = self.args.get(i) {
                f.push_fragment(arg.to_fragment(config)?);
            }
        }
        Ok(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arg::raw;
    use crate::value::Value;

    #[test]
    fn binds_values_as_placeholders() {
        let f = sql("age > ? and name = ?")
            .bind(18)
            .bind("jo")
            .render(&Config::default())
            .unwrap();
        assert_eq!(f.to_sql(), "age > $1 and name = $2");
        assert_eq!(f.args(), &[Value::Int(18), Value::from("jo")]);
    }

    #[test]
    fn raw_args_are_inlined() {
        let f = sql("created_at < ?")
            .bind(raw("now()"))
            .render(&Config::default())
            .unwrap();
        assert_eq!(f.to_sql(), "created_at < now()");
        assert!(f.args().is_empty());
    }

    #[test]
    fn double_question_mark_is_literal() {
        let f = sql("data ?? ?").bind("key").render(&Config::default()).unwrap();
        assert_eq!(f.to_sql(), "data ? $1");
    }

    #[test]
    fn explicit_parts() {
        let t = Template::from_parts(
            vec!["id = ".to_string(), String::new()],
            vec![Arg::from(1)],
        );
        assert_eq!(t.render(&Config::default()).unwrap().to_sql(), "id = $1");
    }

    #[test]
    fn slot_count_must_match() {
        let err = sql("a = ? and b = ?").bind(1).render(&Config::default());
        assert!(matches!(err, Err(SqlError::ArityMismatch(_))));
    }
}
