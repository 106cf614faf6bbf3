//! SQL identifier validation.
//!
//! Keys that reach SQL text without being parameterized (object-shorthand columns,
//! row aliases, CTE names) go through [`Ident`] first, so a dynamic key taken from
//! user input can never smuggle SQL into a statement.
//!
//! - Unquoted segments must match `[A-Za-z_][A-Za-z0-9_$]*`
//! - Quoted segments allow anything except NUL, with `""` as an escaped quote
//! - Segments are joined with `.` (`schema.table.column`)

use crate::error::{SqlError, SqlResult};

/// One `.`-separated segment of an identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Bare(String),
    Quoted(String),
}

/// A validated, possibly dotted, SQL identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    segments: Vec<Segment>,
}

impl Ident {
    /// Parse an identifier such as `users`, `public.users` or `public."UserTable".id`.
    pub fn parse(s: &str) -> SqlResult<Self> {
        if s.is_empty() {
            return Err(SqlError::validation("identifier cannot be empty"));
        }
        if s.contains('\0') {
            return Err(SqlError::validation("identifier cannot contain NUL character"));
        }

        let mut segments = Vec::new();
        let mut chars = s.chars().peekable();
        loop {
            let segment = if chars.peek() == Some(&'"') {
                chars.next();
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some('"') if chars.peek() == Some(&'"') => {
                            chars.next();
                            name.push('"');
                        }
                        Some('"') => break,
                        Some(c) => name.push(c),
                        None => {
                            return Err(SqlError::validation(format!(
                                "unclosed quoted identifier in '{s}'"
                            )));
                        }
                    }
                }
                if name.is_empty() {
                    return Err(SqlError::validation("empty quoted identifier"));
                }
                Segment::Quoted(name)
            } else {
                let mut name = String::new();
                while let Some(&c) = chars.peek() {
                    if c == '.' {
                        break;
                    }
                    let ok = if name.is_empty() {
                        c == '_' || c.is_ascii_alphabetic()
                    } else {
                        c == '_' || c == '$' || c.is_ascii_alphanumeric()
                    };
                    if !ok {
                        return Err(SqlError::validation(format!(
                            "invalid character '{c}' in identifier '{s}'"
                        )));
                    }
                    name.push(c);
                    chars.next();
                }
                if name.is_empty() {
                    return Err(SqlError::validation(format!(
                        "empty identifier segment in '{s}'"
                    )));
                }
                Segment::Bare(name)
            };
            segments.push(segment);

            match chars.next() {
                None => break,
                Some('.') if chars.peek().is_some() => continue,
                Some('.') => {
                    return Err(SqlError::validation(format!("trailing '.' in identifier '{s}'")));
                }
                Some(c) => {
                    return Err(SqlError::validation(format!(
                        "expected '.' between identifier segments of '{s}', got '{c}'"
                    )));
                }
            }
        }

        Ok(Self { segments })
    }

    /// Segments of the identifier, outermost first.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Render the identifier as SQL.
    pub fn to_sql(&self) -> String {
        let mut out = String::new();
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                out.push('.');
            }
            match segment {
                Segment::Bare(name) => out.push_str(name),
                Segment::Quoted(name) => {
                    out.push('"');
                    out.push_str(&name.replace('"', "\"\""));
                    out.push('"');
                }
            }
        }
        out
    }
}

/// Validate `s` as an identifier and return its canonical SQL form.
pub(crate) fn checked(s: &str) -> SqlResult<String> {
    Ident::parse(s).map(|ident| ident.to_sql())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ident_simple_and_dotted() {
        assert_eq!(Ident::parse("users").unwrap().to_sql(), "users");
        assert_eq!(Ident::parse("public.users").unwrap().to_sql(), "public.users");
        assert_eq!(Ident::parse("s.t.c").unwrap().segments().len(), 3);
    }

    #[test]
    fn ident_quoted_with_escape() {
        let ident = Ident::parse(r#""has""quote""#).unwrap();
        assert_eq!(ident.segments(), &[Segment::Quoted("has\"quote".to_string())]);
        assert_eq!(ident.to_sql(), r#""has""quote""#);
    }

    #[test]
    fn ident_mixed_quoted_unquoted() {
        let ident = Ident::parse(r#"public."UserTable".id"#).unwrap();
        assert_eq!(ident.to_sql(), r#"public."UserTable".id"#);
    }

    #[test]
    fn ident_with_dollar() {
        assert_eq!(checked("my_var$1").unwrap(), "my_var$1");
    }

    #[test]
    fn ident_rejects_injection_attempts() {
        assert!(Ident::parse("").is_err());
        assert!(Ident::parse("1table").is_err());
        assert!(Ident::parse("my table").is_err());
        assert!(Ident::parse("a = 1; drop table users; --").is_err());
        assert!(Ident::parse("schema..table").is_err());
        assert!(Ident::parse("schema.").is_err());
        assert!(Ident::parse(r#""unclosed"#).is_err());
        assert!(Ident::parse(r#""a"b"#).is_err());
    }
}
