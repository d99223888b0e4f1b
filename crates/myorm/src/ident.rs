//! MySQL identifier quoting.
//!
//! [`escape_id`] turns a table/column reference into backtick-quoted SQL:
//!
//! - `users` becomes `` `users` ``
//! - `app.users` becomes `` `app`.`users` `` (each segment quoted on its own)
//! - `t1.*` becomes `` `t1`.* `` (the wildcard stays outside the quotes)
//! - embedded backticks are doubled: ``a`b`` becomes ``` `a``b` ```
//!
//! [`Ident`] is the parsed form, used when a quoted reference has to be read
//! back (e.g. a column name coming from configuration).

use crate::error::{OrmError, OrmResult};

const QUOTE: char = '`';

/// Quote a table or column reference for MySQL.
///
/// This never fails: any input is turned into a syntactically valid quoted
/// identifier, so it is safe to call on untrusted names.
pub fn escape_id(id: &str) -> String {
    let mut out = String::with_capacity(id.len() + 4);
    write_escaped_id(id, &mut out);
    out
}

pub(crate) fn write_escaped_id(id: &str, out: &mut String) {
    // Each prefix segment is quoted on its own: `a.b.*` -> `a`.`b`.*
    // node-orm2's MySQL driver quotes the prefix as one name: `a.b`.*
    if let Some(prefix) = id.strip_suffix(".*").filter(|p| !p.is_empty()) {
        write_segments(prefix, out);
        out.push_str(".*");
        return;
    }
    write_segments(id, out);
}

fn write_segments(id: &str, out: &mut String) {
    for (i, segment) in id.split('.').enumerate() {
        if i > 0 {
            out.push('.');
        }
        write_quoted(segment, out);
    }
}

fn write_quoted(segment: &str, out: &mut String) {
    out.push(QUOTE);
    for ch in segment.chars() {
        if ch == QUOTE {
            out.push(QUOTE);
        }
        out.push(ch);
    }
    out.push(QUOTE);
}

/// A part of a MySQL identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentPart {
    /// Unquoted identifier: `[A-Za-z0-9_$]+`, not purely numeric.
    Unquoted(String),
    /// Backtick-quoted identifier: any characters except NUL.
    Quoted(String),
}

impl IdentPart {
    /// The identifier text with quoting removed.
    pub fn name(&self) -> &str {
        match self {
            IdentPart::Unquoted(s) | IdentPart::Quoted(s) => s,
        }
    }
}

/// A parsed MySQL identifier (`db.table.column`, optionally ending in `.*`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    pub parts: Vec<IdentPart>,
    /// Whether the reference ends in a `.*` wildcard.
    pub wildcard: bool,
}

impl Ident {
    /// Parse an identifier, accepting both plain and backtick-quoted segments.
    ///
    /// - Dotted: `app.users.id`
    /// - Quoted: `` `Order Items`.`unit``price` ``
    /// - Wildcard: `` `t1`.* ``
    pub fn parse(s: &str) -> OrmResult<Self> {
        if s.is_empty() {
            return Err(OrmError::validation("Identifier cannot be empty"));
        }
        if s.contains('\0') {
            return Err(OrmError::validation(
                "Identifier cannot contain NUL character",
            ));
        }

        let mut parts = Vec::new();
        let mut wildcard = false;
        let mut chars = s.chars().peekable();

        while chars.peek().is_some() {
            if !parts.is_empty() {
                match chars.next() {
                    Some('.') => {
                        if chars.peek().is_none() {
                            return Err(OrmError::validation("Trailing '.' in identifier"));
                        }
                        if chars.peek() == Some(&'*') {
                            chars.next();
                            if chars.peek().is_some() {
                                return Err(OrmError::validation(
                                    "Wildcard must be the last identifier part",
                                ));
                            }
                            wildcard = true;
                            break;
                        }
                    }
                    Some(c) => {
                        return Err(OrmError::validation(format!(
                            "Expected '.' between identifier parts, got '{c}'"
                        )));
                    }
                    None => break,
                }
            }

            if chars.peek() == Some(&QUOTE) {
                chars.next();
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some(QUOTE) => {
                            if chars.peek() == Some(&QUOTE) {
                                chars.next();
                                name.push(QUOTE);
                            } else {
                                break;
                            }
                        }
                        Some(c) => name.push(c),
                        None => return Err(OrmError::validation("Unclosed quoted identifier")),
                    }
                }
                parts.push(IdentPart::Quoted(name));
                continue;
            }

            let mut name = String::new();
            while let Some(&c) = chars.peek() {
                if c == '.' {
                    break;
                }
                if c == '_' || c == '$' || c.is_ascii_alphanumeric() {
                    name.push(c);
                    chars.next();
                } else {
                    return Err(OrmError::validation(format!(
                        "Invalid character in identifier: '{c}'"
                    )));
                }
            }
            if name.is_empty() {
                return Err(OrmError::validation("Empty identifier segment"));
            }
            if name.chars().all(|c| c.is_ascii_digit()) {
                return Err(OrmError::validation(format!(
                    "Identifier cannot be purely numeric: '{name}'"
                )));
            }
            parts.push(IdentPart::Unquoted(name));
        }

        if parts.is_empty() {
            return Err(OrmError::validation("Empty identifier"));
        }

        Ok(Self { parts, wildcard })
    }

    /// Render the identifier with every segment quoted.
    pub fn to_sql(&self) -> String {
        let mut out = String::new();
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                out.push('.');
            }
            write_quoted(part.name(), &mut out);
        }
        if self.wildcard {
            out.push_str(".*");
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_simple() {
        assert_eq!(escape_id("users"), "`users`");
    }

    #[test]
    fn escape_dotted_quotes_each_segment() {
        assert_eq!(escape_id("app.users"), "`app`.`users`");
        assert_eq!(escape_id("app.users.id"), "`app`.`users`.`id`");
    }

    #[test]
    fn escape_wildcard_suffix() {
        assert_eq!(escape_id("t1.*"), "`t1`.*");
        assert_eq!(escape_id("app.users.*"), "`app`.`users`.*");
    }

    #[test]
    fn escape_doubles_backticks() {
        assert_eq!(escape_id("a`b"), "`a``b`");
        assert_eq!(escape_id("``"), "``````");
        assert_eq!(escape_id("we`ird.*"), "`we``ird`.*");
    }

    #[test]
    fn escape_bare_wildcard_is_quoted() {
        assert_eq!(escape_id(".*"), "``.`*`");
    }

    #[test]
    fn escaped_names_parse_back_as_one_identifier() {
        for name in ["users", "a`b", "``x``", "with space", "semi;colon", "über"] {
            let ident = Ident::parse(&escape_id(name)).unwrap();
            assert_eq!(ident.parts, vec![IdentPart::Quoted(name.to_string())]);
            assert!(!ident.wildcard);
        }
    }

    #[test]
    fn parse_mixed_and_wildcard() {
        let ident = Ident::parse("app.`Order Items`.*").unwrap();
        assert_eq!(
            ident.parts,
            vec![
                IdentPart::Unquoted("app".into()),
                IdentPart::Quoted("Order Items".into())
            ]
        );
        assert!(ident.wildcard);
        assert_eq!(ident.to_sql(), "`app`.`Order Items`.*");
    }

    #[test]
    fn parse_rejects_bad_input() {
        assert!(Ident::parse("").is_err());
        assert!(Ident::parse("my table").is_err());
        assert!(Ident::parse("a..b").is_err());
        assert!(Ident::parse("a.").is_err());
        assert!(Ident::parse("`unclosed").is_err());
        assert!(Ident::parse("123").is_err());
        assert!(Ident::parse("a.*.b").is_err());
    }
}
