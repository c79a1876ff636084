//! Tokenizes route pattern strings.

use thiserror::Error;

/// Characters which may appear in a static fragment of a pattern.
const FRAGMENT_CHARS: &[char] = &['.', '_', '~', '%', '@', '-'];

/// Sub-delimiters recognised by the pattern grammar when they do not open
/// a parameter.
const SUB_DELIMITERS: &[char] = &['+', ':', '\'', '!', ',', ';', '*'];

/// An error raised while scanning a pattern string.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PatternError {
    /// A character the grammar does not recognise at this position.
    #[error("unexpected character `{character}` at position {position} in `{pattern}`")]
    UnexpectedCharacter {
        /// The offending pattern.
        pattern: String,
        /// Byte offset of the character.
        position: usize,
        /// The character itself.
        character: char,
    },

    /// A `<` constraint opener with no matching `>`.
    #[error("unterminated constraint at position {position} in `{pattern}`")]
    UnterminatedConstraint {
        /// The offending pattern.
        pattern: String,
        /// Byte offset of the `<`.
        position: usize,
    },

    /// A query parameter marker with no name following it.
    #[error("missing query parameter name at position {position} in `{pattern}`")]
    MissingQueryName {
        /// The offending pattern.
        pattern: String,
        /// Byte offset of the `?` or `&`.
        position: usize,
    },

    /// A constraint whose body is not a valid regular expression.
    #[error("invalid constraint for `{name}`: {source_text}")]
    InvalidConstraint {
        /// The parameter carrying the constraint.
        name: String,
        /// The constraint body.
        source_text: String,
    },
}

/// One token of a route pattern.
///
/// Concatenating the [`literal`](Token::literal) forms of a token sequence
/// reproduces the pattern it was scanned from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Token {
    /// A `/` separating path parts.
    Delimiter,
    /// A sub-delimiter character matched verbatim.
    SubDelimiter(char),
    /// A run of static characters matched verbatim.
    Fragment(String),
    /// `:name`, optionally constrained (`:name<\d+>`) or optional
    /// (`:name?`).
    UrlParam {
        /// Parameter name.
        name: String,
        /// Constraint body, without the angle brackets.
        constraint: Option<String>,
        /// Whether the parameter may be absent.
        optional: bool,
    },
    /// `*name`, matching one or more path segments including slashes.
    Splat {
        /// Parameter name.
        name: String,
    },
    /// `;name`, appearing as `;name=value` in a URL.
    Matrix {
        /// Parameter name.
        name: String,
    },
    /// A query parameter declared after the first `?`.
    Query {
        /// Parameter name.
        name: String,
        /// The exact text scanned, including the `?`/`&` lead and any
        /// `=default` suffix.
        literal: String,
    },
}

impl Token {
    /// The exact pattern text this token was scanned from.
    pub fn literal(&self) -> String {
        match self {
            Token::Delimiter => "/".to_owned(),
            Token::SubDelimiter(c) => c.to_string(),
            Token::Fragment(s) => s.clone(),
            Token::UrlParam {
                name,
                constraint,
                optional,
            } => {
                let mut out = format!(":{}", name);
                if let Some(constraint) = constraint {
                    out.push('<');
                    out.push_str(constraint);
                    out.push('>');
                }
                if *optional {
                    out.push('?');
                }
                out
            }
            Token::Splat { name } => format!("*{}", name),
            Token::Matrix { name } => format!(";{}", name),
            Token::Query { literal, .. } => literal.clone(),
        }
    }

    /// The parameter name this token binds, if any.
    pub fn param_name(&self) -> Option<&str> {
        match self {
            Token::UrlParam { name, .. }
            | Token::Splat { name }
            | Token::Matrix { name }
            | Token::Query { name, .. } => Some(name),
            _ => None,
        }
    }

    /// True for tokens which belong to the query tail of a pattern.
    pub fn is_query(&self) -> bool {
        matches!(self, Token::Query { .. })
    }
}

/// Scans `pattern` left to right into tokens. At each position the first
/// matching rule wins: delimiter, query tail, parameter openers, bare
/// sub-delimiters, then static fragments.
pub(crate) fn tokenize(pattern: &str) -> Result<Vec<Token>, PatternError> {
    let chars: Vec<char> = pattern.chars().collect();
    let mut tokens = Vec::new();
    let mut pos = 0;
    let mut in_query = false;

    while pos < chars.len() {
        let c = chars[pos];

        if c == '?' || c == '&' {
            if c == '&' && !in_query {
                return Err(unexpected(pattern, pos, c));
            }
            if c == '?' && in_query {
                return Err(unexpected(pattern, pos, c));
            }
            let start = pos;
            pos += 1;
            let name = take_ident(&chars, &mut pos);
            if name.is_empty() {
                return Err(PatternError::MissingQueryName {
                    pattern: pattern.to_owned(),
                    position: start,
                });
            }
            // A bare `name=` declares an empty default.
            if pos < chars.len() && chars[pos] == '=' {
                pos += 1;
                while pos < chars.len() && chars[pos] != '&' {
                    pos += 1;
                }
            }
            let literal: String = chars[start..pos].iter().collect();
            tokens.push(Token::Query { name, literal });
            in_query = true;
            continue;
        }

        if in_query {
            return Err(unexpected(pattern, pos, c));
        }

        match c {
            '/' => {
                tokens.push(Token::Delimiter);
                pos += 1;
            }
            ':' => {
                let mut lookahead = pos + 1;
                let name = take_ident(&chars, &mut lookahead);
                if name.is_empty() {
                    tokens.push(Token::SubDelimiter(':'));
                    pos += 1;
                    continue;
                }
                pos = lookahead;
                let mut constraint = None;
                if pos < chars.len() && chars[pos] == '<' {
                    let open = pos;
                    let close = chars[pos + 1..]
                        .iter()
                        .position(|&c| c == '>')
                        .map(|i| pos + 1 + i);
                    match close {
                        Some(close) => {
                            constraint = Some(chars[pos + 1..close].iter().collect::<String>());
                            pos = close + 1;
                        }
                        None => {
                            return Err(PatternError::UnterminatedConstraint {
                                pattern: pattern.to_owned(),
                                position: open,
                            });
                        }
                    }
                }
                // `?` directly after a parameter marks it optional only
                // when it cannot open a query tail, i.e. at the end of the
                // pattern or before the next `/`.
                let mut optional = false;
                if pos < chars.len() && chars[pos] == '?' {
                    if chars.get(pos + 1).map_or(true, |&c| c == '/') {
                        optional = true;
                        pos += 1;
                    }
                }
                tokens.push(Token::UrlParam {
                    name,
                    constraint,
                    optional,
                });
            }
            '*' => {
                let mut lookahead = pos + 1;
                let name = take_ident(&chars, &mut lookahead);
                if name.is_empty() {
                    tokens.push(Token::SubDelimiter('*'));
                    pos += 1;
                } else {
                    pos = lookahead;
                    tokens.push(Token::Splat { name });
                }
            }
            ';' => {
                let mut lookahead = pos + 1;
                let name = take_ident(&chars, &mut lookahead);
                if name.is_empty() {
                    tokens.push(Token::SubDelimiter(';'));
                    pos += 1;
                } else {
                    pos = lookahead;
                    tokens.push(Token::Matrix { name });
                }
            }
            c if SUB_DELIMITERS.contains(&c) => {
                tokens.push(Token::SubDelimiter(c));
                pos += 1;
            }
            c if is_fragment_char(c) => {
                let start = pos;
                while pos < chars.len() && is_fragment_char(chars[pos]) {
                    pos += 1;
                }
                tokens.push(Token::Fragment(chars[start..pos].iter().collect()));
            }
            c => return Err(unexpected(pattern, pos, c)),
        }
    }

    Ok(tokens)
}

fn unexpected(pattern: &str, position: usize, character: char) -> PatternError {
    PatternError::UnexpectedCharacter {
        pattern: pattern.to_owned(),
        position,
        character,
    }
}

fn is_fragment_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || FRAGMENT_CHARS.contains(&c)
}

fn take_ident(chars: &[char], pos: &mut usize) -> String {
    let start = *pos;
    while *pos < chars.len()
        && (chars[*pos].is_ascii_alphanumeric() || chars[*pos] == '_' || chars[*pos] == '-')
    {
        *pos += 1;
    }
    chars[start..*pos].iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn literals(pattern: &str) -> String {
        tokenize(pattern)
            .unwrap()
            .iter()
            .map(Token::literal)
            .collect()
    }

    #[test]
    fn tokens_reproduce_the_pattern() {
        for pattern in &[
            "/",
            "/users",
            "/users/:id",
            "/users/:id<\\d+>/posts",
            "/files/*path",
            "/items;sort",
            "/search?q&page",
            "/a/:b?/c",
            "/call:fn",
        ] {
            assert_eq!(&literals(pattern), pattern);
        }
    }

    #[test]
    fn url_parameter_with_constraint() {
        let tokens = tokenize("/users/:id<\\d+>").unwrap();
        assert_eq!(
            tokens[3],
            Token::UrlParam {
                name: "id".to_owned(),
                constraint: Some("\\d+".to_owned()),
                optional: false,
            }
        );
    }

    #[test]
    fn optional_marker_only_before_slash_or_end() {
        let tokens = tokenize("/a/:b?/c").unwrap();
        assert!(matches!(
            tokens[3],
            Token::UrlParam { optional: true, .. }
        ));

        // `?q` opens the query tail instead.
        let tokens = tokenize("/a/:b?q").unwrap();
        assert!(matches!(
            tokens[3],
            Token::UrlParam {
                optional: false,
                ..
            }
        ));
        assert!(tokens[4].is_query());
    }

    #[test]
    fn bare_sub_delimiters_are_literals() {
        let tokens = tokenize("/a:/b").unwrap();
        assert_eq!(tokens[2], Token::SubDelimiter(':'));
    }

    #[test]
    fn query_tail_declares_names() {
        let tokens = tokenize("/search?q&page=1").unwrap();
        let names: Vec<_> = tokens
            .iter()
            .filter(|t| t.is_query())
            .filter_map(Token::param_name)
            .collect();
        assert_eq!(names, vec!["q", "page"]);
    }

    #[test]
    fn ampersand_outside_query_is_rejected() {
        assert!(matches!(
            tokenize("/a&b"),
            Err(PatternError::UnexpectedCharacter { .. })
        ));
    }

    #[test]
    fn unterminated_constraint_is_rejected() {
        assert!(matches!(
            tokenize("/users/:id<\\d+"),
            Err(PatternError::UnterminatedConstraint { .. })
        ));
    }

    #[test]
    fn splat_and_matrix_parameters() {
        let tokens = tokenize("/files/*path;version").unwrap();
        assert_eq!(
            tokens[3],
            Token::Splat {
                name: "path".to_owned()
            }
        );
        assert_eq!(
            tokens[4],
            Token::Matrix {
                name: "version".to_owned()
            }
        );
    }
}
