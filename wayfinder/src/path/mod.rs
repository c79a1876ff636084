//! Compiles route patterns into matching and building machinery.

pub mod token;

use std::collections::HashMap;

use regex::Regex;
use thiserror::Error;

use crate::helpers::percent::ParamEncoding;
use crate::params::{ParamValue, Params};

pub use self::token::{PatternError, Token};

/// Constraint applied to URL parameters without an explicit `<...>` body.
const DEFAULT_CONSTRAINT: &str = "[^/]+";

/// Matrix values end at the next `;`, `/` or query terminator.
const MATRIX_CONSTRAINT: &str = "[^/;?]+";

/// Splats swallow the rest of the path portion, one segment or more.
const SPLAT_SOURCE: &str = "(.+)";

/// An error raised while building a path from parameters.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PathBuildError {
    /// Required URL parameters were absent from the input map.
    #[error("`{pattern}` requires missing parameters {missing:?}")]
    MissingParameters {
        /// The pattern being built.
        pattern: String,
        /// The absent parameter names.
        missing: Vec<String>,
    },

    /// An encoded value did not satisfy its parameter constraint.
    #[error(
        "Parameter `{param}` of `{pattern}` has invalid format: \
         got `{value}`, expected to match `{expected}`"
    )]
    ConstraintViolation {
        /// The pattern being built.
        pattern: String,
        /// The offending parameter.
        param: String,
        /// The encoded value that failed.
        value: String,
        /// The constraint source.
        expected: String,
    },

    /// The route name could not be resolved.
    #[error("no route named `{name}`")]
    RouteNotFound {
        /// The unknown name.
        name: String,
    },
}

/// An anchored constraint regex comparable by its source text.
#[derive(Clone, Debug)]
pub struct ConstraintRegex {
    regex: Regex,
}

impl ConstraintRegex {
    /// Compiles `source` wrapped in begin and end anchors so it cannot
    /// match more than a whole value.
    fn new(source: &str) -> Result<Self, regex::Error> {
        Ok(ConstraintRegex {
            regex: Regex::new(&format!("^(?:{})$", source))?,
        })
    }

    /// The constraint body as written in the pattern.
    pub(crate) fn as_str(&self) -> &str {
        let full = self.regex.as_str();
        &full[4..full.len() - 2]
    }

    #[inline]
    pub(crate) fn is_match(&self, s: &str) -> bool {
        self.regex.is_match(s)
    }
}

impl PartialEq for ConstraintRegex {
    fn eq(&self, other: &Self) -> bool {
        self.regex.as_str() == other.regex.as_str()
    }
}

impl Eq for ConstraintRegex {}

/// How a captured group binds to a parameter.
#[derive(Clone, Debug, PartialEq, Eq)]
enum CaptureKind {
    Plain,
    Splat,
    Matrix,
}

#[derive(Clone, Debug)]
struct CaptureParam {
    name: String,
    kind: CaptureKind,
}

/// A parsed route pattern: the source regex for matching, the static-part
/// template for building, and the parameter metadata both sides share.
#[derive(Clone, Debug)]
pub struct PathPattern {
    pattern: String,
    path: String,
    tokens: Vec<Token>,
    source: String,
    regex_cs: Regex,
    regex_ci: Regex,
    static_parts: Vec<String>,
    param_names: Vec<String>,
    capture_params: Vec<CaptureParam>,
    url_params: Vec<String>,
    splat_params: Vec<String>,
    query_params: Vec<String>,
    optional_params: Vec<String>,
    constraints: HashMap<String, ConstraintRegex>,
}

impl PathPattern {
    /// Parses and compiles a pattern string.
    pub fn parse(pattern: &str) -> Result<Self, PatternError> {
        let tokens = token::tokenize(pattern)?;

        let mut source = String::new();
        let mut static_parts = Vec::new();
        let mut param_names = Vec::new();
        let mut capture_params = Vec::new();
        let mut url_params = Vec::new();
        let mut splat_params = Vec::new();
        let mut query_params = Vec::new();
        let mut optional_params = Vec::new();
        let mut constraints = HashMap::new();
        let mut path = String::new();
        let mut buffer = String::new();

        for token in &tokens {
            if !token.is_query() {
                path.push_str(&token.literal());
            }
            match token {
                Token::Delimiter => {
                    source.push('/');
                    buffer.push('/');
                }
                Token::SubDelimiter(c) => {
                    source.push_str(&regex::escape(&c.to_string()));
                    buffer.push(*c);
                }
                Token::Fragment(text) => {
                    source.push_str(&regex::escape(text));
                    buffer.push_str(text);
                }
                Token::UrlParam {
                    name,
                    constraint,
                    optional,
                } => {
                    let body = constraint.as_deref().unwrap_or(DEFAULT_CONSTRAINT);
                    let compiled = ConstraintRegex::new(body).map_err(|_| {
                        PatternError::InvalidConstraint {
                            name: name.clone(),
                            source_text: body.to_owned(),
                        }
                    })?;
                    constraints.insert(name.clone(), compiled);

                    source.push_str(&format!("({})", body));
                    if *optional {
                        source.push('?');
                        optional_params.push(name.clone());
                    }
                    static_parts.push(std::mem::take(&mut buffer));
                    param_names.push(name.clone());
                    capture_params.push(CaptureParam {
                        name: name.clone(),
                        kind: CaptureKind::Plain,
                    });
                    url_params.push(name.clone());
                }
                Token::Splat { name } => {
                    source.push_str(SPLAT_SOURCE);
                    static_parts.push(std::mem::take(&mut buffer));
                    param_names.push(name.clone());
                    capture_params.push(CaptureParam {
                        name: name.clone(),
                        kind: CaptureKind::Splat,
                    });
                    splat_params.push(name.clone());
                }
                Token::Matrix { name } => {
                    source.push_str(&format!(
                        ";{}=({})",
                        regex::escape(name),
                        MATRIX_CONSTRAINT
                    ));
                    buffer.push_str(&format!(";{}=", name));
                    static_parts.push(std::mem::take(&mut buffer));
                    param_names.push(name.clone());
                    capture_params.push(CaptureParam {
                        name: name.clone(),
                        kind: CaptureKind::Matrix,
                    });
                    url_params.push(name.clone());
                }
                Token::Query { name, .. } => {
                    query_params.push(name.clone());
                }
            }
        }
        static_parts.push(buffer);

        let regex_cs = Regex::new(&format!("^(?:{})", source)).map_err(|_| {
            PatternError::InvalidConstraint {
                name: pattern.to_owned(),
                source_text: source.clone(),
            }
        })?;
        let regex_ci = Regex::new(&format!("^(?i:{})", source)).map_err(|_| {
            PatternError::InvalidConstraint {
                name: pattern.to_owned(),
                source_text: source.clone(),
            }
        })?;

        Ok(PathPattern {
            pattern: pattern.to_owned(),
            path,
            tokens,
            source,
            regex_cs,
            regex_ci,
            static_parts,
            param_names,
            capture_params,
            url_params,
            splat_params,
            query_params,
            optional_params,
            constraints,
        })
    }

    /// The pattern as written, including any query tail.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// The path portion of the pattern, without the query tail.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The regex source matching the path portion.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The scanned token sequence.
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// URL parameter names (plain and matrix) in pattern order.
    pub fn url_params(&self) -> &[String] {
        &self.url_params
    }

    /// Splat parameter names.
    pub fn splat_params(&self) -> &[String] {
        &self.splat_params
    }

    /// Query parameter names declared after `?`.
    pub fn query_params(&self) -> &[String] {
        &self.query_params
    }

    /// The constraint map, default constraints included.
    pub fn constraints(&self) -> &HashMap<String, ConstraintRegex> {
        &self.constraints
    }

    /// True when the pattern binds no parameters of any kind.
    pub fn is_static(&self) -> bool {
        self.param_names.is_empty() && self.query_params.is_empty()
    }

    /// Matches this pattern against the start of `remaining`, returning
    /// the consumed byte length and the raw captured values in pattern
    /// order.
    pub(crate) fn match_prefix<'u>(
        &self,
        remaining: &'u str,
        case_sensitive: bool,
    ) -> Option<(usize, Vec<(String, &'u str, bool)>)> {
        let regex = if case_sensitive {
            &self.regex_cs
        } else {
            &self.regex_ci
        };
        let caps = regex.captures(remaining)?;
        let consumed = caps.get(0).map(|m| m.end()).unwrap_or(0);
        let mut values = Vec::with_capacity(self.capture_params.len());
        for (i, param) in self.capture_params.iter().enumerate() {
            if let Some(m) = caps.get(i + 1) {
                values.push((
                    param.name.clone(),
                    m.as_str(),
                    param.kind == CaptureKind::Splat,
                ));
            }
        }
        Some((consumed, values))
    }

    /// Renders the path portion of this pattern from `params`.
    ///
    /// Values are encoded with `encoding` before interleaving; encoded
    /// values are validated against the constraint map unless
    /// `ignore_constraints`. Query parameters are not rendered here.
    pub(crate) fn build_segment(
        &self,
        params: &Params,
        encoding: ParamEncoding,
        ignore_constraints: bool,
    ) -> Result<String, PathBuildError> {
        let missing: Vec<String> = self
            .param_names
            .iter()
            .filter(|name| {
                !params.contains_key(name) && !self.optional_params.contains(name)
            })
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(PathBuildError::MissingParameters {
                pattern: self.pattern.clone(),
                missing,
            });
        }

        let mut out = String::new();
        for (i, name) in self.param_names.iter().enumerate() {
            out.push_str(&self.static_parts[i]);
            let value = match params.get(name) {
                Some(value) => value,
                None => {
                    // Optional parameter left out: swallow the slash that
                    // introduced it, keeping "/a/:b?/c" buildable as "/a/c".
                    if out.ends_with('/') && out.len() > 1 {
                        out.pop();
                    }
                    continue;
                }
            };
            let raw = render_value(value);
            let encoded = if self.splat_params.contains(name) {
                encoding.encode_splat(&raw)
            } else {
                encoding.encode(&raw)
            };
            if !ignore_constraints {
                if let Some(constraint) = self.constraints.get(name) {
                    if !constraint.is_match(&encoded) {
                        return Err(PathBuildError::ConstraintViolation {
                            pattern: self.pattern.clone(),
                            param: name.clone(),
                            value: encoded,
                            expected: constraint.as_str().to_owned(),
                        });
                    }
                }
            }
            out.push_str(&encoded);
        }
        out.push_str(&self.static_parts[self.param_names.len()]);
        Ok(out)
    }
}

fn render_value(value: &ParamValue) -> String {
    match value {
        ParamValue::Single(s) => s.clone(),
        ParamValue::List(values) => values.first().cloned().unwrap_or_default(),
        ParamValue::Null => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> Params {
        let mut params = Params::new();
        for (k, v) in pairs {
            params.insert(*k, *v);
        }
        params
    }

    #[test]
    fn template_invariant_holds() {
        let pattern = PathPattern::parse("/users/:id/posts/:post").unwrap();
        assert_eq!(pattern.static_parts.len(), pattern.param_names.len() + 1);
    }

    #[test]
    fn builds_with_parameters() {
        let pattern = PathPattern::parse("/users/:id").unwrap();
        let built = pattern
            .build_segment(&params(&[("id", "42")]), ParamEncoding::Default, false)
            .unwrap();
        assert_eq!(built, "/users/42");
    }

    #[test]
    fn missing_parameters_are_reported() {
        let pattern = PathPattern::parse("/users/:id/:section").unwrap();
        let err = pattern
            .build_segment(&params(&[("id", "1")]), ParamEncoding::Default, false)
            .unwrap_err();
        assert_eq!(
            err,
            PathBuildError::MissingParameters {
                pattern: "/users/:id/:section".to_owned(),
                missing: vec!["section".to_owned()],
            }
        );
    }

    #[test]
    fn constraints_validate_encoded_values() {
        let pattern = PathPattern::parse("/users/:id<\\d+>").unwrap();
        let err = pattern
            .build_segment(&params(&[("id", "abc")]), ParamEncoding::Default, false)
            .unwrap_err();
        match err {
            PathBuildError::ConstraintViolation {
                param, expected, ..
            } => {
                assert_eq!(param, "id");
                assert_eq!(expected, "\\d+");
            }
            other => panic!("unexpected error: {}", other),
        }

        // Bypassed on request.
        let built = pattern
            .build_segment(&params(&[("id", "abc")]), ParamEncoding::Default, true)
            .unwrap();
        assert_eq!(built, "/users/abc");
    }

    #[test]
    fn optional_parameter_may_be_left_out() {
        let pattern = PathPattern::parse("/users/:id?").unwrap();
        let built = pattern
            .build_segment(&Params::new(), ParamEncoding::Default, false)
            .unwrap();
        assert_eq!(built, "/users");
    }

    #[test]
    fn matrix_separator_is_baked_into_the_template() {
        let pattern = PathPattern::parse("/items;sort").unwrap();
        let built = pattern
            .build_segment(&params(&[("sort", "asc")]), ParamEncoding::Default, false)
            .unwrap();
        assert_eq!(built, "/items;sort=asc");
    }

    #[test]
    fn match_prefix_consumes_and_captures() {
        let pattern = PathPattern::parse("/users/:id<\\d+>").unwrap();
        let (consumed, captures) = pattern.match_prefix("/users/42/posts", true).unwrap();
        assert_eq!(consumed, "/users/42".len());
        assert_eq!(captures.len(), 1);
        assert_eq!(captures[0].0, "id");
        assert_eq!(captures[0].1, "42");

        assert!(pattern.match_prefix("/users/abc", true).is_none());
    }

    #[test]
    fn case_insensitive_matching_is_selectable() {
        let pattern = PathPattern::parse("/About").unwrap();
        assert!(pattern.match_prefix("/about", false).is_some());
        assert!(pattern.match_prefix("/about", true).is_none());
    }

    #[test]
    fn splat_captures_across_segments() {
        let pattern = PathPattern::parse("/files/*path").unwrap();
        let (_, captures) = pattern.match_prefix("/files/a/b/c.txt", true).unwrap();
        assert_eq!(captures[0].1, "a/b/c.txt");
        assert!(captures[0].2);
    }

    #[test]
    fn query_params_are_not_part_of_the_template() {
        let pattern = PathPattern::parse("/search?q&page").unwrap();
        assert_eq!(pattern.query_params(), ["q", "page"]);
        assert_eq!(pattern.path(), "/search");
        let built = pattern
            .build_segment(&Params::new(), ParamEncoding::Default, false)
            .unwrap();
        assert_eq!(built, "/search");
    }
}
