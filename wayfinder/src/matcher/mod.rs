//! Matches URLs against a route tree.

use std::sync::Arc;

use log::trace;
use serde::{Deserialize, Serialize};

use crate::helpers::percent::{ParamEncoding, PercentDecoded};
use crate::params::Params;
use crate::query::{QueryCodec, QueryParamsOptions};
use crate::tree::{NodeId, ParamMeta, RouteNode, RouteTree};

/// Handling of query parameters the matched route does not declare.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryParamsMode {
    /// Unknown query parameters are tolerated and dropped.
    Default,
    /// Any unknown query parameter fails the match.
    Strict,
    /// Unknown query parameters are tolerated; callers may opt into
    /// receiving them via
    /// [`MatchOptions::keep_unknown_query_params`].
    Loose,
}

impl Default for QueryParamsMode {
    fn default() -> Self {
        QueryParamsMode::Default
    }
}

/// Options applied to a single match attempt.
#[derive(Clone, Debug, Default)]
pub struct MatchOptions {
    /// Require the URL's trailing slash to agree with the pattern.
    pub strict_trailing_slash: bool,
    /// Handling of undeclared query parameters.
    pub query_params_mode: QueryParamsMode,
    /// Match the path portion case-sensitively.
    pub case_sensitive: bool,
    /// Copy undeclared query parameters into the result under the
    /// default/loose modes.
    pub keep_unknown_query_params: bool,
    /// Decoding strategy for captured values.
    pub encoding: ParamEncoding,
    /// Passed through to the query codec unchanged.
    pub query_options: QueryParamsOptions,
}

/// A successful match: the route chain, the decoded parameters and the
/// matched route's full name.
#[derive(Clone, Debug)]
pub struct MatchResult {
    /// Full name of the matched route.
    pub name: String,
    /// Decoded URL and query parameters.
    pub params: Params,
    /// Arena indices of the matched chain, root to leaf.
    pub segment_ids: Vec<NodeId>,
}

impl MatchResult {
    /// Resolves the matched chain against its tree.
    pub fn segments<'t>(&self, tree: &'t RouteTree) -> Vec<&'t RouteNode> {
        self.segment_ids.iter().map(|&id| tree.node(id)).collect()
    }
}

/// A matcher over a shared route tree.
pub struct Matcher {
    tree: Arc<RouteTree>,
    root_path: String,
}

impl Matcher {
    /// Creates a matcher over `tree`.
    pub fn new(tree: Arc<RouteTree>) -> Self {
        Matcher {
            tree,
            root_path: String::new(),
        }
    }

    /// The tree this matcher wraps.
    pub fn tree(&self) -> &Arc<RouteTree> {
        &self.tree
    }

    /// Sets the prefix stripped from URLs before matching. Setting is
    /// idempotent; the empty string disables stripping.
    pub fn set_root_path(&mut self, root_path: &str) {
        self.root_path = root_path.to_owned();
    }

    /// The configured root path.
    pub fn root_path(&self) -> &str {
        &self.root_path
    }

    /// True when a route with this full name exists.
    pub fn has_route(&self, name: &str) -> bool {
        self.tree.has_route(name)
    }

    /// The root-to-leaf chain for a route name.
    pub fn segments_by_name(&self, name: &str) -> Option<Vec<&RouteNode>> {
        self.tree.segments(name)
    }

    /// Parameter metadata for a route name.
    pub fn meta_by_name(&self, name: &str) -> Option<&ParamMeta> {
        self.tree.meta(name)
    }

    /// Matches a URL against the tree.
    pub fn match_url(
        &self,
        url: &str,
        options: &MatchOptions,
        codec: &dyn QueryCodec,
    ) -> Option<MatchResult> {
        let url = self.strip_root_path(url)?;
        let url = if url.is_empty() { "/" } else { url };

        // Raw multi-byte or unprintable input is not matched; callers
        // must percent-encode.
        if !url.bytes().all(|b| (0x21..=0x7e).contains(&b)) {
            trace!(" rejecting url with non-printable-ascii bytes");
            return None;
        }

        let (path_part, query_part) = match url.find('?') {
            Some(idx) => (&url[..idx], Some(&url[idx + 1..])),
            None => (url, None),
        };
        if !path_part.starts_with('/') {
            return None;
        }

        trace!(" starting tree walk for `{}`", path_part);
        let (chain, mut params) = self
            .match_children(0, path_part, options)
            .or_else(|| self.match_absolute(path_part, options))?;

        let declared: Vec<&str> = chain
            .iter()
            .flat_map(|&id| self.tree.node(id).param_meta().query_params())
            .map(String::as_str)
            .collect();

        if let Some(query) = query_part {
            let parsed = codec.parse(query, &options.query_options);
            for (key, value) in parsed.iter() {
                if declared.iter().any(|d| *d == key) {
                    params.insert(key, value.clone());
                } else {
                    match options.query_params_mode {
                        QueryParamsMode::Strict => {
                            trace!(" unknown query param `{}` fails strict match", key);
                            return None;
                        }
                        QueryParamsMode::Default | QueryParamsMode::Loose => {
                            if options.keep_unknown_query_params {
                                params.insert(key, value.clone());
                            }
                        }
                    }
                }
            }
        }

        for &id in &chain {
            params.merge_defaults(self.tree.node(id).default_params());
        }
        for &id in &chain {
            if let Some(decode) = &self.tree.node(id).decode_params {
                params = decode(params);
            }
        }

        let leaf = *chain.last().expect("matched chains are never empty");
        Some(MatchResult {
            name: self.tree.node(leaf).full_name().to_owned(),
            params,
            segment_ids: chain,
        })
    }

    fn strip_root_path<'u>(&self, url: &'u str) -> Option<&'u str> {
        if self.root_path.is_empty() {
            Some(url)
        } else if let Some(rest) = url.strip_prefix(self.root_path.as_str()) {
            Some(rest)
        } else {
            None
        }
    }

    /// Tries the children of `parent` against `remaining`: first the
    /// static-prefix index keyed by the next URL segment, then the
    /// dynamic list in sorted order.
    fn match_children(
        &self,
        parent: NodeId,
        remaining: &str,
        options: &MatchOptions,
    ) -> Option<(Vec<NodeId>, Params)> {
        let node = self.tree.node(parent);
        let segment = next_segment(remaining);
        let indexed = if options.case_sensitive {
            node.static_index.get(segment)
        } else {
            node.static_index_ci.get(&segment.to_lowercase())
        };

        let candidates = indexed
            .into_iter()
            .flatten()
            .chain(node.dynamic_children.iter());
        for &child in candidates {
            if let Some(matched) = self.try_node(child, remaining, options) {
                return Some(matched);
            }
        }
        None
    }

    /// Matches `remaining` against one node: consume the node's own
    /// pattern, accept if the URL is exhausted, descend otherwise.
    fn try_node(
        &self,
        id: NodeId,
        remaining: &str,
        options: &MatchOptions,
    ) -> Option<(Vec<NodeId>, Params)> {
        let node = self.tree.node(id);
        let (consumed, captured) = node
            .pattern()
            .match_prefix(remaining, options.case_sensitive)?;
        if consumed == 0 {
            return None;
        }

        let mut params = Params::new();
        for (name, raw, _is_splat) in captured {
            let decoded = PercentDecoded::new(raw, options.encoding)?;
            params.insert(name, decoded.into_inner());
        }

        let rest = &remaining[consumed..];
        if is_terminal(rest, options) {
            trace!(" matched `{}`", node.full_name());
            let mut chain = vec![id];
            // A slash child completes the match when the URL ends
            // exactly on this segment.
            if let Some(slash) = node.slash_child {
                chain.push(slash);
            }
            return Some((chain, params));
        }

        if node.children.is_empty() {
            return None;
        }
        let (child_chain, child_params) = self.match_children(id, rest, options)?;
        let mut chain = Vec::with_capacity(child_chain.len() + 1);
        chain.push(id);
        chain.extend(child_chain);
        params.extend(&child_params);
        Some((chain, params))
    }

    /// Absolute subroutes match from the URL root, regardless of where
    /// they hang in the tree. Their ancestors join the resulting chain
    /// without contributing to the match.
    fn match_absolute(
        &self,
        path: &str,
        options: &MatchOptions,
    ) -> Option<(Vec<NodeId>, Params)> {
        for &id in &self.tree.absolute_nodes {
            if let Some((sub_chain, params)) = self.try_node(id, path, options) {
                let mut chain = Vec::new();
                let mut ancestor = self.tree.node(id).parent;
                while let Some(a) = ancestor {
                    if a != 0 {
                        chain.push(a);
                    }
                    ancestor = self.tree.node(a).parent;
                }
                chain.reverse();
                chain.extend(sub_chain);
                return Some((chain, params));
            }
        }
        None
    }
}

fn is_terminal(rest: &str, options: &MatchOptions) -> bool {
    rest.is_empty() || (!options.strict_trailing_slash && rest == "/")
}

/// The next `/`-delimited piece of the URL, used as the static-index key.
fn next_segment(remaining: &str) -> &str {
    let trimmed = remaining.strip_prefix('/').unwrap_or(remaining);
    let end = trimmed
        .find(|c| c == '/' || c == '?')
        .unwrap_or_else(|| trimmed.len());
    &trimmed[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::FormUrlCodec;
    use crate::tree::RouteDefinition;

    fn matcher(defs: Vec<RouteDefinition>) -> Matcher {
        Matcher::new(Arc::new(RouteTree::new(defs).unwrap()))
    }

    fn sample() -> Matcher {
        matcher(vec![
            RouteDefinition::new("home", "/"),
            RouteDefinition::new("users", "/users")
                .child(RouteDefinition::new("profile", "/:id"))
                .child(RouteDefinition::new("admin", "~/admin")),
            RouteDefinition::new("user", "/users/:id<\\d+>/details"),
            RouteDefinition::new("search", "/search?q&page"),
            RouteDefinition::new("files", "/files/*path"),
        ])
    }

    fn match_url(m: &Matcher, url: &str) -> Option<MatchResult> {
        m.match_url(url, &MatchOptions::default(), &FormUrlCodec)
    }

    #[test]
    fn matches_nested_routes() {
        let m = sample();
        let result = match_url(&m, "/users/42").unwrap();
        assert_eq!(result.name, "users.profile");
        assert_eq!(result.params.get("id").unwrap().as_str(), Some("42"));
    }

    #[test]
    fn matches_the_root_route() {
        let m = sample();
        assert_eq!(match_url(&m, "/").unwrap().name, "home");
        // The empty string normalizes to `/`.
        assert_eq!(match_url(&m, "").unwrap().name, "home");
    }

    #[test]
    fn constraints_reject_non_matching_segments() {
        let m = matcher(vec![RouteDefinition::new("user", "/users/:id<\\d+>")]);
        assert!(match_url(&m, "/users/abc").is_none());
        let result = match_url(&m, "/users/7").unwrap();
        assert_eq!(result.params.get("id").unwrap().as_str(), Some("7"));
    }

    #[test]
    fn splats_capture_the_rest_of_the_path() {
        let m = sample();
        let result = match_url(&m, "/files/a/b/c.txt").unwrap();
        assert_eq!(result.name, "files");
        assert_eq!(
            result.params.get("path").unwrap().as_str(),
            Some("a/b/c.txt")
        );
    }

    #[test]
    fn absolute_subroutes_match_from_the_url_root() {
        let m = matcher(vec![RouteDefinition::new("users", "/users")
            .child(RouteDefinition::new("admin", "~/admin"))]);
        let result = match_url(&m, "/admin").unwrap();
        assert_eq!(result.name, "users.admin");
        assert_eq!(result.segment_ids.len(), 2);
        assert!(match_url(&m, "/users/admin").is_none());
    }

    #[test]
    fn strict_query_mode_rejects_unknown_parameters() {
        let m = sample();
        let strict = MatchOptions {
            query_params_mode: QueryParamsMode::Strict,
            ..MatchOptions::default()
        };
        assert!(m
            .match_url("/search?q=hi&extra=1", &strict, &FormUrlCodec)
            .is_none());

        let result = match_url(&m, "/search?q=hi&extra=1").unwrap();
        assert_eq!(result.params.get("q").unwrap().as_str(), Some("hi"));
        assert!(result.params.get("extra").is_none());
    }

    #[test]
    fn unknown_query_parameters_can_be_kept_on_request() {
        let m = sample();
        let keep = MatchOptions {
            keep_unknown_query_params: true,
            ..MatchOptions::default()
        };
        let result = m
            .match_url("/search?q=hi&extra=1", &keep, &FormUrlCodec)
            .unwrap();
        assert_eq!(result.params.get("extra").unwrap().as_str(), Some("1"));
    }

    #[test]
    fn trailing_slash_is_tolerated_unless_strict() {
        let m = sample();
        assert_eq!(match_url(&m, "/users/").unwrap().name, "users");

        let strict = MatchOptions {
            strict_trailing_slash: true,
            ..MatchOptions::default()
        };
        assert!(m.match_url("/users/", &strict, &FormUrlCodec).is_none());
        assert_eq!(
            m.match_url("/users", &strict, &FormUrlCodec).unwrap().name,
            "users"
        );
    }

    #[test]
    fn case_sensitivity_is_selectable() {
        let m = sample();
        assert_eq!(match_url(&m, "/Users").unwrap().name, "users");

        let sensitive = MatchOptions {
            case_sensitive: true,
            ..MatchOptions::default()
        };
        assert!(m.match_url("/Users", &sensitive, &FormUrlCodec).is_none());
    }

    #[test]
    fn root_path_is_stripped_before_matching() {
        let mut m = sample();
        m.set_root_path("/app");
        assert_eq!(match_url(&m, "/app/users").unwrap().name, "users");
        assert!(match_url(&m, "/users").is_none());

        m.set_root_path("");
        assert_eq!(match_url(&m, "/users").unwrap().name, "users");
    }

    #[test]
    fn slash_children_complete_branch_matches() {
        let m = matcher(vec![RouteDefinition::new("users", "/users")
            .child(RouteDefinition::new("index", "/"))
            .child(RouteDefinition::new("profile", "/:id"))]);
        assert_eq!(match_url(&m, "/users").unwrap().name, "users.index");
        assert_eq!(match_url(&m, "/users/").unwrap().name, "users.index");
        assert_eq!(match_url(&m, "/users/7").unwrap().name, "users.profile");
    }

    #[test]
    fn priority_prefers_more_specific_patterns() {
        let m = sample();
        let result = match_url(&m, "/users/9/details").unwrap();
        assert_eq!(result.name, "user");
    }

    #[test]
    fn encoded_values_are_decoded() {
        let m = sample();
        let result = match_url(&m, "/users/j%20doe").unwrap();
        assert_eq!(result.params.get("id").unwrap().as_str(), Some("j doe"));
    }

    #[test]
    fn invalid_percent_triples_fail_the_match() {
        let m = sample();
        assert!(match_url(&m, "/users/a%2").is_none());
    }

    #[test]
    fn raw_multibyte_input_is_rejected() {
        let m = sample();
        assert!(match_url(&m, "/users/héllo").is_none());
    }
}
