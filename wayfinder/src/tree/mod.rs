//! Defines the immutable, cached route tree.

pub mod builder;
pub mod node;

use std::collections::HashMap;

use log::trace;

use crate::helpers::percent::ParamEncoding;
use crate::params::Params;
use crate::path::PathBuildError;
use crate::query::{QueryCodec, QueryParamsOptions};

pub use self::builder::{RouteDefinition, RouteTreeError};
pub use self::node::{NodeId, ParamMeta, ParamsMapper, RouteNode};

/// Escape hatches for tree construction.
#[derive(Clone, Copy, Debug, Default)]
pub struct TreeBuildOptions {
    /// Keep children in definition order instead of routing priority.
    pub skip_sort: bool,
}

/// Options applied while building a path from a route name.
#[derive(Clone, Debug, Default)]
pub struct PathOptions {
    /// Skip constraint validation of encoded values.
    pub ignore_constraints: bool,
    /// Do not render a query string.
    pub ignore_search: bool,
    /// Encoding strategy for parameter values.
    pub encoding: ParamEncoding,
    /// Passed through to the query codec unchanged.
    pub query_options: QueryParamsOptions,
}

/// A frozen hierarchy of named routes.
///
/// Nodes live in an arena and refer to each other by index; the tree is
/// immutable once built and can be shared freely between matchers.
pub struct RouteTree {
    pub(crate) nodes: Vec<RouteNode>,
    pub(crate) by_name: HashMap<String, NodeId>,
    pub(crate) absolute_nodes: Vec<NodeId>,
}

impl RouteTree {
    /// Builds a tree from definitions with default options.
    pub fn new(definitions: Vec<RouteDefinition>) -> Result<Self, RouteTreeError> {
        Self::with_options(definitions, TreeBuildOptions::default())
    }

    /// Builds a tree from definitions.
    pub fn with_options(
        definitions: Vec<RouteDefinition>,
        options: TreeBuildOptions,
    ) -> Result<Self, RouteTreeError> {
        trace!(" building route tree");
        builder::build(definitions, options)
    }

    /// True when a route with this full name exists.
    pub fn has_route(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Looks a route up by full name.
    pub fn route(&self, name: &str) -> Option<&RouteNode> {
        self.by_name.get(name).map(|&id| &self.nodes[id])
    }

    /// Parameter metadata for a route.
    pub fn meta(&self, name: &str) -> Option<&ParamMeta> {
        self.route(name).map(RouteNode::param_meta)
    }

    /// The chain of routes from the root to `name`, root excluded.
    pub fn segments(&self, name: &str) -> Option<Vec<&RouteNode>> {
        self.chain_ids(name)
            .map(|ids| ids.into_iter().map(|id| &self.nodes[id]).collect())
    }

    pub(crate) fn node(&self, id: NodeId) -> &RouteNode {
        &self.nodes[id]
    }

    pub(crate) fn chain_ids(&self, name: &str) -> Option<Vec<NodeId>> {
        let mut id = *self.by_name.get(name)?;
        let mut chain = vec![id];
        while let Some(parent) = self.nodes[id].parent {
            if parent != 0 {
                chain.push(parent);
            }
            id = parent;
        }
        chain.reverse();
        Some(chain)
    }

    /// URL (path-bound) parameter names along the chain of `name`.
    pub(crate) fn chain_url_param_names(&self, name: &str) -> Option<Vec<String>> {
        let chain = self.chain_ids(name)?;
        let mut names = Vec::new();
        for id in chain {
            for param in self.nodes[id].param_meta.path_param_names() {
                if !names.iter().any(|n| n == param) {
                    names.push(param.to_owned());
                }
            }
        }
        Some(names)
    }

    /// Default parameters merged along the chain of `name`, leaf values
    /// overriding ancestor values.
    pub(crate) fn chain_default_params(&self, name: &str) -> Params {
        let mut defaults = Params::new();
        if let Some(chain) = self.chain_ids(name) {
            for id in chain {
                defaults.extend(&self.nodes[id].default_params);
            }
        }
        defaults
    }

    /// Renders the URL for `name` from `params`.
    ///
    /// Starts from the cached static path when the chain binds no
    /// parameters; otherwise builds each segment in chain order, letting
    /// absolute segments discard the accumulated prefix, and appends a
    /// query string from the declared query parameters present in
    /// `params`.
    pub fn build_path(
        &self,
        name: &str,
        params: &Params,
        options: &PathOptions,
        codec: &dyn QueryCodec,
    ) -> Result<String, PathBuildError> {
        let chain = self
            .chain_ids(name)
            .ok_or_else(|| PathBuildError::RouteNotFound {
                name: name.to_owned(),
            })?;
        let leaf = &self.nodes[*chain.last().expect("chains are never empty")];

        if params.is_empty() {
            if let Some(static_path) = leaf.static_path() {
                trace!(" using cached static path for `{}`", name);
                return Ok(normalize_root(static_path.to_owned()));
            }
        }

        let mut effective = params.clone();
        for &id in &chain {
            if let Some(encode) = &self.nodes[id].encode_params {
                effective = encode(effective);
            }
        }

        let mut path = String::new();
        for &id in &chain {
            let node = &self.nodes[id];
            let piece =
                node.pattern()
                    .build_segment(&effective, options.encoding, options.ignore_constraints)?;
            if node.absolute {
                path = piece;
            } else {
                path = builder::join_paths(&path, &piece);
            }
        }
        let mut path = normalize_root(path);

        if !options.ignore_search {
            let mut query = Params::new();
            for &id in &chain {
                for key in self.nodes[id].param_meta.query_params() {
                    if let Some(value) = effective.get(key) {
                        query.insert(key, value.clone());
                    }
                }
            }
            if !query.is_empty() {
                let rendered = codec.build(&query, &options.query_options);
                if !rendered.is_empty() {
                    path.push('?');
                    path.push_str(&rendered);
                }
            }
        }

        Ok(path)
    }
}

fn normalize_root(path: String) -> String {
    if path.is_empty() {
        "/".to_owned()
    } else {
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::FormUrlCodec;

    fn params(pairs: &[(&str, &str)]) -> Params {
        let mut params = Params::new();
        for (k, v) in pairs {
            params.insert(*k, *v);
        }
        params
    }

    fn sample() -> RouteTree {
        RouteTree::new(vec![
            RouteDefinition::new("home", "/"),
            RouteDefinition::new("users", "/users")
                .child(RouteDefinition::new("profile", "/:id"))
                .child(RouteDefinition::new("admin", "~/admin")),
            RouteDefinition::new("search", "/search?q&page"),
            RouteDefinition::new("files", "/files/*path"),
        ])
        .unwrap()
    }

    #[test]
    fn builds_nested_paths() {
        let tree = sample();
        let built = tree
            .build_path(
                "users.profile",
                &params(&[("id", "42")]),
                &PathOptions::default(),
                &FormUrlCodec,
            )
            .unwrap();
        assert_eq!(built, "/users/42");
    }

    #[test]
    fn absolute_segments_discard_the_prefix() {
        let tree = sample();
        let built = tree
            .build_path(
                "users.admin",
                &Params::new(),
                &PathOptions::default(),
                &FormUrlCodec,
            )
            .unwrap();
        assert_eq!(built, "/admin");
    }

    #[test]
    fn query_parameters_append_after_the_path() {
        let tree = sample();
        let built = tree
            .build_path(
                "search",
                &params(&[("q", "hi"), ("page", "2")]),
                &PathOptions::default(),
                &FormUrlCodec,
            )
            .unwrap();
        assert_eq!(built, "/search?q=hi&page=2");

        let ignored = tree
            .build_path(
                "search",
                &params(&[("q", "hi")]),
                &PathOptions {
                    ignore_search: true,
                    ..PathOptions::default()
                },
                &FormUrlCodec,
            )
            .unwrap();
        assert_eq!(ignored, "/search");
    }

    #[test]
    fn splat_values_keep_their_slashes() {
        let tree = sample();
        let built = tree
            .build_path(
                "files",
                &params(&[("path", "x/y")]),
                &PathOptions::default(),
                &FormUrlCodec,
            )
            .unwrap();
        assert_eq!(built, "/files/x/y");
    }

    #[test]
    fn unknown_names_are_reported() {
        let tree = sample();
        let err = tree
            .build_path(
                "nope",
                &Params::new(),
                &PathOptions::default(),
                &FormUrlCodec,
            )
            .unwrap_err();
        assert_eq!(
            err,
            PathBuildError::RouteNotFound {
                name: "nope".to_owned()
            }
        );
    }

    #[test]
    fn segment_chains_exclude_the_root() {
        let tree = sample();
        let chain = tree.segments("users.profile").unwrap();
        let names: Vec<&str> = chain.iter().map(|n| n.full_name()).collect();
        assert_eq!(names, vec!["users", "users.profile"]);
    }
}
