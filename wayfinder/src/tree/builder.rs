//! Validates route definitions and constructs the frozen tree.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use log::trace;
use regex::Regex;
use thiserror::Error;

use crate::params::{ParamValue, Params};
use crate::path::{PathPattern, PatternError, Token};
use crate::tree::node::{NodeId, ParamMeta, ParamsMapper, RouteNode};
use crate::tree::{RouteTree, TreeBuildOptions};

/// Accepted route names: either a reserved `@@` system name, or dot-joined
/// identifier segments.
const NAME_GRAMMAR: &str =
    r"^(@@[\w/-]+|[A-Za-z0-9_][A-Za-z0-9_-]*(\.[A-Za-z0-9_][A-Za-z0-9_-]*)*)$";

const MAX_NAME_LEN: usize = 10_000;

/// An error raised while building a route tree.
#[derive(Debug, Error)]
pub enum RouteTreeError {
    /// The name does not match the accepted grammar.
    #[error("invalid route name `{name}`")]
    InvalidName {
        /// The offending name.
        name: String,
    },

    /// The path fails a structural rule.
    #[error("invalid path `{path}` for route `{name}`: {reason}")]
    InvalidPath {
        /// The route the path belongs to.
        name: String,
        /// The offending path.
        path: String,
        /// Which rule failed.
        reason: String,
    },

    /// A route with this full name already exists.
    #[error("duplicate route name `{name}`")]
    DuplicateName {
        /// The duplicated full name.
        name: String,
    },

    /// A sibling with this path, or another absolute route with this
    /// path, already exists.
    #[error("duplicate path `{path}` under `{parent}`")]
    DuplicatePath {
        /// The parent route, or `~` for the absolute namespace.
        parent: String,
        /// The duplicated path.
        path: String,
    },

    /// A dotted name references a parent that has not been defined.
    #[error("missing parent for route `{name}`")]
    MissingParent {
        /// The route whose parent is absent.
        name: String,
    },

    /// Absolute paths cannot hang below parameterised routes.
    #[error("absolute path `{path}` is not allowed under parameterised route `{parent}`")]
    AbsoluteUnderParams {
        /// The parameterised ancestor.
        parent: String,
        /// The offending absolute path.
        path: String,
    },

    /// The pattern itself failed to scan or compile.
    #[error(transparent)]
    Pattern(#[from] PatternError),
}

/// One route to register: a name, a pattern and optional trimmings.
#[derive(Clone)]
pub struct RouteDefinition {
    /// Route name; dot notation declares hierarchy implicitly.
    pub name: String,
    /// Route pattern; `~/` marks an absolute subroute.
    pub path: String,
    /// Nested child definitions.
    pub children: Vec<RouteDefinition>,
    /// Parameters merged into states when absent.
    pub default_params: Params,
    /// Route this one forwards to when navigated to by name.
    pub forward_to: Option<String>,
    /// Transform applied to parameters before building a path.
    pub encode_params: Option<ParamsMapper>,
    /// Transform applied to parameters after matching a path.
    pub decode_params: Option<ParamsMapper>,
    /// Unrecognised fields, preserved verbatim.
    pub extras: HashMap<String, ParamValue>,
}

impl RouteDefinition {
    /// Creates a definition for `name` matching `path`.
    pub fn new<N: Into<String>, P: Into<String>>(name: N, path: P) -> Self {
        RouteDefinition {
            name: name.into(),
            path: path.into(),
            children: Vec::new(),
            default_params: Params::new(),
            forward_to: None,
            encode_params: None,
            decode_params: None,
            extras: HashMap::new(),
        }
    }

    /// Appends a child definition.
    pub fn child(mut self, child: RouteDefinition) -> Self {
        self.children.push(child);
        self
    }

    /// Appends several child definitions.
    pub fn children(mut self, children: Vec<RouteDefinition>) -> Self {
        self.children.extend(children);
        self
    }

    /// Sets parameters merged into states when absent.
    pub fn default_params(mut self, params: Params) -> Self {
        self.default_params = params;
        self
    }

    /// Forwards navigation aimed at this route to `target`.
    pub fn forward_to<T: Into<String>>(mut self, target: T) -> Self {
        self.forward_to = Some(target.into());
        self
    }

    /// Installs a parameter transform applied before building.
    pub fn encode_params(mut self, mapper: ParamsMapper) -> Self {
        self.encode_params = Some(mapper);
        self
    }

    /// Installs a parameter transform applied after matching.
    pub fn decode_params(mut self, mapper: ParamsMapper) -> Self {
        self.decode_params = Some(mapper);
        self
    }

    /// Preserves an unrecognised definition field.
    pub fn extra<K: Into<String>, V: Into<ParamValue>>(mut self, key: K, value: V) -> Self {
        self.extras.insert(key.into(), value.into());
        self
    }
}

pub(crate) fn build(
    definitions: Vec<RouteDefinition>,
    options: TreeBuildOptions,
) -> Result<RouteTree, RouteTreeError> {
    let mut builder = Builder {
        nodes: vec![root_node()],
        by_name: HashMap::new(),
        absolute_paths: HashSet::new(),
        name_grammar: Regex::new(NAME_GRAMMAR).unwrap(),
    };

    for definition in definitions {
        builder.add(definition, 0)?;
    }

    if !options.skip_sort {
        builder.sort_children();
    }
    builder.compute_caches();

    let absolute_nodes = builder
        .nodes
        .iter()
        .filter(|n| n.absolute)
        .map(|n| n.id)
        .collect();

    Ok(RouteTree {
        nodes: builder.nodes,
        by_name: builder.by_name,
        absolute_nodes,
    })
}

fn root_node() -> RouteNode {
    let pattern = PathPattern::parse("").expect("empty pattern always parses");
    let param_meta = ParamMeta::from_pattern(&pattern);
    RouteNode {
        id: 0,
        parent: None,
        segment_name: String::new(),
        full_name: String::new(),
        raw_path: String::new(),
        absolute: false,
        pattern,
        children: Vec::new(),
        non_absolute_children: Vec::new(),
        static_index: HashMap::new(),
        static_index_ci: HashMap::new(),
        dynamic_children: Vec::new(),
        slash_child: None,
        param_meta,
        static_path: None,
        forward_to: None,
        default_params: Params::new(),
        encode_params: None,
        decode_params: None,
        extras: HashMap::new(),
    }
}

struct Builder {
    nodes: Vec<RouteNode>,
    by_name: HashMap<String, NodeId>,
    absolute_paths: HashSet<String>,
    name_grammar: Regex,
}

impl Builder {
    fn add(&mut self, definition: RouteDefinition, parent: NodeId) -> Result<(), RouteTreeError> {
        let RouteDefinition {
            name,
            path,
            children,
            default_params,
            forward_to,
            encode_params,
            decode_params,
            extras,
        } = definition;

        if name.len() > MAX_NAME_LEN || !self.name_grammar.is_match(&name) {
            return Err(RouteTreeError::InvalidName { name });
        }

        // Dot notation resolves against the enclosing parent; every
        // intermediate segment must already exist.
        let (attach_to, segment_name) = if name.starts_with("@@") {
            (parent, name.clone())
        } else {
            let mut current = parent;
            let parts: Vec<&str> = name.split('.').collect();
            for part in &parts[..parts.len() - 1] {
                current = self
                    .find_child(current, part)
                    .ok_or_else(|| RouteTreeError::MissingParent { name: name.clone() })?;
            }
            (current, parts[parts.len() - 1].to_owned())
        };

        let full_name = if self.nodes[attach_to].full_name.is_empty() {
            segment_name.clone()
        } else {
            format!("{}.{}", self.nodes[attach_to].full_name, segment_name)
        };

        if self.by_name.contains_key(&full_name) {
            return Err(RouteTreeError::DuplicateName { name: full_name });
        }

        self.validate_path(&full_name, &path, attach_to)?;
        let absolute = path.starts_with('~');
        let pattern = PathPattern::parse(if absolute { &path[1..] } else { &path })?;
        let param_meta = ParamMeta::from_pattern(&pattern);

        if absolute {
            let stripped = path[1..].to_owned();
            if !self.absolute_paths.insert(stripped) {
                return Err(RouteTreeError::DuplicatePath {
                    parent: "~".to_owned(),
                    path,
                });
            }
        }

        trace!(" adding route `{}` with path `{}`", full_name, path);

        let id = self.nodes.len();
        self.nodes.push(RouteNode {
            id,
            parent: Some(attach_to),
            segment_name,
            full_name: full_name.clone(),
            raw_path: path,
            absolute,
            pattern,
            children: Vec::new(),
            non_absolute_children: Vec::new(),
            static_index: HashMap::new(),
            static_index_ci: HashMap::new(),
            dynamic_children: Vec::new(),
            slash_child: None,
            param_meta,
            static_path: None,
            forward_to,
            default_params,
            encode_params,
            decode_params,
            extras,
        });
        self.nodes[attach_to].children.push(id);
        self.by_name.insert(full_name, id);

        for child in children {
            self.add(child, id)?;
        }
        Ok(())
    }

    fn find_child(&self, parent: NodeId, segment: &str) -> Option<NodeId> {
        self.nodes[parent]
            .children
            .iter()
            .copied()
            .find(|&id| self.nodes[id].segment_name == segment)
    }

    fn validate_path(
        &self,
        full_name: &str,
        path: &str,
        parent: NodeId,
    ) -> Result<(), RouteTreeError> {
        let invalid = |reason: &str| RouteTreeError::InvalidPath {
            name: full_name.to_owned(),
            path: path.to_owned(),
            reason: reason.to_owned(),
        };

        if path.is_empty() {
            return Err(invalid("path must not be empty"));
        }
        if path.chars().any(char::is_whitespace) {
            return Err(invalid("path must not contain whitespace"));
        }
        if path.contains("//") {
            return Err(invalid("path must not contain `//`"));
        }

        let absolute = path.starts_with('~');
        if absolute && !path.starts_with("~/") {
            return Err(invalid("absolute paths must begin with `~/`"));
        }
        if parent == 0 && !absolute && !path.starts_with('/') {
            return Err(invalid("top-level paths must begin with `/` or `~/`"));
        }

        if absolute {
            let mut ancestor = Some(parent);
            while let Some(id) = ancestor {
                let node = &self.nodes[id];
                if node.param_meta.path_param_names().next().is_some() {
                    return Err(RouteTreeError::AbsoluteUnderParams {
                        parent: node.full_name.clone(),
                        path: path.to_owned(),
                    });
                }
                ancestor = node.parent;
            }
        }

        if self.nodes[parent]
            .children
            .iter()
            .any(|&id| self.nodes[id].raw_path == path)
        {
            return Err(RouteTreeError::DuplicatePath {
                parent: self.nodes[parent].full_name.clone(),
                path: path.to_owned(),
            });
        }

        Ok(())
    }

    /// Reorders every node's children by routing priority. The sort is
    /// stable, so definition order breaks remaining ties.
    fn sort_children(&mut self) {
        for id in 0..self.nodes.len() {
            let mut children = self.nodes[id].children.clone();
            let keys: HashMap<NodeId, SortKey> = children
                .iter()
                .map(|&c| (c, SortKey::of(&self.nodes[c])))
                .collect();
            children.sort_by(|a, b| SortKey::cmp(&keys[a], &keys[b]));
            self.nodes[id].children = children;
        }
    }

    /// Fills in the per-node caches: static paths, the static-prefix
    /// index, the dynamic fall-back list and slash children. Parents are
    /// created before children, so a single ascending pass suffices for
    /// the chain-derived values.
    fn compute_caches(&mut self) {
        self.nodes[0].static_path = Some(String::new());

        for id in 1..self.nodes.len() {
            let static_path = {
                let node = &self.nodes[id];
                let parent_path = node
                    .parent
                    .and_then(|p| self.nodes[p].static_path.clone());
                match parent_path {
                    Some(prefix) if node.pattern.is_static() => {
                        if node.absolute {
                            Some(node.pattern.path().to_owned())
                        } else {
                            Some(join_paths(&prefix, node.pattern.path()))
                        }
                    }
                    _ => None,
                }
            };
            self.nodes[id].static_path = static_path;
        }

        for id in 0..self.nodes.len() {
            let mut non_absolute = Vec::new();
            let mut static_index: HashMap<String, Vec<NodeId>> = HashMap::new();
            let mut static_index_ci: HashMap<String, Vec<NodeId>> = HashMap::new();
            let mut dynamic = Vec::new();
            let mut slash_child = None;

            for &child_id in &self.nodes[id].children {
                let child = &self.nodes[child_id];
                if child.pattern.path() == "/" && slash_child.is_none() {
                    slash_child = Some(child_id);
                }
                if child.absolute {
                    continue;
                }
                non_absolute.push(child_id);
                match first_static_segment(child.pattern.tokens()) {
                    Some(segment) => {
                        static_index_ci
                            .entry(segment.to_lowercase())
                            .or_default()
                            .push(child_id);
                        static_index.entry(segment).or_default().push(child_id);
                    }
                    None => dynamic.push(child_id),
                }
            }

            let node = &mut self.nodes[id];
            node.non_absolute_children = non_absolute;
            node.static_index = static_index;
            node.static_index_ci = static_index_ci;
            node.dynamic_children = dynamic;
            node.slash_child = slash_child;
        }
    }
}

/// Joins a parent prefix and a child pattern, collapsing the doubled
/// slash where both sides contribute one.
pub(crate) fn join_paths(prefix: &str, next: &str) -> String {
    if prefix.is_empty() {
        next.to_owned()
    } else if prefix.ends_with('/') && next.starts_with('/') {
        format!("{}{}", prefix, &next[1..])
    } else {
        format!("{}{}", prefix, next)
    }
}

/// The literal first segment of a pattern, when it is fully static.
fn first_static_segment(tokens: &[Token]) -> Option<String> {
    let mut literal = String::new();
    let mut seen_delimiter = false;
    for token in tokens {
        match token {
            Token::Delimiter => {
                if seen_delimiter || !literal.is_empty() {
                    break;
                }
                seen_delimiter = true;
            }
            Token::Fragment(text) => literal.push_str(text),
            Token::SubDelimiter(c) => literal.push(*c),
            Token::Query { .. } => break,
            // A parameter inside the first segment makes it dynamic.
            _ => return None,
        }
    }
    if literal.is_empty() {
        None
    } else {
        Some(literal)
    }
}

/// Routing priority of one child pattern.
struct SortKey {
    slash_only: bool,
    has_splat: bool,
    segment_count: usize,
    param_count: usize,
    last_segment_len: usize,
}

impl SortKey {
    fn of(node: &RouteNode) -> Self {
        let clean = clean_path(node.pattern.tokens());
        let segments: Vec<&str> = clean.split('/').filter(|s| !s.is_empty()).collect();
        SortKey {
            slash_only: clean == "/",
            has_splat: !node.param_meta.splat_params().is_empty(),
            segment_count: segments.len(),
            param_count: node.param_meta.url_params().len()
                + node.param_meta.splat_params().len(),
            last_segment_len: segments.last().map_or(0, |s| s.len()),
        }
    }

    fn cmp(a: &SortKey, b: &SortKey) -> Ordering {
        if a.slash_only != b.slash_only {
            return if a.slash_only {
                Ordering::Greater
            } else {
                Ordering::Less
            };
        }
        if a.has_splat != b.has_splat {
            return if a.has_splat {
                Ordering::Greater
            } else {
                Ordering::Less
            };
        }
        b.segment_count
            .cmp(&a.segment_count)
            .then(a.param_count.cmp(&b.param_count))
            .then(b.last_segment_len.cmp(&a.last_segment_len))
    }
}

/// The pattern path with constraint bodies, optional markers and the
/// query tail stripped.
fn clean_path(tokens: &[Token]) -> String {
    let mut out = String::new();
    for token in tokens {
        match token {
            Token::Delimiter => out.push('/'),
            Token::Fragment(text) => out.push_str(text),
            Token::SubDelimiter(c) => out.push(*c),
            Token::UrlParam { name, .. } => {
                out.push(':');
                out.push_str(name);
            }
            Token::Splat { name } => {
                out.push('*');
                out.push_str(name);
            }
            Token::Matrix { name } => {
                out.push(';');
                out.push_str(name);
            }
            Token::Query { .. } => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::RouteTree;

    fn tree(defs: Vec<RouteDefinition>) -> RouteTree {
        RouteTree::new(defs).unwrap()
    }

    #[test]
    fn dot_notation_attaches_to_existing_parents() {
        let t = tree(vec![
            RouteDefinition::new("users", "/users"),
            RouteDefinition::new("users.profile", "/:id"),
        ]);
        let node = t.route("users.profile").unwrap();
        assert_eq!(node.segment_name(), "profile");
        assert_eq!(node.path(), "/:id");
    }

    #[test]
    fn missing_parent_is_rejected() {
        let err = RouteTree::new(vec![RouteDefinition::new("users.profile", "/:id")])
            .err()
            .unwrap();
        assert!(matches!(err, RouteTreeError::MissingParent { .. }));
    }

    #[test]
    fn invalid_names_are_rejected() {
        for name in &["", ".users", "users..profile", "-users", "a b"] {
            let err = RouteTree::new(vec![RouteDefinition::new(*name, "/x")])
                .err()
                .unwrap();
            assert!(matches!(err, RouteTreeError::InvalidName { .. }), "{}", name);
        }
    }

    #[test]
    fn system_names_are_accepted() {
        let t = tree(vec![RouteDefinition::new("@@not-found", "/404")]);
        assert!(t.has_route("@@not-found"));
    }

    #[test]
    fn path_rules_are_enforced() {
        for path in &["", "with space", "/a//b", "~admin", "relative"] {
            let err = RouteTree::new(vec![RouteDefinition::new("r", *path)])
                .err()
                .unwrap();
            assert!(matches!(err, RouteTreeError::InvalidPath { .. }), "{}", path);
        }
    }

    #[test]
    fn duplicate_names_and_paths_are_rejected() {
        let err = RouteTree::new(vec![
            RouteDefinition::new("a", "/a"),
            RouteDefinition::new("a", "/b"),
        ])
        .err()
        .unwrap();
        assert!(matches!(err, RouteTreeError::DuplicateName { .. }));

        let err = RouteTree::new(vec![
            RouteDefinition::new("a", "/same"),
            RouteDefinition::new("b", "/same"),
        ])
        .err()
        .unwrap();
        assert!(matches!(err, RouteTreeError::DuplicatePath { .. }));
    }

    #[test]
    fn absolute_routes_cannot_hang_below_parameters() {
        let err = RouteTree::new(vec![RouteDefinition::new("users", "/users/:id")
            .child(RouteDefinition::new("admin", "~/admin"))])
        .err()
        .unwrap();
        assert!(matches!(err, RouteTreeError::AbsoluteUnderParams { .. }));
    }

    #[test]
    fn slash_sibling_sorts_last() {
        let t = tree(vec![RouteDefinition::new("parent", "/parent")
            .child(RouteDefinition::new("index", "/"))
            .child(RouteDefinition::new("detail", "/detail"))
            .child(RouteDefinition::new("item", "/:id"))]);
        let parent = t.route("parent").unwrap();
        let order: Vec<&str> = parent
            .children
            .iter()
            .map(|&id| t.node(id).segment_name())
            .collect();
        assert_eq!(order, vec!["detail", "item", "index"]);
    }

    #[test]
    fn splats_sort_after_non_splats() {
        let t = tree(vec![
            RouteDefinition::new("files", "/files/*path"),
            RouteDefinition::new("file", "/files/latest"),
        ]);
        let root = t.node(0);
        let order: Vec<&str> = root
            .children
            .iter()
            .map(|&id| t.node(id).segment_name())
            .collect();
        assert_eq!(order, vec!["file", "files"]);
    }

    #[test]
    fn static_paths_are_precomputed_for_parameterless_chains() {
        let t = tree(vec![
            RouteDefinition::new("about", "/about")
                .child(RouteDefinition::new("team", "/team")),
            RouteDefinition::new("users", "/users")
                .child(RouteDefinition::new("profile", "/:id")),
        ]);
        assert_eq!(t.route("about.team").unwrap().static_path(), Some("/about/team"));
        assert_eq!(t.route("users.profile").unwrap().static_path(), None);
    }

    #[test]
    fn static_index_separates_dynamic_children() {
        let t = tree(vec![
            RouteDefinition::new("users", "/users"),
            RouteDefinition::new("item", "/:id"),
        ]);
        let root = t.node(0);
        assert!(root.static_index.contains_key("users"));
        assert_eq!(root.dynamic_children.len(), 1);
    }
}
