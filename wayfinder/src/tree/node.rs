//! Defines the arena-allocated node type backing a route tree.

use std::collections::HashMap;
use std::sync::Arc;

use crate::params::{ParamKind, ParamValue, Params};
use crate::path::{ConstraintRegex, PathPattern};

/// Index of a node within its tree's arena.
pub type NodeId = usize;

/// A params-to-params transform attached to a route definition.
pub type ParamsMapper = Arc<dyn Fn(Params) -> Params + Send + Sync>;

/// Per-route parameter metadata, shared by building and matching.
#[derive(Clone, Debug)]
pub struct ParamMeta {
    url_params: Vec<String>,
    splat_params: Vec<String>,
    query_params: Vec<String>,
    kinds: HashMap<String, ParamKind>,
    constraints: HashMap<String, ConstraintRegex>,
    path: String,
}

impl ParamMeta {
    pub(crate) fn from_pattern(pattern: &PathPattern) -> Self {
        let mut kinds = HashMap::new();
        for name in pattern.url_params() {
            kinds.insert(name.clone(), ParamKind::Url);
        }
        for name in pattern.splat_params() {
            kinds.insert(name.clone(), ParamKind::Url);
        }
        for name in pattern.query_params() {
            kinds.insert(name.clone(), ParamKind::Query);
        }
        ParamMeta {
            url_params: pattern.url_params().to_vec(),
            splat_params: pattern.splat_params().to_vec(),
            query_params: pattern.query_params().to_vec(),
            kinds,
            constraints: pattern.constraints().clone(),
            path: pattern.path().to_owned(),
        }
    }

    /// URL parameter names in pattern order (matrix parameters included).
    pub fn url_params(&self) -> &[String] {
        &self.url_params
    }

    /// Splat parameter names.
    pub fn splat_params(&self) -> &[String] {
        &self.splat_params
    }

    /// Declared query parameter names.
    pub fn query_params(&self) -> &[String] {
        &self.query_params
    }

    /// Whether `name` binds in the path or the query.
    pub fn kind_of(&self, name: &str) -> Option<ParamKind> {
        self.kinds.get(name).copied()
    }

    /// Compiled constraint for `name`, default constraints included.
    pub fn constraint(&self, name: &str) -> Option<&ConstraintRegex> {
        self.constraints.get(name)
    }

    /// The plain path pattern, query suffix stripped.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// True when the route binds no parameters of any kind.
    pub fn is_static(&self) -> bool {
        self.url_params.is_empty()
            && self.splat_params.is_empty()
            && self.query_params.is_empty()
    }

    /// Names bound in the path portion: URL, matrix and splat parameters.
    pub(crate) fn path_param_names(&self) -> impl Iterator<Item = &str> {
        self.url_params
            .iter()
            .chain(self.splat_params.iter())
            .map(String::as_str)
    }

    /// Every name the route binds, path and query alike.
    pub(crate) fn all_param_names(&self) -> impl Iterator<Item = &str> {
        self.path_param_names()
            .chain(self.query_params.iter().map(String::as_str))
    }
}

/// One route in the frozen tree.
///
/// Nodes refer to relatives through arena indices; the tree owns every
/// node and no reference cycles exist.
pub struct RouteNode {
    pub(crate) id: NodeId,
    pub(crate) parent: Option<NodeId>,
    pub(crate) segment_name: String,
    pub(crate) full_name: String,
    pub(crate) raw_path: String,
    pub(crate) absolute: bool,
    pub(crate) pattern: PathPattern,
    pub(crate) children: Vec<NodeId>,
    pub(crate) non_absolute_children: Vec<NodeId>,
    pub(crate) static_index: HashMap<String, Vec<NodeId>>,
    pub(crate) static_index_ci: HashMap<String, Vec<NodeId>>,
    pub(crate) dynamic_children: Vec<NodeId>,
    pub(crate) slash_child: Option<NodeId>,
    pub(crate) param_meta: ParamMeta,
    pub(crate) static_path: Option<String>,
    pub(crate) forward_to: Option<String>,
    pub(crate) default_params: Params,
    pub(crate) encode_params: Option<ParamsMapper>,
    pub(crate) decode_params: Option<ParamsMapper>,
    pub(crate) extras: HashMap<String, ParamValue>,
}

impl RouteNode {
    /// The last segment of the route's name.
    pub fn segment_name(&self) -> &str {
        &self.segment_name
    }

    /// The dot-joined name from the root, e.g. `users.profile`.
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// The pattern as defined, absolute marker included.
    pub fn path(&self) -> &str {
        &self.raw_path
    }

    /// True when the pattern was defined with a `~/` prefix.
    pub fn is_absolute(&self) -> bool {
        self.absolute
    }

    /// Parameter metadata for this route alone.
    pub fn param_meta(&self) -> &ParamMeta {
        &self.param_meta
    }

    /// Precomputed full URL from the root, present only when the whole
    /// root-to-node chain binds no parameters.
    pub fn static_path(&self) -> Option<&str> {
        self.static_path.as_deref()
    }

    /// Name of the route this one forwards to, if any.
    pub fn forward_to(&self) -> Option<&str> {
        self.forward_to.as_deref()
    }

    /// Parameters merged into states when absent from the input.
    pub fn default_params(&self) -> &Params {
        &self.default_params
    }

    /// Unrecognised definition fields, preserved verbatim.
    pub fn extras(&self) -> &HashMap<String, ParamValue> {
        &self.extras
    }

    pub(crate) fn pattern(&self) -> &PathPattern {
        &self.pattern
    }
}
