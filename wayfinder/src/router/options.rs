//! Router-wide options.

use crate::helpers::percent::ParamEncoding;
use crate::matcher::{MatchOptions, QueryParamsMode};
use crate::params::Params;
use crate::query::QueryParamsOptions;
use crate::tree::PathOptions;

/// Options governing a router instance.
///
/// Everything here can be read back through
/// [`Router::options`](crate::router::Router::options) and adjusted with
/// [`Router::set_options`](crate::router::Router::set_options).
#[derive(Clone, Debug, Default)]
pub struct RouterOptions {
    /// Route navigated to by `start()` without an initial target and by
    /// `navigate_to_default`.
    pub default_route: Option<String>,
    /// Parameters applied to the default route.
    pub default_params: Params,
    /// Require URLs' trailing slashes to agree with patterns.
    pub strict_trailing_slash: bool,
    /// Handling of undeclared query parameters while matching.
    pub query_params_mode: QueryParamsMode,
    /// Match the path portion case-sensitively.
    pub case_sensitive: bool,
    /// Copy undeclared query parameters into matched params under the
    /// default/loose modes.
    pub keep_unknown_query_params: bool,
    /// Synthesise the unknown-route state instead of failing when a
    /// start URL does not match.
    pub allow_not_found: bool,
    /// Encoding strategy for URL parameter values.
    pub url_params_encoding: ParamEncoding,
    /// Passed through to the query codec unchanged.
    pub query_params: QueryParamsOptions,
}

impl RouterOptions {
    pub(crate) fn match_options(&self) -> MatchOptions {
        MatchOptions {
            strict_trailing_slash: self.strict_trailing_slash,
            query_params_mode: self.query_params_mode,
            case_sensitive: self.case_sensitive,
            keep_unknown_query_params: self.keep_unknown_query_params,
            encoding: self.url_params_encoding,
            query_options: self.query_params,
        }
    }

    pub(crate) fn path_options(&self) -> PathOptions {
        PathOptions {
            ignore_constraints: false,
            ignore_search: false,
            encoding: self.url_params_encoding,
            query_options: self.query_params,
        }
    }
}
