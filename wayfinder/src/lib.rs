//! Wayfinder &ndash; a named-route URL router.
//!
//! The crate compiles a tree of named route patterns into matching and
//! building machinery, matches incoming URLs to routes (extracting URL
//! and query parameters), renders URLs from route names and parameter
//! maps, and orchestrates state-based navigation through a pipeline of
//! user-supplied guards, middlewares and plugins, with cancellation and
//! redirects.
//!
//! ```rust
//! use wayfinder::{Params, RouteDefinition, Router};
//!
//! let router = Router::new(vec![
//!     RouteDefinition::new("home", "/"),
//!     RouteDefinition::new("users", "/users")
//!         .child(RouteDefinition::new("profile", "/:id")),
//! ])
//! .unwrap();
//!
//! let state = router.match_path("/users/42", None).unwrap();
//! assert_eq!(state.name, "users.profile");
//!
//! let mut params = Params::new();
//! params.insert("id", "42");
//! assert_eq!(router.build_path("users.profile", &params).unwrap(), "/users/42");
//! ```
#![warn(missing_docs, deprecated)]
#![doc(test(no_crate_inject, attr(deny(warnings))))]

pub mod helpers;
pub mod matcher;
pub mod observer;
pub mod params;
pub mod path;
pub mod query;
pub mod router;
pub mod tree;

pub use crate::helpers::percent::ParamEncoding;
pub use crate::matcher::{MatchOptions, MatchResult, Matcher, QueryParamsMode};
pub use crate::observer::{StateChange, StateStream};
pub use crate::params::{ParamKind, ParamValue, Params};
pub use crate::path::{PathBuildError, PathPattern, PatternError, Token};
pub use crate::query::{ArrayFormat, FormUrlCodec, NullFormat, QueryCodec, QueryParamsOptions};
pub use crate::router::dependencies::Dependencies;
pub use crate::router::error::NavigationError;
pub use crate::router::events::{RouterEvent, TransitionEvent};
pub use crate::router::navigation::{Navigation, NavigationResult};
pub use crate::router::options::RouterOptions;
pub use crate::router::plugin::Plugin;
pub use crate::router::state::{NavigationOptions, NavigationSource, State, StateMeta};
pub use crate::router::transition::{
    always, Decision, TransitionContext, TransitionFn, TransitionOutcome,
};
pub use crate::router::{
    GuardHandle, ListenerHandle, MiddlewareHandle, PluginHandle, Router, FORWARD_LIMIT,
    UNKNOWN_ROUTE,
};
pub use crate::tree::{
    ParamMeta, PathOptions, RouteDefinition, RouteNode, RouteTree, RouteTreeError,
    TreeBuildOptions,
};
