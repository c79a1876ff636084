//! Navigation-time errors.

use thiserror::Error;

use crate::path::PathBuildError;

/// Why a navigation did not commit.
///
/// Build-time errors ([`RouteTreeError`](crate::tree::RouteTreeError))
/// surface synchronously from the tree builder; everything here is
/// reported through the navigation result and the `$$error` /
/// `$$cancel` events.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum NavigationError {
    /// `navigate` was called before `start`, or after `stop`.
    #[error("router is not started")]
    NotStarted,

    /// `start` was called on a router that is already started.
    #[error("router is already started")]
    AlreadyStarted,

    /// The requested route name does not exist.
    #[error("no route named `{name}`")]
    RouteNotFound {
        /// The unknown name.
        name: String,
    },

    /// A start URL did not match any route.
    #[error("no route matched `{path}`")]
    NoMatch {
        /// The unmatched URL.
        path: String,
    },

    /// `start` was called without a target and no default route is
    /// configured.
    #[error("no default route configured")]
    NoDefaultRoute,

    /// A guard denied the transition.
    #[error("transition to `{segment}` was not allowed")]
    NotAllowed {
        /// The route segment whose guard denied.
        segment: String,
    },

    /// A guard failed or panicked.
    #[error("guard for `{segment}` failed: {message}")]
    GuardFailed {
        /// The route segment whose guard failed.
        segment: String,
        /// The failure message.
        message: String,
    },

    /// A middleware failed or panicked.
    #[error("middleware failed: {message}")]
    MiddlewareFailed {
        /// The failure message.
        message: String,
    },

    /// The transition was preempted by a newer one, or by `stop`.
    #[error("transition cancelled")]
    Cancelled,

    /// A `forward_to` chain did not terminate within the hop limit.
    #[error("forward chain starting at `{name}` exceeded {limit} hops")]
    ForwardChainTooLong {
        /// The route the chain started at.
        name: String,
        /// The hop limit.
        limit: usize,
    },

    /// Rendering the target path failed.
    #[error(transparent)]
    Build(#[from] PathBuildError),
}
