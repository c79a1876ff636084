//! Defines the callback types running inside a transition.

use std::any::Any;
use std::rc::Rc;
use std::sync::Arc;

use futures_util::future::LocalBoxFuture;

use crate::router::dependencies::DependencySnapshot;
use crate::router::state::{NavigationOptions, State};
use crate::router::Router;

/// What a guard or middleware decided.
#[derive(Clone, Debug)]
pub enum Decision {
    /// Proceed with the transition.
    Allow,
    /// Abort the transition as not allowed.
    Deny,
    /// Abort the transition and begin a new one to this state.
    Redirect(State),
}

/// A handler's result: a decision, or a failure message surfaced through
/// the error events.
pub type TransitionResult = Result<Decision, String>;

/// A handler's return value, either immediate or suspended.
pub enum TransitionOutcome {
    /// The decision is available now.
    Ready(TransitionResult),
    /// The decision resolves later; the pipeline suspends until it does.
    Pending(LocalBoxFuture<'static, TransitionResult>),
}

impl TransitionOutcome {
    /// An immediate `Allow`.
    pub fn allow() -> Self {
        TransitionOutcome::Ready(Ok(Decision::Allow))
    }

    /// An immediate `Deny`.
    pub fn deny() -> Self {
        TransitionOutcome::Ready(Ok(Decision::Deny))
    }

    /// An immediate redirect to `state`.
    pub fn redirect(state: State) -> Self {
        TransitionOutcome::Ready(Ok(Decision::Redirect(state)))
    }

    /// An immediate failure.
    pub fn fail<M: Into<String>>(message: M) -> Self {
        TransitionOutcome::Ready(Err(message.into()))
    }
}

/// A guard or middleware body: invoked once per transition with the
/// transition's context.
pub type TransitionFn = dyn Fn(TransitionContext) -> TransitionOutcome;

/// Produces a [`TransitionFn`] when registered and again for every clone
/// of the router.
pub type HandlerFactory = dyn Fn(&Router) -> Box<TransitionFn>;

/// The constant guards: `always(true)` allows every transition,
/// `always(false)` denies every transition.
pub fn always(allow: bool) -> impl Fn(&Router) -> Box<TransitionFn> {
    move |_router: &Router| {
        let decision: Box<TransitionFn> = Box::new(move |_ctx| {
            if allow {
                TransitionOutcome::allow()
            } else {
                TransitionOutcome::deny()
            }
        });
        decision
    }
}

/// Everything a handler may inspect while running: the two states, the
/// navigation options and a snapshot of the dependency container.
#[derive(Clone)]
pub struct TransitionContext {
    /// The state being transitioned to.
    pub to_state: Arc<State>,
    /// The state being transitioned from, absent on the initial
    /// transition.
    pub from_state: Option<Arc<State>>,
    /// Options of the running navigation.
    pub options: NavigationOptions,
    deps: DependencySnapshot,
}

impl TransitionContext {
    pub(crate) fn new(
        to_state: Arc<State>,
        from_state: Option<Arc<State>>,
        options: NavigationOptions,
        deps: DependencySnapshot,
    ) -> Self {
        TransitionContext {
            to_state,
            from_state,
            options,
            deps,
        }
    }

    /// A dependency by name, downcast to `T`.
    pub fn dependency<T: 'static>(&self, name: &str) -> Option<Rc<T>> {
        self.deps.get_as(name)
    }

    /// A dependency by name, untyped.
    pub fn raw_dependency(&self, name: &str) -> Option<Rc<dyn Any>> {
        self.deps.get(name)
    }

    /// True when a dependency exists under `name`.
    pub fn has_dependency(&self, name: &str) -> bool {
        self.deps.has(name)
    }
}
