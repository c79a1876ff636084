//! The transition pipeline: target resolution, guard and middleware
//! stages, cancellation and commit.

use std::cell::Cell;
use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::pin::Pin;
use std::rc::{Rc, Weak};
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_util::future::{LocalBoxFuture, Shared};
use futures_util::FutureExt;
use log::trace;

use crate::params::Params;
use crate::router::error::NavigationError;
use crate::router::state::{NavigationOptions, NavigationSource, State, StateMeta};
use crate::router::transition::{Decision, TransitionContext, TransitionFn, TransitionOutcome};
use crate::router::{Lifecycle, Router, RouterInner};
use crate::tree::RouteTree;

/// How a finished navigation resolves.
pub type NavigationResult = Result<Arc<State>, NavigationError>;

pub(crate) type SharedNavigation = Shared<LocalBoxFuture<'static, NavigationResult>>;

/// Cooperative cancellation flag shared between a pending transition and
/// every handle pointing at it.
#[derive(Clone)]
pub(crate) struct CancelToken {
    flag: Rc<Cell<bool>>,
    router: Weak<RouterInner>,
    target: Arc<State>,
}

impl CancelToken {
    fn new(router: &Rc<RouterInner>, target: Arc<State>) -> Self {
        CancelToken {
            flag: Rc::new(Cell::new(false)),
            router: Rc::downgrade(router),
            target,
        }
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.flag.get()
    }

    pub(crate) fn same_flag(&self, other: &CancelToken) -> bool {
        Rc::ptr_eq(&self.flag, &other.flag)
    }

    /// Flags the transition as cancelled and publishes `$$cancel`. The
    /// pipeline observes the flag at its next stage boundary. Cancelling
    /// a transition that already committed, failed or was superseded is
    /// a no-op.
    pub(crate) fn cancel(&self) {
        if self.flag.get() {
            return;
        }
        if let Some(inner) = self.router.upgrade() {
            let is_pending = inner
                .pending
                .borrow()
                .as_ref()
                .map_or(false, |p| p.token.same_flag(self));
            if !is_pending {
                return;
            }
            self.flag.set(true);
            inner.finish_cancelled(self, &self.target);
        }
    }
}

/// A pending transition registered on the router.
pub(crate) struct PendingTransition {
    pub(crate) target: Arc<State>,
    pub(crate) token: CancelToken,
    pub(crate) shared: SharedNavigation,
}

/// A handle to a navigation in flight.
///
/// Awaiting it yields the transition's result; callers which share a
/// target receive handles backed by the same underlying computation.
/// Dropping the handle does not cancel the transition; `cancel` does.
pub struct Navigation {
    result: SharedNavigation,
    token: Option<CancelToken>,
}

impl Navigation {
    pub(crate) fn completed(result: NavigationResult) -> Self {
        Navigation {
            result: futures_util::future::ready(result).boxed_local().shared(),
            token: None,
        }
    }

    pub(crate) fn in_flight(result: SharedNavigation, token: CancelToken) -> Self {
        Navigation {
            result,
            token: Some(token),
        }
    }

    /// Cancels the transition this handle points at. Safe to call more
    /// than once; completed transitions ignore it.
    pub fn cancel(&self) {
        if let Some(token) = &self.token {
            token.cancel();
        }
    }
}

impl Future for Navigation {
    type Output = NavigationResult;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.get_mut().result).poll(cx)
    }
}

/// Entry point used by `Router::navigate` and the redirect machinery.
pub(crate) fn navigate(
    router: &Router,
    name: &str,
    params: Params,
    options: NavigationOptions,
    redirected: bool,
    source_route: Option<String>,
) -> Navigation {
    let inner = &router.inner;

    match inner.lifecycle.get() {
        Lifecycle::Started | Lifecycle::Transitioning => {}
        _ => return Navigation::completed(Err(NavigationError::NotStarted)),
    }

    let target = match build_target(router, name, params, &options, redirected, source_route) {
        Ok(state) => Arc::new(state),
        Err(error) => {
            inner.emit_error(None, inner.current_state(), &error);
            return Navigation::completed(Err(error));
        }
    };
    let from = inner.current_state();

    // Same-state short-circuit: no events, the current state is the
    // result.
    if let Some(current) = &from {
        if !options.forces_transition() && router.are_states_equal(current, &target, false) {
            trace!(" same-state navigation to `{}` short-circuits", target.name);
            return Navigation::completed(Ok(Arc::clone(current)));
        }
    }

    // Single-flight dedupe: a concurrent navigation to the same target
    // shares the pending computation.
    {
        let pending = inner.pending.borrow();
        if let Some(p) = pending.as_ref() {
            if router.are_states_equal(&p.target, &target, false) {
                trace!(" joining in-flight navigation to `{}`", target.name);
                return Navigation::in_flight(p.shared.clone(), p.token.clone());
            }
        }
    }

    // A newer navigation preempts the one in flight.
    let preempted = inner.pending.borrow().as_ref().map(|p| p.token.clone());
    if let Some(token) = preempted {
        token.cancel();
    }

    inner.lifecycle.set(Lifecycle::Transitioning);
    inner.emit_transition_start(&target, from.as_ref(), &options);

    let token = CancelToken::new(inner, Arc::clone(&target));
    let shared = {
        let inner = Rc::clone(inner);
        let router = router.handle();
        let target = Arc::clone(&target);
        let from = from.clone();
        let options = options.clone();
        let token = token.clone();
        async move { run(inner, router, target, from, options, token).await }
            .boxed_local()
            .shared()
    };

    *inner.pending.borrow_mut() = Some(PendingTransition {
        target,
        token: token.clone(),
        shared: shared.clone(),
    });

    Navigation::in_flight(shared, token)
}

/// Resolves the target state for a navigation: forward chains followed,
/// defaults merged, path rendered, meta attached.
fn build_target(
    router: &Router,
    name: &str,
    params: Params,
    options: &NavigationOptions,
    redirected: bool,
    source_route: Option<String>,
) -> Result<State, NavigationError> {
    let (resolved, merged) = router.forward_state(name, params)?;
    let source_route = source_route.or_else(|| {
        if resolved != name {
            Some(name.to_owned())
        } else {
            None
        }
    });

    let inner = &router.inner;
    let path = inner.tree.build_path(
        &resolved,
        &merged,
        &inner.options.borrow().path_options(),
        inner.codec.as_ref(),
    )?;

    // A followed forward chain counts as a redirect for observers.
    let redirected = redirected || source_route.is_some();
    let meta = StateMeta {
        params: merged.clone(),
        options: options.clone(),
        redirected,
        source: options.source.or(Some(NavigationSource::Programmatic)),
        source_route,
    };
    Ok(router.make_state(&resolved, merged, &path, Some(meta), None))
}

enum StageEnd {
    Commit,
    Redirected(Navigation),
}

async fn run(
    inner: Rc<RouterInner>,
    router: Router,
    to: Arc<State>,
    from: Option<Arc<State>>,
    options: NavigationOptions,
    token: CancelToken,
) -> NavigationResult {
    let staged = run_stages(&inner, &router, &to, &from, &options, &token).await;
    match staged {
        Ok(StageEnd::Commit) => {
            if token.is_cancelled() {
                return Err(NavigationError::Cancelled);
            }
            inner.clear_pending_for(&token);
            inner.commit(Arc::clone(&to), from, &options);
            Ok(to)
        }
        Ok(StageEnd::Redirected(navigation)) => navigation.await,
        Err(NavigationError::Cancelled) => Err(NavigationError::Cancelled),
        Err(error) => {
            inner.clear_pending_for(&token);
            inner.lifecycle.set(Lifecycle::Started);
            inner.emit_error(Some(Arc::clone(&to)), from, &error);
            Err(error)
        }
    }
}

async fn run_stages(
    inner: &Rc<RouterInner>,
    router: &Router,
    to: &Arc<State>,
    from: &Option<Arc<State>>,
    options: &NavigationOptions,
    token: &CancelToken,
) -> Result<StageEnd, NavigationError> {
    let ctx = TransitionContext::new(
        Arc::clone(to),
        from.clone(),
        options.clone(),
        inner.dependencies.snapshot(),
    );
    let (to_deactivate, to_activate) =
        transition_path(&inner.tree, to, from.as_deref(), options);

    if !options.skips_deactivation() {
        for segment in to_deactivate {
            if token.is_cancelled() {
                return Err(NavigationError::Cancelled);
            }
            let guard = inner.registry.deactivation_guard(&segment);
            if let Some(guard) = guard {
                trace!(" running canDeactivate for `{}`", segment);
                let decision = invoke(guard, ctx.clone()).await;
                if token.is_cancelled() {
                    // Late results of a cancelled transition are dropped.
                    return Err(NavigationError::Cancelled);
                }
                match decision.map_err(|message| NavigationError::GuardFailed {
                    segment: segment.clone(),
                    message,
                })? {
                    Decision::Allow => {}
                    Decision::Deny => {
                        return Err(NavigationError::NotAllowed { segment });
                    }
                    Decision::Redirect(state) => {
                        return Ok(redirect(inner, router, state, options, token));
                    }
                }
            }
        }
    }

    for segment in to_activate {
        if token.is_cancelled() {
            return Err(NavigationError::Cancelled);
        }
        let guard = inner.registry.activation_guard(&segment);
        if let Some(guard) = guard {
            trace!(" running canActivate for `{}`", segment);
            let decision = invoke(guard, ctx.clone()).await;
            if token.is_cancelled() {
                return Err(NavigationError::Cancelled);
            }
            match decision.map_err(|message| NavigationError::GuardFailed {
                segment: segment.clone(),
                message,
            })? {
                Decision::Allow => {}
                Decision::Deny => {
                    return Err(NavigationError::NotAllowed { segment });
                }
                Decision::Redirect(state) => {
                    return Ok(redirect(inner, router, state, options, token));
                }
            }
        }
    }

    for handler in inner.registry.middleware_handlers() {
        if token.is_cancelled() {
            return Err(NavigationError::Cancelled);
        }
        let decision = invoke(handler, ctx.clone()).await;
        if token.is_cancelled() {
            return Err(NavigationError::Cancelled);
        }
        match decision
            .map_err(|message| NavigationError::MiddlewareFailed { message })?
        {
            Decision::Allow => {}
            Decision::Deny => {
                return Err(NavigationError::NotAllowed {
                    segment: to.name.clone(),
                });
            }
            Decision::Redirect(state) => {
                return Ok(redirect(inner, router, state, options, token));
            }
        }
    }

    Ok(StageEnd::Commit)
}

/// Aborts the running transition quietly and chases the replacement
/// state, marking it as redirected.
fn redirect(
    inner: &Rc<RouterInner>,
    router: &Router,
    state: State,
    options: &NavigationOptions,
    token: &CancelToken,
) -> StageEnd {
    trace!(" transition redirected to `{}`", state.name);
    inner.clear_pending_for(token);
    inner.lifecycle.set(Lifecycle::Started);
    let navigation = navigate(
        router,
        &state.name,
        state.params.clone(),
        options.clone(),
        true,
        None,
    );
    StageEnd::Redirected(navigation)
}

/// Invokes one handler, containing panics from both the synchronous call
/// and any returned future.
async fn invoke(handler: Rc<TransitionFn>, ctx: TransitionContext) -> Result<Decision, String> {
    let outcome = catch_unwind(AssertUnwindSafe(|| handler(ctx)));
    match outcome {
        Err(_) => Err("callback panicked".to_owned()),
        Ok(TransitionOutcome::Ready(result)) => result,
        Ok(TransitionOutcome::Pending(fut)) => match AssertUnwindSafe(fut).catch_unwind().await {
            Ok(result) => result,
            Err(_) => Err("callback panicked".to_owned()),
        },
    }
}

/// Splits the route chains of the two states into the segments to
/// deactivate (leaf to root) and to activate (root to leaf). Segments
/// shared by name and parameters are left untouched unless the
/// navigation reloads.
pub(crate) fn transition_path(
    tree: &RouteTree,
    to: &State,
    from: Option<&State>,
    options: &NavigationOptions,
) -> (Vec<String>, Vec<String>) {
    let to_segments = name_prefixes(&to.name);
    let from_segments = from.map(|f| name_prefixes(&f.name)).unwrap_or_default();

    let mut shared = 0;
    if !options.forces_transition() {
        let limit = to_segments.len().min(from_segments.len());
        while shared < limit && to_segments[shared] == from_segments[shared] {
            let segment = &to_segments[shared];
            let params_agree = match (tree.route(segment), from) {
                (Some(node), Some(from_state)) => to
                    .params
                    .equal_on(&from_state.params, node.param_meta().all_param_names()),
                _ => false,
            };
            if !params_agree {
                break;
            }
            shared += 1;
        }
    }

    let mut to_deactivate: Vec<String> = from_segments[shared.min(from_segments.len())..].to_vec();
    to_deactivate.reverse();
    let to_activate = to_segments[shared.min(to_segments.len())..].to_vec();
    (to_deactivate, to_activate)
}

fn name_prefixes(name: &str) -> Vec<String> {
    if name.starts_with("@@") {
        return vec![name.to_owned()];
    }
    let mut prefixes = Vec::new();
    let mut acc = String::new();
    for part in name.split('.') {
        if !acc.is_empty() {
            acc.push('.');
        }
        acc.push_str(part);
        prefixes.push(acc.clone());
    }
    prefixes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{RouteDefinition, RouteTree};

    fn tree() -> RouteTree {
        RouteTree::new(vec![
            RouteDefinition::new("users", "/users")
                .child(RouteDefinition::new("profile", "/:id"))
                .child(RouteDefinition::new("settings", "/settings")),
            RouteDefinition::new("about", "/about"),
        ])
        .unwrap()
    }

    fn state(name: &str, pairs: &[(&str, &str)]) -> State {
        let mut params = Params::new();
        for (k, v) in pairs {
            params.insert(*k, *v);
        }
        State::new(name, params, "/", 1, None)
    }

    #[test]
    fn shared_prefix_is_left_alone() {
        let tree = tree();
        let from = state("users.profile", &[("id", "1")]);
        let to = state("users.settings", &[]);
        let (deactivate, activate) = transition_path(
            &tree,
            &to,
            Some(&from),
            &NavigationOptions::default(),
        );
        assert_eq!(deactivate, vec!["users.profile"]);
        assert_eq!(activate, vec!["users.settings"]);
    }

    #[test]
    fn changed_parameters_reactivate_the_segment() {
        let tree = tree();
        let from = state("users.profile", &[("id", "1")]);
        let to = state("users.profile", &[("id", "2")]);
        let (deactivate, activate) = transition_path(
            &tree,
            &to,
            Some(&from),
            &NavigationOptions::default(),
        );
        assert_eq!(deactivate, vec!["users.profile"]);
        assert_eq!(activate, vec!["users.profile"]);
    }

    #[test]
    fn reload_reactivates_everything() {
        let tree = tree();
        let from = state("users.profile", &[("id", "1")]);
        let to = state("users.profile", &[("id", "1")]);
        let (deactivate, activate) =
            transition_path(&tree, &to, Some(&from), &NavigationOptions::reload());
        assert_eq!(deactivate, vec!["users.profile", "users"]);
        assert_eq!(activate, vec!["users", "users.profile"]);
    }

    #[test]
    fn initial_transition_activates_the_full_chain() {
        let tree = tree();
        let to = state("users.profile", &[("id", "1")]);
        let (deactivate, activate) =
            transition_path(&tree, &to, None, &NavigationOptions::default());
        assert!(deactivate.is_empty());
        assert_eq!(activate, vec!["users", "users.profile"]);
    }
}
