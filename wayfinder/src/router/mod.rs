//! The navigation state machine and its public surface.

pub mod dependencies;
pub mod error;
pub mod events;
pub mod navigation;
pub mod options;
pub mod plugin;
pub(crate) mod registry;
pub mod state;
pub mod transition;

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::{Rc, Weak};
use std::sync::Arc;

use log::{error, trace};

use crate::matcher::Matcher;
use crate::params::Params;
use crate::path::PathBuildError;
use crate::query::{FormUrlCodec, QueryCodec};
use crate::tree::{PathOptions, RouteDefinition, RouteTree, RouteTreeError};

use self::dependencies::Dependencies;
use self::error::NavigationError;
use self::events::{EventBus, RouterEvent, TransitionEvent};
use self::navigation::{CancelToken, Navigation, PendingTransition};
use self::options::RouterOptions;
use self::plugin::{Plugin, PluginFactory};
use self::registry::{GuardSlot, MiddlewareSlot, PluginSlot, Registry};
use self::state::{NavigationOptions, NavigationSource, State, StateMeta};
use self::transition::{HandlerFactory, TransitionFn};

/// Name of the synthetic state used when a start URL matches nothing and
/// `allow_not_found` is set. The matched path travels in the `path`
/// parameter.
pub const UNKNOWN_ROUTE: &str = "@@wayfinder/unknown";

/// Hop limit applied while following `forward_to` chains.
pub const FORWARD_LIMIT: usize = 10;

/// The router's lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Lifecycle {
    Idle,
    Starting,
    Started,
    Transitioning,
    Stopped,
}

pub(crate) struct RouterInner {
    pub(crate) tree: Arc<RouteTree>,
    pub(crate) matcher: RefCell<Matcher>,
    pub(crate) codec: Rc<dyn QueryCodec>,
    pub(crate) options: RefCell<RouterOptions>,
    pub(crate) dependencies: Dependencies,
    pub(crate) registry: Registry,
    pub(crate) events: EventBus,
    pub(crate) lifecycle: Cell<Lifecycle>,
    pub(crate) current: RefCell<Option<Arc<State>>>,
    pub(crate) pending: RefCell<Option<PendingTransition>>,
    next_state_id: Cell<u64>,
}

impl RouterInner {
    pub(crate) fn current_state(&self) -> Option<Arc<State>> {
        self.current.borrow().clone()
    }

    pub(crate) fn next_id(&self) -> u64 {
        let id = self.next_state_id.get();
        self.next_state_id.set(id + 1);
        id
    }

    pub(crate) fn clear_pending_for(&self, token: &CancelToken) {
        let mut pending = self.pending.borrow_mut();
        let matches = pending
            .as_ref()
            .map_or(false, |p| p.token.same_flag(token));
        if matches {
            *pending = None;
        }
    }

    pub(crate) fn emit_transition_start(
        &self,
        to: &Arc<State>,
        from: Option<&Arc<State>>,
        options: &NavigationOptions,
    ) {
        let event = TransitionEvent {
            to_state: Some(Arc::clone(to)),
            from_state: from.cloned(),
            options: options.clone(),
            error: None,
        };
        self.events.emit(RouterEvent::TransitionStart, &event);
        for plugin in self.registry.plugin_instances() {
            contain_hook("onTransitionStart", || {
                plugin.on_transition_start(to, from)
            });
        }
    }

    pub(crate) fn commit(
        &self,
        to: Arc<State>,
        from: Option<Arc<State>>,
        options: &NavigationOptions,
    ) {
        trace!(" transition to `{}` committed", to.name);
        *self.current.borrow_mut() = Some(Arc::clone(&to));
        self.lifecycle.set(Lifecycle::Started);

        let event = TransitionEvent {
            to_state: Some(Arc::clone(&to)),
            from_state: from.clone(),
            options: options.clone(),
            error: None,
        };
        self.events.emit(RouterEvent::TransitionSuccess, &event);
        for plugin in self.registry.plugin_instances() {
            contain_hook("onTransitionSuccess", || {
                plugin.on_transition_success(&to, from.as_ref(), options)
            });
        }
    }

    pub(crate) fn emit_error(
        &self,
        to: Option<Arc<State>>,
        from: Option<Arc<State>>,
        error: &NavigationError,
    ) {
        let event = TransitionEvent {
            to_state: to.clone(),
            from_state: from.clone(),
            options: NavigationOptions::default(),
            error: Some(error.clone()),
        };
        self.events.emit(RouterEvent::TransitionError, &event);
        for plugin in self.registry.plugin_instances() {
            contain_hook("onTransitionError", || {
                plugin.on_transition_error(to.as_ref(), from.as_ref(), error)
            });
        }
    }

    pub(crate) fn finish_cancelled(&self, token: &CancelToken, target: &Arc<State>) {
        trace!(" transition to `{}` cancelled", target.name);
        self.clear_pending_for(token);
        if self.lifecycle.get() == Lifecycle::Transitioning {
            self.lifecycle.set(Lifecycle::Started);
        }
        let from = self.current_state();
        let event = TransitionEvent::states(Some(Arc::clone(target)), from.clone());
        self.events.emit(RouterEvent::TransitionCancel, &event);
        for plugin in self.registry.plugin_instances() {
            contain_hook("onTransitionCancel", || {
                plugin.on_transition_cancel(target, from.as_ref())
            });
        }
    }
}

/// Runs a plugin hook, containing panics so one broken plugin cannot
/// derail the router.
fn contain_hook(name: &str, hook: impl FnOnce()) {
    if catch_unwind(AssertUnwindSafe(hook)).is_err() {
        error!("plugin hook {} panicked; continuing", name);
    }
}

/// What `start` resolves the initial state from.
enum StartTarget {
    Default,
    Path(String),
    State(State),
}

/// A named-route router over a frozen route tree.
///
/// The router is a cheap handle; internals are shared. It is
/// single-threaded: callbacks, events and transitions all run on the
/// caller's thread, and suspensions are driven by whoever awaits the
/// returned [`Navigation`].
pub struct Router {
    pub(crate) inner: Rc<RouterInner>,
}

impl Clone for Router {
    /// Clones the handle; both handles drive the same router. For a
    /// deep clone see [`Router::fork`].
    fn clone(&self) -> Self {
        self.handle()
    }
}

impl Router {
    /// Builds a tree from `routes` and wraps a router around it.
    pub fn new(routes: Vec<RouteDefinition>) -> Result<Self, RouteTreeError> {
        Self::with_options(routes, RouterOptions::default())
    }

    /// Builds a tree from `routes` with explicit options.
    pub fn with_options(
        routes: Vec<RouteDefinition>,
        options: RouterOptions,
    ) -> Result<Self, RouteTreeError> {
        let tree = Arc::new(RouteTree::new(routes)?);
        Ok(Self::with_parts(tree, options, Rc::new(FormUrlCodec)))
    }

    /// Wraps a router around an existing tree, with an injected query
    /// codec.
    pub fn with_parts(
        tree: Arc<RouteTree>,
        options: RouterOptions,
        codec: Rc<dyn QueryCodec>,
    ) -> Self {
        let matcher = Matcher::new(Arc::clone(&tree));
        Router {
            inner: Rc::new(RouterInner {
                tree,
                matcher: RefCell::new(matcher),
                codec,
                options: RefCell::new(options),
                dependencies: Dependencies::new(),
                registry: Registry::new(),
                events: EventBus::new(),
                lifecycle: Cell::new(Lifecycle::Idle),
                current: RefCell::new(None),
                pending: RefCell::new(None),
                next_state_id: Cell::new(1),
            }),
        }
    }

    pub(crate) fn handle(&self) -> Router {
        Router {
            inner: Rc::clone(&self.inner),
        }
    }

    /// The tree this router navigates.
    pub fn tree(&self) -> Arc<RouteTree> {
        Arc::clone(&self.inner.tree)
    }

    // ----- lifecycle -------------------------------------------------

    /// Starts the router at the configured default route.
    pub fn start(&self) -> Result<Arc<State>, NavigationError> {
        self.start_inner(StartTarget::Default)
    }

    /// Starts the router from a URL.
    pub fn start_with_path(&self, path: &str) -> Result<Arc<State>, NavigationError> {
        self.start_inner(StartTarget::Path(path.to_owned()))
    }

    /// Starts the router from a prepared state.
    pub fn start_with_state(&self, state: State) -> Result<Arc<State>, NavigationError> {
        self.start_inner(StartTarget::State(state))
    }

    fn start_inner(&self, target: StartTarget) -> Result<Arc<State>, NavigationError> {
        let inner = &self.inner;
        match inner.lifecycle.get() {
            Lifecycle::Idle | Lifecycle::Stopped | Lifecycle::Starting => {}
            _ => return Err(NavigationError::AlreadyStarted),
        }
        inner.lifecycle.set(Lifecycle::Starting);

        let resolved: Result<Arc<State>, NavigationError> = match target {
            StartTarget::State(state) => Ok(Arc::new(state)),
            StartTarget::Default => self.default_route_state().map(Arc::new),
            StartTarget::Path(path) => match self.match_path(&path, None) {
                Some(state) => Ok(Arc::new(state)),
                None => {
                    let (allow_not_found, has_default) = {
                        let options = inner.options.borrow();
                        (options.allow_not_found, options.default_route.is_some())
                    };
                    if allow_not_found {
                        Ok(Arc::new(self.make_unknown_state(&path)))
                    } else if has_default {
                        self.default_route_state().map(Arc::new)
                    } else {
                        Err(NavigationError::NoMatch { path })
                    }
                }
            },
        };

        match resolved {
            Err(err) => {
                // Observable failure: the router stays in Starting.
                inner.emit_error(None, None, &err);
                Err(err)
            }
            Ok(state) => {
                *inner.current.borrow_mut() = Some(Arc::clone(&state));
                inner.lifecycle.set(Lifecycle::Started);
                trace!(" router started at `{}`", state.name);

                let event = TransitionEvent::states(Some(Arc::clone(&state)), None);
                inner.events.emit(RouterEvent::Start, &event);
                let options = inner.options.borrow().clone();
                for plugin in inner.registry.plugin_instances() {
                    contain_hook("onStart", || plugin.on_start(&options));
                }
                inner.commit(Arc::clone(&state), None, &NavigationOptions::default());
                Ok(state)
            }
        }
    }

    fn default_route_state(&self) -> Result<State, NavigationError> {
        let (route, params) = {
            let options = self.inner.options.borrow();
            match &options.default_route {
                Some(route) => (route.clone(), options.default_params.clone()),
                None => return Err(NavigationError::NoDefaultRoute),
            }
        };
        self.build_state(&route, params)
    }

    fn make_unknown_state(&self, path: &str) -> State {
        let mut params = Params::new();
        params.insert("path", path);
        self.make_state(UNKNOWN_ROUTE, params, path, None, None)
    }

    /// Stops the router: the in-flight transition is cancelled, `$stop`
    /// is published and every plugin is stopped and torn down.
    pub fn stop(&self) {
        let inner = &self.inner;
        match inner.lifecycle.get() {
            Lifecycle::Started | Lifecycle::Transitioning | Lifecycle::Starting => {}
            _ => return,
        }

        let pending_token = inner.pending.borrow().as_ref().map(|p| p.token.clone());
        if let Some(token) = pending_token {
            token.cancel();
        }

        inner.lifecycle.set(Lifecycle::Stopped);
        trace!(" router stopped");
        let event = TransitionEvent::states(None, inner.current_state());
        inner.events.emit(RouterEvent::Stop, &event);

        let to_stop: Vec<(Rc<dyn Plugin>, bool)> = {
            let plugins = inner.registry.plugins.borrow();
            plugins
                .iter()
                .map(|slot| (Rc::clone(&slot.plugin), slot.torn_down.replace(true)))
                .collect()
        };
        for (plugin, already_torn_down) in to_stop {
            contain_hook("onStop", || plugin.on_stop());
            if !already_torn_down {
                contain_hook("teardown", || plugin.teardown());
            }
        }
    }

    /// True when the router is started (a transition may be in flight).
    pub fn is_started(&self) -> bool {
        matches!(
            self.inner.lifecycle.get(),
            Lifecycle::Started | Lifecycle::Transitioning
        )
    }

    /// The current state, if any.
    pub fn get_state(&self) -> Option<Arc<State>> {
        self.inner.current_state()
    }

    // ----- navigation ------------------------------------------------

    /// Navigates to a route by name. The returned handle resolves to the
    /// transition's outcome and can cancel it.
    pub fn navigate(
        &self,
        name: &str,
        params: Params,
        options: NavigationOptions,
    ) -> Navigation {
        navigation::navigate(self, name, params, options, false, None)
    }

    /// Navigates to the configured default route.
    pub fn navigate_to_default(&self, options: NavigationOptions) -> Navigation {
        let (route, params) = {
            let opts = self.inner.options.borrow();
            match &opts.default_route {
                Some(route) => (route.clone(), opts.default_params.clone()),
                None => return Navigation::completed(Err(NavigationError::NoDefaultRoute)),
            }
        };
        navigation::navigate(self, &route, params, options, false, None)
    }

    // ----- states ----------------------------------------------------

    /// Creates a state carrying the next monotonic id, unless `force_id`
    /// pins one.
    pub fn make_state(
        &self,
        name: &str,
        params: Params,
        path: &str,
        meta: Option<StateMeta>,
        force_id: Option<u64>,
    ) -> State {
        let id = force_id.unwrap_or_else(|| self.inner.next_id());
        State::new(name, params, path, id, meta)
    }

    /// Resolves a name (following forwards and merging defaults) and
    /// renders it into a state, without navigating.
    pub fn build_state(&self, name: &str, params: Params) -> Result<State, NavigationError> {
        let (resolved, merged) = self.forward_state(name, params)?;
        let path = self.build_path(&resolved, &merged)?;
        let meta = StateMeta {
            params: merged.clone(),
            options: NavigationOptions::default(),
            redirected: false,
            source: None,
            source_route: if resolved == name {
                None
            } else {
                Some(name.to_owned())
            },
        };
        Ok(self.make_state(&resolved, merged, &path, Some(meta), None))
    }

    /// Follows the `forward_to` chain from `name` and merges the chain's
    /// default parameters into `params`.
    pub fn forward_state(
        &self,
        name: &str,
        params: Params,
    ) -> Result<(String, Params), NavigationError> {
        let tree = &self.inner.tree;
        if !tree.has_route(name) {
            return Err(NavigationError::RouteNotFound {
                name: name.to_owned(),
            });
        }

        let mut resolved = name.to_owned();
        let mut hops = 0;
        while let Some(next) = tree.route(&resolved).and_then(|node| node.forward_to()) {
            hops += 1;
            if hops > FORWARD_LIMIT {
                return Err(NavigationError::ForwardChainTooLong {
                    name: name.to_owned(),
                    limit: FORWARD_LIMIT,
                });
            }
            if !tree.has_route(next) {
                return Err(NavigationError::RouteNotFound {
                    name: next.to_owned(),
                });
            }
            resolved = next.to_owned();
        }

        let mut merged = params;
        merged.merge_defaults(&tree.chain_default_params(&resolved));
        Ok((resolved, merged))
    }

    /// State equality: same route name and equal parameters. With
    /// `ignore_query_params`, only URL-bound parameters are compared.
    pub fn are_states_equal(&self, a: &State, b: &State, ignore_query_params: bool) -> bool {
        if a.name != b.name {
            return false;
        }
        if ignore_query_params {
            match self.inner.tree.chain_url_param_names(&a.name) {
                Some(names) => a
                    .params
                    .equal_on(&b.params, names.iter().map(String::as_str)),
                None => a.params == b.params,
            }
        } else {
            a.params == b.params
        }
    }

    // ----- path operations -------------------------------------------

    /// Renders the URL for a route.
    pub fn build_path(&self, name: &str, params: &Params) -> Result<String, PathBuildError> {
        let options = self.inner.options.borrow().path_options();
        self.build_path_with(name, params, &options)
    }

    /// Renders the URL for a route with explicit path options.
    pub fn build_path_with(
        &self,
        name: &str,
        params: &Params,
        options: &PathOptions,
    ) -> Result<String, PathBuildError> {
        self.inner
            .tree
            .build_path(name, params, options, self.inner.codec.as_ref())
    }

    /// Matches a URL and lifts the result into a state.
    pub fn match_path(&self, url: &str, source: Option<NavigationSource>) -> Option<State> {
        let options = self.inner.options.borrow().match_options();
        let result =
            self.inner
                .matcher
                .borrow()
                .match_url(url, &options, self.inner.codec.as_ref())?;
        let meta = StateMeta {
            params: result.params.clone(),
            options: NavigationOptions::default(),
            redirected: false,
            source,
            source_route: None,
        };
        Some(self.make_state(&result.name, result.params, url, Some(meta), None))
    }

    /// Sets the prefix stripped from URLs before matching.
    pub fn set_root_path(&self, root_path: &str) {
        self.inner.matcher.borrow_mut().set_root_path(root_path);
    }

    /// The configured root path.
    pub fn root_path(&self) -> String {
        self.inner.matcher.borrow().root_path().to_owned()
    }

    /// True when a route with this full name exists.
    pub fn has_route(&self, name: &str) -> bool {
        self.inner.tree.has_route(name)
    }

    // ----- options ---------------------------------------------------

    /// A copy of the router options.
    pub fn options(&self) -> RouterOptions {
        self.inner.options.borrow().clone()
    }

    /// Adjusts the router options in place.
    pub fn set_options(&self, mutate: impl FnOnce(&mut RouterOptions)) {
        mutate(&mut self.inner.options.borrow_mut());
    }

    // ----- dependencies ----------------------------------------------

    /// The dependency container shared with guards, middlewares and
    /// plugins.
    pub fn dependencies(&self) -> &Dependencies {
        &self.inner.dependencies
    }

    /// Stores a dependency.
    pub fn set_dependency<T: 'static>(&self, name: &str, value: T) {
        self.inner.dependencies.set(name, value);
    }

    /// A dependency by name, downcast to `T`.
    pub fn get_dependency<T: 'static>(&self, name: &str) -> Option<Rc<T>> {
        self.inner.dependencies.get_as(name)
    }

    // ----- registries ------------------------------------------------

    /// Registers a middleware factory; the produced handler runs on
    /// every transition, after the guards.
    pub fn use_middleware<F>(&self, factory: F) -> MiddlewareHandle
    where
        F: Fn(&Router) -> Box<TransitionFn> + 'static,
    {
        let factory: Rc<HandlerFactory> = Rc::new(factory);
        let handler: Rc<TransitionFn> = Rc::from(factory(self));
        let index = self
            .inner
            .registry
            .middlewares
            .borrow_mut()
            .insert(MiddlewareSlot { factory, handler });
        MiddlewareHandle {
            inner: Rc::downgrade(&self.inner),
            index,
        }
    }

    /// Registers a plugin factory.
    pub fn add_plugin<F>(&self, factory: F) -> PluginHandle
    where
        F: Fn(&Router) -> Rc<dyn Plugin> + 'static,
    {
        let factory: Rc<PluginFactory> = Rc::new(factory);
        let plugin = factory(self);
        let index = self.inner.registry.plugins.borrow_mut().insert(PluginSlot {
            factory,
            plugin,
            torn_down: Cell::new(false),
        });
        PluginHandle {
            inner: Rc::downgrade(&self.inner),
            index,
        }
    }

    /// Guards activation of `route`. Re-registering replaces the guard.
    pub fn can_activate<F>(&self, route: &str, factory: F) -> GuardHandle
    where
        F: Fn(&Router) -> Box<TransitionFn> + 'static,
    {
        let factory: Rc<HandlerFactory> = Rc::new(factory);
        let handler: Rc<TransitionFn> = Rc::from(factory(self));
        self.inner
            .registry
            .can_activate
            .borrow_mut()
            .insert(route.to_owned(), GuardSlot { factory, handler });
        GuardHandle {
            inner: Rc::downgrade(&self.inner),
            route: route.to_owned(),
            kind: GuardKind::Activate,
        }
    }

    /// Guards deactivation of `route`. Re-registering replaces the
    /// guard.
    pub fn can_deactivate<F>(&self, route: &str, factory: F) -> GuardHandle
    where
        F: Fn(&Router) -> Box<TransitionFn> + 'static,
    {
        let factory: Rc<HandlerFactory> = Rc::new(factory);
        let handler: Rc<TransitionFn> = Rc::from(factory(self));
        self.inner
            .registry
            .can_deactivate
            .borrow_mut()
            .insert(route.to_owned(), GuardSlot { factory, handler });
        GuardHandle {
            inner: Rc::downgrade(&self.inner),
            route: route.to_owned(),
            kind: GuardKind::Deactivate,
        }
    }

    /// Subscribes to one of the router events.
    pub fn add_event_listener<F>(&self, event: RouterEvent, listener: F) -> ListenerHandle
    where
        F: Fn(&TransitionEvent) + 'static,
    {
        let index = self.inner.events.add(event, Rc::new(listener));
        ListenerHandle {
            inner: Rc::downgrade(&self.inner),
            event,
            index,
        }
    }

    // ----- cloning ---------------------------------------------------

    /// Deep-clones the router: same tree and options, plugins,
    /// middlewares and guards re-instantiated from their factories,
    /// dependencies copied (or overridden), no current state and no
    /// pending transition. The clone is idle until started.
    pub fn fork(&self, dependencies_override: Option<Vec<(String, Rc<dyn Any>)>>) -> Router {
        let inner = &self.inner;
        let clone = Router::with_parts(
            Arc::clone(&inner.tree),
            inner.options.borrow().clone(),
            Rc::clone(&inner.codec),
        );
        clone.set_root_path(&self.root_path());

        clone.inner.dependencies.set_many(inner.dependencies.entries());
        if let Some(overrides) = dependencies_override {
            clone.inner.dependencies.set_many(overrides);
        }

        for slot in inner.registry.middlewares.borrow().iter() {
            let factory = Rc::clone(&slot.factory);
            let handler: Rc<TransitionFn> = Rc::from(factory(&clone));
            clone
                .inner
                .registry
                .middlewares
                .borrow_mut()
                .insert(MiddlewareSlot { factory, handler });
        }
        for (route, slot) in inner.registry.can_activate.borrow().iter() {
            let factory = Rc::clone(&slot.factory);
            let handler: Rc<TransitionFn> = Rc::from(factory(&clone));
            clone
                .inner
                .registry
                .can_activate
                .borrow_mut()
                .insert(route.clone(), GuardSlot { factory, handler });
        }
        for (route, slot) in inner.registry.can_deactivate.borrow().iter() {
            let factory = Rc::clone(&slot.factory);
            let handler: Rc<TransitionFn> = Rc::from(factory(&clone));
            clone
                .inner
                .registry
                .can_deactivate
                .borrow_mut()
                .insert(route.clone(), GuardSlot { factory, handler });
        }
        for slot in inner.registry.plugins.borrow().iter() {
            let factory = Rc::clone(&slot.factory);
            let plugin = factory(&clone);
            clone.inner.registry.plugins.borrow_mut().insert(PluginSlot {
                factory,
                plugin,
                torn_down: Cell::new(false),
            });
        }

        clone
    }
}

#[derive(Clone, Copy)]
enum GuardKind {
    Activate,
    Deactivate,
}

/// Disposer for a registered middleware; dropping it keeps the
/// middleware installed.
pub struct MiddlewareHandle {
    inner: Weak<RouterInner>,
    index: usize,
}

impl MiddlewareHandle {
    /// Removes the middleware, leaving its slot null.
    pub fn dispose(self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.registry.middlewares.borrow_mut().remove(self.index);
        }
    }
}

/// Disposer for a registered plugin.
pub struct PluginHandle {
    inner: Weak<RouterInner>,
    index: usize,
}

impl PluginHandle {
    /// Removes the plugin and runs its teardown hook.
    pub fn dispose(self) {
        if let Some(inner) = self.inner.upgrade() {
            let slot = inner.registry.plugins.borrow_mut().remove(self.index);
            if let Some(slot) = slot {
                contain_hook("teardown", || slot.teardown());
            }
        }
    }
}

/// Disposer for a registered guard.
pub struct GuardHandle {
    inner: Weak<RouterInner>,
    route: String,
    kind: GuardKind,
}

impl GuardHandle {
    /// Removes the guard.
    pub fn dispose(self) {
        if let Some(inner) = self.inner.upgrade() {
            match self.kind {
                GuardKind::Activate => {
                    inner.registry.can_activate.borrow_mut().remove(&self.route);
                }
                GuardKind::Deactivate => {
                    inner
                        .registry
                        .can_deactivate
                        .borrow_mut()
                        .remove(&self.route);
                }
            }
        }
    }
}

/// Disposer for an event listener.
pub struct ListenerHandle {
    inner: Weak<RouterInner>,
    event: RouterEvent,
    index: usize,
}

impl ListenerHandle {
    /// Removes the listener, leaving its slot null.
    pub fn dispose(self) {
        self.dispose_ref();
    }

    pub(crate) fn dispose_ref(&self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.events.remove(self.event, self.index);
        }
    }
}
