//! The plugin surface: lifecycle hooks fanned out by the router.

use std::rc::Rc;
use std::sync::Arc;

use crate::router::error::NavigationError;
use crate::router::options::RouterOptions;
use crate::router::state::{NavigationOptions, State};
use crate::router::Router;

/// Hooks invoked around the router lifecycle and every transition.
///
/// All hooks default to no-ops; implement the ones of interest.
pub trait Plugin {
    /// Invoked once the router's current state first becomes non-null.
    fn on_start(&self, _options: &RouterOptions) {}

    /// Invoked when the router stops.
    fn on_stop(&self) {}

    /// Invoked as a transition begins.
    fn on_transition_start(&self, _to_state: &Arc<State>, _from_state: Option<&Arc<State>>) {}

    /// Invoked after a transition commits.
    fn on_transition_success(
        &self,
        _to_state: &Arc<State>,
        _from_state: Option<&Arc<State>>,
        _options: &NavigationOptions,
    ) {
    }

    /// Invoked when a transition fails. The target state is absent when
    /// resolution itself failed (unknown route, unbuildable path).
    fn on_transition_error(
        &self,
        _to_state: Option<&Arc<State>>,
        _from_state: Option<&Arc<State>>,
        _error: &NavigationError,
    ) {
    }

    /// Invoked when a transition is cancelled.
    fn on_transition_cancel(&self, _to_state: &Arc<State>, _from_state: Option<&Arc<State>>) {}

    /// Invoked once, when the plugin is removed or the router stops.
    fn teardown(&self) {}
}

/// Produces a [`Plugin`] when registered and again for every clone of the
/// router.
pub type PluginFactory = dyn Fn(&Router) -> Rc<dyn Plugin>;
