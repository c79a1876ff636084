//! Defines router states and the options a navigation carries.

use serde::{Deserialize, Serialize};

use crate::params::Params;

/// Where a state originated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NavigationSource {
    /// Produced by a history pop observed by the host.
    PopState,
    /// Produced by a programmatic `navigate` call.
    Programmatic,
}

/// Options recognised by `navigate`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NavigationOptions {
    /// Suppress the same-state short-circuit.
    pub reload: bool,
    /// Reload and skip the deactivation guards.
    pub force: bool,
    /// Signal to the history collaborator that the current entry should
    /// be replaced.
    pub replace: bool,
    /// Skip the deactivation guards only.
    pub force_deactivate: bool,
    /// Tag for observers.
    pub source: Option<NavigationSource>,
}

impl NavigationOptions {
    /// Options with `reload` set.
    pub fn reload() -> Self {
        NavigationOptions {
            reload: true,
            ..NavigationOptions::default()
        }
    }

    /// Options with `force` set.
    pub fn force() -> Self {
        NavigationOptions {
            force: true,
            ..NavigationOptions::default()
        }
    }

    /// True when the deactivation guards should be skipped.
    pub(crate) fn skips_deactivation(&self) -> bool {
        self.force || self.force_deactivate
    }

    /// True when the same-state short-circuit should be suppressed.
    pub(crate) fn forces_transition(&self) -> bool {
        self.reload || self.force
    }
}

/// Bookkeeping attached to a state.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StateMeta {
    /// The parameters as supplied, before encoding.
    pub params: Params,
    /// The navigation options used to produce the state.
    pub options: NavigationOptions,
    /// True when the state was reached through a redirect.
    pub redirected: bool,
    /// Where the state originated.
    pub source: Option<NavigationSource>,
    /// The route the navigation was originally aimed at, when it differs
    /// from the resolved route (forward chains).
    pub source_route: Option<String>,
}

/// A resolved router state: a route name, its parameters and the URL they
/// render to.
///
/// States are immutable once observed; the monotonic `id` strictly
/// increases within a router instance.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct State {
    /// Full name of the route.
    pub name: String,
    /// URL and query parameters.
    pub params: Params,
    /// The rendered URL.
    pub path: String,
    /// Monotonic per-router counter value.
    pub id: u64,
    /// Bookkeeping, absent on states built outside a navigation.
    pub meta: Option<StateMeta>,
}

impl State {
    /// Creates a state. Library code funnels through
    /// [`Router::make_state`](crate::router::Router::make_state) so ids
    /// stay monotonic.
    pub fn new<N: Into<String>, P: Into<String>>(
        name: N,
        params: Params,
        path: P,
        id: u64,
        meta: Option<StateMeta>,
    ) -> Self {
        State {
            name: name.into(),
            params,
            path: path.into(),
            id,
            meta,
        }
    }

    /// True when this state was reached through a redirect.
    pub fn was_redirected(&self) -> bool {
        self.meta.as_ref().map_or(false, |m| m.redirected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redirect_flag_reads_from_meta() {
        let mut state = State::new("a", Params::new(), "/a", 1, None);
        assert!(!state.was_redirected());

        state.meta = Some(StateMeta {
            redirected: true,
            ..StateMeta::default()
        });
        assert!(state.was_redirected());
    }
}
