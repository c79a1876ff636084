//! Slot-based registries for middlewares, plugins and route guards.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use log::warn;

use crate::router::plugin::{Plugin, PluginFactory};
use crate::router::transition::{HandlerFactory, TransitionFn};

/// Soft cap on live middleware and plugin registrations.
pub(crate) const MAX_SLOTS: usize = 50;

/// An append-only array of optional slots. Removal nullifies a slot in
/// place, so indices stay stable and are never exposed; iteration skips
/// the holes.
pub(crate) struct SlotList<T> {
    label: &'static str,
    slots: Vec<Option<T>>,
}

impl<T> SlotList<T> {
    pub(crate) fn new(label: &'static str) -> Self {
        SlotList {
            label,
            slots: Vec::new(),
        }
    }

    pub(crate) fn insert(&mut self, value: T) -> usize {
        self.slots.push(Some(value));
        let live = self.live_count();
        if live > MAX_SLOTS {
            warn!(
                "{} registry holds {} entries, above the advisory limit of {}",
                self.label, live, MAX_SLOTS
            );
        }
        self.slots.len() - 1
    }

    pub(crate) fn remove(&mut self, index: usize) -> Option<T> {
        self.slots.get_mut(index).and_then(Option::take)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &T> {
        self.slots.iter().filter_map(Option::as_ref)
    }

    pub(crate) fn live_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }
}

/// A registered middleware: the factory survives for cloning, the handler
/// is the instance running in this router.
pub(crate) struct MiddlewareSlot {
    pub(crate) factory: Rc<HandlerFactory>,
    pub(crate) handler: Rc<TransitionFn>,
}

/// A registered guard, keyed by the route it protects.
pub(crate) struct GuardSlot {
    pub(crate) factory: Rc<HandlerFactory>,
    pub(crate) handler: Rc<TransitionFn>,
}

/// A registered plugin. `torn_down` guards the once-only teardown hook.
pub(crate) struct PluginSlot {
    pub(crate) factory: Rc<PluginFactory>,
    pub(crate) plugin: Rc<dyn Plugin>,
    pub(crate) torn_down: Cell<bool>,
}

impl PluginSlot {
    pub(crate) fn teardown(&self) {
        if !self.torn_down.replace(true) {
            self.plugin.teardown();
        }
    }
}

/// The router's mutable registries.
pub(crate) struct Registry {
    pub(crate) middlewares: RefCell<SlotList<MiddlewareSlot>>,
    pub(crate) plugins: RefCell<SlotList<PluginSlot>>,
    pub(crate) can_activate: RefCell<HashMap<String, GuardSlot>>,
    pub(crate) can_deactivate: RefCell<HashMap<String, GuardSlot>>,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Registry {
            middlewares: RefCell::new(SlotList::new("middleware")),
            plugins: RefCell::new(SlotList::new("plugin")),
            can_activate: RefCell::new(HashMap::new()),
            can_deactivate: RefCell::new(HashMap::new()),
        }
    }

    /// Snapshot of the live middleware handlers, in registration order.
    pub(crate) fn middleware_handlers(&self) -> Vec<Rc<TransitionFn>> {
        self.middlewares
            .borrow()
            .iter()
            .map(|slot| Rc::clone(&slot.handler))
            .collect()
    }

    /// Snapshot of the live plugins, in registration order.
    pub(crate) fn plugin_instances(&self) -> Vec<Rc<dyn Plugin>> {
        self.plugins
            .borrow()
            .iter()
            .map(|slot| Rc::clone(&slot.plugin))
            .collect()
    }

    pub(crate) fn activation_guard(&self, route: &str) -> Option<Rc<TransitionFn>> {
        self.can_activate
            .borrow()
            .get(route)
            .map(|slot| Rc::clone(&slot.handler))
    }

    pub(crate) fn deactivation_guard(&self, route: &str) -> Option<Rc<TransitionFn>> {
        self.can_deactivate
            .borrow()
            .get(route)
            .map(|slot| Rc::clone(&slot.handler))
    }
}
