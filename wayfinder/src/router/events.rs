//! The router's event bus: fixed channels with slot mechanics identical
//! to the registries.

use std::cell::RefCell;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;
use std::sync::Arc;

use log::error;

use crate::router::error::NavigationError;
use crate::router::registry::SlotList;
use crate::router::state::{NavigationOptions, State};

/// The events a router publishes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RouterEvent {
    /// `$start`: the router started and holds its first state.
    Start,
    /// `$stop`: the router stopped.
    Stop,
    /// `$$start`: a transition began.
    TransitionStart,
    /// `$$success`: a transition committed.
    TransitionSuccess,
    /// `$$error`: a transition failed.
    TransitionError,
    /// `$$cancel`: a transition was cancelled.
    TransitionCancel,
}

impl RouterEvent {
    /// The event's wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            RouterEvent::Start => "$start",
            RouterEvent::Stop => "$stop",
            RouterEvent::TransitionStart => "$$start",
            RouterEvent::TransitionSuccess => "$$success",
            RouterEvent::TransitionError => "$$error",
            RouterEvent::TransitionCancel => "$$cancel",
        }
    }
}

/// The payload delivered to event listeners. Success snapshots are
/// immutable by construction; listeners must not assume otherwise.
#[derive(Clone)]
pub struct TransitionEvent {
    /// The target state, when the event has one.
    pub to_state: Option<Arc<State>>,
    /// The state transitioned from.
    pub from_state: Option<Arc<State>>,
    /// Options of the navigation involved.
    pub options: NavigationOptions,
    /// The failure, on `$$error` only.
    pub error: Option<NavigationError>,
}

impl TransitionEvent {
    #[cfg(test)]
    pub(crate) fn empty() -> Self {
        TransitionEvent {
            to_state: None,
            from_state: None,
            options: NavigationOptions::default(),
            error: None,
        }
    }

    pub(crate) fn states(to_state: Option<Arc<State>>, from_state: Option<Arc<State>>) -> Self {
        TransitionEvent {
            to_state,
            from_state,
            options: NavigationOptions::default(),
            error: None,
        }
    }
}

pub(crate) type Listener = Rc<dyn Fn(&TransitionEvent)>;

/// One slot list per event channel.
pub(crate) struct EventBus {
    start: RefCell<SlotList<Listener>>,
    stop: RefCell<SlotList<Listener>>,
    transition_start: RefCell<SlotList<Listener>>,
    transition_success: RefCell<SlotList<Listener>>,
    transition_error: RefCell<SlotList<Listener>>,
    transition_cancel: RefCell<SlotList<Listener>>,
}

impl EventBus {
    pub(crate) fn new() -> Self {
        EventBus {
            start: RefCell::new(SlotList::new("$start listener")),
            stop: RefCell::new(SlotList::new("$stop listener")),
            transition_start: RefCell::new(SlotList::new("$$start listener")),
            transition_success: RefCell::new(SlotList::new("$$success listener")),
            transition_error: RefCell::new(SlotList::new("$$error listener")),
            transition_cancel: RefCell::new(SlotList::new("$$cancel listener")),
        }
    }

    fn channel(&self, event: RouterEvent) -> &RefCell<SlotList<Listener>> {
        match event {
            RouterEvent::Start => &self.start,
            RouterEvent::Stop => &self.stop,
            RouterEvent::TransitionStart => &self.transition_start,
            RouterEvent::TransitionSuccess => &self.transition_success,
            RouterEvent::TransitionError => &self.transition_error,
            RouterEvent::TransitionCancel => &self.transition_cancel,
        }
    }

    pub(crate) fn add(&self, event: RouterEvent, listener: Listener) -> usize {
        self.channel(event).borrow_mut().insert(listener)
    }

    pub(crate) fn remove(&self, event: RouterEvent, index: usize) {
        self.channel(event).borrow_mut().remove(index);
    }

    /// Notifies listeners synchronously, in registration order. A
    /// panicking listener is caught and logged; later listeners still
    /// run.
    pub(crate) fn emit(&self, event: RouterEvent, payload: &TransitionEvent) {
        let listeners: Vec<Listener> = self
            .channel(event)
            .borrow()
            .iter()
            .map(Rc::clone)
            .collect();
        for listener in listeners {
            if catch_unwind(AssertUnwindSafe(|| listener(payload))).is_err() {
                error!("{} listener panicked; continuing", event.as_str());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn listeners_run_in_registration_order() {
        let bus = EventBus::new();
        let order = Rc::new(RefCell::new(Vec::new()));

        for tag in ["first", "second", "third"].iter().copied() {
            let order = Rc::clone(&order);
            bus.add(
                RouterEvent::TransitionSuccess,
                Rc::new(move |_ev| order.borrow_mut().push(tag)),
            );
        }
        bus.emit(RouterEvent::TransitionSuccess, &TransitionEvent::empty());
        assert_eq!(*order.borrow(), vec!["first", "second", "third"]);
    }

    #[test]
    fn removed_listeners_stay_silent() {
        let bus = EventBus::new();
        let calls = Rc::new(Cell::new(0));

        let calls_inner = Rc::clone(&calls);
        let index = bus.add(
            RouterEvent::Start,
            Rc::new(move |_ev| calls_inner.set(calls_inner.get() + 1)),
        );
        bus.emit(RouterEvent::Start, &TransitionEvent::empty());
        bus.remove(RouterEvent::Start, index);
        bus.emit(RouterEvent::Start, &TransitionEvent::empty());

        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn panicking_listener_does_not_break_the_chain() {
        let bus = EventBus::new();
        let reached = Rc::new(Cell::new(false));

        bus.add(
            RouterEvent::TransitionError,
            Rc::new(|_ev| panic!("listener blew up")),
        );
        let reached_inner = Rc::clone(&reached);
        bus.add(
            RouterEvent::TransitionError,
            Rc::new(move |_ev| reached_inner.set(true)),
        );

        bus.emit(RouterEvent::TransitionError, &TransitionEvent::empty());
        assert!(reached.get());
    }
}
