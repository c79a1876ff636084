//! Observation of committed states: callback subscriptions and a hot
//! stream of success snapshots.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::pin::Pin;
use std::rc::Rc;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};

use futures_util::stream::Stream;

use crate::router::events::RouterEvent;
use crate::router::state::State;
use crate::router::{ListenerHandle, Router};

/// The payload delivered to `subscribe` callbacks.
pub struct StateChange {
    /// The state just committed.
    pub route: Arc<State>,
    /// The state it replaced.
    pub previous_route: Option<Arc<State>>,
}

impl Router {
    /// Subscribes to committed transitions only; sugar over the
    /// `$$success` event channel.
    pub fn subscribe<F>(&self, listener: F) -> ListenerHandle
    where
        F: Fn(&StateChange) + 'static,
    {
        self.add_event_listener(RouterEvent::TransitionSuccess, move |event| {
            if let Some(to_state) = &event.to_state {
                listener(&StateChange {
                    route: Arc::clone(to_state),
                    previous_route: event.from_state.clone(),
                });
            }
        })
    }

    /// A hot stream of success snapshots. States committed while nobody
    /// polls are buffered; the stream never terminates on its own, so
    /// compose it with `StreamExt::take_until` or drop it.
    pub fn state_stream(&self) -> StateStream {
        let shared = Rc::new(RefCell::new(StreamInner {
            queue: VecDeque::new(),
            waker: None,
        }));
        let listener_shared = Rc::clone(&shared);
        let listener = self.add_event_listener(RouterEvent::TransitionSuccess, move |event| {
            if let Some(to_state) = &event.to_state {
                let mut inner = listener_shared.borrow_mut();
                inner.queue.push_back(Arc::clone(to_state));
                if let Some(waker) = inner.waker.take() {
                    waker.wake();
                }
            }
        });
        StateStream {
            shared,
            listener: Some(listener),
        }
    }
}

struct StreamInner {
    queue: VecDeque<Arc<State>>,
    waker: Option<Waker>,
}

/// See [`Router::state_stream`].
pub struct StateStream {
    shared: Rc<RefCell<StreamInner>>,
    listener: Option<ListenerHandle>,
}

impl Stream for StateStream {
    type Item = Arc<State>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut inner = self.shared.borrow_mut();
        match inner.queue.pop_front() {
            Some(state) => Poll::Ready(Some(state)),
            None => {
                inner.waker = Some(cx.waker().clone());
                Poll::Pending
            }
        }
    }
}

impl Drop for StateStream {
    fn drop(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.dispose();
        }
    }
}
