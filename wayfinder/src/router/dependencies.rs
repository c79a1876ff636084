//! A keyed container for values shared with guards, middlewares and
//! plugins.

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use log::trace;

/// Mutable, keyed storage mounted on a router. One value per key;
/// successive `set` calls with the same key overwrite.
#[derive(Clone, Default)]
pub struct Dependencies {
    data: Rc<RefCell<HashMap<String, Rc<dyn Any>>>>,
}

impl Dependencies {
    /// Creates an empty container.
    pub fn new() -> Self {
        Dependencies::default()
    }

    /// Stores a value under `name`.
    pub fn set<T: 'static>(&self, name: &str, value: T) {
        trace!(" setting dependency `{}`", name);
        self.data
            .borrow_mut()
            .insert(name.to_owned(), Rc::new(value));
    }

    /// Stores several pre-wrapped values at once.
    pub fn set_many(&self, values: Vec<(String, Rc<dyn Any>)>) {
        let mut data = self.data.borrow_mut();
        for (name, value) in values {
            trace!(" setting dependency `{}`", name);
            data.insert(name, value);
        }
    }

    /// Removes the value under `name`.
    pub fn remove(&self, name: &str) {
        trace!(" removing dependency `{}`", name);
        self.data.borrow_mut().remove(name);
    }

    /// Clears the container.
    pub fn reset(&self) {
        self.data.borrow_mut().clear();
    }

    /// True when a value exists under `name`.
    pub fn has(&self, name: &str) -> bool {
        self.data.borrow().contains_key(name)
    }

    /// The raw value under `name`.
    pub fn get(&self, name: &str) -> Option<Rc<dyn Any>> {
        self.data.borrow().get(name).cloned()
    }

    /// The value under `name`, downcast to `T`.
    pub fn get_as<T: 'static>(&self, name: &str) -> Option<Rc<T>> {
        self.get(name).and_then(|value| value.downcast::<T>().ok())
    }

    /// A point-in-time copy handed to transition contexts: mutations made
    /// after the snapshot are only observed by callbacks created later.
    pub(crate) fn snapshot(&self) -> DependencySnapshot {
        DependencySnapshot {
            data: self.data.borrow().clone(),
        }
    }

    /// The full contents, for cloning routers.
    pub(crate) fn entries(&self) -> Vec<(String, Rc<dyn Any>)> {
        self.data
            .borrow()
            .iter()
            .map(|(k, v)| (k.clone(), Rc::clone(v)))
            .collect()
    }
}

/// A read-only copy of the container taken when a transition starts.
#[derive(Clone, Default)]
pub struct DependencySnapshot {
    data: HashMap<String, Rc<dyn Any>>,
}

impl DependencySnapshot {
    /// The raw value under `name`.
    pub fn get(&self, name: &str) -> Option<Rc<dyn Any>> {
        self.data.get(name).cloned()
    }

    /// The value under `name`, downcast to `T`.
    pub fn get_as<T: 'static>(&self, name: &str) -> Option<Rc<T>> {
        self.get(name).and_then(|value| value.downcast::<T>().ok())
    }

    /// True when a value exists under `name`.
    pub fn has(&self, name: &str) -> bool {
        self.data.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stores_and_downcasts_values() {
        let deps = Dependencies::new();
        deps.set("answer", 42u32);

        assert!(deps.has("answer"));
        assert_eq!(*deps.get_as::<u32>("answer").unwrap(), 42);
        assert!(deps.get_as::<String>("answer").is_none());

        deps.remove("answer");
        assert!(!deps.has("answer"));
    }

    #[test]
    fn snapshots_do_not_observe_later_mutations() {
        let deps = Dependencies::new();
        deps.set("mode", "a".to_owned());

        let snapshot = deps.snapshot();
        deps.set("mode", "b".to_owned());

        assert_eq!(*snapshot.get_as::<String>("mode").unwrap(), "a");
        assert_eq!(*deps.get_as::<String>("mode").unwrap(), "b");
    }

    #[test]
    fn reset_clears_everything() {
        let deps = Dependencies::new();
        deps.set("a", 1u8);
        deps.set("b", 2u8);
        deps.reset();
        assert!(!deps.has("a"));
        assert!(!deps.has("b"));
    }
}
