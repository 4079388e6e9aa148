#![forbid(unsafe_code)]

//! Intercepting views over tracked containers.
//!
//! A [`Facade`] pairs a container with an optional write hook and an
//! [`Interception`] policy. Reads forward to storage; writes apply to storage
//! and then fire the hook. The policy decides what a read of a nested
//! container hands back:
//!
//! | policy      | nested read returns                                        |
//! |-------------|------------------------------------------------------------|
//! | `Shallow`   | an unobserved facade (no hook)                             |
//! | `DeepAll`   | a fresh facade sharing the hook, on every read             |
//! | `DeepInner` | an observed facade if the slot was locked at construction, |
//! |             | otherwise an unobserved one                                |
//!
//! A facade is three pointer-sized fields; building one per read costs two
//! reference-count bumps.

use std::fmt;
use std::rc::Rc;

use serde_json::Value;

use crate::error::{FrameRefError, Result};
use crate::node::{Applied, Container, ContainerKind, Key, Node};

/// Called after every applied write.
pub type WriteHook = Rc<dyn Fn()>;

/// Which writes a reference observes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Interception {
    /// Top-level writes only.
    #[default]
    Shallow,
    /// Writes at any depth, re-wrapping nested containers on every read.
    DeepAll,
    /// Writes at any depth through containers wrapped at construction; those
    /// slots reject replacement.
    DeepInner,
}

/// What a write did to storage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Storage changed and the hook (if any) fired.
    Applied,
    /// The slot is locked; nothing changed, nothing fired.
    Locked,
    /// `remove` found nothing under the key; nothing fired.
    Absent,
}

impl WriteOutcome {
    fn from_applied(applied: Applied) -> Self {
        match applied {
            Applied::Written => Self::Applied,
            Applied::Locked => Self::Locked,
            Applied::Absent => Self::Absent,
        }
    }
}

/// A property read through a facade.
#[derive(Clone, Debug)]
pub enum Field {
    /// `null`, bool, number or string.
    Leaf(Value),
    /// An object or array, as a facade.
    Nested(Facade),
}

impl Field {
    #[must_use]
    pub fn as_leaf(&self) -> Option<&Value> {
        match self {
            Self::Leaf(value) => Some(value),
            Self::Nested(_) => None,
        }
    }

    #[must_use]
    pub fn as_nested(&self) -> Option<&Facade> {
        match self {
            Self::Leaf(_) => None,
            Self::Nested(facade) => Some(facade),
        }
    }

    #[must_use]
    pub fn into_nested(self) -> Option<Facade> {
        match self {
            Self::Leaf(_) => None,
            Self::Nested(facade) => Some(facade),
        }
    }

    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        self.as_leaf().and_then(Value::as_i64)
    }

    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        self.as_leaf().and_then(Value::as_f64)
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        self.as_leaf().and_then(Value::as_str)
    }

    /// Deep copy as JSON.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Leaf(value) => value.clone(),
            Self::Nested(facade) => facade.snapshot(),
        }
    }
}

/// Intercepting view over a tracked container.
///
/// Cloning is cheap and yields a view over the same storage with the same
/// hook. Two facades may be distinct values yet address the same container;
/// compare storage with [`same_target`](Self::same_target).
#[derive(Clone)]
pub struct Facade {
    target: Container,
    hook: Option<WriteHook>,
    interception: Interception,
}

impl fmt::Debug for Facade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Facade")
            .field("interception", &self.interception)
            .field("observed", &self.is_observed())
            .field("value", &self.snapshot())
            .finish()
    }
}

impl Facade {
    pub(crate) fn new(target: Container, hook: Option<WriteHook>, interception: Interception) -> Self {
        Self {
            target,
            hook,
            interception,
        }
    }

    /// Same storage, no hook: writes through the result are not observed.
    #[must_use]
    pub fn unobserved(&self) -> Self {
        Self {
            target: Rc::clone(&self.target),
            hook: None,
            interception: self.interception,
        }
    }

    /// Whether writes through this facade fire a hook.
    #[must_use]
    pub fn is_observed(&self) -> bool {
        self.hook.is_some()
    }

    #[must_use]
    pub fn interception(&self) -> Interception {
        self.interception
    }

    /// Whether both facades view the same container.
    #[must_use]
    pub fn same_target(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.target, &other.target)
    }

    #[must_use]
    pub fn kind(&self) -> ContainerKind {
        self.target.borrow().kind()
    }

    #[must_use]
    pub fn is_array(&self) -> bool {
        self.kind() == ContainerKind::Array
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.target.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keys in storage order.
    #[must_use]
    pub fn keys(&self) -> Vec<Key> {
        self.target.borrow().keys()
    }

    /// Read a property. `None` if the key addresses nothing.
    pub fn get(&self, key: impl Into<Key>) -> Option<Field> {
        let key = key.into();
        let data = self.target.borrow();
        let slot = data.slot(&key)?;
        Some(match &slot.node {
            Node::Leaf(value) => Field::Leaf(value.clone()),
            Node::Container(child) => {
                let hook = match self.interception {
                    Interception::Shallow => None,
                    Interception::DeepAll => self.hook.clone(),
                    Interception::DeepInner if slot.locked => self.hook.clone(),
                    Interception::DeepInner => None,
                };
                Field::Nested(Self::new(Rc::clone(child), hook, self.interception))
            }
        })
    }

    /// Deep copy of a property as JSON.
    pub fn get_value(&self, key: impl Into<Key>) -> Option<Value> {
        self.get(key).map(|field| field.to_json())
    }

    /// Write a property, then fire the hook.
    ///
    /// A locked slot rejects the write silently with
    /// [`WriteOutcome::Locked`].
    ///
    /// # Errors
    ///
    /// [`FrameRefError::KeyMismatch`] if `key` cannot address an element of
    /// this array; [`FrameRefError::IndexOutOfRange`] if it lies too far past
    /// the end. Neither fires the hook.
    pub fn set(&self, key: impl Into<Key>, value: impl Into<Value>) -> Result<WriteOutcome> {
        let key = key.into();
        let node = Node::from_json(value.into());
        let applied = self.target.borrow_mut().write(&key, node)?;
        self.after_write(&key, applied);
        Ok(WriteOutcome::from_applied(applied))
    }

    /// Append to an array, then fire the hook.
    ///
    /// # Errors
    ///
    /// [`FrameRefError::NotAnArray`] on an object.
    pub fn push(&self, value: impl Into<Value>) -> Result<()> {
        let node = Node::from_json(value.into());
        self.target.borrow_mut().push(node)?;
        self.notify();
        Ok(())
    }

    /// Delete a property (arrays shift down), then fire the hook.
    ///
    /// # Errors
    ///
    /// [`FrameRefError::KeyMismatch`] if `key` cannot address an element of
    /// this array.
    pub fn remove(&self, key: impl Into<Key>) -> Result<WriteOutcome> {
        let key = key.into();
        let applied = self.target.borrow_mut().remove(&key)?;
        self.after_write(&key, applied);
        Ok(WriteOutcome::from_applied(applied))
    }

    /// Deep copy of the whole container as JSON.
    #[must_use]
    pub fn snapshot(&self) -> Value {
        self.target.borrow().to_json()
    }

    fn after_write(&self, key: &Key, applied: Applied) {
        match applied {
            Applied::Written => self.notify(),
            Applied::Locked => {
                tracing::debug!(message = "facade.locked", key = %key);
            }
            Applied::Absent => {}
        }
    }

    fn notify(&self) {
        if let Some(hook) = &self.hook {
            hook();
        }
    }
}

impl TryFrom<Field> for Facade {
    type Error = FrameRefError;

    fn try_from(field: Field) -> Result<Self> {
        match field {
            Field::Nested(facade) => Ok(facade),
            Field::Leaf(value) => Err(FrameRefError::NotAContainer {
                kind: crate::node::json_kind(&value),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::lock_nested;
    use serde_json::json;
    use std::cell::Cell;

    fn build(value: Value, interception: Interception) -> (Facade, Rc<Cell<u32>>) {
        let Node::Container(root) = Node::from_json(value) else {
            panic!("expected container");
        };
        if interception == Interception::DeepInner {
            lock_nested(&root);
        }
        let hits = Rc::new(Cell::new(0));
        let h = Rc::clone(&hits);
        let hook: WriteHook = Rc::new(move || h.set(h.get() + 1));
        (Facade::new(root, Some(hook), interception), hits)
    }

    fn nested(facade: &Facade, key: &str) -> Facade {
        facade
            .get(key)
            .and_then(Field::into_nested)
            .expect("nested container")
    }

    #[test]
    fn shallow_sees_top_level_only() {
        let (root, hits) = build(json!({"a": {"b": 1}}), Interception::Shallow);
        let a = nested(&root, "a");
        assert!(!a.is_observed());
        a.set("b", 2).unwrap();
        assert_eq!(hits.get(), 0);
        assert_eq!(root.snapshot(), json!({"a": {"b": 2}}));

        root.set("a", json!({"b": 3})).unwrap();
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn deep_all_rewraps_each_read() {
        let (root, hits) = build(json!({"a": {"b": {"c": 1}}}), Interception::DeepAll);
        let first = nested(&root, "a");
        let second = nested(&root, "a");
        assert!(first.same_target(&second));

        nested(&first, "b").set("c", 2).unwrap();
        second.set("x", true).unwrap();
        assert_eq!(hits.get(), 2);
        assert_eq!(root.snapshot(), json!({"a": {"b": {"c": 2}, "x": true}}));
    }

    #[test]
    fn deep_inner_locks_wrapped_slots() {
        let (root, hits) = build(json!({"a": {"b": 1}, "n": 0}), Interception::DeepInner);
        let a = nested(&root, "a");
        assert!(a.is_observed());
        assert_eq!(a.set("b", 2).unwrap(), WriteOutcome::Applied);
        assert_eq!(hits.get(), 1);

        assert_eq!(root.set("a", json!({"b": 9})).unwrap(), WriteOutcome::Locked);
        assert_eq!(hits.get(), 1);
        assert!(nested(&root, "a").same_target(&a));
        assert_eq!(root.get_value("a"), Some(json!({"b": 2})));

        assert_eq!(root.set("n", 5).unwrap(), WriteOutcome::Applied);
        assert_eq!(hits.get(), 2);
    }

    #[test]
    fn deep_inner_late_containers_are_unobserved() {
        let (root, hits) = build(json!({}), Interception::DeepInner);
        root.set("late", json!({"k": 1})).unwrap();
        assert_eq!(hits.get(), 1);
        let late = nested(&root, "late");
        assert!(!late.is_observed());
        late.set("k", 2).unwrap();
        assert_eq!(hits.get(), 1);
        // Not locked either: replacement goes through.
        assert_eq!(root.set("late", 0).unwrap(), WriteOutcome::Applied);
    }

    #[test]
    fn push_and_remove_notify() {
        let (root, hits) = build(json!({"list": [1]}), Interception::DeepAll);
        let list = nested(&root, "list");
        list.push(2).unwrap();
        assert_eq!(list.remove(0usize).unwrap(), WriteOutcome::Applied);
        assert_eq!(list.remove(9usize).unwrap(), WriteOutcome::Absent);
        assert_eq!(hits.get(), 2);
        assert_eq!(list.snapshot(), json!([2]));
        assert!(list.is_array());
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn out_of_range_index_is_an_error_without_notify() {
        let (root, hits) = build(json!({"list": [1]}), Interception::DeepAll);
        let list = nested(&root, "list");
        let err = list.set("18446744073709551615", 2).unwrap_err();
        assert!(matches!(err, FrameRefError::IndexOutOfRange { len: 1, .. }));
        assert_eq!(hits.get(), 0);
        assert_eq!(list.snapshot(), json!([1]));
    }

    #[test]
    fn unobserved_view_shares_storage() {
        let (root, hits) = build(json!({"n": 1}), Interception::DeepAll);
        let raw = root.unobserved();
        raw.set("n", 2).unwrap();
        assert_eq!(hits.get(), 0);
        assert_eq!(root.get("n").and_then(|f| f.as_i64()), Some(2));
        assert!(raw.same_target(&root));
    }

    #[test]
    fn field_accessors() {
        let (root, _) = build(json!({"s": "x", "f": 1.5, "o": {}}), Interception::Shallow);
        assert_eq!(root.get("s").unwrap().as_str(), Some("x"));
        assert_eq!(root.get("f").unwrap().as_f64(), Some(1.5));
        assert!(root.get("o").unwrap().as_leaf().is_none());
        assert!(root.get("missing").is_none());
        assert!(Facade::try_from(root.get("s").unwrap()).is_err());
        assert!(Facade::try_from(root.get("o").unwrap()).is_ok());
        assert_eq!(
            root.keys(),
            vec![Key::from("s"), Key::from("f"), Key::from("o")]
        );
    }
}
