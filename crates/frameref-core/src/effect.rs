#![forbid(unsafe_code)]

//! Effects and the per-reference effect registry.
//!
//! An [`Effect`] is a shared callback handle; its identity is the allocation
//! behind it, so clones of one handle are the same effect and two separately
//! built handles never are, even around identical closures.
//!
//! # Invariants
//!
//! 1. An effect lives in at most one bucket of a registry: the stable list or
//!    exactly one named group.
//! 2. Registering an effect that is already present anywhere is a no-op.
//! 3. Dispatch order is the stable list, then each named group in creation
//!    order, each bucket in insertion order.
//! 4. No registry borrow is held while an effect runs.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

/// A callback run with the current value of a reference.
pub struct Effect<V: ?Sized> {
    callback: Rc<dyn Fn(&V)>,
}

impl<V: ?Sized> Clone for Effect<V> {
    fn clone(&self) -> Self {
        Self {
            callback: Rc::clone(&self.callback),
        }
    }
}

impl<V: ?Sized> PartialEq for Effect<V> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.callback, &other.callback)
    }
}

impl<V: ?Sized> Eq for Effect<V> {}

impl<V: ?Sized> fmt::Debug for Effect<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Effect")
            .field(&Rc::as_ptr(&self.callback).cast::<()>())
            .finish()
    }
}

impl<V: ?Sized> Effect<V> {
    /// Wrap a callback in a new effect identity.
    pub fn new(callback: impl Fn(&V) + 'static) -> Self {
        Self {
            callback: Rc::new(callback),
        }
    }

    /// Run the callback.
    pub fn call(&self, value: &V) {
        (self.callback)(value);
    }
}

/// One effect or an ordered list of effects.
pub trait IntoEffects<V: ?Sized> {
    fn into_effects(self) -> Vec<Effect<V>>;
}

impl<V: ?Sized> IntoEffects<V> for Effect<V> {
    fn into_effects(self) -> Vec<Effect<V>> {
        vec![self]
    }
}

impl<V: ?Sized> IntoEffects<V> for &Effect<V> {
    fn into_effects(self) -> Vec<Effect<V>> {
        vec![self.clone()]
    }
}

impl<V: ?Sized> IntoEffects<V> for Vec<Effect<V>> {
    fn into_effects(self) -> Vec<Effect<V>> {
        self
    }
}

impl<V: ?Sized> IntoEffects<V> for &[Effect<V>] {
    fn into_effects(self) -> Vec<Effect<V>> {
        self.to_vec()
    }
}

impl<V: ?Sized, const N: usize> IntoEffects<V> for [Effect<V>; N] {
    fn into_effects(self) -> Vec<Effect<V>> {
        self.into()
    }
}

impl<V: ?Sized, const N: usize> IntoEffects<V> for &[Effect<V>; N] {
    fn into_effects(self) -> Vec<Effect<V>> {
        self.to_vec()
    }
}

/// Registration options.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EffectOptions {
    /// Named group to add to; `None` means the stable list.
    pub name: Option<String>,
    /// Run newly added effects once, immediately.
    pub first_call: bool,
}

impl Default for EffectOptions {
    fn default() -> Self {
        Self {
            name: None,
            first_call: true,
        }
    }
}

impl EffectOptions {
    /// Stable-list registration with an immediate first call.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registration into the group `name`.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Set whether new effects run once on registration.
    #[must_use]
    pub fn first_call(mut self, first_call: bool) -> Self {
        self.first_call = first_call;
        self
    }
}

/// Stable effects plus insertion-ordered named groups.
pub struct EffectRegistry<V: ?Sized> {
    stable: RefCell<Vec<Effect<V>>>,
    named: RefCell<IndexMap<String, Vec<Effect<V>>>>,
}

impl<V: ?Sized> Default for EffectRegistry<V> {
    fn default() -> Self {
        Self {
            stable: RefCell::new(Vec::new()),
            named: RefCell::new(IndexMap::new()),
        }
    }
}

impl<V: ?Sized> fmt::Debug for EffectRegistry<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectRegistry")
            .field("stable", &self.stable.borrow().len())
            .field("named", &self.names())
            .finish()
    }
}

impl<V: ?Sized> EffectRegistry<V> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn contains(&self, effect: &Effect<V>) -> bool {
        self.stable.borrow().contains(effect)
            || self
                .named
                .borrow()
                .values()
                .any(|group| group.contains(effect))
    }

    /// The inputs not yet registered anywhere, first occurrence kept.
    fn unregistered(&self, effects: Vec<Effect<V>>) -> Vec<Effect<V>> {
        let mut fresh: Vec<Effect<V>> = Vec::with_capacity(effects.len());
        for effect in effects {
            if !self.contains(&effect) && !fresh.contains(&effect) {
                fresh.push(effect);
            }
        }
        fresh
    }

    /// Add the unregistered subset of `effects` to the stable list or to the
    /// group `name`. Returns what was added, in order; empty means no-op.
    pub fn register(&self, effects: impl IntoEffects<V>, name: Option<&str>) -> Vec<Effect<V>> {
        let input = effects.into_effects();
        if input.is_empty() {
            return input;
        }
        let fresh = self.unregistered(input);
        if fresh.is_empty() {
            tracing::debug!(message = "effects.duplicate", group = name.unwrap_or(""));
            return fresh;
        }
        match name {
            Some(name) => self
                .named
                .borrow_mut()
                .entry(name.to_string())
                .or_default()
                .extend(fresh.iter().cloned()),
            None => self.stable.borrow_mut().extend(fresh.iter().cloned()),
        }
        fresh
    }

    /// Whether every input effect is already registered somewhere.
    pub fn is_registered(&self, effects: impl IntoEffects<V>) -> bool {
        effects.into_effects().iter().all(|e| self.contains(e))
    }

    /// All effects in dispatch order.
    #[must_use]
    pub fn ordered(&self) -> Vec<Effect<V>> {
        let mut all = self.stable.borrow().clone();
        for group in self.named.borrow().values() {
            all.extend(group.iter().cloned());
        }
        all
    }

    /// Run every effect with `value`. Returns the number run.
    pub fn dispatch(&self, value: &V) -> usize {
        let effects = self.ordered();
        tracing::trace!(
            message = "effects.dispatch",
            stable = self.stable.borrow().len(),
            total = effects.len()
        );
        for effect in &effects {
            effect.call(value);
        }
        effects.len()
    }

    /// Group names in creation order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.named.borrow().keys().cloned().collect()
    }

    /// Total registered effects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stable.borrow().len() + self.named.borrow().values().map(Vec::len).sum::<usize>()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
