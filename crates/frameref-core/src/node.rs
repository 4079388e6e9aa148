#![forbid(unsafe_code)]

//! Storage model for tracked containers.
//!
//! A tracked object or array is a shared [`Container`]; each entry lives in a
//! [`Slot`] holding either a leaf JSON value or another container, plus a
//! `locked` flag that rejects replacement of the slot.
//!
//! Keys follow property-access coercion: an index on an object addresses the
//! field named by its decimal form, and a field on an array addresses an
//! element only if it parses as an index.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use serde_json::Value;

use crate::error::{FrameRefError, Result};

/// Property key of a tracked container.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Key {
    /// Named field of an object.
    Field(String),
    /// Position in an array.
    Index(usize),
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        Self::Field(name.to_string())
    }
}

impl From<String> for Key {
    fn from(name: String) -> Self {
        Self::Field(name)
    }
}

impl From<usize> for Key {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(name) => write!(f, "{name:?}"),
            Self::Index(index) => write!(f, "[{index}]"),
        }
    }
}

impl Key {
    fn as_field(&self) -> String {
        match self {
            Self::Field(name) => name.clone(),
            Self::Index(index) => index.to_string(),
        }
    }

    fn as_index(&self) -> Option<usize> {
        match self {
            Self::Field(name) => name.parse().ok(),
            Self::Index(index) => Some(*index),
        }
    }
}

/// Shape of a container.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ContainerKind {
    Object,
    Array,
}

impl fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Object => "object",
            Self::Array => "array",
        })
    }
}

/// Largest addressable array index (`2^32 - 2`).
pub const MAX_ARRAY_INDEX: usize = 4_294_967_294;

/// Most `null` slots a single write past the end may insert.
pub const MAX_ARRAY_GAP: usize = 1 << 16;

pub(crate) type Container = Rc<RefCell<ContainerData>>;

#[derive(Clone)]
pub(crate) enum Node {
    Leaf(Value),
    Container(Container),
}

pub(crate) struct Slot {
    pub(crate) node: Node,
    pub(crate) locked: bool,
}

impl Slot {
    fn open(node: Node) -> Self {
        Self {
            node,
            locked: false,
        }
    }
}

pub(crate) enum ContainerData {
    Object(IndexMap<String, Slot>),
    Array(Vec<Slot>),
}

/// Result of applying a write to storage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Applied {
    Written,
    Locked,
    Absent,
}

/// JSON type name of a leaf, for error messages.
pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl Node {
    pub(crate) fn from_json(value: Value) -> Self {
        match value {
            Value::Object(map) => {
                let slots = map
                    .into_iter()
                    .map(|(k, v)| (k, Slot::open(Self::from_json(v))))
                    .collect();
                Self::Container(Rc::new(RefCell::new(ContainerData::Object(slots))))
            }
            Value::Array(items) => {
                let slots = items
                    .into_iter()
                    .map(|v| Slot::open(Self::from_json(v)))
                    .collect();
                Self::Container(Rc::new(RefCell::new(ContainerData::Array(slots))))
            }
            leaf => Self::Leaf(leaf),
        }
    }

    pub(crate) fn to_json(&self) -> Value {
        match self {
            Self::Leaf(value) => value.clone(),
            Self::Container(container) => container.borrow().to_json(),
        }
    }
}

impl ContainerData {
    pub(crate) fn kind(&self) -> ContainerKind {
        match self {
            Self::Object(_) => ContainerKind::Object,
            Self::Array(_) => ContainerKind::Array,
        }
    }

    pub(crate) fn len(&self) -> usize {
        match self {
            Self::Object(map) => map.len(),
            Self::Array(items) => items.len(),
        }
    }

    pub(crate) fn keys(&self) -> Vec<Key> {
        match self {
            Self::Object(map) => map.keys().cloned().map(Key::Field).collect(),
            Self::Array(items) => (0..items.len()).map(Key::Index).collect(),
        }
    }

    pub(crate) fn slot(&self, key: &Key) -> Option<&Slot> {
        match self {
            Self::Object(map) => map.get(&key.as_field()),
            Self::Array(items) => key.as_index().and_then(|i| items.get(i)),
        }
    }

    /// Store `node` under `key`. Writing past the end of an array pads the
    /// gap with `null`, up to [`MAX_ARRAY_GAP`] slots and never beyond
    /// [`MAX_ARRAY_INDEX`]; larger indices are `IndexOutOfRange`.
    pub(crate) fn write(&mut self, key: &Key, node: Node) -> Result<Applied> {
        match self {
            Self::Object(map) => {
                let name = key.as_field();
                match map.get_mut(&name) {
                    Some(slot) if slot.locked => Ok(Applied::Locked),
                    Some(slot) => {
                        slot.node = node;
                        Ok(Applied::Written)
                    }
                    None => {
                        map.insert(name, Slot::open(node));
                        Ok(Applied::Written)
                    }
                }
            }
            Self::Array(items) => {
                let index = key.as_index().ok_or_else(|| FrameRefError::KeyMismatch {
                    key: key.clone(),
                    container: ContainerKind::Array,
                })?;
                if let Some(slot) = items.get_mut(index) {
                    if slot.locked {
                        return Ok(Applied::Locked);
                    }
                    slot.node = node;
                } else {
                    let len = items.len();
                    if index > MAX_ARRAY_INDEX || index - len > MAX_ARRAY_GAP {
                        return Err(FrameRefError::IndexOutOfRange { index, len });
                    }
                    items.resize_with(index, || Slot::open(Node::Leaf(Value::Null)));
                    items.push(Slot::open(node));
                }
                Ok(Applied::Written)
            }
        }
    }

    pub(crate) fn push(&mut self, node: Node) -> Result<()> {
        match self {
            Self::Array(items) => {
                items.push(Slot::open(node));
                Ok(())
            }
            Self::Object(_) => Err(FrameRefError::NotAnArray {
                container: ContainerKind::Object,
            }),
        }
    }

    pub(crate) fn remove(&mut self, key: &Key) -> Result<Applied> {
        match self {
            Self::Object(map) => {
                let name = key.as_field();
                match map.get(&name) {
                    None => Ok(Applied::Absent),
                    Some(slot) if slot.locked => Ok(Applied::Locked),
                    Some(_) => {
                        map.shift_remove(&name);
                        Ok(Applied::Written)
                    }
                }
            }
            Self::Array(items) => {
                let index = key.as_index().ok_or_else(|| FrameRefError::KeyMismatch {
                    key: key.clone(),
                    container: ContainerKind::Array,
                })?;
                match items.get(index) {
                    None => Ok(Applied::Absent),
                    Some(slot) if slot.locked => Ok(Applied::Locked),
                    Some(_) => {
                        items.remove(index);
                        Ok(Applied::Written)
                    }
                }
            }
        }
    }

    pub(crate) fn to_json(&self) -> Value {
        match self {
            Self::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, slot)| (k.clone(), slot.node.to_json()))
                    .collect(),
            ),
            Self::Array(items) => {
                Value::Array(items.iter().map(|slot| slot.node.to_json()).collect())
            }
        }
    }
}

/// Lock every slot below `root` that holds a container. Returns the number
/// of slots locked.
pub(crate) fn lock_nested(root: &Container) -> usize {
    let mut locked = 0;
    let mut stack = vec![Rc::clone(root)];
    while let Some(container) = stack.pop() {
        let mut data = container.borrow_mut();
        let slots: Box<dyn Iterator<Item = &mut Slot>> = match &mut *data {
            ContainerData::Object(map) => Box::new(map.values_mut()),
            ContainerData::Array(items) => Box::new(items.iter_mut()),
        };
        for slot in slots {
            if let Node::Container(child) = &slot.node {
                slot.locked = true;
                locked += 1;
                stack.push(Rc::clone(child));
            }
        }
    }
    locked
}
