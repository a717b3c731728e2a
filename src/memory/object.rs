//! Dynamic record, also used as the machine's global namespace.

use indexmap::IndexMap;

use super::arena::Handle;
use crate::bytecode::{CodeBlock, Opcode};
use crate::value::Address;
use crate::Value;

/// Normalized record key.
///
/// Strings compare by text, every other kind by the identity the [`Value`]
/// already carries. Building one for a string needs the heap, see
/// [`super::Heap::attr_key`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AttrKey {
    Integer(i64),
    Opcode(Opcode),
    Text(Box<str>),
    Procedure(Handle<CodeBlock>),
    Record(Handle<Object>),
    Address(Address),
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    key: Value,
    value: Value,
}

/// Ordered association of unique keys to values.
///
/// Iteration yields the most recently inserted key first. Overwriting an
/// existing key keeps both its position and the originally stored key value.
#[derive(Debug, Clone, Default)]
pub struct Object {
    entries: IndexMap<AttrKey, Entry>,
}

impl Object {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes `value` under `attr`. Returns `true` when a new pair was added.
    pub fn setattr(&mut self, attr: AttrKey, key: Value, value: Value) -> bool {
        if let Some(entry) = self.entries.get_mut(&attr) {
            entry.value = value;
            return false;
        }
        self.entries.insert(attr, Entry { key, value });
        true
    }

    pub fn getattr(&self, attr: &AttrKey) -> Option<Value> {
        self.entries.get(attr).map(|entry| entry.value)
    }

    pub fn contains(&self, attr: &AttrKey) -> bool {
        self.entries.contains_key(attr)
    }

    pub fn size(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Key/value pairs in lockstep, newest first.
    pub fn iter(&self) -> impl Iterator<Item = (Value, Value)> + '_ {
        self.entries
            .values()
            .rev()
            .map(|entry| (entry.key, entry.value))
    }

    pub fn keys(&self) -> impl Iterator<Item = Value> + '_ {
        self.iter().map(|(key, _)| key)
    }

    pub fn values(&self) -> impl Iterator<Item = Value> + '_ {
        self.iter().map(|(_, value)| value)
    }
}
