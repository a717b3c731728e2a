use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;

use super::arena::{Handle, Slots};
use super::object::{AttrKey, Object};
use crate::bytecode::CodeBlock;
use crate::value::ValueKind;
use crate::{CellError, CellResult, Value};

/// Managed, immutable text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZString(Box<str>);

impl ZString {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Outcome of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepStats {
    pub strings_freed: usize,
    pub procedures_freed: usize,
    pub records_freed: usize,
    pub live: usize,
}

impl SweepStats {
    pub fn freed(&self) -> usize {
        self.strings_freed + self.procedures_freed + self.records_freed
    }
}

impl fmt::Display for SweepStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "freed {} ({} strings, {} procedures, {} records), {} live",
            self.freed(),
            self.strings_freed,
            self.procedures_freed,
            self.records_freed,
            self.live
        )
    }
}

/// Live allocation counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeapStats {
    pub strings: usize,
    pub procedures: usize,
    pub records: usize,
}

impl HeapStats {
    pub fn total(&self) -> usize {
        self.strings + self.procedures + self.records
    }
}

impl fmt::Display for HeapStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} allocations ({} strings, {} procedures, {} records)",
            self.total(),
            self.strings,
            self.procedures,
            self.records
        )
    }
}

/// Owner of every string, code block, and record the machine allocates.
///
/// Reclamation is stop-the-world mark-sweep and only happens when the owner
/// calls [`Heap::mark`] for each root followed by [`Heap::sweep`].
#[derive(Debug, Default)]
pub struct Heap {
    strings: Slots<ZString>,
    procedures: Slots<CodeBlock>,
    records: Slots<Object>,
}

impl Heap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn make_string(&mut self, text: &str) -> Handle<ZString> {
        self.strings.allocate(ZString(text.into()))
    }

    pub fn make_procedure(&mut self, block: impl Into<CodeBlock>) -> Handle<CodeBlock> {
        self.procedures.allocate(block.into())
    }

    pub fn make_record(&mut self) -> Handle<Object> {
        self.records.allocate(Object::new())
    }

    pub fn string(&self, handle: Handle<ZString>) -> CellResult<&str> {
        self.strings
            .get(handle)
            .map(ZString::as_str)
            .ok_or_else(|| stale(ValueKind::Str, handle.raw()))
    }

    pub fn procedure(&self, handle: Handle<CodeBlock>) -> CellResult<&CodeBlock> {
        self.procedures
            .get(handle)
            .ok_or_else(|| stale(ValueKind::Procedure, handle.raw()))
    }

    pub fn record(&self, handle: Handle<Object>) -> CellResult<&Object> {
        self.records
            .get(handle)
            .ok_or_else(|| stale(ValueKind::Record, handle.raw()))
    }

    fn record_mut(&mut self, handle: Handle<Object>) -> CellResult<&mut Object> {
        self.records
            .get_mut(handle)
            .ok_or_else(|| stale(ValueKind::Record, handle.raw()))
    }

    /// Whether the allocation behind `value` still exists. Values that own
    /// no allocation are always live.
    pub fn is_live(&self, value: &Value) -> bool {
        match value {
            Value::Str(handle) => self.strings.contains(*handle),
            Value::Procedure(handle) => self.procedures.contains(*handle),
            Value::Record(handle) => self.records.contains(*handle),
            Value::Integer(_) | Value::Opcode(_) | Value::Address(_) => true,
        }
    }

    pub fn attr_key(&self, key: &Value) -> CellResult<AttrKey> {
        Ok(match key {
            Value::Integer(value) => AttrKey::Integer(*value),
            Value::Opcode(opcode) => AttrKey::Opcode(*opcode),
            Value::Str(handle) => AttrKey::Text(self.string(*handle)?.into()),
            Value::Procedure(handle) => AttrKey::Procedure(*handle),
            Value::Record(handle) => AttrKey::Record(*handle),
            Value::Address(address) => AttrKey::Address(*address),
        })
    }

    /// Returns `true` when the key was not present before.
    pub fn set_attr(
        &mut self,
        record: Handle<Object>,
        key: Value,
        value: Value,
    ) -> CellResult<bool> {
        let attr = self.attr_key(&key)?;
        Ok(self.record_mut(record)?.setattr(attr, key, value))
    }

    pub fn get_attr(&self, record: Handle<Object>, key: Value) -> CellResult<Value> {
        let attr = self.attr_key(&key)?;
        self.record(record)?.getattr(&attr).ok_or_else(|| {
            CellError::KeyNotFound(format!("Could not find key \"{}\"", self.display(&key)))
        })
    }

    /// Value-based for integers and string content, identity for the rest.
    pub fn values_equal(&self, lhs: &Value, rhs: &Value) -> bool {
        self.compare(lhs, rhs) == Ordering::Equal
    }

    /// Total order: kind first, then payload.
    pub fn compare(&self, lhs: &Value, rhs: &Value) -> Ordering {
        match (lhs, rhs) {
            (Value::Integer(a), Value::Integer(b)) => a.cmp(b),
            (Value::Opcode(a), Value::Opcode(b)) => a.cmp(b),
            (Value::Str(a), Value::Str(b)) => match (self.strings.get(*a), self.strings.get(*b)) {
                (Some(a), Some(b)) => a.as_str().cmp(b.as_str()),
                _ => a.cmp(b),
            },
            (Value::Procedure(a), Value::Procedure(b)) => a.cmp(b),
            (Value::Record(a), Value::Record(b)) => a.cmp(b),
            (Value::Address(a), Value::Address(b)) => a.cmp(b),
            _ => lhs.kind().cmp(&rhs.kind()),
        }
    }

    /// Marks `root` and everything reachable from it.
    ///
    /// Records trace every key and value, procedures every cell. Already
    /// marked entries stop the walk, so cycles terminate.
    pub fn mark(&mut self, root: Value) {
        let mut gray = vec![root];
        while let Some(value) = gray.pop() {
            match value {
                Value::Str(handle) => {
                    self.strings.mark(handle);
                }
                Value::Procedure(handle) => {
                    if self.procedures.mark(handle) {
                        if let Some(block) = self.procedures.get(handle) {
                            gray.extend_from_slice(block.cells());
                        }
                    }
                }
                Value::Record(handle) => {
                    if self.records.mark(handle) {
                        if let Some(record) = self.records.get(handle) {
                            for (key, value) in record.iter() {
                                gray.push(key);
                                gray.push(value);
                            }
                        }
                    }
                }
                Value::Integer(_) | Value::Opcode(_) | Value::Address(_) => {}
            }
        }
    }

    /// Keeps `record` alive through the next sweep without tracing its
    /// contents.
    pub fn pin(&mut self, record: Handle<Object>) {
        self.records.mark(record);
    }

    pub fn is_marked(&self, value: &Value) -> bool {
        match value {
            Value::Str(handle) => self.strings.is_marked(*handle),
            Value::Procedure(handle) => self.procedures.is_marked(*handle),
            Value::Record(handle) => self.records.is_marked(*handle),
            Value::Integer(_) | Value::Opcode(_) | Value::Address(_) => false,
        }
    }

    /// Frees every unmarked allocation and clears the surviving marks.
    pub fn sweep(&mut self) -> SweepStats {
        let strings_freed = self.strings.sweep();
        let procedures_freed = self.procedures.sweep();
        let records_freed = self.records.sweep();
        SweepStats {
            strings_freed,
            procedures_freed,
            records_freed,
            live: self.stats().total(),
        }
    }

    pub fn stats(&self) -> HeapStats {
        HeapStats {
            strings: self.strings.len(),
            procedures: self.procedures.len(),
            records: self.records.len(),
        }
    }

    /// Printable form of `value`, resolving its heap payload.
    pub fn display<'a>(&'a self, value: &Value) -> Rendered<'a> {
        Rendered { heap: self, value: *value }
    }

    fn render(
        &self,
        value: &Value,
        open: &mut HashSet<Handle<Object>>,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match value {
            Value::Integer(number) => write!(f, "${number}"),
            Value::Opcode(opcode) => write!(f, "{opcode}"),
            Value::Str(handle) => match self.strings.get(*handle) {
                Some(text) => write!(f, "\"{}\"", text.as_str()),
                None => f.write_str(COLLECTED),
            },
            Value::Procedure(handle) => match self.procedures.get(*handle) {
                Some(block) => {
                    f.write_str("procedure(")?;
                    self.render_block(block, open, f)?;
                    f.write_str(")")
                }
                None => f.write_str(COLLECTED),
            },
            Value::Record(handle) => {
                let Some(record) = self.records.get(*handle) else {
                    return f.write_str(COLLECTED);
                };
                if !open.insert(*handle) {
                    return f.write_str("{...}");
                }
                f.write_str("{")?;
                for (index, (key, value)) in record.iter().enumerate() {
                    if index > 0 {
                        f.write_str(" ")?;
                    }
                    self.render(&key, open, f)?;
                    f.write_str(" => ")?;
                    self.render(&value, open, f)?;
                    if record.size() > 1 {
                        f.write_str(";")?;
                    }
                }
                open.remove(handle);
                f.write_str("}")
            }
            Value::Address(address) => {
                let target = self
                    .procedures
                    .get(address.block)
                    .and_then(|block| block.get(address.offset));
                match target {
                    Some(cell) => {
                        f.write_str("&(")?;
                        self.render(&cell, open, f)?;
                        f.write_str(")")
                    }
                    None => write!(f, "&({COLLECTED})"),
                }
            }
        }
    }

    fn render_block(
        &self,
        block: &CodeBlock,
        open: &mut HashSet<Handle<Object>>,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "size={}, [", block.len())?;
        for (index, cell) in block.cells().iter().enumerate() {
            if index > 0 {
                f.write_str(" ")?;
            }
            self.render(cell, open, f)?;
        }
        f.write_str("]")
    }
}

const COLLECTED: &str = "<collected>";

fn stale(kind: ValueKind, index: u32) -> CellError {
    CellError::StaleHandle { kind, index }
}

/// Display adapter returned by [`Heap::display`].
pub struct Rendered<'a> {
    heap: &'a Heap,
    value: Value,
}

impl fmt::Display for Rendered<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut open = HashSet::new();
        self.heap.render(&self.value, &mut open, f)
    }
}
