//! Tagged value representation shared by the engine, the heap, and the
//! instruction library.

use std::fmt;

use crate::bytecode::{CodeBlock, Opcode};
use crate::memory::{Handle, Object, ZString};
use crate::{CellError, CellResult};

/// The universal unit of data and code reference.
///
/// Composite kinds carry heap handles, so copying a `Value` never copies its
/// payload. The derived equality compares handles by identity; use
/// [`crate::memory::Heap::values_equal`] for text-content comparison of
/// strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Value {
    Integer(i64),
    Opcode(Opcode),
    Str(Handle<ZString>),
    Procedure(Handle<CodeBlock>),
    Record(Handle<Object>),
    Address(Address),
}

/// Back-reference to a single cell inside a code block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address {
    pub block: Handle<CodeBlock>,
    pub offset: usize,
}

/// Discriminant of a [`Value`], used in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ValueKind {
    Integer,
    Address,
    Str,
    Opcode,
    Procedure,
    Record,
}

impl ValueKind {
    pub fn name(self) -> &'static str {
        match self {
            ValueKind::Integer => "@integer",
            ValueKind::Address => "@pointer",
            ValueKind::Str => "@string",
            ValueKind::Opcode => "@instruction",
            ValueKind::Procedure => "@procedure",
            ValueKind::Record => "@object",
        }
    }

    /// Whether values of this kind own a collector-tracked allocation.
    pub fn is_heap_tracked(self) -> bool {
        matches!(
            self,
            ValueKind::Str | ValueKind::Procedure | ValueKind::Record
        )
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Integer(0)
    }
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Integer(_) => ValueKind::Integer,
            Value::Opcode(_) => ValueKind::Opcode,
            Value::Str(_) => ValueKind::Str,
            Value::Procedure(_) => ValueKind::Procedure,
            Value::Record(_) => ValueKind::Record,
            Value::Address(_) => ValueKind::Address,
        }
    }

    /// Fails with [`CellError::TypeMismatch`] unless the value is of kind
    /// `expected`. `context` names the operand in the error message.
    pub fn assert_kind(&self, expected: ValueKind, context: &str) -> CellResult<()> {
        if self.kind() == expected {
            Ok(())
        } else {
            Err(CellError::type_mismatch(context, expected.name(), self.kind()))
        }
    }

    pub fn expect_integer(&self, context: &str) -> CellResult<i64> {
        match self {
            Value::Integer(value) => Ok(*value),
            other => Err(other.mismatch(ValueKind::Integer, context)),
        }
    }

    pub fn expect_string(&self, context: &str) -> CellResult<Handle<ZString>> {
        match self {
            Value::Str(handle) => Ok(*handle),
            other => Err(other.mismatch(ValueKind::Str, context)),
        }
    }

    pub fn expect_procedure(&self, context: &str) -> CellResult<Handle<CodeBlock>> {
        match self {
            Value::Procedure(handle) => Ok(*handle),
            other => Err(other.mismatch(ValueKind::Procedure, context)),
        }
    }

    pub fn expect_record(&self, context: &str) -> CellResult<Handle<Object>> {
        match self {
            Value::Record(handle) => Ok(*handle),
            other => Err(other.mismatch(ValueKind::Record, context)),
        }
    }

    fn mismatch(&self, expected: ValueKind, context: &str) -> CellError {
        CellError::type_mismatch(context, expected.name(), self.kind())
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<Opcode> for Value {
    fn from(opcode: Opcode) -> Self {
        Value::Opcode(opcode)
    }
}

impl From<Handle<ZString>> for Value {
    fn from(handle: Handle<ZString>) -> Self {
        Value::Str(handle)
    }
}

impl From<Handle<CodeBlock>> for Value {
    fn from(handle: Handle<CodeBlock>) -> Self {
        Value::Procedure(handle)
    }
}

impl From<Handle<Object>> for Value {
    fn from(handle: Handle<Object>) -> Self {
        Value::Record(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::Heap;

    fn one_of_each(heap: &mut Heap) -> Vec<Value> {
        let text = heap.make_string("name");
        let block = heap.make_procedure(vec![Value::Integer(1)]);
        let record = heap.make_record();
        vec![
            Value::Integer(3),
            Value::Opcode(Opcode::Halt),
            Value::Str(text),
            Value::Procedure(block),
            Value::Record(record),
            Value::Address(Address { block, offset: 0 }),
        ]
    }

    #[test]
    fn fresh_values_satisfy_their_own_kind() {
        let mut heap = Heap::new();
        for value in one_of_each(&mut heap) {
            assert!(value.assert_kind(value.kind(), "self").is_ok());
        }
    }

    #[test]
    fn other_kinds_fail_with_both_names() {
        let mut heap = Heap::new();
        let values = one_of_each(&mut heap);
        for value in &values {
            for other in &values {
                if other.kind() == value.kind() {
                    continue;
                }
                let err = value.assert_kind(other.kind(), "probe").unwrap_err();
                match err {
                    CellError::TypeMismatch {
                        ref context,
                        ref expected,
                        found,
                    } => {
                        assert_eq!(context, "probe");
                        assert_eq!(expected, other.kind().name());
                        assert_eq!(found, value.kind());
                    }
                    ref unexpected => panic!("unexpected error: {unexpected:?}"),
                }
                let message = err.to_string();
                assert!(message.contains(value.kind().name()));
                assert!(message.contains(other.kind().name()));
            }
        }
    }

    #[test]
    fn default_value_is_integer_zero() {
        assert_eq!(Value::default(), Value::Integer(0));
    }

    #[test]
    fn only_composite_kinds_are_heap_tracked() {
        assert!(ValueKind::Str.is_heap_tracked());
        assert!(ValueKind::Procedure.is_heap_tracked());
        assert!(ValueKind::Record.is_heap_tracked());
        assert!(!ValueKind::Integer.is_heap_tracked());
        assert!(!ValueKind::Opcode.is_heap_tracked());
        assert!(!ValueKind::Address.is_heap_tracked());
    }
}
