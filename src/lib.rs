#![forbid(unsafe_code)]

//! cell_core – a minimal stack machine with a dynamic record type and its
//! own tracing collector.
//!
//! The crate exposes four building blocks:
//!
//! * [`Value`] – the tagged cell every instruction reads and writes.
//! * [`bytecode`] – the closed [`Opcode`] set and immutable [`CodeBlock`]s.
//! * [`memory`] – the [`Heap`] owning strings, code blocks, and records, with
//!   explicit mark-sweep reclamation.
//! * [`Vm`] – the dispatch engine with its argument stack and call stack.
//!
//! Programs are literal sequences of values; there is no text or binary
//! program format. A host builds a block, hands it to [`Vm::execute`], and
//! reclaims memory with [`Vm::collect_garbage`] when it chooses to.

pub mod bytecode;
pub mod config;
pub mod memory;
pub mod value;
pub mod vm;

use thiserror::Error;

pub use bytecode::{CodeBlock, Opcode};
pub use config::{ConfigError, RootSet, RuntimeConfig};
pub use memory::{AttrKey, Handle, Heap, HeapStats, Object, SweepStats, ZString};
pub use value::{Address, Value, ValueKind};
pub use vm::{StackFrame, Vm};

/// Result type used across cell_core.
pub type CellResult<T> = std::result::Result<T, CellError>;

/// Every failure is fatal to the running program and surfaces from
/// [`Vm::execute`] unchanged.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CellError {
    #[error("illegal operand type from {context} - expected {expected} but received {found}")]
    TypeMismatch {
        context: String,
        expected: String,
        found: ValueKind,
    },
    #[error("execution out of bounds: {0}")]
    OutOfBounds(String),
    #[error("unknown function {0}")]
    UnknownFunction(String),
    #[error("{0}")]
    KeyNotFound(String),
    #[error("not implemented: {0}")]
    NotImplemented(String),
    #[error("argument stack underflow")]
    StackUnderflow,
    #[error("argument stack overflow (limit {limit})")]
    StackOverflow { limit: usize },
    #[error("call depth exceeded (limit {limit})")]
    CallDepthExceeded { limit: usize },
    #[error("{kind} handle {index} refers to a collected allocation")]
    StaleHandle { kind: ValueKind, index: u32 },
}

impl CellError {
    pub(crate) fn type_mismatch(
        context: impl Into<String>,
        expected: impl Into<String>,
        found: ValueKind,
    ) -> Self {
        CellError::TypeMismatch {
            context: context.into(),
            expected: expected.into(),
            found,
        }
    }
}
