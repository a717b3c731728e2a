use crate::bytecode::CodeBlock;
use crate::memory::{Handle, Heap, Object};
use crate::Value;

/// One call activation.
///
/// The frame encodes where to resume (`code` + `cursor`) and which namespace
/// is visible (`context`). It owns neither; both live in the [`Heap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackFrame {
    code: Handle<CodeBlock>,
    context: Handle<Object>,
    cursor: usize,
}

impl StackFrame {
    pub fn new(code: Handle<CodeBlock>, context: Handle<Object>) -> Self {
        Self {
            code,
            context,
            cursor: 0,
        }
    }

    pub fn code(&self) -> Handle<CodeBlock> {
        self.code
    }

    pub fn context(&self) -> Handle<Object> {
        self.context
    }

    /// Offset of the next cell to fetch.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub(crate) fn advance(&mut self) {
        self.cursor += 1;
    }

    /// `<start|cursor>` followed by the rendered block.
    pub fn describe(&self, heap: &Heap) -> String {
        format!(
            "<0|{}>{}",
            self.cursor,
            heap.display(&Value::Procedure(self.code))
        )
    }
}
