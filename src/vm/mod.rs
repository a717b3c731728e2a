//! The dispatch engine: argument stack, call stack, and the
//! fetch-dispatch-execute loop.

mod frame;
pub(crate) mod instructions;

pub use frame::StackFrame;

use tracing::{debug, instrument, trace};

use crate::bytecode::CodeBlock;
use crate::config::{RootSet, RuntimeConfig};
use crate::memory::{AttrKey, Handle, Heap, Object, SweepStats, ZString};
use crate::{CellError, CellResult, Value};

/// Stack machine executing literal code blocks.
///
/// All state instructions share lives on the argument stack or in the
/// namespace of the active frame; there are no local variables.
#[derive(Debug)]
pub struct Vm {
    config: RuntimeConfig,
    heap: Heap,
    arguments: Vec<Value>,
    frames: Vec<StackFrame>,
    running: bool,
    globals: Handle<Object>,
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}

impl Vm {
    /// Fresh engine with an empty global namespace and empty stacks.
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    pub fn with_config(config: RuntimeConfig) -> Self {
        let mut heap = Heap::new();
        let globals = heap.make_record();
        Self {
            config,
            heap,
            arguments: Vec::new(),
            frames: Vec::new(),
            running: false,
            globals,
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    pub fn heap_mut(&mut self) -> &mut Heap {
        &mut self.heap
    }

    /// The global namespace record.
    pub fn globals(&self) -> Handle<Object> {
        self.globals
    }

    pub fn make_string(&mut self, text: &str) -> Handle<ZString> {
        self.heap.make_string(text)
    }

    pub fn make_record(&mut self) -> Handle<Object> {
        self.heap.make_record()
    }

    /// Allocates a block of `length` `Integer(0)` cells.
    pub fn make_procedure(&mut self, length: usize) -> Handle<CodeBlock> {
        self.heap.make_procedure(CodeBlock::zeroed(length))
    }

    /// Allocates a block holding `cells`.
    pub fn assemble(&mut self, cells: impl Into<CodeBlock>) -> Handle<CodeBlock> {
        self.heap.make_procedure(cells)
    }

    /// Binds `name` to `code` in the global namespace.
    pub fn define_word(&mut self, name: &str, code: Handle<CodeBlock>) -> CellResult<()> {
        self.heap.procedure(code)?;
        let key = self.heap.make_string(name);
        self.heap
            .set_attr(self.globals, Value::Str(key), Value::Procedure(code))?;
        debug!(name, "defined word");
        Ok(())
    }

    pub fn lookup_word(&self, name: &str) -> CellResult<Handle<CodeBlock>> {
        self.lookup_in(self.globals, name)
    }

    fn lookup_in(&self, context: Handle<Object>, name: &str) -> CellResult<Handle<CodeBlock>> {
        let binding = self
            .heap
            .record(context)?
            .getattr(&AttrKey::Text(name.into()))
            .ok_or_else(|| CellError::UnknownFunction(name.to_string()))?;
        binding.expect_procedure(&format!("Vm::lookup_word({name})"))
    }

    pub fn push(&mut self, value: Value) -> CellResult<()> {
        if self.arguments.len() >= self.config.max_stack_size() {
            return Err(CellError::StackOverflow {
                limit: self.config.max_stack_size(),
            });
        }
        self.arguments.push(value);
        Ok(())
    }

    pub fn pop(&mut self) -> CellResult<Value> {
        self.arguments.pop().ok_or(CellError::StackUnderflow)
    }

    pub fn peek(&self) -> Option<Value> {
        self.arguments.last().copied()
    }

    /// Argument stack, bottom first.
    pub fn arguments(&self) -> &[Value] {
        &self.arguments
    }

    pub fn stack_depth(&self) -> usize {
        self.arguments.len()
    }

    /// Active frames, outermost first.
    pub fn frames(&self) -> &[StackFrame] {
        &self.frames
    }

    pub fn call_depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn current_frame(&self) -> CellResult<&StackFrame> {
        self.frames
            .last()
            .ok_or_else(|| CellError::OutOfBounds("no active stack frame".into()))
    }

    /// Fetches the cell under the current cursor and advances past it.
    pub fn read_next(&mut self) -> CellResult<Value> {
        let frame = self
            .frames
            .last_mut()
            .ok_or_else(|| CellError::OutOfBounds("no active stack frame".into()))?;
        let cell = self
            .heap
            .procedure(frame.code())?
            .get(frame.cursor())
            .ok_or_else(|| CellError::OutOfBounds("read past code bounds".into()))?;
        frame.advance();
        Ok(cell)
    }

    pub fn halt(&mut self) {
        self.running = false;
    }

    /// Pushes a frame for `code` that shares the caller's namespace.
    pub fn call_procedure(&mut self, code: Handle<CodeBlock>) -> CellResult<()> {
        if self.heap.procedure(code)?.is_empty() {
            return Err(CellError::OutOfBounds(
                "attempted to execute an empty procedure".into(),
            ));
        }
        let context = self.current_frame()?.context();
        self.push_frame(StackFrame::new(code, context))
    }

    fn push_frame(&mut self, frame: StackFrame) -> CellResult<()> {
        if self.frames.len() >= self.config.max_call_depth() {
            return Err(CellError::CallDepthExceeded {
                limit: self.config.max_call_depth(),
            });
        }
        self.frames.push(frame);
        Ok(())
    }

    pub fn restore_stack_frame(&mut self) -> CellResult<()> {
        self.frames
            .pop()
            .map(|_| ())
            .ok_or_else(|| CellError::OutOfBounds("return with no active stack frame".into()))
    }

    /// Reads one cell for `compile_procedure`, binding names early when the
    /// current namespace already holds a non-empty procedure for them.
    pub(crate) fn compile_next(&mut self) -> CellResult<Value> {
        let cell = self.read_next()?;
        let Value::Str(name) = cell else {
            return Ok(cell);
        };
        let context = self.current_frame()?.context();
        let attr = AttrKey::Text(self.heap.string(name)?.into());
        match self.heap.record(context)?.getattr(&attr) {
            Some(Value::Procedure(code))
                if self
                    .heap
                    .procedure(code)
                    .is_ok_and(|block| !block.is_empty()) =>
            {
                Ok(Value::Procedure(code))
            }
            _ => Ok(cell),
        }
    }

    /// Runs one fetch-dispatch cycle.
    pub fn step(&mut self) -> CellResult<()> {
        let cell = self.read_next()?;
        trace!(
            kind = %cell.kind(),
            depth = self.frames.len(),
            stack = self.arguments.len(),
            "dispatch"
        );
        match cell {
            Value::Opcode(opcode) => (opcode.handler())(self),
            Value::Procedure(code) => self.call_procedure(code),
            Value::Str(name) => {
                let context = self.current_frame()?.context();
                let code = self.lookup_in(context, self.heap.string(name)?)?;
                self.call_procedure(code)
            }
            other => Err(CellError::type_mismatch(
                "Vm::step",
                "@instruction, @procedure, or @string",
                other.kind(),
            )),
        }
    }

    /// Pushes the initial frame for `entry` and marks the machine running,
    /// leaving the caller to drive [`Vm::step`].
    pub fn start(&mut self, entry: Handle<CodeBlock>) -> CellResult<()> {
        self.heap.procedure(entry)?;
        self.push_frame(StackFrame::new(entry, self.globals))?;
        self.running = true;
        Ok(())
    }

    /// Runs `entry` in the global namespace until a halt, then returns the
    /// top of the argument stack (`Integer(0)` when it is empty).
    ///
    /// On success the call stack is cut back to its depth before the call.
    /// On failure both stacks keep their partial state; call [`Vm::reset`]
    /// before reusing the machine.
    #[instrument(skip_all)]
    pub fn execute(&mut self, entry: Handle<CodeBlock>) -> CellResult<Value> {
        let base_depth = self.frames.len();
        self.start(entry)?;
        while self.running {
            self.step()?;
        }
        self.frames.truncate(base_depth);
        let result = self.peek().unwrap_or_default();
        debug!(result = %self.heap.display(&result), "execution halted");
        Ok(result)
    }

    /// Clears both stacks and the running flag. Frees nothing.
    pub fn reset(&mut self) {
        self.arguments.clear();
        self.frames.clear();
        self.running = false;
        debug!("machine reset");
    }

    /// Explicit mark-sweep over the configured root set.
    #[instrument(skip_all)]
    pub fn collect_garbage(&mut self) -> SweepStats {
        for value in &self.arguments {
            self.heap.mark(*value);
        }
        match self.config.roots() {
            RootSet::Machine => {
                self.heap.mark(Value::Record(self.globals));
                for frame in &self.frames {
                    self.heap.mark(Value::Procedure(frame.code()));
                    self.heap.mark(Value::Record(frame.context()));
                }
            }
            RootSet::ArgumentStack => self.heap.pin(self.globals),
        }
        let stats = self.heap.sweep();
        debug!(%stats, "collected garbage");
        stats
    }

    /// Printable form of `value`.
    pub fn render(&self, value: &Value) -> String {
        self.heap.display(value).to_string()
    }

    /// Active frames rendered innermost first.
    pub fn backtrace(&self) -> Vec<String> {
        self.frames
            .iter()
            .rev()
            .map(|frame| frame.describe(&self.heap))
            .collect()
    }
}
