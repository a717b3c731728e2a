//! Builtin opcodes understood by the dispatch engine.

use std::fmt;

use crate::vm::{instructions, Vm};
use crate::CellResult;

/// Signature shared by every builtin handler.
pub type Instruction = fn(&mut Vm) -> CellResult<()>;

/// Closed set of primitive operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Opcode {
    /// `-- cell`: push the next cell of the stream.
    LoadImmediate,
    /// `-- procedure`: compile the next `n` cells into a new code block.
    Compile,
    /// `-- record`
    MakeRecord,
    /// `value key record -- record`
    SetAttr,
    /// `key record -- value`
    GetAttr,
    /// `int int -- int`
    AddInt,
    /// `procedure --`: call with the current context.
    Call,
    Return,
    Halt,
}

impl Opcode {
    pub const ALL: [Opcode; 9] = [
        Opcode::LoadImmediate,
        Opcode::Compile,
        Opcode::MakeRecord,
        Opcode::SetAttr,
        Opcode::GetAttr,
        Opcode::AddInt,
        Opcode::Call,
        Opcode::Return,
        Opcode::Halt,
    ];

    /// Diagnostic name; plays no part in dispatch.
    pub fn name(self) -> &'static str {
        match self {
            Opcode::LoadImmediate => "load_immediate",
            Opcode::Compile => "compile_procedure",
            Opcode::MakeRecord => "create_empty_object",
            Opcode::SetAttr => "set_object_attribute",
            Opcode::GetAttr => "get_object_attribute",
            Opcode::AddInt => "add_int32",
            Opcode::Call => "execute_stack_procedure",
            Opcode::Return => "return_from_function",
            Opcode::Halt => "exit_program",
        }
    }

    /// Dispatch table entry for this opcode.
    pub fn handler(self) -> Instruction {
        match self {
            Opcode::LoadImmediate => instructions::load_immediate,
            Opcode::Compile => instructions::compile_procedure,
            Opcode::MakeRecord => instructions::create_empty_object,
            Opcode::SetAttr => instructions::set_object_attribute,
            Opcode::GetAttr => instructions::get_object_attribute,
            Opcode::AddInt => instructions::add_int32,
            Opcode::Call => instructions::execute_stack_procedure,
            Opcode::Return => instructions::return_from_function,
            Opcode::Halt => instructions::exit_program,
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.name())
    }
}
