//! Code representation: the opcode set and immutable code blocks.

pub mod code;
pub mod opcode;

pub use code::CodeBlock;
pub use opcode::{Instruction, Opcode};
