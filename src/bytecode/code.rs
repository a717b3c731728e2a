use crate::Value;

/// Immutable compiled procedure body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    text: Box<[Value]>,
}

impl CodeBlock {
    pub fn new(text: impl Into<Box<[Value]>>) -> Self {
        Self { text: text.into() }
    }

    /// Block of `length` cells, each `Integer(0)`.
    pub fn zeroed(length: usize) -> Self {
        Self::new(vec![Value::default(); length])
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn get(&self, offset: usize) -> Option<Value> {
        self.text.get(offset).copied()
    }

    pub fn cells(&self) -> &[Value] {
        &self.text
    }
}

impl From<Vec<Value>> for CodeBlock {
    fn from(cells: Vec<Value>) -> Self {
        Self::new(cells)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Opcode;

    #[test]
    fn zeroed_block_holds_integer_zero() {
        let block = CodeBlock::zeroed(3);
        assert_eq!(block.len(), 3);
        assert!(block.cells().iter().all(|cell| *cell == Value::Integer(0)));
    }

    #[test]
    fn get_past_end_is_none() {
        let block = CodeBlock::from(vec![Value::Opcode(Opcode::Halt)]);
        assert_eq!(block.get(0), Some(Value::Opcode(Opcode::Halt)));
        assert_eq!(block.get(1), None);
    }
}
