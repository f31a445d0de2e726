//! Structured control-flow resolution.
//!
//! Matches every `block`/`loop`/`if` with its `else` and `end`, and turns a label depth
//! into the target block, its result arity and the instruction to continue at. Shared by
//! the stack-effect evaluator and the interpreter.

use alloc::{boxed::Box, vec, vec::Vec};
use stackvm_types::{BlockArgs, Instruction, ValType};

use crate::{ValidationError, ValidationErrorKind};

/// The kind of an open control block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Block,
    Loop,
    /// The `then` arm of an `if`
    If,
    /// The `else` arm of an `if`
    Else,
}

impl BlockKind {
    /// The values a branch to a block of this kind carries.
    ///
    /// Branching to a loop restarts it, so nothing is carried.
    pub fn branch_result(self, args: BlockArgs) -> Option<ValType> {
        match self {
            BlockKind::Loop => None,
            _ => args.result(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Marker {
    Plain,
    Open { else_at: Option<usize>, end_at: usize },
    Else { end_at: usize },
    End,
}

/// Branch target information for one label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Label {
    pub kind: BlockKind,
    /// Index of the `block`/`loop`/`if` that opened the label
    pub start: usize,
    /// Values carried by a branch to this label
    pub result: Option<ValType>,
    /// Instruction to continue at after branching
    pub continuation: usize,
}

impl Label {
    /// Number of values a branch to this label keeps on the stack.
    pub fn arity(&self) -> usize {
        self.result.is_some() as usize
    }
}

/// The block structure of one function body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockMap {
    markers: Box<[Marker]>,
    function_end: usize,
}

impl BlockMap {
    /// Match block markers in `instructions`.
    ///
    /// The function body may end with its own `end`; nothing may follow it.
    pub fn resolve(instructions: &[Instruction]) -> Result<Self, ValidationError> {
        let mut markers = vec![Marker::Plain; instructions.len()];
        // (start, is_if, else)
        let mut open: Vec<(usize, bool, Option<usize>)> = Vec::new();
        let mut function_end = None;

        for (i, instr) in instructions.iter().enumerate() {
            if function_end.is_some() {
                return Err(ValidationError::at(i, ValidationErrorKind::UnbalancedBlocks));
            }

            match instr {
                Instruction::Block(_) | Instruction::Loop(_) => open.push((i, false, None)),
                Instruction::If(_) => open.push((i, true, None)),
                Instruction::Else => match open.last_mut() {
                    Some((_, true, else_at @ None)) => *else_at = Some(i),
                    _ => return Err(ValidationError::at(i, ValidationErrorKind::ElseWithoutIf)),
                },
                Instruction::End => {
                    markers[i] = Marker::End;
                    match open.pop() {
                        Some((start, _, else_at)) => {
                            markers[start] = Marker::Open { else_at, end_at: i };
                            if let Some(else_at) = else_at {
                                markers[else_at] = Marker::Else { end_at: i };
                            }
                        }
                        None => function_end = Some(i),
                    }
                }
                _ => {}
            }
        }

        if let Some((start, _, _)) = open.last() {
            return Err(ValidationError::at(*start, ValidationErrorKind::UnbalancedBlocks));
        }

        Ok(Self { markers: markers.into_boxed_slice(), function_end: function_end.unwrap_or(instructions.len()) })
    }

    /// Index of the `end` closing the block opened at `start`, or closing the `else` at `start`.
    pub fn end_of(&self, start: usize) -> Option<usize> {
        match self.markers.get(start)? {
            Marker::Open { end_at, .. } | Marker::Else { end_at } => Some(*end_at),
            _ => None,
        }
    }

    /// Index of the `else` belonging to the `if` at `start`.
    pub fn else_of(&self, start: usize) -> Option<usize> {
        match self.markers.get(start)? {
            Marker::Open { else_at, .. } => *else_at,
            _ => None,
        }
    }

    /// Whether the instruction at `index` is the `end` of the function body.
    pub fn is_function_end(&self, index: usize) -> bool {
        index == self.function_end
    }

    /// Index of the function-level `end`, or the body length if it is implicit.
    pub fn function_end(&self) -> usize {
        self.function_end
    }

    /// Branch target for a label opened at `start`.
    ///
    /// Branching to a loop continues at the loop instruction itself, everything else
    /// continues after the matching `end`.
    pub fn label(&self, kind: BlockKind, start: usize, args: BlockArgs) -> Option<Label> {
        let continuation = match kind {
            BlockKind::Loop => start,
            _ => self.end_of(start)? + 1,
        };
        Some(Label { kind, start, result: kind.branch_result(args), continuation })
    }

    /// The implicit label around the whole function body; branching to it returns.
    pub fn function_label(&self, result: Option<ValType>) -> Label {
        Label { kind: BlockKind::Block, start: 0, result, continuation: self.function_end }
    }
}
