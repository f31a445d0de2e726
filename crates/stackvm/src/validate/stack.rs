use alloc::vec::Vec;
use stackvm_types::ValType;

/// The symbolic operand stack of the stack-effect evaluator.
///
/// Once code becomes statically unreachable the stack is [`TypeStack::Unknown`]: pops
/// always succeed with whatever the consumer expected, and pushes do not make it known
/// again. Only the end of the enclosing block restores a known stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeStack {
    /// Value types, bottom first
    Known(Vec<ValType>),
    Unknown,
}

/// Outcome of popping from a [`TypeStack`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Popped {
    Value(ValType),
    /// The stack is unknown; the consumer's expectation stands in for the value
    Polymorphic,
    /// Nothing left above `floor`
    Underflow,
}

impl Default for TypeStack {
    fn default() -> Self {
        Self::Known(Vec::new())
    }
}

impl TypeStack {
    pub fn is_known(&self) -> bool {
        matches!(self, Self::Known(_))
    }

    /// Height of a known stack.
    pub fn height(&self) -> Option<usize> {
        match self {
            Self::Known(types) => Some(types.len()),
            Self::Unknown => None,
        }
    }

    pub fn as_slice(&self) -> Option<&[ValType]> {
        match self {
            Self::Known(types) => Some(types),
            Self::Unknown => None,
        }
    }

    pub(crate) fn push(&mut self, ty: ValType) {
        if let Self::Known(types) = self {
            types.push(ty);
        }
    }

    /// Pop one value, refusing to go below `floor` (the enclosing block's entry height).
    pub(crate) fn pop(&mut self, floor: usize) -> Popped {
        match self {
            Self::Unknown => Popped::Polymorphic,
            Self::Known(types) if types.len() <= floor => Popped::Underflow,
            Self::Known(types) => types.pop().map_or(Popped::Underflow, Popped::Value),
        }
    }

    /// Look at the value `depth` places below the top without removing it.
    pub(crate) fn peek(&self, depth: usize, floor: usize) -> Popped {
        match self {
            Self::Unknown => Popped::Polymorphic,
            Self::Known(types) if types.len() <= floor + depth => Popped::Underflow,
            Self::Known(types) => Popped::Value(types[types.len() - 1 - depth]),
        }
    }

    pub(crate) fn mark_unknown(&mut self) {
        *self = Self::Unknown;
    }

    /// `self` extended by an optional result, used when a block ends.
    pub(crate) fn with_result(&self, result: Option<ValType>) -> Self {
        let mut stack = self.clone();
        if let Some(ty) = result {
            stack.push(ty);
        }
        stack
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn known_stack_respects_floor() {
        let mut stack = TypeStack::Known(vec![ValType::I32, ValType::F64]);
        assert_eq!(stack.peek(0, 0), Popped::Value(ValType::F64));
        assert_eq!(stack.peek(1, 0), Popped::Value(ValType::I32));
        assert_eq!(stack.peek(1, 1), Popped::Underflow);
        assert_eq!(stack.pop(1), Popped::Value(ValType::F64));
        assert_eq!(stack.pop(1), Popped::Underflow);
        assert_eq!(stack.height(), Some(1));
    }

    #[test]
    fn unknown_stack_is_polymorphic() {
        let mut stack = TypeStack::default();
        stack.mark_unknown();
        stack.push(ValType::I64);
        assert_eq!(stack.pop(0), Popped::Polymorphic);
        assert_eq!(stack.height(), None);
        assert!(!stack.with_result(Some(ValType::I32)).is_known());
    }
}
