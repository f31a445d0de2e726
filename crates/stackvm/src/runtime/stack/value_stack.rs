use alloc::{format, vec::Vec};
use stackvm_types::{ValType, WasmValue};

use crate::{Error, Result, cold};

pub(crate) const MIN_VALUE_STACK_SIZE: usize = 64;

/// The operand stack of one call frame.
#[derive(Debug, Clone)]
pub(crate) struct ValueStack(Vec<WasmValue>);

impl Default for ValueStack {
    fn default() -> Self {
        Self(Vec::with_capacity(MIN_VALUE_STACK_SIZE))
    }
}

impl ValueStack {
    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub(crate) fn as_slice(&self) -> &[WasmValue] {
        &self.0
    }

    #[inline]
    pub(crate) fn push(&mut self, value: WasmValue) {
        self.0.push(value);
    }

    #[inline]
    pub(crate) fn pop(&mut self) -> Result<WasmValue> {
        match self.0.pop() {
            Some(value) => Ok(value),
            None => {
                cold();
                Err(Error::Other("operand stack underflow".into()))
            }
        }
    }

    /// Pop a value that must have type `ty`.
    #[inline]
    pub(crate) fn pop_typed(&mut self, ty: ValType) -> Result<WasmValue> {
        let value = self.pop()?;
        if value.val_type() != ty {
            cold();
            return Err(Error::Other(format!("operand type mismatch: expected {ty}, found {value:?}")));
        }
        Ok(value)
    }

    /// Drop everything above `height` except the top `arity` values.
    pub(crate) fn truncate_keep(&mut self, height: usize, arity: usize) {
        let len = self.0.len();
        if len <= height + arity {
            return;
        }
        self.0.drain(height..len - arity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_keep() {
        let mut stack = ValueStack::default();
        for i in 0..5 {
            stack.push(WasmValue::I32(i));
        }

        stack.truncate_keep(1, 1);
        assert_eq!(stack.as_slice(), &[WasmValue::I32(0), WasmValue::I32(4)]);

        stack.truncate_keep(0, 2);
        assert_eq!(stack.len(), 2);

        stack.truncate_keep(0, 0);
        assert_eq!(stack.len(), 0);
    }

    #[test]
    fn test_pop_typed() {
        let mut stack = ValueStack::default();
        stack.push(WasmValue::F32(1.0));
        assert!(stack.pop_typed(ValType::I32).is_err());
        stack.push(WasmValue::I64(3));
        assert_eq!(stack.pop_typed(ValType::I64).unwrap(), WasmValue::I64(3));
        assert!(stack.pop().is_err());
    }
}
