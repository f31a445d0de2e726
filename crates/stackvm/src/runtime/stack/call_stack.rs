use alloc::{boxed::Box, vec::Vec};
use stackvm_types::{FuncAddr, ValType, WasmValue};

use super::{BlockStack, ValueStack};
use crate::{Error, Result, Trap};

// initial call stack capacity
pub(crate) const CALL_STACK_SIZE: usize = 128;

#[derive(Debug)]
pub(crate) struct CallStack {
    stack: Vec<CallFrame>,
    max_depth: usize,
}

impl CallStack {
    pub(crate) fn new(max_depth: usize) -> Self {
        Self { stack: Vec::with_capacity(CALL_STACK_SIZE.min(max_depth)), max_depth }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.stack.len()
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    #[inline]
    pub(crate) fn top(&self) -> Option<&CallFrame> {
        self.stack.last()
    }

    #[inline]
    pub(crate) fn top_mut(&mut self) -> Result<&mut CallFrame> {
        self.stack.last_mut().ok_or_else(|| Error::Other("no active call frame".into()))
    }

    /// Push a frame, trapping once `max_depth` frames are active.
    #[inline]
    pub(crate) fn push(&mut self, frame: CallFrame) -> Result<()> {
        if self.stack.len() >= self.max_depth {
            return Err(Trap::CallStackOverflow.into());
        }
        self.stack.push(frame);
        Ok(())
    }

    #[inline]
    pub(crate) fn pop(&mut self) -> Option<CallFrame> {
        self.stack.pop()
    }

    pub(crate) fn clear(&mut self) {
        self.stack.clear();
    }
}

/// One active function invocation.
#[derive(Debug)]
pub(crate) struct CallFrame {
    pub(crate) func: FuncAddr,
    /// Position of the function in the module's list of defined functions
    pub(crate) body: usize,
    pub(crate) ip: usize,
    pub(crate) result: Option<ValType>,
    /// Parameters followed by declared locals
    pub(crate) locals: Box<[WasmValue]>,
    pub(crate) values: ValueStack,
    pub(crate) blocks: BlockStack,
}

impl CallFrame {
    /// A frame whose leading locals are `args`, with `locals` zero-initialized after them.
    pub(crate) fn new(
        func: FuncAddr,
        body: usize,
        args: impl IntoIterator<Item = WasmValue>,
        locals: &[ValType],
        result: Option<ValType>,
    ) -> Self {
        let locals = args.into_iter().chain(locals.iter().map(ValType::default_value)).collect();
        Self { func, body, ip: 0, result, locals, values: ValueStack::default(), blocks: BlockStack::default() }
    }

    #[inline]
    pub(crate) fn local(&self, index: u32) -> Result<WasmValue> {
        self.locals.get(index as usize).copied().ok_or_else(|| Error::Other(alloc::format!("unknown local {index}")))
    }

    #[inline]
    pub(crate) fn set_local(&mut self, index: u32, value: WasmValue) -> Result<()> {
        match self.locals.get_mut(index as usize) {
            Some(slot) if slot.val_type() == value.val_type() => {
                *slot = value;
                Ok(())
            }
            _ => Err(Error::Other(alloc::format!("cannot set local {index} to {value:?}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locals_follow_arguments() {
        let mut frame = CallFrame::new(0, 0, [WasmValue::I32(5)], &[ValType::F64, ValType::I64], None);
        assert_eq!(&*frame.locals, &[WasmValue::I32(5), WasmValue::F64(0.0), WasmValue::I64(0)]);

        frame.set_local(2, WasmValue::I64(9)).unwrap();
        assert_eq!(frame.local(2).unwrap(), WasmValue::I64(9));
        assert!(frame.set_local(2, WasmValue::I32(1)).is_err());
        assert!(frame.local(3).is_err());
    }

    #[test]
    fn depth_is_bounded() {
        let mut stack = CallStack::new(2);
        stack.push(CallFrame::new(0, 0, [], &[], None)).unwrap();
        stack.push(CallFrame::new(0, 0, [], &[], None)).unwrap();
        let overflow = stack.push(CallFrame::new(0, 0, [], &[], None));
        assert!(matches!(overflow, Err(Error::Trap(Trap::CallStackOverflow))));
        assert_eq!(stack.len(), 2);
    }
}
