use alloc::vec::Vec;

use crate::{Label, unlikely};

#[derive(Debug, Clone, Default)]
pub(crate) struct BlockStack(Vec<BlockFrame>);

impl BlockStack {
    #[inline(always)]
    pub(crate) fn len(&self) -> usize {
        self.0.len()
    }

    #[inline(always)]
    pub(crate) fn push(&mut self, block: BlockFrame) {
        self.0.push(block);
    }

    #[inline]
    pub(crate) fn pop(&mut self) -> Option<BlockFrame> {
        self.0.pop()
    }

    /// The block `depth` levels out from the innermost one.
    #[inline]
    pub(crate) fn get_relative(&self, depth: u32) -> Option<&BlockFrame> {
        // the vast majority of branches don't target the function label
        if unlikely(depth as usize >= self.0.len()) {
            return None;
        }
        Some(&self.0[self.0.len() - depth as usize - 1])
    }

    /// Discard the block `depth` levels out and everything inside it.
    #[inline]
    pub(crate) fn unwind(&mut self, depth: u32) {
        let len = self.0.len().saturating_sub(depth as usize + 1);
        self.0.truncate(len);
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct BlockFrame {
    pub(crate) label: Label,
    /// Operand stack height when the block was entered
    pub(crate) height: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BlockKind;

    fn frame(start: usize) -> BlockFrame {
        BlockFrame { label: Label { kind: BlockKind::Block, start, result: None, continuation: start + 10 }, height: 0 }
    }

    #[test]
    fn relative_lookup_and_unwind() {
        let mut blocks = BlockStack::default();
        blocks.push(frame(0));
        blocks.push(frame(1));
        blocks.push(frame(2));

        assert_eq!(blocks.get_relative(0).map(|b| b.label.start), Some(2));
        assert_eq!(blocks.get_relative(2).map(|b| b.label.start), Some(0));
        assert!(blocks.get_relative(3).is_none());

        blocks.unwind(1);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks.pop().map(|b| b.label.start), Some(0));
    }
}
