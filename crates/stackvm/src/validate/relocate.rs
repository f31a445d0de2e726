use alloc::vec::Vec;
use core::ops::Range;
use stackvm_types::ValType;

use super::{FunctionEffects, StackChange};

/// A contiguous instruction range that can be moved into a helper function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelocatableRange {
    pub range: Range<usize>,
    /// The value the range leaves on the stack, if any
    pub pushes: Option<ValType>,
}

impl FunctionEffects {
    /// Check whether `range` can be moved into a separate function.
    ///
    /// Every instruction in it must be relocatable, the stack must be known where it
    /// starts, the running height must never drop below that starting height, and the
    /// range as a whole must leave zero or one extra value behind.
    pub fn is_relocatable(&self, range: Range<usize>) -> Option<RelocatableRange> {
        if range.is_empty() || range.end > self.effects.len() {
            return None;
        }
        let effects = &self.effects[range.clone()];
        effects.first()?.height_before?;

        let mut height: isize = 0;
        for effect in effects {
            if !effect.relocatable || effect.height_before.is_none() {
                return None;
            }
            for change in &effect.changes {
                match change {
                    StackChange::Pop(_) => height -= 1,
                    StackChange::Push(_) => height += 1,
                }
                if height < 0 {
                    return None;
                }
            }
        }

        let pushes = match height {
            0 => None,
            1 => Some(effects.last()?.top_after?),
            _ => return None,
        };
        Some(RelocatableRange { range, pushes })
    }

    /// All relocatable ranges between `min_len` and `max_len` instructions long, longest
    /// first and then by start position.
    pub fn relocatable_ranges(&self, min_len: usize, max_len: usize) -> Vec<RelocatableRange> {
        let min_len = min_len.max(1);
        let mut ranges = Vec::new();

        for start in 0..self.effects.len() {
            // grow the window from `start` while it stays relocatable and above its floor
            let mut height: isize = 0;
            for (end, effect) in self.effects.iter().enumerate().skip(start).take(max_len) {
                if !effect.relocatable || effect.height_before.is_none() {
                    break;
                }
                for change in &effect.changes {
                    match change {
                        StackChange::Pop(_) => height -= 1,
                        StackChange::Push(_) => height += 1,
                    }
                    if height < 0 {
                        break;
                    }
                }
                if height < 0 {
                    break;
                }

                let len = end + 1 - start;
                let pushes = match height {
                    0 => None,
                    1 => match effect.top_after {
                        Some(ty) => Some(ty),
                        None => continue,
                    },
                    _ => continue,
                };
                if len >= min_len {
                    ranges.push(RelocatableRange { range: start..end + 1, pushes });
                }
            }
        }

        ranges.sort_by(|a, b| b.range.len().cmp(&a.range.len()).then(a.range.start.cmp(&b.range.start)));
        ranges
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::validate_body;
    use alloc::vec;
    use stackvm_types::{FuncType, Instruction::*, Module};

    fn effects(body: Vec<stackvm_types::Instruction>) -> FunctionEffects {
        let ty = FuncType::new(&[ValType::I32], Some(ValType::I32));
        validate_body(&Module::default(), &ty, &[], &body, true).unwrap()
    }

    #[test]
    fn qualifying_ranges() {
        // local.get 0; i32.const 1; i32.const 2; i32.mul; i32.add; end
        let fx = effects(vec![LocalGet(0), I32Const(1), I32Const(2), I32Mul, I32Add, End]);

        let range = fx.is_relocatable(1..4).unwrap();
        assert_eq!(range.pushes, Some(ValType::I32));

        // touches a local
        assert!(fx.is_relocatable(0..4).is_none());
        // pops a value from below its start
        assert!(fx.is_relocatable(3..5).is_none());
        // leaves two values
        assert!(fx.is_relocatable(1..3).is_none());
        // block marker
        assert!(fx.is_relocatable(4..6).is_none());
    }

    #[test]
    fn ranges_are_ordered() {
        let fx = effects(vec![I32Const(1), Drop, I32Const(2), I32Const(3), I32Add, Drop, LocalGet(0), End]);
        let ranges: Vec<_> = fx.relocatable_ranges(2, 6).into_iter().map(|r| r.range).collect();
        assert_eq!(ranges, vec![0..6, 0..5, 2..6, 0..3, 2..5, 0..2]);
    }

    #[test]
    fn ranges_agree_with_the_single_range_check() {
        let fx = effects(vec![
            I32Const(1),
            I32Const(2),
            I32Add,
            Drop,
            I32Const(4),
            I32Eqz,
            Nop,
            I32Const(5),
            I32Const(6),
            I32Mul,
            Drop,
            LocalGet(0),
            End,
        ]);
        let ranges = fx.relocatable_ranges(1, 5);

        let mut expected = Vec::new();
        for len in (1..=5).rev() {
            for start in 0..=fx.effects.len() - len {
                expected.extend(fx.is_relocatable(start..start + len));
            }
        }
        assert_eq!(ranges, expected);
        assert!(ranges.iter().all(|r| !r.range.contains(&6)));
    }

    #[test]
    fn balanced_range_pushes_nothing() {
        let fx = effects(vec![I32Const(5), Drop, LocalGet(0), End]);
        assert_eq!(fx.is_relocatable(0..2), Some(RelocatableRange { range: 0..2, pushes: None }));
    }
}
