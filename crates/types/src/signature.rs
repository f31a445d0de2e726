//! The static stack signature of every instruction.
//!
//! This table is the single source of truth for how many operands an instruction pops and
//! pushes and of which types. The stack-effect evaluator replays it symbolically, and the
//! interpreter uses it to pop and push concrete operands around each value-level operation.

use crate::{FuncAddr, GlobalAddr, Instruction, LocalAddr, TypeAddr, ValType};

use ValType::{F32, F64, I32, I64};

/// The stack signature of an [`Instruction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signature {
    /// Pops `pops` (listed in pop order, top of stack first) then pushes `push`.
    Fixed { pops: &'static [ValType], push: Option<ValType> },
    /// Pops the callee's params (last param first), pushes its result.
    Call(FuncAddr),
    /// Pops an `i32` table index, then the params of the declared type, pushes its result.
    CallIndirect(TypeAddr),
    /// Pops an `i32` condition, then two operands of one type, pushes one of that type.
    Select,
    /// Pops one operand of any type.
    Drop,
    /// Pops the enclosing function's result, if it has one.
    Return,
    /// Pushes the type of the local.
    LocalGet(LocalAddr),
    /// Pops the type of the local.
    LocalSet(LocalAddr),
    /// Pops and pushes the type of the local.
    LocalTee(LocalAddr),
    /// Pushes the type of the global.
    GlobalGet(GlobalAddr),
    /// Pops the type of the global.
    GlobalSet(GlobalAddr),
}

const NONE: &[ValType] = &[];
const I32_1: &[ValType] = &[I32];
const I32_2: &[ValType] = &[I32, I32];
const I64_1: &[ValType] = &[I64];
const I64_2: &[ValType] = &[I64, I64];
const F32_1: &[ValType] = &[F32];
const F32_2: &[ValType] = &[F32, F32];
const F64_1: &[ValType] = &[F64];
const F64_2: &[ValType] = &[F64, F64];

// stores pop the value first, then the address
const STORE_I32: &[ValType] = &[I32, I32];
const STORE_I64: &[ValType] = &[I64, I32];
const STORE_F32: &[ValType] = &[F32, I32];
const STORE_F64: &[ValType] = &[F64, I32];

const fn fixed(pops: &'static [ValType], push: Option<ValType>) -> Signature {
    Signature::Fixed { pops, push }
}

impl Signature {
    /// The fixed pop and push types, if this signature does not depend on context.
    pub fn as_fixed(&self) -> Option<(&'static [ValType], Option<ValType>)> {
        match self {
            Signature::Fixed { pops, push } => Some((pops, *push)),
            _ => None,
        }
    }
}

impl Instruction {
    /// Look up the static stack signature of this instruction.
    #[rustfmt::skip]
    pub fn signature(&self) -> Signature {
        use Instruction::*;
        match self {
            Unreachable | Nop | Block(_) | Loop(_) | Else | End | Br(_) => fixed(NONE, None),
            If(_) | BrIf(_) | BrTable(_, _) => fixed(I32_1, None),
            Return => Signature::Return,
            Call(func) => Signature::Call(*func),
            CallIndirect(ty, _) => Signature::CallIndirect(*ty),

            Drop => Signature::Drop,
            Select => Signature::Select,

            LocalGet(idx) => Signature::LocalGet(*idx),
            LocalSet(idx) => Signature::LocalSet(*idx),
            LocalTee(idx) => Signature::LocalTee(*idx),
            GlobalGet(idx) => Signature::GlobalGet(*idx),
            GlobalSet(idx) => Signature::GlobalSet(*idx),

            I32Load(_) | I32Load8S(_) | I32Load8U(_) | I32Load16S(_) | I32Load16U(_) => fixed(I32_1, Some(I32)),
            I64Load(_) | I64Load8S(_) | I64Load8U(_) | I64Load16S(_) | I64Load16U(_)
            | I64Load32S(_) | I64Load32U(_) => fixed(I32_1, Some(I64)),
            F32Load(_) => fixed(I32_1, Some(F32)),
            F64Load(_) => fixed(I32_1, Some(F64)),
            I32Store(_) | I32Store8(_) | I32Store16(_) => fixed(STORE_I32, None),
            I64Store(_) | I64Store8(_) | I64Store16(_) | I64Store32(_) => fixed(STORE_I64, None),
            F32Store(_) => fixed(STORE_F32, None),
            F64Store(_) => fixed(STORE_F64, None),
            MemorySize => fixed(NONE, Some(I32)),
            MemoryGrow => fixed(I32_1, Some(I32)),

            I32Const(_) => fixed(NONE, Some(I32)),
            I64Const(_) => fixed(NONE, Some(I64)),
            F32Const(_) => fixed(NONE, Some(F32)),
            F64Const(_) => fixed(NONE, Some(F64)),

            I32Eqz => fixed(I32_1, Some(I32)),
            I32Eq | I32Ne | I32LtS | I32LtU | I32GtS | I32GtU | I32LeS | I32LeU | I32GeS | I32GeU => fixed(I32_2, Some(I32)),
            I64Eqz => fixed(I64_1, Some(I32)),
            I64Eq | I64Ne | I64LtS | I64LtU | I64GtS | I64GtU | I64LeS | I64LeU | I64GeS | I64GeU => fixed(I64_2, Some(I32)),
            F32Eq | F32Ne | F32Lt | F32Gt | F32Le | F32Ge => fixed(F32_2, Some(I32)),
            F64Eq | F64Ne | F64Lt | F64Gt | F64Le | F64Ge => fixed(F64_2, Some(I32)),

            I32Clz | I32Ctz | I32Popcnt => fixed(I32_1, Some(I32)),
            I32Add | I32Sub | I32Mul | I32DivS | I32DivU | I32RemS | I32RemU | I32And | I32Or | I32Xor
            | I32Shl | I32ShrS | I32ShrU | I32Rotl | I32Rotr => fixed(I32_2, Some(I32)),
            I64Clz | I64Ctz | I64Popcnt => fixed(I64_1, Some(I64)),
            I64Add | I64Sub | I64Mul | I64DivS | I64DivU | I64RemS | I64RemU | I64And | I64Or | I64Xor
            | I64Shl | I64ShrS | I64ShrU | I64Rotl | I64Rotr => fixed(I64_2, Some(I64)),
            F32Abs | F32Neg | F32Ceil | F32Floor | F32Trunc | F32Nearest | F32Sqrt => fixed(F32_1, Some(F32)),
            F32Add | F32Sub | F32Mul | F32Div | F32Min | F32Max | F32Copysign => fixed(F32_2, Some(F32)),
            F64Abs | F64Neg | F64Ceil | F64Floor | F64Trunc | F64Nearest | F64Sqrt => fixed(F64_1, Some(F64)),
            F64Add | F64Sub | F64Mul | F64Div | F64Min | F64Max | F64Copysign => fixed(F64_2, Some(F64)),

            I32WrapI64 => fixed(I64_1, Some(I32)),
            I32TruncF32S | I32TruncF32U | I32ReinterpretF32 => fixed(F32_1, Some(I32)),
            I32TruncF64S | I32TruncF64U => fixed(F64_1, Some(I32)),
            I64ExtendI32S | I64ExtendI32U => fixed(I32_1, Some(I64)),
            I64TruncF32S | I64TruncF32U => fixed(F32_1, Some(I64)),
            I64TruncF64S | I64TruncF64U | I64ReinterpretF64 => fixed(F64_1, Some(I64)),
            F32ConvertI32S | F32ConvertI32U | F32ReinterpretI32 => fixed(I32_1, Some(F32)),
            F32ConvertI64S | F32ConvertI64U => fixed(I64_1, Some(F32)),
            F32DemoteF64 => fixed(F64_1, Some(F32)),
            F64ConvertI32S | F64ConvertI32U => fixed(I32_1, Some(F64)),
            F64ConvertI64S | F64ConvertI64U | F64ReinterpretI64 => fixed(I64_1, Some(F64)),
            F64PromoteF32 => fixed(F32_1, Some(F64)),
        }
    }

    /// Structured control markers: `block`, `loop`, `if`, `else` and `end`.
    pub fn is_block_marker(&self) -> bool {
        matches!(self, Instruction::Block(_) | Instruction::Loop(_) | Instruction::If(_) | Instruction::Else | Instruction::End)
    }

    /// `br`, `br_if` and `br_table`.
    pub fn is_branch(&self) -> bool {
        matches!(self, Instruction::Br(_) | Instruction::BrIf(_) | Instruction::BrTable(_, _))
    }

    /// Instructions after which the rest of the enclosing block is unreachable.
    pub fn ends_reachability(&self) -> bool {
        matches!(self, Instruction::Unreachable | Instruction::Br(_) | Instruction::BrTable(_, _) | Instruction::Return)
    }

    pub fn accesses_locals(&self) -> bool {
        matches!(self, Instruction::LocalGet(_) | Instruction::LocalSet(_) | Instruction::LocalTee(_))
    }

    /// Whether this instruction keeps its meaning when moved into a separate function.
    ///
    /// Block markers, branches, `return` and local access are relative to the enclosing frame;
    /// `nop` and `unreachable` count as control instructions too.
    pub fn is_relocatable(&self) -> bool {
        !(self.is_block_marker()
            || self.is_branch()
            || self.accesses_locals()
            || matches!(self, Instruction::Return | Instruction::Nop | Instruction::Unreachable))
    }

    pub fn is_const(&self) -> bool {
        matches!(
            self,
            Instruction::I32Const(_) | Instruction::I64Const(_) | Instruction::F32Const(_) | Instruction::F64Const(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BlockArgs, MemoryArg};

    #[test]
    fn stores_pop_value_before_address() {
        let sig = Instruction::I64Store8(MemoryArg::default()).signature();
        assert_eq!(sig, Signature::Fixed { pops: &[I64, I32], push: None });
    }

    #[test]
    fn narrow_loads_push_logical_type() {
        assert_eq!(Instruction::I32Load8U(MemoryArg::default()).signature().as_fixed(), Some((I32_1, Some(I32))));
        assert_eq!(Instruction::I64Load32S(MemoryArg::default()).signature().as_fixed(), Some((I32_1, Some(I64))));
    }

    #[test]
    fn branches_only_pop_their_selector() {
        assert_eq!(Instruction::Br(2).signature().as_fixed(), Some((NONE, None)));
        assert_eq!(Instruction::BrIf(0).signature().as_fixed(), Some((I32_1, None)));
        assert_eq!(Instruction::BrTable([0, 1].into(), 2).signature().as_fixed(), Some((I32_1, None)));
        assert_eq!(Instruction::If(BlockArgs::Type(I64)).signature().as_fixed(), Some((I32_1, None)));
    }

    #[test]
    fn context_dependent_signatures() {
        assert_eq!(Instruction::Call(3).signature(), Signature::Call(3));
        assert_eq!(Instruction::CallIndirect(1, 0).signature(), Signature::CallIndirect(1));
        assert_eq!(Instruction::LocalTee(4).signature(), Signature::LocalTee(4));
        assert_eq!(Instruction::Select.signature(), Signature::Select);
        assert!(Instruction::Return.signature().as_fixed().is_none());
    }

    #[test]
    fn relocatable_instructions() {
        assert!(Instruction::I32Add.is_relocatable());
        assert!(Instruction::Call(0).is_relocatable());
        assert!(Instruction::GlobalGet(0).is_relocatable());
        assert!(!Instruction::LocalGet(0).is_relocatable());
        assert!(!Instruction::End.is_relocatable());
        assert!(!Instruction::BrIf(0).is_relocatable());
        assert!(!Instruction::Return.is_relocatable());
        assert!(!Instruction::Nop.is_relocatable());
        assert!(!Instruction::Unreachable.is_relocatable());
    }
}
