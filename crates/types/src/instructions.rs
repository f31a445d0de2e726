use super::{FuncAddr, GlobalAddr, LabelAddr, LocalAddr, TableAddr, TypeAddr, ValType};
use alloc::boxed::Box;

/// Represents a memory immediate in a WebAssembly memory instruction.
///
/// `align` is the alignment hint as a power-of-two exponent; it never affects semantics.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "archive", derive(serde::Serialize, serde::Deserialize))]
pub struct MemoryArg {
    pub offset: u32,
    pub align: u32,
}

impl MemoryArg {
    pub fn new(offset: u32, align: u32) -> Self {
        Self { offset, align }
    }
}

/// The result type of a `block`, `loop` or `if`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "archive", derive(serde::Serialize, serde::Deserialize))]
pub enum BlockArgs {
    #[default]
    Empty,
    Type(ValType),
}

impl BlockArgs {
    #[inline]
    pub fn result(&self) -> Option<ValType> {
        match self {
            BlockArgs::Empty => None,
            BlockArgs::Type(ty) => Some(*ty),
        }
    }

    /// Number of values the block leaves on the stack (0 or 1).
    #[inline]
    pub fn arity(&self) -> usize {
        self.result().is_some() as usize
    }
}

/// A constant expression, used by global initializers and segment offsets.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "archive", derive(serde::Serialize, serde::Deserialize))]
pub enum ConstInstruction {
    I32Const(i32),
    I64Const(i64),
    F32Const(f32),
    F64Const(f64),
    /// Reads an imported global.
    GlobalGet(GlobalAddr),
}

/// A WebAssembly Instruction
///
/// One variant per MVP opcode, carrying its immediates. Block structure is kept as in the
/// binary format (`block`/`loop`/`if`/`else`/`end` markers); branch targets are computed by
/// the control-flow resolver in `stackvm`.
///
/// See <https://webassembly.github.io/spec/core/binary/instructions.html>
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "archive", derive(serde::Serialize, serde::Deserialize))]
#[rustfmt::skip]
pub enum Instruction {
    // > Control Instructions
    // See <https://webassembly.github.io/spec/core/binary/instructions.html#control-instructions>
    Unreachable,
    Nop,
    Block(BlockArgs),
    Loop(BlockArgs),
    If(BlockArgs),
    Else,
    End,
    Br(LabelAddr),
    BrIf(LabelAddr),
    /// Label targets followed by the default target.
    BrTable(Box<[LabelAddr]>, LabelAddr),
    Return,
    Call(FuncAddr),
    CallIndirect(TypeAddr, TableAddr),

    // > Parametric Instructions
    // See <https://webassembly.github.io/spec/core/binary/instructions.html#parametric-instructions>
    Drop,
    Select,

    // > Variable Instructions
    // See <https://webassembly.github.io/spec/core/binary/instructions.html#variable-instructions>
    LocalGet(LocalAddr), LocalSet(LocalAddr), LocalTee(LocalAddr),
    GlobalGet(GlobalAddr), GlobalSet(GlobalAddr),

    // > Memory Instructions
    I32Load(MemoryArg), I64Load(MemoryArg), F32Load(MemoryArg), F64Load(MemoryArg),
    I32Load8S(MemoryArg), I32Load8U(MemoryArg), I32Load16S(MemoryArg), I32Load16U(MemoryArg),
    I64Load8S(MemoryArg), I64Load8U(MemoryArg), I64Load16S(MemoryArg), I64Load16U(MemoryArg),
    I64Load32S(MemoryArg), I64Load32U(MemoryArg),
    I32Store(MemoryArg), I64Store(MemoryArg), F32Store(MemoryArg), F64Store(MemoryArg),
    I32Store8(MemoryArg), I32Store16(MemoryArg),
    I64Store8(MemoryArg), I64Store16(MemoryArg), I64Store32(MemoryArg),
    MemorySize,
    MemoryGrow,

    // > Constants
    I32Const(i32),
    I64Const(i64),
    F32Const(f32),
    F64Const(f64),

    // > Numeric Instructions
    // See <https://webassembly.github.io/spec/core/binary/instructions.html#numeric-instructions>
    I32Eqz, I32Eq, I32Ne, I32LtS, I32LtU, I32GtS, I32GtU, I32LeS, I32LeU, I32GeS, I32GeU,
    I64Eqz, I64Eq, I64Ne, I64LtS, I64LtU, I64GtS, I64GtU, I64LeS, I64LeU, I64GeS, I64GeU,
    F32Eq, F32Ne, F32Lt, F32Gt, F32Le, F32Ge,
    F64Eq, F64Ne, F64Lt, F64Gt, F64Le, F64Ge,
    I32Clz, I32Ctz, I32Popcnt, I32Add, I32Sub, I32Mul, I32DivS, I32DivU, I32RemS, I32RemU,
    I32And, I32Or, I32Xor, I32Shl, I32ShrS, I32ShrU, I32Rotl, I32Rotr,
    I64Clz, I64Ctz, I64Popcnt, I64Add, I64Sub, I64Mul, I64DivS, I64DivU, I64RemS, I64RemU,
    I64And, I64Or, I64Xor, I64Shl, I64ShrS, I64ShrU, I64Rotl, I64Rotr,
    F32Abs, F32Neg, F32Ceil, F32Floor, F32Trunc, F32Nearest, F32Sqrt,
    F32Add, F32Sub, F32Mul, F32Div, F32Min, F32Max, F32Copysign,
    F64Abs, F64Neg, F64Ceil, F64Floor, F64Trunc, F64Nearest, F64Sqrt,
    F64Add, F64Sub, F64Mul, F64Div, F64Min, F64Max, F64Copysign,

    // > Conversions
    I32WrapI64,
    I32TruncF32S, I32TruncF32U, I32TruncF64S, I32TruncF64U,
    I64ExtendI32S, I64ExtendI32U,
    I64TruncF32S, I64TruncF32U, I64TruncF64S, I64TruncF64U,
    F32ConvertI32S, F32ConvertI32U, F32ConvertI64S, F32ConvertI64U, F32DemoteF64,
    F64ConvertI32S, F64ConvertI32U, F64ConvertI64S, F64ConvertI64U, F64PromoteF32,
    I32ReinterpretF32, I64ReinterpretF64, F32ReinterpretI32, F64ReinterpretI64,
}

impl Instruction {
    /// The memory immediate of a load or store.
    pub fn memory_arg(&self) -> Option<MemoryArg> {
        use Instruction::*;
        match self {
            I32Load(m) | I64Load(m) | F32Load(m) | F64Load(m) | I32Load8S(m) | I32Load8U(m) | I32Load16S(m)
            | I32Load16U(m) | I64Load8S(m) | I64Load8U(m) | I64Load16S(m) | I64Load16U(m) | I64Load32S(m)
            | I64Load32U(m) | I32Store(m) | I64Store(m) | F32Store(m) | F64Store(m) | I32Store8(m) | I32Store16(m)
            | I64Store8(m) | I64Store16(m) | I64Store32(m) => Some(*m),
            _ => None,
        }
    }

    /// The block type of a `block`, `loop` or `if`.
    pub fn block_args(&self) -> Option<BlockArgs> {
        match self {
            Instruction::Block(args) | Instruction::Loop(args) | Instruction::If(args) => Some(*args),
            _ => None,
        }
    }
}

impl From<ConstInstruction> for Instruction {
    fn from(value: ConstInstruction) -> Self {
        match value {
            ConstInstruction::I32Const(v) => Instruction::I32Const(v),
            ConstInstruction::I64Const(v) => Instruction::I64Const(v),
            ConstInstruction::F32Const(v) => Instruction::F32Const(v),
            ConstInstruction::F64Const(v) => Instruction::F64Const(v),
            ConstInstruction::GlobalGet(idx) => Instruction::GlobalGet(idx),
        }
    }
}
