use crate::conversion::{convert_blocktype, convert_memarg};
use crate::{ParseError, Result};
use alloc::{format, vec::Vec};
use stackvm_types::Instruction;
use wasmparser::Operator;

/// Lowers a function body, one operator at a time, into [`Instruction`]s.
#[derive(Debug, Default)]
pub(crate) struct FunctionBuilder {
    instructions: Vec<Instruction>,
}

// Operators without immediates whose names match between wasmparser and stackvm.
macro_rules! lower_operands {
    ($op:expr, [$($name:ident),* $(,)?], [$($mem:ident),* $(,)?]) => {
        match $op {
            $(Operator::$name => Instruction::$name,)*
            $(Operator::$mem { memarg } => Instruction::$mem(convert_memarg(memarg)?),)*
            op => return Err(ParseError::UnsupportedOperator(format!("Unsupported instruction: {op:?}"))),
        }
    };
}

impl FunctionBuilder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn finish(self) -> Vec<Instruction> {
        self.instructions
    }

    #[rustfmt::skip]
    pub(crate) fn push_operator(&mut self, op: Operator<'_>) -> Result<()> {
        let instr = match op {
            Operator::Block { blockty } => Instruction::Block(convert_blocktype(blockty)?),
            Operator::Loop { blockty } => Instruction::Loop(convert_blocktype(blockty)?),
            Operator::If { blockty } => Instruction::If(convert_blocktype(blockty)?),
            Operator::Br { relative_depth } => Instruction::Br(relative_depth),
            Operator::BrIf { relative_depth } => Instruction::BrIf(relative_depth),
            Operator::BrTable { targets } => {
                let labels = targets.targets().collect::<wasmparser::Result<Vec<_>>>()?;
                Instruction::BrTable(labels.into_boxed_slice(), targets.default())
            }
            Operator::Call { function_index } => Instruction::Call(function_index),
            Operator::CallIndirect { type_index, table_index } => Instruction::CallIndirect(type_index, table_index),
            Operator::LocalGet { local_index } => Instruction::LocalGet(local_index),
            Operator::LocalSet { local_index } => Instruction::LocalSet(local_index),
            Operator::LocalTee { local_index } => Instruction::LocalTee(local_index),
            Operator::GlobalGet { global_index } => Instruction::GlobalGet(global_index),
            Operator::GlobalSet { global_index } => Instruction::GlobalSet(global_index),
            Operator::MemorySize { mem: 0 } => Instruction::MemorySize,
            Operator::MemoryGrow { mem: 0 } => Instruction::MemoryGrow,
            Operator::I32Const { value } => Instruction::I32Const(value),
            Operator::I64Const { value } => Instruction::I64Const(value),
            Operator::F32Const { value } => Instruction::F32Const(f32::from_bits(value.bits())),
            Operator::F64Const { value } => Instruction::F64Const(f64::from_bits(value.bits())),
            op => lower_operands!(op, [
                Unreachable, Nop, Else, End, Return, Drop, Select,
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
                I32WrapI64, I32TruncF32S, I32TruncF32U, I32TruncF64S, I32TruncF64U,
                I64ExtendI32S, I64ExtendI32U, I64TruncF32S, I64TruncF32U, I64TruncF64S, I64TruncF64U,
                F32ConvertI32S, F32ConvertI32U, F32ConvertI64S, F32ConvertI64U, F32DemoteF64,
                F64ConvertI32S, F64ConvertI32U, F64ConvertI64S, F64ConvertI64U, F64PromoteF32,
                I32ReinterpretF32, I64ReinterpretF64, F32ReinterpretI32, F64ReinterpretI64,
            ], [
                I32Load, I64Load, F32Load, F64Load,
                I32Load8S, I32Load8U, I32Load16S, I32Load16U,
                I64Load8S, I64Load8U, I64Load16S, I64Load16U, I64Load32S, I64Load32U,
                I32Store, I64Store, F32Store, F64Store,
                I32Store8, I32Store16, I64Store8, I64Store16, I64Store32,
            ]),
        };

        self.instructions.push(instr);
        Ok(())
    }
}
