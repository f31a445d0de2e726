//! Value-level effects of instructions with a fixed signature.
//!
//! The interpreter pops the operands listed by [`Signature::Fixed`](stackvm_types::Signature)
//! and hands them here in pop order; the returned value is the signature's push.

use alloc::format;
use core::ops::Neg;
use stackvm_types::{Instruction, WasmValue};

use super::{macros::*, traits::*};
use crate::{Error, MemoryInstance, Result, store::effective_addr, unlikely};

#[cfg(not(feature = "std"))]
#[allow(unused_imports)]
use super::no_std_floats::NoStdFloatExt;

#[inline]
fn to<T: TryFrom<WasmValue>>(value: WasmValue) -> Result<T> {
    T::try_from(value).map_err(|_| Error::Other(format!("unexpected operand {value:?}")))
}

#[inline]
fn operand<T: TryFrom<WasmValue>>(args: &[WasmValue], index: usize) -> Result<T> {
    match args.get(index) {
        Some(value) => to(*value),
        None => Err(Error::Other("missing operand".into())),
    }
}

/// Arithmetic, comparisons, conversions and constants.
pub(crate) fn numeric(instr: &Instruction, args: &[WasmValue]) -> Result<WasmValue> {
    use Instruction::*;

    #[rustfmt::skip]
    let value = match instr {
        I32Const(v) => WasmValue::I32(*v),
        I64Const(v) => WasmValue::I64(*v),
        F32Const(v) => WasmValue::F32(*v),
        F64Const(v) => WasmValue::F64(*v),

        I32Eqz => comp_zero!(==, i32, args),
        I64Eqz => comp_zero!(==, i64, args),

        I32Eq => comp!(==, i32, args),
        I32Ne => comp!(!=, i32, args),
        I32LtS => comp!(<, i32, args),
        I32LtU => comp!(<, i32, u32, args),
        I32GtS => comp!(>, i32, args),
        I32GtU => comp!(>, i32, u32, args),
        I32LeS => comp!(<=, i32, args),
        I32LeU => comp!(<=, i32, u32, args),
        I32GeS => comp!(>=, i32, args),
        I32GeU => comp!(>=, i32, u32, args),

        I64Eq => comp!(==, i64, args),
        I64Ne => comp!(!=, i64, args),
        I64LtS => comp!(<, i64, args),
        I64LtU => comp!(<, i64, u64, args),
        I64GtS => comp!(>, i64, args),
        I64GtU => comp!(>, i64, u64, args),
        I64LeS => comp!(<=, i64, args),
        I64LeU => comp!(<=, i64, u64, args),
        I64GeS => comp!(>=, i64, args),
        I64GeU => comp!(>=, i64, u64, args),

        F32Eq => comp!(==, f32, args),
        F32Ne => comp!(!=, f32, args),
        F32Lt => comp!(<, f32, args),
        F32Gt => comp!(>, f32, args),
        F32Le => comp!(<=, f32, args),
        F32Ge => comp!(>=, f32, args),

        F64Eq => comp!(==, f64, args),
        F64Ne => comp!(!=, f64, args),
        F64Lt => comp!(<, f64, args),
        F64Gt => comp!(>, f64, args),
        F64Le => comp!(<=, f64, args),
        F64Ge => comp!(>=, f64, args),

        I32Clz => arithmetic_single!(leading_zeros, i32, i32, args),
        I32Ctz => arithmetic_single!(trailing_zeros, i32, i32, args),
        I32Popcnt => arithmetic_single!(count_ones, i32, i32, args),
        I64Clz => arithmetic_single!(leading_zeros, i64, i64, args),
        I64Ctz => arithmetic_single!(trailing_zeros, i64, i64, args),
        I64Popcnt => arithmetic_single!(count_ones, i64, i64, args),

        I32Add => arithmetic!(wrapping_add, i32, args),
        I32Sub => arithmetic!(wrapping_sub, i32, args),
        I32Mul => arithmetic!(wrapping_mul, i32, args),
        I32DivS => checked_arithmetic!(checked_div, i32, args),
        I32DivU => checked_arithmetic!(checked_div, i32, u32, args),
        I32RemS => checked_arithmetic!(checked_wrapping_rem, i32, args),
        I32RemU => checked_arithmetic!(checked_wrapping_rem, i32, u32, args),
        I32And => arithmetic!(&, i32, args),
        I32Or => arithmetic!(|, i32, args),
        I32Xor => arithmetic!(^, i32, args),
        I32Shl => arithmetic!(wasm_shl, i32, args),
        I32ShrS => arithmetic!(wasm_shr, i32, args),
        I32ShrU => arithmetic!(wasm_shr, i32, u32, args),
        I32Rotl => arithmetic!(wasm_rotl, i32, args),
        I32Rotr => arithmetic!(wasm_rotr, i32, args),

        I64Add => arithmetic!(wrapping_add, i64, args),
        I64Sub => arithmetic!(wrapping_sub, i64, args),
        I64Mul => arithmetic!(wrapping_mul, i64, args),
        I64DivS => checked_arithmetic!(checked_div, i64, args),
        I64DivU => checked_arithmetic!(checked_div, i64, u64, args),
        I64RemS => checked_arithmetic!(checked_wrapping_rem, i64, args),
        I64RemU => checked_arithmetic!(checked_wrapping_rem, i64, u64, args),
        I64And => arithmetic!(&, i64, args),
        I64Or => arithmetic!(|, i64, args),
        I64Xor => arithmetic!(^, i64, args),
        I64Shl => arithmetic!(wasm_shl, i64, args),
        I64ShrS => arithmetic!(wasm_shr, i64, args),
        I64ShrU => arithmetic!(wasm_shr, i64, u64, args),
        I64Rotl => arithmetic!(wasm_rotl, i64, args),
        I64Rotr => arithmetic!(wasm_rotr, i64, args),

        F32Abs => arithmetic_single!(abs, f32, args),
        F32Neg => arithmetic_single!(neg, f32, args),
        F32Ceil => arithmetic_single!(ceil, f32, args),
        F32Floor => arithmetic_single!(floor, f32, args),
        F32Trunc => arithmetic_single!(trunc, f32, args),
        F32Nearest => arithmetic_single!(wasm_nearest, f32, args),
        F32Sqrt => arithmetic_single!(sqrt, f32, args),
        F32Add => arithmetic!(+, f32, args),
        F32Sub => arithmetic!(-, f32, args),
        F32Mul => arithmetic!(*, f32, args),
        F32Div => arithmetic!(/, f32, args),
        F32Min => arithmetic!(wasm_min, f32, args),
        F32Max => arithmetic!(wasm_max, f32, args),
        F32Copysign => arithmetic!(copysign, f32, args),

        F64Abs => arithmetic_single!(abs, f64, args),
        F64Neg => arithmetic_single!(neg, f64, args),
        F64Ceil => arithmetic_single!(ceil, f64, args),
        F64Floor => arithmetic_single!(floor, f64, args),
        F64Trunc => arithmetic_single!(trunc, f64, args),
        F64Nearest => arithmetic_single!(wasm_nearest, f64, args),
        F64Sqrt => arithmetic_single!(sqrt, f64, args),
        F64Add => arithmetic!(+, f64, args),
        F64Sub => arithmetic!(-, f64, args),
        F64Mul => arithmetic!(*, f64, args),
        F64Div => arithmetic!(/, f64, args),
        F64Min => arithmetic!(wasm_min, f64, args),
        F64Max => arithmetic!(wasm_max, f64, args),
        F64Copysign => arithmetic!(copysign, f64, args),

        I32WrapI64 => conv!(i64, i32, args),
        I32TruncF32S => checked_conv_float!(f32, i32, args),
        I32TruncF32U => checked_conv_float!(f32, u32, i32, args),
        I32TruncF64S => checked_conv_float!(f64, i32, args),
        I32TruncF64U => checked_conv_float!(f64, u32, i32, args),
        I64ExtendI32S => conv!(i32, i64, args),
        I64ExtendI32U => conv!(i32, u32, i64, args),
        I64TruncF32S => checked_conv_float!(f32, i64, args),
        I64TruncF32U => checked_conv_float!(f32, u64, i64, args),
        I64TruncF64S => checked_conv_float!(f64, i64, args),
        I64TruncF64U => checked_conv_float!(f64, u64, i64, args),
        F32ConvertI32S => conv!(i32, f32, args),
        F32ConvertI32U => conv!(i32, u32, f32, args),
        F32ConvertI64S => conv!(i64, f32, args),
        F32ConvertI64U => conv!(i64, u64, f32, args),
        F32DemoteF64 => conv!(f64, f32, args),
        F64ConvertI32S => conv!(i32, f64, args),
        F64ConvertI32U => conv!(i32, u32, f64, args),
        F64ConvertI64S => conv!(i64, f64, args),
        F64ConvertI64U => conv!(i64, u64, f64, args),
        F64PromoteF32 => conv!(f32, f64, args),

        I32ReinterpretF32 => WasmValue::I32(operand::<f32>(args, 0)?.to_bits() as i32),
        I64ReinterpretF64 => WasmValue::I64(operand::<f64>(args, 0)?.to_bits() as i64),
        F32ReinterpretI32 => WasmValue::F32(f32::from_bits(operand::<i32>(args, 0)? as u32)),
        F64ReinterpretI64 => WasmValue::F64(f64::from_bits(operand::<i64>(args, 0)? as u64)),

        _ => return Err(Error::Other(format!("{instr:?} has no numeric effect"))),
    };
    Ok(value)
}

/// Typed loads. `base` is the popped address, the static offset comes from the instruction.
pub(crate) fn load(memory: &MemoryInstance, instr: &Instruction, base: u32) -> Result<WasmValue> {
    use Instruction::*;

    let Some(arg) = instr.memory_arg() else {
        return Err(Error::Other(format!("{instr:?} is not a memory access")));
    };
    let addr = effective_addr(base, arg.offset);

    #[rustfmt::skip]
    let value = match instr {
        I32Load(_) => mem_load!(i32, memory, addr),
        I64Load(_) => mem_load!(i64, memory, addr),
        F32Load(_) => mem_load!(f32, memory, addr),
        F64Load(_) => mem_load!(f64, memory, addr),
        I32Load8S(_) => mem_load!(i8, i32, memory, addr),
        I32Load8U(_) => mem_load!(u8, i32, memory, addr),
        I32Load16S(_) => mem_load!(i16, i32, memory, addr),
        I32Load16U(_) => mem_load!(u16, i32, memory, addr),
        I64Load8S(_) => mem_load!(i8, i64, memory, addr),
        I64Load8U(_) => mem_load!(u8, i64, memory, addr),
        I64Load16S(_) => mem_load!(i16, i64, memory, addr),
        I64Load16U(_) => mem_load!(u16, i64, memory, addr),
        I64Load32S(_) => mem_load!(i32, i64, memory, addr),
        I64Load32U(_) => mem_load!(u32, i64, memory, addr),
        _ => return Err(Error::Other(format!("{instr:?} is not a load"))),
    };
    Ok(value)
}

/// Typed stores, narrowing the value to the access width.
pub(crate) fn store(memory: &mut MemoryInstance, instr: &Instruction, base: u32, value: WasmValue) -> Result<()> {
    use Instruction::*;

    let Some(arg) = instr.memory_arg() else {
        return Err(Error::Other(format!("{instr:?} is not a memory access")));
    };
    let addr = effective_addr(base, arg.offset);

    #[rustfmt::skip]
    match instr {
        I32Store(_) => mem_store!(i32, i32, value, memory, addr),
        I64Store(_) => mem_store!(i64, i64, value, memory, addr),
        F32Store(_) => mem_store!(f32, f32, value, memory, addr),
        F64Store(_) => mem_store!(f64, f64, value, memory, addr),
        I32Store8(_) => mem_store!(i32, u8, value, memory, addr),
        I32Store16(_) => mem_store!(i32, u16, value, memory, addr),
        I64Store8(_) => mem_store!(i64, u8, value, memory, addr),
        I64Store16(_) => mem_store!(i64, u16, value, memory, addr),
        I64Store32(_) => mem_store!(i64, u32, value, memory, addr),
        _ => return Err(Error::Other(format!("{instr:?} is not a store"))),
    };
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Trap;
    use stackvm_types::{MemoryArg, MemoryType};
    use Instruction::*;
    use WasmValue::*;

    // operands are given in push order, like wat
    fn run(instr: Instruction, pushed: &[WasmValue]) -> Result<WasmValue> {
        let args: alloc::vec::Vec<_> = pushed.iter().rev().copied().collect();
        numeric(&instr, &args)
    }

    fn trap(result: Result<WasmValue>) -> Trap {
        match result {
            Err(Error::Trap(trap)) => trap,
            other => panic!("expected trap, got {other:?}"),
        }
    }

    #[test]
    fn integer_division() {
        assert_eq!(run(I32DivS, &[I32(7), I32(-2)]).unwrap(), I32(-3));
        assert_eq!(run(I32RemS, &[I32(-7), I32(2)]).unwrap(), I32(-1));
        assert_eq!(trap(run(I32DivS, &[I32(10), I32(0)])), Trap::DivisionByZero);
        assert_eq!(trap(run(I32DivS, &[I32(i32::MIN), I32(-1)])), Trap::IntegerOverflow);
        assert_eq!(run(I32RemS, &[I32(i32::MIN), I32(-1)]).unwrap(), I32(0));
        assert_eq!(run(I32DivU, &[I32(-1), I32(2)]).unwrap(), I32(0x7fff_ffff));
        assert_eq!(run(I32RemU, &[I32(-1), I32(10)]).unwrap(), I32(5));
        assert_eq!(trap(run(I64RemU, &[I64(1), I64(0)])), Trap::DivisionByZero);
        assert_eq!(run(I64DivU, &[I64(-2), I64(2)]).unwrap(), I64(i64::MAX));
    }

    #[test]
    fn unsigned_comparisons() {
        assert_eq!(run(I32LtS, &[I32(-1), I32(1)]).unwrap(), I32(1));
        assert_eq!(run(I32LtU, &[I32(-1), I32(1)]).unwrap(), I32(0));
        assert_eq!(run(I64GeU, &[I64(-1), I64(0)]).unwrap(), I32(1));
        assert_eq!(run(I64Eqz, &[I64(0)]).unwrap(), I32(1));
    }

    #[test]
    fn float_semantics() {
        assert_eq!(run(F32Eq, &[F32(f32::NAN), F32(f32::NAN)]).unwrap(), I32(0));
        assert_eq!(run(F64Ne, &[F64(f64::NAN), F64(f64::NAN)]).unwrap(), I32(1));
        assert_eq!(run(F32Copysign, &[F32(2.0), F32(-0.0)]).unwrap(), F32(-2.0));
        assert_eq!(run(F64Min, &[F64(1.0), F64(-3.0)]).unwrap(), F64(-3.0));
        assert_eq!(run(F32Nearest, &[F32(-1.5)]).unwrap(), F32(-2.0));
        assert_eq!(run(F64Sub, &[F64(1.0), F64(0.25)]).unwrap(), F64(0.75));
    }

    #[test]
    fn truncation_traps() {
        assert_eq!(run(I32TruncF32S, &[F32(-3.9)]).unwrap(), I32(-3));
        assert_eq!(run(I32TruncF64U, &[F64(4294967295.0)]).unwrap(), I32(-1));
        assert_eq!(trap(run(I32TruncF32S, &[F32(f32::NAN)])), Trap::InvalidConversionToInt);
        assert_eq!(trap(run(I32TruncF64S, &[F64(2147483648.0)])), Trap::IntegerOverflow);
        assert_eq!(trap(run(I32TruncF32U, &[F32(-1.0)])), Trap::IntegerOverflow);
        assert_eq!(trap(run(I64TruncF64U, &[F64(f64::INFINITY)])), Trap::IntegerOverflow);
        assert_eq!(run(I64TruncF64S, &[F64(-9223372036854775808.0)]).unwrap(), I64(i64::MIN));
    }

    #[test]
    fn conversions_and_shifts() {
        assert_eq!(run(I64ExtendI32U, &[I32(-1)]).unwrap(), I64(0xffff_ffff));
        assert_eq!(run(I64ExtendI32S, &[I32(-1)]).unwrap(), I64(-1));
        assert_eq!(run(I32WrapI64, &[I64(0x1_0000_0005)]).unwrap(), I32(5));
        assert_eq!(run(F32ConvertI32U, &[I32(-1)]).unwrap(), F32(4294967296.0));
        assert_eq!(run(I32ReinterpretF32, &[F32(1.0)]).unwrap(), I32(0x3f80_0000));
        assert_eq!(run(I32ShrU, &[I32(-8), I32(1)]).unwrap(), I32(0x7fff_fffc));
        assert_eq!(run(I32ShrS, &[I32(-8), I32(1)]).unwrap(), I32(-4));
        assert_eq!(run(I32Rotr, &[I32(1), I32(1)]).unwrap(), I32(i32::MIN));
        assert_eq!(run(I64Clz, &[I64(1)]).unwrap(), I64(63));
    }

    #[test]
    fn narrow_memory_access() {
        let mut memory = MemoryInstance::new(MemoryType::new(1, None), 1);
        let arg = MemoryArg::new(4, 0);

        store(&mut memory, &I32Store8(arg), 0, I32(0x1ff)).unwrap();
        assert_eq!(load(&memory, &I32Load8U(arg), 0).unwrap(), I32(0xff));
        assert_eq!(load(&memory, &I32Load8S(arg), 0).unwrap(), I32(-1));
        assert_eq!(load(&memory, &I64Load8U(arg), 0).unwrap(), I64(0xff));

        store(&mut memory, &I64Store32(arg), 8, I64(-2)).unwrap();
        assert_eq!(load(&memory, &I64Load32U(arg), 8).unwrap(), I64(0xffff_fffe));
        assert_eq!(load(&memory, &I64Load32S(arg), 8).unwrap(), I64(-2));

        let oob = load(&memory, &I32Load(MemoryArg::new(u32::MAX, 0)), 1);
        assert!(matches!(oob, Err(Error::Trap(Trap::MemoryOutOfBounds { .. }))));
    }
}
