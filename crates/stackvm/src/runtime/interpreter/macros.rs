//! Generic macros for the value-level effect of instructions
//!
//! Operands arrive in pop order: for a binary operator `args[0]` is the right-hand side
//! and `args[1]` the left-hand side.

/// Load a value of `$load_type` and widen it to `$target_type`
macro_rules! mem_load {
    ($type:ty, $memory:expr, $addr:expr) => {{
        mem_load!($type, $type, $memory, $addr)
    }};

    ($load_type:ty, $target_type:ty, $memory:expr, $addr:expr) => {{
        const SIZE: usize = core::mem::size_of::<$load_type>();
        let loaded: $load_type = $memory.load_as::<SIZE, $load_type>($addr)?;
        WasmValue::from(loaded as $target_type)
    }};
}

/// Narrow a `$from` value to `$store_type` and store it
macro_rules! mem_store {
    ($from:ty, $store_type:ty, $value:expr, $memory:expr, $addr:expr) => {{
        let value: $from = to::<$from>($value)?;
        $memory.store_as($addr, value as $store_type)?;
    }};
}

/// Doing the actual conversion from float to int is a bit tricky, because
/// we need to check for overflow. This macro generates the exclusive min/max bounds
/// for a specific conversion, which are then used in the actual conversion.
#[rustfmt::skip]
macro_rules! float_min_max {
    (f32, i32) => {(-2147483904.0_f32, 2147483648.0_f32)};
    (f64, i32) => {(-2147483649.0_f64, 2147483648.0_f64)};
    (f32, u32) => {(-1.0_f32, 4294967296.0_f32)}; // 2^32
    (f64, u32) => {(-1.0_f64, 4294967296.0_f64)}; // 2^32
    (f32, i64) => {(-9223373136366403584.0_f32, 9223372036854775808.0_f32)}; // 2^63 + 2^40 | 2^63
    (f64, i64) => {(-9223372036854777856.0_f64, 9223372036854775808.0_f64)}; // 2^63 + 2^40 | 2^63
    (f32, u64) => {(-1.0_f32, 18446744073709551616.0_f32)}; // 2^64
    (f64, u64) => {(-1.0_f64, 18446744073709551616.0_f64)}; // 2^64
    // other conversions are not allowed
    ($from:ty, $to:ty) => {compile_error!("invalid float conversion")};
}

/// Convert the operand with a plain cast, optionally through an intermediate type
macro_rules! conv {
    ($from:ty, $to:ty, $args:ident) => {
        WasmValue::from(operand::<$from>($args, 0)? as $to)
    };
    ($from:ty, $intermediate:ty, $to:ty, $args:ident) => {
        WasmValue::from(operand::<$from>($args, 0)? as $intermediate as $to)
    };
}

/// Truncate a float to an integer, trapping on NaN and on values out of range
macro_rules! checked_conv_float {
    ($from:tt, $to:tt, $args:ident) => {
        checked_conv_float!($from, $to, $to, $args)
    };
    ($from:tt, $intermediate:tt, $to:tt, $args:ident) => {{
        let (min, max) = float_min_max!($from, $intermediate);
        let a: $from = operand($args, 0)?;
        if unlikely(a.is_nan()) {
            return Err(Error::Trap(crate::Trap::InvalidConversionToInt));
        }
        if unlikely(a <= min || a >= max) {
            return Err(Error::Trap(crate::Trap::IntegerOverflow));
        }
        WasmValue::from(a as $intermediate as $to)
    }};
}

/// Compare two operands, optionally reinterpreting them as `$as` first
macro_rules! comp {
    ($op:tt, $ty:ty, $args:ident) => {
        comp!($op, $ty, $ty, $args)
    };
    ($op:tt, $ty:ty, $as:ty, $args:ident) => {{
        let b = operand::<$ty>($args, 0)? as $as;
        let a = operand::<$ty>($args, 1)? as $as;
        WasmValue::I32((a $op b) as i32)
    }};
}

/// Compare the operand to zero
macro_rules! comp_zero {
    ($op:tt, $ty:ty, $args:ident) => {
        WasmValue::I32((operand::<$ty>($args, 0)? $op 0) as i32)
    };
}

/// Apply an arithmetic method or operator to two operands
macro_rules! arithmetic {
    ($op:ident, $ty:ty, $args:ident) => {
        arithmetic!($op, $ty, $ty, $args)
    };

    // also allow operators such as +, -
    ($op:tt, $ty:ty, $args:ident) => {{
        let b = operand::<$ty>($args, 0)?;
        let a = operand::<$ty>($args, 1)?;
        WasmValue::from(a $op b)
    }};

    ($op:ident, $ty:ty, $as:ty, $args:ident) => {{
        let b = operand::<$ty>($args, 0)? as $as;
        let a = operand::<$ty>($args, 1)? as $as;
        WasmValue::from(a.$op(b) as $ty)
    }};
}

/// Apply an arithmetic method to a single operand
macro_rules! arithmetic_single {
    ($op:ident, $ty:ty, $args:ident) => {
        arithmetic_single!($op, $ty, $ty, $args)
    };
    ($op:ident, $ty:ty, $to:ty, $args:ident) => {
        WasmValue::from(operand::<$ty>($args, 0)?.$op() as $to)
    };
}

/// Integer division and remainder: trap on a zero divisor, and when the checked
/// operation reports overflow
macro_rules! checked_arithmetic {
    ($op:ident, $ty:ty, $args:ident) => {
        checked_arithmetic!($op, $ty, $ty, $args)
    };
    ($op:ident, $ty:ty, $as:ty, $args:ident) => {{
        let b = operand::<$ty>($args, 0)? as $as;
        let a = operand::<$ty>($args, 1)? as $as;
        if unlikely(b == 0) {
            return Err(Error::Trap(crate::Trap::DivisionByZero));
        }
        let result = a.$op(b).ok_or(Error::Trap(crate::Trap::IntegerOverflow))?;
        WasmValue::from(result as $ty)
    }};
}

pub(super) use arithmetic;
pub(super) use arithmetic_single;
pub(super) use checked_arithmetic;
pub(super) use checked_conv_float;
pub(super) use comp;
pub(super) use comp_zero;
pub(super) use conv;
pub(super) use float_min_max;
pub(super) use mem_load;
pub(super) use mem_store;
