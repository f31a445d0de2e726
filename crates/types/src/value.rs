use core::fmt::Debug;

use crate::{ConstInstruction, ValType};

/// A WebAssembly value.
///
/// Integers are stored as their signed two's-complement representation; unsigned
/// operations reinterpret the bit pattern.
///
/// See <https://webassembly.github.io/spec/core/syntax/types.html#value-types>
#[derive(Clone, Copy)]
#[cfg_attr(feature = "archive", derive(serde::Serialize, serde::Deserialize))]
pub enum WasmValue {
    /// A 32-bit integer.
    I32(i32),
    /// A 64-bit integer.
    I64(i64),
    /// A 32-bit float.
    F32(f32),
    /// A 64-bit float.
    F64(f64),
}

impl WasmValue {
    #[inline]
    pub fn const_instr(&self) -> ConstInstruction {
        match self {
            Self::I32(i) => ConstInstruction::I32Const(*i),
            Self::I64(i) => ConstInstruction::I64Const(*i),
            Self::F32(i) => ConstInstruction::F32Const(*i),
            Self::F64(i) => ConstInstruction::F64Const(*i),
        }
    }

    /// Get the default value for a given type.
    #[inline]
    pub fn default_for(ty: ValType) -> Self {
        match ty {
            ValType::I32 => Self::I32(0),
            ValType::I64 => Self::I64(0),
            ValType::F32 => Self::F32(0.0),
            ValType::F64 => Self::F64(0.0),
        }
    }

    /// Get the type of a [`WasmValue`]
    #[inline]
    pub fn val_type(&self) -> ValType {
        match self {
            Self::I32(_) => ValType::I32,
            Self::I64(_) => ValType::I64,
            Self::F32(_) => ValType::F32,
            Self::F64(_) => ValType::F64,
        }
    }

    /// Equality on bit patterns, except that any two NaNs compare equal.
    #[inline]
    pub fn eq_loose(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::I32(a), Self::I32(b)) => a == b,
            (Self::I64(a), Self::I64(b)) => a == b,
            (Self::F32(a), Self::F32(b)) => (a.is_nan() && b.is_nan()) || a.to_bits() == b.to_bits(),
            (Self::F64(a), Self::F64(b)) => (a.is_nan() && b.is_nan()) || a.to_bits() == b.to_bits(),
            _ => false,
        }
    }

    /// Raw 64-bit representation, used for little-endian memory stores.
    #[inline]
    pub fn to_bits(&self) -> u64 {
        match self {
            Self::I32(v) => *v as u32 as u64,
            Self::I64(v) => *v as u64,
            Self::F32(v) => v.to_bits() as u64,
            Self::F64(v) => v.to_bits(),
        }
    }
}

impl PartialEq for WasmValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::F32(a), Self::F32(b)) => a.to_bits() == b.to_bits(),
            (Self::F64(a), Self::F64(b)) => a.to_bits() == b.to_bits(),
            _ => self.eq_loose(other),
        }
    }
}

#[cold]
fn cold() {}

impl Debug for WasmValue {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            WasmValue::I32(i) => write!(f, "i32({i})"),
            WasmValue::I64(i) => write!(f, "i64({i})"),
            WasmValue::F32(i) => write!(f, "f32({i})"),
            WasmValue::F64(i) => write!(f, "f64({i})"),
        }
    }
}

impl core::fmt::Display for WasmValue {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            WasmValue::I32(i) => write!(f, "{i}"),
            WasmValue::I64(i) => write!(f, "{i}"),
            WasmValue::F32(i) => write!(f, "{i}"),
            WasmValue::F64(i) => write!(f, "{i}"),
        }
    }
}

macro_rules! impl_conversion_for_wasmvalue {
    ($($t:ty => $variant:ident),*) => {
        $(
            impl From<$t> for WasmValue {
                #[inline]
                fn from(i: $t) -> Self {
                    Self::$variant(i)
                }
            }

            impl TryFrom<WasmValue> for $t {
                type Error = ();

                #[inline]
                fn try_from(value: WasmValue) -> Result<Self, Self::Error> {
                    if let WasmValue::$variant(i) = value {
                        Ok(i)
                    } else {
                        cold();
                        Err(())
                    }
                }
            }
        )*
    }
}

impl_conversion_for_wasmvalue! {
    i32 => I32,
    i64 => I64,
    f32 => F32,
    f64 => F64
}

impl From<u32> for WasmValue {
    #[inline]
    fn from(i: u32) -> Self {
        Self::I32(i as i32)
    }
}

impl From<u64> for WasmValue {
    #[inline]
    fn from(i: u64) -> Self {
        Self::I64(i as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nan_equality() {
        let a = WasmValue::F32(f32::NAN);
        let b = WasmValue::F32(f32::from_bits(0x7fc0_0001));
        assert!(a.eq_loose(&b));
        assert_ne!(a, b);
        assert_eq!(a, a);
        assert!(!WasmValue::I32(1).eq_loose(&WasmValue::I64(1)));
    }

    #[test]
    fn unsigned_values_keep_bit_pattern() {
        assert_eq!(WasmValue::from(u32::MAX), WasmValue::I32(-1));
        assert_eq!(WasmValue::I32(-1).to_bits(), 0xffff_ffff);
        assert_eq!(i64::try_from(WasmValue::I32(1)), Err(()));
    }
}
