pub(crate) trait CheckedWrappingRem
where
    Self: Sized,
{
    fn checked_wrapping_rem(self, rhs: Self) -> Option<Self>;
}

pub(crate) trait WasmFloatExt {
    fn wasm_min(self, other: Self) -> Self;
    fn wasm_max(self, other: Self) -> Self;
    fn wasm_nearest(self) -> Self;
}

#[cfg(not(feature = "std"))]
use super::no_std_floats::NoStdFloatExt;

macro_rules! impl_wasm_float_ops {
    ($($t:ty)*) => ($(
        impl WasmFloatExt for $t {
            // https://webassembly.github.io/spec/core/exec/numerics.html#op-fnearest
            fn wasm_nearest(self) -> Self {
                match self {
                    x if x.is_nan() => x,
                    x if x.is_infinite() || x == 0.0 => x,
                    x if (0.0..=0.5).contains(&x) => 0.0,
                    x if (-0.5..0.0).contains(&x) => -0.0,
                    x => {
                        // ties go to the even neighbour
                        let rounded = x.round();
                        let diff = (x - rounded).abs();
                        if diff != 0.5 || rounded % 2.0 == 0.0 {
                            return rounded
                        }

                        rounded - x.signum()
                    }
                }
            }

            // https://webassembly.github.io/spec/core/exec/numerics.html#op-fmin
            #[inline]
            fn wasm_min(self, other: Self) -> Self {
                match self.partial_cmp(&other) {
                    Some(core::cmp::Ordering::Less) => self,
                    Some(core::cmp::Ordering::Greater) => other,
                    Some(core::cmp::Ordering::Equal) => if self.is_sign_negative() { self } else { other },
                    // `+` propagates and quiets the NaN
                    None => self + other,
                }
            }

            // https://webassembly.github.io/spec/core/exec/numerics.html#op-fmax
            #[inline]
            fn wasm_max(self, other: Self) -> Self {
                match self.partial_cmp(&other) {
                    Some(core::cmp::Ordering::Greater) => self,
                    Some(core::cmp::Ordering::Less) => other,
                    Some(core::cmp::Ordering::Equal) => if self.is_sign_negative() { other } else { self },
                    None => self + other,
                }
            }
        }
    )*)
}

impl_wasm_float_ops! { f32 f64 }

pub(crate) trait WasmIntOps {
    fn wasm_shl(self, rhs: Self) -> Self;
    fn wasm_shr(self, rhs: Self) -> Self;
    fn wasm_rotl(self, rhs: Self) -> Self;
    fn wasm_rotr(self, rhs: Self) -> Self;
}

// shift counts are taken modulo the bit width
macro_rules! impl_wrapping_self_sh {
    ($($t:ty)*) => ($(
        impl WasmIntOps for $t {
            #[inline]
            fn wasm_shl(self, rhs: Self) -> Self {
                self.wrapping_shl(rhs as u32)
            }

            #[inline]
            fn wasm_shr(self, rhs: Self) -> Self {
                self.wrapping_shr(rhs as u32)
            }

            #[inline]
            fn wasm_rotl(self, rhs: Self) -> Self {
                self.rotate_left((rhs as u32) % <$t>::BITS)
            }

            #[inline]
            fn wasm_rotr(self, rhs: Self) -> Self {
                self.rotate_right((rhs as u32) % <$t>::BITS)
            }
        }
    )*)
}

impl_wrapping_self_sh! { i32 i64 u32 u64 }

macro_rules! impl_checked_wrapping_rem {
    ($($t:ty)*) => ($(
        impl CheckedWrappingRem for $t {
            #[inline]
            fn checked_wrapping_rem(self, rhs: Self) -> Option<Self> {
                if rhs == 0 {
                    None
                } else {
                    Some(self.wrapping_rem(rhs))
                }
            }
        }
    )*)
}

impl_checked_wrapping_rem! { i32 i64 u32 u64 }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearest_rounds_ties_to_even() {
        assert_eq!(2.5f64.wasm_nearest(), 2.0);
        assert_eq!(3.5f64.wasm_nearest(), 4.0);
        assert_eq!((-2.5f32).wasm_nearest(), -2.0);
        assert_eq!(0.4f32.wasm_nearest(), 0.0);
        assert!((-0.4f64).wasm_nearest().is_sign_negative());
    }

    #[test]
    fn min_max_handle_zero_signs_and_nan() {
        assert!(0.0f32.wasm_min(-0.0).is_sign_negative());
        assert!((-0.0f64).wasm_max(0.0).is_sign_positive());
        assert!(f32::NAN.wasm_min(1.0).is_nan());
        assert!(1.0f64.wasm_max(f64::NAN).is_nan());
    }

    #[test]
    fn integer_helpers() {
        assert_eq!(1i32.wasm_shl(33), 2);
        assert_eq!((-8i32).wasm_shr(1), -4);
        assert_eq!(0x8000_0000u32.wasm_rotl(1), 1);
        assert_eq!(i32::MIN.checked_wrapping_rem(-1), Some(0));
        assert_eq!(5u64.checked_wrapping_rem(0), None);
    }
}
