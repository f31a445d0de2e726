use alloc::{boxed::Box, string::ToString, vec, vec::Vec};
use stackvm_types::{ValType, WasmValue};

use crate::{Error, Result};

/// Rust types with a direct WebAssembly value type.
pub trait WasmType: Into<WasmValue> + TryFrom<WasmValue, Error = ()> {
    const VAL_TYPE: ValType;
}

impl WasmType for i32 {
    const VAL_TYPE: ValType = ValType::I32;
}

impl WasmType for i64 {
    const VAL_TYPE: ValType = ValType::I64;
}

impl WasmType for f32 {
    const VAL_TYPE: ValType = ValType::F32;
}

impl WasmType for f64 {
    const VAL_TYPE: ValType = ValType::F64;
}

pub trait IntoWasmValueTuple {
    fn into_wasm_value_tuple(self) -> Vec<WasmValue>;
}

pub trait FromWasmValueTuple {
    fn from_wasm_value_tuple(values: Vec<WasmValue>) -> Result<Self>
    where
        Self: Sized;
}

pub trait ValTypesFromTuple {
    fn val_types() -> Box<[ValType]>;
}

fn convert<T: WasmType>(value: Option<WasmValue>) -> Result<T> {
    let value = value.ok_or(Error::FuncDidNotReturn)?;
    T::try_from(value).map_err(|_| Error::InvalidCallResult { expected: Some(T::VAL_TYPE), actual: Some(value) })
}

macro_rules! impl_scalar {
    ($($T:ty),*) => {$(
        impl IntoWasmValueTuple for $T {
            fn into_wasm_value_tuple(self) -> Vec<WasmValue> {
                vec![self.into()]
            }
        }

        impl FromWasmValueTuple for $T {
            fn from_wasm_value_tuple(values: Vec<WasmValue>) -> Result<Self> {
                if values.len() > 1 {
                    return Err(Error::Other("more than one value for a scalar result".to_string()));
                }
                convert(values.into_iter().next())
            }
        }

        impl ValTypesFromTuple for $T {
            fn val_types() -> Box<[ValType]> {
                vec![<$T as WasmType>::VAL_TYPE].into_boxed_slice()
            }
        }
    )*}
}

impl_scalar!(i32, i64, f32, f64);

macro_rules! impl_tuple {
    ($($T:ident),*) => {
        impl<$($T: WasmType),*> IntoWasmValueTuple for ($($T,)*) {
            #[allow(non_snake_case)]
            fn into_wasm_value_tuple(self) -> Vec<WasmValue> {
                let ($($T,)*) = self;
                vec![$($T.into(),)*]
            }
        }

        impl<$($T: WasmType),*> FromWasmValueTuple for ($($T,)*) {
            fn from_wasm_value_tuple(values: Vec<WasmValue>) -> Result<Self> {
                #[allow(unused_variables, unused_mut)]
                let mut iter = values.into_iter();
                let tuple = ($(convert::<$T>(iter.next())?,)*);
                match iter.next() {
                    Some(_) => Err(Error::Other("too many values for tuple".to_string())),
                    None => Ok(tuple),
                }
            }
        }

        impl<$($T: WasmType),*> ValTypesFromTuple for ($($T,)*) {
            fn val_types() -> Box<[ValType]> {
                vec![$($T::VAL_TYPE,)*].into_boxed_slice()
            }
        }
    }
}

impl_tuple!();
impl_tuple!(T1);
impl_tuple!(T1, T2);
impl_tuple!(T1, T2, T3);
impl_tuple!(T1, T2, T3, T4);
impl_tuple!(T1, T2, T3, T4, T5);
impl_tuple!(T1, T2, T3, T4, T5, T6);
impl_tuple!(T1, T2, T3, T4, T5, T6, T7);
impl_tuple!(T1, T2, T3, T4, T5, T6, T7, T8);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tuples_convert_both_ways() {
        let values = (1i32, 2i64, 3.5f32).into_wasm_value_tuple();
        assert_eq!(values, vec![WasmValue::I32(1), WasmValue::I64(2), WasmValue::F32(3.5)]);
        assert_eq!(<(i32, i64, f32)>::from_wasm_value_tuple(values).unwrap(), (1, 2, 3.5));
        assert_eq!(&*<(i32, f64)>::val_types(), &[ValType::I32, ValType::F64]);
        assert!(<()>::from_wasm_value_tuple(vec![]).is_ok());
    }

    #[test]
    fn scalar_results() {
        assert_eq!(i32::from_wasm_value_tuple(vec![WasmValue::I32(7)]).unwrap(), 7);
        assert!(matches!(i32::from_wasm_value_tuple(vec![]), Err(Error::FuncDidNotReturn)));
        assert!(matches!(
            i64::from_wasm_value_tuple(vec![WasmValue::F32(1.0)]),
            Err(Error::InvalidCallResult { expected: Some(ValType::I64), .. })
        ));
    }
}
