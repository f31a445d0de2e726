use std::str::FromStr;
use stackvm::WasmValue;

/// A typed invocation argument, written as `type:value` (for example `i32:7`).
#[derive(Debug, Clone, Copy)]
pub struct WasmArg(WasmValue);

pub fn to_wasm_args(args: Vec<WasmArg>) -> Vec<WasmValue> {
    args.into_iter().map(|a| a.into()).collect()
}

impl From<WasmArg> for WasmValue {
    fn from(value: WasmArg) -> Self {
        value.0
    }
}

impl FromStr for WasmArg {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (ty, val) = s.split_once(':').ok_or_else(|| format!("expected `type:value`, got `{s}`"))?;

        let arg: WasmValue = match ty {
            "i32" => val.parse::<i32>().map_err(|e| format!("invalid argument value for i32: {e}"))?.into(),
            "i64" => val.parse::<i64>().map_err(|e| format!("invalid argument value for i64: {e}"))?.into(),
            "f32" => val.parse::<f32>().map_err(|e| format!("invalid argument value for f32: {e}"))?.into(),
            "f64" => val.parse::<f64>().map_err(|e| format!("invalid argument value for f64: {e}"))?.into(),
            t => return Err(format!("invalid argument type: {t}")),
        };

        Ok(WasmArg(arg))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_typed_values() {
        assert_eq!(WasmValue::from("i32:-7".parse::<WasmArg>().unwrap()), WasmValue::I32(-7));
        assert_eq!(WasmValue::from("i64:9".parse::<WasmArg>().unwrap()), WasmValue::I64(9));
        assert_eq!(WasmValue::from("f64:1.5".parse::<WasmArg>().unwrap()), WasmValue::F64(1.5));
        assert!("i32".parse::<WasmArg>().is_err());
        assert!("v128:0".parse::<WasmArg>().is_err());
        assert!("i32:x".parse::<WasmArg>().is_err());
    }
}
