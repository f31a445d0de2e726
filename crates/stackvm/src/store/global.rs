use stackvm_types::{GlobalType, WasmValue};

/// A module-defined global
///
/// See <https://webassembly.github.io/spec/core/exec/runtime.html#global-instances>
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct GlobalInstance {
    pub(crate) ty: GlobalType,
    pub(crate) value: WasmValue,
}

impl GlobalInstance {
    pub(crate) fn new(ty: GlobalType, value: WasmValue) -> Self {
        Self { ty, value }
    }
}
