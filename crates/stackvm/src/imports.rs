use core::fmt::Debug;

use crate::{
    LinkingError, MemoryInstance, Result, TableInstance,
    func::{FromWasmValueTuple, IntoWasmValueTuple, ValTypesFromTuple},
};
use alloc::{
    collections::BTreeMap,
    string::{String, ToString},
    sync::Arc,
};
use stackvm_types::{ExternalKind, FuncType, GlobalType, MemoryType, TableType, WasmValue};

/// Host capabilities a module's imports are resolved against.
///
/// Every method receives the import's module and field name together with the type the
/// module declared for it. Implementations fail with [`LinkingError::UnknownImport`] when
/// the name is not provided and with [`LinkingError::IncompatibleImportType`] when the
/// host's definition disagrees with the declared type. The default implementations
/// provide nothing.
pub trait ImportResolver {
    /// Call an imported function with arguments matching `ty.params`.
    fn invoke_function(
        &mut self,
        module: &str,
        field: &str,
        ty: &FuncType,
        args: &[WasmValue],
    ) -> Result<Option<WasmValue>> {
        let _ = (ty, args);
        Err(LinkingError::unknown_import(module, field).into())
    }

    /// Read an imported global.
    fn get_global(&self, module: &str, field: &str, ty: &GlobalType) -> Result<WasmValue> {
        let _ = ty;
        Err(LinkingError::unknown_import(module, field).into())
    }

    /// Write an imported global.
    fn set_global(&mut self, module: &str, field: &str, ty: &GlobalType, value: WasmValue) -> Result<()> {
        let _ = (ty, value);
        Err(LinkingError::unknown_import(module, field).into())
    }

    /// Provide the memory for an imported memory; the execution context takes ownership.
    fn get_memory(&self, module: &str, field: &str, ty: &MemoryType) -> Result<MemoryInstance> {
        let _ = ty;
        Err(LinkingError::unknown_import(module, field).into())
    }

    /// Provide the table for an imported table; the execution context takes ownership.
    fn get_table(&self, module: &str, field: &str, ty: &TableType) -> Result<TableInstance> {
        let _ = ty;
        Err(LinkingError::unknown_import(module, field).into())
    }
}

type HostFn = dyn Fn(&[WasmValue]) -> Result<Option<WasmValue>> + Send + Sync;

/// A host function
#[derive(Clone)]
pub struct HostFunction {
    pub(crate) ty: FuncType,
    pub(crate) func: Arc<HostFn>,
}

impl HostFunction {
    pub fn ty(&self) -> &FuncType {
        &self.ty
    }

    pub fn call(&self, args: &[WasmValue]) -> Result<Option<WasmValue>> {
        (self.func)(args)
    }
}

impl Debug for HostFunction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HostFunction").field("ty", &self.ty).field("func", &"...").finish()
    }
}

/// A value the host provides for an import
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum Extern {
    /// A global value
    Global { ty: GlobalType, value: WasmValue },

    /// A table
    Table(TableInstance),

    /// A memory
    Memory(MemoryInstance),

    /// A function
    Func(HostFunction),
}

impl Extern {
    /// Create a new global import
    pub fn global(value: WasmValue, mutable: bool) -> Self {
        Self::Global { ty: GlobalType::new(value.val_type(), mutable), value }
    }

    /// Create a new table import
    pub fn table(table: TableInstance) -> Self {
        Self::Table(table)
    }

    /// Create a new memory import
    pub fn memory(memory: MemoryInstance) -> Self {
        Self::Memory(memory)
    }

    /// Create a new function import
    pub fn func(
        ty: &FuncType,
        func: impl Fn(&[WasmValue]) -> Result<Option<WasmValue>> + 'static + Send + Sync,
    ) -> Self {
        Self::Func(HostFunction { ty: ty.clone(), func: Arc::new(func) })
    }

    /// Create a new typed function import
    ///
    /// `R` is `()` for functions without a result, or a single scalar such as `i32`.
    pub fn typed_func<P, R>(func: impl Fn(P) -> Result<R> + 'static + Send + Sync) -> Self
    where
        P: FromWasmValueTuple + ValTypesFromTuple,
        R: IntoWasmValueTuple + ValTypesFromTuple,
    {
        let inner_func = move |args: &[WasmValue]| -> Result<Option<WasmValue>> {
            let args = P::from_wasm_value_tuple(args.to_vec())?;
            let result = func(args)?;
            Ok(result.into_wasm_value_tuple().into_iter().next())
        };

        let ty = FuncType { params: P::val_types(), result: R::val_types().first().copied() };
        Self::Func(HostFunction { func: Arc::new(inner_func), ty })
    }

    pub(crate) fn kind(&self) -> ExternalKind {
        match self {
            Self::Global { .. } => ExternalKind::Global,
            Self::Table(_) => ExternalKind::Table,
            Self::Memory(_) => ExternalKind::Memory,
            Self::Func(_) => ExternalKind::Func,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Ord, PartialOrd, Hash)]
/// Name of an import
pub struct ExternName {
    module: String,
    name: String,
}

impl ExternName {
    pub fn new(module: &str, name: &str) -> Self {
        Self { module: module.to_string(), name: name.to_string() }
    }
}

#[derive(Debug, Default, Clone)]
/// A registry of host-provided imports
///
/// ```rust
/// use stackvm::{Extern, Imports, WasmValue};
///
/// let mut imports = Imports::new();
/// imports
///     .define("env", "double", Extern::typed_func(|x: i32| Ok(x * 2)))?
///     .define("env", "counter", Extern::global(WasmValue::I64(0), true))?;
/// # Ok::<(), stackvm::Error>(())
/// ```
pub struct Imports {
    values: BTreeMap<ExternName, Extern>,
}

impl Imports {
    /// Create a new empty import set
    pub fn new() -> Self {
        Imports { values: BTreeMap::new() }
    }

    /// Define an import, replacing any earlier definition with the same name
    pub fn define(&mut self, module: &str, name: &str, value: Extern) -> Result<&mut Self> {
        self.values.insert(ExternName::new(module, name), value);
        Ok(self)
    }

    /// Look up a definition and check that it has the expected kind
    pub fn get(&self, module: &str, name: &str, kind: ExternalKind) -> Result<&Extern> {
        let value = self.values.get(&ExternName::new(module, name));
        match value {
            None => Err(LinkingError::unknown_import(module, name).into()),
            Some(value) if value.kind() != kind => Err(LinkingError::incompatible_import_type(module, name).into()),
            Some(value) => Ok(value),
        }
    }

    fn get_mut(&mut self, module: &str, name: &str, kind: ExternalKind) -> Result<&mut Extern> {
        self.get(module, name, kind)?;
        self.values
            .get_mut(&ExternName::new(module, name))
            .ok_or_else(|| LinkingError::unknown_import(module, name).into())
    }
}

impl ImportResolver for Imports {
    fn invoke_function(
        &mut self,
        module: &str,
        field: &str,
        ty: &FuncType,
        args: &[WasmValue],
    ) -> Result<Option<WasmValue>> {
        match self.get(module, field, ExternalKind::Func)? {
            Extern::Func(func) if &func.ty == ty => func.call(args),
            _ => Err(LinkingError::incompatible_import_type(module, field).into()),
        }
    }

    fn get_global(&self, module: &str, field: &str, ty: &GlobalType) -> Result<WasmValue> {
        match self.get(module, field, ExternalKind::Global)? {
            Extern::Global { ty: own, value } if own == ty => Ok(*value),
            _ => Err(LinkingError::incompatible_import_type(module, field).into()),
        }
    }

    fn set_global(&mut self, module: &str, field: &str, ty: &GlobalType, value: WasmValue) -> Result<()> {
        match self.get_mut(module, field, ExternalKind::Global)? {
            Extern::Global { ty: own, value: slot }
                if own == ty && own.mutable && value.val_type() == own.ty =>
            {
                *slot = value;
                Ok(())
            }
            _ => Err(LinkingError::incompatible_import_type(module, field).into()),
        }
    }

    fn get_memory(&self, module: &str, field: &str, ty: &MemoryType) -> Result<MemoryInstance> {
        match self.get(module, field, ExternalKind::Memory)? {
            Extern::Memory(memory) if memory.satisfies(ty) => Ok(memory.clone()),
            _ => Err(LinkingError::incompatible_import_type(module, field).into()),
        }
    }

    fn get_table(&self, module: &str, field: &str, ty: &TableType) -> Result<TableInstance> {
        match self.get(module, field, ExternalKind::Table)? {
            Extern::Table(table) if table.satisfies(ty) => Ok(table.clone()),
            _ => Err(LinkingError::incompatible_import_type(module, field).into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use stackvm_types::ValType;

    fn is_incompatible(result: Result<impl Debug>) -> bool {
        matches!(result, Err(Error::Linker(LinkingError::IncompatibleImportType { .. })))
    }

    #[test]
    fn resolves_functions_by_name_and_type() {
        let mut imports = Imports::new();
        imports.define("env", "add", Extern::typed_func(|(a, b): (i32, i32)| Ok(a + b))).unwrap();

        let ty = FuncType::new(&[ValType::I32, ValType::I32], Some(ValType::I32));
        let result = imports.invoke_function("env", "add", &ty, &[WasmValue::I32(2), WasmValue::I32(5)]).unwrap();
        assert_eq!(result, Some(WasmValue::I32(7)));

        let wrong = FuncType::new(&[ValType::I32], Some(ValType::I32));
        assert!(is_incompatible(imports.invoke_function("env", "add", &wrong, &[WasmValue::I32(1)])));
        assert!(matches!(
            imports.invoke_function("env", "sub", &ty, &[]),
            Err(Error::Linker(LinkingError::UnknownImport { .. }))
        ));
        assert!(is_incompatible(imports.get_global("env", "add", &GlobalType::new(ValType::I32, false))));
    }

    #[test]
    fn globals_respect_mutability() {
        let mut imports = Imports::new();
        imports.define("env", "c", Extern::global(WasmValue::I32(1), false)).unwrap();
        imports.define("env", "m", Extern::global(WasmValue::F64(1.5), true)).unwrap();

        let constant = GlobalType::new(ValType::I32, false);
        let mutable = GlobalType::new(ValType::F64, true);

        assert_eq!(imports.get_global("env", "c", &constant).unwrap(), WasmValue::I32(1));
        assert!(is_incompatible(imports.set_global("env", "c", &constant, WasmValue::I32(2))));
        assert!(is_incompatible(imports.get_global("env", "c", &GlobalType::new(ValType::I64, false))));

        imports.set_global("env", "m", &mutable, WasmValue::F64(2.5)).unwrap();
        assert_eq!(imports.get_global("env", "m", &mutable).unwrap(), WasmValue::F64(2.5));
        assert!(is_incompatible(imports.set_global("env", "m", &mutable, WasmValue::I32(0))));
    }

    #[test]
    fn memories_and_tables_are_type_checked() {
        let mut imports = Imports::new();
        imports.define("env", "mem", Extern::memory(MemoryInstance::new(MemoryType::new(1, Some(2)), 4))).unwrap();
        imports.define("env", "tab", Extern::table(TableInstance::new(TableType::new(4, None)))).unwrap();

        assert_eq!(imports.get_memory("env", "mem", &MemoryType::new(1, None)).unwrap().page_count(), 1);
        assert!(is_incompatible(imports.get_memory("env", "mem", &MemoryType::new(3, None))));
        assert_eq!(imports.get_table("env", "tab", &TableType::new(2, None)).unwrap().size(), 4);
        assert!(is_incompatible(imports.get_table("env", "tab", &TableType::new(2, Some(8)))));
    }
}
