#![no_std]
#![forbid(unsafe_code)]
#![doc(test(
    no_crate_inject,
    attr(deny(warnings, rust_2018_idioms), allow(dead_code, unused_assignments, unused_variables))
))]
#![warn(missing_debug_implementations, rust_2018_idioms, unreachable_pub)]

//! Types used by [`stackvm`](https://docs.rs/stackvm) and [`stackvm_parser`](https://docs.rs/stackvm_parser).
//!
//! This crate holds the pure data half of the system: the [`Module`] produced by the
//! format layer, the [`Instruction`] set, runtime [`WasmValue`]s and the static
//! [`Signature`] table that both the validator and the interpreter conform to.

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

mod instructions;
mod signature;
mod value;

#[cfg(feature = "archive")]
pub mod archive;

use alloc::{boxed::Box, collections::BTreeMap, vec::Vec};
use core::fmt::Debug;

pub use instructions::*;
pub use signature::*;
pub use value::*;

/// Size of a WebAssembly page in bytes.
pub const PAGE_SIZE: u64 = 65536;

/// The largest page count a 32-bit linear memory can address.
pub const MAX_PAGES: u32 = 65536;

/// A stackvm WebAssembly Module
///
/// This is the internal representation of a WebAssembly module, consumed read-only by
/// both the stack-effect evaluator and the interpreter.
///
/// Function and global index spaces are the concatenation of the imports of that kind
/// followed by the module-defined entities, in declaration order. Every index stored in
/// an [`Instruction`] refers to these combined spaces.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "archive", derive(serde::Serialize, serde::Deserialize))]
pub struct Module {
    /// The types of the WebAssembly module.
    pub func_types: Box<[FuncType]>,

    /// The imports of the WebAssembly module.
    pub imports: ModuleImports,

    /// The module-defined functions (imports are not included).
    pub funcs: Box<[Function]>,

    /// The tables of the WebAssembly module.
    pub tables: Box<[TableType]>,

    /// The memories of the WebAssembly module.
    pub memories: Box<[MemoryType]>,

    /// The module-defined globals (imports are not included).
    pub globals: Box<[Global]>,

    /// The exports of the WebAssembly module.
    pub exports: Box<[Export]>,

    /// The start function of the WebAssembly module.
    pub start_func: Option<FuncAddr>,

    /// Element segments of the WebAssembly module.
    pub elements: Box<[Element]>,

    /// Data segments of the WebAssembly module.
    pub data: Box<[Data]>,

    /// Name metadata from the `name` custom section.
    pub names: Names,
}

impl Module {
    /// Number of imported functions, i.e. the index of the first module-defined function.
    pub fn imported_func_count(&self) -> usize {
        self.imports.funcs.len()
    }

    /// Number of imported globals, i.e. the index of the first module-defined global.
    pub fn imported_global_count(&self) -> usize {
        self.imports.globals.len()
    }

    /// Iterate over the imported functions in index-space order.
    pub fn imported_funcs(&self) -> impl Iterator<Item = (&Import, TypeAddr)> + '_ {
        (0..self.imports.funcs.len()).filter_map(|n| self.imports.func(n))
    }

    /// Iterate over the imported globals in index-space order.
    pub fn imported_globals(&self) -> impl Iterator<Item = (&Import, &GlobalType)> + '_ {
        (0..self.imports.globals.len()).filter_map(|n| self.imports.global(n))
    }

    /// Resolve a function index into either an import or a module-defined function.
    pub fn func_at(&self, index: FuncAddr) -> Option<FuncRef<'_>> {
        let index = index as usize;
        match self.imports.func(index) {
            Some((import, ty)) => Some(FuncRef::Imported(import, ty)),
            None => self.funcs.get(index - self.imported_func_count()).map(FuncRef::Defined),
        }
    }

    /// Resolve the type of a function in the combined function index space.
    pub fn func_type_at(&self, index: FuncAddr) -> Option<&FuncType> {
        let ty = match self.func_at(index)? {
            FuncRef::Imported(_, ty) => ty,
            FuncRef::Defined(func) => func.ty,
        };
        self.func_types.get(ty as usize)
    }

    /// Resolve the type of a global in the combined global index space.
    pub fn global_type_at(&self, index: GlobalAddr) -> Option<&GlobalType> {
        let index = index as usize;
        match self.imports.global(index) {
            Some((_, ty)) => Some(ty),
            None => self.globals.get(index - self.imported_global_count()).map(|g| &g.ty),
        }
    }

    /// The table type at `index`, looking at imports first.
    pub fn table_type_at(&self, index: TableAddr) -> Option<&TableType> {
        let index = index as usize;
        match self.imports.table(index) {
            Some((_, ty)) => Some(ty),
            None => self.tables.get(index - self.imports.tables.len()),
        }
    }

    /// The memory type at `index`, looking at imports first.
    pub fn memory_type_at(&self, index: MemAddr) -> Option<&MemoryType> {
        let index = index as usize;
        match self.imports.memory(index) {
            Some((_, ty)) => Some(ty),
            None => self.memories.get(index - self.imports.memories.len()),
        }
    }

    /// Find an export by name and kind.
    pub fn export(&self, name: &str, kind: ExternalKind) -> Option<&Export> {
        self.exports.iter().find(|e| &*e.name == name && e.kind == kind)
    }

    /// The debug name of a function, if the module carries one.
    pub fn func_name(&self, index: FuncAddr) -> Option<&str> {
        self.names.funcs.get(&index).map(|n| &**n)
    }

    /// The debug name of a local (parameters first), if the module carries one.
    pub fn local_name(&self, func: FuncAddr, local: LocalAddr) -> Option<&str> {
        self.names.locals.get(&func)?.get(&local).map(|n| &**n)
    }
}

/// A resolved entry in the function index space.
#[derive(Debug, Clone, Copy)]
pub enum FuncRef<'a> {
    /// A host function declared by an import
    Imported(&'a Import, TypeAddr),
    /// A function with a body in this module
    Defined(&'a Function),
}

/// Type of a WebAssembly value.
///
/// Used both as a static type tag by the evaluator and to tag runtime values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "archive", derive(serde::Serialize, serde::Deserialize))]
pub enum ValType {
    /// A 32-bit integer.
    I32,
    /// A 64-bit integer.
    I64,
    /// A 32-bit float.
    F32,
    /// A 64-bit float.
    F64,
}

impl ValType {
    /// Get the default (zero) value for this type.
    #[inline]
    pub fn default_value(&self) -> WasmValue {
        WasmValue::default_for(*self)
    }

    /// The canonical text-format name of the type.
    pub fn name(&self) -> &'static str {
        match self {
            ValType::I32 => "i32",
            ValType::I64 => "i64",
            ValType::F32 => "f32",
            ValType::F64 => "f64",
        }
    }
}

impl core::fmt::Display for ValType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// A WebAssembly External Kind.
///
/// See <https://webassembly.github.io/spec/core/syntax/types.html#external-types>
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "archive", derive(serde::Serialize, serde::Deserialize))]
pub enum ExternalKind {
    /// A WebAssembly Function.
    Func,
    /// A WebAssembly Table.
    Table,
    /// A WebAssembly Memory.
    Memory,
    /// A WebAssembly Global.
    Global,
}

/// A WebAssembly Address.
///
/// These are indexes into the respective index spaces of a module.
pub type Addr = u32;
pub type FuncAddr = Addr;
pub type TableAddr = Addr;
pub type MemAddr = Addr;
pub type GlobalAddr = Addr;
pub type TypeAddr = Addr;
pub type LocalAddr = Addr;
pub type LabelAddr = Addr;

/// The type of a WebAssembly Function.
///
/// MVP functions return at most one value.
///
/// See <https://webassembly.github.io/spec/core/syntax/types.html#function-types>
#[derive(Debug, Clone, PartialEq, Eq, Default, Hash)]
#[cfg_attr(feature = "archive", derive(serde::Serialize, serde::Deserialize))]
pub struct FuncType {
    pub params: Box<[ValType]>,
    pub result: Option<ValType>,
}

impl FuncType {
    /// Create a new function type.
    pub fn new(params: &[ValType], result: Option<ValType>) -> Self {
        Self { params: params.into(), result }
    }

    /// A function type without parameters or result.
    pub fn empty() -> Self {
        Self::default()
    }
}

impl core::fmt::Display for FuncType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "(func")?;
        if !self.params.is_empty() {
            write!(f, " (param")?;
            for p in self.params.iter() {
                write!(f, " {p}")?;
            }
            write!(f, ")")?;
        }
        if let Some(result) = self.result {
            write!(f, " (result {result})")?;
        }
        write!(f, ")")
    }
}

/// A WebAssembly Function
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "archive", derive(serde::Serialize, serde::Deserialize))]
pub struct Function {
    pub ty: TypeAddr,
    /// Declared locals, not including the parameters.
    pub locals: Box<[ValType]>,
    pub instructions: Box<[Instruction]>,
}

/// A WebAssembly Module Export
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "archive", derive(serde::Serialize, serde::Deserialize))]
pub struct Export {
    /// The name of the export.
    pub name: Box<str>,
    /// The kind of the export.
    pub kind: ExternalKind,
    /// The index of the exported item.
    pub index: u32,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "archive", derive(serde::Serialize, serde::Deserialize))]
pub struct Global {
    pub ty: GlobalType,
    pub init: ConstInstruction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "archive", derive(serde::Serialize, serde::Deserialize))]
pub struct GlobalType {
    pub mutable: bool,
    pub ty: ValType,
}

impl GlobalType {
    pub fn new(ty: ValType, mutable: bool) -> Self {
        Self { mutable, ty }
    }
}

/// A table of function references.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "archive", derive(serde::Serialize, serde::Deserialize))]
pub struct TableType {
    pub size_initial: u32,
    pub size_max: Option<u32>,
}

impl TableType {
    pub fn new(size_initial: u32, size_max: Option<u32>) -> Self {
        Self { size_initial, size_max }
    }
}

/// Represents a memory's type, in pages of [`PAGE_SIZE`] bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "archive", derive(serde::Serialize, serde::Deserialize))]
pub struct MemoryType {
    pub page_count_initial: u32,
    pub page_count_max: Option<u32>,
}

impl MemoryType {
    pub fn new(page_count_initial: u32, page_count_max: Option<u32>) -> Self {
        Self { page_count_initial, page_count_max }
    }

    /// Initial size in bytes.
    pub fn initial_size(&self) -> u64 {
        self.page_count_initial as u64 * PAGE_SIZE
    }
}

/// The import section of a module, indexed by kind when it is built.
///
/// Dereferences to the imports in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(
    feature = "archive",
    derive(serde::Serialize, serde::Deserialize),
    serde(from = "Vec<Import>", into = "Vec<Import>")
)]
pub struct ModuleImports {
    imports: Box<[Import]>,
    // positions in `imports`, one list per kind, in index-space order
    funcs: Box<[usize]>,
    tables: Box<[usize]>,
    memories: Box<[usize]>,
    globals: Box<[usize]>,
}

impl ModuleImports {
    /// The `n`th imported function and its type index.
    pub fn func(&self, n: usize) -> Option<(&Import, TypeAddr)> {
        let import = &self.imports[*self.funcs.get(n)?];
        match import.kind {
            ImportKind::Function(ty) => Some((import, ty)),
            _ => None,
        }
    }

    /// The `n`th imported global and its type.
    pub fn global(&self, n: usize) -> Option<(&Import, &GlobalType)> {
        let import = &self.imports[*self.globals.get(n)?];
        match &import.kind {
            ImportKind::Global(ty) => Some((import, ty)),
            _ => None,
        }
    }

    /// The `n`th imported table and its type.
    pub fn table(&self, n: usize) -> Option<(&Import, &TableType)> {
        let import = &self.imports[*self.tables.get(n)?];
        match &import.kind {
            ImportKind::Table(ty) => Some((import, ty)),
            _ => None,
        }
    }

    /// The `n`th imported memory and its type.
    pub fn memory(&self, n: usize) -> Option<(&Import, &MemoryType)> {
        let import = &self.imports[*self.memories.get(n)?];
        match &import.kind {
            ImportKind::Memory(ty) => Some((import, ty)),
            _ => None,
        }
    }
}

impl From<Box<[Import]>> for ModuleImports {
    fn from(imports: Box<[Import]>) -> Self {
        let positions = |f: fn(&ImportKind) -> bool| -> Box<[usize]> {
            imports.iter().enumerate().filter(|(_, i)| f(&i.kind)).map(|(pos, _)| pos).collect()
        };
        let funcs = positions(|k| matches!(k, ImportKind::Function(_)));
        let tables = positions(|k| matches!(k, ImportKind::Table(_)));
        let memories = positions(|k| matches!(k, ImportKind::Memory(_)));
        let globals = positions(|k| matches!(k, ImportKind::Global(_)));
        Self { imports, funcs, tables, memories, globals }
    }
}

impl From<Vec<Import>> for ModuleImports {
    fn from(imports: Vec<Import>) -> Self {
        imports.into_boxed_slice().into()
    }
}

impl From<ModuleImports> for Vec<Import> {
    fn from(imports: ModuleImports) -> Self {
        imports.imports.into_vec()
    }
}

impl FromIterator<Import> for ModuleImports {
    fn from_iter<I: IntoIterator<Item = Import>>(iter: I) -> Self {
        iter.into_iter().collect::<Box<[Import]>>().into()
    }
}

impl core::ops::Deref for ModuleImports {
    type Target = [Import];

    fn deref(&self) -> &[Import] {
        &self.imports
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "archive", derive(serde::Serialize, serde::Deserialize))]
pub struct Import {
    pub module: Box<str>,
    pub name: Box<str>,
    pub kind: ImportKind,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "archive", derive(serde::Serialize, serde::Deserialize))]
pub enum ImportKind {
    Function(TypeAddr),
    Table(TableType),
    Memory(MemoryType),
    Global(GlobalType),
}

impl From<&ImportKind> for ExternalKind {
    fn from(kind: &ImportKind) -> Self {
        match kind {
            ImportKind::Function(_) => Self::Func,
            ImportKind::Table(_) => Self::Table,
            ImportKind::Memory(_) => Self::Memory,
            ImportKind::Global(_) => Self::Global,
        }
    }
}

/// An active element segment, initializing a table range with function indices.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "archive", derive(serde::Serialize, serde::Deserialize))]
pub struct Element {
    pub table: TableAddr,
    pub offset: ConstInstruction,
    pub funcs: Box<[FuncAddr]>,
}

/// An active data segment, initializing a range of linear memory.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "archive", derive(serde::Serialize, serde::Deserialize))]
pub struct Data {
    pub mem: MemAddr,
    pub offset: ConstInstruction,
    pub data: Box<[u8]>,
}

/// Debug names taken from the `name` custom section.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "archive", derive(serde::Serialize, serde::Deserialize))]
pub struct Names {
    pub module: Option<Box<str>>,
    pub funcs: BTreeMap<FuncAddr, Box<str>>,
    pub locals: BTreeMap<FuncAddr, BTreeMap<LocalAddr, Box<str>>>,
}
