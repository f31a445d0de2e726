//! Runtime storage owned by an execution context: linear memory, table and globals.

use alloc::{format, vec::Vec};
use stackvm_types::{GlobalAddr, Module, WasmValue};

use crate::{Error, ImportResolver, Result};

mod global;
mod memory;
mod table;

pub(crate) use global::GlobalInstance;
pub(crate) use memory::effective_addr;
pub use memory::MemoryInstance;
pub use table::TableInstance;

/// The mutable state of one module instance.
///
/// Imported memories and tables are owned here once resolved; imported globals stay with
/// the resolver and are read and written through it.
#[derive(Debug, Default)]
pub(crate) struct Store {
    pub(crate) memory: Option<MemoryInstance>,
    pub(crate) table: Option<TableInstance>,
    /// Module-defined globals, following the imported ones in the index space
    pub(crate) globals: Vec<GlobalInstance>,
}

impl Store {
    pub(crate) fn memory(&self) -> Result<&MemoryInstance> {
        self.memory.as_ref().ok_or_else(|| Error::Other("module has no memory".into()))
    }

    pub(crate) fn memory_mut(&mut self) -> Result<&mut MemoryInstance> {
        self.memory.as_mut().ok_or_else(|| Error::Other("module has no memory".into()))
    }

    pub(crate) fn table(&self) -> Result<&TableInstance> {
        self.table.as_ref().ok_or_else(|| Error::Other("module has no table".into()))
    }

    pub(crate) fn table_mut(&mut self) -> Result<&mut TableInstance> {
        self.table.as_mut().ok_or_else(|| Error::Other("module has no table".into()))
    }

    pub(crate) fn global_get(&self, module: &Module, resolver: &impl ImportResolver, index: GlobalAddr) -> Result<WasmValue> {
        let imported = module.imported_global_count();
        if (index as usize) < imported {
            let Some((import, ty)) = module.imported_globals().nth(index as usize) else {
                return Err(unknown_global(index));
            };
            return resolver.get_global(&import.module, &import.name, ty);
        }

        self.globals.get(index as usize - imported).map(|global| global.value).ok_or_else(|| unknown_global(index))
    }

    pub(crate) fn global_set(
        &mut self,
        module: &Module,
        resolver: &mut impl ImportResolver,
        index: GlobalAddr,
        value: WasmValue,
    ) -> Result<()> {
        let imported = module.imported_global_count();
        if (index as usize) < imported {
            let Some((import, ty)) = module.imported_globals().nth(index as usize) else {
                return Err(unknown_global(index));
            };
            return resolver.set_global(&import.module, &import.name, ty, value);
        }

        let global = self.globals.get_mut(index as usize - imported).ok_or_else(|| unknown_global(index))?;
        if !global.ty.mutable || global.ty.ty != value.val_type() {
            return Err(Error::Other(format!("cannot set global {index} to {value:?}")));
        }
        global.value = value;
        Ok(())
    }
}

fn unknown_global(index: GlobalAddr) -> Error {
    Error::Other(format!("unknown global {index}"))
}
