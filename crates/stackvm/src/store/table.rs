use alloc::{vec, vec::Vec};
use stackvm_types::{FuncAddr, TableType};

use crate::{Error, Result, Trap};

/// A table of function references
///
/// Entries hold indices into the function index space of the module that uses the table.
///
/// See <https://webassembly.github.io/spec/core/exec/runtime.html#table-instances>
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableInstance {
    elements: Vec<Option<FuncAddr>>,
    ty: TableType,
}

impl TableInstance {
    /// A table of `ty.size_initial` uninitialized entries.
    pub fn new(ty: TableType) -> Self {
        Self { elements: vec![None; ty.size_initial as usize], ty }
    }

    pub fn ty(&self) -> TableType {
        self.ty
    }

    pub fn size(&self) -> usize {
        self.elements.len()
    }

    /// Whether this table can stand in for an import declared as `declared`.
    pub fn satisfies(&self, declared: &TableType) -> bool {
        self.elements.len() >= declared.size_initial as usize
            && match declared.size_max {
                Some(max) => self.ty.size_max.is_some_and(|own| own <= max),
                None => true,
            }
    }

    #[inline(never)]
    #[cold]
    fn trap_oob(&self, addr: usize, len: usize) -> Error {
        Error::Trap(Trap::TableOutOfBounds { offset: addr, len, max: self.elements.len() })
    }

    /// Resolve the function stored at `index` for an indirect call.
    pub fn get(&self, index: u32) -> Result<FuncAddr> {
        match self.elements.get(index as usize) {
            None => Err(Trap::UndefinedElement { index: index as usize }.into()),
            Some(None) => Err(Trap::UninitializedElement { index: index as usize }.into()),
            Some(Some(func)) => Ok(*func),
        }
    }

    pub fn set(&mut self, index: u32, func: Option<FuncAddr>) -> Result<()> {
        let len = self.elements.len();
        let slot = self.elements.get_mut(index as usize).ok_or(Trap::TableOutOfBounds {
            offset: index as usize,
            len: 1,
            max: len,
        })?;
        *slot = func;
        Ok(())
    }

    /// Copy an element segment into the table starting at `offset`.
    pub(crate) fn init(&mut self, offset: usize, funcs: &[FuncAddr]) -> Result<()> {
        let end = offset.checked_add(funcs.len()).ok_or_else(|| self.trap_oob(offset, funcs.len()))?;
        if end > self.elements.len() {
            return Err(self.trap_oob(offset, funcs.len()));
        }

        for (slot, func) in self.elements[offset..end].iter_mut().zip(funcs) {
            *slot = Some(*func);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookups_distinguish_missing_and_empty() {
        let mut table = TableInstance::new(TableType::new(3, None));
        table.init(1, &[7]).unwrap();

        assert_eq!(table.get(1).unwrap(), 7);
        assert!(matches!(table.get(0), Err(Error::Trap(Trap::UninitializedElement { index: 0 }))));
        assert!(matches!(table.get(3), Err(Error::Trap(Trap::UndefinedElement { index: 3 }))));
    }

    #[test]
    fn segments_must_fit() {
        let mut table = TableInstance::new(TableType::new(2, Some(2)));
        assert!(matches!(table.init(1, &[1, 2]), Err(Error::Trap(Trap::TableOutOfBounds { .. }))));
        assert!(table.get(1).is_err());
        table.set(1, Some(4)).unwrap();
        assert_eq!(table.get(1).unwrap(), 4);
        assert!(table.set(2, None).is_err());
    }
}
