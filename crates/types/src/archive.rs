use alloc::vec::Vec;
use core::fmt::{Display, Formatter};

use crate::Module;

const SVMA_MAGIC_PREFIX: &[u8; 4] = b"SVMA";
const SVMA_VERSION: &[u8; 2] = b"01";
#[rustfmt::skip]
const SVMA_MAGIC: [u8; 16] = [SVMA_MAGIC_PREFIX[0], SVMA_MAGIC_PREFIX[1], SVMA_MAGIC_PREFIX[2], SVMA_MAGIC_PREFIX[3], SVMA_VERSION[0], SVMA_VERSION[1], 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];

fn validate_magic(bytes: &[u8]) -> Result<usize, ArchiveError> {
    if bytes.len() < SVMA_MAGIC.len() || &bytes[..SVMA_MAGIC_PREFIX.len()] != SVMA_MAGIC_PREFIX {
        return Err(ArchiveError::InvalidMagic);
    }
    if &bytes[SVMA_MAGIC_PREFIX.len()..SVMA_MAGIC_PREFIX.len() + SVMA_VERSION.len()] != SVMA_VERSION {
        return Err(ArchiveError::InvalidVersion);
    }
    if bytes[SVMA_MAGIC_PREFIX.len() + SVMA_VERSION.len()..SVMA_MAGIC.len()] != [0; 10] {
        return Err(ArchiveError::InvalidPadding);
    }

    Ok(SVMA_MAGIC.len())
}

#[derive(Debug)]
pub enum ArchiveError {
    InvalidMagic,
    InvalidVersion,
    InvalidPadding,
    InvalidArchive(postcard::Error),
}

impl Display for ArchiveError {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            ArchiveError::InvalidMagic => write!(f, "invalid module archive: invalid magic number"),
            ArchiveError::InvalidVersion => write!(f, "invalid module archive: invalid version"),
            ArchiveError::InvalidPadding => write!(f, "invalid module archive: invalid padding"),
            ArchiveError::InvalidArchive(e) => write!(f, "invalid module archive: {e}"),
        }
    }
}

impl core::error::Error for ArchiveError {}

impl Module {
    /// Restores a module from bytes produced by [`Module::to_archive`].
    pub fn from_archive(bytes: &[u8]) -> Result<Module, ArchiveError> {
        let len = validate_magic(bytes)?;
        postcard::from_bytes(&bytes[len..]).map_err(ArchiveError::InvalidArchive)
    }

    /// Serializes the module, prefixed by a 16-byte magic header.
    pub fn to_archive(&self) -> Result<Vec<u8>, ArchiveError> {
        let mut out = Vec::from(SVMA_MAGIC);
        let payload = postcard::to_allocvec(self).map_err(ArchiveError::InvalidArchive)?;
        out.extend_from_slice(&payload);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Function, FuncType, Instruction, MemoryArg, ValType};
    use alloc::vec;

    #[test]
    fn test_serialize() {
        let module = Module {
            func_types: vec![FuncType::new(&[ValType::I32], Some(ValType::I32))].into(),
            funcs: vec![Function {
                ty: 0,
                locals: vec![ValType::F64].into(),
                instructions: vec![
                    Instruction::LocalGet(0),
                    Instruction::I32Load16U(MemoryArg::new(8, 1)),
                    Instruction::BrTable(vec![0, 1].into(), 0),
                ]
                .into(),
            }]
            .into(),
            ..Default::default()
        };
        let bytes = module.to_archive().unwrap();
        assert_eq!(&bytes[..4], b"SVMA");
        assert_eq!(Module::from_archive(&bytes).unwrap(), module);
    }

    #[test]
    fn rejects_bad_headers() {
        let bytes = Module::default().to_archive().unwrap();

        let mut bad_magic = bytes.clone();
        bad_magic[0] = b'X';
        assert!(matches!(Module::from_archive(&bad_magic), Err(ArchiveError::InvalidMagic)));

        let mut bad_version = bytes.clone();
        bad_version[5] = b'9';
        assert!(matches!(Module::from_archive(&bad_version), Err(ArchiveError::InvalidVersion)));

        let mut bad_padding = bytes.clone();
        bad_padding[15] = 1;
        assert!(matches!(Module::from_archive(&bad_padding), Err(ArchiveError::InvalidPadding)));

        assert!(matches!(Module::from_archive(&bytes[..16]), Err(ArchiveError::InvalidArchive(_))));
    }
}
