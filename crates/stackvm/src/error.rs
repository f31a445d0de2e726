use alloc::string::{String, ToString};
use core::fmt::Display;
use stackvm_types::{FuncAddr, FuncType, ValType, WasmValue};

#[cfg(feature = "parser")]
pub use stackvm_parser::ParseError;

/// Errors that can occur for `stackvm` operations
#[derive(Debug)]
pub enum Error {
    /// A WebAssembly trap occurred
    Trap(Trap),

    /// A linking error occurred
    Linker(LinkingError),

    /// A function body failed strict validation
    Validation(ValidationError),

    /// A host function returned a value that disagrees with its declared result type
    InvalidCallResult {
        /// The declared result type
        expected: Option<ValType>,
        /// The value actually returned
        actual: Option<WasmValue>,
    },

    /// The arguments passed to an entry point do not match its parameters
    InvalidArguments(String),

    /// A function did not return a value
    FuncDidNotReturn,

    /// An unknown error occurred
    Other(String),

    #[cfg(feature = "std")]
    /// An I/O error occurred
    Io(crate::std::io::Error),

    #[cfg(feature = "parser")]
    /// A parsing error occurred
    ParseError(ParseError),
}

#[derive(Debug)]
/// Errors that can occur when linking a WebAssembly module
pub enum LinkingError {
    /// An unknown import was encountered
    UnknownImport {
        /// The module name
        module: String,
        /// The import name
        name: String,
    },

    /// A mismatched import type was encountered
    IncompatibleImportType {
        /// The module name
        module: String,
        /// The import name
        name: String,
    },
}

impl LinkingError {
    pub(crate) fn incompatible_import_type(module: &str, name: &str) -> Self {
        Self::IncompatibleImportType { module: module.to_string(), name: name.to_string() }
    }

    pub(crate) fn unknown_import(module: &str, name: &str) -> Self {
        Self::UnknownImport { module: module.to_string(), name: name.to_string() }
    }

    /// Get the message of the linking error
    pub fn message(&self) -> &'static str {
        match self {
            Self::UnknownImport { .. } => "unknown import",
            Self::IncompatibleImportType { .. } => "incompatible import type",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
/// A WebAssembly trap
///
/// Traps abort the current invocation; the execution context can be invoked again afterwards.
///
/// See <https://webassembly.github.io/spec/core/intro/overview.html#trap>
pub enum Trap {
    /// An unreachable instruction was executed
    Unreachable,

    /// An out-of-bounds memory access occurred
    MemoryOutOfBounds {
        /// The offset of the access
        offset: usize,
        /// The size of the access
        len: usize,
        /// The maximum size of the memory
        max: usize,
    },

    /// An out-of-bounds table access occurred
    TableOutOfBounds {
        /// The offset of the access
        offset: usize,
        /// The size of the access
        len: usize,
        /// The maximum size of the table
        max: usize,
    },

    /// A division by zero occurred
    DivisionByZero,

    /// Invalid Integer Conversion
    InvalidConversionToInt,

    /// Integer Overflow
    IntegerOverflow,

    /// Call stack overflow
    CallStackOverflow,

    /// An undefined element was encountered
    UndefinedElement {
        /// The element index
        index: usize,
    },

    /// An uninitialized element was encountered
    UninitializedElement {
        /// The element index
        index: usize,
    },

    /// Indirect call type mismatch
    IndirectCallTypeMismatch {
        /// The expected type
        expected: FuncType,
        /// The actual type
        actual: FuncType,
    },

    /// A function returned with values left on its operand stack
    ResidualStack {
        /// The function that returned
        func: FuncAddr,
        /// Number of values beyond the declared result
        count: usize,
    },
}

impl Trap {
    /// Get the message of the trap
    pub fn message(&self) -> &'static str {
        match self {
            Self::Unreachable => "unreachable",
            Self::MemoryOutOfBounds { .. } => "out of bounds memory access",
            Self::TableOutOfBounds { .. } => "out of bounds table access",
            Self::DivisionByZero => "integer divide by zero",
            Self::InvalidConversionToInt => "invalid conversion to integer",
            Self::IntegerOverflow => "integer overflow",
            Self::CallStackOverflow => "call stack exhausted",
            Self::UndefinedElement { .. } => "undefined element",
            Self::UninitializedElement { .. } => "uninitialized element",
            Self::IndirectCallTypeMismatch { .. } => "indirect call type mismatch",
            Self::ResidualStack { .. } => "residual values on operand stack",
        }
    }
}

/// A strict validation failure, pointing at the offending instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// The function being validated, in the combined function index space
    pub func: Option<FuncAddr>,
    /// Position of the offending instruction in the function body
    pub instr_index: Option<usize>,
    /// What went wrong
    pub kind: ValidationErrorKind,
}

/// The reason a function body failed validation
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationErrorKind {
    UnknownType(u32),
    UnknownFunc(u32),
    UnknownGlobal(u32),
    UnknownLocal(u32),
    UnknownTable(u32),
    UnknownMemory(u32),
    /// Popped from an empty stack (or below the enclosing block's entry height)
    StackUnderflow { expected: Option<ValType> },
    TypeMismatch { expected: ValType, actual: ValType },
    /// A block, if-arm or function body left the wrong values on the stack
    BlockSignatureMismatch { expected: alloc::vec::Vec<ValType>, actual: alloc::vec::Vec<ValType> },
    UnbalancedBlocks,
    ElseWithoutIf,
    InvalidBranchDepth(u32),
    ImmutableGlobal(u32),
}

impl ValidationError {
    pub(crate) fn new(kind: ValidationErrorKind) -> Self {
        Self { func: None, instr_index: None, kind }
    }

    pub(crate) fn at(instr_index: usize, kind: ValidationErrorKind) -> Self {
        Self { func: None, instr_index: Some(instr_index), kind }
    }

    pub(crate) fn in_func(mut self, func: FuncAddr) -> Self {
        self.func = Some(func);
        self
    }
}

impl From<LinkingError> for Error {
    fn from(value: LinkingError) -> Self {
        Self::Linker(value)
    }
}

impl From<Trap> for Error {
    fn from(value: Trap) -> Self {
        Self::Trap(value)
    }
}

impl From<ValidationError> for Error {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            #[cfg(feature = "parser")]
            Self::ParseError(err) => write!(f, "error parsing module: {err}"),

            #[cfg(feature = "std")]
            Self::Io(err) => write!(f, "I/O error: {err}"),

            Self::Trap(trap) => write!(f, "trap: {trap}"),
            Self::Linker(err) => write!(f, "linking error: {err}"),
            Self::Validation(err) => write!(f, "validation error: {err}"),
            Self::InvalidCallResult { expected, actual } => {
                write!(f, "invalid call result: expected {expected:?}, got {actual:?}")
            }
            Self::InvalidArguments(message) => write!(f, "invalid arguments: {message}"),
            Self::Other(message) => write!(f, "unknown error: {message}"),
            Self::FuncDidNotReturn => write!(f, "function did not return"),
        }
    }
}

impl Display for LinkingError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::UnknownImport { module, name } => write!(f, "unknown import: {module}.{name}"),
            Self::IncompatibleImportType { module, name } => {
                write!(f, "incompatible import type: {module}.{name}")
            }
        }
    }
}

impl Display for Trap {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Unreachable => write!(f, "unreachable"),
            Self::MemoryOutOfBounds { offset, len, max } => {
                write!(f, "out of bounds memory access: offset={offset}, len={len}, max={max}")
            }
            Self::TableOutOfBounds { offset, len, max } => {
                write!(f, "out of bounds table access: offset={offset}, len={len}, max={max}")
            }
            Self::DivisionByZero => write!(f, "integer divide by zero"),
            Self::InvalidConversionToInt => write!(f, "invalid conversion to integer"),
            Self::IntegerOverflow => write!(f, "integer overflow"),
            Self::CallStackOverflow => write!(f, "call stack exhausted"),
            Self::UndefinedElement { index } => write!(f, "undefined element: index={index}"),
            Self::UninitializedElement { index } => {
                write!(f, "uninitialized element: index={index}")
            }
            Self::IndirectCallTypeMismatch { expected, actual } => {
                write!(f, "indirect call type mismatch: expected={expected}, actual={actual}")
            }
            Self::ResidualStack { func, count } => {
                write!(f, "function {func} returned with {count} residual values on its operand stack")
            }
        }
    }
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if let Some(func) = self.func {
            write!(f, "func {func}: ")?;
        }
        if let Some(index) = self.instr_index {
            write!(f, "instruction {index}: ")?;
        }
        write!(f, "{}", self.kind)
    }
}

impl Display for ValidationErrorKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::UnknownType(idx) => write!(f, "unknown type {idx}"),
            Self::UnknownFunc(idx) => write!(f, "unknown function {idx}"),
            Self::UnknownGlobal(idx) => write!(f, "unknown global {idx}"),
            Self::UnknownLocal(idx) => write!(f, "unknown local {idx}"),
            Self::UnknownTable(idx) => write!(f, "unknown table {idx}"),
            Self::UnknownMemory(idx) => write!(f, "unknown memory {idx}"),
            Self::StackUnderflow { expected: Some(ty) } => write!(f, "operand stack underflow, expected {ty}"),
            Self::StackUnderflow { expected: None } => write!(f, "operand stack underflow"),
            Self::TypeMismatch { expected, actual } => write!(f, "type mismatch: expected {expected}, found {actual}"),
            Self::BlockSignatureMismatch { expected, actual } => {
                write!(f, "block signature mismatch: expected {expected:?}, found {actual:?}")
            }
            Self::UnbalancedBlocks => write!(f, "unbalanced block markers"),
            Self::ElseWithoutIf => write!(f, "else without matching if"),
            Self::InvalidBranchDepth(depth) => write!(f, "invalid branch depth {depth}"),
            Self::ImmutableGlobal(idx) => write!(f, "global {idx} is immutable"),
        }
    }
}

impl core::error::Error for Error {}
impl core::error::Error for ValidationError {}

#[cfg(feature = "parser")]
impl From<stackvm_parser::ParseError> for Error {
    fn from(value: stackvm_parser::ParseError) -> Self {
        Self::ParseError(value)
    }
}

#[cfg(feature = "std")]
impl From<crate::std::io::Error> for Error {
    fn from(value: crate::std::io::Error) -> Self {
        Self::Io(value)
    }
}

/// A wrapper around [`core::result::Result`] for stackvm operations
pub type Result<T, E = Error> = crate::std::result::Result<T, E>;
