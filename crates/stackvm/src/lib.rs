#![no_std]
#![doc(test(
    no_crate_inject,
    attr(deny(warnings, rust_2018_idioms), allow(dead_code, unused_assignments, unused_variables))
))]
#![warn(missing_debug_implementations, rust_2018_idioms, unreachable_pub)]
#![forbid(unsafe_code)]

//! A WebAssembly MVP stack-effect evaluator and interpreter.
//!
//! `stackvm` has two halves that agree, instruction by instruction, on the meaning of
//! every opcode:
//!
//! * the [stack-effect evaluator](validate) replays each instruction's static
//!   [`Signature`] over a symbolic [`TypeStack`], either strictly (for validation) or
//!   leniently (for analysis), and reports per-instruction stack deltas;
//! * the [`ExecutionContext`] interprets the same instructions against concrete values,
//!   with an explicit stack of call frames, a linear memory, globals and a table.
//!
//! Both consult the single signature table in [`stackvm_types`], and both use the
//! [`BlockMap`] control-flow resolver to find branch targets.
//!
//! ## Features
//! - **`std`**\
//!   Enables the use of `std` and `std::io` for parsing from files and streams. This is enabled by default.
//! - **`log`**\
//!   Enables logging using the `log` crate. This is enabled by default.
//! - **`parser`**\
//!   Enables the `stackvm-parser` crate. This is enabled by default.
//! - **`archive`**\
//!   Enables serializing lowered modules to a compact archive format.
//! - **`debug`**\
//!   Traces the full operand stack after every executed instruction.
//!
//! ## Getting Started
//!
//! ```rust
//! use stackvm::{Config, ExecutionContext, Imports, Module, ModuleExt};
//!
//! let wasm = wat::parse_str(r#"
//!     (module (func (export "add") (param i32 i32) (result i32)
//!         local.get 0 local.get 1 i32.add))
//! "#)?;
//! let module = Module::parse_bytes(&wasm)?;
//! let mut ctx = ExecutionContext::new(module, Imports::new(), Config::default())?;
//!
//! let sum: i32 = ctx.call_typed("add", (3, 4))?;
//! assert_eq!(sum, 7);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! Host functions, globals, memories and tables are provided through an
//! [`ImportResolver`]; [`Imports`] is a ready-made registry implementing it.

mod std;
extern crate alloc;

// log for logging (optional).
#[cfg(feature = "log")]
#[allow(clippy::single_component_path_imports, unused_imports)]
use log;

// noop fallback if logging is disabled.
#[cfg(not(feature = "log"))]
#[allow(unused_imports, unused_macros)]
pub(crate) mod log {
    macro_rules! debug    ( ($($tt:tt)*) => {{}} );
    macro_rules! info    ( ($($tt:tt)*) => {{}} );
    macro_rules! error    ( ($($tt:tt)*) => {{}} );
    macro_rules! trace    ( ($($tt:tt)*) => {{}} );
    pub(crate) use debug;
    pub(crate) use error;
    pub(crate) use info;
    pub(crate) use trace;
}

mod config;
mod control;
mod error;
mod func;
mod imports;
mod runtime;
mod store;
pub mod validate;

pub use config::Config;
pub use control::{BlockKind, BlockMap, Label};
pub use error::*;
pub use func::{FromWasmValueTuple, IntoWasmValueTuple, ValTypesFromTuple, WasmType};
pub use imports::{Extern, ExternName, HostFunction, ImportResolver, Imports};
pub use runtime::{ExecutionContext, Step};
pub use store::{MemoryInstance, TableInstance};
pub use validate::{FunctionEffects, InstrEffect, RelocatableRange, StackChange, TypeStack, validate};

/// Re-export of [`stackvm_parser`]. Requires `parser` feature.
#[cfg(feature = "parser")]
pub mod parser {
    pub use stackvm_parser::*;
}

/// Re-export of [`stackvm_types`].
pub mod types {
    pub use stackvm_types::*;
}

pub use stackvm_types::{FuncType, Instruction, Module, Signature, ValType, WasmValue};

/// Parse a module from bytes. Requires `parser` feature.
#[cfg(feature = "parser")]
pub trait ModuleExt: Sized {
    /// Parse and validate the binary format into a [`Module`].
    fn parse_bytes(wasm: &[u8]) -> Result<Self>;

    /// Parse a module from a file. Requires `parser` and `std` features.
    #[cfg(feature = "std")]
    fn parse_file(path: impl AsRef<crate::std::path::Path>) -> Result<Self>;
}

#[cfg(feature = "parser")]
impl ModuleExt for Module {
    fn parse_bytes(wasm: &[u8]) -> Result<Self> {
        Ok(stackvm_parser::Parser::new().parse_module_bytes(wasm)?)
    }

    #[cfg(feature = "std")]
    fn parse_file(path: impl AsRef<crate::std::path::Path>) -> Result<Self> {
        Ok(stackvm_parser::Parser::new().parse_module_file(path)?)
    }
}

#[inline]
#[cold]
pub(crate) const fn cold() {}

#[inline]
pub(crate) const fn unlikely(b: bool) -> bool {
    if b {
        cold();
    };
    b
}
