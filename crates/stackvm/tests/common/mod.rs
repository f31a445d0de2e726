#![allow(dead_code)]

use eyre::Result;
use stackvm::{Config, ExecutionContext, Imports, Module, ModuleExt};

pub fn parse(wat: &str) -> Result<Module> {
    let wasm = wat::parse_str(wat)?;
    Ok(Module::parse_bytes(&wasm)?)
}

pub fn instantiate(wat: &str) -> Result<ExecutionContext> {
    instantiate_with(wat, Imports::new(), Config::default())
}

pub fn instantiate_with(wat: &str, imports: Imports, config: Config) -> Result<ExecutionContext> {
    Ok(ExecutionContext::new(parse(wat)?, imports, config)?)
}
