use alloc::{format, vec::Vec};
use stackvm_types::{
    ConstInstruction, ExternalKind, FuncAddr, FuncRef, GlobalAddr, ImportKind, Module, WasmValue,
};

use super::interpreter::{Interpreter, Step};
use super::stack::{CallFrame, CallStack};
use crate::store::{GlobalInstance, Store};
use crate::{
    BlockMap, Config, Error, FromWasmValueTuple, ImportResolver, Imports, IntoWasmValueTuple, MemoryInstance, Result,
    TableInstance, log, validate,
};

/// An instantiated module together with everything needed to run it.
///
/// The context owns the module's memory, table and module-defined globals, plus an
/// explicit stack of call frames. Imported functions and globals are reached through the
/// [`ImportResolver`] `R`.
///
/// An invocation either runs to completion with [`ExecutionContext::execute`] or is driven
/// one instruction at a time:
///
/// ```rust
/// use stackvm::{Config, ExecutionContext, Imports, Module, ModuleExt, Step, WasmValue};
///
/// let wasm = wat::parse_str("(module (func (export \"seven\") (result i32) i32.const 3 i32.const 4 i32.add))")?;
/// let mut ctx = ExecutionContext::new(Module::parse_bytes(&wasm)?, Imports::new(), Config::default())?;
///
/// ctx.invoke(ctx.exported_func("seven")?, &[])?;
/// ctx.step()?;
/// assert_eq!(ctx.operand_stack(), Some(&[WasmValue::I32(3)][..]));
///
/// let result = loop {
///     if let Step::Returned(result) = ctx.step()? {
///         break result;
///     }
/// };
/// assert_eq!(result, Some(WasmValue::I32(7)));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct ExecutionContext<R: ImportResolver = Imports> {
    module: Module,
    resolver: R,
    config: Config,
    store: Store,
    /// One per module-defined function
    block_maps: Vec<BlockMap>,
    call_stack: CallStack,
    /// Result of an imported function entered directly, handed out by the next step
    pending: Option<Option<WasmValue>>,
}

impl<R: ImportResolver> ExecutionContext<R> {
    /// Instantiate `module`.
    ///
    /// Resolves imported memories and tables, allocates the module's own, evaluates global
    /// initializers and copies data and element segments. With the default [`Config`] every
    /// function body is then strictly validated and the start function, if any, is run.
    pub fn new(module: Module, resolver: R, config: Config) -> Result<Self> {
        let mut store = Store::default();

        for import in module.imports.iter() {
            match &import.kind {
                ImportKind::Memory(ty) => store.memory = Some(resolver.get_memory(&import.module, &import.name, ty)?),
                ImportKind::Table(ty) => store.table = Some(resolver.get_table(&import.module, &import.name, ty)?),
                _ => {}
            }
        }

        if store.memory.is_none() {
            store.memory = module.memories.first().map(|ty| MemoryInstance::new(*ty, config.default_max_memory_pages()));
        }
        if store.table.is_none() {
            store.table = module.tables.first().map(|ty| TableInstance::new(*ty));
        }

        for global in module.globals.iter() {
            let value = eval_const(&module, &store, &resolver, &global.init)?;
            if value.val_type() != global.ty.ty {
                return Err(Error::Other(format!("global initializer {value:?} does not match {:?}", global.ty)));
            }
            store.globals.push(GlobalInstance::new(global.ty, value));
        }

        for segment in module.data.iter() {
            let offset = eval_offset(&module, &store, &resolver, &segment.offset)?;
            store.memory_mut()?.store(offset, &segment.data)?;
        }

        for segment in module.elements.iter() {
            let offset = eval_offset(&module, &store, &resolver, &segment.offset)?;
            store.table_mut()?.init(offset, &segment.funcs)?;
        }

        let imported = module.imported_func_count();
        let block_maps = module
            .funcs
            .iter()
            .enumerate()
            .map(|(i, func)| BlockMap::resolve(&func.instructions).map_err(|e| e.in_func((imported + i) as FuncAddr)))
            .collect::<Result<Vec<_>, _>>()?;

        if config.validate_before_run() {
            for func in imported..imported + module.funcs.len() {
                validate(&module, func as FuncAddr, true)?;
            }
        }

        log::debug!(
            "instantiated module: {} funcs, {} globals, {:?} memory pages, {:?} table entries",
            imported + module.funcs.len(),
            module.imported_global_count() + store.globals.len(),
            store.memory.as_ref().map(|m| m.page_count()),
            store.table.as_ref().map(|t| t.size()),
        );

        let start = module.start_func;
        let mut ctx = Self {
            module,
            resolver,
            config,
            store,
            block_maps,
            call_stack: CallStack::new(config.max_call_depth()),
            pending: None,
        };

        if let Some(start) = start.filter(|_| config.run_start()) {
            log::debug!("running start function {start}");
            ctx.execute(start, &[])?;
        }

        Ok(ctx)
    }

    /// Index of the exported function `name`.
    pub fn exported_func(&self, name: &str) -> Result<FuncAddr> {
        self.module
            .export(name, ExternalKind::Func)
            .map(|export| export.index)
            .ok_or_else(|| Error::Other(format!("no exported function named {name}")))
    }

    /// Call the exported function `name` and run it to completion.
    pub fn call(&mut self, name: &str, args: &[WasmValue]) -> Result<Option<WasmValue>> {
        let func = self.exported_func(name)?;
        self.execute(func, args)
    }

    /// Call the exported function `name` with Rust-typed parameters and result.
    pub fn call_typed<P: IntoWasmValueTuple, T: FromWasmValueTuple>(&mut self, name: &str, params: P) -> Result<T> {
        let result = self.call(name, &params.into_wasm_value_tuple())?;
        T::from_wasm_value_tuple(result.into_iter().collect())
    }

    /// Run the function at `func` (combined function index space) to completion.
    ///
    /// A trap aborts the invocation and is returned; the context can be invoked again.
    pub fn execute(&mut self, func: FuncAddr, args: &[WasmValue]) -> Result<Option<WasmValue>> {
        self.invoke(func, args)?;
        loop {
            if let Step::Returned(result) = self.step()? {
                return Ok(result);
            }
        }
    }

    /// Start an invocation without running any instruction.
    ///
    /// Any invocation still in progress is abandoned. `args` must match the callee's
    /// parameters exactly. An imported function is called right away; its result is
    /// reported by the next [`step`](Self::step).
    pub fn invoke(&mut self, func: FuncAddr, args: &[WasmValue]) -> Result<()> {
        self.call_stack.clear();
        self.pending = None;

        let ty = self.module.func_type_at(func).ok_or_else(|| Error::Other(format!("unknown function {func}")))?;
        if args.len() != ty.params.len() || args.iter().zip(ty.params.iter()).any(|(arg, ty)| arg.val_type() != *ty) {
            return Err(Error::InvalidArguments(format!("function {func} has type {ty}, got {args:?}")));
        }

        match self.module.func_at(func) {
            Some(FuncRef::Imported(import, _)) => {
                log::debug!("> host call {}.{}", import.module, import.name);
                let result = self.resolver.invoke_function(&import.module, &import.name, ty, args)?;
                if result.map(|value| value.val_type()) != ty.result {
                    return Err(Error::InvalidCallResult { expected: ty.result, actual: result });
                }
                self.pending = Some(result);
            }
            Some(FuncRef::Defined(function)) => {
                let body = func as usize - self.module.imported_func_count();
                log::debug!("> enter func {func} {}", self.module.func_name(func).unwrap_or(""));
                self.call_stack.push(CallFrame::new(func, body, args.iter().copied(), &function.locals, ty.result))?;
            }
            None => return Err(Error::Other(format!("unknown function {func}"))),
        }

        Ok(())
    }

    /// Retire one instruction of the current invocation.
    ///
    /// On error the invocation is abandoned.
    pub fn step(&mut self) -> Result<Step> {
        if let Some(result) = self.pending.take() {
            return Ok(Step::Returned(result));
        }
        if self.call_stack.is_empty() {
            return Err(Error::Other("no invocation in progress".into()));
        }

        let mut interpreter = Interpreter {
            module: &self.module,
            block_maps: &self.block_maps,
            store: &mut self.store,
            resolver: &mut self.resolver,
            call_stack: &mut self.call_stack,
        };

        let step = interpreter.step();
        if step.is_err() {
            log::debug!("invocation aborted at call depth {}", self.call_stack.len());
            self.call_stack.clear();
        }
        step
    }

    /// The operand stack of the innermost active frame.
    pub fn operand_stack(&self) -> Option<&[WasmValue]> {
        self.call_stack.top().map(|frame| frame.values.as_slice())
    }

    /// Number of active call frames.
    pub fn call_depth(&self) -> usize {
        self.call_stack.len()
    }

    /// Read a global of the combined (imported, then module-defined) index space.
    pub fn global_get(&self, index: GlobalAddr) -> Result<WasmValue> {
        self.store.global_get(&self.module, &self.resolver, index)
    }

    /// Read the exported global `name`.
    pub fn exported_global(&self, name: &str) -> Result<WasmValue> {
        let export = self
            .module
            .export(name, ExternalKind::Global)
            .ok_or_else(|| Error::Other(format!("no exported global named {name}")))?;
        self.global_get(export.index)
    }

    pub fn memory(&self) -> Option<&MemoryInstance> {
        self.store.memory.as_ref()
    }

    pub fn memory_mut(&mut self) -> Option<&mut MemoryInstance> {
        self.store.memory.as_mut()
    }

    pub fn table(&self) -> Option<&TableInstance> {
        self.store.table.as_ref()
    }

    pub fn module(&self) -> &Module {
        &self.module
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    pub fn resolver_mut(&mut self) -> &mut R {
        &mut self.resolver
    }
}

fn eval_const(module: &Module, store: &Store, resolver: &impl ImportResolver, init: &ConstInstruction) -> Result<WasmValue> {
    Ok(match init {
        ConstInstruction::I32Const(v) => WasmValue::I32(*v),
        ConstInstruction::I64Const(v) => WasmValue::I64(*v),
        ConstInstruction::F32Const(v) => WasmValue::F32(*v),
        ConstInstruction::F64Const(v) => WasmValue::F64(*v),
        ConstInstruction::GlobalGet(index) => store.global_get(module, resolver, *index)?,
    })
}

// segment offsets are i32 constants, read as unsigned
fn eval_offset(module: &Module, store: &Store, resolver: &impl ImportResolver, init: &ConstInstruction) -> Result<usize> {
    match eval_const(module, store, resolver, init)? {
        WasmValue::I32(offset) => Ok(offset as u32 as usize),
        other => Err(Error::Other(format!("segment offset must be i32, got {other:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Extern, Trap, ValidationErrorKind};
    use alloc::{boxed::Box, vec};
    use stackvm_types::{
        BlockArgs, Data, Element, Export, FuncType, Function, Import, Instruction, MemoryType, TableType, ValType,
    };

    fn func(ty: u32, locals: &[ValType], instructions: Vec<Instruction>) -> Function {
        Function { ty, locals: locals.into(), instructions: instructions.into_boxed_slice() }
    }

    fn export(name: &str, index: u32) -> Export {
        Export { name: name.into(), kind: ExternalKind::Func, index }
    }

    fn single(instructions: Vec<Instruction>, result: Option<ValType>) -> Module {
        Module {
            func_types: vec![FuncType::new(&[], result)].into(),
            funcs: vec![func(0, &[], instructions)].into(),
            memories: vec![MemoryType::new(1, Some(2))].into(),
            exports: vec![export("main", 0)].into(),
            ..Default::default()
        }
    }

    fn run(module: Module) -> Result<Option<WasmValue>> {
        ExecutionContext::new(module, Imports::new(), Config::default())?.call("main", &[])
    }

    #[test]
    fn end_to_end_scenarios() {
        use Instruction::*;

        let sum = single(vec![I32Const(3), I32Const(4), I32Add, End], Some(ValType::I32));
        assert_eq!(run(sum).unwrap(), Some(WasmValue::I32(7)));

        let div = single(vec![I32Const(10), I32Const(0), I32DivS, End], Some(ValType::I32));
        assert!(matches!(run(div), Err(Error::Trap(Trap::DivisionByZero))));

        let roundtrip = single(
            vec![
                I32Const(0),
                I32Const(42),
                I32Store(Default::default()),
                I32Const(0),
                I32Load(Default::default()),
                End,
            ],
            Some(ValType::I32),
        );
        assert_eq!(run(roundtrip).unwrap(), Some(WasmValue::I32(42)));
    }

    #[test]
    fn branches_keep_block_results() {
        use Instruction::*;

        // (block (result i32) i32.const 1 i32.const 2 br 0) i32.const 10 i32.add
        let body = vec![
            Block(BlockArgs::Type(ValType::I32)),
            I32Const(1),
            I32Const(2),
            Br(0),
            End,
            I32Const(10),
            I32Add,
            End,
        ];
        assert_eq!(run(single(body, Some(ValType::I32))).unwrap(), Some(WasmValue::I32(12)));
    }

    #[test]
    fn loops_count_down() {
        use Instruction::*;

        // local 0 = 5; loop { local 1 += local 0; local 0 -= 1; br_if 0 (local 0) }; local 1
        let body = vec![
            I32Const(5),
            LocalSet(0),
            Loop(BlockArgs::Empty),
            LocalGet(1),
            LocalGet(0),
            I32Add,
            LocalSet(1),
            LocalGet(0),
            I32Const(1),
            I32Sub,
            LocalTee(0),
            BrIf(0),
            End,
            LocalGet(1),
            End,
        ];
        let module = Module {
            funcs: vec![func(0, &[ValType::I32, ValType::I32], body)].into(),
            ..single(vec![], Some(ValType::I32))
        };
        assert_eq!(run(module).unwrap(), Some(WasmValue::I32(15)));
    }

    #[test]
    fn if_without_else_skips_the_arm() {
        use Instruction::*;

        let body = vec![I32Const(0), If(BlockArgs::Empty), Unreachable, End, I32Const(1), End];
        assert_eq!(run(single(body, Some(ValType::I32))).unwrap(), Some(WasmValue::I32(1)));

        let body = vec![
            I32Const(0),
            If(BlockArgs::Type(ValType::I32)),
            I32Const(1),
            Else,
            I32Const(2),
            End,
            End,
        ];
        assert_eq!(run(single(body, Some(ValType::I32))).unwrap(), Some(WasmValue::I32(2)));
    }

    #[test]
    fn segments_and_globals_are_initialized() {
        use Instruction::*;

        let module = Module {
            func_types: vec![FuncType::new(&[], Some(ValType::I32))].into(),
            imports: vec![Import {
                module: "env".into(),
                name: "base".into(),
                kind: ImportKind::Global(stackvm_types::GlobalType::new(ValType::I32, false)),
            }]
            .into(),
            funcs: vec![func(0, &[], vec![I32Const(0), I32Load8U(Default::default()), End])].into(),
            memories: vec![MemoryType::new(1, None)].into(),
            tables: vec![TableType::new(4, None)].into(),
            data: vec![Data { mem: 0, offset: ConstInstruction::GlobalGet(0), data: Box::new([9, 8]) }].into(),
            elements: vec![Element { table: 0, offset: ConstInstruction::I32Const(3), funcs: Box::new([0]) }].into(),
            exports: vec![export("main", 0)].into(),
            ..Default::default()
        };

        let mut imports = Imports::new();
        imports.define("env", "base", Extern::global(WasmValue::I32(0), false)).unwrap();
        let mut ctx = ExecutionContext::new(module.clone(), imports, Config::default()).unwrap();
        assert_eq!(ctx.call("main", &[]).unwrap(), Some(WasmValue::I32(9)));
        assert_eq!(ctx.table().unwrap().get(3).unwrap(), 0);
        assert_eq!(ctx.memory().unwrap().load(0, 2).unwrap(), &[9, 8]);

        // a data segment past the end of memory fails instantiation
        let mut imports = Imports::new();
        imports.define("env", "base", Extern::global(WasmValue::I32(65535), false)).unwrap();
        let err = ExecutionContext::new(module, imports, Config::default()).unwrap_err();
        assert!(matches!(err, Error::Trap(Trap::MemoryOutOfBounds { .. })));
    }

    #[test]
    fn invalid_bodies_are_rejected_before_running() {
        use Instruction::*;

        let module = single(vec![I32Add, End], Some(ValType::I32));
        match ExecutionContext::new(module, Imports::new(), Config::default()) {
            Err(Error::Validation(err)) => {
                assert_eq!(err.func, Some(0));
                assert_eq!(err.instr_index, Some(0));
                assert!(matches!(err.kind, ValidationErrorKind::StackUnderflow { .. }));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn arguments_are_checked() {
        use Instruction::*;

        let module = Module {
            func_types: vec![FuncType::new(&[ValType::I64], Some(ValType::I64))].into(),
            funcs: vec![func(0, &[], vec![LocalGet(0), End])].into(),
            exports: vec![export("id", 0)].into(),
            ..Default::default()
        };
        let mut ctx = ExecutionContext::new(module, Imports::new(), Config::default()).unwrap();

        assert!(matches!(ctx.call("id", &[]), Err(Error::InvalidArguments(_))));
        assert!(matches!(ctx.call("id", &[WasmValue::I32(1)]), Err(Error::InvalidArguments(_))));
        assert_eq!(ctx.call_typed::<i64, i64>("id", 5).unwrap(), 5);
        assert!(ctx.exported_func("missing").is_err());
    }

    #[test]
    fn residual_values_trap_on_return() {
        use Instruction::*;

        // callee leaves an extra value under its result; only checked with validation off
        let module = Module {
            func_types: vec![FuncType::new(&[], Some(ValType::I32))].into(),
            funcs: vec![
                func(0, &[], vec![Call(1), End]),
                func(0, &[], vec![I32Const(1), I32Const(2), End]),
            ]
            .into(),
            exports: vec![export("main", 0)].into(),
            ..Default::default()
        };
        let config = Config::new().with_validate_before_run(false);
        let mut ctx = ExecutionContext::new(module, Imports::new(), config).unwrap();
        let err = ctx.call("main", &[]).unwrap_err();
        assert!(matches!(err, Error::Trap(Trap::ResidualStack { func: 1, count: 1 })));
        assert_eq!(ctx.call_depth(), 0);
    }
}
