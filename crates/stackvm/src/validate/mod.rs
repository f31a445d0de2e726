//! The stack-effect evaluator.
//!
//! [`validate`] replays the [`Signature`] of every instruction of a function body over a
//! symbolic [`TypeStack`] and records what each instruction popped and pushed. In strict
//! mode the first underflow, type mismatch, unknown index or malformed block is reported
//! as a [`ValidationError`]. In lenient mode nothing fails: the expected type stands in for
//! whatever could not be checked, and failed lookups make the stack unknown.

use alloc::{vec, vec::Vec};
use stackvm_types::{BlockArgs, FuncAddr, FuncRef, FuncType, Instruction, Module, Signature, ValType};

use crate::{BlockKind, BlockMap, Result, ValidationError, ValidationErrorKind, log};

mod relocate;
mod stack;

pub use relocate::RelocatableRange;
pub use stack::TypeStack;
use stack::Popped;

/// One pop or push performed by an instruction, in the order it happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackChange {
    /// A value was consumed; `None` if its type could not be determined
    Pop(Option<ValType>),
    /// A value was produced; `None` if its type could not be determined
    Push(Option<ValType>),
}

/// The evaluated effect of a single instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstrEffect {
    /// Pops and pushes of the instruction's signature, in order
    pub changes: Vec<StackChange>,
    /// Stack height before the instruction, `None` if the stack was unknown
    pub height_before: Option<usize>,
    /// Stack height after the instruction, `None` if the stack is unknown
    pub height_after: Option<usize>,
    /// Type on top of the stack after the instruction, if known
    pub top_after: Option<ValType>,
    /// Whether the instruction may be moved into a separate function
    pub relocatable: bool,
}

/// Per-instruction effects of one function body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionEffects {
    /// One entry per instruction, in body order
    pub effects: Vec<InstrEffect>,
    /// The largest known operand stack height reached
    pub max_height: usize,
}

/// Evaluate the body of the function at `func` (combined function index space).
///
/// Imported functions have no body and always fail with [`ValidationErrorKind::UnknownFunc`].
pub fn validate(module: &Module, func: FuncAddr, strict: bool) -> Result<FunctionEffects> {
    let unknown = || ValidationError::new(ValidationErrorKind::UnknownFunc(func)).in_func(func);
    let body = match module.func_at(func) {
        Some(FuncRef::Defined(body)) => body,
        _ => return Err(unknown().into()),
    };
    let ty = module.func_types.get(body.ty as usize).ok_or_else(|| {
        ValidationError::new(ValidationErrorKind::UnknownType(body.ty)).in_func(func)
    })?;

    log::debug!("evaluating func {func} ({} instructions, strict: {strict})", body.instructions.len());
    validate_body(module, ty, &body.locals, &body.instructions, strict).map_err(|e| match e {
        crate::Error::Validation(err) => err.in_func(func).into(),
        e => e,
    })
}

/// Evaluate an instruction sequence as the body of a function of type `ty` with the
/// declared `locals`, resolving calls, globals, tables and memories against `module`.
pub fn validate_body(
    module: &Module,
    ty: &FuncType,
    locals: &[ValType],
    instructions: &[Instruction],
    strict: bool,
) -> Result<FunctionEffects> {
    if strict {
        BlockMap::resolve(instructions)?;
    }

    let mut evaluator = Evaluator::new(module, ty, locals, strict);
    let mut effects = Vec::with_capacity(instructions.len());
    let mut finished = false;

    for (index, instr) in instructions.iter().enumerate() {
        let height_before = evaluator.stack.height();
        evaluator.changes.clear();

        if finished {
            // only reachable in lenient mode, the block map rejects trailing code
            evaluator.stack.mark_unknown();
        } else {
            finished = evaluator.step(instr).map_err(|kind| ValidationError::at(index, kind))?;
        }

        log::trace!("eval {index}: {instr:?} -> {:?}", evaluator.stack);
        effects.push(InstrEffect {
            changes: core::mem::take(&mut evaluator.changes),
            height_before,
            height_after: evaluator.stack.height(),
            top_after: evaluator.stack.as_slice().and_then(|s| s.last().copied()),
            relocatable: instr.is_relocatable(),
        });
    }

    if !finished {
        evaluator.end_function().map_err(ValidationError::new)?;
    }

    Ok(FunctionEffects { effects, max_height: evaluator.max_height })
}

#[derive(Debug)]
struct Frame {
    kind: BlockKind,
    args: BlockArgs,
    /// Stack at block entry
    entry: TypeStack,
    /// Underflow floor while the stack is known
    height: usize,
}

#[derive(Debug)]
struct Evaluator<'a> {
    module: &'a Module,
    ty: &'a FuncType,
    locals: &'a [ValType],
    strict: bool,
    stack: TypeStack,
    frames: Vec<Frame>,
    changes: Vec<StackChange>,
    max_height: usize,
}

type StepResult<T = ()> = core::result::Result<T, ValidationErrorKind>;

impl<'a> Evaluator<'a> {
    fn new(module: &'a Module, ty: &'a FuncType, locals: &'a [ValType], strict: bool) -> Self {
        let args = ty.result.map_or(BlockArgs::Empty, BlockArgs::Type);
        let function = Frame { kind: BlockKind::Block, args, entry: TypeStack::default(), height: 0 };
        Self {
            module,
            ty,
            locals,
            strict,
            stack: TypeStack::default(),
            frames: vec![function],
            changes: Vec::new(),
            max_height: 0,
        }
    }

    /// Fails in strict mode, otherwise gives up on tracking the stack.
    fn fail(&mut self, kind: ValidationErrorKind) -> StepResult {
        if self.strict {
            return Err(kind);
        }
        self.stack.mark_unknown();
        Ok(())
    }

    fn floor(&self) -> usize {
        match self.strict {
            true => self.frames.last().map_or(0, |f| f.height),
            false => 0,
        }
    }

    fn push(&mut self, ty: Option<ValType>) {
        if let Some(ty) = ty {
            self.stack.push(ty);
        }
        if let Some(height) = self.stack.height() {
            self.max_height = self.max_height.max(height);
        }
        self.changes.push(StackChange::Push(ty));
    }

    /// Pop one operand, checking it against `expected` when given.
    fn pop(&mut self, expected: Option<ValType>) -> StepResult<Option<ValType>> {
        let popped = match self.stack.pop(self.floor()) {
            Popped::Value(actual) => match expected {
                Some(expected) if expected != actual && self.strict => {
                    return Err(ValidationErrorKind::TypeMismatch { expected, actual });
                }
                Some(expected) => Some(expected),
                None => Some(actual),
            },
            Popped::Polymorphic => expected,
            Popped::Underflow if self.strict => return Err(ValidationErrorKind::StackUnderflow { expected }),
            Popped::Underflow => expected,
        };
        self.changes.push(StackChange::Pop(popped));
        Ok(popped)
    }

    fn local_type(&self, index: u32) -> Option<ValType> {
        let index = index as usize;
        match self.ty.params.get(index) {
            Some(ty) => Some(*ty),
            None => self.locals.get(index - self.ty.params.len()).copied(),
        }
    }

    /// Replay the effect of `instr`. Returns whether it closed the function body.
    fn step(&mut self, instr: &Instruction) -> StepResult<bool> {
        let module = self.module;
        if (instr.memory_arg().is_some() || matches!(instr, Instruction::MemorySize | Instruction::MemoryGrow))
            && module.memory_type_at(0).is_none()
        {
            self.fail(ValidationErrorKind::UnknownMemory(0))?;
        }

        match instr.signature() {
            Signature::Fixed { pops, push } => {
                for ty in pops {
                    self.pop(Some(*ty))?;
                }
                if let Some(ty) = push {
                    self.push(Some(ty));
                }
            }
            Signature::Call(func) => match module.func_type_at(func) {
                Some(ty) => self.call(ty)?,
                None => self.fail(ValidationErrorKind::UnknownFunc(func))?,
            },
            Signature::CallIndirect(ty) => {
                let table = match instr {
                    Instruction::CallIndirect(_, table) => *table,
                    _ => 0,
                };
                if module.table_type_at(table).is_none() {
                    self.fail(ValidationErrorKind::UnknownTable(table))?;
                }
                self.pop(Some(ValType::I32))?;
                match module.func_types.get(ty as usize) {
                    Some(ty) => self.call(ty)?,
                    None => self.fail(ValidationErrorKind::UnknownType(ty))?,
                }
            }
            Signature::Select => {
                self.pop(Some(ValType::I32))?;
                let first = self.pop(None)?;
                let second = self.pop(first)?;
                self.push(first.or(second));
            }
            Signature::Drop => {
                self.pop(None)?;
            }
            Signature::Return => {
                self.pop_result(self.ty.result)?;
                self.stack.mark_unknown();
            }
            Signature::LocalGet(idx) => match self.local_type(idx) {
                Some(ty) => self.push(Some(ty)),
                None => self.fail(ValidationErrorKind::UnknownLocal(idx))?,
            },
            Signature::LocalSet(idx) => match self.local_type(idx) {
                Some(ty) => {
                    self.pop(Some(ty))?;
                }
                None => self.fail(ValidationErrorKind::UnknownLocal(idx))?,
            },
            Signature::LocalTee(idx) => match self.local_type(idx) {
                Some(ty) => {
                    self.pop(Some(ty))?;
                    self.push(Some(ty));
                }
                None => self.fail(ValidationErrorKind::UnknownLocal(idx))?,
            },
            Signature::GlobalGet(idx) => match module.global_type_at(idx) {
                Some(global) => self.push(Some(global.ty)),
                None => self.fail(ValidationErrorKind::UnknownGlobal(idx))?,
            },
            Signature::GlobalSet(idx) => match module.global_type_at(idx).copied() {
                Some(global) if !global.mutable => self.fail(ValidationErrorKind::ImmutableGlobal(idx))?,
                Some(global) => {
                    self.pop(Some(global.ty))?;
                }
                None => self.fail(ValidationErrorKind::UnknownGlobal(idx))?,
            },
        }

        self.control(instr)
    }

    /// Pop a callee's params, last param first, then push its result.
    fn call(&mut self, ty: &FuncType) -> StepResult {
        for param in ty.params.iter().rev() {
            self.pop(Some(*param))?;
        }
        if let Some(result) = ty.result {
            self.push(Some(result));
        }
        Ok(())
    }

    fn pop_result(&mut self, result: Option<ValType>) -> StepResult {
        if let Some(ty) = result {
            self.pop(Some(ty))?;
        }
        Ok(())
    }

    /// Block bookkeeping after the signature-level effect has been applied.
    fn control(&mut self, instr: &Instruction) -> StepResult<bool> {
        match instr {
            Instruction::Block(args) => self.open(BlockKind::Block, *args),
            Instruction::Loop(args) => self.open(BlockKind::Loop, *args),
            Instruction::If(args) => self.open(BlockKind::If, *args),
            Instruction::Else => {
                let Some(frame) = self.frames.last() else { return Ok(false) };
                if frame.kind != BlockKind::If || self.frames.len() == 1 {
                    self.fail(ValidationErrorKind::ElseWithoutIf)?;
                    return Ok(false);
                }
                let from = self.stack.clone();
                self.check_block_result()?;
                if let Some(frame) = self.frames.last_mut() {
                    frame.kind = BlockKind::Else;
                    let (entry, base) = (frame.entry.clone(), frame.height);
                    self.collapse(&from, entry, base);
                }
            }
            Instruction::End => {
                if self.frames.len() == 1 {
                    self.end_function()?;
                    return Ok(true);
                }
                let from = self.stack.clone();
                self.check_block_result()?;
                if let Some(frame) = self.frames.pop() {
                    if frame.kind == BlockKind::If && frame.args.result().is_some() {
                        // the implicit else arm leaves nothing behind
                        let expected = frame.args.result().into_iter().collect();
                        self.fail(ValidationErrorKind::BlockSignatureMismatch { expected, actual: Vec::new() })?;
                    }
                    self.collapse(&from, frame.entry.with_result(frame.args.result()), frame.height);
                }
            }
            Instruction::Br(depth) => {
                self.check_label(*depth)?;
                self.stack.mark_unknown();
            }
            Instruction::BrIf(depth) => self.check_label(*depth)?,
            Instruction::BrTable(labels, default) => {
                for depth in labels.iter().chain(core::iter::once(default)) {
                    self.check_label(*depth)?;
                }
                self.stack.mark_unknown();
            }
            Instruction::Unreachable => self.stack.mark_unknown(),
            _ => {}
        }
        Ok(false)
    }

    fn open(&mut self, kind: BlockKind, args: BlockArgs) {
        let entry = self.stack.clone();
        let height = entry.height().unwrap_or(self.floor());
        self.frames.push(Frame { kind, args, entry, height });
    }

    /// The values above the innermost block's entry must match its result.
    fn check_block_result(&mut self) -> StepResult {
        let Some(frame) = self.frames.last() else { return Ok(()) };
        let expected: Vec<ValType> = frame.args.result().into_iter().collect();
        let height = frame.height;

        let Some(types) = self.stack.as_slice() else { return Ok(()) };
        if types.get(height..) == Some(&expected[..]) {
            return Ok(());
        }
        let actual = types.get(height..).map(<[ValType]>::to_vec).unwrap_or_default();
        self.fail(ValidationErrorKind::BlockSignatureMismatch { expected, actual })
    }

    /// A branch to `depth` needs the label's values on top of the stack.
    fn check_label(&mut self, depth: u32) -> StepResult {
        let Some(target) = self.frames.len().checked_sub(depth as usize + 1) else {
            return self.fail(ValidationErrorKind::InvalidBranchDepth(depth));
        };
        let frame = &self.frames[target];
        let Some(expected) = frame.kind.branch_result(frame.args) else { return Ok(()) };
        if !self.strict {
            return Ok(());
        }

        match self.stack.peek(0, self.floor()) {
            Popped::Value(actual) if actual != expected => Err(ValidationErrorKind::TypeMismatch { expected, actual }),
            Popped::Underflow => Err(ValidationErrorKind::StackUnderflow { expected: Some(expected) }),
            _ => Ok(()),
        }
    }

    /// Close the implicit function block.
    fn end_function(&mut self) -> StepResult {
        if self.frames.len() > 1 {
            self.fail(ValidationErrorKind::UnbalancedBlocks)?;
        }
        let from = self.stack.clone();
        self.frames.truncate(1);
        self.check_block_result()?;
        self.frames.clear();
        self.collapse(&from, TypeStack::default().with_result(self.ty.result), 0);
        Ok(())
    }

    /// Replace the stack with `target` when a block arm closes, recording the values of
    /// `from` above `base` (the block's entry height) as popped and the remainder of
    /// `target` as pushed.
    fn collapse(&mut self, from: &TypeStack, target: TypeStack, base: usize) {
        match (from.as_slice(), target.as_slice()) {
            (Some(current), Some(types)) => {
                let keep = base.min(current.len()).min(types.len());
                self.changes.extend(current[keep..].iter().rev().map(|ty| StackChange::Pop(Some(*ty))));
                self.changes.extend(types[keep..].iter().map(|ty| StackChange::Push(Some(*ty))));
            }
            (Some(current), None) => {
                let keep = base.min(current.len());
                self.changes.extend(current[keep..].iter().rev().map(|ty| StackChange::Pop(Some(*ty))));
            }
            (None, Some(types)) => {
                let keep = base.min(types.len());
                self.changes.extend(types[keep..].iter().map(|ty| StackChange::Push(Some(*ty))));
            }
            (None, None) => {}
        }

        self.stack = target;
        if let Some(height) = self.stack.height() {
            self.max_height = self.max_height.max(height);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::boxed::Box;
    use stackvm_types::{Function, Global, GlobalType, ConstInstruction, MemoryArg, MemoryType};
    use Instruction::*;
    use ValType::*;

    fn module_with(ty: FuncType, locals: &[ValType], body: Vec<Instruction>) -> Module {
        Module {
            func_types: vec![ty, FuncType::new(&[I32, I64], Some(F32))].into(),
            funcs: vec![Function { ty: 0, locals: locals.into(), instructions: body.into() }].into(),
            globals: vec![
                Global { ty: GlobalType::new(I64, false), init: ConstInstruction::I64Const(0) },
                Global { ty: GlobalType::new(F64, true), init: ConstInstruction::F64Const(0.0) },
            ]
            .into(),
            memories: Box::new([MemoryType::new(1, None)]),
            ..Default::default()
        }
    }

    fn eval(ty: FuncType, locals: &[ValType], body: Vec<Instruction>, strict: bool) -> Result<FunctionEffects> {
        validate(&module_with(ty, locals, body), 0, strict)
    }

    fn kind_of(result: Result<FunctionEffects>) -> ValidationErrorKind {
        match result {
            Err(crate::Error::Validation(err)) => err.kind,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn records_ordered_changes() {
        let body = vec![I32Const(3), I32Const(4), I32Add, End];
        let effects = eval(FuncType::new(&[], Some(I32)), &[], body, true).unwrap();

        assert_eq!(effects.effects[0].changes, [StackChange::Push(Some(I32))]);
        assert_eq!(
            effects.effects[2].changes,
            [StackChange::Pop(Some(I32)), StackChange::Pop(Some(I32)), StackChange::Push(Some(I32))]
        );
        assert_eq!(effects.effects[2].height_before, Some(2));
        assert_eq!(effects.effects[2].height_after, Some(1));
        assert_eq!(effects.max_height, 2);
    }

    #[test]
    fn block_ends_record_their_implicit_changes() {
        // i32.const; block (result i64) i64.const; i64.const; end; drop; drop; end
        let body = vec![
            I32Const(1),
            Block(BlockArgs::Type(I64)),
            I64Const(2),
            I64Const(3),
            End,
            Drop,
            Drop,
            End,
        ];
        let effects = eval(FuncType::empty(), &[], body, false).unwrap();

        assert_eq!(
            effects.effects[4].changes,
            [StackChange::Pop(Some(I64)), StackChange::Pop(Some(I64)), StackChange::Push(Some(I64))]
        );
        for effect in &effects.effects {
            let (Some(before), Some(after)) = (effect.height_before, effect.height_after) else { continue };
            let delta: isize = effect
                .changes
                .iter()
                .map(|change| match change {
                    StackChange::Pop(_) => -1,
                    StackChange::Push(_) => 1,
                })
                .sum();
            assert_eq!(before as isize + delta, after as isize, "{effect:?}");
        }

        // the then-arm's result is dropped at `else`, the block result pushed at `end`
        let body = vec![I32Const(1), If(BlockArgs::Type(I32)), I32Const(2), Else, I32Const(3), End, Drop, End];
        let effects = eval(FuncType::empty(), &[], body, true).unwrap();
        assert_eq!(effects.effects[3].changes, [StackChange::Pop(Some(I32))]);
        assert_eq!(effects.effects[5].changes, [StackChange::Pop(Some(I32)), StackChange::Push(Some(I32))]);

        // falling off the function pushes its result back after popping the body's values
        let effects = eval(FuncType::new(&[], Some(I32)), &[], vec![I32Const(4), End], true).unwrap();
        assert_eq!(effects.effects[1].changes, [StackChange::Pop(Some(I32)), StackChange::Push(Some(I32))]);
    }

    #[test]
    fn strict_rejects_underflow_and_mismatch() {
        let underflow = eval(FuncType::empty(), &[], vec![I32Add, Drop, End], true);
        assert_eq!(kind_of(underflow), ValidationErrorKind::StackUnderflow { expected: Some(I32) });

        let mismatch = eval(FuncType::empty(), &[], vec![I64Const(1), I32Eqz, Drop, End], true);
        assert_eq!(kind_of(mismatch), ValidationErrorKind::TypeMismatch { expected: I32, actual: I64 });
    }

    #[test]
    fn lenient_substitutes_expected_types() {
        let effects = eval(FuncType::empty(), &[], vec![I32Add, Drop, F32Neg, End], false).unwrap();
        assert_eq!(
            effects.effects[0].changes,
            [StackChange::Pop(Some(I32)), StackChange::Pop(Some(I32)), StackChange::Push(Some(I32))]
        );
        assert_eq!(effects.effects[2].changes[0], StackChange::Pop(Some(F32)));
    }

    #[test]
    fn blocks_cannot_pop_outer_values() {
        let body = vec![I32Const(1), Block(BlockArgs::Empty), Drop, End, Drop, End];
        let err = eval(FuncType::empty(), &[], body.clone(), true);
        assert_eq!(kind_of(err), ValidationErrorKind::StackUnderflow { expected: None });
        assert!(eval(FuncType::empty(), &[], body, false).is_ok());
    }

    #[test]
    fn unreachable_code_is_polymorphic() {
        let body = vec![Block(BlockArgs::Type(I32)), Unreachable, I32Add, End, Drop, End];
        let effects = eval(FuncType::empty(), &[], body, true).unwrap();
        assert_eq!(effects.effects[2].height_before, None);
        assert_eq!(effects.effects[3].height_after, Some(1));
    }

    #[test]
    fn resolves_locals_and_globals() {
        let body = vec![LocalGet(0), LocalSet(1), GlobalGet(0), Drop, F64Const(1.0), GlobalSet(1), End];
        assert!(eval(FuncType::new(&[I64], None), &[I64], body, true).is_ok());

        let unknown_local = eval(FuncType::new(&[I64], None), &[], vec![LocalGet(1), Drop, End], true);
        assert_eq!(kind_of(unknown_local), ValidationErrorKind::UnknownLocal(1));

        let immutable = eval(FuncType::empty(), &[], vec![I64Const(1), GlobalSet(0), End], true);
        assert_eq!(kind_of(immutable), ValidationErrorKind::ImmutableGlobal(0));

        let effects = eval(FuncType::empty(), &[], vec![LocalGet(7), Drop, End], false).unwrap();
        assert_eq!(effects.effects[0].height_after, None);
    }

    #[test]
    fn select_and_calls() {
        let body = vec![F32Const(1.0), F32Const(2.0), I32Const(0), Select, Drop, End];
        let effects = eval(FuncType::empty(), &[], body, true).unwrap();
        assert_eq!(effects.effects[3].changes[3], StackChange::Push(Some(F32)));

        let body = vec![I32Const(1), I64Const(2), I32Const(0), CallIndirect(1, 0), Drop, End];
        let mut module = module_with(FuncType::empty(), &[], body);
        let err = validate(&module, 0, true).unwrap_err();
        assert!(matches!(err, crate::Error::Validation(ValidationError { kind: ValidationErrorKind::UnknownTable(0), .. })));
        module.tables = Box::new([stackvm_types::TableType::new(1, None)]);
        assert!(validate(&module, 0, true).is_ok());

        let call_self = eval(FuncType::new(&[I32], None), &[], vec![I64Const(1), Call(0), End], true);
        assert_eq!(kind_of(call_self), ValidationErrorKind::TypeMismatch { expected: I32, actual: I64 });
    }

    #[test]
    fn block_results_and_branches() {
        let ok = vec![
            I32Const(1),
            If(BlockArgs::Type(I64)),
            I64Const(1),
            Else,
            I64Const(2),
            End,
            Block(BlockArgs::Type(I64)),
            I64Const(3),
            Br(0),
            End,
            I64Add,
            End,
        ];
        assert!(eval(FuncType::new(&[], Some(I64)), &[], ok, true).is_ok());

        let no_else = vec![I32Const(1), If(BlockArgs::Type(I32)), I32Const(1), End, End];
        assert!(matches!(
            kind_of(eval(FuncType::new(&[], Some(I32)), &[], no_else, true)),
            ValidationErrorKind::BlockSignatureMismatch { .. }
        ));

        let bad_depth = eval(FuncType::empty(), &[], vec![Br(1), End], true);
        assert_eq!(kind_of(bad_depth), ValidationErrorKind::InvalidBranchDepth(1));

        let bad_label = vec![Block(BlockArgs::Type(I32)), F32Const(1.0), Br(0), End, Drop, End];
        assert_eq!(
            kind_of(eval(FuncType::empty(), &[], bad_label, true)),
            ValidationErrorKind::TypeMismatch { expected: I32, actual: F32 }
        );
    }

    #[test]
    fn function_result_is_checked() {
        let err = eval(FuncType::new(&[], Some(I32)), &[], vec![I64Const(1), End], true);
        assert!(matches!(kind_of(err), ValidationErrorKind::BlockSignatureMismatch { .. }));
        assert!(eval(FuncType::new(&[], Some(I32)), &[], vec![I32Const(1), Return, End], true).is_ok());
    }

    #[test]
    fn memory_requires_a_memory() {
        let mut module = module_with(FuncType::empty(), &[], vec![I32Const(0), I32Load(MemoryArg::default()), Drop, End]);
        assert!(validate(&module, 0, true).is_ok());
        module.memories = Box::new([]);
        let err = validate(&module, 0, true).unwrap_err();
        assert!(matches!(err, crate::Error::Validation(ValidationError { func: Some(0), instr_index: Some(1), .. })));
    }
}
