use alloc::{format, vec::Vec};
use stackvm_types::{FuncAddr, FuncRef, Instruction, Module, Signature, TableAddr, TypeAddr, ValType, WasmValue};

use super::stack::{BlockFrame, CallFrame, CallStack, ValueStack};
use crate::store::Store;
use crate::{BlockKind, BlockMap, Error, ImportResolver, Result, Trap, cold, log, unlikely};

mod macros;
mod ops;
mod traits;

#[cfg(not(feature = "std"))]
mod no_std_floats;

/// Outcome of executing a single instruction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Step {
    /// The invocation has more instructions to run
    Running,
    /// The outermost frame returned, carrying the entry function's result
    Returned(Option<WasmValue>),
}

// what to do with the current frame once an instruction's value-level effect is done
enum Action {
    Next,
    Jump(usize),
    Branch(u32),
    Call(FuncAddr),
    Return,
}

/// The execution state one step operates on, borrowed field by field from the context.
pub(crate) struct Interpreter<'a, R: ImportResolver> {
    pub(crate) module: &'a Module,
    pub(crate) block_maps: &'a [BlockMap],
    pub(crate) store: &'a mut Store,
    pub(crate) resolver: &'a mut R,
    pub(crate) call_stack: &'a mut CallStack,
}

impl<R: ImportResolver> Interpreter<'_, R> {
    /// Retire one instruction of the innermost call frame.
    pub(crate) fn step(&mut self) -> Result<Step> {
        let module = self.module;
        let block_maps = self.block_maps;
        let frame = self.call_stack.top_mut()?;
        let body = module.funcs.get(frame.body).ok_or_else(|| Error::Other(format!("no body for func {}", frame.func)))?;
        let blocks =
            block_maps.get(frame.body).ok_or_else(|| Error::Other(format!("no block map for func {}", frame.func)))?;

        let ip = frame.ip;
        let Some(instr) = body.instructions.get(ip) else {
            // the body has no explicit `end`
            return self.return_from_frame();
        };

        log::trace!("func {} ip {ip}: {instr:?}", frame.func);

        use Instruction::*;
        let action = match instr {
            Nop => Action::Next,
            Unreachable => {
                cold();
                return Err(Trap::Unreachable.into());
            }

            Block(args) | Loop(args) => {
                let kind = if matches!(instr, Loop(_)) { BlockKind::Loop } else { BlockKind::Block };
                let label = blocks.label(kind, ip, *args).ok_or_else(|| unmatched(ip))?;
                frame.blocks.push(BlockFrame { label, height: frame.values.len() });
                Action::Next
            }
            If(args) => {
                let condition = pop_i32(&mut frame.values)?;
                let label = blocks.label(BlockKind::If, ip, *args).ok_or_else(|| unmatched(ip))?;
                if condition != 0 {
                    frame.blocks.push(BlockFrame { label, height: frame.values.len() });
                    Action::Next
                } else if let Some(else_at) = blocks.else_of(ip) {
                    frame.blocks.push(BlockFrame { label, height: frame.values.len() });
                    Action::Jump(else_at + 1)
                } else {
                    // no else arm: continue after the `end` without entering the block
                    Action::Jump(label.continuation)
                }
            }
            // the then-arm is done, its `end` pops the block
            Else => Action::Jump(blocks.end_of(ip).ok_or_else(|| unmatched(ip))?),
            End => match frame.blocks.pop() {
                Some(_) => Action::Next,
                None => return self.return_from_frame(),
            },

            Br(depth) => Action::Branch(*depth),
            BrIf(depth) => match pop_i32(&mut frame.values)? {
                0 => Action::Next,
                _ => Action::Branch(*depth),
            },
            BrTable(labels, default) => {
                let index = pop_i32(&mut frame.values)? as u32 as usize;
                Action::Branch(*labels.get(index).unwrap_or(default))
            }
            Return => {
                frame.values.truncate_keep(0, frame.result.is_some() as usize);
                Action::Return
            }
            Call(func) => Action::Call(*func),
            CallIndirect(ty, table) => {
                let index = pop_i32(&mut frame.values)? as u32;
                Action::Call(resolve_indirect(module, self.store, *ty, *table, index)?)
            }

            Drop => {
                frame.values.pop()?;
                Action::Next
            }
            Select => {
                let condition = pop_i32(&mut frame.values)?;
                let second = frame.values.pop()?;
                let first = frame.values.pop_typed(second.val_type())?;
                frame.values.push(if condition != 0 { first } else { second });
                Action::Next
            }

            LocalGet(index) => {
                let value = frame.local(*index)?;
                frame.values.push(value);
                Action::Next
            }
            LocalSet(index) => {
                let value = frame.values.pop()?;
                frame.set_local(*index, value)?;
                Action::Next
            }
            LocalTee(index) => {
                let value = frame.values.pop()?;
                frame.set_local(*index, value)?;
                frame.values.push(value);
                Action::Next
            }
            GlobalGet(index) => {
                let value = self.store.global_get(module, &*self.resolver, *index)?;
                frame.values.push(value);
                Action::Next
            }
            GlobalSet(index) => {
                let value = frame.values.pop()?;
                self.store.global_set(module, &mut *self.resolver, *index, value)?;
                Action::Next
            }

            MemorySize => {
                let pages = self.store.memory()?.page_count();
                frame.values.push(WasmValue::I32(pages as i32));
                Action::Next
            }
            MemoryGrow => {
                let delta = pop_i32(&mut frame.values)? as u32;
                let previous = self.store.memory_mut()?.grow(delta);
                frame.values.push(WasmValue::I32(previous.map_or(-1, |pages| pages as i32)));
                Action::Next
            }

            _ => {
                let Signature::Fixed { pops, push } = instr.signature() else {
                    return Err(Error::Other(format!("{instr:?} has no fixed signature")));
                };

                let mut buf = [WasmValue::I32(0); 2];
                for (slot, ty) in buf.iter_mut().zip(pops) {
                    *slot = frame.values.pop_typed(*ty)?;
                }
                let args = &buf[..pops.len()];

                let result = match (instr.memory_arg(), args) {
                    (Some(_), [addr]) => Some(ops::load(self.store.memory()?, instr, address(*addr)?)?),
                    (Some(_), [value, addr]) => {
                        ops::store(self.store.memory_mut()?, instr, address(*addr)?, *value)?;
                        None
                    }
                    _ => Some(ops::numeric(instr, args)?),
                };

                match (result, push) {
                    (Some(value), Some(ty)) if value.val_type() == ty => frame.values.push(value),
                    (None, None) => {}
                    (result, _) => return Err(Error::Other(format!("{instr:?} produced {result:?}"))),
                }
                Action::Next
            }
        };

        #[cfg(feature = "debug")]
        log::trace!("  stack: {:?}", frame.values.as_slice());

        match action {
            Action::Next => frame.ip += 1,
            Action::Jump(target) => frame.ip = target,
            Action::Branch(depth) => {
                if depth as usize == frame.blocks.len() {
                    // the implicit label around the function body
                    let arity = blocks.function_label(frame.result).arity();
                    frame.values.truncate_keep(0, arity);
                    return self.return_from_frame();
                }

                let target = *frame.blocks.get_relative(depth).ok_or_else(|| {
                    cold();
                    Error::Other(format!("branch depth {depth} out of range"))
                })?;
                frame.values.truncate_keep(target.height, target.label.arity());
                frame.blocks.unwind(depth);
                frame.ip = target.label.continuation;
            }
            Action::Call(func) => self.call(func)?,
            Action::Return => return self.return_from_frame(),
        }

        Ok(Step::Running)
    }

    /// Pop the callee's arguments from the current frame and enter it.
    ///
    /// Imported functions run to completion through the resolver; module-defined ones get a
    /// new frame and the caller's instruction pointer stays on the call until it returns.
    fn call(&mut self, func: FuncAddr) -> Result<()> {
        let module = self.module;
        let callee = module.func_at(func).ok_or_else(|| Error::Other(format!("unknown func {func}")))?;
        let ty = module.func_type_at(func).ok_or_else(|| Error::Other(format!("unknown type for func {func}")))?;

        let caller = self.call_stack.top_mut()?;
        let mut args = Vec::with_capacity(ty.params.len());
        for param in ty.params.iter().rev() {
            args.push(caller.values.pop_typed(*param)?);
        }
        args.reverse();

        match callee {
            FuncRef::Imported(import, _) => {
                log::debug!("{} host call {}.{}", ">".repeat(self.call_stack.len() + 1), import.module, import.name);
                let result = self.resolver.invoke_function(&import.module, &import.name, ty, &args)?;
                let caller = self.call_stack.top_mut()?;
                match (ty.result, result) {
                    (None, None) => {}
                    (Some(expected), Some(value)) if value.val_type() == expected => caller.values.push(value),
                    (expected, actual) => return Err(Error::InvalidCallResult { expected, actual }),
                }
                caller.ip += 1;
                Ok(())
            }
            FuncRef::Defined(function) => {
                let body = func as usize - module.imported_func_count();
                let frame = CallFrame::new(func, body, args, &function.locals, ty.result);
                self.call_stack.push(frame)?;
                log::debug!("{} enter func {func} {}", ">".repeat(self.call_stack.len()), module.func_name(func).unwrap_or(""));
                Ok(())
            }
        }
    }

    /// Pop the current frame and hand its result to the caller.
    ///
    /// The outermost frame ends the invocation. Any other frame must leave nothing on its
    /// operand stack besides the result.
    fn return_from_frame(&mut self) -> Result<Step> {
        let mut frame = self.call_stack.pop().ok_or_else(|| Error::Other("no active call frame".into()))?;
        let result = match frame.result {
            Some(ty) => Some(frame.values.pop_typed(ty)?),
            None => None,
        };
        log::debug!("{} leave func {}", ">".repeat(self.call_stack.len() + 1), frame.func);

        if self.call_stack.is_empty() {
            return Ok(Step::Returned(result));
        }

        let residual = frame.values.len();
        if unlikely(residual != 0) {
            return Err(Trap::ResidualStack { func: frame.func, count: residual }.into());
        }

        let caller = self.call_stack.top_mut()?;
        if let Some(value) = result {
            caller.values.push(value);
        }
        caller.ip += 1;
        Ok(Step::Running)
    }
}

/// Look up the table entry for `call_indirect` and check it against the declared type.
///
/// Runs before any argument is popped, so a mismatch leaves the caller's operands in place.
fn resolve_indirect(module: &Module, store: &Store, ty: TypeAddr, table: TableAddr, index: u32) -> Result<FuncAddr> {
    if unlikely(table != 0) {
        return Err(Error::Other(format!("unknown table {table}")));
    }

    let func = store.table()?.get(index)?;
    let expected = module.func_types.get(ty as usize).ok_or_else(|| Error::Other(format!("unknown type {ty}")))?;
    let actual = module.func_type_at(func).ok_or_else(|| Error::Other(format!("unknown func {func}")))?;

    if unlikely(expected != actual) {
        return Err(Trap::IndirectCallTypeMismatch { expected: expected.clone(), actual: actual.clone() }.into());
    }
    Ok(func)
}

#[inline]
fn pop_i32(values: &mut ValueStack) -> Result<i32> {
    match values.pop_typed(ValType::I32)? {
        WasmValue::I32(v) => Ok(v),
        other => Err(Error::Other(format!("expected i32 operand, found {other:?}"))),
    }
}

#[inline]
fn address(value: WasmValue) -> Result<u32> {
    match value {
        WasmValue::I32(v) => Ok(v as u32),
        other => Err(Error::Other(format!("expected i32 operand, found {other:?}"))),
    }
}

#[cold]
fn unmatched(ip: usize) -> Error {
    Error::Other(format!("unmatched block marker at {ip}"))
}
