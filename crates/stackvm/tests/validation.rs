mod common;

use common::parse;
use eyre::Result;
use stackvm::types::{FuncType, Function, GlobalType};
use stackvm::{Error, Instruction, Module, Signature, StackChange, ValType, ValidationErrorKind, validate};

fn module(ty: FuncType, body: Vec<Instruction>) -> Module {
    Module {
        func_types: vec![ty].into(),
        funcs: vec![Function { ty: 0, locals: Box::new([]), instructions: body.into_boxed_slice() }].into(),
        ..Default::default()
    }
}

fn kind(result: stackvm::Result<stackvm::FunctionEffects>) -> ValidationErrorKind {
    match result {
        Err(Error::Validation(err)) => err.kind,
        other => panic!("expected a validation error, got {other:?}"),
    }
}

// small deterministic generator, enough to shuffle straight-line bodies
struct Lcg(u64);

impl Lcg {
    fn next(&mut self, bound: usize) -> usize {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        ((self.0 >> 33) as usize) % bound
    }
}

#[test]
fn negative_height_fails_strict_and_never_lenient() -> Result<()> {
    use Instruction::*;
    let pool = [I32Const(1), I32Const(2), I32Add, I32Eqz, Drop, I64Const(3), I64ExtendI32S, I32WrapI64, I32Mul];
    let mut rng = Lcg(0x5eed);

    for _ in 0..500 {
        let len = 1 + rng.next(8);
        let body: Vec<_> = (0..len).map(|_| pool[rng.next(pool.len())].clone()).collect();

        let mut height = 0isize;
        let mut negative = false;
        for instr in &body {
            let (pops, pushes) = match instr.signature() {
                Signature::Fixed { pops, push } => (pops.len(), push.is_some() as usize),
                Signature::Drop => (1, 0),
                other => panic!("unexpected signature {other:?}"),
            };
            height -= pops as isize;
            negative |= height < 0;
            height += pushes as isize;
        }

        let mut with_end = body.clone();
        with_end.push(End);
        let module = module(FuncType::empty(), with_end);

        let lenient = validate(&module, 0, false)?;
        assert_eq!(lenient.effects.len(), body.len() + 1);

        if negative {
            assert!(validate(&module, 0, true).is_err(), "{body:?} should fail strict validation");
        }
    }
    Ok(())
}

#[test]
fn strict_errors_point_at_the_instruction() {
    use Instruction::*;

    let body = vec![I32Const(1), I64Const(2), I32Add, End];
    match validate(&module(FuncType::empty(), body), 0, true) {
        Err(Error::Validation(err)) => {
            assert_eq!(err.func, Some(0));
            assert_eq!(err.instr_index, Some(2));
            assert_eq!(err.kind, ValidationErrorKind::TypeMismatch { expected: ValType::I32, actual: ValType::I64 });
        }
        other => panic!("expected a validation error, got {other:?}"),
    }

    let body = vec![I32Const(1), End];
    let err = kind(validate(&module(FuncType::empty(), body), 0, true));
    assert!(matches!(err, ValidationErrorKind::BlockSignatureMismatch { .. }));

    let body = vec![LocalGet(3), End];
    let ty = FuncType::new(&[ValType::I32], Some(ValType::I32));
    assert_eq!(kind(validate(&module(ty, body), 0, true)), ValidationErrorKind::UnknownLocal(3));

    let body = vec![Call(9), End];
    assert_eq!(kind(validate(&module(FuncType::empty(), body), 0, true)), ValidationErrorKind::UnknownFunc(9));
}

#[test]
fn lenient_mode_substitutes_expected_types() -> Result<()> {
    use Instruction::*;

    let body = vec![I64Const(1), F32Neg, I32Add, End];
    let effects = validate(&module(FuncType::empty(), body), 0, false)?;

    assert_eq!(effects.effects[1].changes, vec![StackChange::Pop(Some(ValType::F32)), StackChange::Push(Some(ValType::F32))]);
    assert_eq!(effects.effects[2].changes[0], StackChange::Pop(Some(ValType::I32)));
    assert_eq!(effects.effects[2].top_after, Some(ValType::I32));

    // an unknown global makes the rest of the body unknown instead of failing
    let body = vec![GlobalGet(4), I32Const(1), End];
    let effects = validate(&module(FuncType::empty(), body), 0, false)?;
    assert_eq!(effects.effects[0].height_after, None);
    assert_eq!(effects.effects[1].height_after, None);
    Ok(())
}

#[test]
fn parsed_modules_validate_strictly() -> Result<()> {
    let module = parse(
        r#"(module
            (global $g (mut i64) (i64.const 0))
            (memory 1)
            (func (export "f") (param i32) (result i64)
                (local f64)
                local.get 0
                if (result i64)
                    i64.const 1
                else
                    i32.const 0 i64.load
                end
                global.get $g
                i64.add))"#,
    )?;

    let effects = validate(&module, 0, true)?;
    assert_eq!(effects.max_height, 2);
    assert!(matches!(module.globals[0].ty, GlobalType { mutable: true, ty: ValType::I64 }));
    Ok(())
}

#[test]
fn relocatable_ranges() -> Result<()> {
    let module = parse(
        r#"(module
            (func (export "f") (param i32) (result i32)
                i32.const 1
                i32.const 2
                i32.add
                drop
                local.get 0
                i32.const 3
                i32.mul))"#,
    )?;
    let effects = validate(&module, 0, true)?;

    // const/const/add/drop is balanced
    let range = effects.is_relocatable(0..4).expect("balanced range");
    assert_eq!(range.pushes, None);

    // const/const/add leaves one i32
    assert_eq!(effects.is_relocatable(0..3).map(|r| r.pushes), Some(Some(ValType::I32)));

    // pops below its own start
    assert!(effects.is_relocatable(2..4).is_none());
    // touches a local
    assert!(effects.is_relocatable(3..6).is_none());
    // contains the function end
    assert!(effects.is_relocatable(5..8).is_none());

    let ranges = effects.relocatable_ranges(2, 4);
    assert_eq!(ranges.first().map(|r| r.range.clone()), Some(0..4));
    assert!(ranges.windows(2).all(|w| w[0].range.len() >= w[1].range.len()));
    Ok(())
}
