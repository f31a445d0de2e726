use crate::visit::FunctionBuilder;
use crate::{ParseError, Result};
use alloc::{boxed::Box, collections::BTreeMap, format, string::ToString, vec::Vec};
use stackvm_types::*;
use wasmparser::{ConstExpr, FunctionBody};

pub(crate) fn convert_module_elements<'a, T: IntoIterator<Item = wasmparser::Result<wasmparser::Element<'a>>>>(
    elements: T,
) -> Result<Vec<Element>> {
    elements.into_iter().map(|element| convert_module_element(element?)).collect::<Result<Vec<_>>>()
}

pub(crate) fn convert_module_element(element: wasmparser::Element<'_>) -> Result<Element> {
    let (table, offset) = match element.kind {
        wasmparser::ElementKind::Active { table_index, offset_expr } => {
            (table_index.unwrap_or(0), process_const_expr(&offset_expr)?)
        }
        _ => return Err(ParseError::UnsupportedSection("Passive or declared element segment".into())),
    };

    let funcs = match element.items {
        wasmparser::ElementItems::Functions(funcs) => funcs.into_iter().map(|f| Ok(f?)).collect::<Result<Vec<_>>>()?,
        _ => return Err(ParseError::UnsupportedSection("Element segment with expressions".into())),
    };

    Ok(Element { table, offset, funcs: funcs.into_boxed_slice() })
}

pub(crate) fn convert_module_data_sections<'a, T: IntoIterator<Item = wasmparser::Result<wasmparser::Data<'a>>>>(
    data_sections: T,
) -> Result<Vec<Data>> {
    data_sections.into_iter().map(|data| convert_module_data(data?)).collect::<Result<Vec<_>>>()
}

pub(crate) fn convert_module_data(data: wasmparser::Data<'_>) -> Result<Data> {
    match data.kind {
        wasmparser::DataKind::Active { memory_index, offset_expr } => Ok(Data {
            mem: memory_index,
            offset: process_const_expr(&offset_expr)?,
            data: data.data.to_vec().into_boxed_slice(),
        }),
        wasmparser::DataKind::Passive => Err(ParseError::UnsupportedSection("Passive data segment".into())),
    }
}

pub(crate) fn convert_module_imports<'a, T: IntoIterator<Item = wasmparser::Result<wasmparser::Import<'a>>>>(
    imports: T,
) -> Result<Vec<Import>> {
    imports.into_iter().map(|import| convert_module_import(import?)).collect::<Result<Vec<_>>>()
}

pub(crate) fn convert_module_import(import: wasmparser::Import<'_>) -> Result<Import> {
    Ok(Import {
        module: import.module.to_string().into_boxed_str(),
        name: import.name.to_string().into_boxed_str(),
        kind: match import.ty {
            wasmparser::TypeRef::Func(ty) => ImportKind::Function(ty),
            wasmparser::TypeRef::Table(ty) => ImportKind::Table(convert_table_type(ty)?),
            wasmparser::TypeRef::Memory(ty) => ImportKind::Memory(convert_module_memory(ty)?),
            wasmparser::TypeRef::Global(ty) => ImportKind::Global(convert_global_type(ty)?),
            ty => return Err(ParseError::UnsupportedOperator(format!("Unsupported import kind: {ty:?}"))),
        },
    })
}

pub(crate) fn convert_module_memories<T: IntoIterator<Item = wasmparser::Result<wasmparser::MemoryType>>>(
    memory_types: T,
) -> Result<Vec<MemoryType>> {
    memory_types.into_iter().map(|memory| convert_module_memory(memory?)).collect::<Result<Vec<_>>>()
}

pub(crate) fn convert_module_memory(memory: wasmparser::MemoryType) -> Result<MemoryType> {
    if memory.memory64 || memory.shared {
        return Err(ParseError::UnsupportedOperator("64-bit or shared memories are not supported".into()));
    }

    let page_count_initial = u32::try_from(memory.initial)
        .map_err(|_| ParseError::UnsupportedOperator(format!("Memory size initial is too large: {}", memory.initial)))?;
    let page_count_max = match memory.maximum {
        Some(max) => Some(
            u32::try_from(max)
                .map_err(|_| ParseError::UnsupportedOperator(format!("Memory size max is too large: {max}")))?,
        ),
        None => None,
    };

    Ok(MemoryType { page_count_initial, page_count_max })
}

pub(crate) fn convert_module_tables<'a, T: IntoIterator<Item = wasmparser::Result<wasmparser::Table<'a>>>>(
    table_types: T,
) -> Result<Vec<TableType>> {
    table_types.into_iter().map(|table| convert_table_type(table?.ty)).collect::<Result<Vec<_>>>()
}

pub(crate) fn convert_table_type(ty: wasmparser::TableType) -> Result<TableType> {
    if !ty.element_type.is_func_ref() {
        return Err(ParseError::UnsupportedOperator(format!("Unsupported table element type: {:?}", ty.element_type)));
    }

    let size_initial = u32::try_from(ty.initial)
        .map_err(|_| ParseError::UnsupportedOperator(format!("Table size initial is too large: {}", ty.initial)))?;
    let size_max = match ty.maximum {
        Some(max) => Some(
            u32::try_from(max)
                .map_err(|_| ParseError::UnsupportedOperator(format!("Table size max is too large: {max}")))?,
        ),
        None => None,
    };

    Ok(TableType { size_initial, size_max })
}

pub(crate) fn convert_module_globals<'a, T: IntoIterator<Item = wasmparser::Result<wasmparser::Global<'a>>>>(
    globals: T,
) -> Result<Vec<Global>> {
    globals
        .into_iter()
        .map(|global| {
            let global = global?;
            Ok(Global { ty: convert_global_type(global.ty)?, init: process_const_expr(&global.init_expr)? })
        })
        .collect::<Result<Vec<_>>>()
}

pub(crate) fn convert_global_type(ty: wasmparser::GlobalType) -> Result<GlobalType> {
    Ok(GlobalType { mutable: ty.mutable, ty: convert_valtype(&ty.content_type)? })
}

pub(crate) fn convert_module_export(export: wasmparser::Export<'_>) -> Result<Export> {
    let kind = match export.kind {
        wasmparser::ExternalKind::Func => ExternalKind::Func,
        wasmparser::ExternalKind::Table => ExternalKind::Table,
        wasmparser::ExternalKind::Memory => ExternalKind::Memory,
        wasmparser::ExternalKind::Global => ExternalKind::Global,
        kind => return Err(ParseError::UnsupportedOperator(format!("Unsupported export kind: {kind:?}"))),
    };

    Ok(Export { index: export.index, name: Box::from(export.name), kind })
}

pub(crate) fn convert_module_code(func: FunctionBody<'_>) -> Result<(Vec<ValType>, Vec<Instruction>)> {
    let locals_reader = func.get_locals_reader()?;
    let mut locals = Vec::with_capacity(locals_reader.get_count() as usize);
    for local in locals_reader {
        let (count, ty) = local?;
        let ty = convert_valtype(&ty)?;
        locals.extend((0..count).map(|_| ty));
    }

    let mut builder = FunctionBuilder::new();
    let mut reader = func.get_operators_reader()?;
    while !reader.eof() {
        builder.push_operator(reader.read()?)?;
    }

    Ok((locals, builder.finish()))
}

pub(crate) fn convert_module_type(ty: wasmparser::FuncType) -> Result<FuncType> {
    let params = ty.params().iter().map(convert_valtype).collect::<Result<Vec<ValType>>>()?.into_boxed_slice();
    let result = match ty.results() {
        [] => None,
        [result] => Some(convert_valtype(result)?),
        _ => return Err(ParseError::UnsupportedOperator("Multiple return values are not supported".to_string())),
    };

    Ok(FuncType { params, result })
}

pub(crate) fn convert_names(reader: wasmparser::NameSectionReader<'_>) -> Result<Names> {
    let mut names = Names::default();
    for name in reader {
        match name? {
            wasmparser::Name::Module { name, .. } => names.module = Some(name.into()),
            wasmparser::Name::Function(map) => {
                for naming in map {
                    let naming = naming?;
                    names.funcs.insert(naming.index, naming.name.into());
                }
            }
            wasmparser::Name::Local(map) => {
                for indirect in map {
                    let indirect = indirect?;
                    let mut locals = BTreeMap::new();
                    for naming in indirect.names {
                        let naming = naming?;
                        locals.insert(naming.index, naming.name.into());
                    }
                    names.locals.insert(indirect.index, locals);
                }
            }
            _ => {}
        }
    }
    Ok(names)
}

pub(crate) fn convert_blocktype(blocktype: wasmparser::BlockType) -> Result<BlockArgs> {
    match blocktype {
        wasmparser::BlockType::Empty => Ok(BlockArgs::Empty),
        wasmparser::BlockType::Type(ty) => Ok(BlockArgs::Type(convert_valtype(&ty)?)),
        wasmparser::BlockType::FuncType(_) => {
            Err(ParseError::UnsupportedOperator("Multi-value block types are not supported".to_string()))
        }
    }
}

pub(crate) fn convert_valtype(valtype: &wasmparser::ValType) -> Result<ValType> {
    match valtype {
        wasmparser::ValType::I32 => Ok(ValType::I32),
        wasmparser::ValType::I64 => Ok(ValType::I64),
        wasmparser::ValType::F32 => Ok(ValType::F32),
        wasmparser::ValType::F64 => Ok(ValType::F64),
        ty => Err(ParseError::UnsupportedOperator(format!("Unsupported value type: {ty:?}"))),
    }
}

pub(crate) fn convert_memarg(memarg: wasmparser::MemArg) -> Result<MemoryArg> {
    if memarg.memory != 0 {
        return Err(ParseError::UnsupportedOperator("Multiple memories are not supported".to_string()));
    }
    let offset = u32::try_from(memarg.offset)
        .map_err(|_| ParseError::UnsupportedOperator(format!("Memory offset is too large: {}", memarg.offset)))?;
    Ok(MemoryArg { offset, align: memarg.align as u32 })
}

pub(crate) fn process_const_expr(expr: &ConstExpr<'_>) -> Result<ConstInstruction> {
    let mut reader = expr.get_operators_reader();
    let mut ops = Vec::new();
    while !reader.eof() {
        ops.push(reader.read()?);
    }

    match ops.as_slice() {
        [op, wasmparser::Operator::End] => process_const_operator(op),
        _ => Err(ParseError::UnsupportedOperator(format!("Unsupported constant expression: {ops:?}"))),
    }
}

pub(crate) fn process_const_operator(op: &wasmparser::Operator<'_>) -> Result<ConstInstruction> {
    match op {
        wasmparser::Operator::I32Const { value } => Ok(ConstInstruction::I32Const(*value)),
        wasmparser::Operator::I64Const { value } => Ok(ConstInstruction::I64Const(*value)),
        wasmparser::Operator::F32Const { value } => Ok(ConstInstruction::F32Const(f32::from_bits(value.bits()))),
        wasmparser::Operator::F64Const { value } => Ok(ConstInstruction::F64Const(f64::from_bits(value.bits()))),
        wasmparser::Operator::GlobalGet { global_index } => Ok(ConstInstruction::GlobalGet(*global_index)),
        op => Err(ParseError::UnsupportedOperator(format!("Unsupported const instruction: {op:?}"))),
    }
}
