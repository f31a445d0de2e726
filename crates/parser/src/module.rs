use crate::log::debug;
use crate::{ParseError, Result, conversion};
use alloc::{format, vec::Vec};
use stackvm_types::{
    Data, Element, Export, FuncAddr, FuncType, Function, Global, Import, MemoryType, Module, Names, TableType,
    TypeAddr, ValType,
};
use wasmparser::{FuncValidatorAllocations, Payload, ValidPayload, Validator};

#[derive(Debug, Default)]
pub(crate) struct ModuleReader {
    pub(crate) version: Option<u16>,
    pub(crate) start_func: Option<FuncAddr>,
    pub(crate) func_types: Vec<FuncType>,
    pub(crate) code_type_addrs: Vec<TypeAddr>,
    pub(crate) code: Vec<(Vec<ValType>, Vec<stackvm_types::Instruction>)>,
    pub(crate) exports: Vec<Export>,
    pub(crate) globals: Vec<Global>,
    pub(crate) table_types: Vec<TableType>,
    pub(crate) memory_types: Vec<MemoryType>,
    pub(crate) imports: Vec<Import>,
    pub(crate) data: Vec<Data>,
    pub(crate) elements: Vec<Element>,
    pub(crate) names: Names,
    pub(crate) end_reached: bool,
}

impl ModuleReader {
    pub(crate) fn new() -> ModuleReader {
        Self::default()
    }

    pub(crate) fn process_payload(&mut self, payload: Payload<'_>, validator: &mut Validator) -> Result<()> {
        use wasmparser::Payload::*;

        let valid = validator.payload(&payload)?;

        match payload {
            Version { num, encoding, .. } => {
                self.version = Some(num);
                if !matches!(encoding, wasmparser::Encoding::Module) {
                    return Err(ParseError::InvalidEncoding(encoding));
                }
            }
            StartSection { func, .. } => {
                debug!("Found start section");
                self.start_func = Some(func);
            }
            TypeSection(reader) => {
                if !self.func_types.is_empty() {
                    return Err(ParseError::DuplicateSection("Type section".into()));
                }

                debug!("Found type section");
                self.func_types = reader
                    .into_iter_err_on_gc_types()
                    .map(|t| conversion::convert_module_type(t?))
                    .collect::<Result<Vec<FuncType>>>()?;
            }
            GlobalSection(reader) => {
                if !self.globals.is_empty() {
                    return Err(ParseError::DuplicateSection("Global section".into()));
                }

                debug!("Found global section");
                self.globals = conversion::convert_module_globals(reader)?;
            }
            TableSection(reader) => {
                if !self.table_types.is_empty() {
                    return Err(ParseError::DuplicateSection("Table section".into()));
                }

                debug!("Found table section");
                self.table_types = conversion::convert_module_tables(reader)?;
            }
            MemorySection(reader) => {
                if !self.memory_types.is_empty() {
                    return Err(ParseError::DuplicateSection("Memory section".into()));
                }

                debug!("Found memory section");
                self.memory_types = conversion::convert_module_memories(reader)?;
            }
            ElementSection(reader) => {
                debug!("Found element section");
                self.elements = conversion::convert_module_elements(reader)?;
            }
            DataSection(reader) => {
                if !self.data.is_empty() {
                    return Err(ParseError::DuplicateSection("Data section".into()));
                }

                debug!("Found data section");
                self.data = conversion::convert_module_data_sections(reader)?;
            }
            DataCountSection { .. } => {
                return Err(ParseError::UnsupportedSection("Data count section".into()));
            }
            FunctionSection(reader) => {
                if !self.code_type_addrs.is_empty() {
                    return Err(ParseError::DuplicateSection("Function section".into()));
                }

                debug!("Found function section");
                self.code_type_addrs = reader.into_iter().map(|f| Ok(f?)).collect::<Result<Vec<_>>>()?;
            }
            CodeSectionStart { count, .. } => {
                debug!("Found code section ({} functions)", count);
                if !self.code.is_empty() {
                    return Err(ParseError::DuplicateSection("Code section".into()));
                }
                self.code.reserve(count as usize);
            }
            CodeSectionEntry(function) => {
                if let ValidPayload::Func(to_validate, body) = valid {
                    let mut func_validator = to_validate.into_validator(FuncValidatorAllocations::default());
                    func_validator.validate(&body)?;
                }
                self.code.push(conversion::convert_module_code(function)?);
            }
            ImportSection(reader) => {
                if !self.imports.is_empty() {
                    return Err(ParseError::DuplicateSection("Import section".into()));
                }

                debug!("Found import section");
                self.imports = conversion::convert_module_imports(reader.into_imports())?;
            }
            ExportSection(reader) => {
                if !self.exports.is_empty() {
                    return Err(ParseError::DuplicateSection("Export section".into()));
                }

                debug!("Found export section");
                self.exports =
                    reader.into_iter().map(|e| conversion::convert_module_export(e?)).collect::<Result<Vec<_>>>()?;
            }
            End(_) => {
                debug!("Reached end of module");
                if self.end_reached {
                    return Err(ParseError::DuplicateSection("End section".into()));
                }
                self.end_reached = true;
            }
            CustomSection(reader) => {
                debug!("Found custom section: {:?}", reader.name());
                if let wasmparser::KnownCustom::Name(names) = reader.as_known() {
                    // a malformed name section is not a reason to reject the module
                    if let Ok(names) = conversion::convert_names(names) {
                        self.names = names;
                    }
                }
            }
            UnknownSection { .. } => return Err(ParseError::UnsupportedSection("Unknown section".into())),
            section => return Err(ParseError::UnsupportedSection(format!("Unsupported section: {section:?}"))),
        };

        Ok(())
    }

    pub(crate) fn into_module(self) -> Result<Module> {
        if !self.end_reached {
            return Err(ParseError::EndNotReached);
        }

        if self.code.len() != self.code_type_addrs.len() {
            return Err(ParseError::InvalidFunctionCount {
                expected: self.code_type_addrs.len(),
                actual: self.code.len(),
            });
        }

        let funcs = self
            .code
            .into_iter()
            .zip(self.code_type_addrs)
            .map(|((locals, instructions), ty)| Function {
                ty,
                locals: locals.into_boxed_slice(),
                instructions: instructions.into_boxed_slice(),
            })
            .collect::<Vec<_>>();

        Ok(Module {
            func_types: self.func_types.into_boxed_slice(),
            imports: self.imports.into(),
            funcs: funcs.into_boxed_slice(),
            tables: self.table_types.into_boxed_slice(),
            memories: self.memory_types.into_boxed_slice(),
            globals: self.globals.into_boxed_slice(),
            exports: self.exports.into_boxed_slice(),
            start_func: self.start_func,
            elements: self.elements.into_boxed_slice(),
            data: self.data.into_boxed_slice(),
            names: self.names,
        })
    }
}
