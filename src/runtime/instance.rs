//! Module instantiation: walking a parsed module's fields to allocate
//! function/global/table/memory instances, evaluate initializers, and
//! record exports.

use std::collections::HashMap;

use crate::ast::{
    Func, Global, ImportDescr, Index, Instruction, Memory as MemoryField, Module, ModuleExport,
    ModuleField, ModuleImport, Signature, SignatureOrRef, Table as TableField, TextModule, TypeInstruction,
};
use crate::error::RuntimeError;
use crate::runtime::allocator::{
    Address, Allocator, FunctionInstance, GlobalInstance, HostFn, Memory, TableInstance,
};
use crate::runtime::frame::{create_stack_frame, ExecutionOutcome};
use crate::runtime::values::Value;

/// One resolved export: the name it was published under and the address
/// (tagged by kind) it resolves to.
#[derive(Clone, Debug)]
pub struct ExportInstance {
    pub name: String,
    pub addr: Address,
}

/// `{ exports, funcaddrs, globaladdrs, tableaddrs, memaddrs }`, plus the
/// name -> index maps the executor needs to resolve `Index::Id` operands
/// and the module's declared `(type ...)` signatures for `call_indirect`
/// type-use resolution.
#[derive(Default)]
pub struct ModuleInstance {
    pub funcaddrs: Vec<Address>,
    pub globaladdrs: Vec<Address>,
    pub tableaddrs: Vec<Address>,
    pub memaddrs: Vec<Address>,
    pub exports: Vec<ExportInstance>,
    pub start: Option<Address>,
    types: Vec<Signature>,
    func_names: HashMap<String, u32>,
    global_names: HashMap<String, u32>,
    table_names: HashMap<String, u32>,
    memory_names: HashMap<String, u32>,
    type_names: HashMap<String, u32>,
}

impl ModuleInstance {
    pub fn resolve_func(&self, index: &Index) -> Result<Address, RuntimeError> {
        self.resolve(index, &self.func_names, &self.funcaddrs, RuntimeError::UnknownFunction)
    }

    pub fn resolve_global(&self, index: &Index) -> Result<Address, RuntimeError> {
        self.resolve(index, &self.global_names, &self.globaladdrs, RuntimeError::UnknownGlobal)
    }

    pub fn resolve_table(&self, index: &Index) -> Result<Address, RuntimeError> {
        self.resolve(index, &self.table_names, &self.tableaddrs, RuntimeError::UnknownTable)
    }

    pub fn resolve_memory(&self, index: &Index) -> Result<Address, RuntimeError> {
        self.resolve(index, &self.memory_names, &self.memaddrs, RuntimeError::UnknownMemory)
    }

    pub fn signature(&self, index: &Index) -> Result<&Signature, RuntimeError> {
        let i = match index {
            Index::Num(n) => n.as_u32().ok_or(RuntimeError::NonNumericIndex)?,
            Index::Id(id) => *self
                .type_names
                .get(&id.value)
                .ok_or_else(|| RuntimeError::UnresolvedIdentifier(id.value.clone()))?,
        };
        self.types
            .get(i as usize)
            .ok_or(RuntimeError::UnknownFunction(i))
    }

    /// Resolves a signature reference, whether inline or a `(type $t)` use.
    pub fn resolve_signature(&self, sig: &SignatureOrRef) -> Result<Signature, RuntimeError> {
        match sig {
            SignatureOrRef::Signature(s) => Ok(s.clone()),
            SignatureOrRef::TypeUse(index) => self.signature(index).cloned(),
        }
    }

    fn resolve(
        &self,
        index: &Index,
        names: &HashMap<String, u32>,
        addrs: &[Address],
        unknown: fn(u32) -> RuntimeError,
    ) -> Result<Address, RuntimeError> {
        let i = match index {
            Index::Num(n) => n.as_u32().ok_or(RuntimeError::NonNumericIndex)?,
            Index::Id(id) => *names
                .get(&id.value)
                .ok_or_else(|| RuntimeError::UnresolvedIdentifier(id.value.clone()))?,
        };
        addrs.get(i as usize).copied().ok_or_else(|| unknown(i))
    }
}

/// `createInstance(allocator, moduleNode, externalFunctions)`.
///
/// `external_functions` binds host callables to `(module, name)` import
/// pairs; an unbound function import is a `RuntimeError`, not a trap, since
/// it is a host mis-configuration rather than a WebAssembly-level fault.
/// Only function imports are host-resolvable this way (the public surface
/// names no mechanism for host-supplied globals/memories/tables); a
/// non-function import is instead satisfied with a zero-valued or empty
/// instance of the declared shape.
pub fn create_instance(
    allocator: &mut Allocator,
    module: &TextModule,
    external_functions: &HashMap<(String, String), HostFn>,
) -> Result<ModuleInstance, RuntimeError> {
    let mut instance = ModuleInstance::default();

    collect_types(module, &mut instance);

    for field in &module.fields {
        match field {
            ModuleField::Import(import) => allocate_import(allocator, &mut instance, import, external_functions)?,
            ModuleField::Func(func) => allocate_func(allocator, &mut instance, func)?,
            ModuleField::Global(global) => allocate_global(allocator, &mut instance, global)?,
            ModuleField::Table(table) => allocate_table(allocator, &mut instance, table),
            ModuleField::Memory(memory) => allocate_memory(allocator, &mut instance, memory),
            _ => {}
        }
    }

    initialize_inline_table_elements(allocator, &instance, module)?;

    for field in &module.fields {
        match field {
            ModuleField::Elem(elem) => initialize_elem(allocator, &instance, elem)?,
            ModuleField::Data(data) => initialize_data(allocator, &instance, data)?,
            ModuleField::Export(export) => record_export(&mut instance, export)?,
            ModuleField::Start(start) => {
                instance.start = Some(instance.resolve_func(&start.index)?);
            }
            _ => {}
        }
    }

    Ok(instance)
}

/// Convenience overload for a parsed `Module`, rejecting the non-text
/// variants this crate does not execute.
pub fn create_instance_from_module(
    allocator: &mut Allocator,
    module: &Module,
    external_functions: &HashMap<(String, String), HostFn>,
) -> Result<ModuleInstance, RuntimeError> {
    match module {
        Module::Text(text) => create_instance(allocator, text, external_functions),
        Module::Binary(_) | Module::Quote(_) => Err(RuntimeError::UnresolvedIdentifier(
            "binary/quote modules are not executable by this interpreter".to_string(),
        )),
    }
}

fn collect_types(module: &TextModule, instance: &mut ModuleInstance) {
    for field in &module.fields {
        if let ModuleField::Type(TypeInstruction { id, signature, .. }) = field {
            let index = instance.types.len() as u32;
            if let Some(id) = id {
                instance.type_names.insert(id.value.clone(), index);
            }
            instance.types.push(signature.clone());
        }
    }
}

fn allocate_import(
    allocator: &mut Allocator,
    instance: &mut ModuleInstance,
    import: &ModuleImport,
    external_functions: &HashMap<(String, String), HostFn>,
) -> Result<(), RuntimeError> {
    match &import.descr {
        ImportDescr::Func(descr) => {
            let signature = instance.resolve_signature(&descr.signature)?;
            let key = (import.module.clone(), import.name.clone());
            let callable = external_functions
                .get(&key)
                .cloned()
                .ok_or_else(|| RuntimeError::UnboundImport {
                    module: import.module.clone(),
                    name: import.name.clone(),
                })?;
            let addr = allocator.alloc_function(FunctionInstance::External { signature, callable });
            let index = instance.funcaddrs.len() as u32;
            instance.func_names.insert(descr.id.value.clone(), index);
            instance.funcaddrs.push(addr);
        }
        ImportDescr::Global(global_type) => {
            let addr = allocator.alloc_global(GlobalInstance {
                value: Value::create(global_type.valtype, 0.0),
                mutability: global_type.mutability,
            });
            instance.globaladdrs.push(addr);
        }
        ImportDescr::Memory(limit) => {
            let addr = allocator.alloc_memory(Memory::with_limit(*limit));
            instance.memaddrs.push(addr);
        }
        ImportDescr::Table(descr) => {
            let addr = allocator.alloc_table(TableInstance::with_limit(descr.limits));
            instance.tableaddrs.push(addr);
        }
    }
    Ok(())
}

fn allocate_func(allocator: &mut Allocator, instance: &mut ModuleInstance, func: &Func) -> Result<(), RuntimeError> {
    let signature = instance.resolve_signature(&func.signature)?;
    let addr = allocator.alloc_function(FunctionInstance::Local {
        signature,
        body: func.body.clone(),
    });
    let index = instance.funcaddrs.len() as u32;
    instance.func_names.insert(func.id.value.clone(), index);
    instance.funcaddrs.push(addr);
    Ok(())
}

fn allocate_global(allocator: &mut Allocator, instance: &mut ModuleInstance, global: &Global) -> Result<(), RuntimeError> {
    let value = evaluate_const(allocator, instance, &global.init, global.global_type.valtype)?;
    let addr = allocator.alloc_global(GlobalInstance {
        value,
        mutability: global.global_type.mutability,
    });
    let index = instance.globaladdrs.len() as u32;
    instance.global_names.insert(global.name.value.clone(), index);
    instance.globaladdrs.push(addr);
    Ok(())
}

fn allocate_table(allocator: &mut Allocator, instance: &mut ModuleInstance, table: &TableField) {
    let addr = allocator.alloc_table(TableInstance::with_limit(table.limits));
    let index = instance.tableaddrs.len() as u32;
    instance.table_names.insert(table.name.value.clone(), index);
    instance.tableaddrs.push(addr);
}

fn allocate_memory(allocator: &mut Allocator, instance: &mut ModuleInstance, memory: &MemoryField) {
    let addr = allocator.alloc_memory(Memory::with_limit(memory.limits));
    let index = instance.memaddrs.len() as u32;
    instance.memory_names.insert(memory.id.value.clone(), index);
    instance.memaddrs.push(addr);
}

/// Populates a table declared with the inline `(table $t (elem $a $b))`
/// shorthand from its `elem_indices`, starting at offset 0 — the explicit
/// `(elem ...)` module field (`initialize_elem`) covers the general case,
/// but this shorthand never produces one of those fields, so nothing else
/// fills in `TableInstance.elements` for it.
///
/// Walks `module.fields` a second time, tracking the table index space the
/// same way `collect_types` tracks the type index space, so the table's
/// position among import-declared and explicitly-declared tables lines up
/// with `instance.tableaddrs`.
fn initialize_inline_table_elements(
    allocator: &mut Allocator,
    instance: &ModuleInstance,
    module: &TextModule,
) -> Result<(), RuntimeError> {
    let mut index = 0usize;
    for field in &module.fields {
        match field {
            ModuleField::Import(ModuleImport {
                descr: ImportDescr::Table(_),
                ..
            }) => index += 1,
            ModuleField::Table(table) => {
                if let Some(elem_indices) = &table.elem_indices {
                    let table_addr = instance.tableaddrs[index];
                    let mut resolved = Vec::with_capacity(elem_indices.len());
                    for func_index in elem_indices {
                        resolved.push(instance.resolve_func(func_index)?);
                    }
                    let table_instance = allocator.table_mut(table_addr)?;
                    for (i, addr) in resolved.into_iter().enumerate() {
                        if let Some(slot) = table_instance.elements.get_mut(i) {
                            *slot = Some(addr);
                        }
                    }
                }
                index += 1;
            }
            _ => {}
        }
    }
    Ok(())
}

fn initialize_elem(
    allocator: &mut Allocator,
    instance: &ModuleInstance,
    elem: &crate::ast::Elem,
) -> Result<(), RuntimeError> {
    let offset_value = evaluate_const(allocator, instance, &elem.offset, crate::ast::ValueType::I32)?;
    let offset = match offset_value {
        Value::I32(v) => v as u32,
        _ => return Err(RuntimeError::NonNumericIndex),
    };

    let table_addr = instance.resolve_table(&elem.table_index)?;
    let mut resolved = Vec::with_capacity(elem.funcs.len());
    for func_index in &elem.funcs {
        resolved.push(instance.resolve_func(func_index)?);
    }

    let table = allocator.table_mut(table_addr)?;
    for (i, addr) in resolved.into_iter().enumerate() {
        if let Some(slot) = table.elements.get_mut(offset as usize + i) {
            *slot = Some(addr);
        }
    }
    Ok(())
}

fn initialize_data(
    allocator: &mut Allocator,
    instance: &ModuleInstance,
    data: &crate::ast::Data,
) -> Result<(), RuntimeError> {
    let offset_value = evaluate_const(
        allocator,
        instance,
        std::slice::from_ref(data.offset.as_ref()),
        crate::ast::ValueType::I32,
    )?;
    let offset = match offset_value {
        Value::I32(v) => v as u32,
        _ => return Err(RuntimeError::NonNumericIndex),
    };

    let memory_addr = instance
        .memaddrs
        .get(data.memory_index.value as usize)
        .copied()
        .ok_or(RuntimeError::UnknownMemory(data.memory_index.value))?;
    let memory = allocator.memory_mut(memory_addr)?;
    memory
        .write(offset, &data.init.values)
        .map_err(|trap| RuntimeError::ConstantExpressionTrapped(trap.message))
}

fn record_export(instance: &mut ModuleInstance, export: &ModuleExport) -> Result<(), RuntimeError> {
    use crate::ast::ExportType;

    let addr = match export.descr.export_type {
        ExportType::Func => instance.resolve_func(&export.descr.id)?,
        ExportType::Global => instance.resolve_global(&export.descr.id)?,
        ExportType::Memory => instance.resolve_memory(&export.descr.id)?,
        ExportType::Table => instance.resolve_table(&export.descr.id)?,
    };
    instance.exports.push(ExportInstance {
        name: export.name.clone(),
        addr,
    });
    Ok(())
}

/// Evaluates a constant-expression body (a global's `init`, or a `data`/
/// `elem` segment's offset) in a transient root frame, trapping the same
/// way ordinary execution would on a malformed constant expression.
fn evaluate_const(
    allocator: &mut Allocator,
    instance: &ModuleInstance,
    code: &[Instruction],
    expected: crate::ast::ValueType,
) -> Result<Value, RuntimeError> {
    let mut frame = create_stack_frame(code.to_vec(), Vec::new());
    match crate::runtime::frame::execute_stack_frame(&mut frame, instance, allocator)? {
        ExecutionOutcome::Trap(trap) => Err(RuntimeError::ConstantExpressionTrapped(trap.message)),
        ExecutionOutcome::Value(Some(v)) if v.value_type() == expected => Ok(v),
        ExecutionOutcome::Value(Some(v)) => Err(RuntimeError::TypeMismatch {
            expected: expected.name().to_string(),
            found: v.value_type().name().to_string(),
        }),
        ExecutionOutcome::Value(None) => Err(RuntimeError::MissingArgument(
            "constant expression produced no value".to_string(),
        )),
    }
}
