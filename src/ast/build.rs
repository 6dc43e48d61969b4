//! One builder function per AST node kind.
//!
//! These are the only public way to construct most nodes; callers reaching
//! for `ast::build::*` rather than struct literals get the same structural
//! invariants the parser relies on (e.g. a plain instruction can never be
//! named `block`/`loop`/`if`).

use std::collections::BTreeMap;

use crate::ast::ident::Identifier;
use crate::ast::instruction::*;
use crate::ast::loc::Loc;
use crate::ast::module::*;
use crate::ast::types::*;
use crate::ast::values::*;
use crate::error::AssertionError;

pub fn program(body: Vec<TopLevel>) -> Program {
    Program { body }
}

pub fn module_text(id: Option<Identifier>, fields: Vec<ModuleField>, loc: Option<Loc>) -> Module {
    Module::Text(TextModule { id, fields, loc })
}

pub fn binary_module(id: Option<Identifier>, blob: Vec<Vec<u8>>, loc: Option<Loc>) -> Module {
    Module::Binary(BinaryModule { id, blob, loc })
}

pub fn quote_module(id: Option<Identifier>, string: Vec<String>, loc: Option<Loc>) -> Module {
    Module::Quote(QuoteModule { id, string, loc })
}

pub fn func(
    id: Identifier,
    signature: SignatureOrRef,
    body: Vec<Instruction>,
    loc: Option<Loc>,
) -> Func {
    Func {
        id,
        signature,
        body,
        loc,
    }
}

pub fn memory(id: Identifier, limits: Limit, loc: Option<Loc>) -> Memory {
    Memory { id, limits, loc }
}

pub fn table(
    element_type: ReferenceType,
    limits: Limit,
    name: Identifier,
    elem_indices: Option<Vec<Index>>,
    loc: Option<Loc>,
) -> Table {
    Table {
        element_type,
        limits,
        name,
        elem_indices,
        loc,
    }
}

pub fn global(
    global_type: GlobalType,
    init: Vec<Instruction>,
    name: Identifier,
    loc: Option<Loc>,
) -> Global {
    Global {
        global_type,
        init,
        name,
        loc,
    }
}

pub fn data(
    memory_index: MemIndexLiteral,
    offset: Instruction,
    init: ByteArray,
    loc: Option<Loc>,
) -> Data {
    Data {
        memory_index,
        offset: Box::new(offset),
        init,
        loc,
    }
}

pub fn elem(table_index: Index, offset: Vec<Instruction>, funcs: Vec<Index>, loc: Option<Loc>) -> Elem {
    Elem {
        table_index,
        offset,
        funcs,
        loc,
    }
}

pub fn start(index: Index, loc: Option<Loc>) -> Start {
    Start { index, loc }
}

pub fn module_import(
    module: impl Into<String>,
    name: impl Into<String>,
    descr: ImportDescr,
    loc: Option<Loc>,
) -> ModuleImport {
    ModuleImport {
        module: module.into(),
        name: name.into(),
        descr,
        loc,
    }
}

pub fn module_export(name: impl Into<String>, descr: ExportDescr, loc: Option<Loc>) -> ModuleExport {
    ModuleExport {
        name: name.into(),
        descr,
        loc,
    }
}

pub fn type_instruction(id: Option<Identifier>, signature: Signature, loc: Option<Loc>) -> TypeInstruction {
    TypeInstruction { id, signature, loc }
}

pub fn plain_instr(
    id: impl Into<String>,
    object: Option<ValueType>,
    args: Vec<Operand>,
    named_args: BTreeMap<String, NumberLiteral>,
    loc: Option<Loc>,
) -> Result<Instruction, AssertionError> {
    Instr::new(id, object, args, named_args, loc).map(Instruction::Plain)
}

pub fn block_instruction(
    label: Identifier,
    instr: Vec<Instruction>,
    result: Option<ValueType>,
    loc: Option<Loc>,
) -> Instruction {
    Instruction::Block(BlockInstruction {
        label,
        instr,
        result,
        loc,
    })
}

pub fn loop_instruction(
    label: Identifier,
    instr: Vec<Instruction>,
    result: Option<ValueType>,
    loc: Option<Loc>,
) -> Instruction {
    Instruction::Loop(LoopInstruction {
        label,
        instr,
        result,
        loc,
    })
}

#[allow(clippy::too_many_arguments)]
pub fn if_instruction(
    label: Identifier,
    test: Vec<Instruction>,
    result: Option<ValueType>,
    consequent: Vec<Instruction>,
    alternate: Vec<Instruction>,
    loc: Option<Loc>,
) -> Instruction {
    Instruction::If(IfInstruction {
        label,
        test,
        result,
        consequent,
        alternate,
        loc,
    })
}

pub fn call_instruction(index: Index, instr_args: Vec<Instruction>, loc: Option<Loc>) -> Instruction {
    Instruction::Call(CallInstruction {
        index,
        instr_args,
        loc,
    })
}

pub fn call_indirect_instruction(
    signature: SignatureOrRef,
    instr_args: Vec<Instruction>,
    loc: Option<Loc>,
) -> Instruction {
    Instruction::CallIndirect(CallIndirectInstruction {
        signature,
        instr_args,
        loc,
    })
}
