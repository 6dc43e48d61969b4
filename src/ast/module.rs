//! Module-level nodes: the module itself and each kind of module field.

use crate::ast::ident::Identifier;
use crate::ast::instruction::{Instruction, SignatureOrRef, TypeInstruction};
use crate::ast::loc::Loc;
use crate::ast::types::{GlobalType, Limit, ReferenceType};
use crate::ast::values::{ByteArray, Index, MemIndexLiteral};

/// `(func ...)`.
#[derive(Clone, Debug, PartialEq)]
pub struct Func {
    pub id: Identifier,
    pub signature: SignatureOrRef,
    pub body: Vec<Instruction>,
    pub loc: Option<Loc>,
}

/// `(memory ...)`.
#[derive(Clone, Debug, PartialEq)]
pub struct Memory {
    pub id: Identifier,
    pub limits: Limit,
    pub loc: Option<Loc>,
}

/// `(table ...)`. `name` models the source inconsistently treating a
/// table's name as either an identifier or a raw string (see DESIGN.md);
/// this crate always normalizes it to an `Identifier`.
#[derive(Clone, Debug, PartialEq)]
pub struct Table {
    pub element_type: ReferenceType,
    pub limits: Limit,
    pub name: Identifier,
    pub elem_indices: Option<Vec<Index>>,
    pub loc: Option<Loc>,
}

/// `(global ...)`.
#[derive(Clone, Debug, PartialEq)]
pub struct Global {
    pub global_type: GlobalType,
    pub init: Vec<Instruction>,
    pub name: Identifier,
    pub loc: Option<Loc>,
}

/// `(data ...)`.
#[derive(Clone, Debug, PartialEq)]
pub struct Data {
    pub memory_index: MemIndexLiteral,
    pub offset: Box<Instruction>,
    pub init: ByteArray,
    pub loc: Option<Loc>,
}

/// `(elem ...)`.
#[derive(Clone, Debug, PartialEq)]
pub struct Elem {
    pub table_index: Index,
    pub offset: Vec<Instruction>,
    pub funcs: Vec<Index>,
    pub loc: Option<Loc>,
}

/// `(start ...)`.
#[derive(Clone, Debug, PartialEq)]
pub struct Start {
    pub index: Index,
    pub loc: Option<Loc>,
}

/// The description half of a `ModuleImport`: what kind of external item is
/// being imported and its type.
#[derive(Clone, Debug, PartialEq)]
pub enum ImportDescr {
    Func(FuncImportDescr),
    Global(GlobalType),
    Memory(Limit),
    Table(TableImportDescr),
}

#[derive(Clone, Debug, PartialEq)]
pub struct FuncImportDescr {
    pub id: Identifier,
    pub signature: SignatureOrRef,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TableImportDescr {
    pub element_type: ReferenceType,
    pub limits: Limit,
}

/// `(import "module" "name" ...)`.
#[derive(Clone, Debug, PartialEq)]
pub struct ModuleImport {
    pub module: String,
    pub name: String,
    pub descr: ImportDescr,
    pub loc: Option<Loc>,
}

/// What kind of module item an export refers to.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ExportType {
    Func,
    Global,
    Memory,
    Table,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ExportDescr {
    pub export_type: ExportType,
    pub id: Index,
}

/// `(export "name" ...)`, whether written as its own top-level form or
/// synthesized from a shorthand inline export (see
/// `parser::shorthand::ExportBuffer`).
#[derive(Clone, Debug, PartialEq)]
pub struct ModuleExport {
    pub name: String,
    pub descr: ExportDescr,
    pub loc: Option<Loc>,
}

/// One declaration inside a module's body.
#[derive(Clone, Debug, PartialEq)]
pub enum ModuleField {
    Func(Func),
    Import(ModuleImport),
    Export(ModuleExport),
    Memory(Memory),
    Table(Table),
    Global(Global),
    Data(Data),
    Elem(Elem),
    Start(Start),
    Type(TypeInstruction),
}

/// A text-format module: `id` is present only when the source supplied
/// `(module $id ...)`; unlike the other node kinds that require an
/// identifier, a module may remain nameless.
#[derive(Clone, Debug, PartialEq)]
pub struct TextModule {
    pub id: Option<Identifier>,
    pub fields: Vec<ModuleField>,
    pub loc: Option<Loc>,
}

/// A `(module binary "..." ...)` form: an opaque sequence of string chunks
/// representing the binary encoding, not parsed further by this crate.
#[derive(Clone, Debug, PartialEq)]
pub struct BinaryModule {
    pub id: Option<Identifier>,
    pub blob: Vec<Vec<u8>>,
    pub loc: Option<Loc>,
}

/// A `(module quote "..." ...)` form: an opaque sequence of string chunks
/// representing WAT source text, not parsed further by this crate.
#[derive(Clone, Debug, PartialEq)]
pub struct QuoteModule {
    pub id: Option<Identifier>,
    pub string: Vec<String>,
    pub loc: Option<Loc>,
}

/// The three notational variants of `(module ...)`.
#[derive(Clone, Debug, PartialEq)]
pub enum Module {
    Text(TextModule),
    Binary(BinaryModule),
    Quote(QuoteModule),
}

impl Module {
    pub fn id(&self) -> Option<&Identifier> {
        match self {
            Module::Text(m) => m.id.as_ref(),
            Module::Binary(m) => m.id.as_ref(),
            Module::Quote(m) => m.id.as_ref(),
        }
    }
}

/// A top-level form: the common case is a single `Module`, but the text
/// format also allows bare module fields at the top level (as some
/// spec-test scripts do).
#[derive(Clone, Debug, PartialEq)]
pub enum TopLevel {
    Module(Module),
    Field(ModuleField),
}

/// The parser's output: an ordered sequence of top-level forms.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct Program {
    pub body: Vec<TopLevel>,
}
