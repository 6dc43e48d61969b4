//! The WebAssembly text-format AST.
//!
//! A tagged tree of node kinds, grouped into submodules by concern rather
//! than emitted as one flat file: [`loc`] and [`ident`] are the leaves every
//! other node builds on, [`types`] and [`values`] are the remaining leaf
//! kinds, [`instruction`] is the instruction sum type, and [`module`] is
//! everything that hangs off a `Module`. [`build`] is the only supported
//! way to construct a node from outside this crate; [`visit`] provides
//! depth-first traversal with removal support.

pub mod build;
pub mod ident;
pub mod instruction;
pub mod loc;
pub mod module;
pub mod types;
pub mod values;
pub mod visit;

pub use ident::{Identifier, UniqueNameGenerator};
pub use instruction::{
    BlockInstruction, CallIndirectInstruction, CallInstruction, IfInstruction, Instr, Instruction,
    LoopInstruction, Operand, SignatureOrRef, TypeInstruction,
};
pub use loc::{Loc, Position};
pub use module::{
    BinaryModule, Data, Elem, ExportDescr, ExportType, Func, FuncImportDescr, Global, ImportDescr,
    Memory, Module, ModuleExport, ModuleField, ModuleImport, Program, QuoteModule, Start, Table,
    TableImportDescr, TextModule, TopLevel,
};
pub use types::{GlobalType, Limit, Mutability, Param, ReferenceType, Signature, ValtypeLiteral, ValueType};
pub use values::{
    BlockComment, ByteArray, Comment, Index, LeadingComment, MemIndexLiteral, NumberLiteral,
    NumericValue, StringLiteral,
};
pub use visit::{traverse, Path, Visitor};
