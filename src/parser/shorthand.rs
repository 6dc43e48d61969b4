//! Parser-state buffers for the text format's inline shorthand forms.
//!
//! Both buffers are explicit structs threaded through the recursive calls
//! that parse a module's fields, not fields on the `Parser` itself — the
//! same "state passing, not module-level state" discipline the kernel's
//! stack frame protocol follows.

use crate::ast::{ExportDescr, ExportType, Index, Loc, ModuleExport};
use crate::error::ParseError;
use crate::parser::cursor::Parser;

/// Collects `(export "name")` shorthand entries encountered while parsing a
/// module's fields (e.g. `(func $f (export "foo") ...)`), to be flushed
/// into synthesized `ModuleExport` fields once the module's field list is
/// complete.
#[derive(Debug, Default)]
pub struct ExportBuffer {
    pending: Vec<(String, ExportDescr, Option<Loc>)>,
}

impl ExportBuffer {
    pub fn new() -> Self {
        ExportBuffer::default()
    }

    pub fn push(&mut self, name: String, descr: ExportDescr, loc: Option<Loc>) {
        self.pending.push((name, descr, loc));
    }

    /// Drains the buffer into synthesized `ModuleExport` nodes, in the
    /// order the shorthand forms were encountered.
    pub fn flush(&mut self) -> Vec<ModuleExport> {
        self.pending
            .drain(..)
            .map(|(name, descr, loc)| ModuleExport { name, descr, loc })
            .collect()
    }
}

/// Consumes zero or more `(export "name")` shorthand forms immediately
/// following a field's identifier (`(func $f (export "a") (export "b") ...)`
/// is legal — a field can be exported under several names), buffering one
/// entry per occurrence against `owner`.
pub fn consume_export_shorthand(
    parser: &mut Parser,
    buffer: &mut ExportBuffer,
    export_type: ExportType,
    owner: &Index,
) -> Result<(), ParseError> {
    while parser.at_open_paren_keyword("export") {
        let loc = parser.expect_open_paren()?;
        parser.expect_keyword("export")?;
        let (name, _) = parser.expect_string()?;
        parser.expect_close_paren()?;
        buffer.push(
            name,
            ExportDescr {
                export_type,
                id: owner.clone(),
            },
            Some(loc),
        );
    }
    Ok(())
}

