//! The WAT/WAST text-format parser: token stream -> `Program`.
//!
//! A single [`fields::parse_program`] routine is entered once per document;
//! it dispatches on the first significant token after each opening `(`,
//! following the dispatch table in the crate's design notes (`module`,
//! `func`, `export`, `import`, `memory`, `data`, `table`, `elem`, `global`,
//! `type`, `start`, and `block`/`loop`/`if` as structured instructions —
//! anything else falls through to a folded instruction). Submodules split
//! the grammar by concern: [`cursor`] is the token-level plumbing every
//! other module builds on, [`numbers`] and [`strings`] decode literals,
//! [`signatures`] is the opcode signature table, [`instr`] parses
//! instructions (plain and folded notation, plus the structured forms),
//! [`func`] parses `Func` and the signature/type-use grammar it shares with
//! `call_indirect`, and [`fields`] parses everything else that can appear
//! inside a module.

mod cursor;
mod fields;
mod func;
mod instr;
pub mod numbers;
pub mod signatures;
pub mod strings;
mod shorthand;

use crate::ast::Program;
use crate::error::ParseError;
use crate::lexer::{self, Token};

/// Parses `tokens` (produced by any compliant tokenizer, not necessarily
/// this crate's own [`lexer`]) into a `Program`. `source` is used only to
/// render code frames in diagnostics.
pub fn parse(tokens: &[Token], source: &str) -> Result<Program, ParseError> {
    let mut parser = cursor::Parser::new(tokens, source);
    fields::parse_program(&mut parser)
}

/// Convenience entry point composing this crate's own lexer with [`parse`],
/// for callers with no tokenizer of their own.
pub fn parse_str(source: &str) -> Result<Program, ParseError> {
    let tokens = lexer::lex(source)?;
    parse(&tokens, source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Module, ModuleField, TopLevel};

    #[test]
    fn parses_empty_module() {
        let program = parse_str("(module)").unwrap();
        assert_eq!(program.body.len(), 1);
        match &program.body[0] {
            TopLevel::Module(Module::Text(m)) => {
                assert!(m.id.is_none());
                assert!(m.fields.is_empty());
            }
            other => panic!("expected an empty text module, got {other:?}"),
        }
    }

    #[test]
    fn parses_memory_func_and_exports() {
        let source = "(module (memory $m 1) (func $f (param i32) (result i32) (get_local 0) (i32.load)) (export \"m\" (memory $m)) (export \"f\" (func $f)))";
        let program = parse_str(source).unwrap();
        let TopLevel::Module(Module::Text(m)) = &program.body[0] else {
            panic!("expected a text module");
        };
        assert_eq!(m.fields.len(), 4);
        assert!(matches!(m.fields[0], ModuleField::Memory(_)));
        assert!(matches!(m.fields[1], ModuleField::Func(_)));
        assert!(matches!(m.fields[2], ModuleField::Export(_)));
        assert!(matches!(m.fields[3], ModuleField::Export(_)));
    }

    #[test]
    fn flushes_shorthand_export_after_its_field() {
        let program = parse_str("(module (func $f (export \"foo\")))").unwrap();
        let TopLevel::Module(Module::Text(m)) = &program.body[0] else {
            panic!("expected a text module");
        };
        assert_eq!(m.fields.len(), 2);
        assert!(matches!(m.fields[0], ModuleField::Func(_)));
        match &m.fields[1] {
            ModuleField::Export(export) => assert_eq!(export.name, "foo"),
            other => panic!("expected a synthesized export, got {other:?}"),
        }
    }

    #[test]
    fn parses_data_segment() {
        let program = parse_str("(data (i32.const 0) \"hi\")").unwrap();
        let TopLevel::Field(ModuleField::Data(d)) = &program.body[0] else {
            panic!("expected a bare data field");
        };
        assert_eq!(d.memory_index.value, 0);
        assert_eq!(d.init.values, b"hi".to_vec());
    }

    #[test]
    fn rejects_unterminated_form() {
        assert!(parse_str("(module (func $f)").is_err());
    }
}
