//! `Func` parsing and the signature/type-use grammar it shares with
//! `call_indirect` and module-level `(type ...)` declarations.

use crate::ast::build::func;
use crate::ast::{ExportType, Func, Index, Param, Signature, SignatureOrRef};
use crate::error::ParseError;
use crate::parser::cursor::Parser;
use crate::parser::instr::parse_instruction_sequence_until_close;
use crate::parser::shorthand::{consume_export_shorthand, ExportBuffer};

/// Parses the shared `(type $t)? (param ...)* (result ...)*` grammar used by
/// `func`, `call_indirect`, and import function descriptors.
pub fn parse_signature_or_typeuse(parser: &mut Parser) -> Result<SignatureOrRef, ParseError> {
    let type_use = if parser.at_open_paren_keyword("type") {
        parser.bump();
        parser.bump();
        let index = parser.parse_index()?;
        parser.expect_close_paren()?;
        Some(index)
    } else {
        None
    };

    let signature = parse_inline_signature(parser)?;

    match type_use {
        Some(index) if signature.params.is_empty() && signature.results.is_empty() => {
            Ok(SignatureOrRef::TypeUse(index))
        }
        Some(index) => {
            // Both a type reference and an inline signature were written;
            // the type reference is authoritative (the inline form is a
            // readability aid), matching how function signatures resolve
            // against a module's declared types in practice.
            let _ = signature;
            Ok(SignatureOrRef::TypeUse(index))
        }
        None => Ok(SignatureOrRef::Signature(signature)),
    }
}

/// Parses zero or more `(param ...)` forms followed by zero or more
/// `(result ...)` forms, as used standalone by `(type $t (func ...))`.
pub fn parse_inline_signature(parser: &mut Parser) -> Result<Signature, ParseError> {
    let mut params = Vec::new();

    while parser.at_open_paren_keyword("param") {
        parser.bump();
        parser.bump();

        if let Some(id) = parser.eat_identifier() {
            let (valtype, _) = parser.expect_valtype()?;
            params.push(Param { id: Some(id), valtype });
        } else {
            while !parser.at_close_paren() {
                let (valtype, _) = parser.expect_valtype()?;
                params.push(Param { id: None, valtype });
            }
        }

        parser.expect_close_paren()?;
    }

    let mut results = Vec::new();
    while parser.at_open_paren_keyword("result") {
        parser.bump();
        parser.bump();
        while !parser.at_close_paren() {
            let (valtype, _) = parser.expect_valtype()?;
            results.push(valtype);
        }
        parser.expect_close_paren()?;
    }

    Ok(Signature { params, results })
}

/// Parses a `(func ...)` field; the enclosing `(` and `func` keyword have
/// already been consumed by the field dispatcher.
pub fn parse_func(parser: &mut Parser, buffer: &mut ExportBuffer) -> Result<Func, ParseError> {
    let loc = parser.loc_here();
    let id = parser.identifier_or_generated("func");

    consume_export_shorthand(parser, buffer, ExportType::Func, &Index::Id(id.clone()))?;

    let signature = parse_signature_or_typeuse(parser)?;
    let body = parse_instruction_sequence_until_close(parser)?;
    parser.expect_close_paren()?;

    Ok(func(id, signature, body, loc))
}
