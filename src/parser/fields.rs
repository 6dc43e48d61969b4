//! Module-level field parsing: everything that can appear as a direct child
//! of `(module ...)`, plus the module form itself and the program-level
//! dispatch `walk()` entry point.

use crate::ast::build::{
    binary_module, data, elem, global, memory, module_export, module_import, module_text, program,
    quote_module, start, table, type_instruction,
};
use crate::ast::{
    ByteArray, Data, Elem, ExportDescr, ExportType, FuncImportDescr, Global, GlobalType, ImportDescr,
    Index, Limit, Memory, MemIndexLiteral, Module, ModuleExport, ModuleField, ModuleImport, Mutability,
    NumberLiteral, NumericValue, Program, ReferenceType, Start, Table, TableImportDescr, TopLevel,
    TypeInstruction,
};
use crate::error::ParseError;
use crate::lexer::TokenKind;
use crate::parser::cursor::Parser;
use crate::parser::func::{parse_func, parse_signature_or_typeuse};
use crate::parser::instr::parse_instruction;
use crate::parser::shorthand::{consume_export_shorthand, ExportBuffer};
use crate::parser::strings;

/// Parses a whole document: zero or more top-level forms, each either a
/// `(module ...)` or a bare module field.
pub fn parse_program(parser: &mut Parser) -> Result<Program, ParseError> {
    let mut body = Vec::new();

    while !parser.at_eof() {
        parser.expect_open_paren()?;

        if parser.at_keyword("module") {
            parser.bump();
            body.push(TopLevel::Module(parse_module(parser)?));
        } else {
            let keyword = expect_field_keyword(parser)?;
            let mut buffer = ExportBuffer::new();
            let field = parse_module_field(parser, &keyword, &mut buffer)?;
            body.push(TopLevel::Field(field));
            for export in buffer.flush() {
                body.push(TopLevel::Field(ModuleField::Export(export)));
            }
        }
    }

    Ok(program(body))
}

fn expect_field_keyword(parser: &mut Parser) -> Result<String, ParseError> {
    match parser.peek_kind().cloned() {
        Some(TokenKind::Keyword(k)) => {
            parser.bump();
            Ok(k)
        }
        _ => Err(parser.error("expected 'module' or a module field keyword")),
    }
}

fn parse_module(parser: &mut Parser) -> Result<Module, ParseError> {
    let loc = parser.loc_here();
    let id = parser.eat_identifier();

    if parser.at_keyword("binary") {
        parser.bump();
        let mut blob = Vec::new();
        while let Some(TokenKind::String(_)) = parser.peek_kind() {
            let (raw, rloc) = parser.expect_string()?;
            blob.push(strings::decode(&raw).map_err(|e| ParseError::syntax(parser.source, Some(rloc), e.0))?);
        }
        parser.expect_close_paren()?;
        return Ok(binary_module(id, blob, loc));
    }

    if parser.at_keyword("quote") {
        parser.bump();
        let mut chunks = Vec::new();
        while let Some(TokenKind::String(_)) = parser.peek_kind() {
            let (raw, _) = parser.expect_string()?;
            chunks.push(raw);
        }
        parser.expect_close_paren()?;
        return Ok(quote_module(id, chunks, loc));
    }

    let mut fields = Vec::new();
    let mut buffer = ExportBuffer::new();

    while !parser.at_close_paren() {
        parser.expect_open_paren()?;
        let keyword = expect_field_keyword(parser)?;
        fields.push(parse_module_field(parser, &keyword, &mut buffer)?);
    }
    parser.expect_close_paren()?;

    for export in buffer.flush() {
        fields.push(ModuleField::Export(export));
    }

    Ok(module_text(id, fields, loc))
}

fn parse_module_field(
    parser: &mut Parser,
    keyword: &str,
    buffer: &mut ExportBuffer,
) -> Result<ModuleField, ParseError> {
    match keyword {
        "func" => Ok(ModuleField::Func(parse_func(parser, buffer)?)),
        "import" => Ok(ModuleField::Import(parse_import(parser)?)),
        "export" => Ok(ModuleField::Export(parse_export(parser)?)),
        "memory" => Ok(ModuleField::Memory(parse_memory(parser, buffer)?)),
        "table" => Ok(ModuleField::Table(parse_table(parser, buffer)?)),
        "global" => match parse_global(parser, buffer)? {
            GlobalParseResult::Defined(g) => Ok(ModuleField::Global(g)),
            GlobalParseResult::Imported(i) => Ok(ModuleField::Import(i)),
        },
        "data" => Ok(ModuleField::Data(parse_data(parser)?)),
        "elem" => Ok(ModuleField::Elem(parse_elem(parser)?)),
        "start" => Ok(ModuleField::Start(parse_start(parser)?)),
        "type" => Ok(ModuleField::Type(parse_type(parser)?)),
        other => Err(parser.error(format!("'{other}' is not a module field"))),
    }
}

fn parse_import(parser: &mut Parser) -> Result<ModuleImport, ParseError> {
    let loc = parser.loc_here();
    let (module, _) = parser.expect_string()?;
    let (name, _) = parser.expect_string()?;

    parser.expect_open_paren()?;
    let keyword = expect_field_keyword(parser)?;

    let descr = match keyword.as_str() {
        "func" => {
            let id = parser.identifier_or_generated("func");
            let signature = parse_signature_or_typeuse(parser)?;
            parser.expect_close_paren()?;
            ImportDescr::Func(FuncImportDescr { id, signature })
        }
        "memory" => {
            let _ = parser.eat_identifier();
            let limits = parser.parse_limit()?;
            parser.expect_close_paren()?;
            ImportDescr::Memory(limits)
        }
        "table" => {
            let _ = parser.eat_identifier();
            let element_type = parser.expect_reference_type()?;
            let limits = parser.parse_limit()?;
            parser.expect_close_paren()?;
            ImportDescr::Table(TableImportDescr { element_type, limits })
        }
        "global" => {
            let _ = parser.eat_identifier();
            let global_type = parse_global_type(parser)?;
            parser.expect_close_paren()?;
            ImportDescr::Global(global_type)
        }
        other => return Err(parser.error(format!("'{other}' is not an importable kind"))),
    };

    parser.expect_close_paren()?;
    Ok(module_import(module, name, descr, loc))
}

fn parse_export(parser: &mut Parser) -> Result<ModuleExport, ParseError> {
    let loc = parser.loc_here();
    let (name, _) = parser.expect_string()?;

    parser.expect_open_paren()?;
    let export_type = match expect_field_keyword(parser)?.as_str() {
        "func" => ExportType::Func,
        "global" => ExportType::Global,
        "memory" => ExportType::Memory,
        "table" => ExportType::Table,
        other => return Err(parser.error(format!("'{other}' is not an exportable kind"))),
    };
    let id = parser.parse_index()?;
    parser.expect_close_paren()?;
    parser.expect_close_paren()?;

    Ok(module_export(name, ExportDescr { export_type, id }, loc))
}

fn parse_memory(parser: &mut Parser, buffer: &mut ExportBuffer) -> Result<Memory, ParseError> {
    let loc = parser.loc_here();
    let id = parser.identifier_or_generated("memory");

    consume_export_shorthand(parser, buffer, ExportType::Memory, &Index::Id(id.clone()))?;

    let limits = if parser.at_open_paren_keyword("data") {
        parser.bump();
        parser.bump();
        let mut len = 0usize;
        while let Some(TokenKind::String(_)) = parser.peek_kind() {
            let (raw, rloc) = parser.expect_string()?;
            let bytes =
                strings::decode(&raw).map_err(|e| ParseError::syntax(parser.source, Some(rloc), e.0))?;
            len += bytes.len();
        }
        parser.expect_close_paren()?;
        Limit::new(len as u32, None)
    } else {
        parser.parse_limit()?
    };

    parser.expect_close_paren()?;
    Ok(memory(id, limits, loc))
}

fn parse_table(parser: &mut Parser, buffer: &mut ExportBuffer) -> Result<Table, ParseError> {
    let loc = parser.loc_here();
    let name = parser.identifier_or_generated("table");

    consume_export_shorthand(parser, buffer, ExportType::Table, &Index::Id(name.clone()))?;

    let (element_type, limits, elem_indices) = if parser.at_open_paren_keyword("elem") {
        parser.bump();
        parser.bump();
        let mut indices = Vec::new();
        while !parser.at_close_paren() {
            indices.push(parser.parse_index()?);
        }
        parser.expect_close_paren()?;
        let count = indices.len() as u32;
        (ReferenceType::AnyFunc, Limit::exact(count), Some(indices))
    } else {
        let element_type = parser.expect_reference_type()?;
        let limits = parser.parse_limit()?;
        (element_type, limits, None)
    };

    parser.expect_close_paren()?;
    Ok(table(element_type, limits, name, elem_indices, loc))
}

enum GlobalParseResult {
    Defined(Global),
    Imported(ModuleImport),
}

fn parse_global_type(parser: &mut Parser) -> Result<GlobalType, ParseError> {
    if parser.at_open_paren_keyword("mut") {
        parser.bump();
        parser.bump();
        let (valtype, _) = parser.expect_valtype()?;
        parser.expect_close_paren()?;
        Ok(GlobalType { valtype, mutability: Mutability::Var })
    } else {
        let (valtype, _) = parser.expect_valtype()?;
        Ok(GlobalType { valtype, mutability: Mutability::Const })
    }
}

fn parse_global(parser: &mut Parser, buffer: &mut ExportBuffer) -> Result<GlobalParseResult, ParseError> {
    let loc = parser.loc_here();
    let name = parser.identifier_or_generated("global");

    consume_export_shorthand(parser, buffer, ExportType::Global, &Index::Id(name.clone()))?;

    if parser.at_open_paren_keyword("import") {
        parser.bump();
        parser.bump();
        let (module, _) = parser.expect_string()?;
        let (import_name, _) = parser.expect_string()?;
        parser.expect_close_paren()?;

        let global_type = parse_global_type(parser)?;
        parser.expect_close_paren()?;

        let import = module_import(module, import_name, ImportDescr::Global(global_type), loc);
        return Ok(GlobalParseResult::Imported(import));
    }

    let global_type = parse_global_type(parser)?;
    let init = vec![parse_instruction(parser)?];
    parser.expect_close_paren()?;

    Ok(GlobalParseResult::Defined(global(global_type, init, name, loc)))
}

fn parse_data(parser: &mut Parser) -> Result<Data, ParseError> {
    let loc = parser.loc_here();

    let memory_index = if matches!(parser.peek_kind(), Some(TokenKind::Number(_))) {
        let v = parser.expect_u32()?;
        MemIndexLiteral { value: v, loc }
    } else {
        MemIndexLiteral::zero()
    };

    parser.expect_open_paren()?;
    let offset = parse_instruction(parser)?;

    let mut values = Vec::new();
    while let Some(TokenKind::String(_)) = parser.peek_kind() {
        let (raw, rloc) = parser.expect_string()?;
        values.extend(strings::decode(&raw).map_err(|e| ParseError::syntax(parser.source, Some(rloc), e.0))?);
    }
    parser.expect_close_paren()?;

    Ok(data(memory_index, offset, ByteArray { values, loc }, loc))
}

fn parse_elem(parser: &mut Parser) -> Result<Elem, ParseError> {
    let loc = parser.loc_here();

    let table_index = if matches!(parser.peek_kind(), Some(TokenKind::Number(_)) | Some(TokenKind::Identifier(_))) {
        parser.parse_index()?
    } else {
        Index::Num(NumberLiteral::new(NumericValue::Int(0), "0", None))
    };

    parser.expect_open_paren()?;
    let offset = vec![parse_instruction(parser)?];

    let mut funcs = Vec::new();
    while !parser.at_close_paren() {
        funcs.push(parser.parse_index()?);
    }
    parser.expect_close_paren()?;

    Ok(elem(table_index, offset, funcs, loc))
}

fn parse_start(parser: &mut Parser) -> Result<Start, ParseError> {
    let loc = parser.loc_here();
    let index = parser.parse_index()?;
    parser.expect_close_paren()?;
    Ok(start(index, loc))
}

fn parse_type(parser: &mut Parser) -> Result<TypeInstruction, ParseError> {
    let loc = parser.loc_here();
    let id = parser.eat_identifier();

    parser.expect_open_paren()?;
    parser.expect_keyword("func")?;
    let signature = crate::parser::func::parse_inline_signature(parser)?;
    parser.expect_close_paren()?;
    parser.expect_close_paren()?;

    Ok(type_instruction(id, signature, loc))
}
