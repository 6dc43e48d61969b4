//! Instruction parsing: folded and plain notation, structured instructions,
//! and the operand-reading logic driven by the opcode signature table.

use std::collections::BTreeMap;

use crate::ast::build::{
    block_instruction, call_indirect_instruction, call_instruction, if_instruction, loop_instruction,
    plain_instr,
};
use crate::ast::{Instruction, NumberLiteral, Operand, ValueType};
use crate::error::ParseError;
use crate::lexer::TokenKind;
use crate::parser::cursor::Parser;
use crate::parser::func::parse_signature_or_typeuse;
use crate::parser::signatures::{self, Arity, OperandKind};

/// Reads one instruction in whichever notation the cursor is sitting at.
pub fn parse_instruction(parser: &mut Parser) -> Result<Instruction, ParseError> {
    if parser.at_open_paren() {
        if parser.at_open_paren_keyword("block") {
            parser.bump();
            return parse_block(parser);
        }
        if parser.at_open_paren_keyword("loop") {
            parser.bump();
            return parse_loop(parser);
        }
        if parser.at_open_paren_keyword("if") {
            parser.bump();
            return parse_if(parser);
        }
        parser.bump();
        parse_op_instruction(parser, true)
    } else {
        parse_op_instruction(parser, false)
    }
}

pub fn parse_instruction_sequence_until_close(parser: &mut Parser) -> Result<Vec<Instruction>, ParseError> {
    let mut body = Vec::new();
    while !parser.at_close_paren() {
        body.push(parse_instruction(parser)?);
    }
    Ok(body)
}

fn parse_optional_result(parser: &mut Parser) -> Result<Option<ValueType>, ParseError> {
    if parser.at_open_paren_keyword("result") {
        parser.bump();
        parser.bump();
        let (ty, _) = parser.expect_valtype()?;
        parser.expect_close_paren()?;
        Ok(Some(ty))
    } else {
        Ok(None)
    }
}

fn parse_block(parser: &mut Parser) -> Result<Instruction, ParseError> {
    let loc = parser.expect_keyword("block")?;
    let label = parser.identifier_or_generated("block");
    let result = parse_optional_result(parser)?;
    let instr = parse_instruction_sequence_until_close(parser)?;
    parser.expect_close_paren()?;
    Ok(block_instruction(label, instr, result, Some(loc)))
}

fn parse_loop(parser: &mut Parser) -> Result<Instruction, ParseError> {
    let loc = parser.expect_keyword("loop")?;
    let label = parser.identifier_or_generated("loop");
    let result = parse_optional_result(parser)?;
    let instr = parse_instruction_sequence_until_close(parser)?;
    parser.expect_close_paren()?;
    Ok(loop_instruction(label, instr, result, Some(loc)))
}

fn parse_if(parser: &mut Parser) -> Result<Instruction, ParseError> {
    let loc = parser.expect_keyword("if")?;
    let label = parser.identifier_or_generated("if");
    let result = parse_optional_result(parser)?;

    let mut test = Vec::new();
    while parser.at_open_paren() && !parser.at_open_paren_keyword("then") {
        test.push(parse_instruction(parser)?);
    }

    if !parser.at_open_paren_keyword("then") {
        return Err(parser.error("expected a '(then ...)' clause in 'if'"));
    }
    parser.bump();
    parser.bump();
    let consequent = parse_instruction_sequence_until_close(parser)?;
    parser.expect_close_paren()?;

    let alternate = if parser.at_open_paren_keyword("else") {
        parser.bump();
        parser.bump();
        let body = parse_instruction_sequence_until_close(parser)?;
        parser.expect_close_paren()?;
        body
    } else {
        Vec::new()
    };

    parser.expect_close_paren()?;
    Ok(if_instruction(label, test, result, consequent, alternate, Some(loc)))
}

/// Reads the opcode name for a plain/folded instruction: either a bare
/// `name`/`keyword`-as-name token, or a dotted `<valtype>.<name>` pair.
fn read_op(parser: &mut Parser) -> Result<(Option<ValueType>, String), ParseError> {
    match parser.peek_kind().cloned() {
        Some(TokenKind::Valtype(ty)) => {
            parser.bump();
            if !matches!(parser.peek_kind(), Some(TokenKind::Dot)) {
                return Err(parser.error("expected '.' after a valtype prefix"));
            }
            parser.bump();
            match parser.peek_kind().cloned() {
                Some(TokenKind::Name(name)) => {
                    parser.bump();
                    let object = ValueType::parse(&ty);
                    Ok((object, name))
                }
                _ => Err(parser.error("expected an opcode name after '.'")),
            }
        }
        Some(TokenKind::Name(name)) => {
            parser.bump();
            Ok((None, name))
        }
        Some(TokenKind::Keyword(name)) => {
            parser.bump();
            Ok((None, name))
        }
        _ => Err(parser.error("expected an instruction")),
    }
}

fn read_named_args(parser: &mut Parser) -> Result<BTreeMap<String, NumberLiteral>, ParseError> {
    let mut named_args = BTreeMap::new();

    loop {
        match (parser.peek_kind(), parser.peek_at_kind(1)) {
            (Some(TokenKind::Name(name)), Some(TokenKind::Equal)) => {
                let name = name.clone();
                parser.bump();
                parser.bump();
                let value = parser.expect_number_literal()?;
                named_args.insert(name, value);
            }
            _ => break,
        }
    }

    Ok(named_args)
}

fn parse_operand(parser: &mut Parser, literal_type: Option<ValueType>) -> Result<Operand, ParseError> {
    if parser.at_open_paren() {
        parser.bump();
        let nested = if parser.at_keyword("block") {
            parse_block(parser)?
        } else if parser.at_keyword("loop") {
            parse_loop(parser)?
        } else if parser.at_keyword("if") {
            parse_if(parser)?
        } else {
            parse_op_instruction(parser, true)?
        };
        Ok(Operand::Nested(Box::new(nested)))
    } else {
        let mut literal = parser.expect_number_literal()?;
        if let Some(ty) = literal_type {
            literal = literal.with_type(ty);
        }
        Ok(Operand::Literal(literal))
    }
}

fn read_operands(
    parser: &mut Parser,
    signature: Option<signatures::OpcodeSignature>,
    folded: bool,
) -> Result<Vec<Operand>, ParseError> {
    let Some(signature) = signature else {
        return Ok(Vec::new());
    };

    let literal_type = match signature.operand {
        OperandKind::Literal(ty) => ty,
        OperandKind::Stack => None,
    };

    let mut args = Vec::new();
    match signature.arity {
        Arity::Immediate(n) => {
            for _ in 0..n {
                args.push(parse_operand(parser, literal_type)?);
            }
        }
        Arity::Stack(n) => {
            if folded {
                for _ in 0..n {
                    args.push(parse_operand(parser, literal_type)?);
                }
            }
        }
        Arity::OptionalInit => {
            args.push(parse_operand(parser, literal_type)?);
            let has_init = if folded {
                !parser.at_close_paren()
            } else {
                parser.at_open_paren()
            };
            if has_init {
                args.push(parse_operand(parser, literal_type)?);
            }
        }
    }

    Ok(args)
}

/// Whether the cursor sits at a token `br_table`'s target list can still
/// consume: a bare numeral or a `$name` label reference.
fn at_index_token(parser: &Parser) -> bool {
    matches!(parser.peek_kind(), Some(TokenKind::Number(_)) | Some(TokenKind::Identifier(_)))
}

fn parse_call_like(parser: &mut Parser, folded: bool) -> Result<Vec<Instruction>, ParseError> {
    if !folded {
        return Ok(Vec::new());
    }
    let args = parse_instruction_sequence_until_close(parser)?;
    parser.expect_close_paren()?;
    Ok(args)
}

fn parse_op_instruction(parser: &mut Parser, folded: bool) -> Result<Instruction, ParseError> {
    let loc = parser.loc_here();
    let (object, name) = read_op(parser)?;

    if name == "call" {
        let index = parser.parse_index()?;
        let instr_args = parse_call_like(parser, folded)?;
        return Ok(call_instruction(index, instr_args, loc));
    }

    if name == "call_indirect" {
        let signature = parse_signature_or_typeuse(parser)?;
        let instr_args = parse_call_like(parser, folded)?;
        return Ok(call_indirect_instruction(signature, instr_args, loc));
    }

    if name == "br" {
        let target = parser.parse_index()?;
        let args = vec![Operand::Label(target)];
        if folded {
            parser.expect_close_paren()?;
        }
        return plain_instr(name, object, args, BTreeMap::new(), loc)
            .map_err(|e| ParseError::syntax(parser.source, loc, e.to_string()));
    }

    if name == "br_if" {
        let target = parser.parse_index()?;
        let mut args = vec![Operand::Label(target)];
        // The condition is implicit (top of stack) in plain notation but
        // may be written as a second, inline folded operand.
        let has_condition = if folded {
            !parser.at_close_paren()
        } else {
            parser.at_open_paren()
        };
        if has_condition {
            args.push(parse_operand(parser, Some(ValueType::I32))?);
        }
        if folded {
            parser.expect_close_paren()?;
        }
        return plain_instr(name, object, args, BTreeMap::new(), loc)
            .map_err(|e| ParseError::syntax(parser.source, loc, e.to_string()));
    }

    if name == "br_table" {
        let mut args = vec![Operand::Label(parser.parse_index()?)];
        while at_index_token(parser) {
            args.push(Operand::Label(parser.parse_index()?));
        }
        // The selector is implicit (top of stack) in plain notation but
        // may also be written as a trailing, inline folded operand.
        let has_selector = if folded {
            !parser.at_close_paren()
        } else {
            parser.at_open_paren()
        };
        if has_selector {
            args.push(parse_operand(parser, Some(ValueType::I32))?);
        }
        if folded {
            parser.expect_close_paren()?;
        }
        return plain_instr(name, object, args, BTreeMap::new(), loc)
            .map_err(|e| ParseError::syntax(parser.source, loc, e.to_string()));
    }

    let mut args = Vec::new();
    if name == "return" && parser.at_open_paren() {
        args.push(parse_operand(parser, None)?);
    }

    let named_args = read_named_args(parser)?;
    let signature = signatures::lookup(object, &name);
    args.extend(read_operands(parser, signature, folded)?);

    if folded {
        parser.expect_close_paren()?;
    }

    plain_instr(name, object, args, named_args, loc)
        .map_err(|e| ParseError::syntax(parser.source, loc, e.to_string()))
}
