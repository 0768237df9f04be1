//! Integer and float arithmetic.

use strata_ir::{Attribute, TypeRef};

use crate::diagnostic::ParseResult;
use crate::parser::{CustomOpParser, Delimiter};
use crate::registry::{Dialect, OpDefinition, ParseAssemblyFn};
use crate::state::OperationState;

/// Operations written `op %lhs, %rhs attr-dict : type`.
const BINARY_OPS: &[&str] = &[
    "addi", "subi", "muli", "divsi", "divui", "remsi", "remui", "andi", "ori", "xori", "shli",
    "shrsi", "shrui", "addf", "subf", "mulf", "divf",
];

/// `cmpi` predicates in encoding order.
const CMPI_PREDICATES: &[&str] = &[
    "eq", "ne", "slt", "sle", "sgt", "sge", "ult", "ule", "ugt", "uge",
];

pub(super) fn dialect() -> Dialect {
    let dialect = Dialect::new("arith")
        .with_op(OpDefinition::new("constant").with_parser(parse_constant))
        .with_op(OpDefinition::new("cmpi").with_parser(parse_cmpi))
        .with_parse_hook(binary_op_parser);
    BINARY_OPS
        .iter()
        .fold(dialect, |dialect, &name| dialect.with_op(OpDefinition::new(name)))
}

/// The binary operations share one parser, handed out by name.
fn binary_op_parser(full_name: &str) -> Option<ParseAssemblyFn> {
    let name = full_name.strip_prefix("arith.")?;
    BINARY_OPS
        .contains(&name)
        .then_some(parse_binary as ParseAssemblyFn)
}

/// `constant attr-dict typed-attribute`
fn parse_constant(parser: &mut CustomOpParser<'_, '_>, state: &mut OperationState) -> ParseResult<()> {
    parser.parse_optional_attr_dict(&mut state.attributes)?;
    let span = parser.current_span();
    let value = parser.parse_attribute()?;
    let ty = match value {
        Attribute::TypedInt(_, ty) | Attribute::TypedFloat(_, ty) => ty,
        Attribute::Bool(_) => parser.types().int(1),
        _ => return Err(parser.emit_error(span, "invalid kind of attribute specified")),
    };
    state.add_attribute("value", value);
    state.result_types.push(ty);
    Ok(())
}

fn parse_binary(parser: &mut CustomOpParser<'_, '_>, state: &mut OperationState) -> ParseResult<()> {
    let span = parser.current_span();
    let operands = parser.parse_operand_list(Delimiter::None, Some(2))?;
    parser.parse_optional_attr_dict(&mut state.attributes)?;
    let ty = parser.parse_colon_type()?;
    state.operands = parser.resolve_operands(&operands, &[ty, ty], span)?;
    state.result_types.push(ty);
    Ok(())
}

/// `cmpi predicate, %lhs, %rhs attr-dict : type`
fn parse_cmpi(parser: &mut CustomOpParser<'_, '_>, state: &mut OperationState) -> ParseResult<()> {
    let span = parser.current_span();
    let predicate = parser
        .parse_optional_any_keyword()
        .and_then(|(keyword, _)| CMPI_PREDICATES.iter().position(|&p| p == keyword));
    let Some(predicate) = predicate else {
        return Err(parser.emit_error(
            span,
            format!(
                "expected 'predicate' to be one of: {}",
                CMPI_PREDICATES.join(", ")
            ),
        ));
    };
    parser.parse_comma()?;

    let operands_span = parser.current_span();
    let operands = parser.parse_operand_list(Delimiter::None, Some(2))?;
    parser.parse_optional_attr_dict(&mut state.attributes)?;
    let ty: TypeRef = parser.parse_colon_type()?;
    state.operands = parser.resolve_operands(&operands, &[ty, ty], operands_span)?;
    state.add_attribute("predicate", Attribute::from(predicate as i64));
    state.result_types.push(parser.types().int(1));
    Ok(())
}
