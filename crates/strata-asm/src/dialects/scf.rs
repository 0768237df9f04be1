//! Structured control flow.

use crate::diagnostic::ParseResult;
use crate::parser::CustomOpParser;
use crate::registry::{Dialect, OpDefinition};
use crate::state::OperationState;

use super::parse_terminator_operands;

pub(super) fn dialect() -> Dialect {
    Dialect::new("scf")
        .with_op(OpDefinition::new("for").with_parser(parse_for))
        .with_op(OpDefinition::new("if").with_parser(parse_if))
        .with_op(
            OpDefinition::new("yield")
                .terminator()
                .with_parser(parse_terminator_operands),
        )
}

/// ```text
/// for %iv = %lb to %ub step %step
///     (iter_args(%arg = %init, ...) -> (types))? (':' type)? region attr-dict
/// ```
///
/// Bounds and initial values are resolved after the body so that a use of
/// a value defined inside the body is caught as undefined.
fn parse_for(parser: &mut CustomOpParser<'_, '_>, state: &mut OperationState) -> ParseResult<()> {
    let mut arguments = vec![parser.parse_argument(false, false)?];
    parser.parse_equal()?;
    let lower = parser.parse_operand()?;
    parser.parse_keyword("to")?;
    let upper = parser.parse_operand()?;
    parser.parse_keyword("step")?;
    let step = parser.parse_operand()?;

    let mut inits = Vec::new();
    if parser.parse_optional_keyword("iter_args") {
        let (iter_args, operands) = parser.parse_assignment_list()?;
        arguments.extend(iter_args);
        inits = operands;
        state.result_types = parser.parse_arrow_type_list()?;
    }
    if arguments.len() != state.result_types.len() + 1 {
        return Err(parser.emit_error(
            parser.name_span(),
            "mismatch in number of loop-carried values and defined values",
        ));
    }

    let ty = if parser.parse_optional_colon() {
        parser.parse_type()?
    } else {
        parser.types().index()
    };
    arguments[0].ty = Some(ty);
    for (argument, &result) in arguments[1..].iter_mut().zip(&state.result_types) {
        argument.ty = Some(result);
    }

    let body = parser.parse_region(&arguments, false)?;
    state.regions.push(body);

    for bound in [&lower, &upper, &step] {
        let value = parser.resolve_operand(bound, ty)?;
        state.operands.push(value);
    }
    for (init, &result) in inits.iter().zip(&state.result_types) {
        let value = parser.resolve_operand(init, result)?;
        state.operands.push(value);
    }
    parser.parse_optional_attr_dict(&mut state.attributes)
}

/// `if %cond ('->' types)? region ('else' region)? attr-dict`
///
/// Always carries two regions; a missing else region is left empty.
fn parse_if(parser: &mut CustomOpParser<'_, '_>, state: &mut OperationState) -> ParseResult<()> {
    let condition = parser.parse_operand()?;
    let i1 = parser.types().int(1);
    let condition = parser.resolve_operand(&condition, i1)?;
    state.operands.push(condition);
    state.result_types = parser.parse_optional_arrow_type_list()?;

    let then_region = parser.parse_region(&[], false)?;
    let else_region = if parser.parse_optional_keyword("else") {
        parser.parse_region(&[], false)?
    } else {
        parser.empty_region()
    };
    state.regions.extend([then_region, else_region]);
    parser.parse_optional_attr_dict(&mut state.attributes)
}
