use strata_ir::Attribute;

use crate::diagnostic::ParseResult;
use crate::parser::CustomOpParser;
use crate::registry::{Dialect, OpDefinition};
use crate::state::OperationState;

pub(super) fn dialect() -> Dialect {
    Dialect::new("cf")
        .with_op(OpDefinition::new("br").terminator().with_parser(parse_br))
        .with_op(
            OpDefinition::new("cond_br")
                .terminator()
                .with_parser(parse_cond_br),
        )
}

/// `br ^dest ('(' operands ':' types ')')? attr-dict`
fn parse_br(parser: &mut CustomOpParser<'_, '_>, state: &mut OperationState) -> ParseResult<()> {
    let (dest, operands) = parser.parse_successor_and_use_list()?;
    state.successors.push(dest);
    state.operands = operands;
    parser.parse_optional_attr_dict(&mut state.attributes)
}

/// `cond_br %cond, ^true(...)?, ^false(...)? attr-dict`
fn parse_cond_br(parser: &mut CustomOpParser<'_, '_>, state: &mut OperationState) -> ParseResult<()> {
    let condition = parser.parse_operand()?;
    let i1 = parser.types().int(1);
    let condition = parser.resolve_operand(&condition, i1)?;
    parser.parse_comma()?;
    let (true_dest, true_operands) = parser.parse_successor_and_use_list()?;
    parser.parse_comma()?;
    let (false_dest, false_operands) = parser.parse_successor_and_use_list()?;
    parser.parse_optional_attr_dict(&mut state.attributes)?;

    let segments = [1, true_operands.len(), false_operands.len()]
        .into_iter()
        .map(|n| Attribute::from(n as i64))
        .collect::<Vec<_>>();
    state.add_attribute("operand_segment_sizes", Attribute::List(segments));
    state.operands.push(condition);
    state.operands.extend(true_operands);
    state.operands.extend(false_operands);
    state.successors.extend([true_dest, false_dest]);
    Ok(())
}
