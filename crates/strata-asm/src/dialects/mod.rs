//! Dialects bundled with the parser.
//!
//! Each module exposes a constructor that the registry calls the first
//! time the namespace is seen. Parse functions only talk to the parser
//! through [`CustomOpParser`](crate::parser::CustomOpParser).

mod arith;
mod builtin;
mod cf;
mod func;
mod scf;

use crate::diagnostic::ParseResult;
use crate::parser::{CustomOpParser, Delimiter};
use crate::registry::DialectRegistry;
use crate::state::OperationState;

/// Make every bundled dialect available to `registry`.
pub fn register_all(registry: &mut DialectRegistry) {
    registry.register_dialect("arith", arith::dialect);
    registry.register_dialect("builtin", builtin::dialect);
    registry.register_dialect("cf", cf::dialect);
    registry.register_dialect("func", func::dialect);
    registry.register_dialect("scf", scf::dialect);
}

/// `attr-dict (ssa-use-list ':' type-list)?`, shared by the value
/// returning terminators.
fn parse_terminator_operands(
    parser: &mut CustomOpParser<'_, '_>,
    state: &mut OperationState,
) -> ParseResult<()> {
    parser.parse_optional_attr_dict(&mut state.attributes)?;
    let start = parser.current_span();
    let operands = parser.parse_operand_list(Delimiter::None, None)?;
    if operands.is_empty() {
        return Ok(());
    }
    let types = parser.parse_colon_type_list()?;
    state.operands = parser.resolve_operands(&operands, &types, start)?;
    Ok(())
}
