use strata_ir::Attribute;

use crate::diagnostic::ParseResult;
use crate::parser::CustomOpParser;
use crate::registry::{Dialect, OpDefinition};
use crate::state::OperationState;

pub(super) fn dialect() -> Dialect {
    Dialect::new("builtin").with_op(
        OpDefinition::new("module")
            .isolated_from_above()
            .default_dialect("builtin")
            .with_parser(parse_module),
    )
}

/// `module @name? (attributes {...})? region`
fn parse_module(parser: &mut CustomOpParser<'_, '_>, state: &mut OperationState) -> ParseResult<()> {
    if let Some(name) = parser.parse_optional_symbol_name() {
        state.add_attribute("sym_name", Attribute::String(name));
    }
    parser.parse_optional_attr_dict_with_keyword(&mut state.attributes)?;
    let body = parser.parse_region(&[], false)?;
    state.regions.push(body);
    Ok(())
}
