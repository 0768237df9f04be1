//! Functions, calls and returns.

use std::collections::BTreeMap;

use strata_ir::{Attribute, Symbol};

use super::parse_terminator_operands;
use crate::diagnostic::ParseResult;
use crate::parser::{Argument, CustomOpParser, Delimiter};
use crate::registry::{Dialect, OpDefinition};
use crate::state::OperationState;

/// Attributes derived from the function signature; they may not be
/// spelled in the explicit attribute dictionary.
const INFERRED_ATTRIBUTES: &[&str] = &["sym_visibility", "sym_name", "function_type"];

pub(super) fn dialect() -> Dialect {
    Dialect::new("func")
        .with_op(
            OpDefinition::new("func")
                .isolated_from_above()
                .default_dialect("func")
                .with_parser(parse_func),
        )
        .with_op(OpDefinition::new("call").with_parser(parse_call))
        .with_op(
            OpDefinition::new("return")
                .terminator()
                .with_parser(parse_terminator_operands),
        )
}

/// ```text
/// func ::= visibility? symbol-ref-id '(' argument-list ')'
///          ('->' function-result-list)? (`attributes` attr-dict)? region?
/// ```
///
/// Arguments are either all named (`%a: i32`) or all bare types.
fn parse_func(parser: &mut CustomOpParser<'_, '_>, state: &mut OperationState) -> ParseResult<()> {
    for visibility in ["private", "public", "nested"] {
        if parser.parse_optional_keyword(visibility) {
            state.add_attribute("sym_visibility", Attribute::from(visibility));
            break;
        }
    }
    let name = parser.parse_symbol_name()?;

    let mut arguments: Vec<Argument> = Vec::new();
    let mut named: Option<bool> = None;
    let mut input_types = Vec::new();
    let mut arg_attrs = Vec::new();
    parser.parse_comma_separated_list(Delimiter::Paren, "", |p| {
        match p.parse_optional_argument(true, true)? {
            Some(argument) => {
                if named == Some(false) {
                    return Err(p.emit_error(
                        argument.name.span,
                        "expected type instead of SSA identifier",
                    ));
                }
                named = Some(true);
                input_types.extend(argument.ty);
                arg_attrs.push(argument.attrs.clone());
                arguments.push(argument);
            }
            None => {
                if named == Some(true) {
                    return Err(p.emit_error(p.current_span(), "expected SSA identifier"));
                }
                named = Some(false);
                input_types.push(p.parse_type()?);
                let mut attrs = Vec::new();
                p.parse_optional_attr_dict(&mut attrs)?;
                p.parse_optional_location_specifier()?;
                arg_attrs.push(attrs);
            }
        }
        Ok(())
    })?;
    let result_types = parser.parse_optional_arrow_type_list()?;

    let dict_span = parser.current_span();
    let mut explicit = Vec::new();
    parser.parse_optional_attr_dict_with_keyword(&mut explicit)?;
    if let Some(inferred) = INFERRED_ATTRIBUTES
        .iter()
        .find(|&&name| explicit.iter().any(|(key, _)| *key == name))
    {
        return Err(parser.emit_error(
            dict_span,
            format!(
                "'{inferred}' is an inferred attribute and should not be specified in the explicit attribute dictionary"
            ),
        ));
    }

    let function_type = parser.types().function(input_types, result_types);
    state.add_attribute("sym_name", Attribute::String(name));
    state.add_attribute("function_type", Attribute::Type(function_type));
    state.attributes.extend(explicit);
    if arg_attrs.iter().any(|attrs| !attrs.is_empty()) {
        let dicts = arg_attrs
            .into_iter()
            .map(|attrs| Attribute::Dict(attrs.into_iter().collect::<BTreeMap<_, _>>()))
            .collect();
        state.add_attribute("arg_attrs", Attribute::List(dicts));
    }

    let body_span = parser.current_span();
    let entry_arguments = if named == Some(true) { arguments } else { Vec::new() };
    match parser.parse_optional_region(&entry_arguments, false)? {
        Some(body) => {
            if parser.region_is_empty(body) {
                return Err(parser.emit_error(body_span, "expected non-empty function body"));
            }
            state.regions.push(body);
        }
        None => state.regions.push(parser.empty_region()),
    }
    Ok(())
}

/// `call @callee '(' operands ')' attr-dict ':' function-type`
fn parse_call(parser: &mut CustomOpParser<'_, '_>, state: &mut OperationState) -> ParseResult<()> {
    let callee = parser.parse_symbol_name()?;
    let operands_span = parser.current_span();
    let operands = parser.parse_operand_list(Delimiter::Paren, None)?;
    parser.parse_optional_attr_dict(&mut state.attributes)?;
    parser.parse_colon()?;
    let (inputs, results) = parser.parse_function_type()?;

    state.operands = parser.resolve_operands(&operands, &inputs, operands_span)?;
    state.result_types = results;
    state.add_attribute("callee", Attribute::Symbol(Symbol::from_dynamic(&callee)));
    Ok(())
}
