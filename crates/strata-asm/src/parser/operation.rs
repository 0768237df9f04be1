//! Operations in generic syntax, result groups and SSA value uses.

use strata_ir::{BlockRef, OpRef, Span, TypeRef, ValueRef};

use super::{Delimiter, OperationParser};
use crate::diagnostic::ParseResult;
use crate::lexer::TokenKind;
use crate::state::OperationState;
use crate::symbol_table::UnresolvedOperand;

/// One `%name` or `%name:N` entry on the left of `=`.
#[derive(Clone, Debug)]
pub(crate) struct ResultGroup {
    pub name: String,
    pub count: u32,
    pub span: Span,
}

impl OperationParser<'_> {
    /// `operation ::= (result-group (',' result-group)* '=')? (custom-op | generic-op)`
    pub(crate) fn parse_operation(&mut self) -> ParseResult<()> {
        let start = self.token.span;
        let mut groups = Vec::new();
        let mut expected_results = 0usize;

        if self.token.is(TokenKind::PercentIdent) {
            self.parse_comma_separated_list(Delimiter::None, "", |p| {
                let name = p.token;
                p.expect(TokenKind::PercentIdent, "expected valid ssa identifier")?;
                let mut count = 1;
                if p.consume_if(TokenKind::Colon) {
                    if !p.token.is(TokenKind::Integer) {
                        return Err(p.wrong_token_error("expected integer number of results"));
                    }
                    count = match p.token.int_value().and_then(|v| u32::try_from(v).ok()) {
                        Some(n) if n >= 1 => n,
                        _ => {
                            return Err(p.error("expected named operation to have at least 1 result"));
                        }
                    };
                    p.consume();
                }
                expected_results += count as usize;
                groups.push(ResultGroup {
                    name: name.text.to_owned(),
                    count,
                    span: name.span,
                });
                Ok(())
            })?;
            self.expect(TokenKind::Equal, "expected '=' after SSA name")?;
        }

        let op = match self.token.kind {
            TokenKind::BareIdent => self.parse_custom_operation(&groups)?,
            TokenKind::String => self.parse_generic_operation()?,
            _ => return Err(self.wrong_token_error("expected operation name in quotes")),
        };

        if groups.is_empty() {
            return Ok(());
        }
        let results = self.ctx.op_results(op).len();
        if results == 0 {
            return Err(self.error_at(start, "cannot name an operation with no results"));
        }
        if results != expected_results {
            return Err(self.error_at(
                start,
                format!(
                    "operation defines {results} results but was provided {expected_results} to bind"
                ),
            ));
        }

        let mut index = 0;
        for group in &groups {
            for number in 0..group.count {
                let value = self.ctx.op_result(op, index);
                let operand = UnresolvedOperand::new(group.name.as_str(), number, group.span);
                self.symbols.define_value(self.ctx, &operand, value)?;
                index += 1;
            }
        }
        Ok(())
    }

    /// `generic-op ::= string '(' ssa-uses? ')' successors? regions? attr-dict? ':' function-type`
    fn parse_generic_operation(&mut self) -> ParseResult<OpRef> {
        let name_token = self.token;
        let name = name_token.string_value();
        if name.is_empty() {
            return Err(self.error("empty operation name is invalid"));
        }
        if name.contains('\0') {
            return Err(self.error("null character not allowed in operation name"));
        }
        self.consume();

        let mut traits = self.registry.operation_traits(&name);
        if traits.is_none() {
            let dialect = name.split('.').next().unwrap_or_default();
            if self.registry.load_dialect(dialect) {
                traits = self.registry.operation_traits(&name);
            } else if !self.config.allow_unknown_dialects {
                return Err(self.error(
                    "operation being parsed with an unregistered dialect. If this is intended, \
                     please use -allow-unregistered-dialect with the MLIR tool used",
                ));
            }
        }

        let mut state = OperationState::new(name, self.location(name_token.span));

        self.expect(TokenKind::LParen, "expected '(' to start operand list")?;
        let operands = self.parse_optional_ssa_use_list()?;
        self.expect(TokenKind::RParen, "expected ')' to end operand list")?;

        if self.token.is(TokenKind::LSquare) {
            if traits.is_some_and(|t| !t.is_terminator) {
                return Err(self.error("successors in non-terminator"));
            }
            self.parse_comma_separated_list(Delimiter::Square, "", |p| {
                let block = p.parse_successor()?;
                state.successors.push(block);
                Ok(())
            })?;
        }

        if self.consume_if(TokenKind::LParen) {
            let isolated = traits.is_some_and(|t| t.is_isolated_from_above);
            loop {
                let region = self.parse_region(&[], isolated)?;
                state.regions.push(region);
                if !self.consume_if(TokenKind::Comma) {
                    break;
                }
            }
            self.expect(TokenKind::RParen, "expected ')' to end region list")?;
        }

        if self.token.is(TokenKind::LBrace) {
            state.attributes = self.parse_attribute_dict()?;
        }

        self.expect(TokenKind::Colon, "expected ':' followed by operation type")?;
        let type_span = self.token.span;
        let ty = self.parse_type()?;
        let Some((inputs, results)) = self
            .ctx
            .types
            .as_function(ty)
            .map(|(inputs, results)| (inputs.to_vec(), results.to_vec()))
        else {
            return Err(self.error_at(type_span, "expected function type"));
        };
        state.result_types = results;

        if inputs.len() != operands.len() {
            let plural = if operands.len() == 1 { "" } else { "s" };
            return Err(self.error_at(
                type_span,
                format!(
                    "expected {} operand type{plural} but had {}",
                    operands.len(),
                    inputs.len()
                ),
            ));
        }
        for (operand, &ty) in operands.iter().zip(&inputs) {
            let value = self.resolve_ssa_use(operand, ty)?;
            state.operands.push(value);
        }

        let op = self.create_operation(state);
        if let Some(location) = self.parse_optional_location_specifier()? {
            self.ctx.set_op_location(op, location);
        }
        Ok(op)
    }

    /// Create `state` and append it at the insertion point.
    pub(crate) fn create_operation(&mut self, state: OperationState) -> OpRef {
        tracing::trace!(op = %state.name, operands = state.operands.len(), "Built operation");
        let op = state.create(self.ctx);
        self.ctx.push_op(self.insertion, op);
        op
    }

    // ========================================================================
    // SSA uses
    // ========================================================================

    /// `ssa-use ::= '%' name ('#' number)?`
    pub(crate) fn parse_ssa_use(&mut self, allow_result_number: bool) -> ParseResult<UnresolvedOperand> {
        let token = self.token;
        self.expect(TokenKind::PercentIdent, "expected SSA operand")?;
        let mut operand = UnresolvedOperand::new(token.text, 0, token.span);

        if self.token.is(TokenKind::HashIdent) {
            if !allow_result_number {
                return Err(self.error("result number not allowed in argument list"));
            }
            let Some(number) = self.token.hash_number() else {
                return Err(self.error("invalid SSA value result number"));
            };
            operand.number = number;
            self.consume();
        }
        Ok(operand)
    }

    pub(crate) fn parse_optional_ssa_use_list(&mut self) -> ParseResult<Vec<UnresolvedOperand>> {
        let mut operands = Vec::new();
        if !self.token.is(TokenKind::PercentIdent) {
            return Ok(operands);
        }
        self.parse_comma_separated_list(Delimiter::None, "", |p| {
            operands.push(p.parse_ssa_use(true)?);
            Ok(())
        })?;
        Ok(operands)
    }

    /// `(ssa-use-list ':' type-list)?`, resolving each use.
    pub(crate) fn parse_optional_ssa_use_and_type_list(&mut self) -> ParseResult<Vec<ValueRef>> {
        let operands = self.parse_optional_ssa_use_list()?;
        if operands.is_empty() {
            return Ok(Vec::new());
        }
        self.expect(TokenKind::Colon, "expected ':' in operand list")?;
        let types = self.parse_type_list_no_parens()?;
        if types.len() != operands.len() {
            return Err(self.error(format!(
                "expected {} types to match operand list",
                operands.len()
            )));
        }
        operands
            .iter()
            .zip(types)
            .map(|(operand, ty)| self.resolve_ssa_use(operand, ty))
            .collect()
    }

    /// `ssa-use ':' type`, as used by block argument lists.
    pub(crate) fn parse_ssa_def_or_use_and_type(&mut self) -> ParseResult<(UnresolvedOperand, TypeRef)> {
        let operand = self.parse_ssa_use(false)?;
        self.expect(TokenKind::Colon, "expected ':' and type for SSA operand")?;
        let ty = self.parse_type()?;
        Ok((operand, ty))
    }

    pub(crate) fn resolve_ssa_use(&mut self, operand: &UnresolvedOperand, ty: TypeRef) -> ParseResult<ValueRef> {
        self.symbols.lookup_or_forward(self.ctx, operand, ty)
    }

    /// Bind `operand` to `value` in the current scope.
    pub(crate) fn add_definition(&mut self, operand: &UnresolvedOperand, value: ValueRef) -> ParseResult<()> {
        self.symbols.define_value(self.ctx, operand, value)
    }

    /// `successor ::= caret-id`
    pub(crate) fn parse_successor(&mut self) -> ParseResult<BlockRef> {
        if !self.token.is(TokenKind::CaretIdent) {
            return Err(self.wrong_token_error("expected block name"));
        }
        let token = self.consume();
        self.symbols.lookup_block(self.ctx, token.text, token.span)
    }
}
