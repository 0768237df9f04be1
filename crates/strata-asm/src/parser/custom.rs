//! Custom operation syntax.
//!
//! An operation written with a bare name is handed to the parse function
//! registered for it (or to its dialect's fallback hook). That function sees
//! the parser only through [`CustomOpParser`], which exposes the token-level
//! helpers plus name resolution for operands, arguments, regions and
//! successors.

use strata_ir::{
    Attribute, BlockRef, Location, OpRef, RegionData, RegionRef, Span, Symbol, TypeInterner,
    TypeRef, ValueRef,
};

use super::operation::ResultGroup;
use super::{Delimiter, OperationParser};
use crate::diagnostic::{Diagnostic, ParseError, ParseResult};
use crate::lexer::TokenKind;
use crate::state::OperationState;
use crate::symbol_table::UnresolvedOperand;

/// A value-defining argument in custom syntax, such as a function
/// parameter `%arg0: i32 {attr} loc(...)` or a loop induction variable.
#[derive(Clone, Debug)]
pub struct Argument {
    pub name: UnresolvedOperand,
    /// Filled in by the parse function when the syntax does not spell it.
    pub ty: Option<TypeRef>,
    pub attrs: Vec<(Symbol, Attribute)>,
    pub location: Option<Location>,
}

impl OperationParser<'_> {
    /// `custom-op ::= bare-id custom-operation-format`
    pub(crate) fn parse_custom_operation(&mut self, groups: &[ResultGroup]) -> ParseResult<OpRef> {
        let name_token = self.consume();
        let original = name_token.text;
        let name_span = name_token.span;
        let full_name = self.resolve_custom_operation_name(original);
        let tried = if full_name != original {
            format!(" (tried '{full_name}' as well)")
        } else {
            String::new()
        };

        let definition = self.registry.op_definition(&full_name).copied();
        let namespace = full_name.split('.').next().unwrap_or_default();
        let Some(dialect) = self.registry.loaded_dialect(namespace) else {
            let available = self.registry.available_dialects().join(", ");
            return Err(Diagnostic::error(
                name_span,
                format!("Dialect `{namespace}' not found for custom op '{original}'{tried}"),
            )
            .with_note(name_span, format!("Registered dialects: {available}"))
            .into());
        };

        let hook = definition
            .and_then(|def| def.parser)
            .or_else(|| dialect.parse_operation_hook(&full_name));
        let Some(hook) = hook else {
            return Err(self.error_at(name_span, format!("custom op '{original}' is unknown{tried}")));
        };
        let is_isolated_from_above = definition.is_some_and(|def| def.traits.is_isolated_from_above);
        let default_dialect = definition.and_then(|def| def.default_dialect).unwrap_or("");

        tracing::debug!(op = %full_name, "Dispatching custom operation parser");
        let mut state = OperationState::new(full_name.clone(), self.location(name_span));
        self.default_dialects.push(default_dialect);
        let parsed = {
            let mut custom = CustomOpParser {
                parser: self,
                op_name: full_name,
                name_span,
                result_groups: groups.to_vec(),
                is_isolated_from_above,
            };
            hook(&mut custom, &mut state)
        };
        self.default_dialects.pop();
        parsed?;

        if let Some(duplicate) = state.find_duplicate_attribute() {
            return Err(self.error_at(
                name_span,
                format!(
                    "custom op '{}' attribute '{duplicate}' occurs more than once in the attribute list",
                    state.name
                ),
            ));
        }

        let op = self.create_operation(state);
        if let Some(location) = self.parse_optional_location_specifier()? {
            self.ctx.set_op_location(op, location);
        }
        Ok(op)
    }

    pub(crate) fn parse_argument(&mut self, allow_type: bool, allow_attrs: bool) -> ParseResult<Argument> {
        let name = self.parse_ssa_use(false)?;
        let ty = if allow_type {
            self.expect(TokenKind::Colon, "expected ':'")?;
            Some(self.parse_type()?)
        } else {
            None
        };
        let attrs = if allow_attrs && self.token.is(TokenKind::LBrace) {
            self.parse_attribute_dict()?
        } else {
            Vec::new()
        };
        let location = self.parse_optional_location_specifier()?;
        Ok(Argument {
            name,
            ty,
            attrs,
            location,
        })
    }

    /// Qualify `name` with the innermost default dialect when it has no
    /// namespace, and load the namespace so its operations are registered.
    fn resolve_custom_operation_name(&mut self, name: &str) -> String {
        if self.registry.operation_is_registered(name) {
            return name.to_owned();
        }
        let (dialect, full_name) = match name.split_once('.') {
            Some((dialect, _)) => (dialect.to_owned(), name.to_owned()),
            None => match self.default_dialects.last().copied().unwrap_or_default() {
                "" => (name.to_owned(), name.to_owned()),
                dialect => (dialect.to_owned(), format!("{dialect}.{name}")),
            },
        };
        self.registry.load_dialect(&dialect);
        full_name
    }
}

/// The view of the parser given to custom parse functions.
pub struct CustomOpParser<'p, 'a> {
    parser: &'p mut OperationParser<'a>,
    op_name: String,
    name_span: Span,
    result_groups: Vec<ResultGroup>,
    is_isolated_from_above: bool,
}

macro_rules! punctuation {
    ($($required:ident, $optional:ident => $kind:ident;)*) => {
        $(
            pub fn $required(&mut self) -> ParseResult<()> {
                let message = format!("expected '{}'", TokenKind::$kind.spelling());
                self.parser.expect(TokenKind::$kind, &message).map(|_| ())
            }

            pub fn $optional(&mut self) -> bool {
                self.parser.consume_if(TokenKind::$kind)
            }
        )*
    };
}

impl CustomOpParser<'_, '_> {
    // ========================================================================
    // Operation context
    // ========================================================================

    /// Full name of the operation being parsed.
    pub fn op_name(&self) -> &str {
        &self.op_name
    }

    pub fn name_span(&self) -> Span {
        self.name_span
    }

    /// Span of the next token.
    pub fn current_span(&self) -> Span {
        self.parser.token.span
    }

    /// Number of results bound on the left of `=`.
    pub fn num_results(&self) -> usize {
        self.result_groups.iter().map(|g| g.count as usize).sum()
    }

    /// Name (without `%`) and group index of result `index`.
    pub fn result_name(&self, index: usize) -> Option<(&str, usize)> {
        let mut remaining = index;
        for group in &self.result_groups {
            let count = group.count as usize;
            if remaining < count {
                return Some((&group.name[1..], remaining));
            }
            remaining -= count;
        }
        None
    }

    /// Error at `span`, prefixed with the operation name.
    pub fn emit_error(&self, span: Span, message: impl AsRef<str>) -> ParseError {
        self.parser.error_at(
            span,
            format!("custom op '{}' {}", self.op_name, message.as_ref()),
        )
    }

    pub fn types(&mut self) -> &mut TypeInterner {
        &mut self.parser.ctx.types
    }

    // ========================================================================
    // Tokens
    // ========================================================================

    punctuation! {
        parse_arrow, parse_optional_arrow => Arrow;
        parse_colon, parse_optional_colon => Colon;
        parse_comma, parse_optional_comma => Comma;
        parse_equal, parse_optional_equal => Equal;
        parse_less, parse_optional_less => Less;
        parse_greater, parse_optional_greater => Greater;
        parse_lbrace, parse_optional_lbrace => LBrace;
        parse_rbrace, parse_optional_rbrace => RBrace;
        parse_lparen, parse_optional_lparen => LParen;
        parse_rparen, parse_optional_rparen => RParen;
        parse_lsquare, parse_optional_lsquare => LSquare;
        parse_rsquare, parse_optional_rsquare => RSquare;
        parse_question, parse_optional_question => Question;
        parse_star, parse_optional_star => Star;
    }

    /// Parse `element (',' element)*` inside `delimiter`.
    pub fn parse_comma_separated_list(
        &mut self,
        delimiter: Delimiter,
        context: &str,
        mut element: impl FnMut(&mut Self) -> ParseResult<()>,
    ) -> ParseResult<()> {
        let closing = match delimiter.tokens() {
            None => None,
            Some((open, close, optional)) => {
                if optional && !self.parser.token.is(open) {
                    return Ok(());
                }
                let message = format!("expected '{}'{context}", open.spelling());
                self.parser.expect(open, &message)?;
                if self.parser.consume_if(close) {
                    return Ok(());
                }
                Some(close)
            }
        };

        element(self)?;
        while self.parser.consume_if(TokenKind::Comma) {
            element(self)?;
        }

        if let Some(close) = closing {
            let message = format!("expected '{}'{context}", close.spelling());
            self.parser.expect(close, &message)?;
        }
        Ok(())
    }

    pub fn parse_keyword(&mut self, keyword: &str) -> ParseResult<()> {
        if self.parse_optional_keyword(keyword) {
            return Ok(());
        }
        Err(self.emit_error(self.current_span(), format!("expected '{keyword}'")))
    }

    pub fn parse_optional_keyword(&mut self, keyword: &str) -> bool {
        self.parser.consume_keyword_if(keyword)
    }

    /// Any bare identifier, returned with its span.
    pub fn parse_optional_any_keyword(&mut self) -> Option<(String, Span)> {
        if !self.parser.token.is(TokenKind::BareIdent) {
            return None;
        }
        let token = self.parser.consume();
        Some((token.text.to_owned(), token.span))
    }

    /// `@name`, returning the name without the sigil.
    pub fn parse_symbol_name(&mut self) -> ParseResult<String> {
        match self.parse_optional_symbol_name() {
            Some(name) => Ok(name),
            None => Err(self.emit_error(
                self.current_span(),
                "expected valid '@'-identifier for symbol name",
            )),
        }
    }

    pub fn parse_optional_symbol_name(&mut self) -> Option<String> {
        if !self.parser.token.is(TokenKind::AtIdent) {
            return None;
        }
        Some(self.parser.consume().symbol_name())
    }

    // ========================================================================
    // Types and attributes
    // ========================================================================

    pub fn parse_type(&mut self) -> ParseResult<TypeRef> {
        self.parser.parse_type()
    }

    pub fn parse_colon_type(&mut self) -> ParseResult<TypeRef> {
        self.parse_colon()?;
        self.parse_type()
    }

    pub fn parse_colon_type_list(&mut self) -> ParseResult<Vec<TypeRef>> {
        self.parse_colon()?;
        self.parser.parse_type_list_no_parens()
    }

    /// `type (',' type)*` with no surrounding delimiter.
    pub fn parse_type_list(&mut self) -> ParseResult<Vec<TypeRef>> {
        self.parser.parse_type_list_no_parens()
    }

    /// `'->' (type | '(' type-list? ')')`, or nothing.
    pub fn parse_optional_arrow_type_list(&mut self) -> ParseResult<Vec<TypeRef>> {
        if !self.parse_optional_arrow() {
            return Ok(Vec::new());
        }
        self.parser.parse_function_result_types()
    }

    pub fn parse_arrow_type_list(&mut self) -> ParseResult<Vec<TypeRef>> {
        self.parse_arrow()?;
        self.parser.parse_function_result_types()
    }

    /// A function type, split into inputs and results.
    pub fn parse_function_type(&mut self) -> ParseResult<(Vec<TypeRef>, Vec<TypeRef>)> {
        let span = self.current_span();
        let ty = self.parser.parse_type()?;
        match self.parser.ctx.types.as_function(ty) {
            Some((inputs, results)) => Ok((inputs.to_vec(), results.to_vec())),
            None => Err(self.emit_error(span, "expected function type")),
        }
    }

    pub fn parse_attribute(&mut self) -> ParseResult<Attribute> {
        self.parser.parse_attribute()
    }

    /// `{...}` if present, appended to `attributes`.
    pub fn parse_optional_attr_dict(
        &mut self,
        attributes: &mut Vec<(Symbol, Attribute)>,
    ) -> ParseResult<()> {
        if self.parser.token.is(TokenKind::LBrace) {
            attributes.extend(self.parser.parse_attribute_dict()?);
        }
        Ok(())
    }

    /// `attributes {...}` if present, appended to `attributes`.
    pub fn parse_optional_attr_dict_with_keyword(
        &mut self,
        attributes: &mut Vec<(Symbol, Attribute)>,
    ) -> ParseResult<()> {
        if self.parse_optional_keyword("attributes") {
            attributes.extend(self.parser.parse_attribute_dict()?);
        }
        Ok(())
    }

    pub fn parse_optional_location_specifier(&mut self) -> ParseResult<Option<Location>> {
        self.parser.parse_optional_location_specifier()
    }

    // ========================================================================
    // Operands
    // ========================================================================

    pub fn parse_operand(&mut self) -> ParseResult<UnresolvedOperand> {
        self.parser.parse_ssa_use(true)
    }

    pub fn parse_optional_operand(&mut self) -> ParseResult<Option<UnresolvedOperand>> {
        if !self.parser.token.is(TokenKind::PercentIdent) {
            return Ok(None);
        }
        self.parse_operand().map(Some)
    }

    /// Operands inside `delimiter`. With `required`, the list must have
    /// exactly that many elements.
    pub fn parse_operand_list(
        &mut self,
        delimiter: Delimiter,
        required: Option<usize>,
    ) -> ParseResult<Vec<UnresolvedOperand>> {
        if delimiter == Delimiter::None && !self.parser.token.is(TokenKind::PercentIdent) {
            if required.unwrap_or(0) == 0 {
                return Ok(Vec::new());
            }
            if matches!(self.parser.token.kind, TokenKind::LParen | TokenKind::LSquare) {
                return Err(self.parser.error("unexpected delimiter"));
            }
            return Err(self.parser.wrong_token_error("expected operand"));
        }

        let start = self.current_span();
        let mut operands = Vec::new();
        self.parser
            .parse_comma_separated_list(delimiter, " in operand list", |p| {
                operands.push(p.parse_ssa_use(true)?);
                Ok(())
            })?;
        if let Some(required) = required {
            if operands.len() != required {
                return Err(self.emit_error(start, format!("expected {required} operands")));
            }
        }
        Ok(operands)
    }

    pub fn resolve_operand(&mut self, operand: &UnresolvedOperand, ty: TypeRef) -> ParseResult<ValueRef> {
        self.parser.resolve_ssa_use(operand, ty)
    }

    /// Resolve operands pairwise against `types`.
    pub fn resolve_operands(
        &mut self,
        operands: &[UnresolvedOperand],
        types: &[TypeRef],
        span: Span,
    ) -> ParseResult<Vec<ValueRef>> {
        if operands.len() != types.len() {
            return Err(self.emit_error(
                span,
                format!(
                    "{} operands present, but expected {}",
                    operands.len(),
                    types.len()
                ),
            ));
        }
        operands
            .iter()
            .zip(types)
            .map(|(operand, &ty)| self.resolve_operand(operand, ty))
            .collect()
    }

    // ========================================================================
    // Arguments
    // ========================================================================

    /// `ssa-id (':' type)? attr-dict? loc?`
    pub fn parse_argument(&mut self, allow_type: bool, allow_attrs: bool) -> ParseResult<Argument> {
        self.parser.parse_argument(allow_type, allow_attrs)
    }

    pub fn parse_optional_argument(
        &mut self,
        allow_type: bool,
        allow_attrs: bool,
    ) -> ParseResult<Option<Argument>> {
        if !self.parser.token.is(TokenKind::PercentIdent) {
            return Ok(None);
        }
        self.parse_argument(allow_type, allow_attrs).map(Some)
    }

    pub fn parse_argument_list(
        &mut self,
        delimiter: Delimiter,
        allow_type: bool,
        allow_attrs: bool,
    ) -> ParseResult<Vec<Argument>> {
        let mut arguments = Vec::new();
        if delimiter == Delimiter::None && !self.parser.token.is(TokenKind::PercentIdent) {
            return Ok(arguments);
        }
        self.parser
            .parse_comma_separated_list(delimiter, " in argument list", |p| {
                arguments.push(p.parse_argument(allow_type, allow_attrs)?);
                Ok(())
            })?;
        Ok(arguments)
    }

    /// `'(' (argument '=' operand (',' argument '=' operand)*)? ')'` if
    /// the next token is `(`.
    pub fn parse_optional_assignment_list(
        &mut self,
    ) -> ParseResult<Option<(Vec<Argument>, Vec<UnresolvedOperand>)>> {
        if !self.parse_optional_lparen() {
            return Ok(None);
        }
        let mut lhs = Vec::new();
        let mut rhs = Vec::new();
        self.parser
            .parse_comma_separated_list_until(TokenKind::RParen, true, |p| {
                lhs.push(p.parse_argument(false, false)?);
                p.expect(TokenKind::Equal, "expected '='")?;
                rhs.push(p.parse_ssa_use(true)?);
                Ok(())
            })?;
        Ok(Some((lhs, rhs)))
    }

    pub fn parse_assignment_list(&mut self) -> ParseResult<(Vec<Argument>, Vec<UnresolvedOperand>)> {
        match self.parse_optional_assignment_list()? {
            Some(lists) => Ok(lists),
            None => Err(self.parser.wrong_token_error("expected '('")),
        }
    }

    // ========================================================================
    // Regions and successors
    // ========================================================================

    /// Parse a region whose entry block takes `arguments`.
    ///
    /// Name shadowing lets arguments reuse names visible outside the
    /// region, which only makes sense when the region is isolated.
    pub fn parse_region(
        &mut self,
        arguments: &[Argument],
        enable_name_shadowing: bool,
    ) -> ParseResult<RegionRef> {
        if enable_name_shadowing && !self.is_isolated_from_above {
            return Err(self.emit_error(
                self.name_span,
                "name shadowing is only allowed on isolated regions",
            ));
        }
        self.parser
            .parse_region(arguments, self.is_isolated_from_above)
    }

    pub fn parse_optional_region(
        &mut self,
        arguments: &[Argument],
        enable_name_shadowing: bool,
    ) -> ParseResult<Option<RegionRef>> {
        if !self.parser.token.is(TokenKind::LBrace) {
            return Ok(None);
        }
        self.parse_region(arguments, enable_name_shadowing).map(Some)
    }

    /// A region with no blocks, for optional regions that were not written.
    pub fn empty_region(&mut self) -> RegionRef {
        let location = self.parser.location(self.name_span);
        self.parser.ctx.create_region(RegionData {
            location,
            blocks: Default::default(),
            parent_op: None,
        })
    }

    pub fn region_is_empty(&self, region: RegionRef) -> bool {
        self.parser.ctx.region(region).blocks.is_empty()
    }

    pub fn parse_successor(&mut self) -> ParseResult<BlockRef> {
        self.parser.parse_successor()
    }

    pub fn parse_optional_successor(&mut self) -> ParseResult<Option<BlockRef>> {
        if !self.parser.token.is(TokenKind::CaretIdent) {
            return Ok(None);
        }
        self.parse_successor().map(Some)
    }

    /// `caret-id ('(' ssa-use-list ':' type-list ')')?`
    pub fn parse_successor_and_use_list(&mut self) -> ParseResult<(BlockRef, Vec<ValueRef>)> {
        let block = self.parse_successor()?;
        let mut operands = Vec::new();
        if self.parse_optional_lparen() {
            operands = self.parser.parse_optional_ssa_use_and_type_list()?;
            self.parse_rparen()?;
        }
        Ok((block, operands))
    }
}
