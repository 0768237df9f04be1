//! Regions, blocks and block argument lists.

use strata_ir::{BlockArgData, BlockData, BlockRef, RegionData, RegionRef};

use super::{Argument, Delimiter, OperationParser};
use crate::diagnostic::{Diagnostic, ParseResult};
use crate::lexer::TokenKind;

impl OperationParser<'_> {
    /// `region ::= '{' region-body? '}'`
    ///
    /// `arguments` become the entry block's arguments when they are named.
    /// An `isolated` region cannot see values defined outside of it.
    pub(crate) fn parse_region(
        &mut self,
        arguments: &[Argument],
        isolated: bool,
    ) -> ParseResult<RegionRef> {
        let open = self.token.span;
        self.expect(TokenKind::LBrace, "expected '{' to begin a region")?;
        let region = self.ctx.create_region(RegionData {
            location: self.location(open),
            blocks: Default::default(),
            parent_op: None,
        });

        if !arguments.is_empty() || !self.token.is(TokenKind::RBrace) {
            self.parse_region_body(region, arguments, isolated)?;
        }
        // The body stops only at '}'.
        self.expect(TokenKind::RBrace, "expected '}' to end region")?;
        Ok(region)
    }

    fn parse_region_body(
        &mut self,
        region: RegionRef,
        arguments: &[Argument],
        isolated: bool,
    ) -> ParseResult<()> {
        let saved_insertion = self.insertion;
        self.symbols.push_scope(isolated);
        tracing::debug!(depth = self.symbols.depth(), isolated, "Entered region");

        let entry_location = self.location(self.token.span);
        let entry = self.ctx.create_block(BlockData::new(entry_location));

        let has_named_arguments = arguments.first().is_some_and(|a| !a.name.name.is_empty());
        if has_named_arguments {
            if self.token.is(TokenKind::CaretIdent) {
                return Err(self.error("invalid block name in region with named arguments"));
            }
            for argument in arguments {
                let name = &argument.name;
                if let Some(previous) = self.symbols.reference_span(&name.name, name.number) {
                    return Err(Diagnostic::error(
                        name.span,
                        format!("region entry argument '{}' is already in use", name.name),
                    )
                    .with_note(previous, "previously referenced here")
                    .into());
                }
                let Some(ty) = argument.ty else {
                    return Err(self.error_at(
                        name.span,
                        format!("region entry argument '{}' has no type", name.name),
                    ));
                };
                let location = argument
                    .location
                    .unwrap_or_else(|| self.location(name.span));
                let mut data = BlockArgData::new(ty, location);
                data.attrs = argument.attrs.iter().cloned().collect();
                let value = self.ctx.add_block_arg(entry, data);
                self.add_definition(name, value)?;
            }
        }

        let entry = self.parse_block(Some(entry))?;
        if !arguments.is_empty() && self.ctx.block_args(entry).len() > arguments.len() {
            return Err(self.error("entry block arguments were already defined"));
        }
        self.ctx.append_block(region, entry);

        while !self.token.is(TokenKind::RBrace) {
            let block = self.parse_block(None)?;
            self.ctx.append_block(region, block);
        }

        self.symbols.pop_scope(self.ctx, self.top_region)?;
        tracing::debug!(depth = self.symbols.depth(), "Left region");
        self.insertion = saved_insertion;
        Ok(())
    }

    /// `block ::= block-label? operation*`
    ///
    /// The label is optional only for an entry block passed in as `existing`.
    fn parse_block(&mut self, existing: Option<BlockRef>) -> ParseResult<BlockRef> {
        if let Some(block) = existing {
            if !self.token.is(TokenKind::CaretIdent) {
                self.parse_block_body(block)?;
                return Ok(block);
            }
        }

        let label = self.token;
        if !label.is(TokenKind::CaretIdent) {
            return Err(self.wrong_token_error("expected block name"));
        }
        self.consume();
        let block = self
            .symbols
            .define_block(self.ctx, label.text, label.span, existing)?;
        self.ctx.block_mut(block).location = self.location(label.span);

        if self.token.is(TokenKind::LParen) {
            self.parse_block_arg_list(block)?;
        }
        self.expect(TokenKind::Colon, "expected ':' after block name")?;
        self.parse_block_body(block)?;
        Ok(block)
    }

    /// `'(' ssa-id ':' type loc? (',' ssa-id ':' type loc?)* ')'`
    ///
    /// A block that already has arguments (an entry block given typed
    /// arguments by its operation) only gets names bound to them.
    fn parse_block_arg_list(&mut self, block: BlockRef) -> ParseResult<()> {
        let defining_existing = !self.ctx.block_args(block).is_empty();
        let mut next = 0usize;

        self.parse_comma_separated_list(Delimiter::Paren, "", |p| {
            let (operand, ty) = p.parse_ssa_def_or_use_and_type()?;
            let (value, index) = if defining_existing {
                let Some(&value) = p.ctx.block_args(block).get(next) else {
                    return Err(p.error("too many arguments specified in argument list"));
                };
                if p.ctx.value_ty(value) != ty {
                    return Err(p.error("argument and block argument type mismatch"));
                }
                next += 1;
                (value, next - 1)
            } else {
                let location = p.location(operand.span);
                let value = p.ctx.add_block_arg(block, BlockArgData::new(ty, location));
                (value, p.ctx.block_args(block).len() - 1)
            };

            if let Some(location) = p.parse_optional_location_specifier()? {
                p.ctx.block_mut(block).args[index].location = location;
            }
            p.add_definition(&operand, value)
        })
    }

    /// Operations up to the next block label or the end of the region.
    fn parse_block_body(&mut self, block: BlockRef) -> ParseResult<()> {
        let saved_insertion = self.insertion;
        self.insertion = block;
        while !matches!(self.token.kind, TokenKind::CaretIdent | TokenKind::RBrace) {
            self.parse_operation()?;
        }
        self.insertion = saved_insertion;
        Ok(())
    }
}
