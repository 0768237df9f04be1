//! End-of-input checks and fixups.

use strata_ir::printer::print_attribute;
use strata_ir::walk::collect_ops;
use strata_ir::{Attribute, BlockRef, Location, Span};

use super::OperationParser;
use crate::diagnostic::{Diagnostic, ParseError, ParseResult};
use crate::verify::verify_block;

impl OperationParser<'_> {
    /// Reject unresolved names, resolve deferred locations, close the
    /// top-level scope and optionally verify.
    pub(crate) fn finalize(&mut self) -> ParseResult<()> {
        let unresolved = self.symbols.forward_refs().unresolved_values();
        if !unresolved.is_empty() {
            let diagnostics: Vec<_> = unresolved
                .into_iter()
                .map(|(_, span)| Diagnostic::error(span, "use of undeclared SSA value name"))
                .collect();
            return Err(diagnostics.into());
        }

        self.resolve_deferred_locations()?;
        self.symbols.pop_scope(self.ctx, self.top_region)?;

        if self.config.verify_after_parse {
            verify_block(self.ctx, self.registry, self.insertion)?;
        }
        tracing::debug!(
            ops = self.ctx.block(self.insertion).ops.len(),
            aliases = self.attribute_aliases.len() + self.type_aliases.len(),
            "Finished parsing"
        );
        Ok(())
    }

    fn resolve_deferred_locations(&mut self) -> ParseResult<()> {
        if self.deferred_locs.is_empty() {
            return Ok(());
        }
        for op in collect_ops(self.ctx, self.insertion) {
            if let Location::Deferred(index) = self.ctx.op(op).location {
                let location = self.resolve_deferred_location(index)?;
                self.ctx.set_op_location(op, location);
            }

            let blocks: Vec<BlockRef> = self
                .ctx
                .op(op)
                .regions
                .iter()
                .flat_map(|&region| self.ctx.region(region).blocks.iter().copied())
                .collect();
            for block in blocks {
                for index in 0..self.ctx.block(block).args.len() {
                    if let Location::Deferred(deferred) = self.ctx.block(block).args[index].location {
                        let location = self.resolve_deferred_location(deferred)?;
                        self.ctx.block_mut(block).args[index].location = location;
                    }
                }
            }
        }
        Ok(())
    }

    /// Follow a deferred alias reference to a concrete location. An alias
    /// may itself name another alias that was deferred.
    fn resolve_deferred_location(&self, mut index: u32) -> ParseResult<Location> {
        for _ in 0..=self.deferred_locs.len() {
            let deferred = &self.deferred_locs[index as usize];
            let location = match self.attribute_aliases.get(&deferred.alias) {
                Some(Attribute::Location(location)) => *location,
                Some(other) => {
                    return Err(self.alias_error(
                        deferred.span,
                        format!(
                            "expected location, but found '{}'",
                            print_attribute(self.ctx, other)
                        ),
                    ));
                }
                None => {
                    return Err(self.alias_error(
                        deferred.span,
                        "operation location alias was never defined",
                    ));
                }
            };
            match location {
                Location::Deferred(next) => index = next,
                resolved => return Ok(resolved),
            }
        }
        let span = self.deferred_locs[index as usize].span;
        Err(self.alias_error(span, "operation location alias was never defined"))
    }

    fn alias_error(&self, span: Span, message: impl Into<String>) -> ParseError {
        Diagnostic::error(span, message).into()
    }
}
