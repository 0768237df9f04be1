//! Structural checks on a parsed graph.
//!
//! The parser already guarantees that every name resolved. What remains
//! is what only the registry knows: terminator placement, unregistered
//! operations in dialects that forbid them, and successor scoping.

use strata_ir::walk::collect_ops;
use strata_ir::{BlockRef, IrContext, OpRef};

use crate::diagnostic::{Diagnostic, ParseResult};
use crate::registry::DialectRegistry;

/// Verify every operation nested under `block`.
pub fn verify_block(ctx: &IrContext, registry: &DialectRegistry, block: BlockRef) -> ParseResult<()> {
    let mut diagnostics = Vec::new();
    for op in collect_ops(ctx, block) {
        verify_op(ctx, registry, op, &mut diagnostics);
    }
    if diagnostics.is_empty() {
        return Ok(());
    }
    tracing::debug!(errors = diagnostics.len(), "Verification failed");
    Err(diagnostics.into())
}

fn verify_op(ctx: &IrContext, registry: &DialectRegistry, op: OpRef, diagnostics: &mut Vec<Diagnostic>) {
    let data = ctx.op(op);
    let full_name = data.full_name();
    let span = data.location.span();

    for (index, &operand) in ctx.op_operands(op).iter().enumerate() {
        if ctx.is_placeholder(operand) {
            diagnostics.push(Diagnostic::error(
                span,
                format!("'{full_name}' op operand #{index} does not have a definition"),
            ));
        }
    }

    let parent_region = data.parent_block.and_then(|b| ctx.block(b).parent_region);
    for &successor in &data.successors {
        if ctx.block(successor).parent_region != parent_region {
            diagnostics.push(Diagnostic::error(
                span,
                format!("'{full_name}' op successor references a block in a different region"),
            ));
        }
    }

    match registry.op_definition(&full_name) {
        Some(definition) => {
            if definition.traits.is_terminator {
                let is_last = data
                    .parent_block
                    .is_none_or(|b| ctx.block(b).ops.last() == Some(&op));
                if !is_last {
                    diagnostics.push(Diagnostic::error(
                        span,
                        format!("'{full_name}' op must be the last operation in the parent block"),
                    ));
                }
            }
        }
        None => {
            let namespace = full_name.split('.').next().unwrap_or_default();
            let forbids_unknown = registry
                .loaded_dialect(namespace)
                .is_some_and(|dialect| !dialect.allows_unknown_operations());
            if forbids_unknown {
                diagnostics.push(Diagnostic::error(
                    span,
                    format!(
                        "unregistered operation '{full_name}' found in dialect ('{namespace}') that does not allow unknown operations"
                    ),
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_ir::{BlockData, Location, OperationDataBuilder};

    fn push(ctx: &mut IrContext, block: BlockRef, name: &str) -> OpRef {
        let data = OperationDataBuilder::named(Location::Unknown, name).build(ctx);
        let op = ctx.create_op(data);
        ctx.push_op(block, op);
        op
    }

    fn messages(result: ParseResult<()>) -> Vec<String> {
        match result {
            Ok(()) => Vec::new(),
            Err(err) => err.diagnostics.iter().map(|d| d.message.clone()).collect(),
        }
    }

    #[test]
    fn terminator_must_end_block() {
        let mut ctx = IrContext::new();
        let mut registry = DialectRegistry::with_builtin_dialects();
        registry.load_dialect("func");
        let block = ctx.create_block(BlockData::new(Location::Unknown));
        push(&mut ctx, block, "func.return");
        push(&mut ctx, block, "func.return");

        assert_eq!(
            messages(verify_block(&ctx, &registry, block)),
            vec!["'func.return' op must be the last operation in the parent block"]
        );
    }

    #[test]
    fn unknown_op_in_loaded_dialect_is_rejected() {
        let mut ctx = IrContext::new();
        let mut registry = DialectRegistry::with_builtin_dialects();
        registry.load_dialect("arith");
        let block = ctx.create_block(BlockData::new(Location::Unknown));
        push(&mut ctx, block, "arith.frobnicate");
        push(&mut ctx, block, "unloaded.op");

        assert_eq!(
            messages(verify_block(&ctx, &registry, block)),
            vec![
                "unregistered operation 'arith.frobnicate' found in dialect ('arith') that does not allow unknown operations"
            ]
        );
    }
}
