//! Bookkeeping for values and blocks that were used before being defined.

use std::collections::HashMap;

use strata_ir::{BlockRef, Span, ValueRef};

/// Pending forward references.
///
/// Value placeholders are tracked for the whole parse because a use may be
/// resolved by any later definition in an enclosing scope. Block forward
/// references are scoped to the region whose body is being parsed.
#[derive(Debug, Default)]
pub struct ForwardRefs {
    placeholders: HashMap<ValueRef, Span>,
    blocks: Vec<HashMap<BlockRef, Span>>,
}

impl ForwardRefs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember that `placeholder` stands in for a value first used at `span`.
    pub fn record_value(&mut self, placeholder: ValueRef, span: Span) {
        self.placeholders.insert(placeholder, span);
    }

    /// Forget a placeholder once its definition has been seen.
    pub fn resolve_value(&mut self, placeholder: ValueRef) -> bool {
        self.placeholders.remove(&placeholder).is_some()
    }

    pub fn is_placeholder(&self, value: ValueRef) -> bool {
        self.placeholders.contains_key(&value)
    }

    pub fn has_unresolved_values(&self) -> bool {
        !self.placeholders.is_empty()
    }

    /// Outstanding placeholders ordered by where they were first used.
    pub fn unresolved_values(&self) -> Vec<(ValueRef, Span)> {
        let mut pending: Vec<_> = self.placeholders.iter().map(|(&v, &s)| (v, s)).collect();
        pending.sort_by_key(|&(_, span)| span.start);
        pending
    }

    pub fn push_block_scope(&mut self) {
        self.blocks.push(HashMap::new());
    }

    /// Close the innermost block scope, returning its unresolved blocks
    /// ordered by first use.
    pub fn pop_block_scope(&mut self) -> Vec<(BlockRef, Span)> {
        let mut pending: Vec<_> = self
            .blocks
            .pop()
            .unwrap_or_default()
            .into_iter()
            .collect();
        pending.sort_by_key(|&(_, span)| span.start);
        pending
    }

    pub fn record_block(&mut self, block: BlockRef, span: Span) {
        if let Some(scope) = self.blocks.last_mut() {
            scope.insert(block, span);
        }
    }

    /// Mark a forward-referenced block as defined. Returns false if the
    /// block was not a pending forward reference in the current scope.
    pub fn resolve_block(&mut self, block: BlockRef) -> bool {
        self.blocks
            .last_mut()
            .is_some_and(|scope| scope.remove(&block).is_some())
    }
}
