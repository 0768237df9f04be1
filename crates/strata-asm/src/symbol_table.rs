//! Scoped name resolution for SSA values and blocks.
//!
//! Value names live in a stack of isolated scopes. Each isolated scope
//! holds one flat name map plus a stack of nested scopes recording which
//! names each nested scope defined, so popping a nested scope erases only
//! its own bindings. Block names get one map per region scope.
//!
//! A use of a name that is not yet bound creates a typed placeholder value.
//! The definition later replaces every use of the placeholder.

use std::collections::{HashMap, HashSet};

use smallvec::SmallVec;
use strata_ir::printer::print_type;
use strata_ir::{BlockData, BlockRef, IrContext, Location, RegionRef, Span, TypeRef, ValueRef};

use crate::diagnostic::{Diagnostic, ParseError, ParseResult};
use crate::forward_refs::ForwardRefs;

/// A reference to an SSA value as written: `%name` or `%name#number`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnresolvedOperand {
    /// Name including the `%` sigil.
    pub name: String,
    pub number: u32,
    pub span: Span,
}

impl UnresolvedOperand {
    pub fn new(name: impl Into<String>, number: u32, span: Span) -> Self {
        Self {
            name: name.into(),
            number,
            span,
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct ValueDefinition {
    value: ValueRef,
    /// Definition site, or first use for a placeholder.
    span: Span,
}

#[derive(Clone, Copy, Debug)]
struct BlockDefinition {
    block: BlockRef,
    span: Span,
}

#[derive(Debug, Default)]
struct IsolatedScope {
    /// Bound or forward-referenced result numbers per name, unordered.
    values: HashMap<String, SmallVec<[(u32, ValueDefinition); 1]>>,
    /// Names defined by each nested scope, innermost last.
    definitions_per_scope: Vec<HashSet<String>>,
}

impl IsolatedScope {
    fn slot(&self, name: &str, number: u32) -> Option<ValueDefinition> {
        self.values.get(name).and_then(|entries| find_slot(entries, number))
    }
}

fn find_slot(entries: &[(u32, ValueDefinition)], number: u32) -> Option<ValueDefinition> {
    entries
        .iter()
        .find(|(n, _)| *n == number)
        .map(|(_, def)| *def)
}

/// Scope stack for value and block names.
#[derive(Debug, Default)]
pub struct ScopedSymbolTable {
    isolated: Vec<IsolatedScope>,
    blocks: Vec<HashMap<String, BlockDefinition>>,
    forward_refs: ForwardRefs,
}

impl ScopedSymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn depth(&self) -> usize {
        self.blocks.len()
    }

    pub fn forward_refs(&self) -> &ForwardRefs {
        &self.forward_refs
    }

    /// Enter a region. An isolated scope hides every value name bound
    /// outside of it.
    pub fn push_scope(&mut self, isolated: bool) {
        self.blocks.push(HashMap::new());
        self.forward_refs.push_block_scope();
        if isolated || self.isolated.is_empty() {
            self.isolated.push(IsolatedScope::default());
        }
        if let Some(scope) = self.isolated.last_mut() {
            scope.definitions_per_scope.push(HashSet::new());
        }
        tracing::trace!(depth = self.blocks.len(), isolated, "Pushed name scope");
    }

    /// Leave a region.
    ///
    /// Blocks that were referenced but never defined are appended to
    /// `orphan_region` so they stay owned by the graph, then reported.
    /// Value placeholders are left alone; they may still be resolved by a
    /// later definition and are checked when the whole input is done.
    pub fn pop_scope(&mut self, ctx: &mut IrContext, orphan_region: RegionRef) -> ParseResult<()> {
        let undefined = self.forward_refs.pop_block_scope();
        if !undefined.is_empty() {
            let mut diagnostics = Vec::with_capacity(undefined.len());
            for (block, span) in undefined {
                ctx.append_block(orphan_region, block);
                diagnostics.push(Diagnostic::error(span, "reference to an undefined block"));
            }
            return Err(ParseError::from(diagnostics));
        }

        if let Some(scope) = self.isolated.last_mut() {
            if scope.definitions_per_scope.len() == 1 {
                self.isolated.pop();
            } else if let Some(defined) = scope.definitions_per_scope.pop() {
                for name in defined {
                    scope.values.remove(&name);
                }
            }
        }
        self.blocks.pop();
        tracing::trace!(depth = self.blocks.len(), "Popped name scope");
        Ok(())
    }

    /// Bind `operand` to `value`, resolving a pending forward reference.
    pub fn define_value(
        &mut self,
        ctx: &mut IrContext,
        operand: &UnresolvedOperand,
        value: ValueRef,
    ) -> ParseResult<()> {
        let Some(scope) = self.isolated.last_mut() else {
            return Err(Diagnostic::error(operand.span, "SSA value defined outside of any scope").into());
        };
        let entries = scope.values.entry(operand.name.clone()).or_default();
        let existing = find_slot(entries, operand.number);

        if let Some(existing) = existing {
            if !self.forward_refs.is_placeholder(existing.value) {
                return Err(Diagnostic::error(
                    operand.span,
                    format!("redefinition of SSA value '{}'", operand.name),
                )
                .with_note(existing.span, "previously defined here")
                .into());
            }

            let expected = ctx.value_ty(existing.value);
            let actual = ctx.value_ty(value);
            if expected != actual {
                return Err(Diagnostic::error(
                    operand.span,
                    format!(
                        "definition of SSA value '{}#{}' has type {}",
                        operand.name,
                        operand.number,
                        print_type(ctx, actual),
                    ),
                )
                .with_note(
                    existing.span,
                    format!("previously used here with type {}", print_type(ctx, expected)),
                )
                .into());
            }

            ctx.replace_all_uses(existing.value, value);
            self.forward_refs.resolve_value(existing.value);
        }

        let definition = ValueDefinition {
            value,
            span: operand.span,
        };
        match entries.iter_mut().find(|(n, _)| *n == operand.number) {
            Some(slot) => slot.1 = definition,
            None => entries.push((operand.number, definition)),
        }
        if let Some(defined) = scope.definitions_per_scope.last_mut() {
            defined.insert(operand.name.clone());
        }
        Ok(())
    }

    /// Resolve a use of `operand` with type `ty`, creating a placeholder if
    /// the name is not bound yet.
    pub fn lookup_or_forward(
        &mut self,
        ctx: &mut IrContext,
        operand: &UnresolvedOperand,
        ty: TypeRef,
    ) -> ParseResult<ValueRef> {
        let Some(scope) = self.isolated.last_mut() else {
            return Err(Diagnostic::error(operand.span, "SSA value used outside of any scope").into());
        };
        let entries = scope.values.entry(operand.name.clone()).or_default();

        if let Some(existing) = find_slot(entries, operand.number) {
            let existing_ty = ctx.value_ty(existing.value);
            if existing_ty == ty {
                return Ok(existing.value);
            }
            return Err(Diagnostic::error(
                operand.span,
                format!(
                    "use of value '{}' expects different type than prior uses: {} vs {}",
                    operand.name,
                    print_type(ctx, ty),
                    print_type(ctx, existing_ty),
                ),
            )
            .with_note(existing.span, "prior use here")
            .into());
        }

        // A real value for result 0 means the name is bound to an operation
        // that has fewer results than `number`.
        let bound = find_slot(entries, 0);
        if bound.is_some_and(|first| !self.forward_refs.is_placeholder(first.value)) {
            return Err(
                Diagnostic::error(operand.span, "reference to invalid result number").into(),
            );
        }

        let placeholder = ctx.create_placeholder(ty);
        self.forward_refs.record_value(placeholder, operand.span);
        entries.push((
            operand.number,
            ValueDefinition {
                value: placeholder,
                span: operand.span,
            },
        ));
        Ok(placeholder)
    }

    /// Span recorded for `name#number` if it is bound or forward referenced
    /// in the current isolated scope.
    pub fn reference_span(&self, name: &str, number: u32) -> Option<Span> {
        self.isolated.last()?.slot(name, number).map(|def| def.span)
    }

    /// Define the block labelled `name`.
    ///
    /// Returns the block created by an earlier forward reference, or
    /// `existing` (or a fresh block) when the name is new.
    pub fn define_block(
        &mut self,
        ctx: &mut IrContext,
        name: &str,
        span: Span,
        existing: Option<BlockRef>,
    ) -> ParseResult<BlockRef> {
        let Some(scope) = self.blocks.last_mut() else {
            return Err(Diagnostic::error(span, "block defined outside of any region").into());
        };

        match scope.get_mut(name) {
            None => {
                let block = existing
                    .unwrap_or_else(|| ctx.create_block(BlockData::new(Location::Unknown)));
                scope.insert(name.to_owned(), BlockDefinition { block, span });
                Ok(block)
            }
            Some(def) => {
                if !self.forward_refs.resolve_block(def.block) {
                    return Err(Diagnostic::error(span, format!("redefinition of block '{name}'"))
                        .with_note(def.span, "previously defined here")
                        .into());
                }
                def.span = span;
                // A forward reference already created the block; an entry
                // block handed in by the caller is dropped in its favour.
                Ok(def.block)
            }
        }
    }

    /// Look up the block labelled `name`, creating a forward reference on
    /// first use.
    pub fn lookup_block(&mut self, ctx: &mut IrContext, name: &str, span: Span) -> ParseResult<BlockRef> {
        let Some(scope) = self.blocks.last_mut() else {
            return Err(Diagnostic::error(span, "block referenced outside of any region").into());
        };
        if let Some(def) = scope.get(name) {
            return Ok(def.block);
        }
        let block = ctx.create_block(BlockData::new(Location::Unknown));
        scope.insert(name.to_owned(), BlockDefinition { block, span });
        self.forward_refs.record_block(block, span);
        Ok(block)
    }
}
