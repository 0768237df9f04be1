//! Accumulator for an operation that is still being parsed.

use strata_ir::{
    Attribute, BlockRef, IrContext, Location, OpRef, OperationDataBuilder, RegionRef, Symbol,
    TypeRef, ValueRef,
};

/// Collects the pieces of an operation before it is created in the
/// context. Custom parse functions fill one of these in.
#[derive(Clone, Debug, Default)]
pub struct OperationState {
    /// Fully qualified name, `dialect.op`.
    pub name: String,
    pub location: Location,
    pub operands: Vec<ValueRef>,
    pub result_types: Vec<TypeRef>,
    /// Attributes in the order they were added. Duplicates are kept so
    /// that the parser can report them.
    pub attributes: Vec<(Symbol, Attribute)>,
    pub regions: Vec<RegionRef>,
    pub successors: Vec<BlockRef>,
}

impl OperationState {
    pub fn new(name: impl Into<String>, location: Location) -> Self {
        Self {
            name: name.into(),
            location,
            ..Default::default()
        }
    }

    pub fn add_attribute(&mut self, name: impl Into<Symbol>, value: Attribute) {
        self.attributes.push((name.into(), value));
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value)
    }

    /// First attribute name that occurs more than once.
    pub fn find_duplicate_attribute(&self) -> Option<Symbol> {
        self.attributes.iter().enumerate().find_map(|(i, (key, _))| {
            self.attributes[..i]
                .iter()
                .any(|(prev, _)| prev == key)
                .then_some(*key)
        })
    }

    /// Create the operation in `ctx`. The caller attaches it to a block.
    pub fn create(self, ctx: &mut IrContext) -> OpRef {
        let mut builder = OperationDataBuilder::named(self.location, &self.name)
            .operands(self.operands)
            .results(self.result_types)
            .regions(self.regions)
            .successors(self.successors);
        for (key, value) in self.attributes {
            builder = builder.attr(key, value);
        }
        let data = builder.build(ctx);
        ctx.create_op(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_attribute_is_found() {
        let mut state = OperationState::new("test.op", Location::Unknown);
        state.add_attribute("a", Attribute::Unit);
        state.add_attribute("b", Attribute::Bool(true));
        assert_eq!(state.find_duplicate_attribute(), None);
        state.add_attribute("a", Attribute::Bool(false));
        assert_eq!(state.find_duplicate_attribute(), Some(Symbol::new("a")));
        assert_eq!(state.attribute("b"), Some(&Attribute::Bool(true)));
    }

    #[test]
    fn create_splits_dialect_from_name() {
        let mut ctx = IrContext::new();
        let i32_ty = ctx.types.int(32);
        let mut state = OperationState::new("test.op", Location::Unknown);
        state.result_types.push(i32_ty);
        state.add_attribute("flag", Attribute::Unit);

        let op = state.create(&mut ctx);
        let data = ctx.op(op);
        assert_eq!(data.dialect, "test");
        assert_eq!(data.name, "op");
        assert_eq!(ctx.op_result_types(op), &[i32_ty]);
        assert_eq!(data.attributes.get(&Symbol::new("flag")), Some(&Attribute::Unit));
    }
}
