//! Arena-based program graph: operations, blocks, regions and SSA values.
//!
//! All entities live in an [`IrContext`] and are addressed through small
//! copyable handles ([`OpRef`], [`ValueRef`], [`BlockRef`], [`RegionRef`]).
//! Use-chains are maintained on every mutation, which makes
//! replace-all-uses cheap enough to resolve forward references in place.

pub mod context;
pub mod location;
pub mod printer;
pub mod refs;
pub mod symbol;
pub mod types;
pub mod walk;

pub use context::{
    BlockArgData, BlockData, IrContext, OperationData, OperationDataBuilder, RegionData, Use,
    ValueData,
};
pub use location::{Span, Spanned};
pub use refs::{BlockRef, LocRef, OpRef, PathRef, RegionRef, TypeRef, ValueDef, ValueRef};
pub use symbol::Symbol;
pub use types::{
    Attribute, CompositeLocation, Location, LocationInterner, PathInterner, TypeData,
    TypeDataBuilder, TypeInterner,
};
pub use walk::WalkAction;
