//! Locations, attributes, and the type and path interners.

use std::collections::{BTreeMap, HashMap};

use cranelift_entity::PrimaryMap;
use smallvec::SmallVec;

use crate::location::Span;
use crate::refs::{LocRef, PathRef, TypeRef};
use crate::symbol::Symbol;

crate::symbols! {
    BUILTIN => "builtin",
    FUNCTION => "function",
    NUM_INPUTS => "num_inputs",
    INDEX => "index",
    NONE => "none",
}

// ============================================================================
// Location
// ============================================================================

/// Source location attached to operations and block arguments.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Location {
    #[default]
    Unknown,
    /// Byte range in a parsed file.
    Source { path: PathRef, span: Span },
    /// Explicit `"file":line:col` location written in the source.
    FileLineCol {
        path: PathRef,
        line: u32,
        column: u32,
    },
    /// Named location, `loc("name")`.
    Name(Symbol),
    /// Reference to a location alias that was not yet defined when it was
    /// used. Holds the index of the pending alias reference and is replaced
    /// before a parsed graph is handed out.
    Deferred(u32),
    /// Call site, fused or named-with-child location, stored in the
    /// context's `LocationInterner`.
    Composite(LocRef),
}

/// Locations that nest other locations.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum CompositeLocation {
    /// `callsite(callee at caller)`
    CallSite { callee: Location, caller: Location },
    /// `fused<metadata>[a, b, ...]`
    Fused {
        metadata: Option<Attribute>,
        locations: Vec<Location>,
    },
    /// `"name"(child)`
    Named { name: Symbol, child: Location },
}

impl Location {
    pub const fn new(path: PathRef, span: Span) -> Self {
        Location::Source { path, span }
    }

    pub fn span(&self) -> Option<Span> {
        match self {
            Location::Source { span, .. } => Some(*span),
            _ => None,
        }
    }
}

// ============================================================================
// Attribute
// ============================================================================

/// Constant attribute values.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Attribute {
    /// Present-but-valueless attribute (`{flag}`).
    Unit,
    Bool(bool),
    /// Integer constant stored as raw two's-complement bits.
    IntBits(u64),
    /// Integer constant with an explicit type, `42 : i32`.
    TypedInt(u64, TypeRef),
    /// Float constant stored as raw bits.
    FloatBits(u64),
    /// Float constant with an explicit type, `1.5 : f32`.
    TypedFloat(u64, TypeRef),
    String(String),
    Type(TypeRef),
    /// Symbol reference, `@name`.
    Symbol(Symbol),
    List(Vec<Attribute>),
    Dict(BTreeMap<Symbol, Attribute>),
    Location(Location),
}

impl Attribute {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Attribute::IntBits(bits) | Attribute::TypedInt(bits, _) => {
                Some(i64::from_ne_bytes(bits.to_ne_bytes()))
            }
            _ => None,
        }
    }
}

impl From<i64> for Attribute {
    fn from(value: i64) -> Self {
        Attribute::IntBits(u64::from_ne_bytes(value.to_ne_bytes()))
    }
}

impl From<bool> for Attribute {
    fn from(value: bool) -> Self {
        Attribute::Bool(value)
    }
}

impl From<Vec<Attribute>> for Attribute {
    fn from(value: Vec<Attribute>) -> Self {
        Attribute::List(value)
    }
}

impl From<Symbol> for Attribute {
    fn from(value: Symbol) -> Self {
        Attribute::Symbol(value)
    }
}

impl From<String> for Attribute {
    fn from(value: String) -> Self {
        Attribute::String(value)
    }
}

impl From<&str> for Attribute {
    fn from(value: &str) -> Self {
        Attribute::String(value.to_string())
    }
}

impl From<TypeRef> for Attribute {
    fn from(value: TypeRef) -> Self {
        Attribute::Type(value)
    }
}

impl From<Location> for Attribute {
    fn from(value: Location) -> Self {
        Attribute::Location(value)
    }
}

// ============================================================================
// TypeData
// ============================================================================

/// Data for a single interned type.
///
/// Builtin types (`i32`, `f64`, `index`, function types) live in the
/// `builtin` dialect; dialect types are written `!dialect.name<params>`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TypeData {
    pub dialect: Symbol,
    pub name: Symbol,
    pub params: SmallVec<[TypeRef; 4]>,
    pub attrs: BTreeMap<Symbol, Attribute>,
}

/// Fluent builder for `TypeData`.
pub struct TypeDataBuilder {
    dialect: Symbol,
    name: Symbol,
    params: SmallVec<[TypeRef; 4]>,
    attrs: BTreeMap<Symbol, Attribute>,
}

impl TypeDataBuilder {
    pub fn new(dialect: Symbol, name: Symbol) -> Self {
        Self {
            dialect,
            name,
            params: SmallVec::new(),
            attrs: BTreeMap::new(),
        }
    }

    pub fn param(mut self, ty: TypeRef) -> Self {
        self.params.push(ty);
        self
    }

    pub fn params(mut self, tys: impl IntoIterator<Item = TypeRef>) -> Self {
        self.params.extend(tys);
        self
    }

    pub fn attr(mut self, key: impl Into<Symbol>, val: Attribute) -> Self {
        self.attrs.insert(key.into(), val);
        self
    }

    pub fn build(self) -> TypeData {
        TypeData {
            dialect: self.dialect,
            name: self.name,
            params: self.params,
            attrs: self.attrs,
        }
    }
}

// ============================================================================
// TypeInterner
// ============================================================================

/// Deduplicating type interner. Equal `TypeData` always yields the same `TypeRef`.
pub struct TypeInterner {
    types: PrimaryMap<TypeRef, TypeData>,
    dedup: HashMap<TypeData, TypeRef>,
}

impl TypeInterner {
    pub fn new() -> Self {
        Self {
            types: PrimaryMap::new(),
            dedup: HashMap::default(),
        }
    }

    /// Intern a type, returning the existing ref if the data matches.
    pub fn intern(&mut self, data: TypeData) -> TypeRef {
        if let Some(&existing) = self.dedup.get(&data) {
            return existing;
        }
        let r = self.types.push(data.clone());
        self.dedup.insert(data, r);
        r
    }

    pub fn get(&self, r: TypeRef) -> &TypeData {
        &self.types[r]
    }

    pub fn is_dialect(&self, r: TypeRef, dialect: Symbol, name: Symbol) -> bool {
        let data = &self.types[r];
        data.dialect == dialect && data.name == name
    }

    /// Intern a parameterless builtin type such as `index` or `f32`.
    pub fn builtin(&mut self, name: Symbol) -> TypeRef {
        self.intern(TypeDataBuilder::new(BUILTIN(), name).build())
    }

    /// Intern the signless integer type `i<width>`.
    pub fn int(&mut self, width: u32) -> TypeRef {
        self.builtin(Symbol::from_dynamic(&format!("i{width}")))
    }

    pub fn index(&mut self) -> TypeRef {
        self.builtin(INDEX())
    }

    /// Intern the function type `(inputs) -> results`.
    ///
    /// Inputs and results share the parameter list; the `num_inputs`
    /// attribute records where the inputs end.
    pub fn function(
        &mut self,
        inputs: impl IntoIterator<Item = TypeRef>,
        results: impl IntoIterator<Item = TypeRef>,
    ) -> TypeRef {
        let mut params: SmallVec<[TypeRef; 4]> = inputs.into_iter().collect();
        let num_inputs = params.len() as i64;
        params.extend(results);
        self.intern(
            TypeDataBuilder::new(BUILTIN(), FUNCTION())
                .params(params)
                .attr(NUM_INPUTS(), Attribute::from(num_inputs))
                .build(),
        )
    }

    /// Split a function type into its inputs and results.
    pub fn as_function(&self, ty: TypeRef) -> Option<(&[TypeRef], &[TypeRef])> {
        let data = &self.types[ty];
        if data.dialect != BUILTIN() || data.name != FUNCTION() {
            return None;
        }
        let split = data.attrs.get(&NUM_INPUTS())?.as_int()? as usize;
        Some(data.params.split_at(split.min(data.params.len())))
    }
}

impl Default for TypeInterner {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// PathInterner
// ============================================================================

/// Deduplicating interner for source file names.
pub struct PathInterner {
    paths: PrimaryMap<PathRef, String>,
    dedup: HashMap<String, PathRef>,
}

impl PathInterner {
    pub fn new() -> Self {
        Self {
            paths: PrimaryMap::new(),
            dedup: HashMap::default(),
        }
    }

    pub fn intern(&mut self, path: impl Into<String>) -> PathRef {
        let path = path.into();
        if let Some(&existing) = self.dedup.get(&path) {
            return existing;
        }
        let r = self.paths.push(path.clone());
        self.dedup.insert(path, r);
        r
    }

    pub fn get(&self, r: PathRef) -> &str {
        &self.paths[r]
    }
}

impl Default for PathInterner {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// LocationInterner
// ============================================================================

/// Deduplicating interner for composite locations.
#[derive(Default)]
pub struct LocationInterner {
    locations: PrimaryMap<LocRef, CompositeLocation>,
    dedup: HashMap<CompositeLocation, LocRef>,
}

impl LocationInterner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, location: CompositeLocation) -> Location {
        if let Some(&existing) = self.dedup.get(&location) {
            return Location::Composite(existing);
        }
        let r = self.locations.push(location.clone());
        self.dedup.insert(location, r);
        Location::Composite(r)
    }

    pub fn get(&self, r: LocRef) -> &CompositeLocation {
        &self.locations[r]
    }
}
