//! Dialect registry: which namespaces exist, which are loaded, and how
//! their operations are parsed.
//!
//! The registry is an explicit value threaded through the parser. Dialects
//! are registered as constructors and only materialised the first time the
//! parser meets their namespace.

use std::collections::{BTreeMap, HashMap};

use crate::diagnostic::ParseResult;
use crate::parser::custom::CustomOpParser;
use crate::state::OperationState;

/// Parses the custom form of one operation into an [`OperationState`].
pub type ParseAssemblyFn =
    for<'p, 'a> fn(&mut CustomOpParser<'p, 'a>, &mut OperationState) -> ParseResult<()>;

/// Fallback used by a dialect for operations it does not register
/// individually. Receives the full operation name.
pub type DialectParseHook = fn(&str) -> Option<ParseAssemblyFn>;

/// Structural properties of a registered operation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OpTraits {
    /// Must be the last operation of its block; may carry successors.
    pub is_terminator: bool,
    /// Regions cannot see values defined outside the operation.
    pub is_isolated_from_above: bool,
}

/// Everything the parser needs to know about one registered operation.
#[derive(Clone, Copy, Debug)]
pub struct OpDefinition {
    /// Name without the dialect prefix.
    pub name: &'static str,
    pub traits: OpTraits,
    pub parser: Option<ParseAssemblyFn>,
    /// Namespace used to complete unqualified op names inside this op's
    /// regions while it is being parsed.
    pub default_dialect: Option<&'static str>,
}

impl OpDefinition {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            traits: OpTraits {
                is_terminator: false,
                is_isolated_from_above: false,
            },
            parser: None,
            default_dialect: None,
        }
    }

    pub const fn terminator(mut self) -> Self {
        self.traits.is_terminator = true;
        self
    }

    pub const fn isolated_from_above(mut self) -> Self {
        self.traits.is_isolated_from_above = true;
        self
    }

    pub const fn with_parser(mut self, parser: ParseAssemblyFn) -> Self {
        self.parser = Some(parser);
        self
    }

    pub const fn default_dialect(mut self, dialect: &'static str) -> Self {
        self.default_dialect = Some(dialect);
        self
    }
}

/// A loaded dialect.
#[derive(Debug)]
pub struct Dialect {
    pub namespace: &'static str,
    ops: HashMap<&'static str, OpDefinition>,
    parse_operation_hook: Option<DialectParseHook>,
    allow_unknown_operations: bool,
}

impl Dialect {
    pub fn new(namespace: &'static str) -> Self {
        Self {
            namespace,
            ops: HashMap::new(),
            parse_operation_hook: None,
            allow_unknown_operations: false,
        }
    }

    pub fn with_op(mut self, def: OpDefinition) -> Self {
        self.ops.insert(def.name, def);
        self
    }

    pub fn with_parse_hook(mut self, hook: DialectParseHook) -> Self {
        self.parse_operation_hook = Some(hook);
        self
    }

    /// Accept operations in this namespace that were never registered.
    pub fn allow_unknown_operations(mut self) -> Self {
        self.allow_unknown_operations = true;
        self
    }

    pub fn op(&self, name: &str) -> Option<&OpDefinition> {
        self.ops.get(name)
    }

    pub fn allows_unknown_operations(&self) -> bool {
        self.allow_unknown_operations
    }

    /// Parser for an operation this dialect does not register itself.
    pub fn parse_operation_hook(&self, full_name: &str) -> Option<ParseAssemblyFn> {
        self.parse_operation_hook.and_then(|hook| hook(full_name))
    }
}

/// Registry of available and loaded dialects.
pub struct DialectRegistry {
    available: BTreeMap<&'static str, fn() -> Dialect>,
    loaded: HashMap<&'static str, Dialect>,
}

impl DialectRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            available: BTreeMap::new(),
            loaded: HashMap::new(),
        }
    }

    /// A registry that knows every dialect shipped with this crate.
    pub fn with_builtin_dialects() -> Self {
        let mut registry = Self::new();
        crate::dialects::register_all(&mut registry);
        registry
    }

    /// Make a dialect available for lazy loading.
    pub fn register_dialect(&mut self, namespace: &'static str, constructor: fn() -> Dialect) {
        self.available.insert(namespace, constructor);
    }

    /// Load `namespace` if it is available. Returns whether it is loaded.
    pub fn load_dialect(&mut self, namespace: &str) -> bool {
        if self.loaded.contains_key(namespace) {
            return true;
        }
        let Some((&key, constructor)) = self.available.get_key_value(namespace) else {
            return false;
        };
        let dialect = constructor();
        tracing::debug!(dialect = key, ops = dialect.ops.len(), "Loaded dialect");
        self.loaded.insert(key, dialect);
        true
    }

    pub fn loaded_dialect(&self, namespace: &str) -> Option<&Dialect> {
        self.loaded.get(namespace)
    }

    /// Definition of a registered operation in an already loaded dialect.
    pub fn op_definition(&self, full_name: &str) -> Option<&OpDefinition> {
        let (namespace, name) = full_name.split_once('.')?;
        self.loaded.get(namespace)?.op(name)
    }

    pub fn operation_is_registered(&self, full_name: &str) -> bool {
        self.op_definition(full_name).is_some()
    }

    pub fn operation_traits(&self, full_name: &str) -> Option<OpTraits> {
        self.op_definition(full_name).map(|def| def.traits)
    }

    /// Namespaces that are currently loaded, sorted.
    pub fn loaded_dialects(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.loaded.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Namespaces that can be loaded, sorted.
    pub fn available_dialects(&self) -> Vec<&'static str> {
        self.available.keys().copied().collect()
    }
}

impl Default for DialectRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn demo() -> Dialect {
        Dialect::new("demo")
            .with_op(OpDefinition::new("ret").terminator())
            .with_op(OpDefinition::new("scope").isolated_from_above())
    }

    #[test]
    fn dialects_load_lazily() {
        let mut registry = DialectRegistry::new();
        registry.register_dialect("demo", demo);

        assert!(!registry.operation_is_registered("demo.ret"));
        assert!(registry.load_dialect("demo"));
        assert!(registry.operation_is_registered("demo.ret"));
        assert!(!registry.load_dialect("other"));
        assert_eq!(registry.loaded_dialects(), vec!["demo"]);
    }

    #[test]
    fn traits_follow_definitions() {
        let mut registry = DialectRegistry::new();
        registry.register_dialect("demo", demo);
        registry.load_dialect("demo");

        let ret = registry.operation_traits("demo.ret").unwrap();
        assert!(ret.is_terminator);
        assert!(!ret.is_isolated_from_above);
        let scope = registry.operation_traits("demo.scope").unwrap();
        assert!(scope.is_isolated_from_above);
        assert_eq!(registry.operation_traits("demo.missing"), None);
        assert_eq!(registry.operation_traits("undotted"), None);
    }

    #[test]
    fn builtin_dialects_are_available() {
        let registry = DialectRegistry::with_builtin_dialects();
        assert_eq!(
            registry.available_dialects(),
            vec!["arith", "builtin", "cf", "func", "scf"]
        );
        assert!(registry.loaded_dialects().is_empty());
    }
}
