//! Single-pass parser for the textual IR.
//!
//! [`parse_source_str`] reads a whole input and builds the program graph
//! directly into an [`IrContext`](strata_ir::IrContext). Names are
//! resolved while parsing: a use that precedes its definition gets a
//! typed placeholder which the definition later replaces. Operations in
//! custom syntax are handed to parse functions looked up through a
//! [`DialectRegistry`].
//!
//! ```
//! use strata_asm::{parse_source_str, DialectRegistry, ParserConfig};
//! use strata_ir::IrContext;
//!
//! let mut ctx = IrContext::new();
//! let mut registry = DialectRegistry::with_builtin_dialects();
//! let parsed = parse_source_str(
//!     &mut ctx,
//!     &mut registry,
//!     &ParserConfig::default(),
//!     "%c = arith.constant 1 : i32",
//! )
//! .unwrap();
//! assert_eq!(ctx.block(parsed.block).ops.len(), 1);
//! ```

pub mod config;
pub mod diagnostic;
pub mod dialects;
pub mod forward_refs;
pub mod lexer;
pub mod parser;
pub mod registry;
pub mod state;
pub mod symbol_table;
pub mod verify;

use strata_ir::{BlockData, BlockRef, IrContext, Location, RegionData, RegionRef, Span};

pub use config::ParserConfig;
pub use diagnostic::{Diagnostic, ParseError, ParseResult, Severity};
pub use parser::{Argument, CustomOpParser, Delimiter};
pub use registry::{Dialect, DialectRegistry, OpDefinition, OpTraits, ParseAssemblyFn};
pub use state::OperationState;
pub use symbol_table::UnresolvedOperand;

/// Where the top-level operations of a parsed input ended up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParsedSource {
    pub region: RegionRef,
    /// The single block holding every top-level operation.
    pub block: BlockRef,
}

/// Parse `source` into `ctx`.
///
/// On failure every use created by the partial graph is dropped, so the
/// values already in `ctx` keep accurate use lists.
pub fn parse_source_str(
    ctx: &mut IrContext,
    registry: &mut DialectRegistry,
    config: &ParserConfig,
    source: &str,
) -> ParseResult<ParsedSource> {
    let blocks_before = ctx.block_refs().count();

    let path = ctx.paths.intern(config.source_name.as_str());
    let location = Location::new(path, Span::new(0, source.len()));
    let block = ctx.create_block(BlockData::new(location));
    let region = ctx.create_region(RegionData {
        location,
        blocks: Default::default(),
        parent_op: None,
    });
    ctx.append_block(region, block);

    let result = parser::OperationParser::new(source, ctx, registry, config, region, block)
        .parse_top_level();
    if let Err(err) = result {
        tracing::debug!(
            source = %config.source_name,
            errors = err.diagnostics.len(),
            "Parse failed"
        );
        let created: Vec<BlockRef> = ctx.block_refs().skip(blocks_before).collect();
        for block in created {
            ctx.drop_block_references(block);
        }
        return Err(err);
    }

    tracing::debug!(source = %config.source_name, "Parsed source");
    Ok(ParsedSource { region, block })
}
