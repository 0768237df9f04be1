//! Generic-syntax printer.
//!
//! Every operation is printed in the quoted generic form, so the output of
//! two independently built graphs can be compared textually:
//!
//! ```text
//! %0 = "arith.constant"() {value = 1 : i32} : () -> i32
//! "cf.br"(%0) [^bb1] : (i32) -> ()
//! ^bb1(%1: i32):
//!   "test.use"(%1) : (i32) -> ()
//! ```
//!
//! Values are numbered `%N` and blocks `^bbN` in print order.

use std::collections::HashMap;
use std::fmt;
use std::fmt::Write;

use crate::context::IrContext;
use crate::refs::*;
use crate::symbol::Symbol;
use crate::types::*;

struct PrintState<'a> {
    ctx: &'a IrContext,
    value_names: HashMap<ValueRef, String>,
    block_labels: HashMap<BlockRef, String>,
    next_value_num: usize,
    next_block_num: usize,
}

impl<'a> PrintState<'a> {
    fn new(ctx: &'a IrContext) -> Self {
        Self {
            ctx,
            value_names: HashMap::new(),
            block_labels: HashMap::new(),
            next_value_num: 0,
            next_block_num: 0,
        }
    }

    fn assign_value_name(&mut self, v: ValueRef) {
        let name = format!("%{}", self.next_value_num);
        self.next_value_num += 1;
        self.value_names.insert(v, name);
    }

    fn value_name(&self, v: ValueRef) -> &str {
        self.value_names.get(&v).map(|s| s.as_str()).unwrap_or("%?")
    }

    fn assign_block_label(&mut self, b: BlockRef) {
        let label = format!("^bb{}", self.next_block_num);
        self.next_block_num += 1;
        self.block_labels.insert(b, label);
    }

    /// Number every value and block under `block` in print order, so a
    /// use that textually precedes its definition still prints a name.
    fn number_block(&mut self, block: BlockRef) {
        let ctx = self.ctx;
        for &arg in ctx.block_args(block) {
            self.assign_value_name(arg);
        }
        for &op in &ctx.block(block).ops {
            for &v in ctx.op_results(op) {
                self.assign_value_name(v);
            }
            for &region in &ctx.op(op).regions {
                let blocks = &ctx.region(region).blocks;
                for &b in blocks {
                    self.assign_block_label(b);
                }
                for &b in blocks {
                    self.number_block(b);
                }
            }
        }
    }

    fn block_label(&self, b: BlockRef) -> &str {
        self.block_labels
            .get(&b)
            .map(|s| s.as_str())
            .unwrap_or("^bb?")
    }
}

// ============================================================================
// Public API
// ============================================================================

/// Print the operations of a top-level block, one per line.
pub fn print_block_ops(ctx: &IrContext, block: BlockRef) -> String {
    let mut state = PrintState::new(ctx);
    state.number_block(block);
    let mut out = String::new();
    for &op in &ctx.block(block).ops {
        print_operation(&mut state, &mut out, op, 0).expect("fmt::Write to String never fails");
    }
    out
}

pub fn print_type(ctx: &IrContext, ty: TypeRef) -> String {
    let mut out = String::new();
    write_type(ctx, &mut out, ty).expect("fmt::Write to String never fails");
    out
}

pub fn print_attribute(ctx: &IrContext, attr: &Attribute) -> String {
    let mut out = String::new();
    write_attribute(ctx, &mut out, attr).expect("fmt::Write to String never fails");
    out
}

pub fn print_location(ctx: &IrContext, loc: &Location) -> String {
    let mut out = String::new();
    write_location(ctx, &mut out, loc).expect("fmt::Write to String never fails");
    out
}

// ============================================================================
// Type printing
// ============================================================================

fn write_type(ctx: &IrContext, f: &mut impl Write, ty: TypeRef) -> fmt::Result {
    if let Some((inputs, results)) = ctx.types.as_function(ty) {
        write_type_list(ctx, f, inputs, true)?;
        f.write_str(" -> ")?;
        let wrap = results.len() != 1 || ctx.types.as_function(results[0]).is_some();
        return write_type_list(ctx, f, results, wrap);
    }

    let data = ctx.types.get(ty);
    if data.dialect == BUILTIN() {
        return write!(f, "{}", data.name);
    }
    write!(f, "!{}.{}", data.dialect, data.name)?;
    if !data.params.is_empty() {
        f.write_char('<')?;
        for (i, &param) in data.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write_type(ctx, f, param)?;
        }
        f.write_char('>')?;
    }
    Ok(())
}

fn write_type_list(ctx: &IrContext, f: &mut impl Write, tys: &[TypeRef], parens: bool) -> fmt::Result {
    if parens {
        f.write_char('(')?;
    }
    for (i, &ty) in tys.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write_type(ctx, f, ty)?;
    }
    if parens {
        f.write_char(')')?;
    }
    Ok(())
}

// ============================================================================
// Attribute printing
// ============================================================================

fn write_attribute(ctx: &IrContext, f: &mut impl Write, attr: &Attribute) -> fmt::Result {
    match attr {
        Attribute::Unit => f.write_str("unit"),
        Attribute::Bool(b) => write!(f, "{b}"),
        Attribute::IntBits(bits) => write!(f, "{}", *bits as i64),
        Attribute::TypedInt(bits, ty) => {
            write!(f, "{} : ", *bits as i64)?;
            write_type(ctx, f, *ty)
        }
        Attribute::FloatBits(bits) => write_float(f, *bits),
        Attribute::TypedFloat(bits, ty) => {
            write_float(f, *bits)?;
            f.write_str(" : ")?;
            write_type(ctx, f, *ty)
        }
        Attribute::String(s) => {
            f.write_char('"')?;
            write_escaped_string(f, s)?;
            f.write_char('"')
        }
        Attribute::Symbol(sym) => write_symbol(f, *sym),
        Attribute::Type(ty) => write_type(ctx, f, *ty),
        Attribute::List(list) => {
            f.write_char('[')?;
            for (i, item) in list.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write_attribute(ctx, f, item)?;
            }
            f.write_char(']')
        }
        Attribute::Dict(entries) => write_attr_dict(ctx, f, entries.iter()),
        Attribute::Location(loc) => write_location(ctx, f, loc),
    }
}

fn write_float(f: &mut impl Write, bits: u64) -> fmt::Result {
    let v = f64::from_bits(bits);
    let s = format!("{v}");
    f.write_str(&s)?;
    // Keep a decimal point on finite whole numbers so they re-lex as floats.
    if v.is_finite() && !s.contains('.') && !s.contains('e') && !s.contains('E') {
        f.write_str(".0")?;
    }
    Ok(())
}

fn write_attr_dict<'x>(
    ctx: &IrContext,
    f: &mut impl Write,
    entries: impl Iterator<Item = (&'x Symbol, &'x Attribute)>,
) -> fmt::Result {
    f.write_char('{')?;
    for (i, (key, val)) in entries.enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{key}")?;
        if *val != Attribute::Unit {
            f.write_str(" = ")?;
            write_attribute(ctx, f, val)?;
        }
    }
    f.write_char('}')
}

fn write_location(ctx: &IrContext, f: &mut impl Write, loc: &Location) -> fmt::Result {
    f.write_str("loc(")?;
    write_location_instance(ctx, f, loc)?;
    f.write_char(')')
}

fn write_location_instance(ctx: &IrContext, f: &mut impl Write, loc: &Location) -> fmt::Result {
    match loc {
        Location::Unknown | Location::Deferred(_) => f.write_str("unknown")?,
        Location::Source { path, span } => {
            f.write_char('"')?;
            write_escaped_string(f, ctx.paths.get(*path))?;
            write!(f, "\" {}:{}", span.start, span.end)?;
        }
        Location::FileLineCol { path, line, column } => {
            f.write_char('"')?;
            write_escaped_string(f, ctx.paths.get(*path))?;
            write!(f, "\":{line}:{column}")?;
        }
        Location::Name(name) => {
            f.write_char('"')?;
            name.with_str(|s| write_escaped_string(f, s))?;
            f.write_char('"')?;
        }
        Location::Composite(r) => match ctx.locations.get(*r) {
            CompositeLocation::CallSite { callee, caller } => {
                f.write_str("callsite(")?;
                write_location_instance(ctx, f, callee)?;
                f.write_str(" at ")?;
                write_location_instance(ctx, f, caller)?;
                f.write_char(')')?;
            }
            CompositeLocation::Fused {
                metadata,
                locations,
            } => {
                f.write_str("fused")?;
                if let Some(metadata) = metadata {
                    f.write_char('<')?;
                    write_attribute(ctx, f, metadata)?;
                    f.write_char('>')?;
                }
                f.write_char('[')?;
                for (i, item) in locations.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write_location_instance(ctx, f, item)?;
                }
                f.write_char(']')?;
            }
            CompositeLocation::Named { name, child } => {
                f.write_char('"')?;
                name.with_str(|s| write_escaped_string(f, s))?;
                f.write_str("\"(")?;
                write_location_instance(ctx, f, child)?;
                f.write_char(')')?;
            }
        },
    }
    Ok(())
}

fn write_escaped_string(f: &mut impl Write, s: &str) -> fmt::Result {
    for ch in s.chars() {
        match ch {
            '\\' => f.write_str("\\\\")?,
            '"' => f.write_str("\\\"")?,
            '\n' => f.write_str("\\n")?,
            '\t' => f.write_str("\\t")?,
            c if c.is_control() => write!(f, "\\{:02X}", c as u32)?,
            c => f.write_char(c)?,
        }
    }
    Ok(())
}

fn write_symbol(f: &mut impl Write, sym: Symbol) -> fmt::Result {
    sym.with_str(|s| {
        let needs_quoting = s.is_empty()
            || s.starts_with(|c: char| c.is_ascii_digit())
            || !s
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '.'));
        if needs_quoting {
            f.write_str("@\"")?;
            write_escaped_string(f, s)?;
            f.write_char('"')
        } else {
            write!(f, "@{s}")
        }
    })
}

// ============================================================================
// Operation printing
// ============================================================================

fn print_operation(
    state: &mut PrintState<'_>,
    f: &mut impl Write,
    op: OpRef,
    indent: usize,
) -> fmt::Result {
    let ctx = state.ctx;
    let data = ctx.op(op);
    write!(f, "{:indent$}", "")?;

    let results = ctx.op_results(op);
    if !results.is_empty() {
        for (i, &v) in results.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(state.value_name(v))?;
        }
        f.write_str(" = ")?;
    }

    f.write_char('"')?;
    write_escaped_string(f, &data.full_name())?;
    f.write_str("\"(")?;
    for (i, &v) in ctx.op_operands(op).iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        f.write_str(state.value_name(v))?;
    }
    f.write_char(')')?;

    if !data.successors.is_empty() {
        f.write_str(" [")?;
        for (i, &b) in data.successors.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(state.block_label(b))?;
        }
        f.write_char(']')?;
    }

    if !data.regions.is_empty() {
        f.write_str(" (")?;
        for (i, &region) in data.regions.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            print_region(state, f, region, indent)?;
        }
        f.write_char(')')?;
    }

    if !data.attributes.is_empty() {
        f.write_char(' ')?;
        write_attr_dict(ctx, f, data.attributes.iter())?;
    }

    f.write_str(" : ")?;
    let operand_types: Vec<TypeRef> = ctx
        .op_operands(op)
        .iter()
        .map(|&v| ctx.value_ty(v))
        .collect();
    write_type_list(ctx, f, &operand_types, true)?;
    f.write_str(" -> ")?;
    let result_types = ctx.op_result_types(op);
    let wrap = result_types.len() != 1 || ctx.types.as_function(result_types[0]).is_some();
    write_type_list(ctx, f, result_types, wrap)?;

    f.write_char('\n')
}

// ============================================================================
// Region / Block printing
// ============================================================================

fn print_region(
    state: &mut PrintState<'_>,
    f: &mut impl Write,
    region: RegionRef,
    indent: usize,
) -> fmt::Result {
    let ctx = state.ctx;
    let blocks = &ctx.region(region).blocks;

    f.write_str("{\n")?;
    for (i, &block) in blocks.iter().enumerate() {
        let args = ctx.block_args(block);
        let elide_label = i == 0 && args.is_empty();
        if !elide_label {
            write!(f, "{:indent$}{}", "", state.block_label(block))?;
            if !args.is_empty() {
                f.write_char('(')?;
                for (j, &arg) in args.iter().enumerate() {
                    if j > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: ", state.value_name(arg))?;
                    write_type(ctx, f, ctx.value_ty(arg))?;
                }
                f.write_char(')')?;
            }
            f.write_str(":\n")?;
        }
        for &op in &ctx.block(block).ops {
            print_operation(state, f, op, indent + 2)?;
        }
    }
    write!(f, "{:indent$}}}", "")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{BlockArgData, BlockData, OperationDataBuilder, RegionData};
    use smallvec::smallvec;

    #[test]
    fn print_builtin_and_dialect_types() {
        let mut ctx = IrContext::new();
        let i32_ty = ctx.types.int(32);
        let idx = ctx.types.index();
        let pair = ctx.types.intern(
            TypeDataBuilder::new(Symbol::new("test"), Symbol::new("pair"))
                .params([i32_ty, idx])
                .build(),
        );
        let single = ctx.types.function([i32_ty], [idx]);
        let multi = ctx.types.function([], [i32_ty, pair]);

        assert_eq!(print_type(&ctx, i32_ty), "i32");
        assert_eq!(print_type(&ctx, pair), "!test.pair<i32, index>");
        assert_eq!(print_type(&ctx, single), "(i32) -> index");
        assert_eq!(print_type(&ctx, multi), "() -> (i32, !test.pair<i32, index>)");
    }

    #[test]
    fn print_attributes() {
        let mut ctx = IrContext::new();
        let i64_ty = ctx.types.int(64);

        assert_eq!(print_attribute(&ctx, &Attribute::from(-3i64)), "-3");
        assert_eq!(
            print_attribute(&ctx, &Attribute::TypedInt(7, i64_ty)),
            "7 : i64"
        );
        assert_eq!(
            print_attribute(&ctx, &Attribute::FloatBits(42.0f64.to_bits())),
            "42.0"
        );
        assert_eq!(
            print_attribute(&ctx, &Attribute::FloatBits(f64::INFINITY.to_bits())),
            "inf"
        );
        assert_eq!(
            print_attribute(&ctx, &Attribute::String("a\"b\n".into())),
            r#""a\"b\n""#
        );
        assert_eq!(
            print_attribute(&ctx, &Attribute::Symbol(Symbol::new("main"))),
            "@main"
        );
        assert_eq!(
            print_attribute(&ctx, &Attribute::Symbol(Symbol::from_dynamic("a b"))),
            r#"@"a b""#
        );
        assert_eq!(
            print_attribute(
                &ctx,
                &Attribute::List(vec![Attribute::Bool(true), Attribute::Unit])
            ),
            "[true, unit]"
        );
    }

    #[test]
    fn print_locations() {
        let mut ctx = IrContext::new();
        let path = ctx.paths.intern("f.mlir");
        let flc = Location::FileLineCol {
            path,
            line: 3,
            column: 7,
        };
        assert_eq!(print_location(&ctx, &flc), r#"loc("f.mlir":3:7)"#);
        assert_eq!(print_location(&ctx, &Location::Unknown), "loc(unknown)");
        assert_eq!(
            print_location(&ctx, &Location::Name(Symbol::new("here"))),
            r#"loc("here")"#
        );

        let named = ctx.locations.intern(CompositeLocation::Named {
            name: Symbol::new("inner"),
            child: flc,
        });
        let site = ctx.locations.intern(CompositeLocation::CallSite {
            callee: named,
            caller: Location::Unknown,
        });
        let fused = ctx.locations.intern(CompositeLocation::Fused {
            metadata: Some(Attribute::String("m".into())),
            locations: vec![site, Location::Name(Symbol::new("b"))],
        });
        assert_eq!(
            print_location(&ctx, &fused),
            r#"loc(fused<"m">[callsite("inner"("f.mlir":3:7) at unknown), "b"])"#
        );
    }

    #[test]
    fn print_nested_regions_and_successors() {
        let mut ctx = IrContext::new();
        let loc = Location::Unknown;
        let i32_ty = ctx.types.int(32);

        let top = ctx.create_block(BlockData::new(loc));
        let cst = OperationDataBuilder::named(loc, "arith.constant")
            .result(i32_ty)
            .attr("value", Attribute::TypedInt(1, i32_ty))
            .build(&mut ctx);
        let cst = ctx.create_op(cst);
        ctx.push_op(top, cst);
        let v = ctx.op_result(cst, 0);

        let entry = ctx.create_block(BlockData::new(loc));
        let mut exit_data = BlockData::new(loc);
        exit_data.args.push(BlockArgData::new(i32_ty, loc));
        let exit = ctx.create_block(exit_data);
        let br = OperationDataBuilder::named(loc, "cf.br")
            .operand(v)
            .successor(exit)
            .build(&mut ctx);
        let br = ctx.create_op(br);
        ctx.push_op(entry, br);
        let arg = ctx.block_arg(exit, 0);
        let ret = OperationDataBuilder::named(loc, "test.ret")
            .operand(arg)
            .build(&mut ctx);
        let ret = ctx.create_op(ret);
        ctx.push_op(exit, ret);
        let body = ctx.create_region(RegionData {
            location: loc,
            blocks: smallvec![entry, exit],
            parent_op: None,
        });
        let wrapper = OperationDataBuilder::named(loc, "test.wrap")
            .region(body)
            .attr("flag", Attribute::Unit)
            .build(&mut ctx);
        let wrapper = ctx.create_op(wrapper);
        ctx.push_op(top, wrapper);

        insta::assert_snapshot!(print_block_ops(&ctx, top), @r#"
        %0 = "arith.constant"() {value = 1 : i32} : () -> i32
        "test.wrap"() ({
          "cf.br"(%0) [^bb1] : (i32) -> ()
        ^bb1(%1: i32):
          "test.ret"(%1) : (i32) -> ()
        }) {flag} : () -> ()
        "#);
    }
}
