use strata_asm::{
    parse_source_str, Delimiter, Dialect, DialectRegistry, OpDefinition, ParseError, ParseResult,
    ParsedSource, ParserConfig,
};
use strata_ir::printer::{print_block_ops, print_location};
use strata_ir::{Attribute, IrContext, Location, OpRef, Symbol};

fn parse_with(config: &ParserConfig, source: &str) -> (IrContext, ParseResult<ParsedSource>) {
    let mut ctx = IrContext::new();
    let mut registry = DialectRegistry::with_builtin_dialects();
    let result = parse_source_str(&mut ctx, &mut registry, config, source);
    (ctx, result)
}

/// Parse with unregistered dialects allowed, so `test.*` ops act as opaque nodes.
fn parse(source: &str) -> (IrContext, ParsedSource) {
    let config = ParserConfig::default().allow_unknown_dialects(true);
    let (ctx, result) = parse_with(&config, source);
    match result {
        Ok(parsed) => (ctx, parsed),
        Err(err) => panic!("parse failed:\n{}", err.render("<input>", source)),
    }
}

fn parse_err(source: &str) -> ParseError {
    let config = ParserConfig::default().allow_unknown_dialects(true);
    match parse_with(&config, source).1 {
        Ok(_) => panic!("expected parse failure for:\n{source}"),
        Err(err) => err,
    }
}

fn top_ops(ctx: &IrContext, parsed: ParsedSource) -> Vec<OpRef> {
    ctx.block(parsed.block).ops.to_vec()
}

// ============================================================================
// Name resolution
// ============================================================================

#[test]
fn forward_use_is_rewired_to_definition() {
    let (ctx, parsed) = parse(
        r#"
"test.use"(%a) : (i32) -> ()
%a = "test.def"() : () -> i32
"#,
    );
    let ops = top_ops(&ctx, parsed);
    let &[user, def] = ops.as_slice() else {
        panic!("expected two operations");
    };
    let value = ctx.op_result(def, 0);
    assert_eq!(ctx.op_operands(user), &[value]);
    assert_eq!(ctx.uses(value).len(), 1);
    assert!(!ctx.is_placeholder(ctx.op_operands(user)[0]));
}

#[test]
fn forward_and_backward_uses_have_the_same_use_lists() {
    let (backward, parsed) = parse(
        r#"
%a = "test.def"() : () -> i32
"test.use"(%a, %a) : (i32, i32) -> ()
"#,
    );
    let ops = top_ops(&backward, parsed);
    assert_eq!(backward.uses(backward.op_result(ops[0], 0)).len(), 2);

    let (forward, parsed) = parse(
        r#"
"test.use"(%a, %a) : (i32, i32) -> ()
%a = "test.def"() : () -> i32
"#,
    );
    let ops = top_ops(&forward, parsed);
    let value = forward.op_result(ops[1], 0);
    assert_eq!(forward.uses(value).len(), 2);
    assert_eq!(forward.op_operands(ops[0]), &[value, value]);
}

#[test]
fn multi_result_groups_bind_result_numbers() {
    let (ctx, parsed) = parse(
        r#"
%p:2, %q = "test.def"() : () -> (i32, i64, i1)
"test.use"(%p#1, %q) : (i64, i1) -> ()
"#,
    );
    let ops = top_ops(&ctx, parsed);
    assert_eq!(
        ctx.op_operands(ops[1]),
        &[ctx.op_result(ops[0], 1), ctx.op_result(ops[0], 2)]
    );
}

#[test]
fn isolated_region_cannot_see_outer_values() {
    let err = parse_err(
        r#"
%x = "test.def"() : () -> i32
func.func @f() {
  "test.use"(%x) : (i32) -> ()
  func.return
}
"#,
    );
    assert_eq!(err.message(), "use of undeclared SSA value name");
}

#[test]
fn nested_region_sees_outer_values() {
    let (ctx, parsed) = parse(
        r#"
%c = "test.cond"() : () -> i1
%x = "test.def"() : () -> i32
scf.if %c {
  "test.use"(%x) : (i32) -> ()
  scf.yield
}
"#,
    );
    let ops = top_ops(&ctx, parsed);
    assert_eq!(ctx.uses(ctx.op_result(ops[1], 0)).len(), 1);
    assert_eq!(ctx.op(ops[2]).regions.len(), 2);
}

#[test]
fn forward_reference_spans_sibling_regions() {
    let (ctx, parsed) = parse(
        r#"
"test.two"() ({
  "test.use"(%v) : (i32) -> ()
}, {
  "test.use"(%v) : (i32) -> ()
}) : () -> ()
%v = "test.def"() : () -> i32
"#,
    );
    let ops = top_ops(&ctx, parsed);
    let value = ctx.op_result(ops[1], 0);
    assert_eq!(ctx.uses(value).len(), 2);
    for &region in &ctx.op(ops[0]).regions {
        let block = ctx.region(region).blocks[0];
        let user = ctx.block(block).ops[0];
        assert_eq!(ctx.op_operands(user), &[value]);
    }
}

#[test]
fn names_defined_in_a_region_are_dropped_when_it_closes() {
    let err = parse_err(
        r#"
%c = "test.cond"() : () -> i1
scf.if %c {
  %inner = "test.def"() : () -> i32
  scf.yield
}
"test.use"(%inner) : (i32) -> ()
"#,
    );
    assert_eq!(err.message(), "use of undeclared SSA value name");
}

#[test]
fn redefinition_points_at_both_sites() {
    let source = r#"%a = "test.def"() : () -> i32
%a = "test.def"() : () -> i32
"#;
    let err = parse_err(source);
    let diag = &err.diagnostics[0];
    assert_eq!(diag.message, "redefinition of SSA value '%a'");
    assert_eq!(diag.notes[0].message, "previously defined here");
    assert_eq!(diag.notes[0].span.map(|s| s.start), Some(0));
}

#[test]
fn unresolved_values_are_reported_in_source_order() {
    let source = r#""test.use"(%b) : (i32) -> ()
"test.use"(%a) : (i32) -> ()
"#;
    let err = parse_err(source);
    assert_eq!(err.diagnostics.len(), 2);
    let starts: Vec<usize> = err
        .diagnostics
        .iter()
        .map(|d| d.span.map_or(0, |s| s.start))
        .collect();
    assert_eq!(starts, vec![11, 40]);
    assert!(
        err.diagnostics
            .iter()
            .all(|d| d.message == "use of undeclared SSA value name")
    );
}

#[test]
fn uses_with_conflicting_types_are_rejected() {
    let err = parse_err(
        r#"
"test.use"(%v) : (i32) -> ()
"test.use"(%v) : (i64) -> ()
"#,
    );
    assert_eq!(
        err.message(),
        "use of value '%v' expects different type than prior uses: i64 vs i32"
    );
    assert_eq!(err.diagnostics[0].notes[0].message, "prior use here");
}

#[test]
fn definition_must_match_forward_use_type() {
    let err = parse_err(
        r#"
"test.use"(%v) : (i32) -> ()
%v = "test.def"() : () -> i64
"#,
    );
    assert_eq!(err.message(), "definition of SSA value '%v#0' has type i64");
    assert_eq!(
        err.diagnostics[0].notes[0].message,
        "previously used here with type i32"
    );
}

#[test]
fn result_number_past_the_end_is_rejected() {
    let err = parse_err(
        r#"
%a = "test.def"() : () -> i32
"test.use"(%a#1) : (i32) -> ()
"#,
    );
    assert_eq!(err.message(), "reference to invalid result number");
}

#[test]
fn huge_result_number_is_a_diagnostic() {
    let err = parse_err(
        r#"
%a = "test.def"() : () -> i32
"test.use"(%a#300000000) : (i32) -> ()
"#,
    );
    assert_eq!(err.message(), "reference to invalid result number");

    let err = parse_err(r#""test.use"(%b#4000000000) : (i32) -> ()"#);
    assert_eq!(err.message(), "use of undeclared SSA value name");
}

#[test]
fn bound_result_count_must_match() {
    let err = parse_err(r#"%a, %b = "test.def"() : () -> i32"#);
    assert_eq!(
        err.message(),
        "operation defines 1 results but was provided 2 to bind"
    );

    let err = parse_err(r#"%a = "test.none"() : () -> ()"#);
    assert_eq!(err.message(), "cannot name an operation with no results");
}

// ============================================================================
// Blocks
// ============================================================================

#[test]
fn blocks_may_be_referenced_before_their_label() {
    let (ctx, parsed) = parse(
        r#"
func.func @f(%c: i1) {
  cf.cond_br %c, ^bb1, ^bb2
^bb1:
  cf.br ^bb2
^bb2:
  func.return
}
"#,
    );
    let func = top_ops(&ctx, parsed)[0];
    let body = ctx.op(func).regions[0];
    let blocks = ctx.region(body).blocks.to_vec();
    assert_eq!(blocks.len(), 3);

    let cond_br = ctx.block(blocks[0]).ops[0];
    assert_eq!(ctx.op(cond_br).successors.as_slice(), &[blocks[1], blocks[2]]);
    let br = ctx.block(blocks[1]).ops[0];
    assert_eq!(ctx.op(br).successors.as_slice(), &[blocks[2]]);
}

#[test]
fn branch_operands_become_block_arguments() {
    let (ctx, parsed) = parse(
        r#"
func.func @f(%x: i32) -> i32 {
  cf.br ^exit(%x : i32)
^exit(%r: i32):
  func.return %r : i32
}
"#,
    );
    let func = top_ops(&ctx, parsed)[0];
    let blocks = ctx.region(ctx.op(func).regions[0]).blocks.to_vec();
    let entry_arg = ctx.block_arg(blocks[0], 0);
    let exit_arg = ctx.block_arg(blocks[1], 0);
    assert_eq!(ctx.op_operands(ctx.block(blocks[0]).ops[0]), &[entry_arg]);
    assert_eq!(ctx.op_operands(ctx.block(blocks[1]).ops[0]), &[exit_arg]);
}

#[test]
fn undefined_block_is_reported() {
    let err = parse_err(
        r#"
func.func @f() {
  cf.br ^missing
}
"#,
    );
    assert_eq!(err.message(), "reference to an undefined block");
}

#[test]
fn failed_parse_drops_every_use_it_created() {
    let config = ParserConfig::default().allow_unknown_dialects(true);
    let (ctx, result) = parse_with(
        &config,
        r#"
%a = "test.def"() : () -> i32
"test.wrap"() ({
  "test.use"(%a, %a) : (i32, i32) -> ()
  "test.jump"() [^missing] : () -> ()
}) : () -> ()
"#,
    );
    let err = result.expect_err("undefined block must fail the parse");
    assert_eq!(err.message(), "reference to an undefined block");

    let top = ctx.block_refs().next().expect("top-level block");
    let def = ctx.block(top).ops[0];
    assert!(ctx.uses(ctx.op_result(def, 0)).is_empty());

    let remaining: usize = ctx
        .block_refs()
        .flat_map(|block| ctx.block(block).ops.iter())
        .map(|&op| ctx.op_operands(op).len())
        .sum();
    assert_eq!(remaining, 0);
}

#[test]
fn block_labels_are_scoped_per_region() {
    parse(
        r#"
func.func @f() {
^bb0:
  func.return
}
func.func @g() {
^bb0:
  func.return
}
"#,
    );
}

#[test]
fn duplicate_block_label_is_rejected() {
    let err = parse_err(
        r#"
func.func @f() {
  cf.br ^bb1
^bb1:
  cf.br ^bb1
^bb1:
  func.return
}
"#,
    );
    assert_eq!(err.message(), "redefinition of block '^bb1'");
}

// ============================================================================
// Locations
// ============================================================================

#[test]
fn location_alias_may_be_defined_after_use() {
    let (ctx, parsed) = parse(
        r#"
"test.op"() : () -> () loc(#site)
#site = loc("kernel.src":3:7)
"#,
    );
    let op = top_ops(&ctx, parsed)[0];
    match ctx.op(op).location {
        Location::FileLineCol { path, line, column } => {
            assert_eq!(ctx.paths.get(path), "kernel.src");
            assert_eq!((line, column), (3, 7));
        }
        other => panic!("unexpected location {other:?}"),
    }
}

#[test]
fn composite_trailing_locations() {
    let (ctx, parsed) = parse(
        r#"
"test.a"() : () -> () loc(callsite("inlined"("lib.src":4:1) at "main.src":10:2))
"test.b"() : () -> () loc(#merged)
#merged = loc(fused<"pass">["x.src":1:1, unknown])
"#,
    );
    let ops = top_ops(&ctx, parsed);
    let printed: Vec<String> = ops
        .iter()
        .map(|&op| print_location(&ctx, &ctx.op(op).location))
        .collect();
    assert_eq!(
        printed,
        vec![
            r#"loc(callsite("inlined"("lib.src":4:1) at "main.src":10:2))"#,
            r#"loc(fused<"pass">["x.src":1:1, unknown])"#,
        ]
    );
}

#[test]
fn undefined_location_alias_is_reported() {
    let err = parse_err(r#""test.op"() : () -> () loc(#nowhere)"#);
    assert_eq!(err.message(), "operation location alias was never defined");

    let err = parse_err(
        r#"
"test.op"() : () -> () loc(#answer)
#answer = 42
"#,
    );
    assert_eq!(err.message(), "expected location, but found '42'");
}

#[test]
fn operations_default_to_their_source_span() {
    let source = r#"%a = "test.def"() : () -> i32"#;
    let (ctx, parsed) = parse(source);
    let op = top_ops(&ctx, parsed)[0];
    assert_eq!(
        ctx.op(op).location.span().map(|s| s.start),
        Some(source.find('"').unwrap_or_default())
    );
}

// ============================================================================
// Diagnostics
// ============================================================================

#[test]
fn missing_token_is_reported_after_the_previous_line() {
    let source = "%x =\n\n// trailing comment\n}";
    let err = parse_err(source);
    assert_eq!(err.message(), "expected operation name in quotes");
    assert_eq!(err.diagnostics[0].span.map(|s| s.start), Some(4));
}

#[test]
fn unregistered_dialect_needs_opt_in() {
    let (_, result) = parse_with(&ParserConfig::default(), r#""test.op"() : () -> ()"#);
    let err = result.unwrap_err();
    assert!(err.message().starts_with("operation being parsed with an unregistered dialect"));
}

#[test]
fn successors_on_registered_non_terminator_are_rejected() {
    let err = parse_err(
        r#"
func.func @f() {
  "arith.addi"() [^bb1] : () -> ()
^bb1:
  func.return
}
"#,
    );
    assert_eq!(err.message(), "successors in non-terminator");
}

#[test]
fn terminator_must_be_last_when_verifying() {
    let err = parse_err(
        r#"
func.func @f() {
  func.return
  "test.op"() : () -> ()
}
"#,
    );
    assert_eq!(
        err.message(),
        "'func.return' op must be the last operation in the parent block"
    );

    let config = ParserConfig::default()
        .allow_unknown_dialects(true)
        .verify_after_parse(false);
    let (_, result) = parse_with(
        &config,
        r#"
func.func @f() {
  func.return
  "test.op"() : () -> ()
}
"#,
    );
    assert!(result.is_ok());
}

// ============================================================================
// Custom syntax
// ============================================================================

#[test]
fn unqualified_names_use_the_enclosing_default_dialect() {
    let (ctx, parsed) = parse(
        r#"
module @m {
  func.func private @decl(i32) -> i32
  func.func @f(%a: i32) -> i32 {
    %r = call @decl(%a) : (i32) -> i32
    return %r : i32
  }
}
"#,
    );
    let module = top_ops(&ctx, parsed)[0];
    assert_eq!(ctx.op(module).full_name(), "builtin.module");
    let body = ctx.region(ctx.op(module).regions[0]).blocks[0];
    let func = ctx.block(body).ops[1];
    let entry = ctx.region(ctx.op(func).regions[0]).blocks[0];
    let names: Vec<String> = ctx
        .block(entry)
        .ops
        .iter()
        .map(|&op| ctx.op(op).full_name())
        .collect();
    assert_eq!(names, vec!["func.call", "func.return"]);
}

#[test]
fn unknown_custom_ops_mention_the_qualified_attempt() {
    let err = parse_err(
        r#"
func.func @f() {
  frobnicate
}
"#,
    );
    assert_eq!(
        err.message(),
        "custom op 'frobnicate' is unknown (tried 'func.frobnicate' as well)"
    );

    let err = parse_err("nodialect.op");
    assert_eq!(
        err.message(),
        "Dialect `nodialect' not found for custom op 'nodialect.op'"
    );
    assert_eq!(
        err.diagnostics[0].notes[0].message,
        "Registered dialects: arith, builtin, cf, func, scf"
    );
}

#[test]
fn function_signature_and_attributes() {
    let (ctx, parsed) = parse(
        r#"
func.func private @f(%a: i32 {test.flag}, %b: i64) -> (i32, i64) attributes {test.extra = 1} {
  func.return %a, %b : i32, i64
}
"#,
    );
    let func = top_ops(&ctx, parsed)[0];
    let data = ctx.op(func);
    let attr = |name: &str| {
        data.attributes
            .iter()
            .find(|(key, _)| **key == name)
            .map(|(_, value)| value.clone())
    };
    assert_eq!(attr("sym_name"), Some(Attribute::String("f".into())));
    assert_eq!(attr("sym_visibility"), Some(Attribute::String("private".into())));
    assert!(attr("test.extra").is_some());
    let Some(Attribute::Type(ty)) = attr("function_type") else {
        panic!("missing function type");
    };
    let (inputs, results) = ctx.types.as_function(ty).unwrap();
    assert_eq!((inputs.len(), results.len()), (2, 2));
    let Some(Attribute::List(arg_attrs)) = attr("arg_attrs") else {
        panic!("missing argument attributes");
    };
    assert_eq!(arg_attrs.len(), 2);
}

#[test]
fn function_argument_forms_cannot_be_mixed() {
    let err = parse_err("func.func @f(%a: i32, i64)");
    assert_eq!(err.message(), "custom op 'func.func' expected SSA identifier");

    let err = parse_err("func.func @f(i64, %a: i32)");
    assert_eq!(
        err.message(),
        "custom op 'func.func' expected type instead of SSA identifier"
    );
}

#[test]
fn inferred_function_attributes_are_rejected() {
    let err = parse_err(r#"func.func @f() attributes {sym_name = "g"}"#);
    assert_eq!(
        err.message(),
        "custom op 'func.func' 'sym_name' is an inferred attribute and should not be specified in the explicit attribute dictionary"
    );
}

#[test]
fn loop_carried_values() {
    let (mut ctx, parsed) = parse(
        r#"
func.func @sum(%n: index) -> i32 {
  %c0 = arith.constant 0 : index
  %c1 = arith.constant 1 : index
  %init = arith.constant 0 : i32
  %r = scf.for %i = %c0 to %n step %c1 iter_args(%acc = %init) -> (i32) {
    %next = arith.addi %acc, %acc : i32
    scf.yield %next : i32
  }
  func.return %r : i32
}
"#,
    );
    let func = top_ops(&ctx, parsed)[0];
    let entry = ctx.region(ctx.op(func).regions[0]).blocks[0];
    let for_op = ctx.block(entry).ops[3];
    assert_eq!(ctx.op(for_op).full_name(), "scf.for");
    assert_eq!(ctx.op_operands(for_op).len(), 4);
    assert_eq!(ctx.op_results(for_op).len(), 1);
    let body = ctx.region(ctx.op(for_op).regions[0]).blocks[0];
    assert_eq!(ctx.block_args(body).len(), 2);
    let index = ctx.types.index();
    assert_eq!(ctx.value_ty(ctx.block_arg(body, 0)), index);
}

#[test]
fn loop_result_count_must_match_iter_args() {
    let err = parse_err(
        r#"
%c0 = arith.constant 0 : index
%init = arith.constant 0 : i32
scf.for %i = %c0 to %c0 step %c0 iter_args(%acc = %init) -> (i32, i32) {
  scf.yield %acc : i32
}
"#,
    );
    assert_eq!(
        err.message(),
        "custom op 'scf.for' mismatch in number of loop-carried values and defined values"
    );
}

#[test]
fn comparison_predicates() {
    let (mut ctx, parsed) = parse(
        r#"
%a = arith.constant 1 : i32
%lt = arith.cmpi slt, %a, %a : i32
"#,
    );
    let cmp = top_ops(&ctx, parsed)[1];
    let predicate = ctx.op(cmp).attributes.iter().find(|(k, _)| **k == "predicate");
    assert_eq!(predicate.map(|(_, v)| v.as_int()), Some(Some(2)));
    let i1 = ctx.types.int(1);
    assert_eq!(ctx.op_result_types(cmp), &[i1]);
}

#[test]
fn duplicate_custom_attributes_are_rejected() {
    let err = parse_err(r#"%a = arith.constant {value = 1} 2 : i32"#);
    assert_eq!(
        err.message(),
        "custom op 'arith.constant' attribute 'value' occurs more than once in the attribute list"
    );
}

// ============================================================================
// Extension points
// ============================================================================

fn parse_pair(
    parser: &mut strata_asm::CustomOpParser<'_, '_>,
    state: &mut strata_asm::OperationState,
) -> ParseResult<()> {
    let span = parser.current_span();
    let operands = parser.parse_operand_list(Delimiter::Paren, Some(2))?;
    let ty = parser.parse_colon_type()?;
    state.operands = parser.resolve_operands(&operands, &[ty, ty], span)?;
    state.result_types.push(ty);
    Ok(())
}

#[test]
fn dialects_registered_by_the_caller_parse_custom_syntax() {
    let mut ctx = IrContext::new();
    let mut registry = DialectRegistry::with_builtin_dialects();
    registry.register_dialect("demo", || {
        Dialect::new("demo").with_op(OpDefinition::new("pair").with_parser(parse_pair))
    });
    let source = r#"
%a = arith.constant 1 : i32
%p = demo.pair(%a, %a) : i32
"#;
    let parsed = parse_source_str(&mut ctx, &mut registry, &ParserConfig::default(), source)
        .unwrap();
    let pair = ctx.block(parsed.block).ops[1];
    assert_eq!(ctx.op(pair).full_name(), "demo.pair");
    assert_eq!(ctx.op_operands(pair).len(), 2);
    assert!(registry.loaded_dialects().contains(&"demo"));

    let err = parse_source_str(
        &mut ctx,
        &mut registry,
        &ParserConfig::default(),
        "%a = arith.constant 1 : i32\n%p = demo.pair(%a) : i32",
    )
    .unwrap_err();
    assert_eq!(err.message(), "custom op 'demo.pair' expected 2 operands");
}

/// `kit.split %a %b? : type-list`, one type per bound result.
fn parse_split(
    parser: &mut strata_asm::CustomOpParser<'_, '_>,
    state: &mut strata_asm::OperationState,
) -> ParseResult<()> {
    let span = parser.current_span();
    let mut operands = vec![parser.parse_operand()?];
    if let Some(extra) = parser.parse_optional_operand()? {
        operands.push(extra);
    }
    parser.parse_colon()?;
    let types = parser.parse_type_list()?;
    let Some(&operand_ty) = types.first().filter(|_| types.len() == parser.num_results()) else {
        return Err(parser.emit_error(
            span,
            format!("expected {} result types", parser.num_results()),
        ));
    };
    state.operands = parser.resolve_operands(&operands, &vec![operand_ty; operands.len()], span)?;

    let names = (0..parser.num_results())
        .filter_map(|i| parser.result_name(i))
        .map(|(name, index)| Attribute::String(format!("{name}#{index}")))
        .collect();
    state.add_attribute("result_names", Attribute::List(names));
    state.result_types = types;
    Ok(())
}

/// `kit.lambda (%arg: type, ...) { ... }`
fn parse_lambda(
    parser: &mut strata_asm::CustomOpParser<'_, '_>,
    state: &mut strata_asm::OperationState,
) -> ParseResult<()> {
    let arguments = parser.parse_argument_list(Delimiter::Paren, true, false)?;
    state.regions.push(parser.parse_region(&arguments, false)?);
    Ok(())
}

/// `kit.goto ^target?`
fn parse_goto(
    parser: &mut strata_asm::CustomOpParser<'_, '_>,
    state: &mut strata_asm::OperationState,
) -> ParseResult<()> {
    match parser.parse_optional_successor()? {
        Some(target) => state.successors.push(target),
        None => state.add_attribute("fallthrough", Attribute::Unit),
    }
    Ok(())
}

fn kit_registry() -> DialectRegistry {
    let mut registry = DialectRegistry::with_builtin_dialects();
    registry.register_dialect("kit", || {
        Dialect::new("kit")
            .with_op(OpDefinition::new("split").with_parser(parse_split))
            .with_op(OpDefinition::new("lambda").with_parser(parse_lambda))
            .with_op(OpDefinition::new("goto").terminator().with_parser(parse_goto))
    });
    registry
}

#[test]
fn custom_hooks_see_result_names_arguments_and_successors() {
    let mut ctx = IrContext::new();
    let mut registry = kit_registry();
    let config = ParserConfig::default().allow_unknown_dialects(true);
    let source = r#"
%a = "test.def"() : () -> i32
%b = "test.def"() : () -> i32
%p:2, %q = kit.split %a %b : i32, i32, i32
kit.lambda (%x: i32, %y: i32) {
  "test.use"(%x, %y, %q) : (i32, i32, i32) -> ()
  kit.goto ^exit
^exit:
  kit.goto
}
"#;
    let parsed = parse_source_str(&mut ctx, &mut registry, &config, source).unwrap();
    let ops = top_ops(&ctx, parsed);

    let split = ops[2];
    assert_eq!(
        ctx.op_operands(split),
        &[ctx.op_result(ops[0], 0), ctx.op_result(ops[1], 0)]
    );
    assert_eq!(ctx.op_results(split).len(), 3);
    assert_eq!(
        ctx.op(split).attributes.get(&Symbol::new("result_names")),
        Some(&Attribute::List(vec![
            Attribute::String("p#0".into()),
            Attribute::String("p#1".into()),
            Attribute::String("q#0".into()),
        ]))
    );

    let region = ctx.op(ops[3]).regions[0];
    let &[entry, exit] = ctx.region(region).blocks.as_slice() else {
        panic!("expected entry and exit blocks");
    };
    assert_eq!(ctx.block_args(entry).len(), 2);
    let user = ctx.block(entry).ops[0];
    assert_eq!(&ctx.op_operands(user)[..2], ctx.block_args(entry));
    assert_eq!(ctx.op_operands(user)[2], ctx.op_result(split, 2));

    let jump = ctx.block(entry).ops[1];
    assert_eq!(ctx.op(jump).successors.as_slice(), &[exit]);
    let fallthrough = ctx.block(exit).ops[0];
    assert!(ctx.op(fallthrough).successors.is_empty());
    assert!(ctx.op(fallthrough).attributes.contains_key(&Symbol::new("fallthrough")));
}

#[test]
fn custom_hook_checks_result_types_against_bound_names() {
    let mut ctx = IrContext::new();
    let mut registry = kit_registry();
    let config = ParserConfig::default().allow_unknown_dialects(true);
    let err = parse_source_str(
        &mut ctx,
        &mut registry,
        &config,
        "%a = \"test.def\"() : () -> i32\n%p:2 = kit.split %a : i32",
    )
    .unwrap_err();
    assert_eq!(err.message(), "custom op 'kit.split' expected 2 result types");
}

// ============================================================================
// Printing
// ============================================================================

#[test]
fn generic_form_reparses_to_the_same_graph() {
    let source = r#"
func.func @f(%x: i32, %c: i1) -> i32 {
  cf.cond_br %c, ^then(%x : i32), ^done(%x : i32)
^then(%t: i32):
  %y = arith.muli %t, %t : i32
  cf.br ^done(%y : i32)
^done(%r: i32):
  func.return %r : i32
}
"#;
    let (ctx, parsed) = parse(source);
    let printed = print_block_ops(&ctx, parsed.block);

    let (reparsed_ctx, reparsed) = parse(&printed);
    assert_eq!(print_block_ops(&reparsed_ctx, reparsed.block), printed);
}

#[test]
fn printed_forward_reference() {
    let (ctx, parsed) = parse(
        r#"
"test.use"(%a) : (i32) -> ()
%a = "test.def"() {n = 1 : i32} : () -> i32
"#,
    );
    insta::assert_snapshot!(print_block_ops(&ctx, parsed.block), @r#"
    "test.use"(%0) : (i32) -> ()
    %0 = "test.def"() {n = 1 : i32} : () -> i32
    "#);
}
