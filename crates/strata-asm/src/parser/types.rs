//! Types, attributes and location specifiers.

use std::collections::BTreeMap;

use strata_ir::printer::print_attribute;
use strata_ir::{Attribute, CompositeLocation, Location, Symbol, TypeDataBuilder, TypeRef};

use super::{DeferredLoc, Delimiter, OperationParser};
use crate::diagnostic::ParseResult;
use crate::lexer::TokenKind;

/// Names of the parameterless builtin types besides `iN`.
const BUILTIN_TYPE_KEYWORDS: &[&str] = &["index", "none", "f16", "bf16", "f32", "f64"];

/// Whether `text` spells a builtin type.
pub(crate) fn is_builtin_type_keyword(text: &str) -> bool {
    BUILTIN_TYPE_KEYWORDS.contains(&text) || integer_width(text).is_some()
}

/// Width of an `iN` type name.
fn integer_width(text: &str) -> Option<u32> {
    let digits = text.strip_prefix('i')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok().filter(|&w| w > 0)
}

impl OperationParser<'_> {
    // ========================================================================
    // Types
    // ========================================================================

    /// `type ::= function-type | non-function-type`
    pub(crate) fn parse_type(&mut self) -> ParseResult<TypeRef> {
        if self.token.is(TokenKind::LParen) {
            return self.parse_function_type();
        }
        self.parse_non_function_type()
    }

    /// `function-type ::= '(' type-list? ')' '->' function-result-types`
    pub(crate) fn parse_function_type(&mut self) -> ParseResult<TypeRef> {
        let inputs = self.parse_type_list_parens()?;
        self.expect(TokenKind::Arrow, "expected '->' in function type")?;
        let results = self.parse_function_result_types()?;
        Ok(self.ctx.types.function(inputs, results))
    }

    /// Either a parenthesized type list or a single non-function type.
    pub(crate) fn parse_function_result_types(&mut self) -> ParseResult<Vec<TypeRef>> {
        if self.token.is(TokenKind::LParen) {
            return self.parse_type_list_parens();
        }
        Ok(vec![self.parse_non_function_type()?])
    }

    pub(crate) fn parse_type_list_parens(&mut self) -> ParseResult<Vec<TypeRef>> {
        self.expect(TokenKind::LParen, "expected '('")?;
        if self.consume_if(TokenKind::RParen) {
            return Ok(Vec::new());
        }
        let types = self.parse_type_list_no_parens()?;
        self.expect(TokenKind::RParen, "expected ')'")?;
        Ok(types)
    }

    pub(crate) fn parse_type_list_no_parens(&mut self) -> ParseResult<Vec<TypeRef>> {
        let mut types = Vec::new();
        self.parse_comma_separated_list(Delimiter::None, "", |p| {
            types.push(p.parse_type()?);
            Ok(())
        })?;
        Ok(types)
    }

    pub(crate) fn parse_non_function_type(&mut self) -> ParseResult<TypeRef> {
        match self.token.kind {
            TokenKind::BareIdent if is_builtin_type_keyword(self.token.text) => {
                let text = self.consume().text;
                Ok(match integer_width(text) {
                    Some(width) => self.ctx.types.int(width),
                    None => self.ctx.types.builtin(Symbol::from_dynamic(text)),
                })
            }
            TokenKind::ExclamationIdent => self.parse_extended_type(),
            _ => Err(self.wrong_token_error("expected non-function type")),
        }
    }

    /// `!alias` or `!dialect.name<type, ...>`.
    fn parse_extended_type(&mut self) -> ParseResult<TypeRef> {
        let token = self.consume();
        let identifier = &token.text[1..];

        let Some((dialect, name)) = identifier.split_once('.') else {
            return match self.type_aliases.get(identifier) {
                Some(&ty) => Ok(ty),
                None => Err(self.error_at(
                    token.span,
                    format!("undefined symbol alias id '{identifier}'"),
                )),
            };
        };

        let mut params = Vec::new();
        self.parse_comma_separated_list(Delimiter::OptionalLessGreater, " in dialect type", |p| {
            params.push(p.parse_type()?);
            Ok(())
        })?;
        let data = TypeDataBuilder::new(Symbol::from_dynamic(dialect), Symbol::from_dynamic(name))
            .params(params)
            .build();
        Ok(self.ctx.types.intern(data))
    }

    fn is_float_type(&self, ty: TypeRef) -> bool {
        let data = self.ctx.types.get(ty);
        data.dialect == "builtin"
            && data
                .name
                .with_str(|name| matches!(name, "f16" | "bf16" | "f32" | "f64"))
    }

    // ========================================================================
    // Attributes
    // ========================================================================

    pub(crate) fn parse_attribute(&mut self) -> ParseResult<Attribute> {
        match self.token.kind {
            TokenKind::BareIdent => match self.token.text {
                "true" => {
                    self.consume();
                    Ok(Attribute::Bool(true))
                }
                "false" => {
                    self.consume();
                    Ok(Attribute::Bool(false))
                }
                "unit" => {
                    self.consume();
                    Ok(Attribute::Unit)
                }
                "loc" => {
                    self.consume();
                    self.expect(TokenKind::LParen, "expected '(' in location")?;
                    let location = self.parse_location_body()?;
                    self.expect(TokenKind::RParen, "expected ')' in location")?;
                    Ok(Attribute::Location(location))
                }
                text if is_builtin_type_keyword(text) => Ok(Attribute::Type(self.parse_type()?)),
                _ => Err(self.wrong_token_error("expected attribute value")),
            },
            TokenKind::Integer | TokenKind::Float | TokenKind::Minus => self.parse_number_attribute(),
            TokenKind::String => {
                let value = self.consume().string_value();
                Ok(Attribute::String(value))
            }
            TokenKind::AtIdent => {
                let name = self.consume().symbol_name();
                Ok(Attribute::Symbol(Symbol::from_dynamic(&name)))
            }
            TokenKind::LSquare => {
                let mut elements = Vec::new();
                self.parse_comma_separated_list(Delimiter::Square, " in attribute list", |p| {
                    elements.push(p.parse_attribute()?);
                    Ok(())
                })?;
                Ok(Attribute::List(elements))
            }
            TokenKind::LBrace => {
                let entries = self.parse_attribute_dict()?;
                Ok(Attribute::Dict(entries.into_iter().collect::<BTreeMap<_, _>>()))
            }
            TokenKind::HashIdent => {
                let token = self.consume();
                let identifier = &token.text[1..];
                match self.attribute_aliases.get(identifier) {
                    Some(attr) => Ok(attr.clone()),
                    None => Err(self.error_at(
                        token.span,
                        format!("undefined symbol alias id '{identifier}'"),
                    )),
                }
            }
            TokenKind::LParen | TokenKind::ExclamationIdent => Ok(Attribute::Type(self.parse_type()?)),
            _ => Err(self.wrong_token_error("expected attribute value")),
        }
    }

    /// `'-'? (integer | float) (':' type)?`
    fn parse_number_attribute(&mut self) -> ParseResult<Attribute> {
        let negative = self.consume_if(TokenKind::Minus);
        let token = self.token;
        if !matches!(token.kind, TokenKind::Integer | TokenKind::Float) {
            return Err(self.wrong_token_error("expected constant integer or floating point value"));
        }
        self.consume();

        let ty = if self.consume_if(TokenKind::Colon) {
            Some(self.parse_type()?)
        } else {
            None
        };
        let as_float = token.is(TokenKind::Float) || ty.is_some_and(|ty| self.is_float_type(ty));

        if as_float {
            let Some(mut value) = token.float_value() else {
                return Err(self.error_at(token.span, "floating point value too large"));
            };
            if negative {
                value = -value;
            }
            let bits = value.to_bits();
            return Ok(match ty {
                Some(ty) => Attribute::TypedFloat(bits, ty),
                None => Attribute::FloatBits(bits),
            });
        }

        let Some(magnitude) = token.int_value() else {
            return Err(self.error_at(token.span, "integer constant out of range for attribute"));
        };
        let bits = if negative {
            magnitude.wrapping_neg()
        } else {
            magnitude
        };
        Ok(match ty {
            Some(ty) => Attribute::TypedInt(bits, ty),
            None => Attribute::IntBits(bits),
        })
    }

    /// `'{' (name ('=' attribute)?)* '}'`. A name without a value is a unit
    /// attribute.
    pub(crate) fn parse_attribute_dict(&mut self) -> ParseResult<Vec<(Symbol, Attribute)>> {
        let mut entries: Vec<(Symbol, Attribute)> = Vec::new();
        self.parse_comma_separated_list(Delimiter::Braces, " in attribute dictionary", |p| {
            let name = match p.token.kind {
                TokenKind::String => p.token.string_value(),
                TokenKind::BareIdent => p.token.text.to_owned(),
                _ => return Err(p.wrong_token_error("expected attribute name")),
            };
            if name.is_empty() {
                return Err(p.error("expected valid attribute name"));
            }
            let key = Symbol::from_dynamic(&name);
            if entries.iter().any(|(existing, _)| *existing == key) {
                return Err(p.error(format!("duplicate key '{name}' in dictionary attribute")));
            }
            p.consume();

            let value = if p.consume_if(TokenKind::Equal) {
                p.parse_attribute()?
            } else {
                Attribute::Unit
            };
            entries.push((key, value));
            Ok(())
        })?;
        Ok(entries)
    }

    // ========================================================================
    // Locations
    // ========================================================================

    /// Parse `loc(...)` if present.
    pub(crate) fn parse_optional_location_specifier(&mut self) -> ParseResult<Option<Location>> {
        if !self.consume_keyword_if("loc") {
            return Ok(None);
        }
        self.expect(TokenKind::LParen, "expected '(' in location")?;
        let location = self.parse_location_body()?;
        self.expect(TokenKind::RParen, "expected ')' in location")?;
        Ok(Some(location))
    }

    /// Contents of `loc(...)`: an alias or a location instance.
    fn parse_location_body(&mut self) -> ParseResult<Location> {
        if self.token.is(TokenKind::HashIdent) && !self.token.text.contains('.') {
            return self.parse_location_alias();
        }
        self.parse_location_instance()
    }

    /// `#alias`. An alias that is not yet defined is recorded and resolved
    /// once the whole input has been read.
    fn parse_location_alias(&mut self) -> ParseResult<Location> {
        let token = self.consume();
        let identifier = &token.text[1..];
        match self.attribute_aliases.get(identifier) {
            Some(Attribute::Location(location)) => Ok(*location),
            Some(other) => Err(self.error_at(
                token.span,
                format!(
                    "expected location, but found '{}'",
                    print_attribute(self.ctx, other)
                ),
            )),
            None => {
                let index = self.deferred_locs.len() as u32;
                self.deferred_locs.push(DeferredLoc {
                    alias: identifier.to_owned(),
                    span: token.span,
                });
                Ok(Location::Deferred(index))
            }
        }
    }

    /// `unknown`, `"file":line:col`, `"name"`, `"name"(child)`,
    /// `callsite(callee at caller)`, `fused<metadata>[loc, ...]`, or an
    /// already defined `#alias`.
    fn parse_location_instance(&mut self) -> ParseResult<Location> {
        if self.consume_keyword_if("unknown") {
            return Ok(Location::Unknown);
        }
        if self.token.is_keyword("callsite") {
            return self.parse_callsite_location();
        }
        if self.token.is_keyword("fused") {
            return self.parse_fused_location();
        }
        if self.token.is(TokenKind::HashIdent) {
            return self.parse_nested_location_alias();
        }
        if !self.token.is(TokenKind::String) {
            return Err(self.wrong_token_error("expected location instance"));
        }
        let text = self.consume().string_value();

        if self.consume_if(TokenKind::LParen) {
            let child_start = self.token.span;
            let child = self.parse_location_instance()?;
            if self.is_name_location(&child) {
                return Err(self.error_at(child_start, "child of NameLoc cannot be another NameLoc"));
            }
            self.expect(TokenKind::RParen, "expected ')' after child location of NameLoc")?;
            return Ok(self.ctx.locations.intern(CompositeLocation::Named {
                name: Symbol::from_dynamic(&text),
                child,
            }));
        }
        if !self.consume_if(TokenKind::Colon) {
            return Ok(Location::Name(Symbol::from_dynamic(&text)));
        }
        let line = self.parse_location_number("expected integer line number in FileLineColLoc")?;
        self.expect(TokenKind::Colon, "expected ':' in FileLineColLoc")?;
        let column =
            self.parse_location_number("expected integer column number in FileLineColLoc")?;
        Ok(Location::FileLineCol {
            path: self.ctx.paths.intern(text),
            line,
            column,
        })
    }

    fn is_name_location(&self, location: &Location) -> bool {
        match location {
            Location::Name(_) => true,
            Location::Composite(r) => matches!(
                self.ctx.locations.get(*r),
                CompositeLocation::Named { .. }
            ),
            _ => false,
        }
    }

    /// `callsite(callee at caller)`
    fn parse_callsite_location(&mut self) -> ParseResult<Location> {
        self.consume();
        self.expect(TokenKind::LParen, "expected '(' in callsite location")?;
        let callee = self.parse_location_instance()?;
        if !self.consume_keyword_if("at") {
            return Err(self.wrong_token_error("expected 'at' in callsite location"));
        }
        let caller = self.parse_location_instance()?;
        self.expect(TokenKind::RParen, "expected ')' in callsite location")?;
        Ok(self
            .ctx
            .locations
            .intern(CompositeLocation::CallSite { callee, caller }))
    }

    /// `fused ('<' attribute '>')? '[' location (',' location)* ']'`
    fn parse_fused_location(&mut self) -> ParseResult<Location> {
        self.consume();
        let metadata = if self.consume_if(TokenKind::Less) {
            let metadata = self.parse_attribute()?;
            self.expect(TokenKind::Greater, "expected '>' after fused location metadata")?;
            Some(metadata)
        } else {
            None
        };

        let mut locations = Vec::new();
        self.parse_comma_separated_list(Delimiter::Square, " in fused location", |p| {
            locations.push(p.parse_location_instance()?);
            Ok(())
        })?;
        Ok(self.ctx.locations.intern(CompositeLocation::Fused {
            metadata,
            locations,
        }))
    }

    /// An alias nested inside another location must already be defined.
    fn parse_nested_location_alias(&mut self) -> ParseResult<Location> {
        let token = self.consume();
        let identifier = &token.text[1..];
        match self.attribute_aliases.get(identifier) {
            Some(Attribute::Location(location)) => Ok(*location),
            Some(other) => Err(self.error_at(
                token.span,
                format!(
                    "expected location, but found '{}'",
                    print_attribute(self.ctx, other)
                ),
            )),
            None => Err(self.error_at(
                token.span,
                format!("undefined symbol alias id '{identifier}'"),
            )),
        }
    }

    fn parse_location_number(&mut self, message: &str) -> ParseResult<u32> {
        if !self.token.is(TokenKind::Integer) {
            return Err(self.wrong_token_error(message));
        }
        let token = self.consume();
        token
            .int_value()
            .and_then(|v| u32::try_from(v).ok())
            .ok_or_else(|| self.error_at(token.span, message))
    }
}

#[cfg(test)]
mod tests {
    use strata_ir::printer::{print_location, print_type};
    use strata_ir::{BlockData, IrContext, RegionData};

    use super::*;
    use crate::config::ParserConfig;
    use crate::registry::DialectRegistry;

    fn run<R>(source: &str, f: impl FnOnce(&mut OperationParser<'_>) -> R) -> R {
        let mut ctx = IrContext::new();
        let mut registry = DialectRegistry::new();
        let config = ParserConfig::default();
        let block = ctx.create_block(BlockData::new(Location::Unknown));
        let region = ctx.create_region(RegionData {
            location: Location::Unknown,
            blocks: Default::default(),
            parent_op: None,
        });
        let mut parser =
            OperationParser::new(source, &mut ctx, &mut registry, &config, region, block);
        f(&mut parser)
    }

    #[test]
    fn parse_builtin_and_function_types() {
        run("i32 (i1, index) -> f32 () -> (i8, !test.pair<i32, none>)", |p| {
            let ty = p.parse_type().unwrap();
            assert_eq!(print_type(p.ctx, ty), "i32");
            let ty = p.parse_type().unwrap();
            assert_eq!(print_type(p.ctx, ty), "(i1, index) -> f32");
            let ty = p.parse_type().unwrap();
            assert_eq!(print_type(p.ctx, ty), "() -> (i8, !test.pair<i32, none>)");
        });
    }

    #[test]
    fn type_errors() {
        run("!missing", |p| {
            let err = p.parse_type().unwrap_err();
            assert_eq!(err.message(), "undefined symbol alias id 'missing'");
        });
        run("foo", |p| {
            let err = p.parse_type().unwrap_err();
            assert_eq!(err.message(), "expected non-function type");
        });
        run("(i32) i32", |p| {
            let err = p.parse_type().unwrap_err();
            assert_eq!(err.message(), "expected '->' in function type");
        });
    }

    #[test]
    fn parse_scalar_attributes() {
        run(r#"true -5 : i64 2.5 0x10 "s" @sym unit i32"#, |p| {
            assert_eq!(p.parse_attribute().unwrap(), Attribute::Bool(true));
            let i64_ty = p.ctx.types.int(64);
            assert_eq!(
                p.parse_attribute().unwrap(),
                Attribute::TypedInt((-5i64) as u64, i64_ty)
            );
            assert_eq!(
                p.parse_attribute().unwrap(),
                Attribute::FloatBits(2.5f64.to_bits())
            );
            assert_eq!(p.parse_attribute().unwrap(), Attribute::IntBits(16));
            assert_eq!(p.parse_attribute().unwrap(), Attribute::String("s".into()));
            assert_eq!(
                p.parse_attribute().unwrap(),
                Attribute::Symbol(Symbol::new("sym"))
            );
            assert_eq!(p.parse_attribute().unwrap(), Attribute::Unit);
            let i32_ty = p.ctx.types.int(32);
            assert_eq!(p.parse_attribute().unwrap(), Attribute::Type(i32_ty));
        });
    }

    #[test]
    fn integer_literal_with_float_type_is_float() {
        run("3 : f32", |p| {
            let f32_ty = p.ctx.types.builtin(Symbol::new("f32"));
            assert_eq!(
                p.parse_attribute().unwrap(),
                Attribute::TypedFloat(3.0f64.to_bits(), f32_ty)
            );
        });
    }

    #[test]
    fn attribute_dict_rejects_duplicate_keys() {
        run("{a, b = 1, \"c\" = [true]}", |p| {
            let entries = p.parse_attribute_dict().unwrap();
            let keys: Vec<_> = entries.iter().map(|(k, _)| k.to_string()).collect();
            assert_eq!(keys, vec!["a", "b", "c"]);
            assert_eq!(entries[0].1, Attribute::Unit);
        });
        run("{a = 1, a = 2}", |p| {
            let err = p.parse_attribute_dict().unwrap_err();
            assert_eq!(err.message(), "duplicate key 'a' in dictionary attribute");
        });
    }

    #[test]
    fn locations() {
        run(r#"loc("f.mlir":3:9) loc("named") loc(unknown) loc(#later)"#, |p| {
            let loc = p.parse_optional_location_specifier().unwrap().unwrap();
            let path = p.ctx.paths.intern("f.mlir");
            assert_eq!(
                loc,
                Location::FileLineCol {
                    path,
                    line: 3,
                    column: 9
                }
            );
            assert_eq!(
                p.parse_optional_location_specifier().unwrap(),
                Some(Location::Name(Symbol::new("named")))
            );
            assert_eq!(
                p.parse_optional_location_specifier().unwrap(),
                Some(Location::Unknown)
            );
            assert_eq!(
                p.parse_optional_location_specifier().unwrap(),
                Some(Location::Deferred(0))
            );
            assert_eq!(p.deferred_locs[0].alias, "later");
            assert_eq!(p.parse_optional_location_specifier().unwrap(), None);
        });
    }

    #[test]
    fn composite_locations() {
        let source = r#"loc(callsite("callee"("a.mlir":1:2) at "b.mlir":3:4)) loc(fused<"meta">["x", unknown]) loc(fused[])"#;
        run(source, |p| {
            let site = p.parse_optional_location_specifier().unwrap().unwrap();
            let Location::Composite(r) = site else {
                panic!("expected composite location, got {site:?}");
            };
            let CompositeLocation::CallSite { callee, caller } = p.ctx.locations.get(r).clone()
            else {
                panic!("expected callsite");
            };
            assert!(matches!(caller, Location::FileLineCol { line: 3, column: 4, .. }));
            let Location::Composite(named) = callee else {
                panic!("expected named callee, got {callee:?}");
            };
            assert!(matches!(
                p.ctx.locations.get(named),
                CompositeLocation::Named { child: Location::FileLineCol { line: 1, .. }, .. }
            ));

            let fused = p.parse_optional_location_specifier().unwrap().unwrap();
            assert_eq!(
                print_location(p.ctx, &fused),
                r#"loc(fused<"meta">["x", unknown])"#
            );
            let empty = p.parse_optional_location_specifier().unwrap().unwrap();
            assert_eq!(print_location(p.ctx, &empty), "loc(fused[])");
        });
    }

    #[test]
    fn composite_location_errors() {
        run(r#"loc(callsite("a" "b"))"#, |p| {
            let err = p.parse_optional_location_specifier().unwrap_err();
            assert_eq!(err.message(), "expected 'at' in callsite location");
        });
        run(r#"loc("outer"("inner"))"#, |p| {
            let err = p.parse_optional_location_specifier().unwrap_err();
            assert_eq!(err.message(), "child of NameLoc cannot be another NameLoc");
        });
        run(r#"loc(fused<"m" ["a"])"#, |p| {
            let err = p.parse_optional_location_specifier().unwrap_err();
            assert_eq!(err.message(), "expected '>' after fused location metadata");
        });
        run(r#"loc(callsite(#missing at unknown))"#, |p| {
            let err = p.parse_optional_location_specifier().unwrap_err();
            assert_eq!(err.message(), "undefined symbol alias id 'missing'");
        });
    }

    #[test]
    fn location_alias_must_name_a_location() {
        run("loc(#a)", |p| {
            p.attribute_aliases.insert("a".into(), Attribute::Bool(true));
            let err = p.parse_optional_location_specifier().unwrap_err();
            assert_eq!(err.message(), "expected location, but found 'true'");
        });
        run("loc(\"f\":1)", |p| {
            let err = p.parse_optional_location_specifier().unwrap_err();
            assert_eq!(err.message(), "expected ':' in FileLineColLoc");
        });
    }
}
