//! Single-pass builder from tokens to the program graph.
//!
//! [`OperationParser`] drives the lexer, resolves names through the
//! [`ScopedSymbolTable`], and creates operations directly in the
//! [`IrContext`]. The submodules split it by concern:
//!
//! - `types`: types, attributes, location specifiers
//! - `operation`: result groups, generic operations, SSA uses
//! - `region`: regions, blocks, block argument lists
//! - `custom`: custom-syntax dispatch and [`CustomOpParser`]
//! - `top_level`: aliases and the top-level operation loop
//! - `finalize`: end-of-input checks

pub mod custom;
mod finalize;
mod operation;
mod region;
mod top_level;
mod types;

use std::collections::HashMap;

use strata_ir::{Attribute, BlockRef, IrContext, Location, PathRef, RegionRef, Span, TypeRef};

use crate::config::ParserConfig;
use crate::diagnostic::{Diagnostic, ParseError, ParseResult};
use crate::lexer::{Lexer, Token, TokenKind};
use crate::registry::DialectRegistry;
use crate::symbol_table::ScopedSymbolTable;

pub use custom::{Argument, CustomOpParser};

/// Bracketing around a comma separated list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Delimiter {
    /// No delimiter; the list must have at least one element.
    None,
    Paren,
    /// `(...)` if the next token is `(`, otherwise nothing.
    OptionalParen,
    LessGreater,
    OptionalLessGreater,
    Square,
    OptionalSquare,
    Braces,
    OptionalBraces,
}

impl Delimiter {
    fn tokens(self) -> Option<(TokenKind, TokenKind, bool)> {
        use TokenKind::*;
        match self {
            Delimiter::None => None,
            Delimiter::Paren => Some((LParen, RParen, false)),
            Delimiter::OptionalParen => Some((LParen, RParen, true)),
            Delimiter::LessGreater => Some((Less, Greater, false)),
            Delimiter::OptionalLessGreater => Some((Less, Greater, true)),
            Delimiter::Square => Some((LSquare, RSquare, false)),
            Delimiter::OptionalSquare => Some((LSquare, RSquare, true)),
            Delimiter::Braces => Some((LBrace, RBrace, false)),
            Delimiter::OptionalBraces => Some((LBrace, RBrace, true)),
        }
    }
}

/// A `loc(#alias)` whose alias was not yet defined when it was parsed.
#[derive(Clone, Debug)]
struct DeferredLoc {
    alias: String,
    span: Span,
}

/// Parser state for one input.
pub struct OperationParser<'a> {
    source: &'a str,
    lexer: Lexer<'a>,
    token: Token<'a>,

    ctx: &'a mut IrContext,
    registry: &'a mut DialectRegistry,
    config: &'a ParserConfig,
    path: PathRef,

    symbols: ScopedSymbolTable,
    attribute_aliases: HashMap<String, Attribute>,
    type_aliases: HashMap<String, TypeRef>,
    deferred_locs: Vec<DeferredLoc>,
    /// Namespaces used to complete unqualified custom op names, innermost
    /// last. The bottom entry is `builtin`.
    default_dialects: Vec<&'static str>,

    /// Block that newly created operations are appended to.
    insertion: BlockRef,
    top_region: RegionRef,
}

impl<'a> OperationParser<'a> {
    pub(crate) fn new(
        source: &'a str,
        ctx: &'a mut IrContext,
        registry: &'a mut DialectRegistry,
        config: &'a ParserConfig,
        top_region: RegionRef,
        top_block: BlockRef,
    ) -> Self {
        let path = ctx.paths.intern(config.source_name.as_str());
        let mut lexer = Lexer::new(source);
        let token = lexer.next_token();
        let mut symbols = ScopedSymbolTable::new();
        symbols.push_scope(true);
        Self {
            source,
            lexer,
            token,
            ctx,
            registry,
            config,
            path,
            symbols,
            attribute_aliases: HashMap::new(),
            type_aliases: HashMap::new(),
            deferred_locs: Vec::new(),
            default_dialects: vec!["builtin"],
            insertion: top_block,
            top_region,
        }
    }

    // ========================================================================
    // Token cursor
    // ========================================================================

    fn consume(&mut self) -> Token<'a> {
        let current = self.token;
        self.token = self.lexer.next_token();
        current
    }

    fn consume_if(&mut self, kind: TokenKind) -> bool {
        if self.token.is(kind) {
            self.consume();
            true
        } else {
            false
        }
    }

    fn consume_keyword_if(&mut self, keyword: &str) -> bool {
        if self.token.is_keyword(keyword) {
            self.consume();
            true
        } else {
            false
        }
    }

    /// Consume a token of `kind` or fail with `message` at the end of the
    /// preceding meaningful text.
    fn expect(&mut self, kind: TokenKind, message: &str) -> ParseResult<Span> {
        if self.token.is(kind) {
            Ok(self.consume().span)
        } else {
            Err(self.wrong_token_error(message))
        }
    }

    fn location(&self, span: Span) -> Location {
        Location::new(self.path, span)
    }

    // ========================================================================
    // Diagnostics
    // ========================================================================

    /// Error at `span`. A lexer error at the current token takes precedence
    /// because everything after it is unreliable.
    fn error_at(&self, span: Span, message: impl Into<String>) -> ParseError {
        if let TokenKind::Error(lexer_message) = self.token.kind {
            return Diagnostic::error(self.token.span, lexer_message).into();
        }
        Diagnostic::error(span, message).into()
    }

    /// Error at the current token, or just before the end of input.
    fn error(&self, message: impl Into<String>) -> ParseError {
        let mut offset = self.token.span.start;
        if self.token.is(TokenKind::Eof) {
            offset = self.prev_char_boundary(offset);
        }
        self.error_at(Span::point(offset), message)
    }

    /// Error for an unexpected token, reported at the end of the last
    /// meaningful text before it rather than at the unrelated next line.
    fn wrong_token_error(&self, message: impl Into<String>) -> ParseError {
        let mut offset = self.token.span.start;
        if self.token.is(TokenKind::Eof) {
            offset = self.prev_char_boundary(offset);
        }
        let original = offset;

        let mut prefix = &self.source[..offset];
        let target = loop {
            prefix = prefix.trim_end_matches([' ', '\t']);
            if prefix.is_empty() {
                break original;
            }
            if !prefix.ends_with(['\n', '\r']) {
                break prefix.len();
            }
            prefix = &prefix[..prefix.len() - 1];

            // Skip a `//` comment on the preceding line.
            let line_start = prefix.rfind(['\n', '\r']).unwrap_or(0);
            if let Some(comment) = prefix[line_start..].find("//") {
                prefix = &prefix[..line_start + comment];
            }
        };
        self.error_at(Span::point(target), message)
    }

    fn prev_char_boundary(&self, offset: usize) -> usize {
        self.source[..offset]
            .char_indices()
            .next_back()
            .map_or(0, |(i, _)| i)
    }

    // ========================================================================
    // Lists
    // ========================================================================

    /// Parse `element (',' element)*` inside `delimiter`. An empty list is
    /// accepted directly after an opening delimiter.
    fn parse_comma_separated_list(
        &mut self,
        delimiter: Delimiter,
        context: &str,
        mut element: impl FnMut(&mut Self) -> ParseResult<()>,
    ) -> ParseResult<()> {
        let closing = match delimiter.tokens() {
            None => None,
            Some((open, close, optional)) => {
                if optional && !self.token.is(open) {
                    return Ok(());
                }
                self.expect(open, &format!("expected '{}'{context}", open.spelling()))?;
                if self.consume_if(close) {
                    return Ok(());
                }
                Some(close)
            }
        };

        element(self)?;
        while self.consume_if(TokenKind::Comma) {
            element(self)?;
        }

        if let Some(close) = closing {
            self.expect(close, &format!("expected '{}'{context}", close.spelling()))?;
        }
        Ok(())
    }

    /// Parse `element (',' element)* right`, where the opening token has
    /// already been consumed.
    fn parse_comma_separated_list_until(
        &mut self,
        right: TokenKind,
        allow_empty: bool,
        element: impl FnMut(&mut Self) -> ParseResult<()>,
    ) -> ParseResult<()> {
        if self.token.is(right) {
            if !allow_empty {
                return Err(self.wrong_token_error("expected list element"));
            }
            self.consume();
            return Ok(());
        }
        self.parse_comma_separated_list(Delimiter::None, "", element)?;
        self.expect(right, &format!("expected ',' or '{}'", right.spelling()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_ir::{BlockData, RegionData};

    fn with_parser<R>(source: &str, f: impl FnOnce(&mut OperationParser<'_>) -> R) -> R {
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
    fn wrong_token_backs_up_over_blank_lines_and_comments() {
        let source = "foo   // trailing\n\n   \n  bar";
        let span = with_parser(source, |p| {
            p.consume();
            p.wrong_token_error("expected ':'").diagnostics[0].span
        });
        assert_eq!(span, Some(Span::point(3)));
    }

    #[test]
    fn wrong_token_on_same_line_points_after_previous_text() {
        let span = with_parser("foo bar", |p| {
            p.consume();
            p.wrong_token_error("expected ':'").diagnostics[0].span
        });
        assert_eq!(span, Some(Span::point(3)));
    }

    #[test]
    fn errors_at_end_of_input_back_up_one_char() {
        let span = with_parser("foo\n", |p| {
            p.consume();
            assert!(p.token.is(TokenKind::Eof));
            p.error("unexpected end").diagnostics[0].span
        });
        assert_eq!(span, Some(Span::point(3)));
    }

    #[test]
    fn lexer_errors_take_precedence() {
        let err = with_parser("\"open", |p| p.error("expected operation name"));
        assert_eq!(err.message(), "expected '\"' in string literal");
    }

    #[test]
    fn comma_lists_accept_empty_and_report_closing() {
        with_parser("() (a, b) (a b", |p| {
            let mut count = 0;
            p.parse_comma_separated_list(Delimiter::Paren, " in test", |p| {
                p.consume();
                count += 1;
                Ok(())
            })
            .unwrap();
            assert_eq!(count, 0);

            p.parse_comma_separated_list(Delimiter::Paren, " in test", |p| {
                p.consume();
                count += 1;
                Ok(())
            })
            .unwrap();
            assert_eq!(count, 2);

            let err = p
                .parse_comma_separated_list(Delimiter::Paren, " in test", |p| {
                    p.consume();
                    Ok(())
                })
                .unwrap_err();
            assert_eq!(err.message(), "expected ')' in test");
        });
    }

    #[test]
    fn optional_delimiter_skips_missing_list() {
        with_parser("x", |p| {
            p.parse_comma_separated_list(Delimiter::OptionalSquare, "", |_| {
                panic!("no element expected")
            })
            .unwrap();
            assert!(p.token.is_keyword("x"));
        });
    }
}
