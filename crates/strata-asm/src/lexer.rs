//! Token source built from winnow combinators.
//!
//! The lexer never fails: malformed input becomes a [`TokenKind::Error`]
//! token carrying a message, and the parser reports it at that token.

use strata_ir::Span;
use winnow::ascii::digit1;
use winnow::combinator::{alt, opt, preceded, repeat};
use winnow::prelude::*;
use winnow::token::{any, one_of, take_till, take_while};

/// Classification of a token.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Eof,
    Error(&'static str),

    /// `[A-Za-z_][A-Za-z0-9_$.]*`, also used for keywords.
    BareIdent,
    /// `@name` or `@"quoted name"`.
    AtIdent,
    /// `^name`, block labels.
    CaretIdent,
    /// `!name`, types and type aliases.
    ExclamationIdent,
    /// `#name`, attribute aliases and result numbers.
    HashIdent,
    /// `%name`, SSA values.
    PercentIdent,

    Integer,
    Float,
    String,

    Arrow,
    Colon,
    Comma,
    Equal,
    Greater,
    Less,
    LBrace,
    RBrace,
    LParen,
    RParen,
    LSquare,
    RSquare,
    Minus,
    Plus,
    Question,
    Star,
}

impl TokenKind {
    /// Fixed spelling of punctuation tokens, used in diagnostics.
    pub fn spelling(self) -> &'static str {
        match self {
            TokenKind::Arrow => "->",
            TokenKind::Colon => ":",
            TokenKind::Comma => ",",
            TokenKind::Equal => "=",
            TokenKind::Greater => ">",
            TokenKind::Less => "<",
            TokenKind::LBrace => "{",
            TokenKind::RBrace => "}",
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::LSquare => "[",
            TokenKind::RSquare => "]",
            TokenKind::Minus => "-",
            TokenKind::Plus => "+",
            TokenKind::Question => "?",
            TokenKind::Star => "*",
            TokenKind::Eof => "end of input",
            _ => "token",
        }
    }
}

/// A classified slice of the source.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    pub span: Span,
}

impl<'a> Token<'a> {
    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }

    pub fn is_keyword(&self, keyword: &str) -> bool {
        self.kind == TokenKind::BareIdent && self.text == keyword
    }

    /// Value of an integer token, decimal or `0x` hexadecimal.
    pub fn int_value(&self) -> Option<u64> {
        if self.kind != TokenKind::Integer {
            return None;
        }
        match self.text.strip_prefix("0x") {
            Some(hex) => u64::from_str_radix(hex, 16).ok(),
            None => self.text.parse().ok(),
        }
    }

    pub fn float_value(&self) -> Option<f64> {
        match self.kind {
            TokenKind::Float | TokenKind::Integer => self.text.parse().ok(),
            _ => None,
        }
    }

    /// Decoded contents of a string token.
    pub fn string_value(&self) -> String {
        let mut input = self.text;
        string_lit.parse_next(&mut input).unwrap_or_default()
    }

    /// The numeric suffix of a `#N` token.
    pub fn hash_number(&self) -> Option<u32> {
        if self.kind != TokenKind::HashIdent {
            return None;
        }
        self.text[1..].parse().ok()
    }

    /// Name of an `@` identifier with quoting and escapes removed.
    pub fn symbol_name(&self) -> String {
        let rest = &self.text[1..];
        if rest.starts_with('"') {
            let mut input = rest;
            string_lit.parse_next(&mut input).unwrap_or_default()
        } else {
            rest.to_owned()
        }
    }
}

/// Produces tokens on demand from a source string.
pub struct Lexer<'a> {
    source: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self { source, pos: 0 }
    }

    pub fn source(&self) -> &'a str {
        self.source
    }

    pub fn next_token(&mut self) -> Token<'a> {
        let mut input = &self.source[self.pos..];
        let _ = trivia.parse_next(&mut input);
        let start = self.source.len() - input.len();

        let kind = if input.is_empty() {
            TokenKind::Eof
        } else {
            let checkpoint = input;
            match token_kind.parse_next(&mut input) {
                Ok(kind) => kind,
                Err(_) => {
                    input = checkpoint;
                    classify_error(&mut input)
                }
            }
        };

        let end = self.source.len() - input.len();
        self.pos = end;
        Token {
            kind,
            text: &self.source[start..end],
            span: Span::new(start, end),
        }
    }
}

// ============================================================================
// Winnow parsers
// ============================================================================

/// Whitespace and `//` line comments.
fn trivia(input: &mut &str) -> ModalResult<()> {
    repeat(
        0..,
        alt((
            take_while(1.., |c: char| c.is_ascii_whitespace()).void(),
            ("//", take_till(0.., ['\n', '\r'])).void(),
        )),
    )
    .parse_next(input)
}

fn token_kind(input: &mut &str) -> ModalResult<TokenKind> {
    alt((
        punctuation,
        number,
        bare_ident.value(TokenKind::BareIdent),
        preceded('%', suffix_id).value(TokenKind::PercentIdent),
        preceded('^', suffix_id).value(TokenKind::CaretIdent),
        preceded('#', suffix_id).value(TokenKind::HashIdent),
        preceded('!', suffix_id).value(TokenKind::ExclamationIdent),
        preceded('@', alt((bare_ident.void(), string_lit.void()))).value(TokenKind::AtIdent),
        string_lit.value(TokenKind::String),
    ))
    .parse_next(input)
}

fn punctuation(input: &mut &str) -> ModalResult<TokenKind> {
    alt((
        "->".value(TokenKind::Arrow),
        ':'.value(TokenKind::Colon),
        ','.value(TokenKind::Comma),
        '='.value(TokenKind::Equal),
        '>'.value(TokenKind::Greater),
        '<'.value(TokenKind::Less),
        '{'.value(TokenKind::LBrace),
        '}'.value(TokenKind::RBrace),
        '('.value(TokenKind::LParen),
        ')'.value(TokenKind::RParen),
        '['.value(TokenKind::LSquare),
        ']'.value(TokenKind::RSquare),
        '-'.value(TokenKind::Minus),
        '+'.value(TokenKind::Plus),
        '?'.value(TokenKind::Question),
        '*'.value(TokenKind::Star),
    ))
    .parse_next(input)
}

/// `0x1F`, `42`, `1.5`, `2.0e-3`. Signs are separate tokens.
fn number(input: &mut &str) -> ModalResult<TokenKind> {
    alt((
        ("0x", take_while(1.., |c: char| c.is_ascii_hexdigit())).value(TokenKind::Integer),
        (
            digit1,
            '.',
            take_while(0.., |c: char| c.is_ascii_digit()),
            opt((one_of(['e', 'E']), opt(one_of(['+', '-'])), digit1)),
        )
            .value(TokenKind::Float),
        digit1.value(TokenKind::Integer),
    ))
    .parse_next(input)
}

fn bare_ident<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    (
        one_of(|c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(0.., |c: char| {
            c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '.')
        }),
    )
        .take()
        .parse_next(input)
}

/// Name after a sigil: either all digits or an identifier that may also
/// contain `$`, `.` and `-`.
fn suffix_id<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    alt((
        digit1,
        (
            one_of(|c: char| c.is_ascii_alphabetic() || matches!(c, '_' | '$' | '.' | '-')),
            take_while(0.., |c: char| {
                c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '.' | '-')
            }),
        )
            .take(),
    ))
    .parse_next(input)
}

/// A quoted string with `\n`, `\t`, `\\`, `\"` and `\XX` hex escapes.
/// Raw newlines are not allowed inside the quotes.
pub(crate) fn string_lit(input: &mut &str) -> ModalResult<String> {
    '"'.parse_next(input)?;
    let mut result = String::new();
    loop {
        let c = any.parse_next(input)?;
        match c {
            '"' => break,
            '\n' | '\r' => {
                return Err(winnow::error::ErrMode::Backtrack(
                    winnow::error::ContextError::new(),
                ));
            }
            '\\' => {
                let escaped = any.parse_next(input)?;
                match escaped {
                    '"' => result.push('"'),
                    '\\' => result.push('\\'),
                    'n' => result.push('\n'),
                    't' => result.push('\t'),
                    h1 if h1.is_ascii_hexdigit() => {
                        let h2 = one_of(|c: char| c.is_ascii_hexdigit()).parse_next(input)?;
                        let code = u8::from_str_radix(&format!("{h1}{h2}"), 16).map_err(|_| {
                            winnow::error::ErrMode::Backtrack(winnow::error::ContextError::new())
                        })?;
                        result.push(code as char);
                    }
                    _ => {
                        return Err(winnow::error::ErrMode::Backtrack(
                            winnow::error::ContextError::new(),
                        ));
                    }
                }
            }
            _ => result.push(c),
        }
    }
    Ok(result)
}

/// Consume the offending input and describe what went wrong.
fn classify_error(input: &mut &str) -> TokenKind {
    let Some(first) = input.chars().next() else {
        return TokenKind::Eof;
    };
    if first == '"' || (first == '@' && input[1..].starts_with('"')) {
        // Swallow the rest of the line so the parser does not resynchronise
        // inside a broken string.
        let len = input.find(['\n', '\r']).unwrap_or(input.len());
        *input = &input[len..];
        return TokenKind::Error("expected '\"' in string literal");
    }
    *input = &input[first.len_utf8()..];
    match first {
        '%' | '^' | '#' | '!' | '@' => TokenKind::Error("invalid identifier after sigil"),
        _ => TokenKind::Error("unexpected character"),
    }
}
