//! Top-level loop: alias definitions and operations until end of input.

use crate::diagnostic::{Diagnostic, ParseResult};
use crate::lexer::TokenKind;

use super::OperationParser;

impl OperationParser<'_> {
    /// Parse the whole input into the top-level block, then finalize.
    pub(crate) fn parse_top_level(&mut self) -> ParseResult<()> {
        loop {
            match self.token.kind {
                TokenKind::Eof => return self.finalize(),
                TokenKind::Error(message) => {
                    return Err(Diagnostic::error(self.token.span, message).into());
                }
                TokenKind::HashIdent => self.parse_attribute_alias_def()?,
                TokenKind::ExclamationIdent => self.parse_type_alias_def()?,
                _ => self.parse_operation()?,
            }
        }
    }

    /// `attribute-alias-def ::= '#' alias-name '=' attribute-value`
    fn parse_attribute_alias_def(&mut self) -> ParseResult<()> {
        let token = self.token;
        let alias = &token.text[1..];
        if self.attribute_aliases.contains_key(alias) {
            return Err(self.error(format!("redefinition of attribute alias id '{alias}'")));
        }
        if alias.contains('.') {
            return Err(self.error("attribute names with a '.' are reserved for dialect-defined names"));
        }
        self.consume();
        self.expect(TokenKind::Equal, "expected '=' in attribute alias definition")?;

        let attribute = self.parse_attribute()?;
        tracing::trace!(alias, "Defined attribute alias");
        self.attribute_aliases.insert(alias.to_owned(), attribute);
        Ok(())
    }

    /// `type-alias-def ::= '!' alias-name '=' type`
    fn parse_type_alias_def(&mut self) -> ParseResult<()> {
        let token = self.token;
        let alias = &token.text[1..];
        if self.type_aliases.contains_key(alias) {
            return Err(self.error(format!("redefinition of type alias id '{alias}'")));
        }
        if alias.contains('.') {
            return Err(self.error("type names with a '.' are reserved for dialect-defined names"));
        }
        self.consume();
        self.expect(TokenKind::Equal, "expected '=' in type alias definition")?;

        let ty = self.parse_type()?;
        tracing::trace!(alias, "Defined type alias");
        self.type_aliases.insert(alias.to_owned(), ty);
        Ok(())
    }
}
