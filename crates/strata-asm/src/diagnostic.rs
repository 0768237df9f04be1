//! Parse diagnostics and the error type returned by a failed parse.

use std::fmt;

use derive_more::Display;
use strata_ir::Span;

/// How serious a diagnostic is.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    #[display("error")]
    Error,
    #[display("warning")]
    Warning,
    #[display("note")]
    Note,
}

/// A message anchored to a source span, with optional attached notes.
#[derive(Clone, Debug, Display, PartialEq, Eq)]
#[display("{severity}: {message}")]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    /// Byte span the message points at. `None` when no source position is
    /// known (for example an operation built with an unknown location).
    pub span: Option<Span>,
    pub notes: Vec<Diagnostic>,
}

impl Diagnostic {
    pub fn error(span: impl Into<Option<Span>>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
            span: span.into(),
            notes: Vec::new(),
        }
    }

    pub fn note(span: impl Into<Option<Span>>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Note,
            ..Self::error(span, message)
        }
    }

    /// Attach a note to this diagnostic.
    pub fn with_note(mut self, span: impl Into<Option<Span>>, message: impl Into<String>) -> Self {
        self.notes.push(Diagnostic::note(span, message));
        self
    }

    /// Render as `name:line:col: severity: message`, one line per note.
    pub fn render(&self, source_name: &str, source: &str) -> String {
        let mut out = String::new();
        self.render_into(&mut out, source_name, source);
        out
    }

    fn render_into(&self, out: &mut String, source_name: &str, source: &str) {
        use std::fmt::Write;

        let _ = match self.span {
            Some(span) => {
                let (line, col) = line_col(source, span.start);
                writeln!(out, "{source_name}:{line}:{col}: {self}")
            }
            None => writeln!(out, "{source_name}: {self}"),
        };
        for note in &self.notes {
            note.render_into(out, source_name, source);
        }
    }
}

/// 1-based line and column of a byte offset. Columns count characters.
pub fn line_col(source: &str, offset: usize) -> (usize, usize) {
    let offset = offset.min(source.len());
    let prefix = source.get(..offset).unwrap_or(source);
    let line_start = prefix.rfind('\n').map_or(0, |i| i + 1);
    let line = prefix.matches('\n').count() + 1;
    let col = prefix[line_start..].chars().count() + 1;
    (line, col)
}

/// Failure of a parse: one or more error diagnostics.
///
/// Parsing is fail-fast, so this normally holds a single error. The
/// end-of-input check for undeclared values reports one error per name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseError {
    pub diagnostics: Vec<Diagnostic>,
}

impl ParseError {
    /// The first error's message.
    pub fn message(&self) -> &str {
        self.diagnostics
            .first()
            .map(|d| d.message.as_str())
            .unwrap_or_default()
    }

    /// Render every diagnostic against the source it was produced from.
    pub fn render(&self, source_name: &str, source: &str) -> String {
        self.diagnostics
            .iter()
            .map(|d| d.render(source_name, source))
            .collect()
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, diag) in self.diagnostics.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{diag}")?;
            for note in &diag.notes {
                write!(f, "\n{note}")?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for ParseError {}

impl From<Diagnostic> for ParseError {
    fn from(diag: Diagnostic) -> Self {
        ParseError {
            diagnostics: vec![diag],
        }
    }
}

impl From<Vec<Diagnostic>> for ParseError {
    fn from(diagnostics: Vec<Diagnostic>) -> Self {
        ParseError { diagnostics }
    }
}

pub type ParseResult<T> = Result<T, ParseError>;
