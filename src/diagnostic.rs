use std::fmt::{self, Display};

use serde::Serialize;

/// How serious a diagnostic is.
///
/// Parser diagnostics default to [`Severity::Error`] (duplicate keys are
/// [`Severity::Warning`]); validator diagnostics default to whatever the
/// caller passes to [`crate::JsonDocument::validate`], typically `Warning`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Severity {
    Error,
    Warning,
    Information,
    Hint,
}

/// Extra metadata attached to a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DiagnosticTag {
    /// The diagnostic flags use of a deprecated schema element.
    Deprecated,
}

/// Machine-readable codes for parser and validator diagnostics.
///
/// Scanner-level problems keep a one-to-one mapping with the scanner's
/// [`ScanError`](crate::scanner::ScanError) kinds; production-level problems
/// get their own codes. Validation problems carry no code except
/// [`ErrorCode::EnumValueMismatch`] and [`ErrorCode::Deprecated`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorCode {
    InvalidSymbol,
    InvalidNumberFormat,
    PropertyNameExpected,
    ValueExpected,
    ColonExpected,
    CommaExpected,
    CloseBraceExpected,
    CloseBracketExpected,
    EndOfFileExpected,
    InvalidCommentToken,
    UnexpectedEndOfComment,
    UnexpectedEndOfString,
    UnexpectedEndOfNumber,
    InvalidUnicode,
    InvalidEscapeCharacter,
    InvalidCharacter,
    TrailingComma,
    DuplicateKey,
    CommaOrCloseBraceExpected,
    CommaOrCloseBracketExpected,
    EnumValueMismatch,
    Deprecated,
}

/// A position in the source text.
///
/// `line` is zero-indexed. `character` is the offset within the line counted
/// in UTF-16 code units, matching what editors and the LSP expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Position {
    pub line: usize,
    pub character: usize,
}

/// A half-open source range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

/// A problem located by byte offset and length, before range mapping.
///
/// The parser and validator work in byte offsets; problems become
/// [`Diagnostic`]s (with line/character ranges) at the document boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct Problem {
    pub offset: usize,
    pub length: usize,
    pub message: String,
    /// When `None`, the caller-supplied default severity applies.
    pub severity: Option<Severity>,
    pub code: Option<ErrorCode>,
    pub tags: Vec<DiagnosticTag>,
}

impl Problem {
    pub fn new(offset: usize, length: usize, message: impl Into<String>) -> Self {
        Self {
            offset,
            length,
            message: message.into(),
            severity: None,
            code: None,
            tags: Vec::new(),
        }
    }

    pub fn with_code(mut self, code: ErrorCode) -> Self {
        self.code = Some(code);
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = Some(severity);
        self
    }
}

/// A diagnostic ready for presentation: a range, a message, a severity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub range: Range,
    pub message: String,
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<ErrorCode>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<DiagnosticTag>,
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}: {}",
            self.range.start.line, self.range.start.character, self.message
        )
    }
}

/// Maps byte offsets to line/character positions.
///
/// Built once per document. Lines are split on `\n` (a `\r\n` sequence
/// counts as one break; the `\r` belongs to the preceding line).
#[derive(Debug, Clone)]
pub struct LineIndex {
    line_starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        for (idx, byte) in text.bytes().enumerate() {
            if byte == b'\n' {
                line_starts.push(idx + 1);
            }
        }
        Self { line_starts }
    }

    /// The position of `offset` in `text`, which must be the text the index
    /// was built from. Offsets past the end clamp to the end; offsets inside
    /// a multi-byte character round down to its start.
    pub fn position_at(&self, text: &str, offset: usize) -> Position {
        let mut offset = offset.min(text.len());
        while !text.is_char_boundary(offset) {
            offset -= 1;
        }
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next_line) => next_line - 1,
        };
        let line_start = self.line_starts[line];
        let character = text[line_start..offset].encode_utf16().count();
        Position { line, character }
    }
}
