use std::collections::hash_map::Entry;
use std::collections::HashMap;

use tracing::trace;

use crate::ast::{JsonDocument, Node, NodeContent, NodeId};
use crate::diagnostic::{Diagnostic, ErrorCode, LineIndex, Problem, Range, Severity};
use crate::options::ParseOptions;
use crate::scanner::{ScanError, Scanner, SyntaxKind};

/// Parses `text` into a [`JsonDocument`].
///
/// Parsing never fails: every problem in the input becomes a diagnostic on
/// the returned document, and the parser recovers to keep building as much
/// of the tree as it can.
pub fn parse(text: &str, options: &ParseOptions) -> JsonDocument {
    Parser::new(text, options).run()
}

struct Parser<'a> {
    text: &'a str,
    scanner: Scanner<'a>,
    options: &'a ParseOptions,
    nodes: Vec<Node>,
    problems: Vec<Problem>,
    last_problem_offset: Option<usize>,
    comments: Vec<(usize, usize)>,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str, options: &'a ParseOptions) -> Self {
        Self {
            text,
            scanner: Scanner::new(text),
            options,
            nodes: Vec::new(),
            problems: Vec::new(),
            last_problem_offset: None,
            comments: Vec::new(),
        }
    }

    fn run(mut self) -> JsonDocument {
        let token = self.scan_next();
        let root = if token != SyntaxKind::Eof {
            let root = self.parse_value(None);
            if root.is_none() {
                self.error(
                    "Expected a JSON object, array or literal",
                    ErrorCode::InvalidSymbol,
                    None,
                    &[],
                    &[],
                );
            } else if self.scanner.token() != SyntaxKind::Eof {
                self.error(
                    "End of file expected",
                    ErrorCode::EndOfFileExpected,
                    None,
                    &[],
                    &[],
                );
            }
            root
        } else {
            None
        };

        trace!(
            nodes = self.nodes.len(),
            problems = self.problems.len(),
            "parsed document"
        );

        let line_index = LineIndex::new(self.text);
        let syntax_errors: Vec<Diagnostic> = self
            .problems
            .into_iter()
            .map(|problem| Diagnostic {
                range: Range {
                    start: line_index.position_at(self.text, problem.offset),
                    end: line_index.position_at(self.text, problem.offset + problem.length),
                },
                message: problem.message,
                severity: problem.severity.unwrap_or(Severity::Error),
                code: problem.code,
                tags: problem.tags,
            })
            .collect();
        let comments: Vec<Range> = self
            .comments
            .iter()
            .map(|&(offset, length)| Range {
                start: line_index.position_at(self.text, offset),
                end: line_index.position_at(self.text, offset + length),
            })
            .collect();

        JsonDocument::new(
            self.text.to_string(),
            self.nodes,
            root,
            syntax_errors,
            comments,
            line_index,
        )
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    /// Advances to the next meaningful token, filtering trivia, line breaks,
    /// and comments, and reporting any scan-level error on the way.
    fn scan_next(&mut self) -> SyntaxKind {
        loop {
            let token = self.scanner.scan();
            self.check_scan_error();
            match token {
                SyntaxKind::LineCommentTrivia | SyntaxKind::BlockCommentTrivia => {
                    let offset = self.scanner.token_offset();
                    let length = self.scanner.token_length();
                    if self.options.collect_comments {
                        self.comments.push((offset, length));
                    }
                    if !self.options.allow_comments {
                        self.error_at_range(
                            "Comments are not permitted in JSON.",
                            ErrorCode::InvalidCommentToken,
                            offset,
                            offset + length,
                            None,
                        );
                    }
                }
                SyntaxKind::Trivia | SyntaxKind::LineBreakTrivia => {}
                _ => return token,
            }
        }
    }

    fn check_scan_error(&mut self) {
        let (message, code) = match self.scanner.token_error() {
            ScanError::None => return,
            ScanError::InvalidUnicode => {
                ("Invalid unicode sequence in string", ErrorCode::InvalidUnicode)
            }
            ScanError::InvalidEscapeCharacter => (
                "Invalid escape character in string",
                ErrorCode::InvalidEscapeCharacter,
            ),
            ScanError::UnexpectedEndOfNumber => {
                ("Unexpected end of number", ErrorCode::UnexpectedEndOfNumber)
            }
            ScanError::UnexpectedEndOfComment => {
                ("Unexpected end of comment", ErrorCode::UnexpectedEndOfComment)
            }
            ScanError::UnexpectedEndOfString => {
                ("Unexpected end of string", ErrorCode::UnexpectedEndOfString)
            }
            ScanError::InvalidCharacter => (
                "Invalid characters in string. Control characters must be escaped.",
                ErrorCode::InvalidCharacter,
            ),
        };
        self.error(message, code, None, &[], &[]);
    }

    /// Records a problem unless one was already recorded at the same offset.
    fn error_at_range(
        &mut self,
        message: &str,
        code: ErrorCode,
        start: usize,
        end: usize,
        severity: Option<Severity>,
    ) {
        if self.problems.is_empty() || self.last_problem_offset != Some(start) {
            let mut problem = Problem::new(start, end.saturating_sub(start), message).with_code(code);
            problem.severity = severity;
            self.problems.push(problem);
            self.last_problem_offset = Some(start);
        }
    }

    /// Records a problem at the current token, optionally finalizing `node`
    /// and skipping tokens for recovery: past any token in
    /// `skip_until_after`, or up to (not consuming) any token in
    /// `skip_until`. EOF always terminates the skip.
    fn error(
        &mut self,
        message: &str,
        code: ErrorCode,
        node: Option<NodeId>,
        skip_until_after: &[SyntaxKind],
        skip_until: &[SyntaxKind],
    ) -> Option<NodeId> {
        let mut start = self.scanner.token_offset();
        let mut end = start + self.scanner.token_length();
        if start == end && start > 0 {
            // Zero-length token (EOF): point at the last non-blank character.
            start -= 1;
            while start > 0
                && (!self.text.is_char_boundary(start)
                    || self.text.as_bytes()[start].is_ascii_whitespace())
            {
                start -= 1;
            }
            end = start + 1;
        }
        self.error_at_range(message, code, start, end, None);

        if let Some(node) = node {
            self.finalize(node, false);
        }
        if !skip_until_after.is_empty() || !skip_until.is_empty() {
            let mut token = self.scanner.token();
            while token != SyntaxKind::Eof {
                if skip_until_after.contains(&token) {
                    self.scan_next();
                    break;
                }
                if skip_until.contains(&token) {
                    break;
                }
                token = self.scan_next();
            }
        }
        node
    }

    /// Extends `node` to the end of the current token; optionally advances.
    fn finalize(&mut self, id: NodeId, scan_next: bool) -> NodeId {
        let end = self.scanner.token_offset() + self.scanner.token_length();
        let node = &mut self.nodes[id.0];
        node.length = end.saturating_sub(node.offset);
        if scan_next {
            self.scan_next();
        }
        id
    }

    fn parse_value(&mut self, parent: Option<NodeId>) -> Option<NodeId> {
        match self.scanner.token() {
            SyntaxKind::OpenBracketToken => self.parse_array(parent),
            SyntaxKind::OpenBraceToken => self.parse_object(parent),
            SyntaxKind::StringLiteral => self.parse_string(parent),
            SyntaxKind::NumericLiteral => self.parse_number(parent),
            SyntaxKind::TrueKeyword | SyntaxKind::FalseKeyword | SyntaxKind::NullKeyword => {
                self.parse_literal(parent)
            }
            _ => None,
        }
    }

    fn parse_array(&mut self, parent: Option<NodeId>) -> Option<NodeId> {
        if self.scanner.token() != SyntaxKind::OpenBracketToken {
            return None;
        }
        let node = self.alloc(Node {
            offset: self.scanner.token_offset(),
            length: 0,
            parent,
            content: NodeContent::Array { items: Vec::new() },
        });
        self.scan_next();

        let mut needs_comma = false;
        while self.scanner.token() != SyntaxKind::CloseBracketToken
            && self.scanner.token() != SyntaxKind::Eof
        {
            if self.scanner.token() == SyntaxKind::CommaToken {
                if !needs_comma {
                    self.error("Value expected", ErrorCode::ValueExpected, None, &[], &[]);
                }
                let comma_offset = self.scanner.token_offset();
                self.scan_next();
                if self.scanner.token() == SyntaxKind::CloseBracketToken {
                    if needs_comma {
                        self.error_at_range(
                            "Trailing comma",
                            ErrorCode::TrailingComma,
                            comma_offset,
                            comma_offset + 1,
                            None,
                        );
                    }
                    continue;
                }
            } else if needs_comma {
                self.error("Expected comma", ErrorCode::CommaExpected, None, &[], &[]);
            }
            match self.parse_value(Some(node)) {
                Some(item) => {
                    if let NodeContent::Array { items } = &mut self.nodes[node.0].content {
                        items.push(item);
                    }
                }
                None => {
                    self.error(
                        "Value expected",
                        ErrorCode::ValueExpected,
                        None,
                        &[],
                        &[SyntaxKind::CloseBracketToken, SyntaxKind::CommaToken],
                    );
                }
            }
            needs_comma = true;
        }

        if self.scanner.token() != SyntaxKind::CloseBracketToken {
            return self.error(
                "Expected comma or closing bracket",
                ErrorCode::CommaOrCloseBracketExpected,
                Some(node),
                &[],
                &[],
            );
        }
        Some(self.finalize(node, true))
    }

    fn parse_object(&mut self, parent: Option<NodeId>) -> Option<NodeId> {
        if self.scanner.token() != SyntaxKind::OpenBraceToken {
            return None;
        }
        let node = self.alloc(Node {
            offset: self.scanner.token_offset(),
            length: 0,
            parent,
            content: NodeContent::Object {
                properties: Vec::new(),
            },
        });
        let mut keys_seen: HashMap<String, Option<NodeId>> = HashMap::new();
        self.scan_next();

        let mut needs_comma = false;
        while self.scanner.token() != SyntaxKind::CloseBraceToken
            && self.scanner.token() != SyntaxKind::Eof
        {
            if self.scanner.token() == SyntaxKind::CommaToken {
                if !needs_comma {
                    self.error(
                        "Property expected",
                        ErrorCode::PropertyNameExpected,
                        None,
                        &[],
                        &[],
                    );
                }
                let comma_offset = self.scanner.token_offset();
                self.scan_next();
                if self.scanner.token() == SyntaxKind::CloseBraceToken {
                    if needs_comma {
                        self.error_at_range(
                            "Trailing comma",
                            ErrorCode::TrailingComma,
                            comma_offset,
                            comma_offset + 1,
                            None,
                        );
                    }
                    continue;
                }
            } else if needs_comma {
                self.error("Expected comma", ErrorCode::CommaExpected, None, &[], &[]);
            }
            match self.parse_property(node, &mut keys_seen) {
                Some(property) => {
                    if let NodeContent::Object { properties } = &mut self.nodes[node.0].content {
                        properties.push(property);
                    }
                }
                None => {
                    self.error(
                        "Property expected",
                        ErrorCode::PropertyNameExpected,
                        None,
                        &[],
                        &[SyntaxKind::CloseBraceToken, SyntaxKind::CommaToken],
                    );
                }
            }
            needs_comma = true;
        }

        if self.scanner.token() != SyntaxKind::CloseBraceToken {
            return self.error(
                "Expected comma or closing brace",
                ErrorCode::CommaOrCloseBraceExpected,
                Some(node),
                &[],
                &[],
            );
        }
        Some(self.finalize(node, true))
    }

    fn parse_property(
        &mut self,
        parent: NodeId,
        keys_seen: &mut HashMap<String, Option<NodeId>>,
    ) -> Option<NodeId> {
        let key_value = match self.scanner.token() {
            SyntaxKind::StringLiteral => self.scanner.token_value().to_string(),
            SyntaxKind::Unknown => {
                // Recover from an unquoted key by adopting the word as the
                // key text.
                self.error(
                    "Property keys must be doublequoted",
                    ErrorCode::PropertyNameExpected,
                    None,
                    &[],
                    &[],
                );
                self.scanner.token_value().to_string()
            }
            _ => return None,
        };
        let key_offset = self.scanner.token_offset();
        let key_length = self.scanner.token_length();

        let key = self.alloc(Node {
            offset: key_offset,
            length: key_length,
            parent: None,
            content: NodeContent::String(key_value.clone()),
        });
        let property = self.alloc(Node {
            offset: key_offset,
            length: 0,
            parent: Some(parent),
            content: NodeContent::Property {
                key,
                value: None,
                colon_offset: -1,
            },
        });
        self.nodes[key.0].parent = Some(property);
        self.scan_next();

        // Keys named "//" are the conventional stand-in for comments in
        // strict-JSON files and may repeat freely.
        if key_value != "//" {
            match keys_seen.entry(key_value) {
                Entry::Occupied(mut seen) => {
                    self.error_at_range(
                        "Duplicate object key",
                        ErrorCode::DuplicateKey,
                        key_offset,
                        key_offset + key_length,
                        Some(Severity::Warning),
                    );
                    if let Some(first) = seen.get() {
                        if let NodeContent::Property { key: first_key, .. } =
                            self.nodes[first.0].content
                        {
                            let first_key = &self.nodes[first_key.0];
                            let (offset, length) = (first_key.offset, first_key.length);
                            self.error_at_range(
                                "Duplicate object key",
                                ErrorCode::DuplicateKey,
                                offset,
                                offset + length,
                                Some(Severity::Warning),
                            );
                        }
                        // Report the first occurrence only once.
                        seen.insert(None);
                    }
                }
                Entry::Vacant(slot) => {
                    slot.insert(Some(property));
                }
            }
        }

        if self.scanner.token() == SyntaxKind::ColonToken {
            if let NodeContent::Property { colon_offset, .. } = &mut self.nodes[property.0].content
            {
                *colon_offset = self.scanner.token_offset() as isize;
            }
            self.scan_next();
        } else {
            self.error("Colon expected", ErrorCode::ColonExpected, None, &[], &[]);
            // When the next token is a string on a later line it is almost
            // certainly the next property's key; finalize without a value
            // rather than swallow it.
            if self.scanner.token() == SyntaxKind::StringLiteral
                && self.has_line_break_between(key_offset + key_length, self.scanner.token_offset())
            {
                self.nodes[property.0].length = key_length;
                return Some(property);
            }
        }

        match self.parse_value(Some(property)) {
            Some(value) => {
                let value_end = self.nodes[value.0].offset + self.nodes[value.0].length;
                if let NodeContent::Property { value: slot, .. } =
                    &mut self.nodes[property.0].content
                {
                    *slot = Some(value);
                }
                self.nodes[property.0].length = value_end - key_offset;
                Some(property)
            }
            None => self.error(
                "Value expected",
                ErrorCode::ValueExpected,
                Some(property),
                &[],
                &[SyntaxKind::CloseBraceToken, SyntaxKind::CommaToken],
            ),
        }
    }

    fn parse_string(&mut self, parent: Option<NodeId>) -> Option<NodeId> {
        if self.scanner.token() != SyntaxKind::StringLiteral {
            return None;
        }
        let node = self.alloc(Node {
            offset: self.scanner.token_offset(),
            length: 0,
            parent,
            content: NodeContent::String(self.scanner.token_value().to_string()),
        });
        Some(self.finalize(node, true))
    }

    fn parse_number(&mut self, parent: Option<NodeId>) -> Option<NodeId> {
        if self.scanner.token() != SyntaxKind::NumericLiteral {
            return None;
        }
        let node = self.alloc(Node {
            offset: self.scanner.token_offset(),
            length: 0,
            parent,
            content: NodeContent::Number {
                value: 0.0,
                is_integer: true,
            },
        });
        if self.scanner.token_error() == ScanError::None {
            let lexeme = self.scanner.token_value();
            match lexeme.parse::<f64>() {
                Ok(parsed) if parsed.is_finite() => {
                    let is_integer = !lexeme.contains('.');
                    if let NodeContent::Number { value, is_integer: integer } =
                        &mut self.nodes[node.0].content
                    {
                        *value = parsed;
                        *integer = is_integer;
                    }
                }
                _ => {
                    self.error(
                        "Invalid number format.",
                        ErrorCode::InvalidNumberFormat,
                        None,
                        &[],
                        &[],
                    );
                }
            }
        }
        Some(self.finalize(node, true))
    }

    fn parse_literal(&mut self, parent: Option<NodeId>) -> Option<NodeId> {
        let content = match self.scanner.token() {
            SyntaxKind::TrueKeyword => NodeContent::Boolean(true),
            SyntaxKind::FalseKeyword => NodeContent::Boolean(false),
            SyntaxKind::NullKeyword => NodeContent::Null,
            _ => return None,
        };
        let node = self.alloc(Node {
            offset: self.scanner.token_offset(),
            length: 0,
            parent,
            content,
        });
        Some(self.finalize(node, true))
    }

    fn has_line_break_between(&self, from: usize, to: usize) -> bool {
        from <= to
            && self.text[from..to]
                .chars()
                .any(|c| c == '\n' || c == '\r')
    }
}
