//! # jsonquill
//!
//! The core of a JSON language service: a position-preserving, error-tolerant
//! JSON parser and a JSON Schema validator (Draft-04/06/07 semantics) that
//! produce editor-grade diagnostics.
//!
//! jsonquill is built for tooling rather than data binding:
//!
//! - Parsing never fails. Broken input produces a best-effort syntax tree
//!   plus diagnostics describing every problem, with byte-exact source spans.
//! - Every node knows its offset, length, and parent, so a position in the
//!   source maps to the tree and back.
//! - Validation walks the tree against a resolved schema, scores competing
//!   `anyOf`/`oneOf` alternatives to surface the most useful failure, and can
//!   report which sub-schemas applied to which nodes.
//! - `//` and `/* */` comments are tolerated (and optionally collected), as
//!   in JSONC documents.
//!
//! ## Parsing
//!
//! ```rust
//! use jsonquill::{parse, ParseOptions};
//!
//! let document = parse("[1, 2, 3,]", &ParseOptions::default());
//!
//! // The trailing comma is a diagnostic, not a failure; the tree is intact.
//! assert_eq!(document.syntax_errors().len(), 1);
//! let root = document.root().unwrap();
//! assert_eq!(document.children(root).len(), 3);
//! ```
//!
//! ## Validating
//!
//! ```rust
//! use jsonquill::{parse, ParseOptions, Schema, Severity};
//!
//! let document = parse(r#"{ "port": "eighty" }"#, &ParseOptions::default());
//! let schema = Schema::from_value(&serde_json::json!({
//!     "properties": { "port": { "type": "number" } }
//! }));
//!
//! let diagnostics = document.validate(&schema, Severity::Warning);
//! assert_eq!(diagnostics[0].message, "Incorrect type. Expected \"number\".");
//! ```
//!
//! ## Navigating by position
//!
//! ```rust
//! use jsonquill::{parse, ParseOptions};
//!
//! let document = parse(r#"{ "a": [10, 20] }"#, &ParseOptions::default());
//! let node = document.node_from_offset(9, false).unwrap();
//! assert_eq!(document.node(node).as_number(), Some(10.0));
//! ```
//!
//! ## Scope
//!
//! Schema resolution is the caller's job: [`Schema::from_value`] takes a
//! fully resolved schema tree and treats anything it cannot interpret
//! (including unresolved `$ref`s) as the always-true schema. Editor features
//! layered on top of the tree — completion, hover, formatting — live outside
//! this crate.

mod ast;
mod diagnostic;
mod options;
mod parser;
mod scanner;
mod schema;
mod validator;
mod value;

pub use crate::ast::{JsonDocument, Node, NodeContent, NodeId, NodeKind};
pub use crate::diagnostic::{
    Diagnostic, DiagnosticTag, ErrorCode, LineIndex, Position, Problem, Range, Severity,
};
pub use crate::options::ParseOptions;
pub use crate::parser::parse;
pub use crate::scanner::{ScanError, Scanner, SyntaxKind};
pub use crate::schema::{
    Dependency, ExclusiveLimit, ItemsSpec, Schema, SchemaRef, TypeSpec,
};
pub use crate::validator::{validate_node, RegexCache, SchemaMatch, ValidationResult};
pub use crate::value::{node_value, values_equal};
