use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;
use tracing::trace;

use crate::ast::{JsonDocument, NodeContent, NodeId, NodeKind};
use crate::diagnostic::{Diagnostic, DiagnosticTag, ErrorCode, Problem, Range, Severity};
use crate::schema::{Dependency, ExclusiveLimit, ItemsSpec, Schema, SchemaRef, TypeSpec};
use crate::value::{node_value, values_equal};

/// One applicable-schema record: `schema` was consulted for `node`.
/// `inverted` marks schemas reached through a `not`.
#[derive(Debug, Clone)]
pub struct SchemaMatch<'s> {
    pub node: NodeId,
    pub schema: &'s Schema,
    pub inverted: bool,
}

/// Scoring container for one (node, schema) validation.
///
/// Results are comparable so combinators can pick the best alternative:
/// fewer problems beats more, an enum match beats none, then the three
/// property counters break ties in order.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub problems: Vec<Problem>,
    /// Deprecation hints ride outside `problems` so they never make a
    /// result count as failed for combinator scoring; a discarded
    /// alternative drops its hints with it.
    pub deprecations: Vec<Problem>,
    pub properties_matches: u32,
    pub properties_value_matches: u32,
    pub primary_value_matches: u32,
    pub enum_value_match: bool,
    pub enum_values: Option<Vec<Value>>,
}

impl ValidationResult {
    pub fn has_problems(&self) -> bool {
        !self.problems.is_empty()
    }

    fn merge(&mut self, other: ValidationResult) {
        self.problems.extend(other.problems);
        self.deprecations.extend(other.deprecations);
    }

    /// Folds in the result of validating one property value or array item.
    fn merge_property_match(&mut self, sub: ValidationResult) {
        self.properties_matches += 1;
        if sub.enum_value_match || (!sub.has_problems() && sub.properties_matches > 0) {
            self.properties_value_matches += 1;
        }
        if sub.enum_value_match && sub.enum_values.as_ref().is_some_and(|v| v.len() == 1) {
            self.primary_value_matches += 1;
        }
        self.merge(sub);
    }

    /// When two failing alternatives both carry enum mismatches, widen the
    /// accepted-values list so the final message shows every candidate.
    fn merge_enum_values(&mut self, other: &ValidationResult) {
        if self.enum_value_match || other.enum_value_match {
            return;
        }
        let (Some(mine), Some(theirs)) = (&mut self.enum_values, &other.enum_values) else {
            return;
        };
        mine.extend(theirs.iter().cloned());
        let message = format!(
            "Value is not accepted. Valid values: {}.",
            stringify_values(mine)
        );
        for problem in &mut self.problems {
            if problem.code == Some(ErrorCode::EnumValueMismatch) {
                problem.message = message.clone();
            }
        }
    }

    fn compare(&self, other: &ValidationResult) -> Ordering {
        if self.has_problems() != other.has_problems() {
            return if self.has_problems() {
                Ordering::Less
            } else {
                Ordering::Greater
            };
        }
        if self.enum_value_match != other.enum_value_match {
            return if other.enum_value_match {
                Ordering::Less
            } else {
                Ordering::Greater
            };
        }
        (self.primary_value_matches, self.properties_value_matches, self.properties_matches).cmp(&(
            other.primary_value_matches,
            other.properties_value_matches,
            other.properties_matches,
        ))
    }
}

/// Compiled-pattern cache keyed by pattern text.
///
/// A pattern that fails to compile caches `None`, silently disabling just
/// that constraint.
pub struct RegexCache {
    cache: HashMap<String, Option<Regex>>,
}

impl RegexCache {
    pub fn new() -> Self {
        Self {
            cache: HashMap::new(),
        }
    }

    pub fn get(&mut self, pattern: &str) -> Option<&Regex> {
        self.cache
            .entry(pattern.to_string())
            .or_insert_with(|| Regex::new(pattern).ok())
            .as_ref()
    }
}

impl Default for RegexCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Append-only applicable-schema buffer.
///
/// Trial evaluations (`not`, `anyOf`, `oneOf`, `if`) fork a sub-collector
/// which is merged into its parent only when the trial's records should
/// survive. The no-op flavor makes inner trials free.
enum Collector<'s> {
    Matching {
        matches: Vec<SchemaMatch<'s>>,
        focus_offset: Option<usize>,
        exclude: Option<NodeId>,
    },
    NoOp,
}

impl<'s> Collector<'s> {
    fn matching(focus_offset: Option<usize>, exclude: Option<NodeId>) -> Self {
        Collector::Matching {
            matches: Vec::new(),
            focus_offset,
            exclude,
        }
    }

    fn new_sub(&self) -> Collector<'s> {
        match self {
            Collector::Matching {
                focus_offset,
                exclude,
                ..
            } => Collector::matching(*focus_offset, *exclude),
            Collector::NoOp => Collector::NoOp,
        }
    }

    fn include(&self, document: &JsonDocument, node: NodeId) -> bool {
        match self {
            Collector::NoOp => true,
            Collector::Matching {
                focus_offset,
                exclude,
                ..
            } => {
                let contains = focus_offset.map_or(true, |offset| {
                    let n = document.node(node);
                    offset >= n.offset && offset < n.offset + n.length
                });
                contains && Some(node) != *exclude
            }
        }
    }

    fn add(&mut self, schema_match: SchemaMatch<'s>) {
        if let Collector::Matching { matches, .. } = self {
            matches.push(schema_match);
        }
    }

    fn merge(&mut self, other: Collector<'s>) {
        if let (Collector::Matching { matches, .. }, Collector::Matching { matches: more, .. }) =
            (self, other)
        {
            matches.extend(more);
        }
    }

    fn take_matches(self) -> Vec<SchemaMatch<'s>> {
        match self {
            Collector::Matching { matches, .. } => matches,
            Collector::NoOp => Vec::new(),
        }
    }
}

struct ValidationContext<'d> {
    document: &'d JsonDocument,
    regex_cache: RegexCache,
}

impl JsonDocument {
    /// Validates the document against `schema` and returns diagnostics.
    ///
    /// Problems without an explicit severity get `default_severity`
    /// (typically [`Severity::Warning`]). Deprecation hints are appended as
    /// [`Severity::Hint`] diagnostics tagged
    /// [`DiagnosticTag::Deprecated`].
    pub fn validate(&self, schema: &Schema, default_severity: Severity) -> Vec<Diagnostic> {
        let (diagnostics, _) = self.run(schema, default_severity, Collector::NoOp);
        diagnostics
    }

    /// Records every (node, schema) pair the validator consulted.
    pub fn matching_schemas<'s>(&self, schema: &'s Schema) -> Vec<SchemaMatch<'s>> {
        self.matching_schemas_at(schema, None, None)
    }

    /// Like [`JsonDocument::matching_schemas`], scoped: only nodes whose
    /// span contains `focus_offset` are walked, and `exclude` (with its
    /// subtree) is skipped.
    pub fn matching_schemas_at<'s>(
        &self,
        schema: &'s Schema,
        focus_offset: Option<usize>,
        exclude: Option<NodeId>,
    ) -> Vec<SchemaMatch<'s>> {
        let (_, matches) = self.run(
            schema,
            Severity::Warning,
            Collector::matching(focus_offset, exclude),
        );
        matches
    }

    /// Diagnostics and applicable schemas from a single walk.
    pub fn diagnostics_and_matching_schemas<'s>(
        &self,
        schema: &'s Schema,
        default_severity: Severity,
    ) -> (Vec<Diagnostic>, Vec<SchemaMatch<'s>>) {
        self.run(schema, default_severity, Collector::matching(None, None))
    }

    fn run<'s>(
        &self,
        schema: &'s Schema,
        default_severity: Severity,
        mut collector: Collector<'s>,
    ) -> (Vec<Diagnostic>, Vec<SchemaMatch<'s>>) {
        let mut result = ValidationResult::default();
        let mut context = ValidationContext {
            document: self,
            regex_cache: RegexCache::new(),
        };
        if let Some(root) = self.root() {
            validate(&mut context, root, schema, &mut result, &mut collector);
        }
        trace!(
            problems = result.problems.len(),
            deprecations = result.deprecations.len(),
            "validated document"
        );

        let mut problems = result.problems;
        problems.extend(result.deprecations);
        let diagnostics = problems
            .into_iter()
            .map(|problem| Diagnostic {
                range: Range {
                    start: self.position_at(problem.offset),
                    end: self.position_at(problem.offset + problem.length),
                },
                message: problem.message,
                severity: problem.severity.unwrap_or(default_severity),
                code: problem.code,
                tags: problem.tags,
            })
            .collect();
        (diagnostics, collector.take_matches())
    }
}

/// Validates a single node against `schema`.
///
/// Returns the scored [`ValidationResult`] (problems plus deprecation
/// hints, both located by byte offset) and the applicable-schema records.
/// [`JsonDocument::validate`] wraps this for the whole document and maps
/// problems to ranges.
pub fn validate_node<'s>(
    document: &JsonDocument,
    node: NodeId,
    schema: &'s Schema,
) -> (ValidationResult, Vec<SchemaMatch<'s>>) {
    let mut result = ValidationResult::default();
    let mut collector = Collector::matching(None, None);
    let mut context = ValidationContext {
        document,
        regex_cache: RegexCache::new(),
    };
    validate(&mut context, node, schema, &mut result, &mut collector);
    (result, collector.take_matches())
}

fn at_node(document: &JsonDocument, node: NodeId, message: String) -> Problem {
    let n = document.node(node);
    Problem::new(n.offset, n.length, message)
}

/// The key span of the property owning `value_node`, if it has one.
fn owning_key_span(document: &JsonDocument, value_node: NodeId) -> Option<(usize, usize)> {
    let parent = document.node(value_node).parent?;
    if let NodeContent::Property { key, .. } = document.node(parent).content {
        let key = document.node(key);
        Some((key.offset, key.length))
    } else {
        None
    }
}

fn validate<'s>(
    context: &mut ValidationContext<'_>,
    node: NodeId,
    schema: &'s Schema,
    result: &mut ValidationResult,
    collector: &mut Collector<'s>,
) {
    let document = context.document;
    if !collector.include(document, node) {
        return;
    }
    if let NodeContent::Property { value, .. } = document.node(node).content {
        if let Some(value) = value {
            validate(context, value, schema, result, collector);
        }
        return;
    }

    match document.node(node).kind() {
        NodeKind::Object => validate_object(context, node, schema, result, collector),
        NodeKind::Array => validate_array(context, node, schema, result, collector),
        NodeKind::String => validate_string(context, node, schema, result),
        NodeKind::Number => validate_number(context, node, schema, result),
        _ => {}
    }
    validate_common(context, node, schema, result, collector);

    collector.add(SchemaMatch {
        node,
        schema,
        inverted: false,
    });

    if schema.deprecated || schema.deprecation_message.is_some() {
        // Anchor the hint at the owning property's key when the deprecated
        // schema applies to a property value.
        let (offset, length) = owning_key_span(document, node).unwrap_or_else(|| {
            let n = document.node(node);
            (n.offset, n.length)
        });
        let message = schema
            .deprecation_message
            .clone()
            .unwrap_or_else(|| "Value is deprecated".to_string());
        let mut problem = Problem::new(offset, length, message)
            .with_code(ErrorCode::Deprecated)
            .with_severity(Severity::Hint);
        problem.tags.push(DiagnosticTag::Deprecated);
        result.deprecations.push(problem);
    }
}

/// Type-agnostic checks: `type`, the combinators, `enum`, `const`.
fn validate_common<'s>(
    context: &mut ValidationContext<'_>,
    node: NodeId,
    schema: &'s Schema,
    result: &mut ValidationResult,
    collector: &mut Collector<'s>,
) {
    let document = context.document;

    if let Some(spec) = &schema.schema_type {
        let matches = match spec {
            TypeSpec::Single(name) => type_matches(document, node, name),
            TypeSpec::List(names) => names.iter().any(|name| type_matches(document, node, name)),
        };
        if !matches {
            let message = schema.error_message.clone().unwrap_or_else(|| match spec {
                TypeSpec::Single(name) => format!("Incorrect type. Expected \"{name}\"."),
                TypeSpec::List(names) => {
                    format!("Incorrect type. Expected one of {}.", names.join(", "))
                }
            });
            result.problems.push(at_node(document, node, message));
        }
    }

    for sub in &schema.all_of {
        validate(context, node, sub.as_schema(), result, collector);
    }

    if let Some(not) = &schema.not {
        let mut sub_result = ValidationResult::default();
        let mut sub_collector = collector.new_sub();
        validate(context, node, not.as_schema(), &mut sub_result, &mut sub_collector);
        if !sub_result.has_problems() {
            result.problems.push(at_node(
                document,
                node,
                "Matches a schema that is not allowed.".to_string(),
            ));
        }
        for mut schema_match in sub_collector.take_matches() {
            schema_match.inverted = !schema_match.inverted;
            collector.add(schema_match);
        }
    }

    if !schema.any_of.is_empty() {
        test_alternatives(context, node, &schema.any_of, false, result, collector);
    }
    if !schema.one_of.is_empty() {
        test_alternatives(context, node, &schema.one_of, true, result, collector);
    }

    if let Some(if_schema) = &schema.if_schema {
        let mut if_result = ValidationResult::default();
        let mut if_collector = collector.new_sub();
        validate(
            context,
            node,
            if_schema.as_schema(),
            &mut if_result,
            &mut if_collector,
        );
        collector.merge(if_collector);

        let branch = if !if_result.has_problems() {
            &schema.then_schema
        } else {
            &schema.else_schema
        };
        if let Some(branch) = branch {
            let mut branch_result = ValidationResult::default();
            let mut branch_collector = collector.new_sub();
            validate(
                context,
                node,
                branch.as_schema(),
                &mut branch_result,
                &mut branch_collector,
            );
            result.properties_matches += branch_result.properties_matches;
            result.properties_value_matches += branch_result.properties_value_matches;
            result.merge(branch_result);
            collector.merge(branch_collector);
        }
    }

    if let Some(enum_values) = &schema.enum_values {
        let value = node_value(document, node);
        let matched = enum_values
            .iter()
            .any(|candidate| values_equal(&value, candidate));
        result.enum_value_match = matched;
        result.enum_values = Some(enum_values.clone());
        if !matched {
            let message = schema.error_message.clone().unwrap_or_else(|| {
                format!(
                    "Value is not accepted. Valid values: {}.",
                    stringify_values(enum_values)
                )
            });
            result.problems.push(
                at_node(document, node, message).with_code(ErrorCode::EnumValueMismatch),
            );
        }
    }

    if let Some(const_value) = &schema.const_value {
        let value = node_value(document, node);
        if values_equal(&value, const_value) {
            result.enum_value_match = true;
        } else {
            let message = schema.error_message.clone().unwrap_or_else(|| {
                format!("Value must be {}.", stringify_value(const_value))
            });
            result.problems.push(
                at_node(document, node, message).with_code(ErrorCode::EnumValueMismatch),
            );
            result.enum_value_match = false;
        }
        result.enum_values = Some(vec![const_value.clone()]);
    }
}

/// Trial-validates each alternative and merges the best one into `result`.
/// With `max_one_match`, more than one full match is itself a problem.
fn test_alternatives<'s>(
    context: &mut ValidationContext<'_>,
    node: NodeId,
    alternatives: &'s [SchemaRef],
    max_one_match: bool,
    result: &mut ValidationResult,
    collector: &mut Collector<'s>,
) {
    let mut match_count = 0usize;
    let mut best: Option<(ValidationResult, Collector<'s>)> = None;

    for alternative in alternatives {
        let mut sub_result = ValidationResult::default();
        let mut sub_collector = collector.new_sub();
        validate(
            context,
            node,
            alternative.as_schema(),
            &mut sub_result,
            &mut sub_collector,
        );
        if !sub_result.has_problems() {
            match_count += 1;
        }
        best = match best {
            None => Some((sub_result, sub_collector)),
            Some((mut best_result, mut best_collector)) => {
                if !max_one_match && !sub_result.has_problems() && !best_result.has_problems() {
                    // Both match: pool their records and counters.
                    best_collector.merge(sub_collector);
                    best_result.properties_matches += sub_result.properties_matches;
                    best_result.properties_value_matches += sub_result.properties_value_matches;
                    Some((best_result, best_collector))
                } else {
                    match sub_result.compare(&best_result) {
                        Ordering::Greater => Some((sub_result, sub_collector)),
                        Ordering::Equal => {
                            best_collector.merge(sub_collector);
                            best_result.merge_enum_values(&sub_result);
                            Some((best_result, best_collector))
                        }
                        Ordering::Less => Some((best_result, best_collector)),
                    }
                }
            }
        };
    }

    if match_count > 1 && max_one_match {
        let offset = context.document.node(node).offset;
        result.problems.push(Problem::new(
            offset,
            1,
            "Matches multiple schemas when only one must validate.",
        ));
    }
    if let Some((best_result, best_collector)) = best {
        result.properties_matches += best_result.properties_matches;
        result.properties_value_matches += best_result.properties_value_matches;
        result.merge(best_result);
        collector.merge(best_collector);
    }
}

fn type_matches(document: &JsonDocument, node: NodeId, name: &str) -> bool {
    let n = document.node(node);
    if name == "integer" {
        return matches!(n.content, NodeContent::Number { is_integer: true, .. });
    }
    n.kind().as_str() == name
}

fn validate_number(
    context: &mut ValidationContext<'_>,
    node: NodeId,
    schema: &Schema,
    result: &mut ValidationResult,
) {
    let document = context.document;
    let Some(value) = document.node(node).as_number() else {
        return;
    };

    if let Some(multiple_of) = schema.multiple_of {
        if multiple_of > 0.0 {
            let remainder = if multiple_of.fract() == 0.0 {
                value % multiple_of
            } else {
                match (normalize_float(value), normalize_float(multiple_of)) {
                    (Some(norm_value), Some(norm_multiple)) => {
                        let multiplier =
                            10f64.powi((norm_value.scale - norm_multiple.scale).abs());
                        let (mut dividend, mut divisor) = (norm_value.value, norm_multiple.value);
                        if norm_value.scale < norm_multiple.scale {
                            dividend *= multiplier;
                        } else {
                            divisor *= multiplier;
                        }
                        dividend % divisor
                    }
                    _ => value % multiple_of,
                }
            };
            if remainder != 0.0 {
                result.problems.push(at_node(
                    document,
                    node,
                    format!("Value is not divisible by {multiple_of}."),
                ));
            }
        }
    }

    let exclusive_minimum = match schema.exclusive_minimum {
        Some(ExclusiveLimit::Number(limit)) => Some(limit),
        Some(ExclusiveLimit::Bool(true)) => schema.minimum,
        _ => None,
    };
    if let Some(limit) = exclusive_minimum {
        if value <= limit {
            result.problems.push(at_node(
                document,
                node,
                format!("Value is below the exclusive minimum of {limit}."),
            ));
        }
    }
    let minimum = match schema.exclusive_minimum {
        Some(ExclusiveLimit::Bool(true)) => None,
        _ => schema.minimum,
    };
    if let Some(limit) = minimum {
        if value < limit {
            result.problems.push(at_node(
                document,
                node,
                format!("Value is below the minimum of {limit}."),
            ));
        }
    }

    let exclusive_maximum = match schema.exclusive_maximum {
        Some(ExclusiveLimit::Number(limit)) => Some(limit),
        Some(ExclusiveLimit::Bool(true)) => schema.maximum,
        _ => None,
    };
    if let Some(limit) = exclusive_maximum {
        if value >= limit {
            result.problems.push(at_node(
                document,
                node,
                format!("Value is above the exclusive maximum of {limit}."),
            ));
        }
    }
    let maximum = match schema.exclusive_maximum {
        Some(ExclusiveLimit::Bool(true)) => None,
        _ => schema.maximum,
    };
    if let Some(limit) = maximum {
        if value > limit {
            result.problems.push(at_node(
                document,
                node,
                format!("Value is above the maximum of {limit}."),
            ));
        }
    }
}

struct NormalizedFloat {
    value: f64,
    /// Fraction digits minus exponent of the decimal rendering.
    scale: i32,
}

/// Decomposes the shortest decimal rendering of `value` into an integer
/// mantissa and a scale, so `multipleOf` can divide exactly where floating
/// division would drift (0.3 vs 0.1 and friends).
fn normalize_float(value: f64) -> Option<NormalizedFloat> {
    static DECIMAL: OnceLock<Option<Regex>> = OnceLock::new();
    let regex = DECIMAL
        .get_or_init(|| Regex::new(r"^(-?\d+)(?:\.(\d+))?(?:[eE]([-+]?\d+))?$").ok())
        .as_ref()?;
    let rendered = value.to_string();
    let captures = regex.captures(&rendered)?;
    let whole = captures.get(1)?.as_str();
    let fraction = captures.get(2).map(|m| m.as_str()).unwrap_or("");
    let exponent: i32 = captures
        .get(3)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0);
    let digits: f64 = format!("{whole}{fraction}").parse().ok()?;
    Some(NormalizedFloat {
        value: digits,
        scale: fraction.len() as i32 - exponent,
    })
}

const FORMAT_DATE: &str = r"^(\d{4})-(0[1-9]|1[0-2])-(0[1-9]|[12][0-9]|3[01])$";
const FORMAT_DATE_TIME: &str = r"(?i)^(\d{4})-(0[1-9]|1[0-2])-(0[1-9]|[12][0-9]|3[01])T([01][0-9]|2[0-3]):([0-5][0-9]):([0-5][0-9]|60)(\.[0-9]+)?(Z|[+-]([01][0-9]|2[0-3]):([0-5][0-9]))$";
const FORMAT_TIME: &str =
    r"(?i)^([01][0-9]|2[0-3]):([0-5][0-9]):([0-5][0-9]|60)(\.[0-9]+)?(Z|[+-]([01][0-9]|2[0-3]):([0-5][0-9]))$";
const FORMAT_COLOR_HEX: &str = r"^#([0-9A-Fa-f]{3,4}|([0-9A-Fa-f]{2}){3,4})$";
const FORMAT_EMAIL: &str = r#"^(([^<>()\[\]\\.,;:\s@"]+(\.[^<>()\[\]\\.,;:\s@"]+)*)|(".+"))@((\[[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}\])|(([a-zA-Z\-0-9]+\.)+[a-zA-Z]{2,}))$"#;
const FORMAT_URI: &str = r"^(([^:/?#]+?):)?(//([^/?#]*))?([^?#]*)(\?([^#]*))?(#(.*))?";

fn validate_string(
    context: &mut ValidationContext<'_>,
    node: NodeId,
    schema: &Schema,
    result: &mut ValidationResult,
) {
    let document = context.document;
    let Some(value) = document.node(node).as_str() else {
        return;
    };
    // Measured in UTF-16 code units, the unit editors count in.
    let length = value.encode_utf16().count() as f64;

    if let Some(min_length) = schema.min_length {
        if length < min_length {
            result.problems.push(at_node(
                document,
                node,
                format!("String is shorter than the minimum length of {min_length}."),
            ));
        }
    }
    if let Some(max_length) = schema.max_length {
        if length > max_length {
            result.problems.push(at_node(
                document,
                node,
                format!("String is longer than the maximum length of {max_length}."),
            ));
        }
    }
    if let Some(pattern) = &schema.pattern {
        let mismatch = context
            .regex_cache
            .get(pattern)
            .is_some_and(|regex| !regex.is_match(value));
        if mismatch {
            let message = schema
                .pattern_error_message
                .clone()
                .or_else(|| schema.error_message.clone())
                .unwrap_or_else(|| format!("String does not match the pattern of '{pattern}'."));
            result.problems.push(at_node(document, node, message));
        }
    }
    if let Some(format) = &schema.format {
        validate_format(context, node, format, result);
    }
}

fn validate_format(
    context: &mut ValidationContext<'_>,
    node: NodeId,
    format: &str,
    result: &mut ValidationResult,
) {
    let document = context.document;
    let Some(value) = document.node(node).as_str() else {
        return;
    };
    let message = match format {
        "uri" | "uri-reference" => {
            let error = if value.is_empty() {
                Some("URI expected.")
            } else {
                match context
                    .regex_cache
                    .get(FORMAT_URI)
                    .and_then(|regex| regex.captures(value))
                {
                    None => Some("URI is expected."),
                    Some(captures) => {
                        if format == "uri" && captures.get(2).is_none() {
                            Some("URI with a scheme is expected.")
                        } else {
                            None
                        }
                    }
                }
            };
            error.map(|error| format!("String is not a URI: {error}"))
        }
        "color-hex" => fails_format(context, FORMAT_COLOR_HEX, value).then_some(
            "Invalid color format. Use #RGB, #RGBA, #RRGGBB or #RRGGBBAA.".to_string(),
        ),
        "date-time" => fails_format(context, FORMAT_DATE_TIME, value)
            .then_some("String is not a RFC3339 date-time.".to_string()),
        "date" => fails_format(context, FORMAT_DATE, value)
            .then_some("String is not a RFC3339 date.".to_string()),
        "time" => fails_format(context, FORMAT_TIME, value)
            .then_some("String is not a RFC3339 time.".to_string()),
        "email" => fails_format(context, FORMAT_EMAIL, value)
            .then_some("String is not an e-mail address.".to_string()),
        // Unknown formats are not validated.
        _ => None,
    };
    if let Some(message) = message {
        result.problems.push(at_node(document, node, message));
    }
}

/// True when `value` fails `pattern`.
fn fails_format(context: &mut ValidationContext<'_>, pattern: &str, value: &str) -> bool {
    context
        .regex_cache
        .get(pattern)
        .is_some_and(|regex| !regex.is_match(value))
}

fn validate_array<'s>(
    context: &mut ValidationContext<'_>,
    node: NodeId,
    schema: &'s Schema,
    result: &mut ValidationResult,
    collector: &mut Collector<'s>,
) {
    let document = context.document;
    let NodeContent::Array { items } = &document.node(node).content else {
        return;
    };

    match &schema.items {
        Some(ItemsSpec::Schema(item_schema)) => {
            for &item in items {
                let mut item_result = ValidationResult::default();
                validate(
                    context,
                    item,
                    item_schema.as_schema(),
                    &mut item_result,
                    collector,
                );
                result.merge_property_match(item_result);
            }
        }
        Some(ItemsSpec::Tuple(tuple)) => {
            for (index, sub_schema) in tuple.iter().enumerate() {
                let Some(&item) = items.get(index) else {
                    break;
                };
                let mut item_result = ValidationResult::default();
                validate(
                    context,
                    item,
                    sub_schema.as_schema(),
                    &mut item_result,
                    collector,
                );
                result.merge_property_match(item_result);
            }
            if items.len() > tuple.len() {
                match &schema.additional_items {
                    Some(SchemaRef::Object(additional)) => {
                        for &item in &items[tuple.len()..] {
                            let mut item_result = ValidationResult::default();
                            validate(context, item, additional.as_ref(), &mut item_result, collector);
                            result.merge_property_match(item_result);
                        }
                    }
                    Some(SchemaRef::Bool(false)) => {
                        result.problems.push(at_node(
                            document,
                            node,
                            format!(
                                "Array has too many items. Expected {} or fewer.",
                                tuple.len()
                            ),
                        ));
                    }
                    _ => {}
                }
            }
        }
        None => {}
    }

    if let Some(contains) = &schema.contains {
        let contains_schema = contains.as_schema();
        let found = items.iter().any(|&item| {
            let mut trial = ValidationResult::default();
            let mut no_op = Collector::NoOp;
            validate(context, item, contains_schema, &mut trial, &mut no_op);
            !trial.has_problems()
        });
        if !found {
            result.problems.push(at_node(
                document,
                node,
                "Array does not contain required item.".to_string(),
            ));
        }
    }

    if let Some(min_items) = schema.min_items {
        if (items.len() as f64) < min_items {
            result.problems.push(at_node(
                document,
                node,
                format!("Array has too few items. Expected {min_items} or more."),
            ));
        }
    }
    if let Some(max_items) = schema.max_items {
        if (items.len() as f64) > max_items {
            result.problems.push(at_node(
                document,
                node,
                format!("Array has too many items. Expected {max_items} or fewer."),
            ));
        }
    }

    if schema.unique_items {
        let values: Vec<Value> = items
            .iter()
            .map(|&item| node_value(document, item))
            .collect();
        let duplicates = values
            .iter()
            .enumerate()
            .any(|(index, value)| values[index + 1..].iter().any(|other| values_equal(value, other)));
        if duplicates {
            result.problems.push(at_node(
                document,
                node,
                "Array has duplicate items.".to_string(),
            ));
        }
    }
}

fn validate_object<'s>(
    context: &mut ValidationContext<'_>,
    node: NodeId,
    schema: &'s Schema,
    result: &mut ValidationResult,
    collector: &mut Collector<'s>,
) {
    let document = context.document;
    let NodeContent::Object { properties } = &document.node(node).content else {
        return;
    };

    // Key → value node, last occurrence winning; plus the keys not yet
    // claimed by properties / patternProperties, in source order.
    let mut seen_keys: HashMap<&str, Option<NodeId>> = HashMap::new();
    let mut unprocessed: Vec<&str> = Vec::new();
    for &property in properties {
        let NodeContent::Property { key, value, .. } = document.node(property).content else {
            continue;
        };
        let Some(name) = document.node(key).as_str() else {
            continue;
        };
        seen_keys.insert(name, value);
        if !unprocessed.contains(&name) {
            unprocessed.push(name);
        }
    }

    for required in &schema.required {
        if seen_keys.get(required.as_str()).copied().flatten().is_none() {
            let (offset, length) =
                owning_key_span(document, node).unwrap_or((document.node(node).offset, 1));
            result.problems.push(
                Problem::new(offset, length, format!("Missing property \"{required}\".")),
            );
        }
    }

    for (name, property_schema) in &schema.properties {
        unprocessed.retain(|key| *key != name.as_str());
        let Some(Some(child)) = seen_keys.get(name.as_str()) else {
            continue;
        };
        let child = *child;
        validate_matched_property(context, child, name, property_schema, result, collector);
    }

    for (pattern, property_schema) in &schema.pattern_properties {
        let matching: Vec<&str> = {
            let Some(regex) = context.regex_cache.get(pattern) else {
                continue;
            };
            unprocessed
                .iter()
                .copied()
                .filter(|name| regex.is_match(name))
                .collect()
        };
        for name in matching {
            unprocessed.retain(|key| key != &name);
            let Some(Some(child)) = seen_keys.get(name) else {
                continue;
            };
            let child = *child;
            validate_matched_property(context, child, name, property_schema, result, collector);
        }
    }

    match &schema.additional_properties {
        Some(SchemaRef::Object(additional)) => {
            for name in &unprocessed {
                let Some(Some(child)) = seen_keys.get(name) else {
                    continue;
                };
                let mut sub_result = ValidationResult::default();
                validate(context, *child, additional.as_ref(), &mut sub_result, collector);
                result.merge_property_match(sub_result);
            }
        }
        Some(SchemaRef::Bool(false)) => {
            for name in &unprocessed {
                let Some(Some(child)) = seen_keys.get(name) else {
                    continue;
                };
                let (offset, length) = owning_key_span(document, *child).unwrap_or_else(|| {
                    let n = document.node(*child);
                    (n.offset, n.length)
                });
                let message = schema
                    .error_message
                    .clone()
                    .unwrap_or_else(|| format!("Property {name} is not allowed."));
                result.problems.push(Problem::new(offset, length, message));
            }
        }
        _ => {}
    }

    if let Some(max_properties) = schema.max_properties {
        if (properties.len() as f64) > max_properties {
            result.problems.push(at_node(
                document,
                node,
                format!("Object has more properties than limit of {max_properties}"),
            ));
        }
    }
    if let Some(min_properties) = schema.min_properties {
        if (properties.len() as f64) < min_properties {
            result.problems.push(at_node(
                document,
                node,
                format!(
                    "Object has fewer properties than the required number of {min_properties}"
                ),
            ));
        }
    }

    for (key, dependency) in &schema.dependencies {
        if seen_keys.get(key.as_str()).copied().flatten().is_none() {
            continue;
        }
        match dependency {
            Dependency::Keys(required) => {
                for required_key in required {
                    if seen_keys
                        .get(required_key.as_str())
                        .copied()
                        .flatten()
                        .is_none()
                    {
                        result.problems.push(at_node(
                            document,
                            node,
                            format!(
                                "Object is missing property {required_key} required by property {key}."
                            ),
                        ));
                    } else {
                        result.properties_value_matches += 1;
                    }
                }
            }
            Dependency::Schema(dependency_schema) => {
                let mut sub_result = ValidationResult::default();
                validate(
                    context,
                    node,
                    dependency_schema.as_schema(),
                    &mut sub_result,
                    collector,
                );
                result.merge_property_match(sub_result);
            }
        }
    }

    if let Some(property_names) = &schema.property_names {
        let names_schema = property_names.as_schema();
        for &property in properties {
            if let NodeContent::Property { key, .. } = document.node(property).content {
                validate(context, key, names_schema, result, collector);
            }
        }
    }
}

/// Validates one object property that matched `properties` or a
/// `patternProperties` pattern.
fn validate_matched_property<'s>(
    context: &mut ValidationContext<'_>,
    value_node: NodeId,
    name: &str,
    property_schema: &'s SchemaRef,
    result: &mut ValidationResult,
    collector: &mut Collector<'s>,
) {
    let document = context.document;
    match property_schema {
        SchemaRef::Bool(false) => {
            let (offset, length) = owning_key_span(document, value_node).unwrap_or_else(|| {
                let n = document.node(value_node);
                (n.offset, n.length)
            });
            result.problems.push(Problem::new(
                offset,
                length,
                format!("Property {name} is not allowed."),
            ));
        }
        SchemaRef::Bool(true) => {
            result.properties_matches += 1;
            result.properties_value_matches += 1;
        }
        SchemaRef::Object(sub_schema) => {
            let mut sub_result = ValidationResult::default();
            validate(context, value_node, sub_schema.as_ref(), &mut sub_result, collector);
            result.merge_property_match(sub_result);
        }
    }
}

fn stringify_value(value: &Value) -> String {
    serde_json::to_string(value).unwrap_or_default()
}

fn stringify_values(values: &[Value]) -> String {
    values
        .iter()
        .map(stringify_value)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::ParseOptions;
    use crate::parse;
    use serde_json::json;

    fn validate_text(text: &str, schema_json: Value) -> Vec<Diagnostic> {
        let document = parse(text, &ParseOptions::default());
        assert!(
            document.syntax_errors().is_empty(),
            "fixture must parse cleanly: {text}"
        );
        let schema = Schema::from_value(&schema_json);
        document.validate(&schema, Severity::Warning)
    }

    fn messages(diagnostics: &[Diagnostic]) -> Vec<String> {
        diagnostics.iter().map(|d| d.message.clone()).collect()
    }

    // -- Boolean schemas --

    #[test]
    fn true_schema_accepts_everything() {
        for text in ["null", "true", "42", r#""s""#, "[1]", r#"{ "a": 1 }"#] {
            assert!(validate_text(text, json!(true)).is_empty(), "{text}");
        }
    }

    #[test]
    fn false_schema_rejects_everything_once() {
        for text in ["null", "42", r#"{ "a": 1 }"#] {
            let diagnostics = validate_text(text, json!(false));
            assert_eq!(diagnostics.len(), 1, "{text}");
            assert_eq!(diagnostics[0].message, "Matches a schema that is not allowed.");
        }
    }

    // -- Type --

    #[test]
    fn type_mismatch_message_single() {
        let diagnostics = validate_text("42", json!({ "type": "string" }));
        assert_eq!(messages(&diagnostics), vec!["Incorrect type. Expected \"string\"."]);
        assert_eq!(diagnostics[0].severity, Severity::Warning);
    }

    #[test]
    fn type_mismatch_message_list() {
        let diagnostics = validate_text("true", json!({ "type": ["string", "number"] }));
        assert_eq!(
            messages(&diagnostics),
            vec!["Incorrect type. Expected one of string, number."]
        );
    }

    #[test]
    fn integer_matches_only_whole_numbers() {
        assert!(validate_text("3", json!({ "type": "integer" })).is_empty());
        assert!(!validate_text("3.5", json!({ "type": "integer" })).is_empty());
        // An exponent alone does not make a number non-integer.
        assert!(validate_text("3e2", json!({ "type": "integer" })).is_empty());
        // Integers are numbers.
        assert!(validate_text("3", json!({ "type": "number" })).is_empty());
    }

    #[test]
    fn error_message_overrides_type_message() {
        let diagnostics = validate_text("42", json!({ "type": "string", "errorMessage": "Custom!" }));
        assert_eq!(messages(&diagnostics), vec!["Custom!"]);
    }

    // -- Numbers --

    #[test]
    fn exclusive_minimum_draft4_boolean() {
        let diagnostics = validate_text(
            "0",
            json!({ "type": "number", "minimum": 0, "exclusiveMinimum": true }),
        );
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].severity, Severity::Warning);
        assert_eq!(
            diagnostics[0].message,
            "Value is below the exclusive minimum of 0."
        );
    }

    #[test]
    fn exclusive_limits_draft6_numeric() {
        assert!(!validate_text("10", json!({ "exclusiveMinimum": 10 })).is_empty());
        assert!(validate_text("11", json!({ "exclusiveMinimum": 10 })).is_empty());
        assert!(!validate_text("10", json!({ "exclusiveMaximum": 10 })).is_empty());
        assert!(validate_text("9", json!({ "exclusiveMaximum": 10 })).is_empty());
    }

    #[test]
    fn inclusive_limits() {
        assert!(validate_text("10", json!({ "minimum": 10, "maximum": 10 })).is_empty());
        let below = validate_text("9", json!({ "minimum": 10 }));
        assert_eq!(messages(&below), vec!["Value is below the minimum of 10."]);
        let above = validate_text("11", json!({ "maximum": 10 }));
        assert_eq!(messages(&above), vec!["Value is above the maximum of 10."]);
    }

    #[test]
    fn boolean_exclusive_suppresses_inclusive_form() {
        // Only the exclusive diagnostic fires, not the inclusive one too.
        let diagnostics = validate_text(
            "0",
            json!({ "minimum": 0, "exclusiveMinimum": true }),
        );
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn multiple_of_integer_divisor() {
        assert!(validate_text("9", json!({ "multipleOf": 3 })).is_empty());
        let diagnostics = validate_text("7", json!({ "multipleOf": 3 }));
        assert_eq!(messages(&diagnostics), vec!["Value is not divisible by 3."]);
    }

    #[test]
    fn multiple_of_decimal_divisor_is_exact() {
        // Plain floating remainder would reject these.
        assert!(validate_text("0.3", json!({ "multipleOf": 0.1 })).is_empty());
        assert!(validate_text("1.1", json!({ "multipleOf": 0.1 })).is_empty());
        assert!(validate_text("4.5", json!({ "multipleOf": 0.5 })).is_empty());
        let diagnostics = validate_text("0.25", json!({ "multipleOf": 0.1 }));
        assert_eq!(messages(&diagnostics), vec!["Value is not divisible by 0.1."]);
    }

    // -- Strings --

    #[test]
    fn string_lengths_count_utf16_units() {
        // One astral character is two UTF-16 code units.
        assert!(validate_text(r#""😀""#, json!({ "minLength": 2 })).is_empty());
        let diagnostics = validate_text(r#""😀""#, json!({ "maxLength": 1 }));
        assert_eq!(
            messages(&diagnostics),
            vec!["String is longer than the maximum length of 1."]
        );
        let diagnostics = validate_text(r#""ab""#, json!({ "minLength": 3 }));
        assert_eq!(
            messages(&diagnostics),
            vec!["String is shorter than the minimum length of 3."]
        );
    }

    #[test]
    fn pattern_mismatch_and_overrides() {
        let diagnostics = validate_text(r#""123""#, json!({ "pattern": "^[a-z]+$" }));
        assert_eq!(
            messages(&diagnostics),
            vec!["String does not match the pattern of '^[a-z]+$'."]
        );

        let diagnostics = validate_text(
            r#""123""#,
            json!({ "pattern": "^[a-z]+$", "patternErrorMessage": "Lowercase only." }),
        );
        assert_eq!(messages(&diagnostics), vec!["Lowercase only."]);
    }

    #[test]
    fn malformed_pattern_is_skipped() {
        assert!(validate_text(r#""anything""#, json!({ "pattern": "(unclosed" })).is_empty());
        assert!(
            validate_text(r#"{ "a": 1 }"#, json!({ "patternProperties": { "(bad": false } }))
                .is_empty()
        );
    }

    // -- Formats --

    #[test]
    fn format_uri_requires_scheme() {
        assert!(validate_text(r#""https://example.com/x?q=1#f""#, json!({ "format": "uri" })).is_empty());
        let diagnostics = validate_text(r#""//example.com/x""#, json!({ "format": "uri" }));
        assert_eq!(
            messages(&diagnostics),
            vec!["String is not a URI: URI with a scheme is expected."]
        );
        let diagnostics = validate_text(r#""""#, json!({ "format": "uri" }));
        assert_eq!(messages(&diagnostics), vec!["String is not a URI: URI expected."]);
    }

    #[test]
    fn format_uri_reference_allows_relative() {
        assert!(validate_text(r#""/a/b""#, json!({ "format": "uri-reference" })).is_empty());
        assert!(!validate_text(r#""""#, json!({ "format": "uri-reference" })).is_empty());
    }

    #[test]
    fn format_date_time() {
        for ok in [
            r#""1985-04-12T23:20:50.52Z""#,
            r#""1985-04-12t23:20:50z""#,
            r#""1996-12-19T16:39:57-08:00""#,
        ] {
            assert!(validate_text(ok, json!({ "format": "date-time" })).is_empty(), "{ok}");
        }
        for bad in [r#""1985-04-12""#, r#""1985-13-12T23:20:50Z""#, r#""not a date""#] {
            let diagnostics = validate_text(bad, json!({ "format": "date-time" }));
            assert_eq!(messages(&diagnostics), vec!["String is not a RFC3339 date-time."], "{bad}");
        }
    }

    #[test]
    fn format_date_and_time() {
        assert!(validate_text(r#""2023-01-15""#, json!({ "format": "date" })).is_empty());
        assert!(!validate_text(r#""2023-13-15""#, json!({ "format": "date" })).is_empty());
        assert!(validate_text(r#""23:20:50Z""#, json!({ "format": "time" })).is_empty());
        assert!(!validate_text(r#""25:00:00Z""#, json!({ "format": "time" })).is_empty());
    }

    #[test]
    fn format_color_hex() {
        for ok in [r##""#abc""##, r##""#abcd""##, r##""#AABBCC""##, r##""#AABBCCDD""##] {
            assert!(validate_text(ok, json!({ "format": "color-hex" })).is_empty(), "{ok}");
        }
        let diagnostics = validate_text(r#""abc""#, json!({ "format": "color-hex" }));
        assert_eq!(
            messages(&diagnostics),
            vec!["Invalid color format. Use #RGB, #RGBA, #RRGGBB or #RRGGBBAA."]
        );
    }

    #[test]
    fn format_email() {
        assert!(validate_text(r#""user.name@example.co.uk""#, json!({ "format": "email" })).is_empty());
        let diagnostics = validate_text(r#""not-an-email""#, json!({ "format": "email" }));
        assert_eq!(messages(&diagnostics), vec!["String is not an e-mail address."]);
    }

    #[test]
    fn unknown_format_is_ignored() {
        assert!(validate_text(r#""anything""#, json!({ "format": "x-custom" })).is_empty());
    }

    // -- Enum and const --

    #[test]
    fn enum_match_and_mismatch() {
        let schema = json!({ "enum": ["red", "green"] });
        assert!(validate_text(r#""red""#, schema.clone()).is_empty());

        let diagnostics = validate_text(r#""blue""#, schema);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, Some(ErrorCode::EnumValueMismatch));
        assert_eq!(
            diagnostics[0].message,
            "Value is not accepted. Valid values: \"red\", \"green\"."
        );
    }

    #[test]
    fn enum_compares_deeply() {
        let schema = json!({ "enum": [{ "a": [1, 2] }] });
        assert!(validate_text(r#"{ "a": [1, 2] }"#, schema.clone()).is_empty());
        assert!(!validate_text(r#"{ "a": [1, 3] }"#, schema).is_empty());
    }

    #[test]
    fn const_is_singleton_enum() {
        assert!(validate_text("42", json!({ "const": 42 })).is_empty());
        let diagnostics = validate_text("43", json!({ "const": 42 }));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, Some(ErrorCode::EnumValueMismatch));
        assert_eq!(diagnostics[0].message, "Value must be 42.");
    }

    #[test]
    fn tied_enum_alternatives_union_their_values() {
        let diagnostics = validate_text(
            "5",
            json!({ "anyOf": [{ "enum": [1, 2] }, { "enum": [3] }] }),
        );
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(
            diagnostics[0].message,
            "Value is not accepted. Valid values: 1, 2, 3."
        );
    }

    // -- Combinators --

    #[test]
    fn all_of_merges_every_alternative() {
        let diagnostics = validate_text(
            r#"{ "a": 1 }"#,
            json!({ "allOf": [{ "required": ["a"] }, { "required": ["b"] }] }),
        );
        assert_eq!(messages(&diagnostics), vec!["Missing property \"b\"."]);
    }

    #[test]
    fn any_of_succeeds_iff_some_alternative_does() {
        let schema = json!({ "anyOf": [{ "type": "string" }, { "type": "number" }] });
        assert!(validate_text("42", schema.clone()).is_empty());
        assert!(validate_text(r#""x""#, schema.clone()).is_empty());
        let diagnostics = validate_text("true", schema);
        assert!(!diagnostics.is_empty());
    }

    #[test]
    fn one_of_single_match_is_clean() {
        let diagnostics = validate_text(
            "42",
            json!({ "oneOf": [{ "type": "string" }, { "type": "number" }] }),
        );
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn one_of_no_match_surfaces_best_branch() {
        let diagnostics = validate_text(
            "true",
            json!({ "oneOf": [{ "type": "string" }, { "type": "number" }] }),
        );
        // The first branch is the best by ordering; no "matches multiple".
        assert_eq!(messages(&diagnostics), vec!["Incorrect type. Expected \"string\"."]);
    }

    #[test]
    fn one_of_multiple_matches_is_a_problem() {
        let diagnostics = validate_text(
            "42",
            json!({ "oneOf": [{ "type": "number" }, { "type": "number" }] }),
        );
        assert_eq!(
            messages(&diagnostics),
            vec!["Matches multiple schemas when only one must validate."]
        );
        // Anchored at the node with a one-character span.
        assert_eq!(diagnostics[0].range.start.character, 0);
        assert_eq!(diagnostics[0].range.end.character, 1);
    }

    #[test]
    fn not_inverts_success() {
        let schema = json!({ "not": { "type": "string" } });
        assert!(validate_text("42", schema.clone()).is_empty());
        let diagnostics = validate_text(r#""x""#, schema);
        assert_eq!(messages(&diagnostics), vec!["Matches a schema that is not allowed."]);
    }

    #[test]
    fn if_then_else_branches() {
        let schema = json!({
            "if": { "properties": { "kind": { "const": "a" } } },
            "then": { "required": ["size"] },
            "else": { "required": ["name"] }
        });
        let diagnostics = validate_text(r#"{ "kind": "a" }"#, schema.clone());
        assert_eq!(messages(&diagnostics), vec!["Missing property \"size\"."]);
        let diagnostics = validate_text(r#"{ "kind": "b" }"#, schema.clone());
        assert_eq!(messages(&diagnostics), vec!["Missing property \"name\"."]);
        let diagnostics = validate_text(r#"{ "kind": "a", "size": 1 }"#, schema);
        assert!(diagnostics.is_empty());
    }

    // -- Arrays --

    #[test]
    fn items_schema_applies_to_every_element() {
        let diagnostics = validate_text(r#"[1, "two", 3]"#, json!({ "items": { "type": "number" } }));
        assert_eq!(messages(&diagnostics), vec!["Incorrect type. Expected \"number\"."]);
        // At the offending element.
        assert_eq!(diagnostics[0].range.start.character, 4);
    }

    #[test]
    fn tuple_items_with_additional_items() {
        let tuple = json!([{ "type": "string" }, { "type": "number" }]);

        let closed = json!({ "items": tuple, "additionalItems": false });
        let diagnostics = validate_text(r#"["a", 1, true]"#, closed);
        assert_eq!(
            messages(&diagnostics),
            vec!["Array has too many items. Expected 2 or fewer."]
        );

        let typed = json!({ "items": tuple, "additionalItems": { "type": "boolean" } });
        assert!(validate_text(r#"["a", 1, true]"#, typed.clone()).is_empty());
        let diagnostics = validate_text(r#"["a", 1, "x"]"#, typed);
        assert_eq!(messages(&diagnostics), vec!["Incorrect type. Expected \"boolean\"."]);

        let open = json!({ "items": tuple });
        assert!(validate_text(r#"["a", 1, true, null]"#, open).is_empty());
    }

    #[test]
    fn contains_requires_one_matching_element() {
        let schema = json!({ "contains": { "type": "string" } });
        assert!(validate_text(r#"[1, "a"]"#, schema.clone()).is_empty());
        let diagnostics = validate_text("[1, 2]", schema);
        assert_eq!(messages(&diagnostics), vec!["Array does not contain required item."]);
    }

    #[test]
    fn item_count_bounds() {
        let diagnostics = validate_text("[1]", json!({ "minItems": 2 }));
        assert_eq!(messages(&diagnostics), vec!["Array has too few items. Expected 2 or more."]);
        let diagnostics = validate_text("[1, 2, 3]", json!({ "maxItems": 2 }));
        assert_eq!(messages(&diagnostics), vec!["Array has too many items. Expected 2 or fewer."]);
    }

    #[test]
    fn unique_items_uses_deep_equality() {
        let schema = json!({ "uniqueItems": true });
        assert!(validate_text("[1, 2, 3]", schema.clone()).is_empty());
        assert!(!validate_text("[1, 2, 1]", schema.clone()).is_empty());
        // Structural duplicates count even for objects and arrays.
        let diagnostics = validate_text(r#"[{ "a": 1 }, { "a": 1 }]"#, schema.clone());
        assert_eq!(messages(&diagnostics), vec!["Array has duplicate items."]);
        assert!(validate_text(r#"[{ "a": 1 }, { "a": 2 }]"#, schema).is_empty());
    }

    // -- Objects --

    #[test]
    fn required_and_property_type_mismatch() {
        let text = r#"{"a":1}"#;
        let diagnostics = validate_text(
            text,
            json!({ "properties": { "a": { "type": "string" } }, "required": ["b"] }),
        );
        assert_eq!(diagnostics.len(), 2);
        for diagnostic in &diagnostics {
            assert_eq!(diagnostic.severity, Severity::Warning);
        }
        // Missing property lands on the opening brace.
        assert_eq!(diagnostics[0].message, "Missing property \"b\".");
        assert_eq!(diagnostics[0].range.start.character, 0);
        assert_eq!(diagnostics[0].range.end.character, 1);
        // The type mismatch lands on the value.
        assert_eq!(diagnostics[1].message, "Incorrect type. Expected \"string\".");
        assert_eq!(diagnostics[1].range.start.character, 5);
    }

    #[test]
    fn property_schema_false_rejects_at_key() {
        let diagnostics = validate_text(
            r#"{ "a": 1 }"#,
            json!({ "properties": { "a": false } }),
        );
        assert_eq!(messages(&diagnostics), vec!["Property a is not allowed."]);
        assert_eq!(diagnostics[0].range.start.character, 2);
        assert_eq!(diagnostics[0].range.end.character, 5);
    }

    #[test]
    fn additional_properties_false_flags_extras_at_keys() {
        let diagnostics = validate_text(
            r#"{ "a": 1, "b": 2 }"#,
            json!({ "properties": { "a": {} }, "additionalProperties": false }),
        );
        assert_eq!(messages(&diagnostics), vec!["Property b is not allowed."]);
        assert_eq!(diagnostics[0].range.start.character, 10);
    }

    #[test]
    fn additional_properties_schema_validates_extras() {
        let schema = json!({ "properties": { "a": {} }, "additionalProperties": { "type": "number" } });
        assert!(validate_text(r#"{ "a": true, "b": 2 }"#, schema.clone()).is_empty());
        let diagnostics = validate_text(r#"{ "a": true, "b": "x" }"#, schema);
        assert_eq!(messages(&diagnostics), vec!["Incorrect type. Expected \"number\"."]);
    }

    #[test]
    fn pattern_properties_claim_matching_keys() {
        let schema = json!({
            "patternProperties": { "^x-": { "type": "number" } },
            "additionalProperties": false
        });
        assert!(validate_text(r#"{ "x-a": 1 }"#, schema.clone()).is_empty());
        let diagnostics = validate_text(r#"{ "x-a": "s" }"#, schema.clone());
        assert_eq!(messages(&diagnostics), vec!["Incorrect type. Expected \"number\"."]);
        // A key not matching any pattern is additional.
        let diagnostics = validate_text(r#"{ "y": 1 }"#, schema);
        assert_eq!(messages(&diagnostics), vec!["Property y is not allowed."]);
    }

    #[test]
    fn property_count_bounds() {
        let diagnostics = validate_text("{}", json!({ "minProperties": 1 }));
        assert_eq!(
            messages(&diagnostics),
            vec!["Object has fewer properties than the required number of 1"]
        );
        let diagnostics = validate_text(r#"{ "a": 1, "b": 2 }"#, json!({ "maxProperties": 1 }));
        assert_eq!(
            messages(&diagnostics),
            vec!["Object has more properties than limit of 1"]
        );
    }

    #[test]
    fn dependencies_key_list() {
        let schema = json!({ "dependencies": { "a": ["b"] } });
        assert!(validate_text(r#"{ "a": 1, "b": 2 }"#, schema.clone()).is_empty());
        assert!(validate_text(r#"{ "c": 1 }"#, schema.clone()).is_empty());
        let diagnostics = validate_text(r#"{ "a": 1 }"#, schema);
        assert_eq!(
            messages(&diagnostics),
            vec!["Object is missing property b required by property a."]
        );
    }

    #[test]
    fn dependencies_schema_applies_to_whole_object() {
        let schema = json!({ "dependencies": { "a": { "required": ["c"] } } });
        let diagnostics = validate_text(r#"{ "a": 1 }"#, schema.clone());
        assert_eq!(messages(&diagnostics), vec!["Missing property \"c\"."]);
        assert!(validate_text(r#"{ "a": 1, "c": 2 }"#, schema).is_empty());
    }

    #[test]
    fn property_names_validates_keys() {
        let diagnostics = validate_text(
            r#"{ "abc": 1 }"#,
            json!({ "propertyNames": { "maxLength": 2 } }),
        );
        assert_eq!(
            messages(&diagnostics),
            vec!["String is longer than the maximum length of 2."]
        );
        // Located at the key string.
        assert_eq!(diagnostics[0].range.start.character, 2);
    }

    // -- Deprecation --

    #[test]
    fn deprecated_property_hints_at_key() {
        let diagnostics = validate_text(
            r#"{"p":""}"#,
            json!({ "properties": { "p": { "deprecated": true } } }),
        );
        assert_eq!(diagnostics.len(), 1);
        let hint = &diagnostics[0];
        assert_eq!(hint.severity, Severity::Hint);
        assert_eq!(hint.code, Some(ErrorCode::Deprecated));
        assert_eq!(hint.tags, vec![DiagnosticTag::Deprecated]);
        assert_eq!(hint.message, "Value is deprecated");
        // At the key "p".
        assert_eq!(hint.range.start.character, 1);
        assert_eq!(hint.range.end.character, 4);
    }

    #[test]
    fn deprecation_message_and_root_location() {
        let diagnostics = validate_text(
            r#""old""#,
            json!({ "deprecationMessage": "Use the new field." }),
        );
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].message, "Use the new field.");
        assert_eq!(diagnostics[0].severity, Severity::Hint);
        assert_eq!(diagnostics[0].range.start.character, 0);
    }

    #[test]
    fn deprecation_does_not_affect_scoring() {
        // The deprecated alternative loses; its hint must not survive.
        let diagnostics = validate_text(
            "42",
            json!({ "anyOf": [{ "type": "number" }, { "type": "string", "deprecated": true }] }),
        );
        assert!(diagnostics.is_empty());

        // A surviving deprecated schema still validates cleanly but hints.
        let diagnostics = validate_text(
            "42",
            json!({ "type": "number", "deprecated": true }),
        );
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].severity, Severity::Hint);
    }

    // -- Matching schemas --

    #[test]
    fn matching_schemas_records_consulted_pairs() {
        let document = parse(r#"{ "a": 1 }"#, &ParseOptions::default());
        let schema = Schema::from_value(&json!({ "properties": { "a": { "type": "number" } } }));
        let matches = document.matching_schemas(&schema);
        assert_eq!(matches.len(), 2);
        assert!(matches.iter().all(|m| !m.inverted));
        let kinds: Vec<NodeKind> = matches
            .iter()
            .map(|m| document.node(m.node).kind())
            .collect();
        assert!(kinds.contains(&NodeKind::Object));
        assert!(kinds.contains(&NodeKind::Number));
    }

    #[test]
    fn not_trial_records_inverted() {
        let document = parse("42", &ParseOptions::default());
        let schema = Schema::from_value(&json!({ "not": { "type": "string" } }));
        let matches = document.matching_schemas(&schema);
        assert_eq!(matches.len(), 2);
        assert_eq!(matches.iter().filter(|m| m.inverted).count(), 1);
    }

    #[test]
    fn focus_offset_scopes_the_walk() {
        let document = parse(r#"[1, "x"]"#, &ParseOptions::default());
        let schema = Schema::from_value(&json!({ "items": {} }));

        let all = document.matching_schemas(&schema);
        assert_eq!(all.len(), 3);

        // Focus inside the string element: the number element is skipped.
        let focused = document.matching_schemas_at(&schema, Some(4), None);
        assert_eq!(focused.len(), 2);
        assert!(focused
            .iter()
            .all(|m| document.node(m.node).kind() != NodeKind::Number));
    }

    #[test]
    fn focus_offset_scopes_combinator_trials() {
        let document = parse(r#"[1, "x"]"#, &ParseOptions::default());
        let schema = Schema::from_value(&json!({ "anyOf": [{ "items": {} }] }));

        // Trial collectors inherit the focus, so elements outside it are
        // not walked even inside an anyOf alternative.
        let focused = document.matching_schemas_at(&schema, Some(4), None);
        assert!(!focused.is_empty());
        assert!(focused
            .iter()
            .all(|m| document.node(m.node).kind() != NodeKind::Number));
    }

    #[test]
    fn property_names_matches_are_collected() {
        let document = parse(r#"{ "ab": 1 }"#, &ParseOptions::default());
        let schema = Schema::from_value(&json!({ "propertyNames": { "minLength": 1 } }));
        let matches = document.matching_schemas(&schema);
        // The key string node was validated and recorded.
        assert!(matches
            .iter()
            .any(|m| document.node(m.node).kind() == NodeKind::String));
    }

    #[test]
    fn exclude_skips_a_node() {
        let document = parse("42", &ParseOptions::default());
        let schema = Schema::from_value(&json!({}));
        let root = document.root().unwrap();
        let matches = document.matching_schemas_at(&schema, None, Some(root));
        assert!(matches.is_empty());
    }

    #[test]
    fn diagnostics_and_matching_schemas_in_one_walk() {
        let document = parse(r#"{ "a": "x" }"#, &ParseOptions::default());
        let schema = Schema::from_value(&json!({ "properties": { "a": { "type": "number" } } }));
        let (diagnostics, matches) =
            document.diagnostics_and_matching_schemas(&schema, Severity::Warning);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(matches.len(), 2);
    }

    #[test]
    fn every_node_accepts_true_and_rejects_false() {
        let document = parse(r#"{ "a": [1, "x", null], "b": { "c": true } }"#, &ParseOptions::default());
        let always = Schema::from_value(&json!(true));
        let never = Schema::from_value(&json!(false));
        document.visit(|node| {
            let (result, _) = validate_node(&document, node, &always);
            assert!(!result.has_problems());
            let (result, _) = validate_node(&document, node, &never);
            if document.node(node).kind() == NodeKind::Property {
                // Property nodes delegate to their value.
                assert_eq!(result.problems.len(), 1);
            } else {
                assert_eq!(result.problems.len(), 1);
                assert_eq!(result.problems[0].offset, document.node(node).offset);
            }
            true
        });
    }

    #[test]
    fn not_flips_outcome_for_any_schema() {
        let inner = json!({ "type": "string", "minLength": 2 });
        for text in ["42", r#""x""#, r#""xy""#, "[1]"] {
            let plain = validate_text(text, inner.clone());
            let negated = validate_text(text, json!({ "not": inner }));
            assert_eq!(
                plain.is_empty(),
                !negated.is_empty(),
                "not() must flip {text}"
            );
        }
    }

    #[test]
    fn empty_document_validates_clean() {
        let document = parse("", &ParseOptions::default());
        let schema = Schema::from_value(&json!({ "type": "object" }));
        assert!(document.validate(&schema, Severity::Warning).is_empty());
        assert!(document.matching_schemas(&schema).is_empty());
    }
}
