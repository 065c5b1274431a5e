use std::sync::OnceLock;

use serde_json::Value;

/// A sub-schema position: either a bare boolean or a keyword schema.
///
/// `true` permits anything, `false` permits nothing. The distinction stays
/// observable because a few keywords (`properties` values,
/// `additionalProperties`, `additionalItems`) give a literal `false` its own
/// diagnostic; everywhere else [`SchemaRef::as_schema`] normalizes booleans.
#[derive(Debug, Clone)]
pub enum SchemaRef {
    Bool(bool),
    Object(Box<Schema>),
}

impl SchemaRef {
    /// The schema to validate against: `true` becomes the empty schema,
    /// `false` becomes `{ "not": {} }`.
    pub fn as_schema(&self) -> &Schema {
        match self {
            SchemaRef::Bool(true) => true_schema(),
            SchemaRef::Bool(false) => false_schema(),
            SchemaRef::Object(schema) => schema,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SchemaRef::Bool(value) => Some(*value),
            SchemaRef::Object(_) => None,
        }
    }
}

fn true_schema() -> &'static Schema {
    static SCHEMA: OnceLock<Schema> = OnceLock::new();
    SCHEMA.get_or_init(Schema::default)
}

fn false_schema() -> &'static Schema {
    static SCHEMA: OnceLock<Schema> = OnceLock::new();
    SCHEMA.get_or_init(|| Schema {
        not: Some(SchemaRef::Bool(true)),
        ..Default::default()
    })
}

/// The `type` keyword: a single type name or a list of alternatives.
///
/// Names are kept as written so an unknown name simply never matches and
/// shows up verbatim in the mismatch message.
#[derive(Debug, Clone)]
pub enum TypeSpec {
    Single(String),
    List(Vec<String>),
}

/// `exclusiveMinimum`/`exclusiveMaximum`: Draft-04 used a boolean qualifier
/// on `minimum`/`maximum`, Draft-06 turned it into a standalone numeric
/// bound. Both forms are honored simultaneously.
#[derive(Debug, Clone, Copy)]
pub enum ExclusiveLimit {
    Bool(bool),
    Number(f64),
}

/// The `items` keyword: one schema for every element, or a tuple of
/// positional schemas.
#[derive(Debug, Clone)]
pub enum ItemsSpec {
    Schema(SchemaRef),
    Tuple(Vec<SchemaRef>),
}

/// One entry of `dependencies`: a list of co-required keys, or a schema the
/// whole object must satisfy when the key is present.
#[derive(Debug, Clone)]
pub enum Dependency {
    Keys(Vec<String>),
    Schema(SchemaRef),
}

/// A resolved JSON schema, restricted to the keywords the validator uses.
///
/// Built leniently by [`Schema::from_value`]: keywords with unexpected
/// types are ignored rather than rejected, and anything unknown (including
/// an unresolved `$ref`) degrades toward the always-true schema, so a
/// malformed schema can never block validation of a document.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    pub schema_type: Option<TypeSpec>,
    pub enum_values: Option<Vec<Value>>,
    pub const_value: Option<Value>,

    pub all_of: Vec<SchemaRef>,
    pub any_of: Vec<SchemaRef>,
    pub one_of: Vec<SchemaRef>,
    pub not: Option<SchemaRef>,
    pub if_schema: Option<SchemaRef>,
    pub then_schema: Option<SchemaRef>,
    pub else_schema: Option<SchemaRef>,

    pub multiple_of: Option<f64>,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub exclusive_minimum: Option<ExclusiveLimit>,
    pub exclusive_maximum: Option<ExclusiveLimit>,

    pub min_length: Option<f64>,
    pub max_length: Option<f64>,
    pub pattern: Option<String>,
    pub format: Option<String>,

    pub items: Option<ItemsSpec>,
    pub additional_items: Option<SchemaRef>,
    pub contains: Option<SchemaRef>,
    pub min_items: Option<f64>,
    pub max_items: Option<f64>,
    pub unique_items: bool,

    pub properties: Vec<(String, SchemaRef)>,
    pub pattern_properties: Vec<(String, SchemaRef)>,
    pub additional_properties: Option<SchemaRef>,
    pub required: Vec<String>,
    pub min_properties: Option<f64>,
    pub max_properties: Option<f64>,
    pub dependencies: Vec<(String, Dependency)>,
    pub property_names: Option<SchemaRef>,

    pub error_message: Option<String>,
    pub pattern_error_message: Option<String>,
    pub deprecation_message: Option<String>,
    pub deprecated: bool,
}

impl Schema {
    /// Compiles a schema from its JSON representation. Never fails.
    pub fn from_value(value: &Value) -> Schema {
        match value {
            Value::Bool(true) => Schema::default(),
            Value::Bool(false) => Schema {
                not: Some(SchemaRef::Bool(true)),
                ..Default::default()
            },
            Value::Object(map) => {
                let mut schema = Schema::default();

                if let Some(type_value) = map.get("type") {
                    schema.schema_type = match type_value {
                        Value::String(name) => Some(TypeSpec::Single(name.clone())),
                        Value::Array(names) => Some(TypeSpec::List(
                            names
                                .iter()
                                .filter_map(|n| n.as_str().map(str::to_string))
                                .collect(),
                        )),
                        _ => None,
                    };
                }
                if let Some(Value::Array(values)) = map.get("enum") {
                    schema.enum_values = Some(values.clone());
                }
                if let Some(value) = map.get("const") {
                    schema.const_value = Some(value.clone());
                }

                schema.all_of = schema_ref_list(map.get("allOf"));
                schema.any_of = schema_ref_list(map.get("anyOf"));
                schema.one_of = schema_ref_list(map.get("oneOf"));
                schema.not = map.get("not").map(schema_ref);
                schema.if_schema = map.get("if").map(schema_ref);
                schema.then_schema = map.get("then").map(schema_ref);
                schema.else_schema = map.get("else").map(schema_ref);

                schema.multiple_of = number(map.get("multipleOf"));
                schema.minimum = number(map.get("minimum"));
                schema.maximum = number(map.get("maximum"));
                schema.exclusive_minimum = exclusive_limit(map.get("exclusiveMinimum"));
                schema.exclusive_maximum = exclusive_limit(map.get("exclusiveMaximum"));

                schema.min_length = number(map.get("minLength"));
                schema.max_length = number(map.get("maxLength"));
                schema.pattern = string(map.get("pattern"));
                schema.format = string(map.get("format"));

                schema.items = map.get("items").map(|items| match items {
                    Value::Array(tuple) => ItemsSpec::Tuple(tuple.iter().map(schema_ref).collect()),
                    other => ItemsSpec::Schema(schema_ref(other)),
                });
                schema.additional_items = map.get("additionalItems").map(schema_ref);
                schema.contains = map.get("contains").map(schema_ref);
                schema.min_items = number(map.get("minItems"));
                schema.max_items = number(map.get("maxItems"));
                schema.unique_items = map.get("uniqueItems").and_then(Value::as_bool) == Some(true);

                if let Some(Value::Object(properties)) = map.get("properties") {
                    schema.properties = properties
                        .iter()
                        .map(|(key, value)| (key.clone(), schema_ref(value)))
                        .collect();
                }
                if let Some(Value::Object(patterns)) = map.get("patternProperties") {
                    schema.pattern_properties = patterns
                        .iter()
                        .map(|(key, value)| (key.clone(), schema_ref(value)))
                        .collect();
                }
                schema.additional_properties = map.get("additionalProperties").map(schema_ref);
                if let Some(Value::Array(required)) = map.get("required") {
                    schema.required = required
                        .iter()
                        .filter_map(|r| r.as_str().map(str::to_string))
                        .collect();
                }
                schema.min_properties = number(map.get("minProperties"));
                schema.max_properties = number(map.get("maxProperties"));
                if let Some(Value::Object(dependencies)) = map.get("dependencies") {
                    schema.dependencies = dependencies
                        .iter()
                        .map(|(key, value)| {
                            let dependency = match value {
                                Value::Array(keys) => Dependency::Keys(
                                    keys.iter()
                                        .filter_map(|k| k.as_str().map(str::to_string))
                                        .collect(),
                                ),
                                other => Dependency::Schema(schema_ref(other)),
                            };
                            (key.clone(), dependency)
                        })
                        .collect();
                }
                schema.property_names = map.get("propertyNames").map(schema_ref);

                schema.error_message = string(map.get("errorMessage"));
                schema.pattern_error_message = string(map.get("patternErrorMessage"));
                schema.deprecation_message = string(map.get("deprecationMessage"));
                schema.deprecated = map.get("deprecated").and_then(Value::as_bool) == Some(true);

                schema
            }
            _ => Schema::default(),
        }
    }
}

fn schema_ref(value: &Value) -> SchemaRef {
    match value {
        Value::Bool(enabled) => SchemaRef::Bool(*enabled),
        other => SchemaRef::Object(Box::new(Schema::from_value(other))),
    }
}

fn schema_ref_list(value: Option<&Value>) -> Vec<SchemaRef> {
    match value {
        Some(Value::Array(values)) => values.iter().map(schema_ref).collect(),
        _ => Vec::new(),
    }
}

fn number(value: Option<&Value>) -> Option<f64> {
    value.and_then(Value::as_f64)
}

fn string(value: Option<&Value>) -> Option<String> {
    value.and_then(Value::as_str).map(str::to_string)
}

fn exclusive_limit(value: Option<&Value>) -> Option<ExclusiveLimit> {
    match value {
        Some(Value::Bool(flag)) => Some(ExclusiveLimit::Bool(*flag)),
        Some(other) => other.as_f64().map(ExclusiveLimit::Number),
        None => None,
    }
}
