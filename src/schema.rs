//! Argument validation against a tool's declared JSON Schema
//!
//! Only the subset the tool catalogue uses is understood: property `type`
//! (`string`, `integer`, `number`, `boolean`, `array`, `object`), `enum`,
//! `minimum`/`maximum`, `minLength`/`maxLength`, `items.type`, `default`,
//! the object-level `required` list, and for nested objects `properties`
//! and `additionalProperties`.
//!
//! Checks run in two passes. The first looks at the argument object as a
//! whole (shape, required names, unknown names) and stops there if anything
//! is wrong, so one typo does not bury the caller in follow-on errors. The
//! second checks each property, coercing obvious mismatches (`"3"` for an
//! integer, `"true"` for a boolean) and filling in declared defaults.
//!
//! Messages are written for a model to act on: they name the parameter and
//! say what would have been accepted.

use std::fmt::{self, Write as _};

use serde_json::{Map, Number, Value};

/// One thing wrong with the arguments
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationViolation {
    /// Offending parameter; empty when the problem is the whole object
    pub param: String,
    /// What is wrong with it
    pub message: String,
}

impl ValidationViolation {
    /// Violation of `param`
    pub fn new(param: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            param: param.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.param.is_empty() {
            f.write_str(&self.message)
        } else {
            write!(f, "'{}' {}", self.param, self.message)
        }
    }
}

/// Outcome of [`validate_arguments`]
#[derive(Debug, Clone)]
pub struct SchemaValidationResult {
    /// Every violation found; empty when the arguments are acceptable
    pub violations: Vec<ValidationViolation>,
    /// Coerced arguments with defaults applied. Only meaningful when valid.
    pub normalized: Value,
}

impl SchemaValidationResult {
    /// No violations
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    fn rejected(violations: Vec<ValidationViolation>, arguments: &Value) -> Self {
        Self {
            violations,
            normalized: arguments.clone(),
        }
    }

    /// Violations rendered with the list of parameters `schema` accepts
    #[must_use]
    pub fn format_error(&self, schema: &Value) -> String {
        format_violations(&self.violations, schema)
    }
}

/// Render `violations` followed by a summary of every parameter in `schema`
#[must_use]
pub fn format_violations(violations: &[ValidationViolation], schema: &Value) -> String {
    let mut out = String::from("Tool call validation failed:\n\n");
    for v in violations {
        if v.param.is_empty() {
            let _ = writeln!(out, "- {}", v.message);
        } else {
            let _ = writeln!(out, "- Parameter '{}': {}", v.param, v.message);
        }
    }

    let summary = parameter_summary(schema);
    if !summary.is_empty() {
        out.push_str("\nValid parameters for this tool:\n");
        for line in summary {
            let _ = writeln!(out, "  - {line}");
        }
    }
    out
}

/// Validate `arguments` against `input_schema`, coercing values and applying defaults
#[must_use]
pub fn validate_arguments(arguments: &Value, input_schema: &Value) -> SchemaValidationResult {
    let Some(properties) = input_schema.get("properties").and_then(Value::as_object) else {
        return SchemaValidationResult {
            violations: Vec::new(),
            normalized: arguments.clone(),
        };
    };

    let provided = match arguments {
        Value::Object(map) => map.clone(),
        Value::Null => Map::new(),
        _ => {
            return SchemaValidationResult::rejected(
                vec![ValidationViolation::new("", "Arguments must be a JSON object")],
                arguments,
            );
        }
    };

    let shape_violations = check_names(&provided, properties, &required_names(input_schema));
    if !shape_violations.is_empty() {
        return SchemaValidationResult::rejected(shape_violations, arguments);
    }

    let mut violations = Vec::new();
    let mut normalized = Map::new();
    for (name, schema) in properties {
        match provided.get(name).filter(|v| !v.is_null()) {
            Some(raw) => match check_property(name, raw, schema) {
                Ok(value) => {
                    normalized.insert(name.clone(), value);
                }
                Err(found) => violations.extend(found),
            },
            None => {
                if let Some(default) = schema.get("default") {
                    normalized.insert(name.clone(), default.clone());
                }
            }
        }
    }

    if violations.is_empty() {
        SchemaValidationResult {
            violations,
            normalized: Value::Object(normalized),
        }
    } else {
        SchemaValidationResult::rejected(violations, arguments)
    }
}

fn required_names(schema: &Value) -> Vec<&str> {
    schema
        .get("required")
        .and_then(Value::as_array)
        .map(|names| names.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default()
}

/// Required names present and non-null; no names outside `properties`
fn check_names(
    provided: &Map<String, Value>,
    properties: &Map<String, Value>,
    required: &[&str],
) -> Vec<ValidationViolation> {
    let missing = required.iter().filter_map(|name| match provided.get(*name) {
        None => Some(ValidationViolation::new(*name, "required parameter is missing")),
        Some(Value::Null) => Some(ValidationViolation::new(
            *name,
            "required parameter must not be null",
        )),
        Some(_) => None,
    });

    let unknown = provided
        .keys()
        .filter(|name| !properties.contains_key(name.as_str()))
        .map(|name| {
            let known: Vec<&str> = properties.keys().map(String::as_str).collect();
            ValidationViolation::new(
                name,
                format!("unknown parameter, valid parameters are: {}", known.join(", ")),
            )
        });

    missing.chain(unknown).collect()
}

/// Declared JSON type of a property
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

impl Kind {
    fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "string" => Self::String,
            "integer" => Self::Integer,
            "number" => Self::Number,
            "boolean" => Self::Boolean,
            "array" => Self::Array,
            "object" => Self::Object,
            _ => return None,
        })
    }

    fn name(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
        }
    }

    /// Accept `value` as this kind, converting where the intent is unambiguous
    fn coerce(self, value: &Value) -> Result<Value, String> {
        let mismatch = || format!("expected {}, got {}", self.name(), type_name(value));

        match (self, value) {
            (Self::String, Value::String(_))
            | (Self::Number, Value::Number(_))
            | (Self::Boolean, Value::Bool(_))
            | (Self::Array, Value::Array(_))
            | (Self::Object, Value::Object(_)) => Ok(value.clone()),

            (Self::String, Value::Number(n)) => Ok(Value::String(n.to_string())),

            (Self::Integer, Value::Number(n)) => {
                if n.is_i64() {
                    return Ok(value.clone());
                }
                if n.is_u64() {
                    return Err(format!("integer {n} is out of range"));
                }
                match n.as_f64() {
                    #[allow(clippy::cast_possible_truncation)]
                    Some(f) if f.fract() == 0.0 => Ok(Value::Number((f as i64).into())),
                    _ => Err(format!("expected integer, got float {n}")),
                }
            }
            (Self::Integer, Value::String(s)) => s
                .trim()
                .parse::<i64>()
                .map(|i| Value::Number(i.into()))
                .map_err(|_| {
                    format!("expected integer, got string \"{s}\" which is not a valid integer")
                }),

            (Self::Number, Value::String(s)) => s
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| {
                    format!("expected number, got string \"{s}\" which is not a valid number")
                }),

            (Self::Boolean, Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" => Ok(Value::Bool(true)),
                "false" => Ok(Value::Bool(false)),
                _ => Err(format!(
                    "expected boolean, got string \"{s}\"; use true or false"
                )),
            },

            _ => Err(mismatch()),
        }
    }
}

/// Coerce one provided value and check it against its property schema
fn check_property(
    name: &str,
    raw: &Value,
    schema: &Value,
) -> Result<Value, Vec<ValidationViolation>> {
    let kind = schema
        .get("type")
        .and_then(Value::as_str)
        .and_then(Kind::parse);

    let value = match kind.map(|k| k.coerce(raw)) {
        Some(Err(message)) => return Err(vec![ValidationViolation::new(name, message)]),
        Some(Ok(value)) => value,
        None => raw.clone(),
    };

    let mut problems: Vec<String> = Vec::new();
    problems.extend(check_enum(&value, schema));
    problems.extend(check_range(&value, schema));
    problems.extend(check_length(&value, schema));
    let mut violations: Vec<ValidationViolation> = problems
        .into_iter()
        .map(|message| ValidationViolation::new(name, message))
        .collect();

    let value = match check_items(name, &value, schema) {
        Ok(Some(items)) => items,
        Ok(None) => value,
        Err(item_violations) => {
            violations.extend(item_violations);
            value
        }
    };

    let value = match value {
        Value::Object(members) => match check_object(name, members, schema) {
            Ok(value) => value,
            Err(member_violations) => {
                violations.extend(member_violations);
                return Err(violations);
            }
        },
        other => other,
    };

    if violations.is_empty() {
        Ok(value)
    } else {
        Err(violations)
    }
}

fn check_enum(value: &Value, schema: &Value) -> Option<String> {
    let allowed = schema.get("enum").and_then(Value::as_array)?;
    if allowed.contains(value) {
        return None;
    }
    let options: Vec<String> = allowed.iter().map(display_value).collect();
    Some(format!("must be one of: {}", options.join(", ")))
}

fn check_range(value: &Value, schema: &Value) -> Vec<String> {
    let Some(n) = value.as_f64() else {
        return Vec::new();
    };
    let mut problems = Vec::new();
    if let Some(min) = schema.get("minimum").and_then(Value::as_f64)
        && n < min
    {
        problems.push(format!("must be >= {min}"));
    }
    if let Some(max) = schema.get("maximum").and_then(Value::as_f64)
        && n > max
    {
        problems.push(format!("must be <= {max}"));
    }
    problems
}

fn check_length(value: &Value, schema: &Value) -> Vec<String> {
    let Some(s) = value.as_str() else {
        return Vec::new();
    };
    let len = s.chars().count() as u64;
    let mut problems = Vec::new();
    if let Some(min) = schema.get("minLength").and_then(Value::as_u64)
        && len < min
    {
        problems.push(format!("must be at least {min} characters long"));
    }
    if let Some(max) = schema.get("maxLength").and_then(Value::as_u64)
        && len > max
    {
        problems.push(format!("must be at most {max} characters long"));
    }
    problems
}

/// Coerce array items to `items.type`; `Ok(None)` when there is nothing to check
fn check_items(
    name: &str,
    value: &Value,
    schema: &Value,
) -> Result<Option<Value>, Vec<ValidationViolation>> {
    let (Some(items), Some(kind)) = (
        value.as_array(),
        schema
            .pointer("/items/type")
            .and_then(Value::as_str)
            .and_then(Kind::parse),
    ) else {
        return Ok(None);
    };

    let mut coerced = Vec::with_capacity(items.len());
    let mut violations = Vec::new();
    for (index, item) in items.iter().enumerate() {
        match kind.coerce(item) {
            Ok(v) => coerced.push(v),
            Err(message) => {
                violations.push(ValidationViolation::new(format!("{name}[{index}]"), message));
            }
        }
    }

    if violations.is_empty() {
        Ok(Some(Value::Array(coerced)))
    } else {
        Err(violations)
    }
}

/// Check an object's members against its `properties` and `additionalProperties`.
///
/// Members are reported as `name.member`. `additionalProperties: false`
/// rejects names outside `properties`; a schema there applies to every
/// such member.
fn check_object(
    name: &str,
    members: Map<String, Value>,
    schema: &Value,
) -> Result<Value, Vec<ValidationViolation>> {
    let properties = schema.get("properties").and_then(Value::as_object);
    let additional = schema.get("additionalProperties");
    if properties.is_none() && additional.is_none() {
        return Ok(Value::Object(members));
    }
    let closed = additional == Some(&Value::Bool(false));
    let member_schema = additional.filter(|a| a.is_object());

    let mut violations: Vec<ValidationViolation> = required_names(schema)
        .into_iter()
        .filter(|member| !members.contains_key(*member))
        .map(|member| {
            ValidationViolation::new(format!("{name}.{member}"), "required parameter is missing")
        })
        .collect();

    let mut checked = Map::new();
    for (member, raw) in members {
        let path = format!("{name}.{member}");
        match properties.and_then(|p| p.get(&member)).or(member_schema) {
            Some(sub_schema) => match check_property(&path, &raw, sub_schema) {
                Ok(value) => {
                    checked.insert(member, value);
                }
                Err(found) => violations.extend(found),
            },
            None if closed => {
                let known: Vec<&str> = properties
                    .into_iter()
                    .flat_map(|p| p.keys().map(String::as_str))
                    .collect();
                violations.push(ValidationViolation::new(
                    path,
                    format!("unknown parameter, valid parameters are: {}", known.join(", ")),
                ));
            }
            None => {
                checked.insert(member, raw);
            }
        }
    }

    if violations.is_empty() {
        Ok(Value::Object(checked))
    } else {
        Err(violations)
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => format!("\"{s}\""),
        other => other.to_string(),
    }
}

/// One line per parameter: `name: (type [required|optional]), one of: ..., default ...`
fn parameter_summary(schema: &Value) -> Vec<String> {
    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return Vec::new();
    };
    let required = required_names(schema);

    properties
        .iter()
        .map(|(name, prop)| {
            let kind = prop.get("type").and_then(Value::as_str).unwrap_or("any");
            let necessity = if required.contains(&name.as_str()) {
                "required"
            } else {
                "optional"
            };
            let mut line = format!("{name}: ({kind} [{necessity}])");
            if let Some(options) = prop.get("enum").and_then(Value::as_array) {
                let options: Vec<String> = options.iter().map(display_value).collect();
                let _ = write!(line, ", one of: {}", options.join(", "));
            }
            if let Some(default) = prop.get("default") {
                let _ = write!(line, ", default {default}");
            }
            line
        })
        .collect()
}
