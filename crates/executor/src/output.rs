//! Result projection and output formatting
//!
//! # Mode selection
//!
//! | Query | `json` | `export` | Output |
//! |-------|--------|----------|--------|
//! | named, no properties | any | any | first field of the first result, bare |
//! | named, properties | no | no | `VAR="value"` per present property |
//! | named, properties | no | yes | `export VAR="value"` per present property |
//! | named, properties | yes | any | JSON object of present properties, request order |
//! | expression, object | no | no/yes | fields of the first result as assignments |
//! | expression, object or array | yes | any | first value, or all values as an array |
//! | expression, scalar | any | any | value, bare |
//!
//! Requested properties missing from the record are skipped. Field order is
//! the record's own order, so the store's JSON must keep insertion order.

use roomq_core::{QuerySpec, Result, ResultRecord};
use serde_json::{Map, Value};

/// Output flags from the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutputOptions {
    /// Emit JSON
    pub json: bool,
    /// Prefix shell assignments with `export `
    pub export: bool,
}

/// Encoding chosen for one result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// One bare value
    SingleValue,
    /// `VAR="value"` lines
    ShellEval,
    /// `export VAR="value"` lines
    ShellExport,
    /// Compact JSON
    Json,
}

impl OutputMode {
    /// Mode for a result with (`has_fields`) or without selectable fields.
    pub fn select(has_fields: bool, options: &OutputOptions) -> Self {
        match (has_fields, options.json, options.export) {
            (false, _, _) => OutputMode::SingleValue,
            (true, true, _) => OutputMode::Json,
            (true, false, true) => OutputMode::ShellExport,
            (true, false, false) => OutputMode::ShellEval,
        }
    }
}

/// Shell variable name for a property: `[^A-Za-z0-9_]` becomes `_`, then
/// upper-case.
pub fn property_to_var_name(property: &str) -> String {
    property
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}

/// Escape a value for use inside double quotes.
///
/// Backslashes go first so the escapes added afterwards are not escaped
/// again.
pub fn escape_shell_value(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('`', "\\`")
        .replace('$', "\\$")
        .replace('\n', "\\n")
}

/// Text form of a value: strings raw, `null` empty, anything else as
/// compact JSON.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Values selected from a result, before encoding.
#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    /// Nothing to print
    Empty,
    /// A single value printed bare
    Value(Value),
    /// Named fields, in output order
    Fields(Vec<(String, Value)>),
    /// A document emitted as JSON
    Document(Value),
}

/// Select what to print from `records` for `spec`.
///
/// `records` is expected to be non-empty; an empty slice projects nothing.
pub fn project(spec: &QuerySpec, records: &[ResultRecord], options: &OutputOptions) -> Projection {
    let Some(first) = records.first() else {
        return Projection::Empty;
    };

    match spec {
        QuerySpec::Named {
            properties: None, ..
        } => match &first.json {
            Value::Object(map) => match map.values().next() {
                Some(value) => Projection::Value(value.clone()),
                None => Projection::Empty,
            },
            other => Projection::Value(other.clone()),
        },
        QuerySpec::Named {
            properties: Some(properties),
            ..
        } => {
            let Value::Object(map) = &first.json else {
                return Projection::Empty;
            };
            if properties.is_empty() {
                return Projection::Empty;
            }
            let fields: Vec<(String, Value)> = properties
                .iter()
                .filter_map(|p| map.get(p).map(|v| (p.clone(), v.clone())))
                .collect();
            if options.json {
                Projection::Document(Value::Object(fields.into_iter().collect::<Map<_, _>>()))
            } else {
                Projection::Fields(fields)
            }
        }
        QuerySpec::Expression { .. } => match &first.json {
            Value::Object(_) | Value::Array(_) if options.json => {
                if records.len() > 1 {
                    Projection::Document(Value::Array(
                        records.iter().map(|r| r.json.clone()).collect(),
                    ))
                } else {
                    Projection::Document(first.json.clone())
                }
            }
            Value::Object(map) => Projection::Fields(
                map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            ),
            other => Projection::Value(other.clone()),
        },
    }
}

/// Encode a projection. Lines are joined with `\n` and carry no trailing
/// newline.
pub fn render(projection: &Projection, options: &OutputOptions) -> Result<String> {
    match projection {
        Projection::Empty => Ok(String::new()),
        Projection::Value(value) => Ok(render_value(value)),
        Projection::Document(doc) => Ok(serde_json::to_string(doc)?),
        Projection::Fields(fields) => {
            let prefix = match OutputMode::select(true, options) {
                OutputMode::ShellExport => "export ",
                _ => "",
            };
            Ok(fields
                .iter()
                .map(|(name, value)| {
                    format!(
                        "{}{}=\"{}\"",
                        prefix,
                        property_to_var_name(name),
                        escape_shell_value(&render_value(value))
                    )
                })
                .collect::<Vec<_>>()
                .join("\n"))
        }
    }
}

/// Project and render in one step.
pub fn format(spec: &QuerySpec, records: &[ResultRecord], options: &OutputOptions) -> Result<String> {
    render(&project(spec, records, options), options)
}
