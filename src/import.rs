//! Bulk text import and export.
//!
//! Parsers never fail outright: they return every variable they could read
//! together with one message per problem, and callers decide whether a
//! partial result is acceptable. `EnvLedger::import` does not accept one.

use envledger_core::{Environment, EnvironmentVariable};
use serde_json::Value;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportFormat {
    /// `KEY=value`, one per line
    KeyValue,
    /// `{"KEY": "value"}` or `[{"name": "KEY", "value": "value", "isSecret": true}]`
    Json,
    /// `.env` syntax with quoting and `export` prefixes
    Dotenv,
}

impl FromStr for ImportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "kv" | "keyvalue" | "key-value" => Ok(ImportFormat::KeyValue),
            "json" => Ok(ImportFormat::Json),
            "dotenv" | "env" => Ok(ImportFormat::Dotenv),
            other => Err(format!("Unknown import format: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedVariable {
    pub name: String,
    pub value: String,
    pub is_secret: Option<bool>,
}

impl ParsedVariable {
    fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            is_secret: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseOutcome {
    pub variables: Vec<ParsedVariable>,
    pub errors: Vec<String>,
}

impl ParseOutcome {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

pub fn parse(text: &str, format: ImportFormat) -> ParseOutcome {
    match format {
        ImportFormat::KeyValue => parse_key_value_pairs(text),
        ImportFormat::Json => parse_json_variables(text),
        ImportFormat::Dotenv => parse_dotenv(text),
    }
}

/// Parse `KEY=value` lines. Blank lines are skipped and do not count towards
/// the line numbers in error messages. Both sides are trimmed and everything
/// after the first `=` is the value.
pub fn parse_key_value_pairs(text: &str) -> ParseOutcome {
    let mut outcome = ParseOutcome::default();
    let lines = text.lines().filter(|line| !line.trim().is_empty());
    for (index, line) in lines.enumerate() {
        match line.split_once('=') {
            Some((name, value)) if !name.is_empty() => {
                outcome
                    .variables
                    .push(ParsedVariable::new(name.trim(), value.trim()));
            }
            _ => outcome.errors.push(format!(
                "Line {}: Invalid format. Expected KEY=value",
                index + 1
            )),
        }
    }
    outcome
}

/// Parse a JSON object of names to values, or an array of
/// `{name, value, isSecret?}` records. Non-string values are stringified.
pub fn parse_json_variables(text: &str) -> ParseOutcome {
    let parsed: Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(e) => {
            return ParseOutcome {
                variables: Vec::new(),
                errors: vec![format!("Invalid JSON format: {}", e)],
            };
        }
    };

    let mut outcome = ParseOutcome::default();
    match parsed {
        Value::Object(map) => {
            for (name, value) in map {
                outcome
                    .variables
                    .push(ParsedVariable::new(name, stringify(&value)));
            }
        }
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                let name = item.get("name").and_then(Value::as_str);
                let value = item.get("value");
                match (name, value) {
                    (Some(name), Some(value)) => outcome.variables.push(ParsedVariable {
                        name: name.to_string(),
                        value: stringify(value),
                        is_secret: item.get("isSecret").and_then(Value::as_bool),
                    }),
                    _ => outcome.errors.push(format!(
                        "Item {}: expected an object with \"name\" and \"value\"",
                        index + 1
                    )),
                }
            }
        }
        _ => {}
    }
    outcome
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Parse `.env` content with the dotenv rules (quotes, comments, `export`).
pub fn parse_dotenv(text: &str) -> ParseOutcome {
    let mut outcome = ParseOutcome::default();
    for item in dotenvy::from_read_iter(text.as_bytes()) {
        match item {
            Ok((name, value)) => outcome.variables.push(ParsedVariable::new(name, value)),
            Err(e) => outcome.errors.push(format!("Invalid dotenv entry: {}", e)),
        }
    }
    outcome
}

/// Render `KEY=value` lines for one environment, skipping unset values.
pub fn export_variables<'a>(
    variables: impl IntoIterator<Item = &'a EnvironmentVariable>,
    env: Environment,
) -> String {
    let mut output = String::new();
    for variable in variables {
        if let Some(value) = variable.value(env) {
            output.push_str(&format!("{}={}\n", variable.name, value));
        }
    }
    output
}
