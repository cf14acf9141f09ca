use crate::Environment;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-environment values of a variable.
///
/// A missing key means "not set in that environment", which is distinct from
/// an empty string.
pub type EnvValues = BTreeMap<Environment, String>;

/// One configuration key across environments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentVariable {
    /// Opaque identifier assigned at creation
    pub id: String,
    /// Conventionally uppercase snake-case, not required to be unique
    pub name: String,
    #[serde(default)]
    pub values: EnvValues,
    /// Controls default masking only; nothing is encrypted
    #[serde(default)]
    pub is_secret: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EnvironmentVariable {
    /// Stamp a new record from creation data.
    pub fn from_new(id: String, data: NewVariable, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: data.name,
            values: data.values,
            is_secret: data.is_secret,
            description: data.description,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn value(&self, env: Environment) -> Option<&str> {
        self.values.get(&env).map(String::as_str)
    }

    pub fn has_value(&self, env: Environment) -> bool {
        self.values.contains_key(&env)
    }

    /// Environments with a set value, in canonical order.
    pub fn environments(&self) -> Vec<Environment> {
        self.values.keys().copied().collect()
    }

    /// Merge an update command into this record and refresh `updated_at`.
    pub fn apply(&mut self, update: &VariableUpdate, now: DateTime<Utc>) {
        if let Some(name) = &update.name {
            self.name = name.clone();
        }
        for (env, value) in &update.values {
            match value {
                Some(value) => {
                    self.values.insert(*env, value.clone());
                }
                None => {
                    self.values.remove(env);
                }
            }
        }
        if let Some(is_secret) = update.is_secret {
            self.is_secret = is_secret;
        }
        if let Some(description) = &update.description {
            self.description = description.clone();
        }
        self.updated_at = now;
    }
}

/// Data needed to create a variable; `id` and timestamps are stamped by the registry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewVariable {
    pub name: String,
    #[serde(default)]
    pub values: EnvValues,
    #[serde(default)]
    pub is_secret: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl NewVariable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn value(mut self, env: Environment, value: impl Into<String>) -> Self {
        self.values.insert(env, value.into());
        self
    }

    pub fn secret(mut self, is_secret: bool) -> Self {
        self.is_secret = is_secret;
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Collect every validation message; an empty list means the data is valid.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        if let Err(e) = validate_variable_name(&self.name) {
            errors.push(e);
        }
        if let Err(e) = validate_environment_values(&self.values) {
            errors.push(e);
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// Explicit update command for a variable.
///
/// Only the fields listed here are mutable. `values` is a patch: `Some` sets
/// the value for that environment, `None` unsets it, and environments not
/// mentioned are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariableUpdate {
    pub name: Option<String>,
    pub values: BTreeMap<Environment, Option<String>>,
    pub is_secret: Option<bool>,
    pub description: Option<Option<String>>,
}

impl VariableUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn value(mut self, env: Environment, value: impl Into<String>) -> Self {
        self.values.insert(env, Some(value.into()));
        self
    }

    pub fn unset(mut self, env: Environment) -> Self {
        self.values.insert(env, None);
        self
    }

    pub fn secret(mut self, is_secret: bool) -> Self {
        self.is_secret = Some(is_secret);
        self
    }

    pub fn description(mut self, description: Option<String>) -> Self {
        self.description = Some(description);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.values.is_empty()
            && self.is_secret.is_none()
            && self.description.is_none()
    }

    /// Validate the fields carried by the command itself.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        match &self.name {
            Some(name) => validate_variable_name(name).map_err(|e| vec![e]),
            None => Ok(()),
        }
    }
}

/// Whether a bulk transfer keeps the source value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferKind {
    Copy,
    Move,
}

/// Copy or move the values of selected variables from one environment to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferOperation {
    #[serde(rename = "type")]
    pub kind: TransferKind,
    pub source_env: Environment,
    pub target_env: Environment,
    pub var_ids: Vec<String>,
}

/// Check a variable name against `^[A-Z_][A-Z0-9_]*$`.
pub fn validate_variable_name(name: &str) -> Result<(), String> {
    if name.trim().is_empty() {
        return Err("Variable name is required".into());
    }

    let mut chars = name.chars();
    let valid_first = chars
        .next()
        .is_some_and(|c| c.is_ascii_uppercase() || c == '_');
    if !valid_first || !chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_') {
        return Err(
            "Variable name must start with A-Z or _, and contain only A-Z, 0-9, and _".into(),
        );
    }

    Ok(())
}

/// Require at least one environment with a non-blank value.
pub fn validate_environment_values(values: &EnvValues) -> Result<(), String> {
    if values.values().any(|v| !v.trim().is_empty()) {
        Ok(())
    } else {
        Err("At least one environment must have a value".into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> EnvironmentVariable {
        let now = Utc::now();
        EnvironmentVariable::from_new(
            "1".into(),
            NewVariable::new("API_KEY")
                .value(Environment::Development, "dev")
                .value(Environment::Production, "prod")
                .description("External API"),
            now,
        )
    }

    #[test]
    fn test_valid_names() {
        assert!(validate_variable_name("DATABASE_URL").is_ok());
        assert!(validate_variable_name("_PRIVATE").is_ok());
        assert!(validate_variable_name("V2_TOKEN").is_ok());
    }

    #[test]
    fn test_invalid_names() {
        assert_eq!(
            validate_variable_name("  ").unwrap_err(),
            "Variable name is required"
        );
        assert!(validate_variable_name("database_url").is_err());
        assert!(validate_variable_name("2FA_SECRET").is_err());
        assert!(validate_variable_name("API-KEY").is_err());
        assert!(validate_variable_name(" API_KEY").is_err());
    }

    #[test]
    fn test_new_variable_collects_all_errors() {
        let errors = NewVariable::new("bad name")
            .value(Environment::Preview, "   ")
            .validate()
            .unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors[1].contains("At least one environment"));
    }

    #[test]
    fn test_apply_patch_sets_and_unsets() {
        let mut var = sample();
        let created = var.created_at;
        let later = created + chrono::Duration::seconds(5);
        var.apply(
            &VariableUpdate::new()
                .value(Environment::Preview, "pre")
                .unset(Environment::Production)
                .secret(true),
            later,
        );

        assert_eq!(var.value(Environment::Development), Some("dev"));
        assert_eq!(var.value(Environment::Preview), Some("pre"));
        assert!(!var.has_value(Environment::Production));
        assert!(var.is_secret);
        assert_eq!(var.description.as_deref(), Some("External API"));
        assert_eq!(var.created_at, created);
        assert_eq!(var.updated_at, later);
    }

    #[test]
    fn test_apply_clears_description() {
        let mut var = sample();
        var.apply(&VariableUpdate::new().description(None), Utc::now());
        assert!(var.description.is_none());
    }

    #[test]
    fn test_empty_string_is_a_set_value() {
        let var = EnvironmentVariable::from_new(
            "2".into(),
            NewVariable::new("EMPTY").value(Environment::Preview, ""),
            Utc::now(),
        );
        assert!(var.has_value(Environment::Preview));
        assert!(!var.has_value(Environment::Development));
        assert_eq!(var.environments(), vec![Environment::Preview]);
    }

    #[test]
    fn test_variable_json_shape() {
        let var = sample();
        let json = serde_json::to_value(&var).unwrap();
        assert_eq!(json["values"]["development"], "dev");
        assert_eq!(json["isSecret"], false);
        assert!(json.get("createdAt").is_some());
    }
}
