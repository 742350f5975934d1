//! Validation Support
//!
//! Resources declare field rules per action through [`Resource::rules`]. The
//! controller checks the raw JSON payload against them before anything is
//! written; failures become a `406` with a field → messages map.
//!
//! # Example
//!
//! ```rust,ignore
//! use rest_resource::validation::{Rule, Rules};
//!
//! fn rules(&self, _action: Action) -> Rules {
//!     Rules::new()
//!         .field("title", [Rule::Required, Rule::String, Rule::Max(255.0)])
//!         .field("email", [Rule::Nullable, Rule::Email])
//! }
//! ```
//!
//! [`Resource::rules`]: crate::Resource::rules

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

/// Validation error with field name and message
#[derive(Debug, Clone, Serialize)]
pub struct ValidationError {
    /// The field that failed validation
    pub field: String,
    /// Human-readable error message
    pub message: String,
}

impl ValidationError {
    #[must_use]
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Field → messages map, serialized as a plain JSON object
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct ValidationErrors {
    errors: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for a single failing field
    #[must_use]
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(ValidationError::new(field, message));
        errors
    }

    pub fn add(&mut self, error: ValidationError) {
        self.errors.entry(error.field).or_default().push(error.message);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of failing fields
    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    #[must_use]
    pub fn fields(&self) -> Vec<&str> {
        self.errors.keys().map(String::as_str).collect()
    }

    #[must_use]
    pub fn messages(&self, field: &str) -> &[String] {
        self.errors.get(field).map_or(&[], Vec::as_slice)
    }

    /// Convert to Result
    ///
    /// # Errors
    /// Returns `self` when at least one field failed.
    pub fn result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Validation failed with {} error(s):", self.errors.len())?;
        for (field, messages) in &self.errors {
            for message in messages {
                write!(f, "\n  - {field}: {message}")?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// A single field rule
#[derive(Debug, Clone, PartialEq)]
pub enum Rule {
    /// Present and not null / blank
    Required,
    /// `null` is accepted and skips the remaining rules
    Nullable,
    String,
    Integer,
    Numeric,
    Boolean,
    Email,
    Uuid,
    /// Minimum string length, array length or numeric value
    Min(f64),
    /// Maximum string length, array length or numeric value
    Max(f64),
    /// Value must be one of the listed strings
    In(Vec<String>),
}

/// How absent fields are treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    /// Every rule runs; `Required` fails on absent fields (create)
    Full,
    /// Rules only run for fields present in the payload (update)
    Partial,
}

/// Ordered rule map, one entry per field
#[derive(Debug, Clone, Default)]
pub struct Rules {
    fields: Vec<(String, Vec<Rule>)>,
}

impl Rules {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn field(mut self, name: impl Into<String>, rules: impl IntoIterator<Item = Rule>) -> Self {
        self.fields.push((name.into(), rules.into_iter().collect()));
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Check a JSON object payload against the rules
    ///
    /// # Errors
    /// Returns every failing field with its messages.
    pub fn check(&self, payload: &Map<String, Value>, presence: Presence) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        for (field, rules) in &self.fields {
            let value = payload.get(field);
            if value.is_none() && presence == Presence::Partial {
                continue;
            }
            check_field(field, value, rules, &mut errors);
        }
        errors.result()
    }
}

fn check_field(field: &str, value: Option<&Value>, rules: &[Rule], errors: &mut ValidationErrors) {
    let label = field.replace('_', " ");
    let blank = match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(Value::Array(items)) => items.is_empty(),
        Some(_) => false,
    };

    if blank {
        if rules.contains(&Rule::Required) {
            errors.add(ValidationError::new(field, format!("The {label} field is required.")));
        }
        return;
    }
    let Some(value) = value else { return };

    for rule in rules {
        if let Some(message) = violation(rule, value, &label) {
            errors.add(ValidationError::new(field, message));
        }
    }
}

fn violation(rule: &Rule, value: &Value, label: &str) -> Option<String> {
    match rule {
        Rule::Required | Rule::Nullable => None,
        Rule::String => (!value.is_string()).then(|| format!("The {label} must be a string.")),
        Rule::Integer => {
            let ok = value.is_i64() || value.is_u64() || value.as_str().is_some_and(|s| s.parse::<i64>().is_ok());
            (!ok).then(|| format!("The {label} must be an integer."))
        }
        Rule::Numeric => numeric(value)
            .is_none()
            .then(|| format!("The {label} must be a number.")),
        Rule::Boolean => {
            let ok = value.is_boolean() || matches!(value.as_i64(), Some(0 | 1));
            (!ok).then(|| format!("The {label} field must be true or false."))
        }
        Rule::Email => {
            let ok = value.as_str().is_some_and(is_email);
            (!ok).then(|| format!("The {label} must be a valid email address."))
        }
        Rule::Uuid => {
            let ok = value.as_str().is_some_and(|s| uuid::Uuid::parse_str(s).is_ok());
            (!ok).then(|| format!("The {label} must be a valid UUID."))
        }
        Rule::Min(min) => match size(value) {
            Some((size, unit)) if size < *min => Some(format!("The {label} must be at least {min}{unit}.")),
            _ => None,
        },
        Rule::Max(max) => match size(value) {
            Some((size, unit)) if size > *max => {
                Some(format!("The {label} may not be greater than {max}{unit}."))
            }
            _ => None,
        },
        Rule::In(allowed) => {
            let found = match value {
                Value::String(s) => allowed.iter().any(|a| a == s),
                other => allowed.iter().any(|a| *a == other.to_string()),
            };
            (!found).then(|| format!("The selected {label} is invalid."))
        }
    }
}

fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Size used by `Min`/`Max`: characters for strings, items for arrays, value for numbers
#[allow(clippy::cast_precision_loss)]
fn size(value: &Value) -> Option<(f64, &'static str)> {
    match value {
        Value::String(s) => Some((s.chars().count() as f64, " characters")),
        Value::Array(items) => Some((items.len() as f64, " items")),
        Value::Number(n) => n.as_f64().map(|v| (v, "")),
        _ => None,
    }
}

fn is_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.') && value.len() <= 255
}
