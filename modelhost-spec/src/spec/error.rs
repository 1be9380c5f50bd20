//! Spec validation errors.

use crate::time::TimeError;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Per-field validation messages, nested the same way the spec document is.
///
/// Serializes to JSON such as
/// `{"timeSeries": {"ts1": {"granularity": ["granularity must be specified for aggregates"]}}}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, FieldError>);

/// Either the messages for a leaf field or the errors of a nested document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldError {
    Messages(Vec<String>),
    Nested(FieldErrors),
}

/// Key under which messages land when a field already holds nested errors.
const SCHEMA_KEY: &str = "_schema";

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Record a message against a field.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        let message = message.into();
        match self
            .0
            .entry(field.into())
            .or_insert_with(|| FieldError::Messages(Vec::new()))
        {
            FieldError::Messages(messages) => messages.push(message),
            FieldError::Nested(nested) => nested.add(SCHEMA_KEY, message),
        }
    }

    /// Record the errors of a nested document under `field`. Empty sets are ignored.
    pub fn nest(&mut self, field: impl Into<String>, errors: FieldErrors) {
        if errors.is_empty() {
            return;
        }
        let field = field.into();
        match self.0.remove(&field) {
            None => {
                self.0.insert(field, FieldError::Nested(errors));
            }
            Some(FieldError::Nested(mut existing)) => {
                existing.merge(errors);
                self.0.insert(field, FieldError::Nested(existing));
            }
            Some(FieldError::Messages(messages)) => {
                let mut nested = errors;
                for message in messages {
                    nested.add(SCHEMA_KEY, message);
                }
                self.0.insert(field, FieldError::Nested(nested));
            }
        }
    }

    /// Fold another error set into this one.
    pub fn merge(&mut self, other: FieldErrors) {
        for (field, error) in other.0 {
            match error {
                FieldError::Messages(messages) => {
                    for message in messages {
                        self.add(field.clone(), message);
                    }
                }
                FieldError::Nested(nested) => self.nest(field, nested),
            }
        }
    }

    /// Messages recorded directly against `field`.
    pub fn messages(&self, field: &str) -> Option<&[String]> {
        match self.0.get(field)? {
            FieldError::Messages(messages) => Some(messages),
            FieldError::Nested(_) => None,
        }
    }

    /// Errors of the nested document under `field`.
    pub fn nested(&self, field: &str) -> Option<&FieldErrors> {
        match self.0.get(field)? {
            FieldError::Nested(nested) => Some(nested),
            FieldError::Messages(_) => None,
        }
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(|k| k.as_str())
    }

    /// `Ok(value)` when no errors were recorded.
    pub fn into_result<T>(self, value: T) -> Result<T, FieldErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = serde_json::to_string_pretty(self).map_err(|_| fmt::Error)?;
        f.write_str(&rendered)
    }
}

/// Raised when a spec is malformed or violates its invariants.
#[derive(Debug, Error)]
pub enum SpecError {
    #[error("malformed spec: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("invalid spec: {0}")]
    Invalid(FieldErrors),

    #[error(transparent)]
    Time(#[from] TimeError),
}

impl SpecError {
    /// Field errors when the failure was a validation failure.
    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            SpecError::Invalid(errors) => Some(errors),
            _ => None,
        }
    }
}

impl From<FieldErrors> for SpecError {
    fn from(errors: FieldErrors) -> Self {
        SpecError::Invalid(errors)
    }
}
