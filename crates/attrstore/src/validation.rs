//! Enum membership validation.
//!
//! Behaves like a plain inclusion check, except that the error message lists
//! every permitted value:
//!
//! ```text
//! Status bogus is not one of (null), placed, confirmed
//! ```
//!
//! Failures are accumulated into an [`Errors`] collection on the record; the
//! record itself stays fully usable while invalid.

use std::sync::Arc;

use crate::config::AttrstoreConfig;
use crate::value::AttrValue;

#[derive(Debug, Clone, PartialEq)]
pub struct InclusionValidator {
    attribute: String,
    options: Arc<[AttrValue]>,
}

impl InclusionValidator {
    pub fn new(attribute: impl Into<String>, options: Arc<[AttrValue]>) -> Self {
        Self {
            attribute: attribute.into(),
            options,
        }
    }

    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    pub fn options(&self) -> &[AttrValue] {
        &self.options
    }

    pub fn includes(&self, value: &AttrValue) -> bool {
        self.options.contains(value)
    }

    /// Options joined for display, with null rendered as a placeholder.
    pub fn humanised_options(&self, config: &AttrstoreConfig) -> String {
        self.options
            .iter()
            .map(|option| match option {
                AttrValue::Null => config.null_placeholder.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(&config.options_separator)
    }

    pub fn validate(&self, value: &AttrValue, config: &AttrstoreConfig) -> Option<ValidationError> {
        if self.includes(value) {
            return None;
        }
        Some(ValidationError {
            attribute: self.attribute.clone(),
            message: format!("{} is not one of {}", value, self.humanised_options(config)),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub attribute: String,
    pub message: String,
}

impl ValidationError {
    /// Message prefixed with the humanised attribute name.
    pub fn full_message(&self) -> String {
        format!("{} {}", humanize(&self.attribute), self.message)
    }
}

/// Per-record error accumulator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Errors {
    entries: Vec<ValidationError>,
}

impl Errors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, error: ValidationError) {
        self.entries.push(error);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.entries.iter()
    }

    /// Messages recorded against one attribute.
    pub fn on(&self, attribute: &str) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| e.attribute == attribute)
            .map(|e| e.message.as_str())
            .collect()
    }

    pub fn full_messages(&self) -> Vec<String> {
        self.entries.iter().map(ValidationError::full_message).collect()
    }
}

impl Extend<ValidationError> for Errors {
    fn extend<I: IntoIterator<Item = ValidationError>>(&mut self, iter: I) {
        self.entries.extend(iter);
    }
}

/// `booly_default` → `Booly default`
pub fn humanize(attribute: &str) -> String {
    let base = attribute.strip_suffix("_id").unwrap_or(attribute);
    let spaced = base.replace('_', " ");
    let mut chars = spaced.trim().chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
