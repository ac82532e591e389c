//! Configuration binding.
//!
//! Reads externally supplied textual configuration — attributes on the host
//! element — into typed fields. Coercion rules:
//!
//! - `text`: passed through unchanged.
//! - `number`: parsed as f64; a malformed value is a [`ConfigError`] that is
//!   reported and replaced by the declared default, never a fault.
//! - `flag`: keyed by attribute presence; any present value reads as `true`,
//!   absence falls back to the declared default.
//!
//! Fields are read once at attach time. A field declared `live` is re-read
//! whenever the runtime is told its attribute changed while attached; nothing
//! else about the instance (in particular its subscriptions) moves.

use markup5ever_rcdom::Handle;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::warn;

use crate::dom;

// ═══════════════════════════════════════════════════════════════════════════════
// ERROR CODES
// ═══════════════════════════════════════════════════════════════════════════════

pub const CFG_BAD_NUMBER: &str = "ENH-CFG-001";
pub const CFG_NON_FINITE: &str = "ENH-CFG-002";

// ═══════════════════════════════════════════════════════════════════════════════
// FIELD DECLARATIONS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldType {
    Text,
    Number,
    Flag,
}

/// A typed configuration value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldValue {
    Text(String),
    Number(f64),
    Flag(bool),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(value) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_flag(&self) -> Option<bool> {
        match self {
            FieldValue::Flag(value) => Some(*value),
            _ => None,
        }
    }
}

/// Declaration of one configuration field: name, type, default, and whether
/// the field tracks attribute changes while attached.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDecl {
    pub name: String,
    pub field_type: FieldType,
    pub default: FieldValue,
    pub live: bool,
}

impl FieldDecl {
    pub fn text(name: impl Into<String>, default: impl Into<String>) -> Self {
        FieldDecl {
            name: name.into(),
            field_type: FieldType::Text,
            default: FieldValue::Text(default.into()),
            live: false,
        }
    }

    pub fn number(name: impl Into<String>, default: f64) -> Self {
        FieldDecl {
            name: name.into(),
            field_type: FieldType::Number,
            default: FieldValue::Number(default),
            live: false,
        }
    }

    pub fn flag(name: impl Into<String>, default: bool) -> Self {
        FieldDecl {
            name: name.into(),
            field_type: FieldType::Flag,
            default: FieldValue::Flag(default),
            live: false,
        }
    }

    /// Mark the field for re-reading on attribute-change notifications.
    pub fn live(mut self) -> Self {
        self.live = true;
        self
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CONFIG ERROR
// ═══════════════════════════════════════════════════════════════════════════════

/// Malformed external configuration. Recovered by falling back to the declared
/// default; surfaced as a report, never as a failure of the bind.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigError {
    pub code: String,
    pub field: String,
    pub raw: String,
    pub message: String,
}

impl ConfigError {
    fn new(code: &str, field: &str, raw: &str, message: impl Into<String>) -> Self {
        ConfigError {
            code: code.to_string(),
            field: field.to_string(),
            raw: raw.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] field '{}': {} (raw value: {:?})",
            self.code, self.field, self.message, self.raw
        )
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// BINDING
// ═══════════════════════════════════════════════════════════════════════════════

/// The result of binding declared fields against a host element.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundConfig {
    pub values: HashMap<String, FieldValue>,
    pub errors: Vec<ConfigError>,
}

impl BoundConfig {
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.values.get(name)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.values.get(name).and_then(FieldValue::as_text)
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        self.values.get(name).and_then(FieldValue::as_number)
    }

    pub fn flag(&self, name: &str) -> Option<bool> {
        self.values.get(name).and_then(FieldValue::as_flag)
    }
}

/// Coerce one raw attribute value per the declared type.
fn coerce(decl: &FieldDecl, raw: Option<String>) -> (FieldValue, Option<ConfigError>) {
    match decl.field_type {
        FieldType::Text => match raw {
            Some(value) => (FieldValue::Text(value), None),
            None => (decl.default.clone(), None),
        },
        FieldType::Flag => match raw {
            // Presence is the signal; the attribute text is irrelevant.
            Some(_) => (FieldValue::Flag(true), None),
            None => (decl.default.clone(), None),
        },
        FieldType::Number => match raw {
            Some(value) => match value.trim().parse::<f64>() {
                Ok(parsed) if parsed.is_finite() => (FieldValue::Number(parsed), None),
                Ok(_) => (
                    decl.default.clone(),
                    Some(ConfigError::new(
                        CFG_NON_FINITE,
                        &decl.name,
                        &value,
                        "number must be finite",
                    )),
                ),
                Err(_) => (
                    decl.default.clone(),
                    Some(ConfigError::new(
                        CFG_BAD_NUMBER,
                        &decl.name,
                        &value,
                        "not a number",
                    )),
                ),
            },
            None => (decl.default.clone(), None),
        },
    }
}

/// Read every declared field from the host element's attributes.
///
/// Coercion failures land in `errors` and the field gets its default; the
/// bind itself always succeeds.
pub fn bind(host: &Handle, decls: &[FieldDecl]) -> BoundConfig {
    let mut bound = BoundConfig::default();
    for decl in decls {
        let raw = dom::get_attribute(host, &decl.name);
        let (value, error) = coerce(decl, raw);
        if let Some(error) = error {
            warn!(field = %error.field, code = %error.code, "config fallback: {}", error);
            bound.errors.push(error);
        }
        bound.values.insert(decl.name.clone(), value);
    }
    bound
}

/// Re-read fields declared `live` against the host's current attributes.
///
/// Returns the names of fields whose value actually changed. Non-live fields
/// are left exactly as bound at attach time. The error report holds at most
/// one entry per field: a re-read replaces the field's previous report, so
/// redundant notifications cannot grow it and a recovered field stops
/// reporting.
pub fn refresh(host: &Handle, decls: &[FieldDecl], bound: &mut BoundConfig) -> Vec<String> {
    let mut changed = Vec::new();
    for decl in decls.iter().filter(|d| d.live) {
        let raw = dom::get_attribute(host, &decl.name);
        let (value, error) = coerce(decl, raw);
        bound.errors.retain(|e| e.field != decl.name);
        if let Some(error) = error {
            warn!(field = %error.field, code = %error.code, "config fallback: {}", error);
            bound.errors.push(error);
        }
        if bound.values.get(&decl.name) != Some(&value) {
            bound.values.insert(decl.name.clone(), value);
            changed.push(decl.name.clone());
        }
    }
    changed
}
