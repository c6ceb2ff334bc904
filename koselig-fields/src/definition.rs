//! Field definitions.
//!
//! A definition describes how the raw meta value stored under a key should
//! be interpreted. Known field types carry their own typed configuration;
//! anything else is kept as an [`FieldKind::Extension`] with its raw config.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// What a field hangs off: a field group, or another field (a sub-field).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldParent {
    Group(String),
    Field(String),
}

/// Field type with its type-specific configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldKind {
    Text,
    Textarea,
    Email,
    Url,
    Number {
        min: Option<f64>,
        max: Option<f64>,
        step: Option<f64>,
    },
    TrueFalse,
    Select {
        choices: BTreeMap<String, String>,
        multiple: bool,
    },
    Repeater {
        /// Keys of the nested field definitions. Empty unless sub-fields
        /// were requested when the definition was loaded.
        sub_fields: Vec<String>,
    },
    /// A type this crate has no typed model for.
    Extension { type_tag: String, config: Value },
}

impl FieldKind {
    /// The type tag as stored in field configuration, e.g. `true_false`.
    pub fn type_tag(&self) -> &str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Textarea => "textarea",
            FieldKind::Email => "email",
            FieldKind::Url => "url",
            FieldKind::Number { .. } => "number",
            FieldKind::TrueFalse => "true_false",
            FieldKind::Select { .. } => "select",
            FieldKind::Repeater { .. } => "repeater",
            FieldKind::Extension { type_tag, .. } => type_tag,
        }
    }

    /// Build a kind from a type tag and the field's raw JSON configuration.
    pub fn from_config(type_tag: &str, config: &Value) -> Self {
        match type_tag {
            "text" => FieldKind::Text,
            "textarea" => FieldKind::Textarea,
            "email" => FieldKind::Email,
            "url" => FieldKind::Url,
            "number" => FieldKind::Number {
                min: number_setting(config, "min"),
                max: number_setting(config, "max"),
                step: number_setting(config, "step"),
            },
            "true_false" => FieldKind::TrueFalse,
            "select" => FieldKind::Select {
                choices: config
                    .get("choices")
                    .and_then(Value::as_object)
                    .map(|choices| {
                        choices
                            .iter()
                            .map(|(k, v)| (k.clone(), v.as_str().unwrap_or(k.as_str()).to_string()))
                            .collect()
                    })
                    .unwrap_or_default(),
                multiple: truthy(config.get("multiple")),
            },
            "repeater" => FieldKind::Repeater {
                sub_fields: config
                    .get("sub_fields")
                    .and_then(Value::as_array)
                    .map(|subs| {
                        subs.iter()
                            .filter_map(|s| s.get("key").and_then(Value::as_str))
                            .map(str::to_string)
                            .collect()
                    })
                    .unwrap_or_default(),
            },
            other => FieldKind::Extension {
                type_tag: other.to_string(),
                config: config.clone(),
            },
        }
    }
}

/// Numeric settings arrive as numbers or as (possibly empty) strings.
fn number_setting(config: &Value, name: &str) -> Option<f64> {
    match config.get(name)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn truthy(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map(|n| n != 0.0).unwrap_or(false),
        Some(Value::String(s)) => !s.is_empty() && s != "0",
        _ => false,
    }
}

/// A resolved field definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    /// Unique key, `field_...`.
    pub key: String,
    /// Internal name, usually the meta key the value is stored under.
    pub name: String,
    pub label: String,
    pub parent: FieldParent,
    pub kind: FieldKind,
}

impl FieldDefinition {
    pub fn new(
        key: impl Into<String>,
        name: impl Into<String>,
        parent: FieldParent,
        kind: FieldKind,
    ) -> Self {
        let name = name.into();
        Self {
            key: key.into(),
            label: name.clone(),
            name,
            parent,
            kind,
        }
    }

    pub fn type_tag(&self) -> &str {
        self.kind.type_tag()
    }

    /// Sub-fields are only returned when asked for by name.
    pub fn is_sub_field(&self) -> bool {
        matches!(self.parent, FieldParent::Field(_))
    }
}
