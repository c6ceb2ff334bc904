//! Field registry capability and an in-memory implementation.

use crate::definition::{FieldDefinition, FieldKind, FieldParent};
use serde::Deserialize;
use serde_json::{Number, Value};
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::debug;

use koselig_core::{KoseligError, KoseligResult, StorageError};

/// Prefix every field key carries.
pub const FIELD_KEY_PREFIX: &str = "field_";

/// True if `id` is syntactically a field key: the prefix plus at least one
/// more character.
pub fn is_field_key(id: &str) -> bool {
    id.len() > FIELD_KEY_PREFIX.len() && id.starts_with(FIELD_KEY_PREFIX)
}

/// Flags for [`FieldRegistry::field_definition`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LookupOptions {
    /// Fall back to a definition inherited from a parent.
    pub inherit: bool,
    /// Populate nested sub-field keys on container types.
    pub load_sub_fields: bool,
}

/// External field registry.
pub trait FieldRegistry: Send + Sync {
    fn is_valid_field_key(&self, id: &str) -> bool {
        is_field_key(id)
    }

    /// Definition for `id`, as seen from `meta_key`.
    fn field_definition(
        &self,
        id: &str,
        meta_key: &str,
        options: LookupOptions,
    ) -> Option<FieldDefinition>;

    /// Turn a loaded value into its display form.
    fn format_value(&self, value: Value, owner_id: u64, field: &FieldDefinition) -> Value;
}

#[derive(Debug, Deserialize)]
struct GroupJson {
    key: String,
    #[serde(default)]
    fields: Vec<FieldJson>,
}

#[derive(Debug, Deserialize)]
struct FieldJson {
    key: String,
    name: String,
    #[serde(default)]
    label: Option<String>,
    #[serde(rename = "type")]
    type_tag: String,
    #[serde(flatten)]
    config: serde_json::Map<String, Value>,
}

/// Registry backed by a map of definitions.
#[derive(Debug, Default)]
pub struct InMemoryFieldRegistry {
    fields: RwLock<HashMap<String, FieldDefinition>>,
}

impl InMemoryFieldRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, field: FieldDefinition) -> KoseligResult<()> {
        self.fields.write()?.insert(field.key.clone(), field);
        Ok(())
    }

    /// Load an exported field group. Returns the number of definitions
    /// registered, sub-fields included.
    pub fn load_group_json(&self, json: &str) -> KoseligResult<usize> {
        let group: GroupJson = serde_json::from_str(json).map_err(|e| {
            KoseligError::from(StorageError::DecodeFailed {
                table: "field_group".to_string(),
                reason: e.to_string(),
            })
        })?;

        let mut loaded = Vec::new();
        for field in group.fields {
            flatten(field, FieldParent::Group(group.key.clone()), &mut loaded);
        }

        let count = loaded.len();
        let mut fields = self.fields.write()?;
        for def in loaded {
            fields.insert(def.key.clone(), def);
        }
        debug!(group = %group.key, count, "Loaded field group");
        Ok(count)
    }

    pub fn len(&self) -> usize {
        self.fields.read().map(|f| f.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn flatten(field: FieldJson, parent: FieldParent, out: &mut Vec<FieldDefinition>) {
    let config = Value::Object(field.config);
    let kind = FieldKind::from_config(&field.type_tag, &config);

    let subs: Vec<FieldJson> = config
        .get("sub_fields")
        .cloned()
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or_default();

    let mut def = FieldDefinition::new(field.key.clone(), field.name.clone(), parent, kind);
    if let Some(label) = field.label.filter(|l| !l.is_empty()) {
        def.label = label;
    }
    out.push(def);

    for sub in subs {
        flatten(sub, FieldParent::Field(field.key.clone()), out);
    }
}

impl FieldRegistry for InMemoryFieldRegistry {
    fn field_definition(
        &self,
        id: &str,
        _meta_key: &str,
        options: LookupOptions,
    ) -> Option<FieldDefinition> {
        let mut def = self.fields.read().ok()?.get(id).cloned()?;
        if !options.load_sub_fields {
            if let FieldKind::Repeater { sub_fields } = &mut def.kind {
                sub_fields.clear();
            }
        }
        Some(def)
    }

    fn format_value(&self, value: Value, _owner_id: u64, field: &FieldDefinition) -> Value {
        match &field.kind {
            FieldKind::Number { .. } => to_number(&value),
            FieldKind::TrueFalse => Value::Bool(to_bool(&value)),
            FieldKind::Select { multiple: true, .. } => match value {
                Value::Array(_) => value,
                Value::Null => Value::Array(Vec::new()),
                other => Value::Array(vec![other]),
            },
            FieldKind::Repeater { .. } => match to_number(&value) {
                Value::Number(n) => n
                    .as_f64()
                    .map(|rows| Value::from(rows.max(0.0) as u64))
                    .unwrap_or(Value::from(0u64)),
                _ => Value::from(0u64),
            },
            _ => value,
        }
    }
}

fn to_number(value: &Value) -> Value {
    match value {
        Value::Number(_) => value.clone(),
        Value::String(s) => {
            let s = s.trim();
            if let Ok(i) = s.parse::<i64>() {
                Value::from(i)
            } else {
                s.parse::<f64>()
                    .ok()
                    .and_then(Number::from_f64)
                    .map(Value::Number)
                    .unwrap_or(Value::Null)
            }
        }
        Value::Bool(b) => Value::from(u8::from(*b)),
        _ => Value::Null,
    }
}

fn to_bool(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|n| n != 0.0).unwrap_or(false),
        Value::String(s) => !s.is_empty() && s != "0",
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
        Value::Null => false,
    }
}
