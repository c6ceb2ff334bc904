//! Load-value transform pipeline.
//!
//! Transforms are registered against a typed [`HookPoint`]. Resolution runs
//! the four load points from most general to most specific, each stage
//! receiving the previous stage's output.

use crate::definition::FieldDefinition;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Where a transform is attached.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HookPoint {
    /// Every field.
    LoadValue,
    /// Fields of one type tag, e.g. `number`.
    LoadValueForType(String),
    /// Fields with one internal name.
    LoadValueForName(String),
    /// One field key.
    LoadValueForKey(String),
}

impl HookPoint {
    /// The four load points for `field`, in the order they run.
    pub fn load_chain(field: &FieldDefinition) -> [HookPoint; 4] {
        [
            HookPoint::LoadValue,
            HookPoint::LoadValueForType(field.type_tag().to_string()),
            HookPoint::LoadValueForName(field.name.clone()),
            HookPoint::LoadValueForKey(field.key.clone()),
        ]
    }
}

impl fmt::Display for HookPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookPoint::LoadValue => write!(f, "load_value"),
            HookPoint::LoadValueForType(t) => write!(f, "load_value[type={t}]"),
            HookPoint::LoadValueForName(n) => write!(f, "load_value[name={n}]"),
            HookPoint::LoadValueForKey(k) => write!(f, "load_value[key={k}]"),
        }
    }
}

/// What a transform sees besides the value.
#[derive(Debug, Clone, Copy)]
pub struct HookContext<'a> {
    pub owner_id: u64,
    pub meta_key: &'a str,
    pub field: &'a FieldDefinition,
}

pub type Transform = Arc<dyn Fn(Value, &HookContext<'_>) -> Value + Send + Sync>;

/// External transform capability.
pub trait TransformPipeline: Send + Sync {
    /// Run every transform attached to `point`. Must return `value`
    /// untouched when nothing is attached.
    fn apply(&self, point: &HookPoint, value: Value, ctx: &HookContext<'_>) -> Value;
}

struct Registered {
    name: String,
    priority: i32,
    seq: u64,
    transform: Transform,
}

/// In-process [`TransformPipeline`].
#[derive(Default)]
pub struct HookRegistry {
    hooks: HashMap<HookPoint, Vec<Registered>>,
    next_seq: u64,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `transform` at `point`. Lower priorities run first; equal
    /// priorities run in registration order.
    pub fn add<F>(&mut self, point: HookPoint, name: impl Into<String>, priority: i32, transform: F)
    where
        F: Fn(Value, &HookContext<'_>) -> Value + Send + Sync + 'static,
    {
        let seq = self.next_seq;
        self.next_seq += 1;
        let list = self.hooks.entry(point).or_default();
        list.push(Registered {
            name: name.into(),
            priority,
            seq,
            transform: Arc::new(transform),
        });
        list.sort_by_key(|r| (r.priority, r.seq));
    }

    /// Remove every transform called `name` at `point`. Returns how many
    /// were removed.
    pub fn remove(&mut self, point: &HookPoint, name: &str) -> usize {
        let Some(list) = self.hooks.get_mut(point) else {
            return 0;
        };
        let before = list.len();
        list.retain(|r| r.name != name);
        let removed = before - list.len();
        if list.is_empty() {
            self.hooks.remove(point);
        }
        removed
    }

    /// Number of transforms attached at `point`.
    pub fn count(&self, point: &HookPoint) -> usize {
        self.hooks.get(point).map(Vec::len).unwrap_or(0)
    }
}

impl TransformPipeline for HookRegistry {
    fn apply(&self, point: &HookPoint, value: Value, ctx: &HookContext<'_>) -> Value {
        match self.hooks.get(point) {
            Some(list) => list
                .iter()
                .fold(value, |value, r| (r.transform)(value, ctx)),
            None => value,
        }
    }
}

impl fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (point, list) in &self.hooks {
            let names: Vec<&str> = list.iter().map(|r| r.name.as_str()).collect();
            map.entry(&point.to_string(), &names);
        }
        map.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{FieldKind, FieldParent};
    use serde_json::json;

    fn price_field() -> FieldDefinition {
        FieldDefinition::new(
            "field_123",
            "price",
            FieldParent::Group("group_1".into()),
            FieldKind::Number {
                min: None,
                max: None,
                step: None,
            },
        )
    }

    fn append(tag: &'static str) -> impl Fn(Value, &HookContext<'_>) -> Value + Send + Sync {
        move |value, _| {
            let mut s = value.as_str().unwrap_or_default().to_string();
            s.push_str(tag);
            Value::String(s)
        }
    }

    #[test]
    fn test_load_chain_order() {
        let chain = HookPoint::load_chain(&price_field());
        assert_eq!(chain[0], HookPoint::LoadValue);
        assert_eq!(chain[1], HookPoint::LoadValueForType("number".into()));
        assert_eq!(chain[2], HookPoint::LoadValueForName("price".into()));
        assert_eq!(chain[3], HookPoint::LoadValueForKey("field_123".into()));
    }

    #[test]
    fn test_empty_point_passes_through() {
        let field = price_field();
        let ctx = HookContext {
            owner_id: 1,
            meta_key: "price",
            field: &field,
        };
        let hooks = HookRegistry::new();
        assert_eq!(hooks.apply(&HookPoint::LoadValue, json!("x"), &ctx), json!("x"));
    }

    #[test]
    fn test_priority_then_registration_order() {
        let field = price_field();
        let ctx = HookContext {
            owner_id: 1,
            meta_key: "price",
            field: &field,
        };
        let mut hooks = HookRegistry::new();
        hooks.add(HookPoint::LoadValue, "b", 10, append("b"));
        hooks.add(HookPoint::LoadValue, "c", 10, append("c"));
        hooks.add(HookPoint::LoadValue, "a", 5, append("a"));

        assert_eq!(hooks.apply(&HookPoint::LoadValue, json!(""), &ctx), json!("abc"));
    }

    #[test]
    fn test_context_is_passed() {
        let field = price_field();
        let ctx = HookContext {
            owner_id: 42,
            meta_key: "price",
            field: &field,
        };
        let mut hooks = HookRegistry::new();
        hooks.add(HookPoint::LoadValue, "owner", 10, |_, ctx| json!(ctx.owner_id));
        assert_eq!(hooks.apply(&HookPoint::LoadValue, Value::Null, &ctx), json!(42));
    }

    #[test]
    fn test_remove() {
        let mut hooks = HookRegistry::new();
        let point = HookPoint::LoadValueForKey("field_123".into());
        hooks.add(point.clone(), "x", 10, append("x"));
        hooks.add(point.clone(), "x", 20, append("x"));
        hooks.add(point.clone(), "y", 10, append("y"));

        assert_eq!(hooks.remove(&point, "x"), 2);
        assert_eq!(hooks.count(&point), 1);
        assert_eq!(hooks.remove(&point, "missing"), 0);
        assert_eq!(hooks.remove(&HookPoint::LoadValue, "x"), 0);
    }

    #[test]
    fn test_debug_lists_names() {
        let mut hooks = HookRegistry::new();
        hooks.add(HookPoint::LoadValue, "trim", 10, append(""));
        let rendered = format!("{hooks:?}");
        assert!(rendered.contains("load_value"));
        assert!(rendered.contains("trim"));
    }
}
