//! Typed field resolution over memoised meta records.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use koselig_core::{FieldError, KoseligResult};
use koselig_storage::{KeySelection, MetaCache, MetaFetcher, MetaMap, MetaOwner};

use crate::definition::FieldDefinition;
use crate::hooks::{HookContext, HookPoint, TransformPipeline};
use crate::registry::{FieldRegistry, LookupOptions};
use crate::serialized::{is_serialized, unserialize};

/// Prefix of the meta key holding a value's field key.
pub const REFERENCE_PREFIX: &str = "_";

/// Meta key under which the field key for `meta_key` is stored.
pub fn reference_key(meta_key: &str) -> String {
    format!("{REFERENCE_PREFIX}{meta_key}")
}

/// Resolved fields, shaped like the [`KeySelection`] that asked for them.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedFields {
    /// `None` when the key has no valid field behind it.
    One(Option<Value>),
    /// Only keys that resolved to a field are present, in storage order.
    Many(MetaMap<Value>),
}

impl ResolvedFields {
    pub fn into_one(self) -> Option<Value> {
        match self {
            ResolvedFields::One(value) => value,
            ResolvedFields::Many(_) => None,
        }
    }

    pub fn into_map(self) -> MetaMap<Value> {
        match self {
            ResolvedFields::One(_) => MetaMap::new(),
            ResolvedFields::Many(map) => map,
        }
    }
}

/// Resolves raw meta values into field values.
///
/// Each candidate key `k` is only emitted if `_k` holds a valid field key
/// the registry knows. The value is decoded if it is a serialized blob, run
/// through the load pipeline and optionally formatted.
#[derive(Clone)]
pub struct FieldResolver {
    registry: Option<Arc<dyn FieldRegistry>>,
    pipeline: Arc<dyn TransformPipeline>,
}

impl std::fmt::Debug for FieldResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldResolver")
            .field("registry", &self.registry.is_some())
            .finish_non_exhaustive()
    }
}

impl FieldResolver {
    pub fn new(registry: Arc<dyn FieldRegistry>, pipeline: Arc<dyn TransformPipeline>) -> Self {
        Self {
            registry: Some(registry),
            pipeline,
        }
    }

    /// A resolver with no field registry installed. Every resolution fails
    /// with [`FieldError::MissingCapability`].
    pub fn unavailable(pipeline: Arc<dyn TransformPipeline>) -> Self {
        Self {
            registry: None,
            pipeline,
        }
    }

    pub fn is_available(&self) -> bool {
        self.registry.is_some()
    }

    /// Resolve the fields named by `selection` for `owner`.
    pub fn resolve<F>(
        &self,
        cache: &MetaCache,
        owner: &MetaOwner,
        fetcher: &F,
        selection: &KeySelection,
        format: bool,
    ) -> KoseligResult<ResolvedFields>
    where
        F: MetaFetcher + ?Sized,
    {
        let registry = self
            .registry
            .as_deref()
            .ok_or_else(|| FieldError::MissingCapability {
                capability: "field registry".to_string(),
            })?;

        let run = Resolution {
            registry,
            pipeline: self.pipeline.as_ref(),
            cache,
            owner,
            selection,
            format,
        };

        match selection {
            KeySelection::One(key) => {
                let raw = cache.get_one(owner, fetcher, key)?;
                Ok(ResolvedFields::One(run.field(fetcher, key, raw)?))
            }
            KeySelection::Many(_) | KeySelection::All => {
                let raw = cache.lookup(owner, fetcher, selection)?.into_map();
                let mut out = MetaMap::new();
                for (key, value) in raw {
                    if let Some(resolved) = run.field(fetcher, &key, Some(value))? {
                        out.insert(key, resolved);
                    }
                }
                Ok(ResolvedFields::Many(out))
            }
        }
    }
}

struct Resolution<'a> {
    registry: &'a dyn FieldRegistry,
    pipeline: &'a dyn TransformPipeline,
    cache: &'a MetaCache,
    owner: &'a MetaOwner,
    selection: &'a KeySelection,
    format: bool,
}

impl Resolution<'_> {
    fn field<F>(&self, fetcher: &F, key: &str, raw: Option<String>) -> KoseligResult<Option<Value>>
    where
        F: MetaFetcher + ?Sized,
    {
        let owner_id = self.owner.owner_id();

        let Some(field_key) = self.cache.get_one(self.owner, fetcher, &reference_key(key))? else {
            debug!(owner_id, key, "no field reference, dropping");
            return Ok(None);
        };
        if !self.registry.is_valid_field_key(&field_key) {
            debug!(owner_id, key, field_key = %field_key, "invalid field reference, dropping");
            return Ok(None);
        }

        let value = raw.map(decode).unwrap_or(Value::Null);

        let Some(field) = self
            .registry
            .field_definition(&field_key, key, LookupOptions::default())
        else {
            warn!(owner_id, key, field_key = %field_key, "field definition not found, dropping");
            return Ok(None);
        };

        if field.is_sub_field() && !self.selection.names(key) {
            debug!(owner_id, key, "sub-field not requested, dropping");
            return Ok(None);
        }

        Ok(Some(self.load(value, key, &field)))
    }

    fn load(&self, value: Value, key: &str, field: &FieldDefinition) -> Value {
        let owner_id = self.owner.owner_id();
        let ctx = HookContext {
            owner_id,
            meta_key: key,
            field,
        };
        let value = HookPoint::load_chain(field)
            .iter()
            .fold(value, |value, point| self.pipeline.apply(point, value, &ctx));

        if self.format {
            self.registry.format_value(value, owner_id, field)
        } else {
            value
        }
    }
}

/// Decode a raw meta value. Plain strings pass through; a blob that fails
/// to decode becomes `false`, the value PHP's `unserialize` yields.
fn decode(raw: String) -> Value {
    if !is_serialized(&raw) {
        return Value::String(raw);
    }
    match unserialize(&raw) {
        Ok(value) => value,
        Err(err) => {
            debug!(error = %err, "malformed serialized value decoded as false");
            Value::Bool(false)
        }
    }
}
