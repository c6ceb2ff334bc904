//! Custom-field resolution.
//!
//! Raw meta values become field values by way of a [`FieldRegistry`] that
//! knows field definitions and a [`TransformPipeline`] that transforms
//! loaded values. [`FieldResolver`] ties both to a
//! [`koselig_storage::MetaCache`].

pub mod definition;
pub mod hooks;
pub mod registry;
pub mod resolver;
pub mod serialized;

pub use definition::{FieldDefinition, FieldKind, FieldParent};
pub use hooks::{HookContext, HookPoint, HookRegistry, Transform, TransformPipeline};
pub use registry::{is_field_key, FieldRegistry, InMemoryFieldRegistry, LookupOptions, FIELD_KEY_PREFIX};
pub use resolver::{reference_key, FieldResolver, ResolvedFields, REFERENCE_PREFIX};
pub use serialized::{is_serialized, unserialize, SerializedError, MAX_DEPTH};
