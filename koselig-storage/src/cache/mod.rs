//! Cache tiers.
//!
//! Two independent caches sit between the models and storage:
//!
//! - [`MetaCache`] memoises the complete meta record set per owner for one
//!   unit of work. It is an explicit object handed to every accessor, never
//!   process-wide state, and it is keyed by [`MetaCacheKey`] so two sites,
//!   or two installs sharing one cache, can never share an entry.
//! - [`RememberCache`] wraps a query layer and remembers whole query results
//!   for a configured duration, keyed by query shape.
//!
//! Neither tier invalidates individual entries: a meta entry is refreshed
//! only by dropping the whole [`MetaCache`], a remembered query only by
//! expiry.

pub mod meta_cache;
pub mod remember;
pub mod tenant_key;
pub mod traits;

pub use meta_cache::MetaCache;
pub use remember::RememberCache;
pub use tenant_key::MetaCacheKey;
pub use traits::CacheStats;
