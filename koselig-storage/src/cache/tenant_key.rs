//! Install- and site-scoped cache key for the meta memo cache.
//!
//! `MetaCacheKey` can only be built through [`MetaCacheKey::new`], which
//! demands the install's base prefix and a site id, so an entry cached for
//! one site (or one install sharing the cache) can never be looked up on
//! behalf of another.

use koselig_core::{MetaKind, SiteId};
use std::fmt;

/// A cache key scoped to the install and site owning the meta table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MetaCacheKey {
    /// Private inner data - cannot be constructed externally
    inner: KeyInner,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct KeyInner {
    base_prefix: String,
    site_id: SiteId,
    kind: MetaKind,
    owner_id: u64,
}

impl MetaCacheKey {
    pub fn new(base_prefix: impl Into<String>, site_id: SiteId, kind: MetaKind, owner_id: u64) -> Self {
        Self {
            inner: KeyInner {
                base_prefix: base_prefix.into(),
                site_id,
                kind,
                owner_id,
            },
        }
    }

    /// Base table prefix of the install, e.g. `wp_`.
    pub fn base_prefix(&self) -> &str {
        &self.inner.base_prefix
    }

    pub fn site_id(&self) -> SiteId {
        self.inner.site_id
    }

    pub fn kind(&self) -> MetaKind {
        self.inner.kind
    }

    pub fn owner_id(&self) -> u64 {
        self.inner.owner_id
    }
}

impl fmt::Display for MetaCacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.inner.kind {
            MetaKind::Post => "post",
            MetaKind::User => "user",
        };
        write!(
            f,
            "{}|{}:{}:{}",
            self.inner.base_prefix, self.inner.site_id, kind, self.inner.owner_id
        )
    }
}
