//! Site-aware table routing.
//!
//! In a multisite network every site except the primary one owns its own
//! copy of the per-site tables, named `<base><site id>_<table>`. A model
//! resolves its [`TenantContext`] once, at construction, from an explicit
//! site id and keeps it for its whole lifetime.

use koselig_core::{KoseligConfig, SiteId, Table};

/// Separator placed between the site id and the table name.
pub const SITE_SEPARATOR: &str = "_";

/// Table prefixes for one site.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorageNamespace {
    base: String,
    prefix: String,
    site_id: SiteId,
}

impl StorageNamespace {
    /// Namespace of the primary site: per-site tables use the base prefix.
    pub fn base(base: impl Into<String>) -> Self {
        let base = base.into();
        Self {
            prefix: base.clone(),
            base,
            site_id: SiteId::PRIMARY,
        }
    }

    /// Prefix applied to per-site tables.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Prefix applied to network-wide tables.
    pub fn base_prefix(&self) -> &str {
        &self.base
    }

    /// Site whose physical tables this namespace addresses.
    ///
    /// Sites that share the base namespace all report [`SiteId::PRIMARY`].
    pub fn site_id(&self) -> SiteId {
        self.site_id
    }

    /// Site owning the physical copy of `table`.
    pub fn site_for(&self, table: Table) -> SiteId {
        if table.is_global() {
            SiteId::PRIMARY
        } else {
            self.site_id
        }
    }

    /// Whether per-site tables are routed away from the base namespace.
    pub fn is_routed(&self) -> bool {
        self.prefix != self.base
    }

    /// Fully qualified name of `table`.
    pub fn table(&self, table: Table) -> String {
        if table.is_global() {
            format!("{}{}", self.base, table.base_name())
        } else {
            format!("{}{}", self.prefix, table.base_name())
        }
    }
}

/// A requested site together with the namespace it resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantContext {
    site_id: SiteId,
    namespace: StorageNamespace,
}

impl TenantContext {
    /// The site that was asked for.
    pub fn site_id(&self) -> SiteId {
        self.site_id
    }

    pub fn namespace(&self) -> &StorageNamespace {
        &self.namespace
    }

    pub fn table(&self, table: Table) -> String {
        self.namespace.table(table)
    }
}

/// Computes the namespace a site's records live in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantRouter {
    base: String,
    multisite: bool,
}

impl TenantRouter {
    pub fn new(base: impl Into<String>, multisite: bool) -> Self {
        Self {
            base: base.into(),
            multisite,
        }
    }

    pub fn from_config(config: &KoseligConfig) -> Self {
        Self::new(config.table_prefix.clone(), config.multisite)
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn is_multisite(&self) -> bool {
        self.multisite
    }

    /// Resolve the namespace for `site_id`.
    ///
    /// Sites 0 and 1, and every site of a single-site install, map to the
    /// base namespace. Anything else maps to `base + site_id + "_"`.
    pub fn resolve_namespace(&self, site_id: SiteId) -> StorageNamespace {
        if !self.multisite || site_id.is_primary() {
            return StorageNamespace::base(self.base.clone());
        }

        StorageNamespace {
            base: self.base.clone(),
            prefix: format!("{}{}{}", self.base, site_id, SITE_SEPARATOR),
            site_id,
        }
    }

    /// Resolve a full tenant context for `site_id`.
    pub fn resolve(&self, site_id: SiteId) -> TenantContext {
        TenantContext {
            site_id,
            namespace: self.resolve_namespace(site_id),
        }
    }
}
