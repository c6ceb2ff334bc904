//! Koselig Core - Record Types
//!
//! Plain data structures shared by every other crate: identifiers, the rows
//! read from the CMS tables, filter expressions, configuration and errors.
//! This crate contains no I/O beyond reading a configuration file.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod config;
pub mod error;
pub mod filter;

pub use config::{CachingPolicy, KoseligConfig, MAX_CACHING_MINUTES};
pub use error::{ConfigError, FieldError, KoseligError, KoseligResult, StorageError};
pub use filter::{FilterExpr, FilterOperator};

// ============================================================================
// IDENTITY TYPES
// ============================================================================

/// Primary key of a row in the posts table.
pub type PostId = u64;

/// Primary key of a row in the users table.
pub type UserId = u64;

/// Primary key of a row in either meta table.
pub type MetaId = u64;

/// Identifier of a site (tenant) within a multisite network.
///
/// Sites `0` (unset) and `1` (the network's primary site) share the base
/// table namespace; every other site owns a prefixed copy of the per-site
/// tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SiteId(pub u64);

impl SiteId {
    /// No site selected.
    pub const UNSET: SiteId = SiteId(0);
    /// The primary site of the network.
    pub const PRIMARY: SiteId = SiteId(1);

    /// Returns true if this site uses the unqualified base namespace.
    pub fn is_primary(&self) -> bool {
        *self == Self::UNSET || *self == Self::PRIMARY
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for SiteId {
    fn default() -> Self {
        Self::UNSET
    }
}

impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for SiteId {
    fn from(id: u64) -> Self {
        SiteId(id)
    }
}

// ============================================================================
// TABLES
// ============================================================================

/// Logical CMS tables this crate reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Table {
    Posts,
    PostMeta,
    Users,
    UserMeta,
}

impl Table {
    /// Unprefixed table name.
    pub fn base_name(&self) -> &'static str {
        match self {
            Table::Posts => "posts",
            Table::PostMeta => "postmeta",
            Table::Users => "users",
            Table::UserMeta => "usermeta",
        }
    }

    /// Network-wide tables ignore site routing and always live in the base
    /// namespace.
    pub fn is_global(&self) -> bool {
        matches!(self, Table::Users | Table::UserMeta)
    }
}

/// Which side table a set of meta records comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetaKind {
    Post,
    User,
}

impl MetaKind {
    pub fn table(&self) -> Table {
        match self {
            MetaKind::Post => Table::PostMeta,
            MetaKind::User => Table::UserMeta,
        }
    }

    /// Primary key column of the meta table.
    pub fn id_column(&self) -> &'static str {
        match self {
            MetaKind::Post => "meta_id",
            MetaKind::User => "umeta_id",
        }
    }

    /// Foreign key column pointing at the owning entity.
    pub fn owner_column(&self) -> &'static str {
        match self {
            MetaKind::Post => "post_id",
            MetaKind::User => "user_id",
        }
    }
}

// ============================================================================
// RECORDS
// ============================================================================

/// Lifecycle status of a post.
///
/// Plugins register their own statuses, so anything unrecognised is kept
/// verbatim in [`PostStatus::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PostStatus {
    Publish,
    Future,
    Draft,
    Pending,
    Private,
    Trash,
    AutoDraft,
    Inherit,
    Other(String),
}

impl PostStatus {
    pub fn as_str(&self) -> &str {
        match self {
            PostStatus::Publish => "publish",
            PostStatus::Future => "future",
            PostStatus::Draft => "draft",
            PostStatus::Pending => "pending",
            PostStatus::Private => "private",
            PostStatus::Trash => "trash",
            PostStatus::AutoDraft => "auto-draft",
            PostStatus::Inherit => "inherit",
            PostStatus::Other(status) => status,
        }
    }
}

impl From<String> for PostStatus {
    fn from(status: String) -> Self {
        match status.as_str() {
            "publish" => PostStatus::Publish,
            "future" => PostStatus::Future,
            "draft" => PostStatus::Draft,
            "pending" => PostStatus::Pending,
            "private" => PostStatus::Private,
            "trash" => PostStatus::Trash,
            "auto-draft" => PostStatus::AutoDraft,
            "inherit" => PostStatus::Inherit,
            _ => PostStatus::Other(status),
        }
    }
}

impl From<PostStatus> for String {
    fn from(status: PostStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for PostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A row of the posts table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostRecord {
    #[serde(rename = "ID")]
    pub id: PostId,
    #[serde(default)]
    pub post_author: UserId,
    #[serde(default)]
    pub post_date: Option<NaiveDateTime>,
    #[serde(default)]
    pub post_date_gmt: Option<NaiveDateTime>,
    #[serde(default)]
    pub post_modified: Option<NaiveDateTime>,
    #[serde(default)]
    pub post_modified_gmt: Option<NaiveDateTime>,
    #[serde(default)]
    pub post_title: String,
    #[serde(default)]
    pub post_content: String,
    #[serde(default)]
    pub post_excerpt: String,
    pub post_status: PostStatus,
    #[serde(default)]
    pub post_name: String,
    #[serde(default)]
    pub post_type: String,
    #[serde(default)]
    pub post_parent: PostId,
    #[serde(default)]
    pub menu_order: i64,
}

impl PostRecord {
    /// Minimal record used by fixtures and tests.
    pub fn new(id: PostId, post_name: impl Into<String>, post_status: PostStatus) -> Self {
        Self {
            id,
            post_author: 0,
            post_date: None,
            post_date_gmt: None,
            post_modified: None,
            post_modified_gmt: None,
            post_title: String::new(),
            post_content: String::new(),
            post_excerpt: String::new(),
            post_status,
            post_name: post_name.into(),
            post_type: "post".to_string(),
            post_parent: 0,
            menu_order: 0,
        }
    }
}

/// A row of the users table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    #[serde(rename = "ID")]
    pub id: UserId,
    pub user_login: String,
    #[serde(default)]
    pub user_nicename: String,
    #[serde(default)]
    pub user_email: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub user_registered: Option<NaiveDateTime>,
}

/// One key/value attribute attached to a post or user.
///
/// Keys are not unique per owner; storage keeps every row and returns them
/// in insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaRecord {
    #[serde(alias = "meta_id", alias = "umeta_id")]
    pub id: MetaId,
    #[serde(alias = "post_id", alias = "user_id")]
    pub owner_id: u64,
    pub meta_key: String,
    #[serde(default)]
    pub meta_value: String,
}

impl MetaRecord {
    pub fn new(
        id: MetaId,
        owner_id: u64,
        meta_key: impl Into<String>,
        meta_value: impl Into<String>,
    ) -> Self {
        Self {
            id,
            owner_id,
            meta_key: meta_key.into(),
            meta_value: meta_value.into(),
        }
    }

    /// Encode as a storage row using the column names of the given meta table.
    pub fn to_row(&self, kind: MetaKind) -> serde_json::Value {
        let mut row = serde_json::Map::new();
        row.insert(kind.id_column().to_string(), self.id.into());
        row.insert(kind.owner_column().to_string(), self.owner_id.into());
        row.insert("meta_key".to_string(), self.meta_key.clone().into());
        row.insert("meta_value".to_string(), self.meta_value.clone().into());
        serde_json::Value::Object(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_site_id_primary() {
        assert!(SiteId(0).is_primary());
        assert!(SiteId(1).is_primary());
        assert!(!SiteId(2).is_primary());
        assert!(!SiteId(7).is_primary());
    }

    #[test]
    fn test_global_tables() {
        assert!(Table::Users.is_global());
        assert!(Table::UserMeta.is_global());
        assert!(!Table::Posts.is_global());
        assert!(!Table::PostMeta.is_global());
    }

    #[test]
    fn test_post_status_wire_format() {
        assert_eq!(
            serde_json::to_value(PostStatus::AutoDraft).unwrap(),
            serde_json::json!("auto-draft")
        );
        let status: PostStatus = serde_json::from_value(serde_json::json!("publish")).unwrap();
        assert_eq!(status, PostStatus::Publish);
        let status: PostStatus = serde_json::from_value(serde_json::json!("wc-pending")).unwrap();
        assert_eq!(status, PostStatus::Other("wc-pending".to_string()));
        assert_eq!(status.as_str(), "wc-pending");
    }

    #[test]
    fn test_meta_record_row_uses_table_columns() {
        let record = MetaRecord::new(3, 42, "price", "19.99");

        let post_row = record.to_row(MetaKind::Post);
        assert_eq!(post_row["meta_id"], 3);
        assert_eq!(post_row["post_id"], 42);

        let user_row = record.to_row(MetaKind::User);
        assert_eq!(user_row["umeta_id"], 3);
        assert_eq!(user_row["user_id"], 42);

        let decoded: MetaRecord = serde_json::from_value(user_row).unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn test_post_record_row_roundtrip() {
        let post = PostRecord::new(42, "hello-world", PostStatus::Draft);
        let row = serde_json::to_value(&post).unwrap();
        assert_eq!(row["ID"], 42);
        assert_eq!(row["post_status"], "draft");
        let decoded: PostRecord = serde_json::from_value(row).unwrap();
        assert_eq!(decoded, post);
    }
}
