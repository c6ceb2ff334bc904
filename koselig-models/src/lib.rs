//! Koselig Models
//!
//! Entity facades over a [`koselig_storage::QueryLayer`]. A model is bound
//! to one site when it is constructed; its table names, meta owner keys
//! and query caching policy never change afterwards.
//!
//! ```no_run
//! use std::sync::Arc;
//! use koselig_core::{KoseligConfig, SiteId};
//! use koselig_models::PostModel;
//! use koselig_storage::{KeySelection, MetaCache, MockStorage};
//!
//! let config = KoseligConfig::default();
//! let posts = PostModel::from_config(&config, SiteId::PRIMARY, Arc::new(MockStorage::new()));
//! let cache = MetaCache::new();
//! let price = posts.get_meta(&cache, 42, &KeySelection::one("price"))?;
//! # Ok::<(), koselig_core::KoseligError>(())
//! ```

pub mod post;
pub mod user;

pub use post::{PostModel, THUMBNAIL_META_KEY};
pub use user::UserModel;
