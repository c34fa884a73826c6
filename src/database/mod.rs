//! Persistence layer for the gallery schema
//!
//! This module is organized into several sub-modules:
//! - `connection`: pool configuration, embedded migrations, connection retry
//! - `mapping`: the model mapping (keys, references, join tables, delete rules)
//! - `entity`: the `Entity` trait implemented by every mapped row type
//! - `staging`: staged inserts, updates, deletes and join-table links
//! - `context`: `EntitiesContext`, the unit of work with the read-only gate
//! - `navigation`: relationship reads on a context
//! - `repository`: the generic per-entity repository

pub mod connection;
pub mod context;
pub mod entity;
pub mod error;
pub mod mapping;
pub mod navigation;
pub mod repository;
pub mod staging;

pub use connection::{DbConnection, DbPool, MIGRATIONS, create_pool};
pub use context::{EntitiesContext, EntitySet};
pub use entity::Entity;
pub use error::{ContextError, READ_ONLY_MESSAGE};
pub use mapping::{DeleteBehavior, EntityKind, JoinTable, ModelMapping, Relationship};
pub use repository::{EntityRepository, Repository};
pub use staging::{KeyRef, NewEntity, Staged, StagedKeys};
