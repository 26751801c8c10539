//! Durable local storage for the strata offline layer.
//!
//! This crate provides the client-side persistence the sync engine is
//! built on:
//! - **Collection**: the named record collections the application caches
//! - **LocalStore**: the storage trait (upsert-by-id collections plus the
//!   sync queue), with a SQLite implementation
//! - **Queue**: pending-mutation log entries (create/update/delete) drained
//!   oldest-first once the client is back online
//! - **Records**: typed entity snapshots (buildings, owners, units, ...)
//! - **Cache**: typed per-entity facades over the store

pub mod cache;
pub mod collection;
pub mod error;
pub mod queue;
pub mod records;
pub mod sqlite_store;
pub mod store;

pub use cache::EntityCache;
pub use collection::Collection;
pub use error::StoreError;
pub use queue::{QueueAction, QueueEntry};
pub use records::{Building, Document, Entity, Expense, Notification, Owner, Unit, User};
pub use sqlite_store::SqliteLocalStore;
pub use store::LocalStore;
