//! Mold-driven projection between entity graphs and transfer records.
//!
//! The read path ([`GraphProjector::project`]) copies the properties a mold
//! names out of an entity, following relationships only where the mold map
//! has a mold for the path. The write path ([`GraphProjector::apply`]) copies
//! scalars back, re-resolves relationships from their foreign keys and,
//! when enabled, enforces optimistic versions.
//!
//! Entities are reached only through the collaborator traits in
//! `recmold_core::entity`; [`MemoryStore`] implements all of them in memory.

pub mod memory;
pub mod projector;
pub mod repository;
pub mod transaction;
pub mod version;
pub mod write;

pub use memory::{MemoryEntity, MemoryStore, ModelSchema};
pub use projector::GraphProjector;
pub use repository::Repository;
pub use transaction::{NoTransaction, TransactionBoundary, in_transaction};
pub use version::VersionGuard;
pub use write::{WriteMode, key_record};
