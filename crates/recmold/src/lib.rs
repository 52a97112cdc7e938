//! Generic transfer records and mold-driven entity graph projection.
//!
//! recmold moves data between a persistent entity graph and callers as
//! generic, dynamically shaped records. Which properties, keys and nested
//! relationships a record carries is decided at runtime by a mold.
//!
//! # Quick Start
//!
//! ```ignore
//! use recmold::prelude::*;
//!
//! let store = MemoryStore::new()
//!     .with_model("Team", ModelSchema::new(["id"], ["name"]))
//!     .with_model("Hero", ModelSchema::new(["id"], ["name", "age"]).one("team"));
//! let registry = StaticRegistry::new().with_model(
//!     ModelInfo::new("Hero", ["id"])
//!         .relationship(RelationshipInfo::new("team", "Team", ["teamId"], ["id"])?),
//! );
//!
//! let molds = MoldMap::new()
//!     .with(ROOT_PATH, Mold::of(["id", "name", "teamId", "team"], ["id"])?)
//!     .with("team", Mold::of(["id", "name"], ["id"])?);
//!
//! let projector = GraphProjector::new(&store, &registry);
//! let record = projector.project(&hero, &molds)?;
//! ```
//!
//! # Features
//!
//! - **Generic records**: `PropertyBag` for map-backed data, `TypedAccessorBag`
//!   for `#[derive(Accessible)]` structs
//! - **Named access interfaces**: `RecordProxy` dispatches `getX`/`setX` calls
//!   against any record
//! - **Molds**: per-path templates bounding how far a graph is projected
//! - **Foreign keys**: relationships travel as virtual key properties and are
//!   re-resolved on write
//! - **Optimistic concurrency**: version checks and bumps on update

pub use recmold_core::{
    AccessInterface,
    AccessType,
    Accessible,
    Accessor,
    AccessorTable,
    Arg,
    Attribute,
    Dispatch,
    DispatchTable,
    EntityAccessor,
    EntityFactory,
    EntityLifecycle,
    EntityLookup,
    // Errors
    Error,
    FromValue,
    InterfaceMetadata,
    KeyErrorKind,
    MetadataCache,
    MethodSig,
    ModelInfo,
    ModelRegistry,
    // Molds
    Mold,
    MoldMap,
    ParamKind,
    ProjectorConfig,
    PropertyAccess,
    // Records
    PropertyBag,
    PropertyErrorKind,
    PropertySet,
    ROOT_PATH,
    RecordBuilder,
    RecordFactory,
    RecordProxy,
    RelationshipInfo,
    Reply,
    Result,
    StaticRegistry,
    TransferRecord,
    TypedAccessorBag,
    Value,
    ValueMap,
    child_path,
    key_prefix,
    key_values,
};

pub use recmold_core::error;

pub use recmold_macros::Accessible;

pub use recmold_projector::{
    GraphProjector, MemoryEntity, MemoryStore, ModelSchema, NoTransaction, Repository,
    TransactionBoundary, VersionGuard, WriteMode, in_transaction,
};

/// Prelude module for convenient imports.
///
/// ```ignore
/// use recmold::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        AccessInterface,
        // Core traits and types (Accessible is also the derive)
        Accessible,
        Attribute,
        EntityAccessor,
        EntityLifecycle,
        EntityLookup,
        Error,
        // Projection
        GraphProjector,
        MemoryStore,
        ModelInfo,
        ModelRegistry,
        ModelSchema,
        Mold,
        MoldMap,
        ProjectorConfig,
        PropertyAccess,
        PropertyBag,
        PropertySet,
        ROOT_PATH,
        RecordProxy,
        RelationshipInfo,
        Repository,
        Result,
        StaticRegistry,
        TransactionBoundary,
        TransferRecord,
        Value,
        WriteMode,
    };
}
