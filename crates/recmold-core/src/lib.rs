//! Core types and traits for recmold.
//!
//! This crate provides the building blocks the projector works with:
//!
//! - `Value` and `PropertySet` for dynamically shaped data
//! - `PropertyAccess` with map-backed (`PropertyBag`) and struct-backed
//!   (`TypedAccessorBag`) storage
//! - `TransferRecord`, the generic unit of data exchange
//! - `AccessInterface` and `RecordProxy` for method-name dispatch
//! - `Mold`/`MoldMap` projection templates
//! - Collaborator traits for reaching persistent entities

pub mod accessor;
pub mod bag;
pub mod cache;
pub mod config;
pub mod entity;
pub mod error;
pub mod interface;
pub mod key;
pub mod mold;
pub mod property;
pub mod proxy;
pub mod record;
pub mod registry;
pub mod relationship;
pub mod value;

pub use accessor::{Accessible, Accessor, AccessorTable, TypedAccessorBag};
pub use bag::{PropertyAccess, PropertyBag};
pub use cache::{MetadataCache, TypeKey};
pub use config::ProjectorConfig;
pub use entity::{Attribute, EntityAccessor, EntityFactory, EntityLifecycle, EntityLookup};
pub use error::{
    ConfigError, DispatchError, Error, KeyError, KeyErrorKind, NotFoundError, PropertyError,
    PropertyErrorKind, RelationshipError, Result, StaleVersionError, TransactionError,
    TransactionErrorKind, TypeError,
};
pub use interface::{AccessInterface, AccessType, InterfaceMetadata, MethodSig, ParamKind};
pub use key::{check_key, key_prefix, key_values};
pub use mold::{Mold, MoldMap, ROOT_PATH, child_path};
pub use property::{AccessorName, PropertySet, is_valid_property_name, parse_accessor_name};
pub use proxy::{Arg, Dispatch, DispatchTable, RecordProxy, Reply};
pub use record::{RecordBuilder, RecordFactory, TransferRecord};
pub use registry::{ModelInfo, ModelRegistry, StaticRegistry};
pub use relationship::RelationshipInfo;
pub use value::{FromValue, Value, ValueMap};
