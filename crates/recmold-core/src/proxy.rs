//! Method-name dispatch for records exposed through an access interface.
//!
//! Each interface is compiled once into a [`DispatchTable`] mapping method
//! names to a [`Dispatch`] target. Resolution order:
//!
//! 1. zero-argument metadata methods (`getPropertyNames`,
//!    `getKeyPropertyNames`, `getAccessType`, or their snake-case forms)
//!    answer from record metadata;
//! 2. `getXxx`/`isXxx` with no arguments read property `xxx`;
//! 3. `setXxx` with one value writes property `xxx`;
//! 4. the generic `get`/`set` overloads are chosen by argument shape;
//! 5. anything else is an unsupported operation.

use std::collections::HashMap;
use std::sync::Arc;

use crate::Result;
use crate::bag::PropertyAccess;
use crate::cache::MetadataCache;
use crate::error::{DispatchError, Error};
use crate::interface::{AccessInterface, MethodSig, ParamKind};
use crate::property::{AccessorName, PropertySet, parse_accessor_name};
use crate::record::TransferRecord;
use crate::value::{Value, ValueMap};

/// A metadata query answered without touching property storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataCall {
    PropertyNames,
    KeyPropertyNames,
    AccessType,
}

/// Where a method call is routed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    Metadata(MetadataCall),
    Getter(String),
    Setter(String),
    /// Generic `get` overloads
    Get,
    /// Generic `set` overloads
    Set,
    Unsupported,
}

fn metadata_call(method: &str) -> Option<MetadataCall> {
    match method {
        "getPropertyNames" | "property_names" => Some(MetadataCall::PropertyNames),
        "getKeyPropertyNames" | "key_property_names" => Some(MetadataCall::KeyPropertyNames),
        "getAccessType" | "access_type" => Some(MetadataCall::AccessType),
        _ => None,
    }
}

/// Whether `property` names record metadata rather than a stored property.
pub(crate) fn is_metadata_property(property: &str) -> bool {
    matches!(
        property,
        "propertyNames"
            | "keyPropertyNames"
            | "accessType"
            | "property_names"
            | "key_property_names"
            | "access_type"
    )
}

fn classify(sig: &MethodSig) -> Dispatch {
    if sig.params.is_empty() {
        if let Some(call) = metadata_call(&sig.name) {
            return Dispatch::Metadata(call);
        }
    }
    match sig.name.as_str() {
        "get" => return Dispatch::Get,
        "set" => return Dispatch::Set,
        _ => {}
    }
    match (parse_accessor_name(&sig.name), sig.params.as_slice()) {
        (Some(AccessorName::Getter(p)), []) => Dispatch::Getter(p),
        (Some(AccessorName::Setter(p)), [ParamKind::Value]) => Dispatch::Setter(p),
        _ => Dispatch::Unsupported,
    }
}

/// Compiled method routing for one access interface.
#[derive(Debug, Clone)]
pub struct DispatchTable {
    interface: String,
    entries: HashMap<String, Dispatch>,
}

impl DispatchTable {
    pub fn compile(interface: &AccessInterface) -> Self {
        let entries = interface
            .methods
            .iter()
            .map(|sig| (sig.name.clone(), classify(sig)))
            .collect();
        Self {
            interface: interface.name.clone(),
            entries,
        }
    }

    pub fn interface(&self) -> &str {
        &self.interface
    }

    /// Route `method`. The generic record contract is always reachable,
    /// whether or not the interface lists it.
    pub fn resolve(&self, method: &str) -> Dispatch {
        if let Some(dispatch) = self.entries.get(method) {
            return dispatch.clone();
        }
        if let Some(call) = metadata_call(method) {
            return Dispatch::Metadata(call);
        }
        match method {
            "get" => Dispatch::Get,
            "set" => Dispatch::Set,
            _ => Dispatch::Unsupported,
        }
    }
}

/// An argument to a proxied call.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Value(Value),
    Name(String),
    Names(Vec<String>),
    Map(ValueMap),
}

impl Arg {
    fn shape(&self) -> &'static str {
        match self {
            Arg::Value(_) => "value",
            Arg::Name(_) => "name",
            Arg::Names(_) => "names",
            Arg::Map(_) => "map",
        }
    }
}

/// The result of a proxied call.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Unit,
    Value(Value),
    Map(ValueMap),
    Names(Vec<String>),
    AccessType(Option<String>),
}

impl Reply {
    /// The value of a single-property read.
    pub fn into_value(self) -> Option<Value> {
        match self {
            Reply::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_map(self) -> Option<ValueMap> {
        match self {
            Reply::Map(m) => Some(m),
            _ => None,
        }
    }
}

/// A transfer record exposed through an access interface.
///
/// Typed views are written as thin traits over [`RecordProxy::invoke`]:
///
/// ```ignore
/// trait HeroView {
///     fn name(&mut self) -> Result<String>;
/// }
///
/// impl HeroView for RecordProxy {
///     fn name(&mut self) -> Result<String> {
///         self.read_as("getName")
///     }
/// }
/// ```
#[derive(Debug, Clone)]
pub struct RecordProxy {
    record: TransferRecord,
    table: Arc<DispatchTable>,
}

impl RecordProxy {
    /// Wrap `record`, which must carry an access interface.
    pub fn new(record: TransferRecord) -> Result<Self> {
        Self::with_cache(record, MetadataCache::global())
    }

    pub fn with_cache(record: TransferRecord, cache: &MetadataCache) -> Result<Self> {
        let interface = record.access_interface().cloned().ok_or_else(|| {
            Error::config("record has no access interface to dispatch through")
        })?;
        let meta = interface.metadata(cache)?;
        Ok(Self {
            record,
            table: Arc::clone(&meta.dispatch),
        })
    }

    /// Synthesize a fresh proxy for `interface` over an empty map-backed record.
    pub fn create(
        properties: PropertySet,
        keys: PropertySet,
        interface: Arc<AccessInterface>,
    ) -> Result<Self> {
        let record = TransferRecord::builder(properties)
            .keys(keys)
            .access(interface)
            .build()?;
        Self::new(record)
    }

    pub fn record(&self) -> &TransferRecord {
        &self.record
    }

    pub fn record_mut(&mut self) -> &mut TransferRecord {
        &mut self.record
    }

    pub fn into_record(self) -> TransferRecord {
        self.record
    }

    pub fn dispatch_table(&self) -> &DispatchTable {
        &self.table
    }

    fn unsupported(&self, method: &str, shape: &[&str]) -> Error {
        Error::Dispatch(DispatchError {
            interface: self.table.interface().to_string(),
            method: method.to_string(),
            arguments: shape.join(", "),
        })
    }

    /// Invoke `method` with `args`.
    pub fn invoke(&mut self, method: &str, args: Vec<Arg>) -> Result<Reply> {
        let dispatch = self.table.resolve(method);
        let shape: Vec<&'static str> = args.iter().map(Arg::shape).collect();
        let record = &mut self.record;
        let mut args = args.into_iter();
        let outcome = match (dispatch, args.next(), args.next(), args.next()) {
            (Dispatch::Metadata(call), None, None, None) => Some(Ok(match call {
                MetadataCall::PropertyNames => {
                    Reply::Names(record.property_names().names().to_vec())
                }
                MetadataCall::KeyPropertyNames => {
                    Reply::Names(record.key_property_names().names().to_vec())
                }
                MetadataCall::AccessType => {
                    Reply::AccessType(record.access_interface().map(|i| i.name.clone()))
                }
            })),
            (Dispatch::Getter(property), None, None, None) => {
                Some(record.get(&property).map(Reply::Value))
            }
            (Dispatch::Setter(property), Some(Arg::Value(value)), None, None) => {
                Some(record.set(&property, value).map(|()| Reply::Unit))
            }
            (Dispatch::Get, None, None, None) => Some(record.get_all().map(Reply::Map)),
            (Dispatch::Get, Some(Arg::Name(name)), None, None) => {
                Some(record.get(&name).map(Reply::Value))
            }
            (Dispatch::Get, Some(Arg::Names(names)), None, None) => {
                let names: Vec<&str> = names.iter().map(String::as_str).collect();
                Some(record.get_many(&names).map(Reply::Map))
            }
            (Dispatch::Set, Some(Arg::Map(values)), None, None) => {
                Some(record.set_all(values).map(|()| Reply::Unit))
            }
            (Dispatch::Set, Some(Arg::Name(name)), Some(Arg::Value(value)), None) => {
                Some(record.set(&name, value).map(|()| Reply::Unit))
            }
            _ => None,
        };
        outcome.unwrap_or_else(|| Err(self.unsupported(method, &shape)))
    }

    /// Invoke a getter-shaped method and convert its value.
    pub fn read_as<T: crate::value::FromValue>(&mut self, method: &str) -> Result<T> {
        match self.invoke(method, Vec::new())? {
            Reply::Value(v) => T::from_value(&v),
            _ => Err(self.unsupported(method, &[])),
        }
    }

    /// Invoke a setter-shaped method.
    pub fn write(&mut self, method: &str, value: impl Into<Value>) -> Result<()> {
        self.invoke(method, vec![Arg::Value(value.into())])
            .map(|_| ())
    }
}
