//! Error types for record access and graph projection.

use std::fmt;

use crate::value::Value;

type BoxedSource = Box<dyn std::error::Error + Send + Sync>;

/// The primary error type for all recmold operations.
#[derive(Debug)]
pub enum Error {
    /// Property lookup or accessor failures
    Property(PropertyError),
    /// Proxy dispatch fell through every rule
    Dispatch(DispatchError),
    /// Key validity violations
    Key(KeyError),
    /// Optimistic-concurrency violation
    StaleVersion(StaleVersionError),
    /// Lookup by key found nothing
    NotFound(NotFoundError),
    /// Foreign key present but the related entity could not be resolved
    Relationship(RelationshipError),
    /// Transaction boundary errors
    Transaction(TransactionError),
    /// Value conversion errors
    Type(TypeError),
    /// Mold, registry or configuration errors
    Config(ConfigError),
    /// Serialization/deserialization errors
    Serde(String),
    /// Custom error with message
    Custom(String),
}

#[derive(Debug)]
pub struct PropertyError {
    pub kind: PropertyErrorKind,
    /// The property that was requested
    pub property: String,
    /// The record, type or interface the property was requested on
    pub owner: Option<String>,
    pub source: Option<BoxedSource>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyErrorKind {
    /// Property is not in the declared PropertySet
    Undeclared,
    /// Concrete type declares no accessor for the property
    NoAccessor,
    /// The accessor itself failed
    Access,
}

#[derive(Debug)]
pub struct DispatchError {
    /// Access interface the call was made through
    pub interface: String,
    pub method: String,
    /// Shape of the arguments, for diagnostics
    pub arguments: String,
}

#[derive(Debug)]
pub struct KeyError {
    pub kind: KeyErrorKind,
    /// Key property at which validation failed, when there is one
    pub property: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyErrorKind {
    /// The key PropertySet is empty
    Undefined,
    /// The first key value is null
    Null,
    /// A composite key is only partially populated
    Incomplete,
}

#[derive(Debug)]
pub struct StaleVersionError {
    pub model: String,
    /// Version currently held by the entity
    pub current: Option<i64>,
    /// Version carried by the incoming record
    pub provided: i64,
}

#[derive(Debug)]
pub struct NotFoundError {
    pub model: String,
    pub key: Vec<Value>,
}

#[derive(Debug)]
pub struct RelationshipError {
    /// Relationship property on the entity
    pub relationship: String,
    pub target_model: String,
    pub source: Option<BoxedSource>,
}

#[derive(Debug)]
pub struct TransactionError {
    pub kind: TransactionErrorKind,
    pub message: String,
    pub source: Option<BoxedSource>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionErrorKind {
    Begin,
    Commit,
    Rollback,
}

#[derive(Debug)]
pub struct TypeError {
    pub expected: &'static str,
    pub actual: String,
    pub property: Option<String>,
}

#[derive(Debug)]
pub struct ConfigError {
    pub message: String,
    pub source: Option<BoxedSource>,
}

impl Error {
    /// Property `name` is not declared on `owner`.
    pub fn undeclared(name: impl Into<String>, owner: Option<&str>) -> Self {
        Error::Property(PropertyError {
            kind: PropertyErrorKind::Undeclared,
            property: name.into(),
            owner: owner.map(str::to_string),
            source: None,
        })
    }

    /// Type `owner` declares no usable accessor for `name`.
    pub fn no_accessor(name: impl Into<String>, owner: &str) -> Self {
        Error::Property(PropertyError {
            kind: PropertyErrorKind::NoAccessor,
            property: name.into(),
            owner: Some(owner.to_string()),
            source: None,
        })
    }

    /// Wrap a failure raised by an accessor, keeping the property name.
    pub fn access(name: impl Into<String>, owner: &str, cause: impl Into<BoxedSource>) -> Self {
        Error::Property(PropertyError {
            kind: PropertyErrorKind::Access,
            property: name.into(),
            owner: Some(owner.to_string()),
            source: Some(cause.into()),
        })
    }

    pub fn key(kind: KeyErrorKind, property: Option<&str>) -> Self {
        Error::Key(KeyError {
            kind,
            property: property.map(str::to_string),
        })
    }

    pub fn config(message: impl Into<String>) -> Self {
        Error::Config(ConfigError {
            message: message.into(),
            source: None,
        })
    }

    pub fn not_found(model: impl Into<String>, key: Vec<Value>) -> Self {
        Error::NotFound(NotFoundError {
            model: model.into(),
            key,
        })
    }

    /// Is this an undeclared-property error?
    pub fn is_undeclared(&self) -> bool {
        matches!(self, Error::Property(p) if p.kind == PropertyErrorKind::Undeclared)
    }

    /// Is this any key-validity error?
    pub fn is_key_error(&self) -> bool {
        matches!(self, Error::Key(_))
    }

    /// The key-validity kind, if this is a key error.
    pub fn key_kind(&self) -> Option<KeyErrorKind> {
        match self {
            Error::Key(k) => Some(k.kind),
            _ => None,
        }
    }

    /// The property-error kind, if this is a property error.
    pub fn property_kind(&self) -> Option<PropertyErrorKind> {
        match self {
            Error::Property(p) => Some(p.kind),
            _ => None,
        }
    }

    /// Is this an optimistic-concurrency conflict? Callers own the retry policy.
    pub fn is_stale_version(&self) -> bool {
        matches!(self, Error::StaleVersion(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    pub fn is_unsupported_operation(&self) -> bool {
        matches!(self, Error::Dispatch(_))
    }

    pub fn is_relationship_error(&self) -> bool {
        matches!(self, Error::Relationship(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Property(e) => write!(f, "Property error: {}", e),
            Error::Dispatch(e) => write!(f, "Unsupported operation: {}", e),
            Error::Key(e) => write!(f, "Key error: {}", e),
            Error::StaleVersion(e) => write!(f, "Stale version: {}", e),
            Error::NotFound(e) => write!(f, "Not found: {}", e),
            Error::Relationship(e) => write!(f, "Relationship error: {}", e),
            Error::Transaction(e) => write!(f, "Transaction error: {}", e.message),
            Error::Type(e) => write!(f, "Type error: {}", e),
            Error::Config(e) => write!(f, "Configuration error: {}", e.message),
            Error::Serde(msg) => write!(f, "Serialization error: {}", msg),
            Error::Custom(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Property(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            Error::Relationship(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            Error::Transaction(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            Error::Config(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            _ => None,
        }
    }
}

impl fmt::Display for PropertyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let what = match self.kind {
            PropertyErrorKind::Undeclared => "is not declared",
            PropertyErrorKind::NoAccessor => "has no accessor",
            PropertyErrorKind::Access => "accessor failed",
        };
        match &self.owner {
            Some(owner) => write!(f, "property '{}' {} on {}", self.property, what, owner)?,
            None => write!(f, "property '{}' {}", self.property, what)?,
        }
        if let Some(source) = &self.source {
            write!(f, ": {}", source)?;
        }
        Ok(())
    }
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}({}) cannot be dispatched",
            self.interface, self.method, self.arguments
        )
    }
}

impl fmt::Display for KeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self.kind {
            KeyErrorKind::Undefined => "no key properties are defined",
            KeyErrorKind::Null => "key value is null",
            KeyErrorKind::Incomplete => "composite key is incomplete",
        };
        match &self.property {
            Some(p) => write!(f, "{} (at '{}')", msg, p),
            None => write!(f, "{}", msg),
        }
    }
}

impl fmt::Display for StaleVersionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.current {
            Some(current) => write!(
                f,
                "{} is at version {}, record carries version {}",
                self.model, current, self.provided
            ),
            None => write!(
                f,
                "{} has no version, record carries version {}",
                self.model, self.provided
            ),
        }
    }
}

impl fmt::Display for NotFoundError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no {} with key {:?}", self.model, self.key)
    }
}

impl fmt::Display for RelationshipError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cannot resolve '{}' -> {}",
            self.relationship, self.target_model
        )?;
        if let Some(source) = &self.source {
            write!(f, ": {}", source)?;
        }
        Ok(())
    }
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(prop) = &self.property {
            write!(
                f,
                "expected {} for property '{}', found {}",
                self.expected, prop, self.actual
            )
        } else {
            write!(f, "expected {}, found {}", self.expected, self.actual)
        }
    }
}

impl From<PropertyError> for Error {
    fn from(err: PropertyError) -> Self {
        Error::Property(err)
    }
}

impl From<DispatchError> for Error {
    fn from(err: DispatchError) -> Self {
        Error::Dispatch(err)
    }
}

impl From<KeyError> for Error {
    fn from(err: KeyError) -> Self {
        Error::Key(err)
    }
}

impl From<StaleVersionError> for Error {
    fn from(err: StaleVersionError) -> Self {
        Error::StaleVersion(err)
    }
}

impl From<NotFoundError> for Error {
    fn from(err: NotFoundError) -> Self {
        Error::NotFound(err)
    }
}

impl From<RelationshipError> for Error {
    fn from(err: RelationshipError) -> Self {
        Error::Relationship(err)
    }
}

impl From<TransactionError> for Error {
    fn from(err: TransactionError) -> Self {
        Error::Transaction(err)
    }
}

impl From<TypeError> for Error {
    fn from(err: TypeError) -> Self {
        Error::Type(err)
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Error::Config(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serde(err.to_string())
    }
}

/// Result type alias for recmold operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn access_error_keeps_cause_and_property() {
        let err = Error::access("age", "Person", "negative age");
        assert_eq!(err.property_kind(), Some(PropertyErrorKind::Access));
        assert!(err.source().is_some());
        let msg = err.to_string();
        assert!(msg.contains("'age'"));
        assert!(msg.contains("Person"));
        assert!(msg.contains("negative age"));
    }

    #[test]
    fn kind_predicates() {
        assert!(Error::undeclared("x", None).is_undeclared());
        assert!(!Error::no_accessor("x", "T").is_undeclared());
        assert_eq!(
            Error::key(KeyErrorKind::Incomplete, Some("b")).key_kind(),
            Some(KeyErrorKind::Incomplete)
        );
        assert!(Error::not_found("team", vec![Value::BigInt(1)]).is_not_found());

        let stale = Error::from(StaleVersionError {
            model: "team".into(),
            current: Some(5),
            provided: 4,
        });
        assert!(stale.is_stale_version());
        assert_eq!(
            stale.to_string(),
            "Stale version: team is at version 5, record carries version 4"
        );
    }

    #[test]
    fn relationship_error_chains_lookup_failure() {
        let err = Error::Relationship(RelationshipError {
            relationship: "team".into(),
            target_model: "team".into(),
            source: Some(Box::new(Error::not_found("team", vec![Value::BigInt(9)]))),
        });
        let source = err.source().expect("cause attached");
        assert!(source.to_string().contains("no team with key"));
    }
}
