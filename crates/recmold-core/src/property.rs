//! Property names and property sets.
//!
//! A `PropertySet` is the declared shape of a record: an ordered,
//! duplicate-free list of property names with O(1) name lookup. Sets are
//! immutable once built and shared between records through `Arc`, so every
//! record produced from the same mold carries the same metadata allocation.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use regex::Regex;

use crate::Result;
use crate::error::Error;

fn name_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^[a-z][A-Za-z0-9_]*$").ok())
        .as_ref()
}

/// Check a property name against the naming convention (leading lowercase letter).
pub fn is_valid_property_name(name: &str) -> bool {
    name_pattern().is_some_and(|re| re.is_match(name))
}

/// An ordered set of property names.
#[derive(Debug, Clone, Default)]
pub struct PropertySet {
    /// Names in declaration order
    names: Vec<String>,
    /// Name -> index mapping for O(1) lookup
    name_to_index: HashMap<String, usize>,
}

impl PropertySet {
    /// Build a set from names; later duplicates are dropped.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = Self::default();
        for name in names {
            set.push(name.into());
        }
        set
    }

    /// Build a set, rejecting names that break the naming convention.
    pub fn validated<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = Self::default();
        for name in names {
            let name = name.into();
            if !is_valid_property_name(&name) {
                return Err(Error::config(format!(
                    "invalid property name '{}': must start with a lowercase letter",
                    name
                )));
            }
            set.push(name);
        }
        Ok(set)
    }

    /// The empty set.
    pub fn empty() -> Self {
        Self::default()
    }

    fn push(&mut self, name: String) {
        if self.name_to_index.contains_key(&name) {
            return;
        }
        self.name_to_index.insert(name.clone(), self.names.len());
        self.names.push(name);
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.name_to_index.contains_key(name)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.name_to_index.get(name).copied()
    }

    pub fn name_at(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// A copy of this set without any of `excluded`, order preserved.
    pub fn without<'a, I>(&self, excluded: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let excluded: Vec<&str> = excluded.into_iter().collect();
        Self::new(self.iter().filter(|n| !excluded.contains(n)))
    }

    /// This set followed by the names of `other` not already present.
    pub fn union(&self, other: &PropertySet) -> Self {
        Self::new(self.iter().chain(other.iter()))
    }

    pub fn is_superset_of(&self, other: &PropertySet) -> bool {
        other.iter().all(|n| self.contains(n))
    }

    /// Wrap in an `Arc` for sharing between records.
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

/// Order-insensitive equality: a set is the same set whatever order it was declared in.
impl PartialEq for PropertySet {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.is_superset_of(other)
    }
}

impl Eq for PropertySet {}

impl<S: Into<String>> FromIterator<S> for PropertySet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter)
    }
}

/// How an accessor-style method name addresses a property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessorName {
    /// `getXxx`, `isXxx`, `get_xxx`, `is_xxx`
    Getter(String),
    /// `setXxx`, `set_xxx`
    Setter(String),
}

impl AccessorName {
    pub fn property(&self) -> &str {
        match self {
            AccessorName::Getter(p) | AccessorName::Setter(p) => p,
        }
    }
}

/// Translate an accessor method name into the property it addresses.
///
/// Camel-case forms lower-case the first letter after the prefix
/// (`getFirstName` → `firstName`); snake-case forms keep the remainder
/// as-is (`get_first_name` → `first_name`). A prefix followed by a lowercase
/// letter is an ordinary word, not an accessor (`getaway`, `island`).
pub fn parse_accessor_name(method: &str) -> Option<AccessorName> {
    for (prefix, setter) in [("get", false), ("is", false), ("set", true)] {
        let Some(rest) = method.strip_prefix(prefix) else {
            continue;
        };
        let property = if let Some(snake) = rest.strip_prefix('_') {
            if snake.is_empty() {
                return None;
            }
            snake.to_string()
        } else {
            let mut chars = rest.chars();
            let first = chars.next()?;
            if !first.is_uppercase() {
                continue;
            }
            let mut property: String = first.to_lowercase().collect();
            property.push_str(chars.as_str());
            property
        };
        return Some(if setter {
            AccessorName::Setter(property)
        } else {
            AccessorName::Getter(property)
        });
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedupes_and_keeps_order() {
        let set = PropertySet::new(["id", "name", "id", "age"]);
        assert_eq!(set.names(), ["id", "name", "age"]);
        assert_eq!(set.index_of("age"), Some(2));
        assert!(!set.contains("missing"));
    }

    #[test]
    fn equality_ignores_order() {
        assert_eq!(PropertySet::new(["a", "b"]), PropertySet::new(["b", "a"]));
        assert_ne!(PropertySet::new(["a"]), PropertySet::new(["a", "b"]));
    }

    #[test]
    fn without_and_union() {
        let set = PropertySet::new(["id", "name", "teamId"]);
        assert_eq!(set.without(["teamId"]).names(), ["id", "name"]);
        let extra = PropertySet::new(["name", "version"]);
        assert_eq!(set.union(&extra).names(), ["id", "name", "teamId", "version"]);
        assert!(set.is_superset_of(&PropertySet::new(["id"])));
    }

    #[test]
    fn validated_rejects_uppercase_start() {
        assert!(PropertySet::validated(["id", "secretName", "team_id"]).is_ok());
        let err = PropertySet::validated(["Name"]).unwrap_err();
        assert!(err.to_string().contains("'Name'"));
        assert!(PropertySet::validated(["1st"]).is_err());
    }

    #[test]
    fn accessor_names() {
        assert_eq!(
            parse_accessor_name("getFirstName"),
            Some(AccessorName::Getter("firstName".into()))
        );
        assert_eq!(
            parse_accessor_name("isActive"),
            Some(AccessorName::Getter("active".into()))
        );
        assert_eq!(
            parse_accessor_name("setAge"),
            Some(AccessorName::Setter("age".into()))
        );
        assert_eq!(
            parse_accessor_name("get_secret_name"),
            Some(AccessorName::Getter("secret_name".into()))
        );
        assert_eq!(
            parse_accessor_name("set_age"),
            Some(AccessorName::Setter("age".into()))
        );
        assert_eq!(parse_accessor_name("getaway"), None);
        assert_eq!(parse_accessor_name("island"), None);
        assert_eq!(parse_accessor_name("get"), None);
        assert_eq!(parse_accessor_name("get_"), None);
        assert_eq!(parse_accessor_name("name"), None);
    }
}
