//! Relationship ↔ foreign-key mappings.
//!
//! A relationship property on an entity can be exposed on a transfer record
//! as a set of "virtual" foreign-key properties holding the related entity's
//! key. Projection reads those values from the related entity; the write path
//! uses them to look the related entity up again.

use serde::{Deserialize, Serialize};

use crate::Result;
use crate::error::Error;

/// Maps virtual foreign-key properties to a to-one relationship.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RelationshipDef")]
pub struct RelationshipInfo {
    relationship: String,
    target_model: String,
    foreign_keys: Vec<String>,
    target_keys: Vec<String>,
}

/// Unchecked form used when loading definitions.
#[derive(Debug, Clone, Deserialize)]
struct RelationshipDef {
    relationship: String,
    target_model: String,
    foreign_keys: Vec<String>,
    target_keys: Vec<String>,
}

impl TryFrom<RelationshipDef> for RelationshipInfo {
    type Error = Error;

    fn try_from(def: RelationshipDef) -> Result<Self> {
        RelationshipInfo::new(
            def.relationship,
            def.target_model,
            def.foreign_keys,
            def.target_keys,
        )
    }
}

impl RelationshipInfo {
    /// `foreign_keys[i]` on the record carries `target_keys[i]` of the related entity.
    pub fn new<F, FS, T, TS>(
        relationship: impl Into<String>,
        target_model: impl Into<String>,
        foreign_keys: F,
        target_keys: T,
    ) -> Result<Self>
    where
        F: IntoIterator<Item = FS>,
        FS: Into<String>,
        T: IntoIterator<Item = TS>,
        TS: Into<String>,
    {
        let relationship = relationship.into();
        let foreign_keys: Vec<String> = foreign_keys.into_iter().map(Into::into).collect();
        let target_keys: Vec<String> = target_keys.into_iter().map(Into::into).collect();
        if foreign_keys.is_empty() || foreign_keys.len() != target_keys.len() {
            return Err(Error::config(format!(
                "relationship '{}' maps {} foreign keys to {} target keys",
                relationship,
                foreign_keys.len(),
                target_keys.len()
            )));
        }
        Ok(Self {
            relationship,
            target_model: target_model.into(),
            foreign_keys,
            target_keys,
        })
    }

    pub fn relationship(&self) -> &str {
        &self.relationship
    }

    pub fn target_model(&self) -> &str {
        &self.target_model
    }

    pub fn foreign_keys(&self) -> &[String] {
        &self.foreign_keys
    }

    pub fn target_keys(&self) -> &[String] {
        &self.target_keys
    }

    /// (foreign key, target key) pairs in key order.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.foreign_keys
            .iter()
            .map(String::as_str)
            .zip(self.target_keys.iter().map(String::as_str))
    }
}
