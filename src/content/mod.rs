// src/content/mod.rs

//! Content items and their storage
//!
//! A content item is a typed unit of content: a stable identity, a content
//! type name, and two infoset documents holding its part data. The
//! unversioned document carries data shared by all versions; the version
//! document carries data owned by the current version. Items are persisted
//! in SQLite by [`SqliteRepository`].

mod fields;
mod repository;

pub use fields::{ContentPart, FieldKind, FieldSpec, OptionSetPart};
pub use repository::{ContentStore, SqliteRepository};

use crate::error::Result;
use crate::identity::ContentIdentity;
use crate::infoset::{AttributeValue, Infoset};

/// One unit of content as loaded from or destined for the database.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentItem {
    /// Database row id, `None` until first persisted
    pub id: Option<i64>,
    /// Stable external identity
    pub identity: ContentIdentity,
    /// Content type name, e.g. `Page`
    pub content_type: String,
    /// Unversioned part data
    pub infoset: Infoset,
    /// Part data owned by the current version
    pub version_infoset: Infoset,
}

impl ContentItem {
    pub fn new(identity: ContentIdentity, content_type: impl Into<String>) -> Self {
        ContentItem {
            id: None,
            identity,
            content_type: content_type.into(),
            infoset: Infoset::new(),
            version_infoset: Infoset::new(),
        }
    }

    /// Read a typed field from the part's element, choosing the versioned
    /// or unversioned document. An absent field reads as the type's absent
    /// value; text that does not parse is a conversion error.
    pub fn retrieve<T: AttributeValue>(
        &self,
        part_name: &str,
        attribute: &str,
        versioned: bool,
    ) -> Result<T> {
        let document = if versioned {
            &self.version_infoset
        } else {
            &self.infoset
        };
        document.get(part_name, attribute)
    }

    /// Write a typed field into the part's element, creating the element on
    /// demand. Overwrites any previous value under the same attribute name.
    pub fn store<T: AttributeValue>(
        &mut self,
        part_name: &str,
        attribute: &str,
        value: &T,
        versioned: bool,
    ) {
        let document = if versioned {
            &mut self.version_infoset
        } else {
            &mut self.infoset
        };
        document.set(part_name, attribute, value);
    }

    /// Read an unversioned field, computing and persisting a fallback value
    /// on first access. Later reads return the stored value and never run
    /// the fallback again.
    pub fn retrieve_or_default<T, F>(
        &mut self,
        part_name: &str,
        attribute: &str,
        default: F,
    ) -> Result<T>
    where
        T: AttributeValue,
        F: FnOnce() -> T,
    {
        if self.infoset.has(part_name, attribute) {
            return self.infoset.get(part_name, attribute);
        }
        let value = default();
        self.infoset.set(part_name, attribute, &value);
        Ok(value)
    }
}
