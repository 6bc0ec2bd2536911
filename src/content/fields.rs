// src/content/fields.rs

//! Static field declarations for content parts
//!
//! A part names its fields as compile-time constants and exposes typed
//! accessors bound to those names, so field lookups never go through a
//! string-keyed registry at run time. [`OptionSetPart`] is the canonical
//! part: it keeps the identities of its selected options in one comma
//! separated attribute and loads the option items themselves lazily.

use crate::content::ContentItem;
use crate::content::repository::{self, SqliteRepository};
use crate::error::Result;
use crate::identity::ContentIdentity;
use crate::lazy::LazyField;
use tracing::warn;

/// The primitive shape of a field's stored text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Integer,
    Decimal,
    Flag,
    Timestamp,
}

/// Compile-time description of one part field.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub default: &'static str,
}

/// A content part with a static field list.
pub trait ContentPart {
    const PART_NAME: &'static str;
    const FIELDS: &'static [FieldSpec];

    /// Whether `name` is one of the part's declared fields.
    fn declares(name: &str) -> bool {
        Self::FIELDS.iter().any(|field| field.name == name)
    }
}

const SELECTED_FIELD: &str = "Selected";

/// Part holding a selection of option items, stored by identity.
pub struct OptionSetPart;

impl ContentPart for OptionSetPart {
    const PART_NAME: &'static str = "OptionSetPart";
    const FIELDS: &'static [FieldSpec] = &[FieldSpec {
        name: SELECTED_FIELD,
        kind: FieldKind::Text,
        default: "",
    }];
}

impl OptionSetPart {
    /// The selected identities, in stored order. Blank entries are dropped.
    pub fn selected(item: &ContentItem) -> Result<Vec<ContentIdentity>> {
        let raw: String = item.retrieve(Self::PART_NAME, SELECTED_FIELD, false)?;
        Ok(raw
            .split(',')
            .filter_map(|token| ContentIdentity::new(token).ok())
            .collect())
    }

    /// Replace the selection.
    pub fn set_selected(item: &mut ContentItem, identities: &[ContentIdentity]) {
        let joined = identities
            .iter()
            .map(ContentIdentity::as_str)
            .collect::<Vec<_>>()
            .join(",");
        item.store(Self::PART_NAME, SELECTED_FIELD, &joined, false);
    }

    /// The selected option items, loaded from the repository on first
    /// access. Selections that no longer resolve are skipped with a warning
    /// rather than failing the read.
    pub fn options(
        item: &ContentItem,
        repository: &SqliteRepository,
    ) -> Result<LazyField<Vec<ContentItem>>> {
        let identities = Self::selected(item)?;
        let conn = repository.connection();
        Ok(LazyField::new(move || {
            identities
                .iter()
                .filter_map(|identity| match repository::find_item(&conn, identity) {
                    Ok(Some(found)) => Some(found),
                    Ok(None) => {
                        warn!("Selected option {} is not in the repository", identity);
                        None
                    }
                    Err(err) => {
                        warn!("Failed to load option {}: {}", identity, err);
                        None
                    }
                })
                .collect()
        }))
    }
}
