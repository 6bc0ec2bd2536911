// src/content/repository.rs

//! SQLite-backed content persistence
//!
//! The repository owns the import path for content items: find-or-create by
//! identity, merge part definitions into the stored infoset documents, and
//! resolve `ref:` attribute values into stable row pointers. Row id lookups
//! are cached per batch; the batch importer clears the cache at every
//! transaction boundary so later batches never act on stale state.

use crate::content::ContentItem;
use crate::error::{Error, Result};
use crate::identity::ContentIdentity;
use crate::infoset::{Infoset, PartElement};
use crate::recipe::{ImportSession, ImportUnit};
use rusqlite::{Connection, OptionalExtension, params};
use std::collections::HashMap;
use std::rc::Rc;
use tracing::debug;

/// Prefix marking an attribute value as a reference to another item.
const REFERENCE_PREFIX: &str = "ref:";

/// Persistence seam used by the batch importer.
pub trait ContentStore {
    /// Import one unit: create or update the item under the unit's identity
    /// and apply its part definitions.
    fn import(&mut self, unit: &ImportUnit, session: &ImportSession) -> Result<()>;

    /// Drop per-batch lookup state so the next batch sees fresh data.
    fn clear(&mut self);
}

/// Content item repository over a shared SQLite connection.
pub struct SqliteRepository {
    conn: Rc<Connection>,
    identity_cache: HashMap<ContentIdentity, i64>,
}

impl SqliteRepository {
    pub fn new(conn: Rc<Connection>) -> Self {
        SqliteRepository {
            conn,
            identity_cache: HashMap::new(),
        }
    }

    pub(crate) fn connection(&self) -> Rc<Connection> {
        Rc::clone(&self.conn)
    }

    /// Number of content items in the database.
    pub fn item_count(&self) -> Result<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM content_items", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Load an item by its stable identity.
    pub fn find_by_identity(&self, identity: &ContentIdentity) -> Result<Option<ContentItem>> {
        find_item(&self.conn, identity)
    }

    /// Load an item by row id.
    pub fn load(&self, id: i64) -> Result<Option<ContentItem>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, identity, content_type, data, version_data
             FROM content_items WHERE id = ?1",
        )?;
        let row = stmt.query_row([id], raw_item).optional()?;
        row.map(hydrate).transpose()
    }

    /// Persist an item, inserting on first save and updating afterwards.
    /// Returns the row id and records it on the item.
    pub fn save(&self, item: &mut ContentItem) -> Result<i64> {
        let data = item.infoset.to_xml()?;
        let version_data = item.version_infoset.to_xml()?;
        match item.id {
            Some(id) => {
                let changed = self.conn.execute(
                    "UPDATE content_items
                     SET content_type = ?1, data = ?2, version_data = ?3,
                         modified_at = CURRENT_TIMESTAMP
                     WHERE id = ?4",
                    params![item.content_type, data, version_data, id],
                )?;
                if changed == 0 {
                    return Err(Error::ImportError(format!(
                        "no content item with id {id} to update"
                    )));
                }
                Ok(id)
            }
            None => {
                self.conn.execute(
                    "INSERT INTO content_items (identity, content_type, data, version_data)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![item.identity.as_str(), item.content_type, data, version_data],
                )?;
                let id = self.conn.last_insert_rowid();
                item.id = Some(id);
                Ok(id)
            }
        }
    }

    /// Row id for an identity, creating an empty stub item on first sight.
    fn find_or_create_id(&mut self, identity: &ContentIdentity, content_type: &str) -> Result<i64> {
        if let Some(&id) = self.identity_cache.get(identity) {
            return Ok(id);
        }
        let id = match lookup_id(&self.conn, identity)? {
            Some(id) => id,
            None => {
                let empty = Infoset::new().to_xml()?;
                self.conn.execute(
                    "INSERT INTO content_items (identity, content_type, data, version_data)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![identity.as_str(), content_type, empty, empty],
                )?;
                debug!("Created stub item for {} ({})", identity, content_type);
                self.conn.last_insert_rowid()
            }
        };
        self.identity_cache.insert(identity.clone(), id);
        Ok(id)
    }

    /// Row id a `ref:` value points at. An identity declared in the session
    /// but not yet imported is materialized as a stub so forward references
    /// within a step resolve; anything else is a missing reference.
    fn resolve_reference(
        &mut self,
        target: &ContentIdentity,
        session: &ImportSession,
    ) -> Result<i64> {
        if let Some(&id) = self.identity_cache.get(target) {
            return Ok(id);
        }
        if let Some(id) = lookup_id(&self.conn, target)? {
            self.identity_cache.insert(target.clone(), id);
            return Ok(id);
        }
        match session.logical_name(target) {
            Some(logical_name) => {
                debug!("Forward reference to {}, materializing stub", target);
                self.find_or_create_id(target, logical_name)
            }
            None => Err(Error::MissingReference(target.to_string())),
        }
    }
}

impl ContentStore for SqliteRepository {
    fn import(&mut self, unit: &ImportUnit, session: &ImportSession) -> Result<()> {
        let id = self.find_or_create_id(unit.identity(), unit.type_name())?;
        let mut item = self.load(id)?.ok_or_else(|| {
            Error::ImportError(format!(
                "content item {} vanished during import",
                unit.identity()
            ))
        })?;

        for part in unit.parts() {
            let mut applied = PartElement::new(part.name());
            for (attribute, value) in part.attrs() {
                match value.strip_prefix(REFERENCE_PREFIX) {
                    Some(reference) => {
                        let target = ContentIdentity::new(reference)
                            .map_err(|_| Error::MissingReference(value.to_string()))?;
                        let row = self.resolve_reference(&target, session)?;
                        applied.set_attr(attribute, format!("#{row}"));
                    }
                    None => applied.set_attr(attribute, value),
                }
            }
            item.infoset.merge_part(&applied);
        }

        item.content_type = unit.type_name().to_string();
        self.save(&mut item)?;
        debug!("Imported {} as {}", unit.identity(), unit.type_name());
        Ok(())
    }

    fn clear(&mut self) {
        self.identity_cache.clear();
    }
}

type RawItem = (i64, String, String, String, String);

fn raw_item(row: &rusqlite::Row) -> rusqlite::Result<RawItem> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
    ))
}

fn hydrate(raw: RawItem) -> Result<ContentItem> {
    let (id, identity, content_type, data, version_data) = raw;
    let identity = ContentIdentity::new(identity)
        .map_err(|e| Error::ImportError(format!("invalid identity in database: {e}")))?;
    Ok(ContentItem {
        id: Some(id),
        identity,
        content_type,
        infoset: Infoset::from_xml(&data)?,
        version_infoset: Infoset::from_xml(&version_data)?,
    })
}

fn lookup_id(conn: &Connection, identity: &ContentIdentity) -> Result<Option<i64>> {
    let mut stmt = conn.prepare("SELECT id FROM content_items WHERE identity = ?1")?;
    let id = stmt
        .query_row([identity.as_str()], |row| row.get(0))
        .optional()?;
    Ok(id)
}

/// Load an item by identity over a bare connection.
pub(crate) fn find_item(conn: &Connection, identity: &ContentIdentity) -> Result<Option<ContentItem>> {
    let mut stmt = conn.prepare(
        "SELECT id, identity, content_type, data, version_data
         FROM content_items WHERE identity = ?1",
    )?;
    let row = stmt
        .query_row([identity.as_str()], raw_item)
        .optional()?;
    row.map(hydrate).transpose()
}
