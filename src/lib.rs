// src/lib.rs

//! Graft Content Importer
//!
//! Batched content importer with atomic transactions, dependency ordering,
//! and typed attribute storage.
//!
//! # Architecture
//!
//! - Database-first: all imported content lives in SQLite
//! - Infosets: each item's part data as two small XML documents
//! - Recipes: XML step documents executed in order, journaled per run
//! - Batches: dependency-ordered import windows, one transaction each
//! - Identities: stable external names, `ref:` values resolve to row ids

pub mod content;
pub mod db;
mod error;
pub mod identity;
pub mod infoset;
pub mod lazy;
pub mod recipe;
pub mod transaction;
mod xml;

pub use content::{
    ContentItem, ContentPart, ContentStore, FieldKind, FieldSpec, OptionSetPart, SqliteRepository,
};
pub use db::SqliteRunJournal;
pub use error::{Error, Result};
pub use identity::{ContentIdentity, IdentityParseError};
pub use infoset::{AttributeValue, Infoset, PartElement};
pub use lazy::LazyField;
pub use recipe::{
    DATA_STEP_NAME, DataStepHandler, ImportSession, ImportUnit, Recipe, RecipeHandler,
    RecipeRunner, RecipeStep, RunJournal, RunReport, SilentJournal, StepContext, StepOutcome,
    StepStatus,
};
pub use transaction::{SqliteTransactions, TransactionManager};
