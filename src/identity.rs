// src/identity.rs

//! Content identity handling
//!
//! Every import unit carries a stable textual identity that survives across
//! systems, recipe runs, and database rebuilds. Identities are opaque to
//! Graft: they are compared byte-for-byte after surrounding whitespace is
//! stripped, and never interpreted further.
//!
//! Examples:
//! - `page-home` - a page known by slug
//! - `/Identifier=4f2a9c` - an exported identity path
//! - `term:colors/red` - a taxonomy term

use std::fmt;
use std::str::FromStr;

/// Stable identity of a content item, unique within a content database.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentIdentity(String);

impl ContentIdentity {
    /// Parse an identity from raw text.
    ///
    /// Surrounding whitespace is stripped; an identity that is empty after
    /// stripping is rejected.
    pub fn new(raw: impl Into<String>) -> Result<Self, IdentityParseError> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(IdentityParseError::Empty);
        }
        if trimmed.len() == raw.len() {
            Ok(ContentIdentity(raw))
        } else {
            Ok(ContentIdentity(trimmed.to_string()))
        }
    }

    /// The identity as text, exactly as it is stored and compared.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ContentIdentity {
    type Err = IdentityParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ContentIdentity::new(s)
    }
}

impl AsRef<str> for ContentIdentity {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// Errors that can occur when parsing a content identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityParseError {
    /// The identity is empty or whitespace only
    Empty,
}

impl fmt::Display for IdentityParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentityParseError::Empty => {
                write!(f, "content identity must not be empty")
            }
        }
    }
}

impl std::error::Error for IdentityParseError {}
