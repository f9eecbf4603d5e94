//! Shared types for the chatrelay workspace.
//!
//! This crate holds the records that cross crate boundaries: the tenant
//! identifier, queued chat messages as they are persisted, and the live-feed
//! actions the ingestor consumes. It has no runtime dependencies beyond
//! `serde` so every other crate can depend on it freely.

pub mod feed;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub use feed::{stringify, FeedAction, MessageRun};

/// Maximum accepted length of a tenant identifier.
const MAX_TENANT_ID_LEN: usize = 64;

/// Identifier of an isolated processing context (one server or room).
///
/// Tenant ids end up in file names, so only ASCII alphanumerics, `-` and `_`
/// are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TenantId(String);

/// Returned when a string is not a usable tenant identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid tenant id: {0:?}")]
pub struct InvalidTenantId(pub String);

impl TenantId {
    /// Validates and wraps a tenant identifier.
    pub fn new(id: impl Into<String>) -> Result<Self, InvalidTenantId> {
        let id = id.into();
        let valid = !id.is_empty()
            && id.len() <= MAX_TENANT_ID_LEN
            && id
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
        if valid {
            Ok(Self(id))
        } else {
            Err(InvalidTenantId(id))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TenantId {
    type Err = InvalidTenantId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for TenantId {
    type Error = InvalidTenantId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TenantId> for String {
    fn from(value: TenantId) -> Self {
        value.0
    }
}

/// A queued chat message and its play status.
///
/// Serialized field names match the on-disk snapshot format
/// (`id`, `name`, `message`, `played`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Position in the tenant's queue; strictly increasing from 1.
    pub id: u64,
    /// Display name of the chat author.
    #[serde(rename = "name")]
    pub speaker: String,
    /// Rendered message body.
    #[serde(rename = "message")]
    pub text: String,
    /// Set once playback of this message has completed. Never reverts.
    #[serde(default)]
    pub played: bool,
}

/// A message before the store has assigned it an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageDraft {
    pub speaker: String,
    pub text: String,
}

impl MessageDraft {
    pub fn new(speaker: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            speaker: speaker.into(),
            text: text.into(),
        }
    }

    /// Turns the draft into an unplayed message with the given id.
    pub fn into_message(self, id: u64) -> Message {
        Message {
            id,
            speaker: self.speaker,
            text: self.text,
            played: false,
        }
    }
}
