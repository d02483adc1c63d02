//! Content-derived resource versions for `If-Match` handling.
//!
//! A version is the base64 encoding of a truncated SHA-256 digest over the
//! serialized resource. Two phantom formats keep raw identifiers and HTTP
//! ETag header values apart at compile time:
//!
//! * [`RawVersion`] - the bare opaque string, as stored
//! * [`HttpVersion`] - the weak ETag header form, `W/"<opaque>"`
//!
//! ```rust
//! use scim_patch::resource::version::{HttpVersion, RawVersion};
//!
//! let stored = RawVersion::from_content(br#"{"userName":"bjensen"}"#);
//! let header: HttpVersion = HttpVersion::from(stored.clone());
//! let parsed: HttpVersion = header.to_string().parse().unwrap();
//! assert_eq!(stored, parsed);
//! ```

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::{fmt, marker::PhantomData, str::FromStr};
use thiserror::Error;

use super::ResourceNode;

/// Marker for the HTTP ETag format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Http;

/// Marker for the raw stored format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Raw;

/// Opaque resource version tagged with its textual format.
#[derive(Debug, Clone, Eq, Hash)]
pub struct ScimVersion<Format> {
    opaque: String,
    _format: PhantomData<Format>,
}

pub type HttpVersion = ScimVersion<Http>;
pub type RawVersion = ScimVersion<Raw>;

/// Number of digest bytes kept in a version.
const DIGEST_PREFIX: usize = 8;

impl<Format> ScimVersion<Format> {
    fn with_opaque(opaque: String) -> Self {
        Self {
            opaque,
            _format: PhantomData,
        }
    }

    /// Hash arbitrary content into a version.
    pub fn from_content(content: &[u8]) -> RawVersion {
        let digest = Sha256::digest(content);
        ScimVersion::with_opaque(BASE64.encode(&digest[..DIGEST_PREFIX]))
    }

    /// Version of a resource's current JSON representation.
    pub fn from_resource(resource: &ResourceNode) -> RawVersion {
        Self::from_content(resource.to_json().to_string().as_bytes())
    }

    /// Wrap an externally supplied identifier.
    pub fn from_hash(hash: impl AsRef<str>) -> RawVersion {
        ScimVersion::with_opaque(hash.as_ref().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.opaque
    }
}

impl fmt::Display for RawVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.opaque)
    }
}

impl fmt::Display for HttpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "W/\"{}\"", self.opaque)
    }
}

impl FromStr for RawVersion {
    type Err = VersionError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "" => Err(VersionError::ParseError(
                "Version string cannot be empty".to_string(),
            )),
            trimmed => Ok(Self::with_opaque(trimmed.to_string())),
        }
    }
}

impl FromStr for HttpVersion {
    type Err = VersionError;

    /// Accepts both weak (`W/"x"`) and strong (`"x"`) ETags.
    fn from_str(header: &str) -> Result<Self, Self::Err> {
        let trimmed = header.trim();
        let quoted = trimmed.strip_prefix("W/").unwrap_or(trimmed);
        quoted
            .strip_prefix('"')
            .and_then(|rest| rest.strip_suffix('"'))
            .filter(|opaque| !opaque.is_empty())
            .map(|opaque| Self::with_opaque(opaque.to_string()))
            .ok_or_else(|| VersionError::InvalidEtagFormat(header.to_string()))
    }
}

impl From<RawVersion> for HttpVersion {
    fn from(raw: RawVersion) -> Self {
        Self::with_opaque(raw.opaque)
    }
}

impl From<HttpVersion> for RawVersion {
    fn from(http: HttpVersion) -> Self {
        Self::with_opaque(http.opaque)
    }
}

impl<F1, F2> PartialEq<ScimVersion<F2>> for ScimVersion<F1> {
    fn eq(&self, other: &ScimVersion<F2>) -> bool {
        self.opaque == other.opaque
    }
}

impl<Format> Serialize for ScimVersion<Format> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.opaque)
    }
}

impl<'de, Format> Deserialize<'de> for ScimVersion<Format> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::with_opaque)
    }
}

/// Errors raised while parsing versions.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum VersionError {
    #[error("Invalid ETag format: {0}")]
    InvalidEtagFormat(String),

    #[error("Failed to parse version: {0}")]
    ParseError(String),
}
