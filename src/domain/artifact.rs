//! Uploaded documents and the keys that address them.

use std::fmt;

use sha2::{Digest, Sha256};
use time::OffsetDateTime;
use uuid::Uuid;

use super::error::DomainError;

const FALLBACK_FILENAME: &str = "upload.md";
const MAX_KEY_LEN: usize = 512;

/// Opaque identifier of a stored artifact: `<uuid-v4>_<sanitized filename>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactKey(String);

impl ArtifactKey {
    /// Mint a fresh key for an upload named `original_filename`.
    pub fn generate(original_filename: &str) -> Self {
        Self(format!(
            "{}_{}",
            Uuid::new_v4(),
            sanitize_filename(original_filename)
        ))
    }

    /// Accept a key supplied by a client.
    ///
    /// Only structural checks happen here; whether the key names a live
    /// artifact is up to the store.
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        if raw.trim().is_empty() {
            return Err(DomainError::validation("file key must not be empty"));
        }
        if raw.len() > MAX_KEY_LEN {
            return Err(DomainError::validation(format!(
                "file key exceeds {MAX_KEY_LEN} bytes"
            )));
        }
        if raw.chars().any(|ch| ch.is_control() || ch == '/' || ch == '\\') {
            return Err(DomainError::validation(
                "file key contains forbidden characters",
            ));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Display name derived from the key: the unique prefix up to the first
    /// `_` is dropped, then the extension.
    pub fn base_name(&self) -> &str {
        let name = self
            .0
            .split_once('_')
            .map_or(self.0.as_str(), |(_, rest)| rest);
        match name.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem,
            _ => name,
        }
    }
}

impl fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ArtifactKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Reduce a client-supplied filename to a portable key component.
///
/// Directory components are dropped, anything outside `[A-Za-z0-9._-]`
/// becomes `_`, and leading dots or underscores are trimmed.
pub fn sanitize_filename(original: &str) -> String {
    let name = original
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();

    let mapped: String = name
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '-' | '_') {
                ch
            } else {
                '_'
            }
        })
        .collect();

    let trimmed = mapped.trim_start_matches(['.', '_']);
    if trimmed.is_empty() || trimmed.chars().all(|ch| ch == '.' || ch == '_') {
        FALLBACK_FILENAME.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Lowercase hex SHA-256 of `content`.
pub fn checksum(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

/// Artifact contents as handed to the store.
#[derive(Debug, Clone)]
pub struct ArtifactDraft {
    pub original_filename: String,
    pub content: String,
    /// Left empty to let the store stamp the insertion time.
    pub uploaded_at: Option<OffsetDateTime>,
}

impl ArtifactDraft {
    pub fn new(original_filename: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            original_filename: original_filename.into(),
            content: content.into(),
            uploaded_at: None,
        }
    }

    pub fn uploaded_at(mut self, at: OffsetDateTime) -> Self {
        self.uploaded_at = Some(at);
        self
    }
}

/// One stored document. Never mutated after insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub key: ArtifactKey,
    pub original_filename: String,
    pub content: String,
    pub size_bytes: usize,
    pub checksum: String,
    pub uploaded_at: OffsetDateTime,
}

impl Artifact {
    pub fn from_draft(key: ArtifactKey, draft: ArtifactDraft, now: OffsetDateTime) -> Self {
        let ArtifactDraft {
            original_filename,
            content,
            uploaded_at,
        } = draft;

        Self {
            key,
            original_filename,
            size_bytes: content.len(),
            checksum: checksum(&content),
            content,
            uploaded_at: uploaded_at.unwrap_or(now),
        }
    }

    /// Whether the artifact has outlived `retention` at `now`.
    pub fn is_expired(&self, now: OffsetDateTime, retention: time::Duration) -> bool {
        now - self.uploaded_at > retention
    }
}
