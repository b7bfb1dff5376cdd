//! Accepting uploaded Markdown into the artifact store.

use std::sync::Arc;

use metrics::counter;
use thiserror::Error;
use tracing::info;

use crate::{
    application::{
        render::{MarkdownRenderer, RenderError, render_timed},
        store::ArtifactStore,
    },
    domain::{
        artifact::{ArtifactDraft, ArtifactKey},
        uploads::{UploadPolicy, UploadRejection},
    },
};

pub(crate) const METRIC_UPLOADS_ACCEPTED: &str = "mdconvert_uploads_accepted_total";
pub(crate) const METRIC_UPLOADS_REJECTED: &str = "mdconvert_uploads_rejected_total";

#[derive(Debug, Error)]
pub enum UploadError {
    #[error(transparent)]
    Rejected(#[from] UploadRejection),
    #[error("failed to render upload preview")]
    Render(#[from] RenderError),
}

/// Outcome of a successful upload.
#[derive(Debug, Clone)]
pub struct UploadReceipt {
    pub key: ArtifactKey,
    pub original_filename: String,
    pub size_bytes: usize,
    pub preview_html: String,
}

pub struct UploadService {
    store: Arc<ArtifactStore>,
    renderer: Arc<dyn MarkdownRenderer>,
    policy: UploadPolicy,
}

impl UploadService {
    pub fn new(
        store: Arc<ArtifactStore>,
        renderer: Arc<dyn MarkdownRenderer>,
        policy: UploadPolicy,
    ) -> Self {
        Self {
            store,
            renderer,
            policy,
        }
    }

    pub fn policy(&self) -> UploadPolicy {
        self.policy
    }

    /// Record a rejection seen before the payload reached this service.
    pub fn reject(&self, rejection: UploadRejection) -> UploadError {
        counter!(METRIC_UPLOADS_REJECTED, "reason" => rejection_label(&rejection)).increment(1);
        UploadError::Rejected(rejection)
    }

    /// Validate, render and store an uploaded document.
    ///
    /// Nothing is written to the store unless every check passes.
    pub fn accept(
        &self,
        original_filename: &str,
        payload: Vec<u8>,
    ) -> Result<UploadReceipt, UploadError> {
        let filename = self
            .policy
            .check_filename(Some(original_filename))
            .map_err(|rejection| self.reject(rejection))?;
        let content = self
            .policy
            .decode(payload)
            .map_err(|rejection| self.reject(rejection))?;

        let preview_html = render_timed(self.renderer.as_ref(), &content)?;

        let key = ArtifactKey::generate(filename);
        let artifact = self
            .store
            .put(key.clone(), ArtifactDraft::new(filename, content));

        counter!(METRIC_UPLOADS_ACCEPTED).increment(1);
        info!(
            target = "mdconvert::uploads",
            key = %key,
            size_bytes = artifact.size_bytes,
            "stored uploaded document"
        );

        Ok(UploadReceipt {
            key,
            original_filename: filename.to_string(),
            size_bytes: artifact.size_bytes,
            preview_html,
        })
    }
}

fn rejection_label(rejection: &UploadRejection) -> &'static str {
    match rejection {
        UploadRejection::MissingFile => "missing_file",
        UploadRejection::InvalidType { .. } => "invalid_type",
        UploadRejection::TooLarge { .. } => "too_large",
        UploadRejection::NotText => "not_text",
    }
}
