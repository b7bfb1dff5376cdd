//! Client-side upload/download lifecycle.
//!
//! `Idle → FileSelected → Uploading → PreviewReady → Downloading → PreviewReady`.
//! Failed steps fall back to the phase they started from and leave a
//! notice for the user; illegal transitions change nothing.

#![deny(clippy::all, clippy::pedantic)]

use std::fmt;

use mdconvert_api_types::{DownloadFormat, UploadResponse, has_markdown_extension};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    FileSelected,
    Uploading,
    PreviewReady,
    Downloading,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Phase::Idle => "idle",
            Phase::FileSelected => "file selected",
            Phase::Uploading => "uploading",
            Phase::PreviewReady => "preview ready",
            Phase::Downloading => "downloading",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Error,
}

/// Dismissable message shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub name: String,
    pub size_bytes: u64,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ControllerError {
    #[error("cannot {action} while {phase}")]
    IllegalTransition { phase: Phase, action: &'static str },
    #[error("{0}")]
    InvalidFile(String),
}

#[derive(Debug)]
pub struct Controller {
    phase: Phase,
    limit_bytes: u64,
    file: Option<SelectedFile>,
    key: Option<String>,
    preview_html: Option<String>,
    pending: Option<DownloadFormat>,
    notice: Option<Notice>,
}

impl Controller {
    pub fn new(limit_bytes: u64) -> Self {
        Self {
            phase: Phase::Idle,
            limit_bytes,
            file: None,
            key: None,
            preview_html: None,
            pending: None,
            notice: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn file(&self) -> Option<&SelectedFile> {
        self.file.as_ref()
    }

    /// Artifact key of the last successful upload.
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn preview_html(&self) -> Option<&str> {
        self.preview_html.as_deref()
    }

    pub fn pending_download(&self) -> Option<DownloadFormat> {
        self.pending
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    /// Pick a file to upload. The same checks the server applies run here
    /// first so obviously bad files never leave the machine.
    pub fn select(&mut self, name: &str, size_bytes: u64) -> Result<(), ControllerError> {
        self.expect_phase(
            &[Phase::Idle, Phase::FileSelected, Phase::PreviewReady],
            "select a file",
        )?;

        let problem = if name.trim().is_empty() {
            Some("No file selected".to_string())
        } else if !has_markdown_extension(name) {
            Some("Please upload a valid Markdown file (.md or .markdown)".to_string())
        } else if size_bytes > self.limit_bytes {
            Some(format!(
                "File is too large; the limit is {} bytes",
                self.limit_bytes
            ))
        } else {
            None
        };

        if let Some(message) = problem {
            self.raise(NoticeKind::Error, message.clone());
            return Err(ControllerError::InvalidFile(message));
        }

        self.file = Some(SelectedFile {
            name: name.to_string(),
            size_bytes,
        });
        self.key = None;
        self.preview_html = None;
        self.notice = None;
        self.phase = Phase::FileSelected;
        Ok(())
    }

    pub fn submit(&mut self) -> Result<&SelectedFile, ControllerError> {
        self.expect_phase(&[Phase::FileSelected], "upload")?;
        self.phase = Phase::Uploading;
        self.file.as_ref().ok_or(ControllerError::IllegalTransition {
            phase: Phase::FileSelected,
            action: "upload",
        })
    }

    pub fn upload_succeeded(&mut self, response: UploadResponse) -> Result<(), ControllerError> {
        self.expect_phase(&[Phase::Uploading], "finish an upload")?;
        self.key = Some(response.filename);
        self.preview_html = response.preview_html;
        self.phase = Phase::PreviewReady;
        self.raise(NoticeKind::Info, response.message);
        Ok(())
    }

    pub fn upload_failed(&mut self, message: impl Into<String>) -> Result<(), ControllerError> {
        self.expect_phase(&[Phase::Uploading], "fail an upload")?;
        self.phase = Phase::FileSelected;
        self.raise(NoticeKind::Error, message.into());
        Ok(())
    }

    /// Start a download of the current artifact, returning its key.
    pub fn download(&mut self, format: DownloadFormat) -> Result<&str, ControllerError> {
        self.expect_phase(&[Phase::PreviewReady], "download")?;
        if self.key.is_none() {
            return Err(ControllerError::IllegalTransition {
                phase: self.phase,
                action: "download",
            });
        }
        self.pending = Some(format);
        self.phase = Phase::Downloading;
        Ok(self.key.as_deref().unwrap_or_default())
    }

    pub fn download_finished(&mut self, saved_as: &str) -> Result<(), ControllerError> {
        self.expect_phase(&[Phase::Downloading], "finish a download")?;
        self.pending = None;
        self.phase = Phase::PreviewReady;
        self.raise(NoticeKind::Info, format!("Saved {saved_as}"));
        Ok(())
    }

    pub fn download_failed(&mut self, message: impl Into<String>) -> Result<(), ControllerError> {
        self.expect_phase(&[Phase::Downloading], "fail a download")?;
        self.pending = None;
        self.phase = Phase::PreviewReady;
        self.raise(NoticeKind::Error, message.into());
        Ok(())
    }

    fn expect_phase(&self, allowed: &[Phase], action: &'static str) -> Result<(), ControllerError> {
        if allowed.contains(&self.phase) {
            Ok(())
        } else {
            Err(ControllerError::IllegalTransition {
                phase: self.phase,
                action,
            })
        }
    }

    fn raise(&mut self, kind: NoticeKind, text: String) {
        self.notice = Some(Notice { kind, text });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIMIT: u64 = 1024;

    fn uploaded(key: &str) -> UploadResponse {
        UploadResponse {
            success: true,
            filename: key.to_string(),
            original_filename: "notes.md".to_string(),
            preview_html: Some("<h1>Notes</h1>".to_string()),
            message: "File uploaded successfully".to_string(),
        }
    }

    fn ready(key: &str) -> Controller {
        let mut controller = Controller::new(LIMIT);
        controller.select("notes.md", 10).expect("select");
        controller.submit().expect("submit");
        controller.upload_succeeded(uploaded(key)).expect("uploaded");
        controller
    }

    #[test]
    fn full_lifecycle_returns_to_preview_after_download() {
        let mut controller = ready("k_notes.md");
        assert_eq!(controller.phase(), Phase::PreviewReady);
        assert_eq!(controller.key(), Some("k_notes.md"));
        assert_eq!(controller.preview_html(), Some("<h1>Notes</h1>"));

        let key = controller.download(DownloadFormat::Docx).expect("download");
        assert_eq!(key, "k_notes.md");
        assert_eq!(controller.phase(), Phase::Downloading);
        assert_eq!(controller.pending_download(), Some(DownloadFormat::Docx));

        controller.download_finished("notes.txt").expect("finished");
        assert_eq!(controller.phase(), Phase::PreviewReady);
        assert_eq!(controller.pending_download(), None);
    }

    #[test]
    fn invalid_selection_keeps_phase_and_raises_notice() {
        let mut controller = Controller::new(LIMIT);

        let err = controller.select("notes.txt", 10).expect_err("bad type");
        assert!(matches!(err, ControllerError::InvalidFile(_)));
        assert_eq!(controller.phase(), Phase::Idle);
        let notice = controller.notice().expect("notice");
        assert_eq!(notice.kind, NoticeKind::Error);

        controller.dismiss_notice();
        assert!(controller.notice().is_none());

        controller
            .select("big.md", LIMIT + 1)
            .expect_err("too large");
        assert_eq!(controller.phase(), Phase::Idle);

        controller.select("ok.md", LIMIT).expect("limit is inclusive");
        assert_eq!(controller.phase(), Phase::FileSelected);
    }

    #[test]
    fn failed_upload_returns_to_file_selected() {
        let mut controller = Controller::new(LIMIT);
        controller.select("notes.md", 10).expect("select");
        controller.submit().expect("submit");

        controller.upload_failed("server said no").expect("failed");
        assert_eq!(controller.phase(), Phase::FileSelected);
        assert_eq!(
            controller.notice().map(|notice| notice.text.as_str()),
            Some("server said no")
        );
        assert!(controller.file().is_some());
    }

    #[test]
    fn failed_download_returns_to_preview_ready() {
        let mut controller = ready("k_notes.md");
        controller.download(DownloadFormat::Pdf).expect("download");

        controller.download_failed("File not found").expect("failed");
        assert_eq!(controller.phase(), Phase::PreviewReady);
        assert_eq!(controller.key(), Some("k_notes.md"));
    }

    #[test]
    fn illegal_transitions_are_rejected_without_change() {
        let mut controller = Controller::new(LIMIT);

        assert!(matches!(
            controller.submit(),
            Err(ControllerError::IllegalTransition {
                phase: Phase::Idle,
                ..
            })
        ));
        assert!(controller.download(DownloadFormat::Pdf).is_err());
        assert!(controller.upload_succeeded(uploaded("k")).is_err());
        assert_eq!(controller.phase(), Phase::Idle);

        controller.select("notes.md", 10).expect("select");
        controller.submit().expect("submit");
        assert!(controller.select("other.md", 10).is_err());
        assert_eq!(controller.phase(), Phase::Uploading);
    }

    #[test]
    fn selecting_again_from_preview_forgets_previous_upload() {
        let mut controller = ready("k_notes.md");
        controller.select("second.md", 5).expect("reselect");

        assert_eq!(controller.phase(), Phase::FileSelected);
        assert_eq!(controller.key(), None);
        assert_eq!(controller.file().map(|f| f.name.as_str()), Some("second.md"));
    }
}
