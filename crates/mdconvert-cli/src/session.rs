//! Drives the [`Controller`] against a live server.

#![deny(clippy::all, clippy::pedantic)]

use std::path::{Path, PathBuf};

use mdconvert_api_types::{DownloadFormat, MAX_UPLOAD_BYTES, UploadResponse};
use tokio::fs;

use crate::client::{CliError, Ctx};
use crate::controller::{Controller, Notice};

pub struct Session<'a> {
    ctx: &'a Ctx,
    controller: Controller,
}

impl<'a> Session<'a> {
    pub fn new(ctx: &'a Ctx) -> Self {
        Self::with_limit(ctx, MAX_UPLOAD_BYTES)
    }

    pub fn with_limit(ctx: &'a Ctx, limit_bytes: u64) -> Self {
        Self {
            ctx,
            controller: Controller::new(limit_bytes),
        }
    }

    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    pub fn take_notice(&mut self) -> Option<Notice> {
        let notice = self.controller.notice().cloned();
        self.controller.dismiss_notice();
        notice
    }

    /// Select and upload `path`.
    pub async fn upload(&mut self, path: &Path) -> Result<UploadResponse, CliError> {
        let input_error = |source| CliError::InputFile {
            path: path.display().to_string(),
            source,
        };
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default()
            .to_string();
        let size = fs::metadata(path).await.map_err(input_error)?.len();

        self.controller.select(&name, size)?;
        let data = fs::read(path).await.map_err(input_error)?;
        self.controller.submit()?;

        match self.ctx.upload(&name, data).await {
            Ok(response) => {
                self.controller.upload_succeeded(response.clone())?;
                Ok(response)
            }
            Err(err) => {
                self.controller.upload_failed(err.to_string())?;
                Err(err)
            }
        }
    }

    /// Download the current upload in `format` into `out_dir`.
    pub async fn download(
        &mut self,
        format: DownloadFormat,
        out_dir: &Path,
    ) -> Result<PathBuf, CliError> {
        let key = self.controller.download(format)?.to_string();
        let ctx = self.ctx;

        let result = async {
            let downloaded = ctx.download(format, &key).await?;
            let target = out_dir.join(&downloaded.filename);
            fs::write(&target, &downloaded.body)
                .await
                .map_err(|source| CliError::OutputFile {
                    path: target.display().to_string(),
                    source,
                })?;
            Ok::<_, CliError>(target)
        }
        .await;

        match result {
            Ok(target) => {
                self.controller
                    .download_finished(&target.display().to_string())?;
                Ok(target)
            }
            Err(err) => {
                self.controller.download_failed(err.to_string())?;
                Err(err)
            }
        }
    }

    /// Remove the current upload from the server.
    pub async fn discard(&self) -> Result<(), CliError> {
        match self.controller.key() {
            Some(key) => self.ctx.delete(key).await,
            None => Ok(()),
        }
    }
}
