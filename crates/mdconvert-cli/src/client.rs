#![deny(clippy::all, clippy::pedantic)]

use mdconvert_api_types::{DownloadFormat, ErrorResponse, UploadResponse};
use reqwest::{Client, Response, Url, header::CONTENT_DISPOSITION};
use thiserror::Error;

use crate::controller::ControllerError;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("failed to read input file {path}: {source}")]
    InputFile {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to write output file {path}: {source}")]
    OutputFile {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{message} ({code}, status {status})")]
    Api {
        status: u16,
        code: String,
        message: String,
    },
    #[error("server error: {0}")]
    Server(String),
    #[error(transparent)]
    Controller(#[from] ControllerError),
}

/// A downloaded deliverable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Downloaded {
    /// Name suggested by the server's `Content-Disposition`.
    pub filename: String,
    pub body: Vec<u8>,
}

#[derive(Clone, Debug)]
pub struct Ctx {
    pub client: Client,
    pub base: Url,
}

impl Ctx {
    pub fn new(server: &str) -> Result<Self, CliError> {
        let base = Url::parse(server)?.join("/")?;
        let client = Client::builder().user_agent(Self::user_agent()).build()?;
        Ok(Self { client, base })
    }

    pub fn user_agent() -> &'static str {
        concat!("mdconvert-cli/", env!("CARGO_PKG_VERSION"))
    }

    pub fn url(&self, path: &str) -> Result<Url, CliError> {
        self.base.join(path).map_err(CliError::Url)
    }

    pub async fn upload(&self, filename: &str, data: Vec<u8>) -> Result<UploadResponse, CliError> {
        let part = reqwest::multipart::Part::bytes(data).file_name(filename.to_string());
        let form = reqwest::multipart::Form::new().part("file", part);
        let resp = self
            .client
            .post(self.url("upload")?)
            .multipart(form)
            .send()
            .await?;
        let resp = Self::check(resp).await?;
        let bytes = resp.bytes().await?;
        serde_json::from_slice(&bytes)
            .map_err(|e| CliError::Server(format!("failed to parse body: {e}")))
    }

    pub async fn download(&self, format: DownloadFormat, key: &str) -> Result<Downloaded, CliError> {
        let path = format!("download/{format}/{key}");
        let resp = self.client.get(self.url(&path)?).send().await?;
        let resp = Self::check(resp).await?;
        let filename = resp
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok())
            .and_then(filename_from_disposition)
            .unwrap_or_else(|| format!("download.{}", format.stand_in_extension()));
        let body = resp.bytes().await?.to_vec();
        Ok(Downloaded { filename, body })
    }

    pub async fn delete(&self, key: &str) -> Result<(), CliError> {
        let path = format!("files/{key}");
        let resp = self.client.delete(self.url(&path)?).send().await?;
        Self::check(resp).await?;
        Ok(())
    }

    async fn check(resp: Response) -> Result<Response, CliError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let bytes = resp.bytes().await?;
        match serde_json::from_slice::<ErrorResponse>(&bytes) {
            Ok(body) => Err(CliError::Api {
                status: status.as_u16(),
                code: body.error,
                message: body.message,
            }),
            Err(_) => {
                let text = String::from_utf8_lossy(&bytes).into_owned();
                Err(CliError::Server(format!("status {status} body {text}")))
            }
        }
    }
}

/// Extract `filename="..."` from a `Content-Disposition` value, keeping only
/// the final path component.
pub fn filename_from_disposition(value: &str) -> Option<String> {
    let raw = value
        .split(';')
        .map(str::trim)
        .find_map(|part| part.strip_prefix("filename="))?
        .trim_matches('"');
    let name = raw.rsplit(['/', '\\']).next().unwrap_or(raw).trim();
    if name.is_empty() || name == "." || name == ".." {
        None
    } else {
        Some(name.to_string())
    }
}
