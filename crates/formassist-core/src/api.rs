use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:5000";

#[derive(Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
    language: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChatReply {
    pub reply: String,
    pub download_link: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RephraseReply {
    pub reply: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UploadReply {
    pub reply: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

/// A document picked for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    pub fn read(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self { name, bytes })
    }
}

/// HTTP client for the assistant backend.
#[derive(Clone)]
pub struct AssistantClient {
    client: Client,
    base_url: String,
}

impl AssistantClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Client whose every request fails with [`ApiError::Timeout`] once
    /// `timeout` elapses.
    pub fn with_timeout(base_url: &str, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for a download reference returned by `/chat`.
    pub fn download_url(&self, link: &str) -> String {
        if link.starts_with("http://") || link.starts_with("https://") {
            link.to_string()
        } else if link.starts_with('/') {
            format!("{}{}", self.base_url, link)
        } else {
            format!("{}/{}", self.base_url, link)
        }
    }

    pub async fn chat(&self, message: &str, language: &str) -> Result<ChatReply, ApiError> {
        let url = format!("{}/chat", self.base_url);
        tracing::debug!(%url, language, "sending chat message");

        let response = self
            .client
            .post(&url)
            .json(&ChatRequest { message, language })
            .send()
            .await
            .map_err(|e| ApiError::from_send(&url, e))?;

        read_json(&url, response).await
    }

    /// Ask the backend to restate its last question. The server keeps the
    /// conversation, so the request has no body.
    pub async fn rephrase(&self) -> Result<RephraseReply, ApiError> {
        let url = format!("{}/rephrase", self.base_url);
        tracing::debug!(%url, "requesting rephrase");

        let response = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await
            .map_err(|e| ApiError::from_send(&url, e))?;

        read_json(&url, response).await
    }

    /// Upload a document. The language travels in a `Language` header
    /// rather than in the form.
    pub async fn upload(&self, file: &UploadFile, language: &str) -> Result<UploadReply, ApiError> {
        let url = format!("{}/upload", self.base_url);
        tracing::debug!(%url, file = %file.name, size = file.bytes.len(), language, "uploading document");

        let part = Part::bytes(file.bytes.clone()).file_name(file.name.clone());
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(&url)
            .header("Language", language)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ApiError::from_send(&url, e))?;

        read_json(&url, response).await
    }

    pub async fn download(&self, link: &str) -> Result<Vec<u8>, ApiError> {
        let url = self.download_url(link);
        tracing::debug!(%url, "downloading artifact");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ApiError::from_send(&url, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                error: error_field(&body),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ApiError::from_send(&url, e))?;
        Ok(bytes.to_vec())
    }

    /// Fetch the artifact behind `link` and write it into `dir`, named after
    /// the last segment of the link.
    pub async fn save_download(&self, link: &str, dir: &Path) -> Result<PathBuf, ApiError> {
        let bytes = self.download(link).await?;

        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|source| ApiError::Io {
                path: dir.to_path_buf(),
                source,
            })?;

        let path = dir.join(artifact_name(link));
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|source| ApiError::Io {
                path: path.clone(),
                source,
            })?;

        tracing::info!(path = %path.display(), size = bytes.len(), "saved artifact");
        Ok(path)
    }
}

async fn read_json<T: DeserializeOwned>(url: &str, response: Response) -> Result<T, ApiError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| ApiError::from_send(url, e))?;

    if !status.is_success() {
        return Err(ApiError::Status {
            status: status.as_u16(),
            error: error_field(&body),
        });
    }

    serde_json::from_str(&body).map_err(|source| ApiError::Decode {
        url: url.to_string(),
        source,
    })
}

fn error_field(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.error)
}

fn artifact_name(link: &str) -> String {
    let path = link.split(['?', '#']).next().unwrap_or(link);
    path.rsplit('/')
        .find(|segment| !segment.is_empty() && *segment != "." && *segment != "..")
        .unwrap_or("download")
        .to_string()
}
