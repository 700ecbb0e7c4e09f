// SPDX-License-Identifier: GPL-3.0-only

//! Backend persistence client
//!
//! The capture pipeline treats storage, emailing and printing as an external
//! collaborator behind one small trait. [`HttpPersistence`] implements the
//! wire contract against the kiosk backend: multipart upload, JSON email and
//! print jobs, and the QR retrieval-code check.

use crate::constants::{MediaKind, OutputFormat};
use crate::errors::PersistenceError;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

/// Backend response message that triggers a print on code check
pub const CODE_PRINT_MESSAGE: &str = "IMPRESSION";

/// A print job submission
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PrintJob {
    /// Server-side path returned by the upload
    pub file_path: String,
    /// Number of copies, already clamped by the session
    pub copies: u32,
    /// Output format wire name
    pub format: String,
    /// Selected decorative frame name (empty for none)
    pub frame: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EmailRequest<'a> {
    file_path: &'a str,
    email: &'a str,
}

#[derive(Debug, Serialize)]
struct CheckCodeRequest<'a> {
    code: &'a str,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    path: String,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    message: String,
}

/// External persistence collaborator
pub trait Persistence: Send {
    /// Persist an encoded blob; returns the server-side reference path
    fn upload(
        &self,
        data: &[u8],
        kind: MediaKind,
    ) -> impl std::future::Future<Output = Result<String, PersistenceError>> + Send;

    /// Email a previously saved file
    fn send_email(
        &self,
        file_path: &str,
        email: &str,
    ) -> impl std::future::Future<Output = Result<(), PersistenceError>> + Send;

    /// Submit a print job for a previously saved file
    fn print(
        &self,
        job: &PrintJob,
    ) -> impl std::future::Future<Output = Result<(), PersistenceError>> + Send;

    /// Validate a scanned retrieval code; returns the backend message
    fn check_code(
        &self,
        code: &str,
    ) -> impl std::future::Future<Output = Result<String, PersistenceError>> + Send;
}

/// HTTP implementation of the backend wire contract
pub struct HttpPersistence {
    base_url: String,
    client: reqwest::Client,
}

impl HttpPersistence {
    /// Create a client against a backend base address
    pub fn new(base_url: impl Into<String>) -> Result<Self, PersistenceError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| PersistenceError::Network(e.to_string()))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, PersistenceError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        // Error bodies carry `{ "message": ... }` when the backend had
        // something to say; fall back to the raw body otherwise.
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<MessageResponse>(&body)
            .map(|m| m.message)
            .unwrap_or(body);
        Err(PersistenceError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}

impl Persistence for HttpPersistence {
    async fn upload(&self, data: &[u8], kind: MediaKind) -> Result<String, PersistenceError> {
        let file_name = match kind {
            MediaKind::Jpeg => "photo.jpg",
            MediaKind::Gif => "photo.gif",
        };

        let part = reqwest::multipart::Part::bytes(data.to_vec())
            .file_name(file_name)
            .mime_str(kind.mime_type())
            .map_err(|e| PersistenceError::Network(e.to_string()))?;
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("mode", kind.upload_mode());

        debug!(bytes = data.len(), mode = kind.upload_mode(), "Uploading capture");

        let response = self
            .client
            .post(self.endpoint("/upload"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| PersistenceError::Network(e.to_string()))?;
        let response = Self::check_status(response).await?;

        let parsed: UploadResponse = response
            .json()
            .await
            .map_err(|e| PersistenceError::InvalidResponse(e.to_string()))?;

        info!(path = %parsed.path, "Capture persisted");
        Ok(parsed.path)
    }

    async fn send_email(&self, file_path: &str, email: &str) -> Result<(), PersistenceError> {
        let response = self
            .client
            .post(self.endpoint("/sendEmail"))
            .json(&EmailRequest { file_path, email })
            .send()
            .await
            .map_err(|e| PersistenceError::Network(e.to_string()))?;
        Self::check_status(response).await?;

        info!(path = %file_path, "Email requested");
        Ok(())
    }

    async fn print(&self, job: &PrintJob) -> Result<(), PersistenceError> {
        let response = self
            .client
            .post(self.endpoint("/print"))
            .json(job)
            .send()
            .await
            .map_err(|e| PersistenceError::Network(e.to_string()))?;
        Self::check_status(response).await?;

        info!(path = %job.file_path, copies = job.copies, "Print job submitted");
        Ok(())
    }

    async fn check_code(&self, code: &str) -> Result<String, PersistenceError> {
        let response = self
            .client
            .post(self.endpoint("/checkCode"))
            .json(&CheckCodeRequest { code })
            .send()
            .await
            .map_err(|e| PersistenceError::Network(e.to_string()))?;
        let response = Self::check_status(response).await?;

        let parsed: MessageResponse = response
            .json()
            .await
            .map_err(|e| PersistenceError::InvalidResponse(e.to_string()))?;
        Ok(parsed.message)
    }
}

/// Build a print job from session state
pub fn print_job(
    file_path: &str,
    copies: u32,
    format: OutputFormat,
    frame_name: &str,
) -> PrintJob {
    PrintJob {
        file_path: file_path.to_string(),
        copies,
        format: format.wire_name().to_string(),
        frame: frame_name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_print_job_wire_shape() {
        let job = print_job("saved/photo_1.jpg", 3, OutputFormat::SquareFrame, "Bois");
        let json = serde_json::to_value(&job).unwrap();

        assert_eq!(json["filePath"], "saved/photo_1.jpg");
        assert_eq!(json["copies"], 3);
        assert_eq!(json["format"], "POLAROID");
        assert_eq!(json["frame"], "Bois");
    }

    #[test]
    fn test_email_request_wire_shape() {
        let request = EmailRequest {
            file_path: "saved/photo_1.jpg",
            email: "client@example.com",
        };
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["filePath"], "saved/photo_1.jpg");
        assert_eq!(json["email"], "client@example.com");
    }

    #[test]
    fn test_upload_response_parsing() {
        let parsed: UploadResponse = serde_json::from_str(r#"{"path":"saved/a.jpg"}"#).unwrap();
        assert_eq!(parsed.path, "saved/a.jpg");
    }

    #[test]
    fn test_base_url_trailing_slash_is_normalized() {
        let persistence = HttpPersistence::new("http://localhost:3001/").unwrap();
        assert_eq!(persistence.endpoint("/upload"), "http://localhost:3001/upload");
    }
}
