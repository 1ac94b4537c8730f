//! Extractors for presign requests.

use async_trait::async_trait;
use axum::{
    body::Bytes,
    extract::{FromRequest, Request},
};
use serde::Deserialize;

use crate::error::ServerError;

/// Body of a presign request.
///
/// All fields are optional at the parsing stage so that missing fields are
/// reported by validation instead of by the JSON decoder.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PresignRequest {
    /// Original client side filename.
    pub filename: Option<String>,
    /// MIME type the object will be uploaded with.
    #[serde(alias = "type")]
    pub content_type: Option<String>,
    /// Folder the object is stored under.
    pub folder: Option<String>,
}

impl PresignRequest {
    /// Create a new presign request.
    pub fn new(filename: impl Into<String>, content_type: impl Into<String>) -> Self {
        Self {
            filename: Some(filename.into()),
            content_type: Some(content_type.into()),
            folder: None,
        }
    }

    /// Set the folder of the request.
    pub fn with_folder(mut self, folder: impl Into<String>) -> Self {
        self.folder = Some(folder.into());
        self
    }

    /// Parse a request body. An empty body is a request without fields.
    pub fn from_slice(body: &[u8]) -> Result<Self, ServerError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice(body).map_err(|e| {
            tracing::debug!(error = %e, "could not parse presign request body");
            ServerError::malformed_request("request body must be a JSON object")
        })
    }
}

#[async_trait]
impl<S> FromRequest<S> for PresignRequest
where
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let body = Bytes::from_request(req, state)
            .await
            .map_err(|e| ServerError::malformed_request(e.body_text()))?;
        Self::from_slice(&body)
    }
}
