//! Response bodies of the presign server.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Everything a client needs to upload a single object.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadIntent {
    upload_url: String,
    public_url: String,
    key: String,
}

impl UploadIntent {
    /// Create a new upload intent.
    pub fn new(upload_url: String, public_url: String, key: String) -> Self {
        Self {
            upload_url,
            public_url,
            key,
        }
    }

    /// Presigned url the object must be `PUT` to.
    pub fn upload_url(&self) -> &str {
        &self.upload_url
    }

    /// Url the object is served from once uploaded.
    pub fn public_url(&self) -> &str {
        &self.public_url
    }

    /// Key of the object in the bucket.
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl IntoResponse for UploadIntent {
    fn into_response(self) -> Response {
        (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json; charset=utf-8")],
            Json(self),
        )
            .into_response()
    }
}
