//! Traits and types for creating pre-signed upload urls.

use std::{error::Error, fmt::Display, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub mod s3;

/// Trait implemented by object store clients to authorize a single upload of
/// an object with a fixed content type.
///
/// Implementations must be safe to share between concurrent requests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UploadSigner: Send + Sync {
    /// Create a presigned url that permits a `PUT` of `target.key` with the
    /// content type `target.content_type`, valid for `target.expires_in`.
    async fn sign_upload(&self, target: &UploadTarget) -> Result<SignedUrl, SignerError>;
}

/// The object an upload url is requested for.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadTarget {
    bucket: String,
    key: String,
    content_type: String,
    expires_in: Duration,
}

impl UploadTarget {
    /// Create a new upload target.
    pub fn new(
        bucket: impl Into<String>,
        key: impl Into<String>,
        content_type: impl Into<String>,
        expires_in: Duration,
    ) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
            content_type: content_type.into(),
            expires_in,
        }
    }

    /// Bucket the object is written to.
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Key of the object.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Content type the upload must be sent with.
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// How long the signed url stays valid.
    pub fn expires_in(&self) -> Duration {
        self.expires_in
    }
}

/// A presigned url with a validity period.
#[derive(Debug, Clone, PartialEq)]
pub struct SignedUrl {
    url: String,
    valid_from: DateTime<Utc>,
    valid_duration: Duration,
}

impl SignedUrl {
    /// Create a new signed url.
    pub fn new(url: String, valid_from: DateTime<Utc>, valid_duration: Duration) -> Self {
        Self {
            url,
            valid_from,
            valid_duration,
        }
    }

    /// Get the presigned url.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Get the presigned url, consuming self.
    pub fn into_url(self) -> String {
        self.url
    }

    /// Get the time the presigned url was issued.
    pub fn valid_from(&self) -> DateTime<Utc> {
        self.valid_from
    }

    /// Get the time the presigned url expires.
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.valid_from + self.valid_duration
    }
}

/// Errors that can occur while signing an upload url.
#[derive(Debug, Clone, PartialEq)]
pub enum SignerError {
    /// The requested validity period is not accepted by the provider.
    InvalidExpiration {
        /// Reason given by the provider.
        reason: String,
    },
    /// The provider failed to produce a signature.
    Provider {
        /// Reason given by the provider.
        reason: String,
    },
}

impl SignerError {
    pub(crate) fn invalid_expiration(reason: impl Into<String>) -> Self {
        Self::InvalidExpiration {
            reason: reason.into(),
        }
    }

    pub(crate) fn provider(reason: impl Into<String>) -> Self {
        Self::Provider {
            reason: reason.into(),
        }
    }
}

impl Display for SignerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SignerError::InvalidExpiration { reason } => {
                write!(f, "invalid presign expiration: {}", reason)
            }
            SignerError::Provider { reason } => {
                write!(f, "storage provider could not sign the request: {}", reason)
            }
        }
    }
}

impl Error for SignerError {}
