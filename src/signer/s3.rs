//! UploadSigner for S3 buckets.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::{
    config::{Builder, Credentials, Region},
    presigning::PresigningConfig,
    Client,
};
use chrono::{DateTime, Utc};

use super::{SignedUrl, SignerError, UploadSigner, UploadTarget};
use crate::config::PresignConfig;

/// Signs `PutObject` requests with an S3 SDK client.
///
/// The client is built once per process and shared by every request. The
/// signed command never carries an ACL, access to uploaded objects is left
/// to the bucket policy.
#[derive(Debug, Clone)]
pub struct S3UploadSigner {
    client: Client,
}

impl S3UploadSigner {
    /// Create a new `S3UploadSigner` from the provided S3 SDK client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a signer for the region, credentials and endpoint in `config`.
    ///
    /// Without static credentials the SDK default credential chain is used.
    /// A custom endpoint switches the client to path style addressing.
    pub async fn from_config(config: &PresignConfig) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region().to_owned()));
        if let Some((access_key_id, secret_access_key)) = config.credentials() {
            loader = loader.credentials_provider(Credentials::new(
                access_key_id,
                secret_access_key,
                None,
                None,
                "presign-config",
            ));
        }
        let sdk_config = loader.load().await;

        let mut s3_config = Builder::from(&sdk_config);
        if let Some(endpoint) = config.endpoint() {
            tracing::info!(endpoint, "using custom s3 endpoint");
            s3_config = s3_config.endpoint_url(endpoint).force_path_style(true);
        }
        Self::new(Client::from_conf(s3_config.build()))
    }
}

#[async_trait]
impl UploadSigner for S3UploadSigner {
    async fn sign_upload(&self, target: &UploadTarget) -> Result<SignedUrl, SignerError> {
        let presign_config = PresigningConfig::expires_in(target.expires_in())
            .map_err(|e| SignerError::invalid_expiration(e.to_string()))?;

        let req = self
            .client
            .put_object()
            .bucket(target.bucket())
            .key(target.key())
            .content_type(target.content_type())
            .presigned(presign_config.clone())
            .await
            .map_err(|e| SignerError::provider(e.to_string()))?;

        tracing::debug!(
            bucket = target.bucket(),
            key = target.key(),
            expires_in = ?presign_config.expires(),
            "signed upload url"
        );

        Ok(SignedUrl::new(
            req.uri().to_string(),
            DateTime::<Utc>::from(presign_config.start_time()),
            presign_config.expires(),
        ))
    }
}
