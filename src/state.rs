//! Presign server state.

use std::sync::Arc;

use axum::http::HeaderValue;
use tracing::{debug, info};

use crate::{
    config::PresignConfig,
    error::ServerError,
    extract::PresignRequest,
    key::KeyGenerator,
    response::UploadIntent,
    signer::{UploadSigner, UploadTarget},
};

/// State of the presign server.
///
/// Shared by all requests; holds no mutable state.
#[derive(Clone)]
pub struct PresignServerState {
    config: Arc<PresignConfig>,
    signer: Arc<dyn UploadSigner>,
    keys: KeyGenerator,
}

impl PresignServerState {
    /// Create a new presign server state.
    pub fn new(config: PresignConfig, signer: Arc<dyn UploadSigner>) -> Self {
        Self {
            config: Arc::new(config),
            signer,
            keys: KeyGenerator::new(),
        }
    }

    /// Get the configuration from the state.
    pub fn config(&self) -> &PresignConfig {
        &self.config
    }

    /// Get the upload signer from the state.
    pub fn signer(&self) -> Arc<dyn UploadSigner> {
        self.signer.clone()
    }

    /// Issue a presigned upload url, a fresh key and the public url for a
    /// single upload.
    ///
    /// The signer is only called once the request has been validated.
    pub async fn issue_upload_intent(
        &self,
        request: PresignRequest,
    ) -> Result<UploadIntent, ServerError> {
        let filename = required(request.filename.as_deref());
        let content_type = required(request.content_type.as_deref());
        let (Some(filename), Some(content_type)) = (filename, content_type) else {
            return Err(ServerError::missing_field(
                "filename and contentType required",
            ));
        };

        if !is_media_type(content_type) {
            return Err(ServerError::invalid_field(
                "contentType must be a MIME type such as `image/png`",
            ));
        }

        let key = self.keys.generate(request.folder.as_deref(), filename)?;
        debug!(%key, content_type, "derived object key");

        let target = UploadTarget::new(
            self.config.bucket(),
            key.clone(),
            content_type,
            self.config.expires_in(),
        );
        let signed = self.signer.sign_upload(&target).await?;
        let public_url = self.config.public_url(&key);

        info!(%key, expires_at = %signed.expires_at(), "issued upload url");
        Ok(UploadIntent::new(signed.into_url(), public_url, key))
    }
}

fn required(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// A `type/subtype` value that can be sent as a `Content-Type` header.
fn is_media_type(content_type: &str) -> bool {
    if HeaderValue::from_str(content_type).is_err() {
        return false;
    }
    let essence = content_type.split(';').next().unwrap_or_default().trim();
    matches!(
        essence.split_once('/'),
        Some((kind, subtype)) if !kind.is_empty()
            && !subtype.is_empty()
            && !subtype.contains('/')
            && !essence.contains(char::is_whitespace)
    )
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        error::ServerErrorKind,
        signer::{MockUploadSigner, SignedUrl, SignerError},
    };
    use chrono::Utc;
    use std::time::Duration;

    fn config() -> PresignConfig {
        PresignConfig::new("oso-media-uploads", "us-east-1")
    }

    fn signing_mock() -> MockUploadSigner {
        let mut mock_signer = MockUploadSigner::new();
        mock_signer.expect_sign_upload().returning(|target| {
            Ok(SignedUrl::new(
                format!(
                    "https://{}.s3.us-east-1.amazonaws.com/{}?X-Amz-Expires={}",
                    target.bucket(),
                    target.key(),
                    target.expires_in().as_secs()
                ),
                Utc::now(),
                target.expires_in(),
            ))
        });
        mock_signer
    }

    #[tokio::test]
    async fn issue_upload_intent() {
        let state = PresignServerState::new(config(), Arc::new(signing_mock()));

        let intent = state
            .issue_upload_intent(PresignRequest::new("photo.png", "image/png"))
            .await
            .unwrap();

        assert!(intent.key().starts_with("uploads/"));
        assert!(intent.key().ends_with(".png"));
        assert_eq!(
            intent.public_url(),
            format!(
                "https://oso-media-uploads.s3.us-east-1.amazonaws.com/{}",
                intent.key()
            )
        );
        assert!(intent.upload_url().contains(intent.key()));
    }

    #[tokio::test]
    async fn issue_upload_intent_without_extension() {
        let state = PresignServerState::new(config(), Arc::new(signing_mock()));

        let intent = state
            .issue_upload_intent(PresignRequest::new("noext", "text/plain").with_folder("docs"))
            .await
            .unwrap();

        let unique = intent.key().strip_prefix("docs/").unwrap();
        assert!(!unique.contains('.'));
    }

    #[tokio::test]
    async fn identical_requests_get_distinct_keys() {
        let state = PresignServerState::new(config(), Arc::new(signing_mock()));
        let request = PresignRequest::new("photo.png", "image/png");

        let (first, second) = tokio::join!(
            state.issue_upload_intent(request.clone()),
            state.issue_upload_intent(request)
        );

        assert_ne!(first.unwrap().key(), second.unwrap().key());
    }

    #[tokio::test]
    async fn signer_receives_configured_target() {
        let mut mock_signer = MockUploadSigner::new();
        mock_signer
            .expect_sign_upload()
            .withf(|target| {
                target.bucket() == "oso-media-uploads"
                    && target.content_type() == "image/jpeg"
                    && target.key().starts_with("avatars/")
                    && target.expires_in() == Duration::from_secs(120)
            })
            .times(1)
            .returning(|target| {
                Ok(SignedUrl::new(
                    "https://signed".to_owned(),
                    Utc::now(),
                    target.expires_in(),
                ))
            });

        let state =
            PresignServerState::new(config().with_expires_in_secs(120), Arc::new(mock_signer));
        state
            .issue_upload_intent(PresignRequest::new("me.jpg", "image/jpeg").with_folder("avatars"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn missing_fields_never_reach_the_signer() {
        let mut mock_signer = MockUploadSigner::new();
        mock_signer.expect_sign_upload().never();
        let state = PresignServerState::new(config(), Arc::new(mock_signer));

        let requests = [
            PresignRequest::default(),
            PresignRequest {
                filename: Some("photo.png".to_owned()),
                ..Default::default()
            },
            PresignRequest {
                content_type: Some("image/png".to_owned()),
                ..Default::default()
            },
            PresignRequest::new("  ", "image/png"),
            PresignRequest::new("photo.png", ""),
        ];

        for request in requests {
            let err = state.issue_upload_intent(request).await.unwrap_err();
            assert_eq!(err.kind(), ServerErrorKind::MissingField);
        }
    }

    #[tokio::test]
    async fn invalid_content_type_never_reaches_the_signer() {
        let mut mock_signer = MockUploadSigner::new();
        mock_signer.expect_sign_upload().never();
        let state = PresignServerState::new(config(), Arc::new(mock_signer));

        for content_type in ["image/\npng", "image", "/png", "image/", "a/b/c", "image /png"] {
            let err = state
                .issue_upload_intent(PresignRequest::new("photo.png", content_type))
                .await
                .unwrap_err();
            assert_eq!(err.kind(), ServerErrorKind::InvalidField, "{:?}", content_type);
        }
    }

    #[tokio::test]
    async fn content_type_with_parameters() {
        let state = PresignServerState::new(config(), Arc::new(signing_mock()));

        let intent = state
            .issue_upload_intent(PresignRequest::new("notes.txt", "text/plain; charset=utf-8"))
            .await;
        assert!(intent.is_ok());
    }

    #[tokio::test]
    async fn oversized_key_never_reaches_the_signer() {
        let mut mock_signer = MockUploadSigner::new();
        mock_signer.expect_sign_upload().never();
        let state = PresignServerState::new(config(), Arc::new(mock_signer));

        let err = state
            .issue_upload_intent(
                PresignRequest::new("photo.png", "image/png").with_folder("a".repeat(2000)),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ServerErrorKind::InvalidField);
    }

    #[tokio::test]
    async fn signing_failure_hides_cause() {
        let mut mock_signer = MockUploadSigner::new();
        mock_signer
            .expect_sign_upload()
            .returning(|_| Err(SignerError::provider("InvalidAccessKeyId")));
        let state = PresignServerState::new(config(), Arc::new(mock_signer));

        let err = state
            .issue_upload_intent(PresignRequest::new("photo.png", "image/png"))
            .await
            .unwrap_err();

        assert_eq!(err, ServerError::signing("Failed to generate URL"));
    }

    #[tokio::test]
    async fn public_url_uses_base_url_override() {
        let state = PresignServerState::new(
            config().with_public_base_url("https://cdn.example.com/"),
            Arc::new(signing_mock()),
        );

        let intent = state
            .issue_upload_intent(PresignRequest::new("photo.png", "image/png"))
            .await
            .unwrap();

        assert_eq!(
            intent.public_url(),
            format!("https://cdn.example.com/{}", intent.key())
        );
    }
}
