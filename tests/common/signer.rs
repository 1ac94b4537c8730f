use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use upload_presign_server::signer::{SignedUrl, SignerError, UploadSigner, UploadTarget};

/// Upload signer that records every target it is asked to sign.
#[derive(Debug, Clone, Default)]
pub struct RecordingSigner {
    targets: Arc<Mutex<Vec<UploadTarget>>>,
    fail: bool,
}

impl RecordingSigner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn targets(&self) -> Vec<UploadTarget> {
        self.targets.lock().unwrap().clone()
    }
}

#[async_trait]
impl UploadSigner for RecordingSigner {
    async fn sign_upload(&self, target: &UploadTarget) -> Result<SignedUrl, SignerError> {
        self.targets.lock().unwrap().push(target.clone());
        if self.fail {
            return Err(SignerError::Provider {
                reason: "The AWS Access Key Id you provided does not exist".to_owned(),
            });
        }

        let url = format!(
            "https://{}.s3.amazonaws.com/{}?X-Amz-Expires={}&X-Amz-Signature=fake",
            target.bucket(),
            target.key(),
            target.expires_in().as_secs()
        );
        Ok(SignedUrl::new(url, Utc::now(), target.expires_in()))
    }
}
