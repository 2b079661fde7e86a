//! Cloudinary direct-upload signing.

use chrono::Utc;
use serde::Serialize;
use sha2::{Digest, Sha256};
use ts_rs::TS;

/// Everything a browser needs for a signed direct-to-CDN upload.
#[derive(Debug, Clone, Serialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct UploadSignature {
    pub timestamp: i64,
    pub signature: String,
    pub cloud_name: String,
    pub api_key: String,
    pub upload_preset: String,
}

/// Signs upload parameters with the account's API secret.
#[derive(Debug, Clone)]
pub struct CloudinaryService {
    cloud_name: String,
    api_key: String,
    api_secret: String,
    upload_preset: String,
}

impl CloudinaryService {
    pub fn new(
        cloud_name: String,
        api_key: String,
        api_secret: String,
        upload_preset: String,
    ) -> Self {
        Self {
            cloud_name,
            api_key,
            api_secret,
            upload_preset,
        }
    }

    /// Builds an upload signature for the given parameters. `timestamp`
    /// defaults to the current unix time; absent optional parameters are
    /// excluded from the signed payload entirely.
    ///
    /// Cloudinary's signature scheme: sort the present parameters by key,
    /// join as `key=value` pairs with `&`, append the API secret, and hash
    /// (SHA-256 here, which Cloudinary accepts alongside its SHA-1
    /// default).
    pub fn sign_upload(
        &self,
        timestamp: Option<i64>,
        folder: Option<&str>,
        public_id: Option<&str>,
    ) -> UploadSignature {
        let timestamp = timestamp.unwrap_or_else(|| Utc::now().timestamp());

        let mut params: Vec<(&str, String)> = vec![("timestamp", timestamp.to_string())];
        if let Some(folder) = folder {
            params.push(("folder", folder.to_string()));
        }
        if let Some(public_id) = public_id {
            params.push(("public_id", public_id.to_string()));
        }
        params.push(("upload_preset", self.upload_preset.clone()));
        params.sort_by(|a, b| a.0.cmp(b.0));

        let payload = params
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join("&");

        let mut hasher = Sha256::new();
        hasher.update(payload.as_bytes());
        hasher.update(self.api_secret.as_bytes());
        let signature = hex::encode(hasher.finalize());

        UploadSignature {
            timestamp,
            signature,
            cloud_name: self.cloud_name.clone(),
            api_key: self.api_key.clone(),
            upload_preset: self.upload_preset.clone(),
        }
    }
}
