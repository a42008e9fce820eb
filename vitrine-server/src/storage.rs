use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;
use url::Url;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error)]
pub enum SignError {
    #[error("storage path '{path}' does not form a valid URL")]
    InvalidPath { path: String },
    #[error("invalid signing key")]
    InvalidKey,
}

/// Mints time-limited signed URLs against the external media storage host.
///
/// The storage service is expected to verify `sig` over `path:expires` with
/// the shared secret before serving the file; this side only mints.
pub struct UrlSigner {
    base_url: Url,
    secret: Vec<u8>,
    ttl_secs: i64,
}

impl UrlSigner {
    pub fn new(mut base_url: Url, secret: &str, ttl_secs: i64) -> Self {
        // Url::join treats a base without a trailing slash as a file and
        // would drop its last path segment.
        if !base_url.path().ends_with('/') {
            base_url.set_path(&format!("{}/", base_url.path()));
        }
        Self {
            base_url,
            secret: secret.as_bytes().to_vec(),
            ttl_secs,
        }
    }

    pub fn signed_media_url(
        &self,
        storage_path: &str,
        now: DateTime<Utc>,
    ) -> Result<String, SignError> {
        let mut url = self
            .base_url
            .join(storage_path.trim_start_matches('/'))
            .map_err(|_| SignError::InvalidPath {
                path: storage_path.to_string(),
            })?;

        let expires = (now + Duration::seconds(self.ttl_secs)).timestamp();
        let mut mac =
            HmacSha256::new_from_slice(&self.secret).map_err(|_| SignError::InvalidKey)?;
        mac.update(url.path().as_bytes());
        mac.update(b":");
        mac.update(expires.to_string().as_bytes());
        let sig = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        url.query_pairs_mut()
            .append_pair("expires", &expires.to_string())
            .append_pair("sig", &sig);

        Ok(url.into())
    }
}
