use crate::error::{PushError, Result};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};

const UNCOMPRESSED_P256_LEN: usize = 65;
const UNCOMPRESSED_POINT_TAG: u8 = 0x04;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushSubscriptionKeys {
    pub p256dh: String,
    pub auth: String,
}

/// Subscription handed out by the push service, in the browser's JSON shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushSubscription {
    pub endpoint: String,
    pub expiration_time: Option<u64>,
    pub keys: PushSubscriptionKeys,
}

/// Decoded VAPID public key of the push sender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationServerKey(Vec<u8>);

impl ApplicationServerKey {
    /// Decodes a base64url key (padding optional) into raw bytes.
    ///
    /// # Errors
    /// Returns `PushError::InvalidKey` if the text is not base64 or the bytes are not an
    /// uncompressed P-256 point.
    pub fn from_base64url(encoded: &str) -> Result<Self> {
        let mut standard: String = encoded
            .trim()
            .chars()
            .map(|c| match c {
                '-' => '+',
                '_' => '/',
                other => other,
            })
            .collect();
        while standard.len() % 4 != 0 {
            standard.push('=');
        }

        let bytes = STANDARD.decode(standard.as_bytes()).map_err(|e| PushError::InvalidKey(e.to_string()))?;

        if bytes.len() != UNCOMPRESSED_P256_LEN || bytes[0] != UNCOMPRESSED_POINT_TAG {
            return Err(PushError::InvalidKey(format!(
                "expected {UNCOMPRESSED_P256_LEN} byte uncompressed point, got {} bytes",
                bytes.len()
            )));
        }

        Ok(Self(bytes))
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscribeOptions {
    /// Always true: every push must surface a visible notification.
    pub user_visible_only: bool,
    pub application_server_key: ApplicationServerKey,
}

impl SubscribeOptions {
    #[must_use]
    pub const fn new(application_server_key: ApplicationServerKey) -> Self {
        Self { user_visible_only: true, application_server_key }
    }
}
