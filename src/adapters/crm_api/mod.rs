use crate::domain::PushSubscription;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod http;

pub use http::HttpSubscriptionApi;

pub const SUBSCRIBE_PATH: &str = "/api/notifications/subscribe";

#[derive(Debug, Serialize, Deserialize)]
pub struct SubscribeRequest {
    pub subscription: PushSubscription,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification_sent: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// The CRM endpoint that stores push subscriptions per user.
#[async_trait]
pub trait SubscriptionApi: Send + Sync + std::fmt::Debug {
    /// Uploads `subscription` on behalf of the user owning `token`.
    ///
    /// # Errors
    /// Returns `PushError::Transport` if the request cannot be sent, or `PushError::Server`
    /// if the response is not a recognizable acknowledgment.
    async fn upload(&self, subscription: &PushSubscription, token: &str) -> Result<SubscribeResponse>;
}
