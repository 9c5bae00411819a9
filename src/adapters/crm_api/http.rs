use super::{SUBSCRIBE_PATH, SubscribeRequest, SubscribeResponse, SubscriptionApi};
use crate::domain::PushSubscription;
use crate::error::{PushError, Result};
use async_trait::async_trait;

#[derive(Debug, Clone)]
pub struct HttpSubscriptionApi {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpSubscriptionApi {
    /// Builds a client for the API rooted at `base_url`.
    ///
    /// # Errors
    /// Returns an error if the underlying HTTP client cannot be constructed.
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self::with_client(client, base_url))
    }

    #[must_use]
    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        let endpoint = format!("{}{SUBSCRIBE_PATH}", base_url.trim_end_matches('/'));
        Self { client, endpoint }
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl SubscriptionApi for HttpSubscriptionApi {
    #[tracing::instrument(skip_all, fields(endpoint = %self.endpoint))]
    async fn upload(&self, subscription: &PushSubscription, token: &str) -> Result<SubscribeResponse> {
        let body = SubscribeRequest { subscription: subscription.clone() };
        let res = self.client.post(&self.endpoint).bearer_auth(token).json(&body).send().await?;

        let status = res.status();
        let bytes = res.bytes().await?;
        match serde_json::from_slice::<SubscribeResponse>(&bytes) {
            Ok(ack) => {
                tracing::debug!(status = status.as_u16(), success = ack.success, "Subscription upload acknowledged");
                Ok(ack)
            }
            Err(e) => {
                tracing::warn!(status = status.as_u16(), error = %e, "Unrecognized subscription upload response");
                Err(PushError::Server { status: status.as_u16() })
            }
        }
    }
}
