use thiserror::Error;

/// Alert shown when the browser refuses to store the worker or subscription.
pub const STORAGE_FAILURE_MESSAGE: &str = "Notifications could not be enabled because browser storage is full. \
     Please clear your browser cache for this site and reload the page.";

/// Alert shown for any other subscription failure.
pub const SUBSCRIPTION_FAILURE_MESSAGE: &str = "Could not enable notifications. Please try again later.";

/// Errors reported by the hosting platform (worker registry, push manager, notification surface).
#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("Storage quota exceeded: {0}")]
    Quota(String),
    #[error("Invalid state: {0}")]
    InvalidState(String),
    #[error("Platform error: {0}")]
    Other(#[from] anyhow::Error),
}

impl PlatformError {
    #[must_use]
    pub const fn is_quota(&self) -> bool {
        matches!(self, Self::Quota(_))
    }
}

#[derive(Error, Debug)]
pub enum PushError {
    #[error("Push messaging is not supported on this platform")]
    Unsupported,
    #[error("Browser storage error: {0}")]
    Storage(#[source] PlatformError),
    #[error("Subscription failed: {0}")]
    Subscription(#[source] PlatformError),
    #[error("Invalid application server key: {0}")]
    InvalidKey(String),
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Server responded with status {status}")]
    Server { status: u16 },
    #[error(transparent)]
    Platform(#[from] PlatformError),
}

pub type Result<T> = std::result::Result<T, PushError>;

impl PushError {
    /// Classifies a failed worker registration.
    #[must_use]
    pub fn from_registration(err: PlatformError) -> Self {
        if err.is_quota() { Self::Storage(err) } else { Self::Platform(err) }
    }

    /// Classifies a failed `subscribe` call on the push manager.
    #[must_use]
    pub fn from_subscribe(err: PlatformError) -> Self {
        if err.is_quota() { Self::Storage(err) } else { Self::Subscription(err) }
    }

    /// Text to show the user, for the error classes that warrant an alert.
    #[must_use]
    pub const fn user_message(&self) -> Option<&'static str> {
        match self {
            Self::Storage(_) => Some(STORAGE_FAILURE_MESSAGE),
            Self::Subscription(_) => Some(SUBSCRIPTION_FAILURE_MESSAGE),
            _ => None,
        }
    }
}
