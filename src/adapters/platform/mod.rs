//! Seams to the hosting browser.
//!
//! `PushPlatform` is what a page sees (permissions, worker registry, push manager),
//! `WorkerScope` is what the background worker sees (its own lifecycle, the
//! notification surface and the open windows).

use crate::domain::{
    NotificationOptions, Permission, PushSubscription, ShownNotification, SubscribeOptions, WorkerRegistration,
};
use crate::error::PlatformError;
use async_trait::async_trait;

pub mod memory;

pub use memory::{InMemoryPlatform, InMemoryWorkerScope, RecordingAlerts};

#[async_trait]
pub trait PushPlatform: Send + Sync + std::fmt::Debug {
    /// Whether workers, push messaging and notifications are all available.
    fn supports_push(&self) -> bool;

    async fn permission(&self) -> Permission;

    /// Prompts the user. May never resolve if the prompt is left open.
    async fn request_permission(&self) -> Permission;

    async fn registration(&self, scope: &str) -> Result<Option<WorkerRegistration>, PlatformError>;

    /// Installs the worker script for `scope`. Registering an existing scope returns the
    /// existing registration.
    async fn register(&self, script_url: &str, scope: &str) -> Result<WorkerRegistration, PlatformError>;

    /// Resolves once the registration for `scope` has an active worker.
    async fn ready(&self, scope: &str) -> Result<WorkerRegistration, PlatformError>;

    async fn subscription(&self, registration: &WorkerRegistration) -> Result<Option<PushSubscription>, PlatformError>;

    async fn subscribe(
        &self,
        registration: &WorkerRegistration,
        options: &SubscribeOptions,
    ) -> Result<PushSubscription, PlatformError>;
}

/// An open application window controlled (or controllable) by the worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowClient {
    pub id: String,
    pub url: String,
    pub focused: bool,
}

#[async_trait]
pub trait WorkerScope: Send + Sync + std::fmt::Debug {
    /// Activates this worker without waiting for pages on the old one to close.
    async fn skip_waiting(&self) -> Result<(), PlatformError>;

    /// Takes control of every open window without a reload.
    async fn claim_clients(&self) -> Result<(), PlatformError>;

    async fn show_notification(&self, title: &str, options: &NotificationOptions) -> Result<(), PlatformError>;

    async fn close_notification(&self, notification: &ShownNotification) -> Result<(), PlatformError>;

    async fn window_clients(&self) -> Result<Vec<WindowClient>, PlatformError>;

    async fn focus(&self, client_id: &str) -> Result<(), PlatformError>;

    async fn open_window(&self, url: &str) -> Result<(), PlatformError>;
}

/// User-facing alert surface of the page.
pub trait AlertSink: Send + Sync + std::fmt::Debug {
    fn alert(&self, message: &str);
}
