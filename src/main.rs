#![forbid(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::todo)]
#![warn(clippy::panic)]
#![warn(clippy::dbg_macro)]
#![warn(clippy::print_stdout)]
#![warn(clippy::print_stderr)]
#![warn(clippy::clone_on_ref_ptr)]
#![warn(unreachable_pub)]
#![warn(missing_debug_implementations)]
#![warn(unused_qualifications)]
#![deny(unused_must_use)]

//! Local simulator: runs the page-side enable flow against the configured CRM API, then
//! feeds stdin lines to the background worker as push payloads (an empty line is a push
//! without payload).

use crm_push::adapters::crm_api::HttpSubscriptionApi;
use crm_push::adapters::platform::{InMemoryPlatform, InMemoryWorkerScope, RecordingAlerts};
use crm_push::adapters::storage::MemoryStorage;
use crm_push::config::Config;
use crm_push::domain::SwStatus;
use crm_push::services::{RegistrationService, StatusObserver};
use crm_push::telemetry;
use crm_push::workers::{NotificationWorker, PushEvent, WorkerEvent};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, watch};
use tracing::Instrument;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load();
    let telemetry_guard = telemetry::init_telemetry(&config.telemetry)?;

    // Phase 1: Page side
    let platform = Arc::new(InMemoryPlatform::new());
    let storage = Arc::new(MemoryStorage::new());
    if let Some(token) = &config.auth_token {
        storage.set(&config.api.token_storage_key, token);
    }
    let registration = RegistrationService::new(
        Arc::clone(&platform) as _,
        Arc::new(HttpSubscriptionApi::new(&config.api.base_url)?),
        storage,
        Arc::new(RecordingAlerts::new()),
        &config.api,
        &config.worker,
    )?;

    let mut observer = StatusObserver::mount(registration).instrument(tracing::info_span!("status_observer")).await;
    tracing::info!(status = ?observer.status(), "Notification status");
    if observer.status() == SwStatus::Inactive {
        let status = observer.enable().instrument(tracing::info_span!("enable_notifications")).await;
        tracing::info!(?status, "Notification status after enable");
    }

    // Phase 2: Worker side
    let scope = Arc::new(InMemoryWorkerScope::new());
    let worker = NotificationWorker::new(Arc::clone(&scope) as _, &config.worker);
    let (event_tx, event_rx) = mpsc::channel(config.worker.event_buffer_size);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker_task =
        tokio::spawn(worker.run(event_rx, shutdown_rx).instrument(tracing::info_span!("notification_worker")));

    event_tx.send(WorkerEvent::Install).await?;
    event_tx.send(WorkerEvent::Activate).await?;

    // Phase 3: Feed pushes until EOF or Ctrl-C
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let event = if line.trim().is_empty() { PushEvent::empty() } else { PushEvent::with_data(line) };
                event_tx.send(WorkerEvent::Push(event)).await?;
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted, shutting down");
                let _ = shutdown_tx.send(true);
                break;
            }
        }
    }

    // Closing the queue lets the worker finish what is already queued.
    drop(event_tx);
    worker_task.await?;

    for notification in scope.notifications() {
        tracing::info!(
            title = %notification.title,
            body = %notification.options.body,
            tag = %notification.options.tag,
            url = %notification.target_url(),
            "On screen"
        );
    }

    telemetry_guard.shutdown();
    Ok(())
}
