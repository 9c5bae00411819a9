#![allow(dead_code, unreachable_pub)]

use axum::{
    Json, Router,
    extract::State,
    http::{
        HeaderMap, StatusCode,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    response::{IntoResponse, Response},
    routing::post,
};
use crm_push::adapters::crm_api::HttpSubscriptionApi;
use crm_push::adapters::platform::{InMemoryPlatform, RecordingAlerts};
use crm_push::adapters::storage::MemoryStorage;
use crm_push::config::{ApiConfig, WorkerConfig};
use crm_push::services::RegistrationService;
use serde_json::Value;
use std::sync::{Arc, Mutex, Once};

static INIT: Once = Once::new();

pub fn setup_tracing() {
    INIT.call_once(|| {
        let mut filter =
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into());
        for directive in ["crm_push=debug", "hyper=warn", "reqwest=warn"] {
            filter = filter.add_directive(directive.parse().unwrap());
        }
        let _ = tracing_subscriber::fmt().with_env_filter(filter).with_test_writer().try_init();
    });
}

#[derive(Debug, Clone)]
pub struct RecordedUpload {
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub body: Value,
}

#[derive(Clone)]
struct FakeCrmState {
    status: StatusCode,
    reply: Option<Value>,
    uploads: Arc<Mutex<Vec<RecordedUpload>>>,
}

async fn subscribe_handler(State(state): State<FakeCrmState>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    let header = |name: axum::http::HeaderName| headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_string);
    state.uploads.lock().unwrap().push(RecordedUpload {
        authorization: header(AUTHORIZATION),
        content_type: header(CONTENT_TYPE),
        body,
    });
    match state.reply {
        Some(reply) => (state.status, Json(reply)).into_response(),
        None => (state.status, "upstream unavailable").into_response(),
    }
}

/// In-process stand-in for the CRM subscription endpoint.
#[derive(Debug)]
pub struct FakeCrm {
    pub base_url: String,
    uploads: Arc<Mutex<Vec<RecordedUpload>>>,
}

impl FakeCrm {
    /// Answers every upload with `status` and `reply` (plain text when `reply` is `None`).
    pub async fn start(status: StatusCode, reply: Option<Value>) -> Self {
        let uploads = Arc::new(Mutex::new(Vec::new()));
        let state = FakeCrmState { status, reply, uploads: Arc::clone(&uploads) };
        let app = Router::new().route("/api/notifications/subscribe", post(subscribe_handler)).with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url: format!("http://{addr}"), uploads }
    }

    pub fn uploads(&self) -> Vec<RecordedUpload> {
        self.uploads.lock().unwrap().clone()
    }
}

#[derive(Debug)]
pub struct TestClient {
    pub platform: Arc<InMemoryPlatform>,
    pub storage: Arc<MemoryStorage>,
    pub alerts: Arc<RecordingAlerts>,
    pub service: RegistrationService,
}

/// Page-side wiring against `base_url`, with a token already in storage.
pub fn test_client(base_url: &str) -> TestClient {
    setup_tracing();
    let platform = Arc::new(InMemoryPlatform::new());
    let storage = Arc::new(MemoryStorage::new());
    storage.set("token", "test-jwt");
    let alerts = Arc::new(RecordingAlerts::new());
    let http = reqwest::Client::builder().no_proxy().build().unwrap();
    let api = Arc::new(HttpSubscriptionApi::with_client(http, base_url));

    let service = RegistrationService::new(
        Arc::clone(&platform) as _,
        api,
        Arc::clone(&storage) as _,
        Arc::clone(&alerts) as _,
        &ApiConfig { base_url: base_url.to_string(), ..ApiConfig::default() },
        &WorkerConfig::default(),
    )
    .unwrap();

    TestClient { platform, storage, alerts, service }
}
