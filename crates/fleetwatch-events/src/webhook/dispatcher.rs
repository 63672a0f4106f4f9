//! Webhook dispatcher — delivers events to registered endpoints with
//! SSRF validation, HMAC signing, and bounded retries.
//!
//! Registrations are read fresh from storage on every dispatch so edits
//! take effect immediately. Every attempt, success or failure, appends
//! exactly one delivery-log row. Failures never propagate to the event
//! producer.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};
use uuid::Uuid;

use fleetwatch_core::config::webhook::WebhookConfig;
use fleetwatch_core::error::AppError;
use fleetwatch_core::result::AppResult;
use fleetwatch_entity::event::Event;
use fleetwatch_entity::webhook::delivery::{CreateDeliveryLogEntry, DeliveryStatus};
use fleetwatch_entity::webhook::model::Webhook;
use fleetwatch_security::ssrf::validate_url;

use crate::store::WebhookStore;

use super::signature::sign_payload;

/// Header carrying the event type.
const HEADER_EVENT: &str = "X-FleetWatch-Event";
/// Header carrying the event id.
const HEADER_DELIVERY: &str = "X-FleetWatch-Delivery";
/// Header carrying the payload signature.
const HEADER_SIGNATURE: &str = "X-FleetWatch-Signature";

/// Delivers events to all interested webhook registrations.
#[derive(Clone)]
pub struct WebhookDispatcher {
    store: Arc<dyn WebhookStore>,
    client: reqwest::Client,
    config: WebhookConfig,
    backoff_base: Duration,
}

impl WebhookDispatcher {
    /// Build a dispatcher over the given store.
    pub fn new(store: Arc<dyn WebhookStore>, config: WebhookConfig) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("fleetwatch-webhook/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::internal(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            store,
            client,
            config,
            backoff_base: Duration::from_secs(1),
        })
    }

    /// Override the backoff base so retry tests run without real sleeps.
    #[cfg(test)]
    fn with_backoff_base(mut self, base: Duration) -> Self {
        self.backoff_base = base;
        self
    }

    /// Dispatch one event to every enabled, interest-matching webhook.
    ///
    /// Each webhook is delivered on its own task so one endpoint's backoff
    /// never blocks another. Returns immediately after spawning.
    pub async fn dispatch(&self, event: &Event) {
        let webhooks = match self.store.find_enabled().await {
            Ok(webhooks) => webhooks,
            Err(e) => {
                error!(error = %e, "failed to load webhooks; event not delivered");
                return;
            }
        };

        for webhook in webhooks
            .into_iter()
            .filter(|w| w.is_interested_in(&event.event_type))
        {
            let dispatcher = self.clone();
            let event = event.clone();
            tokio::spawn(async move {
                dispatcher.deliver(&webhook, &event).await;
            });
        }
    }

    /// Deliver one event to one webhook, with validation and retries.
    pub async fn deliver(&self, webhook: &Webhook, event: &Event) {
        // URL safety is re-checked on every delivery: webhooks are editable.
        if let Err(reason) = validate_url(&webhook.url, self.config.allow_private_networks) {
            warn!(
                webhook_id = %webhook.id,
                url = %webhook.url,
                reason = %reason,
                "webhook URL rejected"
            );
            self.record(CreateDeliveryLogEntry {
                webhook_id: webhook.id,
                event_id: event.event_id,
                event_type: event.event_type.clone(),
                status: DeliveryStatus::Failed,
                status_code: None,
                response_body: None,
                error: Some(format!("SSRF protection: {reason}")),
                attempt: 1,
            })
            .await;
            return;
        }

        let payload = match serde_json::to_vec(event) {
            Ok(payload) => payload,
            Err(e) => {
                error!(event_id = %event.event_id, error = %e, "event serialization failed");
                return;
            }
        };
        let signature = webhook
            .secret
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(|secret| sign_payload(secret, &payload));

        let retry_max = if webhook.retry_max > 0 {
            webhook.retry_max as u32
        } else {
            self.config.default_retry_max
        }
        .max(1);
        let timeout = Duration::from_secs(if webhook.timeout_seconds > 0 {
            webhook.timeout_seconds as u64
        } else {
            self.config.default_timeout_seconds
        });

        for attempt in 1..=retry_max {
            let outcome = self
                .attempt_delivery(webhook, event, &payload, signature.as_deref(), timeout)
                .await;

            match outcome {
                AttemptOutcome::Success { status_code, body } => {
                    self.record(CreateDeliveryLogEntry {
                        webhook_id: webhook.id,
                        event_id: event.event_id,
                        event_type: event.event_type.clone(),
                        status: DeliveryStatus::Success,
                        status_code: Some(status_code),
                        response_body: Some(body),
                        error: None,
                        attempt: attempt as i32,
                    })
                    .await;
                    self.touch(webhook.id).await;
                    info!(
                        webhook_id = %webhook.id,
                        event_type = %event.event_type,
                        attempt,
                        "webhook delivered"
                    );
                    return;
                }
                AttemptOutcome::Rejected { status_code, body } => {
                    // Client errors are not transient; retrying cannot help.
                    warn!(
                        webhook_id = %webhook.id,
                        status_code,
                        "webhook rejected the delivery"
                    );
                    self.record(CreateDeliveryLogEntry {
                        webhook_id: webhook.id,
                        event_id: event.event_id,
                        event_type: event.event_type.clone(),
                        status: DeliveryStatus::Failed,
                        status_code: Some(status_code),
                        response_body: Some(body),
                        error: Some(format!("endpoint returned {status_code}")),
                        attempt: attempt as i32,
                    })
                    .await;
                    return;
                }
                AttemptOutcome::Transient {
                    status_code,
                    body,
                    error,
                } => {
                    let exhausted = attempt == retry_max;
                    self.record(CreateDeliveryLogEntry {
                        webhook_id: webhook.id,
                        event_id: event.event_id,
                        event_type: event.event_type.clone(),
                        status: if exhausted {
                            DeliveryStatus::Failed
                        } else {
                            DeliveryStatus::Retrying
                        },
                        status_code,
                        response_body: body,
                        error: Some(error.clone()),
                        attempt: attempt as i32,
                    })
                    .await;

                    if exhausted {
                        warn!(
                            webhook_id = %webhook.id,
                            event_type = %event.event_type,
                            attempts = retry_max,
                            error = %error,
                            "webhook delivery gave up"
                        );
                        return;
                    }

                    let backoff = self.backoff_delay(attempt);
                    debug!(
                        webhook_id = %webhook.id,
                        attempt,
                        backoff_seconds = backoff.as_secs_f64(),
                        "webhook delivery will retry"
                    );
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }

    async fn attempt_delivery(
        &self,
        webhook: &Webhook,
        event: &Event,
        payload: &[u8],
        signature: Option<&str>,
        timeout: Duration,
    ) -> AttemptOutcome {
        let mut request = self
            .client
            .post(&webhook.url)
            .header("Content-Type", "application/json")
            .header(HEADER_EVENT, event.event_type.as_str())
            .header(HEADER_DELIVERY, event.event_id.to_string())
            .timeout(timeout)
            .body(payload.to_vec());
        if let Some(signature) = signature {
            request = request.header(HEADER_SIGNATURE, signature);
        }

        match request.send().await {
            Ok(response) => {
                let status = response.status();
                let status_code = i32::from(status.as_u16());
                let body = truncate_body(
                    response.text().await.unwrap_or_default(),
                    self.config.response_body_limit,
                );

                if status.is_success() {
                    AttemptOutcome::Success { status_code, body }
                } else if status.is_client_error() {
                    AttemptOutcome::Rejected { status_code, body }
                } else {
                    AttemptOutcome::Transient {
                        status_code: Some(status_code),
                        body: Some(body),
                        error: format!("endpoint returned {status_code}"),
                    }
                }
            }
            Err(e) => AttemptOutcome::Transient {
                status_code: None,
                body: None,
                error: format!("request failed: {e}"),
            },
        }
    }

    /// Backoff before the next attempt: base * 2^(attempt-1), with the
    /// exponent capped so a huge configured retry count cannot overflow
    /// the shift.
    fn backoff_delay(&self, attempt: u32) -> Duration {
        self.backoff_base * (1u32 << (attempt - 1).min(16))
    }

    async fn record(&self, entry: CreateDeliveryLogEntry) {
        if let Err(e) = self.store.record_delivery(entry).await {
            error!(error = %e, "failed to record webhook delivery attempt");
        }
    }

    async fn touch(&self, webhook_id: Uuid) {
        if let Err(e) = self.store.touch_last_triggered(webhook_id).await {
            error!(webhook_id = %webhook_id, error = %e, "failed to update last-triggered time");
        }
    }
}

/// Result of one HTTP attempt.
enum AttemptOutcome {
    /// 2xx — done.
    Success { status_code: i32, body: String },
    /// 4xx — permanent, no retries.
    Rejected { status_code: i32, body: String },
    /// 5xx or transport error — retry if attempts remain.
    Transient {
        status_code: Option<i32>,
        body: Option<String>,
        error: String,
    },
}

/// Bound stored response bodies so hostile endpoints cannot bloat the log.
fn truncate_body(body: String, limit: usize) -> String {
    if body.chars().count() <= limit {
        body
    } else {
        body.chars().take(limit).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::Router;
    use axum::body::Bytes;
    use axum::extract::State;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use chrono::Utc;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct MemoryStore {
        webhooks: Mutex<Vec<Webhook>>,
        rows: Mutex<Vec<CreateDeliveryLogEntry>>,
        touched: Mutex<Vec<Uuid>>,
    }

    #[async_trait]
    impl WebhookStore for MemoryStore {
        async fn find_enabled(&self) -> AppResult<Vec<Webhook>> {
            Ok(self.webhooks.lock().unwrap().clone())
        }

        async fn record_delivery(&self, entry: CreateDeliveryLogEntry) -> AppResult<()> {
            self.rows.lock().unwrap().push(entry);
            Ok(())
        }

        async fn touch_last_triggered(&self, webhook_id: Uuid) -> AppResult<()> {
            self.touched.lock().unwrap().push(webhook_id);
            Ok(())
        }
    }

    fn test_webhook(url: String, secret: Option<&str>, event_types: Vec<String>) -> Webhook {
        Webhook {
            id: Uuid::new_v4(),
            name: "test".to_string(),
            url,
            secret: secret.map(str::to_string),
            enabled: true,
            event_types,
            retry_max: 3,
            timeout_seconds: 5,
            last_triggered_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn dispatcher(store: Arc<MemoryStore>, allow_private: bool) -> WebhookDispatcher {
        let config = WebhookConfig {
            allow_private_networks: allow_private,
            ..WebhookConfig::default()
        };
        WebhookDispatcher::new(store, config)
            .expect("dispatcher")
            .with_backoff_base(Duration::ZERO)
    }

    async fn spawn_server(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("serve");
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn server_errors_are_retried_until_exhaustion() {
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_handle = hits.clone();
        let router = Router::new().route(
            "/hook",
            post(move || {
                let hits = hits_handle.clone();
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    (StatusCode::INTERNAL_SERVER_ERROR, "boom")
                }
            }),
        );
        let base = spawn_server(router).await;

        let store = Arc::new(MemoryStore::default());
        let webhook = test_webhook(format!("{base}/hook"), None, vec![]);
        dispatcher(store.clone(), true)
            .deliver(&webhook, &Event::new("task.finished"))
            .await;

        assert_eq!(hits.load(Ordering::SeqCst), 3);
        let rows = store.rows.lock().unwrap();
        let statuses: Vec<DeliveryStatus> = rows.iter().map(|r| r.status).collect();
        assert_eq!(
            statuses,
            vec![
                DeliveryStatus::Retrying,
                DeliveryStatus::Retrying,
                DeliveryStatus::Failed,
            ]
        );
        let attempts: Vec<i32> = rows.iter().map(|r| r.attempt).collect();
        assert_eq!(attempts, vec![1, 2, 3]);
        assert!(rows.iter().all(|r| r.status_code == Some(500)));
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_handle = hits.clone();
        let router = Router::new().route(
            "/hook",
            post(move || {
                let hits = hits_handle.clone();
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    (StatusCode::NOT_FOUND, "gone")
                }
            }),
        );
        let base = spawn_server(router).await;

        let store = Arc::new(MemoryStore::default());
        let webhook = test_webhook(format!("{base}/hook"), None, vec![]);
        dispatcher(store.clone(), true)
            .deliver(&webhook, &Event::new("task.finished"))
            .await;

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        let rows = store.rows.lock().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, DeliveryStatus::Failed);
        assert_eq!(rows[0].status_code, Some(404));
        assert!(store.touched.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn success_records_one_row_and_touches_the_webhook() {
        let router = Router::new().route("/hook", post(|| async { (StatusCode::OK, "ok") }));
        let base = spawn_server(router).await;

        let store = Arc::new(MemoryStore::default());
        let webhook = test_webhook(format!("{base}/hook"), None, vec![]);
        dispatcher(store.clone(), true)
            .deliver(&webhook, &Event::new("alert.triggered"))
            .await;

        let rows = store.rows.lock().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, DeliveryStatus::Success);
        assert_eq!(rows[0].status_code, Some(200));
        assert_eq!(rows[0].response_body.as_deref(), Some("ok"));
        assert_eq!(*store.touched.lock().unwrap(), vec![webhook.id]);
    }

    #[tokio::test]
    async fn ssrf_rejection_aborts_before_any_network_call() {
        let store = Arc::new(MemoryStore::default());
        let webhook = test_webhook("http://169.254.169.254/hook".to_string(), None, vec![]);
        dispatcher(store.clone(), false)
            .deliver(&webhook, &Event::new("task.finished"))
            .await;

        let rows = store.rows.lock().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, DeliveryStatus::Failed);
        assert_eq!(rows[0].attempt, 1);
        assert!(
            rows[0]
                .error
                .as_deref()
                .unwrap_or_default()
                .starts_with("SSRF protection:")
        );
    }

    #[tokio::test]
    async fn payload_is_signed_when_a_secret_is_set() {
        #[derive(Default)]
        struct Captured {
            signature: Mutex<Option<String>>,
            body: Mutex<Vec<u8>>,
        }

        let captured = Arc::new(Captured::default());
        let router = Router::new()
            .route(
                "/hook",
                post(
                    |State(captured): State<Arc<Captured>>, headers: HeaderMap, body: Bytes| async move {
                        *captured.signature.lock().unwrap() = headers
                            .get(HEADER_SIGNATURE)
                            .and_then(|v| v.to_str().ok())
                            .map(str::to_string);
                        *captured.body.lock().unwrap() = body.to_vec();
                        StatusCode::OK
                    },
                ),
            )
            .with_state(captured.clone());
        let base = spawn_server(router).await;

        let store = Arc::new(MemoryStore::default());
        let webhook = test_webhook(format!("{base}/hook"), Some("s3cret"), vec![]);
        dispatcher(store.clone(), true)
            .deliver(&webhook, &Event::new("task.finished"))
            .await;

        let body = captured.body.lock().unwrap().clone();
        let signature = captured.signature.lock().unwrap().clone();
        assert!(!body.is_empty());
        assert_eq!(signature, Some(sign_payload("s3cret", &body)));
    }

    #[tokio::test]
    async fn dispatch_skips_uninterested_webhooks() {
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_handle = hits.clone();
        let router = Router::new().route(
            "/hook",
            post(move || {
                let hits = hits_handle.clone();
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    StatusCode::OK
                }
            }),
        );
        let base = spawn_server(router).await;

        let store = Arc::new(MemoryStore::default());
        {
            let mut webhooks = store.webhooks.lock().unwrap();
            webhooks.push(test_webhook(
                format!("{base}/hook"),
                None,
                vec!["task.finished".to_string()],
            ));
            webhooks.push(test_webhook(
                format!("{base}/hook"),
                None,
                vec!["alert.triggered".to_string()],
            ));
        }

        dispatcher(store.clone(), true)
            .dispatch(&Event::new("task.finished"))
            .await;

        // Deliveries run on spawned tasks; poll until the row lands.
        for _ in 0..100 {
            if !store.rows.lock().unwrap().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        let rows = store.rows.lock().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].event_type, "task.finished");
    }

    #[test]
    fn bodies_are_truncated_for_storage() {
        let long = "x".repeat(5000);
        assert_eq!(truncate_body(long, 1000).len(), 1000);
        assert_eq!(truncate_body("short".to_string(), 1000), "short");
    }

    #[test]
    fn backoff_doubles_per_attempt_and_caps_the_exponent() {
        let dispatcher =
            WebhookDispatcher::new(Arc::new(MemoryStore::default()), WebhookConfig::default())
                .expect("dispatcher");
        assert_eq!(dispatcher.backoff_delay(1), Duration::from_secs(1));
        assert_eq!(dispatcher.backoff_delay(2), Duration::from_secs(2));
        assert_eq!(dispatcher.backoff_delay(4), Duration::from_secs(8));
        // Past the cap the delay stops growing instead of overflowing.
        assert_eq!(dispatcher.backoff_delay(40), dispatcher.backoff_delay(17));
    }
}
