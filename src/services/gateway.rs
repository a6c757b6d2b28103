//! gateway.rs
//!
//! Client for the checkout gateway (Mercado Pago Checkout Pro API).
//!
//! 1.  **CircuitBreaker**: stops hammering the gateway after repeated transport
//!     or 5xx failures. Once the cool-down ends exactly one trial call is
//!     admitted; everyone else is rejected until that call settles.
//! 2.  **MercadoPagoClient**: creates checkout preferences (the redirect target
//!     for a booking) and looks up payments by id. Every call goes through the
//!     breaker. Nothing is retried.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::{CircuitBreakerConfig, MercadoPagoConfig};

/// Breaker states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Normal operation, calls pass.
    Closed,
    /// Too many consecutive failures; calls are rejected until the timeout.
    Open,
    /// Timeout elapsed; one trial call is in flight.
    HalfOpen,
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    failure_count: u32,
    opened_at: Option<Instant>,
    /// Start of the admitted half-open call, if one is outstanding.
    trial_started: Option<Instant>,
}

#[derive(Debug)]
pub struct CircuitBreaker {
    inner: Mutex<BreakerInner>,
    failure_threshold: u32,
    timeout_duration: Duration,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, timeout: Duration) -> Self {
        Self {
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                failure_count: 0,
                opened_at: None,
                trial_started: None,
            }),
            failure_threshold: failure_threshold.max(1),
            timeout_duration: timeout,
        }
    }

    fn lock(&self) -> MutexGuard<'_, BreakerInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Whether the next call may go out. Moves Open -> HalfOpen once the
    /// timeout has elapsed and hands the trial slot to that caller only.
    pub fn can_execute(&self) -> bool {
        let mut inner = self.lock();
        match inner.state {
            CircuitState::Closed => true,
            CircuitState::HalfOpen => {
                // A trial whose caller went away frees the slot after another timeout.
                let busy = inner
                    .trial_started
                    .is_some_and(|at| at.elapsed() < self.timeout_duration);
                if busy {
                    return false;
                }
                inner.trial_started = Some(Instant::now());
                true
            }
            CircuitState::Open => {
                let elapsed = inner
                    .opened_at
                    .map(|at| at.elapsed() >= self.timeout_duration)
                    .unwrap_or(true);
                if elapsed {
                    inner.state = CircuitState::HalfOpen;
                    inner.trial_started = Some(Instant::now());
                    info!("Circuit breaker transitioning to HalfOpen state");
                }
                elapsed
            }
        }
    }

    pub fn record_success(&self) {
        let mut inner = self.lock();
        if inner.state == CircuitState::HalfOpen {
            info!("Circuit breaker recovered - transitioning to Closed state");
        }
        inner.state = CircuitState::Closed;
        inner.failure_count = 0;
        inner.opened_at = None;
        inner.trial_started = None;
    }

    pub fn record_failure(&self) {
        let mut inner = self.lock();
        inner.failure_count += 1;
        inner.trial_started = None;
        match inner.state {
            CircuitState::Closed if inner.failure_count >= self.failure_threshold => {
                inner.state = CircuitState::Open;
                inner.opened_at = Some(Instant::now());
                error!(
                    "Circuit breaker OPENED - {} failures reached threshold {}",
                    inner.failure_count, self.failure_threshold
                );
            }
            CircuitState::HalfOpen => {
                inner.state = CircuitState::Open;
                inner.opened_at = Some(Instant::now());
                warn!("Circuit breaker trial call failed - returning to Open state");
            }
            _ => {}
        }
    }

    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    pub fn failure_count(&self) -> u32 {
        self.lock().failure_count
    }
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("circuit breaker is open - payment gateway temporarily unavailable")]
    CircuitOpen,
    #[error("payment gateway transport error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("payment gateway rejected the request with status {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("payment gateway response has no checkout URL")]
    MissingInitPoint,
}

// --- Gateway API models ---

#[derive(Debug, Serialize)]
struct PreferenceItem {
    title: String,
    quantity: u32,
    unit_price: f64,
    currency_id: String,
}

#[derive(Debug, Serialize)]
struct PreferencePayer {
    name: String,
    email: String,
}

#[derive(Debug, Serialize)]
struct BackUrls {
    success: String,
    failure: String,
    pending: String,
}

#[derive(Debug, Serialize)]
struct PreferenceRequest {
    items: Vec<PreferenceItem>,
    payer: PreferencePayer,
    back_urls: BackUrls,
    auto_return: &'static str,
    external_reference: String,
    statement_descriptor: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    notification_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PreferenceResponse {
    id: String,
    init_point: Option<String>,
    sandbox_init_point: Option<String>,
}

/// What the caller wants to charge for.
#[derive(Debug, Clone)]
pub struct PreferenceParams {
    pub booking_id: Uuid,
    pub title: String,
    pub amount: f64,
    pub payer_email: String,
    pub payer_name: String,
}

/// A created checkout session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Preference {
    pub id: String,
    pub init_point: String,
}

/// Payment as reported by the gateway's payments endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayPayment {
    pub id: i64,
    pub status: Option<String>,
    pub status_detail: Option<String>,
    pub transaction_amount: Option<f64>,
    pub currency_id: Option<String>,
    pub external_reference: Option<String>,
    pub payment_method_id: Option<String>,
    pub payment_type_id: Option<String>,
    pub date_created: Option<String>,
    pub date_approved: Option<String>,
}

#[derive(Clone)]
pub struct MercadoPagoClient {
    access_token: String,
    public_key: String,
    base_url: String,
    currency: String,
    statement_descriptor: String,
    success_url: String,
    failure_url: String,
    pending_url: String,
    notification_url: Option<String>,
    http_client: reqwest::Client,
    circuit_breaker: Arc<CircuitBreaker>,
}

impl MercadoPagoClient {
    pub fn from_config(
        config: &MercadoPagoConfig,
        breaker: &CircuitBreakerConfig,
    ) -> Result<Self, GatewayError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            access_token: config.access_token.clone(),
            public_key: config.public_key.clone(),
            base_url: config.api_url.trim_end_matches('/').to_string(),
            currency: config.currency.clone(),
            statement_descriptor: config.statement_descriptor.clone(),
            success_url: config.success_url.clone(),
            failure_url: config.failure_url.clone(),
            pending_url: config.pending_url.clone(),
            notification_url: config.notification_url.clone(),
            http_client,
            circuit_breaker: Arc::new(CircuitBreaker::new(
                breaker.failure_threshold,
                Duration::from_secs(breaker.timeout_seconds),
            )),
        })
    }

    pub fn public_key(&self) -> &str {
        &self.public_key
    }

    pub fn circuit_state(&self) -> (CircuitState, u32) {
        (
            self.circuit_breaker.state(),
            self.circuit_breaker.failure_count(),
        )
    }

    /// Sends a request through the breaker. Transport errors and 5xx count as
    /// gateway failures; any other answer, 4xx included, proves it is up.
    async fn execute(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, GatewayError> {
        if !self.circuit_breaker.can_execute() {
            warn!("Circuit breaker is OPEN - blocking payment gateway request");
            return Err(GatewayError::CircuitOpen);
        }

        let response = match request.bearer_auth(&self.access_token).send().await {
            Ok(response) => response,
            Err(e) => {
                error!("Payment gateway request failed: {:?}", e);
                self.circuit_breaker.record_failure();
                return Err(GatewayError::Http(e));
            }
        };

        let status = response.status();
        if status.is_server_error() {
            self.circuit_breaker.record_failure();
        } else {
            // 2xx and 4xx both mean the gateway is up
            self.circuit_breaker.record_success();
        }
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        error!("Payment gateway returned {}: {}", status, body);
        Err(GatewayError::Rejected {
            status: status.as_u16(),
            body,
        })
    }

    /// Creates a checkout preference for a booking. The booking id travels as
    /// `external_reference` and comes back on the redirect. No idempotency
    /// key is sent, so calling twice yields two unrelated preferences.
    pub async fn create_preference(&self, params: &PreferenceParams) -> Result<Preference, GatewayError> {
        let request = PreferenceRequest {
            items: vec![PreferenceItem {
                title: params.title.clone(),
                quantity: 1,
                unit_price: params.amount,
                currency_id: self.currency.clone(),
            }],
            payer: PreferencePayer {
                name: params.payer_name.clone(),
                email: params.payer_email.clone(),
            },
            back_urls: BackUrls {
                success: self.success_url.clone(),
                failure: self.failure_url.clone(),
                pending: self.pending_url.clone(),
            },
            auto_return: "approved",
            external_reference: params.booking_id.to_string(),
            statement_descriptor: self.statement_descriptor.clone(),
            notification_url: self.notification_url.clone(),
        };

        info!(
            "Creating payment preference: booking_id={}, amount={}, currency={}",
            params.booking_id, params.amount, self.currency
        );

        let response = self
            .execute(
                self.http_client
                    .post(format!("{}/checkout/preferences", self.base_url))
                    .json(&request),
            )
            .await?;
        let body: PreferenceResponse = response.json().await?;

        let init_point = body
            .init_point
            .or(body.sandbox_init_point)
            .ok_or(GatewayError::MissingInitPoint)?;

        info!("Preference {} created for booking {}", body.id, params.booking_id);
        Ok(Preference {
            id: body.id,
            init_point,
        })
    }

    pub async fn payment_info(&self, payment_id: u64) -> Result<GatewayPayment, GatewayError> {
        info!("Fetching payment {} from gateway", payment_id);
        let response = self
            .execute(
                self.http_client
                    .get(format!("{}/v1/payments/{}", self.base_url, payment_id)),
            )
            .await?;
        Ok(response.json::<GatewayPayment>().await?)
    }
}

#[cfg(test)]
pub(crate) fn test_client(base_url: &str, failure_threshold: u32) -> MercadoPagoClient {
    let config = MercadoPagoConfig {
        access_token: "TEST-token".to_string(),
        public_key: "TEST-public".to_string(),
        api_url: base_url.to_string(),
        currency: "ARS".to_string(),
        statement_descriptor: "BIKERS MTB".to_string(),
        success_url: "http://localhost:8000/api/payments/success".to_string(),
        failure_url: "http://localhost:8000/api/payments/failure".to_string(),
        pending_url: "http://localhost:8000/api/payments/pending".to_string(),
        notification_url: None,
        timeout_seconds: 5,
    };
    let breaker = CircuitBreakerConfig {
        failure_threshold,
        timeout_seconds: 60,
    };
    MercadoPagoClient::from_config(&config, &breaker).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn params(booking_id: Uuid) -> PreferenceParams {
        PreferenceParams {
            booking_id,
            title: "Reserva: Travesía Cerro Catedral".to_string(),
            amount: 15000.0,
            payer_email: "rider@example.com".to_string(),
            payer_name: "Rider".to_string(),
        }
    }

    #[test]
    fn breaker_opens_at_threshold_and_admits_one_call_after_timeout() {
        let breaker = CircuitBreaker::new(2, Duration::from_millis(200));
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Closed);
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Open);
        assert!(!breaker.can_execute());

        std::thread::sleep(Duration::from_millis(250));
        assert!(breaker.can_execute());
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
        assert!(!breaker.can_execute(), "only one call while half-open");

        breaker.record_success();
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert_eq!(breaker.failure_count(), 0);
    }

    #[test]
    fn failed_half_open_call_reopens_the_breaker() {
        let breaker = CircuitBreaker::new(1, Duration::from_millis(100));
        breaker.record_failure();
        std::thread::sleep(Duration::from_millis(150));

        assert!(breaker.can_execute());
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Open);
        assert!(!breaker.can_execute());
    }

    #[test]
    fn abandoned_half_open_call_frees_the_slot_after_timeout() {
        let breaker = CircuitBreaker::new(1, Duration::from_millis(100));
        breaker.record_failure();
        std::thread::sleep(Duration::from_millis(150));

        assert!(breaker.can_execute());
        assert!(!breaker.can_execute());
        std::thread::sleep(Duration::from_millis(150));
        assert!(breaker.can_execute());
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
    }

    #[test]
    fn open_breaker_blocks_until_timeout() {
        let breaker = CircuitBreaker::new(1, Duration::from_secs(3600));
        breaker.record_failure();
        assert!(!breaker.can_execute());
        assert_eq!(breaker.state(), CircuitState::Open);
    }

    #[tokio::test]
    async fn preference_carries_booking_reference_and_back_urls() {
        let server = MockServer::start().await;
        let booking_id = Uuid::new_v4();

        Mock::given(method("POST"))
            .and(path("/checkout/preferences"))
            .and(header("authorization", "Bearer TEST-token"))
            .and(body_partial_json(json!({
                "external_reference": booking_id.to_string(),
                "auto_return": "approved",
                "statement_descriptor": "BIKERS MTB",
                "items": [{ "quantity": 1, "unit_price": 15000.0, "currency_id": "ARS" }],
                "back_urls": {
                    "success": "http://localhost:8000/api/payments/success",
                    "failure": "http://localhost:8000/api/payments/failure",
                    "pending": "http://localhost:8000/api/payments/pending"
                }
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": "123-pref",
                "init_point": "https://www.mercadopago.com.ar/checkout/v1/redirect?pref_id=123-pref"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server.uri(), 5);
        let preference = client.create_preference(&params(booking_id)).await.unwrap();

        assert_eq!(preference.id, "123-pref");
        assert!(preference.init_point.ends_with("pref_id=123-pref"));
    }

    #[tokio::test]
    async fn sandbox_init_point_is_used_when_production_one_is_missing() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/checkout/preferences"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": "sandbox-pref",
                "sandbox_init_point": "https://sandbox.mercadopago.com.ar/checkout?pref_id=sandbox-pref"
            })))
            .mount(&server)
            .await;

        let client = test_client(&server.uri(), 5);
        let preference = client.create_preference(&params(Uuid::new_v4())).await.unwrap();
        assert!(preference.init_point.contains("sandbox"));
    }

    #[tokio::test]
    async fn client_errors_are_reported_without_tripping_the_breaker() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/checkout/preferences"))
            .respond_with(ResponseTemplate::new(400).set_body_string("invalid unit_price"))
            .mount(&server)
            .await;

        let client = test_client(&server.uri(), 1);
        let err = client.create_preference(&params(Uuid::new_v4())).await.unwrap_err();

        assert!(matches!(err, GatewayError::Rejected { status: 400, .. }));
        assert_eq!(client.circuit_state().0, CircuitState::Closed);
    }

    #[tokio::test]
    async fn repeated_server_errors_open_the_circuit() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/payments/42"))
            .respond_with(ResponseTemplate::new(503))
            .expect(2)
            .mount(&server)
            .await;

        let client = test_client(&server.uri(), 2);
        for _ in 0..2 {
            let err = client.payment_info(42).await.unwrap_err();
            assert!(matches!(err, GatewayError::Rejected { status: 503, .. }));
        }

        let err = client.payment_info(42).await.unwrap_err();
        assert!(matches!(err, GatewayError::CircuitOpen));
        assert_eq!(client.circuit_state(), (CircuitState::Open, 2));
    }

    #[tokio::test]
    async fn payment_info_is_parsed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/payments/987654"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 987654,
                "status": "approved",
                "status_detail": "accredited",
                "transaction_amount": 15000.0,
                "currency_id": "ARS",
                "external_reference": "b7d1c0de-0000-4000-8000-000000000000",
                "payment_method_id": "visa",
                "payment_type_id": "credit_card"
            })))
            .mount(&server)
            .await;

        let client = test_client(&server.uri(), 5);
        let payment = client.payment_info(987654).await.unwrap();
        assert_eq!(payment.id, 987654);
        assert_eq!(payment.status.as_deref(), Some("approved"));
        assert_eq!(payment.transaction_amount, Some(15000.0));
        assert!(payment.date_approved.is_none());
    }
}
