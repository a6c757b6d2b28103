//! Transactional email through an EmailJS-compatible `email/send` endpoint.
//!
//! Mail is never on the critical path: `Notifier` spawns every send and only
//! logs the outcome. There is no delivery tracking or retry.

use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::EmailConfig;
use crate::models::BookingDetails;

#[derive(Debug, Error)]
pub enum EmailError {
    #[error("email transport error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("email API rejected the message with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    service_id: &'a str,
    template_id: &'a str,
    user_id: &'a str,
    #[serde(rename = "accessToken", skip_serializing_if = "Option::is_none")]
    access_token: Option<&'a str>,
    template_params: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Template {
    Welcome,
    BookingConfirmation,
    Checkin,
    PaymentConfirmation,
}

pub struct EmailClient {
    http: reqwest::Client,
    config: EmailConfig,
}

impl EmailClient {
    pub fn new(config: EmailConfig) -> Result<Self, EmailError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { http, config })
    }

    pub fn enabled(&self) -> bool {
        !self.config.service_id.trim().is_empty()
    }

    fn template_id(&self, template: Template) -> &str {
        let templates = &self.config.templates;
        match template {
            Template::Welcome => &templates.welcome,
            Template::BookingConfirmation => &templates.booking_confirmation,
            Template::Checkin => &templates.checkin,
            Template::PaymentConfirmation => &templates.payment_confirmation,
        }
    }

    /// Sends one templated message. A disabled client returns `Ok` without
    /// touching the network.
    pub async fn send(&self, template: Template, mut params: Value) -> Result<(), EmailError> {
        if !self.enabled() {
            debug!("Email disabled, skipping {:?}", template);
            return Ok(());
        }

        if let Some(map) = params.as_object_mut() {
            map.entry("app_name")
                .or_insert_with(|| Value::String(self.config.app_name.clone()));
        }

        let request = SendRequest {
            service_id: &self.config.service_id,
            template_id: self.template_id(template),
            user_id: &self.config.public_key,
            access_token: self.config.private_key.as_deref(),
            template_params: params,
        };

        let response = self.http.post(&self.config.api_url).json(&request).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmailError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

fn booking_params(details: &BookingDetails) -> Value {
    json!({
        "to_email": details.user_email,
        "to_name": details.display_name(),
        "booking_id": details.booking.id.to_string(),
        "event_title": details.event_title,
        "event_date": details.event_start_date.format("%d/%m/%Y %H:%M").to_string(),
        "meeting_point": details.event_meeting_point.clone().unwrap_or_default(),
        "participants": details.booking.participants_count,
        "total_amount": format!("{:.2}", details.booking.total_amount),
    })
}

/// Fire-and-forget facade over `EmailClient`.
#[derive(Clone)]
pub struct Notifier {
    client: Arc<EmailClient>,
}

impl Notifier {
    pub fn new(client: EmailClient) -> Self {
        Self {
            client: Arc::new(client),
        }
    }

    fn dispatch(&self, template: Template, params: Value) {
        if !self.client.enabled() {
            debug!("Email disabled, not sending {:?}", template);
            return;
        }
        let client = self.client.clone();
        tokio::spawn(async move {
            match client.send(template, params).await {
                Ok(()) => info!("{:?} email sent", template),
                Err(e) => warn!("{:?} email failed: {}", template, e),
            }
        });
    }

    pub fn welcome(&self, email: &str, full_name: Option<&str>) {
        self.dispatch(
            Template::Welcome,
            json!({
                "to_email": email,
                "to_name": full_name.unwrap_or(email),
            }),
        );
    }

    pub fn booking_confirmation(&self, details: &BookingDetails) {
        self.dispatch(Template::BookingConfirmation, booking_params(details));
    }

    pub fn checkin(&self, details: &BookingDetails) {
        self.dispatch(Template::Checkin, booking_params(details));
    }

    pub fn payment_confirmation(&self, details: &BookingDetails, transaction_id: &str) {
        let mut params = booking_params(details);
        params["transaction_id"] = Value::String(transaction_id.to_string());
        self.dispatch(Template::PaymentConfirmation, params);
    }
}

#[cfg(test)]
pub(crate) fn test_email_config(api_url: &str, service_id: &str) -> EmailConfig {
    use crate::config::EmailTemplates;
    EmailConfig {
        api_url: api_url.to_string(),
        service_id: service_id.to_string(),
        public_key: "public-key".to_string(),
        private_key: Some("private-key".to_string()),
        app_name: "BIKERS MTB".to_string(),
        templates: EmailTemplates {
            welcome: "tpl_welcome".to_string(),
            booking_confirmation: "tpl_booking".to_string(),
            checkin: "tpl_checkin".to_string(),
            payment_confirmation: "tpl_payment".to_string(),
        },
    }
}

/// Notifier that never sends anything.
#[cfg(test)]
pub(crate) fn disabled_notifier() -> Notifier {
    Notifier::new(EmailClient::new(test_email_config("http://127.0.0.1:9", "")).unwrap())
}

/// Notifier wired to a local mail endpoint that accepts every message.
#[cfg(test)]
pub(crate) async fn recording_notifier() -> (wiremock::MockServer, Notifier) {
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
        .mount(&server)
        .await;
    let config = test_email_config(
        &format!("{}/api/v1.0/email/send", server.uri()),
        "service_bikers",
    );
    (server, Notifier::new(EmailClient::new(config).unwrap()))
}

/// Request bodies received by the mail endpoint. Sends are spawned, so this
/// waits up to two seconds for `expected` of them to land.
#[cfg(test)]
pub(crate) async fn sent_emails(server: &wiremock::MockServer, expected: usize) -> Vec<Value> {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        let requests = server.received_requests().await.unwrap_or_default();
        if requests.len() >= expected || tokio::time::Instant::now() >= deadline {
            return requests
                .iter()
                .map(|r| serde_json::from_slice(&r.body).unwrap())
                .collect();
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

/// Gives spawned sends time to run, then returns what arrived.
#[cfg(test)]
pub(crate) async fn settled_emails(server: &wiremock::MockServer) -> Vec<Value> {
    tokio::time::sleep(Duration::from_millis(200)).await;
    sent_emails(server, 0).await
}
