use std::time::Duration;

use async_trait::async_trait;
use budgetflow_core::config::NotificationConfig;
use budgetflow_core::notification::{Notification, NotificationError, Notifier};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::info;

/// Delivers notifications by POSTing them to a mail relay endpoint.
pub struct HttpNotifier {
    client: Client,
    endpoint: String,
    from_address: String,
    api_key: SecretString,
}

#[derive(Serialize)]
struct OutgoingMessage<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
}

impl HttpNotifier {
    pub fn new(
        endpoint: impl Into<String>,
        from_address: impl Into<String>,
        api_key: SecretString,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, endpoint: endpoint.into(), from_address: from_address.into(), api_key })
    }

    /// `None` when the config has no endpoint or key.
    pub fn from_config(config: &NotificationConfig) -> Result<Option<Self>, reqwest::Error> {
        let (Some(endpoint), Some(api_key)) = (&config.endpoint, &config.api_key) else {
            return Ok(None);
        };
        Self::new(
            endpoint.clone(),
            config.from_address.clone(),
            api_key.clone(),
            Duration::from_secs(config.timeout_secs),
        )
        .map(Some)
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotificationError> {
        let message = OutgoingMessage {
            from: &self.from_address,
            to: &notification.to,
            subject: &notification.subject,
            text: &notification.body,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose_secret())
            .json(&message)
            .send()
            .await
            .map_err(|error| NotificationError::Delivery(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotificationError::Delivery(format!("mail relay returned {status}")));
        }

        info!(
            event_name = "notification.http.delivered",
            to = %notification.to,
            subject = %notification.subject,
            "notification delivered"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use axum::{extract::State, http::HeaderMap, http::StatusCode, routing::post, Json, Router};
    use budgetflow_core::notification::{cash_ready_notification, NotificationError, Notifier};

    use super::HttpNotifier;

    type Captured = Arc<Mutex<Vec<(Option<String>, serde_json::Value)>>>;

    async fn relay(status: StatusCode) -> (String, Captured) {
        let captured: Captured = Arc::default();
        let app = Router::new()
            .route(
                "/send",
                post(
                    move |State(captured): State<Captured>,
                          headers: HeaderMap,
                          Json(body): Json<serde_json::Value>| async move {
                        let auth = headers
                            .get("authorization")
                            .and_then(|value| value.to_str().ok())
                            .map(str::to_string);
                        captured.lock().expect("capture lock").push((auth, body));
                        status
                    },
                ),
            )
            .with_state(captured.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind relay");
        let address = listener.local_addr().expect("relay address");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        (format!("http://{address}/send"), captured)
    }

    #[tokio::test]
    async fn posts_message_with_bearer_key() {
        let (endpoint, captured) = relay(StatusCode::OK).await;
        let notifier = HttpNotifier::new(
            endpoint,
            "office@school.example",
            "relay-key".to_string().into(),
            Duration::from_secs(5),
        )
        .expect("client");

        notifier
            .send(&cash_ready_notification("owner@school.example", Some("Mio"), "Paint"))
            .await
            .expect("delivered");

        let captured = captured.lock().expect("capture lock").clone();
        assert_eq!(captured.len(), 1);
        let (auth, body) = &captured[0];
        assert_eq!(auth.as_deref(), Some("Bearer relay-key"));
        assert_eq!(body["from"], "office@school.example");
        assert_eq!(body["to"], "owner@school.example");
        assert_eq!(body["subject"], "[Cash ready] Paint");
        assert!(body["text"].as_str().is_some_and(|text| text.contains("Mio")));
    }

    #[tokio::test]
    async fn relay_error_status_is_a_delivery_error() {
        let (endpoint, _) = relay(StatusCode::INTERNAL_SERVER_ERROR).await;
        let notifier = HttpNotifier::new(
            endpoint,
            "office@school.example",
            "relay-key".to_string().into(),
            Duration::from_secs(5),
        )
        .expect("client");

        let error = notifier
            .send(&cash_ready_notification("owner@school.example", None, "Paint"))
            .await
            .expect_err("relay refused");

        assert!(matches!(error, NotificationError::Delivery(ref message) if message.contains("500")));
    }
}
