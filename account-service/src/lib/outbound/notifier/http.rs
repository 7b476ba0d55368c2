use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;

use crate::config::LinksConfig;
use crate::config::NotifierConfig;
use crate::domain::account::errors::NotifierError;
use crate::domain::account::notifications::Notification;
use crate::domain::account::ports::Notifier;
use crate::outbound::notifier::messages::NotificationLinks;
use crate::outbound::notifier::messages::NotificationMessage;

/// Posts notification messages as JSON to an external dispatch endpoint.
pub struct HttpNotifier {
    client: reqwest::Client,
    endpoint: Url,
    links: NotificationLinks,
}

impl HttpNotifier {
    /// Create a notifier for the configured endpoint.
    ///
    /// # Arguments
    /// * `config` - Endpoint and request timeout
    /// * `links` - Front-end pages embedded in messages
    ///
    /// # Errors
    /// Fails when a configured URL does not parse or the client cannot be built.
    pub fn new(config: &NotifierConfig, links: &LinksConfig) -> Result<Self, anyhow::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        tracing::info!(endpoint = %config.endpoint, "Notifier initialized");

        Ok(Self {
            client,
            endpoint: Url::parse(&config.endpoint)?,
            links: NotificationLinks {
                confirm_email: Url::parse(&links.confirm_email_url)?,
                reset_password: Url::parse(&links.reset_password_url)?,
            },
        })
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifierError> {
        let message = NotificationMessage::build(notification, &self.links);

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&message)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    NotifierError::Timeout
                } else {
                    NotifierError::DeliveryFailed(e.without_url().to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifierError::Rejected(status.to_string()));
        }

        tracing::debug!(kind = notification.kind(), status = %status, "Notification accepted");
        Ok(())
    }
}
