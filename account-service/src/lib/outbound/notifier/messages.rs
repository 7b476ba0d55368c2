use chrono::DateTime;
use chrono::Utc;
use reqwest::Url;
use serde::Serialize;

use crate::domain::account::notifications::Notification;

/// Front-end pages the notification links point at.
#[derive(Debug, Clone)]
pub struct NotificationLinks {
    pub confirm_email: Url,
    pub reset_password: Url,
}

/// Serializable envelope posted to the notifier endpoint.
///
/// Carries plaintext tokens inside links, so it deliberately has no `Debug`.
#[derive(Clone, Serialize)]
#[serde(tag = "notification_type", rename_all = "snake_case")]
pub enum NotificationMessage {
    VerifyEmail(VerifyEmailMessage),
    ResetPassword(ResetPasswordMessage),
    PasswordChanged(PasswordChangedMessage),
}

#[derive(Clone, Serialize)]
pub struct VerifyEmailMessage {
    pub email: String,
    pub username: String,
    pub confirm_url: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone, Serialize)]
pub struct ResetPasswordMessage {
    pub email: String,
    pub username: String,
    pub reset_code: String,
    pub reset_url: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone, Serialize)]
pub struct PasswordChangedMessage {
    pub email: String,
    pub username: String,
}

impl NotificationMessage {
    pub fn build(notification: &Notification, links: &NotificationLinks) -> Self {
        match notification {
            Notification::VerifyEmail {
                user_id,
                email,
                username,
                token,
                expires_at,
            } => {
                let mut confirm_url = links.confirm_email.clone();
                confirm_url
                    .query_pairs_mut()
                    .append_pair("userId", &user_id.to_string())
                    .append_pair("token", token);

                NotificationMessage::VerifyEmail(VerifyEmailMessage {
                    email: email.to_string(),
                    username: username.clone(),
                    confirm_url: confirm_url.to_string(),
                    expires_at: *expires_at,
                })
            }
            Notification::ResetPassword {
                email,
                username,
                code,
                expires_at,
            } => {
                let mut reset_url = links.reset_password.clone();
                reset_url.query_pairs_mut().append_pair("email", email.as_str());

                NotificationMessage::ResetPassword(ResetPasswordMessage {
                    email: email.to_string(),
                    username: username.clone(),
                    reset_code: code.clone(),
                    reset_url: reset_url.to_string(),
                    expires_at: *expires_at,
                })
            }
            Notification::PasswordChanged { email, username } => {
                NotificationMessage::PasswordChanged(PasswordChangedMessage {
                    email: email.to_string(),
                    username: username.clone(),
                })
            }
        }
    }
}
