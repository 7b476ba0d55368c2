use chrono::DateTime;
use chrono::Utc;

use crate::domain::account::models::EmailAddress;
use crate::domain::account::models::User;
use crate::domain::account::models::UserId;

/// Messages handed to the notifier.
///
/// Token-bearing variants are the only place a plaintext token leaves the
/// domain; they are never logged.
#[derive(Clone, PartialEq, Eq)]
pub enum Notification {
    VerifyEmail {
        user_id: UserId,
        email: EmailAddress,
        username: String,
        token: String,
        expires_at: DateTime<Utc>,
    },
    ResetPassword {
        email: EmailAddress,
        username: String,
        code: String,
        expires_at: DateTime<Utc>,
    },
    PasswordChanged {
        email: EmailAddress,
        username: String,
    },
}

impl Notification {
    /// Verification notice for the user's current verification token.
    ///
    /// Returns `None` when the user holds no verification token.
    pub fn verify_email(user: &User) -> Option<Self> {
        user.verification_token
            .as_ref()
            .map(|token| Notification::VerifyEmail {
                user_id: user.id,
                email: user.email.clone(),
                username: user.username.as_str().to_string(),
                token: token.value.clone(),
                expires_at: token.expires_at,
            })
    }

    /// Reset notice for the user's current reset token.
    pub fn reset_password(user: &User) -> Option<Self> {
        user.password_reset_token
            .as_ref()
            .map(|token| Notification::ResetPassword {
                email: user.email.clone(),
                username: user.username.as_str().to_string(),
                code: token.value.clone(),
                expires_at: token.expires_at,
            })
    }

    pub fn password_changed(user: &User) -> Self {
        Notification::PasswordChanged {
            email: user.email.clone(),
            username: user.username.as_str().to_string(),
        }
    }

    /// Short label used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Notification::VerifyEmail { .. } => "verify_email",
            Notification::ResetPassword { .. } => "reset_password",
            Notification::PasswordChanged { .. } => "password_changed",
        }
    }

    pub fn recipient(&self) -> &EmailAddress {
        match self {
            Notification::VerifyEmail { email, .. }
            | Notification::ResetPassword { email, .. }
            | Notification::PasswordChanged { email, .. } => email,
        }
    }
}

impl std::fmt::Debug for Notification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notification")
            .field("kind", &self.kind())
            .field("recipient", self.recipient())
            .finish_non_exhaustive()
    }
}
