use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use auth::TokenIssuer;
use auth::TokenKind;
use auth::TokenValidation;

use crate::domain::account::errors::AccountError;
use crate::domain::account::models::EmailAddress;
use crate::domain::account::models::LoginCommand;
use crate::domain::account::models::RegisterCommand;
use crate::domain::account::models::Registration;
use crate::domain::account::models::ResetPasswordCommand;
use crate::domain::account::models::Session;
use crate::domain::account::models::User;
use crate::domain::account::models::UserId;
use crate::domain::account::notifications::Notification;
use crate::domain::account::ports::AccountServicePort;
use crate::domain::account::ports::Notifier;
use crate::domain::account::ports::UserRepository;
use crate::domain::role::models::RoleId;
use crate::domain::role::ports::RoleServicePort;

/// Attempts at a read-validate-save cycle before giving up on a contended record.
const MAX_SAVE_ATTEMPTS: usize = 3;

/// Account policy knobs.
#[derive(Debug, Clone)]
pub struct AccountSettings {
    /// Role granted to every new account.
    pub default_role: RoleId,
    /// Accounts registered with one of these emails also get `admin`.
    pub admin_emails: Vec<EmailAddress>,
    /// Upper bound on a single notifier call.
    pub notify_timeout: Duration,
}

/// Domain service implementation for the account lifecycle.
///
/// Every token consumption reloads the record, validates and clears the token,
/// then writes with compare-and-set. A concurrent writer forces a reload, so a
/// token can authorize at most one follow-up action.
pub struct AccountService<UR, N, RS>
where
    UR: UserRepository,
    N: Notifier,
    RS: RoleServicePort,
{
    repository: Arc<UR>,
    notifier: Arc<N>,
    roles: Arc<RS>,
    tokens: Arc<TokenIssuer>,
    password_hasher: auth::PasswordHasher,
    settings: AccountSettings,
}

impl<UR, N, RS> AccountService<UR, N, RS>
where
    UR: UserRepository,
    N: Notifier,
    RS: RoleServicePort,
{
    /// Create a new account service with injected dependencies.
    ///
    /// # Arguments
    /// * `repository` - User persistence implementation
    /// * `notifier` - Delivery of verification and reset notices
    /// * `roles` - Role authorizer used for default grants and session roles
    /// * `tokens` - One-time token issuer (also the service's clock)
    /// * `settings` - Account policy
    pub fn new(
        repository: Arc<UR>,
        notifier: Arc<N>,
        roles: Arc<RS>,
        tokens: Arc<TokenIssuer>,
        settings: AccountSettings,
    ) -> Self {
        Self {
            repository,
            notifier,
            roles,
            tokens,
            password_hasher: auth::PasswordHasher::new(),
            settings,
        }
    }

    async fn grant_initial_roles(&self, user: &User) {
        let mut grants = vec![self.settings.default_role.clone()];
        if self.settings.admin_emails.contains(&user.email) {
            grants.push(RoleId::admin());
        }

        for role_id in grants {
            if let Err(e) = self.roles.assign(&user.id, &role_id).await {
                tracing::error!(
                    user_id = %user.id,
                    role_id = %role_id,
                    error = %e,
                    "Failed to grant initial role"
                );
            }
        }
    }

    fn dispatch_in_background(&self, notification: Notification) {
        let notifier = Arc::clone(&self.notifier);
        let timeout = self.settings.notify_timeout;
        tokio::spawn(async move {
            deliver(notifier.as_ref(), &notification, timeout).await;
        });
    }

    async fn find_user(&self, user_id: &UserId) -> Result<User, AccountError> {
        self.repository
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AccountError::NotFound(user_id.to_string()))
    }
}

/// Deliver `notification` within `timeout`. Returns whether it went through.
async fn deliver<N: Notifier + ?Sized>(
    notifier: &N,
    notification: &Notification,
    timeout: Duration,
) -> bool {
    match tokio::time::timeout(timeout, notifier.notify(notification)).await {
        Ok(Ok(())) => {
            tracing::debug!(kind = notification.kind(), "Notification delivered");
            true
        }
        Ok(Err(e)) => {
            tracing::warn!(kind = notification.kind(), error = %e, "Notification failed");
            false
        }
        Err(_) => {
            tracing::warn!(kind = notification.kind(), "Notification timed out");
            false
        }
    }
}

fn consume(validation: TokenValidation) -> Result<(), AccountError> {
    match validation {
        TokenValidation::Valid => Ok(()),
        TokenValidation::Expired => Err(AccountError::TokenExpired),
        TokenValidation::Mismatch => Err(AccountError::InvalidToken),
    }
}

#[async_trait]
impl<UR, N, RS> AccountServicePort for AccountService<UR, N, RS>
where
    UR: UserRepository,
    N: Notifier,
    RS: RoleServicePort,
{
    async fn register(&self, command: RegisterCommand) -> Result<Registration, AccountError> {
        if self.repository.email_exists(&command.email).await? {
            tracing::debug!(email = %command.email, "Registration rejected, email in use");
            return Err(AccountError::EmailAlreadyExists);
        }

        let password_hash = self.password_hasher.hash(command.password.expose())?;

        let user = User {
            id: UserId::new(),
            email: command.email,
            username: command.username,
            password_hash,
            verification_token: Some(self.tokens.issue(TokenKind::EmailVerification)),
            password_reset_token: None,
            verified_at: None,
            birth_year: command.birth_year,
            two_factor_enabled: false,
            created_at: self.tokens.now(),
            version: 0,
        };

        let user = self.repository.create(user).await?;
        tracing::info!(user_id = %user.id, "User registered");

        self.grant_initial_roles(&user).await;

        let notification_sent = match Notification::verify_email(&user) {
            Some(notification) => {
                deliver(
                    self.notifier.as_ref(),
                    &notification,
                    self.settings.notify_timeout,
                )
                .await
            }
            None => false,
        };

        Ok(Registration {
            user,
            notification_sent,
        })
    }

    async fn confirm_email(&self, user_id: &UserId, token: &str) -> Result<User, AccountError> {
        for _ in 0..MAX_SAVE_ATTEMPTS {
            let mut user = self.find_user(user_id).await?;

            consume(self.tokens.check(user.verification_token.as_ref(), token))?;

            user.verification_token = None;
            user.verified_at = Some(self.tokens.now());

            match self.repository.save(user).await {
                Ok(saved) => {
                    tracing::info!(user_id = %saved.id, "Email confirmed");
                    return Ok(saved);
                }
                Err(AccountError::StaleRecord(_)) => {
                    tracing::debug!(user_id = %user_id, "Concurrent update, re-reading user");
                }
                Err(e) => return Err(e),
            }
        }

        Err(AccountError::StaleRecord(user_id.to_string()))
    }

    async fn login(&self, command: LoginCommand) -> Result<Session, AccountError> {
        let user = match self.repository.find_by_email(&command.email).await? {
            Some(user) => user,
            None => {
                self.password_hasher.dummy_verify(&command.password);
                return Err(AccountError::InvalidCredentials);
            }
        };

        let password_matches = self
            .password_hasher
            .verify(&command.password, &user.password_hash)?;

        if !user.is_verified() {
            tracing::debug!(user_id = %user.id, "Login attempt before verification");
            return Err(AccountError::NotVerified);
        }

        if !password_matches {
            tracing::debug!(user_id = %user.id, "Login attempt with wrong password");
            return Err(AccountError::InvalidCredentials);
        }

        let roles = self.roles.roles_for(&user.id).await?;
        tracing::info!(user_id = %user.id, "User logged in");

        Ok(Session {
            user_id: user.id,
            email: user.email,
            username: user.username,
            roles,
            remember_me: command.remember_me,
        })
    }

    async fn request_password_reset(&self, email: &EmailAddress) -> Result<(), AccountError> {
        // Issued before the lookup so both branches draw the same entropy.
        let reset_token = self.tokens.issue(TokenKind::PasswordReset);

        let Some(mut user) = self.repository.find_by_email(email).await? else {
            tracing::debug!(email = %email, "Password reset requested for unknown email");
            return Ok(());
        };

        user.password_reset_token = Some(reset_token);

        // The write happens off the request path so a known email answers as
        // fast as an unknown one.
        let repository = Arc::clone(&self.repository);
        let notifier = Arc::clone(&self.notifier);
        let timeout = self.settings.notify_timeout;
        tokio::spawn(async move {
            match repository.save(user).await {
                Ok(saved) => {
                    tracing::info!(user_id = %saved.id, "Password reset issued");
                    if let Some(notification) = Notification::reset_password(&saved) {
                        deliver(notifier.as_ref(), &notification, timeout).await;
                    }
                }
                Err(AccountError::StaleRecord(id)) => {
                    tracing::warn!(user_id = %id, "Password reset dropped, record changed concurrently");
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to store password reset token");
                }
            }
        });

        Ok(())
    }

    async fn reset_password(&self, command: ResetPasswordCommand) -> Result<(), AccountError> {
        let mut new_hash: Option<String> = None;

        for _ in 0..MAX_SAVE_ATTEMPTS {
            let Some(mut user) = self.repository.find_by_email(&command.email).await? else {
                // Same comparison work as the known-user branch.
                let _ = self.tokens.check(None, &command.reset_code);
                return Err(AccountError::InvalidToken);
            };

            consume(
                self.tokens
                    .check(user.password_reset_token.as_ref(), &command.reset_code),
            )?;

            let password_hash = match &new_hash {
                Some(hash) => hash.clone(),
                None => {
                    let hash = self
                        .password_hasher
                        .hash(command.new_password.expose())?;
                    new_hash = Some(hash.clone());
                    hash
                }
            };

            user.password_hash = password_hash;
            user.password_reset_token = None;

            match self.repository.save(user).await {
                Ok(saved) => {
                    tracing::info!(user_id = %saved.id, "Password reset completed");
                    self.dispatch_in_background(Notification::password_changed(&saved));
                    return Ok(());
                }
                Err(AccountError::StaleRecord(id)) => {
                    tracing::debug!(user_id = %id, "Concurrent update, re-reading user");
                }
                Err(e) => return Err(e),
            }
        }

        Err(AccountError::InvalidToken)
    }

    async fn resend_confirmation(&self, email: &EmailAddress) -> Result<(), AccountError> {
        let verification_token = self.tokens.issue(TokenKind::EmailVerification);

        let user = match self.repository.find_by_email(email).await? {
            Some(user) if !user.is_verified() => user,
            _ => {
                tracing::debug!(email = %email, "Confirmation resend skipped");
                return Ok(());
            }
        };

        let mut user = user;
        user.verification_token = Some(verification_token);

        match self.repository.save(user).await {
            Ok(saved) => {
                tracing::info!(user_id = %saved.id, "Verification token re-issued");
                if let Some(notification) = Notification::verify_email(&saved) {
                    self.dispatch_in_background(notification);
                }
            }
            Err(AccountError::StaleRecord(id)) => {
                tracing::warn!(user_id = %id, "Confirmation resend dropped, record changed concurrently");
            }
            Err(e) => return Err(e),
        }

        Ok(())
    }

    async fn enable_two_factor(&self, user_id: &UserId) -> Result<User, AccountError> {
        let mut user = self.find_user(user_id).await?;
        if user.two_factor_enabled {
            return Ok(user);
        }

        user.two_factor_enabled = true;
        let saved = self.repository.save(user).await?;
        tracing::info!(user_id = %saved.id, "Two-factor authentication enabled");
        Ok(saved)
    }

    async fn get_user(&self, user_id: &UserId) -> Result<User, AccountError> {
        self.find_user(user_id).await
    }
}
