//! Authentication service: registration, login, refresh rotation,
//! logout and the one-time token workflows.

use chrono::{TimeDelta, Utc};
use hearth_core::error::{HearthError, HearthResult};
use hearth_core::models::account::{Account, CreateAccount, Profile, normalize_email};
use hearth_core::models::role::Role;
use hearth_core::repository::AccountRepository;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::authz::Identity;
use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::notify::Notifier;
use crate::one_time::OneTimeToken;
use crate::password::PasswordHasher;
use crate::token::{self, TokenIssuer, TokenPair};

/// Input for self-registration.
#[derive(Debug)]
pub struct RegisterInput {
    pub email: String,
    pub password: String,
    pub name: String,
    pub phone: Option<String>,
    /// `None` registers a plain `user`.
    pub role: Option<Role>,
}

/// Successful registration or login.
#[derive(Debug)]
pub struct LoginOutput {
    pub account: Account,
    pub tokens: TokenPair,
}

#[derive(Debug)]
pub struct ChangePasswordInput {
    pub current_password: String,
    pub new_password: String,
}

/// Authentication service.
///
/// Generic over repository and notifier implementations so that the auth
/// layer has no dependency on the database crate.
pub struct AuthService<A: AccountRepository, N: Notifier> {
    accounts: A,
    notifier: N,
    hasher: PasswordHasher,
    tokens: TokenIssuer,
    verification_lifetime: TimeDelta,
    reset_lifetime: TimeDelta,
    config: AuthConfig,
}

fn validate_email(email: &str) -> HearthResult<()> {
    let plausible = email.len() <= 254
        && !email.chars().any(char::is_whitespace)
        && matches!(
            email.split_once('@'),
            Some((local, domain))
                if !local.is_empty()
                    && !domain.contains('@')
                    && domain.contains('.')
                    && !domain.starts_with('.')
                    && !domain.ends_with('.')
        );
    if plausible {
        Ok(())
    } else {
        Err(HearthError::validation("email address is not valid"))
    }
}

impl<A: AccountRepository, N: Notifier> AuthService<A, N> {
    pub fn new(accounts: A, notifier: N, config: AuthConfig) -> Result<Self, AuthError> {
        Ok(Self {
            accounts,
            notifier,
            hasher: PasswordHasher::new(config.hash_cost, config.pepper.clone())?,
            tokens: TokenIssuer::new(&config)?,
            verification_lifetime: config.email_verification_lifetime()?,
            reset_lifetime: config.password_reset_lifetime()?,
            config,
        })
    }

    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Bound a credential store call by the configured deadline.
    async fn store<T>(&self, call: impl Future<Output = HearthResult<T>>) -> HearthResult<T> {
        tokio::time::timeout(self.config.store_timeout(), call)
            .await
            .map_err(|_| HearthError::ServiceUnavailable("credential store timed out".into()))?
    }

    async fn hash(&self, password: &str) -> HearthResult<String> {
        self.hasher
            .hash_blocking(password.to_string(), self.config.blocking_timeout())
            .await
    }

    async fn verify(&self, password: &str, digest: Option<String>) -> HearthResult<bool> {
        self.hasher
            .verify_blocking(password.to_string(), digest, self.config.blocking_timeout())
            .await
    }

    /// Create an account, start its verification flow and open its first
    /// session.
    pub async fn register(&self, input: RegisterInput) -> HearthResult<LoginOutput> {
        let email = normalize_email(&input.email);
        validate_email(&email)?;
        self.config.password_policy.check(&input.password)?;
        if input.name.trim().is_empty() {
            return Err(HearthError::validation("name is required"));
        }
        let role = match input.role.unwrap_or_default() {
            Role::Admin => {
                return Err(HearthError::validation("admin accounts cannot self-register"));
            }
            role => role,
        };

        match self.store(self.accounts.get_by_email(&email)).await {
            Ok(_) => return Err(HearthError::DuplicateAccount),
            Err(HearthError::NotFound { .. }) => {}
            Err(e) => return Err(e),
        }

        let password_hash = self.hash(&input.password).await?;
        let verification =
            OneTimeToken::mint(self.verification_lifetime, Utc::now());

        let account = self
            .store(self.accounts.create(CreateAccount {
                email: email.clone(),
                password_hash: Some(password_hash),
                federated_id: None,
                role,
                profile: Profile {
                    name: input.name.trim().to_string(),
                    phone: input.phone,
                    avatar_url: None,
                },
                email_verification: Some(verification.pending),
            }))
            .await
            .map_err(|e| match e {
                HearthError::AlreadyExists { .. } => HearthError::DuplicateAccount,
                other => other,
            })?;

        let tokens = self.tokens.issue(account.id)?;
        self.store(
            self.accounts
                .set_refresh_token(account.id, token::hash_token(&tokens.refresh_token)),
        )
        .await?;

        if let Err(e) = self.notifier.send_verification(&email, &verification.raw).await {
            warn!(account_id = %account.id, error = %e, "Verification notice not delivered");
        }

        info!(account_id = %account.id, role = %account.role, "Account registered");
        Ok(LoginOutput { account, tokens })
    }

    /// Authenticate with email + password and open a fresh session,
    /// replacing any previous one.
    ///
    /// Unknown email, wrong password, password-less account and inactive
    /// account all fail identically.
    pub async fn login(&self, email: &str, password: &str) -> HearthResult<LoginOutput> {
        let email = normalize_email(email);
        let account = match self.store(self.accounts.get_by_email(&email)).await {
            Ok(account) => Some(account),
            Err(HearthError::NotFound { .. }) => None,
            Err(e) => return Err(e),
        };

        let digest = account.as_ref().and_then(|a| a.password_hash.clone());
        let valid = self.verify(password, digest).await?;

        let account = match account {
            Some(account) if valid && account.is_active => account,
            Some(account) => {
                debug!(account_id = %account.id, "Login rejected");
                return Err(HearthError::InvalidCredentials);
            }
            None => return Err(HearthError::InvalidCredentials),
        };

        let tokens = self.tokens.issue(account.id)?;
        self.store(
            self.accounts
                .record_login(account.id, token::hash_token(&tokens.refresh_token)),
        )
        .await?;
        let account = self.store(self.accounts.get_by_id(account.id)).await?;

        info!(account_id = %account.id, "Login succeeded");
        Ok(LoginOutput { account, tokens })
    }

    /// Exchange a refresh token for a new pair. The presented token is
    /// retired by compare-and-swap, so it can win at most once.
    pub async fn refresh(&self, refresh_token: &str) -> HearthResult<TokenPair> {
        let account_id = self.tokens.verify_refresh(refresh_token).map_err(|e| {
            debug!(error = %e, "Refresh token rejected");
            HearthError::InvalidOrExpiredToken
        })?;

        let account = match self.store(self.accounts.get_by_id(account_id)).await {
            Ok(account) => account,
            Err(HearthError::NotFound { .. }) => return Err(HearthError::InvalidOrExpiredToken),
            Err(e) => return Err(e),
        };
        if !account.is_active {
            return Err(HearthError::AccountInactive);
        }

        let tokens = self.tokens.issue(account.id)?;
        let rotated = self
            .store(self.accounts.rotate_refresh_token(
                account.id,
                token::hash_token(refresh_token),
                token::hash_token(&tokens.refresh_token),
            ))
            .await?;

        if !rotated {
            warn!(account_id = %account.id, "Stale or replayed refresh token presented");
            return Err(HearthError::InvalidOrExpiredToken);
        }

        debug!(account_id = %account.id, "Session rotated");
        Ok(tokens)
    }

    /// End the caller's session. Safe to repeat.
    pub async fn logout(&self, account_id: Uuid) -> HearthResult<()> {
        self.store(self.accounts.clear_refresh_token(account_id)).await?;
        info!(account_id = %account_id, "Logged out");
        Ok(())
    }

    /// Resolve an access-token subject to the identity attached to the
    /// request.
    pub async fn load_identity(&self, account_id: Uuid) -> HearthResult<Identity> {
        let account = match self.store(self.accounts.get_by_id(account_id)).await {
            Ok(account) => account,
            Err(HearthError::NotFound { .. }) => return Err(HearthError::InvalidOrExpiredToken),
            Err(e) => return Err(e),
        };
        if !account.is_active {
            return Err(HearthError::AccountInactive);
        }
        Ok(Identity::from(&account))
    }

    pub async fn account(&self, account_id: Uuid) -> HearthResult<Account> {
        self.store(self.accounts.get_by_id(account_id)).await
    }

    /// Consume an email verification token.
    pub async fn verify_email(&self, raw_token: &str) -> HearthResult<Account> {
        let account = self
            .store(
                self.accounts
                    .consume_email_verification(token::hash_token(raw_token), Utc::now()),
            )
            .await?
            .ok_or(HearthError::InvalidOrExpiredToken)?;
        info!(account_id = %account.id, "Email verified");
        Ok(account)
    }

    /// Replace any outstanding verification token with a new one.
    /// Returns `false` when the account is already verified.
    pub async fn resend_verification(&self, account_id: Uuid) -> HearthResult<bool> {
        let account = self.store(self.accounts.get_by_id(account_id)).await?;
        if account.is_verified {
            return Ok(false);
        }

        let verification =
            OneTimeToken::mint(self.verification_lifetime, Utc::now());
        self.store(
            self.accounts
                .set_email_verification(account.id, verification.pending),
        )
        .await?;

        if let Err(e) = self
            .notifier
            .send_verification(&account.email, &verification.raw)
            .await
        {
            warn!(account_id = %account.id, error = %e, "Verification notice not delivered");
        }
        Ok(true)
    }

    /// Start a password reset. Answers the same way whether or not the
    /// email belongs to an account.
    pub async fn forgot_password(&self, email: &str) -> HearthResult<()> {
        let account = match self
            .store(self.accounts.get_by_email(&normalize_email(email)))
            .await
        {
            Ok(account) if account.is_active => account,
            Ok(_) | Err(HearthError::NotFound { .. }) => return Ok(()),
            Err(e) => return Err(e),
        };

        let reset = OneTimeToken::mint(self.reset_lifetime, Utc::now());
        self.store(self.accounts.set_password_reset(account.id, reset.pending))
            .await?;

        if let Err(e) = self
            .notifier
            .send_password_reset(&account.email, &reset.raw)
            .await
        {
            warn!(account_id = %account.id, error = %e, "Password reset notice not delivered");
        }
        info!(account_id = %account.id, "Password reset requested");
        Ok(())
    }

    /// Consume a reset token and set a new password. Any open session is
    /// dropped, forcing a fresh login.
    pub async fn reset_password(&self, raw_token: &str, new_password: &str) -> HearthResult<()> {
        self.config.password_policy.check(new_password)?;
        let password_hash = self.hash(new_password).await?;

        let account = self
            .store(self.accounts.consume_password_reset(
                token::hash_token(raw_token),
                Utc::now(),
                password_hash,
            ))
            .await?
            .ok_or(HearthError::InvalidOrExpiredToken)?;

        info!(account_id = %account.id, "Password reset completed");
        Ok(())
    }

    /// Change the password of a signed-in account and rotate its session.
    pub async fn change_password(
        &self,
        account_id: Uuid,
        input: ChangePasswordInput,
    ) -> HearthResult<TokenPair> {
        let account = self.store(self.accounts.get_by_id(account_id)).await?;
        if !self
            .verify(&input.current_password, account.password_hash.clone())
            .await?
        {
            return Err(HearthError::InvalidCredentials);
        }
        self.config.password_policy.check(&input.new_password)?;

        let password_hash = self.hash(&input.new_password).await?;
        let tokens = self.tokens.issue(account.id)?;
        self.store(self.accounts.update_password(
            account.id,
            password_hash,
            token::hash_token(&tokens.refresh_token),
        ))
        .await?;

        info!(account_id = %account.id, "Password changed");
        Ok(tokens)
    }

    pub async fn set_active(&self, account_id: Uuid, is_active: bool) -> HearthResult<Account> {
        let account = self
            .store(self.accounts.set_active(account_id, is_active))
            .await?;
        info!(account_id = %account_id, is_active, "Account activity changed");
        Ok(account)
    }

    pub async fn set_role(&self, account_id: Uuid, role: Role) -> HearthResult<Account> {
        let account = self.store(self.accounts.set_role(account_id, role)).await?;
        info!(account_id = %account_id, role = %role, "Account role changed");
        Ok(account)
    }

    pub async fn delete_account(&self, account_id: Uuid) -> HearthResult<()> {
        self.store(self.accounts.get_by_id(account_id)).await?;
        self.store(self.accounts.delete(account_id)).await?;
        info!(account_id = %account_id, "Account deleted");
        Ok(())
    }
}
