//! SurrealDB implementation of [`AccountRepository`].
//!
//! Each method is one statement against one record, so every transition
//! runs inside a single SurrealDB transaction. Conditional transitions
//! (refresh rotation, token consumption) put their precondition in the
//! `WHERE` clause of the `UPDATE` itself rather than reading first.

use chrono::{DateTime, Utc};
use hearth_core::error::HearthResult;
use hearth_core::models::account::{Account, CreateAccount, PendingToken, Profile, normalize_email};
use hearth_core::models::role::Role;
use hearth_core::repository::AccountRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::debug;
use uuid::Uuid;

use crate::error::DbError;

/// Attempts for a conditional update that hit an optimistic conflict.
const MAX_CONFLICT_RETRIES: u32 = 5;

#[derive(Debug, SurrealValue)]
struct AccountRow {
    email: String,
    password_hash: Option<String>,
    federated_id: Option<String>,
    role: String,
    is_active: bool,
    is_verified: bool,
    refresh_token_digest: Option<String>,
    email_verification_digest: Option<String>,
    email_verification_expires_at: Option<DateTime<Utc>>,
    password_reset_digest: Option<String>,
    password_reset_expires_at: Option<DateTime<Utc>>,
    last_login_at: Option<DateTime<Utc>>,
    name: String,
    phone: Option<String>,
    avatar_url: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct IdRow {
    record_id: String,
}

fn pending_pair(
    field: &str,
    digest: Option<String>,
    expires_at: Option<DateTime<Utc>>,
) -> Result<Option<PendingToken>, DbError> {
    match (digest, expires_at) {
        (Some(digest), Some(expires_at)) => Ok(Some(PendingToken { digest, expires_at })),
        (None, None) => Ok(None),
        _ => Err(DbError::Corrupt(format!(
            "{field} digest and expiry must be set together"
        ))),
    }
}

impl AccountRow {
    fn into_account(self, id: Uuid) -> Result<Account, DbError> {
        let role = self
            .role
            .parse::<Role>()
            .map_err(|e| DbError::Corrupt(e.to_string()))?;
        Ok(Account {
            id,
            email: self.email,
            password_hash: self.password_hash,
            federated_id: self.federated_id,
            role,
            is_active: self.is_active,
            is_verified: self.is_verified,
            refresh_token_digest: self.refresh_token_digest,
            email_verification: pending_pair(
                "email_verification",
                self.email_verification_digest,
                self.email_verification_expires_at,
            )?,
            password_reset: pending_pair(
                "password_reset",
                self.password_reset_digest,
                self.password_reset_expires_at,
            )?,
            last_login_at: self.last_login_at,
            profile: Profile {
                name: self.name,
                phone: self.phone,
                avatar_url: self.avatar_url,
            },
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl IdRow {
    fn id(&self) -> Result<Uuid, DbError> {
        Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Corrupt(format!("invalid UUID: {e}")))
    }
}

fn not_found(id: impl Into<String>) -> DbError {
    DbError::NotFound {
        entity: "account".into(),
        id: id.into(),
    }
}

fn first_account(rows: Vec<AccountRow>, id: Uuid) -> Result<Account, DbError> {
    let row = rows
        .into_iter()
        .next()
        .ok_or_else(|| not_found(id.to_string()))?;
    row.into_account(id)
}

/// SurrealDB implementation of the Account repository.
pub struct SurrealAccountRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> Clone for SurrealAccountRepository<C> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
        }
    }
}

impl<C: Connection> SurrealAccountRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn find_id_by(&self, field: &'static str, value: String) -> Result<Option<Uuid>, DbError> {
        let query = format!("SELECT meta::id(id) AS record_id FROM account WHERE {field} = $value");
        let mut result = self
            .db
            .query(query)
            .bind(("value", value))
            .await?;
        let rows: Vec<IdRow> = result.take(0)?;
        rows.first().map(IdRow::id).transpose()
    }

    /// Run a single-record `UPDATE ... RETURN AFTER` and hand back the rows
    /// that satisfied its `WHERE` clause.
    async fn update_returning(
        &self,
        query: &'static str,
        id: Uuid,
        binds: Vec<(&'static str, String)>,
    ) -> Result<Vec<AccountRow>, DbError> {
        let mut builder = self.db.query(query).bind(("id", id.to_string()));
        for bind in binds {
            builder = builder.bind(bind);
        }
        let mut result = builder
            .await?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;
        Ok(result.take(0)?)
    }

    async fn try_rotate(
        &self,
        id: Uuid,
        expected: &str,
        replacement: &str,
    ) -> Result<bool, DbError> {
        let rows = self
            .update_returning(
                "UPDATE type::record('account', $id) SET \
                 refresh_token_digest = $replacement, \
                 updated_at = time::now() \
                 WHERE refresh_token_digest = $expected \
                 RETURN AFTER",
                id,
                vec![
                    ("expected", expected.to_string()),
                    ("replacement", replacement.to_string()),
                ],
            )
            .await?;
        Ok(!rows.is_empty())
    }

    /// Clear a one-time token pair by digest, provided it has not expired.
    /// `None` when no live pair matches, including when a concurrent caller
    /// consumed it first.
    async fn consume(
        &self,
        digest_field: &'static str,
        digest: String,
        now: DateTime<Utc>,
        update: &'static str,
        extra: Option<(&'static str, String)>,
    ) -> Result<Option<Account>, DbError> {
        let mut attempt = 1;
        loop {
            match self
                .try_consume(digest_field, &digest, now, update, extra.clone())
                .await
            {
                Err(e) if e.is_conflict() && attempt < MAX_CONFLICT_RETRIES => {
                    debug!(
                        field = digest_field,
                        attempt,
                        "Token consumption conflicted, retrying"
                    );
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    async fn try_consume(
        &self,
        digest_field: &'static str,
        digest: &str,
        now: DateTime<Utc>,
        update: &'static str,
        extra: Option<(&'static str, String)>,
    ) -> Result<Option<Account>, DbError> {
        let Some(id) = self.find_id_by(digest_field, digest.to_string()).await? else {
            return Ok(None);
        };

        let mut builder = self
            .db
            .query(update)
            .bind(("id", id.to_string()))
            .bind(("digest", digest.to_string()))
            .bind(("now", now));
        if let Some(bind) = extra {
            builder = builder.bind(bind);
        }
        let mut result = builder
            .await?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;
        let rows: Vec<AccountRow> = result.take(0)?;

        match rows.into_iter().next() {
            Some(row) => Ok(Some(row.into_account(id)?)),
            None => Ok(None),
        }
    }

    async fn try_create(&self, input: CreateAccount) -> Result<Account, DbError> {
        let email = normalize_email(&input.email);
        if self.find_id_by("email", email.clone()).await?.is_some() {
            return Err(DbError::AlreadyExists {
                entity: "account".into(),
            });
        }

        let id = Uuid::new_v4();
        let (verification_digest, verification_expires_at) = match input.email_verification {
            Some(token) => (Some(token.digest), Some(token.expires_at)),
            None => (None, None),
        };

        let result = self
            .db
            .query(
                "CREATE type::record('account', $id) SET \
                 email = $email, \
                 password_hash = $password_hash, \
                 federated_id = $federated_id, \
                 role = $role, \
                 is_active = true, \
                 is_verified = false, \
                 refresh_token_digest = NONE, \
                 email_verification_digest = $verification_digest, \
                 email_verification_expires_at = $verification_expires_at, \
                 password_reset_digest = NONE, \
                 password_reset_expires_at = NONE, \
                 last_login_at = NONE, \
                 name = $name, \
                 phone = $phone, \
                 avatar_url = $avatar_url",
            )
            .bind(("id", id.to_string()))
            .bind(("email", email))
            .bind(("password_hash", input.password_hash))
            .bind(("federated_id", input.federated_id))
            .bind(("role", input.role.as_str().to_string()))
            .bind(("verification_digest", verification_digest))
            .bind(("verification_expires_at", verification_expires_at))
            .bind(("name", input.profile.name))
            .bind(("phone", input.profile.phone))
            .bind(("avatar_url", input.profile.avatar_url))
            .await?;

        // A concurrent registration can slip past the pre-check; the unique
        // index still rejects it.
        let mut result = result.check().map_err(|e| {
            let message = e.to_string();
            if message.contains("idx_account_email") {
                DbError::AlreadyExists {
                    entity: "account".into(),
                }
            } else {
                DbError::Query(message)
            }
        })?;

        let rows: Vec<AccountRow> = result.take(0)?;
        debug!(account_id = %id, "Account created");
        first_account(rows, id)
    }
}

impl<C: Connection> AccountRepository for SurrealAccountRepository<C> {
    async fn create(&self, input: CreateAccount) -> HearthResult<Account> {
        if input.password_hash.is_none() && input.federated_id.is_none() {
            return Err(DbError::Query(
                "account needs a password hash or a federated identity".into(),
            )
            .into());
        }

        // A racing registration for the same email aborts this transaction;
        // the retried pre-check then sees the winner.
        let mut attempt = 1;
        loop {
            match self.try_create(input.clone()).await {
                Err(e) if e.is_conflict() && attempt < MAX_CONFLICT_RETRIES => {
                    debug!(attempt, "Account creation conflicted, retrying");
                    attempt += 1;
                }
                other => return Ok(other?),
            }
        }
    }

    async fn get_by_id(&self, id: Uuid) -> HearthResult<Account> {
        let mut result = self
            .db
            .query("SELECT * FROM type::record('account', $id)")
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AccountRow> = result.take(0).map_err(DbError::from)?;
        Ok(first_account(rows, id)?)
    }

    async fn get_by_email(&self, email: &str) -> HearthResult<Account> {
        let email = normalize_email(email);
        let id = self
            .find_id_by("email", email.clone())
            .await?
            .ok_or_else(|| not_found(format!("email={email}")))?;
        self.get_by_id(id).await
    }

    async fn record_login(&self, id: Uuid, refresh_digest: String) -> HearthResult<()> {
        let rows = self
            .update_returning(
                "UPDATE type::record('account', $id) SET \
                 refresh_token_digest = $digest, \
                 last_login_at = time::now(), \
                 updated_at = time::now() \
                 RETURN AFTER",
                id,
                vec![("digest", refresh_digest)],
            )
            .await?;
        first_account(rows, id)?;
        Ok(())
    }

    async fn set_refresh_token(&self, id: Uuid, refresh_digest: String) -> HearthResult<()> {
        let rows = self
            .update_returning(
                "UPDATE type::record('account', $id) SET \
                 refresh_token_digest = $digest, \
                 updated_at = time::now() \
                 RETURN AFTER",
                id,
                vec![("digest", refresh_digest)],
            )
            .await?;
        first_account(rows, id)?;
        Ok(())
    }

    async fn rotate_refresh_token(
        &self,
        id: Uuid,
        expected: String,
        replacement: String,
    ) -> HearthResult<bool> {
        let mut attempt = 1;
        loop {
            match self.try_rotate(id, &expected, &replacement).await {
                Err(e) if e.is_conflict() && attempt < MAX_CONFLICT_RETRIES => {
                    debug!(account_id = %id, attempt, "Refresh rotation conflicted, retrying");
                    attempt += 1;
                }
                other => return Ok(other?),
            }
        }
    }

    async fn clear_refresh_token(&self, id: Uuid) -> HearthResult<()> {
        self.update_returning(
            "UPDATE type::record('account', $id) SET \
             refresh_token_digest = NONE, \
             updated_at = time::now() \
             RETURN AFTER",
            id,
            Vec::new(),
        )
        .await?;
        Ok(())
    }

    async fn set_email_verification(&self, id: Uuid, token: PendingToken) -> HearthResult<()> {
        let mut result = self
            .db
            .query(
                "UPDATE type::record('account', $id) SET \
                 email_verification_digest = $digest, \
                 email_verification_expires_at = $expires_at, \
                 updated_at = time::now() \
                 RETURN AFTER",
            )
            .bind(("id", id.to_string()))
            .bind(("digest", token.digest))
            .bind(("expires_at", token.expires_at))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;
        let rows: Vec<AccountRow> = result.take(0).map_err(DbError::from)?;
        first_account(rows, id)?;
        Ok(())
    }

    async fn consume_email_verification(
        &self,
        digest: String,
        now: DateTime<Utc>,
    ) -> HearthResult<Option<Account>> {
        Ok(self
            .consume(
                "email_verification_digest",
                digest,
                now,
                "UPDATE type::record('account', $id) SET \
                 is_verified = true, \
                 email_verification_digest = NONE, \
                 email_verification_expires_at = NONE, \
                 updated_at = time::now() \
                 WHERE email_verification_digest = $digest \
                 AND email_verification_expires_at > $now \
                 RETURN AFTER",
                None,
            )
            .await?)
    }

    async fn set_password_reset(&self, id: Uuid, token: PendingToken) -> HearthResult<()> {
        let mut result = self
            .db
            .query(
                "UPDATE type::record('account', $id) SET \
                 password_reset_digest = $digest, \
                 password_reset_expires_at = $expires_at, \
                 updated_at = time::now() \
                 RETURN AFTER",
            )
            .bind(("id", id.to_string()))
            .bind(("digest", token.digest))
            .bind(("expires_at", token.expires_at))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;
        let rows: Vec<AccountRow> = result.take(0).map_err(DbError::from)?;
        first_account(rows, id)?;
        Ok(())
    }

    async fn consume_password_reset(
        &self,
        digest: String,
        now: DateTime<Utc>,
        password_hash: String,
    ) -> HearthResult<Option<Account>> {
        Ok(self
            .consume(
                "password_reset_digest",
                digest,
                now,
                "UPDATE type::record('account', $id) SET \
                 password_hash = $password_hash, \
                 refresh_token_digest = NONE, \
                 password_reset_digest = NONE, \
                 password_reset_expires_at = NONE, \
                 updated_at = time::now() \
                 WHERE password_reset_digest = $digest \
                 AND password_reset_expires_at > $now \
                 RETURN AFTER",
                Some(("password_hash", password_hash)),
            )
            .await?)
    }

    async fn update_password(
        &self,
        id: Uuid,
        password_hash: String,
        refresh_digest: String,
    ) -> HearthResult<()> {
        let rows = self
            .update_returning(
                "UPDATE type::record('account', $id) SET \
                 password_hash = $password_hash, \
                 refresh_token_digest = $digest, \
                 updated_at = time::now() \
                 RETURN AFTER",
                id,
                vec![
                    ("password_hash", password_hash),
                    ("digest", refresh_digest),
                ],
            )
            .await?;
        first_account(rows, id)?;
        Ok(())
    }

    async fn set_active(&self, id: Uuid, is_active: bool) -> HearthResult<Account> {
        let query = if is_active {
            "UPDATE type::record('account', $id) SET \
             is_active = true, \
             updated_at = time::now() \
             RETURN AFTER"
        } else {
            "UPDATE type::record('account', $id) SET \
             is_active = false, \
             refresh_token_digest = NONE, \
             updated_at = time::now() \
             RETURN AFTER"
        };
        let rows = self.update_returning(query, id, Vec::new()).await?;
        Ok(first_account(rows, id)?)
    }

    async fn set_role(&self, id: Uuid, role: Role) -> HearthResult<Account> {
        let rows = self
            .update_returning(
                "UPDATE type::record('account', $id) SET \
                 role = $role, \
                 updated_at = time::now() \
                 RETURN AFTER",
                id,
                vec![("role", role.as_str().to_string())],
            )
            .await?;
        Ok(first_account(rows, id)?)
    }

    async fn delete(&self, id: Uuid) -> HearthResult<()> {
        self.db
            .query("DELETE type::record('account', $id)")
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;
        Ok(())
    }
}
