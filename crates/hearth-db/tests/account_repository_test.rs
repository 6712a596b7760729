//! Integration tests for the Account repository using in-memory SurrealDB.

use std::sync::Arc;

use chrono::{Duration, Utc};
use hearth_core::error::HearthError;
use hearth_core::models::account::{CreateAccount, PendingToken, Profile};
use hearth_core::models::role::Role;
use hearth_core::repository::AccountRepository;
use hearth_db::SurrealAccountRepository;
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

async fn setup() -> SurrealAccountRepository<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    hearth_db::run_migrations(&db).await.unwrap();
    SurrealAccountRepository::new(db)
}

fn new_account(email: &str) -> CreateAccount {
    CreateAccount {
        email: email.into(),
        password_hash: Some("$argon2id$v=19$placeholder".into()),
        federated_id: None,
        role: Role::User,
        profile: Profile {
            name: "Alice".into(),
            phone: Some("+44 1234".into()),
            avatar_url: None,
        },
        email_verification: Some(PendingToken {
            digest: format!("verify-{email}"),
            expires_at: Utc::now() + Duration::hours(24),
        }),
    }
}

#[tokio::test]
async fn create_and_get_account() {
    let repo = setup().await;

    let account = repo.create(new_account("Alice@X.com")).await.unwrap();
    assert_eq!(account.email, "alice@x.com");
    assert_eq!(account.role, Role::User);
    assert!(account.is_active);
    assert!(!account.is_verified);
    assert!(account.refresh_token_digest.is_none());
    assert!(account.email_verification.is_some());
    assert!(account.password_reset.is_none());
    assert_eq!(account.profile.phone.as_deref(), Some("+44 1234"));

    let fetched = repo.get_by_id(account.id).await.unwrap();
    assert_eq!(fetched.id, account.id);

    let by_email = repo.get_by_email("  ALICE@x.com").await.unwrap();
    assert_eq!(by_email.id, account.id);
}

#[tokio::test]
async fn duplicate_email_is_rejected_case_insensitively() {
    let repo = setup().await;
    repo.create(new_account("bob@x.com")).await.unwrap();

    let err = repo.create(new_account("BOB@x.com")).await.unwrap_err();
    assert!(matches!(err, HearthError::AlreadyExists { .. }), "got {err:?}");
}

#[tokio::test]
async fn account_without_any_credential_is_rejected() {
    let repo = setup().await;
    let mut input = new_account("nobody@x.com");
    input.password_hash = None;

    assert!(repo.create(input).await.is_err());
}

#[tokio::test]
async fn federated_account_may_omit_password() {
    let repo = setup().await;
    let mut input = new_account("fed@x.com");
    input.password_hash = None;
    input.federated_id = Some("google|123".into());

    let account = repo.create(input).await.unwrap();
    assert!(account.password_hash.is_none());
    assert_eq!(account.federated_id.as_deref(), Some("google|123"));
}

#[tokio::test]
async fn missing_account_is_not_found() {
    let repo = setup().await;
    let err = repo.get_by_id(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, HearthError::NotFound { .. }));

    let err = repo.get_by_email("ghost@x.com").await.unwrap_err();
    assert!(matches!(err, HearthError::NotFound { .. }));
}

#[tokio::test]
async fn login_installs_session_and_stamps_time() {
    let repo = setup().await;
    let account = repo.create(new_account("carol@x.com")).await.unwrap();

    repo.record_login(account.id, "digest-1".into()).await.unwrap();

    let fetched = repo.get_by_id(account.id).await.unwrap();
    assert_eq!(fetched.refresh_token_digest.as_deref(), Some("digest-1"));
    assert!(fetched.last_login_at.is_some());
}

#[tokio::test]
async fn rotation_requires_current_digest() {
    let repo = setup().await;
    let account = repo.create(new_account("dave@x.com")).await.unwrap();
    repo.set_refresh_token(account.id, "old".into()).await.unwrap();

    assert!(!repo
        .rotate_refresh_token(account.id, "stale".into(), "new".into())
        .await
        .unwrap());
    assert!(repo
        .rotate_refresh_token(account.id, "old".into(), "new".into())
        .await
        .unwrap());
    // The predecessor can never win again.
    assert!(!repo
        .rotate_refresh_token(account.id, "old".into(), "newer".into())
        .await
        .unwrap());

    let fetched = repo.get_by_id(account.id).await.unwrap();
    assert_eq!(fetched.refresh_token_digest.as_deref(), Some("new"));
}

#[tokio::test]
async fn concurrent_rotations_have_one_winner() {
    let repo = Arc::new(setup().await);
    let account = repo.create(new_account("erin@x.com")).await.unwrap();
    repo.set_refresh_token(account.id, "shared".into()).await.unwrap();

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let repo = Arc::clone(&repo);
            tokio::spawn(async move {
                repo.rotate_refresh_token(account.id, "shared".into(), format!("next-{i}"))
                    .await
            })
        })
        .collect();

    let mut winners = 0;
    for handle in handles {
        if handle.await.unwrap().unwrap() {
            winners += 1;
        }
    }
    assert_eq!(winners, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_creates_of_one_email_have_one_winner() {
    let repo = Arc::new(setup().await);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let repo = Arc::clone(&repo);
            tokio::spawn(async move { repo.create(new_account("race@x.com")).await })
        })
        .collect();

    let mut created = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => created += 1,
            Err(HearthError::AlreadyExists { .. }) => {}
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }
    assert_eq!(created, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_verifications_have_one_winner() {
    let repo = Arc::new(setup().await);
    repo.create(new_account("vera@x.com")).await.unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let repo = Arc::clone(&repo);
            tokio::spawn(async move {
                repo.consume_email_verification("verify-vera@x.com".into(), Utc::now())
                    .await
            })
        })
        .collect();

    let mut matched = 0;
    for handle in handles {
        if handle.await.unwrap().unwrap().is_some() {
            matched += 1;
        }
    }
    assert_eq!(matched, 1);
}

#[tokio::test]
async fn clearing_session_is_idempotent() {
    let repo = setup().await;
    let account = repo.create(new_account("frank@x.com")).await.unwrap();
    repo.set_refresh_token(account.id, "digest".into()).await.unwrap();

    repo.clear_refresh_token(account.id).await.unwrap();
    repo.clear_refresh_token(account.id).await.unwrap();

    let fetched = repo.get_by_id(account.id).await.unwrap();
    assert!(fetched.refresh_token_digest.is_none());
}

#[tokio::test]
async fn verification_is_single_use() {
    let repo = setup().await;
    let account = repo.create(new_account("gina@x.com")).await.unwrap();

    let verified = repo
        .consume_email_verification("verify-gina@x.com".into(), Utc::now())
        .await
        .unwrap()
        .expect("first consumption matches");
    assert_eq!(verified.id, account.id);
    assert!(verified.is_verified);
    assert!(verified.email_verification.is_none());

    let replay = repo
        .consume_email_verification("verify-gina@x.com".into(), Utc::now())
        .await
        .unwrap();
    assert!(replay.is_none());
}

#[tokio::test]
async fn expired_verification_does_not_match() {
    let repo = setup().await;
    let account = repo.create(new_account("hank@x.com")).await.unwrap();
    repo.set_email_verification(
        account.id,
        PendingToken {
            digest: "expired".into(),
            expires_at: Utc::now() - Duration::minutes(1),
        },
    )
    .await
    .unwrap();

    let result = repo
        .consume_email_verification("expired".into(), Utc::now())
        .await
        .unwrap();
    assert!(result.is_none());
    assert!(!repo.get_by_id(account.id).await.unwrap().is_verified);
}

#[tokio::test]
async fn password_reset_replaces_hash_and_drops_session() {
    let repo = setup().await;
    let account = repo.create(new_account("ivy@x.com")).await.unwrap();
    repo.set_refresh_token(account.id, "live".into()).await.unwrap();
    repo.set_password_reset(
        account.id,
        PendingToken {
            digest: "reset".into(),
            expires_at: Utc::now() + Duration::minutes(10),
        },
    )
    .await
    .unwrap();

    let updated = repo
        .consume_password_reset("reset".into(), Utc::now(), "$argon2id$new".into())
        .await
        .unwrap()
        .expect("reset token matches");
    assert_eq!(updated.password_hash.as_deref(), Some("$argon2id$new"));
    assert!(updated.refresh_token_digest.is_none());
    assert!(updated.password_reset.is_none());

    let replay = repo
        .consume_password_reset("reset".into(), Utc::now(), "$argon2id$other".into())
        .await
        .unwrap();
    assert!(replay.is_none());
}

#[tokio::test]
async fn deactivation_clears_session() {
    let repo = setup().await;
    let account = repo.create(new_account("jack@x.com")).await.unwrap();
    repo.set_refresh_token(account.id, "live".into()).await.unwrap();

    let inactive = repo.set_active(account.id, false).await.unwrap();
    assert!(!inactive.is_active);
    assert!(inactive.refresh_token_digest.is_none());

    let active = repo.set_active(account.id, true).await.unwrap();
    assert!(active.is_active);
}

#[tokio::test]
async fn role_change_and_delete() {
    let repo = setup().await;
    let account = repo.create(new_account("kim@x.com")).await.unwrap();

    let promoted = repo.set_role(account.id, Role::Agent).await.unwrap();
    assert_eq!(promoted.role, Role::Agent);

    repo.delete(account.id).await.unwrap();
    assert!(repo.get_by_id(account.id).await.is_err());
}
