//! Account schema and the versioned migration runner.
//!
//! All table definitions use SCHEMAFULL mode. UUIDs are stored as
//! record keys; enums are stored as strings with ASSERT constraints.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;

use crate::error::DbError;

/// Bookkeeping table: one row per applied migration.
const LEDGER_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS schema_version SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE schema_version TYPE int;
DEFINE FIELD IF NOT EXISTS label ON TABLE schema_version TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE schema_version TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_schema_version ON TABLE schema_version \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct AppliedVersion {
    version: u32,
}

struct Migration {
    version: u32,
    label: &'static str,
    ddl: &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    label: "account_credentials",
    ddl: SCHEMA_V1,
}];

// Schema v1: accounts

const SCHEMA_V1: &str = "\
DEFINE TABLE account SCHEMAFULL;
DEFINE FIELD email ON TABLE account TYPE string;
DEFINE FIELD password_hash ON TABLE account TYPE option<string>;
DEFINE FIELD federated_id ON TABLE account TYPE option<string>;
DEFINE FIELD role ON TABLE account TYPE string \
    ASSERT $value IN ['user', 'agent', 'admin'];
DEFINE FIELD is_active ON TABLE account TYPE bool DEFAULT true;
DEFINE FIELD is_verified ON TABLE account TYPE bool DEFAULT false;
DEFINE FIELD refresh_token_digest ON TABLE account TYPE option<string>;
DEFINE FIELD email_verification_digest ON TABLE account \
    TYPE option<string>;
DEFINE FIELD email_verification_expires_at ON TABLE account \
    TYPE option<datetime>;
DEFINE FIELD password_reset_digest ON TABLE account TYPE option<string>;
DEFINE FIELD password_reset_expires_at ON TABLE account \
    TYPE option<datetime>;
DEFINE FIELD last_login_at ON TABLE account TYPE option<datetime>;
DEFINE FIELD name ON TABLE account TYPE string;
DEFINE FIELD phone ON TABLE account TYPE option<string>;
DEFINE FIELD avatar_url ON TABLE account TYPE option<string>;
DEFINE FIELD created_at ON TABLE account TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE account TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_account_email ON TABLE account COLUMNS email UNIQUE;
DEFINE INDEX idx_account_verification ON TABLE account \
    COLUMNS email_verification_digest;
DEFINE INDEX idx_account_reset ON TABLE account \
    COLUMNS password_reset_digest;
";

async fn applied_version<C: Connection>(db: &Surreal<C>) -> Result<u32, DbError> {
    let mut result = db
        .query("SELECT version FROM schema_version ORDER BY version DESC LIMIT 1")
        .await?;
    let rows: Vec<AppliedVersion> = result.take(0)?;
    Ok(rows.into_iter().next().map_or(0, |row| row.version))
}

impl Migration {
    async fn apply<C: Connection>(&self, db: &Surreal<C>) -> Result<(), DbError> {
        info!(version = self.version, label = self.label, "Applying schema migration");
        db.query(self.ddl)
            .await?
            .check()
            .map_err(|e| DbError::Migration(format!("v{} ({}): {e}", self.version, self.label)))?;

        db.query("CREATE schema_version SET version = $version, label = $label")
            .bind(("version", self.version))
            .bind(("label", self.label))
            .await?
            .check()
            .map_err(|e| DbError::Migration(format!("recording v{}: {e}", self.version)))?;
        Ok(())
    }
}

/// Bring the database up to the latest schema. Safe to call on every start.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    db.query(LEDGER_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    let applied = applied_version(db).await?;
    for migration in MIGRATIONS.iter().filter(|m| m.version > applied) {
        migration.apply(db).await?;
    }
    Ok(())
}

/// Returns the raw schema DDL for version 1.
pub fn schema_v1() -> &'static str {
    SCHEMA_V1
}
