//! Embedded schema migrations and their ledger.
//!
//! Applied versions are recorded in `_sqlx_migrations`; the migrator holds a
//! Postgres advisory lock while it runs and wraps each migration in its own
//! transaction.

use std::collections::BTreeSet;

use sqlx::PgPool;
use sqlx::migrate::{Migrate, Migrator};
use tracing::info;

use crate::infra::error::InfraError;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationState {
    Applied,
    Pending,
}

impl MigrationState {
    pub fn as_str(self) -> &'static str {
        match self {
            MigrationState::Applied => "applied",
            MigrationState::Pending => "pending",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStatus {
    pub version: i64,
    pub description: String,
    pub state: MigrationState,
}

pub struct Migrations {
    pool: PgPool,
}

impl Migrations {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Every embedded version, oldest first.
    pub fn versions() -> Vec<i64> {
        MIGRATOR
            .iter()
            .filter(|migration| !migration.migration_type.is_down_migration())
            .map(|migration| migration.version)
            .collect()
    }

    /// Apply pending migrations, returning the versions applied by this call.
    pub async fn run(&self) -> Result<Vec<i64>, InfraError> {
        let before = self.applied_versions().await?;
        MIGRATOR.run(&self.pool).await?;
        let after = self.applied_versions().await?;

        let applied: Vec<i64> = after.difference(&before).copied().collect();
        for version in &applied {
            info!(target = "quire::migrations", version, "migration applied");
        }
        info!(
            target = "quire::migrations",
            applied = applied.len(),
            total = after.len(),
            "migrations up to date"
        );
        Ok(applied)
    }

    /// Undo applied migrations newer than `target`. Without a target only the
    /// most recent migration is undone.
    pub async fn revert(&self, target: Option<i64>) -> Result<Vec<i64>, InfraError> {
        let applied = self.applied_versions().await?;
        let Some(latest) = applied.last().copied() else {
            return Ok(Vec::new());
        };
        let target = target.unwrap_or_else(|| {
            applied
                .range(..latest)
                .next_back()
                .copied()
                .unwrap_or(0)
        });

        MIGRATOR.undo(&self.pool, target).await?;

        let reverted: Vec<i64> = applied
            .iter()
            .rev()
            .filter(|version| **version > target)
            .copied()
            .collect();
        for version in &reverted {
            info!(target = "quire::migrations", version, "migration reverted");
        }
        Ok(reverted)
    }

    pub async fn status(&self) -> Result<Vec<MigrationStatus>, InfraError> {
        let applied = self.applied_versions().await?;
        Ok(MIGRATOR
            .iter()
            .filter(|migration| !migration.migration_type.is_down_migration())
            .map(|migration| MigrationStatus {
                version: migration.version,
                description: migration.description.to_string(),
                state: if applied.contains(&migration.version) {
                    MigrationState::Applied
                } else {
                    MigrationState::Pending
                },
            })
            .collect())
    }

    async fn applied_versions(&self) -> Result<BTreeSet<i64>, InfraError> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(InfraError::Ledger)?;
        conn.ensure_migrations_table().await?;
        let applied = conn.list_applied_migrations().await?;
        Ok(applied
            .into_iter()
            .map(|migration| migration.version)
            .collect())
    }
}
