//! Principal directory: the external relational collaborator.
//!
//! The abuse-protection core only needs two operations from the data layer,
//! so they live behind a narrow trait. Production uses Postgres; tests use
//! the in-memory directory and never touch a database.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::Instrument;
use uuid::Uuid;

/// A stored principal with its secret digest.
#[derive(Debug, Clone)]
pub struct PrincipalRecord {
    pub id: Uuid,
    pub username: String,
    pub password_digest: String,
}

/// Outcome when attempting to create a principal.
#[derive(Debug)]
pub enum CreateOutcome {
    Created(PrincipalRecord),
    Conflict,
}

#[async_trait]
pub trait PrincipalDirectory: Send + Sync {
    async fn find(&self, username: &str) -> Result<Option<PrincipalRecord>>;

    async fn create(&self, username: &str, password_digest: &str) -> Result<CreateOutcome>;
}

pub struct PgPrincipalDirectory {
    pool: PgPool,
}

impl PgPrincipalDirectory {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

#[async_trait]
impl PrincipalDirectory for PgPrincipalDirectory {
    async fn find(&self, username: &str) -> Result<Option<PrincipalRecord>> {
        let query = "SELECT id, username, password_digest FROM principals WHERE username = $1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(username)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to look up principal")?;

        Ok(row.map(|row| PrincipalRecord {
            id: row.get("id"),
            username: row.get("username"),
            password_digest: row.get("password_digest"),
        }))
    }

    async fn create(&self, username: &str, password_digest: &str) -> Result<CreateOutcome> {
        let query =
            "INSERT INTO principals (username, password_digest) VALUES ($1, $2) RETURNING id";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(username)
            .bind(password_digest)
            .fetch_one(&self.pool)
            .instrument(span)
            .await;

        match row {
            Ok(row) => Ok(CreateOutcome::Created(PrincipalRecord {
                id: row.get("id"),
                username: username.to_string(),
                password_digest: password_digest.to_string(),
            })),
            // Two concurrent signups can both pass the existence check; the
            // unique index breaks the tie.
            Err(err) if is_unique_violation(&err) => Ok(CreateOutcome::Conflict),
            Err(err) => Err(err).context("failed to create principal"),
        }
    }
}

/// In-process directory for tests and local development.
#[derive(Debug, Default)]
pub struct MemoryPrincipalDirectory {
    entries: Mutex<HashMap<String, PrincipalRecord>>,
}

impl MemoryPrincipalDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PrincipalDirectory for MemoryPrincipalDirectory {
    async fn find(&self, username: &str) -> Result<Option<PrincipalRecord>> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(username).cloned())
    }

    async fn create(&self, username: &str, password_digest: &str) -> Result<CreateOutcome> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if entries.contains_key(username) {
            return Ok(CreateOutcome::Conflict);
        }
        let record = PrincipalRecord {
            id: Uuid::new_v4(),
            username: username.to_string(),
            password_digest: password_digest.to_string(),
        };
        entries.insert(username.to_string(), record.clone());
        Ok(CreateOutcome::Created(record))
    }
}
