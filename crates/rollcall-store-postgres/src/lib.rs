use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use uuid::Uuid;
use rollcall_storage::{
    PendingToken, Registrant, RegistrantId, RegistrantStore, StoreError, UpsertRegistrantParams,
};

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");


type RegistrantRow = (
    Uuid,                     // id
    String,                   // email
    Option<String>,           // current_token
    Option<DateTime<Utc>>,    // token_expires_at
    bool,                     // verified
    DateTime<Utc>,            // created_at
    DateTime<Utc>,            // updated_at
);

pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub async fn open(url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(5))
            .connect(url)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        MIGRATOR
            .run(&pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(Self { pool })
    }
}

fn from_row(row: RegistrantRow) -> Registrant {
    let (id, email, current_token, token_expires_at, verified, created_at, updated_at) = row;
    let token = match (current_token, token_expires_at) {
        (Some(code), Some(expires_at)) => Some(PendingToken { code, expires_at }),
        _ => None,
    };
    Registrant {
        id: RegistrantId(id),
        email,
        token,
        verified,
        created_at,
        updated_at,
    }
}

#[async_trait::async_trait]
impl RegistrantStore for PostgresStore {
    async fn upsert_registrant(
        &self,
        params: &UpsertRegistrantParams,
    ) -> Result<(Registrant, bool), StoreError> {
        // Candidate id for the insert arm; on conflict the existing id comes
        // back instead, which is how new-vs-existing is decided race-free.
        let candidate = Uuid::now_v7();
        let now = Utc::now();

        let row = sqlx::query_as::<_, RegistrantRow>(
            "INSERT INTO registrants(id,email,current_token,token_expires_at,verified,created_at,updated_at)
             VALUES($1,$2,$3,$4,FALSE,$5,$5)
             ON CONFLICT(email)
             DO UPDATE SET current_token=excluded.current_token,
                           token_expires_at=excluded.token_expires_at,
                           updated_at=excluded.updated_at
             RETURNING id,email,current_token,token_expires_at,verified,created_at,updated_at",
        )
        .bind(candidate)
        .bind(&params.email)
        .bind(&params.code)
        .bind(params.expires_at)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;

        let registrant = from_row(row);
        let is_new = registrant.id.0 == candidate;
        Ok((registrant, is_new))
    }

    async fn get_registrant_by_email(&self, email: &str) -> Result<Registrant, StoreError> {
        let row = sqlx::query_as::<_, RegistrantRow>(
            "SELECT id,email,current_token,token_expires_at,verified,created_at,updated_at
             FROM registrants WHERE email=$1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;

        row.map(from_row).ok_or(StoreError::NotFound)
    }

    async fn mark_verified(&self, email: &str, expected_token: &str) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE registrants
             SET verified=TRUE, current_token=NULL, token_expires_at=NULL, updated_at=$1
             WHERE email=$2 AND current_token=$3",
        )
        .bind(Utc::now())
        .bind(email)
        .bind(expected_token)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;

        if result.rows_affected() == 1 {
            return Ok(());
        }

        // Nothing matched: either the row is gone or the token was replaced
        // by a concurrent resend (or already consumed).
        let exists =
            sqlx::query_as::<_, (i64,)>("SELECT COUNT(*) FROM registrants WHERE email=$1")
                .bind(email)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| StoreError::Backend(e.to_string()))?;

        if exists.0 == 0 {
            Err(StoreError::NotFound)
        } else {
            Err(StoreError::Conflict)
        }
    }

    async fn cleanup_expired_tokens(&self) -> Result<u64, StoreError> {
        let now = Utc::now();
        let result = sqlx::query(
            "UPDATE registrants
             SET current_token=NULL, token_expires_at=NULL, updated_at=$1
             WHERE current_token IS NOT NULL AND token_expires_at < $1",
        )
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(result.rows_affected())
    }
}
