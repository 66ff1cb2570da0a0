use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::time::Duration;
use uuid::Uuid;
use rollcall_storage::{
    PendingToken, Registrant, RegistrantId, RegistrantStore, StoreError, UpsertRegistrantParams,
};

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

type RegistrantRow = (
    String,         // id
    String,         // email
    Option<String>, // current_token
    Option<i64>,    // token_expires_at
    i64,            // verified
    i64,            // created_at
    i64,            // updated_at
);

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// `~/.rollcall/registry.db` (creates dir with 0700 perms on unix)
    pub async fn open_default() -> Result<Self, StoreError> {
        let dir = dirs::home_dir()
            .ok_or_else(|| StoreError::Backend("no home dir".into()))?
            .join(".rollcall");
        std::fs::create_dir_all(&dir).map_err(|e| StoreError::Backend(e.to_string()))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&dir, std::fs::Permissions::from_mode(0o700))
                .map_err(|e| StoreError::Backend(e.to_string()))?;
        }
        let path = dir.join("registry.db");
        let url = format!("sqlite://{}?mode=rwc", path.to_string_lossy());
        Self::open(&url).await
    }

    pub async fn open_in_memory() -> Result<Self, StoreError> {
        Self::open("sqlite::memory:").await
    }

    pub async fn open(url: &str) -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
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

fn from_row(row: RegistrantRow) -> Result<Registrant, StoreError> {
    let (id, email, current_token, token_expires_at, verified, created_at, updated_at) = row;
    let id = Uuid::try_parse(&id).map_err(|e| StoreError::Backend(e.to_string()))?;
    let token = match (current_token, token_expires_at) {
        (Some(code), Some(expires_at)) => Some(PendingToken {
            code,
            expires_at: ts(expires_at)?,
        }),
        _ => None,
    };
    Ok(Registrant {
        id: RegistrantId(id),
        email,
        token,
        verified: verified != 0,
        created_at: ts(created_at)?,
        updated_at: ts(updated_at)?,
    })
}

fn ts(secs: i64) -> Result<DateTime<Utc>, StoreError> {
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| StoreError::Backend(format!("invalid timestamp {secs}")))
}

#[async_trait::async_trait]
impl RegistrantStore for SqliteStore {
    async fn upsert_registrant(
        &self,
        params: &UpsertRegistrantParams,
    ) -> Result<(Registrant, bool), StoreError> {
        // Candidate id for the insert arm; on conflict the existing id comes
        // back instead, which is how new-vs-existing is decided race-free.
        let candidate = Uuid::now_v7();
        let now = Utc::now().timestamp();

        let row = sqlx::query_as::<_, RegistrantRow>(
            "INSERT INTO registrants(id,email,current_token,token_expires_at,verified,created_at,updated_at)
             VALUES(?,?,?,?,0,?,?)
             ON CONFLICT(email)
             DO UPDATE SET current_token=excluded.current_token,
                           token_expires_at=excluded.token_expires_at,
                           updated_at=excluded.updated_at
             RETURNING id,email,current_token,token_expires_at,verified,created_at,updated_at",
        )
        .bind(candidate.to_string())
        .bind(&params.email)
        .bind(&params.code)
        .bind(params.expires_at.timestamp())
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;

        let registrant = from_row(row)?;
        let is_new = registrant.id.0 == candidate;
        Ok((registrant, is_new))
    }

    async fn get_registrant_by_email(&self, email: &str) -> Result<Registrant, StoreError> {
        let row = sqlx::query_as::<_, RegistrantRow>(
            "SELECT id,email,current_token,token_expires_at,verified,created_at,updated_at
             FROM registrants WHERE email=?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;

        match row {
            None => Err(StoreError::NotFound),
            Some(row) => from_row(row),
        }
    }

    async fn mark_verified(&self, email: &str, expected_token: &str) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE registrants
             SET verified=1, current_token=NULL, token_expires_at=NULL, updated_at=?
             WHERE email=? AND current_token=?",
        )
        .bind(Utc::now().timestamp())
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
        let exists = sqlx::query_as::<_, (i64,)>("SELECT COUNT(*) FROM registrants WHERE email=?")
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
        let now = Utc::now().timestamp();
        let result = sqlx::query(
            "UPDATE registrants
             SET current_token=NULL, token_expires_at=NULL, updated_at=?
             WHERE current_token IS NOT NULL AND token_expires_at < ?",
        )
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(result.rows_affected())
    }
}
