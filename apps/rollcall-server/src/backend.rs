use std::sync::Arc;
use rollcall_storage::{Registrant, RegistrantStore, StoreError, UpsertRegistrantParams};
use rollcall_store_postgres::PostgresStore;
use rollcall_store_sqlite::SqliteStore;

/// StoreBackend abstracts over SQLite and PostgreSQL implementations
#[derive(Clone)]
pub enum StoreBackend {
    Sqlite(Arc<SqliteStore>),
    Postgres(Arc<PostgresStore>),
}

#[async_trait::async_trait]
impl RegistrantStore for StoreBackend {
    async fn upsert_registrant(
        &self,
        params: &UpsertRegistrantParams,
    ) -> Result<(Registrant, bool), StoreError> {
        match self {
            StoreBackend::Sqlite(s) => s.upsert_registrant(params).await,
            StoreBackend::Postgres(s) => s.upsert_registrant(params).await,
        }
    }

    async fn get_registrant_by_email(&self, email: &str) -> Result<Registrant, StoreError> {
        match self {
            StoreBackend::Sqlite(s) => s.get_registrant_by_email(email).await,
            StoreBackend::Postgres(s) => s.get_registrant_by_email(email).await,
        }
    }

    async fn mark_verified(&self, email: &str, expected_token: &str) -> Result<(), StoreError> {
        match self {
            StoreBackend::Sqlite(s) => s.mark_verified(email, expected_token).await,
            StoreBackend::Postgres(s) => s.mark_verified(email, expected_token).await,
        }
    }

    async fn cleanup_expired_tokens(&self) -> Result<u64, StoreError> {
        match self {
            StoreBackend::Sqlite(s) => s.cleanup_expired_tokens().await,
            StoreBackend::Postgres(s) => s.cleanup_expired_tokens().await,
        }
    }
}
