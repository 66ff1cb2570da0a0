use crate::backend::StoreBackend;
use crate::email::EmailDispatcher;
use std::sync::Arc;
use rollcall_store_postgres::PostgresStore;
use rollcall_store_sqlite::SqliteStore;

/// Shared service state: the durable registrant store and the outbound
/// email dispatcher (absent when no provider is configured).
#[derive(Clone)]
pub struct RollcallServer {
    pub store: StoreBackend,
    pub email: Option<Arc<EmailDispatcher>>,
}

impl RollcallServer {
    pub fn new_sqlite(store: Arc<SqliteStore>, email: Option<Arc<EmailDispatcher>>) -> Self {
        Self {
            store: StoreBackend::Sqlite(store),
            email,
        }
    }

    pub fn new_postgres(store: Arc<PostgresStore>, email: Option<Arc<EmailDispatcher>>) -> Self {
        Self {
            store: StoreBackend::Postgres(store),
            email,
        }
    }
}
