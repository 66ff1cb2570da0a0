//! Common test helpers and utilities for server tests.
//!
//! Provides shared test infrastructure: server factories backed by
//! in-memory SQLite, plus in-process email transports that capture or
//! reject messages so the full issuance flow runs without a real provider.

use crate::email::{EmailDispatcher, EmailTransport, SendError};
use crate::server::RollcallServer;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use rollcall_storage::RegistrantStore;
use rollcall_store_sqlite::SqliteStore;

/// One message as handed to the transport.
#[derive(Clone, Debug)]
pub struct CapturedEmail {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

/// Transport that records every message and reports success.
#[derive(Clone, Default)]
pub struct CaptureTransport {
    pub sent: Arc<Mutex<Vec<CapturedEmail>>>,
}

#[async_trait]
impl EmailTransport for CaptureTransport {
    async fn send(
        &self,
        to: &str,
        subject: &str,
        text: &str,
        html: &str,
    ) -> Result<(), SendError> {
        self.sent.lock().unwrap().push(CapturedEmail {
            to: to.to_string(),
            subject: subject.to_string(),
            text: text.to_string(),
            html: html.to_string(),
        });
        Ok(())
    }
}

/// Transport that always reports a provider rejection.
pub struct RejectingTransport;

#[async_trait]
impl EmailTransport for RejectingTransport {
    async fn send(
        &self,
        _to: &str,
        _subject: &str,
        _text: &str,
        _html: &str,
    ) -> Result<(), SendError> {
        Err(SendError::TransportRejected {
            status: 401,
            body: r#"{"errors":[{"message":"The provided authorization grant is invalid"}]}"#
                .to_string(),
        })
    }
}

/// Test helper: server with in-memory SQLite and no email dispatcher.
pub async fn create_test_server() -> RollcallServer {
    let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
    RollcallServer::new_sqlite(store, None)
}

/// Test helper: server with in-memory SQLite and a capturing transport.
/// Returns the transport so tests can inspect delivered messages.
pub async fn create_test_server_with_email() -> (RollcallServer, CaptureTransport) {
    let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
    let transport = CaptureTransport::default();
    let dispatcher = Arc::new(EmailDispatcher::with_transport(Box::new(transport.clone())));
    (RollcallServer::new_sqlite(store, Some(dispatcher)), transport)
}

/// Test helper: server whose transport rejects every send.
pub async fn create_test_server_with_failing_email() -> RollcallServer {
    let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
    let dispatcher = Arc::new(EmailDispatcher::with_transport(Box::new(RejectingTransport)));
    RollcallServer::new_sqlite(store, Some(dispatcher))
}

/// Test helper: the code currently pending for an email, straight from the
/// store.
pub async fn pending_code(server: &RollcallServer, email: &str) -> String {
    server
        .store
        .get_registrant_by_email(email)
        .await
        .unwrap()
        .token
        .unwrap()
        .code
}
