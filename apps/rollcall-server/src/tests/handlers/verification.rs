//! Verification flow tests: issuance classification, one-time use, expiry,
//! resend invalidation and delivery partial failure.

use super::super::common::*;
use crate::handlers::verification::{
    issue_verification, resend_verification, validate_verification,
};
use crate::server::RollcallServer;
use chrono::{Duration, Utc};
use tonic::Request;
use rollcall_proto::{
    ErrorKind, IssueRequest, IssueResponse, ResendRequest, ValidateRequest, ValidateResponse,
};
use rollcall_storage::{RegistrantStore, StoreError, UpsertRegistrantParams};

async fn issue(server: &RollcallServer, email: &str) -> IssueResponse {
    issue_verification(
        server,
        Request::new(IssueRequest {
            email: email.to_string(),
        }),
    )
    .await
    .unwrap()
    .into_inner()
}

async fn resend(server: &RollcallServer, email: &str) -> IssueResponse {
    resend_verification(
        server,
        Request::new(ResendRequest {
            email: email.to_string(),
        }),
    )
    .await
    .unwrap()
    .into_inner()
}

async fn validate(server: &RollcallServer, email: &str, code: &str) -> ValidateResponse {
    validate_verification(
        server,
        Request::new(ValidateRequest {
            email: email.to_string(),
            code: code.to_string(),
        }),
    )
    .await
    .unwrap()
    .into_inner()
}

#[tokio::test]
async fn issue_creates_new_registrant_and_sends_code() {
    let (server, transport) = create_test_server_with_email().await;

    let response = issue(&server, "stu@dpu.edu").await;
    assert!(response.success);
    assert!(response.is_new_registrant);
    assert!(response.email_delivered);
    assert!(!response.registrant_id.is_empty());

    let sent = transport.sent.lock().unwrap().clone();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "stu@dpu.edu");

    // The emailed code is the persisted one, 6 digits, in both bodies
    let code = pending_code(&server, "stu@dpu.edu").await;
    assert_eq!(code.len(), 6);
    assert!(code.chars().all(|c| c.is_ascii_digit()));
    assert!(sent[0].text.contains(&code));
    assert!(sent[0].html.contains(&code));
}

#[tokio::test]
async fn reissue_classifies_existing_registrant() {
    let (server, _transport) = create_test_server_with_email().await;

    let first = issue(&server, "a@x.com").await;
    assert!(first.is_new_registrant);

    let before = server.store.get_registrant_by_email("a@x.com").await.unwrap();

    let second = issue(&server, "a@x.com").await;
    assert!(second.success);
    assert!(!second.is_new_registrant);
    assert_eq!(second.registrant_id, first.registrant_id);

    // id and created_at are stable across issuances
    let after = server.store.get_registrant_by_email("a@x.com").await.unwrap();
    assert_eq!(after.id, before.id);
    assert_eq!(after.created_at, before.created_at);
}

#[tokio::test]
async fn validate_marks_verified_and_token_is_single_use() {
    let (server, _transport) = create_test_server_with_email().await;

    issue(&server, "stu@dpu.edu").await;
    let code = pending_code(&server, "stu@dpu.edu").await;

    let ok = validate(&server, "stu@dpu.edu", &code).await;
    assert!(ok.success, "{}", ok.message);

    let registrant = server
        .store
        .get_registrant_by_email("stu@dpu.edu")
        .await
        .unwrap();
    assert!(registrant.verified);
    assert!(registrant.token.is_none());

    // Same code a second time: nothing is pending anymore
    let again = validate(&server, "stu@dpu.edu", &code).await;
    assert!(!again.success);
    assert_eq!(again.error_kind, ErrorKind::NoPendingToken as i32);
}

#[tokio::test]
async fn validate_rejects_expired_code() {
    let (server, _transport) = create_test_server_with_email().await;

    issue(&server, "a@x.com").await;
    let code = pending_code(&server, "a@x.com").await;

    // Age the token past its expiry directly in the store
    server
        .store
        .upsert_registrant(&UpsertRegistrantParams {
            email: "a@x.com".to_string(),
            code: code.clone(),
            expires_at: Utc::now() - Duration::minutes(1),
        })
        .await
        .unwrap();

    let response = validate(&server, "a@x.com", &code).await;
    assert!(!response.success);
    assert_eq!(response.error_kind, ErrorKind::TokenExpired as i32);

    // The token is left in place so a resend can replace it
    let registrant = server.store.get_registrant_by_email("a@x.com").await.unwrap();
    assert!(registrant.token.is_some());
    assert!(!registrant.verified);
}

#[tokio::test]
async fn resend_invalidates_previous_code() {
    let (server, _transport) = create_test_server_with_email().await;

    issue(&server, "a@x.com").await;
    let first_code = pending_code(&server, "a@x.com").await;

    let response = resend(&server, "a@x.com").await;
    assert!(response.success);
    assert!(!response.is_new_registrant);

    let second_code = pending_code(&server, "a@x.com").await;
    assert_ne!(first_code, second_code);

    // The replaced code is dead even though it never expired
    let stale = validate(&server, "a@x.com", &first_code).await;
    assert!(!stale.success);
    assert_eq!(stale.error_kind, ErrorKind::TokenMismatch as i32);

    let fresh = validate(&server, "a@x.com", &second_code).await;
    assert!(fresh.success);
}

#[tokio::test]
async fn mismatch_leaves_registrant_pending() {
    let (server, _transport) = create_test_server_with_email().await;

    issue(&server, "a@x.com").await;
    let code = pending_code(&server, "a@x.com").await;
    let wrong = if code == "000000" { "000001" } else { "000000" };

    let response = validate(&server, "a@x.com", wrong).await;
    assert!(!response.success);
    assert_eq!(response.error_kind, ErrorKind::TokenMismatch as i32);

    // Still pending with the same code; the right one still works
    let registrant = server.store.get_registrant_by_email("a@x.com").await.unwrap();
    assert!(!registrant.verified);
    assert_eq!(registrant.token.unwrap().code, code);

    let ok = validate(&server, "a@x.com", &code).await;
    assert!(ok.success);
}

#[tokio::test]
async fn issue_rejects_malformed_email() {
    let (server, transport) = create_test_server_with_email().await;

    for bad in ["", "no-at-sign", "a@nodot", "two@@x.com", "a b@x.com"] {
        let response = issue(&server, bad).await;
        assert!(!response.success, "should reject {:?}", bad);
        assert_eq!(response.error_kind, ErrorKind::InvalidEmail as i32);
    }

    assert!(transport.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn validate_rejects_malformed_email() {
    let (server, _transport) = create_test_server_with_email().await;

    let response = validate(&server, "not-an-email", "123456").await;
    assert!(!response.success);
    assert_eq!(response.error_kind, ErrorKind::InvalidEmail as i32);
}

#[tokio::test]
async fn validate_unknown_email_maps_to_not_found() {
    let (server, _transport) = create_test_server_with_email().await;

    let response = validate(&server, "nobody@x.com", "123456").await;
    assert!(!response.success);
    assert_eq!(response.error_kind, ErrorKind::NotFound as i32);
}

#[tokio::test]
async fn issue_refused_for_verified_registrant() {
    let (server, _transport) = create_test_server_with_email().await;

    issue(&server, "a@x.com").await;
    let code = pending_code(&server, "a@x.com").await;
    validate(&server, "a@x.com", &code).await;

    let response = issue(&server, "a@x.com").await;
    assert!(!response.success);
    assert_eq!(response.error_kind, ErrorKind::AlreadyVerified as i32);

    let response = resend(&server, "a@x.com").await;
    assert!(!response.success);
    assert_eq!(response.error_kind, ErrorKind::AlreadyVerified as i32);

    // Still verified, still no pending token
    let registrant = server.store.get_registrant_by_email("a@x.com").await.unwrap();
    assert!(registrant.verified);
    assert!(registrant.token.is_none());
}

#[tokio::test]
async fn emails_are_normalized_before_use() {
    let (server, transport) = create_test_server_with_email().await;

    let response = issue(&server, "  STU@DPU.edu ").await;
    assert!(response.success);
    assert!(response.is_new_registrant);

    // Stored and emailed under the normalized form
    let sent = transport.sent.lock().unwrap().clone();
    assert_eq!(sent[0].to, "stu@dpu.edu");
    let registrant = server
        .store
        .get_registrant_by_email("stu@dpu.edu")
        .await
        .unwrap();
    assert_eq!(registrant.email, "stu@dpu.edu");

    // A differently-cased issue folds onto the same row
    let again = issue(&server, "Stu@dpu.EDU").await;
    assert!(!again.is_new_registrant);

    let code = pending_code(&server, "stu@dpu.edu").await;
    let ok = validate(&server, "stu@dpu.edu", &code).await;
    assert!(ok.success);
}

#[tokio::test]
async fn failed_delivery_keeps_registrant_usable() {
    let server = create_test_server_with_failing_email().await;

    let response = issue(&server, "a@x.com").await;
    // The store outcome is still reported; delivery failure is distinct
    assert!(response.success);
    assert!(response.is_new_registrant);
    assert!(!response.email_delivered);
    assert_eq!(response.error_kind, ErrorKind::EmailDeliveryFailed as i32);

    // The persisted code is valid even though the user never got the email
    let code = pending_code(&server, "a@x.com").await;
    let ok = validate(&server, "a@x.com", &code).await;
    assert!(ok.success);
}

#[tokio::test]
async fn issue_without_dispatcher_is_refused_and_writes_nothing() {
    let server = create_test_server().await;

    let response = issue(&server, "a@x.com").await;
    assert!(!response.success);
    assert_eq!(response.error_kind, ErrorKind::EmailDeliveryFailed as i32);

    let lookup = server.store.get_registrant_by_email("a@x.com").await;
    assert!(matches!(lookup, Err(StoreError::NotFound)));
}

#[tokio::test]
async fn full_flow_issue_validate_repeat() {
    let (server, transport) = create_test_server_with_email().await;

    let issued = issue(&server, "stu@dpu.edu").await;
    assert!(issued.success && issued.is_new_registrant);

    let sent = transport.sent.lock().unwrap().clone();
    let code = pending_code(&server, "stu@dpu.edu").await;
    assert!(sent[0].text.contains(&code));

    let ok = validate(&server, "stu@dpu.edu", &code).await;
    assert!(ok.success);

    let registrant = server
        .store
        .get_registrant_by_email("stu@dpu.edu")
        .await
        .unwrap();
    assert!(registrant.verified);
    assert!(registrant.token.is_none());

    let repeat = validate(&server, "stu@dpu.edu", &code).await;
    assert!(!repeat.success);
    assert_eq!(repeat.error_kind, ErrorKind::NoPendingToken as i32);
}
