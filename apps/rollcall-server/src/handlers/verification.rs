//! Email verification handlers: issue, validate, resend.
//!
//! State per registrant is derived from stored fields, never tracked
//! separately: no row → unregistered; pending token with a future expiry →
//! pending; pending token past expiry → expired; verified with no token →
//! verified (terminal).

use chrono::{Duration, Utc};
use tonic::{Request, Response, Status};
use rollcall_proto::{
    ErrorKind, IssueRequest, IssueResponse, ResendRequest, ValidateRequest, ValidateResponse,
};
use rollcall_storage::{RegistrantStore, StoreError, UpsertRegistrantParams};

use crate::email::generate_verification_code;
use crate::metrics::record_verification_failure;
use crate::server::RollcallServer;

/// How long an issued code stays valid.
const TOKEN_TTL_MINUTES: i64 = 30;

/// Handle an issuance request: generate a code, persist it, email it.
///
/// Does not require authentication; possession of the emailed code is what
/// proves control of the address.
pub async fn issue_verification(
    server: &RollcallServer,
    request: Request<IssueRequest>,
) -> Result<Response<IssueResponse>, Status> {
    let req = request.into_inner();
    Ok(Response::new(issue_code(server, &req.email).await))
}

/// Handle a resend request.
///
/// Resend is issuance: it always generates a brand-new code and overwrites
/// the old one, no matter how much validity the old one had left.
pub async fn resend_verification(
    server: &RollcallServer,
    request: Request<ResendRequest>,
) -> Result<Response<IssueResponse>, Status> {
    let req = request.into_inner();
    Ok(Response::new(issue_code(server, &req.email).await))
}

async fn issue_code(server: &RollcallServer, raw_email: &str) -> IssueResponse {
    let email = normalize_email(raw_email);
    if !is_valid_email(&email) {
        return issue_failure(
            ErrorKind::InvalidEmail,
            "That email address is not valid.",
        );
    }

    let Some(ref dispatcher) = server.email else {
        return issue_failure(
            ErrorKind::EmailDeliveryFailed,
            "Email delivery is not configured. Contact your administrator.",
        );
    };

    // Verified is terminal: a finished registrant never gets a new code.
    match server.store.get_registrant_by_email(&email).await {
        Ok(r) if r.verified => {
            return issue_failure(
                ErrorKind::AlreadyVerified,
                "This email address is already verified.",
            );
        }
        Ok(_) | Err(StoreError::NotFound) => {}
        Err(e) => return store_unavailable_issue(&email, e),
    }

    let code = generate_verification_code();
    let expires_at = Utc::now() + Duration::minutes(TOKEN_TTL_MINUTES);

    let (registrant, is_new) = match server
        .store
        .upsert_registrant(&UpsertRegistrantParams {
            email: email.clone(),
            code: code.clone(),
            expires_at,
        })
        .await
    {
        Ok(v) => v,
        Err(e) => return store_unavailable_issue(&email, e),
    };

    let mut response = IssueResponse {
        success: true,
        message: "Verification code sent. Please check your email.".to_string(),
        error_kind: ErrorKind::Unspecified.into(),
        registrant_id: registrant.id.0.to_string(),
        is_new_registrant: is_new,
        email_delivered: true,
    };

    // The record is not rolled back when the send fails: the code was
    // generated and persisted, and resend is the recovery path.
    if let Err(e) = dispatcher.send_code(&email, &code).await {
        tracing::warn!(email = %email, error = %e, "verification email delivery failed");
        record_verification_failure(kind_label(ErrorKind::EmailDeliveryFailed));
        response.message =
            "Your code was created but the email could not be delivered. Please use resend."
                .to_string();
        response.error_kind = ErrorKind::EmailDeliveryFailed.into();
        response.email_delivered = false;
    }

    response
}

/// Handle a validation request: check the submitted code against the
/// pending one and mark the registrant verified on an exact in-date match.
pub async fn validate_verification(
    server: &RollcallServer,
    request: Request<ValidateRequest>,
) -> Result<Response<ValidateResponse>, Status> {
    let req = request.into_inner();

    let email = normalize_email(&req.email);
    if !is_valid_email(&email) {
        return Ok(Response::new(validate_failure(
            ErrorKind::InvalidEmail,
            "That email address is not valid.",
        )));
    }

    let registrant = match server.store.get_registrant_by_email(&email).await {
        Ok(r) => r,
        Err(StoreError::NotFound) => {
            return Ok(Response::new(validate_failure(
                ErrorKind::NotFound,
                "No registration found for this email address.",
            )));
        }
        Err(e) => {
            tracing::error!(email = %email, error = %e, "registrant store unavailable");
            return Ok(Response::new(validate_failure(
                ErrorKind::StoreUnavailable,
                "The registration store is unavailable. Please try again.",
            )));
        }
    };

    let Some(pending) = registrant.token else {
        return Ok(Response::new(validate_failure(
            ErrorKind::NoPendingToken,
            "No verification code is pending for this address. Please request a new code.",
        )));
    };

    // The token stays in place on expiry so a resend can replace it, but
    // validation never succeeds against an expired code.
    if pending.is_expired(Utc::now()) {
        return Ok(Response::new(validate_failure(
            ErrorKind::TokenExpired,
            "Verification code has expired. Please request a new code.",
        )));
    }

    // Exact match, constant-time; codes are numeric so there is no case to fold.
    let code_matches: bool =
        subtle::ConstantTimeEq::ct_eq(req.code.as_bytes(), pending.code.as_bytes()).into();
    if !code_matches {
        return Ok(Response::new(validate_failure(
            ErrorKind::TokenMismatch,
            "Invalid verification code.",
        )));
    }

    // Conditional on the code just checked: a concurrent resend that
    // replaced it makes this a Conflict, so a stale code can never win.
    match server.store.mark_verified(&email, &pending.code).await {
        Ok(()) => Ok(Response::new(ValidateResponse {
            success: true,
            message: "Email verified successfully.".to_string(),
            error_kind: ErrorKind::Unspecified.into(),
        })),
        Err(StoreError::Conflict) => Ok(Response::new(validate_failure(
            ErrorKind::TokenMismatch,
            "Invalid verification code.",
        ))),
        Err(StoreError::NotFound) => Ok(Response::new(validate_failure(
            ErrorKind::NotFound,
            "No registration found for this email address.",
        ))),
        Err(e) => {
            tracing::error!(email = %email, error = %e, "registrant store unavailable");
            Ok(Response::new(validate_failure(
                ErrorKind::StoreUnavailable,
                "The registration store is unavailable. Please try again.",
            )))
        }
    }
}

fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Cheap syntactic check; deliverability is proven by the code anyway.
fn is_valid_email(email: &str) -> bool {
    if email.is_empty() || email.len() > 254 || email.chars().any(char::is_whitespace) {
        return false;
    }
    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 {
        return false;
    }
    let (local, domain) = (parts[0], parts[1]);
    !local.is_empty()
        && !domain.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

fn issue_failure(kind: ErrorKind, message: &str) -> IssueResponse {
    record_verification_failure(kind_label(kind));
    IssueResponse {
        success: false,
        message: message.to_string(),
        error_kind: kind.into(),
        registrant_id: String::new(),
        is_new_registrant: false,
        email_delivered: false,
    }
}

fn validate_failure(kind: ErrorKind, message: &str) -> ValidateResponse {
    record_verification_failure(kind_label(kind));
    ValidateResponse {
        success: false,
        message: message.to_string(),
        error_kind: kind.into(),
    }
}

fn store_unavailable_issue(email: &str, err: StoreError) -> IssueResponse {
    tracing::error!(email = %email, error = %err, "registrant store unavailable");
    issue_failure(
        ErrorKind::StoreUnavailable,
        "The registration store is unavailable. Please try again.",
    )
}

fn kind_label(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::Unspecified => "unspecified",
        ErrorKind::InvalidEmail => "invalid_email",
        ErrorKind::NotFound => "not_found",
        ErrorKind::NoPendingToken => "no_pending_token",
        ErrorKind::TokenExpired => "token_expired",
        ErrorKind::TokenMismatch => "token_mismatch",
        ErrorKind::AlreadyVerified => "already_verified",
        ErrorKind::StoreUnavailable => "store_unavailable",
        ErrorKind::EmailDeliveryFailed => "email_delivery_failed",
    }
}
