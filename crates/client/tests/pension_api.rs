//! Calculation service client against a local stub server.

mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use assert_matches::assert_matches;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use pension_client::api::{ApiError, PensionApi};
use pension_core::answers::{Age, EducationLevel, FormAnswers, Gender};
use pension_core::types::SessionId;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use common::{calculation_json, spawn_stub};

fn ana() -> FormAnswers {
    FormAnswers {
        name: "Ana".into(),
        age: Age { years: 30, months: 0 },
        gender: Some(Gender::Female),
        retirement_age: 65,
        account_balance: 5_000_000,
        gross_salary: 1_200_000,
        ideal_pension: 800_000,
        education: Some(EducationLevel::UniversityComplete),
    }
}

// ---------------------------------------------------------------------------
// Test: calculation posts the service's field names and parses the result
// ---------------------------------------------------------------------------

#[tokio::test]
async fn calculation_round_trip() {
    let seen: Arc<Mutex<Option<Value>>> = Arc::default();
    let router = Router::new()
        .route(
            "/calculate_pension",
            post(
                |State(seen): State<Arc<Mutex<Option<Value>>>>, Json(body): Json<Value>| async move {
                    *seen.lock().unwrap() = Some(body);
                    Json(calculation_json())
                },
            ),
        )
        .with_state(seen.clone());
    let base = spawn_stub(router).await;

    let api = PensionApi::new(base, Duration::from_secs(5));
    let session = SessionId::parse("abc-123").unwrap();
    let result = api
        .calculate(&ana(), &session, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.pre_reform.total_pension, 400_000.0);
    assert_eq!(result.post_reform.total_pension, 500_000.0);

    let body = seen.lock().unwrap().clone().unwrap();
    assert_eq!(body["sessionId"], "abc-123");
    assert_eq!(body["gender"], "F");
    assert_eq!(body["nivel_estudios"], "Universitaria completa");
    assert_eq!(body["monthly_salary"], 1_200_000);
}

// ---------------------------------------------------------------------------
// Test: a slow service yields Timeout, not a rejection
// ---------------------------------------------------------------------------

#[tokio::test]
async fn slow_service_times_out() {
    let router = Router::new().route(
        "/calculate_pension",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Json(calculation_json())
        }),
    );
    let base = spawn_stub(router).await;

    let api = PensionApi::new(base, Duration::from_millis(200));
    let err = api
        .calculate(&ana(), &SessionId::generate(), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(err.is_timeout());
    assert_matches!(err, ApiError::Timeout { after } if after == Duration::from_millis(200));
}

// ---------------------------------------------------------------------------
// Test: a non-2xx answer surfaces the service's message
// ---------------------------------------------------------------------------

#[tokio::test]
async fn rejection_carries_service_message() {
    let router = Router::new().route(
        "/calculate_pension",
        post(|| async {
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "detail": "La edad de jubilación es inválida" })),
            )
        }),
    );
    let base = spawn_stub(router).await;

    let api = PensionApi::new(base, Duration::from_secs(5));
    let err = api
        .calculate(&ana(), &SessionId::generate(), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(!err.is_timeout());
    assert_matches!(err, ApiError::Rejected { status: 422, ref message } if message == "La edad de jubilación es inválida");
}

#[tokio::test]
async fn rejection_without_reason_uses_generic_message() {
    let router = Router::new().route(
        "/calculate_pension",
        post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
    );
    let base = spawn_stub(router).await;

    let api = PensionApi::new(base, Duration::from_secs(5));
    let err = api
        .calculate(&ana(), &SessionId::generate(), &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err.user_message(), pension_client::api::GENERIC_CALCULATION_ERROR);
}

// ---------------------------------------------------------------------------
// Test: cancelling the token abandons the request
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cancellation_abandons_request() {
    let router = Router::new().route(
        "/calculate_pension",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Json(calculation_json())
        }),
    );
    let base = spawn_stub(router).await;

    let api = PensionApi::new(base, Duration::from_secs(30));
    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        canceller.cancel();
    });

    let err = api
        .calculate(&ana(), &SessionId::generate(), &token)
        .await
        .unwrap_err();
    assert_matches!(err, ApiError::Cancelled);
}

// ---------------------------------------------------------------------------
// Test: session lookup maps 404 to None
// ---------------------------------------------------------------------------

#[tokio::test]
async fn session_lookup() {
    let router = Router::new().route(
        "/get_session/{id}",
        get(|Path(id): Path<String>| async move {
            if id == "known" {
                Ok(Json(calculation_json()))
            } else {
                Err((StatusCode::NOT_FOUND, Json(json!({ "detail": "Session not found" }))))
            }
        }),
    );
    let base = spawn_stub(router).await;
    let api = PensionApi::new(base, Duration::from_secs(5));

    let known = api
        .fetch_session(&SessionId::parse("known").unwrap())
        .await
        .unwrap();
    assert_eq!(known.unwrap().metadata.name, "Ana");

    let unknown = api
        .fetch_session(&SessionId::parse("missing").unwrap())
        .await
        .unwrap();
    assert!(unknown.is_none());
}

#[tokio::test]
async fn session_lookup_failure_uses_generic_message() {
    let router = Router::new().route(
        "/get_session/{id}",
        get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
    );
    let base = spawn_stub(router).await;
    let api = PensionApi::new(base, Duration::from_secs(5));

    let err = api
        .fetch_session(&SessionId::generate())
        .await
        .unwrap_err();
    assert_matches!(err, ApiError::Rejected { status: 500, .. });
    assert_eq!(err.user_message(), pension_client::api::GENERIC_SESSION_ERROR);
}

// ---------------------------------------------------------------------------
// Test: email report success and session-not-found
// ---------------------------------------------------------------------------

#[tokio::test]
async fn email_report_success() {
    let router = Router::new().route(
        "/send_email",
        post(|Json(body): Json<Value>| async move {
            Json(json!({
                "message": "Email enviado",
                "details": {
                    "email": body["email"],
                    "sent_date": "2025-01-10T12:00:00",
                    "optin_comercial": body["optin_comercial"]
                }
            }))
        }),
    );
    let base = spawn_stub(router).await;
    let api = PensionApi::new(base, Duration::from_secs(5));

    let receipt = api
        .send_email_report(&SessionId::generate(), "ana@example.com", true)
        .await
        .unwrap();
    assert_eq!(receipt.details.email, "ana@example.com");
    assert!(receipt.details.optin_comercial);
}

#[tokio::test]
async fn email_report_unknown_session() {
    let router = Router::new().route(
        "/send_email",
        post(|| async {
            (StatusCode::NOT_FOUND, Json(json!({ "detail": "Session not found" })))
        }),
    );
    let base = spawn_stub(router).await;
    let api = PensionApi::new(base, Duration::from_secs(5));

    let err = api
        .send_email_report(&SessionId::generate(), "ana@example.com", false)
        .await
        .unwrap_err();
    assert_matches!(err, ApiError::SessionNotFound);
}
