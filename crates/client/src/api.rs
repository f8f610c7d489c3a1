//! REST client for the pension calculation service.
//!
//! Wraps the calculation (`POST /calculate_pension`), session lookup
//! (`GET /get_session/{id}`) and email report (`POST /send_email`)
//! endpoints using [`reqwest`]. Every call is bounded by the configured
//! timeout; the calculation can also be cancelled through a
//! [`CancellationToken`].

use std::future::Future;
use std::time::Duration;

use pension_core::answers::FormAnswers;
use pension_core::calculation::CalculationResult;
use pension_core::types::SessionId;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::config::ClientConfig;

/// Inline message when the service gives no reason for a failed calculation.
pub const GENERIC_CALCULATION_ERROR: &str = "Error al calcular la pensión";

/// Inline message when the service gives no reason for a failed email.
pub const GENERIC_EMAIL_ERROR: &str = "Error al enviar el email";

/// Message when a session lookup fails without a reason.
pub const GENERIC_SESSION_ERROR: &str = "Error al recuperar la sesión";

/// `detail` value the email endpoint uses for an unknown session.
const SESSION_NOT_FOUND_DETAIL: &str = "Session not found";

/// HTTP client for the calculation service.
#[derive(Debug, Clone)]
pub struct PensionApi {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// Body of `POST /calculate_pension`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalculationRequest {
    #[serde(rename = "sessionId")]
    pub session_id: String,
    pub name: String,
    pub current_age_years: u8,
    pub current_age_months: u8,
    pub retirement_age: u8,
    pub current_balance: u64,
    pub monthly_salary: u64,
    /// `"M"` or `"F"`.
    pub gender: &'static str,
    pub ideal_pension: u64,
    pub nivel_estudios: &'static str,
}

impl CalculationRequest {
    /// Build the request body. Gender and education are translated to the
    /// service's representation here and nowhere else.
    pub fn new(answers: &FormAnswers, session_id: &SessionId) -> Result<Self, ApiError> {
        let gender = answers.gender.ok_or(ApiError::Incomplete("gender"))?;
        let education = answers.education.ok_or(ApiError::Incomplete("education"))?;
        Ok(Self {
            session_id: session_id.to_string(),
            name: answers.name.clone(),
            current_age_years: answers.age.years,
            current_age_months: answers.age.months,
            retirement_age: answers.retirement_age,
            current_balance: answers.account_balance,
            monthly_salary: answers.gross_salary,
            gender: gender.wire_code(),
            ideal_pension: answers.ideal_pension,
            nivel_estudios: education.label(),
        })
    }
}

/// Body of `POST /send_email`.
#[derive(Debug, Clone, Serialize)]
struct EmailRequest<'a> {
    session_id: &'a str,
    email: &'a str,
    optin_comercial: bool,
}

/// Successful response of `POST /send_email`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EmailReceipt {
    pub message: String,
    pub details: EmailDetails,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EmailDetails {
    pub email: String,
    pub sent_date: String,
    pub optin_comercial: bool,
}

/// Error bodies carry either `message` or `detail` depending on the
/// endpoint. `detail` may also be a structured validation report, which
/// is not surfaced.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    detail: Option<serde_json::Value>,
}

impl ErrorBody {
    fn reason(&self) -> Option<String> {
        self.message
            .clone()
            .or_else(|| self.detail.as_ref().and_then(|d| d.as_str()).map(String::from))
            .filter(|s| !s.trim().is_empty())
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from the calculation service layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// No response within the configured bound; the request was dropped.
    #[error("Request timed out after {after:?}")]
    Timeout { after: Duration },

    /// The caller cancelled the request before it completed.
    #[error("Request cancelled")]
    Cancelled,

    /// The HTTP request itself failed (network, DNS, TLS, decoding).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The service answered with a non-2xx status.
    #[error("Calculation service error ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// The server has no session with this id.
    #[error("Session not found")]
    SessionNotFound,

    /// The answers are missing a field the request needs.
    #[error("Answers are incomplete: missing {0}")]
    Incomplete(&'static str),
}

impl ApiError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Message suitable for an inline error banner.
    pub fn user_message(&self) -> String {
        match self {
            Self::Timeout { .. } => {
                "El cálculo está tardando demasiado. Por favor, intenta nuevamente.".to_string()
            }
            Self::Cancelled => "El cálculo fue cancelado.".to_string(),
            Self::Request(_) => {
                "No pudimos conectar con el servicio. Revisa tu conexión e intenta nuevamente."
                    .to_string()
            }
            Self::Rejected { message, .. } => message.clone(),
            Self::SessionNotFound => {
                "No se encontró la sesión. Por favor, vuelve a calcular tu pensión.".to_string()
            }
            Self::Incomplete(_) => "Por favor, completa todas las preguntas.".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

impl PensionApi {
    /// Create a client for the service at `base_url` (e.g.
    /// `http://host:8000`).
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, timeout)
    }

    /// Create a client reusing an existing [`reqwest::Client`] (shares its
    /// connection pool).
    pub fn with_client(
        client: reqwest::Client,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client,
            base_url,
            timeout,
        }
    }

    pub fn from_config(client: reqwest::Client, config: &ClientConfig) -> Self {
        Self::with_client(client, config.api_base_url.clone(), config.calculation_timeout)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run the calculation for `answers` under `session_id`.
    ///
    /// Fails with [`ApiError::Timeout`] if no response arrives within the
    /// configured bound and with [`ApiError::Cancelled`] if `cancel` fires
    /// first. Either way the in-flight request is dropped.
    pub async fn calculate(
        &self,
        answers: &FormAnswers,
        session_id: &SessionId,
        cancel: &CancellationToken,
    ) -> Result<CalculationResult, ApiError> {
        let body = CalculationRequest::new(answers, session_id)?;
        let url = format!("{}/calculate_pension", self.base_url);

        tracing::info!(session_id = %session_id, "Requesting pension calculation");

        let exchange = async {
            let response = self.client.post(&url).json(&body).send().await?;
            let response = Self::ensure_success(response, GENERIC_CALCULATION_ERROR).await?;
            Ok::<_, ApiError>(response.json::<CalculationResult>().await?)
        };

        let outcome = self.bounded(exchange, Some(cancel)).await;
        if let Err(e) = &outcome {
            tracing::warn!(session_id = %session_id, error = %e, "Pension calculation failed");
        }
        outcome
    }

    /// Look up the result stored server-side for `session_id`.
    ///
    /// Returns `Ok(None)` when the server does not know the session.
    pub async fn fetch_session(
        &self,
        session_id: &SessionId,
    ) -> Result<Option<CalculationResult>, ApiError> {
        let url = format!("{}/get_session/{}", self.base_url, session_id);

        let exchange = async {
            let response = self.client.get(&url).send().await?;
            if response.status() == StatusCode::NOT_FOUND {
                tracing::debug!(session_id = %session_id, "Session unknown to server");
                return Ok(None);
            }
            let response = Self::ensure_success(response, GENERIC_SESSION_ERROR).await?;
            Ok::<_, ApiError>(Some(response.json::<CalculationResult>().await?))
        };

        self.bounded(exchange, None).await
    }

    /// Ask the service to email the detailed report for `session_id`.
    pub async fn send_email_report(
        &self,
        session_id: &SessionId,
        email: &str,
        opt_in: bool,
    ) -> Result<EmailReceipt, ApiError> {
        let url = format!("{}/send_email", self.base_url);
        let body = EmailRequest {
            session_id: session_id.as_str(),
            email,
            optin_comercial: opt_in,
        };

        let exchange = async {
            let response = self.client.post(&url).json(&body).send().await?;
            let status = response.status();
            if !status.is_success() {
                let error_body = Self::read_error_body(response).await;
                let reason = error_body.reason();
                if reason.as_deref() == Some(SESSION_NOT_FOUND_DETAIL) {
                    return Err(ApiError::SessionNotFound);
                }
                return Err(ApiError::Rejected {
                    status: status.as_u16(),
                    message: reason.unwrap_or_else(|| GENERIC_EMAIL_ERROR.to_string()),
                });
            }
            Ok::<_, ApiError>(response.json::<EmailReceipt>().await?)
        };

        let outcome = self.bounded(exchange, None).await;
        match &outcome {
            Ok(_) => tracing::info!(session_id = %session_id, opt_in, "Email report requested"),
            Err(e) => tracing::warn!(session_id = %session_id, error = %e, "Email report failed"),
        }
        outcome
    }

    // ---- private helpers ----

    /// Apply the request timeout and, if given, the cancellation token.
    async fn bounded<T>(
        &self,
        exchange: impl Future<Output = Result<T, ApiError>>,
        cancel: Option<&CancellationToken>,
    ) -> Result<T, ApiError> {
        let timed = tokio::time::timeout(self.timeout, exchange);
        let outcome = match cancel {
            Some(token) => {
                tokio::select! {
                    _ = token.cancelled() => return Err(ApiError::Cancelled),
                    outcome = timed => outcome,
                }
            }
            None => timed.await,
        };
        outcome.map_err(|_| ApiError::Timeout {
            after: self.timeout,
        })?
    }

    /// Ensure the response has a success status code. On failure the
    /// error carries the body's `message`/`detail`, or `fallback`.
    async fn ensure_success(
        response: reqwest::Response,
        fallback: &str,
    ) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = Self::read_error_body(response).await;
            return Err(ApiError::Rejected {
                status: status.as_u16(),
                message: body.reason().unwrap_or_else(|| fallback.to_string()),
            });
        }
        Ok(response)
    }

    /// Best-effort parse of an error body; unreadable bodies yield an
    /// empty [`ErrorBody`].
    async fn read_error_body(response: reqwest::Response) -> ErrorBody {
        let text = response.text().await.unwrap_or_default();
        serde_json::from_str(&text).unwrap_or_default()
    }
}
