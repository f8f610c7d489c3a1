//! Service traits the wizard controller talks to.
//!
//! The controller only sees these traits, so tests can drive it with
//! in-memory stubs while production wires in [`PensionApi`] and
//! [`ChatAgent`].

use async_trait::async_trait;
use pension_core::answers::FormAnswers;
use pension_core::calculation::CalculationResult;
use pension_core::chat::FALLBACK_REPLY;
use pension_core::types::SessionId;
use tokio_util::sync::CancellationToken;

use crate::api::{ApiError, EmailReceipt, PensionApi};
use crate::chat::{ChatAgent, ChatError, ChatRequest};

#[async_trait]
pub trait CalculationService: Send + Sync {
    /// One calculation attempt, bounded by the service timeout and `cancel`.
    async fn calculate(
        &self,
        answers: &FormAnswers,
        session_id: &SessionId,
        cancel: &CancellationToken,
    ) -> Result<CalculationResult, ApiError>;

    /// Result the server kept for `session_id`, if any.
    async fn fetch_session(
        &self,
        session_id: &SessionId,
    ) -> Result<Option<CalculationResult>, ApiError>;
}

#[async_trait]
pub trait ReportService: Send + Sync {
    async fn send_email_report(
        &self,
        session_id: &SessionId,
        email: &str,
        opt_in: bool,
    ) -> Result<EmailReceipt, ApiError>;
}

#[async_trait]
pub trait ChatService: Send + Sync {
    /// Post a turn; errors are reported as-is.
    async fn try_send(&self, request: &ChatRequest) -> Result<String, ChatError>;

    /// Post a turn and always come back with some agent text: any failure
    /// is logged and replaced by [`FALLBACK_REPLY`].
    async fn send(&self, request: &ChatRequest) -> String {
        match self.try_send(request).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(
                    session_id = %request.session_id,
                    error = %e,
                    "Chat agent unavailable, using fallback reply",
                );
                FALLBACK_REPLY.to_string()
            }
        }
    }
}

#[async_trait]
impl CalculationService for PensionApi {
    async fn calculate(
        &self,
        answers: &FormAnswers,
        session_id: &SessionId,
        cancel: &CancellationToken,
    ) -> Result<CalculationResult, ApiError> {
        PensionApi::calculate(self, answers, session_id, cancel).await
    }

    async fn fetch_session(
        &self,
        session_id: &SessionId,
    ) -> Result<Option<CalculationResult>, ApiError> {
        PensionApi::fetch_session(self, session_id).await
    }
}

#[async_trait]
impl ReportService for PensionApi {
    async fn send_email_report(
        &self,
        session_id: &SessionId,
        email: &str,
        opt_in: bool,
    ) -> Result<EmailReceipt, ApiError> {
        PensionApi::send_email_report(self, session_id, email, opt_in).await
    }
}

#[async_trait]
impl ChatService for ChatAgent {
    async fn try_send(&self, request: &ChatRequest) -> Result<String, ChatError> {
        ChatAgent::try_send(self, request).await
    }
}
