//! Wizard controller.
//!
//! Drives the question → summary → results flow over a [`WizardStore`],
//! talking to the remote services through the traits in
//! [`pension_client::services`]. All mutation goes through `&mut self`, one
//! event at a time; the only suspension points are the service calls.

use std::sync::{Arc, Mutex};

use pension_client::api::{ApiError, EmailReceipt};
use pension_client::chat::ChatRequest;
use pension_client::services::{CalculationService, ChatService, ReportService};
use pension_core::answers::{AnswersPatch, FormAnswers};
use pension_core::calculation::{CalculationResult, Comparison};
use pension_core::chat::{agent_name, intro_script, ChatTranscript, Message, MessageType};
use pension_core::email::validate_email;
use pension_core::error::CoreError;
use pension_core::questions::FieldError;
use pension_core::types::SessionId;
use pension_core::wizard::{Advance, WizardPhase, WizardProgress};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::intro::{IntroEvent, IntroScheduler};
use crate::session::SessionIdStore;
use crate::state::{StateChange, WizardStore};
use crate::storage::Storage;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum WizardError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Calculation failed: {0}")]
    Calculation(#[source] ApiError),

    #[error("Email report failed: {0}")]
    Email(#[source] ApiError),

    #[error("Only available while results are shown")]
    NotInResults,
}

impl WizardError {
    /// Message suitable for an inline error banner.
    pub fn user_message(&self) -> String {
        match self {
            Self::Core(CoreError::Validation(msg)) => msg.clone(),
            Self::Core(_) => "Acción no disponible en este momento.".to_string(),
            Self::Calculation(e) | Self::Email(e) => e.user_message(),
            Self::NotInResults => "Primero calcula tu pensión.".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Collaborators
// ---------------------------------------------------------------------------

/// Remote services the controller calls.
#[derive(Clone)]
pub struct Services {
    pub calculation: Arc<dyn CalculationService>,
    pub reports: Arc<dyn ReportService>,
    pub chat: Arc<dyn ChatService>,
}

/// Cancels the calculation in flight, if any, from another task.
#[derive(Debug, Clone, Default)]
pub struct AbortHandle {
    slot: Arc<Mutex<Option<CancellationToken>>>,
}

impl AbortHandle {
    /// Returns `true` if a calculation was in flight.
    pub fn abort(&self) -> bool {
        match self.lock().as_ref() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    fn arm(&self) -> CancellationToken {
        let token = CancellationToken::new();
        *self.lock() = Some(token.clone());
        token
    }

    fn disarm(&self) {
        self.lock().take();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<CancellationToken>> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Outcome of an email report request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmailOutcome {
    Sent(EmailReceipt),
    /// The report was already sent in this session; no request was made.
    AlreadySent,
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

pub struct WizardController {
    store: WizardStore,
    sessions: SessionIdStore,
    services: Services,
    abort: AbortHandle,
}

impl WizardController {
    /// Open the persisted state. Call [`load`](Self::load) before driving
    /// the wizard so a previous session can be recovered.
    pub fn new(storage: Storage, services: Services) -> Self {
        Self {
            store: WizardStore::load(storage.clone()),
            sessions: SessionIdStore::new(storage),
            services,
            abort: AbortHandle::default(),
        }
    }

    // ---- read access ----

    pub fn phase(&self) -> WizardPhase {
        self.store.progress().phase
    }

    pub fn progress(&self) -> &WizardProgress {
        self.store.progress()
    }

    pub fn answers(&self) -> &FormAnswers {
        self.store.answers()
    }

    pub fn result(&self) -> Option<&CalculationResult> {
        self.store.result()
    }

    pub fn comparison(&self) -> Option<Comparison> {
        self.store.result().map(Comparison::from_result)
    }

    pub fn transcript(&self) -> &ChatTranscript {
        self.store.transcript()
    }

    pub fn email_sent(&self) -> bool {
        self.store.state().email_sent
    }

    pub fn session_id(&mut self) -> Option<SessionId> {
        self.sessions.current()
    }

    /// Inline errors for the question being asked.
    pub fn field_errors(&self) -> Vec<FieldError> {
        let progress = self.store.progress();
        progress
            .phase
            .question()
            .map(|q| q.field_errors(self.store.answers(), progress.show_validation))
            .unwrap_or_default()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.store.subscribe()
    }

    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    // ---- recovery ----

    /// Bring the wizard into a consistent phase after start-up.
    ///
    /// A locally stored result wins. Otherwise a stored session id is looked
    /// up on the server; a miss or any failure forgets the session. Without
    /// a recovered result the stored progress is restored.
    pub async fn load(&mut self) -> WizardPhase {
        let has_result = self.store.result().is_some();

        if !has_result {
            if let Some(session_id) = self.sessions.current() {
                match self.services.calculation.fetch_session(&session_id).await {
                    Ok(Some(result)) => {
                        tracing::info!(session_id = %session_id, "Recovered result from server");
                        self.store.record_result(result);
                        return self.phase();
                    }
                    Ok(None) => {
                        tracing::info!(session_id = %session_id, "No stored result for session");
                    }
                    Err(e) => {
                        tracing::warn!(
                            session_id = %session_id,
                            error = %e,
                            "Session recovery failed",
                        );
                    }
                }
                self.sessions.clear();
            }
        }

        let restored = self
            .store
            .progress()
            .clone()
            .sanitized(self.store.answers(), has_result);
        if &restored != self.store.progress() {
            tracing::debug!(phase = restored.phase.as_str(), "Restored progress adjusted");
            self.store.set_progress(restored);
        }
        self.phase()
    }

    // ---- questions ----

    /// Merge a partial answer. Typing is never blocked by validation.
    pub fn set_answer(&mut self, patch: AnswersPatch) {
        if !patch.is_empty() {
            self.store.set_answer(patch);
        }
    }

    /// Feed raw input to the question being asked.
    pub fn answer_current(&mut self, raw: &str) -> Result<(), WizardError> {
        let question = self.phase().question().ok_or(CoreError::InvalidTransition {
            action: "answer",
            phase: self.phase(),
        })?;
        let patch = question.accept_input(raw)?;
        self.set_answer(patch);
        Ok(())
    }

    pub fn next(&mut self) -> Result<Advance, WizardError> {
        let mut progress = self.store.progress().clone();
        let advance = progress.next(self.store.answers())?;
        self.store.set_progress(progress);
        Ok(advance)
    }

    pub fn previous(&mut self) -> Result<WizardPhase, WizardError> {
        self.update_progress(|p| p.previous())
    }

    /// From the summary, go back to question `index` to change it.
    pub fn edit(&mut self, index: usize) -> Result<WizardPhase, WizardError> {
        self.update_progress(|p| p.edit(index))
    }

    // ---- calculation ----

    /// Submit the answers. Only allowed from the summary.
    ///
    /// On success the result is stored and the wizard shows it. On failure
    /// (rejection, timeout, transport error or abort) the wizard returns to
    /// the summary with the message kept for display; the answers are
    /// untouched.
    pub async fn calculate(&mut self) -> Result<(), WizardError> {
        let mut progress = self.store.progress().clone();
        progress.begin_calculation(self.store.answers())?;
        self.store.set_progress(progress);

        let session_id = self.sessions.get_or_create();
        let cancel = self.abort.arm();
        let outcome = self
            .services
            .calculation
            .calculate(self.store.answers(), &session_id, &cancel)
            .await;
        self.abort.disarm();

        match outcome {
            Ok(result) => {
                tracing::info!(
                    session_id = %session_id,
                    pre_total = result.pre_reform.total_pension,
                    post_total = result.post_reform.total_pension,
                    "Calculation complete",
                );
                self.store.record_result(result);
                Ok(())
            }
            Err(e) => {
                let mut progress = self.store.progress().clone();
                progress.calculation_failed(e.user_message());
                self.store.set_progress(progress);
                Err(WizardError::Calculation(e))
            }
        }
    }

    /// Start over from the results: everything is cleared and the session
    /// is retired. The next calculation runs under a fresh id.
    pub fn recalculate(&mut self) -> Result<(), WizardError> {
        self.require_results()?;
        self.store.reset(&mut self.sessions);
        Ok(())
    }

    // ---- chat ----

    /// Play the introduction the first time the chat is opened in a
    /// session. Returns how many intro messages were added.
    pub async fn open_chat(
        &mut self,
        cancel: &CancellationToken,
        mut observe: impl FnMut(IntroEvent),
    ) -> Result<usize, WizardError> {
        self.require_results()?;
        if self.store.state().chat_initialized {
            return Ok(0);
        }
        self.store.mark_chat_initialized();

        let store = &mut self.store;
        let delivered = IntroScheduler::new(intro_script())
            .run(cancel, |event| {
                if let IntroEvent::Message(text) = event {
                    store.append_chat_message(Message::from_agent(text));
                }
                observe(event);
            })
            .await;
        Ok(delivered)
    }

    /// Send a user message and append the agent's reply. The agent never
    /// fails this call: an unavailable agent yields the fallback reply.
    pub async fn send_chat(&mut self, text: &str) -> Result<&Message, WizardError> {
        self.require_results()?;
        let text = text.trim();
        if text.is_empty() {
            return Err(CoreError::Validation("Message is empty".into()).into());
        }

        self.store.append_chat_message(Message::from_user(text));

        let request = ChatRequest {
            session_id: self.sessions.get_or_create().to_string(),
            user_message: text.to_string(),
            message_type: MessageType::User,
            agent_name: agent_name(self.store.answers().gender).to_string(),
        };
        let reply = self.services.chat.send(&request).await;
        self.store.append_chat_message(Message::from_agent(reply));

        self.store
            .transcript()
            .last()
            .ok_or_else(|| CoreError::Internal("Transcript empty after append".into()).into())
    }

    // ---- email ----

    /// Request the detailed report by email. Sent at most once per session.
    pub async fn send_email_report(
        &mut self,
        email: &str,
        opt_in: bool,
    ) -> Result<EmailOutcome, WizardError> {
        self.require_results()?;
        let email = email.trim();
        validate_email(email)?;
        if self.store.state().email_sent {
            return Ok(EmailOutcome::AlreadySent);
        }

        let session_id = self.sessions.get_or_create();
        let receipt = self
            .services
            .reports
            .send_email_report(&session_id, email, opt_in)
            .await
            .map_err(WizardError::Email)?;
        self.store.mark_email_sent();
        Ok(EmailOutcome::Sent(receipt))
    }

    // ---- private helpers ----

    fn require_results(&self) -> Result<(), WizardError> {
        if self.phase() == WizardPhase::Results && self.store.result().is_some() {
            Ok(())
        } else {
            Err(WizardError::NotInResults)
        }
    }

    fn update_progress(
        &mut self,
        transition: impl FnOnce(&mut WizardProgress) -> Result<WizardPhase, CoreError>,
    ) -> Result<WizardPhase, WizardError> {
        let mut progress = self.store.progress().clone();
        let phase = transition(&mut progress)?;
        self.store.set_progress(progress);
        Ok(phase)
    }
}
