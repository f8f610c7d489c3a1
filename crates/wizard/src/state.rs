//! Persistent wizard state.
//!
//! [`PersistedState`] holds everything the wizard remembers between runs
//! and the pure transitions over it. [`WizardStore`] is the single writer:
//! each mutation applies a transition, broadcasts the resulting
//! [`StateChange`] and then writes the serialized blob to storage.

use pension_core::answers::{AnswersPatch, FormAnswers};
use pension_core::calculation::CalculationResult;
use pension_core::chat::{ChatTranscript, Message};
use pension_core::types::SessionId;
use pension_core::wizard::{WizardPhase, WizardProgress};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::session::SessionIdStore;
use crate::storage::Storage;

/// Storage key of the serialized [`PersistedState`].
pub const STATE_KEY: &str = "pension_wizard_state";

/// Buffer capacity for the change channel.
const CHANGE_CAPACITY: usize = 64;

// ---------------------------------------------------------------------------
// State and pure transitions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistedState {
    #[serde(default)]
    pub answers: FormAnswers,
    #[serde(default)]
    pub progress: WizardProgress,
    #[serde(default)]
    pub result: Option<CalculationResult>,
    #[serde(default)]
    pub transcript: ChatTranscript,
    #[serde(default)]
    pub email_sent: bool,
    #[serde(default)]
    pub chat_initialized: bool,
}

/// What a mutation changed.
#[derive(Debug, Clone, PartialEq)]
pub enum StateChange {
    AnswersUpdated,
    ProgressChanged(WizardPhase),
    ResultRecorded,
    /// A message was appended; the transcript now has `len` entries.
    MessageAppended { len: usize },
    EmailSent,
    ChatInitialized,
    /// Everything was cleared; `retired` is the session that was dropped.
    Reset { retired: Option<SessionId> },
}

impl PersistedState {
    fn apply_answers(&mut self, patch: AnswersPatch) -> StateChange {
        self.answers.apply(patch);
        StateChange::AnswersUpdated
    }

    fn replace_progress(&mut self, progress: WizardProgress) -> StateChange {
        self.progress = progress;
        StateChange::ProgressChanged(self.progress.phase)
    }

    fn record_result(&mut self, result: CalculationResult) -> StateChange {
        self.result = Some(result);
        self.progress.calculation_succeeded();
        StateChange::ResultRecorded
    }

    fn append_message(&mut self, message: Message) -> StateChange {
        self.transcript.push(message);
        StateChange::MessageAppended {
            len: self.transcript.len(),
        }
    }

    fn mark_email_sent(&mut self) -> StateChange {
        self.email_sent = true;
        StateChange::EmailSent
    }

    fn mark_chat_initialized(&mut self) -> StateChange {
        self.chat_initialized = true;
        StateChange::ChatInitialized
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Owner of the persisted wizard state.
#[derive(Debug)]
pub struct WizardStore {
    state: PersistedState,
    storage: Storage,
    changes: broadcast::Sender<StateChange>,
}

impl WizardStore {
    /// Read the stored state. A missing, unreadable or corrupt blob yields
    /// the default state; it is overwritten by the next mutation.
    pub fn load(storage: Storage) -> Self {
        let state = match storage.get(STATE_KEY) {
            None => PersistedState::default(),
            Some(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Discarding corrupt wizard state");
                PersistedState::default()
            }),
        };
        let (changes, _) = broadcast::channel(CHANGE_CAPACITY);
        Self {
            state,
            storage,
            changes,
        }
    }

    /// Receive every [`StateChange`] from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.changes.subscribe()
    }

    pub fn state(&self) -> &PersistedState {
        &self.state
    }

    pub fn answers(&self) -> &FormAnswers {
        &self.state.answers
    }

    pub fn progress(&self) -> &WizardProgress {
        &self.state.progress
    }

    pub fn result(&self) -> Option<&CalculationResult> {
        self.state.result.as_ref()
    }

    pub fn transcript(&self) -> &ChatTranscript {
        &self.state.transcript
    }

    /// Merge a partial answer patch. No validation happens here.
    pub fn set_answer(&mut self, patch: AnswersPatch) {
        let change = self.state.apply_answers(patch);
        self.commit(change);
    }

    pub fn set_progress(&mut self, progress: WizardProgress) {
        let change = self.state.replace_progress(progress);
        self.commit(change);
    }

    /// Store a result and enter the results phase.
    pub fn record_result(&mut self, result: CalculationResult) {
        let change = self.state.record_result(result);
        self.commit(change);
    }

    pub fn append_chat_message(&mut self, message: Message) {
        let change = self.state.append_message(message);
        self.commit(change);
    }

    pub fn mark_email_sent(&mut self) {
        if !self.state.email_sent {
            let change = self.state.mark_email_sent();
            self.commit(change);
        }
    }

    pub fn mark_chat_initialized(&mut self) {
        if !self.state.chat_initialized {
            let change = self.state.mark_chat_initialized();
            self.commit(change);
        }
    }

    /// Clear everything and retire the current session. The next session id
    /// is only issued when something is sent under it, so a stored id always
    /// belongs to a submitted calculation.
    pub fn reset(&mut self, sessions: &mut SessionIdStore) {
        self.state = PersistedState::default();
        let retired = sessions.current();
        sessions.clear();
        match &retired {
            Some(id) => tracing::info!(retired = %id, "Wizard reset"),
            None => tracing::info!("Wizard reset"),
        }
        self.commit(StateChange::Reset { retired });
    }

    fn commit(&mut self, change: StateChange) {
        // Zero receivers is not an error.
        let _ = self.changes.send(change);
        self.persist();
    }

    fn persist(&self) {
        match serde_json::to_string(&self.state) {
            Ok(blob) => self.storage.set(STATE_KEY, &blob),
            Err(e) => tracing::warn!(error = %e, "Failed to serialize wizard state"),
        }
    }
}
