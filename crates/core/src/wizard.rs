//! Wizard phases and transition rules.
//!
//! Pure state-transition logic for the question → summary → results flow.
//! Nothing here performs I/O: the controller in `pension-wizard` calls
//! these transitions and persists the outcome separately.

use serde::{Deserialize, Serialize};

use crate::answers::FormAnswers;
use crate::error::CoreError;
use crate::questions::{first_invalid, question_at, Question, QUESTION_COUNT};

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// Where the user is in the flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", content = "step", rename_all = "snake_case")]
pub enum WizardPhase {
    /// Answering the question at this 0-based index.
    Questioning(usize),
    /// Every question answered; reviewing before submission.
    Summary,
    /// Calculation request in flight.
    Calculating,
    /// A calculation result is available.
    Results,
}

impl WizardPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Questioning(_) => "questioning",
            Self::Summary => "summary",
            Self::Calculating => "calculating",
            Self::Results => "results",
        }
    }

    /// The question being asked, if any.
    pub fn question(&self) -> Option<Question> {
        match self {
            Self::Questioning(i) => question_at(*i),
            _ => None,
        }
    }
}

impl Default for WizardPhase {
    fn default() -> Self {
        Self::Questioning(0)
    }
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Outcome of a "next" action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// The wizard moved to this phase.
    Moved(WizardPhase),
    /// The answers do not satisfy this question; inline errors are now on.
    Blocked(Question),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WizardProgress {
    pub phase: WizardPhase,
    /// Set after a failed advance; inline errors are shown while true.
    #[serde(default)]
    pub show_validation: bool,
    /// User-facing message from the last failed calculation.
    #[serde(default)]
    pub last_error: Option<String>,
}

impl WizardProgress {
    /// Advance from the current question if the answers allow it.
    ///
    /// Leaving the last question enters [`WizardPhase::Summary`] only when
    /// *every* question is satisfied; otherwise the wizard jumps back to
    /// the first unsatisfied question with inline errors on.
    pub fn next(&mut self, answers: &FormAnswers) -> Result<Advance, CoreError> {
        let WizardPhase::Questioning(index) = self.phase else {
            return Err(self.invalid("advance"));
        };
        let question = question_at(index).ok_or_else(|| {
            CoreError::Internal(format!(
                "Step {index} is out of range (0..{QUESTION_COUNT})"
            ))
        })?;

        if !question.is_valid(answers) {
            self.show_validation = true;
            return Ok(Advance::Blocked(question));
        }

        if index + 1 < QUESTION_COUNT {
            self.phase = WizardPhase::Questioning(index + 1);
            self.show_validation = false;
            return Ok(Advance::Moved(self.phase));
        }

        match first_invalid(answers) {
            None => {
                self.phase = WizardPhase::Summary;
                self.show_validation = false;
                Ok(Advance::Moved(self.phase))
            }
            Some(earlier) => {
                self.phase = WizardPhase::Questioning(earlier);
                self.show_validation = true;
                // `earlier` comes from the registry, so it is in range.
                Ok(Advance::Blocked(
                    question_at(earlier).unwrap_or(question),
                ))
            }
        }
    }

    /// Go back one question, or from the summary to the last question.
    /// Going back from the first question is a no-op.
    pub fn previous(&mut self) -> Result<WizardPhase, CoreError> {
        match self.phase {
            WizardPhase::Questioning(0) => {}
            WizardPhase::Questioning(i) => self.phase = WizardPhase::Questioning(i - 1),
            WizardPhase::Summary => self.phase = WizardPhase::Questioning(QUESTION_COUNT - 1),
            _ => return Err(self.invalid("go back")),
        }
        self.show_validation = false;
        Ok(self.phase)
    }

    /// Jump from the summary straight to one question to change it.
    pub fn edit(&mut self, index: usize) -> Result<WizardPhase, CoreError> {
        if self.phase != WizardPhase::Summary {
            return Err(self.invalid("edit an answer"));
        }
        if index >= QUESTION_COUNT {
            return Err(CoreError::Validation(format!(
                "Question {index} is out of range (0..{QUESTION_COUNT})"
            )));
        }
        self.phase = WizardPhase::Questioning(index);
        self.show_validation = false;
        Ok(self.phase)
    }

    /// Enter [`WizardPhase::Calculating`]. Only allowed from the summary, so
    /// a second submission while one is in flight is rejected.
    pub fn begin_calculation(&mut self, answers: &FormAnswers) -> Result<(), CoreError> {
        if self.phase != WizardPhase::Summary {
            return Err(self.invalid("calculate"));
        }
        if let Some(index) = first_invalid(answers) {
            return Err(CoreError::Validation(format!(
                "Question {index} is not answered correctly"
            )));
        }
        self.phase = WizardPhase::Calculating;
        self.last_error = None;
        Ok(())
    }

    /// Leave [`WizardPhase::Calculating`] for the results.
    pub fn calculation_succeeded(&mut self) {
        self.phase = WizardPhase::Results;
        self.last_error = None;
        self.show_validation = false;
    }

    /// Leave [`WizardPhase::Calculating`] back to the summary, keeping the
    /// message for the inline banner.
    pub fn calculation_failed(&mut self, message: impl Into<String>) {
        self.phase = WizardPhase::Summary;
        self.last_error = Some(message.into());
    }

    /// Rebuild progress read back from storage so it is consistent with
    /// the answers and result that were read alongside it.
    pub fn sanitized(mut self, answers: &FormAnswers, has_result: bool) -> Self {
        self.phase = if has_result {
            WizardPhase::Results
        } else {
            match self.phase {
                WizardPhase::Results => WizardPhase::Questioning(0),
                WizardPhase::Calculating | WizardPhase::Summary => match first_invalid(answers) {
                    None => WizardPhase::Summary,
                    Some(i) => WizardPhase::Questioning(i),
                },
                WizardPhase::Questioning(i) if i >= QUESTION_COUNT => WizardPhase::Questioning(0),
                phase @ WizardPhase::Questioning(_) => phase,
            }
        };
        if self.phase == WizardPhase::Results {
            self.last_error = None;
            self.show_validation = false;
        }
        self
    }

    fn invalid(&self, action: &'static str) -> CoreError {
        CoreError::InvalidTransition {
            action,
            phase: self.phase,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
