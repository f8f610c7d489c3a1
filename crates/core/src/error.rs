use crate::wizard::WizardPhase;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Cannot {action} while in {phase:?}")]
    InvalidTransition {
        action: &'static str,
        phase: WizardPhase,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}
