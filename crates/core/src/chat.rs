//! Chat transcript, agent persona and the scripted introduction.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::answers::Gender;
use crate::types::Timestamp;

/// Reply appended when the agent service cannot be reached.
pub const FALLBACK_REPLY: &str =
    "Lo siento, hubo un problema al procesar tu mensaje. Por favor, intenta nuevamente.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub content: String,
    pub is_user: bool,
    pub timestamp: Timestamp,
}

impl Message {
    pub fn from_user(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_user: true,
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn from_agent(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_user: false,
            timestamp: chrono::Utc::now(),
        }
    }
}

/// Kind of turn sent to the agent service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Initial,
    Followup,
    User,
}

/// Conversation in the order it happened.
///
/// Append-only: there is no way to edit, remove or reorder a message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatTranscript(Vec<Message>);

impl ChatTranscript {
    pub fn push(&mut self, message: Message) {
        self.0.push(message);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.0.iter()
    }

    pub fn last(&self) -> Option<&Message> {
        self.0.last()
    }

    pub fn as_slice(&self) -> &[Message] {
        &self.0
    }
}

/// Name of the virtual assistant shown to a user of the given gender.
pub fn agent_name(gender: Option<Gender>) -> &'static str {
    match gender {
        Some(Gender::Female) => "Alejandro",
        Some(Gender::Male) | None => "Alexandra",
    }
}

// ---------------------------------------------------------------------------
// Introduction script
// ---------------------------------------------------------------------------

/// One scripted agent message and how long to wait before showing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntroStep {
    /// Idle pause before the agent starts "typing".
    pub pause: Duration,
    /// How long the typing indicator is shown before the message lands.
    pub typing: Duration,
    pub message: &'static str,
}

impl IntroStep {
    pub fn total_delay(&self) -> Duration {
        self.pause + self.typing
    }
}

const INTRO_PAUSE: Duration = Duration::from_secs(2);
const INTRO_TYPING: Duration = Duration::from_secs(3);

/// Opening messages shown the first time the chat is opened in a session.
pub fn intro_script() -> Vec<IntroStep> {
    vec![
        IntroStep {
            pause: Duration::ZERO,
            typing: Duration::ZERO,
            message: "¡Hola! 👋 Soy tu asistente virtual y estoy aquí para ayudarte a \
                      entender mejor tu jubilación.",
        },
        IntroStep {
            pause: INTRO_PAUSE,
            typing: INTRO_TYPING,
            message: "Puedes obtener un informe detallado con algunas recomendaciones \
                      personalizadas para mejorar tu jubilación haciendo clic en el botón \
                      al final de la página",
        },
        IntroStep {
            pause: INTRO_PAUSE,
            typing: INTRO_TYPING,
            message: "Si tienes dudas sobre tu jubilación, el informe de pensiones o la \
                      reforma previsional, estoy aquí para orientarte 😊.",
        },
    ]
}
