//! Paced delivery of the chat introduction.

use pension_core::chat::IntroStep;
use tokio_util::sync::CancellationToken;

/// Something the front-end should show while the script runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntroEvent {
    /// The agent "starts typing" the next message.
    Typing,
    /// A scripted message lands.
    Message(&'static str),
}

/// Runs a fixed list of [`IntroStep`]s on `tokio::time`.
#[derive(Debug, Clone)]
pub struct IntroScheduler {
    steps: Vec<IntroStep>,
}

impl IntroScheduler {
    pub fn new(steps: Vec<IntroStep>) -> Self {
        Self { steps }
    }

    /// Play the script, calling `deliver` for each event. Stops before the
    /// next step as soon as `cancel` fires. Returns how many messages were
    /// delivered.
    pub async fn run(self, cancel: &CancellationToken, mut deliver: impl FnMut(IntroEvent)) -> usize {
        let mut delivered = 0;
        for step in self.steps {
            if !step.pause.is_zero() && !wait(cancel, step.pause).await {
                break;
            }
            if !step.typing.is_zero() {
                deliver(IntroEvent::Typing);
                if !wait(cancel, step.typing).await {
                    break;
                }
            }
            if cancel.is_cancelled() {
                break;
            }
            deliver(IntroEvent::Message(step.message));
            delivered += 1;
        }
        tracing::debug!(delivered, "Chat introduction finished");
        delivered
    }
}

/// Sleep for `duration` unless cancelled first. Returns `false` on cancel.
async fn wait(cancel: &CancellationToken, duration: std::time::Duration) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}
