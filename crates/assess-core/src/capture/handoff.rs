//! Delivery of committed results to the presentation layer.

use assess_state::AssessmentResult;
use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::warn;

use crate::catalog::TestDefinition;

/// A committed result together with the test it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct Handoff {
    pub result: AssessmentResult,
    pub test: &'static TestDefinition,
}

/// Receives each committed result exactly once, after it is stored.
#[async_trait]
pub trait ResultHandoff: Send + Sync {
    async fn hand_off(&self, handoff: Handoff);
}

/// Forwards hand-offs into an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelHandoff {
    tx: mpsc::UnboundedSender<Handoff>,
}

impl ChannelHandoff {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Handoff>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl ResultHandoff for ChannelHandoff {
    async fn hand_off(&self, handoff: Handoff) {
        if self.tx.send(handoff).is_err() {
            warn!("result hand-off dropped: receiver closed");
        }
    }
}
