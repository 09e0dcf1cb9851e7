use super::unit::Completion;
use tokio::sync::mpsc;
use tracing::debug;

/// Worker-side end of a consumer's completion channel.
#[derive(Clone)]
pub struct CompletionSink {
    sender: mpsc::UnboundedSender<Completion>,
}

impl CompletionSink {
    /// Never blocks the worker. A consumer that has gone away simply misses the message.
    pub fn deliver(&self, completion: Completion) {
        if let Err(e) = self.sender.send(completion) {
            debug!(unit = %e.0.unit_id, "completion dropped, consumer is gone");
        }
    }
}

/// Consumer-side end; read from the interactive context only.
pub struct Mailbox {
    receiver: mpsc::UnboundedReceiver<Completion>,
}

impl Mailbox {
    pub async fn recv(&mut self) -> Option<Completion> {
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> Option<Completion> {
        self.receiver.try_recv().ok()
    }
}

pub fn completion_channel() -> (CompletionSink, Mailbox) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (CompletionSink { sender }, Mailbox { receiver })
}
