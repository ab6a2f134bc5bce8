//! Error sinks for fire-and-forget dispatch

use crate::command::CommandError;
use chrono::{DateTime, Utc};
use herald_core::TypeKey;
use tokio::sync::mpsc;
use tracing::{error, warn};
use uuid::Uuid;

/// Failure of a command started with [`CommandBus::dispatch`](crate::CommandBus::dispatch).
///
/// The dispatching caller has already moved on, so the failure is handed to
/// the bus's [`ErrorSink`] instead.
#[derive(Debug, thiserror::Error)]
#[error("Dispatch {dispatch_id} of {type_key} failed: {error}")]
pub struct DispatchFailure {
    /// Identifier returned by the dispatch call
    pub dispatch_id: Uuid,

    /// Command type that was dispatched
    pub type_key: TypeKey,

    #[source]
    pub error: CommandError,

    pub occurred_at: DateTime<Utc>,
}

impl DispatchFailure {
    pub fn new(dispatch_id: Uuid, type_key: TypeKey, error: CommandError) -> Self {
        Self {
            dispatch_id,
            type_key,
            error,
            occurred_at: Utc::now(),
        }
    }
}

/// Receives failures of asynchronous dispatches.
///
/// Implemented for any `Fn(DispatchFailure) + Send + Sync` closure.
pub trait ErrorSink: Send + Sync {
    fn report(&self, failure: DispatchFailure);
}

impl<F> ErrorSink for F
where
    F: Fn(DispatchFailure) + Send + Sync,
{
    fn report(&self, failure: DispatchFailure) {
        self(failure)
    }
}

/// Default sink: logs every failure at error level
#[derive(Debug, Clone, Copy, Default)]
pub struct LogErrorSink;

impl ErrorSink for LogErrorSink {
    fn report(&self, failure: DispatchFailure) {
        error!(
            dispatch_id = %failure.dispatch_id,
            command = %failure.type_key,
            error = %failure.error,
            "Dispatched command failed"
        );
    }
}

/// Sink that forwards failures into a channel
#[derive(Debug, Clone)]
pub struct ChannelErrorSink {
    sender: mpsc::UnboundedSender<DispatchFailure>,
}

impl ChannelErrorSink {
    /// Create the sink along with the receiving end of its channel
    pub fn new() -> (Self, mpsc::UnboundedReceiver<DispatchFailure>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl ErrorSink for ChannelErrorSink {
    fn report(&self, failure: DispatchFailure) {
        if let Err(mpsc::error::SendError(failure)) = self.sender.send(failure) {
            // Receiver is gone; the log is the last place left to put it
            warn!(
                dispatch_id = %failure.dispatch_id,
                command = %failure.type_key,
                error = %failure.error,
                "Dispatch failure dropped: error channel closed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    struct Ping;

    fn failure() -> DispatchFailure {
        DispatchFailure::new(
            Uuid::new_v4(),
            TypeKey::of::<Ping>(),
            CommandError::ExecutionFailed("boom".to_string()),
        )
    }

    #[test]
    fn test_closure_sink() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&seen);
        let sink = move |failure: DispatchFailure| {
            recorded.lock().unwrap().push(failure.error.to_string());
        };

        sink.report(failure());
        assert_eq!(*seen.lock().unwrap(), vec!["Command execution failed: boom"]);
    }

    #[tokio::test]
    async fn test_channel_sink() {
        let (sink, mut receiver) = ChannelErrorSink::new();
        let sent = failure();
        let id = sent.dispatch_id;

        sink.report(sent);
        let received = receiver.recv().await.unwrap();

        assert_eq!(received.dispatch_id, id);
        assert_eq!(received.type_key, TypeKey::of::<Ping>());
    }

    #[test]
    fn test_channel_sink_survives_closed_receiver() {
        let (sink, receiver) = ChannelErrorSink::new();
        drop(receiver);
        sink.report(failure());
    }

    #[test]
    fn test_display_names_command() {
        let message = failure().to_string();
        assert!(message.contains("Ping"));
        assert!(message.ends_with("Command execution failed: boom"));
    }
}
