//! Wiring of the three buses

use crate::command::{CommandBus, CommandBusConfig};
use crate::query::{QueryBus, QueryBusConfig};
use crate::sink::ErrorSink;
use herald_events::{EventBus, EventBusConfig};

/// One event bus, a command bus delivering into it, and an independent
/// query bus.
///
/// Construct once at startup, register handlers, then hand clones to the
/// code that sends commands and queries.
#[derive(Debug, Clone)]
pub struct Buses {
    pub commands: CommandBus,
    pub events: EventBus,
    pub queries: QueryBus,
}

impl Buses {
    /// Buses with default configuration, logging dispatch failures
    pub fn new() -> Self {
        let events = EventBus::new();
        Self {
            commands: CommandBus::new(events.clone()),
            events,
            queries: QueryBus::new(),
        }
    }

    /// Buses configured from `HERALD_*` environment variables
    pub fn from_env() -> herald_core::Result<Self> {
        let events = EventBus::with_config(EventBusConfig::from_env()?);
        Ok(Self {
            commands: CommandBus::with_config(events.clone(), CommandBusConfig::from_env()?),
            events,
            queries: QueryBus::with_config(QueryBusConfig::from_env()?),
        })
    }

    /// Buses whose dispatch failures go to `sink`
    pub fn with_error_sink<S: ErrorSink + 'static>(sink: S) -> Self {
        let events = EventBus::new();
        Self {
            commands: CommandBus::builder(events.clone()).error_sink(sink).build(),
            events,
            queries: QueryBus::new(),
        }
    }
}

impl Default for Buses {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{Command, CommandError, CommandHandler, CommandOutcome};
    use crate::sink::ChannelErrorSink;
    use async_trait::async_trait;
    use herald_events::Event;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    struct Ping;

    impl Command for Ping {}

    #[derive(Debug)]
    struct Ponged;

    impl Event for Ponged {
        fn event_type(&self) -> &str {
            "Ponged"
        }
    }

    struct PingHandler;

    #[async_trait]
    impl CommandHandler<Ping> for PingHandler {
        async fn handle(&self, _command: &Ping) -> Result<CommandOutcome, CommandError> {
            Ok(CommandOutcome::new().with_event(Ponged))
        }
    }

    #[tokio::test]
    async fn test_commands_deliver_to_shared_event_bus() {
        let buses = Buses::new();
        let pongs = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&pongs);

        buses.events.register_fn("Ponged", move |_event: &dyn Event| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        buses.commands.register::<Ping, _>(PingHandler);

        buses.commands.execute(Ping).await.unwrap();
        assert_eq!(pongs.load(Ordering::SeqCst), 1);
        assert!(buses.commands.event_bus().has_handler("Ponged"));
    }

    #[tokio::test]
    async fn test_error_sink_is_wired() {
        let (sink, mut failures) = ChannelErrorSink::new();
        let buses = Buses::with_error_sink(sink);

        buses.commands.dispatch(Ping).join().await;

        let failure = failures.recv().await.unwrap();
        assert!(matches!(failure.error, CommandError::HandlerNotFound { .. }));
    }
}
