//! Command handling for CQRS

use crate::sink::{DispatchFailure, ErrorSink, LogErrorSink};
use async_trait::async_trait;
use herald_core::{catch_panic, EnvLoader, TypeKey, TypeRegistry};
use herald_events::{Event, EventBus, EventBusError};
use std::any::Any;
use std::marker::PhantomData;
use std::sync::Arc;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};
use uuid::Uuid;

/// Command trait
///
/// Commands represent write operations in CQRS. The command's Rust type is
/// its routing key.
pub trait Command: Send + Sync + 'static {}

/// Command handler trait
///
/// A handler returns the events it produced instead of accumulating them on
/// itself, so one instance can serve concurrent dispatches.
#[async_trait]
pub trait CommandHandler<C: Command>: Send + Sync {
    /// Handle the command
    async fn handle(&self, command: &C) -> Result<CommandOutcome, CommandError>;
}

/// Events produced by one command handler invocation, in production order
#[derive(Debug, Default)]
pub struct CommandOutcome {
    events: Vec<Box<dyn Event>>,
}

impl CommandOutcome {
    /// Outcome without events
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_event<E: Event>(mut self, event: E) -> Self {
        self.record(event);
        self
    }

    /// Append an event after those already recorded
    pub fn record<E: Event>(&mut self, event: E) {
        self.events.push(Box::new(event));
    }

    pub fn events(&self) -> &[Box<dyn Event>] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn into_events(self) -> Vec<Box<dyn Event>> {
        self.events
    }
}

impl FromIterator<Box<dyn Event>> for CommandOutcome {
    fn from_iter<I: IntoIterator<Item = Box<dyn Event>>>(iter: I) -> Self {
        Self {
            events: iter.into_iter().collect(),
        }
    }
}

/// Command error
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("No handler registered for command: {type_key}")]
    HandlerNotFound { type_key: TypeKey },

    #[error("Command execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Business rule violation: {0}")]
    BusinessRuleViolation(String),

    #[error("Event delivery failed: {0}")]
    EventDelivery(#[from] EventBusError),

    #[error("Command handler panicked: {0}")]
    Panicked(String),
}

/// Type-erased command handler
#[async_trait]
trait DynCommandHandler: Send + Sync {
    async fn handle_dyn(
        &self,
        command: &(dyn Any + Send + Sync),
    ) -> Result<CommandOutcome, CommandError>;
}

/// Wrapper for typed command handlers
struct TypedCommandHandler<C: Command> {
    handler: Arc<dyn CommandHandler<C>>,
    _phantom: PhantomData<fn(&C)>,
}

impl<C: Command> TypedCommandHandler<C> {
    fn new(handler: Arc<dyn CommandHandler<C>>) -> Self {
        Self {
            handler,
            _phantom: PhantomData,
        }
    }
}

#[async_trait]
impl<C: Command> DynCommandHandler for TypedCommandHandler<C> {
    async fn handle_dyn(
        &self,
        command: &(dyn Any + Send + Sync),
    ) -> Result<CommandOutcome, CommandError> {
        match command.downcast_ref::<C>() {
            Some(cmd) => self.handler.handle(cmd).await,
            None => Err(CommandError::ExecutionFailed("Type mismatch".to_string())),
        }
    }
}

/// Command bus configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandBusConfig {
    /// Enable command logging
    pub enable_logging: bool,
}

impl Default for CommandBusConfig {
    fn default() -> Self {
        Self {
            enable_logging: true,
        }
    }
}

impl CommandBusConfig {
    /// Read `HERALD_COMMANDS_LOGGING`
    pub fn from_env() -> herald_core::Result<Self> {
        let env = EnvLoader::herald();
        Ok(Self {
            enable_logging: env.load_flag("commands_logging", true)?,
        })
    }
}

/// Command bus
///
/// Routes each command to every handler registered for its type, in
/// registration order, and forwards the events each handler produced to the
/// [`EventBus`]. Cloning the bus shares its registry, event bus and error
/// sink.
#[derive(Clone)]
pub struct CommandBus {
    handlers: Arc<TypeRegistry<TypeKey, Arc<dyn DynCommandHandler>>>,
    event_bus: EventBus,
    error_sink: Arc<dyn ErrorSink>,
    config: Arc<CommandBusConfig>,
}

impl CommandBus {
    /// Create new command bus delivering events to `event_bus`
    pub fn new(event_bus: EventBus) -> Self {
        Self::builder(event_bus).build()
    }

    pub fn with_config(event_bus: EventBus, config: CommandBusConfig) -> Self {
        Self::builder(event_bus).config(config).build()
    }

    /// Create command bus configured from the environment
    pub fn from_env(event_bus: EventBus) -> herald_core::Result<Self> {
        Ok(Self::with_config(event_bus, CommandBusConfig::from_env()?))
    }

    pub fn builder(event_bus: EventBus) -> CommandBusBuilder {
        CommandBusBuilder::new(event_bus)
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    pub fn config(&self) -> &CommandBusConfig {
        &self.config
    }

    /// Register a command handler
    ///
    /// Earlier handlers for the same command type stay registered and run
    /// first.
    pub fn register<C, H>(&self, handler: H)
    where
        C: Command,
        H: CommandHandler<C> + 'static,
    {
        self.register_arc::<C>(Arc::new(handler));
    }

    /// Register a shared handler instance
    pub fn register_arc<C: Command>(&self, handler: Arc<dyn CommandHandler<C>>) {
        let type_key = TypeKey::of::<C>();
        let count = self
            .handlers
            .append(type_key, Arc::new(TypedCommandHandler::new(handler)));

        if self.config.enable_logging {
            debug!(command = %type_key, handlers = count, "Registered command handler");
        }
    }

    /// Execute a command
    ///
    /// Completes once every handler and every event it produced has been
    /// delivered. The first failure stops the pipeline and is returned.
    pub async fn execute<C: Command>(&self, command: C) -> Result<(), CommandError> {
        self.run(&command).await
    }

    /// Dispatch a command on a new task and return immediately
    ///
    /// The returned handle reports completion only. Failures go to the bus's
    /// [`ErrorSink`], including the absence of a Tokio runtime to spawn on,
    /// in which case the handle is already finished.
    pub fn dispatch<C: Command>(&self, command: C) -> DispatchHandle {
        let type_key = TypeKey::of::<C>();
        let dispatch_id = Uuid::new_v4();

        let runtime = match Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                let error = CommandError::ExecutionFailed(format!("no Tokio runtime: {e}"));
                self.log_failure(type_key, &error);
                self.error_sink
                    .report(DispatchFailure::new(dispatch_id, type_key, error));
                return DispatchHandle {
                    dispatch_id,
                    task: None,
                };
            }
        };

        if self.config.enable_logging {
            debug!(command = %type_key, %dispatch_id, "Dispatching command");
        }

        let bus = self.clone();
        let task = runtime.spawn(async move {
            if let Err(error) = bus.run(&command).await {
                bus.error_sink
                    .report(DispatchFailure::new(dispatch_id, type_key, error));
            }
        });

        DispatchHandle {
            dispatch_id,
            task: Some(task),
        }
    }

    async fn run<C: Command>(&self, command: &C) -> Result<(), CommandError> {
        let type_key = TypeKey::of::<C>();
        let handlers = self.handlers.lookup(&type_key);

        if handlers.is_empty() {
            if self.config.enable_logging {
                warn!(command = %type_key, "No handlers registered for command");
            }
            return Err(CommandError::HandlerNotFound { type_key });
        }

        for handler in &handlers {
            let outcome = match catch_panic(handler.handle_dyn(command)).await {
                Ok(outcome) => outcome,
                Err(message) => Err(CommandError::Panicked(message)),
            }
            .inspect_err(|e| self.log_failure(type_key, e))?;

            for event in outcome.events() {
                self.event_bus
                    .dispatch_dyn(event.as_ref())
                    .await
                    .map_err(CommandError::from)
                    .inspect_err(|e| self.log_failure(type_key, e))?;
            }
        }

        Ok(())
    }

    fn log_failure(&self, type_key: TypeKey, e: &CommandError) {
        if self.config.enable_logging {
            error!(command = %type_key, error = %e, "Command failed");
        }
    }

    /// Remove all handlers for a command type
    pub fn unregister<C: Command>(&self) -> usize {
        self.handlers
            .remove(&TypeKey::of::<C>())
            .map(|h| h.len())
            .unwrap_or(0)
    }

    /// Clear all handlers
    pub fn clear(&self) {
        self.handlers.clear();
    }

    /// Get handler count for a command type
    pub fn handler_count<C: Command>(&self) -> usize {
        self.handlers.count(&TypeKey::of::<C>())
    }

    pub fn has_handler<C: Command>(&self) -> bool {
        self.handlers.contains(&TypeKey::of::<C>())
    }
}

impl std::fmt::Debug for CommandBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandBus")
            .field("handlers", &self.handlers)
            .field("event_bus", &self.event_bus)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Handle to a dispatched command
///
/// Dropping it does not cancel the command.
#[derive(Debug)]
pub struct DispatchHandle {
    dispatch_id: Uuid,
    // None when the command never started
    task: Option<JoinHandle<()>>,
}

impl DispatchHandle {
    /// Identifier carried by a [`DispatchFailure`] of this dispatch
    pub fn id(&self) -> Uuid {
        self.dispatch_id
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Wait for the pipeline to finish, whatever its outcome
    pub async fn join(self) {
        let Some(task) = self.task else {
            return;
        };
        if let Err(e) = task.await {
            warn!(
                dispatch_id = %self.dispatch_id,
                error = %e,
                "Dispatch task did not complete"
            );
        }
    }
}

/// Command bus builder
pub struct CommandBusBuilder {
    event_bus: EventBus,
    error_sink: Arc<dyn ErrorSink>,
    config: CommandBusConfig,
}

impl CommandBusBuilder {
    pub fn new(event_bus: EventBus) -> Self {
        Self {
            event_bus,
            error_sink: Arc::new(LogErrorSink),
            config: CommandBusConfig::default(),
        }
    }

    /// Where failures of [`CommandBus::dispatch`] are reported
    pub fn error_sink<S: ErrorSink + 'static>(mut self, sink: S) -> Self {
        self.error_sink = Arc::new(sink);
        self
    }

    pub fn config(mut self, config: CommandBusConfig) -> Self {
        self.config = config;
        self
    }

    /// Enable/disable logging
    pub fn enable_logging(mut self, enabled: bool) -> Self {
        self.config.enable_logging = enabled;
        self
    }

    /// Build the command bus
    pub fn build(self) -> CommandBus {
        CommandBus {
            handlers: Arc::new(TypeRegistry::new()),
            event_bus: self.event_bus,
            error_sink: self.error_sink,
            config: Arc::new(self.config),
        }
    }
}
