//! Event Bus implementation

use crate::event::{Event, EventHandler, EventHandlerError, FnEventHandler, TypedEventHandler};
use herald_core::{catch_panic, EnvLoader, TypeRegistry};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Event bus for in-process event delivery
///
/// Handlers are keyed by event tag and invoked one at a time, in
/// registration order, on the dispatching task. Cloning the bus shares its
/// registry.
#[derive(Clone)]
pub struct EventBus {
    /// Handlers registered for each event tag
    handlers: Arc<TypeRegistry<String, Arc<dyn EventHandler>>>,

    /// Configuration
    config: Arc<EventBusConfig>,
}

/// Event bus configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventBusConfig {
    /// Keep invoking the remaining handlers after one fails
    pub continue_on_error: bool,

    /// Enable event logging
    pub enable_logging: bool,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            continue_on_error: false,
            enable_logging: true,
        }
    }
}

impl EventBusConfig {
    /// Read `HERALD_EVENTS_CONTINUE_ON_ERROR` and `HERALD_EVENTS_LOGGING`
    pub fn from_env() -> herald_core::Result<Self> {
        let env = EnvLoader::herald();
        let defaults = Self::default();

        Ok(Self {
            continue_on_error: env
                .load_flag("events_continue_on_error", defaults.continue_on_error)?,
            enable_logging: env.load_flag("events_logging", defaults.enable_logging)?,
        })
    }
}

impl EventBus {
    /// Create new event bus
    pub fn new() -> Self {
        Self::with_config(EventBusConfig::default())
    }

    /// Create event bus with custom config
    pub fn with_config(config: EventBusConfig) -> Self {
        Self {
            handlers: Arc::new(TypeRegistry::new()),
            config: Arc::new(config),
        }
    }

    /// Create event bus configured from the environment
    pub fn from_env() -> herald_core::Result<Self> {
        Ok(Self::with_config(EventBusConfig::from_env()?))
    }

    pub fn builder() -> EventBusBuilder {
        EventBusBuilder::new()
    }

    pub fn config(&self) -> &EventBusConfig {
        &self.config
    }

    /// Register a handler for an event tag
    ///
    /// Handlers already registered for the tag keep running first.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// let bus = EventBus::new();
    /// bus.register("UserRegistered", SendWelcomeEmail::new(mailer));
    /// ```
    pub fn register<H>(&self, event_type: impl Into<String>, handler: H)
    where
        H: EventHandler + 'static,
    {
        self.register_arc(event_type, Arc::new(handler));
    }

    /// Register a shared handler instance
    pub fn register_arc(&self, event_type: impl Into<String>, handler: Arc<dyn EventHandler>) {
        let event_type = event_type.into();
        let count = self.handlers.append(event_type.clone(), handler);

        if self.config.enable_logging {
            debug!(event_type = %event_type, handlers = count, "Registered event handler");
        }
    }

    /// Register a closure over the type-erased event
    pub fn register_fn<F>(&self, event_type: impl Into<String>, handler: F)
    where
        F: Fn(&dyn Event) -> Result<(), EventHandlerError> + Send + Sync + 'static,
    {
        self.register(event_type, FnEventHandler::new(handler));
    }

    /// Register a closure over one concrete event payload
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// bus.register_typed("UserRegistered", |event: &UserRegistered| {
    ///     println!("welcome {}", event.username);
    ///     Ok(())
    /// });
    /// ```
    pub fn register_typed<E, F>(&self, event_type: impl Into<String>, handler: F)
    where
        E: Event,
        F: Fn(&E) -> Result<(), EventHandlerError> + Send + Sync + 'static,
    {
        self.register(event_type, TypedEventHandler::new(handler));
    }

    /// Dispatch an event to every handler registered for its tag
    pub async fn dispatch<E: Event>(&self, event: E) -> Result<(), EventBusError> {
        self.dispatch_dyn(&event).await
    }

    /// Dispatch a type-erased event
    ///
    /// Each handler is awaited before the next one starts. Fails with
    /// [`EventBusError::HandlerNotFound`] when the tag has no handler.
    pub async fn dispatch_dyn(&self, event: &dyn Event) -> Result<(), EventBusError> {
        let event_type = event.event_type();
        let handlers = self.handlers.lookup(event_type);

        if handlers.is_empty() {
            if self.config.enable_logging {
                warn!(event_type = %event_type, "No handlers registered for event");
            }
            return Err(EventBusError::HandlerNotFound {
                event_type: event_type.to_string(),
            });
        }

        if self.config.enable_logging {
            debug!(event_type = %event_type, handlers = handlers.len(), "Dispatching event");
        }

        let mut errors = Vec::new();

        for handler in &handlers {
            let outcome = match catch_panic(handler.handle(event)).await {
                Ok(outcome) => outcome,
                Err(message) => Err(EventHandlerError::Panicked(message)),
            };

            if let Err(e) = outcome {
                if self.config.enable_logging {
                    error!(event_type = %event_type, error = %e, "Event handler failed");
                }

                if !self.config.continue_on_error {
                    return Err(EventBusError::HandlerFailed {
                        event_type: event_type.to_string(),
                        source: e,
                    });
                }
                errors.push(e);
            }
        }

        if !errors.is_empty() {
            return Err(EventBusError::HandlersFailed {
                event_type: event_type.to_string(),
                errors,
            });
        }

        Ok(())
    }

    /// Remove all handlers for an event tag
    pub fn unregister(&self, event_type: &str) -> usize {
        let removed = self.handlers.remove(event_type).map(|h| h.len()).unwrap_or(0);

        if self.config.enable_logging {
            debug!(event_type = %event_type, removed, "Unregistered event handlers");
        }
        removed
    }

    /// Clear all handlers
    pub fn clear(&self) {
        self.handlers.clear();
        if self.config.enable_logging {
            debug!("Cleared all event handlers");
        }
    }

    /// Get handler count for an event tag
    pub fn handler_count(&self, event_type: &str) -> usize {
        self.handlers.count(event_type)
    }

    pub fn has_handler(&self, event_type: &str) -> bool {
        self.handlers.contains(event_type)
    }

    /// Tags with at least one handler
    pub fn event_types(&self) -> Vec<String> {
        self.handlers.keys()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("handlers", &self.handlers)
            .field("config", &self.config)
            .finish()
    }
}

/// Event bus errors
#[derive(Debug, thiserror::Error)]
pub enum EventBusError {
    #[error("No handler registered for event: {event_type}")]
    HandlerNotFound { event_type: String },

    #[error("Handler for event {event_type} failed: {source}")]
    HandlerFailed {
        event_type: String,
        #[source]
        source: EventHandlerError,
    },

    #[error("{} handlers for event {event_type} failed", .errors.len())]
    HandlersFailed {
        event_type: String,
        errors: Vec<EventHandlerError>,
    },
}

impl EventBusError {
    /// Tag of the event the failure belongs to
    pub fn event_type(&self) -> &str {
        match self {
            EventBusError::HandlerNotFound { event_type }
            | EventBusError::HandlerFailed { event_type, .. }
            | EventBusError::HandlersFailed { event_type, .. } => event_type,
        }
    }
}

/// Event bus builder
pub struct EventBusBuilder {
    config: EventBusConfig,
}

impl EventBusBuilder {
    /// Create new event bus builder
    pub fn new() -> Self {
        Self {
            config: EventBusConfig::default(),
        }
    }

    /// Enable/disable continue on error
    pub fn continue_on_error(mut self, enabled: bool) -> Self {
        self.config.continue_on_error = enabled;
        self
    }

    /// Enable/disable logging
    pub fn enable_logging(mut self, enabled: bool) -> Self {
        self.config.enable_logging = enabled;
        self
    }

    /// Build the event bus
    pub fn build(self) -> EventBus {
        EventBus::with_config(self.config)
    }
}

impl Default for EventBusBuilder {
    fn default() -> Self {
        Self::new()
    }
}
