//! Event definitions and handler traits

use async_trait::async_trait;
use std::any::Any;
use std::fmt::Debug;
use std::marker::PhantomData;

/// Event trait
///
/// An event is an immutable fact. The bus routes it by the tag returned from
/// [`event_type`](Event::event_type), never by its Rust type, so several
/// payload shapes may share a tag if that is the intended routing.
pub trait Event: Any + Send + Sync + Debug {
    /// Stable routing tag, e.g. `"UserRegistered"`
    fn event_type(&self) -> &str;
}

impl dyn Event {
    /// Whether the payload behind this event is a `T`
    pub fn is<T: Event>(&self) -> bool {
        let any: &dyn Any = self;
        any.is::<T>()
    }

    /// Recover the concrete payload
    pub fn downcast_ref<T: Event>(&self) -> Option<&T> {
        let any: &dyn Any = self;
        any.downcast_ref::<T>()
    }
}

/// Event handler trait
///
/// Handlers should be idempotent; nothing stops an application from
/// delivering the same event twice.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Handle the event
    async fn handle(&self, event: &dyn Event) -> Result<(), EventHandlerError>;
}

/// Event handler error
#[derive(Debug, thiserror::Error)]
pub enum EventHandlerError {
    #[error("Handler failed: {0}")]
    HandlerFailed(String),

    #[error("Event processing error: {0}")]
    ProcessingError(String),

    #[error("Event {event_type} is not a {expected}")]
    TypeMismatch {
        event_type: String,
        expected: &'static str,
    },

    #[error("Handler panicked: {0}")]
    Panicked(String),
}

/// Handler backed by a closure over the type-erased event
pub struct FnEventHandler<F> {
    handler: F,
}

impl<F> FnEventHandler<F>
where
    F: Fn(&dyn Event) -> Result<(), EventHandlerError> + Send + Sync,
{
    pub fn new(handler: F) -> Self {
        Self { handler }
    }
}

#[async_trait]
impl<F> EventHandler for FnEventHandler<F>
where
    F: Fn(&dyn Event) -> Result<(), EventHandlerError> + Send + Sync,
{
    async fn handle(&self, event: &dyn Event) -> Result<(), EventHandlerError> {
        (self.handler)(event)
    }
}

/// Handler backed by a closure over one concrete event payload.
///
/// Events routed to it under the same tag but with another payload type
/// fail with [`EventHandlerError::TypeMismatch`].
pub struct TypedEventHandler<E, F> {
    handler: F,
    _phantom: PhantomData<fn(&E)>,
}

impl<E, F> TypedEventHandler<E, F>
where
    E: Event,
    F: Fn(&E) -> Result<(), EventHandlerError> + Send + Sync,
{
    pub fn new(handler: F) -> Self {
        Self {
            handler,
            _phantom: PhantomData,
        }
    }
}

#[async_trait]
impl<E, F> EventHandler for TypedEventHandler<E, F>
where
    E: Event,
    F: Fn(&E) -> Result<(), EventHandlerError> + Send + Sync,
{
    async fn handle(&self, event: &dyn Event) -> Result<(), EventHandlerError> {
        match event.downcast_ref::<E>() {
            Some(typed_event) => (self.handler)(typed_event),
            None => Err(EventHandlerError::TypeMismatch {
                event_type: event.event_type().to_string(),
                expected: std::any::type_name::<E>(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone)]
    struct UserRegistered {
        username: String,
    }

    impl Event for UserRegistered {
        fn event_type(&self) -> &str {
            "UserRegistered"
        }
    }

    #[derive(Debug)]
    struct UserRenamed;

    impl Event for UserRenamed {
        fn event_type(&self) -> &str {
            "UserRegistered"
        }
    }

    #[test]
    fn test_downcast() {
        let event: Box<dyn Event> = Box::new(UserRegistered {
            username: "testuser".to_string(),
        });

        assert!(event.is::<UserRegistered>());
        assert!(!event.is::<UserRenamed>());
        assert_eq!(
            event.downcast_ref::<UserRegistered>().map(|e| e.username.as_str()),
            Some("testuser")
        );
    }

    #[tokio::test]
    async fn test_fn_handler() {
        let handler = FnEventHandler::new(|event: &dyn Event| {
            assert_eq!(event.event_type(), "UserRegistered");
            Ok(())
        });

        let event = UserRegistered {
            username: "testuser".to_string(),
        };
        assert!(handler.handle(&event).await.is_ok());
    }

    #[tokio::test]
    async fn test_typed_handler_rejects_other_payload() {
        let handler = TypedEventHandler::new(|event: &UserRegistered| {
            if event.username.is_empty() {
                return Err(EventHandlerError::ProcessingError("empty username".into()));
            }
            Ok(())
        });

        let ok = UserRegistered {
            username: "testuser".to_string(),
        };
        assert!(handler.handle(&ok).await.is_ok());

        let err = handler.handle(&UserRenamed).await.unwrap_err();
        assert!(matches!(
            err,
            EventHandlerError::TypeMismatch { ref event_type, .. } if event_type == "UserRegistered"
        ));
    }
}
