//! In-process event delivery for Herald
//!
//! Events are immutable facts routed by an explicit string tag. Every
//! handler registered for a tag is invoked, one after another, in
//! registration order, and the dispatch completes only once the last one
//! has returned.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use herald_events::*;
//!
//! #[derive(Debug, Clone)]
//! struct UserRegistered {
//!     username: String,
//!     email: String,
//! }
//!
//! impl Event for UserRegistered {
//!     fn event_type(&self) -> &str {
//!         "UserRegistered"
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), EventBusError> {
//!     let bus = EventBus::new();
//!
//!     bus.register_typed("UserRegistered", |event: &UserRegistered| {
//!         println!("Sending welcome email to {}", event.email);
//!         Ok(())
//!     });
//!
//!     bus.dispatch(UserRegistered {
//!         username: "testuser".to_string(),
//!         email: "test@example.com".to_string(),
//!     })
//!     .await
//! }
//! ```
//!
//! ## Error Handling
//!
//! A tag without handlers is an error, not a silent drop. A failing handler
//! stops the dispatch unless the bus is built with `continue_on_error`:
//!
//! ```rust,ignore
//! let bus = EventBusBuilder::new()
//!     .continue_on_error(true)  // Run every handler, report all failures
//!     .build();
//!
//! match bus.dispatch(event).await {
//!     Ok(()) => println!("All handlers succeeded"),
//!     Err(EventBusError::HandlersFailed { errors, .. }) => {
//!         eprintln!("{} handlers failed", errors.len());
//!     }
//!     Err(e) => eprintln!("Dispatch error: {}", e),
//! }
//! ```

pub mod bus;
pub mod event;

pub use bus::{EventBus, EventBusBuilder, EventBusConfig, EventBusError};
pub use event::{Event, EventHandler, EventHandlerError, FnEventHandler, TypedEventHandler};
