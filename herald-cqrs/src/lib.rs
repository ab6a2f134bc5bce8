//! CQRS (Command Query Responsibility Segregation) for Herald
//!
//! This crate provides the command and query buses.
//!
//! ## Features
//!
//! - **Command Bus** - Route commands to every registered handler, then
//!   deliver the events they produced through the event bus
//! - **Query Bus** - Route a query to its single handler and return the result
//! - **Fire-and-forget** - `dispatch` runs a command on its own task and
//!   reports failures to an [`ErrorSink`]
//! - **Type-keyed** - Commands and queries are routed by their Rust type
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use herald_cqrs::*;
//! use herald_events::{Event, EventBus};
//! use async_trait::async_trait;
//!
//! // Define a command
//! struct RegisterCommand {
//!     username: String,
//!     email: String,
//! }
//!
//! impl Command for RegisterCommand {}
//!
//! // Define the event it produces
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
//! // Define command handler
//! struct RegisterHandler;
//!
//! #[async_trait]
//! impl CommandHandler<RegisterCommand> for RegisterHandler {
//!     async fn handle(&self, command: &RegisterCommand) -> Result<CommandOutcome, CommandError> {
//!         // Business logic here
//!         Ok(CommandOutcome::new().with_event(UserRegistered {
//!             username: command.username.clone(),
//!             email: command.email.clone(),
//!         }))
//!     }
//! }
//!
//! // Define a query
//! struct GetUsernameQuery {
//!     id: u32,
//! }
//!
//! impl Query for GetUsernameQuery {
//!     type Payload = String;
//! }
//!
//! // Define query handler
//! struct GetUsernameHandler;
//!
//! #[async_trait]
//! impl QueryHandler<GetUsernameQuery> for GetUsernameHandler {
//!     async fn handle(&self, query: GetUsernameQuery) -> Result<QueryResult<String>, QueryError> {
//!         Ok(match query.id {
//!             1 => QueryResult::found("john_doe".to_string()),
//!             _ => QueryResult::not_found("unknown_user".to_string()),
//!         })
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let buses = Buses::new();
//!
//!     // Register handlers
//!     buses.events.register_typed("UserRegistered", |event: &UserRegistered| {
//!         println!("Welcome, {}", event.username);
//!         Ok(())
//!     });
//!     buses.commands.register::<RegisterCommand, _>(RegisterHandler);
//!     buses.queries.register::<GetUsernameQuery, _>(GetUsernameHandler);
//!
//!     // Execute command, waiting for every event handler
//!     buses.commands.execute(RegisterCommand {
//!         username: "testuser".to_string(),
//!         email: "test@example.com".to_string(),
//!     }).await?;
//!
//!     // Ask query
//!     let result = buses.queries.ask(GetUsernameQuery { id: 1 }).await?;
//!     println!("User: {} (found: {})", result.payload, result.success);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Registration Semantics
//!
//! Registering a second command handler for the same command type adds it:
//! both run, in registration order. Registering a second query handler
//! replaces the first, since a query has exactly one answer.
//!
//! ## Dispatch Failures
//!
//! ```rust,ignore
//! let (sink, mut failures) = ChannelErrorSink::new();
//! let buses = Buses::with_error_sink(sink);
//!
//! buses.commands.dispatch(RegisterCommand { .. });
//!
//! while let Some(failure) = failures.recv().await {
//!     eprintln!("{failure}");
//! }
//! ```

pub mod buses;
pub mod command;
pub mod query;
pub mod sink;

pub use buses::Buses;
pub use command::{
    Command, CommandBus, CommandBusBuilder, CommandBusConfig, CommandError, CommandHandler,
    CommandOutcome, DispatchHandle,
};
pub use query::{Query, QueryBus, QueryBusConfig, QueryError, QueryHandler, QueryResult};
pub use sink::{ChannelErrorSink, DispatchFailure, ErrorSink, LogErrorSink};
