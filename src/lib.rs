// Herald - in-process CQRS message routing
//
// Command, event and query buses over type-keyed handler registries. The
// member crates can be used on their own; this crate gathers them behind
// one dependency.

pub use herald_core::{EnvLoader, TypeKey, TypeRegistry};

pub use herald_events::{
    Event, EventBus, EventBusBuilder, EventBusConfig, EventBusError, EventHandler,
    EventHandlerError, FnEventHandler, TypedEventHandler,
};

pub use herald_cqrs::{
    Buses, ChannelErrorSink, Command, CommandBus, CommandBusBuilder, CommandBusConfig,
    CommandError, CommandHandler, CommandOutcome, DispatchFailure, DispatchHandle, ErrorSink,
    LogErrorSink, Query, QueryBus, QueryBusConfig, QueryError, QueryHandler, QueryResult,
};

pub use async_trait::async_trait;

// Re-export the member crates for everything not lifted above
pub use herald_core;
pub use herald_cqrs;
pub use herald_events;

#[cfg(feature = "log")]
pub use herald_log;

// Prelude for common imports
pub mod prelude {
    pub use crate::{
        Buses,
        Command,
        CommandBus,
        CommandError,
        CommandHandler,
        CommandOutcome,
        Event,
        EventBus,
        EventBusError,
        EventHandler,
        EventHandlerError,
        Query,
        QueryBus,
        QueryError,
        QueryHandler,
        QueryResult,
        async_trait,
    };
}
