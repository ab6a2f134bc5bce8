//! Query handling for CQRS

use async_trait::async_trait;
use herald_core::{catch_panic, EnvLoader, TypeKey, TypeRegistry};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::marker::PhantomData;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Query trait
///
/// Queries represent read operations in CQRS.
pub trait Query: Send + Sync + 'static {
    /// Payload carried by the query's result
    type Payload: Send + 'static;
}

/// Outcome of a handled query.
///
/// `success == false` means the handler ran but could not satisfy the query
/// (e.g. nothing was found). It is not an error of the bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryResult<T> {
    pub payload: T,
    pub success: bool,
}

impl<T> QueryResult<T> {
    pub fn new(payload: T, success: bool) -> Self {
        Self { payload, success }
    }

    /// Successful result
    pub fn found(payload: T) -> Self {
        Self::new(payload, true)
    }

    /// Handled but unsatisfied; `payload` describes the miss
    pub fn not_found(payload: T) -> Self {
        Self::new(payload, false)
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn payload(&self) -> &T {
        &self.payload
    }

    pub fn into_payload(self) -> T {
        self.payload
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> QueryResult<U> {
        QueryResult {
            payload: f(self.payload),
            success: self.success,
        }
    }
}

/// Query handler trait
#[async_trait]
pub trait QueryHandler<Q: Query>: Send + Sync {
    /// Handle the query
    async fn handle(&self, query: Q) -> Result<QueryResult<Q::Payload>, QueryError>;
}

/// Query error
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("No handler registered for query: {type_key}")]
    HandlerNotFound { type_key: TypeKey },

    #[error("Query execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Invalid query parameters: {0}")]
    InvalidParameters(String),

    #[error("Query handler panicked: {0}")]
    Panicked(String),
}

/// Type-erased query handler
#[async_trait]
trait DynQueryHandler: Send + Sync {
    async fn handle_dyn(
        &self,
        query: Box<dyn Any + Send>,
    ) -> Result<Box<dyn Any + Send>, QueryError>;
}

/// Wrapper for typed query handlers
struct TypedQueryHandler<Q: Query, H: QueryHandler<Q>> {
    handler: H,
    _phantom: PhantomData<fn(Q)>,
}

impl<Q: Query, H: QueryHandler<Q>> TypedQueryHandler<Q, H> {
    fn new(handler: H) -> Self {
        Self {
            handler,
            _phantom: PhantomData,
        }
    }
}

#[async_trait]
impl<Q: Query, H: QueryHandler<Q>> DynQueryHandler for TypedQueryHandler<Q, H> {
    async fn handle_dyn(
        &self,
        query: Box<dyn Any + Send>,
    ) -> Result<Box<dyn Any + Send>, QueryError> {
        match query.downcast::<Q>() {
            Ok(qry) => {
                let result = self.handler.handle(*qry).await?;
                Ok(Box::new(result))
            }
            Err(_) => Err(QueryError::ExecutionFailed("Type mismatch".to_string())),
        }
    }
}

/// Query bus configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryBusConfig {
    /// Enable query logging
    pub enable_logging: bool,
}

impl Default for QueryBusConfig {
    fn default() -> Self {
        Self {
            enable_logging: true,
        }
    }
}

impl QueryBusConfig {
    /// Read `HERALD_QUERIES_LOGGING`
    pub fn from_env() -> herald_core::Result<Self> {
        let env = EnvLoader::herald();
        Ok(Self {
            enable_logging: env.load_flag("queries_logging", true)?,
        })
    }
}

/// Query bus
///
/// Each query type has exactly one handler; registering another replaces it.
#[derive(Clone)]
pub struct QueryBus {
    handlers: Arc<TypeRegistry<TypeKey, Arc<dyn DynQueryHandler>>>,
    config: Arc<QueryBusConfig>,
}

impl QueryBus {
    /// Create new query bus
    pub fn new() -> Self {
        Self::with_config(QueryBusConfig::default())
    }

    pub fn with_config(config: QueryBusConfig) -> Self {
        Self {
            handlers: Arc::new(TypeRegistry::new()),
            config: Arc::new(config),
        }
    }

    /// Create query bus configured from the environment
    pub fn from_env() -> herald_core::Result<Self> {
        Ok(Self::with_config(QueryBusConfig::from_env()?))
    }

    pub fn config(&self) -> &QueryBusConfig {
        &self.config
    }

    /// Register a query handler, replacing any previous one for `Q`
    pub fn register<Q, H>(&self, handler: H)
    where
        Q: Query,
        H: QueryHandler<Q> + 'static,
    {
        let type_key = TypeKey::of::<Q>();
        let handler = Arc::new(TypedQueryHandler::new(handler));
        let replaced = self.handlers.replace(type_key, handler).is_some();

        if self.config.enable_logging {
            debug!(query = %type_key, replaced, "Registered query handler");
        }
    }

    /// Ask a query and return its handler's result verbatim
    pub async fn ask<Q: Query>(&self, query: Q) -> Result<QueryResult<Q::Payload>, QueryError> {
        let type_key = TypeKey::of::<Q>();

        let Some(handler) = self.handlers.first(&type_key) else {
            if self.config.enable_logging {
                warn!(query = %type_key, "No handler registered for query");
            }
            return Err(QueryError::HandlerNotFound { type_key });
        };

        let boxed_query: Box<dyn Any + Send> = Box::new(query);
        let result = match catch_panic(handler.handle_dyn(boxed_query)).await {
            Ok(result) => result?,
            Err(message) => return Err(QueryError::Panicked(message)),
        };

        match result.downcast::<QueryResult<Q::Payload>>() {
            Ok(result) => Ok(*result),
            Err(_) => Err(QueryError::ExecutionFailed("Result type mismatch".to_string())),
        }
    }

    /// Remove the handler for a query type
    pub fn unregister<Q: Query>(&self) -> bool {
        self.handlers.remove(&TypeKey::of::<Q>()).is_some()
    }

    /// Clear all handlers
    pub fn clear(&self) {
        self.handlers.clear();
    }

    pub fn has_handler<Q: Query>(&self) -> bool {
        self.handlers.contains(&TypeKey::of::<Q>())
    }
}

impl Default for QueryBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for QueryBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryBus")
            .field("handlers", &self.handlers)
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    struct GetUsernameQuery {
        id: u32,
    }

    impl Query for GetUsernameQuery {
        type Payload = String;
    }

    struct GetUsernameHandler;

    #[async_trait]
    impl QueryHandler<GetUsernameQuery> for GetUsernameHandler {
        async fn handle(&self, query: GetUsernameQuery) -> Result<QueryResult<String>, QueryError> {
            Ok(match query.id {
                1 => QueryResult::found("john_doe".to_string()),
                _ => QueryResult::not_found("unknown_user".to_string()),
            })
        }
    }

    struct ConstantHandler(&'static str);

    #[async_trait]
    impl QueryHandler<GetUsernameQuery> for ConstantHandler {
        async fn handle(
            &self,
            _query: GetUsernameQuery,
        ) -> Result<QueryResult<String>, QueryError> {
            Ok(QueryResult::found(self.0.to_string()))
        }
    }

    #[tokio::test]
    async fn test_query_bus() {
        let bus = QueryBus::new();
        bus.register::<GetUsernameQuery, _>(GetUsernameHandler);

        let found = assert_ok!(bus.ask(GetUsernameQuery { id: 1 }).await);
        assert_eq!(found, QueryResult::found("john_doe".to_string()));

        let missing = assert_ok!(bus.ask(GetUsernameQuery { id: 999 }).await);
        assert_eq!(missing.payload, "unknown_user");
        assert!(!missing.is_success());
    }

    #[tokio::test]
    async fn test_missing_handler() {
        let bus = QueryBus::new();

        let err = assert_err!(bus.ask(GetUsernameQuery { id: 1 }).await);
        assert!(matches!(
            err,
            QueryError::HandlerNotFound { type_key }
                if type_key == TypeKey::of::<GetUsernameQuery>()
        ));
    }

    #[tokio::test]
    async fn test_last_registration_wins() {
        let bus = QueryBus::new();
        bus.register::<GetUsernameQuery, _>(ConstantHandler("first"));
        bus.register::<GetUsernameQuery, _>(ConstantHandler("second"));

        let result = assert_ok!(bus.ask(GetUsernameQuery { id: 1 }).await);
        assert_eq!(result.into_payload(), "second");
    }

    #[tokio::test]
    async fn test_handler_errors_pass_through() {
        struct Rejecting;

        #[async_trait]
        impl QueryHandler<GetUsernameQuery> for Rejecting {
            async fn handle(
                &self,
                query: GetUsernameQuery,
            ) -> Result<QueryResult<String>, QueryError> {
                Err(QueryError::InvalidParameters(format!("id {} out of range", query.id)))
            }
        }

        let bus = QueryBus::new();
        bus.register::<GetUsernameQuery, _>(Rejecting);

        let err = assert_err!(bus.ask(GetUsernameQuery { id: 0 }).await);
        assert_eq!(err.to_string(), "Invalid query parameters: id 0 out of range");
    }

    #[tokio::test]
    async fn test_panicking_handler() {
        struct Exploding;

        #[async_trait]
        impl QueryHandler<GetUsernameQuery> for Exploding {
            async fn handle(
                &self,
                _query: GetUsernameQuery,
            ) -> Result<QueryResult<String>, QueryError> {
                panic!("read model missing")
            }
        }

        let bus = QueryBus::new();
        bus.register::<GetUsernameQuery, _>(Exploding);

        let err = assert_err!(bus.ask(GetUsernameQuery { id: 1 }).await);
        assert!(matches!(err, QueryError::Panicked(ref m) if m == "read model missing"));
    }

    #[tokio::test]
    async fn test_unregister() {
        let bus = QueryBus::new();
        bus.register::<GetUsernameQuery, _>(GetUsernameHandler);
        assert!(bus.has_handler::<GetUsernameQuery>());

        assert!(bus.unregister::<GetUsernameQuery>());
        assert!(!bus.unregister::<GetUsernameQuery>());
        assert!(!bus.has_handler::<GetUsernameQuery>());
    }

    #[test]
    fn test_query_result_helpers() {
        let result = QueryResult::found(7).map(|n| n * 6);
        assert_eq!(result.payload(), &42);
        assert!(result.is_success());

        let json = serde_json::to_value(QueryResult::not_found("unknown_user")).unwrap();
        assert_eq!(json, serde_json::json!({"payload": "unknown_user", "success": false}));
    }
}
