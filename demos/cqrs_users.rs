//! Users Example
//!
//! Registers a user, validates usernames and looks users up by id, wiring
//! commands, events and queries through one set of buses.
//!
//! Run with `HERALD_LOG_LEVEL=debug` to see the buses' own logging.

use herald::herald_log;
use herald::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

// ============================================================================
// Commands
// ============================================================================

struct RegisterCommand {
    username: String,
    email: String,
}

impl Command for RegisterCommand {}

struct ValidateUsernameCommand {
    username: String,
}

impl Command for ValidateUsernameCommand {}

// ============================================================================
// Events
// ============================================================================

#[derive(Debug, Clone)]
struct UserRegistered {
    username: String,
    email: String,
}

impl Event for UserRegistered {
    fn event_type(&self) -> &str {
        "UserRegistered"
    }
}

#[derive(Debug, Clone)]
struct UsernameValidated {
    username: String,
    valid: bool,
    message: String,
}

impl Event for UsernameValidated {
    fn event_type(&self) -> &str {
        "UsernameValidated"
    }
}

// ============================================================================
// Command Handlers
// ============================================================================

struct RegisterHandler;

#[async_trait]
impl CommandHandler<RegisterCommand> for RegisterHandler {
    async fn handle(&self, command: &RegisterCommand) -> Result<CommandOutcome, CommandError> {
        if command.email.is_empty() {
            return Err(CommandError::ValidationError(
                "Email is required".to_string(),
            ));
        }

        Ok(CommandOutcome::new().with_event(UserRegistered {
            username: command.username.clone(),
            email: command.email.clone(),
        }))
    }
}

struct ValidateUsernameHandler;

#[async_trait]
impl CommandHandler<ValidateUsernameCommand> for ValidateUsernameHandler {
    async fn handle(
        &self,
        command: &ValidateUsernameCommand,
    ) -> Result<CommandOutcome, CommandError> {
        let (valid, message) = match command.username.len() {
            0..8 => (false, "Username too short (minimum 8 characters)"),
            8..=16 => (true, "Username is valid"),
            _ => (false, "Username too long (maximum 16 characters)"),
        };

        Ok(CommandOutcome::new().with_event(UsernameValidated {
            username: command.username.clone(),
            valid,
            message: message.to_string(),
        }))
    }
}

// ============================================================================
// Queries
// ============================================================================

struct GetUsernameQuery {
    id: u32,
}

impl Query for GetUsernameQuery {
    type Payload = String;
}

struct GetUsernameHandler {
    users: Arc<RwLock<HashMap<u32, String>>>,
}

#[async_trait]
impl QueryHandler<GetUsernameQuery> for GetUsernameHandler {
    async fn handle(&self, query: GetUsernameQuery) -> Result<QueryResult<String>, QueryError> {
        let users = self.users.read().await;
        Ok(match users.get(&query.id) {
            Some(name) => QueryResult::found(name.clone()),
            None => QueryResult::not_found("unknown_user".to_string()),
        })
    }
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    herald_log::init();

    println!("\n=== Herald Users Example ===\n");

    let buses = Buses::from_env()?;

    // Read model
    let users: HashMap<u32, String> = [
        (1, "john_doe"),
        (2, "jane_smith"),
        (3, "bob_wilson"),
        (4, "alice_johnson"),
        (5, "charlie_brown"),
    ]
    .into_iter()
    .map(|(id, name)| (id, name.to_string()))
    .collect();
    let users = Arc::new(RwLock::new(users));

    println!("1. Registering handlers:");
    buses
        .events
        .register_typed("UserRegistered", |event: &UserRegistered| {
            info!(username = %event.username, email = %event.email, "User registered");
            println!("   📧 Welcome mail queued for {}", event.email);
            Ok(())
        });
    buses
        .events
        .register_typed("UsernameValidated", |event: &UsernameValidated| {
            let mark = if event.valid { "✅" } else { "❌" };
            println!("   {} {}: {}", mark, event.username, event.message);
            Ok(())
        });
    buses.commands.register::<RegisterCommand, _>(RegisterHandler);
    buses
        .commands
        .register::<ValidateUsernameCommand, _>(ValidateUsernameHandler);
    buses.queries.register::<GetUsernameQuery, _>(GetUsernameHandler {
        users: Arc::clone(&users),
    });
    println!("   ✅ Registered 2 command handlers, 2 event handlers, 1 query handler\n");

    println!("2. Executing Commands:");
    buses
        .commands
        .execute(RegisterCommand {
            username: "testuser".to_string(),
            email: "test@example.com".to_string(),
        })
        .await?;

    for username in ["validuser123", "abc", "verylongusername123"] {
        buses
            .commands
            .execute(ValidateUsernameCommand {
                username: username.to_string(),
            })
            .await?;
    }
    println!();

    println!("3. Dispatching without waiting:");
    let handle = buses.commands.dispatch(RegisterCommand {
        username: "nomail".to_string(),
        email: String::new(),
    });
    println!("   Dispatch {} started", handle.id());
    handle.join().await;
    println!("   Dispatch finished; its failure went to the error log\n");

    println!("4. Executing Queries:");
    for id in [1, 3, 999] {
        let result = buses.queries.ask(GetUsernameQuery { id }).await?;
        println!(
            "   id {:>3} -> {} (found: {})",
            id, result.payload, result.success
        );
    }

    println!("\n=== Example Complete ===\n");

    Ok(())
}
