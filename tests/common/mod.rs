//! Users domain shared by the integration tests.

#![allow(dead_code)]

use herald::prelude::*;
use std::sync::{Arc, Mutex};

pub struct RegisterCommand {
    pub username: String,
    pub email: String,
}

impl RegisterCommand {
    pub fn new(username: &str, email: &str) -> Self {
        Self {
            username: username.to_string(),
            email: email.to_string(),
        }
    }
}

impl Command for RegisterCommand {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRegistered {
    pub username: String,
    pub email: String,
}

impl Event for UserRegistered {
    fn event_type(&self) -> &str {
        "UserRegistered"
    }
}

pub struct RegisterHandler;

#[async_trait]
impl CommandHandler<RegisterCommand> for RegisterHandler {
    async fn handle(&self, command: &RegisterCommand) -> Result<CommandOutcome, CommandError> {
        Ok(CommandOutcome::new().with_event(UserRegistered {
            username: command.username.clone(),
            email: command.email.clone(),
        }))
    }
}

pub struct ValidateUsernameCommand {
    pub username: String,
}

impl Command for ValidateUsernameCommand {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsernameValidated {
    pub username: String,
    pub valid: bool,
    pub message: String,
}

impl Event for UsernameValidated {
    fn event_type(&self) -> &str {
        "UsernameValidated"
    }
}

pub const MIN_USERNAME_LEN: usize = 8;
pub const MAX_USERNAME_LEN: usize = 16;

pub struct ValidateUsernameHandler;

#[async_trait]
impl CommandHandler<ValidateUsernameCommand> for ValidateUsernameHandler {
    async fn handle(
        &self,
        command: &ValidateUsernameCommand,
    ) -> Result<CommandOutcome, CommandError> {
        // Length in bytes
        let len = command.username.len();
        let (valid, message) = if len < MIN_USERNAME_LEN {
            (false, "Username too short (minimum 8 characters)")
        } else if len > MAX_USERNAME_LEN {
            (false, "Username too long (maximum 16 characters)")
        } else {
            (true, "Username is valid")
        };

        Ok(CommandOutcome::new().with_event(UsernameValidated {
            username: command.username.clone(),
            valid,
            message: message.to_string(),
        }))
    }
}

pub struct GetUsernameQuery {
    pub id: u32,
}

impl Query for GetUsernameQuery {
    type Payload = String;
}

pub struct GetUsernameHandler;

#[async_trait]
impl QueryHandler<GetUsernameQuery> for GetUsernameHandler {
    async fn handle(&self, query: GetUsernameQuery) -> Result<QueryResult<String>, QueryError> {
        let name = match query.id {
            1 => "john_doe",
            2 => "jane_smith",
            3 => "bob_wilson",
            4 => "alice_johnson",
            5 => "charlie_brown",
            _ => return Ok(QueryResult::not_found("unknown_user".to_string())),
        };
        Ok(QueryResult::found(name.to_string()))
    }
}

/// Buses with the users handlers registered and every delivered event of
/// type `E` captured under `event_type`.
pub fn wired_buses<E: Event + Clone>(event_type: &str) -> (Buses, Arc<Mutex<Vec<E>>>) {
    let buses = Buses::new();
    let seen = Arc::new(Mutex::new(Vec::new()));

    let sink = Arc::clone(&seen);
    buses.events.register_typed(event_type, move |event: &E| {
        sink.lock().unwrap().push(event.clone());
        Ok(())
    });

    buses.commands.register::<RegisterCommand, _>(RegisterHandler);
    buses
        .commands
        .register::<ValidateUsernameCommand, _>(ValidateUsernameHandler);
    buses.queries.register::<GetUsernameQuery, _>(GetUsernameHandler);

    (buses, seen)
}
