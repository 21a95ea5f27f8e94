pub mod config;
pub mod contact;
pub mod decide;
pub mod migrate;
pub mod office;
pub mod progress;
pub mod submit;

mod context;

use budgetflow_core::domain::actor::Actor;
use budgetflow_core::domain::role::Role;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        Self::success_with_data(command, message, None)
    }

    pub fn success_with_data(
        command: &str,
        message: impl Into<String>,
        data: Option<Value>,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            data,
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
            data: None,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }
}

/// Actor flags shared by every workflow command.
#[derive(Debug, Clone, clap::Args)]
pub struct ActorArgs {
    #[arg(long = "actor-id", help = "Identifier of the user performing the action")]
    pub actor_id: String,
    #[arg(long = "actor-role", value_parser = parse_role, help = "Role the actor is acting as")]
    pub actor_role: Role,
}

impl ActorArgs {
    pub fn actor(&self) -> Actor {
        Actor::new(self.actor_id.clone(), self.actor_role)
    }
}

fn parse_role(value: &str) -> Result<Role, String> {
    Role::parse(value).ok_or_else(|| {
        let known = Role::ALL.iter().map(Role::as_str).collect::<Vec<_>>().join(", ");
        format!("unknown role `{value}` (expected one of: {known})")
    })
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}
