use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use budgetflow_core::config::{AppConfig, LoadOptions};
use toml::Value;

struct Field {
    key: &'static str,
    env_key: &'static str,
    value: String,
}

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for field in fields(&config) {
        let source = field_source(
            field.key,
            field.env_key,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(render_line(field.key, &field.value, source));
    }

    lines.join("\n")
}

fn fields(config: &AppConfig) -> Vec<Field> {
    let office_roles =
        config.workflow.office_roles.iter().map(|role| role.as_str()).collect::<Vec<_>>();
    let api_key = if config.notification.api_key.is_some() { "<redacted>" } else { "<unset>" };

    vec![
        Field {
            key: "database.url",
            env_key: "BUDGETFLOW_DATABASE_URL",
            value: config.database.url.clone(),
        },
        Field {
            key: "database.max_connections",
            env_key: "BUDGETFLOW_DATABASE_MAX_CONNECTIONS",
            value: config.database.max_connections.to_string(),
        },
        Field {
            key: "database.timeout_secs",
            env_key: "BUDGETFLOW_DATABASE_TIMEOUT_SECS",
            value: config.database.timeout_secs.to_string(),
        },
        Field {
            key: "server.bind_address",
            env_key: "BUDGETFLOW_SERVER_BIND_ADDRESS",
            value: config.server.bind_address.clone(),
        },
        Field {
            key: "server.port",
            env_key: "BUDGETFLOW_SERVER_PORT",
            value: config.server.port.to_string(),
        },
        Field {
            key: "server.graceful_shutdown_secs",
            env_key: "BUDGETFLOW_SERVER_GRACEFUL_SHUTDOWN_SECS",
            value: config.server.graceful_shutdown_secs.to_string(),
        },
        Field {
            key: "workflow.office_roles",
            env_key: "BUDGETFLOW_WORKFLOW_OFFICE_ROLES",
            value: office_roles.join(","),
        },
        Field {
            key: "notification.enabled",
            env_key: "BUDGETFLOW_NOTIFICATION_ENABLED",
            value: config.notification.enabled.to_string(),
        },
        Field {
            key: "notification.endpoint",
            env_key: "BUDGETFLOW_NOTIFICATION_ENDPOINT",
            value: config.notification.endpoint.clone().unwrap_or_else(|| "<unset>".to_string()),
        },
        Field {
            key: "notification.from_address",
            env_key: "BUDGETFLOW_NOTIFICATION_FROM_ADDRESS",
            value: config.notification.from_address.clone(),
        },
        Field {
            key: "notification.api_key",
            env_key: "BUDGETFLOW_NOTIFICATION_API_KEY",
            value: api_key.to_string(),
        },
        Field {
            key: "notification.timeout_secs",
            env_key: "BUDGETFLOW_NOTIFICATION_TIMEOUT_SECS",
            value: config.notification.timeout_secs.to_string(),
        },
        Field {
            key: "logging.level",
            env_key: "BUDGETFLOW_LOGGING_LEVEL",
            value: config.logging.level.clone(),
        },
        Field {
            key: "logging.format",
            env_key: "BUDGETFLOW_LOGGING_FORMAT",
            value: format!("{:?}", config.logging.format),
        },
    ]
}

fn detect_config_path() -> Option<PathBuf> {
    ["budgetflow.toml", "config/budgetflow.toml"]
        .into_iter()
        .map(PathBuf::from)
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let raw = fs::read_to_string(path?).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_key: &str,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if env::var_os(env_key).is_some() {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
