//! Server configuration loaded from the environment.

use std::env;
use std::fmt::Display;
use std::fs::read_to_string;
use std::str::FromStr;

use schoolbridge_db::DbConfig;
use schoolbridge_workflow::WorkflowConfig;
use thiserror::Error;
use tracing::info;

use crate::session::SessionConfig;

pub const PORT: &str = "SCHOOLBRIDGE_PORT";
pub const DB_URL: &str = "SCHOOLBRIDGE_DB_URL";
pub const DB_NAMESPACE: &str = "SCHOOLBRIDGE_DB_NAMESPACE";
pub const DB_DATABASE: &str = "SCHOOLBRIDGE_DB_DATABASE";
pub const DB_USER: &str = "SCHOOLBRIDGE_DB_USER";
pub const DB_PASSWORD: &str = "SCHOOLBRIDGE_DB_PASSWORD";
pub const SESSION_PUBLIC_KEY: &str = "SCHOOLBRIDGE_SESSION_PUBLIC_KEY";
pub const SESSION_ISSUER: &str = "SCHOOLBRIDGE_SESSION_ISSUER";

const DEFAULT_PORT: &str = "8080";
const DEFAULT_ISSUER: &str = "schoolbridge";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{key} is not set")]
    Missing { key: &'static str },

    #[error("Invalid {key} value: {message}")]
    Invalid { key: &'static str, message: String },

    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub db: DbConfig,
    pub session: SessionConfig,
    pub workflow: WorkflowConfig,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from any key/value source.
    ///
    /// Optional values fall back to defaults; the session public key is
    /// required and names a PEM file.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = DbConfig::default();

        let port = try_load(&lookup, PORT, DEFAULT_PORT)?;
        let db = DbConfig {
            url: load_or(&lookup, DB_URL, &defaults.url),
            namespace: load_or(&lookup, DB_NAMESPACE, &defaults.namespace),
            database: load_or(&lookup, DB_DATABASE, &defaults.database),
            // An empty user disables root sign-in.
            username: lookup(DB_USER)
                .or(defaults.username)
                .filter(|u| !u.is_empty()),
            password: lookup(DB_PASSWORD).or(defaults.password),
        };

        let key_path = lookup(SESSION_PUBLIC_KEY)
            .filter(|p| !p.trim().is_empty())
            .ok_or(ConfigError::Missing {
                key: SESSION_PUBLIC_KEY,
            })?;
        let public_key_pem = read_to_string(&key_path).map_err(|source| ConfigError::Read {
            path: key_path.clone(),
            source,
        })?;
        let session = SessionConfig {
            public_key_pem,
            issuer: load_or(&lookup, SESSION_ISSUER, DEFAULT_ISSUER),
        };

        Ok(Self {
            port,
            db,
            session,
            workflow: WorkflowConfig::default(),
        })
    }
}

fn load_or(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: &str) -> String {
    lookup(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    })
}

fn try_load<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: &str,
) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    load_or(lookup, key, default)
        .parse()
        .map_err(|e: T::Err| ConfigError::Invalid {
            key,
            message: e.to_string(),
        })
}
