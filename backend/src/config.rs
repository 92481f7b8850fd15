use std::fmt;
use std::time::Duration;
use rocket::figment::{
    providers::{Env, Serialized},
    Figment,
};
use serde::{Deserialize, Serialize};
use shared::validation::{validate_option_id, ValidationError};
use thiserror::Error;
use crate::store::{dynamodb::DEFAULT_KEY_ATTRIBUTE, postgres::is_plain_identifier, UnknownOptionPolicy};

pub const ENV_PREFIX: &str = "VOTING_";
const RAW_ENV_KEYS: &[&str] = &["TABLE_NAME", "AWS_REGION", "DATABASE_URL"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Dynamodb,
    Postgres,
    Memory,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Backend::Dynamodb => "dynamodb",
            Backend::Postgres => "postgres",
            Backend::Memory => "memory",
        })
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration: {0}")]
    Figment(Box<rocket::figment::Error>),
    #[error("TABLE_NAME is required for the {0} backend")]
    MissingTableName(Backend),
    #[error("DATABASE_URL is required for the postgres backend")]
    MissingDatabaseUrl,
    #[error("invalid Postgres table name {0:?}")]
    InvalidTableName(String),
    #[error("{ENV_PREFIX}STORE_TIMEOUT_SECS must be greater than zero")]
    ZeroTimeout,
    #[error("{ENV_PREFIX}PAGE_SIZE must be greater than zero")]
    ZeroPageSize,
    #[error("{ENV_PREFIX}MAX_CONNECTIONS must be greater than zero")]
    ZeroConnections,
    #[error("invalid seed option {0:?}: {1}")]
    InvalidSeedOption(String, ValidationError),
}

impl From<rocket::figment::Error> for ConfigError {
    fn from(err: rocket::figment::Error) -> Self {
        ConfigError::Figment(Box::new(err))
    }
}

/// Process-wide settings, read once at start.
///
/// `TABLE_NAME`, `AWS_REGION` and `DATABASE_URL` are read as-is; everything
/// else carries the `VOTING_` prefix (`VOTING_BACKEND`, `VOTING_STORE_TIMEOUT_SECS`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub backend: Backend,
    pub table_name: Option<String>,
    pub aws_region: Option<String>,
    pub endpoint_url: Option<String>,
    pub key_attribute: String,
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub store_timeout_secs: u64,
    pub page_size: Option<usize>,
    pub unknown_option: UnknownOptionPolicy,
    pub seed_options: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            table_name: None,
            aws_region: None,
            endpoint_url: None,
            key_attribute: DEFAULT_KEY_ATTRIBUTE.into(),
            database_url: None,
            max_connections: 5,
            store_timeout_secs: 30,
            page_size: None,
            unknown_option: UnknownOptionPolicy::default(),
            seed_options: Vec::new(),
        }
    }
}

impl Config {
    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Env::raw().only(RAW_ENV_KEYS))
            .merge(Env::prefixed(ENV_PREFIX))
    }

    pub fn load() -> Result<Self, ConfigError> {
        Self::from_figment(&Self::figment())
    }

    pub fn from_figment(figment: &Figment) -> Result<Self, ConfigError> {
        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store_timeout_secs == 0 { return Err(ConfigError::ZeroTimeout); }
        if self.page_size == Some(0) { return Err(ConfigError::ZeroPageSize); }

        match self.backend {
            Backend::Dynamodb => {
                self.require_table_name()?;
            }
            Backend::Postgres => {
                let table = self.require_table_name()?;
                if !is_plain_identifier(table) {
                    return Err(ConfigError::InvalidTableName(table.to_owned()));
                }
                if self.database_url.as_deref().map_or(true, str::is_empty) {
                    return Err(ConfigError::MissingDatabaseUrl);
                }
                if self.max_connections == 0 { return Err(ConfigError::ZeroConnections); }
            }
            Backend::Memory => {
                for option in &self.seed_options {
                    validate_option_id(option)
                        .map_err(|e| ConfigError::InvalidSeedOption(option.clone(), e))?;
                }
            }
        }
        Ok(())
    }

    pub fn require_table_name(&self) -> Result<&str, ConfigError> {
        self.table_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .ok_or(ConfigError::MissingTableName(self.backend))
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_secs(self.store_timeout_secs)
    }
}
