use crate::tree;

pub const DEFAULT_ROOT: &str = "scores";

pub struct Config {
    /// Shared secret expected in the `x-api-key` header.
    pub api_key: String,
    pub database: DatabaseConfig,
    /// Path of the score collection inside the tree.
    pub root: String,
    pub allowed_origins: Vec<String>,
}

pub struct DatabaseConfig {
    pub url: String,
    pub auth: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("environment variable {name} is not set")]
    Missing { name: &'static str },
    #[error("environment variable {name} is empty")]
    Empty { name: &'static str },
    #[error("{root:?} is not a valid score root")]
    InvalidRoot { root: String },
}

impl Config {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| dotenv::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |name: &'static str| match lookup(name) {
            None => Err(ConfigError::Missing { name }),
            Some(value) if value.trim().is_empty() => Err(ConfigError::Empty { name }),
            Some(value) => Ok(value.trim().to_owned()),
        };
        let optional = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };

        let api_key = required("SCORES_API_KEY")?;
        let database = DatabaseConfig {
            url: required("DATABASE_URL")?,
            auth: optional("DATABASE_AUTH"),
        };

        let root = optional("SCORES_ROOT").unwrap_or_else(|| DEFAULT_ROOT.to_owned());
        let root_is_valid = tree::segments(&root).map_or(false, |segments| !segments.is_empty());
        if !root_is_valid {
            return Err(ConfigError::InvalidRoot { root });
        }

        let allowed_origins = optional("ALLOWED_ORIGINS")
            .map(|origins| parse_origins(&origins))
            .unwrap_or_default();
        if allowed_origins.is_empty() {
            log::warn!("ALLOWED_ORIGINS is empty, cross-origin requests will be rejected");
        }

        Ok(Self {
            api_key,
            database,
            root,
            allowed_origins,
        })
    }
}

/// Splits a comma-separated origin list. Trailing slashes are ignored.
pub fn parse_origins(origins: &str) -> Vec<String> {
    origins
        .split(',')
        .map(|origin| origin.trim().trim_end_matches('/'))
        .filter(|origin| !origin.is_empty())
        .map(str::to_owned)
        .collect()
}
