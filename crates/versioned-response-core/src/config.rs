//! Configuration from environment variables and `.env` files
//!
//! Endpoint policies can be declared in code, deserialized with `serde`, or
//! read from prefixed environment variables:
//!
//! ```text
//! ORDERS_DEFAULT_VERSION=3
//! ORDERS_QUERY_PARAM_NAME=v
//! ORDERS_HEADER_NAME=Model-Version
//! ```
//!
//! ```rust,ignore
//! use versioned_response_core::{config::load_dotenv, EndpointVersionPolicy};
//!
//! load_dotenv();
//! let policy = EndpointVersionPolicy::from_env_prefixed("ORDERS")?;
//! ```

use crate::error::VersioningError;
use crate::policy::{EndpointVersionPolicy, PolicySettings};
use std::fmt;

/// Environment variable selecting the deployment profile
pub const ENV_VAR: &str = "VERSIONED_RESPONSE_ENV";

/// Error type for configuration loading failures.
#[derive(Debug)]
pub enum ConfigError {
    /// Environment variable deserialization failed.
    EnvyError(envy::Error),
    /// A required environment variable is missing.
    MissingVar(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::EnvyError(e) => write!(f, "Configuration error: {}", e),
            ConfigError::MissingVar(var) => {
                write!(f, "Missing required environment variable: {}", var)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::EnvyError(e) => Some(e),
            ConfigError::MissingVar(_) => None,
        }
    }
}

impl From<envy::Error> for ConfigError {
    fn from(err: envy::Error) -> Self {
        match err {
            envy::Error::MissingValue(field) => ConfigError::MissingVar(field.to_uppercase()),
            other => ConfigError::EnvyError(other),
        }
    }
}

/// Deployment profile, read from `VERSIONED_RESPONSE_ENV`.
///
/// Decides whether error bodies carry internal details such as the model
/// type and member names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    /// Verbose error bodies.
    Development,
    /// Error details are masked.
    Production,
    /// Any other profile name; treated like production for masking.
    Custom(String),
}

impl Environment {
    /// Detect the current environment from `VERSIONED_RESPONSE_ENV`.
    ///
    /// - `production` / `prod` -> `Production`
    /// - `development` / `dev` or unset -> `Development`
    /// - anything else -> `Custom(name)`
    pub fn current() -> Self {
        match std::env::var(ENV_VAR).as_deref() {
            Ok("production") | Ok("prod") => Self::Production,
            Ok("development") | Ok("dev") => Self::Development,
            Ok(other) => Self::Custom(other.to_string()),
            Err(_) => Self::Development,
        }
    }

    /// Check if running in production mode.
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    /// Check if running in development mode.
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }

    /// Get the environment name as a string.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Custom(name) => name,
        }
    }

    /// Whether error bodies may include internal details
    pub fn show_error_details(&self) -> bool {
        self.is_development()
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::current()
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl EndpointVersionPolicy {
    /// Load a policy from `{PREFIX}_DEFAULT_VERSION`,
    /// `{PREFIX}_QUERY_PARAM_NAME` and `{PREFIX}_HEADER_NAME`.
    ///
    /// Only the default version is required.
    pub fn from_env_prefixed(prefix: &str) -> Result<Self, VersioningError> {
        let settings = envy::prefixed(format!("{}_", prefix))
            .from_env::<PolicySettings>()
            .map_err(ConfigError::from)?;

        EndpointVersionPolicy::try_from(settings)
    }
}

/// Load environment variables from a `.env` file in the current directory.
///
/// A missing file is not an error; existing variables are not overridden.
pub fn load_dotenv() {
    let _ = dotenvy::dotenv();
}

/// Load environment variables from a specific file path.
pub fn load_dotenv_from<P: AsRef<std::path::Path>>(path: P) {
    let _ = dotenvy::from_path(path);
}
