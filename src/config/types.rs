use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use anyhow::Result;

/// Environment variable that overrides `environment` from the config file
pub const ENVIRONMENT_VAR: &str = "REQTRAIL_ENV";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    Development,
    Production,
    Test,
}

impl Default for Environment {
    fn default() -> Self {
        Self::Development
    }
}

impl Environment {
    /// Anything that is not production counts as development: console
    /// mirroring and debug-level file output stay on.
    pub fn is_development(&self) -> bool {
        *self != Self::Production
    }

    pub fn is_production(&self) -> bool {
        *self == Self::Production
    }

    /// Reads `REQTRAIL_ENV`, falling back to `default` when unset or invalid.
    pub fn from_env_or(default: Self) -> Self {
        std::env::var(ENVIRONMENT_VAR)
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(default)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
            Self::Test => write!(f, "test"),
        }
    }
}

impl FromStr for Environment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            "test" => Ok(Self::Test),
            _ => Err(anyhow::anyhow!(
                "Invalid environment: '{}'. Valid values: development, production, test",
                s
            )),
        }
    }
}
