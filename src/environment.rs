use crate::error::ConfigError;
use std::{fmt, str::FromStr};

/// Name of the runtime mode the application is booting in
///
/// The name is used verbatim when resolving `.env.<name>` files, so no
/// aliasing happens here (`dev` is not `development`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Environment {
    #[default]
    Development,
    Test,
    Production,
    Custom(String),
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "development" => Ok(Self::Development),
            "test" => Ok(Self::Test),
            "production" => Ok(Self::Production),
            name if name.trim().is_empty() => Err(ConfigError::InvalidEnvironment {
                key: crate::startup::ENVIRONMENT_KEY.to_string(),
                value: s.to_string(),
                description: "Environment name must not be empty".to_string(),
                example: Some("development".to_string()),
            }),
            name => Ok(Self::Custom(name.to_string())),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Environment {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Development => "development",
            Self::Test => "test",
            Self::Production => "production",
            Self::Custom(name) => name,
        }
    }

    /// True for any environment named `test`, including `Custom("test")`
    pub fn is_test(&self) -> bool {
        self.as_str() == "test"
    }

    pub fn is_development(&self) -> bool {
        self.as_str() == "development"
    }

    pub fn is_production(&self) -> bool {
        self.as_str() == "production"
    }
}
