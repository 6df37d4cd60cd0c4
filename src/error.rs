use colored::Colorize;
use std::{fmt, io, path::PathBuf};

/// Errors that can occur while resolving and applying `.env` files
///
/// None of the variants carry raw `.env` line content, so values read from a
/// file never end up in logs or panic messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The environment name could not be used to resolve files
    InvalidEnvironment {
        key: String,
        value: String,
        description: String,
        example: Option<String>,
    },
    /// An env file exists but has invalid syntax
    EnvFileParse { path: PathBuf, index: usize },
    /// An env file exists but could not be read
    EnvFileIo { path: PathBuf, kind: io::ErrorKind },
    /// The parser reported a failure that is neither syntax nor I/O
    EnvFileUnknown { path: PathBuf },
    /// No root directory was given and the working directory is unavailable
    RootUnavailable { kind: io::ErrorKind },
}

impl ConfigError {
    pub(crate) fn from_dotenv(path: PathBuf, error: dotenvy::Error) -> Self {
        match error {
            dotenvy::Error::LineParse(_, index) => ConfigError::EnvFileParse { path, index },
            dotenvy::Error::Io(io_err) => ConfigError::EnvFileIo {
                path,
                kind: io_err.kind(),
            },
            _ => ConfigError::EnvFileUnknown { path },
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidEnvironment {
                key,
                value,
                description,
                example,
            } => {
                writeln!(
                    f,
                    "{}: Invalid value {}",
                    key.magenta().bold(),
                    format!("'{}'", value).red(),
                )?;
                writeln!(f, "\tDescription: {}", description)?;
                if let Some(ex) = example {
                    writeln!(f, "\tExample: {}={}", key.magenta().bold(), ex.cyan())?;
                }
                Ok(())
            }
            ConfigError::EnvFileParse { path, index } => {
                writeln!(
                    f,
                    "{}: Invalid syntax at position {}",
                    path.display().to_string().magenta().bold(),
                    index.to_string().red(),
                )
            }
            ConfigError::EnvFileIo { path, kind } => {
                writeln!(
                    f,
                    "{}: Could not be read ({})",
                    path.display().to_string().magenta().bold(),
                    kind.to_string().red(),
                )
            }
            ConfigError::EnvFileUnknown { path } => {
                writeln!(
                    f,
                    "{}: Failed to load env file",
                    path.display().to_string().magenta().bold(),
                )
            }
            ConfigError::RootUnavailable { kind } => {
                writeln!(
                    f,
                    "{}: Working directory is unavailable ({})",
                    "root".magenta().bold(),
                    kind.to_string().red(),
                )?;
                writeln!(
                    f,
                    "\tHint: set {} or pass a root directory explicitly",
                    crate::startup::ROOT_KEY.cyan()
                )
            }
        }
    }
}

impl std::error::Error for ConfigError {}
