use std::{
    fmt,
    ops::Deref,
    path::{Path, PathBuf},
};

/// Which slot of the precedence list a candidate file fills
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EnvFileKind {
    /// `.env.<environment>.local`
    EnvironmentLocal,
    /// `.env.local`, never used by the test environment
    Local,
    /// `.env.<environment>`
    Environment,
    /// `.env`
    Base,
}

impl fmt::Display for EnvFileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EnvironmentLocal => write!(f, "environment-local"),
            Self::Local => write!(f, "local"),
            Self::Environment => write!(f, "environment"),
            Self::Base => write!(f, "base"),
        }
    }
}

/// A candidate env file: where it lives and what precedence slot it fills
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EnvFile {
    /// Absolute (or root-relative) location of the file
    pub path: PathBuf,
    pub kind: EnvFileKind,
}

impl EnvFile {
    pub fn new(path: impl Into<PathBuf>, kind: EnvFileKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    pub fn into_path(self) -> PathBuf {
        self.path
    }
}

// Allow using EnvFile as &Path without writing .path
impl Deref for EnvFile {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        &self.path
    }
}

impl AsRef<Path> for EnvFile {
    fn as_ref(&self) -> &Path {
        &self.path
    }
}
