use crate::{
    environment::Environment,
    error::ConfigError,
    observer::EnvFileObserver,
    resolver::{EnvFileResolver, LoadMode},
    store::{EnvStore, ProcessEnv},
};
use std::path::{Path, PathBuf};
use tracing::info;

/// Variable holding the environment name
pub const ENVIRONMENT_KEY: &str = "APP_ENV";
/// Variable holding the application root, used when no root is passed
pub const ROOT_KEY: &str = "APP_ROOT";
/// File whose presence marks a container runtime
pub const CONTAINER_MARKER: &str = "/.dockerenv";

/// Environment name from `APP_ENV`, `development` when unset
pub fn resolve_environment(store: &impl EnvStore) -> Result<Environment, ConfigError> {
    match store.get(ENVIRONMENT_KEY) {
        Some(name) => name.parse(),
        None => Ok(Environment::default()),
    }
}

/// Root directory: `explicit`, then `APP_ROOT`, then the working directory
pub fn resolve_root(
    explicit: Option<&Path>,
    store: &impl EnvStore,
) -> Result<PathBuf, ConfigError> {
    if let Some(root) = explicit {
        return Ok(root.to_path_buf());
    }
    if let Some(root) = store.get(ROOT_KEY).filter(|r| !r.trim().is_empty()) {
        return Ok(PathBuf::from(root));
    }
    std::env::current_dir().map_err(|e| ConfigError::RootUnavailable { kind: e.kind() })
}

/// Outcome of a startup or reload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub environment: Environment,
    pub root: PathBuf,
    pub mode: LoadMode,
    /// Files that were applied, in application order
    pub files: Vec<PathBuf>,
}

/// Resolved inputs for a run, before any file is touched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub environment: Environment,
    pub root: PathBuf,
    pub mode: LoadMode,
}

/// Builder for the host application's startup hook
///
/// Resolves the environment name and root directory, picks a [`LoadMode`] and
/// runs the resolver. Call [`Startup::run`] once at boot and
/// [`Startup::reload`] from zero-downtime restart hooks.
///
/// # Example
/// ```no_run
/// use dotenv_loadr::Startup;
///
/// let report = Startup::new().run()?;
/// println!("{} env file(s) applied", report.files.len());
/// # Ok::<(), dotenv_loadr::ConfigError>(())
/// ```
pub struct Startup<S: EnvStore = ProcessEnv> {
    store: S,
    environment: Option<Environment>,
    root: Option<PathBuf>,
    container_marker: PathBuf,
    observer: Option<Box<dyn EnvFileObserver>>,
}

impl Startup<ProcessEnv> {
    pub fn new() -> Self {
        Self::with_store(ProcessEnv)
    }
}

impl Default for Startup<ProcessEnv> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: EnvStore> Startup<S> {
    pub fn with_store(store: S) -> Self {
        Self {
            store,
            environment: None,
            root: None,
            container_marker: PathBuf::from(CONTAINER_MARKER),
            observer: None,
        }
    }

    /// Use this environment instead of reading `APP_ENV`
    pub fn environment(mut self, environment: Environment) -> Self {
        self.environment = Some(environment);
        self
    }

    /// Use this root instead of `APP_ROOT` or the working directory
    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    pub fn container_marker(mut self, marker: impl Into<PathBuf>) -> Self {
        self.container_marker = marker.into();
        self
    }

    pub fn observer(mut self, observer: impl EnvFileObserver + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    pub fn in_container(&self) -> bool {
        self.container_marker.exists()
    }

    /// Resolve environment, root and mode without applying anything
    pub fn plan(&self) -> Result<Plan, ConfigError> {
        let environment = match &self.environment {
            Some(environment) => environment.clone(),
            None => resolve_environment(&self.store)?,
        };
        let root = resolve_root(self.root.as_deref(), &self.store)?;
        let mode = LoadMode::detect(&environment, self.in_container());

        Ok(Plan {
            environment,
            root,
            mode,
        })
    }

    /// Apply env files using the detected mode
    pub fn run(self) -> Result<Report, ConfigError> {
        let plan = self.plan()?;
        self.execute(plan)
    }

    /// Re-apply env files after a hot restart; always overloads
    pub fn reload(self) -> Result<Report, ConfigError> {
        let plan = Plan {
            mode: LoadMode::Overload,
            ..self.plan()?
        };
        self.execute(plan)
    }

    fn execute(self, plan: Plan) -> Result<Report, ConfigError> {
        let Plan {
            environment,
            root,
            mode,
        } = plan;

        let mut resolver = EnvFileResolver::new(self.store).with_boxed_observer(self.observer);
        let files = resolver.run(mode, &environment, &root)?;

        info!(
            environment = %environment,
            root = %root.display(),
            mode = %mode,
            files = files.len(),
            "env files applied"
        );

        Ok(Report {
            environment,
            root,
            mode,
            files,
        })
    }
}
