use crate::{
    environment::Environment,
    error::ConfigError,
    file::{EnvFile, EnvFileKind},
    observer::{EnvFileObserver, LoadEvent},
    store::{EnvStore, ProcessEnv},
};
use std::{
    fmt,
    path::{Path, PathBuf},
};
use tracing::{debug, trace};

/// How values from env files interact with values already in the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LoadMode {
    /// Most specific file first, never replaces a value that is already set
    Load,
    /// Least specific file first, always replaces the current value
    Overload,
}

impl LoadMode {
    /// Mode for a process booting in `environment`
    ///
    /// Containers get their env from the runtime, so plain load is enough
    /// there. Anything else, and tests everywhere, overloads so restarted
    /// processes pick up edited files.
    pub fn detect(environment: &Environment, in_container: bool) -> Self {
        if in_container && !environment.is_test() {
            Self::Load
        } else {
            Self::Overload
        }
    }
}

impl fmt::Display for LoadMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Load => write!(f, "load"),
            Self::Overload => write!(f, "overload"),
        }
    }
}

/// Candidate env files under `root`, most specific first
///
/// 1. `.env.<environment>.local`
/// 2. `.env.local`, skipped for the test environment so test runs stay
///    reproducible
/// 3. `.env.<environment>`
/// 4. `.env`
///
/// Existence is not checked here. If two slots resolve to the same path
/// (an environment literally named `local`) only the more specific one is kept.
pub fn candidate_files(environment: &Environment, root: &Path) -> Vec<EnvFile> {
    let name = environment.as_str();
    let mut slots = vec![(
        root.join(format!(".env.{name}.local")),
        EnvFileKind::EnvironmentLocal,
    )];
    if !environment.is_test() {
        slots.push((root.join(".env.local"), EnvFileKind::Local));
    }
    slots.push((root.join(format!(".env.{name}")), EnvFileKind::Environment));
    slots.push((root.join(".env"), EnvFileKind::Base));

    let mut files: Vec<EnvFile> = Vec::with_capacity(slots.len());
    for (path, kind) in slots {
        if files.iter().all(|f| f.path != path) {
            files.push(EnvFile::new(path, kind));
        }
    }
    files
}

/// The order [`LoadMode::Overload`] applies files in: exactly the reverse of
/// [`candidate_files`]
///
/// Load keeps the first value it sees and overload keeps the last, so the two
/// modes need opposite orders for the most specific file to win in both.
pub fn overload_order(environment: &Environment, root: &Path) -> Vec<EnvFile> {
    let mut files = candidate_files(environment, root);
    files.reverse();
    files
}

/// Applies env files to an [`EnvStore`]
///
/// Values are parsed by `dotenvy`, which expands `${VAR}` references against
/// the process environment whatever the target store is.
///
/// # Example
/// ```no_run
/// use dotenv_loadr::{EnvFileResolver, Environment, MemoryEnv};
/// use std::path::Path;
///
/// let mut resolver = EnvFileResolver::new(MemoryEnv::new());
/// let applied = resolver.load(&Environment::Development, Path::new("/srv/app"))?;
/// println!("applied {} file(s)", applied.len());
/// # Ok::<(), dotenv_loadr::ConfigError>(())
/// ```
pub struct EnvFileResolver<S: EnvStore = ProcessEnv> {
    store: S,
    observer: Option<Box<dyn EnvFileObserver>>,
}

impl EnvFileResolver<ProcessEnv> {
    /// Resolver that writes to the real process environment
    pub fn process() -> Self {
        Self::new(ProcessEnv)
    }
}

impl Default for EnvFileResolver<ProcessEnv> {
    fn default() -> Self {
        Self::process()
    }
}

impl<S: EnvStore> EnvFileResolver<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            observer: None,
        }
    }

    /// Register an observer that is told about every applied file
    pub fn with_observer(mut self, observer: impl EnvFileObserver + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    pub(crate) fn with_boxed_observer(
        mut self,
        observer: Option<Box<dyn EnvFileObserver>>,
    ) -> Self {
        self.observer = observer;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Apply files without replacing values that are already set
    ///
    /// Values present before the call always win; among files, the most
    /// specific one wins. Returns the files that were applied, in order.
    pub fn load(
        &mut self,
        environment: &Environment,
        root: &Path,
    ) -> Result<Vec<PathBuf>, ConfigError> {
        let files = candidate_files(environment, root);
        self.apply(files, LoadMode::Load)
    }

    /// Apply files least specific first, replacing whatever is set
    ///
    /// Unlike [`load`](Self::load) this picks up edited values on every call,
    /// which is what a live reload needs.
    pub fn overload(
        &mut self,
        environment: &Environment,
        root: &Path,
    ) -> Result<Vec<PathBuf>, ConfigError> {
        let files = overload_order(environment, root);
        self.apply(files, LoadMode::Overload)
    }

    /// Run `mode` against the candidate files of `environment`
    pub fn run(
        &mut self,
        mode: LoadMode,
        environment: &Environment,
        root: &Path,
    ) -> Result<Vec<PathBuf>, ConfigError> {
        match mode {
            LoadMode::Load => self.load(environment, root),
            LoadMode::Overload => self.overload(environment, root),
        }
    }

    fn apply(
        &mut self,
        files: Vec<EnvFile>,
        mode: LoadMode,
    ) -> Result<Vec<PathBuf>, ConfigError> {
        let mut applied = Vec::with_capacity(files.len());

        for file in files {
            let Some(pairs) = read_pairs(&file)? else {
                trace!(path = %file.display(), "env file not found, skipping");
                continue;
            };

            let mut written = 0usize;
            for (key, value) in &pairs {
                match mode {
                    LoadMode::Load => {
                        if self.store.set_if_absent(key, value) {
                            written += 1;
                        }
                    }
                    LoadMode::Overload => {
                        self.store.set_force(key, value);
                        written += 1;
                    }
                }
            }

            debug!(
                path = %file.display(),
                kind = %file.kind,
                mode = %mode,
                variables = pairs.len(),
                written,
                "applied env file"
            );

            if let Some(observer) = &self.observer {
                observer.file_loaded(&LoadEvent {
                    path: file.path.clone(),
                    kind: file.kind,
                    mode,
                    variables: pairs.len(),
                });
            }
            applied.push(file.into_path());
        }

        Ok(applied)
    }
}

/// Parse a whole file before anything is applied, so a malformed file writes
/// nothing. `None` means the file does not exist.
fn read_pairs(file: &EnvFile) -> Result<Option<Vec<(String, String)>>, ConfigError> {
    let iter = match dotenvy::from_path_iter(&file.path) {
        Ok(iter) => iter,
        Err(e) if e.not_found() => return Ok(None),
        Err(e) => return Err(ConfigError::from_dotenv(file.path.clone(), e)),
    };

    iter.collect::<Result<Vec<_>, _>>()
        .map(Some)
        .map_err(|e| ConfigError::from_dotenv(file.path.clone(), e))
}

/// Load env files into the process environment without clobbering
pub fn load(environment: &Environment, root: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    EnvFileResolver::process().load(environment, root)
}

/// Overload env files into the process environment, most specific file last
pub fn overload(environment: &Environment, root: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    EnvFileResolver::process().overload(environment, root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{observer::WatchList, store::MemoryEnv};
    use std::fs;
    use tempfile::TempDir;

    fn root_with(files: &[(&str, &str)]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for (name, content) in files {
            fs::write(dir.path().join(name), content).unwrap();
        }
        dir
    }

    fn names(files: &[EnvFile]) -> Vec<String> {
        files
            .iter()
            .map(|f| f.file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_candidate_files_non_test() {
        let root = Path::new("/srv/app");
        let files = candidate_files(&Environment::Development, root);

        assert_eq!(files.len(), 4);
        assert_eq!(
            names(&files),
            vec![
                ".env.development.local",
                ".env.local",
                ".env.development",
                ".env"
            ]
        );
        assert!(files.iter().all(|f| f.starts_with(root)));
        assert_eq!(
            files.iter().map(|f| f.kind).collect::<Vec<_>>(),
            vec![
                EnvFileKind::EnvironmentLocal,
                EnvFileKind::Local,
                EnvFileKind::Environment,
                EnvFileKind::Base
            ]
        );
    }

    #[test]
    fn test_candidate_files_custom_environment() {
        let files = candidate_files(&Environment::Custom("staging".into()), Path::new("/srv"));

        assert_eq!(
            names(&files),
            vec![".env.staging.local", ".env.local", ".env.staging", ".env"]
        );
    }

    #[test]
    fn test_candidate_files_test_skips_local() {
        let files = candidate_files(&Environment::Test, Path::new("/srv/app"));

        assert_eq!(files.len(), 3);
        assert_eq!(names(&files), vec![".env.test.local", ".env.test", ".env"]);
    }

    #[test]
    fn test_candidate_files_never_duplicates() {
        let files = candidate_files(&Environment::Custom("local".into()), Path::new("/srv"));

        assert_eq!(names(&files), vec![".env.local.local", ".env.local", ".env"]);
        assert_eq!(files[1].kind, EnvFileKind::Local);
    }

    #[test]
    fn test_overload_order_is_reverse() {
        for env in [Environment::Production, Environment::Test] {
            let root = Path::new("/srv/app");
            let mut expected = candidate_files(&env, root);
            expected.reverse();

            assert_eq!(overload_order(&env, root), expected);
        }
    }

    #[test]
    fn test_load_most_specific_wins() {
        let root = root_with(&[(".env", "FOO=1\nBASE=yes\n"), (".env.development", "FOO=2\n")]);
        let mut resolver = EnvFileResolver::new(MemoryEnv::new());

        resolver.load(&Environment::Development, root.path()).unwrap();

        assert_eq!(resolver.store().get("FOO"), Some("2".to_string()));
        assert_eq!(resolver.store().get("BASE"), Some("yes".to_string()));
    }

    #[test]
    fn test_load_keeps_existing_values() {
        let root = root_with(&[(".env", "FOO=1\n"), (".env.development", "FOO=2\n")]);
        let store: MemoryEnv = [("FOO", "3")].into_iter().collect();
        let mut resolver = EnvFileResolver::new(store);

        resolver.load(&Environment::Development, root.path()).unwrap();

        assert_eq!(resolver.store().get("FOO"), Some("3".to_string()));
    }

    #[test]
    fn test_overload_replaces_existing_values() {
        let root = root_with(&[(".env", "FOO=1\n"), (".env.development", "FOO=2\n")]);
        let store: MemoryEnv = [("FOO", "3")].into_iter().collect();
        let mut resolver = EnvFileResolver::new(store);

        resolver.overload(&Environment::Development, root.path()).unwrap();

        assert_eq!(resolver.store().get("FOO"), Some("2".to_string()));
    }

    #[test]
    fn test_load_and_overload_agree_on_precedence() {
        let root = root_with(&[
            (".env", "A=base\nB=base\nC=base\nD=base\n"),
            (".env.production", "A=env\nB=env\nC=env\n"),
            (".env.local", "A=local\nB=local\n"),
            (".env.production.local", "A=env-local\n"),
        ]);

        let mut loaded = EnvFileResolver::new(MemoryEnv::new());
        loaded.load(&Environment::Production, root.path()).unwrap();
        let mut overloaded = EnvFileResolver::new(MemoryEnv::new());
        overloaded.overload(&Environment::Production, root.path()).unwrap();

        let expected: MemoryEnv = [("A", "env-local"), ("B", "local"), ("C", "env"), ("D", "base")]
            .into_iter()
            .collect();
        assert_eq!(loaded.into_store(), expected);
        assert_eq!(overloaded.into_store(), expected);
    }

    #[test]
    fn test_test_environment_ignores_local_file() {
        let root = root_with(&[(".env.local", "FOO=local\n"), (".env", "FOO=base\n")]);
        let mut resolver = EnvFileResolver::new(MemoryEnv::new());

        let applied = resolver.overload(&Environment::Test, root.path()).unwrap();

        assert_eq!(applied, vec![root.path().join(".env")]);
        assert_eq!(resolver.store().get("FOO"), Some("base".to_string()));
    }

    #[test]
    fn test_load_is_idempotent() {
        let root = root_with(&[(".env", "FOO=1\nBAR=x\n"), (".env.development", "FOO=2\n")]);
        let mut resolver = EnvFileResolver::new(MemoryEnv::new());

        resolver.load(&Environment::Development, root.path()).unwrap();
        let first = resolver.store().snapshot();
        resolver.load(&Environment::Development, root.path()).unwrap();

        assert_eq!(resolver.store().snapshot(), first);
    }

    #[test]
    fn test_overload_picks_up_edits_but_load_does_not() {
        let root = root_with(&[(".env", "FOO=1\n"), (".env.development", "FOO=2\n")]);
        let mut overloading = EnvFileResolver::new(MemoryEnv::new());
        let mut loading = EnvFileResolver::new(MemoryEnv::new());
        overloading.overload(&Environment::Development, root.path()).unwrap();
        loading.load(&Environment::Development, root.path()).unwrap();

        fs::write(root.path().join(".env.development"), "FOO=20\n").unwrap();
        overloading.overload(&Environment::Development, root.path()).unwrap();
        loading.load(&Environment::Development, root.path()).unwrap();

        assert_eq!(overloading.store().get("FOO"), Some("20".to_string()));
        assert_eq!(loading.store().get("FOO"), Some("2".to_string()));
    }

    #[test]
    fn test_missing_files_are_skipped() {
        let root = root_with(&[]);
        let mut resolver = EnvFileResolver::new(MemoryEnv::new());

        let applied = resolver.load(&Environment::Production, root.path()).unwrap();

        assert!(applied.is_empty());
        assert!(resolver.store().is_empty());
    }

    #[test]
    fn test_missing_root_is_not_an_error() {
        let mut resolver = EnvFileResolver::new(MemoryEnv::new());

        let applied = resolver
            .overload(&Environment::Production, Path::new("/definitely/not/here"))
            .unwrap();

        assert!(applied.is_empty());
    }

    #[test]
    fn test_applied_files_follow_mode_order() {
        let root = root_with(&[
            (".env", "A=1\n"),
            (".env.development", "A=2\n"),
            (".env.development.local", "A=3\n"),
        ]);
        let mut resolver = EnvFileResolver::new(MemoryEnv::new());

        let loaded = resolver.load(&Environment::Development, root.path()).unwrap();
        let overloaded = resolver
            .overload(&Environment::Development, root.path())
            .unwrap();

        let mut reversed = loaded.clone();
        reversed.reverse();
        assert_eq!(loaded.len(), 3);
        assert_eq!(overloaded, reversed);
    }

    #[test]
    fn test_malformed_file_propagates_and_applies_nothing_from_it() {
        let root = root_with(&[
            (".env.development", "GOOD=1\n"),
            (".env", "EARLY=1\nINVALID_LINE_WITHOUT_EQUALS\n"),
        ]);
        let mut resolver = EnvFileResolver::new(MemoryEnv::new());

        let result = resolver.load(&Environment::Development, root.path());

        match result {
            Err(ConfigError::EnvFileParse { path, .. }) => {
                assert_eq!(path, root.path().join(".env"));
            }
            other => panic!("Expected EnvFileParse error, got {:?}", other),
        }
        assert_eq!(resolver.store().get("GOOD"), Some("1".to_string()));
        assert_eq!(resolver.store().get("EARLY"), None);
    }

    #[test]
    fn test_observer_sees_each_applied_file() {
        let root = root_with(&[(".env", "A=1\nB=2\n"), (".env.local", "A=3\n")]);
        let watch = WatchList::new();
        let mut resolver =
            EnvFileResolver::new(MemoryEnv::new()).with_observer(watch.clone());

        resolver.overload(&Environment::Development, root.path()).unwrap();

        assert_eq!(
            watch.paths(),
            vec![root.path().join(".env"), root.path().join(".env.local")]
        );
    }

    #[test]
    fn test_run_dispatches_on_mode() {
        let root = root_with(&[(".env", "FOO=file\n")]);
        let store: MemoryEnv = [("FOO", "preset")].into_iter().collect();
        let mut resolver = EnvFileResolver::new(store);

        resolver
            .run(LoadMode::Load, &Environment::Development, root.path())
            .unwrap();
        assert_eq!(resolver.store().get("FOO"), Some("preset".to_string()));

        resolver
            .run(LoadMode::Overload, &Environment::Development, root.path())
            .unwrap();
        assert_eq!(resolver.store().get("FOO"), Some("file".to_string()));
    }

    #[test]
    fn test_detect_container_non_test_loads() {
        assert_eq!(LoadMode::detect(&Environment::Production, true), LoadMode::Load);
        assert_eq!(LoadMode::detect(&Environment::Development, true), LoadMode::Load);
    }

    #[test]
    fn test_detect_container_test_overloads() {
        assert_eq!(LoadMode::detect(&Environment::Test, true), LoadMode::Overload);
    }

    #[test]
    fn test_detect_outside_container_overloads() {
        assert_eq!(LoadMode::detect(&Environment::Production, false), LoadMode::Overload);
        assert_eq!(LoadMode::detect(&Environment::Test, false), LoadMode::Overload);
    }

    #[test]
    fn test_directory_env_file_is_io_error() {
        let root = root_with(&[]);
        fs::create_dir(root.path().join(".env")).unwrap();
        let mut resolver = EnvFileResolver::new(MemoryEnv::new());

        let result = resolver.load(&Environment::Development, root.path());

        match result {
            Err(ConfigError::EnvFileIo { path, kind }) => {
                assert_eq!(path, root.path().join(".env"));
                assert_eq!(kind, std::io::ErrorKind::IsADirectory);
            }
            other => panic!("Expected EnvFileIo error, got {:?}", other),
        }
    }

    #[test]
    fn test_root_that_is_a_file_is_io_error() {
        let dir = root_with(&[("not-a-dir", "")]);
        let root = dir.path().join("not-a-dir");
        let mut resolver = EnvFileResolver::new(MemoryEnv::new());

        let result = resolver.overload(&Environment::Development, &root);

        match result {
            Err(ConfigError::EnvFileIo { path, kind }) => {
                assert_eq!(path, root.join(".env"));
                assert_eq!(kind, std::io::ErrorKind::NotADirectory);
            }
            other => panic!("Expected EnvFileIo error, got {:?}", other),
        }
        assert!(resolver.store().is_empty());
    }

    #[test]
    fn test_substitution_reads_process_env_not_store() {
        let root = root_with(&[
            (".env", "LOADR_SUBST_BASE=x\n"),
            (".env.development", "LOADR_SUBST_DERIVED=${LOADR_SUBST_BASE}-y\n"),
        ]);
        let mut resolver = EnvFileResolver::new(MemoryEnv::new());

        resolver
            .overload(&Environment::Development, root.path())
            .unwrap();

        // LOADR_SUBST_BASE only exists in the store, so dotenvy sees it unset
        assert_eq!(resolver.store().get("LOADR_SUBST_BASE"), Some("x".to_string()));
        assert_eq!(
            resolver.store().get("LOADR_SUBST_DERIVED"),
            Some("-y".to_string())
        );
    }

    #[test]
    fn test_load_mode_display() {
        assert_eq!(LoadMode::Load.to_string(), "load");
        assert_eq!(LoadMode::Overload.to_string(), "overload");
    }
}
