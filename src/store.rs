use std::collections::BTreeMap;

/// A process-wide style key/value table
///
/// Stores do no internal locking; callers serialize load and overload calls.
pub trait EnvStore {
    /// Current value of `key`, if set
    fn get(&self, key: &str) -> Option<String>;

    /// Unconditionally set `key` to `value`
    fn set_force(&mut self, key: &str, value: &str);

    /// Set `key` only when it is not set yet
    ///
    /// Returns true if the value was written.
    fn set_if_absent(&mut self, key: &str, value: &str) -> bool {
        if self.get(key).is_some() {
            return false;
        }
        self.set_force(key, value);
        true
    }
}

impl<S: EnvStore + ?Sized> EnvStore for &mut S {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn set_force(&mut self, key: &str, value: &str) {
        (**self).set_force(key, value)
    }

    fn set_if_absent(&mut self, key: &str, value: &str) -> bool {
        (**self).set_if_absent(key, value)
    }
}

/// The real process environment, backed by `std::env`
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl ProcessEnv {
    pub fn new() -> Self {
        Self
    }
}

impl EnvStore for ProcessEnv {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var_os(key).map(|value| value.to_string_lossy().into_owned())
    }

    fn set_force(&mut self, key: &str, value: &str) {
        std::env::set_var(key, value);
    }

    fn set_if_absent(&mut self, key: &str, value: &str) -> bool {
        // var_os so that set-but-not-unicode values still count as present
        if std::env::var_os(key).is_some() {
            return false;
        }
        std::env::set_var(key, value);
        true
    }
}

/// In-memory environment, used in place of the process environment in tests
///
/// Only writes go here. `${VAR}` references inside env files are expanded by
/// `dotenvy` against the real process environment, so a variable that only
/// exists in this store expands to an empty string and a value from the
/// process environment can end up in the snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryEnv {
    vars: BTreeMap<String, String>,
}

impl MemoryEnv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every variable currently set, sorted by key
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.vars.clone()
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

impl EnvStore for MemoryEnv {
    fn get(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }

    fn set_force(&mut self, key: &str, value: &str) {
        self.vars.insert(key.to_string(), value.to_string());
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MemoryEnv {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}
