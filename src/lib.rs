pub mod environment;
pub mod error;
pub mod file;
pub mod observer;
pub mod resolver;
pub mod startup;
pub mod store;

// Re-export main types
pub use environment::Environment;
pub use error::ConfigError;
pub use file::{EnvFile, EnvFileKind};
pub use observer::{EnvFileObserver, LoadEvent, WatchList};
pub use resolver::{EnvFileResolver, LoadMode, candidate_files, load, overload, overload_order};
pub use startup::{Plan, Report, Startup, resolve_environment, resolve_root};
pub use store::{EnvStore, MemoryEnv, ProcessEnv};
