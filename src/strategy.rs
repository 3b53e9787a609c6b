//! Packer backends
//!
//! A backend is selected by name from a [`StrategyRegistry`]. Its factory
//! validates the backend's external resource (the packer executable) and
//! returns a [`PackStrategy`] bound to it, before any job is dispatched.
//!
//! # Contract
//!
//! - Names are matched case-insensitively.
//! - A strategy is shared by every worker, so it must be `Send + Sync` and
//!   hold nothing but the parameters it was built with.

use std::collections::HashMap;
use std::ffi::OsString;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::{JobError, PackError, Result};
use crate::job::PackJob;
use crate::runner::run_packer;
use crate::settings::BackendConfig;

/// Packs a single job
pub trait PackStrategy: Send + Sync {
    fn pack(&self, job: &PackJob) -> std::result::Result<(), JobError>;
}

impl<F> PackStrategy for F
where
    F: Fn(&PackJob) -> std::result::Result<(), JobError> + Send + Sync,
{
    fn pack(&self, job: &PackJob) -> std::result::Result<(), JobError> {
        self(job)
    }
}

/// Validates a backend configuration and builds its strategy
pub type BackendFactory =
    Box<dyn Fn(&BackendConfig) -> Result<Arc<dyn PackStrategy>> + Send + Sync>;

/// Backend name -> factory
#[derive(Default)]
pub struct StrategyRegistry {
    factories: HashMap<String, BackendFactory>,
}

impl StrategyRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every backend shipped in this crate
    pub fn with_builtin_backends() -> Self {
        let mut registry = Self::new();
        registry.register(PboManagerStrategy::NAME, |config| {
            Ok(Arc::new(PboManagerStrategy::from_config(config)?) as Arc<dyn PackStrategy>)
        });
        registry
    }

    /// Add or replace the factory for `name`
    pub fn register<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(&BackendConfig) -> Result<Arc<dyn PackStrategy>> + Send + Sync + 'static,
    {
        self.factories.insert(name.to_lowercase(), Box::new(factory));
    }

    /// Registered backend names, sorted
    pub fn backends(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Look up `name` and let its factory validate `config`
    pub fn resolve(&self, name: &str, config: &BackendConfig) -> Result<Arc<dyn PackStrategy>> {
        let factory = self
            .factories
            .get(&name.to_lowercase())
            .ok_or_else(|| PackError::UnknownBackend {
                name: name.to_string(),
                available: self.backends().join(", "),
            })?;
        factory(config)
    }
}

impl fmt::Debug for StrategyRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StrategyRegistry")
            .field("backends", &self.backends())
            .finish()
    }
}

/// PBO Manager console backend: `<exe> -pack <source> <output>`
#[derive(Debug, Clone)]
pub struct PboManagerStrategy {
    executable: PathBuf,
}

impl PboManagerStrategy {
    pub const NAME: &'static str = "pbomanager";

    /// Bind to the configured executable, which must exist
    pub fn from_config(config: &BackendConfig) -> Result<Self> {
        std::fs::metadata(&config.path).map_err(|e| PackError::BackendUnavailable {
            path: config.path.clone(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            executable: config.path.clone(),
        })
    }

    /// Arguments passed to the executable for `job`
    pub fn command_args(job: &PackJob) -> Vec<OsString> {
        vec![
            OsString::from("-pack"),
            job.source_dir.clone().into_os_string(),
            job.output_artifact.clone().into_os_string(),
        ]
    }
}

impl PackStrategy for PboManagerStrategy {
    fn pack(&self, job: &PackJob) -> std::result::Result<(), JobError> {
        let output = run_packer(&self.executable, Self::command_args(job))
            .map_err(|e| JobError::Spawn(format!("{:#}", e)))?;
        output.ensure_success()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn backend(name: &str, path: impl Into<PathBuf>) -> BackendConfig {
        BackendConfig {
            name: name.to_string(),
            path: path.into(),
        }
    }

    #[test]
    fn test_builtin_backends() {
        let registry = StrategyRegistry::with_builtin_backends();
        assert_eq!(registry.backends(), vec!["pbomanager"]);
    }

    #[test]
    fn test_unknown_backend() {
        let registry = StrategyRegistry::with_builtin_backends();
        let err = registry
            .resolve("armake", &backend("armake", "/bin/sh"))
            .err()
            .unwrap();
        match err {
            PackError::UnknownBackend { name, available } => {
                assert_eq!(name, "armake");
                assert_eq!(available, "pbomanager");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_executable_fails_fast() {
        let registry = StrategyRegistry::with_builtin_backends();
        let err = registry
            .resolve("pbomanager", &backend("pbomanager", "/nonexistent/PboConsole"))
            .err()
            .unwrap();
        assert!(matches!(err, PackError::BackendUnavailable { .. }));
        assert!(err.to_string().contains("/nonexistent/PboConsole"));
    }

    #[test]
    fn test_resolve_is_case_insensitive() {
        let registry = StrategyRegistry::with_builtin_backends();
        let result = registry.resolve("PboManager", &backend("PboManager", "/bin/sh"));
        assert!(result.is_ok());
    }

    #[test]
    fn test_register_closure_strategy() {
        let mut registry = StrategyRegistry::new();
        registry.register("Fake", |_| {
            let strategy = |_: &PackJob| -> std::result::Result<(), JobError> {
                Err(JobError::other("nope"))
            };
            Ok(Arc::new(strategy) as Arc<dyn PackStrategy>)
        });
        let strategy = registry.resolve("fake", &backend("fake", "/x")).unwrap();
        let job = PackJob::new("/src", "/out/src.pbo");
        assert_eq!(strategy.pack(&job), Err(JobError::other("nope")));
    }

    #[test]
    fn test_command_args() {
        let job = PackJob::for_entry(Path::new("/root"), Path::new("/out"), "Alpha");
        let args = PboManagerStrategy::command_args(&job);
        assert_eq!(
            args,
            vec![
                OsString::from("-pack"),
                OsString::from("/root/Alpha"),
                OsString::from("/out/alpha.pbo"),
            ]
        );
    }
}
