//! e12pack library
//!
//! Packs the directories listed in a pack root's manifest into PBO archives,
//! running one external packer process per directory on a bounded worker pool.

pub mod cancel;
pub mod cli;
pub mod dispatcher;
pub mod error;
pub mod job;
pub mod manifest;
pub mod pool;
pub mod process_guard;
pub mod runner;
pub mod settings;
pub mod strategy;

// Re-export main types for convenience
pub use cancel::CancelToken;
pub use dispatcher::Dispatcher;
pub use error::{JobError, PackError};
pub use job::{ARCHIVE_EXTENSION, JobOutcome, JobStatus, PackJob, PackReport};
pub use manifest::{MANIFEST_FILE, read_manifest};
pub use pool::{DEFAULT_WORKERS, WorkerPool};
pub use process_guard::{ChildRegistry, CommandProcessGroup};
pub use runner::{PackerOutput, run_packer};
pub use settings::{BackendConfig, PackerConfig, SETTINGS_FILE};
pub use strategy::{BackendFactory, PackStrategy, PboManagerStrategy, StrategyRegistry};
