//! Settings file handling (`.e12pack_settings`).
//!
//! The settings are TOML:
//!
//! ```toml
//! output = "build/addons"
//! rapify = true
//!
//! [packer]
//! name = "pbomanager"
//! path = "tools/PboConsole.exe"
//! ```
//!
//! Paths are used as written. Relative `output` and `packer.path` values are
//! relative to the working directory of the process, not to the pack root.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{PackError, Result};

/// File name of the settings inside the pack root
pub const SETTINGS_FILE: &str = ".e12pack_settings";

/// Resolved packing settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackerConfig {
    /// Directory the archives are written to
    pub output: PathBuf,

    /// Binarize configs before packing. Parsed but not acted upon.
    #[serde(default)]
    pub rapify: Option<bool>,

    /// Backend selection
    pub packer: BackendConfig,
}

/// Backend descriptor from the `[packer]` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Registry key, matched case-insensitively
    pub name: String,

    /// Path to the backend executable
    pub path: PathBuf,
}

impl PackerConfig {
    /// Load settings from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        Self::read(path).map_err(|e| PackError::settings(path, format!("{:#}", e)))
    }

    fn read(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {:?}", path))?;
        let config: Self = toml::from_str(&content).context("Failed to parse settings TOML")?;
        config.validate()?;
        Ok(config)
    }

    /// Check the required fields are non-empty
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.output.as_os_str().is_empty() {
            anyhow::bail!("missing required field `output`");
        }
        if self.packer.name.trim().is_empty() {
            anyhow::bail!("missing required field `packer.name`");
        }
        if self.packer.path.as_os_str().is_empty() {
            anyhow::bail!("missing required field `packer.path`");
        }
        Ok(())
    }
}
