// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use crate::errors::ConfigWriteError;
use log::debug;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// The configuration as last written for the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub path: PathBuf,
    pub contents: String,
}

/// Persists the engine configuration to a fixed path. Contents are opaque;
/// the engine validates them when it starts.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the stored configuration. The new contents are written to a
    /// sibling temp file and renamed over the old one, so a failed save keeps
    /// the previous configuration.
    pub fn save(&self, config: &str) -> Result<EngineConfig, ConfigWriteError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(|source| ConfigWriteError::CreateDir {
            path: dir.to_path_buf(),
            source,
        })?;

        let write_err = |source| ConfigWriteError::Write {
            path: self.path.clone(),
            source,
        };
        let mut staged = NamedTempFile::new_in(dir).map_err(write_err)?;
        staged.write_all(config.as_bytes()).map_err(write_err)?;
        staged.as_file().sync_all().map_err(write_err)?;
        staged
            .persist(&self.path)
            .map_err(|e| ConfigWriteError::Persist {
                path: self.path.clone(),
                source: e.error,
            })?;

        debug!(
            "config saved to {} ({} bytes)",
            self.path.display(),
            config.len()
        );
        Ok(EngineConfig {
            path: self.path.clone(),
            contents: config.to_string(),
        })
    }
}
