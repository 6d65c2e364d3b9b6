// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use crate::errors::InstallError;
use log::{debug, info};
use std::fs::{self, DirBuilder, File, Permissions};
use std::io;
use std::os::unix::fs::{DirBuilderExt, PermissionsExt};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

const BINARY_MODE: u32 = 0o755;

/// The installed engine executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineBinary {
    path: PathBuf,
}

impl EngineBinary {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Checked against the filesystem on every call, so an external deletion
    /// is noticed.
    pub fn is_installed(&self) -> bool {
        self.path.is_file()
    }
}

/// Copies the read-only bundled engine into the writable sandbox once.
#[derive(Debug, Clone)]
pub struct BinaryInstaller {
    bundled: PathBuf,
    destination: PathBuf,
}

impl BinaryInstaller {
    pub fn new(bundled: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self {
            bundled: bundled.into(),
            destination: destination.into(),
        }
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Idempotent. An existing destination is returned untouched; otherwise the
    /// bundle is staged next to the destination, made executable, and renamed
    /// into place so a partial copy is never visible at the destination path.
    pub fn ensure_installed(&self) -> Result<EngineBinary, InstallError> {
        let binary = EngineBinary {
            path: self.destination.clone(),
        };
        if binary.is_installed() {
            debug!(
                "engine binary already installed at {}",
                self.destination.display()
            );
            return Ok(binary);
        }

        if !self.bundled.is_file() {
            return Err(InstallError::BundleMissing {
                path: self.bundled.clone(),
            });
        }

        let dir = match self.destination.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        DirBuilder::new()
            .recursive(true)
            .mode(BINARY_MODE)
            .create(dir)
            .map_err(|source| InstallError::CreateDir {
                path: dir.to_path_buf(),
                source,
            })?;

        let staged = self.stage_copy(dir)?;
        fs::set_permissions(staged.path(), Permissions::from_mode(BINARY_MODE)).map_err(
            |source| InstallError::Permissions {
                path: staged.path().to_path_buf(),
                source,
            },
        )?;
        let file = staged
            .persist(&self.destination)
            .map_err(|e| InstallError::Persist {
                path: self.destination.clone(),
                source: e.error,
            })?;
        drop(file);

        info!(
            "engine binary installed at {} (from {})",
            self.destination.display(),
            self.bundled.display()
        );
        Ok(binary)
    }

    /// The returned temp file is deleted on drop, which covers every early return.
    fn stage_copy(&self, dir: &Path) -> Result<NamedTempFile, InstallError> {
        let copy_err = |source: io::Error| InstallError::Copy {
            from: self.bundled.clone(),
            to: self.destination.clone(),
            source,
        };
        let mut source = File::open(&self.bundled).map_err(copy_err)?;
        let mut staged = NamedTempFile::new_in(dir).map_err(copy_err)?;
        let copied = io::copy(&mut source, staged.as_file_mut()).map_err(copy_err)?;
        staged.as_file().sync_all().map_err(copy_err)?;
        debug!("staged {copied} bytes at {}", staged.path().display());
        Ok(staged)
    }
}
