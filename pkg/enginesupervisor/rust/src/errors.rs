// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use serde::Serialize;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failure to place a runnable engine executable in the sandbox.
#[derive(Error, Debug)]
pub enum InstallError {
    #[error("bundled engine binary not found at {}", path.display())]
    BundleMissing { path: PathBuf },

    #[error("failed to create engine directory {}: {source}", path.display())]
    CreateDir { path: PathBuf, source: io::Error },

    #[error("failed to copy {} to {}: {source}", from.display(), to.display())]
    Copy {
        from: PathBuf,
        to: PathBuf,
        source: io::Error,
    },

    #[error("failed to make {} executable: {source}", path.display())]
    Permissions { path: PathBuf, source: io::Error },

    #[error("failed to move engine binary into place at {}: {source}", path.display())]
    Persist { path: PathBuf, source: io::Error },
}

/// Failure to stage the engine configuration. The previous file is left intact.
#[derive(Error, Debug)]
pub enum ConfigWriteError {
    #[error("failed to create config directory {}: {source}", path.display())]
    CreateDir { path: PathBuf, source: io::Error },

    #[error("failed to write config for {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },

    #[error("failed to move config into place at {}: {source}", path.display())]
    Persist { path: PathBuf, source: io::Error },
}

#[derive(Error, Debug)]
pub enum SupervisorError {
    #[error("engine binary not found at {}", path.display())]
    BinaryMissing { path: PathBuf },

    #[error("engine config not found at {}", path.display())]
    ConfigMissing { path: PathBuf },

    #[error("failed to spawn {command}: {source}")]
    Spawn { command: String, source: io::Error },

    #[error("failed to signal engine (pid={pid}): {source}")]
    Stop { pid: u32, source: io::Error },
}

/// Error kinds reported to the host bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    InstallError,
    ConfigWriteError,
    BinaryMissingError,
    ConfigMissingError,
    SpawnError,
    StopError,
    ArgsError,
    NotImplemented,
}

/// Structured failure returned by every dispatcher operation.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("{message}")]
pub struct DispatchError {
    pub kind: ErrorKind,
    pub message: String,
    pub detail: Option<String>,
}

impl DispatchError {
    pub fn new(kind: ErrorKind, message: impl Into<String>, detail: Option<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            detail,
        }
    }
}

impl From<InstallError> for DispatchError {
    fn from(e: InstallError) -> Self {
        Self::new(
            ErrorKind::InstallError,
            "Failed to initialize engine",
            Some(e.to_string()),
        )
    }
}

impl From<ConfigWriteError> for DispatchError {
    fn from(e: ConfigWriteError) -> Self {
        Self::new(
            ErrorKind::ConfigWriteError,
            "Failed to save configuration",
            Some(e.to_string()),
        )
    }
}

impl From<SupervisorError> for DispatchError {
    fn from(e: SupervisorError) -> Self {
        let (kind, message) = match e {
            SupervisorError::BinaryMissing { .. } => {
                (ErrorKind::BinaryMissingError, "Failed to start engine")
            }
            SupervisorError::ConfigMissing { .. } => {
                (ErrorKind::ConfigMissingError, "Failed to start engine")
            }
            SupervisorError::Spawn { .. } => (ErrorKind::SpawnError, "Failed to start engine"),
            SupervisorError::Stop { .. } => (ErrorKind::StopError, "Failed to stop engine"),
        };
        Self::new(kind, message, Some(e.to_string()))
    }
}
