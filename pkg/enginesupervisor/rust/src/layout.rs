// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use std::path::{Path, PathBuf};

pub const DEFAULT_ENGINE_DIR: &str = "engine";
pub const DEFAULT_BINARY_NAME: &str = "v2ray";
pub const DEFAULT_CONFIG_NAME: &str = "config.json";

/// Fixed locations of the engine files inside the application sandbox.
/// Both files are overwritten in place; there is no versioning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxLayout {
    root: PathBuf,
    engine_dir: String,
    binary_name: String,
    config_name: String,
}

impl SandboxLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            engine_dir: DEFAULT_ENGINE_DIR.to_string(),
            binary_name: DEFAULT_BINARY_NAME.to_string(),
            config_name: DEFAULT_CONFIG_NAME.to_string(),
        }
    }

    pub fn with_names(
        mut self,
        engine_dir: impl Into<String>,
        binary_name: impl Into<String>,
        config_name: impl Into<String>,
    ) -> Self {
        self.engine_dir = engine_dir.into();
        self.binary_name = binary_name.into();
        self.config_name = config_name.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn engine_dir(&self) -> PathBuf {
        self.root.join(&self.engine_dir)
    }

    pub fn binary_path(&self) -> PathBuf {
        self.engine_dir().join(&self.binary_name)
    }

    pub fn config_path(&self) -> PathBuf {
        self.engine_dir().join(&self.config_name)
    }
}
