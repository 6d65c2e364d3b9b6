// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use crate::layout::{DEFAULT_BINARY_NAME, DEFAULT_CONFIG_NAME, DEFAULT_ENGINE_DIR, SandboxLayout};
use crate::supervisor::{DEFAULT_KILL_TIMEOUT, SupervisorOptions, default_launch_args};
use anyhow::{Context, Result};
use log::warn;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_SETTINGS_PATH: &str = "/etc/engine-supervisor/settings.yaml";
pub const SETTINGS_ENV: &str = "ENGINE_SUPERVISOR_SETTINGS";

fn default_engine_dir() -> String {
    DEFAULT_ENGINE_DIR.to_string()
}

fn default_binary_name() -> String {
    DEFAULT_BINARY_NAME.to_string()
}

fn default_config_name() -> String {
    DEFAULT_CONFIG_NAME.to_string()
}

fn default_stop_timeout() -> u64 {
    5
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub sandbox_dir: PathBuf,
    pub bundled_binary: PathBuf,
    #[serde(default = "default_engine_dir")]
    pub engine_dir: String,
    #[serde(default = "default_binary_name")]
    pub binary_name: String,
    #[serde(default = "default_config_name")]
    pub config_name: String,
    #[serde(default = "default_launch_args")]
    pub launch_args: Vec<String>,
    /// Seconds between SIGTERM and SIGKILL.
    #[serde(default = "default_stop_timeout")]
    pub stop_timeout: u64,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Settings {
    pub fn layout(&self) -> SandboxLayout {
        SandboxLayout::new(&self.sandbox_dir).with_names(
            &self.engine_dir,
            &self.binary_name,
            &self.config_name,
        )
    }

    pub fn supervisor_options(&self) -> SupervisorOptions {
        SupervisorOptions {
            name: self.binary_name.clone(),
            launch_args: self.launch_args.clone(),
            stop_timeout: Duration::from_secs(self.stop_timeout),
            kill_timeout: DEFAULT_KILL_TIMEOUT,
        }
    }

    /// Unknown levels fall back to info.
    pub fn log_level(&self) -> log::Level {
        self.log_level.parse().unwrap_or_else(|_| {
            warn!("unknown log_level {:?}, using info", self.log_level);
            log::Level::Info
        })
    }
}

/// `--settings` wins over the environment, which wins over the default path.
pub fn settings_path(cli: Option<PathBuf>) -> PathBuf {
    cli.or_else(|| std::env::var_os(SETTINGS_ENV).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_PATH))
}

pub fn load_settings(path: &Path) -> Result<Settings> {
    let contents =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let settings: Settings =
        serde_yaml::from_str(&contents).with_context(|| format!("parsing {}", path.display()))?;
    Ok(settings)
}
