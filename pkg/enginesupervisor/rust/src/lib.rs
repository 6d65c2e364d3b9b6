// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Runs a third-party proxy engine as a supervised child process: installs the
//! bundled executable into the sandbox, stages its configuration, and starts,
//! watches and stops it.

#![deny(clippy::cast_possible_wrap)]
#![deny(clippy::dbg_macro)]
#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]
#![deny(clippy::todo)]

pub mod backend;
pub mod dispatcher;
pub mod errors;
pub mod installer;
pub mod layout;
pub mod protocol;
pub mod server;
pub mod settings;
pub mod sink;
pub mod state;
pub mod store;
pub mod supervisor;

#[cfg(test)]
pub(crate) mod test_utils;

pub use dispatcher::Dispatcher;
pub use errors::{ConfigWriteError, DispatchError, ErrorKind, InstallError, SupervisorError};
pub use installer::{BinaryInstaller, EngineBinary};
pub use layout::SandboxLayout;
pub use settings::{Settings, load_settings, settings_path};
pub use state::SupervisorState;
pub use store::{ConfigStore, EngineConfig};
pub use supervisor::{Supervisor, SupervisorOptions};
