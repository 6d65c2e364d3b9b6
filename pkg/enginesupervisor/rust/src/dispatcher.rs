// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use crate::errors::{DispatchError, ErrorKind};
use crate::installer::BinaryInstaller;
use crate::protocol::{MethodCall, MethodResponse};
use crate::settings::Settings;
use crate::store::ConfigStore;
use crate::supervisor::Supervisor;
use log::{error, info};
use std::sync::Arc;

/// Host-facing operations. Constructed once when the host attaches and torn
/// down with [`Dispatcher::detach`].
pub struct Dispatcher {
    installer: BinaryInstaller,
    store: ConfigStore,
    supervisor: Arc<Supervisor>,
}

impl Dispatcher {
    pub fn new(installer: BinaryInstaller, store: ConfigStore, supervisor: Arc<Supervisor>) -> Self {
        Self {
            installer,
            store,
            supervisor,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        let layout = settings.layout();
        Self::new(
            BinaryInstaller::new(&settings.bundled_binary, layout.binary_path()),
            ConfigStore::new(layout.config_path()),
            Arc::new(Supervisor::with_defaults(settings.supervisor_options())),
        )
    }

    pub fn supervisor(&self) -> &Arc<Supervisor> {
        &self.supervisor
    }

    pub fn initialize(&self) -> Result<bool, DispatchError> {
        let binary = self.installer.ensure_installed().map_err(|e| {
            error!("failed to initialize engine: {e}");
            DispatchError::from(e)
        })?;
        info!("engine ready at {}", binary.path().display());
        Ok(true)
    }

    pub fn connect(&self, config: &str) -> Result<bool, DispatchError> {
        self.store.save(config).map_err(|e| {
            error!("failed to save engine config: {e}");
            DispatchError::from(e)
        })?;
        Ok(true)
    }

    /// Starts from the installed binary and the last saved configuration.
    pub async fn start(&self) -> Result<bool, DispatchError> {
        self.supervisor
            .start(self.installer.destination(), self.store.path())
            .await
            .map_err(|e| {
                error!("failed to start engine: {e}");
                DispatchError::from(e)
            })?;
        Ok(true)
    }

    pub async fn stop(&self) -> Result<bool, DispatchError> {
        self.supervisor.stop().await.map_err(|e| {
            error!("failed to stop engine: {e}");
            DispatchError::from(e)
        })?;
        Ok(true)
    }

    pub fn is_connected(&self) -> bool {
        self.supervisor.is_running()
    }

    pub async fn handle(&self, call: MethodCall) -> MethodResponse {
        let result = match call.method.as_str() {
            "initialize" => self.initialize(),
            "connect" => match call.arg_str("config") {
                Some(config) => self.connect(config),
                None => Err(DispatchError::new(
                    ErrorKind::ArgsError,
                    "Invalid arguments",
                    Some("Config is required".to_string()),
                )),
            },
            "start" => self.start().await,
            "stop" => self.stop().await,
            "isConnected" => Ok(self.is_connected()),
            other => Err(DispatchError::new(
                ErrorKind::NotImplemented,
                format!("method '{other}' is not implemented"),
                None,
            )),
        };
        MethodResponse {
            id: call.id,
            outcome: result.into(),
        }
    }

    /// Stop the engine when the host goes away. Errors are logged only.
    pub async fn detach(&self) {
        if let Err(e) = self.supervisor.stop().await {
            error!("failed to stop engine on detach: {e}");
        }
    }
}
