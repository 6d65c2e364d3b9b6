// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Lifecycle of the single engine process.
//!
//! The state tag and the child handle live behind one async mutex which
//! `start` and `stop` hold for their whole duration. `is_running` never waits
//! for it: when the lock is busy it answers from an atomic copy of the state
//! tag. Output drains only hold the [`LogSink`].

use crate::backend::{EngineChild, ProcessBackend, SpawnRequest, TokioBackend};
use crate::errors::SupervisorError;
use crate::sink::{LogFacadeSink, LogSink, OutputStream, drain};
use crate::state::SupervisorState;
use log::{debug, error, info, warn};
use std::path::Path;
use std::process::ExitStatus;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Duration, timeout};

pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_KILL_TIMEOUT: Duration = Duration::from_secs(5);

/// Replaced with the configuration path in each launch argument.
pub const CONFIG_PLACEHOLDER: &str = "{config}";

#[derive(Debug, Clone)]
pub struct SupervisorOptions {
    /// Prefix for log lines.
    pub name: String,
    pub launch_args: Vec<String>,
    /// Grace period between SIGTERM and SIGKILL.
    pub stop_timeout: Duration,
    /// How long to wait for the child after SIGKILL.
    pub kill_timeout: Duration,
}

impl Default for SupervisorOptions {
    fn default() -> Self {
        Self {
            name: "engine".to_string(),
            launch_args: default_launch_args(),
            stop_timeout: DEFAULT_STOP_TIMEOUT,
            kill_timeout: DEFAULT_KILL_TIMEOUT,
        }
    }
}

pub fn default_launch_args() -> Vec<String> {
    vec!["-config".to_string(), CONFIG_PLACEHOLDER.to_string()]
}

/// State tag and handle as seen inside the critical section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    pub state: SupervisorState,
    pub has_handle: bool,
    pub pid: Option<u32>,
}

impl Snapshot {
    pub fn is_consistent(&self) -> bool {
        self.has_handle == self.state.holds_handle()
    }
}

struct LiveEngine {
    child: Box<dyn EngineChild>,
    pid: u32,
    // Dropping these detaches the drains; they end on their own at EOF.
    _drains: Vec<JoinHandle<()>>,
}

struct Inner {
    state: SupervisorState,
    engine: Option<LiveEngine>,
}

pub struct Supervisor {
    options: SupervisorOptions,
    backend: Arc<dyn ProcessBackend>,
    sink: Arc<dyn LogSink>,
    inner: Mutex<Inner>,
    published: AtomicU8,
}

impl Supervisor {
    pub fn new(
        options: SupervisorOptions,
        backend: Arc<dyn ProcessBackend>,
        sink: Arc<dyn LogSink>,
    ) -> Self {
        Self {
            options,
            backend,
            sink,
            inner: Mutex::new(Inner {
                state: SupervisorState::Stopped,
                engine: None,
            }),
            published: AtomicU8::new(SupervisorState::Stopped as u8),
        }
    }

    /// Tokio child processes, output forwarded to the `log` facade.
    pub fn with_defaults(options: SupervisorOptions) -> Self {
        let sink = Arc::new(LogFacadeSink::new(options.name.clone()));
        Self::new(options, Arc::new(TokioBackend), sink)
    }

    pub fn options(&self) -> &SupervisorOptions {
        &self.options
    }

    /// Last published state tag. Never blocks.
    pub fn state(&self) -> SupervisorState {
        SupervisorState::from_u8(self.published.load(Ordering::Acquire))
    }

    /// Waits for any in-flight `start`/`stop`.
    pub async fn snapshot(&self) -> Snapshot {
        let inner = self.inner.lock().await;
        Snapshot {
            state: inner.state,
            has_handle: inner.engine.is_some(),
            pid: inner.engine.as_ref().map(|e| e.pid),
        }
    }

    pub async fn pid(&self) -> Option<u32> {
        self.snapshot().await.pid
    }

    /// Spawn the engine unless it is already alive.
    ///
    /// Both paths are checked before anything is spawned. The drains for
    /// stdout and stderr are started before this returns.
    pub async fn start(&self, binary: &Path, config: &Path) -> Result<(), SupervisorError> {
        let name = &self.options.name;
        let mut inner = self.inner.lock().await;

        if self.reap_if_exited(&mut inner) {
            let pid = inner.engine.as_ref().map_or(0, |e| e.pid);
            info!("[{name}] already running (pid={pid})");
            return Ok(());
        }

        if !binary.exists() {
            return Err(SupervisorError::BinaryMissing {
                path: binary.to_path_buf(),
            });
        }
        if !config.exists() {
            return Err(SupervisorError::ConfigMissing {
                path: config.to_path_buf(),
            });
        }

        self.transition(&mut inner, SupervisorState::Starting);
        let request = self.spawn_request(binary, config);
        let spawned = match self.backend.spawn(&request) {
            Ok(spawned) => spawned,
            Err(source) => {
                self.transition(&mut inner, SupervisorState::Stopped);
                let command = request.command_line();
                error!("[{name}] failed to spawn: {command}: {source}");
                return Err(SupervisorError::Spawn { command, source });
            }
        };

        let pid = spawned.child.pid().unwrap_or(0);
        info!(
            "[{name}] spawned (pid={pid}, cmd={})",
            request.command_line()
        );

        let mut drains = Vec::with_capacity(2);
        if let Some(stdout) = spawned.stdout {
            drains.push(tokio::spawn(drain(
                stdout,
                OutputStream::Stdout,
                Arc::clone(&self.sink),
            )));
        }
        if let Some(stderr) = spawned.stderr {
            drains.push(tokio::spawn(drain(
                stderr,
                OutputStream::Stderr,
                Arc::clone(&self.sink),
            )));
        }

        inner.engine = Some(LiveEngine {
            child: spawned.child,
            pid,
            _drains: drains,
        });
        self.transition(&mut inner, SupervisorState::Running);
        Ok(())
    }

    /// Terminate the engine: SIGTERM, wait up to the grace period, then
    /// SIGKILL. Stopping a stopped supervisor is a no-op.
    ///
    /// The handle is always released and the state always ends `Stopped`,
    /// including when SIGTERM could not be delivered (reported as
    /// [`SupervisorError::Stop`]). The engine's own exit code is only logged.
    pub async fn stop(&self) -> Result<(), SupervisorError> {
        let mut inner = self.inner.lock().await;
        let Some(mut engine) = inner.engine.take() else {
            debug!("[{}] stop requested, engine not running", self.options.name);
            return Ok(());
        };

        self.transition(&mut inner, SupervisorState::Stopping);
        let result = self.terminate(&mut engine).await;
        drop(engine);
        self.transition(&mut inner, SupervisorState::Stopped);
        result
    }

    /// Liveness derived from the child itself, never from a cached flag.
    /// Never blocks and never fails; an observed exit releases the handle.
    pub fn is_running(&self) -> bool {
        match self.inner.try_lock() {
            Ok(mut inner) => self.reap_if_exited(&mut inner),
            Err(_) => self.state() == SupervisorState::Running,
        }
    }

    fn spawn_request(&self, binary: &Path, config: &Path) -> SpawnRequest {
        let config = config.to_string_lossy();
        SpawnRequest {
            program: binary.to_path_buf(),
            args: self
                .options
                .launch_args
                .iter()
                .map(|arg| arg.replace(CONFIG_PLACEHOLDER, &config))
                .collect(),
        }
    }

    /// Returns whether a live child is held. Exited or unobservable children
    /// are released and the state moves to `Stopped`.
    fn reap_if_exited(&self, inner: &mut Inner) -> bool {
        let Some(engine) = inner.engine.as_mut() else {
            return false;
        };
        match engine.child.try_wait() {
            Ok(None) => true,
            Ok(Some(status)) => {
                self.log_exit(engine.pid, status);
                inner.engine = None;
                self.transition(inner, SupervisorState::Stopped);
                false
            }
            Err(e) => {
                error!(
                    "[{}] cannot query engine (pid={}), releasing it: {e}",
                    self.options.name, engine.pid
                );
                inner.engine = None;
                self.transition(inner, SupervisorState::Stopped);
                false
            }
        }
    }

    async fn terminate(&self, engine: &mut LiveEngine) -> Result<(), SupervisorError> {
        let name = &self.options.name;
        let pid = engine.pid;

        if let Ok(Some(status)) = engine.child.try_wait() {
            self.log_exit(pid, status);
            return Ok(());
        }

        info!("[{name}] sending SIGTERM (pid={pid})");
        if let Err(source) = engine.child.terminate() {
            error!("[{name}] failed to send SIGTERM: {source}");
            if let Err(e) = engine.child.kill() {
                warn!("[{name}] failed to send SIGKILL: {e}");
            }
            return Err(SupervisorError::Stop { pid, source });
        }

        let stop = self.options.stop_timeout;
        match timeout(stop, engine.child.wait()).await {
            Ok(Ok(status)) => self.log_exit(pid, status),
            Ok(Err(e)) => warn!("[{name}] failed waiting for exit: {e}"),
            Err(_) => {
                warn!(
                    "[{name}] stop timeout ({}ms) reached, sending SIGKILL",
                    stop.as_millis()
                );
                if let Err(e) = engine.child.kill() {
                    warn!("[{name}] failed to send SIGKILL: {e}");
                }
                match timeout(self.options.kill_timeout, engine.child.wait()).await {
                    Ok(Ok(status)) => self.log_exit(pid, status),
                    Ok(Err(e)) => warn!("[{name}] failed waiting for exit: {e}"),
                    Err(_) => warn!("[{name}] still running after SIGKILL, giving up"),
                }
            }
        }
        Ok(())
    }

    fn log_exit(&self, pid: u32, status: ExitStatus) {
        if status.success() {
            info!("[{}] exited with {status} (pid={pid})", self.options.name);
        } else {
            warn!("[{}] exited with {status} (pid={pid})", self.options.name);
        }
    }

    fn transition(&self, inner: &mut Inner, next: SupervisorState) {
        debug_assert!(
            inner.state.can_transition_to(next),
            "invalid transition {} -> {next}",
            inner.state
        );
        debug!("[{}] {} -> {next}", self.options.name, inner.state);
        inner.state = next;
        self.published.store(next as u8, Ordering::Release);
    }
}
