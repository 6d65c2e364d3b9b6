// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Platform process backend.
//!
//! The supervisor's state machine only talks to [`ProcessBackend`] and
//! [`EngineChild`]; [`TokioBackend`] is the POSIX implementation.

use async_trait::async_trait;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use std::io;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use tokio::io::AsyncRead;
use tokio::process::{Child, Command};

pub type OutputReader = Box<dyn AsyncRead + Send + Unpin>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnRequest {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl SpawnRequest {
    pub fn command_line(&self) -> String {
        let mut line = self.program.display().to_string();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

/// A freshly spawned engine with its captured output streams.
pub struct SpawnedEngine {
    pub child: Box<dyn EngineChild>,
    pub stdout: Option<OutputReader>,
    pub stderr: Option<OutputReader>,
}

/// Handle to one spawned child process.
#[async_trait]
pub trait EngineChild: Send {
    fn pid(&self) -> Option<u32>;

    /// Non-blocking exit check. `Some` means the child has been reaped.
    fn try_wait(&mut self) -> io::Result<Option<ExitStatus>>;

    /// Ask the child to exit (SIGTERM).
    fn terminate(&mut self) -> io::Result<()>;

    /// Force the child to exit (SIGKILL).
    fn kill(&mut self) -> io::Result<()>;

    async fn wait(&mut self) -> io::Result<ExitStatus>;
}

pub trait ProcessBackend: Send + Sync {
    fn spawn(&self, request: &SpawnRequest) -> io::Result<SpawnedEngine>;
}

/// Spawns the engine with `tokio::process` and signals it with `kill(2)`.
/// Must be used from inside a tokio runtime.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioBackend;

impl ProcessBackend for TokioBackend {
    fn spawn(&self, request: &SpawnRequest) -> io::Result<SpawnedEngine> {
        let mut cmd = Command::new(&request.program);
        cmd.args(&request.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn()?;
        let stdout = child
            .stdout
            .take()
            .map(|s| Box::new(s) as OutputReader);
        let stderr = child
            .stderr
            .take()
            .map(|s| Box::new(s) as OutputReader);

        Ok(SpawnedEngine {
            child: Box::new(TokioChild { child }),
            stdout,
            stderr,
        })
    }
}

struct TokioChild {
    child: Child,
}

impl TokioChild {
    fn send_signal(&self, sig: Signal) -> io::Result<()> {
        let pid = self
            .child
            .id()
            .ok_or_else(|| io::Error::other("child has already been reaped"))?;
        let pid = i32::try_from(pid).map_err(io::Error::other)?;
        signal::kill(Pid::from_raw(pid), sig)?;
        Ok(())
    }
}

#[async_trait]
impl EngineChild for TokioChild {
    fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    fn try_wait(&mut self) -> io::Result<Option<ExitStatus>> {
        self.child.try_wait()
    }

    fn terminate(&mut self) -> io::Result<()> {
        self.send_signal(Signal::SIGTERM)
    }

    fn kill(&mut self) -> io::Result<()> {
        self.child.start_kill()
    }

    async fn wait(&mut self) -> io::Result<ExitStatus> {
        self.child.wait().await
    }
}
