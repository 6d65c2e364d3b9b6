// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use crate::backend::{EngineChild, ProcessBackend, SpawnRequest, SpawnedEngine, TokioBackend};
use crate::sink::{LogSink, OutputStream};
use async_trait::async_trait;
use std::io;
use std::process::ExitStatus;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

#[derive(Default)]
pub struct MemorySink {
    lines: Mutex<Vec<(OutputStream, String)>>,
}

impl MemorySink {
    pub fn lines(&self) -> Vec<(OutputStream, String)> {
        self.lines.lock().unwrap().clone()
    }

    pub fn contains(&self, stream: OutputStream, text: &str) -> bool {
        self.lines
            .lock()
            .unwrap()
            .iter()
            .any(|(s, l)| *s == stream && l.contains(text))
    }

    pub async fn wait_for(&self, stream: OutputStream, text: &str, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.contains(stream, text) {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }
}

impl LogSink for MemorySink {
    fn line(&self, stream: OutputStream, line: &str) {
        self.lines.lock().unwrap().push((stream, line.to_string()));
    }
}

/// Real processes, counted. Optionally refuses to deliver SIGTERM.
#[derive(Default)]
pub struct CountingBackend {
    pub spawns: AtomicUsize,
    pub terminations: Arc<AtomicUsize>,
    pub fail_terminate: bool,
}

impl CountingBackend {
    pub fn failing_terminate() -> Self {
        Self {
            fail_terminate: true,
            ..Self::default()
        }
    }

    pub fn spawn_count(&self) -> usize {
        self.spawns.load(Ordering::SeqCst)
    }

    pub fn termination_count(&self) -> usize {
        self.terminations.load(Ordering::SeqCst)
    }
}

impl ProcessBackend for CountingBackend {
    fn spawn(&self, request: &SpawnRequest) -> io::Result<SpawnedEngine> {
        let spawned = TokioBackend.spawn(request)?;
        self.spawns.fetch_add(1, Ordering::SeqCst);
        Ok(SpawnedEngine {
            child: Box::new(CountingChild {
                inner: spawned.child,
                terminations: Arc::clone(&self.terminations),
                fail_terminate: self.fail_terminate,
            }),
            stdout: spawned.stdout,
            stderr: spawned.stderr,
        })
    }
}

struct CountingChild {
    inner: Box<dyn EngineChild>,
    terminations: Arc<AtomicUsize>,
    fail_terminate: bool,
}

#[async_trait]
impl EngineChild for CountingChild {
    fn pid(&self) -> Option<u32> {
        self.inner.pid()
    }

    fn try_wait(&mut self) -> io::Result<Option<ExitStatus>> {
        self.inner.try_wait()
    }

    fn terminate(&mut self) -> io::Result<()> {
        self.terminations.fetch_add(1, Ordering::SeqCst);
        if self.fail_terminate {
            return Err(io::Error::from(io::ErrorKind::PermissionDenied));
        }
        self.inner.terminate()
    }

    fn kill(&mut self) -> io::Result<()> {
        self.inner.kill()
    }

    async fn wait(&mut self) -> io::Result<ExitStatus> {
        self.inner.wait().await
    }
}
