// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

#![allow(dead_code)]

use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use serde_json::{Value, json};
use std::io::{BufRead, BufReader, Write};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Stand-in engine: reports its arguments, then idles until signalled.
pub const FAKE_ENGINE: &str = "#!/bin/sh\necho \"engine listening with $*\"\necho \"engine notice\" >&2\nexec sleep 300\n";

/// Handle to a running engine-supervisor daemon.
pub struct DaemonHandle {
    child: Child,
    stdin: Option<ChildStdin>,
    next_id: u64,
    responses: Arc<Mutex<Vec<Value>>>,
    log_lines: Arc<Mutex<Vec<String>>>,
    _stdout_thread: std::thread::JoinHandle<()>,
    _stderr_thread: std::thread::JoinHandle<()>,
}

impl DaemonHandle {
    pub fn start(settings: &Path) -> Self {
        let bin = env!("CARGO_BIN_EXE_engine-supervisor");
        let mut child = Command::new(bin)
            .arg("--settings")
            .arg(settings)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .expect("failed to start engine-supervisor");

        let stdin = child.stdin.take().expect("failed to capture stdin");
        let stdout = child.stdout.take().expect("failed to capture stdout");
        let stderr = child.stderr.take().expect("failed to capture stderr");
        let responses = Arc::new(Mutex::new(Vec::<Value>::new()));
        let log_lines = Arc::new(Mutex::new(Vec::<String>::new()));

        // stdout carries protocol responses only; logs go to stderr.
        let responses_clone = Arc::clone(&responses);
        let stdout_thread = std::thread::spawn(move || {
            for line in BufReader::new(stdout).lines() {
                match line {
                    Ok(l) => match serde_json::from_str::<Value>(&l) {
                        Ok(v) => responses_clone.lock().unwrap().push(v),
                        Err(e) => eprintln!("[daemon:stdout] unparseable {l:?}: {e}"),
                    },
                    Err(_) => break,
                }
            }
        });

        let lines_clone = Arc::clone(&log_lines);
        let stderr_thread = std::thread::spawn(move || {
            for line in BufReader::new(stderr).lines() {
                match line {
                    Ok(l) => {
                        eprintln!("[daemon] {l}");
                        lines_clone.lock().unwrap().push(l);
                    }
                    Err(_) => break,
                }
            }
        });

        Self {
            child,
            stdin: Some(stdin),
            next_id: 1,
            responses,
            log_lines,
            _stdout_thread: stdout_thread,
            _stderr_thread: stderr_thread,
        }
    }

    /// Write a raw request line.
    pub fn send_line(&mut self, line: &str) {
        let stdin = self.stdin.as_mut().expect("stdin already closed");
        writeln!(stdin, "{line}").expect("failed to write request");
        stdin.flush().expect("failed to flush request");
    }

    /// Send a method call and wait for the response with the same id.
    pub fn call(&mut self, method: &str, args: Value) -> Value {
        let id = self.next_id;
        self.next_id += 1;
        let request = json!({"id": id, "method": method, "args": args});
        self.send_line(&request.to_string());
        self.wait_for_response(|v| v["id"] == id, DEFAULT_TIMEOUT)
            .unwrap_or_else(|| panic!("no response to {method} (id={id})"))
    }

    pub fn wait_for_response(
        &self,
        pred: impl Fn(&Value) -> bool,
        timeout: Duration,
    ) -> Option<Value> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(v) = self.responses.lock().unwrap().iter().find(|v| pred(v)) {
                return Some(v.clone());
            }
            if Instant::now() >= deadline {
                return None;
            }
            std::thread::sleep(Duration::from_millis(20));
        }
    }

    /// Wait until a log line containing `pattern` appears, or timeout.
    pub fn wait_for_log(&self, pattern: &str, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            {
                let lines = self.log_lines.lock().unwrap();
                if lines.iter().any(|l| l.contains(pattern)) {
                    return true;
                }
            }
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(Duration::from_millis(50));
        }
    }

    pub fn wait_for_log_default(&self, pattern: &str) -> bool {
        self.wait_for_log(pattern, DEFAULT_TIMEOUT)
    }

    /// Extract PIDs from "spawned (pid=NNN" log lines.
    pub fn spawned_pids(&self) -> Vec<u32> {
        let lines = self.log_lines.lock().unwrap();
        lines
            .iter()
            .filter_map(|l| {
                let marker = "spawned (pid=";
                let start = l.find(marker)? + marker.len();
                let end = l[start..].find(|c: char| !c.is_ascii_digit())? + start;
                l[start..end].parse().ok()
            })
            .collect()
    }

    pub fn send_signal(&self, sig: Signal) {
        let pid = self.child.id() as i32;
        signal::kill(Pid::from_raw(pid), sig).expect("failed to send signal to daemon");
    }

    /// Close stdin (host detached) and wait for the daemon to exit.
    pub fn close(&mut self) -> std::process::ExitStatus {
        self.stdin.take();
        self.wait_with_timeout(DEFAULT_TIMEOUT)
    }

    /// Send SIGTERM and wait for the daemon to exit.
    pub fn stop(&mut self) -> std::process::ExitStatus {
        self.send_signal(Signal::SIGTERM);
        self.wait_with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn wait_with_timeout(&mut self, timeout: Duration) -> std::process::ExitStatus {
        let deadline = Instant::now() + timeout;
        loop {
            match self
                .child
                .try_wait()
                .expect("failed to check daemon status")
            {
                Some(status) => return status,
                None => {
                    if Instant::now() >= deadline {
                        self.child.kill().ok();
                        return self.child.wait().expect("failed to wait on killed daemon");
                    }
                    std::thread::sleep(Duration::from_millis(50));
                }
            }
        }
    }
}

impl Drop for DaemonHandle {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// A sandbox, a bundled fake engine and a settings file pointing at both.
pub struct Sandbox {
    pub dir: tempfile::TempDir,
}

impl Sandbox {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let bundled = dir.path().join("bundle/v2ray");
        std::fs::create_dir_all(bundled.parent().unwrap()).unwrap();
        std::fs::write(&bundled, FAKE_ENGINE).unwrap();
        std::fs::set_permissions(&bundled, std::fs::Permissions::from_mode(0o444)).unwrap();

        let sandbox = Self { dir };
        sandbox.write_settings("");
        sandbox
    }

    /// Rewrite the settings file with extra YAML lines appended.
    pub fn write_settings(&self, extra: &str) {
        let yaml = format!(
            "sandbox_dir: {}\nbundled_binary: {}\nstop_timeout: 2\nlog_level: debug\n{extra}",
            self.root().display(),
            self.dir.path().join("bundle/v2ray").display(),
        );
        std::fs::write(self.settings(), yaml).unwrap();
    }

    pub fn root(&self) -> PathBuf {
        self.dir.path().join("files")
    }

    pub fn settings(&self) -> PathBuf {
        self.dir.path().join("settings.yaml")
    }

    pub fn binary(&self) -> PathBuf {
        self.root().join("engine/v2ray")
    }

    pub fn config(&self) -> PathBuf {
        self.root().join("engine/config.json")
    }
}

/// Check if a PID is still alive.
pub fn pid_is_alive(pid: u32) -> bool {
    signal::kill(Pid::from_raw(pid as i32), None).is_ok()
}

/// Wait until a PID is no longer alive, or timeout.
pub fn wait_for_pid_gone(pid: u32, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if !pid_is_alive(pid) {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(Duration::from_millis(50));
    }
}
