// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use log::{debug, info, warn};
use std::fmt;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

impl fmt::Display for OutputStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputStream::Stdout => write!(f, "stdout"),
            OutputStream::Stderr => write!(f, "stderr"),
        }
    }
}

/// Append-only destination for engine output. Implementations must not block
/// on supervisor state.
pub trait LogSink: Send + Sync {
    fn line(&self, stream: OutputStream, line: &str);
}

/// Forwards engine output to the `log` facade, stderr at warn level.
#[derive(Debug, Clone)]
pub struct LogFacadeSink {
    name: String,
}

impl LogFacadeSink {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl LogSink for LogFacadeSink {
    fn line(&self, stream: OutputStream, line: &str) {
        match stream {
            OutputStream::Stdout => info!(target: "engine::stdout", "[{}] {line}", self.name),
            OutputStream::Stderr => warn!(target: "engine::stderr", "[{}] {line}", self.name),
        }
    }
}

/// Read `reader` line by line until end-of-stream, forwarding each line.
/// Invalid UTF-8 is replaced rather than ending the drain.
pub(crate) async fn drain<R>(reader: R, stream: OutputStream, sink: Arc<dyn LogSink>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let text = String::from_utf8_lossy(&buf);
                sink.line(stream, text.trim_end_matches(['\n', '\r']));
            }
            Err(e) => {
                debug!("{stream} drain stopped: {e}");
                break;
            }
        }
    }
    debug!("{stream} drain reached end of stream");
}
