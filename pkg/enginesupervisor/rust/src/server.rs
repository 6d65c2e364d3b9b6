// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use crate::dispatcher::Dispatcher;
use crate::protocol::{MethodCall, MethodResponse};
use log::{debug, warn};
use std::io;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;
use tokio::task::JoinSet;

/// Serve method calls read line by line from `input` until end of input.
///
/// Each call runs on its own task, so calls are not serialized here; the
/// responses carry the request id and may come back out of order.
pub async fn serve<R, W>(dispatcher: Arc<Dispatcher>, input: R, output: W) -> io::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let output = Arc::new(Mutex::new(output));
    let mut lines = BufReader::new(input).lines();
    let mut calls = JoinSet::new();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let dispatcher = Arc::clone(&dispatcher);
        let output = Arc::clone(&output);
        calls.spawn(async move {
            let response = match serde_json::from_str::<MethodCall>(&line) {
                Ok(call) => {
                    debug!("received {} (id={:?})", call.method, call.id);
                    dispatcher.handle(call).await
                }
                Err(e) => {
                    warn!("rejecting malformed request: {e}");
                    MethodResponse::malformed(&e)
                }
            };
            if let Err(e) = write_response(&output, &response).await {
                warn!("failed to write response: {e}");
            }
        });
        // Reap finished calls so the set does not grow with the session.
        while calls.try_join_next().is_some() {}
    }

    while calls.join_next().await.is_some() {}
    Ok(())
}

async fn write_response<W>(output: &Mutex<W>, response: &MethodResponse) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut line = serde_json::to_vec(response)?;
    line.push(b'\n');
    let mut output = output.lock().await;
    output.write_all(&line).await?;
    output.flush().await
}
