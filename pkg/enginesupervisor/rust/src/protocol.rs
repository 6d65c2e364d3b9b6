// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Line-delimited JSON envelope spoken with the host bridge.
//!
//! Request: `{"id": 1, "method": "connect", "args": {"config": "..."}}`
//! Response: `{"id": 1, "result": true}` or
//! `{"id": 1, "error": {"kind": "ConfigWriteError", "message": "...", "detail": "..."}}`

use crate::errors::{DispatchError, ErrorKind};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Deserialize)]
pub struct MethodCall {
    #[serde(default)]
    pub id: Option<u64>,
    pub method: String,
    #[serde(default)]
    pub args: Value,
}

impl MethodCall {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            id: None,
            method: method.into(),
            args: Value::Null,
        }
    }

    pub fn with_args(mut self, args: Value) -> Self {
        self.args = args;
        self
    }

    pub fn arg_str(&self, key: &str) -> Option<&str> {
        self.args.get(key).and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Result(bool),
    Error(DispatchError),
}

impl From<Result<bool, DispatchError>> for Outcome {
    fn from(result: Result<bool, DispatchError>) -> Self {
        match result {
            Ok(value) => Outcome::Result(value),
            Err(e) => Outcome::Error(e),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MethodResponse {
    pub id: Option<u64>,
    #[serde(flatten)]
    pub outcome: Outcome,
}

impl MethodResponse {
    /// Response to a line that could not be decoded as a [`MethodCall`].
    pub fn malformed(err: &serde_json::Error) -> Self {
        Self {
            id: None,
            outcome: Outcome::Error(DispatchError::new(
                ErrorKind::ArgsError,
                "Invalid request",
                Some(err.to_string()),
            )),
        }
    }
}
