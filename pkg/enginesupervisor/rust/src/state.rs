// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SupervisorState {
    /// No engine process is held.
    Stopped = 0,
    /// Spawn in progress.
    Starting = 1,
    /// Child process was spawned and has not been reaped.
    Running = 2,
    /// Termination requested, waiting for the child to exit.
    Stopping = 3,
}

impl SupervisorState {
    /// States in which the supervisor owns a process handle.
    pub fn holds_handle(self) -> bool {
        matches!(self, SupervisorState::Starting | SupervisorState::Running)
    }

    pub(crate) fn can_transition_to(self, next: SupervisorState) -> bool {
        use SupervisorState::*;
        matches!(
            (self, next),
            (Stopped, Starting)
                | (Starting, Running)
                | (Starting, Stopped)
                | (Running, Stopping)
                | (Running, Stopped)
                | (Stopping, Stopped)
        )
    }

    pub(crate) fn from_u8(raw: u8) -> SupervisorState {
        match raw {
            1 => SupervisorState::Starting,
            2 => SupervisorState::Running,
            3 => SupervisorState::Stopping,
            _ => SupervisorState::Stopped,
        }
    }
}

impl fmt::Display for SupervisorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SupervisorState::Stopped => write!(f, "stopped"),
            SupervisorState::Starting => write!(f, "starting"),
            SupervisorState::Running => write!(f, "running"),
            SupervisorState::Stopping => write!(f, "stopping"),
        }
    }
}
