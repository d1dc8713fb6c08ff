//! Process supervision type definitions.

use std::fmt;
use std::path::PathBuf;
use std::process::ExitStatus;

use tokio::process::Child;

use crate::identity::AllocationError;

/// Exit status reported when a run is interrupted
pub const INTERRUPTED_EXIT_CODE: u8 = 130;

/// Lifecycle of one supervised run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    /// Nothing launched yet
    Idle,
    /// Spawning one simulator per existing config file
    Launching,
    /// Every launch has been attempted
    Running,
    /// Waiting for exits, or terminating after an interrupt
    Draining,
    /// No tracked process is left
    Terminated,
}

impl SupervisorState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SupervisorState::Idle => "idle",
            SupervisorState::Launching => "launching",
            SupervisorState::Running => "running",
            SupervisorState::Draining => "draining",
            SupervisorState::Terminated => "terminated",
        }
    }
}

impl fmt::Display for SupervisorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inclusive range of device indices to supervise
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceRange {
    start: u32,
    end: u32,
}

impl DeviceRange {
    /// `start..=end`; both bounds must be at least 1 and `start <= end`
    pub fn new(start: u32, end: u32) -> Result<Self, SupervisorError> {
        if start == 0 || start > end {
            return Err(SupervisorError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// A single device
    pub fn single(index: u32) -> Result<Self, SupervisorError> {
        Self::new(index, index)
    }

    pub fn start(&self) -> u32 {
        self.start
    }

    pub fn end(&self) -> u32 {
        self.end
    }

    /// Number of indices in the range
    pub fn count(&self) -> u32 {
        self.end - self.start + 1
    }

    /// Ascending device indices
    pub fn indices(&self) -> impl Iterator<Item = u32> {
        self.start..=self.end
    }
}

/// A launched simulator owned by the supervisor
#[derive(Debug)]
pub struct ProcessHandle {
    pub index: u32,
    pub config_path: PathBuf,
    pub pid: Option<u32>,
    pub child: Child,
}

/// How a tracked process left the tracked set on its own
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitRecord {
    pub index: u32,
    pub pid: Option<u32>,
    pub status: ExitStatus,
}

/// How a supervised run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every tracked process exited on its own
    Completed,
    /// An interrupt arrived; every tracked process was terminated
    Interrupted,
}

/// Summary of one supervised run
#[derive(Debug)]
pub struct RunReport {
    pub outcome: RunOutcome,
    /// Indices that got a simulator process, in launch order
    pub launched: Vec<u32>,
    /// Indices skipped because their config file is missing
    pub skipped: Vec<u32>,
    /// Natural exits, in the order they were observed
    pub exits: Vec<ExitRecord>,
    /// Indices terminated after an interrupt
    pub terminated: Vec<u32>,
    /// Per-device problems (missing files, spawn or wait failures)
    pub errors: Vec<SupervisorError>,
}

impl RunReport {
    pub(crate) fn new() -> Self {
        Self {
            outcome: RunOutcome::Completed,
            launched: Vec::new(),
            skipped: Vec::new(),
            exits: Vec::new(),
            terminated: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// True when no launch or wait failed and every exit was successful.
    /// Missing config files do not count against a clean run.
    pub fn all_clean(&self) -> bool {
        self.outcome == RunOutcome::Completed
            && self.exits.iter().all(|exit| exit.status.success())
            && self
                .errors
                .iter()
                .all(|e| matches!(e, SupervisorError::MissingFile { .. }))
    }

    /// Process exit status for the supervisor itself
    pub fn exit_code(&self) -> u8 {
        match self.outcome {
            RunOutcome::Interrupted => INTERRUPTED_EXIT_CODE,
            RunOutcome::Completed if self.all_clean() => 0,
            RunOutcome::Completed => 1,
        }
    }
}

/// Errors raised during supervision
#[derive(Debug, thiserror::Error)]
pub enum SupervisorError {
    #[error("Config file for device {index} not found at {path:?}, skipping")]
    MissingFile { index: u32, path: PathBuf },

    #[error("Failed to launch simulator for device {index}: {source}")]
    Spawn {
        index: u32,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to wait for simulator of device {index}: {source}")]
    Wait {
        index: u32,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "Invalid device range {start}..={end}: indices start at 1 and start must not exceed end"
    )]
    InvalidRange { start: u32, end: u32 },

    #[error("Devices cannot be addressed: {0}")]
    Unaddressable(#[from] AllocationError),
}
