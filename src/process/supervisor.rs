//! Simulator pool supervision.
//!
//! A [`Supervisor`] owns the set of tracked simulator processes for one run.
//! Launching and interrupt handling are sequenced on the same task: the
//! launch loop polls the cancellation token between spawns, and the drain
//! loop races child exits against it with `tokio::select!`. Nothing else
//! touches the tracked set.
//!
//! ## Run lifecycle
//!
//! - **Launching**: one process per existing config file, in ascending index
//!   order. Missing files are skipped with a warning.
//! - **Running**: all launches attempted.
//! - **Draining**: wait for natural exits. On interrupt every tracked process
//!   gets a termination request and is reaped, then the run reports
//!   [`RunOutcome::Interrupted`].
//! - **Terminated**: the tracked set is empty.

use futures::future::select_all;
use log::{debug, error, info, warn};
use tokio_util::sync::CancellationToken;

use super::command::SimulatorCommand;
use super::types::{
    DeviceRange, ExitRecord, ProcessHandle, RunOutcome, RunReport, SupervisorError,
    SupervisorState,
};
use crate::identity::{check_index, check_region, DeviceLayout};

/// Launches and tracks the simulators of one region
pub struct Supervisor {
    layout: DeviceLayout,
    region: u32,
    command: SimulatorCommand,
    state: SupervisorState,
    tracked: Vec<ProcessHandle>,
}

impl Supervisor {
    pub fn new(layout: DeviceLayout, region: u32, command: SimulatorCommand) -> Self {
        Self {
            layout,
            region,
            command,
            state: SupervisorState::Idle,
            tracked: Vec::new(),
        }
    }

    pub fn state(&self) -> SupervisorState {
        self.state
    }

    /// Number of processes currently tracked
    pub fn tracked_count(&self) -> usize {
        self.tracked.len()
    }

    fn transition(&mut self, next: SupervisorState) {
        debug!("Supervisor state {} -> {}", self.state, next);
        self.state = next;
    }

    /// Supervise every device in `range` until all exit or `cancel` fires.
    ///
    /// # Errors
    /// `Unaddressable` if the region or the end of the range cannot appear in
    /// a generated file name. Nothing is launched in that case.
    pub async fn run(
        &mut self,
        range: DeviceRange,
        cancel: &CancellationToken,
    ) -> Result<RunReport, SupervisorError> {
        check_region(self.region)?;
        check_index(&self.layout, range.end())?;

        let mut report = RunReport::new();
        info!(
            "Supervising region {} devices {}..={} ({} total)",
            self.region,
            range.start(),
            range.end(),
            range.count()
        );

        self.transition(SupervisorState::Launching);
        for index in range.indices() {
            if cancel.is_cancelled() {
                info!(
                    "Interrupted while launching; stopping {} started simulators",
                    self.tracked.len()
                );
                return Ok(self.terminate_all(report).await);
            }
            self.launch(index, &mut report);
        }
        self.transition(SupervisorState::Running);
        info!(
            "Launched {} simulators, skipped {}",
            report.launched.len(),
            report.skipped.len()
        );

        self.transition(SupervisorState::Draining);
        while !self.tracked.is_empty() {
            let next = {
                let waits = self
                    .tracked
                    .iter_mut()
                    .map(|handle| Box::pin(handle.child.wait()));
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => None,
                    (result, position, _) = select_all(waits) => Some((position, result)),
                }
            };

            let Some((position, result)) = next else {
                info!("Interrupt received; terminating {} simulators", self.tracked.len());
                return Ok(self.terminate_all(report).await);
            };

            let handle = self.tracked.remove(position);
            match result {
                Ok(status) if status.success() => {
                    info!("Device {} (pid {:?}) exited cleanly", handle.index, handle.pid);
                    report.exits.push(ExitRecord {
                        index: handle.index,
                        pid: handle.pid,
                        status,
                    });
                }
                Ok(status) => {
                    warn!("Device {} (pid {:?}) exited with {}", handle.index, handle.pid, status);
                    report.exits.push(ExitRecord {
                        index: handle.index,
                        pid: handle.pid,
                        status,
                    });
                }
                Err(source) => {
                    let err = SupervisorError::Wait {
                        index: handle.index,
                        source,
                    };
                    error!("{}", err);
                    report.errors.push(err);
                }
            }
        }

        self.transition(SupervisorState::Terminated);
        report.outcome = RunOutcome::Completed;
        Ok(report)
    }

    fn launch(&mut self, index: u32, report: &mut RunReport) {
        let config_path = self.layout.config_path(self.region, index);
        if !config_path.is_file() {
            let err = SupervisorError::MissingFile {
                index,
                path: config_path,
            };
            warn!("{}", err);
            report.skipped.push(index);
            report.errors.push(err);
            return;
        }

        match self.command.command_for(&config_path).spawn() {
            Ok(child) => {
                let pid = child.id();
                info!(
                    "Started device {} (pid {:?}): {}",
                    index,
                    pid,
                    self.command.argv(&config_path).join(" ")
                );
                self.tracked.push(ProcessHandle {
                    index,
                    config_path,
                    pid,
                    child,
                });
                report.launched.push(index);
            }
            Err(source) => {
                let err = SupervisorError::Spawn { index, source };
                error!("{}", err);
                report.errors.push(err);
            }
        }
    }

    /// Send a termination request to every tracked process, then reap them
    async fn terminate_all(&mut self, mut report: RunReport) -> RunReport {
        self.transition(SupervisorState::Draining);
        let mut handles = std::mem::take(&mut self.tracked);

        for handle in handles.iter_mut() {
            match handle.child.start_kill() {
                Ok(()) => info!("Terminating device {} (pid {:?})", handle.index, handle.pid),
                Err(e) => warn!(
                    "Failed to terminate device {} (pid {:?}): {}",
                    handle.index, handle.pid, e
                ),
            }
            report.terminated.push(handle.index);
        }

        // Reap so nothing outlives the supervisor as a zombie or orphan
        for handle in handles.iter_mut() {
            if let Err(e) = handle.child.wait().await {
                warn!("Failed to reap device {} (pid {:?}): {}", handle.index, handle.pid, e);
            }
        }

        self.transition(SupervisorState::Terminated);
        report.outcome = RunOutcome::Interrupted;
        report
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::config::DeviceConfig;
    use crate::identity::AllocationError;
    use crate::process::types::INTERRUPTED_EXIT_CODE;
    use std::path::Path;
    use std::time::Duration;
    use tempfile::TempDir;

    fn write_device(layout: &DeviceLayout, region: u32, index: u32) {
        std::fs::create_dir_all(layout.folder()).unwrap();
        let config = DeviceConfig::with_uuid(format!("dev-{}", index));
        let body = config.to_json_pretty().unwrap();
        std::fs::write(layout.config_path(region, index), body).unwrap();
    }

    /// `sh -c <script> sim <config_path>`; the config path becomes `$1`
    fn shell(script: &str) -> SimulatorCommand {
        SimulatorCommand::new("sh").with_args(["-c", script, "sim"])
    }

    #[tokio::test]
    async fn test_missing_file_is_skipped() {
        let dir = TempDir::new().unwrap();
        let layout = DeviceLayout::new(dir.path());
        write_device(&layout, 1, 1);
        write_device(&layout, 1, 2);

        let mut supervisor = Supervisor::new(layout, 1, shell("test -f \"$1\""));
        let report = supervisor
            .run(DeviceRange::new(1, 3).unwrap(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.outcome, RunOutcome::Completed);
        assert_eq!(report.launched, vec![1, 2]);
        assert_eq!(report.skipped, vec![3]);
        assert_eq!(report.exits.len(), 2);
        assert!(report.all_clean());
        assert_eq!(report.exit_code(), 0);
        assert_eq!(supervisor.state(), SupervisorState::Terminated);
        assert_eq!(supervisor.tracked_count(), 0);
    }

    #[tokio::test]
    async fn test_failing_child_makes_run_unclean() {
        let dir = TempDir::new().unwrap();
        let layout = DeviceLayout::new(dir.path());
        write_device(&layout, 2, 1);
        write_device(&layout, 2, 2);

        let script = shell("case \"$1\" in *002.json) exit 3;; esac");
        let mut supervisor = Supervisor::new(layout, 2, script);
        let report = supervisor
            .run(DeviceRange::new(1, 2).unwrap(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.outcome, RunOutcome::Completed);
        assert!(!report.all_clean());
        assert_eq!(report.exit_code(), 1);
        let failed: Vec<u32> = report
            .exits
            .iter()
            .filter(|e| !e.status.success())
            .map(|e| e.index)
            .collect();
        assert_eq!(failed, vec![2]);
    }

    #[tokio::test]
    async fn test_spawn_failure_is_reported() {
        let dir = TempDir::new().unwrap();
        let layout = DeviceLayout::new(dir.path());
        write_device(&layout, 1, 1);

        let command = SimulatorCommand::new("/nonexistent/fleetsim-simulator");
        let mut supervisor = Supervisor::new(layout, 1, command);
        let report = supervisor
            .run(DeviceRange::single(1).unwrap(), &CancellationToken::new())
            .await
            .unwrap();

        assert!(report.launched.is_empty());
        assert!(matches!(report.errors[0], SupervisorError::Spawn { index: 1, .. }));
        assert_eq!(report.exit_code(), 1);
    }

    #[tokio::test]
    async fn test_interrupt_terminates_all_running() {
        let dir = TempDir::new().unwrap();
        let layout = DeviceLayout::new(dir.path());
        for index in 1..=3 {
            write_device(&layout, 1, index);
        }

        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            trigger.cancel();
        });

        let mut supervisor = Supervisor::new(layout, 1, shell("exec sleep 30"));
        let started = std::time::Instant::now();
        let report = supervisor.run(DeviceRange::new(1, 3).unwrap(), &token).await.unwrap();

        assert!(started.elapsed() < Duration::from_secs(20));
        assert_eq!(report.outcome, RunOutcome::Interrupted);
        assert_eq!(report.launched, vec![1, 2, 3]);
        assert_eq!(report.terminated, vec![1, 2, 3]);
        assert_eq!(report.exit_code(), INTERRUPTED_EXIT_CODE);
        assert_eq!(supervisor.tracked_count(), 0);
        assert_eq!(supervisor.state(), SupervisorState::Terminated);
    }

    #[tokio::test]
    async fn test_interrupt_before_launch() {
        let dir = TempDir::new().unwrap();
        let layout = DeviceLayout::new(dir.path());
        write_device(&layout, 1, 1);

        let token = CancellationToken::new();
        token.cancel();

        let mut supervisor = Supervisor::new(layout, 1, shell("exec sleep 30"));
        let report = supervisor.run(DeviceRange::single(1).unwrap(), &token).await.unwrap();

        assert_eq!(report.outcome, RunOutcome::Interrupted);
        assert!(report.launched.is_empty());
        assert!(report.terminated.is_empty());
        assert_eq!(report.exit_code(), 130);
    }

    #[tokio::test]
    async fn test_all_missing_completes_clean() {
        let dir = TempDir::new().unwrap();
        let layout = DeviceLayout::new(dir.path().join("empty"));
        let mut supervisor = Supervisor::new(layout, 1, shell("true"));
        let report = supervisor
            .run(DeviceRange::new(1, 2).unwrap(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.skipped, vec![1, 2]);
        assert_eq!(report.exit_code(), 0);
        assert!(!Path::new(&dir.path().join("empty")).exists());
    }

    #[tokio::test]
    async fn test_region_beyond_two_digits_rejected() {
        let dir = TempDir::new().unwrap();
        let layout = DeviceLayout::new(dir.path());
        let mut supervisor = Supervisor::new(layout, 100, shell("true"));
        let err = supervisor
            .run(DeviceRange::new(998, 999).unwrap(), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            SupervisorError::Unaddressable(AllocationError::InvalidArgument { name: "region", .. })
        ));
        assert_eq!(supervisor.state(), SupervisorState::Idle);
    }

    #[tokio::test]
    async fn test_range_beyond_device_id_width_rejected() {
        let dir = TempDir::new().unwrap();
        let layout = DeviceLayout::new(dir.path());
        write_device(&layout, 1, 999);

        let mut supervisor = Supervisor::new(layout.clone(), 1, shell("true"));
        for end in [1000, 4_000_000_000] {
            let err = supervisor
                .run(DeviceRange::new(998, end).unwrap(), &CancellationToken::new())
                .await
                .unwrap_err();
            assert!(matches!(
                err,
                SupervisorError::Unaddressable(AllocationError::InvalidArgument {
                    name: "index",
                    ..
                })
            ));
        }
        assert_eq!(supervisor.tracked_count(), 0);

        // The widest index that fits is still supervised
        let mut supervisor = Supervisor::new(layout, 1, shell("true"));
        let report = supervisor
            .run(DeviceRange::new(998, 999).unwrap(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(report.launched, vec![999]);
        assert_eq!(report.skipped, vec![998]);
    }

    #[test]
    fn test_device_range_validation() {
        assert!(DeviceRange::new(0, 3).is_err());
        assert!(DeviceRange::new(4, 3).is_err());
        let range = DeviceRange::new(2, 5).unwrap();
        assert_eq!(range.indices().collect::<Vec<_>>(), vec![2, 3, 4, 5]);
        assert_eq!(range.count(), 4);
        assert_eq!(DeviceRange::single(7).unwrap().indices().collect::<Vec<_>>(), vec![7]);
    }
}
