// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Process units.
//!
//! Each unit is a child process speaking the [`crate::worker`] protocol on
//! its stdin/stdout. Children are supervised on a current-thread tokio
//! runtime and are killed if they miss a deadline.

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::runtime::Runtime;
use tokio::time::timeout_at;

use sysmark_core::{WorkloadError, WorkloadId};

use crate::clock::{Deadline, Timer};
use crate::runner::{unit_spawn_error, UnitsRun};
use crate::worker::{WorkerMessage, GO_LINE};

/// How to start one process unit.
///
/// The launcher's own arguments come first, followed by
/// `--workload <id> --size <n>`.
#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    program: PathBuf,
    args: Vec<OsString>,
}

impl ProcessLauncher {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Launcher re-entering the running executable's `worker` subcommand.
    pub fn current_exe() -> std::io::Result<Self> {
        Ok(Self::new(std::env::current_exe()?).arg("worker"))
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    fn command(&self, workload: &WorkloadId, size: u64) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg("--workload")
            .arg(workload.as_str())
            .arg("--size")
            .arg(size.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        cmd
    }
}

struct Unit {
    child: Child,
    stdin: Option<ChildStdin>,
    lines: Lines<BufReader<ChildStdout>>,
}

impl Unit {
    fn spawn(
        launcher: &ProcessLauncher,
        workload: &WorkloadId,
        size: u64,
    ) -> Result<Self, WorkloadError> {
        let mut child = launcher
            .command(workload, size)
            .spawn()
            .map_err(unit_spawn_error)?;

        let stdin = child.stdin.take();
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| WorkloadError::setup("child stdout not captured"))?;

        tracing::debug!(workload = %workload, pid = ?child.id(), "Spawned process unit");

        Ok(Self {
            child,
            stdin,
            lines: BufReader::new(stdout).lines(),
        })
    }

    /// Next protocol message, or `None` if the deadline passed first.
    async fn next_message(
        &mut self,
        deadline: &Deadline,
    ) -> Option<Result<WorkerMessage, WorkloadError>> {
        let at = tokio::time::Instant::from_std(deadline.at());
        match timeout_at(at, self.lines.next_line()).await {
            Err(_) => None,
            Ok(Ok(Some(line))) => Some(
                WorkerMessage::parse(&line).map_err(|e| WorkloadError::runtime(e.to_string())),
            ),
            Ok(Ok(None)) => Some(Err(WorkloadError::runtime("unit exited without reporting"))),
            Ok(Err(e)) => Some(Err(WorkloadError::from(e))),
        }
    }

    async fn release(&mut self) -> Result<(), WorkloadError> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| WorkloadError::setup("child stdin not captured"))?;
        stdin.write_all(GO_LINE.as_bytes()).await?;
        stdin.flush().await?;
        Ok(())
    }

    /// Close stdin and reap the child, killing it if it lingers past `deadline`.
    async fn finish(mut self, deadline: &Deadline) {
        drop(self.stdin.take());
        let at = tokio::time::Instant::from_std(deadline.at());
        if timeout_at(at, self.child.wait()).await.is_err() {
            let _ = self.child.start_kill();
            let _ = self.child.wait().await;
        }
    }
}

/// Runs trials on process units.
pub struct ProcessUnits {
    launcher: ProcessLauncher,
    runtime: Runtime,
}

impl ProcessUnits {
    pub fn new(launcher: ProcessLauncher) -> std::io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        Ok(Self { launcher, runtime })
    }

    pub(crate) fn run(
        &self,
        workload: &WorkloadId,
        size: u64,
        unit_count: usize,
        timeout: Duration,
        category_deadline: Option<Instant>,
    ) -> UnitsRun {
        self.runtime
            .block_on(self.drive(workload, size, unit_count, timeout, category_deadline))
    }

    async fn drive(
        &self,
        workload: &WorkloadId,
        size: u64,
        unit_count: usize,
        timeout: Duration,
        category_deadline: Option<Instant>,
    ) -> UnitsRun {
        let mut units = Vec::with_capacity(unit_count);
        for _ in 0..unit_count {
            match Unit::spawn(&self.launcher, workload, size) {
                Ok(unit) => units.push(unit),
                // Dropping `units` kills the children spawned so far.
                Err(err) => return UnitsRun::failed(Duration::ZERO, err),
            }
        }

        let warmup = Deadline::earliest(timeout, category_deadline);
        let mut first_error = None;
        for unit in &mut units {
            match unit.next_message(&warmup).await {
                None => return UnitsRun::missed(&warmup, timeout, Duration::ZERO),
                Some(Ok(WorkerMessage::Ready)) => {}
                Some(Ok(WorkerMessage::Failed(err))) | Some(Err(err)) => {
                    first_error.get_or_insert(err);
                }
                Some(Ok(WorkerMessage::Done(_))) => {
                    first_error.get_or_insert(WorkloadError::runtime("DONE before GO"));
                }
            }
        }
        if let Some(err) = first_error {
            return UnitsRun::failed(Duration::ZERO, err);
        }

        let measured = Deadline::earliest(timeout, category_deadline);
        let timer = Timer::start();
        let mut first_error = None;
        for unit in &mut units {
            if let Err(err) = unit.release().await {
                first_error.get_or_insert(err);
            }
        }

        let mut items: u64 = 0;
        for unit in &mut units {
            match unit.next_message(&measured).await {
                None => {
                    return match first_error {
                        Some(err) => UnitsRun::failed(timer.elapsed(), err),
                        None => UnitsRun::missed(&measured, timeout, timer.elapsed()),
                    }
                }
                Some(Ok(WorkerMessage::Done(n))) => items = items.saturating_add(n),
                Some(Ok(WorkerMessage::Failed(err))) | Some(Err(err)) => {
                    first_error.get_or_insert(err);
                }
                Some(Ok(WorkerMessage::Ready)) => {
                    first_error.get_or_insert(WorkloadError::runtime("second READY"));
                }
            }
        }
        let elapsed = timer.elapsed();

        let reap = Deadline::earliest(timeout, None);
        for unit in units {
            unit.finish(&reap).await;
        }

        match first_error {
            Some(err) => UnitsRun::failed(elapsed, err),
            None => UnitsRun::Finished {
                elapsed,
                items,
                error: None,
            },
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn script(body: &str) -> ProcessUnits {
        // `sh -c <body> sh --workload <id> --size <n>` puts the size in $4.
        let launcher = ProcessLauncher::new("sh").arg("-c").arg(body).arg("sh");
        ProcessUnits::new(launcher).unwrap()
    }

    fn id() -> WorkloadId {
        WorkloadId::new("test.process").unwrap()
    }

    #[test]
    fn test_protocol_round_trip() {
        let units = script(r#"echo READY; read go; echo "DONE $4""#);
        match units.run(&id(), 25, 3, Duration::from_secs(10), None) {
            UnitsRun::Finished { items, error, .. } => {
                assert!(error.is_none());
                assert_eq!(items, 75);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_worker_reported_error() {
        let units = script("echo READY; read go; echo ERROR ResourceExhaustion no more pids");
        match units.run(&id(), 1, 2, Duration::from_secs(10), None) {
            UnitsRun::Finished { items, error, .. } => {
                assert_eq!(items, 0);
                let err = error.unwrap();
                assert_eq!(err.kind(), sysmark_core::ErrorKind::ResourceExhaustion);
                assert_eq!(err.detail(), "no more pids");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_measured_timeout_kills_units() {
        let units = script("echo READY; read go; sleep 5; echo DONE 1");
        let started = Instant::now();
        match units.run(&id(), 1, 1, Duration::from_millis(200), None) {
            UnitsRun::Finished { error, .. } => {
                assert_eq!(
                    error.unwrap().kind(),
                    sysmark_core::ErrorKind::WorkloadTimeout
                );
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn test_category_deadline_during_warmup() {
        let units = script("sleep 5; echo READY");
        let deadline = Instant::now() + Duration::from_millis(100);
        let run = units.run(&id(), 1, 1, Duration::from_secs(30), Some(deadline));
        assert!(matches!(run, UnitsRun::CategoryExpired));
    }

    #[test]
    fn test_spawn_failure_is_setup_error() {
        let launcher = ProcessLauncher::new("/nonexistent/sysmark-worker");
        let units = ProcessUnits::new(launcher).unwrap();
        match units.run(&id(), 1, 2, Duration::from_secs(1), None) {
            UnitsRun::Finished { error, .. } => {
                assert_eq!(
                    error.unwrap().kind(),
                    sysmark_core::ErrorKind::WorkloadSetupError
                );
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
