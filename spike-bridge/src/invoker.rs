//! Runs the external simulator once and classifies how it ended.

use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::config::SimulatorConfig;
use crate::error::{BridgeError, BridgeResult};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

pub struct SimulationInvoker {
    executable: PathBuf,
    work_dir: PathBuf,
    timeout: Option<Duration>,
}

impl SimulationInvoker {
    pub fn new(executable: impl Into<PathBuf>, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            work_dir: work_dir.into(),
            timeout: None,
        }
    }

    pub fn from_config(config: &SimulatorConfig, work_dir: &Path) -> Self {
        Self::new(&config.executable, work_dir).with_timeout(config.timeout())
    }

    /// Kill the simulator if it runs longer than `timeout`. `None` waits forever.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Launch the simulator with no arguments and block until it exits.
    ///
    /// Exactly one attempt is made. A non-zero exit or a signal is a
    /// [`BridgeError::SimulationFailed`]; callers must not read the result
    /// artifact after any error from this method.
    pub fn run(&self) -> BridgeResult<()> {
        info!(executable = %self.executable.display(), work_dir = %self.work_dir.display(), "launching simulator");
        let started = Instant::now();

        let mut child = Command::new(&self.executable)
            .current_dir(&self.work_dir)
            .stdin(Stdio::null())
            .spawn()
            .map_err(|source| BridgeError::Launch {
                executable: self.executable.clone(),
                source,
            })?;

        let status = match self.timeout {
            None => child.wait(),
            Some(limit) => self.wait_with_timeout(&mut child, limit)?,
        }
        .map_err(|source| BridgeError::Launch {
            executable: self.executable.clone(),
            source,
        })?;

        self.classify(status)?;
        info!(elapsed = ?started.elapsed(), "simulator finished");
        Ok(())
    }

    fn wait_with_timeout(&self, child: &mut Child, limit: Duration) -> BridgeResult<std::io::Result<ExitStatus>> {
        let deadline = Instant::now() + limit;
        loop {
            match child.try_wait() {
                Ok(Some(status)) => return Ok(Ok(status)),
                Ok(None) if Instant::now() >= deadline => {
                    warn!(timeout = ?limit, "simulator timed out, killing it");
                    // reap even if kill fails because the process just exited
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(BridgeError::SimulationTimeout {
                        executable: self.executable.clone(),
                        timeout: limit,
                    });
                }
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(e) => return Ok(Err(e)),
            }
        }
    }

    fn classify(&self, status: ExitStatus) -> BridgeResult<()> {
        if status.success() {
            return Ok(());
        }
        warn!(?status, "simulator exited unsuccessfully");
        Err(BridgeError::SimulationFailed {
            executable: self.executable.clone(),
            code: status.code(),
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn missing_executable_is_launch_failure() {
        let invoker = SimulationInvoker::new("/definitely/not/a/simulator", ".");
        match invoker.run() {
            Err(BridgeError::Launch { executable, .. }) => {
                assert_eq!(executable, PathBuf::from("/definitely/not/a/simulator"))
            }
            other => panic!("expected launch failure, got {:?}", other),
        }
    }

    #[test]
    fn zero_exit_is_success() {
        SimulationInvoker::new("true", ".").run().unwrap();
    }

    #[test]
    fn non_zero_exit_is_simulation_failure() {
        match SimulationInvoker::new("false", ".").run() {
            Err(BridgeError::SimulationFailed { code, .. }) => assert_eq!(code, Some(1)),
            other => panic!("expected simulation failure, got {:?}", other),
        }
    }

    #[test]
    fn missing_work_dir_is_launch_failure() {
        let invoker = SimulationInvoker::new("true", "/definitely/not/a/dir");
        assert!(matches!(invoker.run(), Err(BridgeError::Launch { .. })));
    }

    #[test]
    fn timeout_from_config() {
        let config = SimulatorConfig { executable: "sim".into(), timeout_secs: 5 };
        let invoker = SimulationInvoker::from_config(&config, Path::new("work"));
        assert_eq!(invoker.timeout, Some(Duration::from_secs(5)));
        assert_eq!(invoker.executable(), Path::new("sim"));
    }
}
