//! Dashboard process registry
//!
//! Owns every long-running server-style process launched on behalf of a
//! user. Each process is keyed by its execution id; nothing else in the
//! server may signal these processes.
//!
//! Processes are launched detached (their own process group) so they keep
//! serving after the request that started them completes. A process whose
//! owner never calls [`DashboardRegistry::terminate`] is leaked until the
//! server exits; that is an accepted consequence of the detached design, and
//! a server restart orphans anything still tracked. [`sweep_exited`] exists
//! as a reconciliation hook for deployments that want periodic cleanup, but
//! it is never scheduled by default.
//!
//! [`sweep_exited`]: DashboardRegistry::sweep_exited

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use sha2::{Digest, Sha256};
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::domain::execution::ExecutionOutcome;

/// Lowest port handed out to dashboard processes
const PORT_RANGE_START: u16 = 8501;

/// Number of ports in the dashboard range
const PORT_RANGE_SIZE: u16 = 100;

/// One tracked dashboard process
#[derive(Debug)]
struct ManagedProcess {
    child: Child,
    pid: Option<u32>,
    port: u16,
    #[allow(dead_code)]
    started_at: DateTime<Utc>,
}

/// Registry of detached dashboard processes, keyed by execution id.
///
/// The map and its lock live together in this struct; handlers share it via
/// `Arc`. The lock is held only for bookkeeping, never across a process
/// launch, probe sleep, or grace period.
pub struct DashboardRegistry {
    processes: Mutex<HashMap<String, ManagedProcess>>,
    /// Per-id launch locks; entries are retained for the registry lifetime
    launch_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    probe_delay: Duration,
    grace_period: Duration,
}

/// Derive a listen port from an execution id.
///
/// A fixed-size hash reduced into the dashboard port range. Collisions are
/// possible and not resolved; the port is not probed for availability before
/// the launch binds it. Kept deliberately simple: a colliding launch fails
/// visibly through the liveness probe.
pub fn derive_port(execution_id: &str) -> u16 {
    let digest = Sha256::digest(execution_id.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    let hash = u64::from_be_bytes(bytes);
    PORT_RANGE_START + (hash % u64::from(PORT_RANGE_SIZE)) as u16
}

impl DashboardRegistry {
    /// Create a registry with the given probe and grace timings
    pub fn new(probe_delay: Duration, grace_period: Duration) -> Self {
        Self {
            processes: Mutex::new(HashMap::new()),
            launch_locks: Mutex::new(HashMap::new()),
            probe_delay,
            grace_period,
        }
    }

    /// Launch a dashboard process and track it under `execution_id`.
    ///
    /// If the id already maps to a live process, that process is terminated
    /// first; terminate completes, grace period included, before the new
    /// process is registered, so two processes never contend for one port.
    ///
    /// The entry is registered before liveness is confirmed; after a short
    /// probe delay the process is checked. A process that already exited has
    /// its captured output drained into the outcome and its entry removed.
    pub async fn start(
        &self,
        execution_id: &str,
        port: u16,
        program: &str,
        args: &[String],
    ) -> ExecutionOutcome {
        // Serialize terminate+spawn+register per id: two concurrent starts
        // for the same id must not both spawn, or the loser's process would
        // be overwritten in the map and leak while contending for the port.
        let launch_lock = {
            let mut locks = self.launch_locks.lock().await;
            locks.entry(execution_id.to_string()).or_default().clone()
        };

        {
            let _guard = launch_lock.lock().await;
            self.terminate(execution_id).await;

            let mut cmd = Command::new(program);
            cmd.args(args)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .process_group(0);

            let child = match cmd.spawn() {
                Ok(child) => child,
                Err(e) => {
                    warn!(execution_id, error = %e, "Failed to launch dashboard process");
                    let mut outcome = ExecutionOutcome::launch_failure(
                        execution_id.to_string(),
                        format!("Error running dashboard app: {e}"),
                    );
                    outcome.is_dashboard = true;
                    outcome.dashboard_error = Some(true);
                    return outcome;
                }
            };

            let pid = child.id();
            info!(execution_id, port, pid, "Launched dashboard process");

            let mut processes = self.processes.lock().await;
            processes.insert(
                execution_id.to_string(),
                ManagedProcess {
                    child,
                    pid,
                    port,
                    started_at: Utc::now(),
                },
            );
        }

        tokio::time::sleep(self.probe_delay).await;

        // Re-check liveness. The entry may be gone already if a concurrent
        // terminate raced us; treat that the same as an early exit.
        let exited = {
            let mut processes = self.processes.lock().await;
            let Some(entry) = processes.get_mut(execution_id) else {
                let mut outcome = ExecutionOutcome::launch_failure(
                    execution_id.to_string(),
                    "Dashboard process was terminated during startup".to_string(),
                );
                outcome.is_dashboard = true;
                outcome.dashboard_error = Some(true);
                return outcome;
            };

            let exit_code = match entry.child.try_wait() {
                Ok(None) => None,
                Ok(Some(status)) => Some(status.code().unwrap_or(-1)),
                Err(e) => {
                    warn!(execution_id, error = %e, "Liveness probe failed");
                    Some(-1)
                }
            };

            exit_code.and_then(|code| {
                processes
                    .remove(execution_id)
                    .map(|entry| (entry, code))
            })
        };

        match exited {
            None => {
                let url = format!("http://localhost:{port}");
                let mut outcome = ExecutionOutcome::new(execution_id.to_string());
                outcome.stdout = format!("Dashboard is running at {url}");
                outcome.is_dashboard = true;
                outcome.dashboard_url = Some(url);
                outcome.dashboard_port = Some(port);
                outcome
            }
            Some((mut entry, exit_code)) => {
                let (stdout, stderr) = drain_output(&mut entry.child).await;
                debug!(execution_id, exit_code, "Dashboard process exited during startup");
                let mut outcome = ExecutionOutcome::new(execution_id.to_string());
                outcome.stdout = stdout;
                outcome.stderr = stderr;
                outcome.exit_code = exit_code;
                outcome.is_dashboard = true;
                outcome.dashboard_error = Some(true);
                outcome
            }
        }
    }

    /// Terminate the process tracked under `execution_id`.
    ///
    /// Returns `false` when the id is unknown, so terminating an
    /// already-gone process is a no-op rather than an error. Signals go to
    /// the whole process group: the launched command may have spawned its
    /// own workers, and none of them may be orphaned. SIGTERM first, then
    /// SIGKILL after the grace period.
    pub async fn terminate(&self, execution_id: &str) -> bool {
        let entry = {
            let mut processes = self.processes.lock().await;
            processes.remove(execution_id)
        };

        let Some(mut entry) = entry else {
            return false;
        };

        match entry.child.try_wait() {
            Ok(Some(status)) => {
                debug!(execution_id, ?status, "Process already exited");
                return true;
            }
            Ok(None) => {}
            Err(e) => {
                // Treat a failed wait as already-terminated; the race is
                // expected and never surfaced to the caller.
                debug!(execution_id, error = %e, "Wait failed during terminate");
                return true;
            }
        }

        if let Some(pid) = entry.pid {
            signal_group(pid, Signal::SIGTERM);
        }

        match tokio::time::timeout(self.grace_period, entry.child.wait()).await {
            Ok(_) => {
                info!(execution_id, "Dashboard process terminated");
            }
            Err(_) => {
                warn!(execution_id, "Process ignored SIGTERM, escalating to SIGKILL");
                if let Some(pid) = entry.pid {
                    signal_group(pid, Signal::SIGKILL);
                }
                let _ = entry.child.wait().await;
            }
        }

        true
    }

    /// Remove entries whose processes have exited on their own.
    ///
    /// Reconciliation hook for deployments that want periodic cleanup of
    /// dead entries. Not called anywhere by default; tracked processes are
    /// otherwise only reaped through [`terminate`](Self::terminate).
    pub async fn sweep_exited(&self) -> Vec<String> {
        let mut processes = self.processes.lock().await;
        let mut exited = Vec::new();
        for (id, entry) in processes.iter_mut() {
            if !matches!(entry.child.try_wait(), Ok(None)) {
                exited.push(id.clone());
            }
        }

        for id in &exited {
            debug!(execution_id = %id, "Sweeping exited dashboard process");
            processes.remove(id);
        }

        exited
    }

    /// Whether an entry exists for the given execution id
    pub async fn contains(&self, execution_id: &str) -> bool {
        self.processes.lock().await.contains_key(execution_id)
    }

    /// Number of tracked processes
    pub async fn count(&self) -> usize {
        self.processes.lock().await.len()
    }

    /// Listen port of a tracked process, if any
    pub async fn port_of(&self, execution_id: &str) -> Option<u16> {
        self.processes
            .lock()
            .await
            .get(execution_id)
            .map(|entry| entry.port)
    }
}

/// Send a signal to an entire process group, swallowing lookup races
pub(crate) fn signal_group(pid: u32, signal: Signal) {
    if let Err(e) = killpg(Pid::from_raw(pid as i32), signal) {
        // The group may have exited between our liveness check and the
        // signal; that is not an error.
        debug!(pid, ?signal, error = %e, "Process group signal failed");
    }
}

/// Read whatever the process wrote to its pipes before exiting
async fn drain_output(child: &mut Child) -> (String, String) {
    let mut stdout_buf = Vec::new();
    let mut stderr_buf = Vec::new();

    if let Some(mut stdout) = child.stdout.take() {
        let _ = stdout.read_to_end(&mut stdout_buf).await;
    }
    if let Some(mut stderr) = child.stderr.take() {
        let _ = stderr.read_to_end(&mut stderr_buf).await;
    }

    (
        String::from_utf8_lossy(&stdout_buf).into_owned(),
        String::from_utf8_lossy(&stderr_buf).into_owned(),
    )
}
