//! Memory Manager for language server processes
//!
//! Samples the resident memory of a spawned server at a fixed interval and
//! reports limit breaches to the owning session. The monitor task is scoped
//! to one LSP call: dropping the monitor aborts the task.

use std::time::Duration;

use sysinfo::{Pid, ProcessRefreshKind, System};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::servers::MemoryAction;

/// Sampling interval for resident memory
pub const SAMPLE_INTERVAL: Duration = Duration::from_millis(500);

/// Background RSS monitor for one server process
pub struct MemoryMonitor {
    breach: watch::Receiver<Option<u64>>,
    handle: Option<JoinHandle<()>>,
    armed: bool,
}

impl MemoryMonitor {
    /// Start monitoring `pid`. With `MemoryAction::Ignore` no task is
    /// spawned and `breached()` never resolves.
    pub fn spawn(pid: u32, limit_mb: u64, action: MemoryAction, server_name: &str) -> Self {
        let (tx, rx) = watch::channel(None);

        if action == MemoryAction::Ignore {
            return Self {
                breach: rx,
                handle: None,
                armed: false,
            };
        }

        let name = server_name.to_string();
        let armed = action == MemoryAction::Kill;
        let handle = tokio::spawn(async move {
            let mut system = System::new();
            let sys_pid = Pid::from_u32(pid);
            let mut interval = tokio::time::interval(SAMPLE_INTERVAL);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                interval.tick().await;

                if !system
                    .refresh_process_specifics(sys_pid, ProcessRefreshKind::new().with_memory())
                {
                    // Process is gone; the session notices via its own channel
                    return;
                }

                let Some(process) = system.process(sys_pid) else {
                    return;
                };
                let used_mb = process.memory() / 1024 / 1024;

                if used_mb > limit_mb {
                    match action {
                        MemoryAction::Kill => {
                            let _ = tx.send(Some(used_mb));
                            return;
                        }
                        MemoryAction::Warn => {
                            tracing::warn!(
                                "{} using {}MB (limit {}MB)",
                                name,
                                used_mb,
                                limit_mb
                            );
                        }
                        MemoryAction::Ignore => {}
                    }
                }
            }
        });

        Self {
            breach: rx,
            handle: Some(handle),
            armed,
        }
    }

    /// True when a breach should cancel the session (Kill action)
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Resolves with the observed usage (MB) once the limit is breached
    /// under the Kill action. Pends forever otherwise.
    pub async fn breached(&mut self) -> u64 {
        loop {
            if let Some(used_mb) = *self.breach.borrow() {
                return used_mb;
            }
            if self.breach.changed().await.is_err() {
                // Sender gone without a breach; pend forever so select!
                // arms relying on this branch never spuriously fire.
                std::future::pending::<()>().await;
            }
        }
    }
}

impl Drop for MemoryMonitor {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
