//! Process lifecycle management for packer child processes
//!
//! A packing run can have one packer process per worker in flight. If the
//! user hits Ctrl+C those processes must not keep writing half-finished
//! archives after we are gone.
//!
//! - Packers are spawned in their own process group with a parent-death signal
//! - Running packer PIDs are tracked in a global registry
//! - On the first SIGINT/SIGTERM/SIGHUP the run is cancelled and every tracked
//!   process group gets SIGTERM, then SIGKILL after a grace period
//! - A second signal exits immediately

use nix::libc;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use std::collections::HashSet;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::{Duration, Instant};

use crate::cancel::CancelToken;

static CHILD_REGISTRY: OnceLock<Arc<Mutex<ChildRegistry>>> = OnceLock::new();

/// Last handled signal number, 0 if none
static RECEIVED_SIGNAL: AtomicI32 = AtomicI32::new(0);

/// Registry of running packer processes
#[derive(Debug, Default)]
pub struct ChildRegistry {
    pids: HashSet<u32>,
    /// Set once termination started; late registrations are killed on sight
    cleanup_initiated: bool,
}

impl ChildRegistry {
    /// Get or create the global child registry
    pub fn global() -> Arc<Mutex<ChildRegistry>> {
        CHILD_REGISTRY
            .get_or_init(|| Arc::new(Mutex::new(ChildRegistry::default())))
            .clone()
    }

    pub fn register(&mut self, pid: u32) {
        if self.cleanup_initiated {
            tracing::warn!(pid, "Packer started after shutdown began, terminating it");
            let _ = send_signal_to_group(pid, Signal::SIGTERM);
        }
        self.pids.insert(pid);
        tracing::debug!(pid, "Registered packer process");
    }

    pub fn unregister(&mut self, pid: u32) {
        self.pids.remove(&pid);
        tracing::debug!(pid, "Unregistered packer process");
    }

    /// Number of packer processes currently running
    pub fn count(&self) -> usize {
        self.pids.len()
    }

    /// Terminate all tracked packer process groups.
    ///
    /// Sends SIGTERM first, waits up to `grace_period`, then SIGKILL.
    pub fn terminate_all(&mut self, grace_period: Duration) {
        if self.cleanup_initiated {
            tracing::debug!("Cleanup already initiated, skipping");
            return;
        }
        self.cleanup_initiated = true;

        let running = self.count();
        if running == 0 {
            tracing::debug!("No packer processes to terminate");
            return;
        }

        tracing::info!("Terminating {} packer process(es)...", running);

        let pids: Vec<u32> = self.pids.iter().copied().collect();
        for &pid in &pids {
            if let Err(e) = send_signal_to_group(pid, Signal::SIGTERM) {
                tracing::warn!(pid, "Failed to send SIGTERM to process group: {}", e);
                if let Err(e) = send_signal(pid, Signal::SIGTERM) {
                    tracing::warn!(pid, "Failed to send SIGTERM: {}", e);
                }
            }
        }

        let start = Instant::now();
        while start.elapsed() < grace_period {
            if !pids.iter().any(|&pid| is_process_alive(pid)) {
                tracing::info!("All packer processes terminated gracefully");
                self.pids.clear();
                return;
            }
            std::thread::sleep(Duration::from_millis(100));
        }

        for &pid in &pids {
            if is_process_alive(pid) {
                tracing::warn!(pid, "Packer did not terminate, sending SIGKILL");
                if send_signal_to_group(pid, Signal::SIGKILL).is_err() {
                    let _ = send_signal(pid, Signal::SIGKILL);
                }
            }
        }

        self.pids.clear();
        tracing::info!("Packer process cleanup complete");
    }
}

fn send_signal(pid: u32, signal: Signal) -> Result<(), nix::Error> {
    signal::kill(Pid::from_raw(pid as i32), signal)
}

/// Negative PID addresses the whole group, so anything the packer spawned dies too
fn send_signal_to_group(pgid: u32, signal: Signal) -> Result<(), nix::Error> {
    signal::kill(Pid::from_raw(-(pgid as i32)), signal)
}

/// Alive means exists and is neither zombie nor dead
fn is_process_alive(pid: u32) -> bool {
    if signal::kill(Pid::from_raw(pid as i32), None).is_err() {
        return false;
    }

    if let Ok(stat) = std::fs::read_to_string(format!("/proc/{}/stat", pid)) {
        let fields: Vec<&str> = stat.split_whitespace().collect();
        if fields.len() > 2 {
            return !matches!(fields[2], "Z" | "X");
        }
    }

    true
}

/// Signal number that interrupted the run, if any
pub fn received_signal() -> Option<i32> {
    match RECEIVED_SIGNAL.load(Ordering::SeqCst) {
        0 => None,
        sig => Some(sig),
    }
}

/// Install SIGINT/SIGTERM/SIGHUP handling for a packing run.
///
/// The first signal raises `cancel` and terminates running packers so the
/// dispatcher can unwind and report. A second signal exits with 128 + signal.
pub fn init_signal_handlers(cancel: CancelToken) -> Result<(), std::io::Error> {
    use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM, SIGHUP])?;

    std::thread::Builder::new()
        .name("signal-handler".to_string())
        .spawn(move || {
            for sig in signals.forever() {
                let signal_name = match sig {
                    SIGINT => "SIGINT",
                    SIGTERM => "SIGTERM",
                    SIGHUP => "SIGHUP",
                    _ => "UNKNOWN",
                };

                if RECEIVED_SIGNAL.swap(sig, Ordering::SeqCst) != 0 {
                    tracing::warn!("Received second {}, exiting immediately", signal_name);
                    std::process::exit(128 + sig);
                }

                tracing::info!("Received {}, cancelling packing run...", signal_name);
                cancel.cancel();

                if let Ok(mut registry) = ChildRegistry::global().lock() {
                    registry.terminate_all(Duration::from_secs(3));
                }
            }
        })?;

    Ok(())
}

/// Extension trait for std::process::Command to set up process groups
pub trait CommandProcessGroup {
    /// Run the command as leader of its own process group, dying with its parent
    fn in_new_process_group(&mut self) -> &mut Self;
}

impl CommandProcessGroup for std::process::Command {
    fn in_new_process_group(&mut self) -> &mut Self {
        use std::os::unix::process::CommandExt;
        // SAFETY: the closure only calls async-signal-safe setpgid and prctl
        unsafe {
            self.pre_exec(|| {
                nix::unistd::setpgid(Pid::from_raw(0), Pid::from_raw(0))
                    .map_err(std::io::Error::other)?;

                if libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGTERM) == -1 {
                    return Err(std::io::Error::last_os_error());
                }

                Ok(())
            });
        }
        self
    }
}
