//! # Child Process Control
//!
//! Thin layer over `fork`/`waitpid`/`kill`.
//!
//! ## Fork Safety
//!
//! The caller is multi-threaded (at least the Receiver worker is running), so
//! the child inherits a copy of every lock in whatever state another thread
//! left it. The child therefore only touches state no parent thread uses:
//! its own channel endpoints and the values moved into the child closure.
//! A log record emitted by another thread at the instant of the fork can
//! still leave the subscriber's writer locked in the child.
//!
//! The child never returns into the caller's stack: it leaves through
//! `_exit`, so no destructor inherited from the parent (the Receiver's in
//! particular) runs in the child.
//!
//! ## Inherited Descriptors
//!
//! Before `entry` runs, the child closes every descriptor except stdio and
//! the ones the caller names. Channels of other invocations running in the
//! same parent are therefore unreachable from the child.

use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::os::fd::RawFd;
use std::panic::{self, AssertUnwindSafe};

use nix::sys::signal::{kill, Signal};
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::{fork, ForkResult, Pid};

/// Exit code of a child whose entry point panicked.
pub const PANIC_EXIT_CODE: i32 = 101;

/// Highest descriptor swept when `/proc/self/fd` cannot be listed.
const FALLBACK_FD_LIMIT: RawFd = 4096;

/// A forked child that has not been reaped yet.
#[derive(Debug)]
pub struct ChildProcess {
    pid: Pid,
}

/// Fork and run `entry` in the child with only stdio and `keep_fds` open.
/// Its return value is the child's exit code; a panic exits with
/// [`PANIC_EXIT_CODE`].
#[allow(unsafe_code)]
pub fn spawn<F>(keep_fds: &[RawFd], entry: F) -> nix::Result<ChildProcess>
where
    F: FnOnce() -> i32,
{
    // SAFETY: the child only closes descriptors, runs `entry` and then
    // `_exit`s. `entry` is written against the constraints in the module docs.
    match unsafe { fork() }? {
        ForkResult::Parent { child } => {
            tracing::debug!(pid = child.as_raw(), "child process spawned");
            Ok(ChildProcess { pid: child })
        }
        ForkResult::Child => {
            close_inherited_fds(keep_fds);
            let code = panic::catch_unwind(AssertUnwindSafe(entry)).unwrap_or(PANIC_EXIT_CODE);
            let _ = std::io::stdout().flush();
            let _ = std::io::stderr().flush();
            // SAFETY: `_exit` takes no pointers and does not return.
            unsafe { libc::_exit(code) }
        }
    }
}

/// Close every descriptor above stderr that is not in `keep`.
#[allow(unsafe_code)]
fn close_inherited_fds(keep: &[RawFd]) {
    let keep: HashSet<RawFd> = keep.iter().copied().collect();
    for fd in open_fds() {
        if fd > 2 && !keep.contains(&fd) {
            // SAFETY: nothing the child goes on to use refers to `fd`; the
            // values moved into `entry` only own descriptors in `keep`.
            unsafe {
                libc::close(fd);
            }
        }
    }
}

/// Descriptors open in this process. The directory handle used for the
/// listing is included and already closed by the time this returns.
fn open_fds() -> Vec<RawFd> {
    match fs::read_dir("/proc/self/fd") {
        Ok(entries) => entries
            .filter_map(|entry| entry.ok()?.file_name().to_str()?.parse().ok())
            .collect(),
        Err(_) => (0..FALLBACK_FD_LIMIT).collect(),
    }
}

impl ChildProcess {
    pub fn pid(&self) -> i32 {
        self.pid.as_raw()
    }

    /// Exit code if the child has ended, reaping it. A death by signal is
    /// reported as the negated signal number.
    pub fn try_wait(&self) -> nix::Result<Option<i32>> {
        match waitpid(self.pid, Some(WaitPidFlag::WNOHANG))? {
            WaitStatus::Exited(_, code) => Ok(Some(code)),
            WaitStatus::Signaled(_, signal, _) => Ok(Some(-(signal as i32))),
            _ => Ok(None),
        }
    }

    /// SIGKILL the child and reap it.
    pub fn kill_and_reap(&self) -> nix::Result<()> {
        match kill(self.pid, Signal::SIGKILL) {
            Ok(()) | Err(nix::Error::ESRCH) => {}
            Err(e) => return Err(e),
        }
        loop {
            match waitpid(self.pid, None) {
                Ok(WaitStatus::Exited(..) | WaitStatus::Signaled(..)) => return Ok(()),
                Ok(_) => continue,
                Err(nix::Error::ECHILD) => return Ok(()),
                Err(nix::Error::EINTR) => continue,
                Err(e) => return Err(e),
            }
        }
    }
}
