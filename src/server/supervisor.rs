//! Worker lifecycle: fork, reap, top up.

use crate::{
    errors::ErrorKind,
    limits::ReqLimits,
    server::{channel::ControlChannel, pool::WorkerPool, worker},
    Handler, Lifecycle,
};
use nix::{
    errno::Errno,
    sys::{
        signal::{SigSet, Signal},
        wait::WaitStatus,
    },
    unistd::{close, fork, ForkResult, Pid},
};
use std::{os::fd::RawFd, process};
use tracing::{info, warn};

/// Signals the master consumes through its signalfd instead of default
/// delivery.
pub(crate) fn master_signals() -> SigSet {
    let mut mask = SigSet::empty();
    mask.add(Signal::SIGCHLD);
    mask.add(Signal::SIGINT);
    mask.add(Signal::SIGTERM);
    mask
}

/// Forks one worker.
///
/// `inherited` lists every descriptor the master owns that the child must
/// not keep: sibling channel ends, the listener, the epoll and signal
/// descriptors. The child closes them, restores default signal delivery,
/// serves its channel and exits without returning here.
pub(crate) fn spawn<H: Handler>(
    inherited: &[RawFd],
    handler: &H,
    limits: &ReqLimits,
) -> Result<(Pid, ControlChannel), ErrorKind> {
    let (master, worker_end) = ControlChannel::pair()?;

    // SAFETY: the master is single-threaded, so the child starts with a
    // consistent copy of every lock and allocator state.
    match unsafe { fork() }? {
        ForkResult::Parent { child } => {
            drop(worker_end);
            master.set_nonblocking(true)?;
            Ok((child, master))
        }
        ForkResult::Child => {
            drop(master);
            for &fd in inherited {
                let _ = close(fd);
            }
            let _ = master_signals().thread_unblock();

            let code = worker::run(worker_end, handler, limits);
            process::exit(code)
        }
    }
}

/// Spawns workers until the pool holds `target` of them.
///
/// Stops at the first failed spawn; the next call tries again. Returns the
/// number of workers added.
pub(crate) fn replenish<L, F>(
    pool: &mut WorkerPool,
    target: usize,
    lifecycle: &L,
    mut spawn: F,
) -> usize
where
    L: Lifecycle + ?Sized,
    F: FnMut(&[RawFd]) -> Result<(Pid, ControlChannel), ErrorKind>,
{
    let mut added = 0;

    while pool.len() < target {
        match spawn(&pool.raw_fds()) {
            Ok((pid, channel)) => {
                info!(pid = pid.as_raw(), live = pool.len() + 1, "worker spawned");
                pool.insert(pid, channel);
                lifecycle.worker_spawned(pid.as_raw());
                added += 1;
            }
            Err(err) => {
                warn!(error = %err, live = pool.len(), "worker spawn failed");
                break;
            }
        }
    }

    added
}

/// Collects terminated children and drops them from the pool.
///
/// `wait` is asked repeatedly until it reports nothing left to collect:
/// `StillAlive` from a non-blocking wait, or `ECHILD`. Returns the number of
/// pool members lost.
pub(crate) fn reap<L, W>(pool: &mut WorkerPool, lifecycle: &L, mut wait: W) -> usize
where
    L: Lifecycle + ?Sized,
    W: FnMut() -> nix::Result<WaitStatus>,
{
    let mut lost = 0;

    loop {
        let status = match wait() {
            Ok(WaitStatus::StillAlive) | Err(Errno::ECHILD) => break,
            Err(Errno::EINTR) => continue,
            Err(err) => {
                warn!(error = %err, "waitpid failed");
                break;
            }
            Ok(status) => status,
        };

        let pid = match status {
            WaitStatus::Exited(pid, _) | WaitStatus::Signaled(pid, ..) => pid,
            _ => continue,
        };

        if pool.remove(pid) {
            let err = ErrorKind::WorkerLost { pid: pid.as_raw() };
            warn!(pid = pid.as_raw(), ?status, live = pool.len(), "{err}");
            lifecycle.worker_lost(&err);
            lost += 1;
        }
    }

    lost
}
