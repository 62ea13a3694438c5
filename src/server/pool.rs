use crate::{errors::ErrorKind, server::channel::ControlChannel};
use nix::unistd::Pid;
use std::os::fd::{AsRawFd, OwnedFd, RawFd};

#[derive(Debug)]
pub(crate) struct Worker {
    pub(crate) pid: Pid,
    pub(crate) channel: ControlChannel,
}

/// Live workers in spawn order, plus the round-robin cursor.
///
/// Workers are only added after a successful spawn and only removed when
/// reaped, so every entry names a process that has not been waited for.
#[derive(Debug, Default)]
pub(crate) struct WorkerPool {
    workers: Vec<Worker>,
    cursor: usize,
}

impl WorkerPool {
    #[inline]
    pub(crate) fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.workers.len()
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    #[inline]
    pub(crate) fn insert(&mut self, pid: Pid, channel: ControlChannel) {
        self.workers.push(Worker { pid, channel });
    }

    /// Forgets `pid`, closing its channel. Returns whether it was present.
    pub(crate) fn remove(&mut self, pid: Pid) -> bool {
        match self.workers.iter().position(|w| w.pid == pid) {
            Some(idx) => {
                self.workers.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Master-side channel descriptors; a new child must close all of them.
    pub(crate) fn raw_fds(&self) -> Vec<RawFd> {
        self.workers.iter().map(|w| w.channel.as_raw_fd()).collect()
    }

    pub(crate) fn pids(&self) -> impl Iterator<Item = Pid> + '_ {
        self.workers.iter().map(|w| w.pid)
    }

    /// Drops every channel, which tells every worker to exit.
    pub(crate) fn clear(&mut self) {
        self.workers.clear();
        self.cursor = 0;
    }

    /// Hands `conn` to the next worker in round-robin order.
    ///
    /// The cursor advances even when the transfer fails. With no live worker
    /// the connection is closed and [`ServiceUnavailable`] is returned.
    /// Either way the master's copy of `conn` is closed on return.
    ///
    /// [`ServiceUnavailable`]: ErrorKind::ServiceUnavailable
    pub(crate) fn dispatch(&mut self, conn: OwnedFd) -> Result<Pid, ErrorKind> {
        if self.is_empty() {
            return Err(ErrorKind::ServiceUnavailable);
        }

        let worker = &self.workers[self.cursor % self.workers.len()];
        self.cursor = self.cursor.wrapping_add(1);

        worker.channel.send(Some(conn))?;
        Ok(worker.pid)
    }
}
