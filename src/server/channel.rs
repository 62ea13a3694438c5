//! Master-to-worker control channel.
//!
//! Each worker owns one end of a connected Unix stream pair; the master keeps
//! the other. A dispatch is a single byte carrying exactly one descriptor as
//! `SCM_RIGHTS` ancillary data. The byte's value means nothing. A message
//! without a descriptor omits the ancillary section. End of stream means the
//! peer is gone.

use crate::errors::ErrorKind;
use nix::{
    cmsg_space,
    sys::socket::{recvmsg, sendmsg, ControlMessage, ControlMessageOwned, MsgFlags},
};
use std::{
    io::{self, IoSlice, IoSliceMut},
    os::{
        fd::{AsRawFd, FromRawFd, OwnedFd, RawFd},
        unix::net::UnixStream,
    },
};

const DISPATCH: u8 = b'1';

/// What a single receive produced.
#[derive(Debug)]
pub(crate) enum Message {
    /// A descriptor arrived with the payload byte.
    Connection(OwnedFd),
    /// The payload byte arrived alone, or with unusable ancillary data.
    NoDescriptor,
    /// The other end closed the channel.
    Closed,
}

#[derive(Debug)]
pub(crate) struct ControlChannel {
    stream: UnixStream,
}

impl ControlChannel {
    /// Creates a connected pair: `(master end, worker end)`.
    pub(crate) fn pair() -> io::Result<(ControlChannel, ControlChannel)> {
        let (master, worker) = UnixStream::pair()?;
        Ok((Self { stream: master }, Self { stream: worker }))
    }

    #[inline]
    pub(crate) fn set_nonblocking(&self, nonblocking: bool) -> io::Result<()> {
        self.stream.set_nonblocking(nonblocking)
    }

    /// Sends one dispatch message, attaching `fd` when there is one.
    ///
    /// The caller's copy of `fd` is closed when this returns, whether or not
    /// the transfer succeeded. Never blocks: a full channel is a
    /// [`Transport`](ErrorKind::Transport) error.
    pub(crate) fn send(&self, fd: Option<OwnedFd>) -> Result<(), ErrorKind> {
        let payload = [DISPATCH];
        let iov = [IoSlice::new(&payload)];
        let flags = MsgFlags::MSG_DONTWAIT | MsgFlags::MSG_NOSIGNAL;

        match &fd {
            Some(fd) => {
                let fds = [fd.as_raw_fd()];
                let cmsgs = [ControlMessage::ScmRights(&fds)];
                sendmsg::<()>(self.as_raw_fd(), &iov, &cmsgs, flags, None)?;
            }
            None => {
                sendmsg::<()>(self.as_raw_fd(), &iov, &[], flags, None)?;
            }
        }

        Ok(())
    }

    /// Blocks until one message arrives.
    ///
    /// Payload and descriptor are taken in one receive call. Received
    /// descriptors are close-on-exec; any beyond the first are closed.
    pub(crate) fn recv(&self) -> Result<Message, ErrorKind> {
        let mut payload = [0u8; 1];
        let mut iov = [IoSliceMut::new(&mut payload)];
        let mut space = cmsg_space!([RawFd; 1]);

        let msg = recvmsg::<()>(
            self.as_raw_fd(),
            &mut iov,
            Some(&mut space),
            MsgFlags::MSG_CMSG_CLOEXEC,
        )?;
        if msg.bytes == 0 {
            return Ok(Message::Closed);
        }

        let mut received = None;
        for cmsg in msg.cmsgs()? {
            if let ControlMessageOwned::ScmRights(fds) = cmsg {
                for raw in fds {
                    // SAFETY: the kernel just installed `raw` in this process
                    // and nothing else refers to it yet.
                    let owned = unsafe { OwnedFd::from_raw_fd(raw) };
                    if received.is_none() {
                        received = Some(owned);
                    }
                }
            }
        }

        Ok(match received {
            Some(fd) => Message::Connection(fd),
            None => Message::NoDescriptor,
        })
    }
}

impl AsRawFd for ControlChannel {
    #[inline]
    fn as_raw_fd(&self) -> RawFd {
        self.stream.as_raw_fd()
    }
}
