//! The loop a forked worker runs until its channel closes.

use crate::{
    limits::ReqLimits,
    server::{
        channel::{ControlChannel, Message},
        connection::HttpConnection,
    },
    Handler,
};
use std::{net::TcpStream, process};
use tracing::{debug, error, info, warn};

/// Serves connections handed over `channel`, one at a time.
///
/// Returns the process exit code: `0` once the master closes the channel,
/// `1` on a channel transport failure. A failed request/response cycle only
/// costs that one connection.
pub(crate) fn run<H: Handler>(channel: ControlChannel, handler: &H, limits: &ReqLimits) -> i32 {
    let pid = process::id();
    let mut conn = HttpConnection::new(limits);
    debug!(pid, "worker ready");

    loop {
        match channel.recv() {
            Ok(Message::Connection(fd)) => {
                if let Err(err) = conn.serve(TcpStream::from(fd), handler) {
                    warn!(pid, error = %err, "connection failed");
                }
            }
            Ok(Message::NoDescriptor) => debug!(pid, "message without descriptor"),
            Ok(Message::Closed) => {
                info!(pid, "control channel closed");
                return 0;
            }
            Err(err) => {
                error!(pid, error = %err, "control channel failed");
                return 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{tools::str_op, Handled, Request, Response, StatusCode};
    use std::{
        io::{Read, Write},
        net::TcpListener,
        os::fd::OwnedFd,
        thread,
    };

    struct Hello;

    impl Handler for Hello {
        fn handle(&self, _: &Request<'_>, resp: &mut Response) -> Handled {
            resp.status(StatusCode::Ok).body("hello")
        }
    }

    #[test]
    fn serves_until_channel_closes() {
        let (master, worker_end) = ControlChannel::pair().unwrap();
        let worker = thread::spawn(move || run(worker_end, &Hello, &ReqLimits::default()));

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        for _ in 0..3 {
            let mut client = std::net::TcpStream::connect(addr).unwrap();
            let (accepted, _) = listener.accept().unwrap();
            accepted.set_nonblocking(true).unwrap();
            master.send(Some(OwnedFd::from(accepted))).unwrap();

            client.write_all(b"GET / HTTP/1.1\r\n\r\n").unwrap();
            let mut out = Vec::new();
            client.read_to_end(&mut out).unwrap();
            assert!(str_op(&out).ends_with("\r\n\r\nhello"));
        }

        master.send(None).unwrap();
        drop(master);
        assert_eq!(worker.join().unwrap(), 0);
    }
}
