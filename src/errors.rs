use std::io;
use thiserror::Error;

/// Everything that can go wrong between `accept` and the final `close`.
///
/// Only [`MalformedRequest`](ErrorKind::MalformedRequest) and
/// [`NotFound`](ErrorKind::NotFound) are ever shown to a client. The rest
/// abort the operation that raised them and are logged.
#[derive(Debug, Error, PartialEq)]
pub enum ErrorKind {
    /// Unparseable method, route, version or body boundary.
    #[error("malformed request: {0}")]
    MalformedRequest(&'static str),
    /// The static store has nothing at the requested path.
    #[error("resource not found")]
    NotFound,

    /// No live worker to hand a connection to. The connection is shed.
    #[error("no live worker available")]
    ServiceUnavailable,
    /// Socket-level send/receive/accept or descriptor-transfer failure.
    #[error("transport failure: {0}")]
    Transport(IoError),
    /// A worker process terminated.
    #[error("worker {pid} lost")]
    WorkerLost { pid: i32 },
}

macro_rules! http_errors {
    ($($name:ident: $status_code:literal, $len:literal => $body:literal; )*) => {
        /// Fixed response bytes for the client-visible error kinds.
        ///
        /// Returns `None` for errors that never reach a client.
        pub(crate) const fn as_http(&self) -> Option<&'static [u8]> {
            match self {
                $(Self::$name { .. } => Some(concat!(
                    "HTTP/1.0 ", $status_code, "\r\n",
                    "server: ", server_name!(), "\r\n",
                    "connection: close\r\n",
                    "content-type: text/html\r\n",
                    "content-length: ", $len, "\r\n",
                    "\r\n",
                    $body
                ).as_bytes()),)*
                _ => None,
            }
        }
    };
}

impl ErrorKind {
    http_errors! {
        MalformedRequest: "400 Bad Request", "21" => "<em>Bad request!</em>";
        NotFound: "404 Not Found", "0" => "";
    }
}

impl From<io::Error> for ErrorKind {
    fn from(err: io::Error) -> Self {
        ErrorKind::Transport(IoError(err))
    }
}
impl From<nix::Error> for ErrorKind {
    fn from(err: nix::Error) -> Self {
        ErrorKind::Transport(IoError(err.into()))
    }
}

#[derive(Debug)]
pub struct IoError(pub io::Error);

impl PartialEq for IoError {
    fn eq(&self, other: &Self) -> bool {
        self.0.kind() == other.0.kind()
    }
}

impl std::fmt::Display for IoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}
