//! Server configuration limits
//!
//! # Memory Consumption
//!
//! Each worker process owns exactly one receive buffer of
//! [`ReqLimits::buffer_size`] bytes and one growable response buffer. The
//! master owns one epoll event array of [`ServerLimits::max_events`] entries.
//!
//! # No timeouts
//!
//! There is no read, write or idle timeout anywhere. A client that connects
//! and never sends occupies its worker until it disconnects; with `N` workers,
//! `N` such clients stall the server. Put a proxy with timeouts in front if
//! that matters.
//!
//! # Examples
//!
//! ```no_run
//! use prefork_web::{limits::{ReqLimits, ServerLimits}, Server, Site};
//!
//! let server = Server::builder()
//!     .listener(std::net::TcpListener::bind("127.0.0.1:11777").unwrap())
//!     .handler(Site::directory("/srv/www"))
//!     .server_limits(ServerLimits {
//!         worker_count: 8,
//!         ..ServerLimits::default()
//!     })
//!     .request_limits(ReqLimits { buffer_size: 8192 })
//!     .build();
//!
//! server.launch().unwrap();
//! ```

/// Controls the process pool of the master.
///
/// # Pool lifecycle
/// ```text
///              [-------]
///              [ start ]
///              [-------]
///                  ||
///                  \/
/// [-------------------------------]   fork   [--------]
/// [ live workers < worker_count ? ] =======> [ worker ]
/// [-------------------------------]          [--------]
///        /\                                      ||
///        ||             exit / crash             ||
///        \=======================================/
/// ```
///
/// Missing workers are replaced before the master waits for events again,
/// so the pool heals within one loop iteration.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerLimits {
    /// Target number of live worker processes.
    ///
    /// Default: number of logical CPUs.
    pub worker_count: usize,

    /// Maximum readiness events handled per `epoll_wait` call.
    ///
    /// Default: `32`
    pub max_events: usize,
}

impl Default for ServerLimits {
    fn default() -> Self {
        Self {
            worker_count: num_cpus::get(),
            max_events: 32,
        }
    }
}

/// Limits on incoming requests.
///
/// # Memory Allocation Strategy
///
/// The buffer is allocated once per worker when the worker starts and reused
/// for every connection it serves.
#[derive(Debug, Clone, PartialEq)]
pub struct ReqLimits {
    /// Size of the receive buffer, and the largest request accepted.
    ///
    /// The request line plus all headers must arrive in one read of at most
    /// this many bytes. Requests are not reassembled across reads.
    ///
    /// Default: `4096`
    pub buffer_size: usize,
}

impl Default for ReqLimits {
    fn default() -> Self {
        Self { buffer_size: 4096 }
    }
}
