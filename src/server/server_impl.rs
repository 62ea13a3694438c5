use crate::{
    errors::ErrorKind,
    http::{
        request::Request,
        response::{Handled, Response},
    },
    limits::{ReqLimits, ServerLimits},
    server::{pool::WorkerPool, supervisor},
};
use nix::{
    errno::Errno,
    sys::{
        epoll::{Epoll, EpollCreateFlags, EpollEvent, EpollFlags, EpollTimeout},
        signal::Signal,
        signalfd::{SfdFlags, SignalFd},
        wait::{waitpid, WaitPidFlag},
    },
    unistd::Pid,
};
use socket2::{Domain, Protocol, Socket, Type};
use std::{
    io,
    net::{SocketAddr, TcpListener},
    os::fd::{AsRawFd, OwnedFd, RawFd},
};
use tracing::{debug, info, warn};

const LISTENER: u64 = 0;
const SIGNALS: u64 = 1;

/// A trait for handling HTTP requests and generating responses.
///
/// A handler runs inside a worker process, once per connection, and must
/// finish the [`Response`] it is given. Whatever state it holds is copied
/// into each worker at fork time and never shared back.
///
/// # Examples
///
/// ```
/// use prefork_web::{Handled, Handler, Request, Response, StatusCode};
///
/// struct Echo;
///
/// impl Handler for Echo {
///     fn handle(&self, req: &Request<'_>, resp: &mut Response) -> Handled {
///         if req.path() == b"/echo" {
///             resp.status(StatusCode::Ok).body(req.query().unwrap_or(b""))
///         } else {
///             resp.status(StatusCode::NotFound).body("Not found :(")
///         }
///     }
/// }
/// ```
pub trait Handler {
    /// Processes one framed request.
    ///
    /// Implementations report client errors through the response; a panic
    /// kills the worker, which the master then replaces.
    fn handle(&self, request: &Request<'_>, response: &mut Response) -> Handled;
}

/// Hooks into the master's supervision events.
///
/// Every method has an empty default and runs in the master process,
/// synchronously inside the event loop. `()` is the no-op implementation.
///
/// # Examples
///
/// ```
/// use prefork_web::{ErrorKind, Lifecycle};
/// use std::cell::Cell;
///
/// #[derive(Default)]
/// struct Restarts(Cell<usize>);
///
/// impl Lifecycle for Restarts {
///     fn worker_lost(&self, _: &ErrorKind) {
///         self.0.set(self.0.get() + 1);
///     }
/// }
/// ```
pub trait Lifecycle {
    /// A worker was forked and added to the pool.
    fn worker_spawned(&self, _pid: i32) {}

    /// A pool member terminated; `err` is
    /// [`WorkerLost`](ErrorKind::WorkerLost).
    fn worker_lost(&self, _err: &ErrorKind) {}

    /// `SIGINT` or `SIGTERM` arrived; the pool is about to be drained.
    fn shutdown_requested(&self) {}
}

impl Lifecycle for () {}

/// A preforking HTTP server.
///
/// The calling process becomes the master: it keeps a pool of forked
/// workers, accepts every connection itself and passes each one to the
/// next worker in round-robin order.
///
/// # Examples
///
/// ```no_run
/// use prefork_web::{Server, Site};
///
/// let listener = Server::bind("127.0.0.1:11777".parse().unwrap()).unwrap();
///
/// Server::builder()
///     .listener(listener)
///     .handler(Site::directory("/srv/www"))
///     .build()
///     .launch()
///     .unwrap();
/// ```
pub struct Server<H: Handler, L: Lifecycle = ()> {
    listener: TcpListener,
    handler: H,
    lifecycle: L,

    server_limits: ServerLimits,
    request_limits: ReqLimits,
}

impl Server<NoHandler> {
    /// Creates a new builder for configuring the server instance.
    #[inline]
    pub fn builder<H: Handler>() -> ServerBuilder<H, ()> {
        ServerBuilder {
            listener: None,
            handler: None,
            lifecycle: (),

            server_limits: None,
            request_limits: None,
        }
    }

    /// Opens a listening socket the way the server expects it: address
    /// reuse on, backlog 1024, non-blocking.
    pub fn bind(addr: SocketAddr) -> Result<TcpListener, ErrorKind> {
        let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;

        socket.set_reuse_address(true)?;
        socket.bind(&addr.into())?;
        socket.listen(1024)?;
        socket.set_nonblocking(true)?;

        let listener = TcpListener::from(socket);
        info!(addr = %listener.local_addr()?, "listening");
        Ok(listener)
    }
}

impl<H: Handler, L: Lifecycle> Server<H, L> {
    /// Runs the master event loop.
    ///
    /// Each iteration reaps dead workers, tops the pool back up, then waits
    /// for the listener or a signal. Returns `Ok(())` after `SIGINT` or
    /// `SIGTERM` once every worker has exited. Errors only come from setting
    /// up or waiting on the event loop itself.
    pub fn launch(self) -> Result<(), ErrorKind> {
        let Server {
            listener,
            handler,
            lifecycle,
            server_limits,
            request_limits,
        } = self;
        listener.set_nonblocking(true)?;

        let mask = supervisor::master_signals();
        mask.thread_block()?;
        let mut signals = SignalFd::with_flags(&mask, SfdFlags::SFD_NONBLOCK | SfdFlags::SFD_CLOEXEC)?;

        let epoll = Epoll::new(EpollCreateFlags::EPOLL_CLOEXEC)?;
        epoll.add(&listener, EpollEvent::new(EpollFlags::EPOLLIN, LISTENER))?;
        epoll.add(&signals, EpollEvent::new(EpollFlags::EPOLLIN, SIGNALS))?;

        let owned = [listener.as_raw_fd(), epoll.0.as_raw_fd(), signals.as_raw_fd()];
        let mut events = vec![EpollEvent::empty(); server_limits.max_events.max(1)];
        let mut pool = WorkerPool::new();

        loop {
            supervisor::reap(&mut pool, &lifecycle, || {
                waitpid(None, Some(WaitPidFlag::WNOHANG))
            });
            supervisor::replenish(&mut pool, server_limits.worker_count, &lifecycle, |channels| {
                let inherited: Vec<RawFd> = owned.iter().chain(channels).copied().collect();
                supervisor::spawn(&inherited, &handler, &request_limits)
            });

            let ready = match epoll.wait(&mut events, EpollTimeout::NONE) {
                Ok(ready) => ready,
                Err(Errno::EINTR) => continue,
                Err(err) => return Err(err.into()),
            };

            for event in &events[..ready] {
                match event.data() {
                    LISTENER => accept_one(&listener, &mut pool),
                    SIGNALS => {
                        if !shutdown_signalled(&mut signals)? {
                            continue;
                        }
                        info!(live = pool.len(), "shutdown requested");
                        debug!(pids = ?pool.pids().map(Pid::as_raw).collect::<Vec<_>>(), "closing worker channels");
                        lifecycle.shutdown_requested();

                        pool.clear();
                        supervisor::reap(&mut pool, &lifecycle, || waitpid(None, None));
                        let _ = mask.thread_unblock();

                        info!("all workers exited");
                        return Ok(());
                    }
                    _ => {}
                }
            }
        }
    }
}

// Takes one pending connection off the listener and hands it to a worker.
fn accept_one(listener: &TcpListener, pool: &mut WorkerPool) {
    let (stream, peer) = match listener.accept() {
        Ok(accepted) => accepted,
        Err(err) if err.kind() == io::ErrorKind::WouldBlock => return,
        Err(err) => {
            warn!(error = %err, "accept failed");
            return;
        }
    };
    if let Err(err) = stream.set_nonblocking(true) {
        warn!(%peer, error = %err, "accepted socket setup failed");
    }

    match pool.dispatch(OwnedFd::from(stream)) {
        Ok(pid) => debug!(%peer, worker = pid.as_raw(), "dispatched"),
        Err(err @ ErrorKind::ServiceUnavailable) => warn!(%peer, "connection shed: {err}"),
        Err(err) => warn!(%peer, error = %err, "transfer failed, connection dropped"),
    }
}

// Drains the signalfd. `true` once a shutdown signal was among them;
// `SIGCHLD` needs nothing here since every iteration reaps.
fn shutdown_signalled(signals: &mut SignalFd) -> Result<bool, ErrorKind> {
    let mut shutdown = false;

    while let Some(info) = signals.read_signal()? {
        match Signal::try_from(info.ssi_signo as i32) {
            Ok(Signal::SIGINT | Signal::SIGTERM) => shutdown = true,
            Ok(Signal::SIGCHLD) => debug!("child state changed"),
            Ok(other) => debug!(signal = %other, "ignored signal"),
            Err(err) => warn!(error = %err, "unknown signal number"),
        }
    }

    Ok(shutdown)
}

//

/// Builder for configuring and creating [`Server`] instances.
pub struct ServerBuilder<H: Handler, L: Lifecycle = ()> {
    listener: Option<TcpListener>,
    handler: Option<H>,
    lifecycle: L,

    server_limits: Option<ServerLimits>,
    request_limits: Option<ReqLimits>,
}

impl<H: Handler, L: Lifecycle> ServerBuilder<H, L> {
    /// Sets the TCP listener that the server will accept connections on.
    ///
    /// **This is a required component.** See [`Server::bind`].
    #[inline(always)]
    pub fn listener(mut self, listener: TcpListener) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Sets the handler every worker runs.
    ///
    /// **This is a required component.**
    #[inline(always)]
    pub fn handler(mut self, handler: H) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Installs supervision hooks, see [`Lifecycle`].
    #[inline(always)]
    pub fn lifecycle<NewL: Lifecycle>(self, lifecycle: NewL) -> ServerBuilder<H, NewL> {
        ServerBuilder {
            listener: self.listener,
            handler: self.handler,
            lifecycle,

            server_limits: self.server_limits,
            request_limits: self.request_limits,
        }
    }

    #[inline(always)]
    pub fn server_limits(mut self, limits: ServerLimits) -> Self {
        self.server_limits = Some(limits);
        self
    }

    #[inline(always)]
    pub fn request_limits(mut self, limits: ReqLimits) -> Self {
        self.request_limits = Some(limits);
        self
    }

    /// Builds the server. Nothing is forked until [`Server::launch`].
    ///
    /// # Panics
    /// If [`listener`](Self::listener) or [`handler`](Self::handler) was
    /// never called.
    #[inline]
    #[track_caller]
    pub fn build(self) -> Server<H, L> {
        Server {
            listener: self
                .listener
                .expect("The `listener` method must be called to create"),
            handler: self
                .handler
                .expect("The `handler` method must be called to create"),
            lifecycle: self.lifecycle,

            server_limits: self.server_limits.unwrap_or_default(),
            request_limits: self.request_limits.unwrap_or_default(),
        }
    }
}

/// Placeholder handler type that only anchors [`Server::builder`] and
/// [`Server::bind`].
#[doc(hidden)]
pub struct NoHandler;

impl Handler for NoHandler {
    fn handle(&self, _: &Request<'_>, resp: &mut Response) -> Handled {
        resp.error(&ErrorKind::NotFound)
    }
}
