//! prefork_web - preforking HTTP server with descriptor hand-off
//!
//! One master process accepts every connection on a non-blocking listener
//! and passes the live socket to one of a fixed pool of forked worker
//! processes over a private Unix socket pair (`SCM_RIGHTS`). Workers frame
//! the request with a byte-level scanner, answer it, and close.
//!
//! # Architecture
//!
//! ```text
//!                 [--------------------------------------]
//!   accept  ===>  [ master: epoll(listener, signalfd)    ]
//!                 [  reap -> replenish -> wait -> accept ]
//!                 [--------------------------------------]
//!                     ||  round-robin, one fd per message
//!          /==========++==========\
//!          \/         \/          \/
//!     [ worker ]  [ worker ]  [ worker ]   one connection at a time,
//!                                           one request per connection
//! ```
//!
//! - **Isolation** - a crashing handler takes down one worker; the master
//!   reaps it and forks a replacement before it next waits for events
//! - **No keep-alive** - one read, one response, close; status lines are
//!   always `HTTP/1.0`
//! - **Single read** - request line and headers must fit in
//!   [`ReqLimits::buffer_size`](limits::ReqLimits::buffer_size) bytes
//! - **No timeouts** - see [`limits`]
//!
//! # Examples
//!
//! The built-in [`Site`] handler serves a directory and `POST /calc`:
//! ```no_run
//! use prefork_web::{Server, Site};
//!
//! let listener = Server::bind("127.0.0.1:11777".parse().unwrap()).unwrap();
//!
//! Server::builder()
//!     .listener(listener)
//!     .handler(Site::directory("/srv/www"))
//!     .build()
//!     .launch()
//!     .unwrap();
//! ```
//! Own handler:
//! ```no_run
//! use prefork_web::{Handled, Handler, Request, Response, Server, StatusCode};
//!
//! struct Hello;
//!
//! impl Handler for Hello {
//!     fn handle(&self, req: &Request<'_>, resp: &mut Response) -> Handled {
//!         resp.status(StatusCode::Ok)
//!             .header("content-type", "text/plain")
//!             .body(req.path())
//!     }
//! }
//!
//! Server::builder()
//!     .listener(Server::bind("127.0.0.1:8080".parse().unwrap()).unwrap())
//!     .handler(Hello)
//!     .build()
//!     .launch()
//!     .unwrap();
//! ```
//!
//! # Platform
//!
//! Linux only: `epoll`, `signalfd` and `fork` are used directly.

macro_rules! server_name {
    () => {
        "MultiProcessWebServer v0.1"
    };
}

/// Value of the `server` header on every response.
pub(crate) const SERVER_NAME: &str = server_name!();

pub(crate) mod http {
    pub mod framer;
    pub(crate) mod request;
    pub(crate) mod response;
    pub(crate) mod types;
}
pub(crate) mod server {
    pub(crate) mod channel;
    pub(crate) mod connection;
    pub(crate) mod pool;
    pub(crate) mod server_impl;
    pub(crate) mod supervisor;
    pub(crate) mod worker;
}
pub(crate) mod errors;
pub mod limits;
pub mod site;

pub use crate::{
    errors::{ErrorKind, IoError},
    http::{
        framer,
        request::Request,
        response::{
            write::{BodyWriter, WriteBuffer},
            Handled, Response,
        },
        types::{ContentType, Method, StatusCode, Version},
    },
    server::server_impl::{Handler, Lifecycle, Server, ServerBuilder},
    site::{
        assets::{AssetStore, Directory},
        Site,
    },
};

#[doc(hidden)]
pub fn run_test<F: FnOnce(&Request<'_>, &mut Response) -> Handled>(f: F) {
    if let Ok(request) = Request::parse(b"GET / HTTP/1.0\r\n\r\n") {
        f(&request, &mut Response::new());
    }
}

#[cfg(test)]
pub mod tools {
    use std::str::from_utf8;

    #[inline]
    pub fn str_op(value: &[u8]) -> &str {
        from_utf8(value).unwrap()
    }
}
