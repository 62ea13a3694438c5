use crate::{
    errors::ErrorKind,
    http::framer::{
        extract_body_offset, extract_file_path, extract_method, extract_route, extract_version,
    },
    limits::ReqLimits,
    Method, Version,
};
use memchr::memchr;
use std::{
    io::{self, Read},
    ops::Range,
};

/// A framed HTTP request.
///
/// This is a view of offsets into the receive buffer, never a copy. It
/// lives for exactly one request/response cycle.
///
/// # Input data requirements
///
/// #### General designations
/// - `SP`: ASCII space (0x20)
/// - `CRLF`: `"\r\n"`
///
/// ## First line
/// | Template                                   | Example                     |
/// |--------------------------------------------|-----------------------------|
/// | `[METHOD] SP [ROUTE] SP [VERSION] CRLF`    | `GET /index.html HTTP/1.1\r\n` |
///
/// Where:
/// - `[METHOD]`: `GET` or `POST`, anything else is rejected
/// - `[ROUTE]`: path, optionally followed by `?` and a query that is ignored
/// - `[VERSION]`: `HTTP/1.0`, `HTTP/1.1` or `HTTP/2`, anything else is
///   [`Version::Unknown`] (accepted, not rejected)
///
/// ## Body
///
/// The body starts right after the first empty line (`\n\r\n`). Headers are
/// not interpreted at all, including `Content-Length`; the body is whatever
/// the single read delivered after the boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct Request<'a> {
    buffer: &'a [u8],

    method: Method,
    route: Range<usize>,
    query: Option<usize>,
    version: Version,
    body: Option<usize>,
}

impl<'a> Request<'a> {
    /// Frames the request held in `buffer`.
    ///
    /// Fails with [`MalformedRequest`](ErrorKind::MalformedRequest) when the
    /// method is not `GET`/`POST` or the route is not terminated.
    pub fn parse(buffer: &'a [u8]) -> Result<Self, ErrorKind> {
        let method = extract_method(buffer);
        let method_end = method
            .boundary()
            .ok_or(ErrorKind::MalformedRequest("unknown method"))?;

        let route = extract_route(buffer, method_end)?;
        let version = extract_version(buffer, route.end);
        let query = memchr(b'?', &buffer[route.clone()]).map(|pos| route.start + pos);
        let body = extract_body_offset(buffer);

        Ok(Request {
            buffer,
            method,
            route,
            query,
            version,
            body,
        })
    }
}

// Public API
impl<'a> Request<'a> {
    #[inline(always)]
    pub const fn method(&self) -> Method {
        self.method
    }

    #[inline(always)]
    pub const fn version(&self) -> Version {
        self.version
    }

    /// The full route, query included.
    #[inline(always)]
    pub fn route(&self) -> &'a [u8] {
        &self.buffer[self.route.clone()]
    }

    /// The route without its query string.
    #[inline(always)]
    pub fn path(&self) -> &'a [u8] {
        extract_file_path(self.buffer, &self.route)
    }

    /// Bytes after the first `?` of the route, if there is one.
    #[inline(always)]
    pub fn query(&self) -> Option<&'a [u8]> {
        self.query
            .map(|pos| &self.buffer[pos + 1..self.route.end])
    }

    /// Offset of the body inside the receive buffer.
    #[inline(always)]
    pub const fn body_offset(&self) -> Option<usize> {
        self.body
    }

    /// Everything after the header block, `None` if the block never ended.
    #[inline(always)]
    pub fn body(&self) -> Option<&'a [u8]> {
        self.body.map(|start| &self.buffer[start..])
    }
}

//

/// Owned receive buffer of a worker.
///
/// One per worker, reused across cycles; a worker serves one connection at a
/// time so nothing else ever touches it.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Parser {
    len: usize,
    buffer: Box<[u8]>,
}

impl Parser {
    #[inline]
    pub(crate) fn new(limits: &ReqLimits) -> Self {
        let buffer = vec![0; limits.buffer_size].into_boxed_slice();

        Parser { len: 0, buffer }
    }

    #[inline]
    pub(crate) fn reset(&mut self) {
        self.len = 0;
        self.buffer.fill(0);
    }

    /// Performs the single read of a cycle.
    #[inline]
    pub(crate) fn fill_buffer<R: Read>(&mut self, stream: &mut R) -> io::Result<usize> {
        loop {
            match stream.read(&mut self.buffer) {
                Ok(n) => {
                    self.len = n;
                    return Ok(n);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    #[inline(always)]
    pub(crate) fn filled(&self) -> &[u8] {
        &self.buffer[..self.len]
    }
}
