//! Byte-level request framing.
//!
//! Every function here is a pure scan over an immutable snapshot of the
//! receive buffer: none of them allocate or mutate, and they may be called
//! in any order on the same slice.
//!
//! # One read per request
//!
//! The request line and all headers must arrive in a single read of at most
//! [`ReqLimits::buffer_size`](crate::limits::ReqLimits::buffer_size) bytes.
//! Requests are never reassembled across reads: anything that does not fit
//! is framed as whatever the buffer happens to hold, which usually ends in
//! [`MalformedRequest`](crate::ErrorKind::MalformedRequest) or a missing
//! body boundary.

use crate::{errors::ErrorKind, Method, Version};
use memchr::{memchr, memchr2, memmem};
use std::ops::Range;

/// Recognises the method token.
///
/// Only the exact prefixes `GET ` and `POST ` are accepted. The first space
/// in the buffer must terminate the token; if it comes later, or there is
/// no space at all, the result is [`Method::Unknown`].
///
/// The index of the terminating space is [`Method::boundary`].
#[inline]
pub fn extract_method(buffer: &[u8]) -> Method {
    match memchr(b' ', buffer) {
        Some(3) if buffer.starts_with(b"GET") => Method::Get,
        Some(4) if buffer.starts_with(b"POST") => Method::Post,
        _ => Method::Unknown,
    }
}

/// Returns the route span: from just after the method's space up to (not
/// including) the next space.
///
/// The search for the closing space starts one byte into the route, so a
/// route is never empty. A route with no closing space inside the buffer
/// is a [`MalformedRequest`](ErrorKind::MalformedRequest).
#[inline]
pub fn extract_route(buffer: &[u8], method_end: usize) -> Result<Range<usize>, ErrorKind> {
    let start = method_end + 1;
    let search_from = start + 1;

    let tail = buffer
        .get(search_from..)
        .ok_or(ErrorKind::MalformedRequest("route is missing"))?;
    let end = memchr(b' ', tail)
        .map(|pos| search_from + pos)
        .ok_or(ErrorKind::MalformedRequest("route is not terminated"))?;

    Ok(start..end)
}

/// Reads the protocol token that follows the route, up to the first `\r`
/// or `\n`.
///
/// No line terminator after the route means [`Version::Unknown`].
#[inline]
pub fn extract_version(buffer: &[u8], route_end: usize) -> Version {
    let start = route_end + 1;
    let Some(tail) = buffer.get(start..) else {
        return Version::Unknown;
    };

    match memchr2(b'\r', b'\n', tail) {
        Some(end) => Version::from_bytes(&tail[..end]),
        None => Version::Unknown,
    }
}

/// The route without its query string.
///
/// Cuts at the first `?` strictly inside the route. The span must come
/// from [`extract_route`] on the same buffer.
#[inline]
pub fn extract_file_path<'a>(buffer: &'a [u8], route: &Range<usize>) -> &'a [u8] {
    let route = &buffer[route.clone()];

    match memchr(b'?', route) {
        Some(query) => &route[..query],
        None => route,
    }
}

/// Offset of the first body byte: right after the first `\n\r\n`, which is
/// the blank line closing the header block.
#[inline]
pub fn extract_body_offset(buffer: &[u8]) -> Option<usize> {
    memmem::find(buffer, b"\n\r\n").map(|pos| pos + 3)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method() {
        #[rustfmt::skip]
        let cases: [(&[u8], Method, Option<usize>); 12] = [
            (b"GET /x HTTP/1.0\r\n\r\n",   Method::Get,     Some(3)),
            (b"POST /calc HTTP/1.1\r\n",   Method::Post,    Some(4)),
            (b"GET",                       Method::Unknown, None),
            (b"GET/ HTTP/1.0",             Method::Unknown, None),
            (b"PUT /x HTTP/1.0\r\n\r\n",   Method::Unknown, None),
            (b"get /x HTTP/1.0\r\n",       Method::Unknown, None),
            (b" GET /x HTTP/1.0\r\n",      Method::Unknown, None),
            (b"GETX /x HTTP/1.0\r\n",      Method::Unknown, None),
            (b"POSTS /x HTTP/1.0\r\n",     Method::Unknown, None),
            (b"DELETE /x HTTP/1.0\r\n",    Method::Unknown, None),
            (b"",                          Method::Unknown, None),
            (b"POS /calc",                 Method::Unknown, None),
        ];

        for (buffer, expected, boundary) in cases {
            let method = extract_method(buffer);
            assert_eq!(method, expected, "{:?}", String::from_utf8_lossy(buffer));
            assert_eq!(method.boundary(), boundary);
        }
    }

    #[test]
    fn method_needs_space_in_first_five_bytes() {
        let samples: [&[u8]; 5] = [
            b"GETGETGET /x",
            b"POSTAL /x",
            b"xxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxx",
            b"GET\t/x",
            b"\r\n\r\n\r\n GET",
        ];

        for sample in samples {
            assert!(memchr(b' ', &sample[..sample.len().min(5)]).is_none());
            assert_eq!(extract_method(sample), Method::Unknown);
        }
    }

    #[test]
    fn route() {
        #[rustfmt::skip]
        let cases: [(&[u8], usize, Result<&[u8], ErrorKind>); 8] = [
            (b"GET / HTTP/1.0\r\n",            3, Ok(b"/")),
            (b"GET /a/b.js HTTP/1.1\r\n",      3, Ok(b"/a/b.js")),
            (b"POST /calc?x=1 HTTP/1.1\r\n",   4, Ok(b"/calc?x=1")),
            (b"GET /no-terminator",            3, Err(ErrorKind::MalformedRequest("route is not terminated"))),
            (b"GET /",                         3, Err(ErrorKind::MalformedRequest("route is not terminated"))),
            (b"POST /calc",                    4, Err(ErrorKind::MalformedRequest("route is not terminated"))),
            (b"GET ",                          3, Err(ErrorKind::MalformedRequest("route is missing"))),
            (b"GET",                           3, Err(ErrorKind::MalformedRequest("route is missing"))),
        ];

        for (buffer, method_end, expected) in cases {
            let route = extract_route(buffer, method_end).map(|span| &buffer[span]);
            assert_eq!(route, expected, "{:?}", String::from_utf8_lossy(buffer));
        }
    }

    #[test]
    fn route_follows_method_boundary() {
        let buffer = b"POST /calc?x=1 HTTP/1.1\r\n";
        let method_end = extract_method(buffer).boundary().unwrap();

        let route = extract_route(buffer, method_end).unwrap();
        assert_eq!(&buffer[route], b"/calc?x=1");
    }

    #[test]
    fn version() {
        #[rustfmt::skip]
        let cases: [(&[u8], Version); 7] = [
            (b"GET / HTTP/1.0\r\n\r\n",  Version::Http10),
            (b"GET / HTTP/1.1\r\n\r\n",  Version::Http11),
            (b"GET / HTTP/1.1\n\n",      Version::Http11),
            (b"GET / HTTP/2\r\n",        Version::Http2),
            (b"GET / HTTP/3\r\n",        Version::Unknown),
            (b"GET / HTTP/1.1",          Version::Unknown),
            (b"GET / \r\n",              Version::Unknown),
        ];

        for (buffer, expected) in cases {
            let route = extract_route(buffer, 3).unwrap();
            assert_eq!(extract_version(buffer, route.end), expected);
        }
    }

    #[test]
    fn file_path() {
        #[rustfmt::skip]
        let cases: [(&[u8], &[u8]); 5] = [
            (b"GET /index.html HTTP/1.0\r\n",        b"/index.html"),
            (b"GET /index.html?v=2 HTTP/1.0\r\n",    b"/index.html"),
            (b"GET /?a?b HTTP/1.0\r\n",              b"/"),
            (b"GET /a HTTP/1.0?x\r\n",               b"/a"),
            (b"GET ?q HTTP/1.0\r\n",                 b""),
        ];

        for (buffer, expected) in cases {
            let route = extract_route(buffer, 3).unwrap();
            assert_eq!(extract_file_path(buffer, &route), expected);
        }
    }

    #[test]
    fn body_offset() {
        #[rustfmt::skip]
        let cases: [(&[u8], Option<usize>); 6] = [
            (b"POST /calc HTTP/1.1\r\nHost: x\r\n\r\n{}",  Some(32)),
            (b"POST /calc HTTP/1.1\r\n\r\n",               Some(23)),
            (b"POST /calc HTTP/1.1\r\nHost: x\r\n",        None),
            (b"POST /calc HTTP/1.1\n\n",                   None),
            (b"\n\r\n",                                    Some(3)),
            (b"",                                          None),
        ];

        for (buffer, expected) in cases {
            assert_eq!(extract_body_offset(buffer), expected);
        }
    }

    #[test]
    fn scans_do_not_depend_on_order() {
        let buffer = b"POST /calc?debug HTTP/1.1\r\nHost: a\r\n\r\n{\"value\":\"1+2\"}";

        let body_first = extract_body_offset(buffer);
        let method = extract_method(buffer);
        let route = extract_route(buffer, method.boundary().unwrap()).unwrap();
        let version = extract_version(buffer, route.end);

        assert_eq!(extract_body_offset(buffer), body_first);
        assert_eq!(method, Method::Post);
        assert_eq!(extract_file_path(buffer, &route), b"/calc");
        assert_eq!(version, Version::Http11);
    }
}
