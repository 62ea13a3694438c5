//! HTTP response builder. One response per connection, then close.

use crate::{errors::ErrorKind, http::types::StatusCode, BodyWriter, WriteBuffer};
use std::{borrow::Cow, rc::Rc, sync::Arc};

/// HTTP response builder for constructing server responses.
///
/// Build responses by chaining methods in strict order:
/// [`status()`](Response::status) -> headers -> any body method.
///
/// The status line is always `HTTP/1.0` and a `server` header is added right
/// after it. `content-length` is computed from the body and must not be set
/// by hand.
///
/// Instances are created by the worker and passed to
/// [`Handler::handle`](crate::Handler::handle).
///
/// # Examples
/// ```
/// use prefork_web::{Handled, Request, Response, StatusCode};
///
/// fn handle(_req: &Request, resp: &mut Response) -> Handled {
///     resp.status(StatusCode::Ok)
///         .header("content-type", "text/html")
///         .body("<h1>Hello World</h1>")
/// }
/// ```
///
/// # Panics
/// All methods perform ordering checks in `debug` mode that panic on
/// violations.
#[derive(Debug)]
pub struct Response {
    buffer: Vec<u8>,
    start_body: usize,
    state: ResponseState,
}

/// Proof that a response was finalized. Only [`Response`] can make one.
#[doc(hidden)]
#[derive(Debug)]
pub struct Handled(());

#[derive(Debug, Clone, Copy, PartialEq)]
enum ResponseState {
    Clean,
    Headers,
    Complete,
}

impl Response {
    #[inline(always)]
    pub(crate) fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(1024),
            start_body: 0,
            state: ResponseState::Clean,
        }
    }

    #[inline(always)]
    pub(crate) fn reset(&mut self) {
        self.buffer.clear();
        self.start_body = 0;
        self.state = ResponseState::Clean;
    }

    #[inline(always)]
    pub(crate) fn buffer(&self) -> &[u8] {
        &self.buffer
    }
}

impl Response {
    /// Writes the status line and the `server` header.
    ///
    /// # Panics
    /// Error message: `Must be first and called only once`
    #[inline]
    #[track_caller]
    pub fn status(&mut self, status: StatusCode) -> &mut Self {
        debug_assert!(
            self.state == ResponseState::Clean,
            "Must be first and called only once"
        );

        self.buffer.extend_from_slice(status.to_first_line());
        self.buffer.extend_from_slice(b"server: ");
        self.buffer.extend_from_slice(crate::SERVER_NAME.as_bytes());
        self.buffer.extend_from_slice(b"\r\n");
        self.state = ResponseState::Headers;
        self
    }

    /// Adds a header to the response.
    ///
    /// # Examples
    /// ```
    /// # prefork_web::run_test(|_, resp| {
    /// use prefork_web::StatusCode;
    ///
    /// resp.status(StatusCode::Ok)
    ///     .header("content-type", "image/png")
    ///     .header("content-disposition", "inline")
    ///     .body([0x89, b'P', b'N', b'G'])
    /// # });
    /// ```
    ///
    /// # Panics
    /// Error message: `Must be called after status() and before any body method`
    #[inline]
    #[track_caller]
    pub fn header<N: WriteBuffer, V: WriteBuffer>(&mut self, name: N, value: V) -> &mut Self {
        debug_assert!(
            self.state == ResponseState::Headers,
            "Must be called after status() and before any body method"
        );

        name.write_to(&mut self.buffer);
        self.buffer.extend_from_slice(b": ");
        value.write_to(&mut self.buffer);
        self.buffer.extend_from_slice(b"\r\n");
        self
    }

    /// Sets the response body and finalizes the response.
    ///
    /// # Panics
    /// Error message: `Must be called after status() and any header methods`
    #[inline]
    #[track_caller]
    pub fn body<T: WriteBuffer>(&mut self, data: T) -> Handled {
        debug_assert!(
            self.state == ResponseState::Headers,
            "Must be called after status() and any header methods"
        );

        self.start_body = self.buffer.len();
        data.write_to(&mut self.buffer);
        self.end_body()
    }

    /// Writes the response body via closure and finalizes the response.
    ///
    /// # Examples
    /// ```
    /// # prefork_web::run_test(|_, resp| {
    /// use prefork_web::StatusCode;
    /// use std::io::Write;
    ///
    /// resp.status(StatusCode::Ok)
    ///     .header("content-type", "application/json;charset=UTF-8")
    ///     .body_with(|writer| {
    ///         let _ = write!(writer, "{{\n\t\"result\": {}\n}}", 42);
    ///     })
    /// # });
    /// ```
    ///
    /// # Panics
    /// Error message: `Must be called after status() and any header methods`
    #[inline]
    #[track_caller]
    pub fn body_with<F: FnOnce(&mut BodyWriter)>(&mut self, f: F) -> Handled {
        debug_assert!(
            self.state == ResponseState::Headers,
            "Must be called after status() and any header methods"
        );

        self.start_body = self.buffer.len();
        f(&mut BodyWriter(&mut self.buffer));
        self.end_body()
    }

    /// Replaces the whole response with the fixed rendering of `err`.
    ///
    /// Errors that are never shown to a client leave the response empty,
    /// so the connection closes without a reply.
    #[inline]
    pub fn error(&mut self, err: &ErrorKind) -> Handled {
        self.reset();
        if let Some(bytes) = err.as_http() {
            self.buffer.extend_from_slice(bytes);
        }
        self.state = ResponseState::Complete;

        Handled(())
    }
}

impl Response {
    // Inserts `content-length` and the blank line between headers and body.
    #[inline(always)]
    fn end_body(&mut self) -> Handled {
        let body_len = self.buffer.len() - self.start_body;
        let (arr, start) = Response::number_to_bytes(body_len as u128);

        let mut head = Vec::with_capacity(22 + arr.len() - start);
        head.extend_from_slice(b"content-length: ");
        head.extend_from_slice(&arr[start..]);
        head.extend_from_slice(b"\r\n\r\n");

        self.buffer
            .splice(self.start_body..self.start_body, head.iter().copied());
        self.state = ResponseState::Complete;

        Handled(())
    }

    #[inline]
    const fn number_to_bytes(mut n: u128) -> ([u8; 39], usize) {
        let mut buffer = [b'0'; 39];
        let mut i = 39;

        if n == 0 {
            return (buffer, 38);
        }

        while n > 0 {
            i -= 1;
            buffer[i] = b'0' + (n % 10) as u8;
            n /= 10;
        }

        (buffer, i)
    }
}

pub mod write {
    use super::*;

    /// Writer for the response body, handed out by
    /// [`body_with`](Response::body_with).
    ///
    /// Implements [`std::io::Write`], so `write!` works on it.
    #[derive(Debug)]
    pub struct BodyWriter<'a>(pub(crate) &'a mut Vec<u8>);

    impl BodyWriter<'_> {
        /// Appends content to the response body.
        #[inline]
        pub fn write<T: WriteBuffer>(&mut self, value: T) {
            value.write_to(self.0);
        }
    }

    impl std::io::Write for BodyWriter<'_> {
        #[inline]
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.extend_from_slice(buf);
            Ok(buf.len())
        }

        #[inline]
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    /// Trait for writing data to the [`Response`] buffer.
    ///
    /// Implemented for strings, bytes and integers.
    pub trait WriteBuffer {
        /// Writes the value's representation directly to the buffer.
        fn write_to(&self, buffer: &mut Vec<u8>);
    }

    macro_rules! impl_write_buffer {
        (bytes, $conn:expr => $($t:ty),*) => {
            $(impl WriteBuffer for $t {
                #[inline] fn write_to(&self, buffer: &mut Vec<u8>) {
                    let closure = $conn;
                    closure(self, buffer);
                }
            })*
        };
        (number($type:ty), $conn:expr => $($t:ty),*) => {
            $(impl WriteBuffer for $t {
                #[inline] fn write_to(&self, buffer: &mut Vec<u8>) {
                    $conn(*self as $type, buffer);
                }
            })*
        };
    }

    impl<T: WriteBuffer + ?Sized> WriteBuffer for &T {
        #[inline]
        fn write_to(&self, buffer: &mut Vec<u8>) {
            T::write_to(*self, buffer);
        }
    }
    impl_write_buffer! {
        bytes, |value: &str, buffer: &mut Vec<u8>| {
            buffer.extend_from_slice(value.as_bytes());
        } => str, String, Box<str>, Cow<'_, str>, Arc<str>, Rc<str>
    }
    impl_write_buffer! {
        bytes, |value: &[u8], buffer: &mut Vec<u8>| {
            buffer.extend_from_slice(value);
        } => [u8], Vec<u8>, Box<[u8]>, Cow<'_, [u8]>, Arc<[u8]>, Rc<[u8]>
    }
    impl<const N: usize> WriteBuffer for [u8; N] {
        #[inline]
        fn write_to(&self, buffer: &mut Vec<u8>) {
            buffer.extend_from_slice(self);
        }
    }
    impl_write_buffer! {
        number(u128), impl_write_buffer_u128 => u8, u16, u32, u64, u128, usize
    }
    impl_write_buffer! {
        number(i128), impl_write_buffer_i128 => i8, i16, i32, i64, i128, isize
    }

    #[inline(always)]
    fn impl_write_buffer_u128(value: u128, buffer: &mut Vec<u8>) {
        let (arr, start) = Response::number_to_bytes(value);
        buffer.extend_from_slice(&arr[start..]);
    }

    #[inline(always)]
    fn impl_write_buffer_i128(value: i128, buffer: &mut Vec<u8>) {
        if value < 0 {
            buffer.push(b'-');
        }

        let (arr, start) = Response::number_to_bytes(value.unsigned_abs());
        buffer.extend_from_slice(&arr[start..]);
    }
}
