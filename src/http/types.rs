//! Core HTTP protocol types

use memchr::memrchr;

// METHOD

/// HTTP request methods understood by the framer.
///
/// Anything other than `GET` and `POST` is [`Unknown`](Method::Unknown) and
/// answered with `400 Bad Request`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Method {
    /// GET method - transfer a current representation of the target resource
    /// [[RFC7231, Section 4.3.1](https://tools.ietf.org/html/rfc7231#section-4.3.1)]
    Get,
    /// POST method - perform resource-specific processing on the request payload
    /// [[RFC7231, Section 4.3.3](https://tools.ietf.org/html/rfc7231#section-4.3.3)]
    Post,
    /// Any other token, or no space at all in the buffer.
    Unknown,
}

impl Method {
    /// Index of the space that terminates the method token.
    #[inline(always)]
    pub const fn boundary(&self) -> Option<usize> {
        match self {
            Method::Get => Some(3),
            Method::Post => Some(4),
            Method::Unknown => None,
        }
    }
}

// VERSION

/// HTTP protocol version found on the request line.
///
/// Parsed but never used to branch: every response goes out as `HTTP/1.0`.
/// Kept as a hook for version-dependent behaviour.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Version {
    /// HTTP/1.0 - [RFC 1945](https://tools.ietf.org/html/rfc1945)
    Http10,
    /// HTTP/1.1 - [RFC 7230](https://tools.ietf.org/html/rfc7230)
    Http11,
    /// HTTP/2 - recognised by name only
    Http2,
    Unknown,
}

impl Version {
    #[inline(always)]
    pub(crate) const fn from_bytes(src: &[u8]) -> Self {
        match src {
            b"HTTP/1.0" => Self::Http10,
            b"HTTP/1.1" => Self::Http11,
            b"HTTP/2" => Self::Http2,
            _ => Self::Unknown,
        }
    }
}

// STATUS_CODE

macro_rules! set_status_codes {
    ($(
        $(#[$docs:meta])+
        $name:ident = ($num:expr, $str:expr);
    )+) => {
        /// HTTP status codes the server emits
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum StatusCode { $(
            #[doc = concat!(stringify!($num), " ", $str)]
            $(#[$docs])+
            $name = $num,
        )+ }

        impl StatusCode {
            // The status line is always `HTTP/1.0`, whatever the request said.
            #[inline]
            pub(crate) const fn to_first_line(&self) -> &'static [u8] {
                match self { $(
                    StatusCode::$name => concat!("HTTP/1.0 ", $num, " ", $str, "\r\n").as_bytes(),
                )+ }
            }
        }
    }
}

set_status_codes! {
    /// [[RFC9110, Section 15.3.1](https://datatracker.ietf.org/doc/html/rfc9110#section-15.3.1)]
    Ok = (200, "OK");
    /// [[RFC9110, Section 15.5.1](https://datatracker.ietf.org/doc/html/rfc9110#section-15.5.1)]
    BadRequest = (400, "Bad Request");
    /// [[RFC9110, Section 15.5.5](https://datatracker.ietf.org/doc/html/rfc9110#section-15.5.5)]
    NotFound = (404, "Not Found");
}

// CONTENT_TYPE

/// Content classification of a response body.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ContentType {
    Html,
    JavaScript,
    Png,
    OctetStream,
    Json,
}

impl ContentType {
    /// Classifies a file name purely by its extension suffix.
    ///
    /// Only the text after the last `.` counts, and it is case-sensitive:
    /// `.js`, `.png` and `.html` are known, everything else is
    /// [`OctetStream`](ContentType::OctetStream).
    #[inline]
    pub fn from_path(path: &[u8]) -> Self {
        let Some(dot) = memrchr(b'.', path) else {
            return Self::OctetStream;
        };

        match &path[dot + 1..] {
            b"js" => Self::JavaScript,
            b"png" => Self::Png,
            b"html" => Self::Html,
            _ => Self::OctetStream,
        }
    }

    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Html => "text/html",
            Self::JavaScript => "text/javascript",
            Self::Png => "image/png",
            Self::OctetStream => "application/octet-stream",
            Self::Json => "application/json;charset=UTF-8",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_by_suffix() {
        #[rustfmt::skip]
        let cases: [(&[u8], ContentType); 10] = [
            (b"/index.html",       ContentType::Html),
            (b"/app/script.js",    ContentType::JavaScript),
            (b"/logo.png",         ContentType::Png),
            (b"/archive.tar.gz",   ContentType::OctetStream),
            (b"/noext",            ContentType::OctetStream),
            (b"/dir.html/file",    ContentType::OctetStream),
            (b"/page.HTML",        ContentType::OctetStream),
            (b"/script.json",      ContentType::OctetStream),
            (b"/trailing.",        ContentType::OctetStream),
            (b"/x.min.js",         ContentType::JavaScript),
        ];

        for (path, expected) in cases {
            assert_eq!(ContentType::from_path(path), expected, "{:?}", path);
        }
    }

    #[test]
    fn version_tokens() {
        #[rustfmt::skip]
        let cases: [(&[u8], Version); 6] = [
            (b"HTTP/1.0", Version::Http10),
            (b"HTTP/1.1", Version::Http11),
            (b"HTTP/2",   Version::Http2),
            (b"HTTP/1.2", Version::Unknown),
            (b"HTTP/2.0", Version::Unknown),
            (b"",         Version::Unknown),
        ];

        for (token, expected) in cases {
            assert_eq!(Version::from_bytes(token), expected);
        }
    }

    #[test]
    fn status_lines() {
        assert_eq!(StatusCode::Ok.to_first_line(), b"HTTP/1.0 200 OK\r\n");
        assert_eq!(StatusCode::NotFound.to_first_line(), b"HTTP/1.0 404 Not Found\r\n");
        assert_eq!(StatusCode::BadRequest as u16, 400);
    }
}
