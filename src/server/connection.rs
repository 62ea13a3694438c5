use crate::{
    errors::ErrorKind,
    http::{
        request::{Parser, Request},
        response::Response,
    },
    limits::ReqLimits,
    Handler,
};
use std::{
    io::Write,
    net::{Shutdown, TcpStream},
};
use tracing::debug;

/// Buffers of one worker, reused for every connection it serves.
#[derive(Debug)]
pub(crate) struct HttpConnection {
    pub(crate) parser: Parser,
    pub(crate) response: Response,
}

impl HttpConnection {
    #[inline]
    pub(crate) fn new(limits: &ReqLimits) -> Self {
        Self {
            parser: Parser::new(limits),
            response: Response::new(),
        }
    }

    #[inline]
    fn reset_request_response(&mut self) {
        self.parser.reset();
        self.response.reset();
    }

    /// Runs exactly one request/response cycle, then closes `stream`.
    ///
    /// One read, one response, no keep-alive. The stream is closed on every
    /// path, errors included, because it is owned and dropped here.
    pub(crate) fn serve<H: Handler>(
        &mut self,
        mut stream: TcpStream,
        handler: &H,
    ) -> Result<(), ErrorKind> {
        self.reset_request_response();
        stream.set_nonblocking(false)?;

        if self.parser.fill_buffer(&mut stream)? == 0 {
            return Ok(());
        }

        match Request::parse(self.parser.filled()) {
            Ok(req) => {
                debug!(
                    method = ?req.method(),
                    version = ?req.version(),
                    path = %String::from_utf8_lossy(req.path()),
                    "request"
                );
                handler.handle(&req, &mut self.response);
            }
            Err(err) => {
                debug!(error = %err, "request rejected");
                self.response.error(&err);
            }
        }

        stream.write_all(self.response.buffer())?;
        let _ = stream.shutdown(Shutdown::Both);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{tools::str_op, Handled, StatusCode};
    use std::{
        io::Read,
        net::{TcpListener, TcpStream},
        thread,
    };

    struct Echo;

    impl Handler for Echo {
        fn handle(&self, req: &Request<'_>, resp: &mut Response) -> Handled {
            resp.status(StatusCode::Ok).body(req.path())
        }
    }

    // Sends `raw` from a client thread, serves the accepted side, returns
    // everything the client read back.
    fn exchange(raw: &'static [u8], close_write: bool) -> Vec<u8> {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let client = thread::spawn(move || {
            let mut stream = TcpStream::connect(addr).unwrap();
            stream.write_all(raw).unwrap();
            if close_write {
                stream.shutdown(Shutdown::Write).unwrap();
            }
            let mut out = Vec::new();
            stream.read_to_end(&mut out).unwrap();
            out
        });

        let (server_side, _) = listener.accept().unwrap();
        let mut conn = HttpConnection::new(&ReqLimits::default());
        conn.serve(server_side, &Echo).unwrap();

        client.join().unwrap()
    }

    #[test]
    fn one_cycle() {
        let out = exchange(b"GET /hello?x=1 HTTP/1.1\r\nHost: a\r\n\r\n", false);
        let out = str_op(&out);

        assert!(out.starts_with("HTTP/1.0 200 OK\r\n"));
        assert!(out.ends_with("content-length: 6\r\n\r\n/hello"));
    }

    #[test]
    fn malformed_gets_fixed_400() {
        let out = exchange(b"BREW /pot HTTP/1.1\r\n\r\n", false);
        assert_eq!(out, ErrorKind::MalformedRequest("").as_http().unwrap());
    }

    #[test]
    fn empty_read_closes_silently() {
        assert_eq!(exchange(b"", true), b"");
    }

    #[test]
    fn buffers_are_reused() {
        let mut conn = HttpConnection::new(&ReqLimits::default());
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        for path in ["/a-long-first-path", "/b"] {
            let client = thread::spawn(move || {
                let mut stream = TcpStream::connect(addr).unwrap();
                // One write, since the worker reads only once.
                let request = format!("GET {path} HTTP/1.0\r\n\r\n");
                stream.write_all(request.as_bytes()).unwrap();
                let mut out = String::new();
                stream.read_to_string(&mut out).unwrap();
                out
            });

            let (server_side, _) = listener.accept().unwrap();
            conn.serve(server_side, &Echo).unwrap();
            assert!(client.join().unwrap().ends_with(&format!("\r\n\r\n{path}")));
        }
    }
}
