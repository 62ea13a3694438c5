//! The built-in request handler: static files over `GET`, arithmetic over
//! `POST /calc`.

pub mod assets;
pub mod calc;

use crate::{
    errors::ErrorKind,
    site::assets::{resolve, AssetStore, Directory},
    ContentType, Handled, Handler, Method, Request, Response, StatusCode,
};
use std::path::Path;

/// Routes requests to a static [`AssetStore`] and the `/calc` endpoint.
///
/// | Request           | Response                                          |
/// |-------------------|---------------------------------------------------|
/// | `GET /`           | the default document                              |
/// | `GET <path>`      | `200` with the stored bytes, or `404`             |
/// | `POST /calc`      | `200` with `{"result": <n>}`, `400` without body  |
/// | `POST <other>`    | `404`                                             |
///
/// # Examples
/// ```no_run
/// use prefork_web::{Server, Site};
///
/// Server::builder()
///     .listener(std::net::TcpListener::bind("127.0.0.1:11777").unwrap())
///     .handler(Site::directory("/srv/www").default_document("/home.html"))
///     .build()
///     .launch()
///     .unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct Site<S> {
    store: S,
    default_document: String,
}

impl Site<Directory> {
    /// Serves files from `root` on disk.
    pub fn directory<P: AsRef<Path>>(root: P) -> Self {
        Self::new(Directory::new(root))
    }
}

impl<S: AssetStore> Site<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            default_document: String::from("/index.html"),
        }
    }

    /// Document served for `/`. Default: `/index.html`.
    pub fn default_document(mut self, path: &str) -> Self {
        self.default_document = path.to_owned();
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn get(&self, req: &Request<'_>, resp: &mut Response) -> Handled {
        let asset = match resolve(&self.store, req.path(), &self.default_document) {
            Ok(asset) => asset,
            Err(err) => return resp.error(&err),
        };

        resp.status(StatusCode::Ok)
            .header("content-type", asset.content_type.as_str());
        if asset.content_type == ContentType::Png {
            resp.header("content-disposition", "inline");
        }

        resp.body(asset.content)
    }

    fn post(&self, req: &Request<'_>, resp: &mut Response) -> Handled {
        if req.path() != b"/calc" {
            return resp.error(&ErrorKind::NotFound);
        }

        let Some(body) = req.body() else {
            return resp.error(&ErrorKind::MalformedRequest("body boundary missing"));
        };
        let result = calc::evaluate(body);

        resp.status(StatusCode::Ok)
            .header("content-type", ContentType::Json.as_str())
            .body_with(|w| {
                w.write("{\n\t\"result\": ");
                w.write(result);
                w.write("\n}");
            })
    }
}

impl<S: AssetStore> Handler for Site<S> {
    fn handle(&self, req: &Request<'_>, resp: &mut Response) -> Handled {
        match req.method() {
            Method::Get => self.get(req, resp),
            Method::Post => self.post(req, resp),
            Method::Unknown => resp.error(&ErrorKind::MalformedRequest("unknown method")),
        }
    }
}
