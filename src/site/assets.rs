//! Static content: a byte store addressed by path, and the resolver that
//! turns a request route into content plus a content type.

use crate::{errors::ErrorKind, http::types::ContentType};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::debug;

/// A read-only store of files addressed by root-relative path.
///
/// Paths handed to [`read`](AssetStore::read) are valid UTF-8 and start
/// with `/`.
pub trait AssetStore {
    /// Returns the full content at `path`, or `None` if there is nothing.
    fn read(&self, path: &str) -> Option<Vec<u8>>;
}

/// An [`AssetStore`] backed by a directory on disk.
///
/// Only regular files are served. A path with a `..` segment is never
/// looked up, so nothing outside the root is reachable through it.
#[derive(Debug, Clone, PartialEq)]
pub struct Directory {
    root: PathBuf,
}

impl Directory {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl AssetStore for Directory {
    fn read(&self, path: &str) -> Option<Vec<u8>> {
        if path.split('/').any(|segment| segment == "..") {
            debug!(path, "parent segment rejected");
            return None;
        }

        let full = self.root.join(path.trim_start_matches('/'));
        match fs::metadata(&full) {
            Ok(meta) if meta.is_file() => fs::read(&full).ok(),
            _ => None,
        }
    }
}

/// Content found for a route.
#[derive(Debug, Clone, PartialEq)]
pub struct Asset {
    pub content: Vec<u8>,
    pub content_type: ContentType,
}

/// Maps a route path to stored content.
///
/// `/` is served as `default_document`; every other path is looked up as is.
/// Paths that are not UTF-8 resolve to [`NotFound`](ErrorKind::NotFound).
pub fn resolve<S: AssetStore + ?Sized>(
    store: &S,
    path: &[u8],
    default_document: &str,
) -> Result<Asset, ErrorKind> {
    let path = simdutf8::basic::from_utf8(path).map_err(|_| ErrorKind::NotFound)?;
    let path = match path {
        "/" => default_document,
        other => other,
    };

    let content = store.read(path).ok_or(ErrorKind::NotFound)?;

    Ok(Asset {
        content,
        content_type: ContentType::from_path(path.as_bytes()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{env, fs};

    fn scratch(name: &str) -> PathBuf {
        let dir = env::temp_dir().join(format!("prefork_web-{}-{name}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(dir.join("nested")).unwrap();

        fs::write(dir.join("index.html"), b"<h1>home</h1>").unwrap();
        fs::write(dir.join("app.js"), b"let a = 1;").unwrap();
        fs::write(dir.join("nested/logo.png"), [0x89, b'P', b'N', b'G']).unwrap();
        fs::write(dir.join("data.bin"), [0u8, 1, 2, 3]).unwrap();
        dir
    }

    #[test]
    fn directory_resolution() {
        let dir = scratch("resolve");
        let store = Directory::new(&dir);

        #[rustfmt::skip]
        let cases: [(&[u8], Result<(&[u8], ContentType), ErrorKind>); 10] = [
            (b"/",                Ok((b"<h1>home</h1>", ContentType::Html))),
            (b"/index.html",      Ok((b"<h1>home</h1>", ContentType::Html))),
            (b"/app.js",          Ok((b"let a = 1;", ContentType::JavaScript))),
            (b"/nested/logo.png", Ok((&[0x89, b'P', b'N', b'G'], ContentType::Png))),
            (b"/data.bin",        Ok((&[0, 1, 2, 3], ContentType::OctetStream))),
            (b"/missing.html",    Err(ErrorKind::NotFound)),
            (b"/nested",          Err(ErrorKind::NotFound)),
            (b"/nested/",         Err(ErrorKind::NotFound)),
            (b"/../etc/passwd",   Err(ErrorKind::NotFound)),
            (b"/\xff\xfe.html",   Err(ErrorKind::NotFound)),
        ];

        for (path, expected) in cases {
            let got = resolve(&store, path, "/index.html");
            let got = got.as_ref().map(|a| (a.content.as_slice(), a.content_type));
            assert_eq!(got, expected.as_ref().map(|e| *e), "{:?}", path);
        }

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn parent_segments_never_escape() {
        let dir = scratch("escape");
        let store = Directory::new(dir.join("nested"));

        assert_eq!(store.read("/logo.png").as_deref(), Some(&[0x89, b'P', b'N', b'G'][..]));
        assert_eq!(store.read("/../index.html"), None);
        assert_eq!(store.read("/./../index.html"), None);
        assert_eq!(store.read("/x/../../index.html"), None);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn round_trip_is_byte_exact() {
        let dir = scratch("roundtrip");
        let store = Directory::new(&dir);
        let content: Vec<u8> = (0..=255u8).cycle().take(10_000).collect();
        fs::write(dir.join("blob.png"), &content).unwrap();

        for _ in 0..2 {
            let asset = resolve(&store, b"/blob.png", "/index.html").unwrap();
            assert_eq!(asset.content, content);
            assert_eq!(asset.content_type, ContentType::Png);
        }

        fs::remove_dir_all(&dir).unwrap();
    }
}
