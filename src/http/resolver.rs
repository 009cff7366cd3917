//! Maps a request to a file inside its virtual host's document root.

use std::io;
use std::path::PathBuf;
use std::time::SystemTime;

use thiserror::Error;

use crate::http::request::Request;
use crate::vhost::VirtualHosts;

/// A file that passed routing, with the metadata a 200 response needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFile {
    pub path: PathBuf,
    pub modified: SystemTime,
    pub len: u64,
}

/// Every variant ends up as a 404.
#[derive(Debug, Error)]
pub enum RouteError {
    #[error("no virtual host named {0:?}")]
    UnknownHost(String),
    #[error("{0} escapes its document root")]
    Escapes(String),
    #[error("{0} does not exist")]
    NotFound(String),
    #[error("{0} is a directory")]
    IsDirectory(String),
    #[error("cannot stat {path}: {source}")]
    Io { path: String, source: io::Error },
}

/// Resolves `request` against `vhosts`.
///
/// A URL ending in `/` is rewritten in place to name the default document
/// before the path is built. The joined path is cleaned lexically and must
/// stay inside the document root, whether or not anything exists there.
pub async fn resolve(
    vhosts: &VirtualHosts,
    request: &mut Request,
) -> Result<ResolvedFile, RouteError> {
    let root = vhosts
        .document_root(&request.host)
        .ok_or_else(|| RouteError::UnknownHost(request.host.clone()))?;

    request.apply_default_document();

    let candidate = clean_path(&format!("{}/{}", root, request.url));
    if !is_contained(root, &candidate) {
        return Err(RouteError::Escapes(candidate));
    }

    let metadata = match tokio::fs::metadata(&candidate).await {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(RouteError::NotFound(candidate));
        }
        Err(source) => {
            return Err(RouteError::Io {
                path: candidate,
                source,
            });
        }
    };

    if metadata.is_dir() {
        return Err(RouteError::IsDirectory(candidate));
    }

    let modified = match metadata.modified() {
        Ok(modified) => modified,
        Err(source) => {
            return Err(RouteError::Io {
                path: candidate,
                source,
            });
        }
    };

    Ok(ResolvedFile {
        path: PathBuf::from(candidate),
        modified,
        len: metadata.len(),
    })
}

/// `candidate` is inside `root` if it is the root itself or continues it
/// after a separator. A sibling such as `/srv/site-other` does not count as
/// inside `/srv/site`.
pub fn is_contained(root: &str, candidate: &str) -> bool {
    match candidate.strip_prefix(root) {
        Some(rest) => rest.is_empty() || rest.starts_with('/') || root.ends_with('/'),
        None => false,
    }
}

/// Lexically normalizes an absolute path: collapses repeated separators,
/// drops `.` segments and resolves `..` against the preceding segment.
/// `..` at the root stays at the root. The filesystem is not consulted.
pub fn clean_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    format!("/{}", segments.join("/"))
}
