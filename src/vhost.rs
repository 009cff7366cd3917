//! Virtual host table.
//!
//! Built once at startup and shared read-only (behind an `Arc`) by every
//! connection task.

use std::collections::HashMap;
use std::io;
use std::path::Path;

use crate::http::resolver::clean_path;

/// Maps a `Host` header value to an absolute, lexically clean document root.
///
/// Lookups are exact and case-sensitive; a port in the `Host` value is part
/// of the name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VirtualHosts {
    roots: HashMap<String, String>,
}

impl VirtualHosts {
    /// Builds the table from `(host, document root)` pairs.
    ///
    /// Relative roots are made absolute against the current directory. Roots
    /// must be valid UTF-8, since containment is checked on the string form.
    pub fn new<I, H, P>(entries: I) -> io::Result<Self>
    where
        I: IntoIterator<Item = (H, P)>,
        H: Into<String>,
        P: AsRef<Path>,
    {
        let mut roots = HashMap::new();
        for (host, root) in entries {
            let absolute = std::path::absolute(root.as_ref())?;
            let root = absolute.to_str().ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("document root {} is not valid UTF-8", absolute.display()),
                )
            })?;
            roots.insert(host.into(), clean_path(root));
        }
        Ok(Self { roots })
    }

    pub fn document_root(&self, host: &str) -> Option<&str> {
        self.roots.get(host).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.roots.iter().map(|(h, r)| (h.as_str(), r.as_str()))
    }
}
