use std::collections::HashMap;

/// The only method the server accepts.
pub const METHOD_GET: &str = "GET";

/// The only protocol version the server accepts.
pub const PROTOCOL_HTTP11: &str = "HTTP/1.1";

/// Document served for URLs that name a directory.
pub const DEFAULT_DOCUMENT: &str = "index.html";

/// Represents a parsed HTTP request from a client.
///
/// `Host` and `Connection` never appear in `headers`; they are promoted to
/// the `host` and `close` fields while parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// The HTTP method, always `GET` for parsed requests
    pub method: String,
    /// The request target (e.g. "/index.html"), always starting with `/`
    pub url: String,
    /// HTTP version, always "HTTP/1.1" for parsed requests
    pub version: String,
    /// Value of the mandatory `Host` header
    pub host: String,
    /// Remaining headers keyed by canonical name
    pub headers: HashMap<String, String>,
    /// Set by `Connection: close`
    pub close: bool,
}

/// Builder for constructing Request objects.
pub struct RequestBuilder {
    method: String,
    url: Option<String>,
    version: String,
    host: Option<String>,
    headers: HashMap<String, String>,
    close: bool,
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestBuilder {
    pub fn new() -> Self {
        Self {
            method: METHOD_GET.to_string(),
            url: None,
            version: PROTOCOL_HTTP11.to_string(),
            host: None,
            headers: HashMap::new(),
            close: false,
        }
    }

    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Adds a header under its canonical name.
    pub fn header(mut self, key: &str, value: impl Into<String>) -> Self {
        self.headers.insert(canonical_header_name(key), value.into());
        self
    }

    pub fn close(mut self, close: bool) -> Self {
        self.close = close;
        self
    }

    pub fn build(self) -> Result<Request, &'static str> {
        Ok(Request {
            method: self.method,
            url: self.url.ok_or("url missing")?,
            version: self.version,
            host: self.host.ok_or("host missing")?,
            headers: self.headers,
            close: self.close,
        })
    }
}

impl Request {
    /// Retrieves a header value by name. The name is canonicalized first, so
    /// `content-type` and `Content-Type` find the same entry.
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .get(&canonical_header_name(key))
            .map(|v| v.as_str())
    }

    /// Whether the connection may carry another request after this one.
    pub fn keep_alive(&self) -> bool {
        !self.close
    }

    /// Appends the default document to a URL ending in `/`.
    ///
    /// Returns `true` if the URL changed. Calling it again is a no-op, since
    /// the rewritten URL no longer ends in `/`.
    pub fn apply_default_document(&mut self) -> bool {
        if self.url.ends_with('/') {
            self.url.push_str(DEFAULT_DOCUMENT);
            true
        } else {
            false
        }
    }
}

/// Normalizes a header name: the first letter and every letter following a
/// hyphen are upper-cased, the rest lower-cased (`content-type` becomes
/// `Content-Type`).
///
/// Names containing a byte that is not a valid token character (spaces,
/// separators, non-ASCII) are returned unchanged.
pub fn canonical_header_name(name: &str) -> String {
    if !name.bytes().all(is_token_byte) {
        return name.to_string();
    }

    let mut upper = true;
    name.chars()
        .map(|c| {
            let out = if upper {
                c.to_ascii_uppercase()
            } else {
                c.to_ascii_lowercase()
            };
            upper = c == '-';
            out
        })
        .collect()
}

fn is_token_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
}
