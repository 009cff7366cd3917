use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::SystemTime;

use crate::http::date::format_http_date;
use crate::http::mime::content_type_for_path;
use crate::http::request::{PROTOCOL_HTTP11, Request};
use crate::http::resolver::ResolvedFile;

/// HTTP status codes the server can send.
///
/// - `Ok` (200): the file is in the body
/// - `BadRequest` (400): the request could not be parsed
/// - `NotFound` (404): no file for this host and URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// 200 OK
    Ok,
    /// 400 Bad Request
    BadRequest,
    /// 404 Not Found
    NotFound,
}

impl StatusCode {
    /// Returns the numeric HTTP status code.
    ///
    /// # Example
    ///
    /// ```
    /// # use vhttpd::http::response::StatusCode;
    /// assert_eq!(StatusCode::Ok.as_u16(), 200);
    /// assert_eq!(StatusCode::NotFound.as_u16(), 404);
    /// ```
    pub fn as_u16(&self) -> u16 {
        match self {
            StatusCode::Ok => 200,
            StatusCode::BadRequest => 400,
            StatusCode::NotFound => 404,
        }
    }

    /// Returns the reason phrase sent on the status line.
    ///
    /// # Example
    ///
    /// ```
    /// # use vhttpd::http::response::StatusCode;
    /// assert_eq!(StatusCode::Ok.reason_phrase(), "OK");
    /// assert_eq!(StatusCode::BadRequest.reason_phrase(), "Bad Request");
    /// ```
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::NotFound => "Not Found",
        }
    }
}

/// A complete HTTP response ready to be written to a client.
///
/// Headers live in an ordered map, so iterating them yields the sorted
/// order the wire format requires.
#[derive(Debug)]
pub struct Response {
    /// Always "HTTP/1.1"
    pub version: &'static str,
    /// The HTTP status code
    pub status: StatusCode,
    /// Headers keyed by canonical name; always holds `Date`
    pub headers: BTreeMap<String, String>,
    /// File streamed as the body, only for 200 responses
    pub file_path: Option<PathBuf>,
    /// The request this answers; `None` when no request could be parsed
    pub request: Option<Request>,
}

/// Builder for responses; `build` fills in the headers every response shares.
pub struct ResponseBuilder {
    status: StatusCode,
    headers: BTreeMap<String, String>,
    file_path: Option<PathBuf>,
    request: Option<Request>,
}

impl ResponseBuilder {
    /// Creates a new response builder with the specified status code.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            file_path: None,
            request: None,
        }
    }

    /// Adds or replaces a header.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Sets the file whose contents become the body.
    pub fn file_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.file_path = Some(path.into());
        self
    }

    /// Attaches the originating request.
    pub fn request(mut self, request: Request) -> Self {
        self.request = Some(request);
        self
    }

    /// Builds the final Response.
    ///
    /// Adds `Date` unless already set. With a request attached, applies its
    /// default-document rewrite and adds `Connection: close` when the request
    /// asked for it.
    pub fn build(mut self) -> Response {
        self.headers
            .entry("Date".to_string())
            .or_insert_with(|| format_http_date(SystemTime::now()));

        if let Some(request) = self.request.as_mut() {
            request.apply_default_document();
            if request.close {
                self.headers
                    .insert("Connection".to_string(), "close".to_string());
            }
        }

        Response {
            version: PROTOCOL_HTTP11,
            status: self.status,
            headers: self.headers,
            file_path: self.file_path,
            request: self.request,
        }
    }
}

impl Response {
    /// 200 response serving `file`.
    pub fn ok(request: Request, file: &ResolvedFile) -> Self {
        ResponseBuilder::new(StatusCode::Ok)
            .request(request)
            .header("Last-Modified", format_http_date(file.modified))
            .header("Content-Type", content_type_for_path(&file.path))
            .header("Content-Length", file.len.to_string())
            .file_path(file.path.clone())
            .build()
    }

    /// 404 response with no body.
    pub fn not_found(request: Request) -> Self {
        ResponseBuilder::new(StatusCode::NotFound)
            .request(request)
            .build()
    }

    /// 400 response with no body. It always closes the connection.
    pub fn bad_request() -> Self {
        ResponseBuilder::new(StatusCode::BadRequest)
            .header("Connection", "close")
            .build()
    }

    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key).map(|v| v.as_str())
    }

    /// Whether the connection must be closed once this response is sent.
    pub fn closes_connection(&self) -> bool {
        self.header("Connection") == Some("close")
    }
}
