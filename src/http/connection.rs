use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::http::parser::{ParseError, read_request};
use crate::http::request::Request;
use crate::http::resolver::resolve;
use crate::http::response::Response;
use crate::http::writer::ResponseWriter;
use crate::vhost::VirtualHosts;

/// How long a connection may take to deliver one complete request.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(5);

/// What came of one attempt to read a request.
#[derive(Debug)]
pub enum ReadOutcome {
    /// The peer closed the stream before sending anything.
    CleanClose,
    /// The deadline passed before the peer sent anything.
    IdleTimeout,
    /// The deadline passed partway through a request.
    PartialTimeout,
    /// Anything else that went wrong: grammar errors, a stream that ended
    /// mid-request, read errors.
    ParseError(ParseError),
    Success(Request),
}

impl From<Result<Request, ParseError>> for ReadOutcome {
    fn from(result: Result<Request, ParseError>) -> Self {
        match result {
            Ok(request) => ReadOutcome::Success(request),
            Err(ParseError::Closed {
                bytes_received: false,
            }) => ReadOutcome::CleanClose,
            Err(ParseError::TimedOut {
                bytes_received: false,
            }) => ReadOutcome::IdleTimeout,
            Err(ParseError::TimedOut {
                bytes_received: true,
            }) => ReadOutcome::PartialTimeout,
            Err(e) => ReadOutcome::ParseError(e),
        }
    }
}

pub struct Connection<S = TcpStream> {
    stream: BufReader<S>,
    vhosts: Arc<VirtualHosts>,
    read_timeout: Duration,
    state: ConnectionState,
}

pub enum ConnectionState {
    AwaitRequest,
    Dispatch(Request),
    Respond(Response),
    Closed,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, vhosts: Arc<VirtualHosts>) -> Self {
        Self {
            stream: BufReader::new(stream),
            vhosts,
            read_timeout: DEFAULT_READ_TIMEOUT,
            state: ConnectionState::AwaitRequest,
        }
    }

    pub fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    /// Serves requests until the peer goes quiet, hangs up, sends something
    /// malformed, or asks to close.
    pub async fn run(&mut self) {
        loop {
            let state = std::mem::replace(&mut self.state, ConnectionState::Closed);
            self.state = match state {
                ConnectionState::AwaitRequest => match self.read_request().await {
                    ReadOutcome::Success(req) => ConnectionState::Dispatch(req),
                    ReadOutcome::CleanClose => {
                        info!("Connection closed by peer");
                        ConnectionState::Closed
                    }
                    ReadOutcome::IdleTimeout => {
                        info!("Connection timed out while idle");
                        ConnectionState::Closed
                    }
                    ReadOutcome::PartialTimeout => {
                        warn!("Connection timed out mid-request");
                        ConnectionState::Respond(Response::bad_request())
                    }
                    ReadOutcome::ParseError(e) => {
                        if e.is_malformed() {
                            warn!(error = %e, "Bad request");
                        } else {
                            info!(error = %e, "Connection lost mid-request");
                        }
                        ConnectionState::Respond(Response::bad_request())
                    }
                },

                ConnectionState::Dispatch(req) => ConnectionState::Respond(self.dispatch(req).await),

                ConnectionState::Respond(response) => {
                    if let Err(e) = ResponseWriter::new(&response)
                        .write_to(self.stream.get_mut())
                        .await
                    {
                        warn!(
                            error = %e,
                            status = response.status.as_u16(),
                            "Failed to write response"
                        );
                    }

                    if response.closes_connection() {
                        ConnectionState::Closed
                    } else {
                        ConnectionState::AwaitRequest // go back for next request
                    }
                }

                ConnectionState::Closed => break,
            };
        }

        if let Err(e) = self.stream.get_mut().shutdown().await {
            debug!(error = %e, "Shutdown after close failed");
        }
    }

    /// Reads one request under a fresh deadline.
    pub async fn read_request(&mut self) -> ReadOutcome {
        let deadline = Instant::now() + self.read_timeout;
        read_request(&mut self.stream, deadline).await.into()
    }

    async fn dispatch(&self, mut req: Request) -> Response {
        let response = match resolve(&self.vhosts, &mut req).await {
            Ok(file) => {
                debug!(host = %req.host, url = %req.url, path = %file.path.display(), "Serving file");
                Response::ok(req, &file)
            }
            Err(e) => {
                debug!(host = %req.host, url = %req.url, error = %e, "Route miss");
                Response::not_found(req)
            }
        };

        if let Some(req) = &response.request {
            info!(
                host = %req.host,
                url = %req.url,
                status = response.status.as_u16(),
                keep_alive = req.keep_alive(),
                "Handled request"
            );
        }
        response
    }
}
