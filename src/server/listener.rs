use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{Instrument, error, info, info_span};

use crate::config::Config;
use crate::http::connection::Connection;
use crate::vhost::VirtualHosts;

/// Pause after a failed `accept`, so a persistent failure such as running out
/// of file descriptors does not spin the loop.
const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(100);

pub async fn run(cfg: &Config) -> anyhow::Result<()> {
    let listener = TcpListener::bind(&cfg.listen_addr)
        .await
        .with_context(|| format!("Failed to bind {}", cfg.listen_addr))?;
    info!(
        hosts = cfg.virtual_hosts.len(),
        "Listening on {}",
        listener.local_addr()?
    );

    serve(listener, Arc::clone(&cfg.virtual_hosts), cfg.read_timeout).await
}

/// Accepts connections forever, one task per connection.
///
/// A failed `accept` is logged and retried after [`ACCEPT_RETRY_DELAY`]; it
/// never stops the server.
pub async fn serve(
    listener: TcpListener,
    vhosts: Arc<VirtualHosts>,
    read_timeout: Duration,
) -> anyhow::Result<()> {
    loop {
        let (socket, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                error!("Failed to accept connection: {}", e);
                tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
                continue;
            }
        };
        info!("Accepted connection from {}", peer);

        let vhosts = Arc::clone(&vhosts);
        tokio::spawn(
            async move {
                Connection::new(socket, vhosts)
                    .with_read_timeout(read_timeout)
                    .run()
                    .await;
            }
            .instrument(info_span!("conn", %peer)),
        );
    }
}
