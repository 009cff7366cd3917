use vhttpd::config::Config;
use vhttpd::{logging, server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    let cfg = Config::load()?;
    for (host, root) in cfg.virtual_hosts.iter() {
        tracing::info!(host, root, "Serving virtual host");
    }

    tokio::select! {
        res = server::listener::run(&cfg) => {
            res?;
        }

        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}
