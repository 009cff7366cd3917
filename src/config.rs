//! Startup configuration.
//!
//! Virtual hosts come from a YAML file; the listen address and read timeout
//! have defaults and can be overridden from the environment:
//!
//! ```yaml
//! listen_addr: "0.0.0.0:8080"
//! read_timeout_secs: 5
//! virtual_hosts:
//!   website: docroot_dirs/htdocs1
//!   example.com: /srv/example
//! ```

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::http::connection::DEFAULT_READ_TIMEOUT;
use crate::vhost::VirtualHosts;

pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8080";
pub const DEFAULT_CONFIG_PATH: &str = "config/virtual_hosts.yaml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("invalid config: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("no virtual hosts configured")]
    NoVirtualHosts,
    #[error("document root {} for host {host:?} does not exist", .path.display())]
    MissingDocumentRoot { host: String, path: PathBuf },
    #[error("document root {} for host {host:?} is not a directory", .path.display())]
    NotADirectory { host: String, path: PathBuf },
    #[error("invalid document root: {0}")]
    InvalidDocumentRoot(#[source] io::Error),
    #[error("invalid read timeout {0:?}")]
    InvalidTimeout(String),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    listen_addr: Option<String>,
    read_timeout_secs: Option<u64>,
    #[serde(default)]
    virtual_hosts: BTreeMap<String, PathBuf>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: String,
    pub read_timeout: Duration,
    pub virtual_hosts: Arc<VirtualHosts>,
}

impl Config {
    /// Loads the file named by `VHOSTS_CONFIG` (default
    /// `config/virtual_hosts.yaml`), then applies `LISTEN` and `READ_TIMEOUT_SECS`.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("VHOSTS_CONFIG")
            .unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let mut cfg = Self::from_file(&path)?;

        if let Ok(listen_addr) = std::env::var("LISTEN") {
            cfg.listen_addr = listen_addr;
        }
        if let Ok(secs) = std::env::var("READ_TIMEOUT_SECS") {
            cfg.read_timeout = parse_timeout(&secs)?;
        }

        Ok(cfg)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&contents)
    }

    /// Parses and validates a YAML document. Every document root must be an
    /// existing directory.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = serde_yaml::from_str(yaml)?;

        for (host, root) in &raw.virtual_hosts {
            match std::fs::metadata(root) {
                Ok(metadata) if metadata.is_dir() => {}
                Ok(_) => {
                    return Err(ConfigError::NotADirectory {
                        host: host.clone(),
                        path: root.clone(),
                    });
                }
                Err(_) => {
                    return Err(ConfigError::MissingDocumentRoot {
                        host: host.clone(),
                        path: root.clone(),
                    });
                }
            }
        }

        let virtual_hosts =
            VirtualHosts::new(raw.virtual_hosts).map_err(ConfigError::InvalidDocumentRoot)?;
        if virtual_hosts.is_empty() {
            return Err(ConfigError::NoVirtualHosts);
        }

        let read_timeout = match raw.read_timeout_secs {
            Some(0) => return Err(ConfigError::InvalidTimeout("0".to_string())),
            Some(secs) => Duration::from_secs(secs),
            None => DEFAULT_READ_TIMEOUT,
        };

        Ok(Self {
            listen_addr: raw
                .listen_addr
                .unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string()),
            read_timeout,
            virtual_hosts: Arc::new(virtual_hosts),
        })
    }
}

fn parse_timeout(secs: &str) -> Result<Duration, ConfigError> {
    match secs.trim().parse::<u64>() {
        Ok(0) | Err(_) => Err(ConfigError::InvalidTimeout(secs.to_string())),
        Ok(secs) => Ok(Duration::from_secs(secs)),
    }
}
