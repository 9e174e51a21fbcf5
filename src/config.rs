use crate::upstream::ConfluentConfig;
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub upstream_url: String,
    pub upstream_username: Option<String>,
    pub upstream_password: Option<String>,
    pub upstream_timeout: Duration,
    /// `None` keeps the cache in memory only
    pub cache_dir: Option<PathBuf>,
    pub gateway_host: String,
    pub gateway_port: u16,
    pub log_dir: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the config from any key lookup (the process environment in production)
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let upstream_url = var("UPSTREAM_URL", "http://localhost:8081");
        if !upstream_url.starts_with("http://") && !upstream_url.starts_with("https://") {
            anyhow::bail!("UPSTREAM_URL must be an http(s) URL, got '{}'", upstream_url);
        }

        let upstream_username = lookup("UPSTREAM_USERNAME").filter(|s| !s.is_empty());
        let upstream_password = lookup("UPSTREAM_PASSWORD").filter(|s| !s.is_empty());

        let upstream_timeout_secs: u64 = var("UPSTREAM_TIMEOUT_SECS", "30").parse().unwrap_or(30);

        let cache_dir = match var("CACHE_DIR", "./data/cache").trim() {
            "" | "none" => None,
            dir => Some(PathBuf::from(dir)),
        };

        let gateway_host = var("GATEWAY_HOST", "127.0.0.1");

        let gateway_port = var("GATEWAY_PORT", "8082").parse().unwrap_or(8082);

        let log_dir = var("LOG_DIR", "/var/log/schema-registry-cache");

        Ok(Config {
            upstream_url,
            upstream_username,
            upstream_password,
            upstream_timeout: Duration::from_secs(upstream_timeout_secs),
            cache_dir,
            gateway_host,
            gateway_port,
            log_dir,
        })
    }

    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        let addr = format!("{}:{}", self.gateway_host, self.gateway_port);
        addr.parse().map_err(|e| anyhow::anyhow!("Invalid socket address: {}", e))
    }

    pub fn upstream(&self) -> ConfluentConfig {
        ConfluentConfig {
            base_url: self.upstream_url.clone(),
            username: self.upstream_username.clone(),
            password: self.upstream_password.clone(),
            timeout: self.upstream_timeout,
        }
    }
}
