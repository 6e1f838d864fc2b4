//! Connection settings shared by every command.

use std::path::PathBuf;
use std::time::Duration;

use clap::Args;

use crate::cache::ListingCache;

#[derive(Debug, Args)]
pub struct PaletteOpts {
    /// Palette API host, with or without a scheme.
    #[clap(long, env = "PALETTE_HOST", default_value = "api.spectrocloud.com")]
    pub host: String,

    /// Palette API key. Takes precedence over the token.
    #[clap(long, env = "PALETTE_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Palette bearer token. If neither this nor an API key is given, the
    /// browser's `Authorization` cookie for the host is used.
    #[clap(long, env = "PALETTE_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Per-request timeout in seconds.
    #[clap(long = "timeout", env = "PALETTE_TIMEOUT", default_value = "30")]
    pub timeout_secs: u64,

    /// Where to cache raw cluster listings.
    #[clap(long, env = "PIER_CACHE_DIR", parse(from_os_str))]
    pub cache_dir: Option<PathBuf>,

    /// Don't cache cluster listings.
    #[clap(long)]
    pub no_cache: bool,

    /// Skip projects whose clusters can't be listed instead of failing.
    #[clap(long)]
    pub keep_going: bool,
}

impl PaletteOpts {
    /// Base URL for API calls. A bare host gets `https://`.
    pub fn base_url(&self) -> String {
        let host = self.host.trim_end_matches('/');
        if host.contains("://") {
            host.to_owned()
        } else {
            format!("https://{host}")
        }
    }

    /// The host without scheme or port, as browsers scope cookies.
    pub fn cookie_host(&self) -> &str {
        let host = self.host.trim_end_matches('/');
        let host = match host.split_once("://") {
            Some((_, rest)) => rest,
            None => host,
        };
        match host.rsplit_once(':') {
            Some((name, port)) if !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) => {
                name
            }
            _ => host,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn cache(&self) -> Option<ListingCache> {
        if self.no_cache {
            return None;
        }
        let dir = self
            .cache_dir
            .clone()
            .unwrap_or_else(ListingCache::default_dir);
        Some(ListingCache::new(dir))
    }
}
