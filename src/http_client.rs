use reqwest::{Client, ClientBuilder};
use std::time::Duration;

use crate::error::{EvasionError, Result};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Client for fingerprint probes: short timeouts, small pool, no
/// certificate validation (targets are often staging hosts).
pub fn create_probe_client(timeout_secs: u64) -> Result<Client> {
    let timeout = Duration::from_secs(timeout_secs.max(1));
    ClientBuilder::new()
        .pool_max_idle_per_host(8)
        .pool_idle_timeout(Some(Duration::from_secs(30)))
        .tcp_nodelay(true)

        // Timeouts
        .timeout(timeout)
        .connect_timeout(timeout)

        // Compression
        .gzip(true)
        .brotli(true)

        .use_rustls_tls()
        .https_only(false)

        // Block pages are often served after a redirect
        .redirect(reqwest::redirect::Policy::limited(5))

        .user_agent(USER_AGENT)

        // Disable certificate validation for pentesting (ONLY for security research!)
        .danger_accept_invalid_certs(true)

        .build()
        .map_err(|e| EvasionError::Client(e.to_string()))
}
