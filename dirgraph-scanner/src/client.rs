use crate::error::{Result, ScanError};
use reqwest::Client;
use std::time::Duration;
use url::Url;

/// Build the HTTP client used for probing a target.
///
/// Redirects are never followed; 3xx statuses are classified as-is.
pub fn build_scan_client(timeout_secs: u64) -> Result<Client> {
    let client = Client::builder()
        .user_agent("DirGraph/0.2 (https://github.com/trapdoorsec/dirgraph)")
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs((timeout_secs / 2).max(1)))
        .pool_max_idle_per_host(50) // Connection pooling
        .pool_idle_timeout(Duration::from_secs(90))
        .tcp_keepalive(Duration::from_secs(60))
        .redirect(reqwest::redirect::Policy::none())
        .build()?;
    Ok(client)
}

/// Join a candidate path onto the target base URL.
pub fn candidate_url(base: &Url, path: &str) -> Result<Url> {
    let mut url = base.clone();

    let current_path = url.path().to_string();
    let path_base = if current_path.ends_with('/') {
        current_path
    } else {
        format!("{}/", current_path)
    };

    let new_path = format!("{}{}", path_base, path.trim_start_matches('/'));
    url.set_path(&new_path);

    Ok(url)
}
