// Target fingerprinting.
//
// A handful of requests before enumeration: the root page, robots.txt and a
// trailing-slash check. The profile steers wordlist selection and extension
// variants; probing is an optimization, so failures fall back to the default
// profile instead of failing the job.

use crate::client::candidate_url;
use rand::distributions::Alphanumeric;
use rand::Rng;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;
use tracing::debug;
use url::Url;

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// What we learned about the target before enumeration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TargetProfile {
    /// Detected technology tags, e.g. "php", "wordpress", "api".
    pub tech: BTreeSet<String>,
    /// Value of the Server response header, if any.
    pub server: Option<String>,
    /// Whether the target 301s bare paths to their trailing-slash form.
    pub redirects_trailing_slash: bool,
}

impl TargetProfile {
    pub fn has_tech(&self, tag: &str) -> bool {
        self.tech.contains(tag)
    }

    /// Extension variants suggested by the detected stack.
    pub fn extension_hints(&self) -> Vec<&'static str> {
        if self.has_tech("asp") {
            vec![".aspx", ".asp"]
        } else if self.has_tech("php") {
            vec![".php"]
        } else if self.has_tech("java") {
            vec![".jsp"]
        } else {
            vec![]
        }
    }

    fn tag(&mut self, tag: &str) {
        self.tech.insert(tag.to_string());
    }
}

/// Fingerprint the target with a small fixed number of requests.
pub async fn probe_target(client: &Client, base: &Url) -> TargetProfile {
    let mut profile = TargetProfile::default();

    match client.get(base.clone()).timeout(PROBE_TIMEOUT).send().await {
        Ok(response) => {
            let server = response
                .headers()
                .get("server")
                .and_then(|v| v.to_str().ok())
                .map(|s| s.to_string());
            let powered_by = response
                .headers()
                .get("x-powered-by")
                .and_then(|v| v.to_str().ok())
                .map(|s| s.to_lowercase());
            let content_type = response
                .headers()
                .get("content-type")
                .and_then(|v| v.to_str().ok())
                .map(|s| s.to_lowercase());

            detect_from_headers(&mut profile, server.as_deref(), powered_by.as_deref());
            if let Some(ct) = content_type.as_deref()
                && ct.contains("application/json")
            {
                profile.tag("api");
            }
            profile.server = server;

            let body = response.text().await.unwrap_or_default();
            detect_from_body(&mut profile, &body);
        }
        Err(e) => {
            debug!("root probe of {} failed: {}", base, e);
            return TargetProfile::default();
        }
    }

    if let Ok(robots) = candidate_url(base, "/robots.txt")
        && let Ok(response) = client.get(robots).timeout(PROBE_TIMEOUT).send().await
        && response.status().is_success()
    {
        let body = response.text().await.unwrap_or_default().to_lowercase();
        if body.contains("wp-admin") || body.contains("wp-content") {
            profile.tag("wordpress");
            profile.tag("php");
        }
    }

    profile.redirects_trailing_slash = check_trailing_slash_redirect(client, base).await;

    debug!(
        "target profile: tech={:?} server={:?} slash_redirect={}",
        profile.tech, profile.server, profile.redirects_trailing_slash
    );
    profile
}

fn detect_from_headers(profile: &mut TargetProfile, server: Option<&str>, powered_by: Option<&str>) {
    if let Some(server) = server {
        let server = server.to_lowercase();
        if server.contains("microsoft-iis") {
            profile.tag("asp");
            profile.tag("iis");
        }
        if server.contains("nginx") {
            profile.tag("nginx");
        }
        if server.contains("apache") {
            profile.tag("apache");
        }
    }

    if let Some(powered_by) = powered_by {
        if powered_by.contains("php") {
            profile.tag("php");
        }
        if powered_by.contains("asp.net") {
            profile.tag("asp");
        }
        if powered_by.contains("express") {
            profile.tag("node");
        }
        if powered_by.contains("servlet") || powered_by.contains("jsp") {
            profile.tag("java");
        }
    }
}

fn detect_from_body(profile: &mut TargetProfile, body: &str) {
    let body = body.to_lowercase();

    if body.contains("wp-content") || body.contains("wp-includes") {
        profile.tag("wordpress");
        profile.tag("php");
    }
    if body.contains("drupal.settings") || body.contains("sites/all/modules") {
        profile.tag("drupal");
        profile.tag("php");
    }
    if body.contains("joomla") {
        profile.tag("joomla");
        profile.tag("php");
    }
    if body.contains("swagger") || body.contains("openapi") {
        profile.tag("api");
    }
}

/// One request for a bare random path; a 301/308 whose Location only appends
/// a slash means the server canonicalizes directories.
async fn check_trailing_slash_redirect(client: &Client, base: &Url) -> bool {
    let token: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(12)
        .map(char::from)
        .collect();
    let Ok(url) = candidate_url(base, &token) else {
        return false;
    };

    match client.get(url).timeout(PROBE_TIMEOUT).send().await {
        Ok(response) => {
            let status = response.status().as_u16();
            if status != 301 && status != 308 {
                return false;
            }
            response
                .headers()
                .get("location")
                .and_then(|v| v.to_str().ok())
                .map(|loc| loc.ends_with(&format!("{}/", token)))
                .unwrap_or(false)
        }
        Err(_) => false,
    }
}
