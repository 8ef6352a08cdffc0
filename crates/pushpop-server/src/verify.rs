//! Installation checks for a customer site: the embed snippet on the home
//! page and the push service worker at the site root.

/// Service worker the push SDK expects at the site root.
pub const PUSH_WORKER_PATH: &str = "firebase-messaging-sw.js";
const EMBED_SCRIPT_MARKER: &str = "popup.js";
const FIREBASE_INIT_MARKER: &str = "firebase.initializeApp";
/// Only this much of a fetched page is read and searched.
pub const MAX_FETCH_BYTES: usize = 2 * 1024 * 1024;

/// Result of a single check. Failures carry the message shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyOutcome {
    Verified,
    Failed(String),
}

/// The page to fetch for a site's domain. A bare host gets `https://`.
pub fn site_base_url(domain: &str) -> String {
    if domain.starts_with("http") {
        domain.to_string()
    } else {
        format!("https://{domain}")
    }
}

pub fn push_worker_url(domain: &str) -> String {
    format!(
        "{}/{PUSH_WORKER_PATH}",
        site_base_url(domain).trim_end_matches('/')
    )
}

pub fn has_embed_snippet(page: &str, site_id: &str) -> bool {
    page.contains(EMBED_SCRIPT_MARKER) && page.contains(&format!("data-site-id=\"{site_id}\""))
}

pub fn has_firebase_init(script: &str) -> bool {
    script.contains(FIREBASE_INIT_MARKER)
}

fn connect_failed(url: &str) -> String {
    format!("Failed to connect to {url}. Check your SSL or firewall.")
}

/// GET `url` and return up to [`MAX_FETCH_BYTES`] of its body, or the
/// user-facing failure message.
async fn fetch_text(client: &reqwest::Client, url: &str) -> Result<String, String> {
    let mut response = match client.get(url).send().await {
        Ok(r) => r,
        Err(e) => {
            tracing::debug!(url, error = %e, "Verification fetch failed");
            return Err(connect_failed(url));
        }
    };
    let status = response.status();
    if !status.is_success() {
        return Err(format!(
            "Could not reach {url}. Status: {}",
            status.as_u16()
        ));
    }

    let mut body = Vec::new();
    while body.len() < MAX_FETCH_BYTES {
        match response.chunk().await {
            Ok(Some(chunk)) => body.extend_from_slice(&chunk),
            Ok(None) => break,
            Err(e) => {
                tracing::debug!(url, error = %e, "Verification body read failed");
                return Err(connect_failed(url));
            }
        }
    }
    if body.len() > MAX_FETCH_BYTES {
        tracing::debug!(url, "Verification page truncated");
        body.truncate(MAX_FETCH_BYTES);
    }
    Ok(String::from_utf8_lossy(&body).into_owned())
}

/// Look for the embed `<script>` tag carrying this site's id.
pub async fn verify_popup_install(
    client: &reqwest::Client,
    domain: &str,
    site_id: &str,
) -> VerifyOutcome {
    let url = site_base_url(domain);
    match fetch_text(client, &url).await {
        Ok(page) if has_embed_snippet(&page, site_id) => VerifyOutcome::Verified,
        Ok(_) => VerifyOutcome::Failed(
            "Embed script not found on the page. Please check the installation.".to_string(),
        ),
        Err(message) => VerifyOutcome::Failed(message),
    }
}

/// Look for a service worker that initializes the push SDK.
pub async fn verify_push_install(client: &reqwest::Client, domain: &str) -> VerifyOutcome {
    let url = push_worker_url(domain);
    match fetch_text(client, &url).await {
        Ok(script) if has_firebase_init(&script) => VerifyOutcome::Verified,
        Ok(_) => VerifyOutcome::Failed(
            "File found but does not contain valid Firebase initialization code.".to_string(),
        ),
        Err(message) => VerifyOutcome::Failed(message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_domains_get_https() {
        assert_eq!(site_base_url("shop.example.com"), "https://shop.example.com");
        assert_eq!(site_base_url("http://localhost:8080"), "http://localhost:8080");
    }

    #[test]
    fn worker_url_strips_trailing_slash() {
        assert_eq!(
            push_worker_url("https://shop.example.com/"),
            "https://shop.example.com/firebase-messaging-sw.js"
        );
        assert_eq!(
            push_worker_url("shop.example.com"),
            "https://shop.example.com/firebase-messaging-sw.js"
        );
    }

    #[test]
    fn snippet_needs_script_and_matching_id() {
        let page = r#"<script src="https://cdn.example/popup.js" data-site-id="site_abc"></script>"#;
        assert!(has_embed_snippet(page, "site_abc"));
        assert!(!has_embed_snippet(page, "site_xyz"));
        assert!(!has_embed_snippet(r#"<div data-site-id="site_abc">"#, "site_abc"));
    }

    #[test]
    fn firebase_marker() {
        assert!(has_firebase_init("importScripts('x'); firebase.initializeApp({});"));
        assert!(!has_firebase_init("self.addEventListener('push', () => {});"));
    }
}
