//! Firebase Cloud Messaging HTTP v1 sender.
//!
//! Access tokens are minted from the service account with an RS256 JWT
//! assertion and cached until shortly before they expire. A multicast is
//! one `messages:send` call per token, at most [`MAX_IN_FLIGHT`] at a time.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;

use super::{BatchResponse, MulticastMessage, PushSender};

const FCM_SCOPE: &str = "https://www.googleapis.com/auth/firebase.messaging";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const FCM_ENDPOINT: &str = "https://fcm.googleapis.com/v1/projects";
/// Refresh this long before the provider-reported expiry.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);
/// Concurrent `messages:send` requests per multicast.
pub const MAX_IN_FLIGHT: usize = 64;

/// The fields of a Google service-account JSON key that FCM needs.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccount {
    pub project_id: String,
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ServiceAccount {
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).context("invalid FCM service account JSON")
    }
}

#[derive(Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

struct CachedToken {
    value: String,
    refresh_at: Instant,
}

pub struct FcmSender {
    account: ServiceAccount,
    key: EncodingKey,
    client: reqwest::Client,
    token: Mutex<Option<CachedToken>>,
}

impl FcmSender {
    /// Parse the service account and its private key. Fails fast on a
    /// malformed key so a bad config is reported at first use.
    pub fn new(account: ServiceAccount, client: reqwest::Client) -> Result<Self> {
        let key = EncodingKey::from_rsa_pem(account.private_key.as_bytes())
            .context("invalid service account private key")?;
        Ok(Self {
            account,
            key,
            client,
            token: Mutex::new(None),
        })
    }

    fn assertion(&self) -> Result<String> {
        let now = chrono::Utc::now().timestamp();
        let claims = AssertionClaims {
            iss: &self.account.client_email,
            scope: FCM_SCOPE,
            aud: &self.account.token_uri,
            iat: now,
            exp: now + 3600,
        };
        encode(&Header::new(Algorithm::RS256), &claims, &self.key)
            .map_err(|e| anyhow!("sign FCM assertion: {e}"))
    }

    async fn access_token(&self) -> Result<String> {
        let mut cached = self.token.lock().await;
        if let Some(ref token) = *cached {
            if Instant::now() < token.refresh_at {
                return Ok(token.value.clone());
            }
        }

        let assertion = self.assertion()?;
        let form = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer")
            .append_pair("assertion", &assertion)
            .finish();
        let resp = self
            .client
            .post(&self.account.token_uri)
            .header(reqwest::header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(form)
            .send()
            .await
            .context("FCM token exchange")?;
        if !resp.status().is_success() {
            return Err(anyhow!("FCM token exchange returned {}", resp.status()));
        }
        let token: TokenResponse = resp.json().await.context("FCM token response")?;

        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(EXPIRY_MARGIN);
        *cached = Some(CachedToken {
            value: token.access_token.clone(),
            refresh_at: Instant::now() + lifetime,
        });
        tracing::info!(expires_in = token.expires_in, "FCM access token refreshed");
        Ok(token.access_token)
    }
}

/// Result of sending to a single token.
#[derive(Debug)]
pub(crate) enum TokenOutcome {
    Delivered,
    Rejected(reqwest::StatusCode),
    Unreachable(String),
}

/// Run `send_one` for every token with at most `limit` running at once and
/// tally the outcomes. Returns the batch and the number of transport errors.
pub(crate) async fn fan_out<F, Fut>(
    tokens: &[String],
    limit: usize,
    send_one: F,
) -> (BatchResponse, usize)
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = TokenOutcome> + Send + 'static,
{
    let permits = Arc::new(Semaphore::new(limit.max(1)));
    let mut join_set = JoinSet::new();
    for token in tokens {
        let permits = permits.clone();
        let send = send_one(token.clone());
        join_set.spawn(async move {
            let _permit = match permits.acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => return TokenOutcome::Unreachable(e.to_string()),
            };
            send.await
        });
    }

    let mut batch = BatchResponse::default();
    let mut transport_errors = 0;
    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok(TokenOutcome::Delivered) => batch.success_count += 1,
            Ok(TokenOutcome::Rejected(status)) => {
                tracing::warn!(%status, "FCM rejected a token");
                batch.failure_count += 1;
            }
            Ok(TokenOutcome::Unreachable(e)) => {
                tracing::warn!(error = %e, "FCM send failed");
                transport_errors += 1;
                batch.failure_count += 1;
            }
            Err(e) => {
                tracing::error!("FCM send task panicked: {}", e);
                batch.failure_count += 1;
            }
        }
    }
    (batch, transport_errors)
}

#[async_trait]
impl PushSender for FcmSender {
    async fn send_multicast(&self, message: &MulticastMessage) -> Result<BatchResponse> {
        if message.tokens.is_empty() {
            return Ok(BatchResponse::default());
        }
        let access_token = self.access_token().await?;
        let url = format!("{FCM_ENDPOINT}/{}/messages:send", self.account.project_id);

        let (batch, transport_errors) = fan_out(&message.tokens, MAX_IN_FLIGHT, |token| {
            let request = self
                .client
                .post(&url)
                .bearer_auth(&access_token)
                .json(&json!({
                    "message": {
                        "token": token,
                        "notification": message.notification,
                        "webpush": message.webpush,
                    }
                }));
            async move {
                match request.send().await {
                    Ok(resp) if resp.status().is_success() => TokenOutcome::Delivered,
                    Ok(resp) => TokenOutcome::Rejected(resp.status()),
                    Err(e) => TokenOutcome::Unreachable(e.to_string()),
                }
            }
        })
        .await;

        if transport_errors == message.tokens.len() {
            return Err(anyhow!("FCM unreachable for all {transport_errors} tokens"));
        }
        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_account_defaults_token_uri() {
        let account = ServiceAccount::from_json(
            r#"{"project_id":"p","client_email":"svc@p.iam","private_key":"k"}"#,
        )
        .expect("parse");
        assert_eq!(account.token_uri, DEFAULT_TOKEN_URI);
    }

    #[test]
    fn rejects_garbage_key() {
        let account = ServiceAccount {
            project_id: "p".to_string(),
            client_email: "svc@p.iam".to_string(),
            private_key: "not a pem".to_string(),
            token_uri: DEFAULT_TOKEN_URI.to_string(),
        };
        assert!(FcmSender::new(account, reqwest::Client::new()).is_err());
    }

    #[test]
    fn rejects_incomplete_account() {
        assert!(ServiceAccount::from_json(r#"{"project_id":"p"}"#).is_err());
    }

    #[tokio::test]
    async fn fan_out_caps_concurrent_sends() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let tokens: Vec<String> = (0..200).map(|i| format!("token-{i}")).collect();

        let (batch, transport_errors) = fan_out(&tokens, 8, |token| {
            let in_flight = in_flight.clone();
            let peak = peak.clone();
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(2)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                if token.ends_with("-7") {
                    TokenOutcome::Rejected(reqwest::StatusCode::NOT_FOUND)
                } else {
                    TokenOutcome::Delivered
                }
            }
        })
        .await;

        assert!(peak.load(Ordering::SeqCst) <= 8);
        assert_eq!(transport_errors, 0);
        assert_eq!(batch.success_count + batch.failure_count, 200);
        // token-7, token-17, ..., token-197
        assert_eq!(batch.failure_count, 20);
    }

    #[tokio::test]
    async fn fan_out_counts_transport_errors() {
        let tokens = vec!["a".to_string(), "b".to_string()];
        let (batch, transport_errors) = fan_out(&tokens, MAX_IN_FLIGHT, |_| async {
            TokenOutcome::Unreachable("connection refused".to_string())
        })
        .await;
        assert_eq!(transport_errors, 2);
        assert_eq!(batch.failure_count, 2);
    }
}
