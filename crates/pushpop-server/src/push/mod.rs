//! Multicast web push.
//!
//! The dispatch route builds one [`MulticastMessage`] per campaign and hands
//! it to a [`PushSender`]. Production uses [`fcm::FcmSender`]; tests inject
//! their own sender through `AppState::with_push_sender`.

pub mod fcm;

use std::collections::BTreeMap;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;

use pushpop_core::campaign::PushContent;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebpushNotification {
    pub title: String,
    pub body: String,
    pub icon: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub require_interaction: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WebpushFcmOptions {
    pub link: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebpushConfig {
    pub headers: BTreeMap<String, String>,
    pub notification: WebpushNotification,
    pub fcm_options: WebpushFcmOptions,
}

/// One payload addressed to many device tokens.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MulticastMessage {
    pub notification: Notification,
    pub webpush: WebpushConfig,
    #[serde(skip)]
    pub tokens: Vec<String>,
}

impl MulticastMessage {
    pub fn new(content: &PushContent, tokens: Vec<String>) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert("Urgency".to_string(), "high".to_string());
        Self {
            notification: Notification {
                title: content.title.clone(),
                body: content.body.clone(),
            },
            webpush: WebpushConfig {
                headers,
                notification: WebpushNotification {
                    title: content.title.clone(),
                    body: content.body.clone(),
                    icon: content.icon.clone(),
                    image: content.image.clone(),
                    require_interaction: true,
                },
                fcm_options: WebpushFcmOptions {
                    link: content.link.clone(),
                },
            },
            tokens,
        }
    }
}

/// Per-recipient outcome counts of a multicast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchResponse {
    pub success_count: usize,
    pub failure_count: usize,
}

/// Delivers a multicast through an external push provider.
///
/// An `Err` means the provider could not be reached at all; per-token
/// rejections are reported through [`BatchResponse::failure_count`].
#[async_trait]
pub trait PushSender: Send + Sync {
    async fn send_multicast(&self, message: &MulticastMessage) -> Result<BatchResponse>;
}
