use serde::{Deserialize, Serialize};

/// A push token registered by a site's service worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscriber {
    pub id: String,
    pub site_id: String,
    pub token: String,
    pub created_at: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriberRequest {
    pub site_id: Option<String>,
    pub token: Option<String>,
}
