use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

pub const DEFAULT_ICON: &str = "/icon.png";
pub const DEFAULT_LINK: &str = "/";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CampaignStatus {
    #[default]
    Draft,
    Scheduled,
    /// Claimed by an in-flight send.
    Sending,
    Sent,
    Failed,
}

impl CampaignStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CampaignStatus::Draft => "draft",
            CampaignStatus::Scheduled => "scheduled",
            CampaignStatus::Sending => "sending",
            CampaignStatus::Sent => "sent",
            CampaignStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CampaignStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(CampaignStatus::Draft),
            "scheduled" => Ok(CampaignStatus::Scheduled),
            "sending" => Ok(CampaignStatus::Sending),
            "sent" => Ok(CampaignStatus::Sent),
            "failed" => Ok(CampaignStatus::Failed),
            other => Err(CoreError::validation(format!(
                "unknown campaign status: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationCampaign {
    pub id: String,
    pub user_id: String,
    pub site_id: String,
    pub title: String,
    pub body: String,
    pub icon: String,
    pub link: Option<String>,
    pub image: Option<String>,
    pub scheduled_at: Option<String>,
    pub status: CampaignStatus,
    pub sent_count: i64,
    pub failure_count: i64,
    pub created_at: String,
    pub updated_at: String,
}

/// Display fields of one push, derived from a campaign.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PushContent {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub image: Option<String>,
    pub link: String,
}

impl NotificationCampaign {
    pub fn push_content(&self) -> PushContent {
        PushContent {
            title: self.title.clone(),
            body: self.body.clone(),
            icon: Some(self.icon.as_str())
                .filter(|i| !i.is_empty())
                .unwrap_or(DEFAULT_ICON)
                .to_string(),
            image: self.image.clone().filter(|i| !i.is_empty()),
            link: self
                .link
                .clone()
                .filter(|l| !l.is_empty())
                .unwrap_or_else(|| DEFAULT_LINK.to_string()),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCampaignRequest {
    pub site_id: Option<String>,
    pub title: Option<String>,
    pub body: Option<String>,
    pub icon: Option<String>,
    pub link: Option<String>,
    pub image: Option<String>,
    pub scheduled_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewCampaign {
    pub site_id: String,
    pub title: String,
    pub body: String,
    pub icon: String,
    pub link: Option<String>,
    pub image: Option<String>,
    pub scheduled_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl NewCampaign {
    pub fn from_request(req: CreateCampaignRequest) -> Result<Self, CoreError> {
        let site_id = req.site_id.filter(|s| !s.trim().is_empty());
        let title = req.title.filter(|s| !s.trim().is_empty());
        let body = req.body.filter(|s| !s.trim().is_empty());
        let (Some(site_id), Some(title), Some(body)) = (site_id, title, body) else {
            return Err(CoreError::validation("siteId, title and body are required"));
        };
        Ok(Self {
            site_id,
            title,
            body,
            icon: req
                .icon
                .filter(|i| !i.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_ICON.to_string()),
            link: req.link.filter(|l| !l.trim().is_empty()),
            image: req.image.filter(|i| !i.trim().is_empty()),
            scheduled_at: req.scheduled_at,
        })
    }

    /// `scheduled` when a send time was given, otherwise `draft`.
    pub fn initial_status(&self) -> CampaignStatus {
        if self.scheduled_at.is_some() {
            CampaignStatus::Scheduled
        } else {
            CampaignStatus::Draft
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_str() {
        for s in ["draft", "scheduled", "sending", "sent", "failed"] {
            assert_eq!(s.parse::<CampaignStatus>().map(|st| st.as_str()).ok(), Some(s));
        }
        assert!("queued".parse::<CampaignStatus>().is_err());
    }

    #[test]
    fn create_requires_title_body_and_site() {
        let err = NewCampaign::from_request(CreateCampaignRequest {
            site_id: Some("site_1".to_string()),
            title: Some("Sale".to_string()),
            ..Default::default()
        });
        assert!(err.is_err());
    }

    #[test]
    fn create_defaults_icon() {
        let c = NewCampaign::from_request(CreateCampaignRequest {
            site_id: Some("site_1".to_string()),
            title: Some("Sale".to_string()),
            body: Some("50% off".to_string()),
            icon: Some(String::new()),
            ..Default::default()
        })
        .expect("valid");
        assert_eq!(c.icon, DEFAULT_ICON);
        assert_eq!(c.link, None);
        assert_eq!(c.initial_status(), CampaignStatus::Draft);
    }
}
