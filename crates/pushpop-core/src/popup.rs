use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    display::{default_styles, PopupSettings},
    error::CoreError,
    triggers::Triggers,
};

/// Denormalized counters. Approximate: bumped after the event/lead write,
/// outside any transaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopupStats {
    pub visitors: i64,
    pub views: i64,
    pub submissions: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Popup {
    pub id: String,
    pub site_id: String,
    pub user_id: String,
    pub title: String,
    pub description: String,
    pub cta_text: String,
    pub styles: Value,
    pub components: Value,
    pub settings: Value,
    pub triggers: Value,
    pub is_active: bool,
    pub test_group_id: Option<String>,
    pub variant_label: Option<String>,
    pub stats: PopupStats,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePopupRequest {
    pub site_id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub cta_text: Option<String>,
    pub styles: Option<Value>,
    pub components: Option<Value>,
    pub settings: Option<Value>,
    pub triggers: Option<Value>,
    pub is_active: Option<bool>,
    pub test_group_id: Option<String>,
    pub variant_label: Option<String>,
}

/// A validated popup ready to insert, with every default applied.
#[derive(Debug, Clone)]
pub struct NewPopup {
    pub site_id: String,
    pub title: String,
    pub description: String,
    pub cta_text: String,
    pub styles: Value,
    pub components: Value,
    pub settings: Value,
    pub triggers: Value,
    pub is_active: bool,
    pub test_group_id: Option<String>,
    pub variant_label: Option<String>,
}

impl NewPopup {
    pub fn from_request(req: CreatePopupRequest) -> Result<Self, CoreError> {
        let site_id = non_blank(req.site_id)
            .ok_or_else(|| CoreError::validation("Site ID is required"))?;
        let components = req.components.unwrap_or_else(|| Value::Array(Vec::new()));
        ensure_components(&components)?;

        let title = match non_blank(req.title) {
            Some(t) => t,
            None if req.settings.is_some() => "New Popup".to_string(),
            None => "Untitled Popup".to_string(),
        };

        Ok(Self {
            site_id,
            title,
            description: req.description.unwrap_or_default(),
            cta_text: non_blank(req.cta_text).unwrap_or_else(|| "Subscribe".to_string()),
            styles: req.styles.unwrap_or_else(default_styles),
            components,
            settings: req.settings.unwrap_or_else(PopupSettings::creation_default),
            triggers: req.triggers.unwrap_or_else(Triggers::creation_default),
            is_active: req.is_active.unwrap_or(true),
            test_group_id: non_blank(req.test_group_id),
            variant_label: non_blank(req.variant_label),
        })
    }
}

/// Partial update. Absent fields are left alone; `testGroupId` and
/// `variantLabel` may be set to `null` to leave a test group. The owning site
/// cannot be changed.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePopupRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub cta_text: Option<String>,
    pub styles: Option<Value>,
    pub components: Option<Value>,
    pub settings: Option<Value>,
    pub triggers: Option<Value>,
    pub is_active: Option<bool>,
    #[serde(default, deserialize_with = "deserialize_optional_nullable")]
    pub test_group_id: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_optional_nullable")]
    pub variant_label: Option<Option<String>>,
}

impl UpdatePopupRequest {
    pub fn validate(self) -> Result<Self, CoreError> {
        if let Some(ref components) = self.components {
            ensure_components(components)?;
        }
        Ok(Self {
            test_group_id: self.test_group_id.map(non_blank),
            variant_label: self.variant_label.map(non_blank),
            ..self
        })
    }
}

fn deserialize_optional_nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: serde::Deserialize<'de>,
{
    Ok(Some(Option::<T>::deserialize(deserializer)?))
}

fn ensure_components(components: &Value) -> Result<(), CoreError> {
    if components.is_array() {
        Ok(())
    } else {
        Err(CoreError::validation("components must be an array"))
    }
}

fn non_blank(s: Option<String>) -> Option<String> {
    s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Dashboard counters keyed by popup id, under the names the popups table
/// shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PopupStatsView {
    pub visitors: i64,
    pub triggered: i64,
    pub submitted: i64,
}

impl From<PopupStats> for PopupStatsView {
    fn from(s: PopupStats) -> Self {
        Self {
            visitors: s.visitors,
            triggered: s.views,
            submitted: s.submissions,
        }
    }
}

/// What the embed script receives. Deliberately omits owner, stats and
/// timestamps.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbedConfig {
    pub popup_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_group_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant_label: Option<String>,
    pub title: String,
    pub description: String,
    pub cta_text: String,
    pub styles: Value,
    pub components: Value,
    pub settings: Value,
    pub triggers: Value,
}

impl EmbedConfig {
    /// Projection for site-level resolution, including A/B group fields.
    pub fn for_rotation(popup: &Popup) -> Self {
        Self {
            test_group_id: popup.test_group_id.clone(),
            variant_label: popup.variant_label.clone(),
            ..Self::single(popup)
        }
    }

    /// Projection for a directly requested popup.
    pub fn single(popup: &Popup) -> Self {
        Self {
            popup_id: popup.id.clone(),
            test_group_id: None,
            variant_label: None,
            title: popup.title.clone(),
            description: popup.description.clone(),
            cta_text: popup.cta_text.clone(),
            styles: popup.styles.clone(),
            components: popup.components.clone(),
            settings: PopupSettings::normalize(&popup.settings),
            triggers: Triggers::normalize(&popup.triggers),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn create_requires_site_id() {
        let err = NewPopup::from_request(CreatePopupRequest::default());
        assert!(matches!(err, Err(CoreError::Validation(m)) if m == "Site ID is required"));
    }

    #[test]
    fn create_applies_defaults() {
        let p = NewPopup::from_request(CreatePopupRequest {
            site_id: Some("site_abc".to_string()),
            ..Default::default()
        })
        .expect("valid");
        assert_eq!(p.title, "Untitled Popup");
        assert_eq!(p.cta_text, "Subscribe");
        assert!(p.is_active);
        assert_eq!(p.components, json!([]));
        assert_eq!(p.triggers, json!({ "timeDelay": null, "exitIntent": false }));
        assert_eq!(p.settings["width"], "500px");
        assert_eq!(p.styles["buttonColor"], "#007bff");
    }

    #[test]
    fn settings_without_title_names_popup_new() {
        let p = NewPopup::from_request(CreatePopupRequest {
            site_id: Some("site_abc".to_string()),
            settings: Some(json!({ "width": "320px" })),
            test_group_id: Some("   ".to_string()),
            ..Default::default()
        })
        .expect("valid");
        assert_eq!(p.title, "New Popup");
        assert_eq!(p.test_group_id, None);
    }

    #[test]
    fn components_must_be_array() {
        let err = NewPopup::from_request(CreatePopupRequest {
            site_id: Some("site_abc".to_string()),
            components: Some(json!({ "type": "text" })),
            ..Default::default()
        });
        assert!(err.is_err());
    }

    #[test]
    fn update_distinguishes_null_from_absent() {
        let req: UpdatePopupRequest =
            serde_json::from_value(json!({ "testGroupId": null, "isActive": false }))
                .expect("parse");
        assert_eq!(req.test_group_id, Some(None));
        assert_eq!(req.variant_label, None);
        assert_eq!(req.is_active, Some(false));
    }
}
