use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::CoreError;

/// Placeholder used by upload-only forms; accepted without format checks.
pub const ANONYMOUS_EMAIL: &str = "anonymous@upload";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: String,
    pub site_id: String,
    pub popup_id: String,
    pub user_id: Option<String>,
    pub email: Option<String>,
    pub data: Map<String, Value>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitLeadRequest {
    pub site_id: Option<String>,
    pub popup_id: Option<String>,
    pub email: Option<String>,
    pub data: Option<Map<String, Value>>,
    pub lead_id: Option<String>,
}

/// A validated lead submission.
#[derive(Debug, Clone, PartialEq)]
pub enum LeadSubmission {
    /// First submission of a form: insert a new lead.
    Create {
        site_id: String,
        popup_id: String,
        email: Option<String>,
        data: Map<String, Value>,
    },
    /// Later step of a multi-step form: merge into an existing lead of the
    /// same site and popup.
    Merge {
        lead_id: String,
        site_id: String,
        popup_id: String,
        email: Option<String>,
        data: Map<String, Value>,
    },
}

impl LeadSubmission {
    pub fn from_request(req: SubmitLeadRequest) -> Result<Self, CoreError> {
        let site_id = req.site_id.filter(|s| !s.trim().is_empty());
        let popup_id = req.popup_id.filter(|s| !s.trim().is_empty());
        let (Some(site_id), Some(popup_id)) = (site_id, popup_id) else {
            return Err(CoreError::validation("Site ID and popup ID are required"));
        };

        let email = match req.email.map(|e| normalize_email(&e)) {
            Some(e) if e.is_empty() => None,
            Some(e) => {
                if e != ANONYMOUS_EMAIL && !is_valid_email(&e) {
                    return Err(CoreError::validation("Invalid email format"));
                }
                Some(e)
            }
            None => None,
        };
        let data = req.data.unwrap_or_default();

        match req.lead_id.filter(|s| !s.trim().is_empty()) {
            Some(lead_id) => Ok(LeadSubmission::Merge {
                lead_id,
                site_id,
                popup_id,
                email,
                data,
            }),
            None => Ok(LeadSubmission::Create {
                site_id,
                popup_id,
                email,
                data,
            }),
        }
    }
}

pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Equivalent of `^[^\s@]+@[^\s@]+\.[^\s@]+$`.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    // Some dot with at least one char on each side.
    domain
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len())
}

/// Shallow merge: incoming keys overwrite, stored keys not in `incoming` survive.
pub fn merge_data(stored: &mut Map<String, Value>, incoming: Map<String, Value>) {
    for (k, v) in incoming {
        stored.insert(k, v);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn req(email: Option<&str>) -> SubmitLeadRequest {
        SubmitLeadRequest {
            site_id: Some("site_1".to_string()),
            popup_id: Some("popup_1".to_string()),
            email: email.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn email_format() {
        assert!(is_valid_email("a@b.co"));
        assert!(is_valid_email("first.last@mail.example.org"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("a@.b"));
        assert!(!is_valid_email("a@b."));
        assert!(!is_valid_email("@b.co"));
        assert!(!is_valid_email("a@@b.co"));
        assert!(!is_valid_email("a b@c.de"));
    }

    #[test]
    fn rejects_malformed_email() {
        let err = LeadSubmission::from_request(req(Some("not-an-email")));
        assert!(matches!(err, Err(CoreError::Validation(m)) if m == "Invalid email format"));
    }

    #[test]
    fn sentinel_and_empty_bypass_validation() {
        match LeadSubmission::from_request(req(Some("anonymous@upload"))) {
            Ok(LeadSubmission::Create { email, .. }) => {
                assert_eq!(email.as_deref(), Some(ANONYMOUS_EMAIL))
            }
            other => panic!("unexpected {other:?}"),
        }
        match LeadSubmission::from_request(req(Some("   "))) {
            Ok(LeadSubmission::Create { email, .. }) => assert_eq!(email, None),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn email_is_normalized() {
        match LeadSubmission::from_request(req(Some("  Jane@Example.COM "))) {
            Ok(LeadSubmission::Create { email, .. }) => {
                assert_eq!(email.as_deref(), Some("jane@example.com"))
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn lead_id_selects_merge() {
        let mut r = req(None);
        r.lead_id = Some("lead_9".to_string());
        assert!(matches!(
            LeadSubmission::from_request(r),
            Ok(LeadSubmission::Merge { lead_id, site_id, popup_id, .. })
                if lead_id == "lead_9" && site_id == "site_1" && popup_id == "popup_1"
        ));
    }

    #[test]
    fn requires_site_and_popup() {
        let r = SubmitLeadRequest {
            popup_id: Some("p".to_string()),
            ..Default::default()
        };
        assert!(LeadSubmission::from_request(r).is_err());
    }

    #[test]
    fn merge_keeps_existing_keys() {
        let mut stored = json!({ "name": "Ada", "step": 1 })
            .as_object()
            .cloned()
            .unwrap_or_default();
        let incoming = json!({ "step": 2, "phone": "555" })
            .as_object()
            .cloned()
            .unwrap_or_default();
        merge_data(&mut stored, incoming);
        assert_eq!(
            Value::Object(stored),
            json!({ "name": "Ada", "step": 2, "phone": "555" })
        );
    }
}
