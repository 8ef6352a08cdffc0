use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// A customer website. `id` doubles as the public identifier placed in the
/// embed snippet's `data-site-id` attribute.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Site {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub domain: String,
    pub is_popup_verified: bool,
    pub is_push_verified: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSiteRequest {
    pub domain: Option<String>,
    pub name: Option<String>,
}

impl CreateSiteRequest {
    /// Returns `(name, domain)`. The name falls back to the domain.
    pub fn validate(self) -> Result<(String, String), CoreError> {
        let domain = self
            .domain
            .map(|d| d.trim().trim_end_matches('/').to_string())
            .filter(|d| !d.is_empty())
            .ok_or_else(|| CoreError::validation("domain is required"))?;
        let name = self
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| domain.clone());
        Ok((name, domain))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_required_and_trimmed() {
        assert!(CreateSiteRequest::default().validate().is_err());
        let (name, domain) = CreateSiteRequest {
            domain: Some(" shop.example.com/ ".to_string()),
            name: None,
        }
        .validate()
        .expect("valid");
        assert_eq!(domain, "shop.example.com");
        assert_eq!(name, "shop.example.com");
    }
}
