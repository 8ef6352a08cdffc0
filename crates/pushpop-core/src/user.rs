use serde::{Deserialize, Serialize};

use crate::{error::CoreError, lead::normalize_email};

/// An account. The password hash never leaves the storage layer's
/// [`UserCredentials`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub is_blocked: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// Login lookup result.
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user: User,
    pub password_hash: String,
}

/// Per-user counts shown in the wizard console.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserUsage {
    pub sites: i64,
    pub popups: i64,
    pub leads: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserWithUsage {
    #[serde(flatten)]
    pub user: User,
    pub stats: UserUsage,
}

/// Instance-wide totals for the wizard console.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalTotals {
    pub total_users: i64,
    pub total_sites: i64,
    pub total_popups: i64,
    pub total_leads: i64,
    pub total_events: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Validated registration: `(name, normalized email, plaintext password)`.
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl NewUser {
    pub fn from_request(req: RegisterRequest) -> Result<Self, CoreError> {
        let name = req.name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());
        let email = req.email.map(|e| normalize_email(&e)).filter(|e| !e.is_empty());
        let password = req.password.filter(|p| !p.is_empty());
        let (Some(name), Some(email), Some(password)) = (name, email, password) else {
            return Err(CoreError::validation(
                "Please provide name, email, and password",
            ));
        };
        if !crate::lead::is_valid_email(&email) {
            return Err(CoreError::validation("Invalid email format"));
        }
        Ok(Self {
            name,
            email,
            password,
        })
    }
}

/// `block` / `unblock` from the wizard console.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockAction {
    Block,
    Unblock,
}

impl BlockAction {
    pub fn is_blocked(&self) -> bool {
        matches!(self, BlockAction::Block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_requires_all_fields() {
        let err = NewUser::from_request(RegisterRequest {
            name: Some("Ada".to_string()),
            email: Some("ada@example.com".to_string()),
            password: None,
        });
        assert!(err.is_err());
    }

    #[test]
    fn register_normalizes_email() {
        let u = NewUser::from_request(RegisterRequest {
            name: Some(" Ada ".to_string()),
            email: Some("Ada@Example.com".to_string()),
            password: Some("correct horse".to_string()),
        })
        .expect("valid");
        assert_eq!(u.name, "Ada");
        assert_eq!(u.email, "ada@example.com");
    }

    #[test]
    fn usage_flattens_user_fields() {
        let v = serde_json::to_value(UserWithUsage {
            user: User {
                id: "u1".to_string(),
                name: "Ada".to_string(),
                email: "ada@example.com".to_string(),
                is_blocked: false,
                created_at: String::new(),
                updated_at: String::new(),
            },
            stats: UserUsage {
                sites: 1,
                popups: 2,
                leads: 3,
            },
        })
        .expect("serialize");
        assert_eq!(v["isBlocked"], false);
        assert_eq!(v["stats"]["popups"], 2);
        assert!(v.get("passwordHash").is_none());
    }
}
