//! User and subscription models.

use serde::{Deserialize, Serialize};

use super::{new_id, now_millis};

string_enum! {
    pub enum UserRole {
        Admin => "admin",
        User => "user",
    }
}

impl Default for UserRole {
    fn default() -> Self {
        Self::User
    }
}

string_enum! {
    pub enum UserStatus {
        Active => "active",
        Invited => "invited",
    }
}

impl Default for UserStatus {
    fn default() -> Self {
        Self::Active
    }
}

string_enum! {
    /// Subscription plan tier.
    pub enum Plan {
        Free => "free",
        Pro => "pro",
        Team => "team",
    }
}

string_enum! {
    pub enum SubscriptionStatus {
        Active => "active",
        Trialing => "trialing",
        Canceled => "canceled",
    }
}

/// A user account, keyed by email.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub full_name: Option<String>,
    #[serde(default)]
    pub role: UserRole,
    #[serde(default)]
    pub status: UserStatus,
    /// Email of the inviting user, for invited accounts
    pub invited_by: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl User {
    pub fn new(email: &str) -> Self {
        let now = now_millis();
        Self {
            id: new_id("user"),
            email: email.to_lowercase(),
            full_name: None,
            role: UserRole::User,
            status: UserStatus::Active,
            invited_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// An account created through an invitation.
    pub fn invited(email: &str, role: UserRole, invited_by: &str) -> Self {
        Self {
            role,
            status: UserStatus::Invited,
            invited_by: Some(invited_by.to_string()),
            ..Self::new(email)
        }
    }
}

/// Billing plan attached to a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSubscription {
    pub id: String,
    pub user_email: String,
    pub plan: Plan,
    pub status: SubscriptionStatus,
    /// Next renewal (Unix milliseconds)
    pub renews_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl UserSubscription {
    /// The implicit subscription of a user with no stored plan.
    pub fn free(user_email: &str) -> Self {
        let now = now_millis();
        Self {
            id: new_id("sub"),
            user_email: user_email.to_string(),
            plan: Plan::Free,
            status: SubscriptionStatus::Active,
            renews_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_user_lowercases_email() {
        let user = User::new("Ana@Acme.IO");
        assert_eq!(user.email, "ana@acme.io");
        assert_eq!(user.status, UserStatus::Active);
    }

    #[test]
    fn test_invited_user() {
        let user = User::invited("bo@acme.io", UserRole::Admin, "ana@acme.io");
        assert_eq!(user.status, UserStatus::Invited);
        assert_eq!(user.role, UserRole::Admin);
        assert_eq!(user.invited_by.as_deref(), Some("ana@acme.io"));
    }
}
