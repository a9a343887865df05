// src/models/profile.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Account tier. Free accounts spend one token per generated test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "account_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    Free,
    Premium,
}

/// Represents the 'profiles' table: per-user token balance and study details.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: i64,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub education: Option<String>,
    pub target_exam: Option<String>,

    /// Remaining test-generation credits. Never negative.
    pub tokens: i64,

    pub account_type: AccountType,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Aggregated account + profile data for the current user.
#[derive(Debug, Serialize, FromRow)]
pub struct MeResponse {
    pub id: i64,
    pub username: String,
    pub role: String,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub education: Option<String>,
    pub target_exam: Option<String>,
    pub tokens: i64,
    pub account_type: AccountType,
}

/// DTO for updating the editable profile fields.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(max = 100))]
    pub full_name: Option<String>,
    #[validate(length(max = 20))]
    pub phone: Option<String>,
    #[validate(length(max = 100))]
    pub education: Option<String>,
    #[validate(length(max = 100))]
    pub target_exam: Option<String>,
}

/// DTO for the admin token grant.
#[derive(Debug, Deserialize)]
pub struct GrantTokensRequest {
    pub amount: i64,
}

/// DTO for the admin account tier change.
#[derive(Debug, Deserialize)]
pub struct SetAccountTypeRequest {
    pub account_type: AccountType,
}
