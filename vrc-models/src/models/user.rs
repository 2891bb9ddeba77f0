//! User entity models.

use serde::{Deserialize, Serialize};

/// A previous display name of a user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PastDisplayName {
    #[serde(rename = "displayName")]
    pub display_name: String,
    #[serde(rename = "updated_at")]
    pub updated_at: String,
}

/// Reduced user record returned for other users (friends, search results,
/// friend presence events).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LimitedUser {
    pub id: String,
    pub display_name: String,
    pub username: String,
    pub bio: String,
    pub tags: Vec<String>,
    pub status: String,
    pub status_description: String,
    pub current_avatar: String,
    #[serde(rename = "currentAvatarImageUrl")]
    pub current_avatar_thumbnail: String,
    pub is_friend: bool,
    pub friend_key: String,
    #[serde(rename = "last_login")]
    pub last_login: String,
    #[serde(rename = "last_platform")]
    pub last_platform: String,
    pub location: String,
    pub developer_type: String,
}

impl LimitedUser {
    /// Display name, falling back to the user id when the server omitted it.
    pub fn label(&self) -> &str {
        if self.display_name.is_empty() {
            &self.id
        } else {
            &self.display_name
        }
    }
}

/// The authenticated user, as returned by `/auth/user` and carried by
/// `user-update` events.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CurrentUser {
    pub id: String,
    pub display_name: String,
    pub username: String,
    pub bio: String,
    pub tags: Vec<String>,
    pub status: String,
    pub status_description: String,
    pub current_avatar: String,
    #[serde(rename = "currentAvatarImageUrl")]
    pub current_avatar_thumbnail: String,
    /// Second factors the server still expects before the session is valid.
    /// Non-empty only on a partially authenticated login response.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub requires_two_factor_auth: Vec<String>,
    pub email_verified: bool,
    pub has_email: bool,
    pub obfuscated_email: String,
    pub two_factor_auth_enabled: bool,
    pub friend_key: String,
    pub friends: Vec<String>,
    pub online_friends: Vec<String>,
    pub active_friends: Vec<String>,
    pub offline_friends: Vec<String>,
    pub friend_group_names: Vec<String>,
    pub is_friend: bool,
    #[serde(rename = "last_login")]
    pub last_login: String,
    #[serde(rename = "last_platform")]
    pub last_platform: String,
    pub allow_avatar_copying: bool,
    pub state: String,
    #[serde(rename = "date_joined")]
    pub date_joined: String,
    pub past_display_names: Vec<PastDisplayName>,
}

impl CurrentUser {
    /// Whether the login response still needs a second factor.
    pub fn needs_two_factor(&self) -> bool {
        !self.requires_two_factor_auth.is_empty()
    }
}
