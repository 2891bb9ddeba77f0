//! Group entity models.

use serde::{Deserialize, Serialize};

/// A VRChat group.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Group {
    pub id: String,
    pub name: String,
    pub short_code: String,
    pub description: String,
    pub icon_url: String,
    pub banner_url: String,
    pub privacy: String,
    pub owner_id: String,
    pub rules: String,
    pub links: Vec<String>,
    pub languages: Vec<String>,
    pub tags: Vec<String>,
    pub member_count: u32,
    pub online_member_count: u32,
    pub is_verified: bool,
    pub join_state: String,
    pub membership_status: String,
    pub created_at: String,
}

/// An announcement posted to a group.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GroupAnnouncement {
    pub id: String,
    pub group_id: String,
    pub author_id: String,
    pub title: String,
    pub text: String,
    pub image_id: String,
    pub image_url: String,
    pub created_at: String,
    pub updated_at: String,
}
