//! Pipeline event types and the two-stage envelope decoder.
//!
//! Every frame on the pipeline is a JSON object `{"type": ..., "content": ...}`
//! where `content` is a *string* holding a second JSON document. Stage one
//! ([`decode_envelope`]) extracts the tag and that string; stage two
//! ([`decode_payload`]) parses the string into the shape a subscriber expects.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use vrc_models::{CurrentUser, Group, GroupAnnouncement, LimitedUser};

use crate::error::DecodeError;

/// All event tags emitted by the pipeline that have a known payload shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventType {
    /// A notification was received (`notification`).
    Notification,
    /// A v2 notification was received (`notification-v2`).
    NotificationV2,
    /// A friend came online (`friend-online`).
    FriendOnline,
    /// A friend went offline (`friend-offline`).
    FriendOffline,
    /// A friend changed instance (`friend-location`).
    FriendLocation,
    /// A friend is active on the website or API (`friend-active`).
    FriendActive,
    /// A friend request was accepted (`friend-add`).
    FriendAdd,
    /// A friend was removed (`friend-delete`).
    FriendDelete,
    /// The authenticated user's profile changed (`user-update`).
    UserUpdate,
    /// The user joined a group (`group-joined`).
    GroupJoined,
    /// The user left a group (`group-left`).
    GroupLeft,
    /// A group the user belongs to posted an announcement (`group-announcement`).
    GroupAnnouncement,
    /// A tag with no known payload shape.
    Unknown(String),
}

impl EventType {
    /// Parse a wire tag.
    pub fn parse(s: &str) -> Self {
        match s {
            "notification" => Self::Notification,
            "notification-v2" => Self::NotificationV2,
            "friend-online" => Self::FriendOnline,
            "friend-offline" => Self::FriendOffline,
            "friend-location" => Self::FriendLocation,
            "friend-active" => Self::FriendActive,
            "friend-add" => Self::FriendAdd,
            "friend-delete" => Self::FriendDelete,
            "user-update" => Self::UserUpdate,
            "group-joined" => Self::GroupJoined,
            "group-left" => Self::GroupLeft,
            "group-announcement" => Self::GroupAnnouncement,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// The wire tag.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Notification => "notification",
            Self::NotificationV2 => "notification-v2",
            Self::FriendOnline => "friend-online",
            Self::FriendOffline => "friend-offline",
            Self::FriendLocation => "friend-location",
            Self::FriendActive => "friend-active",
            Self::FriendAdd => "friend-add",
            Self::FriendDelete => "friend-delete",
            Self::UserUpdate => "user-update",
            Self::GroupJoined => "group-joined",
            Self::GroupLeft => "group-left",
            Self::GroupAnnouncement => "group-announcement",
            Self::Unknown(s) => s.as_str(),
        }
    }

    /// Whether this tag describes a change to a friend.
    pub fn is_friend_event(&self) -> bool {
        matches!(
            self,
            Self::FriendOnline
                | Self::FriendOffline
                | Self::FriendLocation
                | Self::FriendActive
                | Self::FriendAdd
                | Self::FriendDelete
        )
    }

    /// All tags with a known payload shape.
    pub fn all_event_names() -> &'static [&'static str] {
        &[
            "notification",
            "notification-v2",
            "friend-online",
            "friend-offline",
            "friend-location",
            "friend-active",
            "friend-add",
            "friend-delete",
            "user-update",
            "group-joined",
            "group-left",
            "group-announcement",
        ]
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A frame after the first decode stage: the tag plus the still-encoded payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEvent {
    /// Wire tag, e.g. `friend-online`.
    #[serde(rename = "type")]
    pub event_type: String,
    /// The payload as a JSON-encoded string.
    #[serde(default)]
    pub content: String,
}

impl RawEvent {
    pub fn new(event_type: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            content: content.into(),
        }
    }

    /// Build an event by encoding `payload` into the content string.
    pub fn from_payload<T: Serialize>(
        event_type: impl Into<String>,
        payload: &T,
    ) -> serde_json::Result<Self> {
        Ok(Self::new(event_type, serde_json::to_string(payload)?))
    }

    /// The parsed tag.
    pub fn kind(&self) -> EventType {
        EventType::parse(&self.event_type)
    }

    /// Second decode stage into `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, DecodeError> {
        decode_payload(self)
    }

    /// Encode back into a wire frame.
    pub fn to_frame(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// First decode stage: split a frame into its tag and encoded content.
pub fn decode_envelope(frame: &[u8]) -> Result<RawEvent, DecodeError> {
    serde_json::from_slice(frame).map_err(DecodeError::Envelope)
}

/// Second decode stage: parse the content string of `raw` as `T`.
pub fn decode_payload<T: DeserializeOwned>(raw: &RawEvent) -> Result<T, DecodeError> {
    serde_json::from_str(&raw.content).map_err(|source| DecodeError::Payload {
        event_type: raw.event_type.clone(),
        source,
    })
}

/// A payload type bound to exactly one event tag.
pub trait EventPayload: DeserializeOwned + Send + 'static {
    const EVENT_TYPE: EventType;
}

/// `notification` payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NotificationEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub notification_type: String,
    pub sender_user_id: String,
    pub sender_username: String,
    pub receiver_user_id: String,
    pub message: String,
    pub details: serde_json::Value,
    pub seen: bool,
    #[serde(rename = "created_at")]
    pub created_at: String,
}

/// `notification-v2` payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NotificationV2Event {
    pub id: String,
    #[serde(alias = "type")]
    pub notification_type: String,
    pub sender_user_id: String,
    pub receiver_user_id: String,
    pub title: String,
    pub message: String,
    pub details: serde_json::Value,
    pub read: bool,
    pub created_at: String,
}

/// `friend-online` payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FriendOnlineEvent {
    pub user_id: String,
    pub user: Option<LimitedUser>,
    pub location: String,
    pub instance: String,
    pub world: String,
    pub can_request_invite: bool,
    pub platform: String,
}

/// `friend-offline` payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FriendOfflineEvent {
    pub user_id: String,
    pub platform: String,
}

/// `friend-location` payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FriendLocationEvent {
    pub user_id: String,
    pub user: Option<LimitedUser>,
    pub location: String,
    pub traveling_to_location: String,
    pub instance: String,
    pub world: String,
    pub can_request_invite: bool,
}

/// `friend-active` payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FriendActiveEvent {
    pub user_id: String,
    pub user: Option<LimitedUser>,
    pub platform: String,
}

/// `friend-add` payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FriendAddEvent {
    pub user_id: String,
    pub user: Option<LimitedUser>,
}

/// `friend-delete` payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FriendDeleteEvent {
    pub user_id: String,
}

/// `user-update` payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UserUpdateEvent {
    pub user_id: String,
    pub user: Option<CurrentUser>,
}

/// `group-joined` payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GroupJoinedEvent {
    pub group_id: String,
    pub group: Option<Group>,
}

/// `group-left` payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GroupLeftEvent {
    pub group_id: String,
}

/// `group-announcement` payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GroupAnnouncementEvent {
    pub group_id: String,
    pub announcement: Option<GroupAnnouncement>,
}

macro_rules! bind_payload {
    ($($payload:ty => $variant:ident),* $(,)?) => {
        $(impl EventPayload for $payload {
            const EVENT_TYPE: EventType = EventType::$variant;
        })*
    };
}

bind_payload! {
    NotificationEvent => Notification,
    NotificationV2Event => NotificationV2,
    FriendOnlineEvent => FriendOnline,
    FriendOfflineEvent => FriendOffline,
    FriendLocationEvent => FriendLocation,
    FriendActiveEvent => FriendActive,
    FriendAddEvent => FriendAdd,
    FriendDeleteEvent => FriendDelete,
    UserUpdateEvent => UserUpdate,
    GroupJoinedEvent => GroupJoined,
    GroupLeftEvent => GroupLeft,
    GroupAnnouncementEvent => GroupAnnouncement,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_parsing() {
        assert_eq!(EventType::parse("friend-online"), EventType::FriendOnline);
        assert_eq!(EventType::parse("notification-v2"), EventType::NotificationV2);
        assert_eq!(EventType::parse("user-update"), EventType::UserUpdate);
        assert_eq!(
            EventType::parse("instance-queue-ready"),
            EventType::Unknown("instance-queue-ready".into())
        );
    }

    #[test]
    fn test_all_event_names_parse_to_known_types() {
        for name in EventType::all_event_names() {
            let parsed = EventType::parse(name);
            assert!(!matches!(parsed, EventType::Unknown(_)), "{name}");
            assert_eq!(parsed.as_str(), *name);
        }
    }

    #[test]
    fn test_event_type_categories() {
        assert!(EventType::FriendLocation.is_friend_event());
        assert!(EventType::FriendDelete.is_friend_event());
        assert!(!EventType::UserUpdate.is_friend_event());
        assert!(!EventType::Unknown("friend-x".into()).is_friend_event());
    }

    #[test]
    fn test_double_decode_notification() {
        let frame = br#"{"type":"notification","content":"{\"id\":\"abc\",\"message\":\"hi\"}"}"#;
        let raw = decode_envelope(frame).unwrap();
        assert_eq!(raw.kind(), EventType::Notification);
        assert_eq!(raw.content, r#"{"id":"abc","message":"hi"}"#);

        let notification: NotificationEvent = raw.decode().unwrap();
        assert_eq!(notification.id, "abc");
        assert_eq!(notification.message, "hi");
    }

    #[test]
    fn test_mismatched_shape_fails_locally() {
        let raw = RawEvent::new("notification", r#"{"id":"abc","message":"hi"}"#);
        // A shape that needs a field with an incompatible type.
        #[derive(Debug, Deserialize)]
        struct Strict {
            #[allow(dead_code)]
            id: u64,
        }
        let err = raw.decode::<Strict>().unwrap_err();
        assert!(matches!(err, DecodeError::Payload { ref event_type, .. } if event_type == "notification"));

        // The same event still decodes for the right shape.
        assert_eq!(raw.decode::<NotificationEvent>().unwrap().id, "abc");
    }

    #[test]
    fn test_content_must_be_a_string() {
        let frame = br#"{"type":"notification","content":{"id":"abc"}}"#;
        assert!(matches!(
            decode_envelope(frame),
            Err(DecodeError::Envelope(_))
        ));
    }

    #[test]
    fn test_missing_content_is_empty() {
        let raw = decode_envelope(br#"{"type":"see-you"}"#).unwrap();
        assert_eq!(raw.event_type, "see-you");
        assert!(raw.content.is_empty());
        assert!(raw.decode::<FriendDeleteEvent>().is_err());
    }

    #[test]
    fn test_invalid_content_json_is_payload_error() {
        let raw = decode_envelope(br#"{"type":"friend-online","content":"not json"}"#).unwrap();
        assert!(matches!(
            raw.decode::<FriendOnlineEvent>(),
            Err(DecodeError::Payload { .. })
        ));
    }

    #[test]
    fn test_frame_roundtrip_keeps_string_content() {
        let payload = FriendOfflineEvent {
            user_id: "usr_1".into(),
            platform: "android".into(),
        };
        let raw = RawEvent::from_payload("friend-offline", &payload).unwrap();
        let frame = raw.to_frame().unwrap();

        let value: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert!(value["content"].is_string());

        let back = decode_envelope(frame.as_bytes()).unwrap();
        assert_eq!(back.decode::<FriendOfflineEvent>().unwrap(), payload);
    }

    #[test]
    fn test_friend_online_payload() {
        let raw = RawEvent::new(
            "friend-online",
            serde_json::json!({
                "userId": "usr_9",
                "location": "wrld_1:123~private",
                "canRequestInvite": true,
                "platform": "standalonewindows",
                "user": {"id": "usr_9", "displayName": "Nine"}
            })
            .to_string(),
        );
        let event: FriendOnlineEvent = raw.decode().unwrap();
        assert_eq!(event.user_id, "usr_9");
        assert!(event.can_request_invite);
        assert_eq!(event.user.unwrap().label(), "Nine");
    }

    #[test]
    fn test_payload_bindings() {
        assert_eq!(NotificationEvent::EVENT_TYPE, EventType::Notification);
        assert_eq!(FriendAddEvent::EVENT_TYPE.as_str(), "friend-add");
        assert_eq!(GroupLeftEvent::EVENT_TYPE.as_str(), "group-left");
        assert_eq!(
            GroupAnnouncementEvent::EVENT_TYPE.as_str(),
            "group-announcement"
        );
    }

    // ---- Payload field names ----

    fn payload<T: DeserializeOwned>(tag: &str, content: serde_json::Value) -> T {
        RawEvent::new(tag, content.to_string()).decode().unwrap()
    }

    #[test]
    fn test_notification_fields() {
        let ev: NotificationEvent = payload(
            "notification",
            serde_json::json!({
                "id": "not_1",
                "type": "friendRequest",
                "senderUserId": "usr_1",
                "senderUsername": "Tupper",
                "receiverUserId": "usr_2",
                "message": "hello",
                "details": {"worldId": "wrld_1"},
                "seen": true,
                "created_at": "2024-01-01T00:00:00Z"
            }),
        );
        assert_eq!(ev.notification_type, "friendRequest");
        assert_eq!(ev.sender_user_id, "usr_1");
        assert_eq!(ev.sender_username, "Tupper");
        assert_eq!(ev.receiver_user_id, "usr_2");
        assert_eq!(ev.details["worldId"], "wrld_1");
        assert!(ev.seen);
        assert_eq!(ev.created_at, "2024-01-01T00:00:00Z");
    }

    #[test]
    fn test_notification_v2_fields() {
        let ev: NotificationV2Event = payload(
            "notification-v2",
            serde_json::json!({
                "id": "not_2",
                "notificationType": "group.announcement",
                "senderUserId": "usr_1",
                "receiverUserId": "usr_2",
                "title": "News",
                "message": "body",
                "read": true,
                "createdAt": "2024-01-02T00:00:00Z"
            }),
        );
        assert_eq!(ev.notification_type, "group.announcement");
        assert_eq!(ev.sender_user_id, "usr_1");
        assert_eq!(ev.receiver_user_id, "usr_2");
        assert_eq!(ev.title, "News");
        assert!(ev.read);
        assert_eq!(ev.created_at, "2024-01-02T00:00:00Z");

        // Older frames carry the kind under `type`.
        let legacy: NotificationV2Event =
            payload("notification-v2", serde_json::json!({"type": "invite"}));
        assert_eq!(legacy.notification_type, "invite");
    }

    #[test]
    fn test_friend_online_world_and_instance() {
        let ev: FriendOnlineEvent = payload(
            "friend-online",
            serde_json::json!({
                "userId": "usr_9",
                "location": "wrld_1:123~private",
                "instance": "123~private",
                "world": "wrld_1",
                "canRequestInvite": true,
                "platform": "android"
            }),
        );
        assert_eq!(ev.location, "wrld_1:123~private");
        assert_eq!(ev.instance, "123~private");
        assert_eq!(ev.world, "wrld_1");
        assert_eq!(ev.platform, "android");
    }

    #[test]
    fn test_friend_location_world_and_instance() {
        let ev: FriendLocationEvent = payload(
            "friend-location",
            serde_json::json!({
                "userId": "usr_3",
                "user": {"id": "usr_3", "displayName": "Three"},
                "location": "wrld_2:77",
                "travelingToLocation": "",
                "instance": "77",
                "world": "wrld_2",
                "canRequestInvite": false
            }),
        );
        assert_eq!(ev.user_id, "usr_3");
        assert_eq!(ev.instance, "77");
        assert_eq!(ev.world, "wrld_2");
        assert!(!ev.can_request_invite);
        assert_eq!(ev.user.unwrap().label(), "Three");
    }

    #[test]
    fn test_friend_user_only_payloads() {
        let user = serde_json::json!({"userId": "usr_4", "user": {"id": "usr_4", "displayName": "Four"}});
        let active: FriendActiveEvent = payload("friend-active", user.clone());
        assert_eq!(active.user_id, "usr_4");
        assert!(active.user.is_some());
        let add: FriendAddEvent = payload("friend-add", user);
        assert_eq!(add.user.unwrap().label(), "Four");

        let gone = serde_json::json!({"userId": "usr_5"});
        assert_eq!(payload::<FriendOfflineEvent>("friend-offline", gone.clone()).user_id, "usr_5");
        assert_eq!(payload::<FriendDeleteEvent>("friend-delete", gone).user_id, "usr_5");
    }

    #[test]
    fn test_user_update_fields() {
        let ev: UserUpdateEvent = payload(
            "user-update",
            serde_json::json!({"userId": "usr_6", "user": {"id": "usr_6", "displayName": "Six"}}),
        );
        assert_eq!(ev.user_id, "usr_6");
        assert_eq!(ev.user.unwrap().display_name, "Six");
    }

    #[test]
    fn test_group_payloads() {
        let joined: GroupJoinedEvent = payload(
            "group-joined",
            serde_json::json!({"groupId": "grp_1", "group": {"id": "grp_1", "name": "Club"}}),
        );
        assert_eq!(joined.group_id, "grp_1");
        assert_eq!(joined.group.unwrap().name, "Club");

        let left: GroupLeftEvent = payload("group-left", serde_json::json!({"groupId": "grp_1"}));
        assert_eq!(left.group_id, "grp_1");

        let ann: GroupAnnouncementEvent = payload(
            "group-announcement",
            serde_json::json!({
                "groupId": "grp_1",
                "announcement": {
                    "id": "gpos_1",
                    "groupId": "grp_1",
                    "authorId": "usr_1",
                    "title": "Meetup",
                    "text": "Saturday"
                }
            }),
        );
        assert_eq!(ann.group_id, "grp_1");
        let post = ann.announcement.unwrap();
        assert_eq!(post.title, "Meetup");
        assert_eq!(post.author_id, "usr_1");
    }
}
