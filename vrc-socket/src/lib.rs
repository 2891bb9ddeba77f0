//! VRChat Socket - pipeline WebSocket client for real-time events.
//!
//! This crate provides the event stream client that handles:
//! - Authenticated connection to the pipeline with the session token
//! - Automatic reconnection with exponential backoff (5s doubling to 60s)
//! - Two-stage decoding of the `{type, content}` envelope
//! - Subscriber registration by tag, wildcard, or payload type
//! - Bounded callback dispatch on a worker pool
//! - Orderly, idempotent shutdown

pub mod backoff;
pub mod client;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod manager;
pub mod registry;
pub mod state;

// Re-export key types
pub use backoff::Backoff;
pub use client::{StreamClient, StreamClientBuilder};
pub use error::{DecodeError, DialError, StreamError};
pub use events::{
    decode_envelope, decode_payload, EventPayload, EventType, FriendActiveEvent, FriendAddEvent,
    FriendDeleteEvent, FriendLocationEvent, FriendOfflineEvent, FriendOnlineEvent,
    GroupAnnouncementEvent, GroupJoinedEvent, GroupLeftEvent, NotificationEvent, NotificationV2Event, RawEvent,
    UserUpdateEvent,
};
pub use manager::Connector;
pub use registry::{HandlerRegistry, SubscriptionHandle};
pub use state::{ConnectionState, NoopObserver, StreamObserver};
