//! VRChat Models - entity shapes shared by the REST client and the event stream.
//!
//! Only the fields the client reads are modelled. Every struct tolerates
//! missing fields so that server-side additions and omissions never break
//! decoding of an otherwise valid payload.

pub mod models;

// Re-export key types
pub use models::group::{Group, GroupAnnouncement};
pub use models::user::{CurrentUser, LimitedUser, PastDisplayName};
