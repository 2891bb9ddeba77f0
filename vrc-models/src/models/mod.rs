//! Entity model definitions.

pub mod group;
pub mod user;
