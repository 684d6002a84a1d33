//! # Event Model
//!
//! The normalized representation of every inbound item (email, calendar invite,
//! chat message, file, question) as seen by the reasoning substrate. This crate
//! is the single source of truth for event data and contains no reasoning logic.
//!
//! Events are produced upstream by the perception layer and consumed read-only
//! by `reasoning_core`.

pub mod entity;
pub mod error;
pub mod event;
pub mod ids;
pub mod time;

pub use entity::*;
pub use error::*;
pub use event::*;
pub use ids::*;
pub use time::*;
