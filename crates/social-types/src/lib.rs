//! Core types and traits for the friend-graph service.
//!
//! Records, command results, and notification payloads are serialized with the same field
//! names and error codes the HTTP clients already consume.

mod command;
mod notification;
mod relationship;
mod traits;
mod user;

pub use command::*;
pub use notification::*;
pub use relationship::*;
pub use traits::*;
pub use user::*;
