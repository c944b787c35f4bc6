//! webtime Protocol - Wire messages for websocket peers
//!
//! The daemon pushes one JSON text frame per delivered tick:
//!
//! ```text
//! {"time":"15:04:05 UTC"}
//! ```
//!
//! Anything the peer sends back is informational only and never parsed
//! into commands.

pub mod message;

pub use message::{ProtocolError, TimeUpdate};
