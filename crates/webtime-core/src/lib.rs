//! webtime Core - Shared types for the webtime clock server
//!
//! This crate provides the domain types shared between the daemon
//! (webtimed) and the wire protocol (webtime-protocol):
//! - [`Tick`] - the single value fanned out to every subscriber
//! - [`TickSource`] - how the ticker recomputes that value each interval
//!
//! All code follows the panic-free policy: no `.unwrap()`, `.expect()`,
//! `panic!()`, `unreachable!()`, `todo!()`, or direct indexing `[i]`.

pub mod error;
pub mod source;
pub mod tick;

// Re-exports for convenience
pub use error::{TickError, TickResult};
pub use source::{TickSource, WallClock, DEFAULT_TIME_FORMAT};
pub use tick::Tick;
