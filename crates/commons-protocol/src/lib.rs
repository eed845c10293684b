//! Shared API types for Commons.
//!
//! Everything the server puts on the wire lives here so that clients and
//! integration tests deserialize the same shapes the handlers serialize.

pub mod types;

pub use types::*;
