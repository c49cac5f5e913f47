//! # Realtime Core
//!
//! Core modules shared by the fleet tracking crates: the error taxonomy,
//! provider traits for external collaborators, and location value types.

mod error;
mod location;
mod provider;

pub use crate::error::*;
pub use crate::location::*;
pub use crate::provider::*;
