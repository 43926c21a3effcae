//! # MFL Common Library
//!
//! Shared code for the media file loader crates:
//! - Error types
//! - Load event types (LoadEvent enum) and the EventBus
//! - Configuration loading

pub mod config;
pub mod error;
pub mod events;

pub use error::{Error, Result};
