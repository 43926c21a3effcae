//! Test Helper Utilities
//!
//! Shared utilities for testing mfl-loader

#![allow(dead_code, unused_imports)]

pub mod audio_generator;
pub mod mocks;

pub use audio_generator::{generate_test_wav, AudioConfig};
pub use mocks::{
    fast_params, mem, test_collaborators, test_loader, FixedProbe, MockExtractor, UnreadableFile,
};
