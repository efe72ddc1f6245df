//! Study assistant client - Library exports for testing
//!
//! Sessions, per-session AI instructions and the text/voice/image chat loop.

pub mod config;
pub mod core;
pub mod error;
pub mod infrastructure;
pub mod media;
pub mod shell;
