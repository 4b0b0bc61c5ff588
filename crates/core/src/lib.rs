//! Warden Core — configuration, error types, and password candidate generation.

pub mod config;
pub mod error;
pub mod passwords;
