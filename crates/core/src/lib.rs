//! Core participation and moderation logic for agora.

pub mod services;

pub use services::*;
