//! # RagDesk Core
//!
//! Shared types, traits, and the chat orchestration for RagDesk.
//! The hub and CLI crates build on this one.

pub mod chat;
pub mod config;
pub mod error;
pub mod locale;
pub mod message;
pub mod prompt;
pub mod provider;
pub mod session;
