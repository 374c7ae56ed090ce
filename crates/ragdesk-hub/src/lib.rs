//! # RagDesk Hub
//!
//! Concrete integrations for RagDesk: the OpenAI Responses provider, the
//! `/api/chat` HTTP server, and the chat client controller.

pub mod api;
pub mod client;
pub mod middleware;
pub mod providers;

#[cfg(test)]
mod test_support;
