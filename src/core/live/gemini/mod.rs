//! Gemini Live API client implementation.

mod client;
pub mod messages;

pub use client::{GeminiConnector, GeminiHandle};
