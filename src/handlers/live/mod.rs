//! Live session proxy WebSocket handlers.
//!
//! Bridges one client WebSocket (interleaved binary audio + JSON control
//! frames) to one upstream Gemini Live session.
//!
//! # Protocol
//!
//! ## Client → Server
//!
//! - First frame (text): `{"setup": {...}}` within the setup timeout
//! - Binary frames: raw PCM 16-bit mono at the configured input rate
//! - `{"clientContent": {"turns", "turnComplete"}}`
//! - `{"toolResponse": {"functionResponses"}}`
//!
//! ## Server → Client
//!
//! - Binary frames: raw PCM 16-bit mono at 24 kHz
//! - `{"setupComplete": true}`, `{"toolCall": {...}}`,
//!   `{"serverContent": {...}}`, `{"error": "..."}`
//!
//! Close codes: 4001 auth failure, 4000 setup timeout or invalid setup.

mod handler;
pub mod messages;
mod pumps;
pub mod session;

pub use handler::live_handler;
pub use session::{Session, SessionState};
