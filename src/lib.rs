//! convai_linux_rs - a minimal Linux voice-agent client.
//!
//! Streams microphone PCM to a remote conversational-AI session over
//! WebSocket, plays the synthesized replies through the speaker, cuts
//! playback when the user barges in, and exposes a small set of locally
//! executed client tools the agent can invoke.

pub mod audio;
pub mod client_tools;
pub mod config;
pub mod conversation;
pub mod protocol;
pub mod session_link;
