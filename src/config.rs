//! Process configuration, read from the environment once at startup.

use anyhow::{Context, Result};

const DEFAULT_API_URL: &str = "https://api.elevenlabs.io";
const DEFAULT_WS_URL: &str = "wss://api.elevenlabs.io/v1/convai/conversation";

#[derive(Debug, Clone)]
pub struct Config {
    /// API key; optional, public agents connect without one.
    pub api_key: Option<String>,
    /// Conversational agent to talk to.
    pub agent_id: String,
    /// REST base URL, used for the signed-URL fetch.
    pub api_url: String,
    /// WebSocket session endpoint.
    pub ws_url: String,
    /// ALSA capture device name (e.g. "default", "plughw:0,0")
    pub capture_device: String,
    /// ALSA playback device name
    pub playback_device: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let agent_id =
            std::env::var("ELEVEN_LABS_AGENT_ID").context("ELEVEN_LABS_AGENT_ID is not set")?;

        Ok(Self {
            api_key: std::env::var("ELEVEN_LABS_API_KEY")
                .ok()
                .filter(|key| !key.is_empty()),
            agent_id,
            api_url: std::env::var("ELEVEN_LABS_API_URL")
                .unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
            ws_url: std::env::var("ELEVEN_LABS_WS_URL")
                .unwrap_or_else(|_| DEFAULT_WS_URL.to_string()),
            capture_device: std::env::var("AUDIO_CAPTURE_DEVICE")
                .unwrap_or_else(|_| "default".to_string()),
            playback_device: std::env::var("AUDIO_PLAYBACK_DEVICE")
                .unwrap_or_else(|_| "default".to_string()),
        })
    }
}
