use std::sync::Arc;

use anyhow::Result;
use tokio::signal;

use convai_linux_rs::audio::{AlsaBackend, AudioInterface, DeviceAudio};
use convai_linux_rs::client_tools::{ClientTools, LogMessage};
use convai_linux_rs::config::Config;
use convai_linux_rs::conversation::Conversation;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let config = Config::from_env()?;

    let mut tools = ClientTools::new();
    tools.register(Box::new(LogMessage));

    let backend = AlsaBackend::new(&config.capture_device, &config.playback_device);
    let audio: Arc<dyn AudioInterface> = Arc::new(DeviceAudio::new(Box::new(backend)));

    let conversation = Conversation::new(config, audio.clone(), tools);

    tokio::select! {
        result = conversation.run() => result?,
        _ = signal::ctrl_c() => {
            log::info!("Received Ctrl+C, shutting down...");
            audio.stop();
        }
    }

    Ok(())
}
