//! Drives one conversational session end to end: microphone frames go up
//! the link, synthesized audio comes down into the bridge, tool calls are
//! dispatched locally, and barge-in cuts playback.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

use anyhow::Result;
use bytes::Bytes;
use tokio::sync::mpsc;

use crate::audio::AudioInterface;
use crate::client_tools::ClientTools;
use crate::config::Config;
use crate::session_link::{LinkCommand, LinkEvent, SessionLink};

/// Queue depth between the session link and the audio side.
const CHANNEL_DEPTH: usize = 32;

pub struct Conversation {
    config: Config,
    audio: Arc<dyn AudioInterface>,
    tools: ClientTools,
}

impl Conversation {
    pub fn new(config: Config, audio: Arc<dyn AudioInterface>, tools: ClientTools) -> Self {
        Self {
            config,
            audio,
            tools,
        }
    }

    /// Run the session until the server ends it or the link drops. The
    /// audio bridge is stopped on the way out; it cannot be reused.
    pub async fn run(self) -> Result<()> {
        let (tx_event, mut rx_event) = mpsc::channel::<LinkEvent>(CHANNEL_DEPTH);
        let (tx_cmd, rx_cmd) = mpsc::channel::<LinkCommand>(CHANNEL_DEPTH);

        let link = SessionLink::new(self.config.clone(), tx_event, rx_cmd);
        let link_task = tokio::spawn(link.run());

        // Microphone frames go straight up the link. The sink runs on the
        // bridge's dispatch thread, so the blocking send stays off the
        // async runtime.
        let mic_tx = tx_cmd.clone();
        self.audio.start(Box::new(move |frame: Bytes| {
            if mic_tx.blocking_send(LinkCommand::SendAudio(frame)).is_err() {
                log::warn!("Session link gone, dropping captured frame");
            }
        }))?;

        // Synthesized audio plays from a dedicated thread so the blocking
        // device writes never stall the event loop. The queue is unbounded:
        // the event loop must never block behind playback, or an
        // interruption would sit in the event channel until the backlog
        // drained at real-time rate. Each queued frame carries the
        // generation current at enqueue time; an interruption bumps the
        // generation, which both cuts the device stream and invalidates
        // everything still waiting in this queue.
        let generation = Arc::new(AtomicU64::new(0));
        let (tx_play, mut rx_play) = mpsc::unbounded_channel::<(u64, Vec<u8>)>();
        {
            let audio = self.audio.clone();
            let generation = generation.clone();
            thread::Builder::new()
                .name("audio-output".into())
                .spawn(move || {
                    while let Some((tag, frame)) = rx_play.blocking_recv() {
                        if tag != generation.load(Ordering::SeqCst) {
                            continue;
                        }
                        if let Err(e) = audio.output(&frame) {
                            log::error!("Playback failed: {}", e);
                            break;
                        }
                    }
                    log::info!("Playback loop exited");
                })?;
        }

        while let Some(event) = rx_event.recv().await {
            match event {
                LinkEvent::Audio(frame) => {
                    let tag = generation.load(Ordering::SeqCst);
                    if tx_play.send((tag, frame)).is_err() {
                        log::error!("Playback thread gone, ending session");
                        break;
                    }
                }
                LinkEvent::Interruption => {
                    generation.fetch_add(1, Ordering::SeqCst);
                    if let Err(e) = self.audio.interrupt() {
                        log::error!("Failed to interrupt playback: {}", e);
                    }
                }
                LinkEvent::ToolCall {
                    name,
                    call_id,
                    parameters,
                } => {
                    log::info!("Client tool call: {}", name);
                    let outcome = self.tools.dispatch(&name, parameters).await;
                    if let Err(e) = tx_cmd
                        .send(LinkCommand::SendToolResult { call_id, outcome })
                        .await
                    {
                        log::error!("Failed to send tool result: {}", e);
                    }
                }
                LinkEvent::AgentResponse(text) => {
                    log::info!("Agent: {}", text);
                }
                LinkEvent::UserTranscript(text) => {
                    log::info!("You: {}", text);
                }
                LinkEvent::Closed => {
                    log::info!("Session closed");
                    break;
                }
            }
        }

        // Drop the link first so blocked mic sends fail fast, invalidate
        // anything still queued for playback, then tear down the bridge.
        // The playback thread exits on channel close; it is detached here
        // to avoid blocking shutdown on a device write.
        link_task.abort();
        generation.fetch_add(1, Ordering::SeqCst);
        drop(tx_play);
        self.audio.stop();

        Ok(())
    }
}
