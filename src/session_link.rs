//! WebSocket link to the conversational service.
//!
//! One socket, one session: the remote side owns speech recognition,
//! turn-taking, and synthesis; this side forwards microphone frames up
//! and surfaces decoded events to the conversation driver. When the
//! server closes or the connection drops, `Closed` is reported and the
//! link returns — the audio bridge is single-use, so there is no
//! reconnect.

use anyhow::{Context, Result};
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use url::Url;

use crate::config::Config;
use crate::protocol::{
    ClientToolResult, ConversationInitiation, Pong, ServerEvent, UserAudioChunk,
};

/// Events surfaced to the conversation driver.
#[derive(Debug)]
pub enum LinkEvent {
    /// One synthesized PCM frame from the agent.
    Audio(Vec<u8>),
    /// The user barged in; playback must be cut immediately.
    Interruption,
    /// The agent invoked a client tool.
    ToolCall {
        name: String,
        call_id: String,
        parameters: Value,
    },
    AgentResponse(String),
    UserTranscript(String),
    /// The session socket is gone (server close or error).
    Closed,
}

/// Commands sent down the link.
#[derive(Debug)]
pub enum LinkCommand {
    SendAudio(Bytes),
    SendToolResult {
        call_id: String,
        outcome: Result<Value, String>,
    },
}

#[derive(Deserialize)]
struct SignedUrlResponse {
    signed_url: String,
}

pub struct SessionLink {
    config: Config,
    tx: mpsc::Sender<LinkEvent>,
    rx_cmd: mpsc::Receiver<LinkCommand>,
}

impl SessionLink {
    pub fn new(
        config: Config,
        tx: mpsc::Sender<LinkEvent>,
        rx_cmd: mpsc::Receiver<LinkCommand>,
    ) -> Self {
        Self { config, tx, rx_cmd }
    }

    /// Run the session to completion.
    pub async fn run(mut self) {
        if let Err(e) = self.connect_and_loop().await {
            log::error!("Session link error: {}", e);
        }
        let _ = self.tx.send(LinkEvent::Closed).await;
    }

    /// Resolve the WebSocket endpoint. Agents behind auth get a
    /// short-lived signed URL from the REST API; public agents connect
    /// directly with the agent id as a query parameter.
    async fn session_url(&self) -> Result<String> {
        let Some(api_key) = &self.config.api_key else {
            let mut url = Url::parse(&self.config.ws_url)?;
            url.query_pairs_mut()
                .append_pair("agent_id", &self.config.agent_id);
            return Ok(url.to_string());
        };

        let endpoint = format!(
            "{}/v1/convai/conversation/get_signed_url?agent_id={}",
            self.config.api_url, self.config.agent_id
        );
        let response = reqwest::Client::new()
            .get(&endpoint)
            .header("xi-api-key", api_key)
            .send()
            .await
            .context("Signed URL request failed")?;
        if !response.status().is_success() {
            anyhow::bail!("Signed URL request failed: HTTP {}", response.status());
        }
        let parsed: SignedUrlResponse = response
            .json()
            .await
            .context("Invalid signed URL response")?;
        Ok(parsed.signed_url)
    }

    async fn connect_and_loop(&mut self) -> Result<()> {
        let url = self.session_url().await?;

        log::info!("Connecting to conversational session...");
        let (ws_stream, _) = connect_async(url.as_str())
            .await
            .context("WebSocket connect failed")?;
        log::info!("Connected");

        let (mut write, mut read) = ws_stream.split();

        // Kick the session off before anything else flows.
        let init = serde_json::to_string(&ConversationInitiation::default())?;
        write.send(Message::Text(init.into())).await?;

        loop {
            tokio::select! {
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            let event: ServerEvent = match serde_json::from_str(&text) {
                                Ok(event) => event,
                                Err(e) => {
                                    log::warn!("Undecodable server message: {}", e);
                                    continue;
                                }
                            };
                            if let Some(reply) = self.handle_event(event).await? {
                                write.send(Message::Text(reply.into())).await?;
                            }
                        }
                        Some(Ok(Message::Close(frame))) => {
                            log::info!("Server closed session: {:?}", frame);
                            return Ok(());
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => return Err(e.into()),
                        None => return Ok(()),
                    }
                }
                cmd = self.rx_cmd.recv() => {
                    match cmd {
                        Some(LinkCommand::SendAudio(frame)) => {
                            let chunk = UserAudioChunk::from_pcm(&frame);
                            write.send(Message::Text(serde_json::to_string(&chunk)?.into())).await?;
                        }
                        Some(LinkCommand::SendToolResult { call_id, outcome }) => {
                            let result = ClientToolResult::new(call_id, outcome);
                            write.send(Message::Text(serde_json::to_string(&result)?.into())).await?;
                        }
                        // Driver gone: shut the session down.
                        None => return Ok(()),
                    }
                }
            }
        }
    }

    /// Route one decoded server event; pings are answered inline and the
    /// reply is returned for the caller to send.
    async fn handle_event(&self, event: ServerEvent) -> Result<Option<String>> {
        match event {
            ServerEvent::Ping { ping_event } => {
                let pong = Pong::new(ping_event.event_id);
                return Ok(Some(serde_json::to_string(&pong)?));
            }
            ServerEvent::ConversationInitiationMetadata {
                conversation_initiation_metadata_event: meta,
            } => {
                log::info!("Conversation started: {}", meta.conversation_id);
            }
            ServerEvent::Audio { audio_event } => {
                let pcm = audio_event.decode_pcm().context("Invalid audio payload")?;
                self.tx.send(LinkEvent::Audio(pcm)).await?;
            }
            ServerEvent::Interruption { interruption_event } => {
                log::info!(
                    "Interruption: {}",
                    interruption_event.reason.as_deref().unwrap_or("unknown")
                );
                self.tx.send(LinkEvent::Interruption).await?;
            }
            ServerEvent::ClientToolCall { client_tool_call } => {
                self.tx
                    .send(LinkEvent::ToolCall {
                        name: client_tool_call.tool_name,
                        call_id: client_tool_call.tool_call_id,
                        parameters: client_tool_call.parameters,
                    })
                    .await?;
            }
            ServerEvent::AgentResponse {
                agent_response_event,
            } => {
                self.tx
                    .send(LinkEvent::AgentResponse(agent_response_event.agent_response))
                    .await?;
            }
            ServerEvent::UserTranscript {
                user_transcription_event,
            } => {
                self.tx
                    .send(LinkEvent::UserTranscript(
                        user_transcription_event.user_transcript,
                    ))
                    .await?;
            }
            ServerEvent::Unknown => {}
        }
        Ok(None)
    }
}
