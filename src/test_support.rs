//! Dobles de prueba compartidos por los tests unitarios.

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use serenity::model::id::{ChannelId, GuildId, UserId};
use std::{
    sync::atomic::{AtomicBool, Ordering},
    time::Duration,
};

use crate::{
    audio::{
        equalizer::Bands,
        player::Requester,
        track::Track,
        transport::{PlaybackTicket, Transport},
    },
    error::TransportError,
    ui::selection::{ChoicePresenter, ChoicePrompt, PromptId},
};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Join(ChannelId),
    Play(String, PlaybackTicket),
    Stop,
    Pause(bool),
    Volume(u8),
    Equalizer(Bands),
    Destroy,
}

/// Transporte que solo anota las llamadas recibidas
#[derive(Default)]
pub struct RecordingTransport {
    calls: Mutex<Vec<Call>>,
    joined: AtomicBool,
}

impl RecordingTransport {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn played(&self) -> Vec<String> {
        self.plays().into_iter().map(|(id, _)| id).collect()
    }

    pub fn tickets(&self) -> Vec<PlaybackTicket> {
        self.plays().into_iter().map(|(_, ticket)| ticket).collect()
    }

    pub fn last_ticket(&self) -> Option<PlaybackTicket> {
        self.tickets().last().copied()
    }

    fn plays(&self) -> Vec<(String, PlaybackTicket)> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                Call::Play(id, ticket) => Some((id.clone(), *ticket)),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().push(call);
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn join(&self, channel: ChannelId) -> Result<(), TransportError> {
        self.joined.store(true, Ordering::SeqCst);
        self.record(Call::Join(channel));
        Ok(())
    }

    async fn play(&self, track: &Track, ticket: PlaybackTicket) -> Result<(), TransportError> {
        self.record(Call::Play(track.identifier.clone(), ticket));
        Ok(())
    }

    async fn stop(&self) -> Result<(), TransportError> {
        self.record(Call::Stop);
        Ok(())
    }

    async fn set_pause(&self, paused: bool) -> Result<(), TransportError> {
        self.record(Call::Pause(paused));
        Ok(())
    }

    async fn set_volume(&self, volume: u8) -> Result<(), TransportError> {
        self.record(Call::Volume(volume));
        Ok(())
    }

    async fn apply_equalizer(&self, bands: Bands) -> Result<(), TransportError> {
        self.record(Call::Equalizer(bands));
        Ok(())
    }

    async fn destroy(&self) -> Result<(), TransportError> {
        self.record(Call::Destroy);
        if self.joined.swap(false, Ordering::SeqCst) {
            Ok(())
        } else {
            Err(TransportError::NothingToDestroy)
        }
    }
}

/// Presentador que reenvía cada prompt por un canal, si lo hay
#[derive(Default)]
pub struct ScriptedPresenter {
    prompts: Mutex<Option<flume::Sender<ChoicePrompt>>>,
}

impl ScriptedPresenter {
    pub fn with_feed() -> (Self, flume::Receiver<ChoicePrompt>) {
        let (tx, rx) = flume::unbounded();
        let presenter = Self {
            prompts: Mutex::new(Some(tx)),
        };
        (presenter, rx)
    }
}

#[async_trait]
impl ChoicePresenter for ScriptedPresenter {
    async fn present(&self, prompt: &ChoicePrompt) -> Result<()> {
        if let Some(tx) = self.prompts.lock().as_ref() {
            let _ = tx.send(prompt.clone());
        }
        Ok(())
    }

    async fn discard(&self, _prompt: PromptId) {}
}

pub fn guild() -> GuildId {
    GuildId::new(1)
}

pub fn requester(voice_channel: Option<u64>) -> Requester {
    Requester::new(UserId::new(7), voice_channel.map(ChannelId::new))
}

pub fn track(id: &str) -> Track {
    Track::new(id, id.to_uppercase(), Duration::from_secs(180))
}

pub fn tracks(ids: &[&str]) -> Vec<Track> {
    ids.iter().map(|id| track(id)).collect()
}
