//! Transporte de producción sobre songbird.
//!
//! Joins and leaves go through the shared [`Songbird`] manager, tracks are
//! streamed with `yt-dlp` through songbird's [`YoutubeDl`] input and every
//! track handle reports its end back to the owning session.

use async_trait::async_trait;
use parking_lot::Mutex;
use serenity::model::id::{ChannelId, GuildId};
use songbird::{
    error::JoinError,
    input::{Input, YoutubeDl},
    tracks::{ControlError, TrackHandle},
    Call, Songbird,
};
use std::sync::Arc;
use tracing::{debug, info};

use crate::{
    audio::{
        equalizer::{Bands, BAND_COUNT},
        player::MAX_VOLUME,
        track::Track,
        transport::{EventSink, PlaybackTicket, Transport, TransportFactory},
    },
    bot::events::register_track_events,
    error::TransportError,
};

pub struct SongbirdTransport {
    guild_id: GuildId,
    manager: Arc<Songbird>,
    http: reqwest::Client,
    events: EventSink,
    current: Mutex<Option<TrackHandle>>,
    volume: Mutex<f32>,
    /// Songbird no tiene etapa de ecualización: solo se registra
    equalizer: Mutex<Bands>,
}

impl SongbirdTransport {
    pub fn new(guild_id: GuildId, manager: Arc<Songbird>, http: reqwest::Client, events: EventSink) -> Self {
        Self {
            guild_id,
            manager,
            http,
            events,
            current: Mutex::new(None),
            volume: Mutex::new(1.0),
            equalizer: Mutex::new([0.0; BAND_COUNT]),
        }
    }

    /// Último vector de ganancias recibido
    pub fn equalizer(&self) -> Bands {
        *self.equalizer.lock()
    }

    fn call(&self) -> Result<Arc<tokio::sync::Mutex<Call>>, TransportError> {
        self.manager.get(self.guild_id).ok_or(TransportError::NotConnected)
    }

    fn current(&self) -> Option<TrackHandle> {
        self.current.lock().clone()
    }
}

fn playback_error(e: ControlError) -> TransportError {
    TransportError::Playback(e.to_string())
}

#[async_trait]
impl Transport for SongbirdTransport {
    async fn join(&self, channel: ChannelId) -> Result<(), TransportError> {
        self.manager
            .join(self.guild_id, channel)
            .await
            .map_err(|e| TransportError::Join(e.to_string()))?;

        info!("🔊 Conectado al canal de voz en guild {}", self.guild_id);
        Ok(())
    }

    async fn play(&self, track: &Track, ticket: PlaybackTicket) -> Result<(), TransportError> {
        let call = self.call()?;
        let input: Input = YoutubeDl::new(self.http.clone(), track.identifier.clone()).into();

        let handle = {
            let mut handler_lock = call.lock().await;
            handler_lock.play_only_input(input)
        };

        let volume = *self.volume.lock();
        handle.set_volume(volume).map_err(playback_error)?;
        register_track_events(&handle, self.events.clone(), ticket).map_err(playback_error)?;

        *self.current.lock() = Some(handle);
        debug!("Track {} lanzado en guild {}", ticket.id(), self.guild_id);
        Ok(())
    }

    async fn stop(&self) -> Result<(), TransportError> {
        let handle = self.current.lock().take();
        match handle {
            Some(handle) => handle.stop().map_err(playback_error),
            None => Ok(()),
        }
    }

    async fn set_pause(&self, paused: bool) -> Result<(), TransportError> {
        let Some(handle) = self.current() else {
            debug!("Sin track activo en guild {}", self.guild_id);
            return Ok(());
        };

        if paused {
            handle.pause().map_err(playback_error)
        } else {
            handle.play().map_err(playback_error)
        }
    }

    async fn set_volume(&self, volume: u8) -> Result<(), TransportError> {
        let volume = f32::from(volume.min(MAX_VOLUME)) / f32::from(MAX_VOLUME);
        *self.volume.lock() = volume;

        match self.current() {
            Some(handle) => handle.set_volume(volume).map_err(playback_error),
            None => Ok(()),
        }
    }

    async fn apply_equalizer(&self, bands: Bands) -> Result<(), TransportError> {
        *self.equalizer.lock() = bands;
        debug!("🎛️ Ecualizador registrado para guild {}: {:?}", self.guild_id, bands);
        Ok(())
    }

    async fn destroy(&self) -> Result<(), TransportError> {
        self.current.lock().take();

        match self.manager.remove(self.guild_id).await {
            Ok(()) => {
                info!("👋 Desconectado del canal de voz en guild {}", self.guild_id);
                Ok(())
            }
            Err(JoinError::NoCall) => Err(TransportError::NothingToDestroy),
            Err(e) => Err(TransportError::Join(e.to_string())),
        }
    }
}

/// Crea un [`SongbirdTransport`] por guild, compartiendo manager y cliente HTTP
#[derive(Clone)]
pub struct SongbirdTransportFactory {
    manager: Arc<Songbird>,
    http: reqwest::Client,
}

impl SongbirdTransportFactory {
    pub fn new(manager: Arc<Songbird>, http: reqwest::Client) -> Self {
        Self { manager, http }
    }
}

impl TransportFactory for SongbirdTransportFactory {
    fn create(&self, guild_id: GuildId, events: EventSink) -> Arc<dyn Transport> {
        Arc::new(SongbirdTransport::new(
            guild_id,
            self.manager.clone(),
            self.http.clone(),
            events,
        ))
    }
}
