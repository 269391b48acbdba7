//! Narrow interface to the audio transport that actually streams tracks.
//!
//! A session owns one [`Transport`] handle and never sees anything beyond
//! these calls. In the other direction the transport reports the end of a
//! track through the [`EventSink`] it was created with.

use async_trait::async_trait;
use serenity::model::id::{ChannelId, GuildId};
use std::sync::Arc;
use tracing::debug;

use crate::{
    audio::{equalizer::Bands, track::Track},
    error::TransportError,
};

/// Identifica una reproducción concreta.
///
/// Every call to [`Transport::play`] gets a fresh ticket and the transport
/// echoes it back when that playback stops. Notifications carrying an old
/// ticket are ignored by the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlaybackTicket(pub(crate) u64);

impl PlaybackTicket {
    pub fn id(self) -> u64 {
        self.0
    }
}

/// Motivo por el que el transporte detuvo una pista
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Finished,
    Stuck,
    Errored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportEvent {
    pub ticket: PlaybackTicket,
    pub reason: StopReason,
}

/// Buzón ordenado de eventos de transporte de una sesión
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: flume::Sender<TransportEvent>,
}

impl EventSink {
    pub fn channel() -> (Self, flume::Receiver<TransportEvent>) {
        let (tx, rx) = flume::unbounded();
        (Self { tx }, rx)
    }

    /// Entrega un evento. Devuelve `false` si la sesión ya no existe.
    pub fn notify(&self, event: TransportEvent) -> bool {
        if self.tx.send(event).is_err() {
            debug!("Evento {:?} descartado: la sesión ya no existe", event);
            return false;
        }
        true
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    /// Se une al canal de voz indicado
    async fn join(&self, channel: ChannelId) -> Result<(), TransportError>;

    /// Reproduce la pista, reemplazando lo que estuviera sonando
    async fn play(&self, track: &Track, ticket: PlaybackTicket) -> Result<(), TransportError>;

    async fn stop(&self) -> Result<(), TransportError>;

    async fn set_pause(&self, paused: bool) -> Result<(), TransportError>;

    /// Volumen en porcentaje (`0..=100`)
    async fn set_volume(&self, volume: u8) -> Result<(), TransportError>;

    async fn apply_equalizer(&self, bands: Bands) -> Result<(), TransportError>;

    /// Abandona el canal y libera la conexión.
    /// [`TransportError::NothingToDestroy`] si no había ninguna.
    async fn destroy(&self) -> Result<(), TransportError>;
}

/// Crea el transporte de cada sesión nueva
pub trait TransportFactory: Send + Sync {
    fn create(&self, guild_id: GuildId, events: EventSink) -> Arc<dyn Transport>;
}

impl<F> TransportFactory for F
where
    F: Fn(GuildId, EventSink) -> Arc<dyn Transport> + Send + Sync,
{
    fn create(&self, guild_id: GuildId, events: EventSink) -> Arc<dyn Transport> {
        self(guild_id, events)
    }
}
