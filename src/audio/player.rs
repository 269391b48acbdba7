use serde::Serialize;
use serenity::model::id::{ChannelId, GuildId, UserId};
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Weak,
};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    audio::{
        equalizer::{Bands, EqPreset, EqualizerState},
        queue::{MusicQueue, QueueInfo, QueuePage, RepeatMode},
        track::{Track, TrackBatch},
        transport::{
            EventSink, PlaybackTicket, StopReason, Transport, TransportEvent, TransportFactory,
        },
    },
    config::EngineConfig,
    error::{PlayerError, Result, TransportError, VolumeBound},
    ui::selection::Disambiguator,
};

pub const MAX_VOLUME: u8 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConnectionState {
    Disconnected,
    Connected,
}

/// Quién ejecuta el comando y en qué canal de voz está
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Requester {
    pub user_id: UserId,
    pub voice_channel: Option<ChannelId>,
}

impl Requester {
    pub fn new(user_id: UserId, voice_channel: Option<ChannelId>) -> Self {
        Self {
            user_id,
            voice_channel,
        }
    }
}

/// Resultado de agregar pistas a la cola
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnqueueOutcome {
    pub added: Vec<Track>,
    /// Pista con la que arrancó la reproducción, si estaba detenida
    pub started: Option<Track>,
}

impl EnqueueOutcome {
    /// No se agregó nada: la selección expiró o fue cancelada
    pub fn is_no_choice(&self) -> bool {
        self.added.is_empty()
    }
}

/// Valida un volumen pedido por el usuario antes de aplicarlo
pub fn check_volume(requested: i64) -> Result<u8> {
    if requested < 0 {
        return Err(PlayerError::VolumeOutOfRange {
            requested,
            bound: VolumeBound::TooLow,
        });
    }
    if requested > i64::from(MAX_VOLUME) {
        return Err(PlayerError::VolumeOutOfRange {
            requested,
            bound: VolumeBound::TooHigh,
        });
    }
    Ok(requested as u8)
}

struct PlayerState {
    queue: MusicQueue,
    eq: EqualizerState,
    connection: ConnectionState,
    channel: Option<ChannelId>,
    volume: u8,
    paused: bool,
    /// Ticket de la reproducción en curso; `None` si no suena nada
    now_playing: Option<PlaybackTicket>,
}

/// Reproductor de una guild.
///
/// Owns the queue and equalizer of one guild and drives its transport. All
/// state changes go through one async mutex, so commands and transport
/// notifications for the same guild apply one at a time in arrival order.
/// The only long wait, the track selection prompt, happens outside that lock.
pub struct Session {
    guild_id: GuildId,
    transport: Arc<dyn Transport>,
    events: EventSink,
    disambiguator: Arc<Disambiguator>,
    state: Mutex<PlayerState>,
    /// Las selecciones de una misma guild se atienden de a una
    choice_gate: Mutex<()>,
    /// Se cancela (y se reemplaza) en cada teardown
    lifetime: parking_lot::Mutex<CancellationToken>,
    /// Detiene el worker de eventos cuando la sesión se libera
    shutdown: CancellationToken,
    next_ticket: AtomicU64,
    volume_step: u8,
    page_size: usize,
}

impl Session {
    pub fn new(
        guild_id: GuildId,
        transport: Arc<dyn Transport>,
        events: EventSink,
        disambiguator: Arc<Disambiguator>,
        config: &EngineConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            guild_id,
            transport,
            events,
            disambiguator,
            state: Mutex::new(PlayerState {
                queue: MusicQueue::new(),
                eq: EqualizerState::new(),
                connection: ConnectionState::Disconnected,
                channel: None,
                volume: config.default_volume,
                paused: false,
                now_playing: None,
            }),
            choice_gate: Mutex::new(()),
            lifetime: parking_lot::Mutex::new(CancellationToken::new()),
            shutdown: CancellationToken::new(),
            next_ticket: AtomicU64::new(1),
            volume_step: config.volume_step,
            page_size: config.queue_page_size,
        })
    }

    /// Crea la sesión con su transporte y arranca el worker que consume
    /// los eventos de transporte en orden. Requiere un runtime de tokio.
    pub fn spawn(
        guild_id: GuildId,
        transports: &dyn TransportFactory,
        disambiguator: Arc<Disambiguator>,
        config: &EngineConfig,
    ) -> Arc<Self> {
        let (events, mailbox) = EventSink::channel();
        let transport = transports.create(guild_id, events.clone());
        let session = Self::new(guild_id, transport, events, disambiguator, config);
        spawn_event_worker(Arc::downgrade(&session), session.shutdown.clone(), mailbox);
        session
    }

    pub fn guild_id(&self) -> GuildId {
        self.guild_id
    }

    /// Buzón por el que el transporte notifica el fin de cada pista
    pub fn events(&self) -> &EventSink {
        &self.events
    }

    /// Se une al canal del usuario o, si no está en ninguno, al indicado.
    pub async fn connect(&self, requester: &Requester, requested: Option<ChannelId>) -> Result<ChannelId> {
        let mut state = self.state.lock().await;

        if state.connection == ConnectionState::Connected {
            return Err(PlayerError::AlreadyConnected);
        }

        let channel = requester
            .voice_channel
            .or(requested)
            .ok_or(PlayerError::NoVoiceChannel)?;

        self.transport.join(channel).await?;
        state.connection = ConnectionState::Connected;
        state.channel = Some(channel);
        info!("🔊 Conectado al canal {} en guild {}", channel, self.guild_id);

        // Reaplicar volumen y ecualizador guardados
        if let Err(e) = self.transport.set_volume(state.volume).await {
            warn!("No se pudo aplicar el volumen en guild {}: {}", self.guild_id, e);
        }
        if let Err(e) = self.transport.apply_equalizer(state.eq.bands()).await {
            warn!("No se pudo aplicar el ecualizador en guild {}: {}", self.guild_id, e);
        }

        Ok(channel)
    }

    /// Desconecta y vacía la cola. Llamarla de nuevo no es un error.
    pub async fn teardown(&self) -> Result<()> {
        let expired = std::mem::replace(&mut *self.lifetime.lock(), CancellationToken::new());
        expired.cancel();

        let mut state = self.state.lock().await;
        let destroyed = self.transport.destroy().await;

        state.queue.clear();
        state.connection = ConnectionState::Disconnected;
        state.channel = None;
        state.paused = false;
        state.now_playing = None;

        match destroyed {
            Ok(()) => {
                info!("👋 Sesión cerrada en guild {}", self.guild_id);
                Ok(())
            }
            Err(TransportError::NothingToDestroy) => {
                debug!("Guild {} sin conexión que cerrar", self.guild_id);
                Ok(())
            }
            Err(e) => {
                warn!("Error al cerrar la conexión de guild {}: {}", self.guild_id, e);
                Err(e.into())
            }
        }
    }

    /// Agrega el resultado de una búsqueda a la cola.
    ///
    /// Playlists are appended whole, a single result directly, and several
    /// candidates go through the selection prompt first. Playback starts
    /// with the current track when nothing was playing.
    pub async fn enqueue(&self, requester: &Requester, batch: TrackBatch) -> Result<EnqueueOutcome> {
        if batch.is_empty() {
            return Err(PlayerError::NoTracksFound);
        }

        let lifetime = self.lifetime_token();
        {
            let state = self.state.lock().await;
            Self::require_connected(&state)?;
        }

        let tracks = match batch {
            TrackBatch::Playlist { name, tracks } => {
                info!(
                    "📃 Playlist '{}' con {} canciones",
                    name.as_deref().unwrap_or("sin nombre"),
                    tracks.len()
                );
                tracks
            }
            TrackBatch::Search(candidates) if candidates.len() == 1 => candidates,
            TrackBatch::Search(candidates) => match self.choose(requester, candidates, &lifetime).await {
                Some(track) => vec![track],
                None => return Ok(EnqueueOutcome::default()),
            },
        };

        let mut state = self.state.lock().await;
        if lifetime.is_cancelled() {
            info!("🗑️ Sesión de guild {} cerrada, descartando {} canciones", self.guild_id, tracks.len());
            return Ok(EnqueueOutcome::default());
        }
        Self::require_connected(&state)?;

        state.queue.add(tracks.iter().cloned());

        let started = if state.now_playing.is_none() {
            self.start_playback(&mut state).await?
        } else {
            None
        };

        Ok(EnqueueOutcome {
            added: tracks,
            started,
        })
    }

    /// Comando play: conecta si hace falta y agrega pistas, o reanuda si no se
    /// pasó ninguna búsqueda.
    pub async fn play(&self, requester: &Requester, batch: Option<TrackBatch>) -> Result<Option<EnqueueOutcome>> {
        if self.connection_state().await == ConnectionState::Disconnected {
            match self.connect(requester, None).await {
                Ok(_) | Err(PlayerError::AlreadyConnected) => {}
                Err(e) => return Err(e),
            }
        }

        match batch {
            Some(batch) => self.enqueue(requester, batch).await.map(Some),
            None => {
                let mut state = self.state.lock().await;
                if state.queue.is_empty() {
                    return Err(PlayerError::QueueEmpty);
                }
                self.resume_locked(&mut state).await?;
                Ok(None)
            }
        }
    }

    /// Llamado cuando el transporte termina, se atasca o falla con una pista.
    ///
    /// Notifications for a ticket other than the one currently playing are
    /// stale (duplicate, replaced track, or arrived after teardown) and are
    /// ignored. Returns the track that started playing, if any.
    pub async fn advance_on_external_stop(&self, event: TransportEvent) -> Option<Track> {
        let mut state = self.state.lock().await;

        if state.connection == ConnectionState::Disconnected || state.now_playing != Some(event.ticket) {
            debug!(
                "Notificación obsoleta en guild {}: ticket {} ({:?})",
                self.guild_id,
                event.ticket.id(),
                event.reason
            );
            return None;
        }

        state.now_playing = None;
        state.paused = false;

        match event.reason {
            StopReason::Finished => debug!("Track terminado en guild {}", self.guild_id),
            StopReason::Stuck => warn!("⚠️ Track atascado en guild {}", self.guild_id),
            StopReason::Errored => warn!("❌ Error en track para guild {}", self.guild_id),
        }

        let next = if state.queue.repeat_mode() == RepeatMode::One {
            state.queue.repeat_current()
        } else {
            state.queue.advance()
        };

        match next {
            Ok(Some(track)) => match self.play_track(&mut state, &track).await {
                Ok(()) => Some(track),
                Err(e) => {
                    error!("Error al reproducir siguiente track: {:?}", e);
                    None
                }
            },
            Ok(None) => {
                info!("⏹️ Fin de la cola en guild {}", self.guild_id);
                None
            }
            Err(PlayerError::QueueEmpty) => {
                debug!("Cola vacía para guild {}", self.guild_id);
                None
            }
            Err(e) => {
                error!("Error al avanzar la cola: {:?}", e);
                None
            }
        }
    }

    /// Salta a la siguiente canción
    pub async fn skip(&self) -> Result<Track> {
        let mut state = self.state.lock().await;
        Self::require_connected(&state)?;

        let track = state.queue.skip()?.ok_or(PlayerError::NoMoreTracks)?;
        self.play_track(&mut state, &track).await?;
        Ok(track)
    }

    /// Vuelve a la canción anterior y la reproduce de inmediato
    pub async fn skip_to_previous(&self) -> Result<Track> {
        let mut state = self.state.lock().await;
        Self::require_connected(&state)?;

        let track = state.queue.skip_to_previous()?;
        self.play_track(&mut state, &track).await?;
        Ok(track)
    }

    pub async fn shuffle(&self) -> Result<()> {
        self.state.lock().await.queue.shuffle()
    }

    /// Acepta `none`, `1` o `all`
    pub async fn set_repeat_mode(&self, mode: &str) -> Result<RepeatMode> {
        let mode: RepeatMode = mode.parse()?;
        self.state.lock().await.queue.set_repeat_mode(mode);
        Ok(mode)
    }

    /// Vacía la cola sin tocar lo que está sonando
    pub async fn clear(&self) {
        let mut state = self.state.lock().await;
        if state.now_playing.is_some() {
            state.queue.clear_keeping_current();
        } else {
            state.queue.clear();
        }
    }

    /// Detiene la reproducción y limpia la cola
    pub async fn stop(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        state.queue.clear();
        state.now_playing = None;
        state.paused = false;

        if state.connection == ConnectionState::Connected {
            self.transport.stop().await?;
        }

        info!("⏹️ Reproducción detenida en guild {}", self.guild_id);
        Ok(())
    }

    pub async fn pause(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        Self::require_connected(&state)?;

        if state.paused {
            return Err(PlayerError::PlayerAlreadyPaused);
        }

        self.transport.set_pause(true).await?;
        state.paused = true;
        info!("⏸️ Reproducción pausada en guild {}", self.guild_id);
        Ok(())
    }

    pub async fn resume(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        self.resume_locked(&mut state).await
    }

    /// Ajusta el volumen (`0..=100`)
    pub async fn set_volume(&self, volume: u8) -> Result<u8> {
        if volume > MAX_VOLUME {
            return Err(PlayerError::VolumeOutOfRange {
                requested: i64::from(volume),
                bound: VolumeBound::TooHigh,
            });
        }

        let mut state = self.state.lock().await;
        self.apply_volume(&mut state, volume).await
    }

    pub async fn volume_up(&self) -> Result<u8> {
        let mut state = self.state.lock().await;
        if state.volume >= MAX_VOLUME {
            return Err(PlayerError::MaxVolume);
        }

        let volume = state.volume.saturating_add(self.volume_step).min(MAX_VOLUME);
        self.apply_volume(&mut state, volume).await
    }

    pub async fn volume_down(&self) -> Result<u8> {
        let mut state = self.state.lock().await;
        if state.volume == 0 {
            return Err(PlayerError::MinVolume);
        }

        let volume = state.volume.saturating_sub(self.volume_step);
        self.apply_volume(&mut state, volume).await
    }

    /// Aplica un preset de ecualizador (flat, boost, metal, piano)
    pub async fn apply_eq_preset(&self, name: &str) -> Result<EqPreset> {
        let mut state = self.state.lock().await;
        let mut eq = state.eq;
        let (preset, bands) = eq.apply_preset(name)?;

        if state.connection == ConnectionState::Connected {
            self.transport.apply_equalizer(bands).await?;
        }
        state.eq = eq;
        Ok(preset)
    }

    /// Ajusta una banda por índice (1-15) o frecuencia en Hz; ganancia en dB
    pub async fn set_eq_band(&self, band: u32, gain_db: f32) -> Result<Bands> {
        let mut state = self.state.lock().await;
        let mut eq = state.eq;
        let bands = eq.set_band(band, gain_db)?;

        if state.connection == ConnectionState::Connected {
            self.transport.apply_equalizer(bands).await?;
        }
        state.eq = eq;
        Ok(bands)
    }

    /// Vuelve el ecualizador a plano
    pub async fn reset_equalizer(&self) -> Result<Bands> {
        let mut state = self.state.lock().await;
        let mut eq = state.eq;
        eq.reset();

        if state.connection == ConnectionState::Connected {
            self.transport.apply_equalizer(eq.bands()).await?;
        }
        state.eq = eq;
        info!("🎛️ Ecualizador reiniciado en guild {}", self.guild_id);
        Ok(eq.bands())
    }

    pub async fn equalizer(&self) -> Bands {
        self.state.lock().await.eq.bands()
    }

    pub async fn connection_state(&self) -> ConnectionState {
        self.state.lock().await.connection
    }

    pub async fn channel(&self) -> Option<ChannelId> {
        self.state.lock().await.channel
    }

    pub async fn volume(&self) -> u8 {
        self.state.lock().await.volume
    }

    pub async fn is_playing(&self) -> bool {
        self.state.lock().await.now_playing.is_some()
    }

    pub async fn is_paused(&self) -> bool {
        self.state.lock().await.paused
    }

    pub async fn repeat_mode(&self) -> RepeatMode {
        self.state.lock().await.queue.repeat_mode()
    }

    /// Obtiene el track actual
    pub async fn now_playing(&self) -> Result<Option<Track>> {
        Ok(self.state.lock().await.queue.current_track()?.cloned())
    }

    /// Página `page` (desde 1) de las próximas canciones
    pub async fn queue_page(&self, page: usize) -> Result<QueuePage> {
        Ok(self.queue_info().await?.upcoming_page(page, self.page_size))
    }

    /// Obtiene información de la cola
    pub async fn queue_info(&self) -> Result<QueueInfo> {
        let state = self.state.lock().await;
        if state.queue.is_empty() {
            return Err(PlayerError::QueueEmpty);
        }
        Ok(state.queue.info())
    }

    /// Desconectada y sin nadie esperando el estado
    pub(crate) fn is_idle(&self) -> bool {
        match self.state.try_lock() {
            Ok(state) => state.connection == ConnectionState::Disconnected,
            Err(_) => false,
        }
    }

    // Funciones privadas

    fn lifetime_token(&self) -> CancellationToken {
        self.lifetime.lock().clone()
    }

    fn require_connected(state: &PlayerState) -> Result<()> {
        match state.connection {
            ConnectionState::Connected => Ok(()),
            ConnectionState::Disconnected => Err(PlayerError::NoVoiceChannel),
        }
    }

    async fn choose(&self, requester: &Requester, candidates: Vec<Track>, lifetime: &CancellationToken) -> Option<Track> {
        let _turn = tokio::select! {
            _ = lifetime.cancelled() => return None,
            turn = self.choice_gate.lock() => turn,
        };

        self.disambiguator
            .choose(self.guild_id, requester.user_id, candidates, lifetime)
            .await
    }

    async fn start_playback(&self, state: &mut PlayerState) -> Result<Option<Track>> {
        let Some(track) = state.queue.current_track()?.cloned() else {
            return Ok(None);
        };

        self.play_track(state, &track).await?;
        Ok(Some(track))
    }

    async fn play_track(&self, state: &mut PlayerState, track: &Track) -> Result<()> {
        let ticket = PlaybackTicket(self.next_ticket.fetch_add(1, Ordering::Relaxed));
        self.transport.play(track, ticket).await?;

        state.now_playing = Some(ticket);
        state.paused = false;
        info!("🎵 Reproduciendo: {} en guild {}", track.title, self.guild_id);
        Ok(())
    }

    async fn resume_locked(&self, state: &mut PlayerState) -> Result<()> {
        Self::require_connected(state)?;

        if !state.paused {
            return Err(PlayerError::PlayerNotPaused);
        }

        self.transport.set_pause(false).await?;
        state.paused = false;
        info!("▶️ Reproducción reanudada en guild {}", self.guild_id);
        Ok(())
    }

    async fn apply_volume(&self, state: &mut PlayerState, volume: u8) -> Result<u8> {
        if state.connection == ConnectionState::Connected {
            self.transport.set_volume(volume).await?;
        }
        state.volume = volume;
        info!("🔊 Volumen ajustado a {}% en guild {}", volume, self.guild_id);
        Ok(volume)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Consume el buzón de eventos de una sesión, uno a la vez
fn spawn_event_worker(
    session: Weak<Session>,
    shutdown: CancellationToken,
    mailbox: flume::Receiver<TransportEvent>,
) {
    tokio::spawn(async move {
        loop {
            let event = tokio::select! {
                _ = shutdown.cancelled() => break,
                received = mailbox.recv_async() => match received {
                    Ok(event) => event,
                    Err(_) => break,
                },
            };

            let Some(session) = session.upgrade() else {
                break;
            };
            session.advance_on_external_stop(event).await;
        }
        debug!("Worker de eventos finalizado");
    });
}
