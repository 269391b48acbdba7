//! # Bot Module
//!
//! Process-wide entry point that routes every external event to the session of
//! its guild.
//!
//! ## Architecture
//!
//! The [`SessionRegistry`] is created once at startup and handed by reference
//! to every collaborator that produces events:
//!
//! - Command layer: [`SessionRegistry::get_or_create`] then the session API
//! - Transport engine: [`SessionRegistry::route`] with a [`TransportEvent`]
//! - Voice presence: [`SessionRegistry::on_voice_departure`]
//! - Presentation layer: [`SessionRegistry::signal_choice`] for selections
//!
//! Sessions of different guilds share nothing but the registry map, so one
//! guild never waits on another.

use dashmap::DashMap;
use serenity::model::id::GuildId;
use std::sync::Arc;
use tracing::{debug, info};

pub mod events;

use crate::{
    audio::{
        player::Session,
        transport::{TransportEvent, TransportFactory},
    },
    config::EngineConfig,
    error::Result,
    ui::selection::{ChoicePresenter, ChoiceSignal, Disambiguator},
};
use events::VoiceDeparture;

/// Registro de sesiones por guild.
///
/// ## Thread Safety
///
/// - [`DashMap`] for concurrent lookup and lazy insertion by guild
/// - [`Arc`] so callers keep using a session while it is removed
/// - Each [`Session`] serializes its own state
pub struct SessionRegistry {
    config: Arc<EngineConfig>,
    transports: Arc<dyn TransportFactory>,
    disambiguator: Arc<Disambiguator>,
    sessions: DashMap<GuildId, Arc<Session>>,
}

impl SessionRegistry {
    pub fn new(
        config: EngineConfig,
        transports: Arc<dyn TransportFactory>,
        presenter: Arc<dyn ChoicePresenter>,
    ) -> Self {
        info!("{}", config.summary());

        let disambiguator = Arc::new(Disambiguator::new(presenter, config.choice_timeout));
        Self {
            config: Arc::new(config),
            transports,
            disambiguator,
            sessions: DashMap::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Obtiene la sesión de la guild, creándola si no existe.
    /// Debe llamarse dentro de un runtime de tokio.
    pub fn get_or_create(&self, guild_id: GuildId) -> Arc<Session> {
        self.sessions
            .entry(guild_id)
            .or_insert_with(|| {
                info!("🆕 Nueva sesión para guild {}", guild_id);
                Session::spawn(
                    guild_id,
                    self.transports.as_ref(),
                    self.disambiguator.clone(),
                    &self.config,
                )
            })
            .clone()
    }

    pub fn get(&self, guild_id: GuildId) -> Option<Arc<Session>> {
        self.sessions.get(&guild_id).map(|session| session.clone())
    }

    /// Número de sesiones activas
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Cierra la sesión y la quita del registro. Sin sesión no hace nada.
    ///
    /// The entry stays in the map while the transport is destroyed, so a
    /// concurrent `get_or_create` gets this same session and its `connect`
    /// queues behind the teardown. The entry is removed afterwards only if
    /// it is still this session and nobody started using it again.
    pub async fn teardown(&self, guild_id: GuildId) -> Result<()> {
        let Some(session) = self.get(guild_id) else {
            debug!("Guild {} sin sesión que cerrar", guild_id);
            return Ok(());
        };

        let result = session.teardown().await;
        let removed = self
            .sessions
            .remove_if(&guild_id, |_, current| Arc::ptr_eq(current, &session) && current.is_idle());
        if removed.is_none() {
            debug!("Guild {} volvió a usarse durante el cierre, se conserva la sesión", guild_id);
        }
        result
    }

    /// Entrega un evento de transporte al buzón de la sesión.
    /// Devuelve `false` si la guild no tiene sesión.
    pub fn route(&self, guild_id: GuildId, event: TransportEvent) -> bool {
        match self.get(guild_id) {
            Some(session) => session.events().notify(event),
            None => {
                debug!(
                    "Evento {:?} para guild {} sin sesión, ignorado",
                    event.reason, guild_id
                );
                false
            }
        }
    }

    /// Cierra la sesión cuando el último oyente humano abandona el canal.
    /// Devuelve `true` si hubo teardown.
    pub async fn on_voice_departure(&self, guild_id: GuildId, departure: VoiceDeparture) -> Result<bool> {
        if !departure.leaves_channel_empty() || !self.sessions.contains_key(&guild_id) {
            return Ok(false);
        }

        info!("👤 Canal de voz vacío en guild {}, cerrando sesión", guild_id);
        self.teardown(guild_id).await?;
        Ok(true)
    }

    /// Entrega la elección de un usuario al prompt que la espera
    pub fn signal_choice(&self, signal: ChoiceSignal) -> bool {
        self.disambiguator.signal(signal)
    }

    /// Prompts de selección esperando respuesta en todas las guilds
    pub fn pending_choices(&self) -> usize {
        self.disambiguator.pending()
    }
}
