//! # Open Music Sessions
//!
//! Multi-guild playback engine behind the Open Music bot: one [`Session`] per
//! guild with its queue, repeat mode and equalizer, a timed track selection
//! prompt, and the [`SessionRegistry`] that routes every external event to the
//! right session.
//!
//! Discord-facing layers (command parsing, embeds, buttons) live outside this
//! crate and talk to it through [`SessionRegistry`], [`Transport`] and
//! [`ChoicePresenter`].

use tracing::info;
use tracing_subscriber::EnvFilter;

pub mod audio;
pub mod bot;
pub mod config;
pub mod error;
pub mod ui;

#[cfg(test)]
mod test_support;

pub use audio::{
    equalizer::{EqPreset, EqualizerState},
    player::{check_volume, ConnectionState, EnqueueOutcome, Requester, Session},
    queue::{MusicQueue, QueueInfo, QueuePage, RepeatMode},
    track::{Track, TrackBatch},
    transport::{EventSink, PlaybackTicket, StopReason, Transport, TransportEvent, TransportFactory},
    voice::{SongbirdTransport, SongbirdTransportFactory},
};
pub use bot::{events::VoiceDeparture, SessionRegistry};
pub use config::EngineConfig;
pub use error::{PlayerError, TransportError, VolumeBound};
pub use ui::selection::{ChoicePresenter, ChoicePrompt, ChoiceSignal, Disambiguator, PromptId};

/// Inicializa el logging.
///
/// `RUST_LOG` wins when set; otherwise the configured filter applies.
/// Fails instead of panicking if a global subscriber is already installed.
pub fn init_tracing(config: &EngineConfig) -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.log_filter)?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!("No se pudo inicializar el logging: {}", e))?;

    info!("🎵 Iniciando Open Music Sessions v{}", env!("CARGO_PKG_VERSION"));
    Ok(())
}
