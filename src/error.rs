//! Error types for the session engine.
//!
//! Every core operation returns a typed [`PlayerError`]. None of them are
//! fatal: the command layer matches on the variant and picks the message it
//! shows to the user.

use thiserror::Error;

/// Which side of the `0..=100` volume range was violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeBound {
    TooLow,
    TooHigh,
}

/// Rejected operation on a session, its queue or its equalizer.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlayerError {
    #[error("La cola está vacía")]
    QueueEmpty,

    #[error("No se encontraron canciones")]
    NoTracksFound,

    #[error("No hay más canciones en la cola")]
    NoMoreTracks,

    #[error("No hay canciones anteriores")]
    NoPreviousTracks,

    #[error("Modo de repetición inválido: '{0}' (use none, 1 o all)")]
    InvalidRepeatMode(String),

    #[error("Ya está conectado a un canal de voz")]
    AlreadyConnected,

    #[error("No hay un canal de voz disponible")]
    NoVoiceChannel,

    #[error("La reproducción ya está pausada")]
    PlayerAlreadyPaused,

    #[error("La reproducción no está pausada")]
    PlayerNotPaused,

    #[error("Volumen fuera de rango: {requested}% (debe estar entre 0 y 100)")]
    VolumeOutOfRange { requested: i64, bound: VolumeBound },

    #[error("El volumen ya está al máximo")]
    MaxVolume,

    #[error("El volumen ya está al mínimo")]
    MinVolume,

    #[error("Preset de ecualizador desconocido: '{0}'")]
    InvalidEqPreset(String),

    #[error("La banda {0} no existe en el ecualizador de 15 bandas")]
    NonExistentEqBand(u32),

    #[error("Ganancia fuera de rango: {0} dB (debe estar entre -10 y +10)")]
    EqGainOutOfBounds(f32),

    #[error("No se encontró la letra de la canción")]
    NoLyricsFound,

    #[error("Error de transporte: {0}")]
    Transport(#[from] TransportError),
}

/// Failure reported by the audio transport collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// There was no voice connection to tear down.
    #[error("No hay conexión que destruir")]
    NothingToDestroy,

    #[error("El transporte no está conectado")]
    NotConnected,

    #[error("Error al unirse al canal de voz: {0}")]
    Join(String),

    #[error("Error de reproducción: {0}")]
    Playback(String),
}

pub type Result<T, E = PlayerError> = std::result::Result<T, E>;
