use serde::{Deserialize, Serialize};
use std::{fmt, time::Duration};

/// Pista resuelta por el servicio de búsqueda.
///
/// The engine never looks past these three fields; everything else about the
/// track belongs to the transport that plays it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    /// URL o identificador que entiende el transporte
    pub identifier: String,
    pub title: String,
    pub duration: Duration,
}

impl Track {
    pub fn new(identifier: impl Into<String>, title: impl Into<String>, duration: Duration) -> Self {
        Self {
            identifier: identifier.into(),
            title: title.into(),
            duration,
        }
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.duration.as_secs();
        write!(f, "{} ({}:{:02})", self.title, secs / 60, secs % 60)
    }
}

/// Resultado de una búsqueda de pistas
#[derive(Debug, Clone, PartialEq)]
pub enum TrackBatch {
    /// Playlist completa: se agrega sin preguntar
    Playlist { name: Option<String>, tracks: Vec<Track> },
    /// Candidatos individuales: con más de uno hay que elegir
    Search(Vec<Track>),
}

impl TrackBatch {
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Playlist { tracks, .. } => tracks.len(),
            Self::Search(tracks) => tracks.len(),
        }
    }
}
