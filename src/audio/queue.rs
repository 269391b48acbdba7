use rand::{seq::SliceRandom, Rng};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr, time::Duration};
use tracing::{debug, info};

use crate::{
    audio::track::Track,
    error::{PlayerError, Result},
};

/// Modo de repetición de la cola.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RepeatMode {
    #[default]
    #[serde(rename = "none")]
    None,
    #[serde(rename = "1")]
    One,
    #[serde(rename = "all")]
    All,
}

impl FromStr for RepeatMode {
    type Err = PlayerError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "none" => Ok(Self::None),
            "1" => Ok(Self::One),
            "all" => Ok(Self::All),
            other => Err(PlayerError::InvalidRepeatMode(other.to_string())),
        }
    }
}

impl fmt::Display for RepeatMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::None => "none",
            Self::One => "1",
            Self::All => "all",
        })
    }
}

/// Cola de reproducción con cursor.
///
/// `items` keeps every track ever added, in playback order. `position`
/// points at the current track and ranges over `0..=len`: `len` means the
/// queue is exhausted. History, current and upcoming are always slices of
/// `items`, so `history ++ [current] ++ upcoming == items` holds by
/// construction.
#[derive(Debug, Default)]
pub struct MusicQueue {
    items: Vec<Track>,
    position: usize,
    repeat_mode: RepeatMode,
}

impl MusicQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Agrega pistas al final de la cola sin mover el cursor
    pub fn add(&mut self, tracks: impl IntoIterator<Item = Track>) -> usize {
        let before = self.items.len();
        self.items.extend(tracks);
        let added = self.items.len() - before;
        info!("➕ Agregadas {} canciones a la cola", added);
        added
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn repeat_mode(&self) -> RepeatMode {
        self.repeat_mode
    }

    pub fn items(&self) -> &[Track] {
        &self.items
    }

    /// Track actual. `Ok(None)` cuando la cola ya se agotó.
    pub fn current_track(&self) -> Result<Option<&Track>> {
        self.ensure_not_empty()?;
        Ok(self.items.get(self.position))
    }

    pub fn history(&self) -> Result<&[Track]> {
        self.ensure_not_empty()?;
        Ok(&self.items[..self.position.min(self.items.len())])
    }

    pub fn upcoming(&self) -> Result<&[Track]> {
        self.ensure_not_empty()?;
        Ok(&self.items[(self.position + 1).min(self.items.len())..])
    }

    /// Avanza el cursor y devuelve la siguiente pista.
    ///
    /// Past the last index the queue wraps to the start in `All` mode and
    /// otherwise parks at `len`, returning `None` on every later call.
    pub fn advance(&mut self) -> Result<Option<Track>> {
        self.ensure_not_empty()?;

        if self.position + 1 < self.items.len() {
            self.position += 1;
            debug!("➡️ Siguiente en cola: posición {}", self.position);
            return Ok(Some(self.items[self.position].clone()));
        }

        if self.repeat_mode == RepeatMode::All {
            self.position = 0;
            info!("🔁 Fin de la cola, volviendo al inicio");
            return Ok(Some(self.items[0].clone()));
        }

        self.position = self.items.len();
        info!("📭 Cola agotada, no hay siguiente track");
        Ok(None)
    }

    /// Devuelve la pista actual sin mover el cursor (modo repetir una)
    pub fn repeat_current(&self) -> Result<Option<Track>> {
        Ok(self.current_track()?.cloned())
    }

    /// Salta a la siguiente pista; falla si no hay ninguna pendiente
    pub fn skip(&mut self) -> Result<Option<Track>> {
        if self.upcoming()?.is_empty() {
            return Err(PlayerError::NoMoreTracks);
        }
        self.advance()
    }

    /// Retrocede una pista y la devuelve para reproducirla de inmediato
    pub fn skip_to_previous(&mut self) -> Result<Track> {
        if self.history()?.is_empty() {
            return Err(PlayerError::NoPreviousTracks);
        }

        self.position = self.position.min(self.items.len()) - 1;
        info!("⏮️ Volviendo a la posición {}", self.position);
        Ok(self.items[self.position].clone())
    }

    /// Mezcla solo las pistas pendientes; historial y actual no cambian
    pub fn shuffle(&mut self) -> Result<()> {
        self.shuffle_with(&mut rand::thread_rng())
    }

    pub fn shuffle_with<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<()> {
        self.ensure_not_empty()?;

        let start = (self.position + 1).min(self.items.len());
        self.items[start..].shuffle(rng);
        info!("🔀 Cola mezclada ({} pendientes)", self.items.len() - start);
        Ok(())
    }

    pub fn set_repeat_mode(&mut self, mode: RepeatMode) {
        self.repeat_mode = mode;
        match mode {
            RepeatMode::None => info!("➡️ Repetición desactivada"),
            RepeatMode::One => info!("🔂 Repetir canción activado"),
            RepeatMode::All => info!("🔁 Repetir cola activado"),
        }
    }

    /// Vacía la cola y reinicia el cursor
    pub fn clear(&mut self) {
        self.items.clear();
        self.position = 0;
        info!("🗑️ Cola limpiada");
    }

    /// Vacía la cola pero conserva la pista actual, que sigue sonando.
    /// Lo que se agregue después queda como siguiente.
    pub fn clear_keeping_current(&mut self) {
        match self.items.get(self.position).cloned() {
            Some(current) => {
                self.items = vec![current];
                self.position = 0;
                info!("🗑️ Cola limpiada, se mantiene la pista actual");
            }
            None => self.clear(),
        }
    }

    /// Obtiene información de la cola
    pub fn info(&self) -> QueueInfo {
        let split = self.position.min(self.items.len());
        let current = self.items.get(self.position).cloned();
        let upcoming: Vec<Track> = self.items[(self.position + 1).min(self.items.len())..].to_vec();

        let remaining = current
            .iter()
            .chain(upcoming.iter())
            .map(|track| track.duration)
            .sum();

        QueueInfo {
            position: self.position,
            history: self.items[..split].to_vec(),
            current,
            upcoming,
            repeat_mode: self.repeat_mode,
            remaining,
        }
    }

    fn ensure_not_empty(&self) -> Result<()> {
        if self.items.is_empty() {
            Err(PlayerError::QueueEmpty)
        } else {
            Ok(())
        }
    }
}

/// Vista derivada de la cola para los colaboradores externos
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueueInfo {
    pub position: usize,
    pub current: Option<Track>,
    pub history: Vec<Track>,
    pub upcoming: Vec<Track>,
    pub repeat_mode: RepeatMode,
    /// Duración de la pista actual más las pendientes
    pub remaining: Duration,
}

impl QueueInfo {
    /// Obtiene una página específica de las pistas pendientes
    pub fn upcoming_page(&self, page: usize, per_page: usize) -> QueuePage {
        let per_page = per_page.max(1);
        let safe_page = page.max(1);
        let total_items = self.upcoming.len();
        let start = (safe_page - 1).saturating_mul(per_page);
        let end = start.saturating_add(per_page).min(total_items);
        let total_pages = if total_items == 0 { 1 } else { total_items.div_ceil(per_page) };

        QueuePage {
            items: if start < total_items { self.upcoming[start..end].to_vec() } else { Vec::new() },
            current_page: safe_page,
            total_pages,
            total_items,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueuePage {
    pub items: Vec<Track>,
    pub current_page: usize,
    pub total_pages: usize,
    pub total_items: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rand::{rngs::StdRng, SeedableRng};

    fn track(id: &str) -> Track {
        Track::new(id, id.to_uppercase(), Duration::from_secs(60))
    }

    fn queue_of(ids: &[&str]) -> MusicQueue {
        let mut queue = MusicQueue::new();
        queue.add(ids.iter().map(|id| track(id)));
        queue
    }

    fn assert_views_cover_items(queue: &MusicQueue) {
        let mut joined = queue.history().unwrap().to_vec();
        joined.extend(queue.current_track().unwrap().cloned());
        joined.extend_from_slice(queue.upcoming().unwrap());
        assert_eq!(joined, queue.items().to_vec());
    }

    #[test]
    fn empty_queue_rejects_reads_and_moves() {
        let mut queue = MusicQueue::new();
        assert_eq!(queue.current_track(), Err(PlayerError::QueueEmpty));
        assert_eq!(queue.advance(), Err(PlayerError::QueueEmpty));
        assert_eq!(queue.repeat_current(), Err(PlayerError::QueueEmpty));
        assert_eq!(queue.shuffle(), Err(PlayerError::QueueEmpty));
        assert_eq!(queue.skip_to_previous(), Err(PlayerError::QueueEmpty));
    }

    #[test]
    fn add_keeps_position_and_first_track_is_current() {
        let mut queue = queue_of(&["a"]);
        assert_eq!(queue.position(), 0);
        assert_eq!(queue.current_track().unwrap(), Some(&track("a")));

        queue.add(vec![track("b"), track("c")]);
        assert_eq!(queue.position(), 0);
        assert_eq!(queue.upcoming().unwrap(), &[track("b"), track("c")]);
    }

    #[test]
    fn advance_without_repeat_runs_out() {
        let mut queue = queue_of(&["a", "b", "c"]);
        assert_eq!(queue.advance().unwrap(), Some(track("b")));
        assert_eq!(queue.advance().unwrap(), Some(track("c")));
        assert_eq!(queue.advance().unwrap(), None);
        assert_eq!(queue.current_track().unwrap(), None);

        // notificaciones duplicadas no mueven más el cursor
        assert_eq!(queue.advance().unwrap(), None);
        assert_eq!(queue.advance().unwrap(), None);
        assert_eq!(queue.position(), 3);
        assert_eq!(queue.history().unwrap().len(), 3);
    }

    #[test]
    fn advance_with_repeat_all_wraps_to_start() {
        let mut queue = queue_of(&["a", "b", "c"]);
        queue.set_repeat_mode(RepeatMode::All);

        assert_eq!(queue.advance().unwrap(), Some(track("b")));
        assert_eq!(queue.advance().unwrap(), Some(track("c")));
        assert_eq!(queue.advance().unwrap(), Some(track("a")));
        assert_eq!(queue.position(), 0);

        for _ in 0..10 {
            assert!(queue.advance().unwrap().is_some());
        }
    }

    #[test]
    fn repeat_all_recovers_an_exhausted_queue() {
        let mut queue = queue_of(&["a", "b"]);
        queue.advance().unwrap();
        assert_eq!(queue.advance().unwrap(), None);

        queue.set_repeat_mode(RepeatMode::All);
        assert_eq!(queue.advance().unwrap(), Some(track("a")));
    }

    #[test]
    fn repeat_current_does_not_move() {
        let mut queue = queue_of(&["a", "b"]);
        queue.set_repeat_mode(RepeatMode::One);
        assert_eq!(queue.repeat_current().unwrap(), Some(track("a")));
        assert_eq!(queue.repeat_current().unwrap(), Some(track("a")));
        assert_eq!(queue.position(), 0);
    }

    #[test]
    fn repeat_mode_parses_only_known_values() {
        assert_eq!("none".parse::<RepeatMode>(), Ok(RepeatMode::None));
        assert_eq!("1".parse::<RepeatMode>(), Ok(RepeatMode::One));
        assert_eq!("all".parse::<RepeatMode>(), Ok(RepeatMode::All));
        assert_eq!(
            "twice".parse::<RepeatMode>(),
            Err(PlayerError::InvalidRepeatMode("twice".into()))
        );
        assert_eq!(RepeatMode::One.to_string(), "1");
    }

    #[test]
    fn repeat_mode_serializes_as_command_values() {
        assert_eq!(serde_json::to_string(&RepeatMode::All).unwrap(), "\"all\"");
        assert_eq!(serde_json::to_string(&RepeatMode::One).unwrap(), "\"1\"");
    }

    #[test]
    fn shuffle_only_touches_upcoming() {
        let mut queue = queue_of(&["a", "b", "c", "d", "e", "f", "g"]);
        queue.advance().unwrap();
        queue.advance().unwrap();

        let before_prefix = queue.items()[..=2].to_vec();
        let mut before_upcoming = queue.upcoming().unwrap().to_vec();

        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..5 {
            queue.shuffle_with(&mut rng).unwrap();
            assert_eq!(queue.items()[..=2].to_vec(), before_prefix);
            assert_views_cover_items(&queue);
        }

        let mut after_upcoming = queue.upcoming().unwrap().to_vec();
        before_upcoming.sort_by(|a, b| a.identifier.cmp(&b.identifier));
        after_upcoming.sort_by(|a, b| a.identifier.cmp(&b.identifier));
        assert_eq!(after_upcoming, before_upcoming);
    }

    #[test]
    fn shuffle_with_nothing_upcoming_is_a_no_op() {
        let mut queue = queue_of(&["a", "b"]);
        queue.advance().unwrap();
        queue.shuffle().unwrap();
        assert_eq!(queue.items(), &[track("a"), track("b")]);
    }

    #[test]
    fn views_stay_consistent_through_mutations() {
        let mut queue = queue_of(&["a", "b", "c", "d"]);
        assert_views_cover_items(&queue);
        queue.advance().unwrap();
        assert_views_cover_items(&queue);
        queue.add(vec![track("e")]);
        queue.shuffle().unwrap();
        assert_views_cover_items(&queue);
        queue.advance().unwrap();
        assert_views_cover_items(&queue);
    }

    #[test]
    fn skip_to_previous_steps_back_one_track() {
        let mut queue = queue_of(&["a", "b", "c"]);
        queue.advance().unwrap();
        queue.advance().unwrap();
        assert_eq!(queue.position(), 2);

        assert_eq!(queue.skip_to_previous().unwrap(), track("b"));
        assert_eq!(queue.position(), 1);
        assert_eq!(queue.advance().unwrap(), Some(track("c")));
    }

    #[test]
    fn skip_to_previous_from_exhausted_replays_last() {
        let mut queue = queue_of(&["a", "b"]);
        queue.advance().unwrap();
        queue.advance().unwrap();
        assert_eq!(queue.skip_to_previous().unwrap(), track("b"));
    }

    #[test]
    fn skip_to_previous_needs_history() {
        let mut queue = queue_of(&["a", "b"]);
        assert_eq!(queue.skip_to_previous(), Err(PlayerError::NoPreviousTracks));
        assert_eq!(queue.position(), 0);
    }

    #[test]
    fn skip_needs_upcoming_tracks() {
        let mut queue = queue_of(&["a", "b"]);
        assert_eq!(queue.skip().unwrap(), Some(track("b")));
        assert_eq!(queue.skip(), Err(PlayerError::NoMoreTracks));
    }

    #[test]
    fn clear_resets_cursor() {
        let mut queue = queue_of(&["a", "b"]);
        queue.advance().unwrap();
        queue.clear();
        assert!(queue.is_empty());
        assert_eq!(queue.position(), 0);

        queue.add(vec![track("z")]);
        assert_eq!(queue.current_track().unwrap(), Some(&track("z")));
    }

    #[test]
    fn info_pages_upcoming_tracks() {
        let ids: Vec<String> = (0..25).map(|i| format!("t{i}")).collect();
        let mut queue = MusicQueue::new();
        queue.add(ids.iter().map(|id| track(id)));

        let info = queue.info();
        assert_eq!(info.current, Some(track("t0")));
        assert_eq!(info.remaining, Duration::from_secs(25 * 60));

        let page = info.upcoming_page(3, 10);
        assert_eq!(page.total_items, 24);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.items.len(), 4);
        assert_eq!(page.items[0], track("t21"));

        assert!(info.upcoming_page(9, 10).items.is_empty());
    }

    #[test]
    fn huge_page_numbers_are_just_empty() {
        let queue = queue_of(&["a", "b", "c"]);
        let page = queue.info().upcoming_page(usize::MAX, 10);
        assert!(page.items.is_empty());
        assert_eq!(page.total_items, 2);
        assert_eq!(page.current_page, usize::MAX);

        let page = queue.info().upcoming_page(2, usize::MAX);
        assert!(page.items.is_empty());
        assert_eq!(page.total_pages, 1);
    }

    #[test]
    fn clear_keeping_current_makes_new_tracks_upcoming() {
        let mut queue = queue_of(&["a", "b", "c"]);
        queue.advance().unwrap();
        queue.clear_keeping_current();

        assert_eq!(queue.items(), &[track("b")]);
        assert_eq!(queue.position(), 0);

        queue.add(vec![track("x")]);
        assert_eq!(queue.current_track().unwrap(), Some(&track("b")));
        assert_eq!(queue.advance().unwrap(), Some(track("x")));

        // agotada: no hay pista actual que conservar
        queue.advance().unwrap();
        queue.clear_keeping_current();
        assert!(queue.is_empty());
        assert_eq!(queue.position(), 0);
    }
}
