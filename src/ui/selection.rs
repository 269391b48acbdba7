//! Timed single-choice prompt used when a search returns several candidates.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serenity::model::id::{GuildId, UserId};
use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::audio::track::Track;

/// Máximo de opciones que se presentan
pub const MAX_CHOICES: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PromptId(u64);

impl PromptId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

/// Lista de candidatos que la capa de presentación debe mostrar
#[derive(Debug, Clone)]
pub struct ChoicePrompt {
    pub id: PromptId,
    pub guild_id: GuildId,
    /// Único usuario que puede elegir
    pub requester: UserId,
    pub candidates: Vec<Track>,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl ChoicePrompt {
    pub fn slots(&self) -> usize {
        self.candidates.len()
    }
}

/// Elección recibida desde la capa de presentación (slot en base 0)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChoiceSignal {
    pub prompt: PromptId,
    pub responder: UserId,
    pub slot: usize,
}

#[async_trait]
pub trait ChoicePresenter: Send + Sync {
    /// Muestra los candidatos en el orden recibido
    async fn present(&self, prompt: &ChoicePrompt) -> Result<()>;

    /// Retira el mensaje, tanto si hubo elección como si no
    async fn discard(&self, prompt: PromptId);
}

/// Resuelve una lista de candidatos a una sola pista, o a ninguna.
pub struct Disambiguator {
    presenter: Arc<dyn ChoicePresenter>,
    timeout: Duration,
    pending: DashMap<PromptId, flume::Sender<ChoiceSignal>>,
    next_id: AtomicU64,
}

impl Disambiguator {
    pub fn new(presenter: Arc<dyn ChoicePresenter>, timeout: Duration) -> Self {
        Self {
            presenter,
            timeout,
            pending: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Número de prompts esperando respuesta
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Entrega una elección al prompt que la espera.
    /// Devuelve `false` si el prompt ya no existe.
    pub fn signal(&self, signal: ChoiceSignal) -> bool {
        match self.pending.get(&signal.prompt) {
            Some(tx) => tx.send(signal).is_ok(),
            None => {
                debug!("Elección para prompt {} descartada: ya resuelto", signal.prompt.get());
                false
            }
        }
    }

    /// Presenta hasta [`MAX_CHOICES`] candidatos y espera una elección válida.
    ///
    /// Resolves to `None` on timeout, on cancellation of `cancel`, or when the
    /// presenter fails. The prompt is discarded in every case.
    pub async fn choose(
        &self,
        guild_id: GuildId,
        requester: UserId,
        candidates: Vec<Track>,
        cancel: &CancellationToken,
    ) -> Option<Track> {
        let candidates: Vec<Track> = candidates.into_iter().take(MAX_CHOICES).collect();
        if candidates.is_empty() {
            return None;
        }

        let id = PromptId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = flume::unbounded();
        self.pending.insert(id, tx);
        let _registration = PendingPrompt {
            pending: &self.pending,
            id,
        };

        let issued_at = Utc::now();
        let prompt = ChoicePrompt {
            id,
            guild_id,
            requester,
            candidates,
            issued_at,
            expires_at: issued_at
                + chrono::Duration::from_std(self.timeout).unwrap_or_else(|_| chrono::Duration::zero()),
        };

        if let Err(e) = self.presenter.present(&prompt).await {
            warn!("No se pudo mostrar la selección en guild {}: {:?}", guild_id, e);
            self.presenter.discard(id).await;
            return None;
        }

        let slots = prompt.slots();
        let outcome = tokio::select! {
            _ = cancel.cancelled() => {
                info!("🚫 Selección {} cancelada en guild {}", id.get(), guild_id);
                None
            }
            result = tokio::time::timeout(self.timeout, wait_for_choice(&rx, requester, slots)) => {
                match result {
                    Ok(slot) => slot,
                    Err(_) => {
                        info!("⌛ Selección {} expirada en guild {}", id.get(), guild_id);
                        None
                    }
                }
            }
        };

        self.presenter.discard(id).await;

        let chosen = outcome.and_then(|slot| prompt.candidates.get(slot).cloned());
        if let Some(track) = &chosen {
            info!("✅ Elegido: {}", track.title);
        }
        chosen
    }
}

async fn wait_for_choice(
    rx: &flume::Receiver<ChoiceSignal>,
    requester: UserId,
    slots: usize,
) -> Option<usize> {
    while let Ok(signal) = rx.recv_async().await {
        if signal.responder == requester && signal.slot < slots {
            return Some(signal.slot);
        }
        debug!(
            "Elección ignorada: usuario {} slot {} (esperando {} de {} opciones)",
            signal.responder, signal.slot, requester, slots
        );
    }
    None
}

/// Quita el prompt de la tabla al salir de `choose`, por cualquier camino
struct PendingPrompt<'a> {
    pending: &'a DashMap<PromptId, flume::Sender<ChoiceSignal>>,
    id: PromptId,
}

impl Drop for PendingPrompt<'_> {
    fn drop(&mut self) {
        self.pending.remove(&self.id);
    }
}
