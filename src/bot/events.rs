use serenity::async_trait;
use songbird::{
    tracks::{ControlError, TrackHandle},
    Event as VoiceEvent, EventContext, EventHandler as VoiceEventHandler, TrackEvent,
};
use tracing::{debug, warn};

use crate::audio::transport::{EventSink, PlaybackTicket, StopReason, TransportEvent};

/// Aviso de presencia: un miembro abandonó el canal de voz de la sesión
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoiceDeparture {
    /// El miembro que salió es un bot
    pub member_is_bot: bool,
    /// Miembros humanos que siguen en el canal
    pub remaining_humans: usize,
}

impl VoiceDeparture {
    /// Se queda sin oyentes: salió una persona y no queda ninguna
    pub fn leaves_channel_empty(&self) -> bool {
        !self.member_is_bot && self.remaining_humans == 0
    }
}

/// Handler para fin o error de un track: lo reenvía al buzón de la sesión
pub struct TrackStopNotifier {
    pub events: EventSink,
    pub ticket: PlaybackTicket,
    pub reason: StopReason,
}

#[async_trait]
impl VoiceEventHandler for TrackStopNotifier {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<VoiceEvent> {
        if let (StopReason::Errored, EventContext::Track(track_list)) = (self.reason, ctx) {
            for (state, _handle) in *track_list {
                warn!("❌ Error en track {}: {:?}", self.ticket.id(), state.playing);
            }
        }

        let delivered = self.events.notify(TransportEvent {
            ticket: self.ticket,
            reason: self.reason,
        });
        if !delivered {
            debug!("Track {} terminó sin sesión activa", self.ticket.id());
        }

        None
    }
}

/// Registra los handlers de fin y error para un track recién lanzado
pub fn register_track_events(
    handle: &TrackHandle,
    events: EventSink,
    ticket: PlaybackTicket,
) -> Result<(), ControlError> {
    handle.add_event(
        VoiceEvent::Track(TrackEvent::End),
        TrackStopNotifier {
            events: events.clone(),
            ticket,
            reason: StopReason::Finished,
        },
    )?;

    handle.add_event(
        VoiceEvent::Track(TrackEvent::Error),
        TrackStopNotifier {
            events,
            ticket,
            reason: StopReason::Errored,
        },
    )
}
