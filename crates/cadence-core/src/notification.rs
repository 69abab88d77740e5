//! Notifications for the transport layer
//!
//! Operations describe state changes as values; whoever implements
//! [`NotificationSink`] decides which connections receive them and how they
//! are serialized.

use crate::{ActorId, Direction, Item, Location, Position};
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, PoisonError};

/// Who should learn about a state change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Audience {
    /// Players whose view covers `around` within `range` tiles
    Spectators { around: Position, range: u16 },
    /// Exactly one player
    Player(ActorId),
    /// Every connected player
    Everyone,
}

impl Audience {
    /// The usual screen-sized view around a position
    pub fn spectators(around: Position) -> Self {
        Audience::Spectators { around, range: 9 }
    }

    /// Whether a player standing at `viewer` is part of this audience
    pub fn includes(&self, player: ActorId, viewer: Option<Position>) -> bool {
        match self {
            Audience::Spectators { around, range } => viewer.is_some_and(|at| {
                let (dx, dy) = at.offset_to(around);
                at.z == around.z && dx <= *range && dy <= *range
            }),
            Audience::Player(id) => *id == player,
            Audience::Everyone => true,
        }
    }
}

/// How a creature talks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpeechType {
    Say,
    Whisper,
    Yell,
}

impl SpeechType {
    /// How far the speech carries
    pub fn range(&self) -> u16 {
        match self {
            SpeechType::Whisper => 1,
            SpeechType::Say => 7,
            SpeechType::Yell => 18,
        }
    }
}

/// Visual effects shown on a tile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Effect {
    /// A hit drew blood
    Blood,
    /// A hit was blocked
    Block,
    /// Something vanished in a puff
    Puff,
}

/// A state change to deliver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Notification {
    ThingMoved {
        item: Item,
        from: Location,
        to: Location,
    },
    CreatureMoved {
        creature: ActorId,
        from: Position,
        to: Position,
    },
    CreatureTurned {
        creature: ActorId,
        direction: Direction,
    },
    CreatureSpoke {
        creature: ActorId,
        speech: SpeechType,
        text: String,
    },
    CreatureRemoved {
        creature: ActorId,
        at: Position,
    },
    HealthChanged {
        creature: ActorId,
        hitpoints: u32,
        maximum: u32,
    },
    TileUpdated {
        at: Position,
    },
    EffectPlayed {
        at: Position,
        effect: Effect,
    },
    /// A plain status message for one player
    TextMessage {
        text: String,
    },
}

/// Receives notifications on the consumer thread
pub trait NotificationSink: Send + Sync {
    fn notify(&self, audience: Audience, notification: Notification);
}

/// Sink that drops everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl NotificationSink for NullSink {
    fn notify(&self, _audience: Audience, _notification: Notification) {}
}

/// Sink that keeps every notification, for inspection in tests
#[derive(Debug, Default)]
pub struct RecordingSink {
    log: Mutex<Vec<(Audience, Notification)>>,
}

impl RecordingSink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything received so far
    pub fn recorded(&self) -> Vec<(Audience, Notification)> {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Text messages addressed to one player
    pub fn messages_for(&self, player: ActorId) -> Vec<String> {
        self.recorded()
            .into_iter()
            .filter_map(|(audience, notification)| match (audience, notification) {
                (Audience::Player(id), Notification::TextMessage { text }) if id == player => {
                    Some(text)
                }
                _ => None,
            })
            .collect()
    }

    /// Forget everything received so far
    pub fn clear(&self) {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl NotificationSink for RecordingSink {
    fn notify(&self, audience: Audience, notification: Notification) {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((audience, notification));
    }
}
