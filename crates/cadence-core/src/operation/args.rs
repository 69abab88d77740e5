//! Typed creation arguments, one variant per operation kind

use super::OperationKind;
use crate::{ActorId, CreditType, Direction, ItemType, Location, Position, SpeechType, ThingKey};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Where an auto-walk is heading
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WalkRoute {
    /// A precomputed list of steps, first step first
    Steps(Vec<Direction>),
    /// Ask the pathfinder for a route ending within `reach` of `target`
    Towards { target: Position, reach: u16 },
}

/// Everything needed to build one operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationArguments {
    /// Move an item stack between two locations, or push a creature
    Movement {
        requestor: ActorId,
        thing: ThingKey,
        from: Location,
        to: Location,
        amount: u8,
        /// Skip every policy (system or administrative moves)
        force: bool,
    },
    AutoWalk {
        requestor: ActorId,
        route: WalkRoute,
    },
    Turn {
        requestor: ActorId,
        direction: Direction,
    },
    Speech {
        requestor: ActorId,
        speech: SpeechType,
        text: String,
    },
    Attack {
        requestor: ActorId,
        target: ActorId,
        /// Keep attacking every round until the target dies or leaves
        auto: bool,
    },
    /// Periodic credit regeneration of one combatant
    RestoreCredits { combatant: ActorId },
    /// Change a regeneration rate, optionally reverting after `lasts`
    SpeedChange {
        combatant: ActorId,
        credit: CreditType,
        delta: i32,
        lasts: Option<Duration>,
    },
    UseItem {
        requestor: ActorId,
        at: Location,
        item: ItemType,
        /// The thing the item is used on
        on: Option<(Location, ItemType)>,
    },
    RotateItem {
        requestor: ActorId,
        at: Location,
        item: ItemType,
    },
    Logout {
        requestor: ActorId,
    },
}

impl OperationArguments {
    /// The kind these arguments build
    pub fn kind(&self) -> OperationKind {
        match self {
            OperationArguments::Movement { .. } => OperationKind::Movement,
            OperationArguments::AutoWalk { .. } => OperationKind::AutoWalk,
            OperationArguments::Turn { .. } => OperationKind::Turn,
            OperationArguments::Speech { .. } => OperationKind::Speech,
            OperationArguments::Attack { .. } => OperationKind::Attack,
            OperationArguments::RestoreCredits { .. } => OperationKind::RestoreCredits,
            OperationArguments::SpeedChange { .. } => OperationKind::SpeedChange,
            OperationArguments::UseItem { .. } => OperationKind::UseItem,
            OperationArguments::RotateItem { .. } => OperationKind::RotateItem,
            OperationArguments::Logout { .. } => OperationKind::Logout,
        }
    }

    /// The actor the operation acts for
    pub fn requestor(&self) -> ActorId {
        match self {
            OperationArguments::Movement { requestor, .. }
            | OperationArguments::AutoWalk { requestor, .. }
            | OperationArguments::Turn { requestor, .. }
            | OperationArguments::Speech { requestor, .. }
            | OperationArguments::Attack { requestor, .. }
            | OperationArguments::UseItem { requestor, .. }
            | OperationArguments::RotateItem { requestor, .. }
            | OperationArguments::Logout { requestor } => *requestor,
            OperationArguments::RestoreCredits { combatant }
            | OperationArguments::SpeedChange { combatant, .. } => *combatant,
        }
    }
}
