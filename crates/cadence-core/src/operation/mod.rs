//! Operations: the unit of deferred gameplay work
//!
//! An [`Operation`] is built by the [`OperationFactory`] from typed
//! [`OperationArguments`], handed to a scheduler through [`OperationSink`],
//! and executed exactly once by the consumer with an [`ExecutionContext`].
//!
//! Execution never panics on bad world state: validation failures become
//! [`OperationOutcome::Rejected`], vanished actors or things become
//! [`OperationOutcome::Aborted`], and only inconsistencies that could not be
//! recovered surface as errors.

mod args;
mod combat;
mod context;
mod factory;
mod item;
mod movement;
mod speech;
mod walk;

pub use args::{OperationArguments, WalkRoute};
pub use context::{ExecutionContext, OperationSink, RecordingOperationSink, SinkRecord};
pub use factory::{OperationCosts, OperationFactory};

#[cfg(test)]
pub(crate) use context::testing;

use crate::{ActorId, Audience, ExhaustionType, Notification, PartitionKey, PolicyViolation, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::debug;

/// Operation kinds, used for cancellation and logging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationKind {
    Movement,
    AutoWalk,
    Turn,
    Speech,
    Attack,
    RestoreCredits,
    SpeedChange,
    UseItem,
    RotateItem,
    Logout,
}

impl OperationKind {
    pub fn name(&self) -> &'static str {
        match self {
            OperationKind::Movement => "movement",
            OperationKind::AutoWalk => "auto_walk",
            OperationKind::Turn => "turn",
            OperationKind::Speech => "speech",
            OperationKind::Attack => "attack",
            OperationKind::RestoreCredits => "restore_credits",
            OperationKind::SpeedChange => "speed_change",
            OperationKind::UseItem => "use_item",
            OperationKind::RotateItem => "rotate_item",
            OperationKind::Logout => "logout",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How an execution ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationOutcome {
    /// World state changed; exhaustion was added
    Performed,
    /// A policy failed; world state is unchanged
    Rejected(PolicyViolation),
    /// Waiting on a follow-up (typically a walk) before it can act
    Deferred,
    /// Nothing to do any more, e.g. the actor or thing is gone
    Aborted,
}

/// One deferred unit of gameplay work
///
/// Fields are fixed at construction; only the retry counter changes, and
/// only on copies made for a retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    arguments: OperationArguments,
    exhaustion: Option<(ExhaustionType, Duration)>,
    partition: PartitionKey,
    retries: u32,
}

impl Operation {
    pub fn kind(&self) -> OperationKind {
        self.arguments.kind()
    }

    /// Actor the operation acts for; [`ActorId::SYSTEM`] when none
    pub fn requestor(&self) -> ActorId {
        self.arguments.requestor()
    }

    pub fn arguments(&self) -> &OperationArguments {
        &self.arguments
    }

    /// Cooldown category and cost imposed on the requestor when performed
    pub fn exhaustion(&self) -> Option<(ExhaustionType, Duration)> {
        self.exhaustion
    }

    /// Request chain this operation belongs to
    pub fn partition(&self) -> PartitionKey {
        self.partition
    }

    /// The same operation, moved into another request chain
    pub fn with_partition(self, partition: PartitionKey) -> Self {
        Self { partition, ..self }
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// A copy to schedule again after a walk, with the retry counter bumped
    pub(crate) fn retried(&self) -> Self {
        Self {
            retries: self.retries + 1,
            ..self.clone()
        }
    }

    /// Run the operation. Consumes it, so it runs at most once.
    pub fn execute(self, ctx: &mut ExecutionContext<'_>) -> Result<OperationOutcome> {
        let mut follow_ups = FollowUps::default();
        let outcome = match &self.arguments {
            OperationArguments::Movement {
                requestor,
                thing,
                from,
                to,
                amount,
                force,
            } => movement::perform(*requestor, *thing, *from, *to, *amount, *force, ctx)?,
            OperationArguments::AutoWalk { requestor, route } => {
                walk::auto_walk(&self, *requestor, route, ctx, &mut follow_ups)?
            }
            OperationArguments::Turn {
                requestor,
                direction,
            } => walk::turn(*requestor, *direction, ctx),
            OperationArguments::Speech {
                requestor,
                speech,
                text,
            } => speech::perform(*requestor, *speech, text, ctx),
            OperationArguments::Attack {
                requestor,
                target,
                auto,
            } => combat::attack(&self, *requestor, *target, *auto, ctx, &mut follow_ups),
            OperationArguments::RestoreCredits { combatant } => {
                combat::restore_credits(&self, *combatant, ctx, &mut follow_ups)
            }
            OperationArguments::SpeedChange {
                combatant,
                credit,
                delta,
                lasts,
            } => combat::speed_change(*combatant, *credit, *delta, *lasts, ctx, &mut follow_ups)?,
            OperationArguments::UseItem {
                requestor,
                at,
                item,
                on,
            } => item::use_item(&self, *requestor, *at, *item, *on, ctx, &mut follow_ups)?,
            OperationArguments::RotateItem {
                requestor,
                at,
                item,
            } => item::rotate(&self, *requestor, *at, *item, ctx, &mut follow_ups)?,
            OperationArguments::Logout { requestor } => walk::logout(*requestor, ctx),
        };

        let requestor = self.requestor();
        match &outcome {
            OperationOutcome::Performed => {
                if let Some((exhaustion, cost)) = self.exhaustion {
                    ctx.exhaustion
                        .add_exhaustion(requestor, exhaustion, ctx.now, cost);
                }
            }
            OperationOutcome::Rejected(violation) => {
                debug!(
                    kind = %self.kind(),
                    requestor = %requestor,
                    policy = violation.policy,
                    "operation_rejected"
                );
                if !requestor.is_system() {
                    ctx.notifier.notify(
                        Audience::Player(requestor),
                        Notification::TextMessage {
                            text: violation.message.clone(),
                        },
                    );
                }
            }
            OperationOutcome::Deferred | OperationOutcome::Aborted => {}
        }

        // Scheduled only after exhaustion is recorded, so their delay includes it.
        for (operation, delay) in follow_ups.0 {
            ctx.scheduler.schedule_operation(operation, delay);
        }
        Ok(outcome)
    }
}

/// Operations to schedule once the current one has finished
#[derive(Default)]
pub(crate) struct FollowUps(Vec<(Operation, Duration)>);

impl FollowUps {
    pub(crate) fn push(&mut self, operation: Operation, delay: Duration) {
        self.0.push((operation, delay));
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Failure message of a check the operation made itself
pub(crate) fn violation(policy: &'static str, message: &str) -> OperationOutcome {
    OperationOutcome::Rejected(PolicyViolation {
        policy,
        message: message.to_string(),
    })
}
