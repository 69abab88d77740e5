//! Execution context and the scheduler seam

use super::{Operation, OperationFactory, OperationKind};
use crate::rules::{EventRuleEngine, RuleContext};
use crate::{
    ActorId, Audience, Combatants, ExhaustionBook, Notification, NotificationSink, Pathfinder,
    PolicyContext, ThingKey, Timestamp, World,
};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Where operations submit follow-up work
///
/// Implemented by the scheduler front end. Calls must not block on the
/// consumer; they are made from inside operation execution on the consumer
/// thread as well as from request handlers.
pub trait OperationSink: Send + Sync {
    /// Schedule an operation; the sink adds the requestor's remaining cooldown
    fn schedule_operation(&self, operation: Operation, delay: Duration);

    /// Deliver a notification later
    fn schedule_notification(&self, audience: Audience, notification: Notification, delay: Duration);

    /// Cancel every pending operation of `kind` requested by `actor`
    fn cancel_all_for(&self, actor: ActorId, kind: OperationKind) -> usize;
}

/// Everything an operation may touch while it runs
///
/// Built by the consumer for each execution. Holding `&mut` to the world and
/// combatants is what makes the execution exclusive.
pub struct ExecutionContext<'a> {
    pub now: Timestamp,
    pub world: &'a mut dyn World,
    pub combatants: &'a mut Combatants,
    pub rules: &'a EventRuleEngine,
    pub exhaustion: &'a ExhaustionBook,
    pub notifier: &'a dyn NotificationSink,
    pub pathfinder: &'a dyn Pathfinder,
    pub scheduler: &'a dyn OperationSink,
    pub factory: &'a OperationFactory,
}

impl ExecutionContext<'_> {
    /// Read-only view for policy evaluation
    pub fn policy_context(&self) -> PolicyContext<'_> {
        PolicyContext::new(&*self.world, self.exhaustion, self.now)
    }

    pub fn notify(&self, audience: Audience, notification: Notification) {
        self.notifier.notify(audience, notification);
    }

    /// Send a status message to one player
    pub fn tell(&self, player: ActorId, text: &str) {
        if player.is_system() {
            return;
        }
        self.notifier.notify(
            Audience::Player(player),
            Notification::TextMessage {
                text: text.to_string(),
            },
        );
    }

    /// Fire rules for `rule` once per key
    pub fn fire_rules(&self, rule: &RuleContext, keys: impl IntoIterator<Item = ThingKey>) -> usize {
        self.rules
            .fire_for_each(rule, keys, &*self.world, self.scheduler)
    }
}

/// What a [`RecordingOperationSink`] received
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkRecord {
    Operation {
        operation: Operation,
        delay: Duration,
    },
    Notification {
        audience: Audience,
        notification: Notification,
        delay: Duration,
    },
    Cancelled {
        actor: ActorId,
        kind: OperationKind,
    },
}

/// Sink that records submissions instead of scheduling them
#[derive(Debug, Default)]
pub struct RecordingOperationSink {
    records: Mutex<Vec<SinkRecord>>,
}

impl RecordingOperationSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<SinkRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Scheduled operations in submission order
    pub fn operations(&self) -> Vec<(Operation, Duration)> {
        self.records()
            .into_iter()
            .filter_map(|record| match record {
                SinkRecord::Operation { operation, delay } => Some((operation, delay)),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn push(&self, record: SinkRecord) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record);
    }
}

impl OperationSink for RecordingOperationSink {
    fn schedule_operation(&self, operation: Operation, delay: Duration) {
        self.push(SinkRecord::Operation { operation, delay });
    }

    fn schedule_notification(&self, audience: Audience, notification: Notification, delay: Duration) {
        self.push(SinkRecord::Notification {
            audience,
            notification,
            delay,
        });
    }

    fn cancel_all_for(&self, actor: ActorId, kind: OperationKind) -> usize {
        self.push(SinkRecord::Cancelled { actor, kind });
        0
    }
}
