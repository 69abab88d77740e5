//! Engine - the producer-facing front end
//!
//! Request handlers hold a cloned [`Engine`] and turn decoded requests into
//! scheduled work. The engine adds the requestor's remaining cooldown to
//! every operation it schedules, so cooldowns delay work instead of
//! rejecting it.

use crate::config::EngineConfig;
use crate::error::Result;
use crate::scheduler::{Schedulable, Scheduler};
use cadence_core::rules::{EventRule, EventRuleEngine, RuleId};
use cadence_core::{
    ActorId, Audience, Clock, ExecutionContext, ExhaustionBook, Notification, Operation,
    OperationArguments, OperationFactory, OperationKind, OperationSink, PartitionKey, Timestamp,
};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

struct EngineInner {
    scheduler: Scheduler,
    exhaustion: ExhaustionBook,
    rules: EventRuleEngine,
    factory: OperationFactory,
}

/// Shared handle to the scheduler, exhaustion book and rule engine
///
/// Cheap to clone; every clone sees the same queue. Safe to call from any
/// thread, including from inside an executing operation.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<EngineInner>,
}

impl Engine {
    /// Create an engine on `clock`
    pub fn new(clock: Arc<dyn Clock>, config: &EngineConfig) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                scheduler: Scheduler::new(clock),
                exhaustion: ExhaustionBook::new(),
                rules: EventRuleEngine::new(),
                factory: config.factory(),
            }),
        }
    }

    pub fn now(&self) -> Timestamp {
        self.inner.scheduler.now()
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.inner.scheduler
    }

    pub fn exhaustion(&self) -> &ExhaustionBook {
        &self.inner.exhaustion
    }

    pub fn rules(&self) -> &EventRuleEngine {
        &self.inner.rules
    }

    pub fn factory(&self) -> &OperationFactory {
        &self.inner.factory
    }

    /// Number of entries that will still fire
    pub fn pending(&self) -> usize {
        self.inner.scheduler.len()
    }

    /// Build an operation of `kind` and schedule it
    ///
    /// Arguments of another kind are rejected before anything is queued.
    pub fn schedule_new(
        &self,
        kind: OperationKind,
        arguments: OperationArguments,
        delay: Duration,
    ) -> Result<Timestamp> {
        let operation = self.inner.factory.create(kind, arguments)?;
        Ok(self.schedule_new_operation(operation, delay))
    }

    /// Schedule an operation after `delay` plus the requestor's remaining
    /// cooldown in the operation's exhaustion category
    ///
    /// Returns the due time.
    pub fn schedule_new_operation(&self, operation: Operation, delay: Duration) -> Timestamp {
        let now = self.now();
        let cooldown = operation
            .exhaustion()
            .map(|(exhaustion, _)| {
                self.inner
                    .exhaustion
                    .remaining_cooldown(operation.requestor(), exhaustion, now)
            })
            .unwrap_or(Duration::ZERO);
        let due = now.saturating_add(delay.saturating_add(cooldown));
        debug!(
            kind = %operation.kind(),
            requestor = %operation.requestor(),
            delay_ms = delay.as_millis() as u64,
            cooldown_ms = cooldown.as_millis() as u64,
            due = %due,
            "operation_scheduled"
        );
        self.inner
            .scheduler
            .schedule_at(Schedulable::Operation(operation), due);
        due
    }

    /// Schedule any event, without cooldown
    pub fn schedule_event(&self, event: Schedulable, delay: Duration) -> Timestamp {
        self.inner.scheduler.schedule_event(event, delay)
    }

    /// Run `run` on the consumer after `delay`
    pub fn schedule_task(
        &self,
        name: &'static str,
        delay: Duration,
        run: impl FnOnce(&mut ExecutionContext<'_>) + Send + 'static,
    ) -> Timestamp {
        self.schedule_event(
            Schedulable::Task {
                name,
                run: Box::new(run),
            },
            delay,
        )
    }

    /// Cancel every pending operation of `kind` requested by `actor`
    ///
    /// Cancelling a walk also clears the rules waiting on it, under the
    /// partitions of the cancelled steps. Returns the number of operations
    /// cancelled.
    pub fn cancel_all_for(&self, actor: ActorId, kind: OperationKind) -> usize {
        let partitions = self.inner.scheduler.cancel_partitions(actor, kind);
        let cancelled = partitions.len();
        let cleared: usize = if kind == OperationKind::AutoWalk {
            partitions
                .into_iter()
                .collect::<HashSet<_>>()
                .into_iter()
                .map(|partition| self.inner.rules.clear_all_for(partition))
                .sum()
        } else {
            0
        };
        if cancelled > 0 || cleared > 0 {
            debug!(
                actor = %actor,
                kind = %kind,
                cancelled,
                rules_cleared = cleared,
                "operations_cancelled"
            );
        }
        cancelled
    }

    pub fn setup_rule(&self, rule: EventRule, partition: PartitionKey) -> RuleId {
        self.inner.rules.setup_rule(rule, partition)
    }

    pub fn clear_all_for(&self, partition: PartitionKey) -> usize {
        self.inner.rules.clear_all_for(partition)
    }
}

impl OperationSink for Engine {
    fn schedule_operation(&self, operation: Operation, delay: Duration) {
        self.schedule_new_operation(operation, delay);
    }

    fn schedule_notification(&self, audience: Audience, notification: Notification, delay: Duration) {
        self.schedule_event(
            Schedulable::Notification {
                audience,
                notification,
            },
            delay,
        );
    }

    fn cancel_all_for(&self, actor: ActorId, kind: OperationKind) -> usize {
        Engine::cancel_all_for(self, actor, kind)
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("scheduler", &self.inner.scheduler)
            .field("rules", &self.inner.rules.len())
            .finish()
    }
}
