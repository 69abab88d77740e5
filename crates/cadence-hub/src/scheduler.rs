//! Scheduler - due-ordered queue shared by many producers
//!
//! Any thread may insert or cancel; exactly one consumer pops. Entries are
//! ordered by `(due, sequence)`, so entries due at the same instant leave in
//! submission order.
//!
//! Cancellation marks entries instead of searching the heap: the consumer
//! discards marked entries as it pops them.

use cadence_core::{
    ActorId, Audience, Clock, ExecutionContext, Notification, Operation, OperationKind,
    PartitionKey, Timestamp,
};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::debug;

/// Code run on the consumer with the execution context
pub type TaskFn = Box<dyn FnOnce(&mut ExecutionContext<'_>) + Send>;

/// Anything the consumer can fire
pub enum Schedulable {
    /// A gameplay operation
    Operation(Operation),
    /// A notification delivered when due
    Notification {
        audience: Audience,
        notification: Notification,
    },
    /// Arbitrary work, e.g. registering rules or spawning combatants
    Task { name: &'static str, run: TaskFn },
}

impl Schedulable {
    /// Short name for logs
    pub fn name(&self) -> &'static str {
        match self {
            Schedulable::Operation(operation) => operation.kind().name(),
            Schedulable::Notification { .. } => "notification",
            Schedulable::Task { name, .. } => name,
        }
    }

    /// The `(requestor, kind)` an operation can be cancelled by, and its partition
    fn owner(&self) -> Option<((ActorId, OperationKind), PartitionKey)> {
        match self {
            Schedulable::Operation(operation) => Some((
                (operation.requestor(), operation.kind()),
                operation.partition(),
            )),
            _ => None,
        }
    }
}

impl fmt::Debug for Schedulable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Schedulable::Operation(operation) => f.debug_tuple("Operation").field(operation).finish(),
            Schedulable::Notification {
                audience,
                notification,
            } => f
                .debug_struct("Notification")
                .field("audience", audience)
                .field("notification", notification)
                .finish(),
            Schedulable::Task { name, .. } => f.debug_struct("Task").field("name", name).finish(),
        }
    }
}

impl From<Operation> for Schedulable {
    fn from(operation: Operation) -> Self {
        Schedulable::Operation(operation)
    }
}

/// An event with its due time and submission sequence
#[derive(Debug)]
pub struct ScheduledEntry {
    pub due: Timestamp,
    pub sequence: u64,
    pub event: Schedulable,
}

// BinaryHeap is a max-heap; reverse so the smallest (due, sequence) pops first.
impl PartialEq for ScheduledEntry {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.sequence == other.sequence
    }
}

impl Eq for ScheduledEntry {}

impl PartialOrd for ScheduledEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .due
            .cmp(&self.due)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

/// Result of asking for the next due entry
#[derive(Debug)]
pub enum Popped {
    /// An entry whose time has come
    Due(ScheduledEntry),
    /// A cancelled entry was discarded; ask again
    Cancelled,
    /// Nothing is due; carries the next due time, if any
    Idle(Option<Timestamp>),
}

#[derive(Default)]
struct Queue {
    heap: BinaryHeap<ScheduledEntry>,
    next_sequence: u64,
    /// Sequences marked cancelled that are still in the heap
    cancelled: HashSet<u64>,
    /// Pending operation sequences and partitions per requestor and kind
    by_owner: HashMap<(ActorId, OperationKind), Vec<(u64, PartitionKey)>>,
}

impl Queue {
    fn forget_owner(&mut self, owner: (ActorId, OperationKind), sequence: u64) {
        if let Some(sequences) = self.by_owner.get_mut(&owner) {
            sequences.retain(|(pending, _)| *pending != sequence);
            if sequences.is_empty() {
                self.by_owner.remove(&owner);
            }
        }
    }
}

/// The due-ordered queue
///
/// Producers never wait for the consumer: inserting takes the queue lock
/// only for the push, and the wake-up signal is a non-blocking send into a
/// one-slot channel.
pub struct Scheduler {
    clock: Arc<dyn Clock>,
    queue: Mutex<Queue>,
    wake_tx: Sender<()>,
    wake_rx: Receiver<()>,
}

impl Scheduler {
    /// Create an empty scheduler on `clock`
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let (wake_tx, wake_rx) = bounded(1);
        Self {
            clock,
            queue: Mutex::new(Queue::default()),
            wake_tx,
            wake_rx,
        }
    }

    /// The shared clock
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    fn lock(&self) -> MutexGuard<'_, Queue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Schedule `event` to fire `delay` from now; returns its due time
    pub fn schedule_event(&self, event: Schedulable, delay: Duration) -> Timestamp {
        let due = self.now().saturating_add(delay);
        self.schedule_at(event, due);
        due
    }

    /// Schedule `event` at an absolute due time
    pub fn schedule_at(&self, event: Schedulable, due: Timestamp) -> u64 {
        let owner = event.owner();
        let (sequence, earliest) = {
            let mut queue = self.lock();
            let sequence = queue.next_sequence;
            queue.next_sequence += 1;
            if let Some((owner, partition)) = owner {
                queue
                    .by_owner
                    .entry(owner)
                    .or_default()
                    .push((sequence, partition));
            }
            queue.heap.push(ScheduledEntry {
                due,
                sequence,
                event,
            });
            let earliest = queue
                .heap
                .peek()
                .is_some_and(|first| first.sequence == sequence);
            (sequence, earliest)
        };

        // Only a new head can move the consumer's wake-up earlier.
        if earliest {
            // A full slot means a wake-up is already pending.
            if let Err(TrySendError::Disconnected(_)) = self.wake_tx.try_send(()) {
                debug!("scheduler_wake_disconnected");
            }
        }
        sequence
    }

    /// Mark every pending operation of `kind` requested by `actor` as cancelled
    ///
    /// Returns how many entries were marked. Entries already popped are
    /// unaffected.
    pub fn cancel_all_for(&self, actor: ActorId, kind: OperationKind) -> usize {
        self.cancel_partitions(actor, kind).len()
    }

    /// Like [`Scheduler::cancel_all_for`], returning the partition of every
    /// entry marked
    pub fn cancel_partitions(&self, actor: ActorId, kind: OperationKind) -> Vec<PartitionKey> {
        let mut queue = self.lock();
        let Some(pending) = queue.by_owner.remove(&(actor, kind)) else {
            return Vec::new();
        };
        pending
            .into_iter()
            .map(|(sequence, partition)| {
                queue.cancelled.insert(sequence);
                partition
            })
            .collect()
    }

    /// Pop the earliest entry if it is due at `now`
    pub fn pop_due(&self, now: Timestamp) -> Popped {
        let mut queue = self.lock();
        match queue.heap.peek() {
            None => return Popped::Idle(None),
            Some(first) if first.due > now => return Popped::Idle(Some(first.due)),
            Some(_) => {}
        }
        let Some(entry) = queue.heap.pop() else {
            return Popped::Idle(None);
        };
        if queue.cancelled.remove(&entry.sequence) {
            return Popped::Cancelled;
        }
        if let Some((owner, _)) = entry.event.owner() {
            queue.forget_owner(owner, entry.sequence);
        }
        Popped::Due(entry)
    }

    /// Due time of the earliest entry, cancelled or not
    pub fn next_due(&self) -> Option<Timestamp> {
        self.lock().heap.peek().map(|first| first.due)
    }

    /// Number of entries that will still fire
    pub fn len(&self) -> usize {
        let queue = self.lock();
        queue.heap.len() - queue.cancelled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Receiver signalled whenever a new entry becomes the earliest
    pub fn wake_receiver(&self) -> Receiver<()> {
        self.wake_rx.clone()
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("now", &self.now())
            .field("pending", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_core::{Direction, ManualClock, OperationArguments, OperationFactory, WalkRoute};
    use std::thread;

    fn scheduler() -> (Arc<ManualClock>, Scheduler) {
        let clock = Arc::new(ManualClock::new());
        let scheduler = Scheduler::new(clock.clone());
        (clock, scheduler)
    }

    fn turn(actor: u64) -> Schedulable {
        let factory = OperationFactory::default();
        Schedulable::Operation(
            factory
                .build(OperationArguments::Turn {
                    requestor: ActorId(actor),
                    direction: Direction::North,
                })
                .unwrap(),
        )
    }

    fn walk(actor: u64) -> Schedulable {
        let factory = OperationFactory::default();
        Schedulable::Operation(
            factory
                .build(OperationArguments::AutoWalk {
                    requestor: ActorId(actor),
                    route: WalkRoute::Steps(vec![Direction::East]),
                })
                .unwrap(),
        )
    }

    fn drain(scheduler: &Scheduler, now: Timestamp) -> Vec<u64> {
        let mut fired = Vec::new();
        loop {
            match scheduler.pop_due(now) {
                Popped::Due(entry) => fired.push(entry.sequence),
                Popped::Cancelled => {}
                Popped::Idle(_) => return fired,
            }
        }
    }

    #[test]
    fn test_pops_in_due_order() {
        let (_, scheduler) = scheduler();
        scheduler.schedule_event(turn(1), Duration::from_millis(300));
        scheduler.schedule_event(turn(2), Duration::from_millis(100));
        scheduler.schedule_event(turn(3), Duration::from_millis(200));

        let mut dues = Vec::new();
        while let Popped::Due(entry) = scheduler.pop_due(Timestamp(1000)) {
            dues.push(entry.due.as_millis());
        }
        assert_eq!(dues, vec![100, 200, 300]);
    }

    #[test]
    fn test_equal_due_times_pop_in_submission_order() {
        let (_, scheduler) = scheduler();
        for actor in 1..=5 {
            scheduler.schedule_event(turn(actor), Duration::from_millis(50));
        }
        assert_eq!(drain(&scheduler, Timestamp(50)), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_nothing_pops_before_due() {
        let (clock, scheduler) = scheduler();
        let due = scheduler.schedule_event(turn(1), Duration::from_millis(500));
        assert_eq!(due, Timestamp(500));
        assert!(matches!(
            scheduler.pop_due(clock.now()),
            Popped::Idle(Some(Timestamp(500)))
        ));
        clock.advance(Duration::from_millis(500));
        assert!(matches!(scheduler.pop_due(clock.now()), Popped::Due(_)));
        assert!(matches!(scheduler.pop_due(clock.now()), Popped::Idle(None)));
    }

    #[test]
    fn test_cancel_marks_only_matching_entries() {
        let (_, scheduler) = scheduler();
        scheduler.schedule_event(walk(1), Duration::ZERO);
        scheduler.schedule_event(walk(1), Duration::from_millis(10));
        scheduler.schedule_event(turn(1), Duration::ZERO);
        scheduler.schedule_event(walk(2), Duration::ZERO);

        assert_eq!(scheduler.cancel_all_for(ActorId(1), OperationKind::AutoWalk), 2);
        assert_eq!(scheduler.len(), 2);
        assert_eq!(drain(&scheduler, Timestamp(10)), vec![2, 3]);
        assert!(scheduler.is_empty());
    }

    #[test]
    fn test_cancel_reports_partitions() {
        let (_, scheduler) = scheduler();
        scheduler.schedule_event(walk(1), Duration::ZERO);
        scheduler.schedule_event(turn(1), Duration::ZERO);
        assert_eq!(
            scheduler.cancel_partitions(ActorId(1), OperationKind::AutoWalk),
            vec![PartitionKey::for_actor(ActorId(1))]
        );
        assert!(scheduler
            .cancel_partitions(ActorId(1), OperationKind::AutoWalk)
            .is_empty());
        assert_eq!(scheduler.len(), 1);
    }

    #[test]
    fn test_cancel_after_pop_has_no_effect() {
        let (_, scheduler) = scheduler();
        scheduler.schedule_event(walk(1), Duration::ZERO);
        assert!(matches!(scheduler.pop_due(Timestamp::ZERO), Popped::Due(_)));
        assert_eq!(scheduler.cancel_all_for(ActorId(1), OperationKind::AutoWalk), 0);
    }

    #[test]
    fn test_new_head_signals_wake() {
        let (_, scheduler) = scheduler();
        let wake = scheduler.wake_receiver();
        scheduler.schedule_event(turn(1), Duration::from_millis(100));
        assert!(wake.try_recv().is_ok());

        // Later than the head: no signal.
        scheduler.schedule_event(turn(2), Duration::from_millis(200));
        assert!(wake.try_recv().is_err());

        // Repeated signals collapse into the single slot.
        scheduler.schedule_event(turn(3), Duration::from_millis(50));
        scheduler.schedule_event(turn(4), Duration::from_millis(10));
        assert!(wake.try_recv().is_ok());
        assert!(wake.try_recv().is_err());
    }

    #[test]
    fn test_concurrent_producers() {
        let (_, scheduler) = scheduler();
        let scheduler = Arc::new(scheduler);
        let handles: Vec<_> = (1..=4)
            .map(|actor| {
                let scheduler = Arc::clone(&scheduler);
                thread::spawn(move || {
                    for _ in 0..50 {
                        scheduler.schedule_event(turn(actor), Duration::ZERO);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let fired = drain(&scheduler, Timestamp::ZERO);
        assert_eq!(fired.len(), 200);
        assert!(fired.windows(2).all(|pair| pair[0] < pair[1]));
    }
}
