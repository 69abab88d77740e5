//! Simulation - the single consumer
//!
//! The simulation owns the world and the combatants. Only it pops entries
//! from the scheduler, and it runs each one to completion before the next,
//! so operations get exclusive access to world state without a world lock.
//!
//! It runs either by hand (`run_due`, one tick at a time, which is what
//! deterministic tests use) or on its own named thread (`spawn`).

use crate::config::EngineConfig;
use crate::engine::Engine;
use crate::error::{Error, Result};
use crate::scheduler::{Popped, Schedulable, ScheduledEntry};
use cadence_core::{
    Clock, Combatants, ExecutionContext, NotificationSink, NullSink, OperationOutcome, Pathfinder,
    StraightLinePathfinder, Timestamp, World,
};
use crossbeam_channel::{bounded, select, Receiver, RecvTimeoutError, Sender};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Step limit for the default pathfinder
const DEFAULT_PATH_STEPS: usize = 64;

/// Counts from one or more ticks
///
/// `fired` counts every entry that ran; `rejected` and `failed` are the
/// subsets whose operation was turned down by a policy or returned an error
/// or panicked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub fired: usize,
    pub cancelled_skipped: usize,
    pub rejected: usize,
    pub failed: usize,
}

impl TickReport {
    fn absorb(&mut self, other: &TickReport) {
        self.fired += other.fired;
        self.cancelled_skipped += other.cancelled_skipped;
        self.rejected += other.rejected;
        self.failed += other.failed;
    }
}

/// The consumer: world state plus the loop that fires due entries
pub struct Simulation<W: World> {
    engine: Engine,
    world: W,
    combatants: Combatants,
    notifier: Arc<dyn NotificationSink>,
    pathfinder: Arc<dyn Pathfinder>,
    idle_wait: Duration,
    thread_name: String,
    totals: TickReport,
}

impl<W: World> Simulation<W> {
    /// Create a simulation over `world`, with a new engine on `clock`
    pub fn new(config: &EngineConfig, clock: Arc<dyn Clock>, world: W) -> Self {
        Self {
            engine: Engine::new(clock, config),
            world,
            combatants: Combatants::new(),
            notifier: Arc::new(NullSink),
            pathfinder: Arc::new(StraightLinePathfinder::new(DEFAULT_PATH_STEPS)),
            idle_wait: config.idle_wait(),
            thread_name: config.consumer_thread_name.clone(),
            totals: TickReport::default(),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn NotificationSink>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_pathfinder(mut self, pathfinder: Arc<dyn Pathfinder>) -> Self {
        self.pathfinder = pathfinder;
        self
    }

    /// The producer handle; clone it into request handlers
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn world(&self) -> &W {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut W {
        &mut self.world
    }

    pub fn combatants(&self) -> &Combatants {
        &self.combatants
    }

    pub fn combatants_mut(&mut self) -> &mut Combatants {
        &mut self.combatants
    }

    /// Counts over every tick so far
    pub fn totals(&self) -> TickReport {
        self.totals
    }

    /// Fire every entry due now, including follow-ups that become due
    /// while the tick runs
    pub fn run_due(&mut self) -> TickReport {
        let mut report = TickReport::default();
        loop {
            let now = self.engine.now();
            match self.engine.scheduler().pop_due(now) {
                Popped::Idle(_) => break,
                Popped::Cancelled => report.cancelled_skipped += 1,
                Popped::Due(entry) => self.fire(entry, now, &mut report),
            }
        }
        self.totals.absorb(&report);
        report
    }

    /// Execute one entry behind a panic boundary
    fn fire(&mut self, entry: ScheduledEntry, now: Timestamp, report: &mut TickReport) {
        let ScheduledEntry {
            due,
            sequence,
            event,
        } = entry;
        let name = event.name();
        report.fired += 1;

        let engine = &self.engine;
        let mut ctx = ExecutionContext {
            now,
            world: &mut self.world,
            combatants: &mut self.combatants,
            rules: engine.rules(),
            exhaustion: engine.exhaustion(),
            notifier: &*self.notifier,
            pathfinder: &*self.pathfinder,
            scheduler: engine,
            factory: engine.factory(),
        };

        let result = panic::catch_unwind(AssertUnwindSafe(|| match event {
            Schedulable::Operation(operation) => operation.execute(&mut ctx).map(Some),
            Schedulable::Notification {
                audience,
                notification,
            } => {
                ctx.notify(audience, notification);
                Ok(None)
            }
            Schedulable::Task { run, .. } => {
                run(&mut ctx);
                Ok(None)
            }
        }));

        match result {
            Ok(Ok(outcome)) => {
                debug!(
                    event = name,
                    sequence,
                    due = %due,
                    late_ms = now.saturating_duration_since(due).as_millis() as u64,
                    outcome = ?outcome,
                    "event_fired"
                );
                if let Some(OperationOutcome::Rejected(_)) = outcome {
                    report.rejected += 1;
                }
            }
            Ok(Err(err)) => {
                report.failed += 1;
                warn!(event = name, sequence, error = %err, "operation_failed");
            }
            Err(payload) => {
                report.failed += 1;
                error!(
                    event = name,
                    sequence,
                    panic = %panic_message(payload.as_ref()),
                    "consumer_panic_caught"
                );
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

impl<W: World + Send + 'static> Simulation<W> {
    /// Run the consumer loop on its own thread
    ///
    /// The thread sleeps until the next due time, a new earliest entry, or
    /// the idle wait, whichever comes first.
    pub fn spawn(self) -> Result<SimulationHandle<W>> {
        let (shutdown_tx, shutdown_rx) = bounded::<()>(1);
        let engine = self.engine.clone();
        let join = thread::Builder::new()
            .name(self.thread_name.clone())
            .spawn(move || self.consume(shutdown_rx))?;
        Ok(SimulationHandle {
            engine,
            shutdown: shutdown_tx,
            join,
        })
    }

    fn consume(mut self, shutdown: Receiver<()>) -> Self {
        info!(thread = %self.thread_name, "consumer_started");
        let wake = self.engine.scheduler().wake_receiver();
        loop {
            self.run_due();
            let wait = match self.engine.scheduler().next_due() {
                Some(due) => due
                    .saturating_duration_since(self.engine.now())
                    .min(self.idle_wait),
                None => self.idle_wait,
            };
            select! {
                recv(shutdown) -> _ => break,
                recv(wake) -> _ => {}
                default(wait) => {}
            }
        }
        info!(
            thread = %self.thread_name,
            fired = self.totals.fired,
            cancelled_skipped = self.totals.cancelled_skipped,
            rejected = self.totals.rejected,
            failed = self.totals.failed,
            "consumer_stopped"
        );
        self
    }
}

/// Handle to a running consumer thread
///
/// Dropping the handle stops the consumer at its next wake-up.
pub struct SimulationHandle<W: World> {
    engine: Engine,
    shutdown: Sender<()>,
    join: JoinHandle<Simulation<W>>,
}

impl<W: World> SimulationHandle<W> {
    /// The producer handle of the running simulation
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Run `inspect` on the consumer and wait for its answer
    pub fn query<R: Send + 'static>(
        &self,
        timeout: Duration,
        inspect: impl FnOnce(&mut ExecutionContext<'_>) -> R + Send + 'static,
    ) -> Result<R> {
        let (reply_tx, reply_rx) = bounded::<R>(1);
        self.engine.schedule_task("query", Duration::ZERO, move |ctx| {
            // The caller may have given up waiting.
            let _ = reply_tx.send(inspect(ctx));
        });
        reply_rx.recv_timeout(timeout).map_err(|err| match err {
            RecvTimeoutError::Timeout => Error::Timeout(timeout),
            RecvTimeoutError::Disconnected => Error::Disconnected,
        })
    }

    /// Stop the consumer and take the simulation back
    pub fn shutdown(self) -> Result<Simulation<W>> {
        // Full means a stop is already pending; disconnected means the
        // thread is gone and join reports why.
        let _ = self.shutdown.try_send(());
        self.join.join().map_err(|_| Error::ConsumerPanicked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_core::{
        ActorId, Audience, Direction, ManualClock, MemoryWorld, Notification, OperationArguments,
        OperationKind, Position, RecordingSink,
    };

    const PLAYER: ActorId = ActorId(1);

    fn simulation() -> (Arc<ManualClock>, Arc<RecordingSink>, Simulation<MemoryWorld>) {
        let mut world = MemoryWorld::new();
        world.add_ground_area(Position::new(0, 0, 7), Position::new(10, 10, 7));
        world.spawn_creature(PLAYER, Position::new(5, 5, 7), 100);
        let clock = Arc::new(ManualClock::new());
        let notifier = Arc::new(RecordingSink::new());
        let simulation = Simulation::new(&EngineConfig::default(), clock.clone(), world)
            .with_notifier(notifier.clone());
        (clock, notifier, simulation)
    }

    #[test]
    fn test_run_due_fires_only_due_entries() {
        let (clock, _, mut simulation) = simulation();
        let engine = simulation.engine().clone();
        engine.schedule_task("now", Duration::ZERO, |_| {});
        engine.schedule_task("later", Duration::from_millis(100), |_| {});

        assert_eq!(simulation.run_due().fired, 1);
        clock.advance(Duration::from_millis(100));
        assert_eq!(simulation.run_due().fired, 1);
        assert_eq!(simulation.totals().fired, 2);
    }

    #[test]
    fn test_deferred_notification_is_delivered() {
        let (clock, notifier, mut simulation) = simulation();
        let engine = simulation.engine().clone();
        cadence_core::OperationSink::schedule_notification(
            &engine,
            Audience::Player(PLAYER),
            Notification::TextMessage {
                text: "later".to_string(),
            },
            Duration::from_millis(10),
        );
        simulation.run_due();
        assert!(notifier.recorded().is_empty());
        clock.advance(Duration::from_millis(10));
        simulation.run_due();
        assert_eq!(notifier.messages_for(PLAYER), vec!["later"]);
    }

    #[test]
    fn test_rejection_is_counted() {
        let (_, _, mut simulation) = simulation();
        simulation
            .engine()
            .schedule_new(
                OperationKind::Logout,
                OperationArguments::Logout { requestor: PLAYER },
                Duration::ZERO,
            )
            .unwrap();
        simulation.engine().exhaustion().add_exhaustion(
            PLAYER,
            cadence_core::ExhaustionType::Combat,
            Timestamp::ZERO,
            Duration::from_secs(1),
        );
        let report = simulation.run_due();
        assert_eq!(report.fired, 1);
        assert_eq!(report.rejected, 1);
    }

    #[test]
    fn test_turn_runs_through_consumer() {
        let (_, _, mut simulation) = simulation();
        simulation
            .engine()
            .schedule_new(
                OperationKind::Turn,
                OperationArguments::Turn {
                    requestor: PLAYER,
                    direction: Direction::West,
                },
                Duration::ZERO,
            )
            .unwrap();
        simulation.run_due();
        assert_eq!(
            simulation.world().creature_direction(PLAYER),
            Some(Direction::West)
        );
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");
        let payload: Box<dyn Any + Send> = Box::new(3_u8);
        assert_eq!(panic_message(payload.as_ref()), "non-string panic payload");
    }
}
