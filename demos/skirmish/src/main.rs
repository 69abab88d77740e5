//! Skirmish: a short scripted scene on a live consumer thread
//!
//! A knight walks up to a lever and pulls it, picks a fight with a rat and
//! chases it down, while a second player shoves a crate around. Every world
//! change is logged by the notification sink.
//!
//! Run with `RUST_LOG=debug` to see scheduling decisions as well. An
//! optional first argument names a RON config file.

use cadence_core::rules::{EventRule, RuleEvent};
use cadence_core::{
    ActorId, Audience, Combatant, Direction, Item, ItemTraits, ItemType, Location, MemoryWorld,
    MonotonicClock, Notification, NotificationSink, OperationArguments, OperationKind,
    PartitionKey, Position, SpeechType, ThingKey, WalkRoute,
};
use cadence_hub::{EngineConfig, Simulation};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const KNIGHT: ActorId = ActorId(1);
const PORTER: ActorId = ActorId(2);
const RAT: ActorId = ActorId(100);
const LEVER: ItemType = ItemType(2772);
const LEVER_PULLED: ItemType = ItemType(2773);
const CRATE: ItemType = ItemType(1739);
const PRESSURE_PLATE: ItemType = ItemType(426);

/// Fast costs so the scene finishes in a few seconds
const DEMO_CONFIG: &str = "(
    costs: (combat_ms: 600, walk_ms: 150, action_ms: 100, speech_ms: 300),
    combat_round_ms: 600,
    idle_wait_ms: 50,
    consumer_thread_name: \"skirmish-consumer\",
)";

/// Logs notifications instead of sending them to clients
struct LogSink;

impl NotificationSink for LogSink {
    fn notify(&self, audience: Audience, notification: Notification) {
        info!(audience = ?audience, notification = ?notification, "notify");
    }
}

fn main() {
    init_tracing();
    if let Err(err) = run() {
        error!(error = %err, "skirmish_failed");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

fn build_world() -> MemoryWorld {
    let mut world = MemoryWorld::new();
    world.add_ground_area(Position::new(0, 0, 7), Position::new(15, 15, 7));
    world.define_item(
        LEVER,
        ItemTraits {
            movable: false,
            rotates_to: Some(LEVER_PULLED),
            ..ItemTraits::default()
        },
    );
    world.define_item(
        CRATE,
        ItemTraits {
            blocks_creatures: true,
            takeable: false,
            weight: 50,
            ..ItemTraits::default()
        },
    );
    world.place_item(Position::new(8, 3, 7), Item::single(LEVER));
    world.place_item(Position::new(10, 10, 7), Item::single(CRATE));
    world.place_item(Position::new(12, 10, 7), Item::single(PRESSURE_PLATE));
    world.spawn_creature(KNIGHT, Position::new(3, 3, 7), 400);
    world.spawn_creature(PORTER, Position::new(9, 10, 7), 400);
    world.spawn_creature(RAT, Position::new(5, 8, 7), 10);
    world
}

fn run() -> cadence_hub::Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::from_ron_str(DEMO_CONFIG)?,
    };

    let mut simulation = Simulation::new(&config, Arc::new(MonotonicClock::new()), build_world())
        .with_notifier(Arc::new(LogSink));
    let combatants = simulation.combatants_mut();
    combatants.subscribe(|event| info!(event = ?event, "combat_event"));
    combatants.insert(KNIGHT, Combatant::new(150).with_power(14, 6));
    combatants.insert(RAT, Combatant::new(30).with_power(4, 1));

    let engine = simulation.engine().clone();
    engine.setup_rule(
        EventRule::new(
            RuleEvent::Collision,
            ThingKey::Item(PRESSURE_PLATE),
            |ctx, sink| {
                sink.schedule_notification(
                    Audience::Everyone,
                    Notification::TextMessage {
                        text: format!("A pressure plate clicks under {}.", ctx.subject),
                    },
                    Duration::ZERO,
                );
            },
        ),
        PartitionKey::for_actor(ActorId::SYSTEM),
    );

    let handle = simulation.spawn()?;
    let round = config.combat_round();

    for combatant in [KNIGHT, RAT] {
        engine.schedule_new(
            OperationKind::RestoreCredits,
            OperationArguments::RestoreCredits { combatant },
            round,
        )?;
    }
    engine.schedule_new(
        OperationKind::Speech,
        OperationArguments::Speech {
            requestor: KNIGHT,
            speech: SpeechType::Yell,
            text: "For the realm!".to_string(),
        },
        Duration::ZERO,
    )?;
    engine.schedule_new(
        OperationKind::RotateItem,
        OperationArguments::RotateItem {
            requestor: KNIGHT,
            at: Location::Map(Position::new(8, 3, 7)),
            item: LEVER,
        },
        Duration::ZERO,
    )?;

    // The porter shoves the crate east twice, onto the plate.
    for (step, from) in [Position::new(10, 10, 7), Position::new(11, 10, 7)]
        .into_iter()
        .enumerate()
    {
        engine.schedule_new(
            OperationKind::Movement,
            OperationArguments::Movement {
                requestor: PORTER,
                thing: ThingKey::Item(CRATE),
                from: Location::Map(from),
                to: Location::Map(from.translate(Direction::East)),
                amount: 1,
                force: false,
            },
            round * step as u32,
        )?;
        if step == 0 {
            engine.schedule_new(
                OperationKind::AutoWalk,
                OperationArguments::AutoWalk {
                    requestor: PORTER,
                    route: WalkRoute::Steps(vec![Direction::East]),
                },
                round / 2,
            )?;
        }
    }

    // Once the lever is pulled, go after the rat.
    thread::sleep(round * 2);
    engine.schedule_new(
        OperationKind::Attack,
        OperationArguments::Attack {
            requestor: KNIGHT,
            target: RAT,
            auto: true,
        },
        Duration::ZERO,
    )?;
    engine.schedule_new(
        OperationKind::AutoWalk,
        OperationArguments::AutoWalk {
            requestor: KNIGHT,
            route: WalkRoute::Towards {
                target: Position::new(5, 8, 7),
                reach: 1,
            },
        },
        Duration::ZERO,
    )?;

    let deadline = round * 20;
    let mut waited = Duration::ZERO;
    while waited < deadline {
        let rat_alive = handle.query(Duration::from_secs(1), |ctx| {
            ctx.combatants.get(RAT).is_some_and(|rat| rat.is_alive())
        })?;
        if !rat_alive {
            break;
        }
        thread::sleep(round);
        waited += round;
    }

    engine.schedule_new(
        OperationKind::Logout,
        OperationArguments::Logout { requestor: PORTER },
        Duration::ZERO,
    )?;
    thread::sleep(round);

    let simulation = handle.shutdown()?;
    let totals = simulation.totals();
    info!(
        fired = totals.fired,
        rejected = totals.rejected,
        cancelled_skipped = totals.cancelled_skipped,
        failed = totals.failed,
        lever_pulled = simulation.world().count_items(LEVER_PULLED),
        "skirmish_finished"
    );
    Ok(())
}
