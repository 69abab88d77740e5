//! Operations driven end to end through the engine and consumer

use cadence_core::rules::{EventRule, RuleEvent};
use cadence_core::{
    ActorId, Audience, CombatEvent, Combatant, ContainerId, CreditType, Direction, Effect, Item,
    ItemTraits, ItemType, Location, ManualClock, MemoryWorld, Notification, OperationArguments,
    OperationKind, PartitionKey, Position, RecordingSink, ThingKey, WalkRoute, World,
};
use cadence_hub::{EngineConfig, Simulation};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const PLAYER: ActorId = ActorId(1);
const RAT: ActorId = ActorId(2);
const GOLD: ItemType = ItemType(3031);
const SWORD: ItemType = ItemType(3264);
const TRAP: ItemType = ItemType(3481);
const LEVER: ItemType = ItemType(2772);
const LEVER_PULLED: ItemType = ItemType(2773);

const WALK: Duration = Duration::from_millis(400);

struct Harness {
    clock: Arc<ManualClock>,
    notifier: Arc<RecordingSink>,
    simulation: Simulation<MemoryWorld>,
}

impl Harness {
    fn new(build: impl FnOnce(&mut MemoryWorld)) -> Self {
        let mut world = MemoryWorld::new();
        world.add_ground_area(Position::new(0, 0, 7), Position::new(10, 10, 7));
        world.define_item(
            GOLD,
            ItemTraits {
                stackable: true,
                ..ItemTraits::default()
            },
        );
        world.define_item(
            LEVER,
            ItemTraits {
                movable: false,
                rotates_to: Some(LEVER_PULLED),
                ..ItemTraits::default()
            },
        );
        build(&mut world);

        let clock = Arc::new(ManualClock::new());
        let notifier = Arc::new(RecordingSink::new());
        let simulation = Simulation::new(&EngineConfig::default(), clock.clone(), world)
            .with_notifier(notifier.clone());
        Self {
            clock,
            notifier,
            simulation,
        }
    }

    fn schedule(&self, kind: OperationKind, arguments: OperationArguments) {
        self.simulation
            .engine()
            .schedule_new(kind, arguments, Duration::ZERO)
            .unwrap();
    }

    /// Advance the clock in `step` increments, running the consumer each time
    fn run_for(&mut self, total: Duration, step: Duration) {
        self.simulation.run_due();
        let mut elapsed = Duration::ZERO;
        while elapsed < total {
            self.clock.advance(step);
            elapsed += step;
            self.simulation.run_due();
        }
    }
}

#[test]
fn test_move_into_full_container_restores_source_stack() {
    let bag = ContainerId(1);
    let mut harness = Harness::new(|world| {
        world.spawn_creature(PLAYER, Position::new(4, 4, 7), 1000);
        world.place_item(Position::new(5, 4, 7), Item::new(GOLD, 5));
        world.add_container(bag, 1, Some(PLAYER));
        world
            .add_item(
                &Location::Container {
                    container: bag,
                    index: None,
                },
                Item::single(SWORD),
            )
            .unwrap();
    });

    harness.schedule(
        OperationKind::Movement,
        OperationArguments::Movement {
            requestor: PLAYER,
            thing: ThingKey::Item(GOLD),
            from: Location::Map(Position::new(5, 4, 7)),
            to: Location::Container {
                container: bag,
                index: None,
            },
            amount: 1,
            force: false,
        },
    );
    let report = harness.simulation.run_due();

    assert_eq!(report.fired, 1);
    assert_eq!(report.rejected, 1);
    let world = harness.simulation.world();
    assert_eq!(
        world.tile_stack(&Position::new(5, 4, 7)),
        &[Item::new(GOLD, 5)]
    );
    assert_eq!(world.container_items(bag), &[Item::single(SWORD)]);
    assert_eq!(world.count_items(GOLD), 5);
}

#[test]
fn test_single_execution_trap_fires_once() {
    let mut harness = Harness::new(|world| {
        world.spawn_creature(PLAYER, Position::new(2, 2, 7), 100);
        world.place_item(Position::new(3, 2, 7), Item::single(TRAP));
    });
    harness.simulation.engine().setup_rule(
        EventRule::new(RuleEvent::Collision, ThingKey::Item(TRAP), |ctx, sink| {
            sink.schedule_notification(
                Audience::Player(ctx.requestor),
                Notification::TextMessage {
                    text: "click".to_string(),
                },
                Duration::ZERO,
            );
        })
        .once(),
        PartitionKey::for_actor(ActorId::SYSTEM),
    );

    harness.schedule(
        OperationKind::AutoWalk,
        OperationArguments::AutoWalk {
            requestor: PLAYER,
            route: WalkRoute::Steps(vec![Direction::East, Direction::West, Direction::East]),
        },
    );
    harness.run_for(WALK * 2, WALK);

    assert_eq!(
        harness.simulation.world().creature_position(PLAYER),
        Some(Position::new(3, 2, 7))
    );
    assert_eq!(harness.notifier.messages_for(PLAYER), vec!["click"]);
    assert!(harness.simulation.engine().rules().is_empty());
}

#[test]
fn test_rotate_out_of_reach_walks_then_rotates() {
    let mut harness = Harness::new(|world| {
        world.spawn_creature(PLAYER, Position::new(1, 5, 7), 100);
        world.place_item(Position::new(5, 5, 7), Item::single(LEVER));
    });

    harness.schedule(
        OperationKind::RotateItem,
        OperationArguments::RotateItem {
            requestor: PLAYER,
            at: Location::Map(Position::new(5, 5, 7)),
            item: LEVER,
        },
    );
    harness.simulation.run_due();
    assert_eq!(harness.simulation.engine().rules().len(), 1);
    assert_eq!(
        harness.simulation.world().tile_stack(&Position::new(5, 5, 7)),
        &[Item::single(LEVER)]
    );

    harness.run_for(WALK * 2, WALK);

    let world = harness.simulation.world();
    assert_eq!(world.creature_position(PLAYER), Some(Position::new(4, 5, 7)));
    assert_eq!(
        world.tile_stack(&Position::new(5, 5, 7)),
        &[Item::single(LEVER_PULLED)]
    );
    assert!(harness.simulation.engine().rules().is_empty());
    assert!(harness.notifier.messages_for(PLAYER).is_empty());
}

#[test]
fn test_new_walk_supersedes_pending_rotate() {
    let mut harness = Harness::new(|world| {
        world.spawn_creature(PLAYER, Position::new(1, 5, 7), 100);
        world.place_item(Position::new(5, 5, 7), Item::single(LEVER));
    });

    harness.schedule(
        OperationKind::RotateItem,
        OperationArguments::RotateItem {
            requestor: PLAYER,
            at: Location::Map(Position::new(5, 5, 7)),
            item: LEVER,
        },
    );
    harness.simulation.run_due();

    // What a request handler does before a fresh walk request.
    let engine = harness.simulation.engine().clone();
    assert_eq!(engine.cancel_all_for(PLAYER, OperationKind::AutoWalk), 1);
    assert!(engine.rules().is_empty());
    harness.schedule(
        OperationKind::AutoWalk,
        OperationArguments::AutoWalk {
            requestor: PLAYER,
            route: WalkRoute::Steps(vec![Direction::South]),
        },
    );
    harness.run_for(WALK * 3, WALK);

    let world = harness.simulation.world();
    assert_eq!(world.creature_position(PLAYER), Some(Position::new(2, 6, 7)));
    assert_eq!(
        world.tile_stack(&Position::new(5, 5, 7)),
        &[Item::single(LEVER)]
    );
    assert_eq!(harness.simulation.totals().cancelled_skipped, 1);
}

#[test]
fn test_auto_attack_until_death() {
    let mut harness = Harness::new(|world| {
        world.spawn_creature(PLAYER, Position::new(2, 2, 7), 100);
        world.spawn_creature(RAT, Position::new(3, 2, 7), 100);
    });
    let deaths = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&deaths);
    let combatants = harness.simulation.combatants_mut();
    combatants.subscribe(move |event| {
        if let CombatEvent::Died { creature, killer } = event {
            seen.lock().unwrap().push((*creature, *killer));
        }
    });
    combatants.insert(PLAYER, Combatant::new(100).with_power(12, 4));
    combatants.insert(RAT, Combatant::new(20).with_power(3, 2));

    let engine = harness.simulation.engine().clone();
    engine
        .schedule_new(
            OperationKind::RestoreCredits,
            OperationArguments::RestoreCredits { combatant: PLAYER },
            engine.factory().combat_round(),
        )
        .unwrap();
    harness.schedule(
        OperationKind::Attack,
        OperationArguments::Attack {
            requestor: PLAYER,
            target: RAT,
            auto: true,
        },
    );
    harness.run_for(Duration::from_secs(6), Duration::from_millis(500));

    assert_eq!(*deaths.lock().unwrap(), vec![(RAT, Some(PLAYER))]);
    let combatants = harness.simulation.combatants();
    assert!(!combatants.get(RAT).unwrap().is_alive());
    assert_eq!(combatants.get(PLAYER).unwrap().target(), None);
    assert!(combatants
        .get(PLAYER)
        .unwrap()
        .credits
        .has_credits(CreditType::Attack, 1));
    assert_eq!(engine.cancel_all_for(PLAYER, OperationKind::Attack), 0);
    assert!(harness.notifier.recorded().iter().any(|(_, notification)| matches!(
        notification,
        Notification::EffectPlayed {
            effect: Effect::Puff,
            ..
        }
    )));
}
