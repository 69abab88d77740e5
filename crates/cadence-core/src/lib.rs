//! Cadence Core - gameplay operations for a tile-world server
//!
//! This crate provides the data model and gameplay logic the scheduler runs:
//! - Identifiers, positions and locations (`ActorId`, `Position`, `Location`)
//! - Per-actor cooldowns (`ExhaustionBook`) and combat credits (`CombatCreditPool`)
//! - Composable validation (`Policy`, `PolicyChain`)
//! - Event rules fired by movement and use (`EventRuleEngine`)
//! - Operations, their factory and execution context (`operation`)
//!
//! ## Collaborators
//!
//! The surrounding server supplies the world, the transport and the
//! pathfinder through narrow traits:
//! - `World` - creature, tile, container and inventory queries and mutations
//! - `NotificationSink` - receives state changes to send to players
//! - `Pathfinder` - finds a walking route
//! - `Clock` - the monotonic time shared by scheduling and cooldowns
//!
//! This crate never spawns threads. Scheduling lives behind the
//! `OperationSink` trait; see `cadence-hub` for the concurrent scheduler.

mod actor;
mod combat;
mod credits;
mod error;
mod exhaustion;
mod identity;
mod location;
mod notification;
pub mod operation;
mod pathfinder;
pub mod policies;
mod policy;
pub mod rules;
pub mod time;
mod world;

pub use actor::ActorId;
pub use combat::{CombatEvent, Combatant, Combatants};
pub use credits::{CombatCreditPool, CreditCounter, CreditType};
pub use error::{Error, Result};
pub use exhaustion::{ExhaustionBook, ExhaustionRecord, ExhaustionType};
pub use identity::{ContainerId, ItemType, PartitionKey, ThingKey};
pub use location::{Direction, Location, LocationKind, Position, Slot};
pub use notification::{
    Audience, Effect, Notification, NotificationSink, NullSink, RecordingSink, SpeechType,
};
pub use operation::{
    ExecutionContext, Operation, OperationArguments, OperationCosts, OperationFactory,
    OperationKind, OperationOutcome, OperationSink, WalkRoute,
};
pub use pathfinder::{Pathfinder, StraightLinePathfinder};
pub use policy::{FnPolicy, Policy, PolicyChain, PolicyContext, PolicyViolation};
pub use rules::{EventRule, EventRuleEngine, RuleContext, RuleEvent};
pub use time::{Clock, ManualClock, MonotonicClock, Timestamp};
pub use world::{Item, ItemTraits, MemoryWorld, Removed, Skill, World, MAX_STACK};
