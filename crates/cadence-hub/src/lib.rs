//! Cadence Hub - scheduling and the single consumer
//!
//! This crate runs cadence-core operations at their due time. Any number of
//! request handlers submit work concurrently; one consumer executes it.
//!
//! ## Architecture
//!
//! ```text
//! request handlers (any thread)
//!  │   Engine::schedule_new / cancel_all_for / setup_rule
//!  ▼
//! Engine ── adds remaining cooldown from the ExhaustionBook
//!  │
//!  ▼
//! Scheduler (due-ordered heap, cancellation marks, wake signal)
//!  │   pop_due
//!  ▼
//! Simulation (owns World + Combatants) ── Operation::execute
//!  │
//!  └── follow-ups and rule actions go back through the Engine
//! ```
//!
//! ## Key Components
//!
//! - [`Engine`]: Cloneable producer handle, implements `OperationSink`
//! - [`Scheduler`]: Thread-safe queue ordered by due time, then submission
//! - [`Simulation`]: The consumer; `run_due` for one tick, `spawn` for a thread
//! - [`EngineConfig`]: Costs and consumer settings, loaded from RON
//!
//! ## Example
//!
//! ```
//! use cadence_core::{ActorId, Direction, ManualClock, MemoryWorld, OperationArguments, OperationKind, Position, World};
//! use cadence_hub::{EngineConfig, Simulation};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let mut world = MemoryWorld::new();
//! world.add_ground_area(Position::new(0, 0, 7), Position::new(4, 4, 7));
//! world.spawn_creature(ActorId(1), Position::new(2, 2, 7), 100);
//!
//! let clock = Arc::new(ManualClock::new());
//! let mut simulation = Simulation::new(&EngineConfig::default(), clock, world);
//! simulation
//!     .engine()
//!     .schedule_new(
//!         OperationKind::Turn,
//!         OperationArguments::Turn { requestor: ActorId(1), direction: Direction::West },
//!         Duration::ZERO,
//!     )
//!     .unwrap();
//!
//! assert_eq!(simulation.run_due().fired, 1);
//! assert_eq!(simulation.world().creature_direction(ActorId(1)), Some(Direction::West));
//! ```

mod config;
mod engine;
mod error;
mod scheduler;
mod simulation;

pub use config::EngineConfig;
pub use engine::Engine;
pub use error::{Error, Result};
pub use scheduler::{Popped, Schedulable, ScheduledEntry, Scheduler, TaskFn};
pub use simulation::{Simulation, SimulationHandle, TickReport};
