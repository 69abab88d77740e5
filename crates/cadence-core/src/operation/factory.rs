//! Building operations from creation arguments

use super::{Operation, OperationArguments, OperationKind};
use crate::{Error, ExhaustionType, PartitionKey, Result, ThingKey};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Exhaustion cost per category, in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperationCosts {
    pub combat_ms: u64,
    pub walk_ms: u64,
    pub action_ms: u64,
    pub speech_ms: u64,
}

impl Default for OperationCosts {
    fn default() -> Self {
        Self {
            combat_ms: 2000,
            walk_ms: 400,
            action_ms: 250,
            speech_ms: 1000,
        }
    }
}

impl OperationCosts {
    /// The cost of one exhausting operation in `exhaustion`
    pub fn cost(&self, exhaustion: ExhaustionType) -> Duration {
        let millis = match exhaustion {
            ExhaustionType::Combat => self.combat_ms,
            ExhaustionType::Walk => self.walk_ms,
            ExhaustionType::Action => self.action_ms,
            ExhaustionType::Speech => self.speech_ms,
        };
        Duration::from_millis(millis)
    }
}

/// Turns creation arguments into operations
///
/// The factory is the only place arguments are validated; anything it
/// returns is well-formed and carries its exhaustion cost and partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationFactory {
    costs: OperationCosts,
    combat_round: Duration,
    max_path_retries: u32,
}

impl Default for OperationFactory {
    fn default() -> Self {
        Self::new(OperationCosts::default(), Duration::from_millis(2000), 1)
    }
}

impl OperationFactory {
    pub fn new(costs: OperationCosts, combat_round: Duration, max_path_retries: u32) -> Self {
        Self {
            costs,
            combat_round,
            max_path_retries,
        }
    }

    pub fn costs(&self) -> &OperationCosts {
        &self.costs
    }

    /// Period between credit regenerations and auto-attack retries
    pub fn combat_round(&self) -> Duration {
        self.combat_round
    }

    /// How many times a walk-then-act operation may be retried
    pub fn max_path_retries(&self) -> u32 {
        self.max_path_retries
    }

    /// Build an operation of `kind`, rejecting arguments of another kind
    pub fn create(&self, kind: OperationKind, arguments: OperationArguments) -> Result<Operation> {
        if arguments.kind() != kind {
            return Err(Error::MalformedArguments {
                expected: kind.to_string(),
                got: arguments.kind().to_string(),
            });
        }
        self.build(arguments)
    }

    /// Build an operation of whatever kind the arguments describe
    pub fn build(&self, arguments: OperationArguments) -> Result<Operation> {
        validate(&arguments)?;
        let requestor = arguments.requestor();
        let exhaustion = exhaustion_type(arguments.kind())
            .map(|exhaustion| (exhaustion, self.costs.cost(exhaustion)));
        let partition = match &arguments {
            OperationArguments::Movement {
                thing: ThingKey::Item(item),
                ..
            }
            | OperationArguments::UseItem { item, .. }
            | OperationArguments::RotateItem { item, .. } => {
                PartitionKey::for_resource(requestor, u64::from(item.raw()))
            }
            _ => PartitionKey::for_actor(requestor),
        };
        Ok(Operation {
            arguments,
            exhaustion,
            partition,
            retries: 0,
        })
    }
}

fn exhaustion_type(kind: OperationKind) -> Option<ExhaustionType> {
    match kind {
        OperationKind::Movement | OperationKind::UseItem | OperationKind::RotateItem => {
            Some(ExhaustionType::Action)
        }
        OperationKind::AutoWalk => Some(ExhaustionType::Walk),
        OperationKind::Speech => Some(ExhaustionType::Speech),
        OperationKind::Attack => Some(ExhaustionType::Combat),
        OperationKind::Turn
        | OperationKind::RestoreCredits
        | OperationKind::SpeedChange
        | OperationKind::Logout => None,
    }
}

fn malformed(expected: &str, got: impl ToString) -> Error {
    Error::MalformedArguments {
        expected: expected.to_string(),
        got: got.to_string(),
    }
}

fn validate(arguments: &OperationArguments) -> Result<()> {
    match arguments {
        OperationArguments::Movement {
            thing, from, to, amount, ..
        } => {
            if *amount == 0 {
                return Err(malformed("amount of at least 1", amount));
            }
            if from == to {
                return Err(malformed("distinct source and destination", to));
            }
            if let ThingKey::Creature(_) = thing {
                if from.position().is_none() || to.position().is_none() {
                    return Err(malformed("map locations for a creature", to));
                }
            }
            Ok(())
        }
        OperationArguments::Speech { text, .. } if text.trim().is_empty() => {
            Err(malformed("non-empty text", "empty text"))
        }
        OperationArguments::Attack {
            requestor, target, ..
        } if requestor == target => Err(malformed("another creature as target", target)),
        OperationArguments::SpeedChange { delta: 0, .. } => Err(malformed("non-zero delta", 0)),
        // A timed change is reversed by negating it.
        OperationArguments::SpeedChange {
            delta: i32::MIN, ..
        } => Err(malformed("reversible delta", i32::MIN)),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ActorId, CreditType, Direction, ItemType, Location, Position, SpeechType};

    fn movement(amount: u8) -> OperationArguments {
        OperationArguments::Movement {
            requestor: ActorId(1),
            thing: ThingKey::Item(ItemType(3031)),
            from: Location::Map(Position::new(1, 1, 7)),
            to: Location::Map(Position::new(2, 1, 7)),
            amount,
            force: false,
        }
    }

    #[test]
    fn test_kind_mismatch_is_malformed() {
        let factory = OperationFactory::default();
        let err = factory
            .create(OperationKind::Attack, movement(1))
            .unwrap_err();
        assert_eq!(
            err,
            Error::MalformedArguments {
                expected: "attack".to_string(),
                got: "movement".to_string()
            }
        );
    }

    #[test]
    fn test_costs_and_partition() {
        let factory = OperationFactory::default();
        let op = factory.create(OperationKind::Movement, movement(3)).unwrap();
        assert_eq!(
            op.exhaustion(),
            Some((ExhaustionType::Action, Duration::from_millis(250)))
        );
        assert_eq!(op.partition(), PartitionKey::for_resource(ActorId(1), 3031));
        assert_eq!(op.retries(), 0);

        let turn = factory
            .build(OperationArguments::Turn {
                requestor: ActorId(1),
                direction: Direction::South,
            })
            .unwrap();
        assert_eq!(turn.exhaustion(), None);
        assert_eq!(turn.partition(), PartitionKey::for_actor(ActorId(1)));
    }

    #[test]
    fn test_rejects_bad_values() {
        let factory = OperationFactory::default();
        assert!(factory.build(movement(0)).is_err());
        assert!(factory
            .build(OperationArguments::Speech {
                requestor: ActorId(1),
                speech: SpeechType::Say,
                text: "   ".to_string(),
            })
            .is_err());
        assert!(factory
            .build(OperationArguments::Attack {
                requestor: ActorId(1),
                target: ActorId(1),
                auto: false,
            })
            .is_err());
        for delta in [0, i32::MIN] {
            assert!(factory
                .build(OperationArguments::SpeedChange {
                    combatant: ActorId(1),
                    credit: CreditType::Attack,
                    delta,
                    lasts: None,
                })
                .is_err());
        }
    }

    #[test]
    fn test_costs_from_ron_keep_defaults() {
        let costs: OperationCosts = ron::from_str("(walk_ms: 600)").unwrap();
        assert_eq!(costs.cost(ExhaustionType::Walk), Duration::from_millis(600));
        assert_eq!(costs.cost(ExhaustionType::Combat), Duration::from_millis(2000));
    }
}
