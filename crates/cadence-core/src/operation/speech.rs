//! Talking

use super::OperationOutcome;
use crate::operation::ExecutionContext;
use crate::{ActorId, Audience, Notification, SpeechType};

pub(super) fn perform(
    requestor: ActorId,
    speech: SpeechType,
    text: &str,
    ctx: &mut ExecutionContext<'_>,
) -> OperationOutcome {
    let Some(at) = ctx.world.creature_position(requestor) else {
        return OperationOutcome::Aborted;
    };
    ctx.notify(
        Audience::Spectators {
            around: at,
            range: speech.range(),
        },
        Notification::CreatureSpoke {
            creature: requestor,
            speech,
            text: text.to_string(),
        },
    );
    OperationOutcome::Performed
}

#[cfg(test)]
mod tests {
    use crate::operation::testing::Fixture;
    use crate::operation::{OperationArguments, OperationOutcome};
    use crate::{ActorId, Audience, ExhaustionType, MemoryWorld, Notification, Position, SpeechType};

    #[test]
    fn test_yell_reaches_further_than_whisper() {
        let mut world = MemoryWorld::new();
        world.add_ground(Position::new(50, 50, 7));
        world.spawn_creature(ActorId(1), Position::new(50, 50, 7), 100);
        let mut fixture = Fixture::new(world);

        for speech in [SpeechType::Whisper, SpeechType::Yell] {
            let outcome = fixture.run(OperationArguments::Speech {
                requestor: ActorId(1),
                speech,
                text: "hello".to_string(),
            });
            assert_eq!(outcome, OperationOutcome::Performed);
        }

        let ranges: Vec<u16> = fixture
            .notifier
            .recorded()
            .into_iter()
            .filter_map(|(audience, notification)| match (audience, notification) {
                (Audience::Spectators { range, .. }, Notification::CreatureSpoke { .. }) => {
                    Some(range)
                }
                _ => None,
            })
            .collect();
        assert_eq!(ranges, vec![1, 18]);
        assert!(!fixture
            .exhaustion
            .remaining_cooldown(ActorId(1), ExhaustionType::Speech, fixture.now)
            .is_zero());
    }
}
