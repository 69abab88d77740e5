//! Pathfinding collaborator

use crate::{ActorId, Direction, Position, World};

/// Finds a walkable route for a creature
pub trait Pathfinder: Send + Sync {
    /// Directions leading from `from` to a tile within `reach` of `to`, or
    /// `None` when no route exists. An empty route means already in reach.
    fn find_path(
        &self,
        world: &dyn World,
        walker: ActorId,
        from: Position,
        to: Position,
        reach: u16,
    ) -> Option<Vec<Direction>>;
}

/// Walks straight towards the target, giving up at the first obstacle
///
/// Good enough for open ground and tests; real servers plug in A*.
#[derive(Debug, Default, Clone, Copy)]
pub struct StraightLinePathfinder {
    /// Longest route it will produce
    pub max_steps: usize,
}

impl StraightLinePathfinder {
    pub fn new(max_steps: usize) -> Self {
        Self { max_steps }
    }
}

impl Pathfinder for StraightLinePathfinder {
    fn find_path(
        &self,
        world: &dyn World,
        _walker: ActorId,
        from: Position,
        to: Position,
        reach: u16,
    ) -> Option<Vec<Direction>> {
        if from.z != to.z {
            return None;
        }
        let mut route = Vec::new();
        let mut at = from;
        while !at.is_within(&to, reach, reach) {
            if route.len() >= self.max_steps {
                return None;
            }
            let direction = at.direction_to(&to)?;
            let next = at.translate(direction);
            if !world.tile_has_ground(&next) || world.tile_blocks_creatures(&next) {
                return None;
            }
            route.push(direction);
            at = next;
        }
        Some(route)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryWorld;

    #[test]
    fn test_straight_line_route() {
        let mut world = MemoryWorld::new();
        world.add_ground_area(Position::new(0, 0, 7), Position::new(10, 10, 7));
        let finder = StraightLinePathfinder::new(20);

        let route = finder
            .find_path(
                &world,
                ActorId(1),
                Position::new(1, 1, 7),
                Position::new(5, 1, 7),
                1,
            )
            .unwrap();
        assert_eq!(route, vec![Direction::East; 3]);
    }

    #[test]
    fn test_already_in_reach() {
        let mut world = MemoryWorld::new();
        world.add_ground_area(Position::new(0, 0, 7), Position::new(3, 3, 7));
        let finder = StraightLinePathfinder::new(20);
        let route = finder.find_path(
            &world,
            ActorId(1),
            Position::new(1, 1, 7),
            Position::new(2, 2, 7),
            1,
        );
        assert_eq!(route, Some(Vec::new()));
    }

    #[test]
    fn test_no_ground_no_route() {
        let mut world = MemoryWorld::new();
        world.add_ground(Position::new(1, 1, 7));
        let finder = StraightLinePathfinder::new(20);
        assert!(finder
            .find_path(
                &world,
                ActorId(1),
                Position::new(1, 1, 7),
                Position::new(5, 1, 7),
                1
            )
            .is_none());
    }
}
