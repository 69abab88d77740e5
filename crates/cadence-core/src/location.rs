//! Positions, directions and the places a thing can be

use crate::{ActorId, ContainerId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A tile coordinate; `z` is the floor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: u16,
    pub y: u16,
    pub z: u8,
}

impl Position {
    /// Create a new position
    pub fn new(x: u16, y: u16, z: u8) -> Self {
        Self { x, y, z }
    }

    /// The neighbouring position in `direction`
    pub fn translate(&self, direction: Direction) -> Self {
        let (dx, dy) = direction.offset();
        Self {
            x: self.x.saturating_add_signed(dx),
            y: self.y.saturating_add_signed(dy),
            z: self.z,
        }
    }

    /// Horizontal and vertical tile distance, ignoring floors
    pub fn offset_to(&self, other: &Position) -> (u16, u16) {
        (self.x.abs_diff(other.x), self.y.abs_diff(other.y))
    }

    /// Same floor and at most `dx`/`dy` tiles apart
    pub fn is_within(&self, other: &Position, dx: u16, dy: u16) -> bool {
        let (ox, oy) = self.offset_to(other);
        self.z == other.z && ox <= dx && oy <= dy
    }

    /// Same floor and touching (or identical)
    pub fn is_adjacent(&self, other: &Position) -> bool {
        self.is_within(other, 1, 1)
    }

    /// The direction that takes one step from `self` towards `target`
    pub fn direction_to(&self, target: &Position) -> Option<Direction> {
        let east = target.x > self.x;
        let west = target.x < self.x;
        let south = target.y > self.y;
        let north = target.y < self.y;
        match (north, east, south, west) {
            (true, true, _, _) => Some(Direction::NorthEast),
            (true, _, _, true) => Some(Direction::NorthWest),
            (_, true, true, _) => Some(Direction::SouthEast),
            (_, _, true, true) => Some(Direction::SouthWest),
            (true, _, _, _) => Some(Direction::North),
            (_, true, _, _) => Some(Direction::East),
            (_, _, true, _) => Some(Direction::South),
            (_, _, _, true) => Some(Direction::West),
            _ => None,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}, {}]", self.x, self.y, self.z)
    }
}

/// One of the eight walking directions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    North,
    East,
    South,
    West,
    NorthEast,
    SouthEast,
    SouthWest,
    NorthWest,
}

impl Direction {
    /// Tile offset of one step in this direction
    pub fn offset(&self) -> (i16, i16) {
        match self {
            Direction::North => (0, -1),
            Direction::East => (1, 0),
            Direction::South => (0, 1),
            Direction::West => (-1, 0),
            Direction::NorthEast => (1, -1),
            Direction::SouthEast => (1, 1),
            Direction::SouthWest => (-1, 1),
            Direction::NorthWest => (-1, -1),
        }
    }

    /// Diagonal steps take longer to walk
    pub fn is_diagonal(&self) -> bool {
        matches!(
            self,
            Direction::NorthEast | Direction::SouthEast | Direction::SouthWest | Direction::NorthWest
        )
    }
}

/// An equipment slot on a creature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Slot {
    Head,
    Necklace,
    Backpack,
    Body,
    RightHand,
    LeftHand,
    Legs,
    Feet,
    Ring,
    Ammo,
}

impl Slot {
    /// Number of slots
    pub const COUNT: usize = 10;

    /// All slots, in ordinal order
    pub const ALL: [Slot; Slot::COUNT] = [
        Slot::Head,
        Slot::Necklace,
        Slot::Backpack,
        Slot::Body,
        Slot::RightHand,
        Slot::LeftHand,
        Slot::Legs,
        Slot::Feet,
        Slot::Ring,
        Slot::Ammo,
    ];

    /// Index of this slot in per-slot arrays
    pub fn ordinal(&self) -> usize {
        *self as usize
    }
}

/// Which kind of place a `Location` refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LocationKind {
    Map,
    Container,
    Inventory,
}

/// Where a thing is, or where it should go
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Location {
    /// On a map tile
    Map(Position),
    /// Inside a container; `None` index means any free index
    Container {
        container: ContainerId,
        index: Option<u8>,
    },
    /// In a creature's equipment slot
    Inventory { owner: ActorId, slot: Slot },
}

impl Location {
    /// What kind of place this is
    pub fn kind(&self) -> LocationKind {
        match self {
            Location::Map(_) => LocationKind::Map,
            Location::Container { .. } => LocationKind::Container,
            Location::Inventory { .. } => LocationKind::Inventory,
        }
    }

    /// The map position, if this is a map location
    pub fn position(&self) -> Option<Position> {
        match self {
            Location::Map(position) => Some(*position),
            _ => None,
        }
    }

    /// The same place without a specific container index
    pub fn any_index(&self) -> Self {
        match self {
            Location::Container { container, .. } => Location::Container {
                container: *container,
                index: None,
            },
            other => *other,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Map(position) => write!(f, "map{}", position),
            Location::Container {
                container,
                index: Some(index),
            } => write!(f, "{}#{}", container, index),
            Location::Container {
                container,
                index: None,
            } => write!(f, "{}", container),
            Location::Inventory { owner, slot } => write!(f, "{}:{:?}", owner, slot),
        }
    }
}

impl From<Position> for Location {
    fn from(position: Position) -> Self {
        Location::Map(position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translate_saturates_at_origin() {
        let origin = Position::new(0, 0, 7);
        assert_eq!(origin.translate(Direction::NorthWest), origin);
        assert_eq!(origin.translate(Direction::SouthEast), Position::new(1, 1, 7));
    }

    #[test]
    fn test_adjacency_requires_same_floor() {
        let a = Position::new(100, 100, 7);
        assert!(a.is_adjacent(&Position::new(101, 99, 7)));
        assert!(!a.is_adjacent(&Position::new(101, 99, 6)));
        assert!(!a.is_adjacent(&Position::new(102, 100, 7)));
    }

    #[test]
    fn test_direction_to() {
        let a = Position::new(10, 10, 7);
        assert_eq!(a.direction_to(&Position::new(10, 5, 7)), Some(Direction::North));
        assert_eq!(a.direction_to(&Position::new(12, 12, 7)), Some(Direction::SouthEast));
        assert_eq!(a.direction_to(&a), None);
    }

    #[test]
    fn test_any_index() {
        let location = Location::Container {
            container: ContainerId(3),
            index: Some(2),
        };
        assert_eq!(
            location.any_index(),
            Location::Container {
                container: ContainerId(3),
                index: None
            }
        );
        assert_eq!(location.kind(), LocationKind::Container);
        assert!(location.position().is_none());
    }
}
