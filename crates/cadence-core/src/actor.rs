//! Actor identifiers
//!
//! Actors are the principals that request operations:
//! - Players, through their client connection
//! - Monsters and NPCs, through whatever AI drives them
//! - The system itself, for world-originated work (id `0`)

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for an actor (a creature in the world)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ActorId(pub u64);

impl ActorId {
    /// Create a new actor ID
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// The system actor (for world-originated operations with no requestor)
    pub const SYSTEM: ActorId = ActorId(0);

    /// Get the raw ID value
    pub fn raw(&self) -> u64 {
        self.0
    }

    /// Check if this is the system actor
    pub fn is_system(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_system() {
            write!(f, "actor:system")
        } else {
            write!(f, "actor:{}", self.0)
        }
    }
}

impl From<u64> for ActorId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actor_id() {
        let system = ActorId::SYSTEM;
        assert!(system.is_system());
        assert_eq!(format!("{}", system), "actor:system");

        let actor = ActorId::new(1);
        assert!(!actor.is_system());
        assert_eq!(format!("{}", actor), "actor:1");
        assert_eq!(ActorId::from(7).raw(), 7);
    }
}
