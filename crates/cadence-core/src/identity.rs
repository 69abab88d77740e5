//! Identity types for things in the world

use crate::ActorId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of an item type (the catalog entry, not an instance)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ItemType(pub u16);

impl ItemType {
    /// Create a new item type ID
    pub fn new(id: u16) -> Self {
        Self(id)
    }

    /// Get the raw ID value
    pub fn raw(&self) -> u16 {
        self.0
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "item:{}", self.0)
    }
}

/// Identifier of a container instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContainerId(pub u32);

impl ContainerId {
    /// Create a new container ID
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw ID value
    pub fn raw(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "container:{}", self.0)
    }
}

/// The key event rules are matched against
///
/// Items match by their type, creatures by their actor id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ThingKey {
    Item(ItemType),
    Creature(ActorId),
}

impl fmt::Display for ThingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThingKey::Item(item) => write!(f, "{}", item),
            ThingKey::Creature(actor) => write!(f, "{}", actor),
        }
    }
}

/// Groups scheduled operations and registered rules that belong to the
/// same request chain, so they can be cancelled or cleared together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartitionKey {
    pub requestor: ActorId,
    pub resource: u64,
}

impl PartitionKey {
    /// Key covering everything a requestor started without a specific resource
    pub fn for_actor(requestor: ActorId) -> Self {
        Self {
            requestor,
            resource: 0,
        }
    }

    /// Key for a requestor acting on a specific resource
    pub fn for_resource(requestor: ActorId, resource: u64) -> Self {
        Self {
            requestor,
            resource,
        }
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.requestor, self.resource)
    }
}
