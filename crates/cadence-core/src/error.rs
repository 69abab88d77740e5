//! Error types for cadence-core

use crate::{ActorId, ContainerId, ItemType, Location};
use thiserror::Error;

/// Core error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Malformed arguments: expected {expected}, got {got}")]
    MalformedArguments { expected: String, got: String },

    #[error("Actor not found: {0}")]
    ActorNotFound(ActorId),

    #[error("Container not found: {0}")]
    ContainerNotFound(ContainerId),

    #[error("Thing not found: {item} at {location}")]
    ThingNotFound { location: Location, item: ItemType },

    #[error("Insufficient amount of {item} at {location}: requested {requested}, available {available}")]
    InsufficientAmount {
        location: Location,
        item: ItemType,
        requested: u8,
        available: u8,
    },

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
