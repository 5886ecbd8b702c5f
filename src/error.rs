use thiserror::Error;

use crate::graph::{BlockId, ItemKind, PinId, WireId};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LayoutError {
    #[error("an item of type '{kind}' with the name '{name}' already exists")]
    DuplicateName { kind: ItemKind, name: String },
    #[error("a pin with the name '{pin}' already exists on block '{block}'")]
    DuplicatePin { block: String, pin: String },
    #[error("invalid connection: must connect an output pin to an input pin")]
    InvalidConnection,
    #[error("cannot connect pin '{0}' to itself")]
    SelfConnection(String),
    #[error("cannot create wire: input pin '{0}' is already connected")]
    InputOccupied(String),
    #[error("unknown block {0:?}")]
    UnknownBlock(BlockId),
    #[error("unknown pin {0:?}")]
    UnknownPin(PinId),
    #[error("no pin named '{0}'")]
    PinNotFound(String),
    #[error("unknown wire {0:?}")]
    UnknownWire(WireId),
    #[error("pin names for {target} do not match the existing pins")]
    OrderMismatch { target: String },
}

#[derive(Debug, Error)]
pub enum OptimizeError {
    #[error("no blocks to optimize")]
    NoBlocks,
    #[error("no optimizable moves available (e.g., only one block, no pins to reorder)")]
    NoMoves,
    #[error("optimization failed: {0}")]
    Failed(#[source] LayoutError),
    #[error("optimization failed: cost evaluated to {cost} at iteration {iteration}")]
    NonFiniteCost { iteration: usize, cost: f64 },
    #[error("internal consistency error while reverting a move: {0}")]
    RevertFailed(#[source] LayoutError),
}

impl OptimizeError {
    /// Conditions that end a run before it starts and are only reported to the user.
    pub fn is_nothing_to_do(&self) -> bool {
        matches!(self, OptimizeError::NoBlocks | OptimizeError::NoMoves)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid optimizer parameters: {0}")]
    Params(#[from] serde_json::Error),
}
