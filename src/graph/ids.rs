use std::fmt;

use petgraph::stable_graph::{EdgeIndex, NodeIndex};
use serde::{Deserialize, Serialize};

#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize)]
pub struct BlockId(pub(crate) u32);

#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct PinId(pub(crate) NodeIndex);

#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct WireId(pub(crate) EdgeIndex);

/// Anything that occupies space on the canvas and takes part in overlap tests.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ItemRef {
    Block(BlockId),
    DiagramPin(PinId),
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ItemKind {
    Block,
    DiagramInput,
    DiagramOutput,
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemKind::Block => write!(f, "Block"),
            ItemKind::DiagramInput => write!(f, "DiagramInputPin"),
            ItemKind::DiagramOutput => write!(f, "DiagramOutputPin"),
        }
    }
}
