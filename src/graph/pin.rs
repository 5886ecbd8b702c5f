use std::fmt;

use serde::{Deserialize, Serialize};

use crate::geometry::Point;

use super::ids::{BlockId, ItemKind};

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PinDirection {
    Input,
    Output,
}

impl PinDirection {
    pub fn opposite(&self) -> PinDirection {
        match self {
            PinDirection::Input => PinDirection::Output,
            PinDirection::Output => PinDirection::Input,
        }
    }
}

impl fmt::Display for PinDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PinDirection::Input => write!(f, "input"),
            PinDirection::Output => write!(f, "output"),
        }
    }
}

/// Which side of the diagram boundary a diagram pin sits on.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagramPinKind {
    Input,
    Output,
}

impl DiagramPinKind {
    /// A diagram input feeds signals into the blocks, so it behaves like an output pin.
    pub fn direction(&self) -> PinDirection {
        match self {
            DiagramPinKind::Input => PinDirection::Output,
            DiagramPinKind::Output => PinDirection::Input,
        }
    }

    pub fn from_direction(direction: PinDirection) -> DiagramPinKind {
        match direction {
            PinDirection::Output => DiagramPinKind::Input,
            PinDirection::Input => DiagramPinKind::Output,
        }
    }

    pub fn item_kind(&self) -> ItemKind {
        match self {
            DiagramPinKind::Input => ItemKind::DiagramInput,
            DiagramPinKind::Output => ItemKind::DiagramOutput,
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum PinOwner {
    Block(BlockId),
    Diagram(DiagramPinKind),
}

/// Node weight of the wiring graph.
#[derive(Clone, Debug)]
pub struct Pin {
    pub(crate) name: String,
    pub(crate) direction: PinDirection,
    pub(crate) owner: PinOwner,
    pub(crate) index: usize,
    pub(crate) position: Point,
    pub(crate) locked: bool,
}

impl Pin {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn direction(&self) -> PinDirection {
        self.direction
    }

    pub fn owner(&self) -> PinOwner {
        self.owner
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Scene position, kept current by the layout's recompute passes.
    pub fn position(&self) -> Point {
        self.position
    }

    pub fn block(&self) -> Option<BlockId> {
        match self.owner {
            PinOwner::Block(block) => Some(block),
            PinOwner::Diagram(_) => None,
        }
    }

    pub fn is_diagram_pin(&self) -> bool {
        matches!(self.owner, PinOwner::Diagram(_))
    }
}

/// Edge weight of the wiring graph.
#[derive(Clone, Debug, Default)]
pub struct Wire {
    pub(crate) locked: bool,
}

impl Wire {
    pub fn is_locked(&self) -> bool {
        self.locked
    }
}
