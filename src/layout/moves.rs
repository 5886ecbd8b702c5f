use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::LayoutError;
use crate::geometry::Point;
use crate::graph::{BlockId, DiagramPinKind, ItemRef, Layout, PinDirection, PinId};

/// A reversible perturbation tried by the optimizer.
#[derive(Clone, Debug, PartialEq)]
pub enum Move {
    MoveBlock(BlockId),
    ReorderBlockPins { block: BlockId, direction: PinDirection },
    /// `direction` is the logical role: diagram inputs act as outputs.
    ReorderDiagramPins { direction: PinDirection },
}

impl Move {
    pub fn kind(&self) -> &'static str {
        match self {
            Move::MoveBlock(_) => "move_block",
            Move::ReorderBlockPins { .. } => "reorder_block_pins",
            Move::ReorderDiagramPins { .. } => "reorder_diagram_pins",
        }
    }
}

/// Undo record for an applied move, capturing the exact prior state.
#[derive(Clone, Debug, PartialEq)]
pub enum Revert {
    BlockPosition { block: BlockId, position: Point },
    BlockPinOrder { block: BlockId, direction: PinDirection, order: Vec<String> },
    DiagramPinOrder { kind: DiagramPinKind, order: Vec<String> },
}

impl Revert {
    pub fn apply(self, layout: &mut Layout) -> Result<(), LayoutError> {
        match self {
            Revert::BlockPosition { block, position } => layout.move_block(block, position),
            Revert::BlockPinOrder { block, direction, order } => layout.set_block_pin_order(block, direction, &order),
            Revert::DiagramPinOrder { kind, order } => layout.set_diagram_pin_order(kind, &order),
        }
    }
}

fn any_locked(layout: &Layout, pins: &[PinId]) -> bool {
    pins.iter().any(|pin| layout.is_pin_locked(*pin))
}

/// Every move the optimizer may try on `layout`.
///
/// Unlocked blocks can move. A pin column is reorderable when it has more than one pin
/// and none of them is locked, which holds for block sides and for each diagram edge.
pub fn legal_moves(layout: &Layout) -> Vec<Move> {
    let mut moves = Vec::new();

    for (id, block) in layout.blocks() {
        if !block.is_locked() {
            moves.push(Move::MoveBlock(id));
        }
        for direction in [PinDirection::Input, PinDirection::Output] {
            let pins: Vec<PinId> = block.pins(direction).values().copied().collect();
            if pins.len() > 1 && !any_locked(layout, &pins) {
                moves.push(Move::ReorderBlockPins { block: id, direction });
            }
        }
    }

    for kind in [DiagramPinKind::Input, DiagramPinKind::Output] {
        let pins = layout.diagram_pins(kind);
        if pins.len() > 1 && !any_locked(layout, &pins) {
            moves.push(Move::ReorderDiagramPins {
                direction: kind.direction(),
            });
        }
    }

    moves
}

/// Applies `mv` and returns how to undo it, or `None` when the move is not possible
/// right now (the block is locked or would land on another item).
pub fn apply_move<R: Rng + ?Sized>(
    layout: &mut Layout,
    mv: &Move,
    step: f64,
    rng: &mut R,
) -> Result<Option<Revert>, LayoutError> {
    match mv {
        Move::MoveBlock(id) => {
            let block = layout.block(*id).ok_or(LayoutError::UnknownBlock(*id))?;
            if block.is_locked() {
                return Ok(None);
            }
            let original = block.position();
            let offset = Point::new(rng.gen_range(-step..=step), rng.gen_range(-step..=step));
            let target = (original + offset).snapped(layout.config().grid_size);

            let footprint = block.bounding_rect().translated(target - original);
            if layout.overlaps_any(&footprint, Some(ItemRef::Block(*id))) {
                return Ok(None);
            }

            layout.move_block(*id, target)?;
            tracing::debug!(block = block_name(layout, *id), x = target.x, y = target.y, "moved block");
            Ok(Some(Revert::BlockPosition {
                block: *id,
                position: original,
            }))
        }
        Move::ReorderBlockPins { block, direction } => {
            let original = layout.block_pin_order(*block, *direction)?;
            let mut shuffled = original.clone();
            shuffled.shuffle(rng);
            layout.set_block_pin_order(*block, *direction, &shuffled)?;
            tracing::debug!(block = block_name(layout, *block), %direction, "reordered block pins");
            Ok(Some(Revert::BlockPinOrder {
                block: *block,
                direction: *direction,
                order: original,
            }))
        }
        Move::ReorderDiagramPins { direction } => {
            let kind = DiagramPinKind::from_direction(*direction);
            let original = layout.diagram_pin_order(kind);
            let mut shuffled = original.clone();
            shuffled.shuffle(rng);
            layout.set_diagram_pin_order(kind, &shuffled)?;
            tracing::debug!(?kind, "reordered diagram pins");
            Ok(Some(Revert::DiagramPinOrder { kind, order: original }))
        }
    }
}

fn block_name(layout: &Layout, id: BlockId) -> &str {
    layout.block(id).map_or("", |block| block.name())
}
